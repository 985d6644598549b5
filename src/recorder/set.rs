use futures::future::join_all;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::{ChunkBuffer, Recorder, RecorderEvent, RecorderFactory, RecorderKind};
use crate::error::RecorderError;
use crate::media::{MediaStream, MediaTrack};

/// Inputs for the recorders of one session
#[derive(Debug, Clone)]
pub struct RecordingPlan {
    /// Display video plus mixed audio
    pub combined: MediaStream,
    /// Raw display audio, if the display carried any
    pub source_audio: Option<MediaTrack>,
    /// Raw microphone audio, if the microphone carried any
    pub mic_audio: Option<MediaTrack>,
}

struct RecorderSlot {
    recorder: Box<dyn Recorder>,
    collector: Option<JoinHandle<ChunkBuffer>>,
    chunks: Arc<AtomicUsize>,
    /// Set when `stop()` failed; the recorder may never deliver `Stopped`
    stop_failed: bool,
}

/// The primary recorder plus the optional audio-only recorders
///
/// Recorders share no state: each one feeds its own collector task, which
/// owns that recorder's [`ChunkBuffer`] until the recording is collected.
pub struct RecorderSet {
    slots: Vec<RecorderSlot>,
}

impl RecorderSet {
    /// Create every applicable recorder without starting any of them
    pub fn assemble(factory: &dyn RecorderFactory, plan: &RecordingPlan) -> Result<Self, RecorderError> {
        let mut inputs = vec![(RecorderKind::Primary, plan.combined.clone())];

        if let Some(track) = &plan.source_audio {
            inputs.push((RecorderKind::SourceAudio, MediaStream::new(vec![track.clone()])));
        }
        if let Some(track) = &plan.mic_audio {
            inputs.push((RecorderKind::MicAudio, MediaStream::new(vec![track.clone()])));
        }

        let mut slots = Vec::with_capacity(inputs.len());
        for (kind, stream) in inputs {
            slots.push(RecorderSlot {
                recorder: factory.create(kind, stream)?,
                collector: None,
                chunks: Arc::new(AtomicUsize::new(0)),
                stop_failed: false,
            });
        }

        info!("Recorder set assembled: {:?}", slots.iter().map(|s| s.recorder.kind()).collect::<Vec<_>>());

        Ok(Self { slots })
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn kinds(&self) -> Vec<RecorderKind> {
        self.slots.iter().map(|slot| slot.recorder.kind()).collect()
    }

    /// Chunks collected so far, per recorder
    pub fn chunk_counts(&self) -> Vec<(RecorderKind, usize)> {
        self.slots
            .iter()
            .map(|slot| (slot.recorder.kind(), slot.chunks.load(Ordering::SeqCst)))
            .collect()
    }

    /// Start every recorder, or none: a failure stops the ones already started
    pub async fn start(&mut self, timeslice: Duration) -> Result<(), RecorderError> {
        for index in 0..self.slots.len() {
            let slot = &mut self.slots[index];
            match slot.recorder.start(timeslice) {
                Ok(events) => {
                    let buffer = ChunkBuffer::new(
                        slot.recorder.kind(),
                        slot.recorder.mime_type(),
                        slot.recorder.extension(),
                    );
                    slot.collector = Some(tokio::spawn(collect_chunks(
                        events,
                        buffer,
                        Arc::clone(&slot.chunks),
                    )));
                }
                Err(e) => {
                    error!("Failed to start {:?} recorder: {}", slot.recorder.kind(), e);
                    self.stop_all().await;
                    return Err(e);
                }
            }
        }

        Ok(())
    }

    /// Stop every recorder, continuing past failures
    pub async fn stop_all(&mut self) {
        let stops = self.slots.iter_mut().map(|slot| async move {
            if let Err(e) = slot.recorder.stop().await {
                error!("Failed to stop {:?} recorder: {}", slot.recorder.kind(), e);
                slot.stop_failed = true;
            }
        });
        join_all(stops).await;
    }

    /// Wait for every collector to see its recorder's final chunk
    ///
    /// The audio-only collectors are awaited first; the primary recorder's
    /// completion is what finalizes the set. Buffers come back in
    /// [`RecorderKind`] order, primary first.
    ///
    /// A recorder whose stop failed has its collector cancelled instead of
    /// awaited; unless that collector already finished, its buffer comes
    /// back empty.
    pub async fn collect(&mut self) -> Vec<ChunkBuffer> {
        let mut buffers = Vec::with_capacity(self.slots.len());

        for slot in self.slots.iter_mut().rev() {
            let kind = slot.recorder.kind();
            let collected = match slot.collector.take() {
                Some(collector) => {
                    if slot.stop_failed {
                        warn!("{:?} recorder did not stop cleanly, cancelling its collector", kind);
                        collector.abort();
                    }
                    match collector.await {
                        Ok(buffer) => Some(buffer),
                        Err(e) => {
                            error!("{:?} chunk collector failed: {}", kind, e);
                            None
                        }
                    }
                }
                None => None,
            };
            let buffer = collected.unwrap_or_else(|| {
                ChunkBuffer::new(kind, slot.recorder.mime_type(), slot.recorder.extension())
            });

            debug!("{:?} recorder collected: {} chunks, {} bytes", kind, buffer.len(), buffer.byte_len());
            buffers.push(buffer);
        }

        buffers.sort_by_key(ChunkBuffer::kind);
        buffers
    }
}

async fn collect_chunks(
    mut events: mpsc::Receiver<RecorderEvent>,
    mut buffer: ChunkBuffer,
    counter: Arc<AtomicUsize>,
) -> ChunkBuffer {
    while let Some(event) = events.recv().await {
        match event {
            RecorderEvent::DataAvailable(chunk) => {
                if chunk.sequence != buffer.len() {
                    warn!(
                        "{:?} chunk {} arrived after {} chunks",
                        buffer.kind(),
                        chunk.sequence,
                        buffer.len()
                    );
                }
                buffer.push(chunk.data);
                counter.fetch_add(1, Ordering::SeqCst);
            }
            RecorderEvent::Stopped => break,
        }
    }

    buffer
}
