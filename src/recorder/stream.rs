use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{debug, error, info, warn};

use super::encoder::{MediaEncoder, MediaLogEncoder, WavEncoder};
use super::{Chunk, Recorder, RecorderEvent, RecorderFactory, RecorderKind, RecorderState};
use crate::capture::AudioConstraints;
use crate::error::RecorderError;
use crate::media::{forward_tracks, MediaStream, TrackEvent};

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Recorder encoding a [`MediaStream`] with a [`MediaEncoder`]
pub struct StreamRecorder {
    kind: RecorderKind,
    stream: MediaStream,
    mime_type: String,
    extension: String,
    encoder: Option<Box<dyn MediaEncoder>>,
    state: RecorderState,
    stop_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl StreamRecorder {
    pub fn new(kind: RecorderKind, stream: MediaStream, encoder: Box<dyn MediaEncoder>) -> Self {
        Self {
            kind,
            stream,
            mime_type: encoder.mime_type().to_string(),
            extension: encoder.extension().to_string(),
            encoder: Some(encoder),
            state: RecorderState::Idle,
            stop_tx: None,
            task: None,
        }
    }
}

async fn emit(events: &mpsc::Sender<RecorderEvent>, sequence: &mut usize, data: Vec<u8>) {
    if data.is_empty() {
        return;
    }

    debug!("Chunk {} ready ({} bytes)", sequence, data.len());

    let chunk = Chunk {
        sequence: *sequence,
        data,
    };
    if events.send(RecorderEvent::DataAvailable(chunk)).await.is_err() {
        warn!("Chunk {} dropped, nobody is collecting", sequence);
    }
    *sequence += 1;
}

fn encode(kind: RecorderKind, encoder: &mut dyn MediaEncoder, event: TrackEvent) {
    if let TrackEvent::Frame { frame, .. } = event {
        if let Err(e) = encoder.write(&frame) {
            warn!("{:?} recorder failed to encode frame: {}", kind, e);
        }
    }
}

#[async_trait::async_trait]
impl Recorder for StreamRecorder {
    fn kind(&self) -> RecorderKind {
        self.kind
    }

    fn state(&self) -> RecorderState {
        self.state
    }

    fn mime_type(&self) -> &str {
        &self.mime_type
    }

    fn extension(&self) -> &str {
        &self.extension
    }

    fn start(
        &mut self,
        timeslice: Duration,
    ) -> Result<mpsc::Receiver<RecorderEvent>, RecorderError> {
        if self.state != RecorderState::Idle {
            return Err(RecorderError::InvalidState {
                kind: self.kind,
                state: self.state,
                action: "start",
            });
        }

        let mut encoder = self
            .encoder
            .take()
            .ok_or_else(|| RecorderError::Encoder("encoder already consumed".to_string()))?;

        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
        let mut frames = forward_tracks(self.stream.tracks());
        let kind = self.kind;

        let task = tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + timeslice, timeslice);
            let mut sequence = 0usize;

            loop {
                tokio::select! {
                    biased;
                    _ = &mut stop_rx => break,
                    Some(event) = frames.recv() => encode(kind, encoder.as_mut(), event),
                    _ = ticker.tick() => {
                        let slice = encoder.take_slice();
                        emit(&event_tx, &mut sequence, slice).await;
                    }
                }
            }

            // Frames relayed before the stop request still belong to this recording
            while let Ok(event) = frames.try_recv() {
                encode(kind, encoder.as_mut(), event);
            }

            match encoder.finish() {
                Ok(tail) => emit(&event_tx, &mut sequence, tail).await,
                Err(e) => error!("{:?} recorder failed to finalize: {}", kind, e),
            }

            let _ = event_tx.send(RecorderEvent::Stopped).await;

            info!("{:?} recorder finished after {} chunks", kind, sequence);
        });

        self.stop_tx = Some(stop_tx);
        self.task = Some(task);
        self.state = RecorderState::Recording;

        info!(
            "{:?} recorder started ({} tracks, {}ms slices, {})",
            self.kind,
            self.stream.tracks().len(),
            timeslice.as_millis(),
            self.mime_type
        );

        Ok(event_rx)
    }

    async fn stop(&mut self) -> Result<(), RecorderError> {
        match self.state {
            RecorderState::Inactive => {
                debug!("{:?} recorder already inactive", self.kind);
                Ok(())
            }
            RecorderState::Idle => {
                self.state = RecorderState::Inactive;
                Ok(())
            }
            RecorderState::Recording => {
                self.state = RecorderState::Inactive;

                if let Some(stop_tx) = self.stop_tx.take() {
                    let _ = stop_tx.send(());
                }

                if let Some(task) = self.task.take() {
                    task.await
                        .map_err(|e| RecorderError::Task(format!("{:?} recorder: {}", self.kind, e)))?;
                }

                info!("{:?} recorder stopped", self.kind);
                Ok(())
            }
        }
    }
}

impl Drop for StreamRecorder {
    fn drop(&mut self) {
        // The task flushes and exits on its own once signalled
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
    }
}

/// Builds [`StreamRecorder`]s: a media log for the primary recording and
/// streaming WAV for the audio-only ones
pub struct EncodingRecorderFactory {
    audio: AudioConstraints,
}

impl EncodingRecorderFactory {
    pub fn new(audio: AudioConstraints) -> Self {
        Self { audio }
    }
}

impl RecorderFactory for EncodingRecorderFactory {
    fn create(
        &self,
        kind: RecorderKind,
        stream: MediaStream,
    ) -> Result<Box<dyn Recorder>, RecorderError> {
        let encoder: Box<dyn MediaEncoder> = match kind {
            RecorderKind::Primary => Box::new(MediaLogEncoder::new(&stream, self.audio.clone())?),
            RecorderKind::SourceAudio | RecorderKind::MicAudio => {
                Box::new(WavEncoder::new(self.audio.clone()))
            }
        };

        Ok(Box::new(StreamRecorder::new(kind, stream, encoder)))
    }
}
