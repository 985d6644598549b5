// Audio mixer for combining system audio and microphone tracks
//
// The mixer builds a small graph: every input source carrying an audio track
// is connected to one shared destination track. A graph task buffers frames
// per input, waits until every live input has audio queued, and sums the
// queued frames with clipping into the destination. A single input passes
// through untouched.

use std::collections::VecDeque;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::capture::AudioConstraints;
use crate::media::{
    forward_tracks, AudioFrame, AudioStreamSource, MediaFrame, MediaSource, MediaTrack,
    TrackEvent, TrackKind,
};

/// Configuration for audio mixer
#[derive(Debug, Clone)]
pub struct MixerConfig {
    /// Sample rate every input is expected to deliver
    pub sample_rate: u32,
    /// Number of channels every input is expected to deliver
    pub channels: u16,
    /// Maximum audio buffered for one input while waiting on the others.
    /// Past this the available frames are mixed without the stalled input.
    pub max_buffer_delay_ms: u64,
}

impl Default for MixerConfig {
    fn default() -> Self {
        Self::from(&AudioConstraints::default())
    }
}

impl From<&AudioConstraints> for MixerConfig {
    fn from(constraints: &AudioConstraints) -> Self {
        Self {
            sample_rate: constraints.sample_rate,
            channels: constraints.channels,
            max_buffer_delay_ms: 200,
        }
    }
}

/// Builds mix graphs for sessions
#[derive(Debug, Clone)]
pub struct AudioMixer {
    config: MixerConfig,
}

impl AudioMixer {
    pub fn new(config: MixerConfig) -> Self {
        info!(
            "Audio mixer initialized: {}Hz, {} channels",
            config.sample_rate, config.channels
        );

        Self { config }
    }

    /// Connect the audio track of each source to a single destination track
    ///
    /// Returns `None` when no source carries audio. Must be called from within
    /// a tokio runtime; the graph task lives until every input has ended or
    /// the destination track is stopped.
    pub fn mix(&self, sources: &[&MediaSource]) -> Option<MediaTrack> {
        let inputs: Vec<MediaTrack> = sources
            .iter()
            .filter_map(|source| source.audio_track())
            .cloned()
            .collect();

        if inputs.is_empty() {
            info!("No audio tracks to mix, recording will be video-only");
            return None;
        }

        let destination = MediaTrack::new(TrackKind::Audio, "mixed audio");
        let events = forward_tracks(&inputs);
        let graph = MixGraph::new(self.config.clone(), inputs.len());

        info!("Mixing {} audio tracks into {}", inputs.len(), destination.id());

        tokio::spawn(graph.run(events, destination.clone()));

        Some(destination)
    }
}

/// Per-graph mixing state
struct MixGraph {
    config: MixerConfig,
    /// Buffers for each connected input, by connection index
    buffers: Vec<VecDeque<AudioFrame>>,
    /// Inputs that can still deliver frames
    live: Vec<bool>,
}

impl MixGraph {
    fn new(config: MixerConfig, inputs: usize) -> Self {
        Self {
            config,
            buffers: (0..inputs).map(|_| VecDeque::new()).collect(),
            live: vec![true; inputs],
        }
    }

    async fn run(mut self, mut events: mpsc::Receiver<TrackEvent>, destination: MediaTrack) {
        let stopped = destination.ended();
        tokio::pin!(stopped);

        loop {
            tokio::select! {
                biased;
                _ = &mut stopped => {
                    debug!("Mix destination released, tearing down graph");
                    return;
                }
                event = events.recv() => match event {
                    Some(TrackEvent::Frame { index, frame: MediaFrame::Audio(frame) }) => {
                        self.buffer_frame(index, frame);
                    }
                    Some(TrackEvent::Frame { .. }) => {}
                    Some(TrackEvent::Ended { index }) => {
                        debug!("Mix input {} ended", index);
                        self.live[index] = false;
                    }
                    None => break,
                },
            }

            while let Some(mixed) = self.mix_next_chunk() {
                if !destination.push(MediaFrame::Audio(mixed)) {
                    return;
                }
            }
        }

        // Every input is gone: flush what is left, then end the destination
        self.live.iter_mut().for_each(|live| *live = false);
        while let Some(mixed) = self.mix_next_chunk() {
            destination.push(MediaFrame::Audio(mixed));
        }
        destination.end();

        info!("Audio mix graph finished");
    }

    /// Buffer a frame for its input
    fn buffer_frame(&mut self, index: usize, frame: AudioFrame) {
        // Validate frame format
        if frame.sample_rate != self.config.sample_rate {
            warn!(
                "Frame sample rate mismatch: expected {}, got {}. Dropping frame.",
                self.config.sample_rate, frame.sample_rate
            );
            return;
        }

        if frame.channels != self.config.channels {
            warn!(
                "Frame channel count mismatch: expected {}, got {}. Dropping frame.",
                self.config.channels, frame.channels
            );
            return;
        }

        if let Some(buffer) = self.buffers.get_mut(index) {
            debug!(
                "Buffered {:?} frame: {}ms ({} samples)",
                frame.source,
                frame.timestamp_ms,
                frame.samples.len()
            );
            buffer.push_back(frame);
        }
    }

    fn buffered_ms(buffer: &VecDeque<AudioFrame>) -> u64 {
        buffer.iter().map(AudioFrame::duration_ms).sum()
    }

    /// A mix step is ready once every live input has audio queued, or one
    /// input has been waiting longer than the allowed delay
    fn is_ready(&self) -> bool {
        let any_buffered = self.buffers.iter().any(|b| !b.is_empty());
        if !any_buffered {
            return false;
        }

        let all_live_buffered = self
            .buffers
            .iter()
            .zip(&self.live)
            .all(|(buffer, live)| !live || !buffer.is_empty());

        all_live_buffered
            || self
                .buffers
                .iter()
                .any(|b| Self::buffered_ms(b) > self.config.max_buffer_delay_ms)
    }

    /// Try to mix the next chunk of audio from the input buffers
    ///
    /// Returns None if the inputs are not ready yet
    fn mix_next_chunk(&mut self) -> Option<AudioFrame> {
        if !self.is_ready() {
            return None;
        }

        // Collect one frame from each input buffer
        let mut frames_to_mix: Vec<AudioFrame> =
            self.buffers.iter_mut().filter_map(VecDeque::pop_front).collect();

        // If only one frame, return it directly (no mixing needed)
        if frames_to_mix.len() == 1 {
            return frames_to_mix.pop();
        }

        Some(self.mix_multiple_frames(&frames_to_mix))
    }

    /// Mix multiple audio frames together by adding their samples
    fn mix_multiple_frames(&self, frames: &[AudioFrame]) -> AudioFrame {
        // Use the earliest timestamp
        let timestamp_ms = frames.iter().map(|f| f.timestamp_ms).min().unwrap_or(0);

        // Determine output length (use the longest frame)
        let max_len = frames.iter().map(|f| f.samples.len()).max().unwrap_or(0);
        let mut mixed_samples = Vec::with_capacity(max_len);

        for i in 0..max_len {
            let sum: i32 = frames
                .iter()
                .map(|frame| frame.samples.get(i).copied().unwrap_or(0) as i32)
                .sum();

            // Clip to prevent overflow
            mixed_samples.push(sum.clamp(i16::MIN as i32, i16::MAX as i32) as i16);
        }

        debug!(
            "Mixed {} frames at {}ms: {} samples total",
            frames.len(),
            timestamp_ms,
            mixed_samples.len()
        );

        AudioFrame {
            samples: mixed_samples,
            sample_rate: self.config.sample_rate,
            channels: self.config.channels,
            timestamp_ms,
            source: AudioStreamSource::Mixed,
        }
    }
}

/// Collect every frame a mixed track produces until it ends
///
/// Only meant for inspection in tests and diagnostics.
pub async fn drain_track(track: &MediaTrack) -> Vec<AudioFrame> {
    let mut events = forward_tracks(std::slice::from_ref(track));
    let mut frames = Vec::new();

    while let Some(event) = events.recv().await {
        match event {
            TrackEvent::Frame { frame: MediaFrame::Audio(frame), .. } => frames.push(frame),
            TrackEvent::Frame { .. } => {}
            TrackEvent::Ended { .. } => break,
        }
    }

    frames
}
