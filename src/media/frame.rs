use serde::{Deserialize, Serialize};

/// Where an audio frame originated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioStreamSource {
    /// System/tab audio shared alongside the display
    System,
    /// Microphone input
    Microphone,
    /// Output of the mix graph
    Mixed,
}

/// Audio sample data (16-bit PCM, interleaved)
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Raw audio samples (i16 PCM, interleaved)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Timestamp in milliseconds since the producing source started
    pub timestamp_ms: u64,
    /// Audio stream source
    pub source: AudioStreamSource,
}

impl AudioFrame {
    /// Playback duration of this frame in milliseconds
    pub fn duration_ms(&self) -> u64 {
        let per_second = self.sample_rate as u64 * self.channels.max(1) as u64;
        if per_second == 0 {
            return 0;
        }
        self.samples.len() as u64 * 1000 / per_second
    }
}

/// A single captured video frame (packed RGB)
#[derive(Debug, Clone)]
pub struct VideoFrame {
    pub width: u32,
    pub height: u32,
    pub timestamp_ms: u64,
    pub data: Vec<u8>,
}

/// Anything a live track can carry
#[derive(Debug, Clone)]
pub enum MediaFrame {
    Video(VideoFrame),
    Audio(AudioFrame),
}

impl MediaFrame {
    pub fn timestamp_ms(&self) -> u64 {
        match self {
            MediaFrame::Video(frame) => frame.timestamp_ms,
            MediaFrame::Audio(frame) => frame.timestamp_ms,
        }
    }
}
