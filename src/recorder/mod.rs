//! Recording of live streams into chunk buffers
//!
//! - [`Recorder`]: encodes one input stream, emitting a chunk per timeslice
//! - [`RecorderSet`]: the up to three independent recorders of a session
//! - [`ChunkBuffer`]: ordered, append-only chunks of one recorder

mod buffer;
mod encoder;
mod set;
mod stream;

pub use buffer::ChunkBuffer;
pub use encoder::{MediaEncoder, MediaLogEncoder, WavEncoder};
pub use set::{RecorderSet, RecordingPlan};
pub use stream::{EncodingRecorderFactory, StreamRecorder};

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::error::RecorderError;
use crate::media::MediaStream;

/// Which input a recorder encodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecorderKind {
    /// Display video plus mixed audio
    Primary,
    /// Raw system audio, unmixed
    SourceAudio,
    /// Raw microphone audio, unmixed
    MicAudio,
}

impl RecorderKind {
    /// Filename prefix of the artifact
    pub fn role(self) -> &'static str {
        match self {
            RecorderKind::Primary => "primary",
            RecorderKind::SourceAudio => "source-audio",
            RecorderKind::MicAudio => "mic-audio",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecorderState {
    Idle,
    Recording,
    /// Terminal; a recorder is never restarted
    Inactive,
}

/// A slice of encoded media
#[derive(Debug, Clone)]
pub struct Chunk {
    /// Position in the recorder's output, starting at 0
    pub sequence: usize,
    pub data: Vec<u8>,
}

#[derive(Debug)]
pub enum RecorderEvent {
    DataAvailable(Chunk),
    /// Final event; every chunk has been delivered before it
    Stopped,
}

/// Encoder instance driven by the session
#[async_trait::async_trait]
pub trait Recorder: Send + Sync {
    fn kind(&self) -> RecorderKind;

    fn state(&self) -> RecorderState;

    fn mime_type(&self) -> &str;

    fn extension(&self) -> &str;

    /// Begin capturing. Chunks arrive on the returned channel every
    /// `timeslice`, in capture order, followed by `Stopped`.
    fn start(
        &mut self,
        timeslice: Duration,
    ) -> Result<mpsc::Receiver<RecorderEvent>, RecorderError>;

    /// Flush the pending slice and become inactive. Idempotent.
    async fn stop(&mut self) -> Result<(), RecorderError>;
}

/// Creates the recorders of a session
pub trait RecorderFactory: Send + Sync {
    fn create(
        &self,
        kind: RecorderKind,
        stream: MediaStream,
    ) -> Result<Box<dyn Recorder>, RecorderError>;
}
