pub mod artifact;
pub mod audio;
pub mod capture;
pub mod config;
pub mod error;
pub mod http;
pub mod media;
pub mod recorder;
pub mod session;

pub use artifact::{filename_timestamp, Artifact, ArtifactBuilder};
pub use audio::{AudioMixer, MixerConfig};
pub use capture::{
    AudioConstraints, CaptureBackend, SourceAcquirer, SyntheticBackend, SyntheticConfig,
};
pub use config::Config;
pub use error::{CaptureError, RecorderError, SessionError};
pub use http::{create_router, AppState};
pub use media::{MediaSource, MediaStream, MediaTrack, TrackKind, TrackState};
pub use recorder::{
    ChunkBuffer, EncodingRecorderFactory, Recorder, RecorderFactory, RecorderKind, RecorderSet,
};
pub use session::{
    Locale, SessionConfig, SessionController, SessionFactory, SessionState, SessionStats,
    SessionView, Transition,
};
