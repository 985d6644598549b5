pub mod backend;
pub mod synthetic;

pub use backend::{
    AudioConstraints, CaptureBackend, CursorVisibility, DisplayConstraints, SourceAcquirer,
};
pub use synthetic::{SyntheticBackend, SyntheticConfig};
