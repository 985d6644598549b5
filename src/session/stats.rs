use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::state::SessionState;
use crate::recorder::RecorderKind;

/// Statistics about a recording session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    pub session_id: String,

    pub state: SessionState,

    /// When recording started, if it has
    pub started_at: Option<DateTime<Utc>>,

    /// Recording duration in seconds, frozen once stopped
    pub duration_secs: f64,

    /// Chunks collected per recorder
    pub recorders: Vec<RecorderStats>,

    /// Total chunks over every recorder
    pub chunks_count: usize,

    pub artifacts_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecorderStats {
    pub kind: RecorderKind,
    pub chunks: usize,
}
