use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::messages::Locale;
use crate::capture::AudioConstraints;

/// Configuration for a recording session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Unique session identifier (e.g., "session-1f0c...")
    pub session_id: String,

    /// Slice interval of every recorder
    /// Default: 1 second
    pub timeslice: Duration,

    /// Update period of the elapsed-time display
    pub tick_interval: Duration,

    /// Language of the status and download surfaces
    pub locale: Locale,

    /// Constraints requested for system and microphone audio
    pub audio: AudioConstraints,
}

impl SessionConfig {
    pub fn new_session_id() -> String {
        format!("session-{}", uuid::Uuid::new_v4())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_id: Self::new_session_id(),
            timeslice: Duration::from_secs(1),
            tick_interval: Duration::from_secs(1),
            locale: Locale::En,
            audio: AudioConstraints::default(),
        }
    }
}
