use serde::{Deserialize, Serialize};

use crate::artifact::Artifact;
use crate::recorder::RecorderKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Idle,
    /// Display acquired, waiting for the user to begin recording
    Armed,
    Recording,
    /// Terminal; resources are released and artifacts built
    Stopped,
}

/// Outcome of a control action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Transition {
    Applied,
    /// The control was disabled in the current state; nothing changed
    Ignored,
}

/// Which controls are enabled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Controls {
    pub acquire_display: bool,
    pub begin_recording: bool,
    pub stop: bool,
}

impl Controls {
    /// `Stopped` is terminal, so nothing is enabled there; a new recording
    /// needs a fresh session
    pub fn for_state(state: SessionState, unsupported: bool) -> Self {
        Self {
            acquire_display: !unsupported && state == SessionState::Idle,
            begin_recording: state == SessionState::Armed,
            stop: state == SessionState::Recording,
        }
    }
}

/// Live preview binding
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Preview {
    pub track_id: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadLink {
    pub role: RecorderKind,
    pub label: String,
    pub filename: String,
    pub mime_type: String,
    pub size_bytes: usize,
    pub href: String,
}

impl From<&Artifact> for DownloadLink {
    fn from(artifact: &Artifact) -> Self {
        Self {
            role: artifact.kind,
            label: artifact.label.clone(),
            filename: artifact.filename.clone(),
            mime_type: artifact.mime_type.clone(),
            size_bytes: artifact.size_bytes(),
            href: format!("/downloads/{}", artifact.filename),
        }
    }
}

/// Download container; hidden until the first artifact exists
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Downloads {
    pub visible: bool,
    pub links: Vec<DownloadLink>,
}

impl Downloads {
    pub fn from_artifacts(artifacts: &[Artifact]) -> Self {
        Self {
            visible: !artifacts.is_empty(),
            links: artifacts.iter().map(DownloadLink::from).collect(),
        }
    }
}

/// Everything a client renders for a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionView {
    pub session_id: String,
    pub state: SessionState,
    pub status: String,
    /// `HH:MM:SS`
    pub elapsed: String,
    pub preview: Option<Preview>,
    pub controls: Controls,
    pub unsupported: bool,
    pub downloads: Downloads,
}
