use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::CaptureError;
use crate::media::{MediaSource, SourceKind};

/// Audio processing requested from the platform at acquisition time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioConstraints {
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels (1 = mono, 2 = stereo)
    pub channels: u16,
}

impl Default for AudioConstraints {
    fn default() -> Self {
        Self {
            echo_cancellation: true,
            noise_suppression: true,
            sample_rate: 44100,
            channels: 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CursorVisibility {
    Always,
    Motion,
    Never,
}

/// Constraints for a screen/window/tab capture request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayConstraints {
    pub cursor: CursorVisibility,
    /// System audio to capture alongside the display, where offered
    pub audio: Option<AudioConstraints>,
}

/// Capture backend trait
///
/// Implementations wrap whatever the platform offers for screen and
/// microphone capture. Both requests may suspend on a permission prompt.
#[async_trait::async_trait]
pub trait CaptureBackend: Send + Sync {
    /// Whether encoding live media is possible at all on this platform
    fn supports_recording(&self) -> bool;

    /// Whether screen capture is offered
    fn supports_display_capture(&self) -> bool;

    /// Request a display source (video + optional system audio)
    async fn get_display_media(
        &self,
        constraints: &DisplayConstraints,
    ) -> Result<MediaSource, CaptureError>;

    /// Request a microphone source (audio only)
    async fn get_user_media(
        &self,
        constraints: &AudioConstraints,
    ) -> Result<MediaSource, CaptureError>;

    /// Backend name for logging
    fn name(&self) -> &str;
}

/// Obtains the session's two sources from a capture backend
#[derive(Clone)]
pub struct SourceAcquirer {
    backend: Arc<dyn CaptureBackend>,
    audio: AudioConstraints,
}

impl SourceAcquirer {
    pub fn new(backend: Arc<dyn CaptureBackend>, audio: AudioConstraints) -> Self {
        Self { backend, audio }
    }

    pub fn audio_constraints(&self) -> &AudioConstraints {
        &self.audio
    }

    /// Capability gate evaluated when a session factory is created
    pub fn is_supported(&self) -> bool {
        self.backend.supports_recording()
    }

    pub async fn acquire_display(&self) -> Result<MediaSource, CaptureError> {
        if !self.backend.supports_display_capture() {
            return Err(CaptureError::UnsupportedPlatform(format!(
                "{} does not offer screen capture",
                self.backend.name()
            )));
        }

        let constraints = DisplayConstraints {
            cursor: CursorVisibility::Always,
            audio: Some(self.audio.clone()),
        };

        let source = self.backend.get_display_media(&constraints).await?;

        if source.video_track().is_none() {
            // A display source without video cannot back a session
            source.stop_all();
            return Err(CaptureError::DeviceUnavailable(
                "display source has no video track".to_string(),
            ));
        }

        info!(
            "Display acquired from {} ({} tracks, system audio: {})",
            self.backend.name(),
            source.tracks().len(),
            source.has_audio()
        );

        Ok(source)
    }

    pub async fn acquire_microphone(&self) -> Result<MediaSource, CaptureError> {
        let source = self.backend.get_user_media(&self.audio).await?;

        if source.kind() != SourceKind::Microphone {
            warn!("Backend returned a {:?} source for a microphone request", source.kind());
        }

        info!(
            "Microphone acquired from {} (audio: {})",
            self.backend.name(),
            source.has_audio()
        );

        Ok(source)
    }
}
