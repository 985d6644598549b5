use std::sync::Arc;
use tracing::{info, warn};

use super::config::SessionConfig;
use super::controller::SessionController;
use crate::capture::{CaptureBackend, SourceAcquirer};
use crate::recorder::{EncodingRecorderFactory, RecorderFactory};

/// Builds a fresh [`SessionController`] for every session
///
/// The platform capability gate is evaluated once, here; sessions created
/// afterwards inherit the result.
pub struct SessionFactory {
    acquirer: SourceAcquirer,
    recorders: Arc<dyn RecorderFactory>,
    config: SessionConfig,
    supported: bool,
}

impl SessionFactory {
    pub fn new(
        acquirer: SourceAcquirer,
        recorders: Arc<dyn RecorderFactory>,
        config: SessionConfig,
    ) -> Self {
        let supported = acquirer.is_supported();
        if !supported {
            warn!("Recording is not supported on this platform, capture stays disabled");
        }

        Self {
            acquirer,
            recorders,
            config,
            supported,
        }
    }

    /// Sessions on `backend` encoding with the built-in encoders
    pub fn with_backend(backend: Arc<dyn CaptureBackend>, config: SessionConfig) -> Self {
        let acquirer = SourceAcquirer::new(backend, config.audio.clone());
        let recorders = Arc::new(EncodingRecorderFactory::new(config.audio.clone()));
        Self::new(acquirer, recorders, config)
    }

    pub fn is_supported(&self) -> bool {
        self.supported
    }

    pub fn create(&self) -> Arc<SessionController> {
        let config = SessionConfig {
            session_id: SessionConfig::new_session_id(),
            ..self.config.clone()
        };

        info!("Creating session {}", config.session_id);

        SessionController::new(
            config,
            self.acquirer.clone(),
            Arc::clone(&self.recorders),
            self.supported,
        )
    }
}
