use crate::session::{SessionController, SessionFactory, SessionState};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// The client's current session; replaced when a stopped one is restarted
    pub session: Arc<RwLock<Arc<SessionController>>>,

    pub factory: Arc<SessionFactory>,
}

impl AppState {
    pub fn new(factory: SessionFactory) -> Self {
        let session = factory.create();

        Self {
            session: Arc::new(RwLock::new(session)),
            factory: Arc::new(factory),
        }
    }

    pub async fn current(&self) -> Arc<SessionController> {
        Arc::clone(&*self.session.read().await)
    }

    /// The current session, or a fresh one if the current one has stopped
    pub async fn current_or_fresh(&self) -> Arc<SessionController> {
        let mut session = self.session.write().await;

        if session.state() == SessionState::Stopped {
            let fresh = self.factory.create();
            info!("Session {} finished, starting {}", session.id(), fresh.id());
            *session = fresh;
        }

        Arc::clone(&*session)
    }
}
