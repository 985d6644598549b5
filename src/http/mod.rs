//! HTTP API server for the recorder client
//!
//! This module provides a REST API over the current capture session:
//! - GET /session - Session surfaces (status, controls, preview, downloads)
//! - GET /session/stats - Session statistics
//! - POST /session/display - Acquire the display
//! - POST /session/record - Begin recording
//! - POST /session/stop - Stop recording
//! - GET /downloads/:filename - Download an artifact
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
