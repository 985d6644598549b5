//! Recording session management
//!
//! This module provides the [`SessionController`] state machine that drives:
//! - Display and microphone acquisition
//! - Audio mixing and stream composition
//! - The recorder set and the elapsed-time ticker
//! - Resource release and artifact assembly on stop
//!
//! Client surfaces (status, controls, preview, downloads) are published as a
//! [`SessionView`] snapshot.

mod config;
mod controller;
mod factory;
mod messages;
mod state;
mod stats;
mod ticker;

pub use config::SessionConfig;
pub use controller::SessionController;
pub use factory::SessionFactory;
pub use messages::{Locale, Messages};
pub use state::{Controls, DownloadLink, Downloads, Preview, SessionState, SessionView, Transition};
pub use stats::{RecorderStats, SessionStats};
pub use ticker::{format_elapsed, spawn_ticker};
