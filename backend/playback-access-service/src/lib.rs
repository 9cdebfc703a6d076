/// Playback Access Service Library
///
/// Decides whether a caller may stream a video and, if so, hands back a
/// time-limited public link scoped to that video's object prefix.
pub mod cache;
pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod security;
pub mod services;

pub use config::Config;
pub use error::{AccessError, Result};
