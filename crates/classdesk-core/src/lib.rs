//! Core library for classdesk.
//!
//! Talks to the token-issuing login endpoint, keeps track of the logged-in
//! user, and persists that session between runs. Views subscribe to the
//! `SessionManager` and render from what it publishes.

pub mod api;
pub mod auth;
pub mod config;
pub mod storage;

pub use api::{AuthClient, AuthError};
pub use auth::{Session, SessionManager, Subscription};
pub use config::Config;
pub use storage::{FileStore, MemoryStore, SessionStore};
