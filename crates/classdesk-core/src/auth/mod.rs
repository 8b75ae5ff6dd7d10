//! Authentication module for managing the logged-in user.
//!
//! This module provides:
//! - `SessionManager`: login/logout, persistence and change notification
//! - `Session`: the persisted, published record of the current user
//! - `TokenClaims`: roles, permissions and expiry read from a JWT payload
//!
//! Sessions are persisted under the `currentUser` key and restored when the
//! manager is created. Expiry is checked lazily by `is_authenticated`.

pub mod claims;
pub mod manager;
mod observers;
pub mod session;

pub use claims::{primary_role, TokenClaims, TokenError};
pub use manager::{SessionManager, SESSION_STORAGE_KEY};
pub use observers::{Observer, Subscription};
pub use session::Session;
