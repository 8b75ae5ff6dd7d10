//! REST client module for the classdesk authentication endpoint.
//!
//! This module provides the `AuthClient` for exchanging a username and
//! password for a JWT bearer token, and the `AuthError` taxonomy used to
//! classify failed login attempts.

pub mod client;
pub mod error;

pub use client::{AuthClient, AuthenticationResponse, LoginRequest, DEFAULT_API_URL};
pub use error::{AuthError, LOGIN_REJECTED_MESSAGE};
