use thiserror::Error;

/// Message shown when the endpoint answers but issues no token.
pub const LOGIN_REJECTED_MESSAGE: &str = "Login failed. Please check your credentials.";

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Cannot connect to server: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("Unauthorized - invalid username or password")]
    Unauthorized,

    #[error("Server returned status {status}: {body}")]
    Remote { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl AuthError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            return body.to_string();
        }
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        match status.as_u16() {
            401 => AuthError::Unauthorized,
            code => AuthError::Remote {
                status: code,
                body: Self::truncate_body(body),
            },
        }
    }

    /// Message suitable for showing to the person at the login form.
    pub fn user_message(&self) -> &'static str {
        match self {
            AuthError::Transport(_) => {
                "Unable to connect to server. Please check if the backend is running."
            }
            AuthError::Unauthorized => "Invalid username or password",
            AuthError::Remote { .. } | AuthError::InvalidResponse(_) => {
                "Login failed. Please try again."
            }
        }
    }
}
