use thiserror::Error;

use crate::api::ApiError;

/// Failure of a session workflow.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("User profile not found")]
    ProfileNotFound,
}

impl AuthError {
    /// Display message, or `fallback` when the error renders empty.
    pub fn message_or(&self, fallback: &str) -> String {
        let message = self.to_string();
        if message.trim().is_empty() {
            fallback.to_string()
        } else {
            message
        }
    }
}
