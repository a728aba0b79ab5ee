//! REST API module for the learning platform's auth endpoints.
//!
//! `AuthApi` is the capability the session store consumes; `HttpApiClient`
//! is the production implementation. The client caches the bearer token
//! handed to it by the store and attaches it to every later request.

pub mod client;
pub mod error;

use async_trait::async_trait;

use crate::models::{LoginResponse, RegisterResponse, UserProfile};

pub use client::HttpApiClient;
pub use error::ApiError;

/// Remote operations the session workflows depend on.
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Create an account. Does not establish a session.
    async fn register_user(
        &self,
        name: &str,
        email: &str,
        password: &str,
        role: &str,
    ) -> Result<RegisterResponse, ApiError>;

    /// Exchange credentials for a token and whatever identity the server returns.
    async fn login_user(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError>;

    /// Fetch a profile by id. `Ok(None)` when the server answers with an empty body.
    async fn get_user(&self, user_id: &str) -> Result<Option<UserProfile>, ApiError>;

    /// Attach `token` to subsequent requests.
    fn setup_auth_token(&self, token: &str);

    /// Stop attaching a token.
    fn clear_token(&self);
}
