//! Core library for campusauth.
//!
//! This crate owns the client-side session for the learning platform:
//! - `auth`: the `SessionStore` with its mutations and login/logout/restore workflows
//! - `api`: the `AuthApi` seam and its reqwest-backed `HttpApiClient`
//! - `storage`: the synchronous key-value persistence the session mirrors into
//! - `router` / `notify`: navigation and user-alert capabilities the workflows drive
//! - `models`: API payloads and the persisted user blob

pub mod api;
pub mod auth;
pub mod models;
pub mod notify;
pub mod router;
pub mod storage;

pub use api::{ApiError, AuthApi, HttpApiClient};
pub use auth::{AuthError, SessionState, SessionStore};
pub use models::{LoginResponse, RegisterResponse, Role, UserProfile};
pub use notify::{Notifier, TracingNotifier};
pub use router::{MemoryRouter, Router};
pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageError};
