//! Session state and the workflows that drive it.
//!
//! This module provides:
//! - `SessionStore`: owned session state plus register/login/logout/restore
//! - `SessionState`: a read-only snapshot handed to UI code
//! - `AuthError`: failures surfaced by the workflows
//!
//! Every mutation is mirrored into the injected `KeyValueStore`, so a session
//! survives restarts until logout or expiry removes it.

mod error;
mod expiry;
mod state;
mod store;


pub use error::AuthError;
pub use state::SessionState;
pub use store::SessionStore;
