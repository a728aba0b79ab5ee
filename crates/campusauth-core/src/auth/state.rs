use serde::Serialize;

use crate::models::{Role, UserProfile};

/// Point-in-time copy of the session.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionState {
    pub token: Option<String>,
    pub user: Option<UserProfile>,
    pub user_id: Option<String>,
    pub role: Option<Role>,
    /// Always `token.is_some()`; only the store's token setter writes it.
    pub is_authenticated: bool,
    pub loading: bool,
    pub error: Option<String>,
}

impl SessionState {
    pub fn is_admin(&self) -> bool {
        self.role.as_ref().is_some_and(Role::is_admin)
    }

    pub fn is_student(&self) -> bool {
        self.role.as_ref().is_some_and(Role::is_student)
    }
}
