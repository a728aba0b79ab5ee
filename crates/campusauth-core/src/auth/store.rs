//! The session store: state, mutations and workflows.

use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::api::AuthApi;
use crate::models::{LoginResponse, RegisterResponse, Role, StoredUserData, UserProfile};
use crate::notify::Notifier;
use crate::router::{Router, ADMIN_ROUTE, LOGIN_ROUTE, STUDENT_ROUTE};
use crate::storage::{keys, KeyValueStore};

use super::expiry::{ExpiryAction, ExpiryTimer};
use super::{AuthError, SessionState};

const REGISTER_FAILED: &str = "Register failed";
const LOGIN_FAILED: &str = "Login failed";
const INVALID_CREDENTIALS: &str = "Invalid credentials. Please try again.";
const PROFILE_UNAVAILABLE: &str = "Unable to get user information";

struct Inner {
    state: Mutex<SessionState>,
    api: Arc<dyn AuthApi>,
    storage: Arc<dyn KeyValueStore>,
    router: Arc<dyn Router>,
    notifier: Arc<dyn Notifier>,
    expiry: ExpiryTimer,
}

/// Owned handle to the client session.
///
/// Clone is cheap and every clone sees the same state. The state lock is
/// never held across an await, so each mutation is atomic with respect to
/// the workflows and the expiry timer.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Inner>,
}

/// Clears `loading` when a workflow exits, however it exits.
struct LoadingGuard<'a> {
    store: &'a SessionStore,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.store.set_loading(false);
    }
}

impl SessionStore {
    /// Create an empty session. Call [`check_auth_state`] to hydrate it.
    ///
    /// [`check_auth_state`]: SessionStore::check_auth_state
    pub fn new(
        api: Arc<dyn AuthApi>,
        storage: Arc<dyn KeyValueStore>,
        router: Arc<dyn Router>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(SessionState::default()),
                api,
                storage,
                router,
                notifier,
                expiry: ExpiryTimer::default(),
            }),
        }
    }

    // =========================================================================
    // Read access
    // =========================================================================

    pub fn snapshot(&self) -> SessionState {
        self.inner.state.lock().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.state.lock().is_authenticated
    }

    pub fn token(&self) -> Option<String> {
        self.inner.state.lock().token.clone()
    }

    pub fn current_user(&self) -> Option<UserProfile> {
        self.inner.state.lock().user.clone()
    }

    pub fn user_id(&self) -> Option<String> {
        self.inner.state.lock().user_id.clone()
    }

    pub fn user_role(&self) -> Option<Role> {
        self.inner.state.lock().role.clone()
    }

    pub fn auth_error(&self) -> Option<String> {
        self.inner.state.lock().error.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.state.lock().loading
    }

    pub fn is_admin(&self) -> bool {
        self.inner.state.lock().is_admin()
    }

    pub fn is_student(&self) -> bool {
        self.inner.state.lock().is_student()
    }

    /// Persisted absolute expiry of the current token, if one was recorded.
    pub fn session_expires_at(&self) -> Option<DateTime<Utc>> {
        let millis = self.stored_expiration()?;
        Utc.timestamp_millis_opt(millis).single()
    }

    /// Whether an expiry timer is waiting to end the session.
    pub fn has_pending_expiry(&self) -> bool {
        self.inner.expiry.is_armed()
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Set the bearer token. Empty strings count as no token.
    pub fn set_token(&self, token: Option<String>) {
        let token = token.filter(|t| !t.is_empty());
        {
            let mut state = self.inner.state.lock();
            state.is_authenticated = token.is_some();
            state.token = token.clone();
        }
        debug!(authenticated = token.is_some(), "Session token changed");

        match token {
            Some(ref token) => {
                self.inner.api.setup_auth_token(token);
                self.persist(keys::TOKEN, token);
            }
            None => {
                self.inner.api.clear_token();
                self.unpersist(keys::TOKEN);
            }
        }
    }

    /// Set the profile. Only `name` and `email` are persisted.
    pub fn set_user(&self, user: Option<UserProfile>) {
        match user {
            Some(ref profile) => match serde_json::to_string(&StoredUserData::from(profile)) {
                Ok(blob) => self.persist(keys::USER_DATA, &blob),
                Err(e) => warn!(error = %e, "Failed to serialize user data"),
            },
            None => self.unpersist(keys::USER_DATA),
        }
        self.inner.state.lock().user = user;
    }

    /// Set the user id, writing it through to storage (or removing it).
    pub fn set_user_id(&self, user_id: Option<String>) {
        match user_id {
            Some(ref id) => self.persist(keys::USER_ID, id),
            None => self.unpersist(keys::USER_ID),
        }
        self.inner.state.lock().user_id = user_id;
    }

    /// Set the role, writing it through to storage (or removing it).
    pub fn set_role(&self, role: Option<Role>) {
        match role {
            Some(ref role) => self.persist(keys::ROLE, role.as_str()),
            None => self.unpersist(keys::ROLE),
        }
        self.inner.state.lock().role = role;
    }

    pub fn set_loading(&self, loading: bool) {
        self.inner.state.lock().loading = loading;
    }

    pub fn set_error(&self, error: Option<String>) {
        self.inner.state.lock().error = error;
    }

    /// Reset identity fields and drop their persisted copies.
    ///
    /// The persisted expiry timestamp is left alone; only logout removes it.
    pub fn clear_auth(&self) {
        {
            let mut state = self.inner.state.lock();
            state.token = None;
            state.user = None;
            state.user_id = None;
            state.role = None;
            state.is_authenticated = false;
            state.error = None;
        }
        for key in [keys::TOKEN, keys::USER_ID, keys::ROLE, keys::USER_DATA] {
            self.unpersist(key);
        }
        debug!("Session cleared");
    }

    // =========================================================================
    // Workflows
    // =========================================================================

    /// Create an account, then log in with the same credentials.
    ///
    /// `role` defaults to `student`. Returns the registration response even
    /// when the follow-up login ran.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
        role: Option<&str>,
    ) -> Result<RegisterResponse, AuthError> {
        let _loading = self.begin_workflow();
        let role = role.filter(|r| !r.is_empty()).unwrap_or(Role::STUDENT);

        self.create_account(name, email, password, role).await.map_err(|e| {
            warn!(email, error = %e, "Registration failed");
            self.set_error(Some(e.message_or(REGISTER_FAILED)));
            e
        })
    }

    async fn create_account(
        &self,
        name: &str,
        email: &str,
        password: &str,
        role: &str,
    ) -> Result<RegisterResponse, AuthError> {
        let response = self.inner.api.register_user(name, email, password, role).await?;
        if response.success {
            info!(email, role, "Account registered, logging in");
            self.login(email, password).await?;
        } else {
            info!(email, message = ?response.message, "Registration not confirmed by server");
        }
        Ok(response)
    }

    /// Authenticate and establish the session.
    ///
    /// Resolves `Ok(None)` when the server answers without a token; that case
    /// is not treated as an error. On success the user is routed to the
    /// landing page for their role and the full response is returned.
    pub async fn login(&self, email: &str, password: &str) -> Result<Option<LoginResponse>, AuthError> {
        let _loading = self.begin_workflow();

        self.establish_session(email, password).await.map_err(|e| {
            warn!(email, error = %e, "Login failed");
            self.set_error(Some(e.message_or(LOGIN_FAILED)));
            self.inner.notifier.notify(&e.message_or(INVALID_CREDENTIALS));
            e
        })
    }

    async fn establish_session(&self, email: &str, password: &str) -> Result<Option<LoginResponse>, AuthError> {
        let response = self.inner.api.login_user(email, password).await?;

        let Some(token) = response.token().map(str::to_string) else {
            debug!(email, "Login response carried no token");
            return Ok(None);
        };
        self.set_token(Some(token));

        if let Some(secs) = response.expires_in() {
            let lifetime_ms = i64::try_from(secs.saturating_mul(1000)).unwrap_or(i64::MAX);
            let expires_at = now_millis().saturating_add(lifetime_ms);
            self.persist(keys::TOKEN_EXPIRATION, &expires_at.to_string());
            self.arm_expiry(Duration::from_secs(secs), ExpiryAction::ClearAndRedirect);
        }

        if let Some(ref user) = response.user {
            self.set_user(Some(user.clone()));
        }

        if let Some(user_id) = response.effective_user_id() {
            self.set_user_id(Some(user_id.to_string()));
        }

        let role = response.effective_role().cloned();
        if let Some(ref role) = role {
            self.set_role(Some(role.clone()));
        }

        let destination = if role.as_ref().is_some_and(Role::is_admin) {
            ADMIN_ROUTE
        } else {
            STUDENT_ROUTE
        };
        info!(
            email,
            role = role.as_ref().map(Role::as_str).unwrap_or(""),
            destination,
            "Login successful"
        );
        self.inner.router.push(destination);

        Ok(Some(response))
    }

    /// Refresh the profile of the current user.
    ///
    /// Returns `None` without touching the network when no user id is known.
    /// Failures are recorded in `error` and also yield `None`. A successful
    /// refresh re-arms the expiry timer from the persisted expiry timestamp,
    /// or logs out straight away if that time has already passed.
    ///
    /// The re-armed timer replaces any timer set by [`login`](Self::login),
    /// so after a refresh, expiry runs the full [`logout`](Self::logout)
    /// (reload inside `/student`, otherwise push `/student`, every key
    /// removed) rather than the login-time clear that pushes `/login` and
    /// keeps `tokenExpiration`.
    pub async fn fetch_user_profile(&self) -> Option<UserProfile> {
        let Some(user_id) = self.user_id() else {
            warn!("User ID not available, cannot fetch profile");
            return None;
        };

        self.set_loading(true);
        let _loading = LoadingGuard { store: self };

        match self.refresh_profile(&user_id).await {
            Ok(profile) => profile,
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "Failed to fetch user profile");
                self.set_error(Some(e.message_or(PROFILE_UNAVAILABLE)));
                None
            }
        }
    }

    async fn refresh_profile(&self, user_id: &str) -> Result<Option<UserProfile>, AuthError> {
        let profile = self
            .inner
            .api
            .get_user(user_id)
            .await?
            .ok_or(AuthError::ProfileNotFound)?;

        let current_role = self.user_role();
        self.set_user(Some(profile.clone()));
        if let Some(role) = profile.role() {
            if current_role.as_ref() != Some(role) {
                info!(from = ?current_role, to = %role, "Role changed on server");
                self.set_role(Some(role.clone()));
            }
        }

        if let Some(remaining) = self.remaining_lifetime_ms() {
            if remaining <= 0 {
                info!("Token has expired");
                self.logout();
                return Ok(None);
            }
            self.arm_expiry(Duration::from_millis(remaining.unsigned_abs()), ExpiryAction::Logout);
        }

        Ok(Some(profile))
    }

    /// End the session, choosing the destination from the current route:
    /// outside the student area the user is sent there, inside it the view
    /// is reloaded.
    pub fn logout(&self) {
        self.end_session();
        if self.inner.router.current_path().starts_with(STUDENT_ROUTE) {
            self.inner.router.reload();
        } else {
            self.inner.router.push(STUDENT_ROUTE);
        }
    }

    /// End the session and navigate to the student landing route.
    pub fn logout_and_redirect(&self) {
        self.end_session();
        self.inner.router.push(STUDENT_ROUTE);
    }

    /// End the session and reload the current view.
    pub fn logout_and_reload(&self) {
        self.end_session();
        self.inner.router.reload();
    }

    /// Rebuild the session from storage on startup.
    ///
    /// Never fails: an expired token triggers logout, and a failed profile
    /// refresh is logged and left in `error`.
    pub async fn check_auth_state(&self) {
        let Some(token) = self.inner.storage.get(keys::TOKEN).filter(|t| !t.is_empty()) else {
            debug!("No stored token found");
            return;
        };

        if self.remaining_lifetime_ms().is_some_and(|remaining| remaining <= 0) {
            info!("Stored token has expired");
            self.logout();
            return;
        }

        debug!("Found stored token, restoring session");
        self.set_token(Some(token));

        let saved_role = self.stored_value(keys::ROLE).map(Role::new);
        if let Some(ref role) = saved_role {
            self.set_role(Some(role.clone()));
        }

        let saved_user_id = self.stored_value(keys::USER_ID);
        if let Some(ref user_id) = saved_user_id {
            self.set_user_id(Some(user_id.clone()));
        }

        if let Some(blob) = self.inner.storage.get(keys::USER_DATA) {
            match serde_json::from_str::<StoredUserData>(&blob) {
                Ok(data) => {
                    self.set_user(Some(data.into_profile(saved_user_id.clone(), saved_role.clone())));
                }
                Err(e) => warn!(error = %e, "Error parsing stored user data"),
            }
        }

        if saved_user_id.is_some() && self.fetch_user_profile().await.is_none() {
            if let Some(error) = self.auth_error() {
                warn!(error = %error, "Failed to fetch updated user profile");
            }
        }
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn begin_workflow(&self) -> LoadingGuard<'_> {
        {
            let mut state = self.inner.state.lock();
            state.loading = true;
            state.error = None;
        }
        LoadingGuard { store: self }
    }

    fn end_session(&self) {
        for key in keys::ALL {
            self.unpersist(key);
        }
        self.inner.api.clear_token();
        self.inner.expiry.cancel();
        self.clear_auth();
        info!("Logged out");
    }

    fn arm_expiry(&self, delay: Duration, action: ExpiryAction) {
        let store: Weak<Inner> = Arc::downgrade(&self.inner);
        debug!(delay_ms = delay.as_millis() as u64, ?action, "Arming expiry timer");
        self.inner.expiry.arm(self.token(), move |generation| async move {
            tokio::time::sleep(delay).await;
            if let Some(inner) = store.upgrade() {
                SessionStore { inner }.on_expiry(generation, action);
            }
        });
    }

    fn on_expiry(&self, generation: u64, action: ExpiryAction) {
        let Some(armed_for) = self.inner.expiry.claim(generation) else {
            return;
        };
        if armed_for != self.token() {
            debug!("Expiry timer belongs to a replaced session, ignoring");
            return;
        }

        info!(?action, "Session expired");
        match action {
            ExpiryAction::ClearAndRedirect => {
                self.clear_auth();
                self.inner.router.push(LOGIN_ROUTE);
            }
            ExpiryAction::Logout => self.logout(),
        }
    }

    fn stored_value(&self, key: &str) -> Option<String> {
        self.inner.storage.get(key).filter(|v| !v.is_empty())
    }

    fn stored_expiration(&self) -> Option<i64> {
        let raw = self.stored_value(keys::TOKEN_EXPIRATION)?;
        match raw.trim().parse::<i64>() {
            Ok(millis) => Some(millis),
            Err(e) => {
                warn!(value = %raw, error = %e, "Ignoring unreadable token expiration");
                None
            }
        }
    }

    /// Milliseconds until the persisted expiry; zero or negative once elapsed.
    fn remaining_lifetime_ms(&self) -> Option<i64> {
        self.stored_expiration()
            .map(|expires_at| expires_at.saturating_sub(now_millis()))
    }

    fn persist(&self, key: &str, value: &str) {
        if let Err(e) = self.inner.storage.set(key, value) {
            warn!(key, error = %e, "Failed to persist session value");
        }
    }

    fn unpersist(&self, key: &str) {
        if let Err(e) = self.inner.storage.remove(key) {
            warn!(key, error = %e, "Failed to remove session value");
        }
    }
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}
