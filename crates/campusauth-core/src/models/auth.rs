use serde::{Deserialize, Serialize};

use super::{deserialize_opt_id, deserialize_opt_lifetime, non_empty, Role, UserProfile};

/// Body of a successful `POST /auth/register`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegisterResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Body of a successful `POST /auth/login`.
///
/// Identity may arrive at the top level, nested under `user`, or both; the
/// `effective_*` accessors apply the precedence the session store uses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoginResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Token lifetime in seconds.
    #[serde(
        rename = "expiresIn",
        default,
        deserialize_with = "deserialize_opt_lifetime",
        skip_serializing_if = "Option::is_none"
    )]
    pub expires_in: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserProfile>,
    #[serde(
        rename = "userId",
        default,
        deserialize_with = "deserialize_opt_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl LoginResponse {
    pub fn token(&self) -> Option<&str> {
        non_empty(self.token.as_deref())
    }

    /// Lifetime in seconds; zero is treated as "no expiry given".
    pub fn expires_in(&self) -> Option<u64> {
        self.expires_in.filter(|secs| *secs > 0)
    }

    /// Top-level `userId`, else `user.userId`.
    pub fn effective_user_id(&self) -> Option<&str> {
        non_empty(self.user_id.as_deref())
            .or_else(|| self.user.as_ref().and_then(UserProfile::user_id))
    }

    /// Top-level `role`, else `user.role`.
    pub fn effective_role(&self) -> Option<&Role> {
        self.role
            .as_ref()
            .filter(|r| !r.is_empty())
            .or_else(|| self.user.as_ref().and_then(UserProfile::role))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_level_identity_wins() {
        let resp: LoginResponse = serde_json::from_str(
            r#"{"token": "t1", "userId": "top", "role": "admin",
                "user": {"userId": "nested", "role": "student"}}"#,
        )
        .unwrap();
        assert_eq!(resp.effective_user_id(), Some("top"));
        assert_eq!(resp.effective_role().map(Role::as_str), Some("admin"));
    }

    #[test]
    fn test_nested_identity_is_fallback() {
        let resp: LoginResponse = serde_json::from_str(
            r#"{"token": "t1", "user": {"userId": 12, "role": "student"}}"#,
        )
        .unwrap();
        assert_eq!(resp.effective_user_id(), Some("12"));
        assert!(resp.effective_role().unwrap().is_student());
    }

    #[test]
    fn test_empty_token_and_zero_expiry_are_absent() {
        let resp: LoginResponse =
            serde_json::from_str(r#"{"token": "", "expiresIn": 0}"#).unwrap();
        assert_eq!(resp.token(), None);
        assert_eq!(resp.expires_in(), None);
    }

    fn lifetime(raw: &str) -> Option<u64> {
        let body = format!(r#"{{"token": "t1", "expiresIn": {}}}"#, raw);
        let resp: LoginResponse = serde_json::from_str(&body).unwrap();
        resp.expires_in()
    }

    #[test]
    fn test_expires_in_accepts_integer_float_and_string() {
        assert_eq!(lifetime("3600"), Some(3600));
        assert_eq!(lifetime("3600.0"), Some(3600));
        assert_eq!(lifetime(r#""3600""#), Some(3600));
        assert_eq!(lifetime("0.25"), Some(1));
    }

    #[test]
    fn test_unusable_expires_in_means_no_expiry() {
        assert_eq!(lifetime("-5"), None);
        assert_eq!(lifetime(r#""soon""#), None);
        assert_eq!(lifetime(r#""0""#), None);
        assert_eq!(lifetime("null"), None);
        assert_eq!(lifetime("true"), None);

        // The token itself still parses
        let resp: LoginResponse =
            serde_json::from_str(r#"{"token": "t1", "expiresIn": "soon"}"#).unwrap();
        assert_eq!(resp.token(), Some("t1"));
    }

    #[test]
    fn test_register_response_defaults_to_unsuccessful() {
        let resp: RegisterResponse = serde_json::from_str(r#"{"id": 3}"#).unwrap();
        assert!(!resp.success);
        assert_eq!(resp.extra.get("id").and_then(|v| v.as_u64()), Some(3));
    }
}
