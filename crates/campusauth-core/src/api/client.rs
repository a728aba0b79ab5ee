//! HTTP implementation of [`AuthApi`] on top of reqwest.

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::{header, Client, Url};
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use crate::models::{LoginResponse, RegisterResponse, UserProfile};

use super::{ApiError, AuthApi};

#[derive(Debug, Serialize)]
struct RegisterRequest<'a> {
    name: &'a str,
    email: &'a str,
    password: &'a str,
    role: &'a str,
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

/// API client for the learning platform.
///
/// The bearer token lives behind a lock so the session store can swap it
/// through a shared reference while requests are in flight.
pub struct HttpApiClient {
    client: Client,
    base_url: Url,
    token: RwLock<Option<String>>,
}

impl HttpApiClient {
    /// Create a client for `base_url`. Requests have no timeout unless one is given.
    pub fn new(base_url: impl Into<String>, timeout: Option<Duration>) -> Result<Self, ApiError> {
        let raw = base_url.into();
        let base_url = Url::parse(raw.trim_end_matches('/'))
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {}", raw, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(format!("{}: cannot carry a path", raw)));
        }

        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            base_url,
            token: RwLock::new(None),
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Token currently attached to requests, if any.
    pub fn token(&self) -> Option<String> {
        self.token.read().clone()
    }

    /// Append path segments to the base URL. Each segment is percent-encoded,
    /// so `/`, `?` and `#` inside a value never change the route.
    fn url(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(format!("{}: cannot carry a path", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn user_url(&self, user_id: &str) -> Result<Url, ApiError> {
        if matches!(user_id, "" | "." | "..") {
            return Err(ApiError::InvalidUrl(format!("Unusable user id {:?}", user_id)));
        }
        self.url(&["users", user_id])
    }

    fn auth_headers(&self) -> Result<header::HeaderMap, ApiError> {
        let mut headers = header::HeaderMap::new();
        if let Some(ref token) = *self.token.read() {
            let value = header::HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| ApiError::InvalidResponse(format!("Unusable token: {}", e)))?;
            headers.insert(header::AUTHORIZATION, value);
        }
        Ok(headers)
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    async fn parse_body<T: DeserializeOwned>(
        response: reqwest::Response,
        url: &Url,
    ) -> Result<T, ApiError> {
        let body = response.text().await?;
        serde_json::from_str(&body)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse response from {}: {}", url, e)))
    }

    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        debug!(url = %url, "GET");
        let response = self
            .client
            .get(url.clone())
            .headers(self.auth_headers()?)
            .send()
            .await?;

        let response = Self::check_response(response).await?;
        Self::parse_body(response, &url).await
    }

    async fn post<T: DeserializeOwned, B: Serialize>(&self, url: Url, body: &B) -> Result<T, ApiError> {
        debug!(url = %url, "POST");
        let response = self
            .client
            .post(url.clone())
            .headers(self.auth_headers()?)
            .json(body)
            .send()
            .await?;

        let response = Self::check_response(response).await?;
        Self::parse_body(response, &url).await
    }
}

#[async_trait]
impl AuthApi for HttpApiClient {
    async fn register_user(
        &self,
        name: &str,
        email: &str,
        password: &str,
        role: &str,
    ) -> Result<RegisterResponse, ApiError> {
        let body = RegisterRequest {
            name,
            email,
            password,
            role,
        };
        self.post(self.url(&["auth", "register"])?, &body).await
    }

    async fn login_user(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError> {
        self.post(self.url(&["auth", "login"])?, &LoginRequest { email, password }).await
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<UserProfile>, ApiError> {
        // `null` bodies deserialize to None
        self.get(self.user_url(user_id)?).await
    }

    fn setup_auth_token(&self, token: &str) {
        *self.token.write() = Some(token.to_string());
    }

    fn clear_token(&self) {
        *self.token.write() = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client = HttpApiClient::new("https://lms.example.com/api/", None).unwrap();
        assert_eq!(client.base_url(), "https://lms.example.com/api");
        assert_eq!(
            client.url(&["auth", "login"]).unwrap().as_str(),
            "https://lms.example.com/api/auth/login"
        );

        let root = HttpApiClient::new("https://lms.example.com", None).unwrap();
        assert_eq!(root.url(&["auth", "login"]).unwrap().path(), "/auth/login");
    }

    #[test]
    fn test_user_id_cannot_escape_users_path() {
        let client = HttpApiClient::new("https://lms.example.com/api", None).unwrap();
        let url = client.user_url("../admin/secret?x=1").unwrap();
        assert_eq!(url.path(), "/api/users/..%2Fadmin%2Fsecret%3Fx=1");
        assert_eq!(url.query(), None);
        assert_eq!(url.path_segments().map(|s| s.count()), Some(3));

        assert!(matches!(client.user_url(".."), Err(ApiError::InvalidUrl(_))));
        assert!(matches!(client.user_url(""), Err(ApiError::InvalidUrl(_))));
    }

    #[test]
    fn test_unparseable_base_url_is_rejected() {
        assert!(matches!(
            HttpApiClient::new("not a url", None),
            Err(ApiError::InvalidUrl(_))
        ));
        assert!(matches!(
            HttpApiClient::new("mailto:someone@example.com", None),
            Err(ApiError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_token_is_attached_and_cleared() {
        let client = HttpApiClient::new("https://lms.example.com", None).unwrap();
        assert!(client.auth_headers().unwrap().get(header::AUTHORIZATION).is_none());

        client.setup_auth_token("abc");
        let headers = client.auth_headers().unwrap();
        assert_eq!(headers.get(header::AUTHORIZATION).unwrap(), "Bearer abc");
        assert_eq!(client.token().as_deref(), Some("abc"));

        client.clear_token();
        assert!(client.auth_headers().unwrap().get(header::AUTHORIZATION).is_none());
    }

    #[test]
    fn test_token_with_newline_is_rejected() {
        let client = HttpApiClient::new("https://lms.example.com", None).unwrap();
        client.setup_auth_token("bad\ntoken");
        assert!(matches!(client.auth_headers(), Err(ApiError::InvalidResponse(_))));
    }

    #[test]
    fn test_request_bodies_use_api_field_names() {
        let body = serde_json::to_value(RegisterRequest {
            name: "Ada",
            email: "ada@example.com",
            password: "pw",
            role: "student",
        })
        .unwrap();
        assert_eq!(body["role"], "student");
        assert_eq!(body["email"], "ada@example.com");
    }

    mod http {
        use super::*;
        use serde_json::json;
        use wiremock::matchers::{body_json, header, method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        async fn client_for(server: &MockServer) -> HttpApiClient {
            HttpApiClient::new(format!("{}/api/", server.uri()), None).unwrap()
        }

        #[tokio::test]
        async fn test_login_posts_credentials() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/api/auth/login"))
                .and(body_json(json!({"email": "ada@example.com", "password": "pw"})))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "token": "t1",
                    "expiresIn": "3600",
                    "user": {"userId": 7, "role": "admin"}
                })))
                .expect(1)
                .mount(&server)
                .await;

            let resp = client_for(&server).await.login_user("ada@example.com", "pw").await.unwrap();
            assert_eq!(resp.token(), Some("t1"));
            assert_eq!(resp.expires_in(), Some(3600));
            assert_eq!(resp.effective_user_id(), Some("7"));
        }

        #[tokio::test]
        async fn test_register_posts_profile_with_role() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/api/auth/register"))
                .and(body_json(json!({
                    "name": "Ada",
                    "email": "ada@example.com",
                    "password": "pw",
                    "role": "student"
                })))
                .respond_with(ResponseTemplate::new(201).set_body_json(json!({"success": true})))
                .expect(1)
                .mount(&server)
                .await;

            let resp = client_for(&server)
                .await
                .register_user("Ada", "ada@example.com", "pw", "student")
                .await
                .unwrap();
            assert!(resp.success);
        }

        #[tokio::test]
        async fn test_get_user_sends_bearer_token() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/api/users/42"))
                .and(header("authorization", "Bearer abc"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "userId": 42,
                    "name": "Ada",
                    "role": "student"
                })))
                .expect(1)
                .mount(&server)
                .await;

            let client = client_for(&server).await;
            client.setup_auth_token("abc");
            let user = client.get_user("42").await.unwrap().unwrap();
            assert_eq!(user.user_id(), Some("42"));
            assert_eq!(user.display_name(), "Ada");
        }

        #[tokio::test]
        async fn test_get_user_null_body_is_none() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/api/users/9"))
                .respond_with(ResponseTemplate::new(200).set_body_string("null"))
                .mount(&server)
                .await;

            assert!(client_for(&server).await.get_user("9").await.unwrap().is_none());
        }

        #[tokio::test]
        async fn test_get_user_encodes_id_segment() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/api/users/a%2Fb%3Fc"))
                .respond_with(ResponseTemplate::new(200).set_body_string("null"))
                .expect(1)
                .mount(&server)
                .await;

            assert!(client_for(&server).await.get_user("a/b?c").await.unwrap().is_none());
        }

        #[tokio::test]
        async fn test_error_statuses_are_mapped() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/api/auth/login"))
                .respond_with(ResponseTemplate::new(401))
                .mount(&server)
                .await;
            Mock::given(method("GET"))
                .and(path("/api/users/404"))
                .respond_with(ResponseTemplate::new(404).set_body_string("no such user"))
                .mount(&server)
                .await;
            Mock::given(method("POST"))
                .and(path("/api/auth/register"))
                .respond_with(ResponseTemplate::new(409).set_body_json(json!({
                    "success": false,
                    "message": "Email already registered"
                })))
                .mount(&server)
                .await;

            let client = client_for(&server).await;
            assert!(matches!(
                client.login_user("ada@example.com", "wrong").await,
                Err(ApiError::Unauthorized)
            ));
            assert!(matches!(
                client.get_user("404").await,
                Err(ApiError::NotFound(ref body)) if body == "no such user"
            ));
            let err = client
                .register_user("Ada", "ada@example.com", "pw", "student")
                .await
                .unwrap_err();
            assert!(matches!(err, ApiError::Rejected(_)));
            assert_eq!(err.to_string(), "Email already registered");
        }

        #[tokio::test]
        async fn test_non_json_success_body_is_invalid_response() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/api/auth/login"))
                .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
                .mount(&server)
                .await;

            assert!(matches!(
                client_for(&server).await.login_user("ada@example.com", "pw").await,
                Err(ApiError::InvalidResponse(_))
            ));
        }
    }
}
