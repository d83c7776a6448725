use std::fmt;
use std::path::PathBuf;

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::session::{unix_now, Credential, CredentialCache};
use crate::api::client::{HttpClient, RequestOptions};
use crate::api::ApiError;

/// Portal path of the token endpoint, relative to the host
pub const LOGIN_PATH: &str = "token/login";

/// Placeholder used when no username is configured
pub const USERNAME_PLACEHOLDER: &str = "USERNAME_NEEDED";

/// Placeholder used when no password is configured
pub const PASSWORD_PLACEHOLDER: &str = "PASSWORD_NEEDED";

#[derive(Clone, PartialEq, Eq)]
pub struct LoginCredentials {
    pub username: String,
    pub password: String,
}

impl LoginCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// True when either field still holds its "not configured" placeholder
    pub fn is_placeholder(&self) -> bool {
        self.username == USERNAME_PLACEHOLDER || self.password == PASSWORD_PLACEHOLDER
    }
}

impl Default for LoginCredentials {
    fn default() -> Self {
        Self::new(USERNAME_PLACEHOLDER, PASSWORD_PLACEHOLDER)
    }
}

impl fmt::Debug for LoginCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    auth_token: String,
}

/// Where a resolved token came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenOrigin {
    Cache,
    Login,
}

/// Produces portal tokens, reusing the cached one until it expires.
pub struct LoginManager {
    http: HttpClient,
    cache: CredentialCache,
    credentials: LoginCredentials,
}

impl LoginManager {
    pub fn new(client: Client, host: &str, cache_dir: PathBuf, credentials: LoginCredentials) -> Self {
        Self {
            http: HttpClient::with_client(client, host, LOGIN_PATH),
            cache: CredentialCache::new(cache_dir),
            credentials,
        }
    }

    pub fn cache(&self) -> &CredentialCache {
        &self.cache
    }

    pub fn login_url(&self) -> &str {
        self.http.url()
    }

    /// Return a usable token, logging in only when the cache has none or it expired
    pub async fn token(&self) -> Result<String, ApiError> {
        self.resolve().await.map(|(token, _)| token)
    }

    pub async fn resolve(&self) -> Result<(String, TokenOrigin), ApiError> {
        if let Some(credential) = self.cache.read() {
            if !CredentialCache::is_expired(credential.reference_time, unix_now()) {
                debug!("Using cached portal token");
                return Ok((credential.token, TokenOrigin::Cache));
            }
            debug!(reference_time = credential.reference_time, "Cached portal token expired");
        }

        let token = self.login().await?;
        Ok((token, TokenOrigin::Login))
    }

    /// Authenticate against the token endpoint and cache the new token.
    /// Failures are returned as `ApiError::Login`; there is no retry.
    pub async fn login(&self) -> Result<String, ApiError> {
        if self.credentials.is_placeholder() {
            warn!(
                username = %self.credentials.username,
                "Portal credentials are not configured, login will use placeholders"
            );
        }

        let options = RequestOptions::new().form([
            ("username", self.credentials.username.as_str()),
            ("password", self.credentials.password.as_str()),
        ]);
        let response: LoginResponse = self
            .http
            .post(options)
            .await
            .map_err(|e| ApiError::Login(Box::new(e)))?;

        let credential = Credential::new(response.auth_token);
        self.cache
            .write(&credential)
            .map_err(|e| ApiError::Login(Box::new(ApiError::Cache(format!("{:#}", e)))))?;

        info!(user = %self.credentials.username, "Logged in to portal");
        Ok(credential.token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::client::build_client;
    use mockito::Matcher;
    use tempfile::tempdir;

    fn manager(server: &mockito::Server, cache_dir: PathBuf) -> LoginManager {
        LoginManager::new(
            build_client().unwrap(),
            &format!("{}/", server.url()),
            cache_dir,
            LoginCredentials::new("alice", "secret"),
        )
    }

    #[tokio::test]
    async fn test_no_cache_logs_in_once_and_writes_cache() {
        let mut server = mockito::Server::new_async().await;
        let login = server
            .mock("POST", "/token/login")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("username".into(), "alice".into()),
                Matcher::UrlEncoded("password".into(), "secret".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"auth_token": "fresh"}"#)
            .expect(1)
            .create_async()
            .await;

        let dir = tempdir().unwrap();
        let cache_dir = dir.path().join("cache");
        let manager = manager(&server, cache_dir.clone());

        let (token, origin) = manager.resolve().await.unwrap();
        assert_eq!(token, "fresh");
        assert_eq!(origin, TokenOrigin::Login);
        login.assert_async().await;

        let cached = manager.cache().read().unwrap();
        assert_eq!(cached.token, "fresh");
        assert!(!cached.is_expired());
        assert!(cache_dir.join("portal.json").exists());
    }

    #[tokio::test]
    async fn test_fresh_cache_skips_login() {
        let mut server = mockito::Server::new_async().await;
        let login = server
            .mock("POST", "/token/login")
            .expect(0)
            .create_async()
            .await;

        let dir = tempdir().unwrap();
        let manager = manager(&server, dir.path().to_path_buf());
        manager
            .cache()
            .write(&Credential::new("cached".to_string()))
            .unwrap();

        let (token, origin) = manager.resolve().await.unwrap();
        assert_eq!(token, "cached");
        assert_eq!(origin, TokenOrigin::Cache);
        login.assert_async().await;
    }

    #[tokio::test]
    async fn test_expired_cache_logs_in_and_overwrites() {
        let mut server = mockito::Server::new_async().await;
        let login = server
            .mock("POST", "/token/login")
            .with_status(200)
            .with_body(r#"{"auth_token": "renewed"}"#)
            .expect(1)
            .create_async()
            .await;

        let dir = tempdir().unwrap();
        let manager = manager(&server, dir.path().to_path_buf());
        std::fs::write(
            manager.cache().path(),
            format!(r#"{{"referenceTime": {}, "token": "abc"}}"#, unix_now() - 700_000.0),
        )
        .unwrap();

        assert_eq!(manager.token().await.unwrap(), "renewed");
        login.assert_async().await;

        let cached = manager.cache().read().unwrap();
        assert_eq!(cached.token, "renewed");
        assert!(!cached.is_expired());
    }

    #[tokio::test]
    async fn test_login_failure_propagates() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/token/login")
            .with_status(400)
            .with_body(r#"{"non_field_errors": ["Unable to log in"]}"#)
            .create_async()
            .await;

        let dir = tempdir().unwrap();
        let manager = manager(&server, dir.path().to_path_buf());

        let err = manager.token().await.unwrap_err();
        assert!(matches!(err, ApiError::Login(_)));
        assert_eq!(err.status(), Some(400));
        assert!(manager.cache().read().is_none());
    }

    #[tokio::test]
    async fn test_missing_auth_token_is_login_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/token/login")
            .with_status(200)
            .with_body(r#"{"token": "wrong-field"}"#)
            .create_async()
            .await;

        let dir = tempdir().unwrap();
        let manager = manager(&server, dir.path().to_path_buf());

        let err = manager.token().await.unwrap_err();
        match err {
            ApiError::Login(inner) => assert!(matches!(*inner, ApiError::InvalidResponse(_))),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_placeholder_credentials() {
        assert!(LoginCredentials::default().is_placeholder());
        assert!(!LoginCredentials::new("alice", "secret").is_placeholder());

        let debug = format!("{:?}", LoginCredentials::new("alice", "secret"));
        assert!(debug.contains("alice"));
        assert!(!debug.contains("secret"));
    }

    #[test]
    fn test_login_url() {
        let manager = LoginManager::new(
            build_client().unwrap(),
            "https://portal.example.com/",
            PathBuf::from("/tmp/unused"),
            LoginCredentials::default(),
        );
        assert_eq!(manager.login_url(), "https://portal.example.com/token/login");
    }
}
