//! Authenticated portal client.
//!
//! Every verb resolves a token through the `LoginManager` and sends it as
//! `Authorization: Token <token>`. Failures are classified as follows:
//!
//! - 401: returned as `Outcome::Unauthorized`. No re-login happens within
//!   the call, so a cached token the server has revoked keeps failing
//!   until it expires locally.
//! - other non-2xx: returned as `Err(ApiError::HttpStatus)`.
//! - transport or decode failures: logged, returned as `Outcome::Unavailable`.
//! - login failures: returned as `Err(ApiError::Login)`.

use std::fmt::Display;
use std::path::PathBuf;

use anyhow::Context;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::{error, warn};

use super::client::{build_client, HttpClient, RequestOptions};
use super::ApiError;
use crate::auth::{LoginCredentials, LoginManager};
use crate::config::Config;

/// Result of an authenticated call that did not fail outright.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Data(T),
    /// The portal answered 401
    Unauthorized,
    /// Transport or decode failure, with the logged message
    Unavailable(String),
}

impl<T> Outcome<T> {
    /// Collapse both kinds of absence into `None`
    pub fn into_data(self) -> Option<T> {
        match self {
            Outcome::Data(data) => Some(data),
            Outcome::Unauthorized | Outcome::Unavailable(_) => None,
        }
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            Outcome::Data(data) => Some(data),
            _ => None,
        }
    }

    pub fn is_data(&self) -> bool {
        matches!(self, Outcome::Data(_))
    }
}

pub struct PortalApi {
    http: HttpClient,
    login: LoginManager,
}

impl PortalApi {
    /// Create a client for `host + target_path` with its own connection pool
    pub fn new(
        host: &str,
        target_path: &str,
        cache_dir: PathBuf,
        credentials: LoginCredentials,
    ) -> Result<Self, ApiError> {
        Ok(Self::with_client(
            build_client()?,
            host,
            target_path,
            cache_dir,
            credentials,
        ))
    }

    /// Create a client on an existing connection pool. The login manager
    /// shares the same pool.
    pub fn with_client(
        client: Client,
        host: &str,
        target_path: &str,
        cache_dir: PathBuf,
        credentials: LoginCredentials,
    ) -> Self {
        Self {
            login: LoginManager::new(client.clone(), host, cache_dir, credentials),
            http: HttpClient::with_client(client, host, target_path),
        }
    }

    /// Build a client for `target_path` on the configured portal server,
    /// sharing `client`'s connection pool
    pub fn from_config(config: &Config, client: &Client, target_path: &str) -> anyhow::Result<Self> {
        let host = config
            .portal_server()
            .context("Failed to create portal client")?;
        Ok(Self::with_client(
            client.clone(),
            &host,
            target_path,
            config.cache_dir(),
            config.login_credentials(),
        ))
    }

    pub fn url(&self) -> &str {
        self.http.url()
    }

    pub fn login(&self) -> &LoginManager {
        &self.login
    }

    async fn authorize(&self, options: RequestOptions) -> Result<RequestOptions, ApiError> {
        let token = self.login.token().await?;
        Ok(options.header("Authorization", format!("Token {}", token)))
    }

    fn classify<T>(verb: &str, url: &str, result: Result<T, ApiError>) -> Result<Outcome<T>, ApiError> {
        match result {
            Ok(data) => Ok(Outcome::Data(data)),
            Err(e) if e.is_unauthorized() => {
                warn!(verb = verb, url = url, "Portal rejected token (401), no data returned");
                Ok(Outcome::Unauthorized)
            }
            Err(e @ ApiError::HttpStatus { .. }) | Err(e @ ApiError::Login(_)) => Err(e),
            Err(e) => {
                error!(verb = verb, url = url, error = %e, "Portal request failed");
                Ok(Outcome::Unavailable(e.to_string()))
            }
        }
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        options: RequestOptions,
    ) -> Result<Outcome<T>, ApiError> {
        let options = self.authorize(options).await?;
        Self::classify("GET", self.url(), self.http.get(options).await)
    }

    pub async fn post<T: DeserializeOwned>(
        &self,
        options: RequestOptions,
    ) -> Result<Outcome<T>, ApiError> {
        let options = self.authorize(options).await?;
        Self::classify("POST", self.url(), self.http.post(options).await)
    }

    pub async fn patch<T: DeserializeOwned>(
        &self,
        id: impl Display,
        options: RequestOptions,
    ) -> Result<Outcome<T>, ApiError> {
        let options = self.authorize(options).await?;
        Self::classify("PATCH", self.url(), self.http.patch(id, options).await)
    }

    pub async fn put<T: DeserializeOwned>(
        &self,
        id: impl Display,
        options: RequestOptions,
    ) -> Result<Outcome<T>, ApiError> {
        let options = self.authorize(options).await?;
        Self::classify("PUT", self.url(), self.http.put(id, options).await)
    }

    pub async fn delete<T: DeserializeOwned>(
        &self,
        id: impl Display,
        options: RequestOptions,
    ) -> Result<Outcome<T>, ApiError> {
        let options = self.authorize(options).await?;
        Self::classify("DELETE", self.url(), self.http.delete(id, options).await)
    }
}
