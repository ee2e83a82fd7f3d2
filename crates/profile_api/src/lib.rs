//! Client for the remote commander profile service.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use shared::domain::Profile;
use thiserror::Error;
use tracing::debug;
use url::Url;

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("profile service is unavailable")]
    Unavailable,
    #[error("invalid profile service url '{url}': {source}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },
    #[error("profile request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("profile service rejected credentials ({0})")]
    Unauthorized(StatusCode),
    #[error("profile service returned unexpected status {0}")]
    UnexpectedStatus(StatusCode),
}

/// Source of point-in-time commander snapshots.
///
/// `Ok(None)` means the service answered but has no profile for us; an error
/// means the service could not be asked at all.
#[async_trait]
pub trait ProfileClient: Send + Sync {
    async fn fetch_profile(&self) -> Result<Option<Profile>, ProfileError>;
}

pub struct MissingProfileClient;

#[async_trait]
impl ProfileClient for MissingProfileClient {
    async fn fetch_profile(&self) -> Result<Option<Profile>, ProfileError> {
        Err(ProfileError::Unavailable)
    }
}

pub struct HttpProfileClient {
    http: Client,
    profile_url: Url,
    token: Option<String>,
}

impl HttpProfileClient {
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self, ProfileError> {
        let base = Url::parse(base_url.trim_end_matches('/')).map_err(|source| {
            ProfileError::InvalidUrl {
                url: base_url.to_string(),
                source,
            }
        })?;
        let profile_url = Url::parse(&format!("{}/profile", base.as_str().trim_end_matches('/')))
            .map_err(|source| ProfileError::InvalidUrl {
                url: base_url.to_string(),
                source,
            })?;
        let http = Client::builder()
            .timeout(DEFAULT_REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            profile_url,
            token: token.filter(|t| !t.trim().is_empty()),
        })
    }

    pub fn profile_url(&self) -> &Url {
        &self.profile_url
    }
}

#[async_trait]
impl ProfileClient for HttpProfileClient {
    async fn fetch_profile(&self) -> Result<Option<Profile>, ProfileError> {
        let mut request = self.http.get(self.profile_url.clone());
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let res = request.send().await?;
        let status = res.status();
        debug!(%status, url = %self.profile_url, "profile: fetched snapshot");

        if status == StatusCode::NOT_FOUND || status == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ProfileError::Unauthorized(status));
        }
        if !status.is_success() {
            return Err(ProfileError::UnexpectedStatus(status));
        }

        Ok(Some(res.json::<Profile>().await?))
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
