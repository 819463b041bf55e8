//! HTTP client for the Sia daemon API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use url::form_urlencoded;

use super::StorageNetwork;
use super::types::{FilterMode, FilterModeRequest, Host, HostDbAll, HostPublicKey, RenterState};
use crate::allowance::AllowanceUpdate;
use crate::config::Config;
use crate::{Error, Result};

/// The daemon refuses requests from any other agent.
pub const SIA_USER_AGENT: &str = "Sia-Agent";

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    message: String,
}

#[derive(Clone)]
pub struct SiaClient {
    http: reqwest::Client,
    base_url: String,
    password: SecretString,
}

impl std::fmt::Debug for SiaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SiaClient")
            .field("base_url", &self.base_url)
            .field("password", &"[redacted]")
            .finish()
    }
}

impl SiaClient {
    pub fn new(
        base_url: impl Into<String>,
        password: SecretString,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(Error::Network)?;
        Ok(Self::with_http(http, base_url, password))
    }

    pub fn with_http(http: reqwest::Client, base_url: impl Into<String>, password: SecretString) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            password,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            config.api_base_url(),
            config.sia_api_password.clone(),
            config.request_timeout(),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.base_url, path))
            .header(USER_AGENT, SIA_USER_AGENT)
            .basic_auth("", Some(self.password.expose_secret()))
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let response = request.send().await.map_err(Error::Network)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorResponse>(&body)
            .map(|e| e.message)
            .ok()
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| {
                if body.is_empty() {
                    status.to_string()
                } else {
                    body
                }
            });
        Err(Error::Api {
            message,
            status: Some(status.as_u16()),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.send(self.request(reqwest::Method::GET, path)).await?;
        let body = response.bytes().await.map_err(Error::Network)?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl StorageNetwork for SiaClient {
    async fn hosts(&self) -> Result<Vec<Host>> {
        let all: HostDbAll = self.get_json("/hostdb/all").await?;
        Ok(all.hosts)
    }

    async fn replace_whitelist(&self, hosts: &[HostPublicKey]) -> Result<()> {
        let body = FilterModeRequest {
            filter_mode: FilterMode::Whitelist,
            hosts,
        };
        let request = self
            .request(reqwest::Method::POST, "/hostdb/filtermode")
            .json(&body);
        self.send(request).await?;
        Ok(())
    }

    async fn renter(&self) -> Result<RenterState> {
        self.get_json("/renter").await
    }

    async fn update_allowance(&self, update: &AllowanceUpdate) -> Result<()> {
        let body = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(update.form_pairs())
            .finish();
        let request = self
            .request(reqwest::Method::POST, "/renter")
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body);
        self.send(request).await?;
        Ok(())
    }
}
