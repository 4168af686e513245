//! Control-plane route lookup
//!
//! Last resolution tier and source of truth. A GET with the credentials
//! and the shared auth token as query parameters, answered with a JSON
//! body carrying a success flag and the backend address.

use serde::Deserialize;

use crate::error::{ProxyError, Result};

#[derive(Debug, Deserialize)]
struct RouteLookupResponse {
    #[serde(default)]
    message: String,
    success: bool,
    #[serde(default)]
    backend_url: String,
}

/// HTTP client for the control plane's route table.
pub struct ControlPlaneClient {
    http: reqwest::Client,
    base_url: String,
    auth_token: String,
}

impl ControlPlaneClient {
    pub fn new(base_url: impl Into<String>, auth_token: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http: reqwest::Client::new(),
            base_url,
            auth_token: auth_token.into(),
        }
    }

    /// Look up the backend address for the given credentials.
    ///
    /// Transport errors, non-success statuses, and `success: false` bodies
    /// are all resolution failures. An empty `backend_url` is passed back
    /// to the caller, which treats it as all-tiers-empty.
    pub async fn lookup(&self, username: &str, password: &str) -> Result<String> {
        let url = format!("{}/api/v1/infra/rabbit/route-table", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(&[
                ("username", username),
                ("password", password),
                ("auth_token", self.auth_token.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProxyError::Resolution(format!(
                "route lookup returned {status}"
            )));
        }

        let body: RouteLookupResponse = response.json().await?;
        if !body.success {
            return Err(ProxyError::Resolution(body.message));
        }
        Ok(body.backend_url)
    }
}
