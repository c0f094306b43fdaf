//! Client configuration.

use std::time::Duration;

use crate::error::{ClientError, ClientResult};

/// Public portal used when no endpoint is configured.
pub const DEFAULT_ENDPOINT: &str = "https://portal.quantforce.net";

/// Delay between two job status fetches.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Header carrying the session token.
pub const TOKEN_HEADER: &str = "x-token";

/// Settings for [`crate::RestClient`] and [`crate::QuantForceClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Service root, without the `api/v1.0` suffix.
    pub endpoint: String,
    /// Delay between job status fetches.
    pub poll_interval: Duration,
    /// Per-request timeout. `None` keeps reqwest's default (no timeout).
    pub request_timeout: Option<Duration>,
    pub user_agent: String,
    /// Accept self-signed or otherwise invalid TLS certificates.
    pub accept_invalid_certs: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            request_timeout: None,
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string(),
            accept_invalid_certs: false,
        }
    }
}

impl ClientConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }

    /// Reject settings that cannot produce a working client.
    pub fn validate(&self) -> ClientResult<()> {
        let endpoint = self.endpoint.trim();
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(ClientError::Configuration(format!(
                "endpoint must be an http(s) URL, got '{endpoint}'"
            )));
        }
        if self.poll_interval.is_zero() {
            return Err(ClientError::Configuration(
                "poll interval must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}
