//! Authentication payloads.
//!
//! `POST {api}/auth` exchanges credentials for an [`AuthSession`]. The token
//! it carries goes into the `x-token` header and into the path of most
//! endpoints. Sessions are not refreshed; track [`AuthSession::expires_at`]
//! and authenticate again when needed.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, TimeDelta, Utc};
use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};

/// How `param1` of an [`AuthRequest`] is to be read by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum AuthType {
    /// `param1` is the clear-text password.
    Raw,
    /// `param1` is the base64-encoded MD5 digest of the password.
    Md5,
}

impl From<AuthType> for u8 {
    fn from(value: AuthType) -> Self {
        match value {
            AuthType::Raw => 0,
            AuthType::Md5 => 1,
        }
    }
}

impl TryFrom<u8> for AuthType {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Raw),
            1 => Ok(Self::Md5),
            other => Err(format!("unknown auth type {other}")),
        }
    }
}

/// Body posted to the auth endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthRequest {
    pub auth_type: AuthType,
    /// Account e-mail address.
    pub login: String,
    /// Password material, encoded according to `auth_type`.
    pub param1: String,
}

impl AuthRequest {
    /// Send the password as-is.
    pub fn raw(login: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            auth_type: AuthType::Raw,
            login: login.into(),
            param1: password.into(),
        }
    }

    /// Send base64(md5(password)) instead of the password.
    pub fn md5(login: impl Into<String>, password: &str) -> Self {
        Self {
            auth_type: AuthType::Md5,
            login: login.into(),
            param1: md5_param(password),
        }
    }
}

fn md5_param(password: &str) -> String {
    STANDARD.encode(Md5::digest(password.as_bytes()))
}

/// Result of a successful authentication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub token: String,
    /// Validity in minutes from issuance.
    pub expiration: i64,
    #[serde(skip, default = "Utc::now")]
    issued_at: DateTime<Utc>,
}

impl AuthSession {
    pub fn new(token: impl Into<String>, expiration: i64) -> Self {
        Self {
            token: token.into(),
            expiration,
            issued_at: Utc::now(),
        }
    }

    /// When the client received the session.
    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    /// `None` when the validity does not fit a calendar instant, which
    /// servers use to mean "never expires".
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        TimeDelta::try_minutes(self.expiration)
            .and_then(|validity| self.issued_at.checked_add_signed(validity))
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at() {
            Some(at) => now >= at,
            None => self.expiration < 0,
        }
    }
}
