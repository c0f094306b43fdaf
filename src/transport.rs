//! HTTP transport.
//!
//! [`Transport`] is the seam every API call goes through. It sends one
//! request and classifies the outcome:
//!
//! | HTTP status | Outcome |
//! |-------------|---------|
//! | 2xx | `Ok(RawResponse)` |
//! | 404 | `Ok(RawResponse)` with [`RawResponse::is_not_found`] set |
//! | anything else | `Err(ClientError::Transport { status, body })` |
//!
//! Some endpoints answer 404 while a resource or job does not exist yet, so
//! 404 is left for the caller to branch on. The typed helpers of
//! [`TransportExt`] need a value and turn it into [`ClientError::NotFound`].
//!
//! The transport never retries; see [`ClientError::is_transient`].

use std::borrow::Cow;
use std::path::Path;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::config::{ClientConfig, TOKEN_HEADER};
use crate::error::{ClientError, ClientResult};

/// Payload of an outgoing request.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum RequestBody {
    #[default]
    Empty,
    /// Sent as `application/json`.
    Json(serde_json::Value),
    /// Sent as-is (file uploads).
    Raw(Bytes),
}

impl RequestBody {
    /// Encode `value` as a JSON body.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> ClientResult<Self> {
        serde_json::to_value(value)
            .map(Self::Json)
            .map_err(ClientError::Serialization)
    }

    pub fn raw(bytes: impl Into<Bytes>) -> Self {
        Self::Raw(bytes.into())
    }

    fn from_optional<T: Serialize + ?Sized>(value: Option<&T>) -> ClientResult<Self> {
        value.map_or(Ok(Self::Empty), Self::json)
    }
}

/// A response that passed the success policy (2xx or 404).
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    status: StatusCode,
    body: Bytes,
}

impl RawResponse {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn is_not_found(&self) -> bool {
        self.status == StatusCode::NOT_FOUND
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Fail with [`ClientError::NotFound`] if this is a 404.
    pub fn require_found(self, url: &str) -> ClientResult<Self> {
        if self.is_not_found() {
            return Err(ClientError::NotFound {
                url: url.to_string(),
            });
        }
        Ok(self)
    }

    /// Deserialize the body of a found response.
    pub fn json<T: DeserializeOwned>(self, url: &str) -> ClientResult<T> {
        let response = self.require_found(url)?;
        serde_json::from_slice(&response.body).map_err(|source| ClientError::Deserialization {
            source,
            body: response.text().into_owned(),
        })
    }
}

/// Apply the success policy to a status and the body read for it.
pub fn classify(status: StatusCode, body: Bytes) -> ClientResult<RawResponse> {
    if status.is_success() || status == StatusCode::NOT_FOUND {
        Ok(RawResponse::new(status, body))
    } else {
        Err(ClientError::Transport {
            status,
            body: String::from_utf8_lossy(&body).into_owned(),
        })
    }
}

/// Issues requests against the service.
///
/// Implementations must attach their configured headers to every request
/// and apply [`classify`] to the response.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one request.
    async fn send(&self, method: Method, url: &str, body: RequestBody)
    -> ClientResult<RawResponse>;

    /// GET `url` and stream the body into `destination`, creating or
    /// truncating it. Returns the number of bytes written.
    async fn download(&self, url: &str, destination: &Path) -> ClientResult<u64>;
}

/// Typed helpers available on every [`Transport`].
#[async_trait]
pub trait TransportExt: Transport {
    async fn get_typed<T: DeserializeOwned>(&self, url: &str) -> ClientResult<T> {
        self.send(Method::GET, url, RequestBody::Empty)
            .await?
            .json(url)
    }

    /// GET `url` and only require a found, successful response.
    async fn get_unit(&self, url: &str) -> ClientResult<()> {
        self.send(Method::GET, url, RequestBody::Empty)
            .await?
            .require_found(url)
            .map(|_| ())
    }

    async fn post_typed<T, B>(&self, url: &str, data: Option<&B>) -> ClientResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + Sync + ?Sized,
    {
        let body = RequestBody::from_optional(data)?;
        self.send(Method::POST, url, body).await?.json(url)
    }

    async fn put_typed<T, B>(&self, url: &str, data: Option<&B>) -> ClientResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + Sync + ?Sized,
    {
        let body = RequestBody::from_optional(data)?;
        self.send(Method::PUT, url, body).await?.json(url)
    }

    /// POST an uninterpreted byte body (file upload).
    async fn post_raw<T: DeserializeOwned>(&self, url: &str, bytes: Bytes) -> ClientResult<T> {
        self.send(Method::POST, url, RequestBody::Raw(bytes))
            .await?
            .json(url)
    }
}

impl<C: Transport + ?Sized> TransportExt for C {}

/// [`Transport`] over reqwest.
///
/// Headers are changed through `&mut self` only, so they cannot move under
/// requests that are in flight.
#[derive(Debug, Clone)]
pub struct RestClient {
    client: Client,
    headers: HeaderMap,
}

impl RestClient {
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let mut builder = Client::builder()
            .user_agent(config.user_agent.as_str())
            .danger_accept_invalid_certs(config.accept_invalid_certs);
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ClientError::Configuration(format!("cannot build HTTP client: {e}")))?;
        Ok(Self {
            client,
            headers: HeaderMap::new(),
        })
    }

    /// Set a header sent with every subsequent request.
    pub fn set_header(&mut self, name: &str, value: &str) -> ClientResult<()> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| ClientError::InvalidHeader(name.to_string()))?;
        let mut value =
            HeaderValue::from_str(value).map_err(|_| ClientError::InvalidHeader(name.to_string()))?;
        if name.as_str() == TOKEN_HEADER {
            value.set_sensitive(true);
        }
        self.headers.insert(name, value);
        Ok(())
    }

    /// Attach the session token to every subsequent request.
    pub fn set_token(&mut self, token: &str) -> ClientResult<()> {
        self.set_header(TOKEN_HEADER, token)
    }

    pub fn remove_header(&mut self, name: &str) {
        self.headers.remove(name);
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// `url` with the session token masked, for logs.
    fn redact<'a>(&self, url: &'a str) -> Cow<'a, str> {
        match self.headers.get(TOKEN_HEADER).and_then(|v| v.to_str().ok()) {
            Some(token) if !token.is_empty() && url.contains(token) => {
                Cow::Owned(url.replace(token, "***"))
            }
            _ => Cow::Borrowed(url),
        }
    }

    /// Send and fail on statuses outside the success policy, leaving the
    /// body unread otherwise.
    async fn execute(
        &self,
        method: Method,
        url: &str,
        body: RequestBody,
    ) -> ClientResult<reqwest::Response> {
        debug!(%method, url = %self.redact(url), "sending request");
        let request = self
            .client
            .request(method.clone(), url)
            .headers(self.headers.clone());
        let request = match body {
            RequestBody::Empty => request,
            RequestBody::Json(value) => request.json(&value),
            RequestBody::Raw(bytes) => request.body(bytes),
        };

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() || status == StatusCode::NOT_FOUND {
            return Ok(response);
        }

        let body = response.bytes().await?;
        warn!(%method, url = %self.redact(url), %status, "request failed");
        Err(ClientError::Transport {
            status,
            body: String::from_utf8_lossy(&body).into_owned(),
        })
    }
}

#[async_trait]
impl Transport for RestClient {
    async fn send(
        &self,
        method: Method,
        url: &str,
        body: RequestBody,
    ) -> ClientResult<RawResponse> {
        let response = self.execute(method, url, body).await?;
        let status = response.status();
        let body = response.bytes().await?;
        debug!(%status, bytes = body.len(), "response received");
        classify(status, body)
    }

    async fn download(&self, url: &str, destination: &Path) -> ClientResult<u64> {
        let response = self.execute(Method::GET, url, RequestBody::Empty).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound {
                url: url.to_string(),
            });
        }

        let mut file = tokio::fs::File::create(destination).await?;
        let mut stream = response.bytes_stream();
        let mut written: u64 = 0;
        let copied = async {
            while let Some(chunk) = stream.next().await {
                let chunk = chunk?;
                file.write_all(&chunk).await?;
                written += chunk.len() as u64;
            }
            file.flush().await?;
            Ok::<(), ClientError>(())
        }
        .await;
        drop(file);

        if let Err(e) = copied {
            warn!(path = %destination.display(), error = %e, "download interrupted");
            if let Err(remove) = tokio::fs::remove_file(destination).await {
                debug!(
                    path = %destination.display(),
                    error = %remove,
                    "could not remove partial download"
                );
            }
            return Err(e);
        }

        debug!(path = %destination.display(), bytes = written, "download complete");
        Ok(written)
    }
}
