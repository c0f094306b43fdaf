//! Async job orchestration.
//!
//! Turns a job-submitting call plus a status endpoint into one polling loop:
//!
//! ```text
//!   submit() ──→ handle ──┬──→ status < 400 ──→ sleep(poll_interval) ──→ GET status ──┐
//!                         │                                                           │
//!                         │  ◄────────────────────── replace handle ◄──────────────────┘
//!                         │
//!                         └──→ status >= 400 ──→ return handle (Done | Error | Stopped | Killed)
//! ```
//!
//! ## Rules
//!
//! - Each fetched document replaces the handle wholesale.
//! - A failed fetch ends the wait with that error; nothing is retried here.
//! - A 404 on the status endpoint is a failed fetch too: the wait ends with
//!   [`ClientError::NotFound`].
//! - There is no built-in timeout. Cancel through the
//!   [`CancellationToken`]; the loop notices it while sleeping, issues no
//!   further request, and returns [`ClientError::Cancelled`] with the last
//!   fetched handle.

use std::time::Duration;

use reqwest::Method;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::DEFAULT_POLL_INTERVAL;
use crate::error::{ClientError, ClientResult};
use crate::job::{JobHandle, JobId};
use crate::transport::{RawResponse, RequestBody, Transport};

/// Submits jobs and waits for them through a [`Transport`].
#[derive(Debug, Clone)]
pub struct JobOrchestrator<'a, T: ?Sized> {
    transport: &'a T,
    poll_interval: Duration,
    cancel: CancellationToken,
}

impl<'a, T: Transport + ?Sized> JobOrchestrator<'a, T> {
    pub fn new(transport: &'a T) -> Self {
        Self {
            transport,
            poll_interval: DEFAULT_POLL_INTERVAL,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Abandon waits when `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Issue a job-creating request and return the handle it answers with.
    ///
    /// A 404, an empty body or a JSON `null` means the server created
    /// nothing and yields [`ClientError::NoJobCreated`].
    pub async fn submit(
        &self,
        method: Method,
        url: &str,
        body: RequestBody,
    ) -> ClientResult<JobHandle> {
        let response = self.transport.send(method, url, body).await?;
        let handle = parse_submitted(response, url)?;
        info!(job = %handle.id, status = %handle.status, "job submitted");
        Ok(handle)
    }

    /// Poll until the job is terminal.
    ///
    /// `status_url` builds the status endpoint for a job id. `on_progress`
    /// sees the initial handle and every fetched one. A status endpoint
    /// answering 404 ends the wait with [`ClientError::NotFound`].
    pub async fn await_completion<F, P>(
        &self,
        handle: JobHandle,
        status_url: F,
        mut on_progress: P,
    ) -> ClientResult<JobHandle>
    where
        F: Fn(&JobId) -> String,
        P: FnMut(&JobHandle),
    {
        let mut current = handle;
        on_progress(&current);

        while current.status.is_in_progress() {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    info!(job = %current.id, status = %current.status, "job wait cancelled");
                    return Err(ClientError::Cancelled { last: Box::new(current) });
                }
                _ = tokio::time::sleep(self.poll_interval) => {}
            }

            let url = status_url(&current.id);
            let response = self
                .transport
                .send(Method::GET, &url, RequestBody::Empty)
                .await?;
            let next: JobHandle = response.json(&url)?;
            if next.status != current.status {
                info!(
                    job = %next.id,
                    from = %current.status,
                    to = %next.status,
                    "job status changed"
                );
            } else {
                debug!(
                    job = %next.id,
                    status = %next.status,
                    percent = next.percent,
                    "job progress"
                );
            }
            current = next;
            on_progress(&current);
        }

        Ok(current)
    }

    /// [`submit`](Self::submit) followed by
    /// [`await_completion`](Self::await_completion).
    pub async fn run<F, P>(
        &self,
        method: Method,
        url: &str,
        body: RequestBody,
        status_url: F,
        on_progress: P,
    ) -> ClientResult<JobHandle>
    where
        F: Fn(&JobId) -> String,
        P: FnMut(&JobHandle),
    {
        let handle = self.submit(method, url, body).await?;
        self.await_completion(handle, status_url, on_progress).await
    }
}

fn parse_submitted(response: RawResponse, url: &str) -> ClientResult<JobHandle> {
    let no_job = || ClientError::NoJobCreated {
        url: url.to_string(),
    };
    if response.is_not_found() || response.body().iter().all(u8::is_ascii_whitespace) {
        return Err(no_job());
    }
    response.json::<Option<JobHandle>>(url)?.ok_or_else(no_job)
}
