//! Job lifecycle types.
//!
//! Every long-running server operation (dataset ingestion, binning, deploy)
//! reports its progress through the same status document:
//!
//! ```text
//!   submit() ──→ Waiting ──→ Queued ──→ Starting ──→ Running ──→ Done
//!                                                       │
//!                                                       ├──→ Error { message, stack }
//!                                                       ├──→ Stopped
//!                                                       └──→ Killed
//! ```
//!
//! **Invariants:**
//! - Status codes are ordered by magnitude; every code `>= 400` is terminal.
//! - `Killed` (500) is the largest code and still terminal, so callers must
//!   use [`JobStatus::is_terminal`] rather than comparing against `Done`.
//! - `result` is only meaningful once the status is terminal.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{ClientError, ClientResult};

/// Server-assigned identifier of a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Create a new job ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Status of a job, carried on the wire as its numeric code.
///
/// The ordering follows the codes: `Waiting < Queued < Starting < Running <
/// Done < Error < Stopped < Killed`. Codes this client does not know are
/// kept as [`JobStatus::Unknown`] and ordered by their value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobStatus {
    /// Accepted, not yet scheduled.
    Waiting,
    /// Scheduled for processing.
    Queued,
    /// Worker is starting up.
    Starting,
    /// Work in progress.
    Running,
    /// Finished successfully; `result` holds the output.
    Done,
    /// Finished with an error; `result` holds `{ message, stack }`.
    Error,
    /// Stopped on request before completion.
    Stopped,
    /// Killed by the server.
    Killed,
    /// Any other code. Terminal when `>= 400`, like the known ones.
    Unknown(u16),
}

impl JobStatus {
    /// Lowest code of the terminal range.
    pub const TERMINAL_THRESHOLD: u16 = 400;

    /// Numeric wire code.
    pub fn code(self) -> u16 {
        match self {
            Self::Waiting => 0,
            Self::Queued => 100,
            Self::Starting => 200,
            Self::Running => 300,
            Self::Done => 400,
            Self::Error => 401,
            Self::Stopped => 402,
            Self::Killed => 500,
            Self::Unknown(code) => code,
        }
    }

    /// Map a wire code back to a status.
    pub fn from_code(code: u16) -> Self {
        match code {
            0 => Self::Waiting,
            100 => Self::Queued,
            200 => Self::Starting,
            300 => Self::Running,
            400 => Self::Done,
            401 => Self::Error,
            402 => Self::Stopped,
            500 => Self::Killed,
            other => Self::Unknown(other),
        }
    }

    /// Check if this is a terminal state (code `>= 400`).
    pub fn is_terminal(self) -> bool {
        self.code() >= Self::TERMINAL_THRESHOLD
    }

    /// Check if the job is still progressing (code `< 400`).
    pub fn is_in_progress(self) -> bool {
        !self.is_terminal()
    }

    /// Check if the job completed successfully.
    pub fn is_success(self) -> bool {
        matches!(self, Self::Done)
    }

    /// Name used by the service for this status.
    pub fn name(self) -> &'static str {
        match self {
            Self::Waiting => "wait",
            Self::Queued => "toProcess",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Done => "done",
            Self::Error => "error",
            Self::Stopped => "stopped",
            Self::Killed => "killed",
            Self::Unknown(_) => "unknown",
        }
    }
}

impl Ord for JobStatus {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.code().cmp(&other.code()).then_with(|| {
            matches!(self, Self::Unknown(_)).cmp(&matches!(other, Self::Unknown(_)))
        })
    }
}

impl PartialOrd for JobStatus {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown(code) => write!(f, "unknown({code})"),
            known => write!(f, "{}", known.name()),
        }
    }
}

impl Serialize for JobStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u16(self.code())
    }
}

impl<'de> Deserialize<'de> for JobStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        u16::deserialize(deserializer).map(Self::from_code)
    }
}

/// Optional payload accepted by endpoints that start an async operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStart {
    /// Free-form tag echoed back on every status document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    /// URL the server calls with a GET once the job ends.
    /// `%%id` and `%%tag` are substituted server-side.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback: Option<String>,
}

impl JobStart {
    pub fn tagged(tag: impl Into<String>) -> Self {
        Self {
            tag: Some(tag.into()),
            callback: None,
        }
    }

    pub fn with_callback(mut self, callback: impl Into<String>) -> Self {
        self.callback = Some(callback.into());
        self
    }
}

/// Status document of a job, as returned by submit and status endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobHandle {
    pub id: JobId,
    #[serde(default)]
    pub tag: Option<String>,
    pub status: JobStatus,
    /// Best-effort completion percentage. May move backwards.
    #[serde(default)]
    pub percent: i32,
    /// Output (Done) or diagnostics (Error). Absent while in progress.
    #[serde(default)]
    pub result: Option<serde_json::Value>,
}

impl JobHandle {
    pub fn new(id: impl Into<JobId>, status: JobStatus) -> Self {
        Self {
            id: id.into(),
            tag: None,
            status,
            percent: 0,
            result: None,
        }
    }

    pub fn with_percent(mut self, percent: i32) -> Self {
        self.percent = percent;
        self
    }

    pub fn with_result(mut self, result: serde_json::Value) -> Self {
        self.result = Some(result);
        self
    }

    /// Completion percentage clamped to `0..=100`.
    pub fn progress(&self) -> u8 {
        self.percent.clamp(0, 100) as u8
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Diagnostics of a job that ended in [`JobStatus::Error`].
    pub fn failure(&self) -> Option<JobFailure> {
        if self.status != JobStatus::Error {
            return None;
        }
        let failure = self
            .result
            .as_ref()
            .and_then(|value| serde_json::from_value(value.clone()).ok())
            .unwrap_or_default();
        Some(failure)
    }

    /// Typed output of a job that ended in [`JobStatus::Done`].
    ///
    /// Returns `Ok(None)` for any other status or when the server sent no
    /// result.
    pub fn output<T: DeserializeOwned>(&self) -> ClientResult<Option<T>> {
        if !self.status.is_success() {
            return Ok(None);
        }
        match &self.result {
            None | Some(serde_json::Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|source| ClientError::Deserialization {
                    source,
                    body: value.to_string(),
                }),
        }
    }

    /// Classify the handle so callers branch on every terminal kind.
    pub fn outcome(&self) -> JobOutcome {
        match self.status {
            JobStatus::Done => JobOutcome::Succeeded,
            JobStatus::Error => JobOutcome::Failed(self.failure().unwrap_or_default()),
            JobStatus::Stopped => JobOutcome::Stopped,
            JobStatus::Killed => JobOutcome::Killed,
            JobStatus::Unknown(code) if self.status.is_terminal() => {
                JobOutcome::Unrecognized(code)
            }
            JobStatus::Waiting
            | JobStatus::Queued
            | JobStatus::Starting
            | JobStatus::Running
            | JobStatus::Unknown(_) => JobOutcome::InProgress,
        }
    }
}

/// `{ message, stack }` diagnostics attached to a failed job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobFailure {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub stack: Option<String>,
}

impl std::fmt::Display for JobFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message.as_deref().unwrap_or("unknown error"))
    }
}

/// What a job handle means to the caller.
///
/// A failed, stopped or killed job is a successfully observed value, not an
/// error of the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    InProgress,
    Succeeded,
    Failed(JobFailure),
    Stopped,
    Killed,
    /// Ended with a terminal code this client does not know.
    Unrecognized(u16),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const ALL: [JobStatus; 8] = [
        JobStatus::Waiting,
        JobStatus::Queued,
        JobStatus::Starting,
        JobStatus::Running,
        JobStatus::Done,
        JobStatus::Error,
        JobStatus::Stopped,
        JobStatus::Killed,
    ];

    #[test]
    fn test_status_order_follows_codes() {
        for a in ALL {
            for b in ALL {
                assert_eq!(a < b, a.code() < b.code(), "{a} vs {b}");
            }
        }
        assert_eq!(ALL.iter().max(), Some(&JobStatus::Killed));
    }

    #[test]
    fn test_status_terminal() {
        assert!(!JobStatus::Waiting.is_terminal());
        assert!(!JobStatus::Queued.is_terminal());
        assert!(!JobStatus::Starting.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
        assert!(JobStatus::Done.is_terminal());
        assert!(JobStatus::Error.is_terminal());
        assert!(JobStatus::Stopped.is_terminal());
        assert!(JobStatus::Killed.is_terminal());
        assert!(JobStatus::Running.is_in_progress());
    }

    #[test]
    fn test_status_success_only_done() {
        let successes: Vec<_> = ALL.into_iter().filter(|s| s.is_success()).collect();
        assert_eq!(successes, vec![JobStatus::Done]);
    }

    #[test]
    fn test_status_wire_format() {
        assert_eq!(serde_json::to_value(JobStatus::Stopped).unwrap(), json!(402));
        let status: JobStatus = serde_json::from_value(json!(500)).unwrap();
        assert_eq!(status, JobStatus::Killed);
        for s in ALL {
            assert_eq!(JobStatus::from_code(s.code()), s);
        }
    }

    #[test]
    fn test_unknown_code_uses_threshold() {
        let pending: JobStatus = serde_json::from_value(json!(250)).unwrap();
        assert_eq!(pending, JobStatus::Unknown(250));
        assert!(pending.is_in_progress());
        assert!(JobStatus::Starting < pending && pending < JobStatus::Running);
        assert_eq!(serde_json::to_value(pending).unwrap(), json!(250));

        let ended = JobStatus::from_code(403);
        assert!(ended.is_terminal());
        assert!(!ended.is_success());
        assert_eq!(ended.to_string(), "unknown(403)");
        assert!(serde_json::from_value::<JobStatus>(json!(-1)).is_err());

        let handle = JobHandle::new("t-9", ended);
        assert_eq!(handle.outcome(), JobOutcome::Unrecognized(403));
        assert_eq!(JobHandle::new("t-9", pending).outcome(), JobOutcome::InProgress);
    }

    #[test]
    fn test_handle_deserialize_minimal() {
        let handle: JobHandle =
            serde_json::from_value(json!({ "id": "t-1", "status": 100 })).unwrap();
        assert_eq!(handle.id, JobId::from("t-1"));
        assert_eq!(handle.status, JobStatus::Queued);
        assert_eq!(handle.tag, None);
        assert_eq!(handle.percent, 0);
        assert_eq!(handle.outcome(), JobOutcome::InProgress);
    }

    #[test]
    fn test_handle_failure_diagnostics() {
        let handle = JobHandle::new("t-2", JobStatus::Error)
            .with_result(json!({ "message": "null pointer", "stack": "at foo" }));
        let failure = handle.failure().unwrap();
        assert_eq!(failure.message.as_deref(), Some("null pointer"));
        assert_eq!(failure.stack.as_deref(), Some("at foo"));
        assert_eq!(failure.to_string(), "null pointer");
        assert!(matches!(handle.outcome(), JobOutcome::Failed(_)));
    }

    #[test]
    fn test_handle_output_only_when_done() {
        let done = JobHandle::new("t-3", JobStatus::Done).with_result(json!({ "rows": 7 }));
        let out: Option<serde_json::Value> = done.output().unwrap();
        assert_eq!(out, Some(json!({ "rows": 7 })));

        let stopped = JobHandle::new("t-3", JobStatus::Stopped).with_result(json!({}));
        let out: Option<serde_json::Value> = stopped.output().unwrap();
        assert_eq!(out, None);
        assert_eq!(stopped.outcome(), JobOutcome::Stopped);
        assert_eq!(JobHandle::new("t-3", JobStatus::Killed).outcome(), JobOutcome::Killed);
    }

    #[test]
    fn test_progress_clamped() {
        assert_eq!(JobHandle::new("a", JobStatus::Running).with_percent(140).progress(), 100);
        assert_eq!(JobHandle::new("a", JobStatus::Running).with_percent(-3).progress(), 0);
    }

    #[test]
    fn test_job_start_skips_empty_fields() {
        let start = JobStart::tagged("nightly").with_callback("https://hook/%%id");
        assert_eq!(
            serde_json::to_value(&start).unwrap(),
            json!({ "tag": "nightly", "callback": "https://hook/%%id" })
        );
        assert_eq!(serde_json::to_value(JobStart::default()).unwrap(), json!({}));
    }
}
