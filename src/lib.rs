//! QuantForce API client.
//!
//! An async client for the QuantForce HTTP/JSON API: authenticate, manage
//! projects, upload datasets, start long-running server jobs (ingestion,
//! binning, deploy) and poll them to completion before fetching results.
//!
//! # Overview
//!
//! The crate provides:
//! - A [`Transport`] trait and its reqwest implementation [`RestClient`],
//!   which classify every response as success, not-found, or failure
//! - [`JobStatus`] / [`JobHandle`] for the status document shared by every job
//! - A [`JobOrchestrator`] that submits jobs and polls them until terminal
//! - [`Endpoint`] URL composition
//! - [`QuantForceClient`] / [`ProjectClient`], a typed facade over the endpoints
//! - Resource shapes in [`models`]
//! - [`ClientError`], one error type for every failure kind
//!
//! # Lifecycle
//!
//! ```text
//!   authenticate() ──→ submit() ──→ await_completion() ──→ fetch result
//!      (token)         (handle)      (poll every 1s)        (typed GET / download)
//! ```
//!
//! A job that ends in Error, Stopped or Killed is returned as a normal
//! [`JobHandle`]; inspect [`JobHandle::outcome`] before trusting its result.

pub mod api;
pub mod auth;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod job;
pub mod models;
pub mod orchestrator;
pub mod transport;

pub use api::{
    ALL_COLUMNS, AUTO_BINNING, ExportFormat, ProjectClient, QuantForceClient, UTF8_CODEPAGE,
};
pub use auth::{AuthRequest, AuthSession, AuthType};
pub use config::{ClientConfig, DEFAULT_ENDPOINT, DEFAULT_POLL_INTERVAL, TOKEN_HEADER};
pub use endpoint::{Endpoint, compose};
pub use error::{ClientError, ClientResult};
pub use job::{JobFailure, JobHandle, JobId, JobOutcome, JobStart, JobStatus};
pub use models::{
    Bin, BinsView, BinsViewList, Column, Dataset, Project, ProjectList, VariableShape,
    VariableType,
};
pub use orchestrator::JobOrchestrator;
pub use transport::{RawResponse, RequestBody, RestClient, Transport, TransportExt, classify};

pub use reqwest::{Method, StatusCode};
pub use tokio_util::sync::CancellationToken;
