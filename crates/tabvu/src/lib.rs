//! tabvu - a headless client for Tableau's VizQL Data Service.
//!
//! Signs in with a personal access token, discovers datasources and their
//! fields, builds and runs ad-hoc queries with typed filters, persists named
//! query definitions, and runs them on recurring schedules that export CSV
//! files.

use thiserror::Error;

pub mod client;
pub mod config;
pub mod credentials;
pub mod export;
pub mod filter;
pub mod model;
pub mod request;
pub mod scheduler;
pub mod store;
pub mod worker;

// Re-export key types for use in tests and external applications
pub use crate::client::{Client, Connection, QueryGateway};
pub use crate::config::TabvuConfig;
pub use crate::credentials::{AuthToken, CredentialCache, TokenSource};
pub use crate::export::{ExecutionPipeline, ExportOutcome};
pub use crate::filter::{
    CategoricalFilter, DateFilter, DateRangeType, Filter, NumericRangeFilter, PeriodType,
    QuantitativeKind,
};
pub use crate::model::{
    AggFn, AggregatedField, Cadence, Datasource, FieldKind, FieldRef, FieldType, QueryDefinition,
    Record, Schedule, TimeOfDay,
};
pub use crate::request::{BuildWarning, QueryRequest};
pub use crate::scheduler::{ScheduleRunner, TriggerEngine};
pub use crate::store::{QueryStore, SaveOutcome, ScheduleStore};
pub use crate::worker::QueryWorker;

#[derive(Debug, Error)]
pub enum TabvuError {
    /// Sign-in failed or a request was rejected as unauthenticated.
    /// Retryable by re-signing in; the gateway retries a bounded number
    /// of times before surfacing this.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Network-level failure. Not retried; surfaced to the caller.
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    /// The gateway answered with a non-success status.
    #[error("HTTP {status} from {url}: {body}")]
    Http { status: u16, url: String, body: String },

    /// The gateway answered 200 but the body was not the expected shape.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Bad user input, caught before any network call.
    #[error("validation failure: {0}")]
    Validation(String),

    /// A persisted filter had a filterType this client does not understand.
    /// Loaders skip the filter and keep going.
    #[error("unsupported filter kind: {0}")]
    UnsupportedFilterKind(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    #[error("arrow error: {0}")]
    Arrow(#[from] arrow_schema::ArrowError),
}

impl TabvuError {
    /// True for failures that a fresh sign-in may clear.
    pub fn is_auth(&self) -> bool {
        matches!(self, TabvuError::Auth(_))
    }
}
