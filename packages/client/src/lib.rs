#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Client for the road accident dashboard data service.
//!
//! The service is a black box that returns pre-aggregated JSON for a set
//! of filter parameters. This crate:
//!
//! * talks to it over HTTP ([`api::HttpDashboardApi`], with retry for
//!   transient failures),
//! * validates every response shape at the boundary ([`boundary`]) before
//!   anything reaches the analytics code,
//! * drives the views ([`views`]) so that a superseded request can never
//!   overwrite the result of a newer one, and a failed or malformed
//!   response degrades to an empty state instead of an error.

pub mod api;
pub mod boundary;
pub mod config;
pub mod endpoint;
pub mod generation;
pub mod retry;
pub mod session;
pub mod views;

#[cfg(test)]
mod test_support;

pub use api::{DashboardApi, HttpDashboardApi, UploadReceipt};
pub use config::{ClientConfig, ConfigError};
pub use endpoint::Endpoint;
pub use session::{DashboardSession, RefreshSummary};
pub use views::{CatalogLoader, RefreshOutcome, SegmentView, TrendView, ViewState};

use thiserror::Error;

/// Errors that can occur while talking to the data service.
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body was not valid JSON.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Local file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Non-success status that was not retried or exhausted its retries.
    #[error("HTTP {status} from {url}")]
    Status {
        /// Status code.
        status: u16,
        /// Request URL.
        url: String,
    },

    /// Response JSON did not have the expected shape.
    #[error("Malformed {endpoint} response: {message}")]
    Malformed {
        /// Endpoint that returned the response.
        endpoint: Endpoint,
        /// What was wrong with it.
        message: String,
    },

    /// Upload rejected before sending.
    #[error("Invalid upload: {message}")]
    InvalidUpload {
        /// Why the file was rejected.
        message: String,
    },
}
