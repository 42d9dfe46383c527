//! Access to the data service.
//!
//! [`DashboardApi`] is the seam between the views and the network. The
//! typed fetchers are provided on top of [`DashboardApi::fetch_raw`] and
//! the [`crate::boundary`] validators, so an implementation only has to
//! move JSON.

use std::path::Path;

use roadwatch_analytics_models::SegmentRecord;
use roadwatch_filter::QueryParams;
use roadwatch_filter_models::OptionCatalog;
use serde::Deserialize;

use crate::boundary::{self, ForecastResponse};
use crate::config::ClientConfig;
use crate::endpoint::Endpoint;
use crate::retry::{self, RetryPolicy};
use crate::ClientError;

/// Server acknowledgement of a dataset upload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UploadReceipt {
    /// Free-form confirmation text, if the server sent one.
    #[serde(default)]
    pub message: Option<String>,
}

/// Operations offered by the data service.
#[async_trait::async_trait]
pub trait DashboardApi: Send + Sync {
    /// Fetches the raw JSON body of a GET endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on transport failure, a non-success status,
    /// or a body that is not JSON.
    async fn fetch_raw(
        &self,
        endpoint: Endpoint,
        params: &QueryParams,
    ) -> Result<serde_json::Value, ClientError>;

    /// Replaces the server-side dataset with a CSV file.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the file is rejected locally, cannot be
    /// read, or the server does not accept it.
    async fn upload(&self, path: &Path) -> Result<UploadReceipt, ClientError>;

    /// Fetches and validates the option catalog.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on transport failure or a malformed body.
    async fn options(&self) -> Result<OptionCatalog, ClientError> {
        let body = self
            .fetch_raw(Endpoint::Options, &QueryParams::default())
            .await?;
        boundary::parse_options(&body)
    }

    /// Fetches and validates the KM bucket distribution.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on transport failure or a malformed body.
    async fn km_distribution(
        &self,
        params: &QueryParams,
    ) -> Result<Vec<SegmentRecord>, ClientError> {
        let body = self.fetch_raw(Endpoint::KmDistribution, params).await?;
        boundary::parse_segments(&body)
    }

    /// Fetches and validates the historical and forecast series.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on transport failure or a malformed body.
    async fn forecast(&self, params: &QueryParams) -> Result<ForecastResponse, ClientError> {
        let body = self.fetch_raw(Endpoint::Forecast, params).await?;
        boundary::parse_forecast(&body)
    }
}

/// [`DashboardApi`] over HTTP with `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpDashboardApi {
    client: reqwest::Client,
    config: ClientConfig,
    retry: RetryPolicy,
}

impl HttpDashboardApi {
    /// Builds a client for `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Http`] if the HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("roadwatch/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let retry = RetryPolicy {
            max_retries: config.max_retries,
            ..RetryPolicy::default()
        };
        Ok(Self {
            client,
            config,
            retry,
        })
    }

    /// The configuration this client was built with.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }
}

/// Rejects anything that is not a `.csv` file before touching the network.
fn validate_upload(path: &Path) -> Result<String, ClientError> {
    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
    if !is_csv {
        return Err(ClientError::InvalidUpload {
            message: format!("{} is not a .csv file", path.display()),
        });
    }
    path.file_name()
        .and_then(|n| n.to_str())
        .map(String::from)
        .ok_or_else(|| ClientError::InvalidUpload {
            message: format!("{} has no usable file name", path.display()),
        })
}

#[async_trait::async_trait]
impl DashboardApi for HttpDashboardApi {
    async fn fetch_raw(
        &self,
        endpoint: Endpoint,
        params: &QueryParams,
    ) -> Result<serde_json::Value, ClientError> {
        let url = self.config.endpoint_url(endpoint);
        let pairs = params.to_pairs();
        log::debug!("GET {url}?{params}");
        retry::send_json(|| self.client.get(&url).query(&pairs), self.retry).await
    }

    async fn upload(&self, path: &Path) -> Result<UploadReceipt, ClientError> {
        let file_name = validate_upload(path)?;
        let bytes = tokio::fs::read(path).await?;
        log::info!("Uploading {file_name} ({} bytes)", bytes.len());

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("text/csv")?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let url = self.config.endpoint_url(Endpoint::Upload);
        let response = self.client.post(&url).multipart(form).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status {
                status: status.as_u16(),
                url,
            });
        }

        // The body is informational only.
        Ok(response.json::<UploadReceipt>().await.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn only_csv_files_are_uploaded() {
        assert_eq!(
            validate_upload(&PathBuf::from("data/acidentes.CSV")).unwrap(),
            "acidentes.CSV"
        );
        assert!(matches!(
            validate_upload(&PathBuf::from("data/acidentes.xlsx")),
            Err(ClientError::InvalidUpload { .. })
        ));
        assert!(validate_upload(&PathBuf::from("data/noext")).is_err());
    }

    #[tokio::test]
    async fn upload_rejects_non_csv_without_network() {
        let api = HttpDashboardApi::new(ClientConfig::default()).unwrap();
        let err = api.upload(Path::new("notes.txt")).await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidUpload { .. }));
    }
}
