/// Historical data boundary
///
/// The channel layer consumes the REST client only as a data source for the
/// historical half of the telemetry merge; everything behind this trait is
/// an external collaborator.
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::config::TelemetryConfig;
use crate::errors::RealtimeError;

use super::types::{TelemetryQuery, TelemetrySeries};

#[async_trait]
pub trait HistoricalSource: Send + Sync {
    /// One pull over the query's tag set and time range, returning each
    /// tag's ordered readings
    async fn query(&self, query: &TelemetryQuery) -> Result<Vec<TelemetrySeries>, RealtimeError>;
}

/// Response envelope wrapping every API payload
#[derive(Debug, Deserialize)]
struct QueryResponse {
    data: Vec<TelemetrySeries>,
    #[serde(default)]
    errors: Option<Vec<EnvelopeError>>,
}

#[derive(Debug, Deserialize)]
struct EnvelopeError {
    message: String,
}

/// reqwest-backed implementation against the telemetry query endpoint
pub struct HttpTelemetrySource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTelemetrySource {
    pub fn new(config: &TelemetryConfig) -> Result<Self, RealtimeError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| RealtimeError::Http(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl HistoricalSource for HttpTelemetrySource {
    async fn query(&self, query: &TelemetryQuery) -> Result<Vec<TelemetrySeries>, RealtimeError> {
        let url = format!("{}/telemetry/query", self.base_url);

        let mut params: Vec<(&str, String)> = vec![
            ("tag_ids", query.tag_ids.join(",")),
            ("start", query.start.to_rfc3339()),
            ("end", query.end.to_rfc3339()),
        ];
        if let Some(downsample) = &query.downsample {
            params.push(("downsample", downsample.clone()));
        }

        let response = self
            .client
            .get(&url)
            .query(&params)
            .send()
            .await
            .map_err(|e| RealtimeError::Http(format!("Request to {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RealtimeError::Http(format!(
                "{} returned status {}",
                url, status
            )));
        }

        let body: QueryResponse = response
            .json()
            .await
            .map_err(|e| RealtimeError::Http(format!("Invalid response from {}: {}", url, e)))?;

        if let Some(errors) = body.errors {
            if let Some(first) = errors.first() {
                return Err(RealtimeError::Http(first.message.clone()));
            }
        }

        Ok(body.data)
    }
}
