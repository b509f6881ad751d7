use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Measurement quality flag attached to every reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Quality {
    Good,
    Bad,
    Uncertain,
}

/// One telemetry point for a tag
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryReading {
    pub tag_id: String,
    pub time: DateTime<Utc>,
    pub value: f64,
    pub quality: Quality,
    #[serde(default)]
    pub raw_value: Option<f64>,
    #[serde(default)]
    pub source: Option<String>,
}

/// Historical range query
#[derive(Debug, Clone)]
pub struct TelemetryQuery {
    pub tag_ids: Vec<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub downsample: Option<String>,
}

/// One tag's ordered readings as the historical API returns them
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetrySeries {
    pub tag_id: String,
    pub readings: Vec<TelemetryReading>,
}

/// Tag id to ordered readings, replaced wholesale on each successful fetch
pub type SeriesMap = HashMap<String, Vec<TelemetryReading>>;
