/// Telemetry: pull-based historical queries reconciled with live updates
///
/// - `types`: reading, query, and series shapes
/// - `source`: historical data boundary and its reqwest implementation
/// - `view`: per-series state with superseding refresh and pluggable live
///   merge
pub mod source;
pub mod types;
pub mod view;

pub use source::{HistoricalSource, HttpTelemetrySource};
pub use types::{Quality, SeriesMap, TelemetryQuery, TelemetryReading, TelemetrySeries};
pub use view::{AppendEvict, LiveMergeStrategy, ReplaceOnPoll, TelemetryView};
