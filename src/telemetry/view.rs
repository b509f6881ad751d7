/// Telemetry view: historical pull reconciled with live push
///
/// `refresh` performs one historical fetch and rebuilds the series map by
/// tag. A refresh started while another is in flight supersedes it: the
/// older result is discarded by request identity, never by completion
/// order, so a slow early response cannot overwrite newer state. Fetch
/// errors become a local error value and leave displayed series untouched.
///
/// Live channel messages merge through a pluggable strategy; which policy
/// is right is an open product question, so both candidates are provided
/// and the constructor takes the choice explicitly.
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::channel::ChannelHandler;
use crate::logger::{self, LogTag};

use super::source::HistoricalSource;
use super::types::{SeriesMap, TelemetryQuery, TelemetryReading};

/// Policy for folding one live reading into a tag's series
pub trait LiveMergeStrategy: Send + Sync {
    fn merge(&self, readings: &mut Vec<TelemetryReading>, incoming: TelemetryReading);
}

/// Append the newest reading, evicting the oldest beyond `capacity`
pub struct AppendEvict {
    pub capacity: usize,
}

impl LiveMergeStrategy for AppendEvict {
    fn merge(&self, readings: &mut Vec<TelemetryReading>, incoming: TelemetryReading) {
        readings.push(incoming);
        while readings.len() > self.capacity {
            readings.remove(0);
        }
    }
}

/// Ignore live points; the next poll replaces the map wholesale
pub struct ReplaceOnPoll;

impl LiveMergeStrategy for ReplaceOnPoll {
    fn merge(&self, _readings: &mut Vec<TelemetryReading>, _incoming: TelemetryReading) {}
}

#[derive(Default)]
struct ViewState {
    series: SeriesMap,
    error: Option<String>,
    loading: bool,
}

pub struct TelemetryView {
    source: Arc<dyn HistoricalSource>,
    strategy: Arc<dyn LiveMergeStrategy>,
    state: Mutex<ViewState>,
    request_seq: AtomicU64,
}

impl TelemetryView {
    pub fn new(source: Arc<dyn HistoricalSource>, strategy: Arc<dyn LiveMergeStrategy>) -> Self {
        Self {
            source,
            strategy,
            state: Mutex::new(ViewState::default()),
            request_seq: AtomicU64::new(0),
        }
    }

    /// One historical fetch, rebuilding the series map by tag
    ///
    /// An empty tag set is a no-op. A result that arrives after a newer
    /// refresh has started is discarded.
    pub async fn refresh(&self, query: &TelemetryQuery) {
        if query.tag_ids.is_empty() {
            return;
        }

        let ticket = self.request_seq.fetch_add(1, Ordering::SeqCst) + 1;
        {
            let mut state = self.state.lock();
            state.loading = true;
            state.error = None;
        }

        let result = self.source.query(query).await;

        if self.request_seq.load(Ordering::SeqCst) != ticket {
            logger::debug(
                LogTag::Telemetry,
                "Discarding stale historical fetch result",
            );
            return;
        }

        let mut state = self.state.lock();
        state.loading = false;
        match result {
            Ok(series) => {
                let mut map = SeriesMap::new();
                for s in series {
                    map.insert(s.tag_id, s.readings);
                }
                state.series = map;
            }
            Err(e) => {
                // Prior displayed data is preserved
                state.error = Some(e.to_string());
                logger::warning(LogTag::Telemetry, &format!("Historical fetch failed: {}", e));
            }
        }
    }

    /// Fold one live reading into its tag's series via the configured
    /// strategy
    pub fn apply_live(&self, reading: TelemetryReading) {
        let mut state = self.state.lock();
        let series = state.series.entry(reading.tag_id.clone()).or_default();
        self.strategy.merge(series, reading);
    }

    /// Adapt this view into a channel subscriber for live readings
    pub fn live_handler(self: &Arc<Self>) -> Arc<dyn ChannelHandler> {
        let view = Arc::clone(self);
        Arc::new(move |payload: &serde_json::Value| {
            match serde_json::from_value::<TelemetryReading>(payload.clone()) {
                Ok(reading) => view.apply_live(reading),
                Err(e) => {
                    logger::warning(
                        LogTag::Telemetry,
                        &format!("Dropping undecodable live reading: {}", e),
                    );
                }
            }
        })
    }

    pub fn series(&self) -> SeriesMap {
        self.state.lock().series.clone()
    }

    pub fn error(&self) -> Option<String> {
        self.state.lock().error.clone()
    }

    pub fn loading(&self) -> bool {
        self.state.lock().loading
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::RealtimeError;
    use crate::telemetry::types::{Quality, TelemetrySeries};
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use std::time::Duration;

    fn reading(tag: &str, value: f64) -> TelemetryReading {
        TelemetryReading {
            tag_id: tag.to_string(),
            time: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            value,
            quality: Quality::Good,
            raw_value: None,
            source: None,
        }
    }

    fn query(tags: &[&str]) -> TelemetryQuery {
        TelemetryQuery {
            tag_ids: tags.iter().map(|t| t.to_string()).collect(),
            start: Utc.with_ymd_and_hms(2024, 5, 1, 11, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            downsample: None,
        }
    }

    /// First call answers slowly with both tags, later calls quickly with
    /// only the first tag
    struct SlowThenFast {
        calls: AtomicU64,
    }

    #[async_trait]
    impl HistoricalSource for SlowThenFast {
        async fn query(
            &self,
            query: &TelemetryQuery,
        ) -> Result<Vec<TelemetrySeries>, RealtimeError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call == 0 {
                tokio::time::sleep(Duration::from_millis(80)).await;
            } else {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            Ok(query
                .tag_ids
                .iter()
                .map(|tag| TelemetrySeries {
                    tag_id: tag.clone(),
                    readings: vec![reading(tag, call as f64)],
                })
                .collect())
        }
    }

    struct FixedSource {
        series: Vec<TelemetrySeries>,
    }

    #[async_trait]
    impl HistoricalSource for FixedSource {
        async fn query(
            &self,
            _query: &TelemetryQuery,
        ) -> Result<Vec<TelemetrySeries>, RealtimeError> {
            Ok(self.series.clone())
        }
    }

    #[tokio::test]
    async fn test_refresh_groups_by_tag() {
        let source = Arc::new(FixedSource {
            series: vec![
                TelemetrySeries {
                    tag_id: "T1".to_string(),
                    readings: vec![reading("T1", 1.0), reading("T1", 2.0)],
                },
                TelemetrySeries {
                    tag_id: "T2".to_string(),
                    readings: vec![reading("T2", 3.0)],
                },
            ],
        });
        let view = TelemetryView::new(source, Arc::new(ReplaceOnPoll));

        view.refresh(&query(&["T1", "T2"])).await;

        let series = view.series();
        assert_eq!(series["T1"].len(), 2);
        assert_eq!(series["T2"].len(), 1);
        assert!(view.error().is_none());
        assert!(!view.loading());
    }

    #[tokio::test]
    async fn test_empty_tag_set_is_a_noop() {
        let source = Arc::new(SlowThenFast {
            calls: AtomicU64::new(0),
        });
        let view = TelemetryView::new(source.clone(), Arc::new(ReplaceOnPoll));

        view.refresh(&query(&[])).await;

        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
        assert!(!view.loading());
    }

    #[tokio::test]
    async fn test_newer_refresh_supersedes_inflight_fetch() {
        let source = Arc::new(SlowThenFast {
            calls: AtomicU64::new(0),
        });
        let view = Arc::new(TelemetryView::new(source, Arc::new(ReplaceOnPoll)));

        let first = {
            let view = Arc::clone(&view);
            tokio::spawn(async move {
                view.refresh(&query(&["T1", "T2"])).await;
            })
        };
        // Let the first fetch get in flight, then supersede it
        tokio::time::sleep(Duration::from_millis(20)).await;
        view.refresh(&query(&["T1"])).await;
        first.await.unwrap();

        let series = view.series();
        assert_eq!(series.len(), 1);
        // Value 1.0 marks the second source call
        assert_eq!(series["T1"][0].value, 1.0);
        assert!(view.error().is_none());
    }

    /// Succeeds on the first call, fails on every later one
    struct OkThenFail {
        calls: AtomicU64,
    }

    #[async_trait]
    impl HistoricalSource for OkThenFail {
        async fn query(
            &self,
            query: &TelemetryQuery,
        ) -> Result<Vec<TelemetrySeries>, RealtimeError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(query
                    .tag_ids
                    .iter()
                    .map(|tag| TelemetrySeries {
                        tag_id: tag.clone(),
                        readings: vec![reading(tag, 1.0)],
                    })
                    .collect())
            } else {
                Err(RealtimeError::Http("boom".to_string()))
            }
        }
    }

    #[tokio::test]
    async fn test_fetch_error_preserves_displayed_data() {
        let view = TelemetryView::new(
            Arc::new(OkThenFail {
                calls: AtomicU64::new(0),
            }),
            Arc::new(ReplaceOnPoll),
        );

        view.refresh(&query(&["T1"])).await;
        assert_eq!(view.series()["T1"].len(), 1);
        assert!(view.error().is_none());

        view.refresh(&query(&["T1"])).await;
        assert!(view.error().unwrap().contains("boom"));
        // The previously fetched series is still displayed
        assert_eq!(view.series()["T1"].len(), 1);
        assert!(!view.loading());
    }

    #[tokio::test]
    async fn test_append_evict_strategy() {
        let strategy = AppendEvict { capacity: 2 };
        let mut readings = vec![reading("T1", 1.0)];

        strategy.merge(&mut readings, reading("T1", 2.0));
        strategy.merge(&mut readings, reading("T1", 3.0));

        assert_eq!(readings.len(), 2);
        assert_eq!(readings[0].value, 2.0);
        assert_eq!(readings[1].value, 3.0);
    }

    #[tokio::test]
    async fn test_replace_on_poll_ignores_live_points() {
        let strategy = ReplaceOnPoll;
        let mut readings = vec![reading("T1", 1.0)];
        strategy.merge(&mut readings, reading("T1", 2.0));
        assert_eq!(readings.len(), 1);
    }

    #[tokio::test]
    async fn test_live_handler_decodes_and_applies() {
        let view = Arc::new(TelemetryView::new(
            Arc::new(FixedSource { series: vec![] }),
            Arc::new(AppendEvict { capacity: 10 }),
        ));
        let handler = view.live_handler();

        handler.on_message(&serde_json::json!({
            "tag_id": "T1",
            "time": "2024-05-01T12:00:00Z",
            "value": 42.5,
            "quality": "GOOD"
        }));
        // Undecodable payloads are skipped
        handler.on_message(&serde_json::json!({"bogus": true}));

        let series = view.series();
        assert_eq!(series["T1"].len(), 1);
        assert_eq!(series["T1"][0].value, 42.5);
    }
}
