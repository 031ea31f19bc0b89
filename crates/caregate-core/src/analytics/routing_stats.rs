//! Routing statistics aggregated from the routing log.

use caregate_abstraction::{RoutingLogEntry, RoutingLogSink, SinkError, TaskCategory};
use chrono::{DateTime, Duration, Local, Months, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

/// Reporting window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Timeframe {
    /// Since local midnight.
    Day,
    /// Trailing seven days.
    Week,
    /// Trailing calendar month.
    Month,
}

impl Timeframe {
    /// Start of the window ending at `now`, evaluated in `now`'s time zone.
    ///
    /// If local midnight does not exist (a DST gap) the day window falls back
    /// to the trailing 24 hours.
    pub fn start_at<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> DateTime<Utc> {
        let start = match self {
            Timeframe::Day => now
                .date_naive()
                .and_hms_opt(0, 0, 0)
                .and_then(|midnight| midnight.and_local_timezone(now.timezone()).earliest())
                .unwrap_or_else(|| now.clone() - Duration::hours(24)),
            Timeframe::Week => now.clone() - Duration::days(7),
            Timeframe::Month => now
                .clone()
                .checked_sub_months(Months::new(1))
                .unwrap_or_else(|| now.clone() - Duration::days(30)),
        };
        start.with_timezone(&Utc)
    }

    /// Stable label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::Day => "day",
            Timeframe::Week => "week",
            Timeframe::Month => "month",
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "day" => Ok(Timeframe::Day),
            "week" => Ok(Timeframe::Week),
            "month" => Ok(Timeframe::Month),
            _ => Err(format!("unknown timeframe '{}', expected day, week or month", s)),
        }
    }
}

/// Aggregated routing activity for one window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutingStats {
    /// Window the stats cover.
    pub timeframe: Timeframe,
    /// Window start.
    pub since: DateTime<Utc>,
    /// Sum of estimated costs in USD.
    pub total_cost: f64,
    /// Number of routed requests.
    pub request_count: u64,
    /// Requests per backend identifier.
    pub by_backend: BTreeMap<String, u64>,
    /// Requests per task category.
    pub by_category: BTreeMap<TaskCategory, u64>,
}

impl RoutingStats {
    /// Aggregates already-filtered entries.
    pub fn from_entries(timeframe: Timeframe, since: DateTime<Utc>, entries: &[RoutingLogEntry]) -> Self {
        let mut stats = Self {
            timeframe,
            since,
            total_cost: 0.0,
            request_count: 0,
            by_backend: BTreeMap::new(),
            by_category: BTreeMap::new(),
        };
        for entry in entries {
            stats.total_cost += entry.estimated_cost;
            stats.request_count += 1;
            *stats.by_backend.entry(entry.backend.clone()).or_insert(0) += 1;
            *stats.by_category.entry(entry.category).or_insert(0) += 1;
        }
        stats
    }
}

/// Read-only reporting over a routing log.
#[derive(Clone)]
pub struct RoutingStatsService {
    sink: Arc<dyn RoutingLogSink>,
}

impl RoutingStatsService {
    /// Creates a service reading from `sink`.
    pub fn new(sink: Arc<dyn RoutingLogSink>) -> Self {
        Self { sink }
    }

    /// Aggregates the window ending now, in the local time zone.
    ///
    /// # Errors
    /// Returns the store's error if entries cannot be read.
    pub async fn aggregate(&self, timeframe: Timeframe) -> Result<RoutingStats, SinkError> {
        self.aggregate_at(timeframe, Utc::now()).await
    }

    /// Aggregates the window ending at `now`, in the local time zone.
    ///
    /// # Errors
    /// Returns the store's error if entries cannot be read.
    pub async fn aggregate_at(&self, timeframe: Timeframe, now: DateTime<Utc>) -> Result<RoutingStats, SinkError> {
        let since = timeframe.start_at(&now.with_timezone(&Local));
        let entries = self.sink.entries_since(since).await?;
        let stats = RoutingStats::from_entries(timeframe, since, &entries);
        debug!(
            timeframe = %timeframe,
            since = %since,
            requests = stats.request_count,
            total_cost = stats.total_cost,
            "Aggregated routing stats"
        );
        Ok(stats)
    }
}

impl fmt::Debug for RoutingStatsService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoutingStatsService").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitoring::MemoryRoutingLog;
    use caregate_abstraction::Complexity;
    use chrono::FixedOffset;

    fn entry(backend: &str, category: TaskCategory, cost: f64, ts: DateTime<Utc>) -> RoutingLogEntry {
        RoutingLogEntry {
            conversation_id: "conv".to_string(),
            backend: backend.to_string(),
            category,
            complexity: Some(Complexity::Simple),
            message_length: 10,
            estimated_cost: cost,
            timestamp: ts,
        }
    }

    #[test]
    fn test_day_starts_at_local_midnight() {
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();
        let now = tz.with_ymd_and_hms(2025, 5, 10, 15, 45, 0).unwrap();
        let start = Timeframe::Day.start_at(&now);
        assert_eq!(start, Utc.with_ymd_and_hms(2025, 5, 9, 22, 0, 0).unwrap());
    }

    #[test]
    fn test_week_and_month_windows() {
        let now = Utc.with_ymd_and_hms(2025, 3, 31, 12, 0, 0).unwrap();
        assert_eq!(Timeframe::Week.start_at(&now), Utc.with_ymd_and_hms(2025, 3, 24, 12, 0, 0).unwrap());
        // Clamped to the last day of February.
        assert_eq!(Timeframe::Month.start_at(&now), Utc.with_ymd_and_hms(2025, 2, 28, 12, 0, 0).unwrap());
    }

    #[test]
    fn test_timeframe_parsing() {
        assert_eq!("Week".parse::<Timeframe>().unwrap(), Timeframe::Week);
        assert!("year".parse::<Timeframe>().is_err());
    }

    #[test]
    fn test_from_entries_counts() {
        let ts = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let entries = vec![
            entry("claude-3-haiku", TaskCategory::Chat, 0.001, ts),
            entry("claude-3-haiku", TaskCategory::Title, 0.0005, ts),
            entry("claude-3-opus", TaskCategory::Compliance, 0.03, ts),
        ];
        let stats = RoutingStats::from_entries(Timeframe::Day, ts, &entries);
        assert_eq!(stats.request_count, 3);
        assert!((stats.total_cost - 0.0315).abs() < 1e-12);
        assert_eq!(stats.by_backend["claude-3-haiku"], 2);
        assert_eq!(stats.by_category[&TaskCategory::Compliance], 1);
    }

    #[tokio::test]
    async fn test_aggregate_excludes_older_entries() {
        let log = Arc::new(MemoryRoutingLog::new());
        let now = Utc::now();
        log.append(&entry("claude-3-opus", TaskCategory::Analysis, 0.02, now - Duration::days(3))).await.unwrap();
        log.append(&entry("claude-3-haiku", TaskCategory::Chat, 0.001, now - Duration::days(10))).await.unwrap();
        log.append(&entry("claude-3-haiku", TaskCategory::Chat, 0.001, now)).await.unwrap();

        let service = RoutingStatsService::new(log);
        let week = service.aggregate_at(Timeframe::Week, now).await.unwrap();
        assert_eq!(week.request_count, 2);
        assert_eq!(week.by_backend.get("claude-3-opus"), Some(&1));

        let month = service.aggregate_at(Timeframe::Month, now).await.unwrap();
        assert_eq!(month.request_count, 3);

        let day = service.aggregate_at(Timeframe::Day, now).await.unwrap();
        assert_eq!(day.by_category.get(&TaskCategory::Chat), Some(&1));
        assert!(day.by_category.get(&TaskCategory::Analysis).is_none());
    }

    #[tokio::test]
    async fn test_aggregate_empty_log() {
        let service = RoutingStatsService::new(Arc::new(MemoryRoutingLog::new()));
        let stats = service.aggregate(Timeframe::Day).await.unwrap();
        assert_eq!(stats.request_count, 0);
        assert_eq!(stats.total_cost, 0.0);
        assert!(stats.by_backend.is_empty());
    }
}
