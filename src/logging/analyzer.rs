//! Read-only analysis over a storage's query results.
//!
//! Every computation is a batch pass over `LogStorage::query`; the analyzer
//! never writes. Storage failures are reported through `tracing` and treated
//! as an empty result set.

use crate::logging::storage::{sort_newest_first, LogQuery, LogStorage};
use crate::logging::{LogEntry, LogLevel, LoggingError};
use chrono::{DateTime, Duration, TimeZone, Timelike, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::warn;

/// `(name, count)` pairs, most frequent first
pub type RankedCounts = Vec<(String, usize)>;

const TOP_TAGS: usize = 10;
const TOP_GROUP_ITEMS: usize = 5;
const TOP_USER_FUNCTIONS: usize = 10;
const REPORT_RECENT_ERRORS: usize = 20;
const ANOMALY_BASELINE_HOURS: i64 = 24;

/// Optional inclusive time bounds for an analysis
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TimeWindow {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl TimeWindow {
    /// No bounds
    pub fn all() -> Self {
        Self::default()
    }

    pub fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    /// From `hours` ago until now
    pub fn last_hours(hours: i64) -> Result<Self, LoggingError> {
        let end = Utc::now();
        Ok(Self::between(hours_before(end, hours)?, end))
    }

    fn query(&self) -> LogQuery {
        LogQuery {
            start_time: self.start,
            end_time: self.end,
            ..LogQuery::default()
        }
    }
}

/// `now` minus `hours`; negative or unrepresentable spans are rejected
pub fn hours_before(now: DateTime<Utc>, hours: i64) -> Result<DateTime<Utc>, LoggingError> {
    if hours < 0 {
        return Err(LoggingError::InvalidTimeRange(format!(
            "hours must not be negative, got {}",
            hours
        )));
    }
    Duration::try_hours(hours)
        .and_then(|span| now.checked_sub_signed(span))
        .ok_or_else(|| LoggingError::InvalidTimeRange(format!("{} hours is out of range", hours)))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub duration_hours: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ErrorDistribution {
    pub by_feature: BTreeMap<String, usize>,
    pub by_module: BTreeMap<String, usize>,
}

/// Frequency statistics over a time window
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogStatistics {
    pub total_logs: usize,
    pub time_range: TimeRange,
    pub by_level: BTreeMap<String, usize>,
    pub by_feature: BTreeMap<String, usize>,
    pub by_module: BTreeMap<String, usize>,
    /// Keyed by `YYYY-MM-DD HH:00` (UTC)
    pub by_hour: BTreeMap<String, usize>,
    /// ERROR + FATAL over total
    pub error_rate: f64,
    pub most_active_features: RankedCounts,
    pub most_active_modules: RankedCounts,
    pub error_distribution: ErrorDistribution,
}

/// Per-tag analysis produced by `group_by_feature` and `group_by_module`.
/// `cross_tags` counts the other tag kind: modules within a feature group,
/// features within a module group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagGroupAnalysis {
    pub total_logs: usize,
    pub by_level: BTreeMap<String, usize>,
    pub cross_tags: BTreeMap<String, usize>,
    pub top_functions: RankedCounts,
    pub top_cross_tags: RankedCounts,
    pub error_rate: f64,
    pub error_count: usize,
    pub time_span_hours: f64,
    pub first_log: DateTime<Utc>,
    pub last_log: DateTime<Utc>,
    pub logs_per_hour: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserActivity {
    pub user_id: String,
    pub total_logs: usize,
    pub session_duration_hours: f64,
    pub first_activity: Option<DateTime<Utc>>,
    pub last_activity: Option<DateTime<Utc>>,
    pub by_level: BTreeMap<String, usize>,
    pub by_feature: BTreeMap<String, usize>,
    pub by_module: BTreeMap<String, usize>,
    pub top_functions: RankedCounts,
    /// Hour of day (UTC) to count
    pub hourly_activity: BTreeMap<u32, usize>,
    pub most_active_hour: Option<u32>,
}

/// A time window whose volume exceeds `mean + multiplier * stddev`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Anomaly {
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub log_count: usize,
    pub expected_count: f64,
    /// z-score of this window's count
    pub severity: f64,
    pub top_features: RankedCounts,
    pub top_modules: RankedCounts,
    pub by_level: BTreeMap<String, usize>,
}

/// Flattened error entry for reports
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorSummary {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub feature_tag: String,
    pub module_tag: String,
    pub function_name: String,
    pub message: String,
    pub exception: Option<String>,
}

impl From<&LogEntry> for ErrorSummary {
    fn from(entry: &LogEntry) -> Self {
        Self {
            timestamp: entry.timestamp,
            level: entry.level,
            feature_tag: entry.feature_tag.clone(),
            module_tag: entry.module_tag.clone(),
            function_name: entry.function_name.clone(),
            message: entry.message.clone(),
            exception: entry
                .exception
                .as_ref()
                .map(|e| format!("{}: {}", e.exception_type, e.message)),
        }
    }
}

/// Sections to include in `generate_report`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportOptions {
    pub include_feature_analysis: bool,
    pub include_module_analysis: bool,
    pub include_anomalies: bool,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            include_feature_analysis: true,
            include_module_analysis: true,
            include_anomalies: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub generated_at: DateTime<Utc>,
    pub time_range: TimeWindow,
    pub statistics: LogStatistics,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feature_analysis: Option<BTreeMap<String, TagGroupAnalysis>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module_analysis: Option<BTreeMap<String, TagGroupAnalysis>>,
    pub recent_errors: Vec<ErrorSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anomalies: Option<Vec<Anomaly>>,
}

/// Batch analysis over one storage
#[derive(Debug, Clone)]
pub struct LogAnalyzer {
    storage: Arc<dyn LogStorage>,
}

impl LogAnalyzer {
    pub fn new(storage: Arc<dyn LogStorage>) -> Self {
        Self { storage }
    }

    async fn fetch(&self, query: &LogQuery) -> Vec<LogEntry> {
        match self.storage.query(query).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Analyzer query on {} storage failed: {}", self.storage.name(), e);
                Vec::new()
            }
        }
    }

    pub async fn get_statistics(&self, window: TimeWindow) -> LogStatistics {
        let logs = self.fetch(&window.query()).await;

        if logs.is_empty() {
            return LogStatistics {
                total_logs: 0,
                time_range: TimeRange {
                    start: window.start,
                    end: window.end,
                    duration_hours: None,
                },
                by_level: BTreeMap::new(),
                by_feature: BTreeMap::new(),
                by_module: BTreeMap::new(),
                by_hour: BTreeMap::new(),
                error_rate: 0.0,
                most_active_features: Vec::new(),
                most_active_modules: Vec::new(),
                error_distribution: ErrorDistribution::default(),
            };
        }

        let by_feature = count_by(&logs, |e| e.feature_tag.clone());
        let by_module = count_by(&logs, |e| e.module_tag.clone());
        let by_hour = count_by(&logs, |e| e.timestamp.format("%Y-%m-%d %H:00").to_string());

        let errors: Vec<LogEntry> = logs.iter().filter(|e| e.level.is_error()).cloned().collect();
        let (first, last) = span(&logs);

        LogStatistics {
            total_logs: logs.len(),
            time_range: TimeRange {
                start: Some(window.start.unwrap_or(first)),
                end: Some(window.end.unwrap_or(last)),
                duration_hours: Some(hours_between(first, last)),
            },
            by_level: count_by(&logs, |e| e.level.to_string()),
            most_active_features: rank(&by_feature, TOP_TAGS),
            most_active_modules: rank(&by_module, TOP_TAGS),
            by_feature,
            by_module,
            by_hour,
            error_rate: errors.len() as f64 / logs.len() as f64,
            error_distribution: ErrorDistribution {
                by_feature: count_by(&errors, |e| e.feature_tag.clone()),
                by_module: count_by(&errors, |e| e.module_tag.clone()),
            },
        }
    }

    pub async fn group_by_feature(&self, window: TimeWindow) -> BTreeMap<String, TagGroupAnalysis> {
        let logs = self.fetch(&window.query()).await;
        group_by(logs, |e| e.feature_tag.clone(), |e| e.module_tag.clone())
    }

    pub async fn group_by_module(&self, window: TimeWindow) -> BTreeMap<String, TagGroupAnalysis> {
        let logs = self.fetch(&window.query()).await;
        group_by(logs, |e| e.module_tag.clone(), |e| e.feature_tag.clone())
    }

    /// ERROR and FATAL entries, newest first
    pub async fn find_errors(
        &self,
        limit: Option<usize>,
        feature_tag: Option<&str>,
        module_tag: Option<&str>,
    ) -> Vec<LogEntry> {
        let base = LogQuery {
            feature_tag: feature_tag.map(str::to_string),
            module_tag: module_tag.map(str::to_string),
            limit,
            ..LogQuery::default()
        };

        let mut errors = self.fetch(&base.clone().level(LogLevel::Error)).await;
        errors.extend(self.fetch(&base.level(LogLevel::Fatal)).await);
        sort_newest_first(&mut errors);

        if let Some(limit) = limit {
            errors.truncate(limit);
        }
        errors
    }

    pub async fn get_user_activity(&self, user_id: &str, window: TimeWindow) -> UserActivity {
        let logs = self.fetch(&window.query().user(user_id)).await;

        if logs.is_empty() {
            return UserActivity {
                user_id: user_id.to_string(),
                total_logs: 0,
                session_duration_hours: 0.0,
                first_activity: None,
                last_activity: None,
                by_level: BTreeMap::new(),
                by_feature: BTreeMap::new(),
                by_module: BTreeMap::new(),
                top_functions: Vec::new(),
                hourly_activity: BTreeMap::new(),
                most_active_hour: None,
            };
        }

        let (first, last) = span(&logs);
        let mut hourly_activity: BTreeMap<u32, usize> = BTreeMap::new();
        for entry in &logs {
            *hourly_activity.entry(entry.timestamp.hour()).or_insert(0) += 1;
        }
        // earliest hour wins a tie
        let most_active_hour = hourly_activity
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
            .map(|(hour, _)| *hour);

        let functions = count_by(&logs, |e| e.function_name.clone());

        UserActivity {
            user_id: user_id.to_string(),
            total_logs: logs.len(),
            session_duration_hours: hours_between(first, last),
            first_activity: Some(first),
            last_activity: Some(last),
            by_level: count_by(&logs, |e| e.level.to_string()),
            by_feature: count_by(&logs, |e| e.feature_tag.clone()),
            by_module: count_by(&logs, |e| e.module_tag.clone()),
            top_functions: rank(&functions, TOP_USER_FUNCTIONS),
            hourly_activity,
            most_active_hour,
        }
    }

    /// Anomalies over the 24 hours before now
    pub async fn detect_anomalies(&self, window_hours: u32, threshold_multiplier: f64) -> Vec<Anomaly> {
        self.detect_anomalies_at(Utc::now(), window_hours, threshold_multiplier)
            .await
    }

    /// Anomalies over the 24 hours before `now`. Windows are aligned to the
    /// epoch; a `window_hours` of 0 is treated as 1.
    pub async fn detect_anomalies_at(
        &self,
        now: DateTime<Utc>,
        window_hours: u32,
        threshold_multiplier: f64,
    ) -> Vec<Anomaly> {
        let start = now - Duration::hours(ANOMALY_BASELINE_HOURS);
        let logs = self.fetch(&LogQuery::new().since(start).until(now)).await;
        if logs.is_empty() {
            return Vec::new();
        }

        let window_secs = i64::from(window_hours.max(1)) * 3600;
        let mut windows: BTreeMap<i64, Vec<&LogEntry>> = BTreeMap::new();
        for entry in &logs {
            let key = entry.timestamp.timestamp().div_euclid(window_secs);
            windows.entry(key).or_default().push(entry);
        }

        let counts: Vec<f64> = windows.values().map(|w| w.len() as f64).collect();
        let mean = counts.iter().sum::<f64>() / counts.len() as f64;
        let variance = counts.iter().map(|c| (c - mean).powi(2)).sum::<f64>() / counts.len() as f64;
        let std_dev = variance.sqrt();
        let threshold = mean + threshold_multiplier * std_dev;

        let mut anomalies: Vec<Anomaly> = windows
            .into_iter()
            .filter(|(_, entries)| entries.len() as f64 > threshold)
            .filter_map(|(key, entries)| {
                let window_start = Utc.timestamp_opt(key * window_secs, 0).single()?;
                let count = entries.len();
                let features = count_by(entries.iter().copied(), |e| e.feature_tag.clone());
                let modules = count_by(entries.iter().copied(), |e| e.module_tag.clone());

                Some(Anomaly {
                    window_start,
                    window_end: window_start.checked_add_signed(Duration::seconds(window_secs))?,
                    log_count: count,
                    expected_count: mean,
                    severity: if std_dev > 0.0 {
                        (count as f64 - mean) / std_dev
                    } else {
                        0.0
                    },
                    top_features: rank(&features, TOP_GROUP_ITEMS),
                    top_modules: rank(&modules, TOP_GROUP_ITEMS),
                    by_level: count_by(entries.iter().copied(), |e| e.level.to_string()),
                })
            })
            .collect();

        anomalies.sort_by(|a, b| b.severity.total_cmp(&a.severity));
        anomalies
    }

    pub async fn generate_report(&self, window: TimeWindow, options: ReportOptions) -> AnalysisReport {
        let statistics = self.get_statistics(window).await;

        let feature_analysis = if options.include_feature_analysis {
            Some(self.group_by_feature(window).await)
        } else {
            None
        };
        let module_analysis = if options.include_module_analysis {
            Some(self.group_by_module(window).await)
        } else {
            None
        };

        let recent_errors = self
            .find_errors(Some(REPORT_RECENT_ERRORS), None, None)
            .await
            .iter()
            .map(ErrorSummary::from)
            .collect();

        let anomalies = if options.include_anomalies {
            Some(self.detect_anomalies(1, 3.0).await)
        } else {
            None
        };

        AnalysisReport {
            generated_at: Utc::now(),
            time_range: window,
            statistics,
            feature_analysis,
            module_analysis,
            recent_errors,
            anomalies,
        }
    }
}

fn count_by<'a, I, F>(entries: I, key: F) -> BTreeMap<String, usize>
where
    I: IntoIterator<Item = &'a LogEntry>,
    F: Fn(&LogEntry) -> String,
{
    let mut counts = BTreeMap::new();
    for entry in entries {
        *counts.entry(key(entry)).or_insert(0) += 1;
    }
    counts
}

/// Top `n` by count descending, ties broken by name
fn rank(counts: &BTreeMap<String, usize>, n: usize) -> RankedCounts {
    let mut ranked: RankedCounts = counts.iter().map(|(k, v)| (k.clone(), *v)).collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(n);
    ranked
}

/// Earliest and latest timestamps; `logs` must be non-empty
fn span(logs: &[LogEntry]) -> (DateTime<Utc>, DateTime<Utc>) {
    let first = logs.iter().map(|e| e.timestamp).min().unwrap_or_else(Utc::now);
    let last = logs.iter().map(|e| e.timestamp).max().unwrap_or(first);
    (first, last)
}

fn hours_between(first: DateTime<Utc>, last: DateTime<Utc>) -> f64 {
    (last - first).num_milliseconds() as f64 / 3_600_000.0
}

fn group_by<G, C>(logs: Vec<LogEntry>, group_key: G, cross_key: C) -> BTreeMap<String, TagGroupAnalysis>
where
    G: Fn(&LogEntry) -> String,
    C: Fn(&LogEntry) -> String,
{
    let mut groups: BTreeMap<String, Vec<LogEntry>> = BTreeMap::new();
    for entry in logs {
        groups.entry(group_key(&entry)).or_default().push(entry);
    }

    groups
        .into_iter()
        .map(|(name, entries)| {
            let (first, last) = span(&entries);
            let time_span_hours = hours_between(first, last);
            let error_count = entries.iter().filter(|e| e.level.is_error()).count();
            let cross_tags = count_by(&entries, &cross_key);
            let functions = count_by(&entries, |e| e.function_name.clone());
            let total = entries.len();

            let analysis = TagGroupAnalysis {
                total_logs: total,
                by_level: count_by(&entries, |e| e.level.to_string()),
                top_cross_tags: rank(&cross_tags, TOP_GROUP_ITEMS),
                cross_tags,
                top_functions: rank(&functions, TOP_GROUP_ITEMS),
                error_rate: error_count as f64 / total as f64,
                error_count,
                time_span_hours,
                first_log: first,
                last_log: last,
                logs_per_hour: total as f64 / time_span_hours.max(1.0),
            };
            (name, analysis)
        })
        .collect()
}
