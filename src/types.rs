use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// A declarative load test: what to hit and how hard.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TestPlan {
    #[serde(default = "default_plan_name")]
    pub name: String,
    #[serde(default)]
    pub targets: Vec<Target>,
    #[serde(rename = "loadProfile", default)]
    pub load_profile: LoadProfile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct LoadProfile {
    #[serde(default = "default_users")]
    pub users: u32,
    #[serde(default = "default_threads")]
    pub threads: u32,
    #[serde(rename = "rampUpSeconds", default = "default_ramp_up")]
    pub ramp_up_seconds: u64,
    #[serde(rename = "durationSeconds", default = "default_duration")]
    pub duration_seconds: u64,
    #[serde(rename = "thinkTimeSeconds", default = "default_think_time")]
    pub think_time_seconds: u64,
}

impl Default for LoadProfile {
    fn default() -> Self {
        Self {
            users: default_users(),
            threads: default_threads(),
            ramp_up_seconds: default_ramp_up(),
            duration_seconds: default_duration(),
            think_time_seconds: default_think_time(),
        }
    }
}

/// One protocol endpoint under test. The `type` field selects the variant.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Target {
    Http(HttpTarget),
    Database(DatabaseTarget),
    MessageQueue(QueueTarget),
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct HttpTarget {
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(rename = "expectedStatus", default = "default_expected_status")]
    pub expected_status: u16,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DatabaseTarget {
    #[serde(rename = "dbType", default)]
    pub db_type: String,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default = "default_database")]
    pub database: String,
    #[serde(default = "default_query")]
    pub query: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct QueueTarget {
    #[serde(rename = "mqType", default)]
    pub mq_type: String,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default = "default_queue")]
    pub queue: String,
}

/// The record of a single executed request.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Observation {
    /// Seconds since the Unix epoch at which the request started.
    pub timestamp: f64,
    #[serde(rename = "userId")]
    pub user_id: usize,
    #[serde(rename = "requestId")]
    pub request_id: usize,
    #[serde(flatten)]
    pub details: RequestDetails,
    /// Seconds from call start to response (or to failure).
    #[serde(rename = "responseTime")]
    pub response_time: f64,
    pub success: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "protocol", rename_all = "snake_case")]
pub enum RequestDetails {
    Http {
        method: String,
        url: String,
        #[serde(rename = "statusCode")]
        status_code: Option<u16>,
        #[serde(rename = "expectedStatus")]
        expected_status: u16,
        #[serde(rename = "responseSize")]
        response_size: usize,
    },
    Database {
        #[serde(rename = "dbType")]
        db_type: String,
        host: String,
        port: u16,
        database: String,
        query: String,
    },
    MessageQueue {
        #[serde(rename = "mqType")]
        mq_type: String,
        host: String,
        port: u16,
        queue: String,
        operation: String,
    },
}

impl Observation {
    pub fn status_code(&self) -> Option<u16> {
        match &self.details {
            RequestDetails::Http { status_code, .. } => *status_code,
            _ => None,
        }
    }

    /// Key used to group observations by endpoint.
    pub fn target_key(&self) -> String {
        match &self.details {
            RequestDetails::Http { method, url, .. } => format!("{} {}", method, url),
            RequestDetails::Database {
                db_type,
                host,
                port,
                database,
                ..
            } => format!("{} {}:{}/{}", db_type, host, port, database),
            RequestDetails::MessageQueue {
                mq_type,
                host,
                port,
                queue,
                ..
            } => format!("{} {}:{}/{}", mq_type, host, port, queue),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_requests: usize,
    pub successful_requests: usize,
    pub failed_requests: usize,
    pub success_rate: f64,
    pub avg_response_time: f64,
    pub min_response_time: f64,
    pub max_response_time: f64,
    pub throughput: f64,
    pub errors: Vec<String>,
    pub percentiles: BTreeMap<String, f64>,
    pub response_time_distribution: ResponseTimeDistribution,
    pub error_analysis: ErrorAnalysis,
    pub performance_insights: PerformanceInsights,
    pub target_breakdown: BTreeMap<String, GroupStats>,
    pub user_breakdown: BTreeMap<usize, GroupStats>,
    pub time_series_analysis: TimeSeriesAnalysis,
    pub test_duration: f64,
    pub requests_per_second: f64,
}

/// Fixed response time bands, in declaration order from fastest to slowest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum LatencyBucket {
    #[serde(rename = "<100ms")]
    VeryFast,
    #[serde(rename = "100-500ms")]
    Fast,
    #[serde(rename = "500ms-1s")]
    Moderate,
    #[serde(rename = "1-3s")]
    Slow,
    #[serde(rename = ">3s")]
    VerySlow,
}

impl LatencyBucket {
    pub const ALL: [LatencyBucket; 5] = [
        LatencyBucket::VeryFast,
        LatencyBucket::Fast,
        LatencyBucket::Moderate,
        LatencyBucket::Slow,
        LatencyBucket::VerySlow,
    ];

    pub fn for_response_time(seconds: f64) -> Self {
        if seconds < 0.1 {
            LatencyBucket::VeryFast
        } else if seconds < 0.5 {
            LatencyBucket::Fast
        } else if seconds < 1.0 {
            LatencyBucket::Moderate
        } else if seconds < 3.0 {
            LatencyBucket::Slow
        } else {
            LatencyBucket::VerySlow
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseTimeDistribution {
    pub buckets: BTreeMap<LatencyBucket, usize>,
    pub percentages: BTreeMap<LatencyBucket, f64>,
    pub total_requests: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorAnalysis {
    pub error_count: usize,
    pub error_types: BTreeMap<String, usize>,
    pub status_codes: BTreeMap<String, usize>,
    pub common_errors: Vec<ErrorFrequency>,
    pub error_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorFrequency {
    pub error: String,
    pub count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Assessment {
    Excellent,
    Good,
    Acceptable,
    Poor,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceInsights {
    /// `None` when no observation carried a response time.
    pub overall_assessment: Option<Assessment>,
    pub strengths: Vec<String>,
    pub concerns: Vec<String>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupStats {
    pub total_requests: usize,
    pub successful_requests: usize,
    pub failed_requests: usize,
    pub success_rate: f64,
    pub avg_response_time: f64,
    pub min_response_time: f64,
    pub max_response_time: f64,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSeriesAnalysis {
    pub buckets: Vec<TimeBucket>,
    pub trend: TrendAnalysis,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeBucket {
    /// Start of the minute, in seconds since the Unix epoch.
    pub timestamp: i64,
    pub requests: usize,
    pub success_rate: f64,
    pub avg_response_time: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Increasing,
    Decreasing,
    Stable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendAnalysis {
    pub response_time_trend: Trend,
    pub success_rate_trend: Trend,
    pub performance_degradation: bool,
    pub stability_score: f64,
}

impl Default for TrendAnalysis {
    fn default() -> Self {
        Self {
            response_time_trend: Trend::Stable,
            success_rate_trend: Trend::Stable,
            performance_degradation: false,
            stability_score: 1.0,
        }
    }
}

/// Lifecycle of a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunState {
    Idle,
    Validating,
    Running,
    Draining,
    Completed,
    Cancelled,
    ValidationFailed,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    #[serde(rename = "runId")]
    pub run_id: String,
    #[serde(rename = "testName")]
    pub test_name: String,
    pub state: RunState,
    #[serde(rename = "startedAt")]
    pub started_at: String,
    #[serde(rename = "finishedAt")]
    pub finished_at: String,
    #[serde(rename = "durationSeconds")]
    pub duration_seconds: f64,
    pub observations: Vec<Observation>,
    pub summary: Summary,
}

#[derive(Debug, Serialize)]
pub struct Metric {
    #[serde(rename = "runId")]
    pub run_id: String,
    pub timestamp: String,
    #[serde(rename = "requestCount")]
    pub request_count: usize,
    #[serde(rename = "successCount")]
    pub success_count: usize,
    #[serde(rename = "errorCount")]
    pub error_count: usize,
    #[serde(rename = "avgResponseTime")]
    pub avg_response_time: f64,
    #[serde(rename = "activeUsers")]
    pub active_users: u64,
    pub state: RunState,
}

impl Metric {
    pub fn from_report(report: &RunReport, active_users: u64) -> Self {
        Self {
            run_id: report.run_id.clone(),
            timestamp: report.finished_at.clone(),
            request_count: report.summary.total_requests,
            success_count: report.summary.successful_requests,
            error_count: report.summary.failed_requests,
            avg_response_time: report.summary.avg_response_time,
            active_users,
            state: report.state,
        }
    }
}

fn default_plan_name() -> String {
    "Unnamed Test".to_string()
}

fn default_users() -> u32 {
    10
}

fn default_threads() -> u32 {
    4
}

fn default_ramp_up() -> u64 {
    30
}

fn default_duration() -> u64 {
    60
}

fn default_think_time() -> u64 {
    1
}

fn default_method() -> String {
    "GET".to_string()
}

fn default_expected_status() -> u16 {
    200
}

fn default_database() -> String {
    "test".to_string()
}

fn default_query() -> String {
    "SELECT 1".to_string()
}

fn default_queue() -> String {
    "test_queue".to_string()
}
