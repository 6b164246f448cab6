use thiserror::Error;

/// Reasons a test plan is rejected before any virtual user starts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("test plan must have at least one target")]
    NoTargets,
    #[error("load profile field `{field}` must be at least 1")]
    InvalidLoadProfile { field: &'static str },
    #[error("HTTP target {index} must have a URL")]
    MissingUrl { index: usize },
    #[error("HTTP target {index} has an invalid method {method:?}")]
    InvalidMethod { index: usize, method: String },
    #[error("database target {index} must have a dbType")]
    MissingDbType { index: usize },
    #[error("database target {index} must have a host")]
    MissingDbHost { index: usize },
    #[error("message queue target {index} must have a mqType")]
    MissingMqType { index: usize },
    #[error("message queue target {index} must have a host")]
    MissingMqHost { index: usize },
    #[error("target {index} has unsupported type {kind:?}")]
    UnsupportedTarget { index: usize, kind: String },
    #[error("a test is already running on this runner")]
    RunInProgress,
}

/// Failure to turn a JSON document into a runnable plan.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("malformed test plan: {0}")]
    Parse(#[from] serde_json::Error),
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}
