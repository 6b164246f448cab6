//! Load generation and results aggregation.
//!
//! A [`TestPlan`] names one or more targets (HTTP endpoints, databases,
//! message queues) and a load profile. [`LoadTestRunner`] runs a virtual user
//! loop per simulated client against every target concurrently, and
//! [`summarize`] reduces the resulting observations to percentiles,
//! distributions, error clusters and trends.

pub mod config;
pub mod error;
pub mod executor;
pub mod http;
pub mod load_test;
pub mod plan;
pub mod simulate;
pub mod stats;
pub mod types;
pub mod user;

pub use config::{ExecutorConfig, WorkerConfig};
pub use error::{PlanError, ValidationError};
pub use executor::{Executor, ProtocolExecutor};
pub use load_test::LoadTestRunner;
pub use stats::summarize;
pub use types::{
    LoadProfile, Observation, RequestDetails, RunReport, RunState, Summary, Target, TestPlan,
};
pub use user::{StopHandle, StopSignal};
