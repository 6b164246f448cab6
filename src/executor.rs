use crate::config::ExecutorConfig;
use crate::http::HttpExecutor;
use crate::simulate::Simulator;
use crate::types::{Observation, Target};
use async_trait::async_trait;
use chrono::Utc;

/// Issues one request against a target and records what happened.
///
/// Implementations never fail: timeouts, transport errors, unexpected
/// statuses and injected faults all come back as an [`Observation`] with
/// `success == false` and a populated `error`.
#[async_trait]
pub trait Executor: Send + Sync {
    async fn execute(&self, target: &Target, user_id: usize, request_id: usize) -> Observation;
}

/// Dispatches each request to the HTTP client or the latency simulator
/// depending on the target variant.
pub struct ProtocolExecutor {
    http: HttpExecutor,
    simulator: Simulator,
}

impl ProtocolExecutor {
    pub fn new(config: &ExecutorConfig) -> reqwest::Result<Self> {
        Ok(Self {
            http: HttpExecutor::new(config)?,
            simulator: Simulator::new(config.simulated_fault_rate),
        })
    }
}

#[async_trait]
impl Executor for ProtocolExecutor {
    async fn execute(&self, target: &Target, user_id: usize, request_id: usize) -> Observation {
        match target {
            Target::Http(http) => self.http.execute(http, user_id, request_id).await,
            Target::Database(db) => self.simulator.query(db, user_id, request_id).await,
            Target::MessageQueue(mq) => self.simulator.send(mq, user_id, request_id).await,
        }
    }
}

/// Wall-clock seconds since the Unix epoch.
pub fn epoch_seconds() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}
