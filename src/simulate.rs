//! Latency model for database and message-queue targets.
//!
//! No backend is contacted: each call sleeps for a latency derived from the
//! backend type, the shape of the operation and a ±20% jitter, then reports
//! the measured elapsed time.

use crate::executor::epoch_seconds;
use crate::types::{DatabaseTarget, Observation, QueueTarget, RequestDetails};
use log::debug;
use rand::Rng;
use std::time::Duration;
use tokio::time::{sleep, Instant};

const SIMULATED_FAULT: &str = "Simulated fault";

pub fn db_base_latency(db_type: &str) -> f64 {
    match db_type.to_lowercase().as_str() {
        "postgresql" => 0.05,
        "mysql" => 0.08,
        "mongodb" => 0.03,
        "sqlite" => 0.02,
        "redis" => 0.01,
        "elasticsearch" => 0.1,
        _ => 0.05,
    }
}

pub fn mq_base_latency(mq_type: &str) -> f64 {
    match mq_type.to_lowercase().as_str() {
        "rabbitmq" => 0.02,
        "kafka" => 0.01,
        "redis" => 0.005,
        "activemq" => 0.03,
        "sqs" => 0.05,
        "pubsub" => 0.04,
        _ => 0.02,
    }
}

/// Cost multiplier for a query, judged from its text.
pub fn query_complexity(query: &str) -> f64 {
    let query = query.to_lowercase();
    if query.contains("select") {
        if ["count", "sum", "avg"].iter().any(|f| query.contains(f)) {
            1.5
        } else if query.contains("join") {
            2.0
        } else {
            1.0
        }
    } else if query.contains("insert") || query.contains("update") {
        1.2
    } else if query.contains("delete") {
        1.3
    } else {
        1.0
    }
}

fn jitter() -> f64 {
    rand::rng().random_range(0.8..=1.2)
}

pub struct Simulator {
    fault_rate: f64,
}

impl Simulator {
    pub fn new(fault_rate: f64) -> Self {
        Self { fault_rate }
    }

    pub fn query_latency(&self, db_type: &str, query: &str) -> Duration {
        Duration::from_secs_f64(db_base_latency(db_type) * query_complexity(query) * jitter())
    }

    pub fn send_latency(&self, mq_type: &str) -> Duration {
        Duration::from_secs_f64(mq_base_latency(mq_type) * jitter())
    }

    fn inject_fault(&self) -> bool {
        self.fault_rate > 0.0 && rand::rng().random::<f64>() < self.fault_rate
    }

    /// Sleeps for `latency` and returns the measured time plus an error if a
    /// fault was injected.
    async fn simulate(&self, latency: Duration) -> (f64, Option<String>) {
        let started = Instant::now();
        let faulted = self.inject_fault();
        sleep(latency).await;
        let error = faulted.then(|| SIMULATED_FAULT.to_string());
        (started.elapsed().as_secs_f64(), error)
    }

    pub async fn query(&self, target: &DatabaseTarget, user_id: usize, request_id: usize) -> Observation {
        let timestamp = epoch_seconds();
        let latency = self.query_latency(&target.db_type, &target.query);
        let (response_time, error) = self.simulate(latency).await;
        if let Some(error) = &error {
            debug!("[user {}] {} query {} failed: {}", user_id, target.db_type, request_id, error);
        }

        Observation {
            timestamp,
            user_id,
            request_id,
            details: RequestDetails::Database {
                db_type: target.db_type.clone(),
                host: target.host.clone(),
                port: target.resolved_port(),
                database: target.database.clone(),
                query: target.query.clone(),
            },
            response_time,
            success: error.is_none(),
            error,
        }
    }

    pub async fn send(&self, target: &QueueTarget, user_id: usize, request_id: usize) -> Observation {
        let timestamp = epoch_seconds();
        let latency = self.send_latency(&target.mq_type);
        let (response_time, error) = self.simulate(latency).await;
        if let Some(error) = &error {
            debug!("[user {}] {} send {} failed: {}", user_id, target.mq_type, request_id, error);
        }

        Observation {
            timestamp,
            user_id,
            request_id,
            details: RequestDetails::MessageQueue {
                mq_type: target.mq_type.clone(),
                host: target.host.clone(),
                port: target.resolved_port(),
                queue: target.queue.clone(),
                operation: "send".to_string(),
            },
            response_time,
            success: error.is_none(),
            error,
        }
    }
}
