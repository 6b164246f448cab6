use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use swarmload::types::{HttpTarget, LoadProfile, Observation, RequestDetails, Target, TestPlan};
use swarmload::Executor;

// Not every test uses every helper.
#[allow(dead_code)]
pub const BASE_TIMESTAMP: f64 = 1_700_000_040.0;

/// Executor returning canned HTTP-style results without touching the network.
///
/// Timestamps are derived from the user and request ids, so a run's summary
/// is the same no matter how fast the test machine is.
pub struct ScriptedExecutor {
    pub status: u16,
    pub response_time: f64,
    /// This user's requests panic instead of returning.
    pub panic_for_user: Option<usize>,
    pub calls: AtomicUsize,
}

#[allow(dead_code)]
impl ScriptedExecutor {
    pub fn returning(status: u16, response_time: f64) -> Self {
        Self {
            status,
            response_time,
            panic_for_user: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn panicking_for(mut self, user_id: usize) -> Self {
        self.panic_for_user = Some(user_id);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Executor for ScriptedExecutor {
    async fn execute(&self, target: &Target, user_id: usize, request_id: usize) -> Observation {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.panic_for_user == Some(user_id) {
            panic!("scripted executor fault for user {}", user_id);
        }

        let (details, success) = match target {
            Target::Http(http) => (
                RequestDetails::Http {
                    method: http.method.clone(),
                    url: http.url.clone(),
                    status_code: Some(self.status),
                    expected_status: http.expected_status,
                    response_size: 2,
                },
                self.status == http.expected_status,
            ),
            Target::Database(db) => (
                RequestDetails::Database {
                    db_type: db.db_type.clone(),
                    host: db.host.clone(),
                    port: db.resolved_port(),
                    database: db.database.clone(),
                    query: db.query.clone(),
                },
                true,
            ),
            Target::MessageQueue(mq) => (
                RequestDetails::MessageQueue {
                    mq_type: mq.mq_type.clone(),
                    host: mq.host.clone(),
                    port: mq.resolved_port(),
                    queue: mq.queue.clone(),
                    operation: "send".to_string(),
                },
                true,
            ),
        };

        Observation {
            timestamp: BASE_TIMESTAMP + request_id as f64 * 0.02 + user_id as f64 * 0.001,
            user_id,
            request_id,
            details,
            response_time: self.response_time,
            success,
            error: (!success).then(|| format!("Expected 200, got {}", self.status)),
        }
    }
}

#[allow(dead_code)]
pub fn http_target(url: &str) -> Target {
    Target::Http(HttpTarget {
        url: url.to_string(),
        method: "GET".to_string(),
        headers: HashMap::new(),
        expected_status: 200,
    })
}

#[allow(dead_code)]
pub fn build_plan(targets: Vec<Target>, users: u32, duration: u64, think_time: u64) -> TestPlan {
    TestPlan {
        name: "scripted".to_string(),
        targets,
        load_profile: LoadProfile {
            users,
            threads: 2,
            ramp_up_seconds: 0,
            duration_seconds: duration,
            think_time_seconds: think_time,
        },
    }
}
