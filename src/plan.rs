use crate::error::{PlanError, ValidationError};
use crate::types::{DatabaseTarget, HttpTarget, LoadProfile, QueueTarget, Target, TestPlan};
use reqwest::Method;
use serde_json::Value;
use std::time::Duration;

impl TestPlan {
    /// Parses and validates a JSON plan. Targets without a `type` are HTTP.
    pub fn from_json(input: &str) -> Result<Self, PlanError> {
        let mut value: Value = serde_json::from_str(input)?;

        if let Some(targets) = value.get_mut("targets").and_then(Value::as_array_mut) {
            for (index, target) in targets.iter_mut().enumerate() {
                let Some(fields) = target.as_object_mut() else {
                    continue;
                };
                let kind = fields
                    .entry("type")
                    .or_insert_with(|| Value::String("http".to_string()));
                let kind = kind.as_str().unwrap_or_default();
                if !Target::KINDS.contains(&kind) {
                    return Err(ValidationError::UnsupportedTarget {
                        index,
                        kind: kind.to_string(),
                    }
                    .into());
                }
            }
        }

        let plan: TestPlan = serde_json::from_value(value)?;
        plan.validate()?;
        Ok(plan)
    }

    /// Virtual users across every target; each target gets its own `users`.
    pub fn total_users(&self) -> u64 {
        self.load_profile.users as u64 * self.targets.len() as u64
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.targets.is_empty() {
            return Err(ValidationError::NoTargets);
        }
        self.load_profile.validate()?;
        for (index, target) in self.targets.iter().enumerate() {
            target.validate(index)?;
        }
        Ok(())
    }
}

impl LoadProfile {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let checks = [
            ("users", self.users as u64),
            ("threads", self.threads as u64),
            ("durationSeconds", self.duration_seconds),
            ("thinkTimeSeconds", self.think_time_seconds),
        ];
        for (field, value) in checks {
            if value == 0 {
                return Err(ValidationError::InvalidLoadProfile { field });
            }
        }
        Ok(())
    }

    /// Requests each virtual user issues: `duration div thinkTime`.
    pub fn iteration_budget(&self) -> u64 {
        self.duration_seconds
            .checked_div(self.think_time_seconds)
            .unwrap_or(0)
    }

    pub fn ramp_up_iterations(&self) -> u64 {
        self.ramp_up_seconds
            .checked_div(self.think_time_seconds)
            .unwrap_or(0)
    }

    /// Delay before request `iteration`, or `None` once ramp-up is over.
    pub fn ramp_up_delay(&self, iteration: u64) -> Option<Duration> {
        let ramp_up_iterations = self.ramp_up_iterations();
        if iteration >= ramp_up_iterations {
            return None;
        }
        let step = self.ramp_up_seconds as f64 / ramp_up_iterations as f64;
        Some(Duration::from_secs_f64((iteration + 1) as f64 * step))
    }

    pub fn think_time(&self) -> Duration {
        Duration::from_secs(self.think_time_seconds)
    }

    /// Users assigned to each logical thread group; the first
    /// `users mod threads` groups take one extra.
    pub fn users_per_group(&self) -> Vec<u32> {
        if self.threads == 0 {
            return Vec::new();
        }
        let base = self.users / self.threads;
        let remainder = self.users % self.threads;
        (0..self.threads)
            .map(|group| base + u32::from(group < remainder))
            .collect()
    }
}

impl Target {
    pub const KINDS: [&'static str; 3] = ["http", "database", "message_queue"];

    pub fn kind(&self) -> &'static str {
        match self {
            Target::Http(_) => "http",
            Target::Database(_) => "database",
            Target::MessageQueue(_) => "message_queue",
        }
    }

    pub fn validate(&self, index: usize) -> Result<(), ValidationError> {
        match self {
            Target::Http(http) => {
                if http.url.trim().is_empty() {
                    return Err(ValidationError::MissingUrl { index });
                }
                if Method::from_bytes(http.method.to_uppercase().as_bytes()).is_err() {
                    return Err(ValidationError::InvalidMethod {
                        index,
                        method: http.method.clone(),
                    });
                }
            }
            Target::Database(db) => {
                if db.db_type.trim().is_empty() {
                    return Err(ValidationError::MissingDbType { index });
                }
                if db.host.trim().is_empty() {
                    return Err(ValidationError::MissingDbHost { index });
                }
            }
            Target::MessageQueue(mq) => {
                if mq.mq_type.trim().is_empty() {
                    return Err(ValidationError::MissingMqType { index });
                }
                if mq.host.trim().is_empty() {
                    return Err(ValidationError::MissingMqHost { index });
                }
            }
        }
        Ok(())
    }

    pub fn describe(&self) -> String {
        match self {
            Target::Http(HttpTarget { method, url, .. }) => {
                format!("{} {}", method.to_uppercase(), url)
            }
            Target::Database(db) => format!(
                "{} at {}:{} ({})",
                db.db_type,
                db.host,
                db.resolved_port(),
                db.database
            ),
            Target::MessageQueue(mq) => format!(
                "{} at {}:{} ({})",
                mq.mq_type,
                mq.host,
                mq.resolved_port(),
                mq.queue
            ),
        }
    }
}

impl DatabaseTarget {
    pub fn resolved_port(&self) -> u16 {
        self.port.unwrap_or_else(|| default_db_port(&self.db_type))
    }
}

impl QueueTarget {
    pub fn resolved_port(&self) -> u16 {
        self.port.unwrap_or_else(|| default_mq_port(&self.mq_type))
    }
}

pub fn default_db_port(db_type: &str) -> u16 {
    match db_type.to_lowercase().as_str() {
        "postgresql" => 5432,
        "mysql" => 3306,
        "mongodb" => 27017,
        "sqlite" => 0,
        "redis" => 6379,
        "elasticsearch" => 9200,
        _ => 5432,
    }
}

pub fn default_mq_port(mq_type: &str) -> u16 {
    match mq_type.to_lowercase().as_str() {
        "rabbitmq" => 5672,
        "kafka" => 9092,
        "redis" => 6379,
        "activemq" => 61616,
        "sqs" | "pubsub" => 0,
        _ => 5672,
    }
}
