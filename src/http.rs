use crate::config::ExecutorConfig;
use crate::executor::epoch_seconds;
use crate::types::{HttpTarget, Observation, RequestDetails};
use log::debug;
use reqwest::{Client, Method, Url};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;

/// Caps concurrent connections globally and per host.
struct ConnectionLimits {
    global: Arc<Semaphore>,
    per_host_cap: usize,
    per_host: Mutex<HashMap<String, Arc<Semaphore>>>,
}

impl ConnectionLimits {
    fn new(global_cap: usize, per_host_cap: usize) -> Self {
        Self {
            global: Arc::new(Semaphore::new(global_cap)),
            per_host_cap,
            per_host: Mutex::new(HashMap::new()),
        }
    }

    fn host_semaphore(&self, host: &str) -> Arc<Semaphore> {
        let mut hosts = self.per_host.lock().unwrap_or_else(|e| e.into_inner());
        hosts
            .entry(host.to_string())
            .or_insert_with(|| Arc::new(Semaphore::new(self.per_host_cap)))
            .clone()
    }

    /// Waits for a per-host slot first, then a global one.
    async fn acquire(
        &self,
        host: &str,
    ) -> Result<(OwnedSemaphorePermit, OwnedSemaphorePermit), tokio::sync::AcquireError> {
        let host_permit = self.host_semaphore(host).acquire_owned().await?;
        let global_permit = self.global.clone().acquire_owned().await?;
        Ok((host_permit, global_permit))
    }
}

/// Sends real HTTP requests through one shared, bounded client.
pub struct HttpExecutor {
    client: Client,
    limits: ConnectionLimits,
}

impl HttpExecutor {
    pub fn new(config: &ExecutorConfig) -> reqwest::Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(config.max_connections_per_host)
            .build()?;

        Ok(Self {
            client,
            limits: ConnectionLimits::new(
                config.max_connections,
                config.max_connections_per_host,
            ),
        })
    }

    pub async fn execute(&self, target: &HttpTarget, user_id: usize, request_id: usize) -> Observation {
        let timestamp = epoch_seconds();
        let started = Instant::now();
        let method_name = target.method.to_uppercase();

        let host = Url::parse(&target.url)
            .ok()
            .and_then(|url| url.host_str().map(str::to_string))
            .unwrap_or_default();

        let outcome = match self.limits.acquire(&host).await {
            Ok(_permits) => {
                let method = Method::from_bytes(method_name.as_bytes()).unwrap_or(Method::GET);
                let mut request_builder = self.client.request(method, &target.url);
                for (key, value) in &target.headers {
                    request_builder = request_builder.header(key, value);
                }

                match request_builder.send().await {
                    Ok(response) => {
                        let status = response.status().as_u16();
                        let response_time = started.elapsed().as_secs_f64();
                        let response_size = response.bytes().await.map(|b| b.len()).unwrap_or(0);
                        let success = status == target.expected_status;
                        let error = (!success).then(|| {
                            format!("Expected {}, got {}", target.expected_status, status)
                        });
                        RequestOutcome {
                            status_code: Some(status),
                            response_size,
                            response_time,
                            success,
                            error,
                        }
                    }
                    Err(e) => {
                        let error = if e.is_timeout() {
                            "Request timeout".to_string()
                        } else {
                            e.to_string()
                        };
                        RequestOutcome::failed(started, error)
                    }
                }
            }
            Err(e) => RequestOutcome::failed(started, e.to_string()),
        };

        if let Some(error) = &outcome.error {
            debug!(
                "[user {}] {} {} request {} failed: {}",
                user_id, method_name, target.url, request_id, error
            );
        }

        Observation {
            timestamp,
            user_id,
            request_id,
            details: RequestDetails::Http {
                method: method_name,
                url: target.url.clone(),
                status_code: outcome.status_code,
                expected_status: target.expected_status,
                response_size: outcome.response_size,
            },
            response_time: outcome.response_time,
            success: outcome.success,
            error: outcome.error,
        }
    }
}

struct RequestOutcome {
    status_code: Option<u16>,
    response_size: usize,
    response_time: f64,
    success: bool,
    error: Option<String>,
}

impl RequestOutcome {
    fn failed(started: Instant, error: String) -> Self {
        Self {
            status_code: None,
            response_size: 0,
            response_time: started.elapsed().as_secs_f64(),
            success: false,
            error: Some(error),
        }
    }
}
