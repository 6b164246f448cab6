use crate::config::ExecutorConfig;
use crate::error::ValidationError;
use crate::executor::{Executor, ProtocolExecutor};
use crate::stats::summarize;
use crate::types::{Observation, RunReport, RunState, TestPlan};
use crate::user::{run_user, StopHandle};
use chrono::Utc;
use futures::stream::{FuturesUnordered, StreamExt};
use log::{debug, error, info, warn};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Instant;
use tokio::task::{JoinError, JoinHandle};
use uuid::Uuid;

/// Drives every virtual user of a plan and collects their observations.
///
/// Cloning is cheap and every clone controls the same run, so a clone can be
/// handed to a signal handler to call [`LoadTestRunner::stop`].
#[derive(Clone)]
pub struct LoadTestRunner {
    executor: Arc<dyn Executor>,
    stop: StopHandle,
    state: Arc<Mutex<RunState>>,
}

impl LoadTestRunner {
    pub fn new(config: &ExecutorConfig) -> reqwest::Result<Self> {
        Ok(Self::with_executor(Arc::new(ProtocolExecutor::new(config)?)))
    }

    pub fn with_executor(executor: Arc<dyn Executor>) -> Self {
        Self {
            executor,
            stop: StopHandle::new(),
            state: Arc::new(Mutex::new(RunState::Idle)),
        }
    }

    pub fn state(&self) -> RunState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_state(&self, state: RunState) {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = state;
    }

    /// Asks a running plan to wind down. Virtual users finish the request in
    /// flight and exit; the run then ends as [`RunState::Cancelled`].
    pub fn stop(&self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if *state == RunState::Running {
            *state = RunState::Draining;
            self.stop.stop();
            info!("🛑 Stop requested, draining virtual users");
        } else {
            info!("No test currently running ({:?})", *state);
        }
    }

    /// Runs `plan` and returns the observations together with their summary.
    pub async fn run_plan(&self, plan: &TestPlan) -> Result<RunReport, ValidationError> {
        let run_id = Uuid::new_v4().to_string();
        let started_at = Utc::now();
        let clock = Instant::now();

        info!("🧪 Starting load test {} ({})", plan.name, run_id);

        let observations = self.execute(plan).await?;
        let summary = summarize(&observations);
        let state = self.state();

        info!(
            "✅ Test {} {:?}: {} requests ({} ok, {} failed), avg {:.3}s in {:.2}s",
            plan.name,
            state,
            summary.total_requests,
            summary.successful_requests,
            summary.failed_requests,
            summary.avg_response_time,
            clock.elapsed().as_secs_f64()
        );

        Ok(RunReport {
            run_id,
            test_name: plan.name.clone(),
            state,
            started_at: started_at.to_rfc3339(),
            finished_at: Utc::now().to_rfc3339(),
            duration_seconds: clock.elapsed().as_secs_f64(),
            observations,
            summary,
        })
    }

    /// Validates `plan`, launches every virtual user of every target at once
    /// and waits for all of them. Observations arrive grouped by user in
    /// completion order; a user whose task fails contributes nothing.
    ///
    /// A runner drives one plan at a time: while a run is active, further
    /// calls fail with [`ValidationError::RunInProgress`]. Dropping the
    /// returned future aborts every virtual user and cancels the run.
    pub async fn execute(&self, plan: &TestPlan) -> Result<Vec<Observation>, ValidationError> {
        {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            if matches!(
                *state,
                RunState::Validating | RunState::Running | RunState::Draining
            ) {
                warn!("⚠️ Refusing {}: a test is already running", plan.name);
                return Err(ValidationError::RunInProgress);
            }
            *state = RunState::Validating;
        }

        if let Err(e) = plan.validate() {
            error!("❌ Test plan {} rejected: {}", plan.name, e);
            self.set_state(RunState::ValidationFailed);
            return Err(e);
        }

        self.stop.reset();
        self.set_state(RunState::Running);
        let _abandoned = AbandonGuard { runner: self };

        let profile = plan.load_profile;
        info!(
            "🎯 {} target(s) × {} users over {} thread group(s), {} requests per user",
            plan.targets.len(),
            profile.users,
            profile.threads,
            profile.iteration_budget()
        );

        let mut users = FuturesUnordered::new();
        let mut next_user_id = 0usize;

        for target in &plan.targets {
            let target = Arc::new(target.clone());
            let groups = profile.users_per_group();
            info!("Starting {} test for {} with groups {:?}", target.kind(), target.describe(), groups);

            for (group, group_users) in groups.into_iter().enumerate() {
                for _ in 0..group_users {
                    let user_id = next_user_id;
                    next_user_id += 1;
                    debug!("user {} assigned to group {}", user_id, group);

                    let handle = UserTask(tokio::spawn(run_user(
                        self.executor.clone(),
                        target.clone(),
                        user_id,
                        profile,
                        self.stop.signal(),
                    )));
                    users.push(async move { (user_id, handle.await) });
                }
            }
        }

        let mut observations = Vec::new();
        let mut failed_users = 0usize;
        while let Some((user_id, joined)) = users.next().await {
            match joined {
                Ok(user_observations) => observations.extend(user_observations),
                Err(e) => {
                    failed_users += 1;
                    error!("❌ Virtual user {} failed: {}", user_id, e);
                }
            }
        }

        if failed_users > 0 {
            warn!("⚠️ {} of {} virtual users failed", failed_users, next_user_id);
        }

        {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            *state = if *state == RunState::Draining {
                RunState::Cancelled
            } else {
                RunState::Completed
            };
        }

        Ok(observations)
    }
}

/// Join handle that aborts its virtual user when dropped.
struct UserTask(JoinHandle<Vec<Observation>>);

impl Future for UserTask {
    type Output = Result<Vec<Observation>, JoinError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.0).poll(cx)
    }
}

impl Drop for UserTask {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Cancels the run if `execute` is dropped before its users finish.
struct AbandonGuard<'a> {
    runner: &'a LoadTestRunner,
}

impl Drop for AbandonGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.runner.state.lock().unwrap_or_else(|e| e.into_inner());
        if matches!(*state, RunState::Running | RunState::Draining) {
            self.runner.stop.stop();
            *state = RunState::Cancelled;
            warn!("⚠️ Run abandoned, virtual users aborted");
        }
    }
}
