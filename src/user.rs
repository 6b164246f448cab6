use crate::executor::Executor;
use crate::types::{LoadProfile, Observation, Target};
use log::debug;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Owner side of the cooperative stop flag.
#[derive(Clone)]
pub struct StopHandle {
    sender: Arc<watch::Sender<bool>>,
}

impl Default for StopHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl StopHandle {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn stop(&self) {
        self.sender.send_replace(true);
    }

    pub fn reset(&self) {
        self.sender.send_replace(false);
    }

    pub fn is_stopped(&self) -> bool {
        *self.sender.borrow()
    }

    pub fn signal(&self) -> StopSignal {
        StopSignal {
            receiver: self.sender.subscribe(),
        }
    }
}

/// Observer side handed to each virtual user.
#[derive(Clone)]
pub struct StopSignal {
    receiver: watch::Receiver<bool>,
}

impl StopSignal {
    pub fn is_stopped(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolves once a stop is requested. Never resolves if the handle is gone.
    pub async fn stopped(&mut self) {
        let closed = self.receiver.wait_for(|stopped| *stopped).await.is_err();
        if closed {
            std::future::pending::<()>().await;
        }
    }

    /// Sleeps for `duration`, waking early on a stop request.
    async fn pause(&mut self, duration: Duration) {
        tokio::select! {
            _ = tokio::time::sleep(duration) => {}
            _ = self.stopped() => {}
        }
    }
}

/// Runs one virtual user against `target` until its iteration budget is
/// spent or a stop is requested. Stops are honoured between requests only;
/// a request already in flight always completes and is recorded.
pub async fn run_user(
    executor: Arc<dyn Executor>,
    target: Arc<Target>,
    user_id: usize,
    profile: LoadProfile,
    mut stop: StopSignal,
) -> Vec<Observation> {
    let budget = profile.iteration_budget();
    let mut observations = Vec::new();

    debug!(
        "launching user {} against {} for {} requests",
        user_id,
        target.describe(),
        budget
    );

    for request_id in 0..budget {
        if stop.is_stopped() {
            break;
        }

        if let Some(delay) = profile.ramp_up_delay(request_id) {
            stop.pause(delay).await;
            if stop.is_stopped() {
                break;
            }
        }

        let observation = executor.execute(&target, user_id, request_id as usize).await;
        observations.push(observation);

        stop.pause(profile.think_time()).await;
    }

    debug!(
        "exiting user {} after {} requests",
        user_id,
        observations.len()
    );
    observations
}
