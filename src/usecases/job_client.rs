//! Job lifecycle client: drives one analysis job from submission to a
//! terminal state with fixed-interval polling.
//!
//! - At most one poll is in flight: a tick that fires while a poll is still
//!   pending drops that poll (abort) and issues a fresh one.
//! - Terminal states stop the timer; `shutdown` aborts the task and the
//!   in-flight request, and no state update fires afterward.
//! - The loop gives up after `max_polls` attempts and lands in `TimedOut`.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::domain::{normalize_channel, validate_depth, DomainError, ReportLanguage, RequestStatus};
use crate::ports::{AnalyzerApi, Submission};

/// Observable state of one analysis job. Ephemeral, per client instance.
#[derive(Debug, Clone, PartialEq)]
pub enum JobState {
    Idle,
    /// Request accepted, id known, first poll not yet answered.
    Created { request_id: String },
    /// Poll loop active.
    Processing { request_id: String },
    /// Terminal: shaped report available.
    Ready { report: serde_json::Value },
    /// Terminal: submission failed, a poll failed, or the job itself failed.
    Failed { message: String },
    /// Terminal: gave up after the configured number of polls.
    TimedOut,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Ready { .. } | JobState::Failed { .. } | JobState::TimedOut
        )
    }

    fn is_busy(&self) -> bool {
        matches!(self, JobState::Created { .. } | JobState::Processing { .. })
    }
}

/// Polling client for one analysis job.
pub struct JobClient {
    api: Arc<dyn AnalyzerApi>,
    poll_interval: Duration,
    max_polls: u32,
    state_tx: watch::Sender<JobState>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl JobClient {
    pub fn new(api: Arc<dyn AnalyzerApi>, poll_interval: Duration, max_polls: u32) -> Self {
        let (state_tx, _) = watch::channel(JobState::Idle);
        Self {
            api,
            poll_interval,
            max_polls,
            state_tx,
            task: Mutex::new(None),
        }
    }

    /// Subscribe to state transitions.
    pub fn subscribe(&self) -> watch::Receiver<JobState> {
        self.state_tx.subscribe()
    }

    pub fn current_state(&self) -> JobState {
        self.state_tx.borrow().clone()
    }

    /// Submit a job and start polling. Validation failures are rejected
    /// before any network call. Submitting while a job is already running is
    /// a no-op that keeps polling the existing request id.
    pub async fn submit(
        &self,
        channel_input: &str,
        language: ReportLanguage,
        depth: u32,
        purpose_hint: Option<String>,
    ) -> Result<(), DomainError> {
        if self.state_tx.borrow().is_busy() {
            debug!("submit while busy: resuming existing poll loop");
            return Ok(());
        }

        let channel = normalize_channel(channel_input);
        if channel.is_empty() {
            return Err(DomainError::Validation("channel must not be empty".into()));
        }
        validate_depth(depth)?;

        let submission = Submission {
            channel,
            language,
            depth,
            purpose_hint,
        };
        let request_id = match self.api.create_request(&submission).await {
            Ok(id) => id,
            Err(e) => {
                let message = format!("submission failed: {}", e);
                self.state_tx.send_replace(JobState::Failed {
                    message: message.clone(),
                });
                return Err(DomainError::Transport(message));
            }
        };

        info!(request_id = %request_id, "analysis request accepted, polling");
        self.state_tx.send_replace(JobState::Created {
            request_id: request_id.clone(),
        });

        let api = Arc::clone(&self.api);
        let state_tx = self.state_tx.clone();
        let poll_interval = self.poll_interval;
        let max_polls = self.max_polls;
        let handle = tokio::spawn(async move {
            poll_loop(api, request_id, poll_interval, max_polls, state_tx).await;
        });

        let mut task = self.task.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(old) = task.replace(handle) {
            old.abort();
        }
        Ok(())
    }

    /// Tear down: abort the poll task (cancelling any in-flight request).
    /// No state update fires after this returns.
    pub fn shutdown(&self) {
        let mut task = self.task.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(handle) = task.take() {
            handle.abort();
        }
    }
}

impl Drop for JobClient {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// The poll loop. Polls once immediately, then every `poll_interval`; each
/// in-flight poll is raced against the next tick.
async fn poll_loop(
    api: Arc<dyn AnalyzerApi>,
    request_id: String,
    poll_interval: Duration,
    max_polls: u32,
    state_tx: watch::Sender<JobState>,
) {
    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // Consume the immediate first tick so the race below starts with a full
    // interval; the first poll itself goes out right away.
    ticker.tick().await;

    let mut attempts = 0u32;
    loop {
        if attempts >= max_polls {
            warn!(request_id = %request_id, attempts, "giving up on poll loop");
            state_tx.send_replace(JobState::TimedOut);
            return;
        }
        attempts += 1;

        let outcome = tokio::select! {
            biased;
            _ = ticker.tick() => None,
            res = api.poll(&request_id) => Some(res),
        };

        let Some(result) = outcome else {
            // Tick fired while the poll was still pending: the stale poll was
            // dropped. Not an error; the next iteration issues a fresh one.
            debug!(request_id = %request_id, "in-flight poll aborted by next tick");
            continue;
        };

        match result {
            Ok(snapshot) => match snapshot.status {
                RequestStatus::Ready => {
                    state_tx.send_replace(JobState::Ready {
                        report: snapshot.report.unwrap_or(serde_json::Value::Null),
                    });
                    return;
                }
                RequestStatus::Failed => {
                    let message = snapshot
                        .error
                        .unwrap_or_else(|| "analysis failed".to_string());
                    state_tx.send_replace(JobState::Failed { message });
                    return;
                }
                RequestStatus::Processing => {
                    state_tx.send_replace(JobState::Processing {
                        request_id: request_id.clone(),
                    });
                }
            },
            Err(e) => {
                // Transport or parse failure. Possibly transient, but the
                // loop makes a single attempt per tick and stops here.
                state_tx.send_replace(JobState::Failed {
                    message: format!("poll failed: {}", e),
                });
                return;
            }
        }

        ticker.tick().await;
    }
}
