//! Async Task Client
//!
//! Submits long-running jobs to the inspection backend and follows them
//! until they finish, reporting to an injected [`TaskObserver`]:
//! - `submit` turns a [`Submission`] into a PENDING [`Task`]
//! - `poll` fetches a single [`TaskSnapshot`]
//! - `start_polling` runs a fixed-cadence poll loop until a terminal state,
//!   a poll error, the optional deadline, or [`CancelHandle::cancel`]

use crate::backend::error::BackendError;
use crate::backend::types::{StatusResponse, SubmitResponse};
use crate::backend::TaskBackend;
use crate::consts::messages::{POLL_FAILED, SUBMIT_FAILED, TIMED_OUT};
use crate::consts::polling::{DEFAULT_POLL_INTERVAL_MS, MAX_PROGRESS};
use crate::submission::{InvalidUpload, Submission};
use crate::task::{Task, TaskEvent, TaskSnapshot, TaskState};
use log::{debug, info, warn};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

#[derive(Debug, Error)]
pub enum TaskError {
    /// The backend rejected the submission or answered with something unusable.
    #[error("Submission failed: {message}")]
    Submission {
        message: String,
        #[source]
        source: Option<BackendError>,
    },

    /// A single status request failed at the network or parse level.
    #[error("Polling task {task_id} failed: {source}")]
    Poll {
        task_id: String,
        #[source]
        source: BackendError,
    },

    /// The task reached FAILURE; `reason` is the server's message.
    #[error("Task {task_id} failed: {reason}")]
    Failure { task_id: String, reason: String },
}

impl TaskError {
    /// Text suitable for showing to the end user as-is.
    pub fn user_message(&self) -> &str {
        match self {
            TaskError::Submission { message, .. } => message,
            TaskError::Poll { .. } => POLL_FAILED,
            TaskError::Failure { reason, .. } => reason,
        }
    }

    /// Detail about the transport failure behind the error, if any.
    pub fn hint(&self) -> Option<String> {
        let source = match self {
            TaskError::Submission {
                source: Some(source),
                ..
            }
            | TaskError::Poll { source, .. } => source,
            _ => return None,
        };
        if let Some(secs) = source.get_retry_after_seconds() {
            return Some(format!("Server asked to retry after {}s", secs));
        }
        source
            .is_network()
            .then(|| "Backend unreachable".to_string())
    }
}

impl From<InvalidUpload> for TaskError {
    fn from(err: InvalidUpload) -> Self {
        TaskError::Submission {
            message: err.to_string(),
            source: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    pub interval: Duration,
    /// Stop with a failure if the task is still running after this long.
    pub max_wait: Option<Duration>,
}

impl PollOptions {
    /// A zero interval is bumped to 1ms so the loop always yields.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: interval.max(Duration::from_millis(1)),
            max_wait: None,
        }
    }

    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = Some(max_wait);
        self
    }
}

impl Default for PollOptions {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_POLL_INTERVAL_MS))
    }
}

/// Receives the outcome of a polling loop. `on_success` and `on_failure`
/// are each called at most once and nothing is called after either.
pub trait TaskObserver: Send + 'static {
    fn on_update(&mut self, progress: u8, message: &str);
    fn on_success(&mut self, result: Value);
    fn on_failure(&mut self, reason: &str);
}

fn dispatch<O: TaskObserver>(observer: &mut O, event: TaskEvent) {
    match event {
        TaskEvent::Update { progress, message } => observer.on_update(progress, &message),
        TaskEvent::Success(result) => observer.on_success(result),
        TaskEvent::Failure(reason) => observer.on_failure(&reason),
    }
}

/// Adapts three closures into a [`TaskObserver`].
pub struct Callbacks<U, S, F> {
    on_update: U,
    on_success: S,
    on_failure: F,
}

impl<U, S, F> Callbacks<U, S, F>
where
    U: FnMut(u8, &str) + Send + 'static,
    S: FnMut(Value) + Send + 'static,
    F: FnMut(&str) + Send + 'static,
{
    pub fn new(on_update: U, on_success: S, on_failure: F) -> Self {
        Self {
            on_update,
            on_success,
            on_failure,
        }
    }
}

impl<U, S, F> TaskObserver for Callbacks<U, S, F>
where
    U: FnMut(u8, &str) + Send + 'static,
    S: FnMut(Value) + Send + 'static,
    F: FnMut(&str) + Send + 'static,
{
    fn on_update(&mut self, progress: u8, message: &str) {
        (self.on_update)(progress, message)
    }

    fn on_success(&mut self, result: Value) {
        (self.on_success)(result)
    }

    fn on_failure(&mut self, reason: &str) {
        (self.on_failure)(reason)
    }
}

/// Forwards every event into an unbounded channel. The receiver sees `None`
/// once the loop has ended.
pub struct ChannelObserver {
    sender: mpsc::UnboundedSender<TaskEvent>,
}

impl ChannelObserver {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<TaskEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    fn send(&self, event: TaskEvent) {
        // Receiver gone means nobody is listening any more.
        let _ = self.sender.send(event);
    }
}

impl TaskObserver for ChannelObserver {
    fn on_update(&mut self, progress: u8, message: &str) {
        self.send(TaskEvent::Update {
            progress,
            message: message.to_string(),
        });
    }

    fn on_success(&mut self, result: Value) {
        self.send(TaskEvent::Success(result));
    }

    fn on_failure(&mut self, reason: &str) {
        self.send(TaskEvent::Failure(reason.to_string()));
    }
}

/// How a polling loop ended.
#[derive(Debug)]
pub enum PollEnd {
    Succeeded(Value),
    /// Terminal FAILURE with the server's reason.
    Failed(String),
    /// A status request failed; the observer saw the generic message.
    PollFailed(TaskError),
    TimedOut,
    Cancelled,
    /// The loop panicked, typically inside an observer callback.
    Aborted(String),
}

/// Stops a polling loop. Cancelling is client-side only: the backend job keeps
/// running. Dropping the handle does not cancel.
#[derive(Debug)]
pub struct CancelHandle {
    task_id: String,
    cancelled: Arc<AtomicBool>,
    wake: Arc<Notify>,
    handle: JoinHandle<PollEnd>,
}

impl CancelHandle {
    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    /// The loop dispatches no new callback once it sees the flag, and an
    /// in-flight request is dropped. A callback already running on another
    /// worker thread still finishes; after `wait` returns nothing runs.
    pub fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::SeqCst) {
            debug!("Cancelling polling for task {}", self.task_id);
        }
        self.wake.notify_one();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the loop to end, by terminal state, error, deadline or cancel.
    pub async fn wait(self) -> PollEnd {
        match self.handle.await {
            Ok(end) => end,
            Err(e) => {
                warn!("Polling loop for task {} ended abnormally: {}", self.task_id, e);
                PollEnd::Aborted(e.to_string())
            }
        }
    }
}

enum PollOutcome {
    Polled(Result<TaskSnapshot, TaskError>),
    TimedOut,
}

async fn deadline_reached(deadline: Option<Instant>) {
    match deadline {
        Some(at) => time::sleep_until(at).await,
        None => std::future::pending::<()>().await,
    }
}

#[derive(Clone)]
pub struct AsyncTaskClient {
    backend: Arc<dyn TaskBackend>,
}

impl AsyncTaskClient {
    pub fn new(backend: impl TaskBackend + 'static) -> Self {
        Self {
            backend: Arc::new(backend),
        }
    }

    pub fn from_backend(backend: Arc<dyn TaskBackend>) -> Self {
        Self { backend }
    }

    /// Send the payload and return the accepted task in PENDING state.
    /// Polling is not started.
    pub async fn submit(&self, submission: &Submission) -> Result<Task, TaskError> {
        let response = match self.backend.submit(submission).await {
            Ok(response) => response,
            Err(e) => {
                warn!(
                    "Submission to {}/{} failed: {}",
                    self.backend.base_url(),
                    submission.endpoint,
                    e
                );
                let message = match &e {
                    BackendError::Http { status, .. } => format!("Server returned HTTP {}", status),
                    _ => SUBMIT_FAILED.to_string(),
                };
                return Err(TaskError::Submission {
                    message,
                    source: Some(e),
                });
            }
        };

        match response {
            SubmitResponse {
                success: true,
                task_id: Some(task_id),
                ..
            } if !task_id.trim().is_empty() => {
                info!(
                    "Task {} accepted by {}/{}",
                    task_id,
                    self.backend.base_url(),
                    submission.endpoint
                );
                Ok(Task::new(task_id))
            }
            SubmitResponse { success: true, .. } => Err(TaskError::Submission {
                message: SUBMIT_FAILED.to_string(),
                source: Some(BackendError::Malformed(
                    "submission accepted without a task_id".to_string(),
                )),
            }),
            SubmitResponse { error, .. } => {
                let message = error
                    .filter(|e| !e.trim().is_empty())
                    .unwrap_or_else(|| SUBMIT_FAILED.to_string());
                warn!("Submission to {} rejected: {}", submission.endpoint, message);
                Err(TaskError::Submission {
                    message,
                    source: None,
                })
            }
        }
    }

    /// One status request. Never retries.
    pub async fn poll(&self, task_id: &str) -> Result<TaskSnapshot, TaskError> {
        self.backend
            .task_status(task_id)
            .await
            .and_then(snapshot_from)
            .map_err(|source| TaskError::Poll {
                task_id: task_id.to_string(),
                source,
            })
    }

    /// Poll `task_id` every `options.interval` on a spawned task.
    ///
    /// The first request goes out one interval from now. A slow response
    /// delays the next request instead of overlapping it.
    pub fn start_polling(
        &self,
        task_id: impl Into<String>,
        options: PollOptions,
        observer: impl TaskObserver,
    ) -> CancelHandle {
        let task_id = task_id.into();
        let cancelled = Arc::new(AtomicBool::new(false));
        let wake = Arc::new(Notify::new());

        let handle = tokio::spawn(self.clone().poll_loop(
            Task::new(task_id.clone()),
            options,
            observer,
            cancelled.clone(),
            wake.clone(),
        ));

        CancelHandle {
            task_id,
            cancelled,
            wake,
            handle,
        }
    }

    /// Submit, then immediately start polling the new task.
    pub async fn track(
        &self,
        submission: &Submission,
        options: PollOptions,
        observer: impl TaskObserver,
    ) -> Result<CancelHandle, TaskError> {
        let task = self.submit(submission).await?;
        Ok(self.start_polling(task.task_id, options, observer))
    }

    async fn poll_loop<O: TaskObserver>(
        self,
        mut task: Task,
        options: PollOptions,
        mut observer: O,
        cancelled: Arc<AtomicBool>,
        wake: Arc<Notify>,
    ) -> PollEnd {
        let start = Instant::now();
        let deadline = options.max_wait.map(|max_wait| start + max_wait);
        let mut ticker = time::interval_at(start + options.interval, options.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let end = loop {
            let outcome = tokio::select! {
                biased;
                _ = wake.notified() => break PollEnd::Cancelled,
                _ = deadline_reached(deadline) => PollOutcome::TimedOut,
                _ = ticker.tick() => {
                    if cancelled.load(Ordering::SeqCst) {
                        break PollEnd::Cancelled;
                    }
                    tokio::select! {
                        biased;
                        _ = wake.notified() => break PollEnd::Cancelled,
                        _ = deadline_reached(deadline) => PollOutcome::TimedOut,
                        result = self.poll(&task.task_id) => PollOutcome::Polled(result),
                    }
                }
            };

            if cancelled.load(Ordering::SeqCst) {
                break PollEnd::Cancelled;
            }

            let (event, end) = match outcome {
                PollOutcome::Polled(Ok(snapshot)) => match task.apply(snapshot) {
                    Some(event) => (event, terminal_end(&task)),
                    None => break terminal_end(&task).unwrap_or(PollEnd::Cancelled),
                },
                PollOutcome::Polled(Err(e)) => {
                    match e.hint() {
                        Some(hint) => warn!("{} ({})", e, hint),
                        None => warn!("{}", e),
                    }
                    (TaskEvent::Failure(POLL_FAILED.to_string()), Some(PollEnd::PollFailed(e)))
                }
                PollOutcome::TimedOut => {
                    warn!("Task {} still {} after {:?}", task.task_id, task.state, start.elapsed());
                    (TaskEvent::Failure(TIMED_OUT.to_string()), Some(PollEnd::TimedOut))
                }
            };

            if let TaskEvent::Update { progress, .. } = &event {
                debug!("Task {} at {}%", task.task_id, progress);
            }
            dispatch(&mut observer, event);
            if let Some(end) = end {
                break end;
            }
        };

        match &end {
            PollEnd::Cancelled => debug!("Stopped polling task {} (cancelled)", task.task_id),
            _ => info!("Stopped polling task {} in state {}", task.task_id, task.state),
        }
        end
    }
}

fn terminal_end(task: &Task) -> Option<PollEnd> {
    match task.state {
        TaskState::Success => Some(PollEnd::Succeeded(
            task.result.clone().unwrap_or(Value::Null),
        )),
        TaskState::Failure => Some(PollEnd::Failed(task.message.clone())),
        TaskState::Pending | TaskState::Running => None,
    }
}

fn snapshot_from(response: StatusResponse) -> Result<TaskSnapshot, BackendError> {
    let state = TaskState::from_wire(&response.state).ok_or_else(|| {
        BackendError::Malformed(format!("unknown task state {:?}", response.state))
    })?;
    let progress = response.progress.unwrap_or(0).clamp(0, MAX_PROGRESS as i64) as u8;
    let message = response
        .status
        .filter(|s| !s.is_empty())
        .or(response.error.filter(|s| !s.is_empty()))
        .unwrap_or_default();
    Ok(TaskSnapshot {
        state,
        progress,
        message,
        result: response.result,
    })
}
