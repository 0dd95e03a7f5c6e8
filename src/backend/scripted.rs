//! In-memory backend that replays canned responses, for tests.

use crate::backend::error::BackendError;
use crate::backend::types::{
    ProcessRequest, ProcessResponse, ProcessedVideo, RetrieveQuery, RetrieveResponse,
    StatusResponse, SubmitResponse, VideoFolder,
};
use crate::backend::TaskBackend;
use crate::submission::Submission;
use chrono::NaiveDate;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub type Scripted<T> = Result<T, BackendError>;

#[derive(Default)]
struct Inner {
    submits: VecDeque<Scripted<SubmitResponse>>,
    statuses: VecDeque<Scripted<StatusResponse>>,
    submitted: Vec<Submission>,
    videos: Vec<String>,
    folders: Vec<VideoFolder>,
    processed: Vec<ProcessRequest>,
}

/// Replays queued responses in order. Status calls past the end of the
/// script keep reporting PENDING.
#[derive(Clone, Default)]
pub struct ScriptedBackend {
    inner: Arc<Mutex<Inner>>,
    status_delay: Duration,
    status_calls: Arc<AtomicUsize>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Each status call takes this long to answer.
    pub fn with_status_delay(mut self, delay: Duration) -> Self {
        self.status_delay = delay;
        self
    }

    pub fn push_submit(&self, response: Scripted<SubmitResponse>) -> &Self {
        self.inner.lock().unwrap().submits.push_back(response);
        self
    }

    pub fn push_status(&self, response: Scripted<StatusResponse>) -> &Self {
        self.inner.lock().unwrap().statuses.push_back(response);
        self
    }

    pub fn with_videos(self, videos: &[&str]) -> Self {
        self.inner.lock().unwrap().videos = videos.iter().map(|v| v.to_string()).collect();
        self
    }

    pub fn with_folders(self, folders: Vec<VideoFolder>) -> Self {
        self.inner.lock().unwrap().folders = folders;
        self
    }

    pub fn processed(&self) -> Vec<ProcessRequest> {
        self.inner.lock().unwrap().processed.clone()
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn submitted(&self) -> Vec<Submission> {
        self.inner.lock().unwrap().submitted.clone()
    }
}

pub fn accepted(task_id: &str) -> SubmitResponse {
    SubmitResponse {
        success: true,
        task_id: Some(task_id.to_string()),
        error: None,
    }
}

pub fn rejected(error: Option<&str>) -> SubmitResponse {
    SubmitResponse {
        success: false,
        task_id: None,
        error: error.map(str::to_string),
    }
}

pub fn status(state: &str, progress: Option<i64>, message: Option<&str>) -> StatusResponse {
    StatusResponse {
        state: state.to_string(),
        progress,
        status: message.map(str::to_string),
        error: None,
        result: None,
    }
}

pub fn succeeded(result: Value) -> StatusResponse {
    StatusResponse {
        result: Some(result),
        ..status("SUCCESS", None, None)
    }
}

pub fn network_error() -> BackendError {
    BackendError::Io(std::io::Error::new(
        std::io::ErrorKind::ConnectionReset,
        "connection reset by peer",
    ))
}

#[async_trait::async_trait]
impl TaskBackend for ScriptedBackend {
    fn base_url(&self) -> &str {
        "scripted://backend"
    }

    async fn submit(&self, submission: &Submission) -> Result<SubmitResponse, BackendError> {
        let mut inner = self.inner.lock().unwrap();
        inner.submitted.push(submission.clone());
        inner
            .submits
            .pop_front()
            .unwrap_or_else(|| Err(BackendError::Malformed("no scripted submit response".into())))
    }

    async fn task_status(&self, _task_id: &str) -> Result<StatusResponse, BackendError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.status_delay.is_zero() {
            tokio::time::sleep(self.status_delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        let next = self.inner.lock().unwrap().statuses.pop_front();
        next.unwrap_or_else(|| Ok(status("PENDING", None, None)))
    }

    async fn list_videos(&self, _date: NaiveDate) -> Result<Vec<String>, BackendError> {
        Ok(self.inner.lock().unwrap().videos.clone())
    }

    async fn retrieve_folders(&self, _query: &RetrieveQuery) -> Result<RetrieveResponse, BackendError> {
        let folders = self.inner.lock().unwrap().folders.clone();
        if folders.is_empty() {
            return Ok(RetrieveResponse {
                success: false,
                folders,
                error: Some("No folders found".to_string()),
            });
        }
        Ok(RetrieveResponse {
            success: true,
            folders,
            error: None,
        })
    }

    async fn process_videos(&self, request: &ProcessRequest) -> Result<ProcessResponse, BackendError> {
        self.inner.lock().unwrap().processed.push(request.clone());
        Ok(ProcessResponse {
            success: true,
            message: Some(format!("Processed {} videos", request.selected_videos.len())),
            processed_videos: request
                .selected_videos
                .iter()
                .map(|name| ProcessedVideo {
                    name: name.clone(),
                    status: "processed".to_string(),
                    error: None,
                    size: None,
                })
                .collect(),
            error: None,
        })
    }
}
