//! Inspection backend
//!
//! The HTTP collaborator behind every page: task submission, task status,
//! and the storage listing endpoints.

mod client;
pub mod error;
#[cfg(test)]
pub mod scripted;
pub mod types;

pub use client::HttpBackend;

use crate::backend::error::BackendError;
use crate::backend::types::{
    ProcessRequest, ProcessResponse, RetrieveQuery, RetrieveResponse, StatusResponse,
    SubmitResponse,
};
use crate::submission::Submission;
use chrono::NaiveDate;

#[async_trait::async_trait]
pub trait TaskBackend: Send + Sync {
    /// Base URL requests are sent to.
    fn base_url(&self) -> &str;

    /// Submit a payload; the response carries the new task ID when accepted.
    async fn submit(&self, submission: &Submission) -> Result<SubmitResponse, BackendError>;

    /// Fetch the current status of a task.
    async fn task_status(&self, task_id: &str) -> Result<StatusResponse, BackendError>;

    /// Video file names stored for the given date.
    async fn list_videos(&self, date: NaiveDate) -> Result<Vec<String>, BackendError>;

    /// Client folders holding videos that match the query.
    async fn retrieve_folders(&self, query: &RetrieveQuery) -> Result<RetrieveResponse, BackendError>;

    /// Pull the selected videos out of storage for processing.
    async fn process_videos(&self, request: &ProcessRequest) -> Result<ProcessResponse, BackendError>;
}
