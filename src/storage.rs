//! Video storage browsing: listing by date, folder retrieval and the batch
//! download that precedes processing.

use crate::backend::error::BackendError;
use crate::backend::types::{ProcessRequest, ProcessResponse, RetrieveQuery, VideoFolder};
use crate::backend::TaskBackend;
use crate::consts::messages::{NO_VIDEOS_SELECTED, SUBMIT_FAILED};
use chrono::NaiveDate;
use log::{debug, warn};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("{}", NO_VIDEOS_SELECTED)]
    NoVideosSelected,

    /// `success: false` from the server.
    #[error("{0}")]
    Rejected(String),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

fn rejection(error: Option<String>) -> StorageError {
    StorageError::Rejected(
        error
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| SUBMIT_FAILED.to_string()),
    )
}

#[derive(Clone)]
pub struct VideoLibrary {
    backend: Arc<dyn TaskBackend>,
}

impl VideoLibrary {
    pub fn new(backend: Arc<dyn TaskBackend>) -> Self {
        Self { backend }
    }

    pub async fn list_videos(&self, date: NaiveDate) -> Result<Vec<String>, StorageError> {
        let videos = self.backend.list_videos(date).await?;
        debug!("{} videos stored for {}", videos.len(), date);
        Ok(videos)
    }

    pub async fn retrieve(&self, query: &RetrieveQuery) -> Result<Vec<VideoFolder>, StorageError> {
        let response = self.backend.retrieve_folders(query).await?;
        if !response.success {
            warn!("Folder retrieval for {} rejected: {:?}", query.date, response.error);
            return Err(rejection(response.error));
        }
        Ok(response.folders)
    }

    /// Rejects an empty selection without a network call.
    pub async fn process(&self, request: &ProcessRequest) -> Result<ProcessResponse, StorageError> {
        if request.selected_videos.is_empty() {
            return Err(StorageError::NoVideosSelected);
        }
        let response = self.backend.process_videos(request).await?;
        if !response.success {
            warn!("Processing folder {} rejected: {:?}", request.folder_name, response.error);
            return Err(rejection(response.error));
        }
        Ok(response)
    }
}
