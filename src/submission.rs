//! Outbound payloads that create tasks.

use crate::consts::endpoints::{FRAME_EXTRACTION, VIDEO_FIELD};
use crate::consts::messages::NO_FILE;
use crate::consts::VIDEO_MIME_TYPES;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvalidUpload {
    #[error("{}", NO_FILE)]
    MissingFileName,

    #[error("Only video files are allowed ({})", allowed_extensions())]
    UnsupportedExtension(String),
}

fn allowed_extensions() -> String {
    VIDEO_MIME_TYPES
        .iter()
        .map(|(ext, _)| *ext)
        .collect::<Vec<_>>()
        .join(", ")
}

/// MIME type for an allowed video file name, `None` for anything else.
pub fn video_mime_type(file_name: &str) -> Option<&'static str> {
    let (_, ext) = file_name.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    VIDEO_MIME_TYPES
        .iter()
        .find(|(allowed, _)| *allowed == ext)
        .map(|(_, mime)| *mime)
}

/// One file part of a multipart submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub field: String,
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl FileUpload {
    /// A video part, rejected unless the extension is one the backend accepts.
    pub fn video(
        field: impl Into<String>,
        file_name: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Result<Self, InvalidUpload> {
        let file_name = file_name.into();
        if file_name.trim().is_empty() {
            return Err(InvalidUpload::MissingFileName);
        }
        let mime_type = video_mime_type(&file_name)
            .ok_or_else(|| InvalidUpload::UnsupportedExtension(file_name.clone()))?;
        Ok(Self {
            field: field.into(),
            file_name,
            mime_type: mime_type.to_string(),
            bytes,
        })
    }

    /// File name of `path`, used to validate before anything is read from disk.
    pub fn file_name_of(path: &Path) -> Result<String, InvalidUpload> {
        path.file_name()
            .and_then(|name| name.to_str())
            .map(str::to_string)
            .ok_or(InvalidUpload::MissingFileName)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    /// Path of the submission endpoint, relative to the backend URL.
    pub endpoint: String,
    pub fields: Vec<(String, String)>,
    pub files: Vec<FileUpload>,
}

impl Submission {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            fields: Vec::new(),
            files: Vec::new(),
        }
    }

    /// The frame-extraction upload: a single video under the `video` field.
    pub fn frame_extraction(file_name: impl Into<String>, bytes: Vec<u8>) -> Result<Self, InvalidUpload> {
        Ok(Self::new(FRAME_EXTRACTION).file(FileUpload::video(VIDEO_FIELD, file_name, bytes)?))
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    pub fn file(mut self, file: FileUpload) -> Self {
        self.files.push(file);
        self
    }
}
