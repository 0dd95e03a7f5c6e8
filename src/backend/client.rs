//! Inspection Backend Client
//!
//! reqwest implementation of [`TaskBackend`] against the Flask application.

use crate::backend::error::{collect_headers, BackendError};
use crate::backend::types::{
    ProcessRequest, ProcessResponse, RetrieveQuery, RetrieveResponse, StatusResponse,
    SubmitResponse, VideoListResponse,
};
use crate::backend::TaskBackend;
use crate::consts::endpoints::{PROCESS_VIDEOS, RETRIEVE_VIDEOS, TASK_STATUS, VIDEOS_BY_DATE};
use crate::environment::Environment;
use crate::submission::Submission;
use chrono::NaiveDate;
use log::debug;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, ClientBuilder, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
    auth_token: Option<String>,
}

impl HttpBackend {
    pub fn new(
        environment: &Environment,
        auth_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        let client = ClientBuilder::new().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: environment.api_url(),
            auth_token,
        })
    }

    fn build_url(&self, endpoint: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        )
    }

    fn auth_header(&self, req: RequestBuilder) -> RequestBuilder {
        if let Some(tok) = &self.auth_token {
            req.bearer_auth(tok)
        } else {
            req
        }
    }

    async fn handle_response_status(response: Response) -> Result<Response, BackendError> {
        if !response.status().is_success() {
            return Err(BackendError::from_response(response).await);
        }
        Ok(response)
    }

    /// Decode a JSON body, erroring on any non-success status.
    async fn send_strict<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, BackendError> {
        let response = self.auth_header(req).send().await?;
        let response = Self::handle_response_status(response).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Decode a JSON body even on an error status, as long as it has the
    /// expected shape. The form endpoints report rejections in the body.
    async fn send_lenient<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, BackendError> {
        let response = self.auth_header(req).send().await?;
        let status = response.status();
        let headers = collect_headers(&response);
        let bytes = response.bytes().await?;
        match serde_json::from_slice::<T>(&bytes) {
            Ok(parsed) => Ok(parsed),
            Err(e) if status.is_success() => Err(BackendError::Decode(e)),
            Err(_) => Err(BackendError::Http {
                status: status.as_u16(),
                message: String::from_utf8_lossy(&bytes).into_owned(),
                headers,
            }),
        }
    }

    fn multipart_form(submission: &Submission) -> Result<Form, BackendError> {
        let mut form = Form::new();
        for (name, value) in &submission.fields {
            form = form.text(name.clone(), value.clone());
        }
        for file in &submission.files {
            let part = Part::bytes(file.bytes.clone())
                .file_name(file.file_name.clone())
                .mime_str(&file.mime_type)?;
            form = form.part(file.field.clone(), part);
        }
        Ok(form)
    }
}

#[async_trait::async_trait]
impl TaskBackend for HttpBackend {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn submit(&self, submission: &Submission) -> Result<SubmitResponse, BackendError> {
        let url = self.build_url(&submission.endpoint);
        debug!(
            "Submitting {} field(s) and {} file(s) to {}",
            submission.fields.len(),
            submission.files.len(),
            url
        );
        let form = Self::multipart_form(submission)?;
        self.send_lenient(self.client.post(url).multipart(form)).await
    }

    async fn task_status(&self, task_id: &str) -> Result<StatusResponse, BackendError> {
        let endpoint = format!("{}/{}", TASK_STATUS, urlencoding::encode(task_id));
        let url = self.build_url(&endpoint);
        self.send_strict(self.client.get(url)).await
    }

    async fn list_videos(&self, date: NaiveDate) -> Result<Vec<String>, BackendError> {
        let endpoint = format!("{}/{}", VIDEOS_BY_DATE, date.format("%Y-%m-%d"));
        let url = self.build_url(&endpoint);
        let response: VideoListResponse = self.send_strict(self.client.get(url)).await?;
        Ok(response.videos)
    }

    async fn retrieve_folders(&self, query: &RetrieveQuery) -> Result<RetrieveResponse, BackendError> {
        let url = self.build_url(RETRIEVE_VIDEOS);
        let form = [
            ("retrieve_date", query.date.format("%Y-%m-%d").to_string()),
            ("camera_angle", query.camera_angle.clone()),
            ("video_type", query.video_type.clone()),
        ];
        self.send_lenient(self.client.post(url).form(&form)).await
    }

    async fn process_videos(&self, request: &ProcessRequest) -> Result<ProcessResponse, BackendError> {
        let url = self.build_url(PROCESS_VIDEOS);
        let mut form = vec![
            ("folder_id", request.folder_id.clone()),
            ("folder_name", request.folder_name.clone()),
            ("s3_prefix", request.s3_prefix.clone()),
        ];
        for video in &request.selected_videos {
            form.push(("selected_videos[]", video.clone()));
        }
        self.send_lenient(self.client.post(url).form(&form)).await
    }
}
