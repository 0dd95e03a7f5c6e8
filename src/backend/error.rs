//! Error handling for the backend module

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    /// Response body was not the JSON we expected.
    #[error("Decoding error: {0}")]
    Decode(#[from] serde_json::Error),

    /// Reqwest error, typically related to network issues or request failures.
    #[error("Reqwest error: {0}")]
    Reqwest(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("HTTP error with status {status}: {message}")]
    Http {
        status: u16,
        message: String,
        headers: Vec<(String, String)>,
    },

    /// Well-formed JSON that violates the endpoint contract.
    #[error("Malformed response: {0}")]
    Malformed(String),

    /// Failed to read a local file for upload.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BackendError {
    pub async fn from_response(response: reqwest::Response) -> BackendError {
        let status = response.status().as_u16();
        let headers = collect_headers(&response);
        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "Failed to read response text".to_string());

        BackendError::Http { status, message, headers }
    }

    /// Try parse Retry-After header (seconds)
    pub fn get_retry_after_seconds(&self) -> Option<u32> {
        if let Self::Http { headers, .. } = self {
            for (k, v) in headers {
                if k.eq_ignore_ascii_case("retry-after") {
                    if let Ok(secs) = v.trim().parse::<u32>() {
                        return Some(secs);
                    }
                }
            }
        }
        None
    }

    /// Connection refused, reset, or timed out, as opposed to a server answer.
    pub fn is_network(&self) -> bool {
        match self {
            Self::Reqwest(e) => e.is_connect() || e.is_timeout() || e.is_request(),
            Self::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::ConnectionRefused
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::TimedOut
            ),
            _ => false,
        }
    }
}

pub(crate) fn collect_headers(response: &reqwest::Response) -> Vec<(String, String)> {
    response
        .headers()
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or("").to_string()))
        .collect()
}
