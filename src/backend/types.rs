use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SubmitResponse {
    pub success: bool,
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct StatusResponse {
    pub state: String, // PENDING|PROGRESS|SUCCESS|FAILURE
    #[serde(default)]
    pub progress: Option<i64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub result: Option<Value>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct VideoListResponse {
    #[serde(default)]
    pub videos: Vec<String>,
}

/// Form for the storage retrieval page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrieveQuery {
    pub date: NaiveDate,
    pub camera_angle: String,
    /// `entry` or `exit`; matched as a substring of the video file name.
    pub video_type: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct VideoFolder {
    pub id: u64,
    pub name: String,
    pub s3_prefix: String,
    #[serde(default)]
    pub videos: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct RetrieveResponse {
    pub success: bool,
    #[serde(default)]
    pub folders: Vec<VideoFolder>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessRequest {
    pub folder_id: String,
    pub folder_name: String,
    pub s3_prefix: String,
    pub selected_videos: Vec<String>,
}

impl ProcessRequest {
    pub fn for_folder(folder: &VideoFolder, selected_videos: Vec<String>) -> Self {
        Self {
            folder_id: folder.id.to_string(),
            folder_name: folder.name.clone(),
            s3_prefix: folder.s3_prefix.clone(),
            selected_videos,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ProcessedVideo {
    pub name: String,
    pub status: String, // processed|error|download_failed
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ProcessResponse {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub processed_videos: Vec<ProcessedVideo>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Result payload of a finished frame-extraction task.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct FrameExtractionResult {
    #[serde(default)]
    pub count: u64,
    /// `data:image/jpeg;base64,...` URLs, one per extracted wagon frame.
    #[serde(default, rename = "result")]
    pub frames: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_response_optional_fields() {
        let status: StatusResponse = serde_json::from_value(json!({"state": "PENDING"})).unwrap();
        assert_eq!(status.progress, None);
        assert_eq!(status.status, None);
        assert_eq!(status.result, None);
    }

    #[test]
    fn test_frame_extraction_result_shape() {
        let value = json!({
            "status": "Completed",
            "result": ["data:image/jpeg;base64,AAAA"],
            "count": 1
        });
        let parsed: FrameExtractionResult = serde_json::from_value(value).unwrap();
        assert_eq!(parsed.count, 1);
        assert_eq!(parsed.frames.len(), 1);
    }
}
