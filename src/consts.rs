pub mod polling {
    /// Cadence used by the frame-extraction page.
    pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;

    /// 0 disables the overall deadline.
    pub const DEFAULT_MAX_WAIT_SECS: u64 = 0;

    pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

    pub const MAX_PROGRESS: u8 = 100;
}

pub mod messages {
    pub const SUBMIT_FAILED: &str = "An unexpected error occurred.";
    pub const POLL_FAILED: &str = "Error checking task status.";
    pub const TASK_FAILED: &str = "Task failed";
    pub const TIMED_OUT: &str = "Timed out waiting for task to finish.";
    pub const NO_FILE: &str = "No selected file";
    pub const NO_VIDEOS_SELECTED: &str = "Please select at least one video to process.";
}

pub mod endpoints {
    pub const FRAME_EXTRACTION: &str = "frame_extraction";
    pub const TASK_STATUS: &str = "task-status";
    pub const VIDEOS_BY_DATE: &str = "api/videos";
    pub const RETRIEVE_VIDEOS: &str = "retrieve_videos";
    pub const PROCESS_VIDEOS: &str = "process_videos";

    /// Form field the extraction page uploads the video under.
    pub const VIDEO_FIELD: &str = "video";
}

/// Extensions accepted for video uploads, with the MIME type sent for each.
pub const VIDEO_MIME_TYPES: &[(&str, &str)] = &[
    ("avi", "video/x-msvideo"),
    ("mov", "video/quicktime"),
    ("mp4", "video/mp4"),
];
