//! Terminal output for the CLI.

use wagon_task_client::backend::types::{FrameExtractionResult, ProcessResponse, VideoFolder};
use wagon_task_client::task::TaskEvent;
use serde_json::Value;

const BAR_WIDTH: usize = 20;

/// `[#########-----------]  45%`
pub fn progress_bar(progress: u8) -> String {
    let progress = progress.min(100) as usize;
    let filled = progress * BAR_WIDTH / 100;
    format!(
        "[{}{}] {:>3}%",
        "#".repeat(filled),
        "-".repeat(BAR_WIDTH - filled),
        progress
    )
}

/// One line per event.
pub fn print_event(task_id: &str, event: &TaskEvent) {
    match event {
        TaskEvent::Update { progress, message } if message.is_empty() => {
            println!("⏳ {} {}", task_id, progress_bar(*progress));
        }
        TaskEvent::Update { progress, message } => {
            println!("⏳ {} {} {}", task_id, progress_bar(*progress), message);
        }
        TaskEvent::Success(result) => {
            println!("✅ {} finished", task_id);
            print_result(result);
        }
        TaskEvent::Failure(reason) => println!("❌ {} failed: {}", task_id, reason),
    }
}

/// Summarise a frame-extraction result, or dump anything else as JSON.
pub fn print_result(result: &Value) {
    if let Some(summary) = frame_summary(result) {
        println!("{}", summary);
        return;
    }
    match serde_json::to_string_pretty(result) {
        Ok(json) => println!("{}", json),
        Err(_) => println!("{}", result),
    }
}

fn frame_summary(result: &Value) -> Option<String> {
    if result.get("count").is_none() {
        return None;
    }
    let parsed: FrameExtractionResult = serde_json::from_value(result.clone()).ok()?;
    Some(format!(
        "🖼️  {} wagon frame(s) extracted, {} image(s) returned",
        parsed.count,
        parsed.frames.len()
    ))
}

pub fn print_folders(folders: &[VideoFolder]) {
    if folders.is_empty() {
        println!("No folders matched.");
        return;
    }
    for folder in folders {
        println!("📁 [{}] {} ({})", folder.id, folder.name, folder.s3_prefix);
        for video in &folder.videos {
            println!("    {}", video);
        }
    }
}

pub fn print_processed(response: &ProcessResponse) {
    if let Some(message) = &response.message {
        println!("{}", message);
    }
    for video in &response.processed_videos {
        match (&video.error, video.size) {
            (Some(error), _) => println!("  ❌ {}: {} ({})", video.name, video.status, error),
            (None, Some(size)) => println!("  ✅ {}: {} ({} KB)", video.name, video.status, size / 1024),
            (None, None) => println!("  ✅ {}: {}", video.name, video.status),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_progress_bar() {
        assert_eq!(progress_bar(0), "[--------------------]   0%");
        assert_eq!(progress_bar(45), "[#########-----------]  45%");
        assert_eq!(progress_bar(100), "[####################] 100%");
    }

    #[test]
    fn test_frame_summary() {
        let result = json!({"status": "Completed", "result": ["data:image/jpeg;base64,AA"], "count": 3});
        assert_eq!(
            frame_summary(&result).as_deref(),
            Some("🖼️  3 wagon frame(s) extracted, 1 image(s) returned")
        );
        assert_eq!(frame_summary(&json!({"other": true})), None);
    }
}
