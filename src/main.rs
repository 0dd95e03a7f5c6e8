mod pretty;

use chrono::NaiveDate;
use clap::{ArgAction, Parser, Subcommand};
use log::{debug, warn};
use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use wagon_task_client::backend::types::{ProcessRequest, RetrieveQuery};
use wagon_task_client::backend::{HttpBackend, TaskBackend};
use wagon_task_client::config::{get_config_path, Config};
use wagon_task_client::consts::endpoints::{FRAME_EXTRACTION, VIDEO_FIELD};
use wagon_task_client::consts::messages::TIMED_OUT;
use wagon_task_client::environment::EnvironmentType;
use wagon_task_client::storage::VideoLibrary;
use wagon_task_client::submission::{video_mime_type, FileUpload, InvalidUpload, Submission};
use wagon_task_client::task::{Task, TaskEvent};
use wagon_task_client::task_client::{
    AsyncTaskClient, CancelHandle, ChannelObserver, PollEnd, TaskError,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
/// Command-line arguments
struct Args {
    /// Environment to connect to. Overrides WAGON_ENVIRONMENT and the config file.
    #[arg(long, global = true, value_enum)]
    env: Option<EnvironmentType>,

    /// Enable debug logging
    #[arg(long, short, global = true, action = ArgAction::SetTrue)]
    verbose: bool,

    /// Command to execute
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Upload a video and follow the resulting task
    Submit {
        /// Video file to upload (mp4, avi, mov)
        #[arg(long, value_name = "FILE")]
        file: PathBuf,

        /// Submission endpoint, relative to the backend URL
        #[arg(long, default_value = FRAME_EXTRACTION)]
        endpoint: String,

        /// Extra form field, as key=value. Repeatable.
        #[arg(long = "field", value_name = "KEY=VALUE", value_parser = parse_field)]
        fields: Vec<(String, String)>,

        /// Print the task ID and exit without polling
        #[arg(long = "no-watch", action = ArgAction::SetTrue)]
        no_watch: bool,
    },
    /// Fetch the current status of a task once
    Status {
        #[arg(value_name = "TASK_ID")]
        task_id: String,
    },
    /// Poll a task until it finishes. Ctrl+C stops watching.
    Watch {
        #[arg(value_name = "TASK_ID")]
        task_id: String,
    },
    /// List stored videos for a date
    Videos {
        /// Date as YYYY-MM-DD. Defaults to today.
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Find client folders with videos matching the filters
    Retrieve {
        #[arg(long)]
        date: NaiveDate,

        #[arg(long = "camera-angle")]
        camera_angle: String,

        /// `entry` or `exit`
        #[arg(long = "video-type")]
        video_type: String,
    },
    /// Download selected videos from a folder for processing
    Process {
        #[arg(long = "folder-id")]
        folder_id: String,

        #[arg(long = "folder-name")]
        folder_name: String,

        #[arg(long = "s3-prefix")]
        s3_prefix: String,

        /// Video file name. Repeatable.
        #[arg(long = "video", value_name = "NAME")]
        videos: Vec<String>,
    },
    /// Inspect or reset the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigCommand,
    },
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print the resolved configuration
    Show,
    /// Write a config file with default values
    Init,
    /// Delete the config file
    Clear,
}

fn parse_field(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got '{}'", raw)),
    }
}

fn environment_from_env() -> Result<Option<EnvironmentType>, Box<dyn Error>> {
    let raw = std::env::var("WAGON_ENVIRONMENT").unwrap_or_default();
    if raw.trim().is_empty() {
        return Ok(None);
    }
    match raw.parse::<EnvironmentType>() {
        Ok(env) => Ok(Some(env)),
        Err(_) => {
            eprintln!("Invalid environment: {}", raw);
            Err("Invalid environment".into())
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let default_filter = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let config_path = get_config_path()?;
    if let Command::Config { action } = &args.command {
        return run_config(action, &config_path);
    }

    let config = Config::load_or_default(&config_path)?;
    let override_env = match args.env {
        Some(env) => Some(env),
        None => environment_from_env()?,
    };
    let environment = config.environment(override_env);
    debug!("Using {}", environment);

    let backend: Arc<dyn TaskBackend> = Arc::new(HttpBackend::new(
        &environment,
        config.auth_token(),
        config.request_timeout(),
    )?);
    let client = AsyncTaskClient::from_backend(backend.clone());
    let library = VideoLibrary::new(backend);
    let options = config.poll_options();

    match args.command {
        Command::Submit {
            file,
            endpoint,
            fields,
            no_watch,
        } => {
            let submission = read_submission(&file, endpoint, fields)?;
            if no_watch {
                let task = client.submit(&submission).await.map_err(report)?;
                println!("{}", task);
                return Ok(());
            }
            let (observer, events) = ChannelObserver::channel();
            let handle = client
                .track(&submission, options, observer)
                .await
                .map_err(report)?;
            println!("Task ID: {}", handle.task_id());
            watch(handle, events).await
        }
        Command::Status { task_id } => {
            let snapshot = client.poll(&task_id).await.map_err(report)?;
            let mut task = Task::new(task_id);
            let event = task.apply(snapshot);
            println!("{}", task);
            if !task.message.is_empty() {
                println!("{}", task.message);
            }
            if let Some(TaskEvent::Success(result)) = event {
                pretty::print_result(&result);
            }
            Ok(())
        }
        Command::Watch { task_id } => {
            let (observer, events) = ChannelObserver::channel();
            watch(client.start_polling(task_id, options, observer), events).await
        }
        Command::Videos { date } => {
            let date = date.unwrap_or_else(|| chrono::Local::now().date_naive());
            let videos = library.list_videos(date).await?;
            if videos.is_empty() {
                println!("No videos stored for {}", date);
            }
            for video in videos {
                println!("{}", video);
            }
            Ok(())
        }
        Command::Retrieve {
            date,
            camera_angle,
            video_type,
        } => {
            let query = RetrieveQuery {
                date,
                camera_angle,
                video_type,
            };
            let folders = library.retrieve(&query).await?;
            pretty::print_folders(&folders);
            Ok(())
        }
        Command::Process {
            folder_id,
            folder_name,
            s3_prefix,
            videos,
        } => {
            let request = ProcessRequest {
                folder_id,
                folder_name,
                s3_prefix,
                selected_videos: videos,
            };
            let response = library.process(&request).await?;
            pretty::print_processed(&response);
            Ok(())
        }
        Command::Config { .. } => Ok(()),
    }
}

fn run_config(action: &ConfigCommand, config_path: &Path) -> Result<(), Box<dyn Error>> {
    match action {
        ConfigCommand::Show => {
            let config = Config::load_or_default(config_path)?;
            println!("Config file: {}", config_path.display());
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
        ConfigCommand::Init => {
            if config_path.exists() {
                println!("Config already exists at {}", config_path.display());
                return Ok(());
            }
            Config::default().save(config_path)?;
            println!("Wrote default config to {}", config_path.display());
            Ok(())
        }
        ConfigCommand::Clear => {
            println!("Clearing configuration file...");
            Config::clear(config_path).map_err(Into::into)
        }
    }
}

/// Validate the file name before reading the file.
fn read_submission(
    file: &Path,
    endpoint: String,
    fields: Vec<(String, String)>,
) -> Result<Submission, Box<dyn Error>> {
    let file_name = FileUpload::file_name_of(file)?;
    if video_mime_type(&file_name).is_none() {
        let err = InvalidUpload::UnsupportedExtension(file_name);
        eprintln!("❌ {}", err);
        return Err(err.into());
    }
    let bytes = std::fs::read(file)?;
    let upload = FileUpload::video(VIDEO_FIELD, file_name, bytes)?;

    let mut submission = Submission::new(endpoint).file(upload);
    for (key, value) in fields {
        submission = submission.field(key, value);
    }
    Ok(submission)
}

/// Print the user-facing message and any transport detail, then pass the error on.
fn report(err: TaskError) -> TaskError {
    eprintln!("❌ {}", err.user_message());
    if let Some(hint) = err.hint() {
        eprintln!("   {}", hint);
    }
    err
}

/// Print events until the loop ends. Ctrl+C cancels polling.
async fn watch(
    handle: CancelHandle,
    mut events: UnboundedReceiver<TaskEvent>,
) -> Result<(), Box<dyn Error>> {
    let task_id = handle.task_id().to_string();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(event) => pretty::print_event(&task_id, &event),
                None => break,
            },
            _ = &mut ctrl_c => {
                warn!("Interrupted, no longer polling {}", task_id);
                println!("Stopped watching {}. The task keeps running on the server.", task_id);
                handle.cancel();
                break;
            }
        }
    }

    match handle.wait().await {
        PollEnd::Succeeded(_) | PollEnd::Cancelled => Ok(()),
        PollEnd::Failed(reason) => Err(TaskError::Failure { task_id, reason }.into()),
        PollEnd::PollFailed(err) => {
            if let Some(hint) = err.hint() {
                eprintln!("   {}", hint);
            }
            Err(err.into())
        }
        PollEnd::TimedOut => Err(TIMED_OUT.into()),
        PollEnd::Aborted(reason) => Err(reason.into()),
    }
}
