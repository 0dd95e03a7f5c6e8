//! Client for the wagon inspection backend.
//!
//! [`task_client::AsyncTaskClient`] submits long-running jobs and polls them
//! to completion; [`storage::VideoLibrary`] browses the stored videos.

pub mod backend;
pub mod config;
pub mod consts;
pub mod environment;
pub mod storage;
pub mod submission;
pub mod task;
pub mod task_client;
