// src/exec/mod.rs

//! Job submission layer.
//!
//! - [`backend`] provides the `JobSubmitter` trait, the request type and a
//!   `DryRunSubmitter` that only hands out placeholder ids.
//! - [`command`] submits by running a configured shell command, using
//!   `tokio::process::Command`.

pub mod backend;
pub mod command;

pub use backend::{DryRunSubmitter, JobSubmissionRequest, JobSubmitter, SubmitFuture, placeholder_job_id};
pub use command::CommandSubmitter;
