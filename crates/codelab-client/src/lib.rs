//! Client SDK for programmatic interaction with the CodeLab judge service
//!
//! This crate abstracts the lab's HTTP surface behind a typed client: a
//! base-URL'd request wrapper, an authenticated layer that transparently
//! refreshes an expired access token exactly once, injectable session state,
//! and the submission lifecycle runner that drives a run from submit to a
//! terminal verdict under a polling budget with cooperative cancellation.
//! UI layers stay free of wire-level concerns; everything they receive is
//! either a typed payload or a classified [`error::ApiError`].

pub mod auth;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod session;
pub mod transcript;

pub use auth::{AvatarUpload, JudgeApi, LabClient, RegisterForm};
pub use error::{toast_message, ApiError};
pub use http::HttpClient;
pub use lifecycle::{RunOutcome, RunRequest, RunState, SubmissionRunner};
pub use session::Session;
