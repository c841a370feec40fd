//! Type definitions for the CodeLab judge API
//!
//! This crate provides the shared contract between the remote lab service and
//! its clients, ensuring type-safe communication across the wire boundary. By
//! centralizing the wire types, this approach prevents drift between the
//! client SDK and the terminal UI and enables compile-time validation of every
//! request and response shape the service exposes.
//!
//! ## Example
//!
//! ```rust
//! use codelab_api_types::Language;
//!
//! let lang: Language = "cpp".parse().unwrap();
//! assert_eq!(lang.judge_id(), "54");
//! assert_eq!(lang.label(), "C++");
//! ```

pub mod envelope;
pub mod error;
pub mod language;
pub mod submission;
pub mod user;

pub use envelope::*;
pub use error::*;
pub use language::*;
pub use submission::*;
pub use user::*;
