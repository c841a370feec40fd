//! Terminal user interface for the CodeLab judge.
//!
//! This crate renders the lab's views in the terminal: a three-pane code
//! editor with live run output, the submission history table, the admin
//! analytics dashboard, and the account forms. All network traffic goes
//! through `codelab-client`; this crate only turns its events into pixels
//! and key presses into actions.

pub mod application;
pub mod configuration;
pub mod domain;
pub use application::ui::{destruct_terminal_for_panic, start_loop};
pub use configuration::{Config, ConfigKey};
pub use domain::models::{Action, Event, Gate, Route, Toast, ToastKind};
pub use domain::services::{ActionsService, AppState, AppStateProps, EventsService};
