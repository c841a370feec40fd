//! Terminal lifecycle and rendering.

pub mod ui;
