//! codechat server: real-time group messaging with collaborative live editing
//! of code snippets.

pub mod app;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;
