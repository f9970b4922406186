//! CLI module for mbrl-jobs
//!
//! Handles command-line argument parsing and tool settings.

pub mod args;
pub mod config;

pub use args::{Args, Commands, Verbosity};
pub use config::{OutputSettings, Settings};
