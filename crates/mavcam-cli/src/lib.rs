//! mavcam command-line interface.
//!
//! This crate provides the `mavcam` binary: the bridge itself, a camera
//! simulator for bench work, and configuration helpers.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;

pub use cli::Cli;
pub use error::{CliError, CliResult};
