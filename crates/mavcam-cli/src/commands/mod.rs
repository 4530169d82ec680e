//! Subcommand implementations.

pub mod bridge;
pub mod camera_sim;
pub mod config;
