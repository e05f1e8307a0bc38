//! CLI arguments parsing
//!
//! This module handles command-line argument parsing for the replay
//! harness using clap's derive API.

pub mod args;

pub use args::{parse_args, CliArgs};
