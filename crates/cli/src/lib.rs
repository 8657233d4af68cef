//! CLI tool for browsing an address space.
//!
//! Provides commands for:
//! - Walking a subtree and listing its variables
//! - Listing the direct children of a node
//! - Reading the common attributes of a node

pub mod commands;
pub mod config;

pub use commands::{Command, CommandResult};
pub use config::CliConfig;
