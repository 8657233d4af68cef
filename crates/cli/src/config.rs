//! Command-line configuration.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use corelib::{BrowseConfig, Client, MemoryTransport};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::commands::{Command, CommandResult};

/// Browse an address space loaded from a JSON fixture.
#[derive(Debug, Parser)]
#[command(name = "browse", version)]
pub struct CliConfig {
    /// Address space fixture (JSON).
    #[arg(long, short = 'a', value_name = "FILE")]
    pub address_space: PathBuf,

    /// References per browse page served by the fixture; 0 for unlimited.
    #[arg(long, default_value_t = 0)]
    pub page_size: usize,

    /// Pages one node may take before browsing it is abandoned.
    #[arg(long, default_value_t = BrowseConfig::default().max_pages)]
    pub max_pages: usize,

    /// Enable debug logging (overrides RUST_LOG).
    #[arg(long)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl CliConfig {
    /// Install logging, load the fixture and run the command on stdout.
    pub fn run(&self) -> CommandResult {
        self.init_logging();

        let json = std::fs::read_to_string(&self.address_space)
            .with_context(|| format!("reading {}", self.address_space.display()))?;
        let transport = MemoryTransport::from_json(&json)
            .with_context(|| format!("loading {}", self.address_space.display()))?
            .with_page_size(self.page_size);
        info!(nodes = transport.len(), "address space loaded");

        let client = Client::new(transport).with_config(self.browse_config());
        let stdout = std::io::stdout();
        self.command.execute(&client, &mut stdout.lock())
    }

    pub fn browse_config(&self) -> BrowseConfig {
        BrowseConfig::default().with_max_pages(self.max_pages)
    }

    fn init_logging(&self) {
        let filter = if self.debug {
            EnvFilter::new("debug")
        } else {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
        };
        // Ignore the error if a subscriber is already installed.
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::OutputFormat;

    #[test]
    fn test_parse_browse_flags() {
        let config = CliConfig::try_parse_from([
            "browse",
            "--address-space",
            "plant.json",
            "--page-size",
            "2",
            "walk",
            "--node",
            "ns=2;s=Plant",
            "--max-depth",
            "4",
            "--collect-errors",
            "--parallel",
            "3",
            "--format",
            "json",
        ])
        .unwrap();

        assert_eq!(config.page_size, 2);
        assert_eq!(config.max_pages, BrowseConfig::default().max_pages);
        match config.command {
            Command::Walk(args) => {
                assert_eq!(args.node, "ns=2;s=Plant");
                assert_eq!(args.max_depth, 4);
                assert!(args.collect_errors);
                assert_eq!(args.parallel, Some(3));
                assert_eq!(args.format, OutputFormat::Json);
            }
            other => panic!("expected walk, got {:?}", other),
        }
    }

    #[test]
    fn test_address_space_is_required() {
        assert!(CliConfig::try_parse_from(["browse", "walk", "--node", "i=85"]).is_err());
    }
}
