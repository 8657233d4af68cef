//! CLI commands.

use std::io::Write;

use anyhow::Context;
use clap::{Args, Subcommand, ValueEnum};
use corelib::{AttributeId, BrowseDirection, Client, NodeId};
use tracing::warn;
use walker::{ErrorPolicy, Fanout, TreeWalker, WalkConfig, Writability};

/// Result of running one command.
pub type CommandResult = anyhow::Result<()>;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Walk the subtree under a node and list its variables.
    Walk(WalkArgs),
    /// List the references of one node.
    References(ReferenceArgs),
    /// Read the common attributes of one node.
    Read(ReadArgs),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Args)]
pub struct WalkArgs {
    /// Root node, e.g. `ns=2;s=Plant`.
    #[arg(long, short = 'n')]
    pub node: String,

    #[arg(long, default_value_t = WalkConfig::DEFAULT_MAX_DEPTH)]
    pub max_depth: usize,

    /// Skip failing branches instead of aborting the walk.
    #[arg(long)]
    pub collect_errors: bool,

    /// Expand sibling subtrees on up to N worker threads.
    #[arg(long, value_name = "N")]
    pub parallel: Option<usize>,

    /// Stop at nodes that are their own ancestor.
    #[arg(long)]
    pub detect_cycles: bool,

    /// Do not read AccessLevel; report every variable as read-only.
    #[arg(long)]
    pub no_access_level: bool,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

impl WalkArgs {
    pub fn walk_config(&self) -> WalkConfig {
        WalkConfig {
            max_depth: self.max_depth,
            error_policy: if self.collect_errors {
                ErrorPolicy::Collect
            } else {
                ErrorPolicy::FailFast
            },
            writability: if self.no_access_level {
                Writability::Disabled
            } else {
                Writability::AccessLevel
            },
            fanout: match self.parallel {
                Some(max_threads) => Fanout::Parallel { max_threads },
                None => Fanout::Sequential,
            },
            detect_cycles: self.detect_cycles,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum Direction {
    Forward,
    Inverse,
    Both,
}

impl From<Direction> for BrowseDirection {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Forward => BrowseDirection::Forward,
            Direction::Inverse => BrowseDirection::Inverse,
            Direction::Both => BrowseDirection::Both,
        }
    }
}

#[derive(Debug, Args)]
pub struct ReferenceArgs {
    #[arg(long, short = 'n')]
    pub node: String,

    /// Reference type to follow (subtypes included); all references if unset.
    #[arg(long, value_name = "NODEID")]
    pub reference_type: Option<String>,

    #[arg(long, value_enum, default_value_t = Direction::Forward)]
    pub direction: Direction,
}

#[derive(Debug, Args)]
pub struct ReadArgs {
    #[arg(long, short = 'n')]
    pub node: String,
}

/// Attributes printed by `read`, in order.
const READ_ATTRIBUTES: [AttributeId; 7] = [
    AttributeId::NodeId,
    AttributeId::NodeClass,
    AttributeId::BrowseName,
    AttributeId::DisplayName,
    AttributeId::Description,
    AttributeId::Value,
    AttributeId::AccessLevel,
];

impl Command {
    /// Run against `client`, writing results to `out`.
    pub fn execute<W: Write>(&self, client: &Client, out: &mut W) -> CommandResult {
        match self {
            Command::Walk(args) => walk(client, args, out),
            Command::References(args) => references(client, args, out),
            Command::Read(args) => read(client, args, out),
        }
    }
}

fn walk<W: Write>(client: &Client, args: &WalkArgs, out: &mut W) -> CommandResult {
    let node = client.node_from_str(&args.node)?;
    let report = TreeWalker::with_config(args.walk_config())
        .walk_report(&node)
        .with_context(|| format!("walking {}", node))?;

    for failure in &report.errors {
        warn!(%failure, "branch skipped");
    }
    match args.format {
        OutputFormat::Text => {
            for variable in &report.variables {
                writeln!(out, "{}", variable)?;
            }
        }
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, &report.variables)?;
            writeln!(out)?;
        }
    }
    Ok(())
}

fn references<W: Write>(client: &Client, args: &ReferenceArgs, out: &mut W) -> CommandResult {
    let node = client.node_from_str(&args.node)?;
    let reference_type = args
        .reference_type
        .as_deref()
        .map(str::parse::<NodeId>)
        .transpose()?;

    let references = node
        .references(reference_type, args.direction.into(), None, true)
        .with_context(|| format!("browsing {}", node))?;
    for reference in references {
        writeln!(
            out,
            "{}\t{}\t{}\t{}{}",
            reference.node_id,
            reference.node_class,
            reference.browse_name,
            reference.reference_type_id,
            if reference.is_forward { "" } else { " (inverse)" }
        )?;
    }
    Ok(())
}

fn read<W: Write>(client: &Client, args: &ReadArgs, out: &mut W) -> CommandResult {
    let node = client.node_from_str(&args.node)?;
    let values = node
        .attributes(&READ_ATTRIBUTES)
        .with_context(|| format!("reading {}", node))?;

    for (attribute, value) in READ_ATTRIBUTES.iter().zip(values) {
        if !value.status.is_good() {
            // Attributes a class does not have are simply left out.
            continue;
        }
        if *attribute == AttributeId::NodeClass {
            writeln!(out, "{}: {}", attribute, value.value.as_node_class()?)?;
        } else {
            writeln!(out, "{}: {}", attribute, value.value)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use corelib::MemoryTransport;

    const PLANT: &str = include_str!("../fixtures/plant.json");

    fn client() -> Client {
        Client::new(MemoryTransport::from_json(PLANT).unwrap().with_page_size(2))
    }

    fn walk_args(node: &str) -> WalkArgs {
        WalkArgs {
            node: node.to_string(),
            max_depth: WalkConfig::DEFAULT_MAX_DEPTH,
            collect_errors: false,
            parallel: None,
            detect_cycles: false,
            no_access_level: false,
            format: OutputFormat::Text,
        }
    }

    fn run(command: Command) -> String {
        let mut out = Vec::new();
        command.execute(&client(), &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_walk_text_output() {
        let output = run(Command::Walk(walk_args("ns=2;s=Plant")));
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(
            lines,
            vec![
                r#"{ns=2;s=Plant.Boiler.Temp Plant.Boiler.Temp "Water temperature" false ???}"#,
                r#"{ns=2;s=Plant.Boiler.Setpoint Plant.Boiler.Setpoint "Target temperature" true ???}"#,
                r#"{ns=2;s=Plant.Pump.Speed Plant.Pump.Speed "Pump speed in rpm" false ???}"#,
            ]
        );
    }

    #[test]
    fn test_walk_json_output() {
        let mut args = walk_args("ns=2;s=Plant.Pump");
        args.format = OutputFormat::Json;
        let output = run(Command::Walk(args));

        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed[0]["path"], "Pump.Speed");
        assert_eq!(parsed[0]["node_id"], "ns=2;s=Plant.Pump.Speed");
        assert_eq!(parsed[0]["data_type"], serde_json::Value::Null);
    }

    #[test]
    fn test_walk_rejects_bad_node_id() {
        let mut out = Vec::new();
        let err = Command::Walk(walk_args("Plant"))
            .execute(&client(), &mut out)
            .unwrap_err();
        assert!(err.to_string().contains("invalid node id"));
    }

    #[test]
    fn test_walk_collect_errors_reports_unknown_root() {
        let mut args = walk_args("ns=2;s=Plnat");
        args.collect_errors = true;
        let mut out = Vec::new();
        assert!(Command::Walk(args).execute(&client(), &mut out).is_err());
        assert!(out.is_empty());
    }

    #[test]
    fn test_references_output() {
        let output = run(Command::References(ReferenceArgs {
            node: "ns=2;s=Plant".to_string(),
            reference_type: Some("i=33".to_string()),
            direction: Direction::Forward,
        }));
        let targets: Vec<&str> = output
            .lines()
            .map(|l| l.split('\t').next().unwrap())
            .collect();
        assert_eq!(targets, vec!["ns=2;s=Plant.Boiler", "ns=2;s=Plant.Pump"]);
    }

    #[test]
    fn test_read_output() {
        let output = run(Command::Read(ReadArgs {
            node: "ns=2;s=Plant.Boiler.Temp".to_string(),
        }));
        assert!(output.contains("NodeClass: Variable"));
        assert!(output.contains("BrowseName: 2:Temp"));
        assert!(output.contains("Value: 81.5"));
        assert!(output.contains("AccessLevel: 1"));
    }
}
