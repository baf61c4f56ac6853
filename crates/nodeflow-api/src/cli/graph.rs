//! Graph document subcommands: new, validate, show, node edits, connect, disconnect.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Subcommand;
use comfy_table::{presets, Cell, Color, ContentArrangement, Table};
use console::style;
use serde_json::{Map, Value};

use nodeflow_core::graph::document::{load_graph_file, save_graph_file, serialize_graph_json};
use nodeflow_core::graph::edit::{apply_edit, EditOutcome, GraphEdit};
use nodeflow_core::graph::validate::validate_graph;
use nodeflow_types::graph::{Graph, Position};

/// Node editing subcommands.
#[derive(Subcommand)]
pub enum NodeCommand {
    /// Append a node of the given type (trigger, http, transform, filter, webhook).
    Add {
        /// Path to the graph document.
        file: PathBuf,
        /// Node type.
        node_type: String,
    },

    /// Remove a node and every edge touching it.
    #[command(alias = "rm")]
    Remove {
        file: PathBuf,
        /// Node ID.
        id: String,
    },

    /// Change a node's display name.
    Rename {
        file: PathBuf,
        id: String,
        name: String,
    },

    /// Change a node's canvas position.
    Move {
        file: PathBuf,
        id: String,
        #[arg(allow_negative_numbers = true)]
        x: f64,
        #[arg(allow_negative_numbers = true)]
        y: f64,
    },

    /// Replace a node's config with a JSON object.
    Config {
        file: PathBuf,
        id: String,
        /// Config as a JSON object, e.g. '{"url": "https://example.com"}'.
        config: String,
    },
}

/// Handle `nodeflow new`.
pub fn handle_new(file: &Path, force: bool, json: bool) -> Result<()> {
    if file.exists() && !force {
        bail!(
            "'{}' already exists (use --force to overwrite)",
            file.display()
        );
    }

    let graph = Graph::starter();
    save_graph_file(file, &graph)
        .with_context(|| format!("Failed to write '{}'", file.display()))?;

    if json {
        println!("{}", serialize_graph_json(&graph)?);
    } else {
        println!();
        println!(
            "  {} Created {} with a trigger node",
            style("✓").green().bold(),
            style(file.display()).cyan()
        );
        println!();
    }
    Ok(())
}

/// Handle `nodeflow validate`.
pub fn handle_validate(file: &Path, json: bool) -> Result<()> {
    let graph = load(file)?;
    let result = validate_graph(&graph);

    if json {
        let out = match &result {
            Ok(report) => serde_json::json!({ "valid": true, "warnings": report.warnings }),
            Err(e) => serde_json::json!({ "valid": false, "error": e.to_string() }),
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
        if result.is_err() {
            bail!("graph is invalid");
        }
        return Ok(());
    }

    let report = result.with_context(|| format!("'{}' is invalid", file.display()))?;
    println!();
    println!(
        "  {} '{}' is valid ({} nodes, {} edges)",
        style("✓").green().bold(),
        style(file.display()).cyan(),
        graph.nodes.len(),
        graph.edges.len()
    );
    for warning in &report.warnings {
        println!("  {} {}", style("!").yellow().bold(), warning);
    }
    println!();
    Ok(())
}

/// Handle `nodeflow show`.
pub fn handle_show(file: &Path, json: bool) -> Result<()> {
    let graph = load(file)?;

    if json {
        println!("{}", serialize_graph_json(&graph)?);
        return Ok(());
    }

    let entry = graph.entry_node().map(|n| n.id.clone());

    let mut nodes = Table::new();
    nodes
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("ID").fg(Color::Cyan),
            Cell::new("Name"),
            Cell::new("Type"),
            Cell::new("Config"),
        ]);
    for node in &graph.nodes {
        let id = if entry.as_deref() == Some(node.id.as_str()) {
            format!("{} *", node.id)
        } else {
            node.id.clone()
        };
        let config = Value::Object(node.kind.config_map()).to_string();
        nodes.add_row(vec![
            Cell::new(id),
            Cell::new(&node.name),
            Cell::new(node.kind.type_name()),
            Cell::new(config),
        ]);
    }

    println!();
    println!("  Nodes in {}", style(file.display()).cyan());
    println!();
    println!("{nodes}");

    if graph.edges.is_empty() {
        println!();
        println!("  No edges.");
    } else {
        println!();
        println!("  Edges");
        for edge in &graph.edges {
            let dangling = graph.node(&edge.target).is_none() || graph.node(&edge.source).is_none();
            let marker = if dangling {
                format!(" {}", style("(dangling)").yellow())
            } else {
                String::new()
            };
            println!("    {} -> {}{}", edge.source, edge.target, marker);
        }
    }
    println!();
    Ok(())
}

/// Handle a `nodeflow node` subcommand.
pub fn handle_node_command(cmd: NodeCommand, json: bool) -> Result<()> {
    let (file, edit) = match cmd {
        NodeCommand::Add { file, node_type } => (file, GraphEdit::AddNode { node_type }),
        NodeCommand::Remove { file, id } => (file, GraphEdit::RemoveNode { id }),
        NodeCommand::Rename { file, id, name } => (file, GraphEdit::Rename { id, name }),
        NodeCommand::Move { file, id, x, y } => (
            file,
            GraphEdit::Move {
                id,
                position: Position { x, y },
            },
        ),
        NodeCommand::Config { file, id, config } => {
            let config = parse_config_object(&config)?;
            (file, GraphEdit::UpdateConfig { id, config })
        }
    };
    let outcome = edit_file(&file, edit)?;
    report_outcome(&outcome, json)
}

/// Handle `nodeflow connect` / `nodeflow disconnect`.
pub fn handle_edge(file: &Path, source: String, target: String, connect: bool, json: bool) -> Result<()> {
    let edit = if connect {
        GraphEdit::Connect { source, target }
    } else {
        GraphEdit::Disconnect { source, target }
    };
    let outcome = edit_file(file, edit)?;
    report_outcome(&outcome, json)
}

fn load(file: &Path) -> Result<Graph> {
    load_graph_file(file).with_context(|| format!("Failed to load '{}'", file.display()))
}

/// Load a document, apply one edit, and save it back.
fn edit_file(file: &Path, edit: GraphEdit) -> Result<EditOutcome> {
    let mut graph = load(file)?;
    let outcome = apply_edit(&mut graph, edit)?;
    save_graph_file(file, &graph)
        .with_context(|| format!("Failed to write '{}'", file.display()))?;
    Ok(outcome)
}

fn parse_config_object(raw: &str) -> Result<Map<String, Value>> {
    match serde_json::from_str::<Value>(raw).context("Config is not valid JSON")? {
        Value::Object(map) => Ok(map),
        other => bail!("Config must be a JSON object, got: {other}"),
    }
}

fn report_outcome(outcome: &EditOutcome, json: bool) -> Result<()> {
    let (kind, message) = match outcome {
        EditOutcome::NodeAdded { id } => ("node_added", format!("Added node {id}")),
        EditOutcome::NodeRemoved { id, edges_removed } => (
            "node_removed",
            format!("Removed node {id} and {edges_removed} edge(s)"),
        ),
        EditOutcome::EdgeAdded => ("edge_added", "Added edge".to_string()),
        EditOutcome::EdgeRemoved => ("edge_removed", "Removed edge".to_string()),
        EditOutcome::NodeUpdated { id } => ("node_updated", format!("Updated node {id}")),
    };

    if json {
        let mut out = serde_json::json!({ "result": kind });
        if let EditOutcome::NodeAdded { id }
        | EditOutcome::NodeRemoved { id, .. }
        | EditOutcome::NodeUpdated { id } = outcome
        {
            out["id"] = Value::String(id.clone());
        }
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("  {} {}", style("✓").green().bold(), message);
    }
    Ok(())
}
