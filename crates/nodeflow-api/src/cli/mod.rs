//! CLI command definitions for the `nodeflow` binary.
//!
//! Every command takes the graph document path as its first argument; edits
//! load the document, apply one `GraphEdit`, and write it back.

pub mod graph;
pub mod run;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

use graph::NodeCommand;

/// Build and run node-based workflow graphs.
#[derive(Parser)]
#[command(name = "nodeflow", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a new graph document containing a single trigger node.
    New {
        /// Path of the graph document to create.
        file: PathBuf,

        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },

    /// Check a graph document for structural problems.
    Validate {
        /// Path to the graph document.
        file: PathBuf,
    },

    /// Execute a graph from its trigger node and show the trace.
    Run {
        /// Path to the graph document.
        file: PathBuf,

        /// Pause before each node in milliseconds (overrides config).
        #[arg(long)]
        delay_ms: Option<u64>,
    },

    /// Show the nodes and edges of a graph document.
    Show {
        /// Path to the graph document.
        file: PathBuf,
    },

    /// Add, remove, rename, move, or configure nodes.
    Node {
        #[command(subcommand)]
        command: NodeCommand,
    },

    /// Add an edge between two nodes.
    Connect {
        /// Path to the graph document.
        file: PathBuf,
        /// Source node ID.
        source: String,
        /// Target node ID.
        target: String,
    },

    /// Remove the edge between two nodes.
    Disconnect {
        /// Path to the graph document.
        file: PathBuf,
        /// Source node ID.
        source: String,
        /// Target node ID.
        target: String,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}
