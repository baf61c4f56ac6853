//! `nodeflow run`: execute a graph and render its trace while it runs.
//!
//! The engine runs on the current task together with a live renderer fed by
//! the trace `watch` channel, a debug log of bus events, and a Ctrl-C listener.
//! Ctrl-C cancels the run; the in-flight node is recorded as failed.

use std::path::Path;

use anyhow::{Context, Result};
use comfy_table::{presets, Cell, Color, ContentArrangement, Table};
use console::style;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use nodeflow_core::engine::trace::TraceRecorder;
use nodeflow_core::engine::traversal::RunOutcome;
use nodeflow_core::graph::document::load_graph_file;
use nodeflow_types::event::RunEvent;
use nodeflow_types::trace::{ExecutionRecord, ExecutionStatus};

use crate::state::AppState;

/// Max characters of output/error shown per table cell.
const CELL_PREVIEW_CHARS: usize = 60;

/// Handle `nodeflow run`.
pub async fn handle_run(
    state: &AppState,
    file: &Path,
    delay_ms: Option<u64>,
    json: bool,
    quiet: bool,
) -> Result<()> {
    let graph = load_graph_file(file)
        .with_context(|| format!("Failed to load '{}'", file.display()))?;
    let (engine, bus) = state.engine(delay_ms)?;
    let mut events = bus.subscribe();

    let recorder = TraceRecorder::new();
    let rx = recorder.subscribe();
    let cancel = CancellationToken::new();
    let finished = CancellationToken::new();

    let run = async {
        let result = engine.run(&graph, recorder, cancel.clone()).await;
        finished.cancel();
        result
    };
    let interrupt = async {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupt received, cancelling run");
                cancel.cancel();
            }
            _ = finished.cancelled() => {}
        }
    };
    let log_events = async {
        loop {
            tokio::select! {
                biased;
                event = events.recv() => match event {
                    Ok(event) => log_event(&event),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "run event log lagged");
                    }
                    Err(RecvError::Closed) => break,
                },
                _ = finished.cancelled() => break,
            }
        }
    };
    let live = render_live(rx, !(json || quiet));

    let (result, (), (), ()) = tokio::join!(run, interrupt, log_events, live);
    let outcome = result.with_context(|| format!("Failed to run '{}'", file.display()))?;

    if json {
        print_json(&outcome)?;
    } else if !quiet {
        print_summary(&outcome);
    }
    Ok(())
}

fn log_event(event: &RunEvent) {
    let run_id = event.run_id();
    match event {
        RunEvent::NodeFailed { node_id, error, .. } => {
            tracing::info!(%run_id, node_id = node_id.as_str(), error = error.as_str(), "node failed");
        }
        _ => tracing::debug!(%run_id, ?event, "run event"),
    }
}

/// Print one line per record state change until the recorder is dropped.
async fn render_live(mut rx: watch::Receiver<Vec<ExecutionRecord>>, enabled: bool) {
    // Last status printed for each record index.
    let mut printed: Vec<ExecutionStatus> = Vec::new();

    while rx.changed().await.is_ok() {
        let snapshot = rx.borrow_and_update().clone();
        if !enabled {
            continue;
        }
        for (idx, record) in snapshot.iter().enumerate() {
            if printed.get(idx) == Some(&record.status) {
                continue;
            }
            println!("{}", live_line(record));
            if idx < printed.len() {
                printed[idx] = record.status;
            } else {
                printed.push(record.status);
            }
        }
    }
}

fn live_line(record: &ExecutionRecord) -> String {
    match record.status {
        ExecutionStatus::Running => format!(
            "  {} {} {}",
            style("●").blue(),
            style(&record.node_name).bold(),
            style("running").dim()
        ),
        ExecutionStatus::Success => format!(
            "  {} {} {}",
            style("✓").green(),
            style(&record.node_name).bold(),
            style(format_duration(record.duration_millis)).dim()
        ),
        ExecutionStatus::Error => format!(
            "  {} {} {}",
            style("✗").red(),
            style(&record.node_name).bold(),
            style(record.error.as_deref().unwrap_or("failed")).red()
        ),
    }
}

fn print_json(outcome: &RunOutcome) -> Result<()> {
    let out = serde_json::json!({
        "runId": outcome.run_id.to_string(),
        "cancelled": outcome.cancelled,
        "output": outcome.output,
        "trace": outcome.trace,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

fn print_summary(outcome: &RunOutcome) {
    println!();
    if outcome.trace.is_empty() {
        println!(
            "  {} No trigger node; nothing was executed.",
            style("!").yellow().bold()
        );
        println!();
        return;
    }

    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Node").fg(Color::Cyan),
            Cell::new("Status"),
            Cell::new("Started"),
            Cell::new("Duration"),
            Cell::new("Output / Error"),
        ]);

    for record in &outcome.trace {
        let status = match record.status {
            ExecutionStatus::Success => Cell::new("success").fg(Color::Green),
            ExecutionStatus::Error => Cell::new("error").fg(Color::Red),
            ExecutionStatus::Running => Cell::new("running").fg(Color::Yellow),
        };
        let detail = record
            .error
            .as_deref()
            .or(record.output.as_deref())
            .map(preview)
            .unwrap_or_else(|| "-".to_string());

        table.add_row(vec![
            Cell::new(format!("{} ({})", record.node_name, record.node_id)),
            status,
            Cell::new(record.timestamp.format("%H:%M:%S%.3f").to_string()),
            Cell::new(format_duration(record.duration_millis)),
            Cell::new(detail),
        ]);
    }

    let failed = outcome
        .trace
        .iter()
        .filter(|r| r.status == ExecutionStatus::Error)
        .count();
    let run_id = outcome.run_id.to_string();

    println!("  Run {}", style(&run_id[..8]).cyan());
    println!();
    println!("{table}");
    println!();
    if outcome.cancelled {
        println!("  {} Run cancelled", style("!").yellow().bold());
    } else {
        println!("  {} visits, {} failed", outcome.trace.len(), failed);
    }
    println!();
}

fn format_duration(millis: Option<u64>) -> String {
    match millis {
        Some(ms) => format!("{ms}ms"),
        None => "-".to_string(),
    }
}

/// Collapse whitespace and cap the length of a serialized value.
fn preview(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() > CELL_PREVIEW_CHARS {
        let cut: String = flat.chars().take(CELL_PREVIEW_CHARS).collect();
        format!("{cut}…")
    } else {
        flat
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_flattens_and_truncates() {
        assert_eq!(preview("{\n  \"a\": 1\n}"), "{ \"a\": 1 }");
        let long = "x".repeat(100);
        let shown = preview(&long);
        assert_eq!(shown.chars().count(), CELL_PREVIEW_CHARS + 1);
        assert!(shown.ends_with('…'));
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Some(512)), "512ms");
        assert_eq!(format_duration(None), "-");
    }
}
