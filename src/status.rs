// System status display: database size, stored runs, latest run summary.

use anyhow::Result;
use std::path::Path;

use crate::db::{self, queries};
use crate::output::format_coefficient;

/// Display system status to the terminal.
pub fn show(db_path: &str) -> Result<()> {
    if !Path::new(db_path).exists() {
        println!("Database: not initialized");
        println!("\nRun `newsprism init` to set up the database.");
        return Ok(());
    }

    let file_size = std::fs::metadata(db_path)
        .map(|m| format_bytes(m.len()))
        .unwrap_or_else(|_| "unknown".to_string());
    println!("Database: {} ({})", db_path, file_size);

    let conn = db::open(db_path)?;
    let runs = queries::run_count(&conn)?;
    println!("Stored runs: {runs}");

    match queries::latest_run(&conn)? {
        Some(run) => {
            let stored = queries::article_count(&conn, run.id)?;
            println!(
                "Latest run: #{} at {} ({} articles stored, {} terms, {} topics, {} events, seed {})",
                run.id,
                run.created_at,
                stored,
                run.vocabulary_size,
                run.n_topics,
                run.n_events,
                run.seed
            );
            let events = queries::get_events(&conn, run.id)?;
            if let Some(biggest) = events.first() {
                println!(
                    "  Largest event: #{} with {} articles, first reported by {}",
                    biggest.event_id,
                    biggest.article_count,
                    biggest.earliest_source.as_deref().unwrap_or("?")
                );
            }
            if let Some(report) = queries::load_report(&conn, run.id)? {
                for result in [&report.sentiment_vs_volume, &report.traffic_vs_volume] {
                    println!(
                        "  {} vs {}: {} (n={})",
                        result.metric_a,
                        result.metric_b,
                        format_coefficient(result.coefficient),
                        result.sample_size
                    );
                }
            }
        }
        None => {
            println!("Latest run: none");
            println!("  Run `newsprism analyze <articles.csv>` to create one");
        }
    }

    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
