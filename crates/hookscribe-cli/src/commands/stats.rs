use super::{load_config, open_database, print_json};
use crate::cli::OutputFormat;
use anyhow::Result;
use comfy_table::{presets::UTF8_FULL, Table};
use hookscribe_sqlite::DbStats;
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Serialize)]
struct StatsReport {
    database: String,
    #[serde(flatten)]
    stats: DbStats,
    by_hook_type: Vec<HookTypeCount>,
}

#[derive(Debug, Serialize)]
struct HookTypeCount {
    hook_type: String,
    count: u64,
}

pub fn execute(format: OutputFormat, config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let writer = open_database(&config)?;

    let report = StatsReport {
        database: writer.path().display().to_string(),
        stats: writer.stats()?,
        by_hook_type: writer
            .counts_by_hook_type()?
            .into_iter()
            .map(|(hook_type, count)| HookTypeCount { hook_type, count })
            .collect(),
    };

    match format {
        OutputFormat::Json => print_json(&report),
        OutputFormat::Table => {
            print_table(&report);
            Ok(())
        }
    }
}

fn print_table(report: &StatsReport) {
    println!("Database: {}", report.database);
    println!(
        "Size: {} bytes ({} pages of {} bytes, {} free)",
        report.stats.total_size_bytes,
        report.stats.page_count,
        report.stats.page_size,
        report.stats.freelist_count
    );
    println!("Events: {}", report.stats.row_count);

    if report.by_hook_type.is_empty() {
        return;
    }
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec!["Event", "Count"]);
    for entry in &report.by_hook_type {
        table.add_row(vec![entry.hook_type.clone(), entry.count.to_string()]);
    }
    println!("\n{table}");
}
