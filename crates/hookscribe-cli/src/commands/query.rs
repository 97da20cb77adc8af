use super::{load_config, open_database, print_json};
use crate::cli::{OutputFormat, QueryArgs};
use crate::time::parse_since;
use anyhow::Result;
use chrono::Utc;
use comfy_table::{presets::UTF8_FULL, Table};
use hookscribe_sqlite::{HookQuery, StoredRecord};
use std::path::Path;

pub fn execute(args: QueryArgs, config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let query = build_query(&args)?;
    let records = open_database(&config)?.query(&query)?;

    match args.format {
        OutputFormat::Json => print_json(&records),
        OutputFormat::Table => {
            if records.is_empty() {
                println!("No matching events");
            } else {
                println!("{}", render_table(&records));
            }
            Ok(())
        }
    }
}

fn build_query(args: &QueryArgs) -> Result<HookQuery> {
    let mut query = HookQuery::new().limit(args.limit);
    query.hook_type = args.event.clone();
    query.tool_name = args.tool.clone();
    query.session_id = args.session.clone();
    query.status = args.status.clone();
    if let Some(since) = &args.since {
        query = query.since(parse_since(since, Utc::now())?);
    }
    Ok(query)
}

fn render_table(records: &[StoredRecord]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec![
        "ID", "Time", "Event", "Tool", "Status", "Duration", "Session",
    ]);
    for record in records {
        table.add_row(vec![
            record.id.to_string(),
            record.timestamp_iso.clone(),
            record.hook_type.clone(),
            record.tool_name.clone(),
            record.status.clone(),
            record
                .duration_ms
                .map(|ms| format!("{ms} ms"))
                .unwrap_or_default(),
            record.session_id.clone(),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> QueryArgs {
        QueryArgs {
            event: None,
            tool: Some("Bash".to_string()),
            session: None,
            status: None,
            since: None,
            limit: 5,
            format: OutputFormat::Table,
        }
    }

    #[test]
    fn test_build_query_copies_filters() {
        let query = build_query(&args()).unwrap();
        assert_eq!(query.tool_name.as_deref(), Some("Bash"));
        assert_eq!(query.limit, Some(5));
        assert!(query.since.is_none());
    }

    #[test]
    fn test_build_query_rejects_bad_since() {
        let mut args = args();
        args.since = Some("last tuesday".to_string());
        assert!(build_query(&args).is_err());
    }
}
