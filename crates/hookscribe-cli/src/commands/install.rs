//! `hookscribe install` and `hookscribe clear`

use super::print_json;
use crate::cli::{ClearArgs, InstallArgs, OutputFormat, SettingsTarget};
use anyhow::{Context, Result};
use comfy_table::{presets::UTF8_FULL, Table};
use hookscribe_core::{EventType, HookBinding, OwnershipPatterns, ReconcileReport, Reconciler};
use std::collections::BTreeMap;
use std::path::PathBuf;

const EVENT_PLACEHOLDER: &str = "{event}";

pub fn install(args: InstallArgs) -> Result<()> {
    let mut reconciler = reconciler(&args.target)?;
    let event_types = selected_events(&args.events);

    // Group event types by their command so each distinct command is one merge
    let mut by_command: BTreeMap<String, Vec<EventType>> = BTreeMap::new();
    for event_type in event_types {
        let command = args.command.replace(EVENT_PLACEHOLDER, event_type.as_str());
        by_command.entry(command).or_default().push(event_type);
    }

    let mut total = ReconcileReport::default();
    for (command, events) in by_command {
        let (scoped, unscoped): (Vec<_>, Vec<_>) =
            events.into_iter().partition(EventType::is_tool_scoped);
        if !scoped.is_empty() {
            let report = reconciler
                .install(&scoped, Some(&args.matcher), &command)
                .with_context(|| format!("Failed to install into {}", reconciler.path().display()))?;
            absorb(&mut total, report);
        }
        if !unscoped.is_empty() {
            let report = reconciler
                .install(&unscoped, None, &command)
                .with_context(|| format!("Failed to install into {}", reconciler.path().display()))?;
            absorb(&mut total, report);
        }
    }

    print_report(&reconciler, &total, &args.target)
}

pub fn clear(args: ClearArgs) -> Result<()> {
    let mut reconciler = reconciler(&args.target)?;
    let report = reconciler
        .clear(args.force)
        .with_context(|| format!("Failed to clear {}", reconciler.path().display()))?;
    print_report(&reconciler, &report, &args.target)
}

fn reconciler(target: &SettingsTarget) -> Result<Reconciler> {
    let path = settings_path(target)?;
    let mut reconciler = Reconciler::new(path).with_dry_run(target.dry_run);
    if !target.owner_patterns.is_empty() {
        let mut patterns = vec![hookscribe_core::reconcile::DEFAULT_OWNERSHIP_PATTERN.to_string()];
        patterns.extend(target.owner_patterns.iter().cloned());
        reconciler = reconciler.with_ownership(OwnershipPatterns::new(&patterns)?);
    }
    Ok(reconciler)
}

fn settings_path(target: &SettingsTarget) -> Result<PathBuf> {
    if let Some(path) = &target.settings {
        return Ok(path.clone());
    }
    let project_dir = match &target.project_dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().context("Failed to determine the current directory")?,
    };
    Ok(target.scope.settings_path(&project_dir)?)
}

/// Requested event types, or every known type when none were named
fn selected_events(requested: &[String]) -> Vec<EventType> {
    let mut events: Vec<EventType> = if requested.is_empty() {
        EventType::KNOWN.to_vec()
    } else {
        requested.iter().map(|raw| EventType::parse(raw)).collect()
    };
    let mut seen = Vec::with_capacity(events.len());
    events.retain(|event| {
        if seen.contains(event) {
            false
        } else {
            seen.push(event.clone());
            true
        }
    });
    events
}

fn absorb(total: &mut ReconcileReport, report: ReconcileReport) {
    total.added.extend(report.added);
    total.unchanged.extend(report.unchanged);
    total.removed.extend(report.removed);
    total.overlaps.extend(report.overlaps);
    total.hooks_reset |= report.hooks_reset;
    total.written |= report.written;
    if total.backup.is_none() {
        total.backup = report.backup;
    }
}

fn print_report(
    reconciler: &Reconciler,
    report: &ReconcileReport,
    target: &SettingsTarget,
) -> Result<()> {
    if target.format == OutputFormat::Json {
        return print_json(report);
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["Change", "Event", "Matcher", "Command"]);
    let rows = [
        ("added", &report.added),
        ("unchanged", &report.unchanged),
        ("removed", &report.removed),
    ];
    let mut listed = 0;
    for (change, bindings) in rows {
        for binding in bindings {
            table.add_row(binding_row(change, binding));
            listed += 1;
        }
    }
    if listed > 0 {
        println!("{table}");
    }

    for overlap in &report.overlaps {
        println!("warning: {overlap}; left in place");
    }
    if report.hooks_reset {
        println!("hooks section reset");
    }

    let path = reconciler.path().display();
    match (&report.backup, report.written, target.dry_run) {
        (_, _, true) if report.changed() => println!("dry run: {path} not modified"),
        (Some(backup), true, _) => println!("updated {path} (backup: {})", backup.display()),
        (None, true, _) => println!("updated {path}"),
        _ => println!("{path} already up to date"),
    }
    Ok(())
}

fn binding_row(change: &str, binding: &HookBinding) -> Vec<String> {
    vec![
        change.to_string(),
        binding.event_type.clone(),
        binding.matcher.clone().unwrap_or_default(),
        binding.command.clone(),
    ]
}
