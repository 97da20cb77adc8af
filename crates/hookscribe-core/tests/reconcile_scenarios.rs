//! Install/clear scenarios against real settings files
//!
//! Unrelated keys and bindings must come out of every reconciliation
//! byte-identical (compared as serialized subtrees).

use hookscribe_core::{EventType, ReconcileError, Reconciler};
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn read(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

fn subtree(value: &Value, pointer: &str) -> String {
    serde_json::to_string(value.pointer(pointer).unwrap()).unwrap()
}

/// A document with third-party content in every corner
fn busy_document() -> Value {
    json!({
        "model": "opus",
        "permissions": {"allow": ["Bash(ls:*)", "Read"], "deny": []},
        "hooks": {
            "PreToolUse": [
                {"matcher": "Edit|Write", "hooks": [{"type": "command", "command": "prettier --check", "timeout": 30}]}
            ],
            "FutureEvent": [
                {"matcher": "?", "hooks": [{"type": "webhook", "url": "https://example.invalid"}]}
            ]
        },
        "statusLine": {"type": "command", "command": "status.sh"},
        "zzz": [1, 2.5, null, true, {"nested": ["deep"]}]
    })
}

#[test]
fn test_empty_document_install_scenario() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("settings.json");

    let first = Reconciler::new(&path)
        .install(&[EventType::PreToolUse], Some("*"), "logger run")
        .unwrap();
    let after_first = fs::read(&path).unwrap();

    let second = Reconciler::new(&path)
        .install(&[EventType::PreToolUse], Some("*"), "logger run")
        .unwrap();

    assert_eq!(first.added.len(), 1);
    assert!(second.added.is_empty());
    assert_eq!(fs::read(&path).unwrap(), after_first);
    assert_eq!(
        read(&path),
        json!({"hooks": {"PreToolUse": [
            {"matcher": "*", "hooks": [{"type": "command", "command": "logger run"}]}
        ]}})
    );
}

#[test]
fn test_install_preserves_unrelated_subtrees() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("settings.json");
    let original = busy_document();
    fs::write(&path, serde_json::to_string_pretty(&original).unwrap()).unwrap();

    let mut reconciler = Reconciler::new(&path);
    let all: Vec<EventType> = EventType::KNOWN.to_vec();
    for event_type in &all {
        let matcher = event_type.is_tool_scoped().then_some("*");
        reconciler
            .install(
                std::slice::from_ref(event_type),
                matcher,
                &format!("hookscribe log {event_type}"),
            )
            .unwrap();
    }

    let updated = read(&path);
    for pointer in [
        "/model",
        "/permissions",
        "/statusLine",
        "/zzz",
        "/hooks/FutureEvent",
        "/hooks/PreToolUse/0",
    ] {
        assert_eq!(subtree(&original, pointer), subtree(&updated, pointer), "{pointer}");
    }

    let top_keys: Vec<&String> = updated.as_object().unwrap().keys().collect();
    assert_eq!(top_keys, ["model", "permissions", "hooks", "statusLine", "zzz"]);
    assert_eq!(updated["hooks"]["PreToolUse"].as_array().unwrap().len(), 2);
    assert_eq!(updated["hooks"]["Stop"][0].get("matcher"), None);
    assert_eq!(reconciler.bindings().unwrap().len(), all.len() + 1);
}

#[test]
fn test_clear_restores_original_content() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("settings.json");
    let original = busy_document();
    fs::write(&path, serde_json::to_string_pretty(&original).unwrap()).unwrap();

    let mut reconciler = Reconciler::new(&path);
    reconciler
        .install(
            &[EventType::PreToolUse, EventType::Stop],
            Some("*"),
            "/opt/bin/hookscribe log",
        )
        .unwrap();
    let report = reconciler.clear(false).unwrap();

    assert_eq!(report.removed.len(), 2);
    assert_eq!(read(&path), original);
    assert_eq!(
        serde_json::to_string(&read(&path)).unwrap(),
        serde_json::to_string(&original).unwrap()
    );
}

#[test]
fn test_malformed_document_is_untouched() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("settings.json");
    let broken = "{\"hooks\": {\"Stop\": [}\n";
    fs::write(&path, broken).unwrap();

    let err = Reconciler::new(&path)
        .install(&[EventType::Stop], None, "hookscribe log Stop")
        .unwrap_err();

    assert!(matches!(err, ReconcileError::Malformed { .. }));
    assert!(err.to_string().contains("settings.json"));
    assert_eq!(fs::read_to_string(&path).unwrap(), broken);
    assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 1);
}

#[test]
fn test_overlap_reported_and_both_kept() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("settings.json");
    let mut reconciler = Reconciler::new(&path);

    reconciler
        .install(&[EventType::PreToolUse], Some("Bash"), "hookscribe log PreToolUse")
        .unwrap();
    let report = reconciler
        .install(&[EventType::PreToolUse], Some("*"), "hookscribe log PreToolUse")
        .unwrap();

    assert_eq!(report.added.len(), 1);
    assert_eq!(report.overlaps.len(), 1);
    assert_eq!(report.overlaps[0].existing.matcher.as_deref(), Some("Bash"));
    assert_eq!(reconciler.bindings().unwrap().len(), 2);
}

#[test]
fn test_number_literals_survive_install_and_clear() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("settings.json");
    fs::write(
        &path,
        "{\"big\": 12345678901234567890123, \"exp\": 1e2, \"f\": 0.1000, \"neg\": -0.0}\n",
    )
    .unwrap();

    let mut reconciler = Reconciler::new(&path);
    reconciler
        .install(&[EventType::PreToolUse], Some("*"), "hookscribe log PreToolUse")
        .unwrap();

    let installed = fs::read_to_string(&path).unwrap();
    for literal in ["12345678901234567890123", "1e2", "0.1000", "-0.0"] {
        assert!(installed.contains(literal), "{literal} rewritten in:\n{installed}");
    }

    reconciler.clear(false).unwrap();
    let cleared = fs::read_to_string(&path).unwrap();
    assert!(cleared.contains("\"big\": 12345678901234567890123"));
    assert!(cleared.contains("\"exp\": 1e2"));
    assert!(cleared.contains("\"f\": 0.1000"));
}
