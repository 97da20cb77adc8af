//! Hook bindings and the in-memory edits applied to a settings document
//!
//! The document shape is
//!
//! ```json
//! {"hooks": {"PreToolUse": [{"matcher": "*", "hooks": [{"type": "command", "command": "..."}]}]}}
//! ```
//!
//! Every edit here works in place on the parsed document and only touches
//! the path leading to the binding it adds or removes.

use crate::error::ReconcileError;
use regex::Regex;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::fmt;

const HOOKS_KEY: &str = "hooks";
const MATCHER_KEY: &str = "matcher";
const COMMAND_KEY: &str = "command";

/// Default ownership pattern: a `hookscribe` executable token anywhere in
/// the command line
pub const DEFAULT_OWNERSHIP_PATTERN: &str = r#"(^|[\s/\\"'])hookscribe(\.exe)?($|[\s"'])"#;

/// One (event type, matcher, command) triple
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct HookBinding {
    pub event_type: String,
    pub matcher: Option<String>,
    pub command: String,
}

impl HookBinding {
    pub fn new(event_type: &str, matcher: Option<&str>, command: &str) -> Self {
        Self {
            event_type: event_type.to_string(),
            matcher: matcher.map(str::to_string),
            command: command.to_string(),
        }
    }
}

impl fmt::Display for HookBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.matcher {
            Some(matcher) => write!(f, "{} [{}] {}", self.event_type, matcher, self.command),
            None => write!(f, "{} {}", self.event_type, self.command),
        }
    }
}

/// Why an existing binding was flagged during install
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapKind {
    /// The requested command is already bound under another matcher
    SameCommandOtherMatcher,
    /// A different command we own is bound under the same matcher
    OtherOwnedCommand,
}

/// An existing binding that partially overlaps a requested one
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Overlap {
    pub kind: OverlapKind,
    pub existing: HookBinding,
    pub requested: HookBinding,
}

impl fmt::Display for Overlap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            OverlapKind::SameCommandOtherMatcher => write!(
                f,
                "{} is already bound with matcher {:?}",
                self.existing.command,
                self.existing.matcher.as_deref().unwrap_or("<none>")
            ),
            OverlapKind::OtherOwnedCommand => write!(
                f,
                "{} already has another owned command: {}",
                self.existing.event_type, self.existing.command
            ),
        }
    }
}

/// Regexes identifying commands this tool owns
#[derive(Debug, Clone)]
pub struct OwnershipPatterns {
    patterns: Vec<Regex>,
}

impl Default for OwnershipPatterns {
    fn default() -> Self {
        Self {
            patterns: Regex::new(DEFAULT_OWNERSHIP_PATTERN).into_iter().collect(),
        }
    }
}

impl OwnershipPatterns {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, ReconcileError> {
        let patterns = patterns
            .iter()
            .map(|p| {
                Regex::new(p.as_ref()).map_err(|source| ReconcileError::Pattern {
                    pattern: p.as_ref().to_string(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    pub fn matches(&self, command: &str) -> bool {
        self.patterns.iter().any(|re| re.is_match(command))
    }
}

/// Location and expectation of a shape violation
#[derive(Debug)]
pub(crate) struct ShapeError {
    pub pointer: String,
    pub expected: &'static str,
}

impl ShapeError {
    fn at(pointer: String, expected: &'static str) -> Self {
        Self { pointer, expected }
    }
}

fn escape_pointer(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

/// Check the `hooks` subtree against the shape the runtime expects
pub(crate) fn validate(root: &Map<String, Value>) -> Result<(), ShapeError> {
    let Some(hooks) = root.get(HOOKS_KEY) else {
        return Ok(());
    };
    let hooks = hooks
        .as_object()
        .ok_or_else(|| ShapeError::at("/hooks".into(), "an object"))?;

    for (event, groups) in hooks {
        let event_ptr = format!("/hooks/{}", escape_pointer(event));
        let groups = groups
            .as_array()
            .ok_or_else(|| ShapeError::at(event_ptr.clone(), "an array of matcher groups"))?;

        for (i, group) in groups.iter().enumerate() {
            let group_ptr = format!("{event_ptr}/{i}");
            let group = group
                .as_object()
                .ok_or_else(|| ShapeError::at(group_ptr.clone(), "a matcher group object"))?;

            match group.get(MATCHER_KEY) {
                None | Some(Value::Null) | Some(Value::String(_)) => {}
                Some(_) => {
                    return Err(ShapeError::at(
                        format!("{group_ptr}/matcher"),
                        "a string matcher",
                    ))
                }
            }
            if let Some(entries) = group.get(HOOKS_KEY) {
                if !entries.is_array() {
                    return Err(ShapeError::at(
                        format!("{group_ptr}/hooks"),
                        "an array of hook entries",
                    ));
                }
            }
        }
    }
    Ok(())
}

/// `None` for an absent, null or empty matcher
pub(crate) fn normalize_matcher(matcher: Option<&str>) -> Option<&str> {
    matcher.filter(|m| !m.is_empty())
}

fn group_matcher(group: &Value) -> Option<&str> {
    normalize_matcher(group.get(MATCHER_KEY).and_then(Value::as_str))
}

fn entry_command(entry: &Value) -> Option<&str> {
    entry.get(COMMAND_KEY).and_then(Value::as_str)
}

fn group_commands(group: &Value) -> impl Iterator<Item = &str> {
    group
        .get(HOOKS_KEY)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(entry_command)
}

/// Every binding in the document, in document order
pub(crate) fn list_bindings(root: &Map<String, Value>) -> Vec<HookBinding> {
    let Some(hooks) = root.get(HOOKS_KEY).and_then(Value::as_object) else {
        return Vec::new();
    };

    let mut bindings = Vec::new();
    for (event, groups) in hooks {
        for group in groups.as_array().into_iter().flatten() {
            let matcher = group_matcher(group);
            for command in group_commands(group) {
                bindings.push(HookBinding::new(event, matcher, command));
            }
        }
    }
    bindings
}

/// Result of merging one requested binding
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Merge {
    Added,
    AlreadyPresent,
}

/// Ensure `binding` exists, inserting at the shallowest missing level
///
/// Overlapping bindings found on the way are appended to `overlaps`. The
/// document must have passed [`validate`].
pub(crate) fn merge_binding(
    root: &mut Map<String, Value>,
    binding: &HookBinding,
    ownership: &OwnershipPatterns,
    overlaps: &mut Vec<Overlap>,
) -> Result<Merge, ShapeError> {
    let event = binding.event_type.as_str();
    let matcher = binding.matcher.as_deref();
    let command = binding.command.as_str();

    let existing: &[Value] = root
        .get(HOOKS_KEY)
        .and_then(|hooks| hooks.get(event))
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[]);

    let present = existing
        .iter()
        .any(|g| group_matcher(g) == matcher && group_commands(g).any(|c| c == command));
    if present {
        return Ok(Merge::AlreadyPresent);
    }

    for group in existing {
        let existing_matcher = group_matcher(group);
        for other in group_commands(group) {
            let kind = if other == command {
                OverlapKind::SameCommandOtherMatcher
            } else if existing_matcher == matcher && ownership.matches(other) {
                OverlapKind::OtherOwnedCommand
            } else {
                continue;
            };
            overlaps.push(Overlap {
                kind,
                existing: HookBinding::new(event, existing_matcher, other),
                requested: binding.clone(),
            });
        }
    }

    let target = existing.iter().position(|g| group_matcher(g) == matcher);
    let entry = json!({ "type": "command", "command": command });

    let hooks = root
        .entry(HOOKS_KEY)
        .or_insert_with(|| Value::Object(Map::new()))
        .as_object_mut()
        .ok_or_else(|| ShapeError::at("/hooks".into(), "an object"))?;
    let event_ptr = format!("/hooks/{}", escape_pointer(event));
    let groups = hooks
        .entry(event)
        .or_insert_with(|| Value::Array(Vec::new()))
        .as_array_mut()
        .ok_or_else(|| ShapeError::at(event_ptr.clone(), "an array of matcher groups"))?;

    match target {
        Some(index) => {
            let group_ptr = format!("{event_ptr}/{index}");
            let entries = groups
                .get_mut(index)
                .and_then(Value::as_object_mut)
                .ok_or_else(|| ShapeError::at(group_ptr.clone(), "a matcher group object"))?
                .entry(HOOKS_KEY)
                .or_insert_with(|| Value::Array(Vec::new()))
                .as_array_mut()
                .ok_or_else(|| ShapeError::at(format!("{group_ptr}/hooks"), "an array of hook entries"))?;
            entries.push(entry);
        }
        None => {
            let mut group = Map::new();
            if let Some(matcher) = matcher {
                group.insert(MATCHER_KEY.to_string(), Value::String(matcher.to_string()));
            }
            group.insert(HOOKS_KEY.to_string(), Value::Array(vec![entry]));
            groups.push(Value::Object(group));
        }
    }
    Ok(Merge::Added)
}

/// Remove every owned binding, pruning containers emptied by the removal
pub(crate) fn remove_owned(
    root: &mut Map<String, Value>,
    ownership: &OwnershipPatterns,
) -> Vec<HookBinding> {
    let mut removed = Vec::new();

    let prune_hooks = {
        let Some(hooks) = root.get_mut(HOOKS_KEY).and_then(Value::as_object_mut) else {
            return removed;
        };

        let mut emptied_events = Vec::new();
        for (event, groups) in hooks.iter_mut() {
            let Some(groups) = groups.as_array_mut() else {
                continue;
            };
            let before = removed.len();

            groups.retain_mut(|group| {
                let matcher = group_matcher(group).map(str::to_string);
                let Some(entries) = group.get_mut(HOOKS_KEY).and_then(Value::as_array_mut) else {
                    return true;
                };
                let had = entries.len();
                entries.retain(|entry| match entry_command(entry) {
                    Some(command) if ownership.matches(command) => {
                        removed.push(HookBinding::new(event, matcher.as_deref(), command));
                        false
                    }
                    _ => true,
                });
                !(entries.len() < had && entries.is_empty())
            });

            if removed.len() > before && groups.is_empty() {
                emptied_events.push(event.clone());
            }
        }

        for event in &emptied_events {
            hooks.shift_remove(event);
        }
        !emptied_events.is_empty() && hooks.is_empty()
    };

    if prune_hooks {
        root.shift_remove(HOOKS_KEY);
    }
    removed
}

/// Replace the whole `hooks` value with an empty object
///
/// Returns the bindings that were present and whether anything changed.
pub(crate) fn reset_hooks(root: &mut Map<String, Value>) -> (Vec<HookBinding>, bool) {
    let removed = list_bindings(root);
    match root.get_mut(HOOKS_KEY) {
        None => (removed, false),
        Some(Value::Object(map)) if map.is_empty() => (removed, false),
        Some(hooks) => {
            *hooks = Value::Object(Map::new());
            (removed, true)
        }
    }
}
