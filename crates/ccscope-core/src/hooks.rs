//! Hooks resolver: aggregates event-bound hook matchers.
//!
//! Hooks are additive: a project hook does not replace a user hook for the
//! same event, both run. Nothing is merged; every binding is reported.

use std::collections::BTreeSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::fragment::{collect_load_issues, ConfigFragment, FileType, FragmentIssue};
use crate::scope::Scope;

/// Known hook events, in catalog order
pub const HOOK_EVENTS: &[&str] = &[
    "PreToolUse",
    "PostToolUse",
    "Notification",
    "UserPromptSubmit",
    "Stop",
    "SubagentStop",
    "PreCompact",
    "SessionStart",
    "SessionEnd",
];

fn default_hook_type() -> String {
    "command".to_string()
}

/// A single hook action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookCommand {
    #[serde(rename = "type", default = "default_hook_type")]
    pub hook_type: String,
    #[serde(default)]
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    #[serde(rename = "async", default, skip_serializing_if = "Option::is_none")]
    pub is_async: Option<bool>,
}

/// Hooks bound to an optional tool matcher
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookMatcher {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matcher: Option<String>,
    #[serde(default)]
    pub hooks: Vec<HookCommand>,
}

/// All matchers for one event from one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HookEvent {
    pub event: String,
    pub matchers: Vec<HookMatcher>,
    pub scope: Scope,
    pub source_path: PathBuf,
}

/// Output of the hooks resolver
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HooksResult {
    pub hooks: Vec<HookEvent>,
    /// Catalog events with bindings (catalog order), then unknown events (sorted)
    pub configured_events: Vec<String>,
    /// Catalog events without bindings, catalog order
    pub unconfigured_events: Vec<String>,
    pub errors: Vec<FragmentIssue>,
}

impl HooksResult {
    /// Total number of hook commands across all bindings
    pub fn command_count(&self) -> usize {
        self.hooks
            .iter()
            .flat_map(|h| &h.matchers)
            .map(|m| m.hooks.len())
            .sum()
    }
}

/// Collect hook bindings from settings and hooks fragments
pub fn resolve_from_fragments(fragments: &[ConfigFragment]) -> HooksResult {
    let types = [FileType::Settings, FileType::Hooks];
    let mut errors = collect_load_issues(fragments, &types);
    let mut hooks = Vec::new();

    for fragment in fragments
        .iter()
        .filter(|f| types.contains(&f.file_type) && f.is_usable())
    {
        let Some(root) = fragment.json_object() else {
            errors.push(fragment.issue("hooks config root is not a JSON object"));
            continue;
        };

        let block = match (fragment.file_type, root.get("hooks")) {
            (_, Some(block)) => block,
            (FileType::Hooks, None) => fragment.json_value().unwrap_or(&Value::Null),
            (_, None) => continue,
        };
        let Some(events) = block.as_object() else {
            errors.push(fragment.issue("\"hooks\" is not an object"));
            continue;
        };

        for (event, matchers) in events {
            match serde_json::from_value::<Vec<HookMatcher>>(matchers.clone()) {
                Ok(matchers) => hooks.push(HookEvent {
                    event: event.clone(),
                    matchers,
                    scope: fragment.scope,
                    source_path: fragment.path.clone(),
                }),
                Err(e) => errors.push(fragment.issue(format!("invalid hooks for {event}: {e}"))),
            }
        }
    }

    let present: BTreeSet<&str> = hooks.iter().map(|h| h.event.as_str()).collect();
    let mut configured_events: Vec<String> = HOOK_EVENTS
        .iter()
        .filter(|e| present.contains(*e))
        .map(|e| e.to_string())
        .collect();
    configured_events.extend(
        present
            .iter()
            .filter(|e| !HOOK_EVENTS.contains(e))
            .map(|e| e.to_string()),
    );
    let unconfigured_events = HOOK_EVENTS
        .iter()
        .filter(|e| !present.contains(*e))
        .map(|e| e.to_string())
        .collect();

    tracing::debug!(
        bindings = hooks.len(),
        configured = configured_events.len(),
        "Resolved hooks"
    );

    HooksResult {
        hooks,
        configured_events,
        unconfigured_events,
        errors,
    }
}
