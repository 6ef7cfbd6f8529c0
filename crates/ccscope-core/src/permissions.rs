//! Permission resolver: merges `permissions.allow|ask|deny` rule lists.
//!
//! Two independent orderings are in play. Rule strength (`deny > ask > allow`)
//! picks the effective rule for a `(tool, pattern)` group; scope precedence only
//! orders the override chain and attributes the source. They must never be
//! folded into a single sort key: a deny from any scope always wins.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use serde_json::Value;

use crate::fragment::{collect_load_issues, ConfigFragment, FileType, FragmentIssue};
use crate::scope::Scope;

/// Permission decision kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionRule {
    Allow,
    Ask,
    Deny,
}

impl PermissionRule {
    /// Settings array keys in the order they are read
    pub const KEYS: [(&'static str, PermissionRule); 3] = [
        ("allow", PermissionRule::Allow),
        ("ask", PermissionRule::Ask),
        ("deny", PermissionRule::Deny),
    ];

    /// Rule strength; the strongest rule in a group wins
    pub fn strength(self) -> u8 {
        match self {
            PermissionRule::Allow => 0,
            PermissionRule::Ask => 1,
            PermissionRule::Deny => 2,
        }
    }
}

impl fmt::Display for PermissionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PermissionRule::Allow => write!(f, "allow"),
            PermissionRule::Ask => write!(f, "ask"),
            PermissionRule::Deny => write!(f, "deny"),
        }
    }
}

/// One permission rule as written in one settings file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionEntry {
    pub tool: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    pub rule: PermissionRule,
    pub scope: Scope,
    pub source_path: PathBuf,
    pub raw: String,
}

/// Effective decision for one `(tool, pattern)` group
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectivePermission {
    pub tool: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    pub effective_rule: PermissionRule,
    pub effective_scope: Scope,
    pub effective_source_path: PathBuf,
    /// All entries of the group, highest scope precedence first
    pub overrides: Vec<PermissionEntry>,
}

/// Output of the permission resolver
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionsResult {
    /// Every entry in discovery order
    pub all: Vec<PermissionEntry>,
    /// One entry per group, sorted by tool then pattern
    pub effective: Vec<EffectivePermission>,
    pub errors: Vec<FragmentIssue>,
}

impl PermissionsResult {
    /// Keep only entries whose tool contains `needle` (case-insensitive).
    ///
    /// Applied identically to `all` and `effective`.
    pub fn filter_tool(mut self, needle: &str) -> Self {
        let needle = needle.to_lowercase();
        let keep = |tool: &str| tool.to_lowercase().contains(&needle);
        self.all.retain(|e| keep(&e.tool));
        self.effective.retain(|e| keep(&e.tool));
        self
    }

    /// Effective decision for a group, if present
    pub fn lookup(&self, tool: &str, pattern: Option<&str>) -> Option<&EffectivePermission> {
        self.effective
            .iter()
            .find(|e| e.tool == tool && e.pattern.as_deref() == pattern)
    }
}

/// Split a rule string into tool name and optional pattern.
///
/// `"Bash(ls:*)"` → `("Bash", Some("ls:*"))`, `"Read"` → `("Read", None)`.
pub fn parse_rule(raw: &str) -> Option<(String, Option<String>)> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let (Some(open), true) = (raw.find('('), raw.ends_with(')')) {
        let tool = raw[..open].trim();
        if tool.is_empty() {
            return None;
        }
        let inner = raw[open + 1..raw.len() - 1].trim();
        let pattern = (!inner.is_empty()).then(|| inner.to_string());
        return Some((tool.to_string(), pattern));
    }

    Some((raw.to_string(), None))
}

/// Flatten the permission arrays of every settings fragment
pub fn extract_entries(fragments: &[ConfigFragment]) -> (Vec<PermissionEntry>, Vec<FragmentIssue>) {
    let mut errors = collect_load_issues(fragments, &[FileType::Settings]);
    let mut entries = Vec::new();

    for fragment in fragments
        .iter()
        .filter(|f| f.file_type == FileType::Settings && f.is_usable())
    {
        let Some(root) = fragment.json_object() else {
            errors.push(fragment.issue("settings root is not a JSON object"));
            continue;
        };
        let permissions = match root.get("permissions") {
            None => continue,
            Some(Value::Object(map)) => map,
            Some(_) => {
                errors.push(fragment.issue("\"permissions\" is not an object"));
                continue;
            }
        };

        for (key, rule) in PermissionRule::KEYS {
            let list = match permissions.get(key) {
                None => continue,
                Some(Value::Array(list)) => list,
                Some(_) => {
                    errors.push(fragment.issue(format!("\"permissions.{key}\" is not an array")));
                    continue;
                }
            };

            for item in list {
                let parsed = item.as_str().and_then(|raw| parse_rule(raw).map(|p| (raw, p)));
                match parsed {
                    Some((raw, (tool, pattern))) => entries.push(PermissionEntry {
                        tool,
                        pattern,
                        rule,
                        scope: fragment.scope,
                        source_path: fragment.path.clone(),
                        raw: raw.to_string(),
                    }),
                    None => errors.push(
                        fragment.issue(format!("invalid permission rule in {key}: {item}")),
                    ),
                }
            }
        }
    }

    (entries, errors)
}

/// Group entries by `(tool, pattern)` and pick the effective rule per group
pub fn resolve_permissions(entries: &[PermissionEntry]) -> Vec<EffectivePermission> {
    // `None` orders before `Some`, so a bare tool sorts ahead of its patterns
    let mut groups: BTreeMap<(&str, Option<&str>), Vec<PermissionEntry>> = BTreeMap::new();
    for entry in entries {
        groups
            .entry((entry.tool.as_str(), entry.pattern.as_deref()))
            .or_default()
            .push(entry.clone());
    }

    groups
        .into_iter()
        .filter_map(|((tool, pattern), mut overrides)| {
            overrides.sort_by(|a, b| Scope::compare(a.scope, b.scope));

            let effective_rule = overrides.iter().map(|e| e.rule).max_by_key(|r| r.strength())?;
            let source = overrides.iter().find(|e| e.rule == effective_rule)?;

            Some(EffectivePermission {
                tool: tool.to_string(),
                pattern: pattern.map(str::to_string),
                effective_rule,
                effective_scope: source.scope,
                effective_source_path: source.source_path.clone(),
                overrides,
            })
        })
        .collect()
}

/// Resolve permissions straight from a fragment snapshot
pub fn resolve_from_fragments(fragments: &[ConfigFragment]) -> PermissionsResult {
    let (all, errors) = extract_entries(fragments);
    let effective = resolve_permissions(&all);
    tracing::debug!(
        entries = all.len(),
        groups = effective.len(),
        "Resolved permissions"
    );
    PermissionsResult {
        all,
        effective,
        errors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn entry(scope: Scope, rule: PermissionRule, raw: &str) -> PermissionEntry {
        let (tool, pattern) = parse_rule(raw).unwrap();
        PermissionEntry {
            tool,
            pattern,
            rule,
            scope,
            source_path: PathBuf::from(format!("/{scope}/settings.json")),
            raw: raw.to_string(),
        }
    }

    #[test]
    fn test_parse_rule() {
        assert_eq!(
            parse_rule("Bash(ls:*)"),
            Some(("Bash".to_string(), Some("ls:*".to_string())))
        );
        assert_eq!(parse_rule("Read"), Some(("Read".to_string(), None)));
        assert_eq!(parse_rule("  WebFetch(domain:x.com) "), Some(("WebFetch".to_string(), Some("domain:x.com".to_string()))));
        assert_eq!(parse_rule("Bash()"), Some(("Bash".to_string(), None)));
        assert_eq!(parse_rule(""), None);
        assert_eq!(parse_rule("(x)"), None);
    }

    #[test]
    fn test_user_deny_beats_project_allow() {
        let effective = resolve_permissions(&[
            entry(Scope::User, PermissionRule::Deny, "Bash(ls:*)"),
            entry(Scope::Project, PermissionRule::Allow, "Bash(ls:*)"),
        ]);
        assert_eq!(effective.len(), 1);
        assert_eq!(effective[0].effective_rule, PermissionRule::Deny);
        assert_eq!(effective[0].effective_scope, Scope::User);
        assert_eq!(
            effective[0].overrides.iter().map(|e| e.scope).collect::<Vec<_>>(),
            vec![Scope::Project, Scope::User]
        );
    }

    #[test]
    fn test_managed_deny_beats_local_allow() {
        let effective = resolve_permissions(&[
            entry(Scope::Local, PermissionRule::Allow, "WebFetch"),
            entry(Scope::Managed, PermissionRule::Deny, "WebFetch"),
        ]);
        assert_eq!(effective[0].effective_rule, PermissionRule::Deny);
        assert_eq!(effective[0].effective_scope, Scope::Managed);
    }

    #[test]
    fn test_ask_over_allow_regardless_of_scope() {
        let effective = resolve_permissions(&[
            entry(Scope::User, PermissionRule::Ask, "Edit"),
            entry(Scope::Local, PermissionRule::Allow, "Edit"),
        ]);
        assert_eq!(effective[0].effective_rule, PermissionRule::Ask);
        assert_eq!(effective[0].effective_scope, Scope::User);
    }

    #[test]
    fn test_attribution_prefers_highest_scope_with_winning_rule() {
        let effective = resolve_permissions(&[
            entry(Scope::User, PermissionRule::Deny, "Bash(rm:*)"),
            entry(Scope::Project, PermissionRule::Deny, "Bash(rm:*)"),
            entry(Scope::Local, PermissionRule::Allow, "Bash(rm:*)"),
        ]);
        assert_eq!(effective[0].effective_scope, Scope::Project);
    }

    #[test]
    fn test_bare_tool_is_separate_group_and_sorts_first() {
        let effective = resolve_permissions(&[
            entry(Scope::User, PermissionRule::Allow, "Bash(npm:*)"),
            entry(Scope::User, PermissionRule::Deny, "Bash"),
            entry(Scope::User, PermissionRule::Allow, "Bash(git:*)"),
            entry(Scope::User, PermissionRule::Allow, "Read"),
        ]);
        let keys: Vec<(String, Option<String>)> = effective
            .iter()
            .map(|e| (e.tool.clone(), e.pattern.clone()))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("Bash".to_string(), None),
                ("Bash".to_string(), Some("git:*".to_string())),
                ("Bash".to_string(), Some("npm:*".to_string())),
                ("Read".to_string(), None),
            ]
        );
        assert_eq!(effective[1].effective_rule, PermissionRule::Allow);
    }

    #[test]
    fn test_extract_and_filter() {
        let fragments = vec![
            ConfigFragment::json(
                Scope::User,
                FileType::Settings,
                "/u/settings.json",
                json!({"permissions": {"deny": ["Bash(ls:*)"], "allow": ["Read", 42]}}),
            ),
            ConfigFragment::json(
                Scope::Project,
                FileType::Settings,
                "/p/settings.json",
                json!({"permissions": {"allow": ["Bash(ls:*)", "WebFetch"]}}),
            ),
        ];

        let result = resolve_from_fragments(&fragments);
        assert_eq!(result.all.len(), 4);
        assert_eq!(result.errors.len(), 1);
        let ls = result.lookup("Bash", Some("ls:*")).unwrap();
        assert_eq!(ls.effective_rule, PermissionRule::Deny);
        assert_eq!(ls.effective_source_path, PathBuf::from("/u/settings.json"));

        let filtered = result.filter_tool("bAsH");
        assert_eq!(filtered.all.len(), 2);
        assert!(filtered.all.iter().all(|e| e.tool == "Bash"));
        assert_eq!(filtered.effective.len(), 1);
    }

    #[test]
    fn test_permissions_not_object_reported() {
        let fragments = vec![ConfigFragment::json(
            Scope::Local,
            FileType::Settings,
            "/l",
            json!({"permissions": ["Read"]}),
        )];
        let result = resolve_from_fragments(&fragments);
        assert!(result.all.is_empty());
        assert_eq!(result.errors.len(), 1);
    }
}
