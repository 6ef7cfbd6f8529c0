//! Settings resolver: merges flat top-level settings across scopes.
//!
//! Only top-level keys are merged. A nested object present in two scopes is
//! replaced wholesale by the higher-precedence one.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::fragment::{collect_load_issues, ConfigFragment, FileType, FragmentIssue};
use crate::scope::Scope;

/// One settings file's top-level mapping
#[derive(Debug, Clone)]
pub struct SettingsInput {
    pub scope: Scope,
    pub path: PathBuf,
    pub settings: Map<String, Value>,
}

/// One occurrence of a key in one scope
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverrideEntry {
    pub scope: Scope,
    pub source_path: PathBuf,
    pub value: Value,
}

/// Effective value of one key plus its full override chain
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedSetting {
    pub key: String,
    pub effective_value: Value,
    pub effective_scope: Scope,
    pub effective_source_path: PathBuf,
    /// Every occurrence, highest precedence first
    pub overrides: Vec<OverrideEntry>,
}

/// Output of the settings resolver
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsResult {
    /// Sorted by key (byte order)
    pub settings: Vec<ResolvedSetting>,
    pub errors: Vec<FragmentIssue>,
}

impl SettingsResult {
    /// Look up one resolved key
    pub fn get(&self, key: &str) -> Option<&ResolvedSetting> {
        self.settings
            .binary_search_by(|s| s.key.as_str().cmp(key))
            .ok()
            .map(|i| &self.settings[i])
    }
}

/// Extract usable settings inputs from fragments.
///
/// A settings file whose root is not an object is excluded and reported.
pub fn settings_inputs(fragments: &[ConfigFragment]) -> (Vec<SettingsInput>, Vec<FragmentIssue>) {
    let mut errors = collect_load_issues(fragments, &[FileType::Settings]);
    let mut inputs = Vec::new();

    for fragment in fragments
        .iter()
        .filter(|f| f.file_type == FileType::Settings && f.is_usable())
    {
        match fragment.json_object() {
            Some(map) => inputs.push(SettingsInput {
                scope: fragment.scope,
                path: fragment.path.clone(),
                settings: map.clone(),
            }),
            None => {
                tracing::warn!(path = %fragment.path.display(), "Settings root is not an object");
                errors.push(fragment.issue("settings root is not a JSON object"));
            }
        }
    }

    (inputs, errors)
}

/// Merge settings inputs into one effective mapping
pub fn resolve_settings(inputs: &[SettingsInput]) -> Vec<ResolvedSetting> {
    let mut by_key: BTreeMap<&str, Vec<OverrideEntry>> = BTreeMap::new();

    for input in inputs {
        for (key, value) in &input.settings {
            by_key.entry(key.as_str()).or_default().push(OverrideEntry {
                scope: input.scope,
                source_path: input.path.clone(),
                value: value.clone(),
            });
        }
    }

    by_key
        .into_iter()
        .filter_map(|(key, mut overrides)| {
            // Stable: equal scopes keep discovery order
            overrides.sort_by(|a, b| Scope::compare(a.scope, b.scope));
            let winner = overrides.first()?.clone();
            Some(ResolvedSetting {
                key: key.to_string(),
                effective_value: winner.value,
                effective_scope: winner.scope,
                effective_source_path: winner.source_path,
                overrides,
            })
        })
        .collect()
}

/// Resolve settings straight from a fragment snapshot
pub fn resolve_from_fragments(fragments: &[ConfigFragment]) -> SettingsResult {
    let (inputs, errors) = settings_inputs(fragments);
    let settings = resolve_settings(&inputs);
    tracing::debug!(
        files = inputs.len(),
        keys = settings.len(),
        errors = errors.len(),
        "Resolved settings"
    );
    SettingsResult { settings, errors }
}
