//! SkillScanner: runs the rule registry over skill/command text.
//!
//! Purely a classifier: content is never modified or blocked.

use super::rules::{RuleMode, SkillRule, RULES};
use super::types::{ScanSummary, SkillFinding, SkillInput, SkillScanEntry, SkillScanResult, SkillStatus};

/// Default bound on snippet length, in characters
pub const DEFAULT_SNIPPET_CHARS: usize = 120;

/// Scans skill and command content for risky patterns
#[derive(Debug, Clone)]
pub struct SkillScanner {
    snippet_max_chars: usize,
}

impl Default for SkillScanner {
    fn default() -> Self {
        Self::new(DEFAULT_SNIPPET_CHARS)
    }
}

impl SkillScanner {
    pub fn new(snippet_max_chars: usize) -> Self {
        Self {
            snippet_max_chars: snippet_max_chars.max(1),
        }
    }

    /// Scan a batch and summarize statuses
    pub fn scan(&self, inputs: &[SkillInput]) -> SkillScanResult {
        let entries: Vec<SkillScanEntry> = inputs.iter().map(|i| self.scan_entry(i)).collect();
        let summary = ScanSummary::from_entries(&entries);
        tracing::debug!(
            total = summary.total,
            danger = summary.danger,
            warning = summary.warning,
            "Skill scan complete"
        );

        SkillScanResult {
            entries,
            summary,
            scanned_at: chrono::Utc::now(),
        }
    }

    /// Scan one entry against every rule
    pub fn scan_entry(&self, input: &SkillInput) -> SkillScanEntry {
        let mut findings = Vec::new();
        for rule in RULES.iter() {
            self.apply_rule(rule, &input.content, &mut findings);
        }

        let status = findings
            .iter()
            .map(|f| f.severity)
            .max()
            .map_or(SkillStatus::Clean, |s| s.status());

        if !findings.is_empty() {
            tracing::debug!(name = %input.name, findings = findings.len(), status = %status, "Findings in skill");
        }

        SkillScanEntry {
            name: input.name.clone(),
            path: input.path.clone(),
            scope: input.scope,
            source_kind: input.source_kind,
            findings,
            status,
        }
    }

    fn apply_rule(&self, rule: &SkillRule, content: &str, findings: &mut Vec<SkillFinding>) {
        match rule.mode {
            RuleMode::Line => {
                for (idx, line) in content.lines().enumerate() {
                    if rule.pattern.is_match(line) {
                        findings.push(self.finding(rule, Some(idx + 1), line));
                    }
                }
            }
            RuleMode::Content => {
                for m in rule.pattern.find_iter(content) {
                    findings.push(self.finding(rule, None, m.as_str()));
                }
            }
        }
    }

    fn finding(&self, rule: &SkillRule, line: Option<usize>, text: &str) -> SkillFinding {
        SkillFinding {
            rule_id: rule.id.to_string(),
            severity: rule.severity,
            message: rule.message.to_string(),
            line,
            snippet: Some(self.snippet(text)),
        }
    }

    /// Collapse whitespace and cut to the configured length
    fn snippet(&self, text: &str) -> String {
        let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
        if collapsed.chars().count() <= self.snippet_max_chars {
            return collapsed;
        }
        let mut cut: String = collapsed.chars().take(self.snippet_max_chars - 1).collect();
        cut.push('…');
        cut
    }
}
