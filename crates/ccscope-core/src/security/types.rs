//! Security scan types: severity levels, statuses, findings, and scan results.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::scope::Scope;

/// Severity level of a finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Fixed severity → status mapping
    pub fn status(self) -> SkillStatus {
        match self {
            Severity::Critical | Severity::High => SkillStatus::Danger,
            Severity::Medium => SkillStatus::Warning,
            Severity::Low => SkillStatus::Info,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Low => write!(f, "LOW"),
            Severity::Medium => write!(f, "MEDIUM"),
            Severity::High => write!(f, "HIGH"),
            Severity::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// Rolled-up status of one scanned entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillStatus {
    Clean,
    Info,
    Warning,
    Danger,
}

impl fmt::Display for SkillStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkillStatus::Clean => write!(f, "clean"),
            SkillStatus::Info => write!(f, "info"),
            SkillStatus::Warning => write!(f, "warning"),
            SkillStatus::Danger => write!(f, "danger"),
        }
    }
}

/// Where a scanned entry came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Slash command (`commands/*.md`)
    Command,
    /// Skill (`skills/<name>/SKILL.md`)
    Skill,
    /// Command or skill shipped by an installed plugin
    Plugin,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Command => write!(f, "command"),
            SourceKind::Skill => write!(f, "skill"),
            SourceKind::Plugin => write!(f, "plugin"),
        }
    }
}

/// Text to scan
#[derive(Debug, Clone)]
pub struct SkillInput {
    pub name: String,
    pub path: PathBuf,
    pub scope: Scope,
    pub source_kind: Option<SourceKind>,
    pub content: String,
}

/// One rule match
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillFinding {
    /// Rule identifier (e.g., "SKILL-001")
    pub rule_id: String,
    pub severity: Severity,
    pub message: String,
    /// 1-based line number (line-mode rules only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    /// Bounded excerpt of the matched text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}

/// Findings and status for one skill/command
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillScanEntry {
    pub name: String,
    pub path: PathBuf,
    pub scope: Scope,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_kind: Option<SourceKind>,
    pub findings: Vec<SkillFinding>,
    pub status: SkillStatus,
}

impl SkillScanEntry {
    /// Highest severity found, if any
    pub fn max_severity(&self) -> Option<Severity> {
        self.findings.iter().map(|f| f.severity).max()
    }
}

/// Entry counts per status bucket
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanSummary {
    pub total: usize,
    pub clean: usize,
    pub info: usize,
    pub warning: usize,
    pub danger: usize,
}

impl ScanSummary {
    pub fn from_entries(entries: &[SkillScanEntry]) -> Self {
        let mut summary = Self {
            total: entries.len(),
            ..Self::default()
        };
        for entry in entries {
            match entry.status {
                SkillStatus::Clean => summary.clean += 1,
                SkillStatus::Info => summary.info += 1,
                SkillStatus::Warning => summary.warning += 1,
                SkillStatus::Danger => summary.danger += 1,
            }
        }
        summary
    }

    /// Process exit status: 2 if any danger, 1 if any warning, else 0
    pub fn exit_code(&self) -> i32 {
        if self.danger > 0 {
            2
        } else if self.warning > 0 {
            1
        } else {
            0
        }
    }
}

/// Result of scanning a batch
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillScanResult {
    pub entries: Vec<SkillScanEntry>,
    pub summary: ScanSummary,
    pub scanned_at: chrono::DateTime<chrono::Utc>,
}
