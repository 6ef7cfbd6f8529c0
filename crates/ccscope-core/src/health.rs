//! Health scorer: weighted checks over discovery facts and resolver outputs.
//!
//! Category score is the passed share of the category's check weight. The
//! overall score averages category scores weighted by each category's total
//! check weight.

use std::fmt;
use std::path::Path;

use serde::Serialize;

use crate::fragment::{ConfigFragment, FileType};
use crate::hooks::HooksResult;
use crate::mcp::McpResult;
use crate::memory::MemoryResult;
use crate::permissions::{PermissionRule, PermissionsResult};
use crate::scope::Scope;
use crate::security::SkillScanResult;
use crate::settings::SettingsResult;

/// Check category, in declaration order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthCategory {
    Settings,
    Memory,
    Permissions,
    Mcp,
    Hooks,
    Security,
}

impl HealthCategory {
    pub const ALL: [HealthCategory; 6] = [
        HealthCategory::Settings,
        HealthCategory::Memory,
        HealthCategory::Permissions,
        HealthCategory::Mcp,
        HealthCategory::Hooks,
        HealthCategory::Security,
    ];
}

impl fmt::Display for HealthCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthCategory::Settings => write!(f, "Settings"),
            HealthCategory::Memory => write!(f, "Memory"),
            HealthCategory::Permissions => write!(f, "Permissions"),
            HealthCategory::Mcp => write!(f, "MCP"),
            HealthCategory::Hooks => write!(f, "Hooks"),
            HealthCategory::Security => write!(f, "Security"),
        }
    }
}

/// Letter grade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    /// Fixed cut points: A≥90, B≥75, C≥60, D≥40, else F
    pub fn from_score(score: u32) -> Self {
        match score {
            90.. => Grade::A,
            75..=89 => Grade::B,
            60..=74 => Grade::C,
            40..=59 => Grade::D,
            _ => Grade::F,
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// One pass/fail check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheck {
    pub id: String,
    pub category: HealthCategory,
    pub description: String,
    pub passed: bool,
    pub weight: u32,
    pub recommendation: String,
}

impl HealthCheck {
    pub fn new(
        id: &str,
        category: HealthCategory,
        weight: u32,
        passed: bool,
        description: &str,
        recommendation: &str,
    ) -> Self {
        Self {
            id: id.to_string(),
            category,
            description: description.to_string(),
            passed,
            weight,
            recommendation: recommendation.to_string(),
        }
    }
}

/// Score of one category
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryScore {
    pub category: HealthCategory,
    pub score: u32,
    pub passed_weight: u32,
    pub total_weight: u32,
}

/// Full health report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub score: u32,
    pub grade: Grade,
    pub categories: Vec<CategoryScore>,
    pub checks: Vec<HealthCheck>,
    /// Recommendation of every failed check, heaviest first
    pub recommendations: Vec<String>,
}

/// Facts the checks are computed from; resolver outputs are optional
#[derive(Debug, Clone, Copy, Default)]
pub struct HealthInput<'a> {
    pub fragments: &'a [ConfigFragment],
    pub has_project: bool,
    pub settings: Option<&'a SettingsResult>,
    pub permissions: Option<&'a PermissionsResult>,
    pub mcp: Option<&'a McpResult>,
    pub hooks: Option<&'a HooksResult>,
    pub memory: Option<&'a MemoryResult>,
    pub skills: Option<&'a SkillScanResult>,
}

impl HealthInput<'_> {
    fn exists(&self, scope: Scope, file_type: FileType) -> bool {
        self.fragments
            .iter()
            .any(|f| f.scope == scope && f.file_type == file_type && f.exists)
    }

    fn broken_fragments(&self, file_type: FileType) -> usize {
        self.fragments
            .iter()
            .filter(|f| f.file_type == file_type && f.error.is_some())
            .count()
    }
}

/// Build the fixed check catalog for the given facts
pub fn build_checks(input: &HealthInput<'_>) -> Vec<HealthCheck> {
    use HealthCategory as C;
    let mut checks = Vec::new();

    checks.push(HealthCheck::new(
        "settings.user",
        C::Settings,
        2,
        input.exists(Scope::User, FileType::Settings),
        "User settings file present",
        "Create ~/.claude/settings.json to pin your personal defaults",
    ));
    if input.has_project {
        checks.push(HealthCheck::new(
            "settings.project",
            C::Settings,
            2,
            input.exists(Scope::Project, FileType::Settings),
            "Project settings file present",
            "Add .claude/settings.json so the team shares one project configuration",
        ));
    }
    let settings_errors = match input.settings {
        Some(result) => result.errors.len(),
        None => input.broken_fragments(FileType::Settings),
    };
    checks.push(HealthCheck::new(
        "settings.valid",
        C::Settings,
        3,
        settings_errors == 0,
        "All settings files parse",
        "Fix malformed settings files; they are ignored until they parse",
    ));

    checks.push(HealthCheck::new(
        "memory.user",
        C::Memory,
        1,
        input.exists(Scope::User, FileType::ClaudeMd),
        "User memory file present",
        "Create ~/.claude/CLAUDE.md for instructions that apply to every project",
    ));
    if input.has_project {
        checks.push(HealthCheck::new(
            "memory.project",
            C::Memory,
            3,
            input.exists(Scope::Project, FileType::ClaudeMd),
            "Project memory file present",
            "Add a CLAUDE.md describing the project's build, test and style conventions",
        ));
    }
    if let Some(memory) = input.memory {
        checks.push(HealthCheck::new(
            "memory.imports",
            C::Memory,
            2,
            memory.total_broken == 0,
            "All memory imports resolve",
            "Remove or fix @imports that point at missing files",
        ));
        checks.push(HealthCheck::new(
            "memory.acyclic",
            C::Memory,
            2,
            memory.files.iter().all(|f| !f.has_circular),
            "No circular memory imports",
            "Break circular @import chains between memory files",
        ));
    }

    if let Some(permissions) = input.permissions {
        checks.push(HealthCheck::new(
            "permissions.deny",
            C::Permissions,
            3,
            permissions
                .effective
                .iter()
                .any(|p| p.effective_rule == PermissionRule::Deny),
            "At least one deny rule",
            "Add deny rules for destructive commands and secret files",
        ));
        let unrestricted_bash = permissions.effective.iter().any(|p| {
            p.tool == "Bash"
                && p.effective_rule == PermissionRule::Allow
                && matches!(p.pattern.as_deref(), None | Some("*") | Some(":*"))
        });
        checks.push(HealthCheck::new(
            "permissions.bash-scoped",
            C::Permissions,
            3,
            !unrestricted_bash,
            "Bash is not allowed without a pattern",
            "Replace the blanket Bash allow rule with command-specific patterns",
        ));
        checks.push(HealthCheck::new(
            "permissions.valid",
            C::Permissions,
            1,
            permissions.errors.is_empty(),
            "All permission rules parse",
            "Fix malformed permission rules",
        ));
    }

    if let Some(mcp) = input.mcp {
        checks.push(HealthCheck::new(
            "mcp.unique",
            C::Mcp,
            2,
            mcp.duplicates.is_empty(),
            "MCP server names are unique across files",
            "Rename or remove MCP servers defined in more than one file",
        ));
        checks.push(HealthCheck::new(
            "mcp.valid",
            C::Mcp,
            2,
            mcp.errors.is_empty(),
            "All MCP server definitions are well-formed",
            "Give every MCP server either a command or a url",
        ));
    }

    if let Some(hooks) = input.hooks {
        checks.push(HealthCheck::new(
            "hooks.configured",
            C::Hooks,
            1,
            !hooks.configured_events.is_empty(),
            "At least one hook configured",
            "Consider hooks (e.g. PostToolUse formatters) to automate checks",
        ));
        let empty_commands = hooks
            .hooks
            .iter()
            .flat_map(|h| &h.matchers)
            .flat_map(|m| &m.hooks)
            .any(|c| c.hook_type == "command" && c.command.trim().is_empty());
        checks.push(HealthCheck::new(
            "hooks.commands",
            C::Hooks,
            1,
            !empty_commands && hooks.errors.is_empty(),
            "Every hook has a command",
            "Fix hooks with empty commands or malformed matcher lists",
        ));
    }

    if let Some(skills) = input.skills {
        checks.push(HealthCheck::new(
            "security.no-danger",
            C::Security,
            4,
            skills.summary.danger == 0,
            "No dangerous skills or commands",
            "Review skills and commands flagged as danger by `scan`",
        ));
        checks.push(HealthCheck::new(
            "security.no-warning",
            C::Security,
            2,
            skills.summary.warning == 0,
            "No skills or commands with warnings",
            "Review skills and commands flagged as warning by `scan`",
        ));
    }
    if let Some(creds) = input
        .fragments
        .iter()
        .find(|f| f.file_type == FileType::Credentials && f.exists)
    {
        checks.push(HealthCheck::new(
            "security.credentials-private",
            C::Security,
            3,
            is_private_file(&creds.path),
            "Credentials file is readable by owner only",
            "Restrict the credentials file: chmod 600 ~/.claude/.credentials.json",
        ));
    }

    checks
}

/// Whether group/other have no access (unix only)
#[cfg(unix)]
fn is_private_file(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    match std::fs::metadata(path) {
        Ok(meta) => meta.permissions().mode() & 0o077 == 0,
        Err(_) => false,
    }
}

#[cfg(not(unix))]
fn is_private_file(_path: &Path) -> bool {
    // File mode checks are not available on non-Unix platforms
    true
}

fn percent(passed: u32, total: u32) -> u32 {
    if total == 0 {
        return 100;
    }
    let raw = (100.0 * f64::from(passed) / f64::from(total)).round();
    raw.clamp(0.0, 100.0) as u32
}

/// Score a set of checks
pub fn score(checks: Vec<HealthCheck>) -> HealthReport {
    let categories: Vec<CategoryScore> = HealthCategory::ALL
        .iter()
        .filter_map(|&category| {
            let in_cat = checks.iter().filter(|c| c.category == category);
            let total_weight: u32 = in_cat.clone().map(|c| c.weight).sum();
            if total_weight == 0 {
                return None;
            }
            let passed_weight: u32 = in_cat.filter(|c| c.passed).map(|c| c.weight).sum();
            Some(CategoryScore {
                category,
                score: percent(passed_weight, total_weight),
                passed_weight,
                total_weight,
            })
        })
        .collect();

    let weight_sum: u32 = categories.iter().map(|c| c.total_weight).sum();
    let score = if weight_sum == 0 {
        100
    } else {
        let weighted: f64 = categories
            .iter()
            .map(|c| f64::from(c.score) * f64::from(c.total_weight))
            .sum();
        (weighted / f64::from(weight_sum)).round().clamp(0.0, 100.0) as u32
    };

    let mut failed: Vec<&HealthCheck> = checks.iter().filter(|c| !c.passed).collect();
    failed.sort_by(|a, b| b.weight.cmp(&a.weight).then(a.category.cmp(&b.category)));
    let recommendations = failed.iter().map(|c| c.recommendation.clone()).collect();

    HealthReport {
        score,
        grade: Grade::from_score(score),
        categories,
        checks,
        recommendations,
    }
}

/// Build checks and score them
pub fn evaluate(input: &HealthInput<'_>) -> HealthReport {
    let report = score(build_checks(input));
    tracing::debug!(score = report.score, grade = %report.grade, "Health evaluated");
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn check(id: &str, category: HealthCategory, weight: u32, passed: bool, rec: &str) -> HealthCheck {
        HealthCheck::new(id, category, weight, passed, id, rec)
    }

    #[test]
    fn test_grade_cut_points() {
        assert_eq!(Grade::from_score(100), Grade::A);
        assert_eq!(Grade::from_score(90), Grade::A);
        assert_eq!(Grade::from_score(89), Grade::B);
        assert_eq!(Grade::from_score(75), Grade::B);
        assert_eq!(Grade::from_score(60), Grade::C);
        assert_eq!(Grade::from_score(40), Grade::D);
        assert_eq!(Grade::from_score(39), Grade::F);
    }

    #[test]
    fn test_category_and_overall_weighting() {
        use HealthCategory as C;
        let report = score(vec![
            // settings: 3 of 4 → 75
            check("a", C::Settings, 3, true, "ra"),
            check("b", C::Settings, 1, false, "rb"),
            // mcp: 0 of 1 → 0
            check("c", C::Mcp, 1, false, "rc"),
        ]);

        assert_eq!(report.categories.len(), 2);
        assert_eq!(report.categories[0].score, 75);
        assert_eq!(report.categories[1].score, 0);
        // (75*4 + 0*1) / 5 = 60
        assert_eq!(report.score, 60);
        assert_eq!(report.grade, Grade::C);
    }

    #[test]
    fn test_rounding() {
        use HealthCategory as C;
        let report = score(vec![
            check("a", C::Hooks, 2, true, "x"),
            check("b", C::Hooks, 1, false, "y"),
        ]);
        assert_eq!(report.categories[0].score, 67);
    }

    #[test]
    fn test_recommendation_order_and_duplicates() {
        use HealthCategory as C;
        let report = score(vec![
            check("a", C::Security, 2, false, "same"),
            check("b", C::Settings, 2, false, "settings"),
            check("c", C::Memory, 4, false, "memory"),
            check("d", C::Mcp, 2, false, "same"),
            check("e", C::Hooks, 5, true, "passed"),
        ]);
        assert_eq!(report.recommendations, vec!["memory", "settings", "same", "same"]);
    }

    #[test]
    fn test_no_checks_scores_full() {
        let report = score(vec![]);
        assert_eq!(report.score, 100);
        assert!(report.categories.is_empty());
    }

    #[test]
    fn test_build_checks_from_facts() {
        let fragments = vec![
            ConfigFragment::json(Scope::User, FileType::Settings, "/u", serde_json::json!({})),
            ConfigFragment::missing(Scope::Project, FileType::Settings, "/p"),
            ConfigFragment::missing(Scope::Project, FileType::ClaudeMd, "/p/CLAUDE.md"),
        ];
        let input = HealthInput {
            fragments: &fragments,
            has_project: true,
            ..HealthInput::default()
        };
        let checks = build_checks(&input);
        let by_id = |id: &str| checks.iter().find(|c| c.id == id).unwrap();
        assert!(by_id("settings.user").passed);
        assert!(!by_id("settings.project").passed);
        assert!(by_id("settings.valid").passed);
        assert!(!by_id("memory.project").passed);
        assert!(checks.iter().all(|c| c.category != HealthCategory::Mcp));
    }

    #[cfg(unix)]
    #[test]
    fn test_credentials_check_fails_when_unreadable_metadata() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::TempDir::new().unwrap();
        let creds = tmp.path().join(".credentials.json");
        std::fs::write(&creds, "{}").unwrap();
        std::fs::set_permissions(&creds, std::fs::Permissions::from_mode(0o600)).unwrap();

        let check_for = |path: &Path| {
            let mut fragment = ConfigFragment::missing(Scope::User, FileType::Credentials, path);
            fragment.exists = true;
            let fragments = vec![fragment];
            let checks = build_checks(&HealthInput {
                fragments: &fragments,
                ..HealthInput::default()
            });
            checks
                .into_iter()
                .find(|c| c.id == "security.credentials-private")
                .unwrap()
                .passed
        };

        assert!(check_for(&creds));
        assert!(!check_for(&tmp.path().join("vanished.json")));
    }
}
