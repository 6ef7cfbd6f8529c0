//! Command handlers: build one configuration snapshot, run a resolver over it,
//! render the result.

mod edit;
mod files;
mod health;
mod hooks;
mod mcp;
mod memory;
mod permissions;
mod scan;
mod settings;

use std::path::Path;

use anyhow::{Context as _, Result};
use ccscope_core::fragment::load_fragments;
use ccscope_core::security::{collect_skill_inputs, SkillScanResult, SkillScanner};
use ccscope_core::{ConfigFragment, ConfigPaths, FragmentIssue};

use crate::config::{Command, Config, Settings};
use crate::output::{OutputFormat, Table};

/// Rendered command output plus the process exit status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub text: String,
    pub exit_code: i32,
}

impl Outcome {
    fn ok(text: String) -> Self {
        Self { text, exit_code: 0 }
    }
}

/// One loaded configuration snapshot plus tool settings
pub struct Context {
    pub paths: ConfigPaths,
    pub fragments: Vec<ConfigFragment>,
    pub settings: Settings,
}

impl Context {
    /// Discover roots for `project` (global mode when `None`) and load every fragment
    pub async fn load(project: Option<&Path>, settings: Settings) -> Result<Self> {
        let mut paths = ConfigPaths::detect(project).context("Failed to locate configuration roots")?;
        if let Some(dir) = &settings.claude_home {
            paths = paths.claude_home(dir.clone());
        }
        if let Some(dir) = &settings.managed_dir {
            paths = paths.managed_dir(dir.clone());
        }
        Ok(Self::from_paths(paths, settings).await)
    }

    /// Load every fragment below already-resolved roots
    pub async fn from_paths(paths: ConfigPaths, settings: Settings) -> Self {
        let fragments = load_fragments(paths.locate()).await;
        tracing::debug!(
            fragments = fragments.len(),
            existing = fragments.iter().filter(|f| f.exists).count(),
            project = ?paths.project,
            "Loaded configuration snapshot"
        );
        Self {
            paths,
            fragments,
            settings,
        }
    }

    fn format(&self) -> OutputFormat {
        self.settings.output
    }

    /// Collect and scan every skill, command and plugin entry
    fn scan_skills(&self) -> SkillScanResult {
        let plugins_dir = self.paths.plugins_dir();
        let inputs = collect_skill_inputs(&self.fragments, Some(&plugins_dir));
        SkillScanner::new(self.settings.snippet_max_chars).scan(&inputs)
    }
}

/// Run the selected subcommand
pub async fn run(cli: &Config, settings: Settings) -> Result<Outcome> {
    let project = cli.project_dir()?;
    let ctx = Context::load(project.as_deref(), settings).await?;
    execute(&ctx, &cli.command)
}

/// Execute a subcommand against a loaded snapshot
pub fn execute(ctx: &Context, command: &Command) -> Result<Outcome> {
    match command {
        Command::Files => files::run(ctx).map(Outcome::ok),
        Command::Settings { key } => settings::run(ctx, key.as_deref()),
        Command::Permissions { tool } => permissions::run(ctx, tool.as_deref()).map(Outcome::ok),
        Command::Mcp => mcp::run(ctx).map(Outcome::ok),
        Command::Hooks => hooks::run(ctx).map(Outcome::ok),
        Command::Memory => memory::run(ctx).map(Outcome::ok),
        Command::Scan => scan::run(ctx),
        Command::Health => health::run(ctx).map(Outcome::ok),
        Command::Set { key, value, scope } => edit::set(ctx, *scope, key, value).map(Outcome::ok),
        Command::Unset { key, scope } => edit::unset(ctx, *scope, key).map(Outcome::ok),
    }
}

/// Trailing section listing files that could not be used
fn render_issues(issues: &[FragmentIssue]) -> String {
    if issues.is_empty() {
        return String::new();
    }
    let mut table = Table::new(["SCOPE", "PATH", "ERROR"]);
    for issue in issues {
        table.row([
            issue.scope.to_string(),
            issue.path.display().to_string(),
            issue.error.clone(),
        ]);
    }
    format!("\nProblems:\n{}", table.render())
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::fs;
    use std::path::Path;

    use ccscope_core::ConfigPaths;
    use tempfile::TempDir;

    use super::Context;
    use crate::config::Settings;
    use crate::output::OutputFormat;

    pub fn write(path: &Path, text: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, text).unwrap();
    }

    /// Temp home + project layout; returns the guard and roots
    pub fn layout() -> (TempDir, ConfigPaths) {
        let tmp = TempDir::new().unwrap();
        let home = tmp.path().join("home");
        let project = tmp.path().join("project");
        fs::create_dir_all(&home).unwrap();
        fs::create_dir_all(&project).unwrap();
        let paths = ConfigPaths::with_home(home, Some(&project))
            .unwrap()
            .managed_dir(tmp.path().join("managed"));
        (tmp, paths)
    }

    pub async fn context(paths: &ConfigPaths, output: OutputFormat) -> Context {
        let settings = Settings {
            output,
            ..Settings::default()
        };
        Context::from_paths(paths.clone(), settings).await
    }
}
