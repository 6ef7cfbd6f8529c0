use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use ccscope_core::security::scanner::DEFAULT_SNIPPET_CHARS;
use ccscope_core::Scope;

use crate::output::OutputFormat;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about = "Inspect layered Claude Code configuration")]
pub struct Config {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Project directory (defaults to the current directory)
    #[arg(short, long, global = true, conflicts_with = "global")]
    pub project: Option<PathBuf>,

    /// Ignore project scopes, inspect managed and user configuration only
    #[arg(short, long, global = true)]
    pub global: bool,

    /// Emit JSON instead of tables
    #[arg(long, global = true)]
    pub json: bool,

    /// Subcommand
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// List every discovered configuration file
    Files,
    /// Show effective settings with their override chains
    Settings {
        /// Only show this key
        key: Option<String>,
    },
    /// Show merged tool permissions
    Permissions {
        /// Filter by tool name (case-insensitive substring)
        #[arg(short, long)]
        tool: Option<String>,
    },
    /// Show MCP servers and cross-file name collisions
    Mcp,
    /// Show hook bindings and unconfigured events
    Hooks,
    /// Show memory files and their import graphs
    Memory,
    /// Scan skills and commands for risky content (exit 1 on warning, 2 on danger)
    Scan,
    /// Score overall configuration health
    Health,
    /// Set a top-level settings key
    Set {
        key: String,
        /// JSON value, or a plain string
        #[arg(allow_hyphen_values = true)]
        value: String,
        /// Target scope: user, project or local
        #[arg(short, long, default_value = "local")]
        scope: Scope,
    },
    /// Remove a top-level settings key
    Unset {
        key: String,
        /// Target scope: user, project or local
        #[arg(short, long, default_value = "local")]
        scope: Scope,
    },
}

impl Config {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Project directory for this invocation, `None` in global mode
    pub fn project_dir(&self) -> Result<Option<PathBuf>> {
        if self.global {
            return Ok(None);
        }
        match &self.project {
            Some(dir) => Ok(Some(dir.clone())),
            None => std::env::current_dir()
                .map(Some)
                .context("Failed to determine current directory"),
        }
    }
}

/// Tool settings (from config file)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Default output format
    #[serde(default)]
    pub output: OutputFormat,

    /// Override for `~/.claude`
    #[serde(default)]
    pub claude_home: Option<PathBuf>,

    /// Override for the managed-settings directory
    #[serde(default)]
    pub managed_dir: Option<PathBuf>,

    /// Maximum snippet length in scan findings
    #[serde(default = "default_snippet_max_chars")]
    pub snippet_max_chars: usize,

    /// Health report settings
    #[serde(default)]
    pub health: HealthSettings,
}

fn default_snippet_max_chars() -> usize {
    DEFAULT_SNIPPET_CHARS
}

/// Health report settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthSettings {
    /// Run the skill scanner as part of the health score
    #[serde(default = "default_include_security")]
    pub include_security: bool,
}

fn default_include_security() -> bool {
    true
}

impl Default for HealthSettings {
    fn default() -> Self {
        Self {
            include_security: default_include_security(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            output: OutputFormat::default(),
            claude_home: None,
            managed_dir: None,
            snippet_max_chars: default_snippet_max_chars(),
            health: HealthSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings from config file or use defaults
    pub fn load(path: Option<&PathBuf>) -> Result<Self> {
        // An explicit path must exist
        if let Some(p) = path {
            let content = std::fs::read_to_string(p)
                .with_context(|| format!("Failed to read config file: {:?}", p))?;
            return toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", p));
        }

        let default_paths = [
            dirs::config_dir().map(|p| p.join("ccscope/config.toml")),
            dirs::home_dir().map(|p| p.join(".config/ccscope/config.toml")),
            dirs::home_dir().map(|p| p.join(".ccscope.toml")),
        ];

        for path in default_paths.iter().flatten() {
            if path.exists() {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file: {:?}", path))?;
                return toml::from_str(&content)
                    .with_context(|| format!("Failed to parse config file: {:?}", path));
            }
        }

        Ok(Self::default())
    }

    /// Merge CLI config into settings (CLI takes precedence)
    pub fn merge_cli(&mut self, cli: &Config) {
        if cli.json {
            self.output = OutputFormat::Json;
        }
    }

    /// Validate and normalize settings values
    pub fn validate(&mut self) {
        const MIN_SNIPPET_CHARS: usize = 16;

        if self.snippet_max_chars < MIN_SNIPPET_CHARS {
            self.snippet_max_chars = MIN_SNIPPET_CHARS;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.output, OutputFormat::Table);
        assert_eq!(settings.snippet_max_chars, 120);
        assert!(settings.health.include_security);
        assert!(settings.claude_home.is_none());
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
            output = "json"
            snippet_max_chars = 4
            managed_dir = "/opt/managed"

            [health]
            include_security = false
        "#;

        let mut settings: Settings = toml::from_str(toml).expect("Should parse TOML");
        assert_eq!(settings.output, OutputFormat::Json);
        assert_eq!(settings.managed_dir, Some(PathBuf::from("/opt/managed")));
        assert!(!settings.health.include_security);

        settings.validate();
        assert_eq!(settings.snippet_max_chars, 16);
    }

    #[test]
    fn test_cli_json_overrides_file() {
        let cli = Config::parse_from(["ccscope", "--json", "settings"]);
        let mut settings = Settings::default();
        settings.merge_cli(&cli);
        assert_eq!(settings.output, OutputFormat::Json);
    }

    #[test]
    fn test_cli_set_scope_parses() {
        let cli = Config::parse_from(["ccscope", "set", "theme", "dark", "--scope", "project"]);
        match cli.command {
            Command::Set { key, scope, .. } => {
                assert_eq!(key, "theme");
                assert_eq!(scope, Scope::Project);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_global_mode_has_no_project() {
        let cli = Config::parse_from(["ccscope", "--global", "files"]);
        assert_eq!(cli.project_dir().unwrap(), None);
    }

    #[test]
    fn test_load_from_home_dotfile() {
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::write(tmp.path().join(".ccscope.toml"), "output = \"json\"\n").unwrap();

        let home = tmp.path().to_str().unwrap();
        let xdg = tmp.path().join("xdg");
        temp_env::with_vars(
            [("HOME", Some(home)), ("XDG_CONFIG_HOME", xdg.to_str())],
            || {
                let settings = Settings::load(None).unwrap();
                assert_eq!(settings.output, OutputFormat::Json);
                assert_eq!(settings.snippet_max_chars, 120);
            },
        );
    }

    #[test]
    fn test_load_missing_explicit_path_fails() {
        let missing = PathBuf::from("/nonexistent/ccscope.toml");
        assert!(Settings::load(Some(&missing)).is_err());
    }
}
