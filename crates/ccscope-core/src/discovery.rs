//! Expected configuration locations per scope.
//!
//! Discovery only enumerates paths; [`crate::fragment::load_fragments`] decides
//! existence and reads content.

use std::path::{Path, PathBuf};

use crate::error::{InspectError, Result};
use crate::fragment::FileType;
use crate::scope::Scope;

/// A path where a configuration file of a given type is expected
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedFile {
    pub scope: Scope,
    pub file_type: FileType,
    pub path: PathBuf,
}

/// Root directories for one invocation
#[derive(Debug, Clone)]
pub struct ConfigPaths {
    /// User home directory
    pub home: PathBuf,
    /// `~/.claude`
    pub claude_home: PathBuf,
    /// `~/.claude.json` (user and per-project local MCP servers)
    pub user_config_file: PathBuf,
    /// Directory holding `managed-settings.json`
    pub managed_dir: PathBuf,
    /// Project directory, `None` for global-only operation
    pub project: Option<PathBuf>,
}

impl ConfigPaths {
    /// Detect roots from the environment.
    ///
    /// Fails when the home directory is unknown or `project` is not a directory.
    pub fn detect(project: Option<&Path>) -> Result<Self> {
        let home = dirs::home_dir().ok_or(InspectError::HomeNotFound)?;
        Self::with_home(home, project)
    }

    /// Build roots below an explicit home directory
    pub fn with_home(home: PathBuf, project: Option<&Path>) -> Result<Self> {
        let project = match project {
            Some(dir) => {
                if !dir.is_dir() {
                    return Err(InspectError::ProjectNotFound {
                        path: dir.to_path_buf(),
                    });
                }
                Some(std::fs::canonicalize(dir).unwrap_or_else(|_| dir.to_path_buf()))
            }
            None => None,
        };

        Ok(Self {
            claude_home: home.join(".claude"),
            user_config_file: home.join(".claude.json"),
            managed_dir: default_managed_dir(),
            home,
            project,
        })
    }

    /// Override `~/.claude`
    pub fn claude_home(mut self, dir: PathBuf) -> Self {
        self.claude_home = dir;
        self
    }

    /// Override the managed-settings directory
    pub fn managed_dir(mut self, dir: PathBuf) -> Self {
        self.managed_dir = dir;
        self
    }

    /// `~/.claude/plugins`
    pub fn plugins_dir(&self) -> PathBuf {
        self.claude_home.join("plugins")
    }

    /// Settings file written for a scope, if that scope has one
    pub fn settings_path(&self, scope: Scope) -> Option<PathBuf> {
        match scope {
            Scope::Managed => Some(self.managed_dir.join("managed-settings.json")),
            Scope::User => Some(self.claude_home.join("settings.json")),
            Scope::Project => self
                .project
                .as_ref()
                .map(|p| p.join(".claude").join("settings.json")),
            Scope::Local => self
                .project
                .as_ref()
                .map(|p| p.join(".claude").join("settings.local.json")),
        }
    }

    /// Every expected file in discovery order (managed, user, project, local)
    pub fn locate(&self) -> Vec<LocatedFile> {
        let mut files = Vec::new();
        let mut push = |scope, file_type, path: PathBuf| {
            files.push(LocatedFile {
                scope,
                file_type,
                path,
            })
        };

        let managed = &self.managed_dir;
        push(Scope::Managed, FileType::Settings, managed.join("managed-settings.json"));
        push(Scope::Managed, FileType::Mcp, managed.join("managed-mcp.json"));
        push(Scope::Managed, FileType::ClaudeMd, managed.join("CLAUDE.md"));

        let user = &self.claude_home;
        push(Scope::User, FileType::Settings, user.join("settings.json"));
        push(Scope::User, FileType::ClaudeMd, user.join("CLAUDE.md"));
        push(Scope::User, FileType::CommandsDir, user.join("commands"));
        push(Scope::User, FileType::SkillsDir, user.join("skills"));
        push(Scope::User, FileType::Mcp, self.user_config_file.clone());
        push(Scope::User, FileType::Credentials, user.join(".credentials.json"));
        push(Scope::User, FileType::Keybindings, user.join("keybindings.json"));

        if let Some(project) = &self.project {
            let dot = project.join(".claude");
            push(Scope::Project, FileType::Settings, dot.join("settings.json"));
            push(Scope::Project, FileType::ClaudeMd, project.join("CLAUDE.md"));
            push(Scope::Project, FileType::ClaudeMd, dot.join("CLAUDE.md"));
            push(Scope::Project, FileType::CommandsDir, dot.join("commands"));
            push(Scope::Project, FileType::SkillsDir, dot.join("skills"));
            push(Scope::Project, FileType::Mcp, project.join(".mcp.json"));

            push(Scope::Local, FileType::Settings, dot.join("settings.local.json"));
            push(Scope::Local, FileType::ClaudeMd, project.join("CLAUDE.local.md"));
        }

        tracing::debug!(count = files.len(), "Located configuration paths");
        files
    }
}

/// Platform directory for organization-managed settings
fn default_managed_dir() -> PathBuf {
    if cfg!(target_os = "macos") {
        PathBuf::from("/Library/Application Support/ClaudeCode")
    } else if cfg!(windows) {
        PathBuf::from(r"C:\ProgramData\ClaudeCode")
    } else {
        PathBuf::from("/etc/claude-code")
    }
}
