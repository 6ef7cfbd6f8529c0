//! Located configuration fragments and the concurrent loader that fills them.

use std::fmt;
use std::path::PathBuf;

use futures_util::future::join_all;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::discovery::LocatedFile;
use crate::jsonc;
use crate::scope::Scope;

/// Kind of configuration file a fragment holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FileType {
    Settings,
    ClaudeMd,
    CommandsDir,
    SkillsDir,
    Mcp,
    Hooks,
    Credentials,
    Keybindings,
}

impl FileType {
    /// Whether the file is parsed as JSONC
    pub fn is_json(self) -> bool {
        matches!(
            self,
            FileType::Settings | FileType::Mcp | FileType::Hooks | FileType::Keybindings
        )
    }

    /// Whether the fragment is a directory rather than a file
    pub fn is_dir(self) -> bool {
        matches!(self, FileType::CommandsDir | FileType::SkillsDir)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FileType::Settings => "settings",
            FileType::ClaudeMd => "claude-md",
            FileType::CommandsDir => "commands-dir",
            FileType::SkillsDir => "skills-dir",
            FileType::Mcp => "mcp",
            FileType::Hooks => "hooks",
            FileType::Credentials => "credentials",
            FileType::Keybindings => "keybindings",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parsed content of a fragment
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FragmentContent {
    Json(Value),
    Text(String),
}

/// One located, possibly-parsed configuration file or directory
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigFragment {
    pub scope: Scope,
    #[serde(rename = "type")]
    pub file_type: FileType,
    pub path: PathBuf,
    pub exists: bool,
    pub readable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<FragmentContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ConfigFragment {
    /// An existing, parsed JSON fragment
    pub fn json(scope: Scope, file_type: FileType, path: impl Into<PathBuf>, value: Value) -> Self {
        Self {
            scope,
            file_type,
            path: path.into(),
            exists: true,
            readable: true,
            content: Some(FragmentContent::Json(value)),
            error: None,
        }
    }

    /// An existing markdown/text fragment
    pub fn text(scope: Scope, file_type: FileType, path: impl Into<PathBuf>, text: &str) -> Self {
        Self {
            scope,
            file_type,
            path: path.into(),
            exists: true,
            readable: true,
            content: Some(FragmentContent::Text(text.to_string())),
            error: None,
        }
    }

    /// A fragment whose file was not found
    pub fn missing(scope: Scope, file_type: FileType, path: impl Into<PathBuf>) -> Self {
        Self {
            scope,
            file_type,
            path: path.into(),
            exists: false,
            readable: false,
            content: None,
            error: None,
        }
    }

    /// JSON content, if any
    pub fn json_value(&self) -> Option<&Value> {
        match &self.content {
            Some(FragmentContent::Json(v)) => Some(v),
            _ => None,
        }
    }

    /// Top-level JSON object, or `None` when content is absent or not an object
    pub fn json_object(&self) -> Option<&Map<String, Value>> {
        self.json_value().and_then(Value::as_object)
    }

    /// Raw text content, if any
    pub fn text_content(&self) -> Option<&str> {
        match &self.content {
            Some(FragmentContent::Text(t)) => Some(t),
            _ => None,
        }
    }

    /// Whether a resolver may consume this fragment
    pub fn is_usable(&self) -> bool {
        self.exists && self.error.is_none() && self.content.is_some()
    }

    /// Issue record for this fragment carrying the given message
    pub fn issue(&self, message: impl Into<String>) -> FragmentIssue {
        FragmentIssue {
            scope: self.scope,
            path: self.path.clone(),
            error: message.into(),
        }
    }
}

/// A fragment excluded (wholly or in part) from resolution, with the reason
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FragmentIssue {
    pub scope: Scope,
    pub path: PathBuf,
    pub error: String,
}

/// Issues for every fragment of the given types that carries a load/parse error
pub fn collect_load_issues(fragments: &[ConfigFragment], types: &[FileType]) -> Vec<FragmentIssue> {
    fragments
        .iter()
        .filter(|f| types.contains(&f.file_type))
        .filter_map(|f| f.error.as_ref().map(|e| f.issue(e.clone())))
        .collect()
}

/// Read every located file concurrently.
///
/// Order of the result matches the order of `located`. A failure on one file is
/// recorded on that fragment and never aborts the batch.
pub async fn load_fragments(located: Vec<LocatedFile>) -> Vec<ConfigFragment> {
    let fragments = join_all(located.into_iter().map(load_one)).await;
    tracing::debug!(
        total = fragments.len(),
        existing = fragments.iter().filter(|f| f.exists).count(),
        "Loaded configuration fragments"
    );
    fragments
}

async fn load_one(file: LocatedFile) -> ConfigFragment {
    let LocatedFile {
        scope,
        file_type,
        path,
    } = file;

    // Credentials are located, never read
    if file_type == FileType::Credentials || file_type.is_dir() {
        let exists = match tokio::fs::metadata(&path).await {
            Ok(meta) => meta.is_dir() == file_type.is_dir(),
            Err(_) => false,
        };
        return ConfigFragment {
            scope,
            file_type,
            path,
            exists,
            readable: exists,
            content: None,
            error: None,
        };
    }

    let text = match tokio::fs::read_to_string(&path).await {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return ConfigFragment::missing(scope, file_type, path);
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), scope = %scope, "Unreadable config file: {}", e);
            return ConfigFragment {
                scope,
                file_type,
                path,
                exists: true,
                readable: false,
                content: None,
                error: Some(format!("read error: {e}")),
            };
        }
    };

    if !file_type.is_json() {
        return ConfigFragment::text(scope, file_type, path, &text);
    }

    match jsonc::parse(&text) {
        Ok(value) => ConfigFragment::json(scope, file_type, path, value),
        Err(e) => {
            tracing::warn!(path = %path.display(), scope = %scope, "Malformed config file: {}", e);
            ConfigFragment {
                scope,
                file_type,
                path,
                exists: true,
                readable: true,
                content: None,
                error: Some(format!("parse error: {e}")),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn located(scope: Scope, file_type: FileType, path: PathBuf) -> LocatedFile {
        LocatedFile {
            scope,
            file_type,
            path,
        }
    }

    #[tokio::test]
    async fn test_load_mixed_batch() {
        let tmp = TempDir::new().unwrap();
        let settings = tmp.path().join("settings.json");
        let broken = tmp.path().join("broken.json");
        let memory = tmp.path().join("CLAUDE.md");
        let creds = tmp.path().join(".credentials.json");
        fs::write(&settings, "{ // comment\n \"theme\": \"dark\" }").unwrap();
        fs::write(&broken, "{ not json").unwrap();
        fs::write(&memory, "# Notes\n").unwrap();
        fs::write(&creds, "{\"token\": \"secret\"}").unwrap();

        let fragments = load_fragments(vec![
            located(Scope::User, FileType::Settings, settings),
            located(Scope::Project, FileType::Settings, broken),
            located(Scope::User, FileType::ClaudeMd, memory),
            located(Scope::User, FileType::Credentials, creds),
            located(Scope::Local, FileType::Settings, tmp.path().join("absent.json")),
        ])
        .await;

        assert_eq!(fragments.len(), 5);
        assert_eq!(
            fragments[0].json_value(),
            Some(&serde_json::json!({"theme": "dark"}))
        );
        assert!(fragments[1].exists);
        assert!(fragments[1].error.as_deref().unwrap().starts_with("parse error"));
        assert_eq!(fragments[2].text_content(), Some("# Notes\n"));
        assert!(fragments[3].exists);
        assert!(fragments[3].content.is_none());
        assert!(!fragments[4].exists);
        assert!(fragments[4].error.is_none());
    }

    #[tokio::test]
    async fn test_directory_fragment() {
        let tmp = TempDir::new().unwrap();
        let commands = tmp.path().join("commands");
        fs::create_dir_all(&commands).unwrap();

        let fragments = load_fragments(vec![located(Scope::User, FileType::CommandsDir, commands)]).await;
        assert!(fragments[0].exists);
        assert!(fragments[0].content.is_none());
    }

    #[test]
    fn test_collect_load_issues_filters_by_type() {
        let mut bad = ConfigFragment::missing(Scope::User, FileType::Settings, "/a");
        bad.exists = true;
        bad.error = Some("parse error: x".to_string());
        let mut other = ConfigFragment::missing(Scope::User, FileType::Mcp, "/b");
        other.error = Some("read error".to_string());

        let issues = collect_load_issues(&[bad, other], &[FileType::Settings]);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].path, PathBuf::from("/a"));
    }

    #[test]
    fn test_serialized_fragment_uses_type_key() {
        let fragment = ConfigFragment::missing(Scope::User, FileType::ClaudeMd, "/x/CLAUDE.md");
        let json = serde_json::to_value(&fragment).unwrap();
        assert_eq!(json["type"], "claude-md");
        assert_eq!(json["scope"], "user");
        assert!(json.get("content").is_none());
    }
}
