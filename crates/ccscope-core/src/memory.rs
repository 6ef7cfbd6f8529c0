//! Memory import resolver: follows `@path` imports between CLAUDE.md files.
//!
//! Traversal is an explicit depth-first walk over a frame stack. A path already
//! on the stack marks the chain circular and is not descended into again; a path
//! already traversed elsewhere in the chain is skipped. Termination does not
//! depend on chain length.

use std::collections::{HashMap, HashSet};
use std::path::{Component, Path, PathBuf};

use serde::Serialize;

use crate::fragment::{collect_load_issues, ConfigFragment, FileType, FragmentIssue};
use crate::scope::Scope;

/// Raw-text access used to follow imports
pub trait TextSource {
    fn exists(&self, path: &Path) -> bool;
    fn read(&self, path: &Path) -> std::io::Result<String>;
    /// Identity of the file behind `path`, `None` when it cannot be resolved
    fn canonicalize(&self, path: &Path) -> Option<PathBuf>;
}

/// Reads import targets from the local filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct FsTextSource;

impl TextSource for FsTextSource {
    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn read(&self, path: &Path) -> std::io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn canonicalize(&self, path: &Path) -> Option<PathBuf> {
        std::fs::canonicalize(path).ok()
    }
}

/// In-memory file set
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    files: HashMap<PathBuf, String>,
    unreadable: HashSet<PathBuf>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>, text: &str) -> Self {
        self.files.insert(path.into(), text.to_string());
        self
    }

    /// A file that exists but fails to read
    pub fn with_unreadable(mut self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        self.files.insert(path.clone(), String::new());
        self.unreadable.insert(path);
        self
    }
}

impl TextSource for InMemorySource {
    fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }

    fn read(&self, path: &Path) -> std::io::Result<String> {
        if self.unreadable.contains(path) {
            return Err(std::io::Error::from(std::io::ErrorKind::PermissionDenied));
        }
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| std::io::Error::from(std::io::ErrorKind::NotFound))
    }

    fn canonicalize(&self, path: &Path) -> Option<PathBuf> {
        self.files.contains_key(path).then(|| path.to_path_buf())
    }
}

/// One direct import of a memory file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryImport {
    /// Target as written, without the `@`
    pub raw: String,
    pub resolved_path: PathBuf,
    /// Directory the target was resolved against
    pub relative_to: PathBuf,
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A memory file with its import graph walk
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedMemoryFile {
    pub path: PathBuf,
    pub scope: Scope,
    pub imports: Vec<MemoryImport>,
    /// Pre-order sequence of resolved paths visited from this file
    pub import_chain: Vec<PathBuf>,
    pub has_circular: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub circular_at: Option<PathBuf>,
}

/// An import whose target is missing or unreadable
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BrokenImport {
    /// File containing the directive
    pub source_path: PathBuf,
    pub raw: String,
    pub resolved_path: PathBuf,
    pub error: String,
}

/// Output of the memory import resolver
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryResult {
    pub files: Vec<ResolvedMemoryFile>,
    pub broken_imports: Vec<BrokenImport>,
    /// Direct imports summed over all memory files
    pub total_imports: usize,
    pub total_broken: usize,
    pub errors: Vec<FragmentIssue>,
}

/// Extract import targets from markdown text.
///
/// Recognizes `@path` tokens and the `@import path` form. Fenced code blocks
/// and inline code spans are ignored.
pub fn extract_imports(text: &str) -> Vec<String> {
    let mut targets = Vec::new();
    let mut in_fence = false;

    for line in text.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }

        let visible = strip_inline_code(line);
        let mut tokens = visible.split_whitespace();
        while let Some(token) = tokens.next() {
            let Some(rest) = token.strip_prefix('@') else {
                continue;
            };
            let target = if rest == "import" {
                match tokens.next() {
                    Some(next) => next,
                    None => continue,
                }
            } else {
                rest
            };
            let target = target.trim_end_matches(['.', ',', ';', ':', ')', '!', '?']);
            if !target.is_empty() {
                targets.push(target.to_string());
            }
        }
    }

    targets
}

fn strip_inline_code(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut in_code = false;
    for c in line.chars() {
        if c == '`' {
            in_code = !in_code;
            out.push(' ');
        } else if !in_code {
            out.push(c);
        }
    }
    out
}

/// Resolve a target against the importing file's directory
pub fn resolve_target(raw: &str, relative_to: &Path, home: Option<&Path>) -> PathBuf {
    let joined = match (raw.strip_prefix("~/"), home) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => {
            let path = Path::new(raw);
            if path.is_absolute() {
                path.to_path_buf()
            } else {
                relative_to.join(path)
            }
        }
    };
    normalize(&joined)
}

/// Lexically remove `.` and `..` components
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn parent_dir(path: &Path) -> PathBuf {
    path.parent().map(Path::to_path_buf).unwrap_or_default()
}

const NOT_FOUND: &str = "file not found";

struct Frame {
    path: PathBuf,
    /// Real file identity, used for cycle and revisit checks
    key: PathBuf,
    imports: Vec<(String, PathBuf)>,
    next: usize,
}

impl Frame {
    fn new(path: PathBuf, key: PathBuf, text: &str, home: Option<&Path>) -> Self {
        let dir = parent_dir(&path);
        let imports = extract_imports(text)
            .into_iter()
            .map(|raw| {
                let resolved = resolve_target(&raw, &dir, home);
                (raw, resolved)
            })
            .collect();
        Self {
            path,
            key,
            imports,
            next: 0,
        }
    }
}

/// Resolves memory files against a text source
pub struct MemoryResolver<'a, S: TextSource> {
    source: &'a S,
    home: Option<PathBuf>,
}

impl<'a, S: TextSource> MemoryResolver<'a, S> {
    pub fn new(source: &'a S, home: Option<PathBuf>) -> Self {
        Self { source, home }
    }

    /// Walk one memory file whose text is already loaded.
    ///
    /// Files are identified by their canonical path, so a symlink back into the
    /// chain is a cycle. Missing or unreadable targets anywhere in the walk are
    /// appended to `broken`.
    pub fn resolve_file(
        &self,
        path: &Path,
        scope: Scope,
        text: &str,
        broken: &mut Vec<BrokenImport>,
    ) -> ResolvedMemoryFile {
        let home = self.home.as_deref();
        let root_path = normalize(path);
        let root_key = self.identity(&root_path);
        let root = Frame::new(root_path.clone(), root_key.clone(), text, home);
        let direct = root.imports.clone();

        let mut stack = vec![root];
        let mut visited: HashSet<PathBuf> = HashSet::from([root_key]);
        let mut read_errors: HashMap<PathBuf, String> = HashMap::new();
        let mut chain = Vec::new();
        let mut circular_at = None;

        while let Some(frame) = stack.last_mut() {
            let Some((raw, target)) = frame.imports.get(frame.next).cloned() else {
                stack.pop();
                continue;
            };
            frame.next += 1;
            let importer = frame.path.clone();
            let key = self.identity(&target);

            if let Some(open) = stack.iter().find(|f| f.key == key) {
                tracing::debug!(file = %root_path.display(), at = %target.display(), "Circular memory import");
                circular_at.get_or_insert_with(|| open.path.clone());
                chain.push(target);
                continue;
            }
            if !visited.insert(key.clone()) {
                continue;
            }
            chain.push(target.clone());

            let failure = if self.source.exists(&target) {
                match self.source.read(&target) {
                    Ok(text) => {
                        stack.push(Frame::new(target, key, &text, home));
                        continue;
                    }
                    Err(e) => {
                        tracing::warn!(path = %target.display(), "Unreadable memory import: {}", e);
                        let message = format!("read error: {e}");
                        read_errors.insert(target.clone(), message.clone());
                        message
                    }
                }
            } else {
                NOT_FOUND.to_string()
            };

            let record = BrokenImport {
                source_path: importer,
                raw,
                resolved_path: target,
                error: failure,
            };
            if !broken.contains(&record) {
                broken.push(record);
            }
        }

        let relative_to = parent_dir(&root_path);
        let imports = direct
            .into_iter()
            .map(|(raw, resolved)| {
                let exists = self.source.exists(&resolved);
                let error = if exists {
                    read_errors.get(&resolved).cloned()
                } else {
                    Some(NOT_FOUND.to_string())
                };
                MemoryImport {
                    raw,
                    resolved_path: resolved,
                    relative_to: relative_to.clone(),
                    exists,
                    error,
                }
            })
            .collect();

        ResolvedMemoryFile {
            path: root_path,
            scope,
            imports,
            import_chain: chain,
            has_circular: circular_at.is_some(),
            circular_at,
        }
    }

    fn identity(&self, path: &Path) -> PathBuf {
        self.source
            .canonicalize(path)
            .unwrap_or_else(|| path.to_path_buf())
    }

    /// Resolve every loaded memory fragment
    pub fn resolve_fragments(&self, fragments: &[ConfigFragment]) -> MemoryResult {
        let errors = collect_load_issues(fragments, &[FileType::ClaudeMd]);
        let mut files = Vec::new();
        let mut broken_imports = Vec::new();

        for fragment in fragments
            .iter()
            .filter(|f| f.file_type == FileType::ClaudeMd && f.is_usable())
        {
            let Some(text) = fragment.text_content() else {
                continue;
            };
            files.push(self.resolve_file(&fragment.path, fragment.scope, text, &mut broken_imports));
        }

        let total_imports = files.iter().map(|f| f.imports.len()).sum();
        let total_broken = broken_imports.len();
        tracing::debug!(
            files = files.len(),
            imports = total_imports,
            broken = total_broken,
            "Resolved memory imports"
        );

        MemoryResult {
            files,
            broken_imports,
            total_imports,
            total_broken,
            errors,
        }
    }
}
