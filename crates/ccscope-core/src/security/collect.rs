//! Gathers skill and command text for the scanner.
//!
//! Commands are `*.md` files under a `commands/` directory (nested directories
//! become `:`-separated namespaces). Skills are `<name>/SKILL.md` under a
//! `skills/` directory, named by their YAML frontmatter when present.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::types::{SkillInput, SourceKind};
use crate::fragment::{ConfigFragment, FileType};
use crate::scope::Scope;

/// How deep to look for `commands/` and `skills/` inside the plugins directory
const PLUGIN_SEARCH_DEPTH: usize = 6;

#[derive(Debug, Deserialize)]
struct Frontmatter {
    #[serde(default)]
    name: Option<String>,
}

/// Extract the `name` field from YAML frontmatter delimited by `---` lines
fn frontmatter_name(content: &str) -> Option<String> {
    let trimmed = content.trim_start();
    let after_first = trimmed.strip_prefix("---")?;
    let after_first = after_first.strip_prefix('\n').unwrap_or(after_first);
    let end_idx = after_first.find("\n---")?;

    serde_yaml::from_str::<Frontmatter>(&after_first[..end_idx])
        .ok()
        .and_then(|fm| fm.name)
        .filter(|n| !n.trim().is_empty())
}

fn sorted_entries(dir: &Path) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = match std::fs::read_dir(dir) {
        Ok(entries) => entries.flatten().map(|e| e.path()).collect(),
        Err(_) => return Vec::new(),
    };
    paths.sort();
    paths
}

/// Record `dir` by its real location; false when already seen through another path
fn first_visit(dir: &Path, visited: &mut HashSet<PathBuf>) -> bool {
    let real = std::fs::canonicalize(dir).unwrap_or_else(|_| dir.to_path_buf());
    visited.insert(real)
}

fn read_text(path: &Path) -> Option<String> {
    match std::fs::read_to_string(path) {
        Ok(text) => Some(text),
        Err(e) => {
            tracing::warn!(path = %path.display(), "Skipping unreadable skill file: {}", e);
            None
        }
    }
}

/// Collect command files below `dir`
pub fn collect_commands(dir: &Path, scope: Scope, kind: SourceKind, out: &mut Vec<SkillInput>) {
    let mut visited = HashSet::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        if !first_visit(&current, &mut visited) {
            tracing::debug!(path = %current.display(), "Skipping already scanned directory");
            continue;
        }
        for path in sorted_entries(&current) {
            if path.is_dir() {
                pending.push(path);
                continue;
            }
            if path.extension().and_then(|e| e.to_str()) != Some("md") {
                continue;
            }
            let Some(content) = read_text(&path) else {
                continue;
            };
            let name = path
                .strip_prefix(dir)
                .unwrap_or(path.as_path())
                .with_extension("")
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join(":");

            out.push(SkillInput {
                name,
                path,
                scope,
                source_kind: Some(kind),
                content,
            });
        }
    }
}

/// Collect `SKILL.md` files one level below `dir`
pub fn collect_skills(dir: &Path, scope: Scope, kind: SourceKind, out: &mut Vec<SkillInput>) {
    for skill_dir in sorted_entries(dir).into_iter().filter(|p| p.is_dir()) {
        let path = skill_dir.join("SKILL.md");
        if !path.is_file() {
            continue;
        }
        let Some(content) = read_text(&path) else {
            continue;
        };
        let dir_name = skill_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        out.push(SkillInput {
            name: frontmatter_name(&content).unwrap_or(dir_name),
            path,
            scope,
            source_kind: Some(kind),
            content,
        });
    }
}

/// Find plugin `commands/` and `skills/` directories and collect their content
fn collect_plugins(
    dir: &Path,
    depth: usize,
    visited: &mut HashSet<PathBuf>,
    out: &mut Vec<SkillInput>,
) {
    if depth == 0 || !first_visit(dir, visited) {
        return;
    }
    for path in sorted_entries(dir).into_iter().filter(|p| p.is_dir()) {
        match path.file_name().and_then(|n| n.to_str()) {
            Some("commands") => collect_commands(&path, Scope::User, SourceKind::Plugin, out),
            Some("skills") => collect_skills(&path, Scope::User, SourceKind::Plugin, out),
            Some(name) if name.starts_with('.') => {}
            _ => collect_plugins(&path, depth - 1, visited, out),
        }
    }
}

/// Gather scan inputs from directory fragments and, optionally, installed plugins
pub fn collect_skill_inputs(fragments: &[ConfigFragment], plugins_dir: Option<&Path>) -> Vec<SkillInput> {
    let mut inputs = Vec::new();

    for fragment in fragments.iter().filter(|f| f.exists) {
        match fragment.file_type {
            FileType::CommandsDir => {
                collect_commands(&fragment.path, fragment.scope, SourceKind::Command, &mut inputs)
            }
            FileType::SkillsDir => {
                collect_skills(&fragment.path, fragment.scope, SourceKind::Skill, &mut inputs)
            }
            _ => {}
        }
    }

    if let Some(dir) = plugins_dir {
        collect_plugins(dir, PLUGIN_SEARCH_DEPTH, &mut HashSet::new(), &mut inputs);
    }

    tracing::debug!(count = inputs.len(), "Collected skills and commands");
    inputs
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn dir_fragment(scope: Scope, file_type: FileType, path: PathBuf) -> ConfigFragment {
        let mut fragment = ConfigFragment::missing(scope, file_type, path);
        fragment.exists = true;
        fragment
    }

    #[test]
    fn test_frontmatter_name() {
        assert_eq!(
            frontmatter_name("---\nname: pdf-tools\ndescription: x\n---\nbody"),
            Some("pdf-tools".to_string())
        );
        assert_eq!(frontmatter_name("no frontmatter"), None);
        assert_eq!(frontmatter_name("---\ndescription: only\n---\n"), None);
    }

    #[test]
    fn test_collect_commands_and_skills() {
        let tmp = TempDir::new().unwrap();
        let commands = tmp.path().join("commands");
        fs::create_dir_all(commands.join("git")).unwrap();
        fs::write(commands.join("review.md"), "Review the diff").unwrap();
        fs::write(commands.join("git").join("sync.md"), "git pull").unwrap();
        fs::write(commands.join("notes.txt"), "ignored").unwrap();

        let skills = tmp.path().join("skills");
        fs::create_dir_all(skills.join("pdf")).unwrap();
        fs::create_dir_all(skills.join("empty")).unwrap();
        fs::write(skills.join("pdf").join("SKILL.md"), "---\nname: pdf-tools\n---\nUse pdftotext").unwrap();

        let fragments = vec![
            dir_fragment(Scope::Project, FileType::CommandsDir, commands),
            dir_fragment(Scope::User, FileType::SkillsDir, skills),
        ];
        let inputs = collect_skill_inputs(&fragments, None);

        let mut names: Vec<&str> = inputs.iter().map(|i| i.name.as_str()).collect();
        names.sort();
        assert_eq!(names, vec!["git:sync", "pdf-tools", "review"]);
        let skill = inputs.iter().find(|i| i.name == "pdf-tools").unwrap();
        assert_eq!(skill.source_kind, Some(SourceKind::Skill));
        assert_eq!(skill.scope, Scope::User);
    }

    #[test]
    fn test_collect_plugins() {
        let tmp = TempDir::new().unwrap();
        let plugin = tmp.path().join("marketplaces").join("acme").join("plugins").join("lint");
        fs::create_dir_all(plugin.join("commands")).unwrap();
        fs::create_dir_all(plugin.join("skills").join("fmt")).unwrap();
        fs::write(plugin.join("commands").join("lint.md"), "run lint").unwrap();
        fs::write(plugin.join("skills").join("fmt").join("SKILL.md"), "format").unwrap();

        let inputs = collect_skill_inputs(&[], Some(tmp.path()));
        assert_eq!(inputs.len(), 2);
        assert!(inputs.iter().all(|i| i.source_kind == Some(SourceKind::Plugin)));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_directory_loop_scanned_once() {
        let tmp = TempDir::new().unwrap();
        let commands = tmp.path().join("commands");
        fs::create_dir_all(&commands).unwrap();
        fs::write(commands.join("a.md"), "hello").unwrap();
        std::os::unix::fs::symlink(&commands, commands.join("loop")).unwrap();

        let mut inputs = Vec::new();
        collect_commands(&commands, Scope::Project, SourceKind::Command, &mut inputs);
        assert_eq!(inputs.len(), 1);
        assert_eq!(inputs[0].name, "a");

        let plugins = tmp.path().join("plugins");
        fs::create_dir_all(plugins.join("p")).unwrap();
        std::os::unix::fs::symlink(&plugins, plugins.join("p").join("back")).unwrap();
        std::os::unix::fs::symlink(&commands, plugins.join("p").join("commands")).unwrap();
        let inputs = collect_skill_inputs(&[], Some(&plugins));
        assert_eq!(inputs.len(), 1);
    }

    #[test]
    fn test_missing_dirs_yield_nothing() {
        let fragments = vec![ConfigFragment::missing(
            Scope::User,
            FileType::CommandsDir,
            "/nonexistent/commands",
        )];
        assert!(collect_skill_inputs(&fragments, Some(Path::new("/nonexistent/plugins"))).is_empty());
    }
}
