//! Settings write path: set or remove one top-level key in a scope's
//! settings file.
//!
//! The whole current file is parsed, edited as a value, and written back in a
//! single atomic replacement. A failed write leaves the original untouched.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::discovery::ConfigPaths;
use crate::error::{InspectError, Result};
use crate::jsonc;
use crate::scope::Scope;

/// Interpret a CLI value: JSON when it parses, otherwise a plain string
pub fn parse_value_arg(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn validate_key(key: &str) -> Result<&str> {
    let trimmed = key.trim();
    if trimmed.is_empty() || trimmed != key {
        return Err(InspectError::InvalidKey {
            key: key.to_string(),
        });
    }
    Ok(key)
}

fn target_path(paths: &ConfigPaths, scope: Scope) -> Result<PathBuf> {
    if scope == Scope::Managed {
        return Err(InspectError::ReadOnlyScope { scope });
    }
    paths
        .settings_path(scope)
        .ok_or(InspectError::NoProject { scope })
}

fn load_object(path: &Path) -> Result<Map<String, Value>> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
        Err(source) => {
            return Err(InspectError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    if text.trim().is_empty() {
        return Ok(Map::new());
    }

    match jsonc::parse(&text) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(InspectError::MalformedTarget {
            path: path.to_path_buf(),
            message: "root is not a JSON object".to_string(),
        }),
        Err(e) => Err(InspectError::MalformedTarget {
            path: path.to_path_buf(),
            message: e.to_string(),
        }),
    }
}

/// Replace `path` with `text` via a temp file in the same directory
fn write_atomic(path: &Path, text: &str) -> Result<()> {
    let io_err = |source| InspectError::Io {
        path: path.to_path_buf(),
        source,
    };
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir).map_err(io_err)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(io_err)?;
    tmp.write_all(text.as_bytes()).map_err(io_err)?;
    tmp.as_file().sync_all().map_err(io_err)?;
    tmp.persist(path).map_err(|e| io_err(e.error))?;
    Ok(())
}

fn save(path: &Path, map: Map<String, Value>) -> Result<()> {
    let mut text = serde_json::to_string_pretty(&Value::Object(map))?;
    text.push('\n');
    write_atomic(path, &text)
}

/// Set `key` to `value` in the settings file of `scope`; returns the file written
pub fn set_setting(paths: &ConfigPaths, scope: Scope, key: &str, value: Value) -> Result<PathBuf> {
    let key = validate_key(key)?;
    let path = target_path(paths, scope)?;
    let mut map = load_object(&path)?;
    map.insert(key.to_string(), value);
    save(&path, map)?;
    tracing::info!(path = %path.display(), key = %key, scope = %scope, "Setting written");
    Ok(path)
}

/// Remove `key` from the settings file of `scope`; returns whether it was present
pub fn unset_setting(paths: &ConfigPaths, scope: Scope, key: &str) -> Result<bool> {
    let key = validate_key(key)?;
    let path = target_path(paths, scope)?;
    if !path.exists() {
        return Ok(false);
    }
    let mut map = load_object(&path)?;
    if map.remove(key).is_none() {
        return Ok(false);
    }
    save(&path, map)?;
    tracing::info!(path = %path.display(), key = %key, scope = %scope, "Setting removed");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn paths(tmp: &TempDir) -> ConfigPaths {
        let project = tmp.path().join("proj");
        fs::create_dir_all(&project).unwrap();
        ConfigPaths::with_home(tmp.path().join("home"), Some(&project)).unwrap()
    }

    #[test]
    fn test_parse_value_arg() {
        assert_eq!(parse_value_arg("true"), json!(true));
        assert_eq!(parse_value_arg("42"), json!(42));
        assert_eq!(parse_value_arg("[\"a\"]"), json!(["a"]));
        assert_eq!(parse_value_arg("dark"), json!("dark"));
    }

    #[test]
    fn test_set_creates_file_and_preserves_other_keys() {
        let tmp = TempDir::new().unwrap();
        let paths = paths(&tmp);
        let target = paths.settings_path(Scope::Project).unwrap();
        fs::create_dir_all(target.parent().unwrap()).unwrap();
        fs::write(&target, "{\n  // keep\n  \"verbose\": true,\n}").unwrap();

        let written = set_setting(&paths, Scope::Project, "theme", json!("light")).unwrap();
        assert_eq!(written, target);
        let value: Value = serde_json::from_str(&fs::read_to_string(&target).unwrap()).unwrap();
        assert_eq!(value, json!({"theme": "light", "verbose": true}));

        let user = set_setting(&paths, Scope::User, "model", json!("opus")).unwrap();
        assert!(user.ends_with(".claude/settings.json"));
        assert!(user.exists());
    }

    #[test]
    fn test_unset() {
        let tmp = TempDir::new().unwrap();
        let paths = paths(&tmp);
        set_setting(&paths, Scope::Local, "a", json!(1)).unwrap();
        assert!(unset_setting(&paths, Scope::Local, "a").unwrap());
        assert!(!unset_setting(&paths, Scope::Local, "a").unwrap());
        assert!(!unset_setting(&paths, Scope::User, "a").unwrap());
    }

    #[test]
    fn test_invalid_key_and_scopes() {
        let tmp = TempDir::new().unwrap();
        let paths = paths(&tmp);
        assert!(matches!(
            set_setting(&paths, Scope::User, "  ", json!(1)),
            Err(InspectError::InvalidKey { .. })
        ));
        assert!(matches!(
            set_setting(&paths, Scope::Managed, "a", json!(1)),
            Err(InspectError::ReadOnlyScope { .. })
        ));

        let global = ConfigPaths::with_home(tmp.path().join("home"), None).unwrap();
        assert!(matches!(
            set_setting(&global, Scope::Project, "a", json!(1)),
            Err(InspectError::NoProject { .. })
        ));
    }

    #[test]
    fn test_malformed_target_untouched() {
        let tmp = TempDir::new().unwrap();
        let paths = paths(&tmp);
        let target = paths.settings_path(Scope::Project).unwrap();
        fs::create_dir_all(target.parent().unwrap()).unwrap();
        fs::write(&target, "[1, 2]").unwrap();

        let err = set_setting(&paths, Scope::Project, "a", json!(1)).unwrap_err();
        assert!(matches!(err, InspectError::MalformedTarget { .. }));
        assert_eq!(fs::read_to_string(&target).unwrap(), "[1, 2]");
    }
}
