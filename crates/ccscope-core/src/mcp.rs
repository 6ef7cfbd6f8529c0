//! MCP server resolver: collects server definitions across scopes, masks
//! credential-like header/env values, and reports names defined in more than
//! one file.
//!
//! No winner is picked: every definition stays in the flat server list.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Map, Value};

use crate::fragment::{collect_load_issues, ConfigFragment, FileType, FragmentIssue};
use crate::scope::Scope;

/// Replacement for masked header/env values
pub const MASK: &str = "********";

/// Key substrings that mark a header or env var as a credential
const SENSITIVE_KEY_TOKENS: &[&str] = &[
    "key",
    "token",
    "secret",
    "password",
    "passwd",
    "authorization",
    "credential",
    "cookie",
];

/// How a server is reached
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum McpTransport {
    /// Local process speaking stdio
    Command { command: String, args: Vec<String> },
    /// Remote endpoint (streamable HTTP or SSE)
    Http { url: String },
}

/// One server definition from one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct McpServer {
    pub name: String,
    pub scope: Scope,
    pub source_path: PathBuf,
    #[serde(flatten)]
    pub transport: McpTransport,
    /// `type` as written in the file (`stdio`, `http`, `sse`), if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub declared_type: Option<String>,
    pub headers: BTreeMap<String, String>,
    pub env: BTreeMap<String, String>,
}

/// Where a server name was defined
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct McpLocation {
    pub scope: Scope,
    pub source_path: PathBuf,
}

/// A server name defined in two or more files
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct McpDuplicate {
    pub name: String,
    /// Every definition site, in discovery order
    pub locations: Vec<McpLocation>,
}

/// Output of the MCP resolver
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct McpResult {
    pub servers: Vec<McpServer>,
    pub duplicates: Vec<McpDuplicate>,
    pub errors: Vec<FragmentIssue>,
}

/// Whether a header/env key looks like it holds a credential
pub fn is_sensitive_key(key: &str) -> bool {
    let lower = key.to_lowercase();
    SENSITIVE_KEY_TOKENS.iter().any(|t| lower.contains(t))
}

/// Stringify a header/env map, masking credential-like keys
fn masked_map(value: Option<&Value>) -> BTreeMap<String, String> {
    let Some(Value::Object(map)) = value else {
        return BTreeMap::new();
    };

    map.iter()
        .map(|(k, v)| {
            let shown = if is_sensitive_key(k) {
                MASK.to_string()
            } else {
                match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                }
            };
            (k.clone(), shown)
        })
        .collect()
}

/// Classify one definition; exactly one transport shape is chosen
fn parse_server(
    name: &str,
    config: &Value,
    scope: Scope,
    source_path: &Path,
) -> Result<McpServer, String> {
    let obj = config
        .as_object()
        .ok_or_else(|| format!("server \"{name}\" is not an object"))?;

    let declared_type = obj.get("type").and_then(Value::as_str).map(str::to_string);
    let command = obj.get("command").and_then(Value::as_str);
    let url = obj.get("url").and_then(Value::as_str);

    let wants_http = matches!(declared_type.as_deref(), Some("http") | Some("sse"));
    let transport = match (wants_http, command, url) {
        (true, _, Some(url)) => McpTransport::Http {
            url: url.to_string(),
        },
        (true, _, None) => return Err(format!("server \"{name}\" has type http but no url")),
        (false, Some(command), _) => McpTransport::Command {
            command: command.to_string(),
            args: obj
                .get("args")
                .and_then(Value::as_array)
                .map(|a| {
                    a.iter()
                        .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
                        .collect()
                })
                .unwrap_or_default(),
        },
        (false, None, Some(url)) if declared_type.as_deref() != Some("stdio") => {
            McpTransport::Http {
                url: url.to_string(),
            }
        }
        _ => return Err(format!("server \"{name}\" has neither command nor url")),
    };

    Ok(McpServer {
        name: name.to_string(),
        scope,
        source_path: source_path.to_path_buf(),
        transport,
        declared_type,
        headers: masked_map(obj.get("headers")),
        env: masked_map(obj.get("env")),
    })
}

fn collect_servers(
    servers: &Map<String, Value>,
    scope: Scope,
    fragment: &ConfigFragment,
    out: &mut Vec<McpServer>,
    errors: &mut Vec<FragmentIssue>,
) {
    for (name, config) in servers {
        match parse_server(name, config, scope, &fragment.path) {
            Ok(server) => out.push(server),
            Err(message) => errors.push(fragment.issue(message)),
        }
    }
}

/// Resolve MCP servers from every MCP-bearing fragment.
///
/// `project` selects the `projects[<path>].mcpServers` block of `~/.claude.json`,
/// which is reported at local scope.
pub fn resolve_from_fragments(fragments: &[ConfigFragment], project: Option<&Path>) -> McpResult {
    let mut errors = collect_load_issues(fragments, &[FileType::Mcp]);
    let mut servers = Vec::new();

    for fragment in fragments
        .iter()
        .filter(|f| f.file_type == FileType::Mcp && f.is_usable())
    {
        let Some(root) = fragment.json_object() else {
            errors.push(fragment.issue("MCP config root is not a JSON object"));
            continue;
        };

        match root.get("mcpServers") {
            Some(Value::Object(map)) => {
                collect_servers(map, fragment.scope, fragment, &mut servers, &mut errors)
            }
            Some(_) => errors.push(fragment.issue("\"mcpServers\" is not an object")),
            None => {}
        }

        let project_block = project.and_then(|p| {
            let key = p.to_string_lossy();
            root.get("projects")
                .and_then(Value::as_object)
                .and_then(|projects| projects.get(key.as_ref()))
        });
        if let Some(Value::Object(map)) = project_block.and_then(|b| b.get("mcpServers")) {
            collect_servers(map, Scope::Local, fragment, &mut servers, &mut errors);
        }
    }

    let duplicates = find_duplicates(&servers);
    tracing::debug!(
        servers = servers.len(),
        duplicates = duplicates.len(),
        "Resolved MCP servers"
    );

    McpResult {
        servers,
        duplicates,
        errors,
    }
}

/// Names whose definitions span at least two distinct files
pub fn find_duplicates(servers: &[McpServer]) -> Vec<McpDuplicate> {
    let mut order: Vec<&str> = Vec::new();
    let mut by_name: BTreeMap<&str, Vec<McpLocation>> = BTreeMap::new();

    for server in servers {
        let locations = by_name.entry(server.name.as_str()).or_insert_with(|| {
            order.push(server.name.as_str());
            Vec::new()
        });
        locations.push(McpLocation {
            scope: server.scope,
            source_path: server.source_path.clone(),
        });
    }

    order
        .into_iter()
        .filter_map(|name| {
            let locations = by_name.remove(name)?;
            let mut files: Vec<&PathBuf> = locations.iter().map(|l| &l.source_path).collect();
            files.sort();
            files.dedup();
            (files.len() >= 2).then(|| McpDuplicate {
                name: name.to_string(),
                locations,
            })
        })
        .collect()
}
