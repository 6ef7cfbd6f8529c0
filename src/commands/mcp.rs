use anyhow::Result;
use ccscope_core::mcp::{resolve_from_fragments, McpTransport};

use super::{render_issues, Context};
use crate::output::{to_json, OutputFormat, Table};

pub(super) fn run(ctx: &Context) -> Result<String> {
    let result = resolve_from_fragments(&ctx.fragments, ctx.paths.project.as_deref());

    if ctx.format() == OutputFormat::Json {
        return to_json(&result);
    }

    let mut out = if result.servers.is_empty() {
        "No MCP servers configured\n".to_string()
    } else {
        let mut table = Table::new(["NAME", "SCOPE", "TRANSPORT", "TARGET", "SOURCE"]);
        for server in &result.servers {
            let (transport, target) = match &server.transport {
                McpTransport::Command { command, args } => {
                    let mut line = command.clone();
                    for arg in args {
                        line.push(' ');
                        line.push_str(arg);
                    }
                    ("stdio", line)
                }
                McpTransport::Http { url } => {
                    let kind = match server.declared_type.as_deref() {
                        Some("sse") => "sse",
                        _ => "http",
                    };
                    (kind, url.clone())
                }
            };
            table.row([
                server.name.clone(),
                server.scope.to_string(),
                transport.to_string(),
                target,
                server.source_path.display().to_string(),
            ]);
        }
        table.render()
    };

    if !result.duplicates.is_empty() {
        out.push_str("\nDefined in more than one file:\n");
        for dup in &result.duplicates {
            let sites: Vec<String> = dup
                .locations
                .iter()
                .map(|l| format!("{} ({})", l.scope, l.source_path.display()))
                .collect();
            out.push_str(&format!("  {}: {}\n", dup.name, sites.join(", ")));
        }
    }

    out.push_str(&render_issues(&result.errors));
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{context, layout, write};

    #[tokio::test]
    async fn lists_servers_and_duplicates_without_secrets() {
        let (_tmp, paths) = layout();
        let project = paths.project.clone().unwrap();
        write(
            &project.join(".mcp.json"),
            r#"{"mcpServers": {"db": {"command": "pg-mcp", "args": ["--ro"], "env": {"PG_PASSWORD": "hunter2"}}}}"#,
        );
        write(
            &paths.user_config_file,
            r#"{"mcpServers": {"db": {"type": "sse", "url": "https://db.example/sse"}}}"#,
        );

        let ctx = context(&paths, OutputFormat::Table).await;
        let out = run(&ctx).unwrap();
        assert!(out.contains("pg-mcp --ro"));
        assert!(out.contains("sse"));
        assert!(out.contains("Defined in more than one file"));

        let ctx = context(&paths, OutputFormat::Json).await;
        let out = run(&ctx).unwrap();
        assert!(!out.contains("hunter2"));
    }
}
