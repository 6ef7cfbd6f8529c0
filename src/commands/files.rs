use anyhow::Result;

use super::Context;
use crate::output::{to_json, OutputFormat, Table};

pub(super) fn run(ctx: &Context) -> Result<String> {
    if ctx.format() == OutputFormat::Json {
        return to_json(&ctx.fragments);
    }

    let mut table = Table::new(["SCOPE", "TYPE", "STATUS", "PATH"]);
    for fragment in &ctx.fragments {
        let status = match (&fragment.error, fragment.exists) {
            (Some(_), _) => "error",
            (None, true) => "ok",
            (None, false) => "missing",
        };
        table.row([
            fragment.scope.to_string(),
            fragment.file_type.to_string(),
            status.to_string(),
            fragment.path.display().to_string(),
        ]);
    }

    let found = ctx.fragments.iter().filter(|f| f.exists).count();
    let mut out = table.render();
    out.push_str(&format!("\n{} of {} locations present\n", found, ctx.fragments.len()));
    for fragment in ctx.fragments.iter().filter(|f| f.error.is_some()) {
        if let Some(error) = &fragment.error {
            out.push_str(&format!("  {}: {}\n", fragment.path.display(), error));
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{context, layout, write};

    #[tokio::test]
    async fn lists_present_missing_and_broken_files() {
        let (_tmp, paths) = layout();
        write(&paths.claude_home.join("settings.json"), r#"{"theme": "dark"}"#);
        let project = paths.project.clone().unwrap();
        write(&project.join(".claude/settings.json"), "{ nope");

        let ctx = context(&paths, OutputFormat::Table).await;
        let out = run(&ctx).unwrap();

        assert!(out.starts_with("SCOPE"));
        assert!(out.contains("missing"));
        assert!(out.contains("error"));
        assert!(out.contains("2 of "));
        assert!(out.contains("parse error"));
    }

    #[tokio::test]
    async fn json_output_uses_fragment_shape() {
        let (_tmp, paths) = layout();
        let ctx = context(&paths, OutputFormat::Json).await;
        let out = run(&ctx).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        let first = &value.as_array().unwrap()[0];
        assert_eq!(first["scope"], "managed");
        assert_eq!(first["exists"], false);
        assert!(first.get("type").is_some());
    }
}
