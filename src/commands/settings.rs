use anyhow::Result;
use ccscope_core::settings::{resolve_from_fragments, ResolvedSetting};

use super::{render_issues, Context, Outcome};
use crate::output::{cell_value, to_json, OutputFormat, Table};

pub(super) fn run(ctx: &Context, key: Option<&str>) -> Result<Outcome> {
    let result = resolve_from_fragments(&ctx.fragments);

    if let Some(key) = key {
        let Some(setting) = result.get(key) else {
            return Ok(Outcome {
                text: format!("`{key}` is not set in any scope\n"),
                exit_code: 1,
            });
        };
        let text = match ctx.format() {
            OutputFormat::Json => to_json(setting)?,
            OutputFormat::Table => render_chain(setting),
        };
        return Ok(Outcome::ok(text));
    }

    if ctx.format() == OutputFormat::Json {
        return to_json(&result).map(Outcome::ok);
    }

    let mut table = Table::new(["KEY", "VALUE", "SCOPE", "OVERRIDES"]);
    for setting in &result.settings {
        let shadowed: Vec<String> = setting
            .overrides
            .iter()
            .skip(1)
            .map(|o| o.scope.to_string())
            .collect();
        table.row([
            setting.key.clone(),
            cell_value(&setting.effective_value),
            setting.effective_scope.to_string(),
            shadowed.join(", "),
        ]);
    }

    let mut out = if table.is_empty() {
        "No settings found\n".to_string()
    } else {
        table.render()
    };
    out.push_str(&render_issues(&result.errors));
    Ok(Outcome::ok(out))
}

/// Full override chain of one key, winner first
fn render_chain(setting: &ResolvedSetting) -> String {
    let mut table = Table::new(["", "SCOPE", "VALUE", "SOURCE"]);
    for (i, entry) in setting.overrides.iter().enumerate() {
        let marker = if i == 0 { "*" } else { "" };
        table.row([
            marker.to_string(),
            entry.scope.to_string(),
            cell_value(&entry.value),
            entry.source_path.display().to_string(),
        ]);
    }
    format!("{}\n{}", setting.key, table.render())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{context, layout, write};
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn table_shows_winner_and_shadowed_scopes() {
        let (_tmp, paths) = layout();
        write(&paths.claude_home.join("settings.json"), r#"{"theme": "dark", "model": "opus"}"#);
        let project = paths.project.clone().unwrap();
        write(&project.join(".claude/settings.local.json"), r#"{"theme": "light"}"#);

        let ctx = context(&paths, OutputFormat::Table).await;
        let outcome = run(&ctx, None).unwrap();
        let lines: Vec<&str> = outcome.text.lines().collect();

        assert_eq!(lines[2], "model  opus   user");
        assert_eq!(lines[3], "theme  light  local  user");
        assert_eq!(outcome.exit_code, 0);
    }

    #[tokio::test]
    async fn single_key_lists_chain() {
        let (_tmp, paths) = layout();
        write(&paths.claude_home.join("settings.json"), r#"{"theme": "dark"}"#);
        let project = paths.project.clone().unwrap();
        write(&project.join(".claude/settings.json"), r#"{"theme": "light"}"#);

        let ctx = context(&paths, OutputFormat::Json).await;
        let outcome = run(&ctx, Some("theme")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&outcome.text).unwrap();
        assert_eq!(value["effectiveScope"], "project");
        assert_eq!(value["overrides"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn unknown_key_exits_nonzero() {
        let (_tmp, paths) = layout();
        let ctx = context(&paths, OutputFormat::Table).await;
        let outcome = run(&ctx, Some("nope")).unwrap();
        assert_eq!(outcome.exit_code, 1);
    }

    #[tokio::test]
    async fn broken_file_is_listed_under_problems() {
        let (_tmp, paths) = layout();
        write(&paths.claude_home.join("settings.json"), "[1, 2]");
        let ctx = context(&paths, OutputFormat::Table).await;
        let outcome = run(&ctx, None).unwrap();
        assert!(outcome.text.contains("Problems:"));
        assert!(outcome.text.contains("not a JSON object"));
    }
}
