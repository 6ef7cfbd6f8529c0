use anyhow::Result;
use ccscope_core::edit::{parse_value_arg, set_setting, unset_setting};
use ccscope_core::Scope;

use super::Context;

pub(super) fn set(ctx: &Context, scope: Scope, key: &str, raw: &str) -> Result<String> {
    let value = parse_value_arg(raw);
    let path = set_setting(&ctx.paths, scope, key, value.clone())?;
    Ok(format!("Set {key} = {value} in {} ({scope})\n", path.display()))
}

pub(super) fn unset(ctx: &Context, scope: Scope, key: &str) -> Result<String> {
    if unset_setting(&ctx.paths, scope, key)? {
        Ok(format!("Removed {key} from {scope} settings\n"))
    } else {
        Ok(format!("{key} is not set in {scope} settings\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{context, layout, write};
    use crate::output::OutputFormat;
    use serde_json::json;

    #[tokio::test]
    async fn set_then_unset_round_trip_through_file() {
        let (_tmp, paths) = layout();
        let project = paths.project.clone().unwrap();
        let target = project.join(".claude/settings.local.json");
        write(&target, "{\n  // keep me\n  \"theme\": \"dark\"\n}\n");

        let ctx = context(&paths, OutputFormat::Table).await;
        let out = set(&ctx, Scope::Local, "verbose", "true").unwrap();
        assert!(out.starts_with("Set verbose = true"));

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&target).unwrap()).unwrap();
        assert_eq!(written, json!({"theme": "dark", "verbose": true}));

        let out = unset(&ctx, Scope::Local, "theme").unwrap();
        assert!(out.starts_with("Removed theme"));
        let out = unset(&ctx, Scope::Local, "theme").unwrap();
        assert!(out.contains("is not set"));
    }

    #[tokio::test]
    async fn managed_scope_is_rejected() {
        let (_tmp, paths) = layout();
        let ctx = context(&paths, OutputFormat::Table).await;
        let err = set(&ctx, Scope::Managed, "theme", "dark").unwrap_err();
        assert!(err.to_string().contains("managed"));
    }
}
