use anyhow::Result;
use ccscope_core::hooks::resolve_from_fragments;

use super::{render_issues, Context};
use crate::output::{to_json, OutputFormat, Table};

pub(super) fn run(ctx: &Context) -> Result<String> {
    let result = resolve_from_fragments(&ctx.fragments);

    if ctx.format() == OutputFormat::Json {
        return to_json(&result);
    }

    let mut out = String::new();
    if result.hooks.is_empty() {
        out.push_str("No hooks configured\n");
    } else {
        let mut table = Table::new(["EVENT", "MATCHER", "COMMAND", "TIMEOUT", "SCOPE"]);
        for event in &result.hooks {
            for matcher in &event.matchers {
                for hook in &matcher.hooks {
                    table.row([
                        event.event.clone(),
                        matcher.matcher.clone().unwrap_or_else(|| "*".to_string()),
                        hook.command.clone(),
                        hook.timeout.map(|t| format!("{t}s")).unwrap_or_default(),
                        event.scope.to_string(),
                    ]);
                }
            }
        }
        out.push_str(&table.render());
    }

    if !result.unconfigured_events.is_empty() {
        out.push_str(&format!(
            "\nUnconfigured events: {}\n",
            result.unconfigured_events.join(", ")
        ));
    }
    out.push_str(&render_issues(&result.errors));
    Ok(out)
}
