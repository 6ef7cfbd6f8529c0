use anyhow::Result;
use ccscope_core::permissions::resolve_from_fragments;

use super::{render_issues, Context};
use crate::output::{to_json, OutputFormat, Table};

pub(super) fn run(ctx: &Context, tool: Option<&str>) -> Result<String> {
    let mut result = resolve_from_fragments(&ctx.fragments);
    if let Some(needle) = tool {
        result = result.filter_tool(needle);
    }

    if ctx.format() == OutputFormat::Json {
        return to_json(&result);
    }

    if result.effective.is_empty() {
        let mut out = "No permission rules found\n".to_string();
        out.push_str(&render_issues(&result.errors));
        return Ok(out);
    }

    let mut table = Table::new(["TOOL", "PATTERN", "RULE", "SCOPE", "ALSO"]);
    for perm in &result.effective {
        let others: Vec<String> = perm
            .overrides
            .iter()
            .filter(|e| e.scope != perm.effective_scope || e.rule != perm.effective_rule)
            .map(|e| format!("{}:{}", e.scope, e.rule))
            .collect();
        table.row([
            perm.tool.clone(),
            perm.pattern.clone().unwrap_or_else(|| "*".to_string()),
            perm.effective_rule.to_string(),
            perm.effective_scope.to_string(),
            others.join(", "),
        ]);
    }

    let mut out = table.render();
    out.push_str(&format!(
        "\n{} rules across {} tool/pattern groups\n",
        result.all.len(),
        result.effective.len()
    ));
    out.push_str(&render_issues(&result.errors));
    Ok(out)
}
