use anyhow::Result;
use ccscope_core::security::{SkillScanResult, SkillStatus};

use super::{Context, Outcome};
use crate::output::{to_json, OutputFormat, Table};

pub(super) fn run(ctx: &Context) -> Result<Outcome> {
    let result = ctx.scan_skills();
    let exit_code = result.summary.exit_code();
    tracing::debug!(
        total = result.summary.total,
        danger = result.summary.danger,
        warning = result.summary.warning,
        exit_code,
        "Skill scan complete"
    );

    let text = match ctx.format() {
        OutputFormat::Json => to_json(&result)?,
        OutputFormat::Table => render(&result),
    };
    Ok(Outcome { text, exit_code })
}

fn render(result: &SkillScanResult) -> String {
    if result.entries.is_empty() {
        return "No skills or commands found\n".to_string();
    }

    let mut table = Table::new(["STATUS", "KIND", "SCOPE", "NAME", "FINDINGS"]);
    for entry in &result.entries {
        table.row([
            entry.status.to_string(),
            entry
                .source_kind
                .map(|k| k.to_string())
                .unwrap_or_default(),
            entry.scope.to_string(),
            entry.name.clone(),
            entry.findings.len().to_string(),
        ]);
    }
    let mut out = table.render();

    for entry in result
        .entries
        .iter()
        .filter(|e| e.status != SkillStatus::Clean)
    {
        out.push_str(&format!("\n{} ({})\n", entry.name, entry.path.display()));
        for finding in &entry.findings {
            let location = finding
                .line
                .map(|l| format!("line {l}"))
                .unwrap_or_else(|| "file".to_string());
            out.push_str(&format!(
                "  [{}] {} {}: {}\n",
                finding.severity, finding.rule_id, location, finding.message
            ));
            if let Some(snippet) = &finding.snippet {
                out.push_str(&format!("      {snippet}\n"));
            }
        }
    }

    let s = &result.summary;
    out.push_str(&format!(
        "\n{} scanned: {} clean, {} info, {} warning, {} danger\n",
        s.total, s.clean, s.info, s.warning, s.danger
    ));
    out
}
