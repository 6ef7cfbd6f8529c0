use anyhow::Result;
use ccscope_core::health::{evaluate, HealthInput, HealthReport};
use ccscope_core::memory::{FsTextSource, MemoryResolver};
use ccscope_core::{hooks, mcp, permissions, settings};

use super::Context;
use crate::output::{to_json, OutputFormat, Table};

pub(super) fn run(ctx: &Context) -> Result<String> {
    let report = build(ctx);
    match ctx.format() {
        OutputFormat::Json => to_json(&report),
        OutputFormat::Table => Ok(render(&report)),
    }
}

/// Run every resolver over the snapshot, then score
fn build(ctx: &Context) -> HealthReport {
    let fragments = &ctx.fragments;
    let settings = settings::resolve_from_fragments(fragments);
    let permissions = permissions::resolve_from_fragments(fragments);
    let mcp = mcp::resolve_from_fragments(fragments, ctx.paths.project.as_deref());
    let hooks = hooks::resolve_from_fragments(fragments);
    let source = FsTextSource;
    let memory = MemoryResolver::new(&source, Some(ctx.paths.home.clone())).resolve_fragments(fragments);
    let skills = ctx
        .settings
        .health
        .include_security
        .then(|| ctx.scan_skills());

    evaluate(&HealthInput {
        fragments,
        has_project: ctx.paths.project.is_some(),
        settings: Some(&settings),
        permissions: Some(&permissions),
        mcp: Some(&mcp),
        hooks: Some(&hooks),
        memory: Some(&memory),
        skills: skills.as_ref(),
    })
}

fn render(report: &HealthReport) -> String {
    let mut out = format!("Health: {}/100 (grade {})\n\n", report.score, report.grade);

    let mut table = Table::new(["CATEGORY", "SCORE", "PASSED"]);
    for category in &report.categories {
        table.row([
            category.category.to_string(),
            category.score.to_string(),
            format!("{}/{}", category.passed_weight, category.total_weight),
        ]);
    }
    out.push_str(&table.render());

    if !report.recommendations.is_empty() {
        out.push_str("\nRecommendations:\n");
        for (i, rec) in report.recommendations.iter().enumerate() {
            out.push_str(&format!("  {}. {}\n", i + 1, rec));
        }
    }
    out
}
