use anyhow::Result;
use ccscope_core::memory::{FsTextSource, MemoryResolver};

use super::{render_issues, Context};
use crate::output::{to_json, OutputFormat, Table};

pub(super) fn run(ctx: &Context) -> Result<String> {
    let source = FsTextSource;
    let resolver = MemoryResolver::new(&source, Some(ctx.paths.home.clone()));
    let result = resolver.resolve_fragments(&ctx.fragments);

    if ctx.format() == OutputFormat::Json {
        return to_json(&result);
    }

    if result.files.is_empty() {
        let mut out = "No memory files found\n".to_string();
        out.push_str(&render_issues(&result.errors));
        return Ok(out);
    }

    let mut table = Table::new(["SCOPE", "IMPORTS", "REACHABLE", "CYCLE", "PATH"]);
    for file in &result.files {
        table.row([
            file.scope.to_string(),
            file.imports.len().to_string(),
            file.import_chain.len().to_string(),
            if file.has_circular { "yes" } else { "" }.to_string(),
            file.path.display().to_string(),
        ]);
    }
    let mut out = table.render();

    for file in result.files.iter().filter(|f| !f.import_chain.is_empty()) {
        out.push_str(&format!("\n{}\n", file.path.display()));
        for path in &file.import_chain {
            let marker = if file.circular_at.as_deref() == Some(path.as_path()) {
                " (cycle)"
            } else {
                ""
            };
            out.push_str(&format!("  -> {}{}\n", path.display(), marker));
        }
    }

    if !result.broken_imports.is_empty() {
        out.push_str("\nBroken imports:\n");
        for broken in &result.broken_imports {
            out.push_str(&format!(
                "  {}: @{} -> {} ({})\n",
                broken.source_path.display(),
                broken.raw,
                broken.resolved_path.display(),
                broken.error
            ));
        }
    }

    out.push_str(&format!(
        "\n{} imports, {} broken\n",
        result.total_imports, result.total_broken
    ));
    out.push_str(&render_issues(&result.errors));
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{context, layout, write};

    #[tokio::test]
    async fn reports_cycles_and_broken_imports() {
        let (_tmp, paths) = layout();
        let project = paths.project.clone().unwrap();
        write(&project.join("CLAUDE.md"), "@notes.md and @gone.md\n");
        write(&project.join("notes.md"), "back to @CLAUDE.md\n");

        let ctx = context(&paths, OutputFormat::Table).await;
        let out = run(&ctx).unwrap();
        assert!(out.contains("(cycle)"));
        assert!(out.contains("@gone.md"));
        assert!(out.contains("(file not found)"));
        assert!(out.contains("2 imports, 1 broken"));
    }

    #[tokio::test]
    async fn empty_layout_has_no_files() {
        let (_tmp, paths) = layout();
        let ctx = context(&paths, OutputFormat::Table).await;
        assert_eq!(run(&ctx).unwrap(), "No memory files found\n");
    }
}
