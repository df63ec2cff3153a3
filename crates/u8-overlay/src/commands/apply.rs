use super::{open_loader, read_archive};
use crate::errors::CliError;
use crate::println_pad;
use crate::utils::format_size;
use camino::Utf8PathBuf;
use colored::Colorize;
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use u8_archive::{NodeKind, U8Archive};
use u8_overlay::{OverlayOutcome, OverlayReport};

pub struct ApplyOverlayArgs {
    pub config_path: Option<Utf8PathBuf>,
    pub storage: Utf8PathBuf,
    pub path: String,
    pub archive: Option<Utf8PathBuf>,
    pub json: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PatchedNode {
    path: String,
    data_offset: u32,
    size: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ApplySummary<'a> {
    source: &'a str,
    whole_file: bool,
    base_size: usize,
    final_size: usize,
    report: Option<OverlayReport>,
    patched: Vec<PatchedNode>,
}

pub fn apply_overlay(args: ApplyOverlayArgs) -> Result<()> {
    let loader = open_loader(args.config_path.as_deref(), &args.storage)?;

    let outcome = match &args.archive {
        Some(host_file) => {
            let data = read_archive(&loader, &args.path, Some(host_file.as_path()))?;
            loader.apply(&args.path, data)
        }
        None => loader.load(&args.path),
    }
    .map_err(|e| CliError::overlay(args.path.as_str(), e))?;

    let summary = ApplySummary {
        source: &outcome.source,
        whole_file: outcome.whole_file,
        base_size: outcome.base_size,
        final_size: outcome.data.len(),
        report: outcome.report,
        patched: patched_nodes(&outcome)?,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary).into_diagnostic()?);
        return Ok(());
    }

    print_summary(&args.path, &summary);
    Ok(())
}

/// File nodes whose data now lives in the appended tail.
fn patched_nodes(outcome: &OverlayOutcome) -> Result<Vec<PatchedNode>> {
    if outcome.report.is_none() {
        return Ok(Vec::new());
    }

    let archive = U8Archive::parse(&outcome.data)
        .map_err(|e| CliError::invalid_archive(outcome.source.as_str(), e))?;
    Ok(archive
        .entries()
        .into_iter()
        .filter(|e| e.kind == NodeKind::File && e.data_offset as usize >= outcome.base_size)
        .map(|e| PatchedNode {
            path: e.path,
            data_offset: e.data_offset,
            size: e.size,
        })
        .collect())
}

fn print_summary(path: &str, summary: &ApplySummary) {
    if summary.whole_file {
        println_pad!(
            "{} {} {} {} {}",
            "🔀 Whole-file override:".bright_blue().bold(),
            path.bright_white(),
            "→".dimmed(),
            summary.source.bright_cyan().bold(),
            format!("({})", format_size(summary.final_size as u64)).dimmed()
        );
        return;
    }

    let Some(report) = &summary.report else {
        println_pad!(
            "{} {}",
            "✓ No loose overrides for".bright_green(),
            path.bright_white().bold()
        );
        return;
    };

    let stats = report.stats;
    println_pad!(
        "{} {}",
        "🧩 Patched archive:".bright_blue().bold(),
        path.bright_cyan().bold()
    );
    println_pad!(
        "{} {}   {} {}   {} {}",
        "Applied:".bright_green(),
        stats.applied_overrides.to_string().bright_white().bold(),
        "Nodes:".bright_green(),
        stats.patched_nodes.to_string().bright_white().bold(),
        "Missing:".bright_green(),
        if stats.missing_overrides > 0 {
            stats.missing_overrides.to_string().bright_red().bold()
        } else {
            stats.missing_overrides.to_string().bright_white().bold()
        }
    );
    println_pad!(
        "{} {:#x} → {:#x} ({} appended)",
        "Buffer:".bright_green(),
        summary.base_size,
        summary.final_size,
        format_size(stats.bytes_appended)
    );

    if !summary.patched.is_empty() {
        println_pad!("\n{}", "📝 Repointed entries:".bright_magenta().bold());
        for node in &summary.patched {
            println_pad!(
                "   {} {} {}",
                "•".bright_cyan(),
                node.path.bright_white(),
                format!("({} @ {:#x})", format_size(u64::from(node.size)), node.data_offset)
                    .dimmed()
            );
        }
    }
}
