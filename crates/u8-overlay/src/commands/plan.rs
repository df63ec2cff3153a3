use super::{open_loader, read_archive};
use crate::errors::CliError;
use crate::println_pad;
use crate::utils::format_size;
use camino::Utf8PathBuf;
use colored::Colorize;
use miette::Result;
use u8_overlay::ArchiveTarget;

pub struct PlanOverlayArgs {
    pub config_path: Option<Utf8PathBuf>,
    pub storage: Utf8PathBuf,
    pub path: String,
    pub archive: Option<Utf8PathBuf>,
}

pub fn plan_overlay(args: PlanOverlayArgs) -> Result<()> {
    let loader = open_loader(args.config_path.as_deref(), &args.storage)?;

    let resolution = loader.resolve_source(&args.path);
    if resolution.redirected && args.archive.is_none() {
        println_pad!(
            "{} {} {} {}",
            "🔀 Whole-file override:".bright_blue().bold(),
            args.path.bright_white(),
            "→".dimmed(),
            resolution.path.bright_cyan().bold()
        );
        println_pad!("{}", "Loose overrides are not applied on top of it.".dimmed());
        return Ok(());
    }

    let data = read_archive(&loader, &args.path, args.archive.as_deref())?;
    let plan = loader
        .plan(&args.path, &data)
        .map_err(|e| CliError::overlay(args.path.as_str(), e))?;

    let Some(plan) = plan else {
        println_pad!(
            "{} {}",
            "✓ No loose overrides for".bright_green(),
            args.path.bright_white().bold()
        );
        return Ok(());
    };

    println_pad!(
        "{} {} {}",
        "🧩 Loose overrides for".bright_blue().bold(),
        args.path.bright_cyan().bold(),
        format!("(from {})", plan.scope.dir).dimmed()
    );
    for entry in plan.set.iter() {
        let target = match &entry.target {
            ArchiveTarget::Path(path) => path.clone(),
            ArchiveTarget::Name(name) => format!("{} × {}", entry.node_count, name),
        };
        let tag = if entry.tagged {
            " [tagged]".bright_magenta().to_string()
        } else {
            String::new()
        };
        println_pad!(
            "   {} {} {} {} {}{}",
            "•".bright_cyan(),
            entry.relative_path.bright_white(),
            "→".dimmed(),
            target.bright_yellow(),
            format!("({})", format_size(u64::from(entry.size))).dimmed(),
            tag
        );
    }

    let base_size = data.len();
    println_pad!(
        "\n{} {} override(s), {} extra, buffer {:#x} → {:#x}",
        "📏 Totals:".bright_green(),
        plan.totals.applicable,
        format_size(plan.totals.total_aligned),
        base_size,
        plan.totals.required_len(base_size)
    );

    Ok(())
}
