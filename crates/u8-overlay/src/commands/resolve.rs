use super::open_loader;
use crate::println_pad;
use camino::Utf8PathBuf;
use colored::Colorize;
use miette::Result;

pub struct ResolveWholeFileArgs {
    pub config_path: Option<Utf8PathBuf>,
    pub storage: Utf8PathBuf,
    pub path: String,
}

pub fn resolve_whole_file(args: ResolveWholeFileArgs) -> Result<()> {
    let loader = open_loader(args.config_path.as_deref(), &args.storage)?;
    let resolution = loader.resolve_source(&args.path);

    if resolution.redirected {
        println_pad!(
            "{} {} {} {}",
            "🔀".bright_blue(),
            args.path.bright_white(),
            "→".dimmed(),
            resolution.path.bright_cyan().bold()
        );
    } else {
        println_pad!(
            "{} {} {}",
            "✓".bright_green(),
            args.path.bright_white(),
            "(no whole-file override)".dimmed()
        );
    }

    Ok(())
}
