use crate::errors::CliError;
use crate::utils::config::{self, ConfigSource};
use camino::Utf8PathBuf;
use colored::Colorize;
use miette::Result;
use u8_overlay::{OverlayConfig, OverrideLayout};

fn print_field(name: &str, value: impl std::fmt::Display) {
    println!("  {} {}", format!("{}:", name).bright_white(), value);
}

pub fn show_config(config_path: Option<Utf8PathBuf>) -> Result<()> {
    let (cfg, source) = config::load_config(config_path.as_deref())?;

    println!();
    match source {
        ConfigSource::File(path) => print_field("config_file", path),
        ConfigSource::Defaults => print_field("config_file", "(defaults)".bright_yellow()),
    }

    print_field("root", cfg.root.bright_cyan());
    print_field(
        "layout",
        match cfg.layout {
            OverrideLayout::Mirrored => "mirrored",
            OverrideLayout::Shared => "shared",
        },
    );
    print_field("archive_extension", &cfg.archive_extension);
    print_field("alignment", format!("{:#x}", cfg.alignment));
    print_field("max_path", cfg.max_path);
    print_field("max_name", cfg.max_name);
    print_field("max_overrides", cfg.max_overrides);
    println!();

    Ok(())
}

pub fn init_config(force: bool) -> Result<()> {
    let path = config::default_config_path()
        .ok_or_else(|| miette::miette!("Could not determine config path"))?;

    if path.as_std_path().exists() && !force {
        return Err(CliError::ConfigExists { path }.into());
    }

    config::save_config(&OverlayConfig::default(), &path)
        .map_err(|e| miette::miette!("Failed to write config: {}", e))?;

    println!(
        "{}",
        "✓ Default configuration written".bright_green().bold()
    );
    println!();
    println!("  {} {}", "Config file:".bright_white().bold(), path);

    Ok(())
}
