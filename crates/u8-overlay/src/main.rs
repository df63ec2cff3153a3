use camino::Utf8PathBuf;
use clap::builder::{styling::AnsiColor, Styles};
use clap::ColorChoice;
use clap::{CommandFactory, FromArgMatches, Parser, Subcommand};
use commands::{
    apply_overlay, init_config, inspect_archive, plan_overlay, resolve_whole_file, show_config,
    ApplyOverlayArgs, InspectArchiveArgs, PlanOverlayArgs, ResolveWholeFileArgs,
};
use miette::Result;

mod commands;
mod errors;
mod utils;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Overlay configuration file (defaults to overlay.toml next to the executable)
    #[arg(short, long, global = true)]
    config: Option<Utf8PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the entries of a decompressed U8 archive
    Inspect {
        /// The path to the archive file
        #[arg(short, long)]
        file_path: Utf8PathBuf,

        /// Print the entries as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show which overrides would be applied to an archive
    Plan {
        /// Host directory standing in for the storage root
        #[arg(short, long)]
        storage: Utf8PathBuf,

        /// Virtual path of the archive, e.g. /UI/Award.szs
        #[arg(short, long)]
        path: String,

        /// Decompressed archive on the host to plan against instead of reading
        /// `path` from storage
        #[arg(short, long)]
        archive: Option<Utf8PathBuf>,
    },
    /// Load an archive through the overlay and report what was patched
    Apply {
        /// Host directory standing in for the storage root
        #[arg(short, long)]
        storage: Utf8PathBuf,

        /// Virtual path of the archive, e.g. /UI/Award.szs
        #[arg(short, long)]
        path: String,

        /// Decompressed archive on the host to patch instead of reading `path`
        /// from storage
        #[arg(short, long)]
        archive: Option<Utf8PathBuf>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show where a whole-file load would be redirected
    Resolve {
        /// Host directory standing in for the storage root
        #[arg(short, long)]
        storage: Utf8PathBuf,

        /// Virtual path to resolve
        #[arg(short, long)]
        path: String,
    },
    /// Manage the overlay configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show the effective configuration
    Show,
    /// Write a default overlay.toml next to the executable
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn parse_args() -> Args {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default().bold())
        .usage(AnsiColor::Green.on_default().bold())
        .literal(AnsiColor::Cyan.on_default())
        .placeholder(AnsiColor::Blue.on_default());

    let matches = Args::command()
        .styles(styles)
        .color(ColorChoice::Auto)
        .get_matches();

    Args::from_arg_matches(&matches).unwrap_or_else(|e| e.exit())
}

fn init_logging() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "u8_overlay=info,u8_archive=warn".into());

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    init_logging();
    let args = parse_args();
    let config_path = args.config;

    match args.command {
        Commands::Inspect { file_path, json } => {
            inspect_archive(InspectArchiveArgs { file_path, json })
        }
        Commands::Plan {
            storage,
            path,
            archive,
        } => plan_overlay(PlanOverlayArgs {
            config_path,
            storage,
            path,
            archive,
        }),
        Commands::Apply {
            storage,
            path,
            archive,
            json,
        } => apply_overlay(ApplyOverlayArgs {
            config_path,
            storage,
            path,
            archive,
            json,
        }),
        Commands::Resolve { storage, path } => resolve_whole_file(ResolveWholeFileArgs {
            config_path,
            storage,
            path,
        }),
        Commands::Config { action } => match action {
            ConfigAction::Show => show_config(config_path),
            ConfigAction::Init { force } => init_config(force),
        },
    }
}
