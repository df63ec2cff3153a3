use crate::errors::CliError;
use crate::println_pad;
use crate::utils::{format_size, read_host_file};
use camino::Utf8PathBuf;
use colored::Colorize;
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use u8_archive::{NodeKind, U8Archive};

pub struct InspectArchiveArgs {
    pub file_path: Utf8PathBuf,
    pub json: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EntryRow<'a> {
    index: usize,
    path: &'a str,
    kind: &'static str,
    data_offset: u32,
    size: u32,
}

pub fn inspect_archive(args: InspectArchiveArgs) -> Result<()> {
    let data = read_host_file(&args.file_path)?;
    let archive = U8Archive::parse(&data)
        .map_err(|e| CliError::invalid_archive(args.file_path.as_str(), e))?;
    let entries = archive.entries();

    if args.json {
        let rows: Vec<EntryRow> = entries
            .iter()
            .map(|entry| EntryRow {
                index: entry.index,
                path: &entry.path,
                kind: match entry.kind {
                    NodeKind::File => "file",
                    NodeKind::Directory => "directory",
                },
                data_offset: entry.data_offset,
                size: entry.size,
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows).into_diagnostic()?);
        return Ok(());
    }

    let files = entries.iter().filter(|e| e.kind == NodeKind::File).count();
    println_pad!(
        "{} {}",
        "📦 Archive:".bright_blue().bold(),
        args.file_path.as_str().bright_cyan().bold()
    );
    println_pad!(
        "{} {} nodes, {} files, data at {:#x}, {}",
        "📐 Layout:".bright_green(),
        archive.len(),
        files,
        archive.header().data_offset,
        format_size(data.len() as u64)
    );

    println_pad!("\n{}", "🗂️  Entries:".bright_magenta().bold());
    for entry in &entries {
        let depth = entry.path.matches('/').count();
        let indent = "  ".repeat(depth);
        match entry.kind {
            NodeKind::Directory => {
                println_pad!("   {}{}", indent, format!("{}/", entry.name).bright_yellow())
            }
            NodeKind::File => println_pad!(
                "   {}{} {}",
                indent,
                entry.name.bright_white(),
                format!("({} @ {:#x})", format_size(u64::from(entry.size)), entry.data_offset)
                    .dimmed()
            ),
        }
    }

    Ok(())
}
