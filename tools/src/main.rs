use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use glob::Pattern;
use tools::{decode_packet_json, format_decode_pretty, inspect_packet, InspectReport};

#[derive(Parser)]
#[command(
    name = "inputsync-tools",
    version,
    about = "inputsync packet inspection and decoding tools"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Inspect packet runs and sizes.
    Inspect {
        /// Path to the packet bytes, or a capture directory.
        packet_path: PathBuf,
        /// Encoded width of one input, in bits.
        #[arg(long)]
        payload_bits: usize,
        /// Optional glob filter when inspecting a directory.
        #[arg(long)]
        glob: Option<String>,
        /// Sort inspected packets.
        #[arg(long, value_enum)]
        sort: Option<InspectSort>,
        /// Limit the number of inspected packets (after sorting).
        #[arg(long)]
        limit: Option<usize>,
        /// Print reports as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Expand a packet into one entry per input id.
    Decode {
        /// Path to the packet bytes.
        packet_file: PathBuf,
        /// Encoded width of one input, in bits.
        #[arg(long)]
        payload_bits: usize,
        /// Output format.
        #[arg(long, value_enum, default_value_t = DecodeFormat::Json)]
        format: DecodeFormat,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum InspectSort {
    Size,
    Inputs,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum DecodeFormat {
    Json,
    Pretty,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let limits = wire::Limits::default();
    match cli.command {
        Command::Inspect {
            packet_path,
            payload_bits,
            glob,
            sort,
            limit,
            json,
        } => {
            if packet_path.is_dir() {
                let entries = collect_packet_entries(&packet_path, glob.as_deref())?;
                let mut reports = Vec::with_capacity(entries.len());
                for entry in entries {
                    let bytes = read_packet(&entry)?;
                    let report = inspect_packet(&bytes, payload_bits, &limits)
                        .with_context(|| format!("inspect {}", entry.display()))?;
                    reports.push((entry, report));
                }
                sort_reports(&mut reports, sort);
                let limit = limit.or(sort.map(|_| 10));
                if let Some(limit) = limit {
                    reports.truncate(limit);
                }
                for (path, report) in &reports {
                    if json {
                        print_json(report)?;
                    } else {
                        println!("== {} ({} bytes) ==", path.display(), report.packet_bytes);
                        print_inspect_report(report);
                    }
                }
            } else {
                let bytes = read_packet(&packet_path)?;
                let report = inspect_packet(&bytes, payload_bits, &limits)
                    .with_context(|| format!("inspect {}", packet_path.display()))?;
                if json {
                    print_json(&report)?;
                } else {
                    print_inspect_report(&report);
                }
            }
        }
        Command::Decode {
            packet_file,
            payload_bits,
            format,
        } => {
            let bytes = read_packet(&packet_file)?;
            let output = decode_packet_json(&bytes, payload_bits, &limits)
                .with_context(|| format!("decode {}", packet_file.display()))?;
            match format {
                DecodeFormat::Json => print_json(&output)?,
                DecodeFormat::Pretty => print!("{}", format_decode_pretty(&output)),
            }
        }
    }
    Ok(())
}

fn read_packet(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("read packet {}", path.display()))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("serialize json")?;
    println!("{json}");
    Ok(())
}

fn collect_packet_entries(dir: &Path, glob: Option<&str>) -> Result<Vec<PathBuf>> {
    let pattern = match glob {
        Some(value) => Some(Pattern::new(value).context("invalid glob pattern")?),
        None => None,
    };

    let mut entries = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("read dir {}", dir.display()))? {
        let path = entry?.path();
        if !path.is_file() || path.extension().is_some_and(|ext| ext == "json") {
            continue;
        }
        if let Some(pattern) = &pattern {
            let matches_path = pattern.matches_path(&path);
            let matches_name = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| pattern.matches(name));
            if !matches_path && !matches_name {
                continue;
            }
        }
        entries.push(path);
    }
    entries.sort();
    Ok(entries)
}

fn sort_reports(reports: &mut [(PathBuf, InspectReport)], sort: Option<InspectSort>) {
    match sort {
        Some(InspectSort::Size) => {
            reports.sort_by(|a, b| {
                b.1.packet_bytes
                    .cmp(&a.1.packet_bytes)
                    .then_with(|| a.0.cmp(&b.0))
            });
        }
        Some(InspectSort::Inputs) => {
            reports.sort_by(|a, b| {
                b.1.input_count
                    .cmp(&a.1.input_count)
                    .then_with(|| a.0.cmp(&b.0))
            });
        }
        None => {}
    }
}

fn print_inspect_report(report: &InspectReport) {
    let last_id = report
        .last_id
        .map_or_else(|| "n/a".to_string(), |id| id.to_string());
    println!(
        "first_id: {} last_id: {last_id} inputs: {}",
        report.first_id, report.input_count
    );
    println!(
        "packet: {} bytes, {} bytes without run merging",
        report.packet_bytes, report.expanded_bytes
    );
    println!("runs:");
    for run in &report.runs {
        println!(
            "  #{}: {} cop{} ({} payload bytes)",
            run.first_id,
            run.copies,
            if run.copies == 1 { "y" } else { "ies" },
            run.payload_bytes
        );
    }
}
