//! Command-line front end for the content security pipeline.
//!
//! `gatehouse scan` runs one document through sanitize → scan → package and
//! prints the verdict; a quarantined document exits nonzero so shell
//! pipelines can gate on it. `gatehouse seed` validates a TOML seed
//! manifest and emits the minted source records as JSON lines.

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};

use gatehouse::config::PolicyBuilder;
use gatehouse::pipeline::ContentPipeline;
use gatehouse::record::SeedManifest;

#[derive(Parser)]
#[command(name = "gatehouse", version)]
#[command(about = "Content security pipeline for LLM-bound fetched text")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a document and print the verdict
    Scan {
        /// Content to scan ("-" or absent reads stdin)
        input: Option<String>,

        /// Read content from a file instead
        #[arg(short, long, conflicts_with = "input")]
        file: Option<PathBuf>,

        /// Source label stamped on the serving container
        #[arg(short, long, default_value = "cli")]
        label: String,

        /// Policy file (TOML, YAML, or JSON); env overrides still apply
        #[arg(short, long)]
        policy: Option<PathBuf>,

        /// Emit the verdict as JSON
        #[arg(long)]
        json: bool,

        /// Also print the sandboxed container when the document is served
        #[arg(long)]
        wrapped: bool,
    },

    /// Validate a seed manifest and emit source records as JSON lines
    Seed {
        /// Manifest path (TOML)
        #[arg(short, long)]
        manifest: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Scan {
            input,
            file,
            label,
            policy,
            json,
            wrapped,
        } => cmd_scan(input, file.as_deref(), &label, policy.as_deref(), json, wrapped),
        Commands::Seed { manifest } => cmd_seed(&manifest),
    }
}

fn read_content(input: Option<String>, file: Option<&Path>) -> anyhow::Result<String> {
    if let Some(path) = file {
        return std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()));
    }
    match input.as_deref() {
        None | Some("-") => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("reading stdin")?;
            Ok(buffer)
        }
        Some(text) => Ok(text.to_string()),
    }
}

fn cmd_scan(
    input: Option<String>,
    file: Option<&Path>,
    label: &str,
    policy_file: Option<&Path>,
    json: bool,
    wrapped: bool,
) -> anyhow::Result<()> {
    let content = read_content(input, file)?;

    let mut builder = PolicyBuilder::new();
    if let Some(path) = policy_file {
        builder = builder.with_file(path)?;
    }
    let policy = builder.with_env().build()?;
    let threshold = policy.threshold;

    let pipeline = ContentPipeline::new(policy)?;
    let report = pipeline.process(&content, label);

    if json {
        let out = serde_json::json!({
            "safe": report.scan.safe,
            "score": report.scan.score,
            "threshold": threshold,
            "quarantined": report.disposition.is_quarantined(),
            "invisible": report.invisible,
            "flags": report.scan.flags,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else if report.scan.safe {
        println!("SAFE: score {} under threshold {threshold}", report.scan.score);
    } else {
        println!(
            "UNSAFE: score {} at threshold {threshold} ({} flags)",
            report.scan.score,
            report.scan.flags.len()
        );
        for flag in &report.scan.flags {
            match flag.line {
                Some(line) => {
                    println!("  [{}] {} (line {line}): {}", flag.severity, flag.rule, flag.detail);
                }
                None => println!("  [{}] {}: {}", flag.severity, flag.rule, flag.detail),
            }
        }
    }

    if wrapped {
        if let Some(text) = report.disposition.sandboxed_text() {
            println!();
            println!("{text}");
        }
    }

    if report.disposition.is_quarantined() {
        std::process::exit(1);
    }
    Ok(())
}

fn cmd_seed(manifest: &Path) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(manifest)
        .with_context(|| format!("reading {}", manifest.display()))?;
    let sources = SeedManifest::parse(&text)?.into_sources()?;

    for source in &sources {
        println!("{}", serde_json::to_string(source)?);
    }
    eprintln!("{} source(s) validated", sources.len());
    Ok(())
}
