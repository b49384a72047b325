use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use itertools::Itertools;
use mimalloc::MiMalloc;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

use repomap::Options;
use repomap_extract::{CtagsTagSource, RipgrepSearch};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// Index a C source tree into a JSON structure map plus SVG diagrams of
/// its include and call relations.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// Repository root to index
    #[arg(default_value = ".")]
    repo: PathBuf,

    /// Path of the merged JSON artifact
    #[arg(short, long, default_value = "code_structure.json")]
    output: PathBuf,

    /// Render an extra call diagram scoped to this file (repeatable)
    #[arg(long = "focus-file", value_name = "FILE")]
    focus_files: Vec<String>,

    /// Render an extra call diagram scoped to this directory (repeatable)
    #[arg(long = "focus-dir", value_name = "DIR")]
    focus_dirs: Vec<String>,

    #[command(flatten)]
    verbose: Verbosity<InfoLevel>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays clean. Default to warn, allowlist
    // our crates at the requested level.
    const CRATES: &[&str] = &[
        "repomap",
        "repomap_extract",
        "repomap_schemas",
        "repomap_viz",
    ];
    let level = cli.verbose.tracing_level_filter();
    let allowlist = CRATES.iter().map(|c| format!("{c}={level}")).join(",");
    let filter = EnvFilter::new(format!("warn,{allowlist}"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_span_events(FmtSpan::ENTER | FmtSpan::CLOSE)
        .init();

    let options = Options {
        repo: cli.repo,
        artifact: cli.output,
        diagram_dir: PathBuf::from("."),
        focus_files: cli.focus_files,
        focus_dirs: cli.focus_dirs,
    };
    repomap::run(&options, &CtagsTagSource::new(), &RipgrepSearch::new())?;
    Ok(())
}
