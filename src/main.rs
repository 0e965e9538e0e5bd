use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, SystemTime};
use walkdir::WalkDir;

mod assemble;
mod canary;
mod content;
mod discover;
mod pipeline;
mod transform;
mod version;

use canary::GateMode;
use pipeline::{BuildCommand, BuildOptions};

#[derive(Parser, Debug)]
#[command(name = "plb", version, about = "Plain-language license site assembler")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build the site once; the canary gates the result
    Build(BuildArgs),
    /// Rebuild on changes with a soft gate
    Serve(ServeArgs),
    /// Production build for deployment
    Deploy(BuildArgs),
    /// Promote development versions for release
    BumpVersion(BumpArgs),
}

#[derive(Parser, Debug)]
struct BuildArgs {
    /// Docs tree containing licenses/<category>/<slug>/index.md
    #[arg(long, default_value = "docs")]
    docs_dir: PathBuf,

    /// Output directory for assembled pages
    #[arg(long, default_value = "site")]
    out_dir: PathBuf,

    /// Log canary failures instead of failing the build
    #[arg(long)]
    soft_gate: bool,

    /// Wrap width for the plaintext representation
    #[arg(long, default_value_t = pipeline::DEFAULT_WRAP_WIDTH)]
    wrap_width: usize,
}

#[derive(Parser, Debug)]
struct ServeArgs {
    #[command(flatten)]
    build: BuildArgs,

    /// Seconds between change polls
    #[arg(long, default_value_t = 2)]
    poll_seconds: u64,

    /// Build once and exit instead of watching
    #[arg(long)]
    once: bool,
}

#[derive(Parser, Debug)]
struct BumpArgs {
    /// Docs tree containing licenses/<category>/<slug>/index.md
    #[arg(long, default_value = "docs")]
    docs_dir: PathBuf,
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => ExitCode::from(code),
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::from(1)
        }
    }
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<u8> {
    match cli.command {
        Commands::Build(args) => run_once(&args, BuildCommand::Build),
        Commands::Deploy(args) => run_once(&args, BuildCommand::Deploy),
        Commands::Serve(args) => run_serve(&args),
        Commands::BumpVersion(args) => run_bump(&args),
    }
}

fn build_options(args: &BuildArgs, command: BuildCommand) -> BuildOptions {
    let gate_mode = if args.soft_gate || command == BuildCommand::Serve {
        GateMode::Soft
    } else {
        GateMode::Hard
    };
    BuildOptions {
        docs_dir: args.docs_dir.clone(),
        out_dir: args.out_dir.clone(),
        command,
        gate_mode,
        wrap_width: args.wrap_width,
    }
}

fn run_once(args: &BuildArgs, command: BuildCommand) -> Result<u8> {
    let options = build_options(args, command);
    let report = pipeline::run_build(&options)?;
    Ok(pipeline::gate_exit(&report, options.gate_mode))
}

fn run_serve(args: &ServeArgs) -> Result<u8> {
    let options = build_options(&args.build, BuildCommand::Serve);
    loop {
        match pipeline::run_build(&options) {
            Ok(report) => {
                pipeline::gate_exit(&report, options.gate_mode);
            }
            Err(error) => tracing::error!(error = %error, "build failed"),
        }
        if args.once {
            return Ok(0);
        }
        wait_for_change(&options.docs_dir, args.poll_seconds)?;
        tracing::info!("change detected, rebuilding");
    }
}

/// Block until something under `docs_dir` changes, by polling a cheap
/// fingerprint of the tree.
fn wait_for_change(docs_dir: &Path, poll_seconds: u64) -> Result<()> {
    let baseline = tree_fingerprint(docs_dir);
    loop {
        std::thread::sleep(Duration::from_secs(poll_seconds.max(1)));
        if tree_fingerprint(docs_dir) != baseline {
            return Ok(());
        }
    }
}

/// File count plus newest modification time; enough to notice edits,
/// additions, and deletions between polls.
fn tree_fingerprint(docs_dir: &Path) -> (usize, Option<SystemTime>) {
    let mut count = 0;
    let mut newest: Option<SystemTime> = None;
    for entry in WalkDir::new(docs_dir).into_iter().flatten() {
        if !entry.file_type().is_file() {
            continue;
        }
        count += 1;
        if let Ok(meta) = entry.metadata() {
            if let Ok(modified) = meta.modified() {
                newest = Some(newest.map_or(modified, |current| current.max(modified)));
            }
        }
    }
    (count, newest)
}

fn run_bump(args: &BumpArgs) -> Result<u8> {
    let pages = discover::discover(&args.docs_dir)?;
    let mut bumped = 0;
    for (slug, page) in &pages {
        if !page.dir.join("package.json").is_file() {
            continue;
        }
        let version = version::bump_development(&page.dir)?;
        tracing::info!(slug = %slug, version = %version, "version resolved");
        bumped += 1;
    }
    tracing::info!(checked = bumped, total = pages.len(), "version bump complete");
    Ok(0)
}
