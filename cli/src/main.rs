// Licensed under the Apache-2.0 license

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser};
use log::{info, LevelFilter};
use registers_generator::{generate_c_header_from_file, FilterConfig, OutputConfig};
use simple_logger::SimpleLogger;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

#[derive(Parser, Debug)]
#[command(
    name = "regdef",
    author,
    version,
    about = "Generate a C register header from a device description"
)]
struct Cli {
    #[command(flatten)]
    input: Input,

    /// Header file to write
    #[arg(short, long, value_name = "FILE", required_unless_present = "check")]
    output: Option<PathBuf>,

    /// Generate without writing anything
    #[arg(long)]
    check: bool,

    /// Skip the peripheral instance with this id (case-insensitive)
    #[arg(long = "exclude", value_name = "ID")]
    exclude: Vec<String>,

    /// Column at which comments are wrapped
    #[arg(long, value_name = "N", default_value_t = 100)]
    comment_width: usize,

    /// Comment line placed at the top of the header
    #[arg(long = "banner", value_name = "TEXT")]
    banner: Vec<String>,

    /// Increase log output (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

/// Description source; exactly one is required.
#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct Input {
    /// Top-level TI device XML
    #[arg(long = "ti-xml", value_name = "FILE")]
    ti_xml: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let level = match cli.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    SimpleLogger::new()
        .with_level(level)
        .init()
        .context("failed to initialize logging")?;

    let input = cli
        .input
        .ti_xml
        .as_deref()
        .context("no device description given")?;

    let filter = cli
        .exclude
        .iter()
        .fold(FilterConfig::new(), |config, id| config.exclude_name(id));
    let output_config = cli.banner.iter().fold(
        OutputConfig::new().comment_width(cli.comment_width),
        |config, line| config.add_banner_line(line),
    );

    let header = generate_c_header_from_file(input, &filter, &output_config)?;

    match cli.output.as_deref() {
        Some(output) if !cli.check => {
            write_atomically(output, &header)?;
            info!("wrote {} ({} bytes)", output.display(), header.len());
        }
        _ => println!("Would generate {} bytes", header.len()),
    }
    Ok(())
}

/// Writes `contents` to a temporary file next to `path` and renames it into
/// place, so `path` is either untouched or complete.
fn write_atomically(path: &Path, contents: &str) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = NamedTempFile::new_in(dir)
        .with_context(|| format!("failed to create temporary file in {}", dir.display()))?;
    file.write_all(contents.as_bytes())
        .with_context(|| format!("failed to write {}", file.path().display()))?;
    file.persist(path)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}
