//! Compile dialect files into Rust sources.
//!
//! `mavgen [--out DIR] [--jobs N] [--log LEVEL] FILE...`
//!
//! Includes are resolved by dialect name among the given files. Nothing is written unless the
//! whole run succeeds.

use anyhow::Context as _;
use clap::Parser;
use mavgen::config::{init_logging, GeneratorConfig, LoggingConfig};
use mavgen::{DialectSet, Generator, TemplateRenderer};
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "mavgen", about = "Generate message code, checksum tables and framing from dialect files")]
struct Args {
    /// Output directory.
    #[arg(long, short, default_value = "generated")]
    out: PathBuf,
    /// Threads used for per-message planning and emission.
    #[arg(long, short, default_value_t = 1)]
    jobs: usize,
    /// Log filter used when RUST_LOG is unset.
    #[arg(long, default_value = "info")]
    log: String,
    /// Disable colored log output.
    #[arg(long)]
    no_color: bool,
    /// Dialect files.
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(&LoggingConfig {
        level: args.log.clone(),
        color: !args.no_color,
    })
    .map_err(|e| anyhow::anyhow!("failed to init logging: {e}"))?;

    let mut set = DialectSet::new();
    for path in &args.files {
        let dialect = mavgen::load(path).with_context(|| format!("loading {}", path.display()))?;
        set.insert(dialect).with_context(|| format!("registering {}", path.display()))?;
    }

    let config = GeneratorConfig {
        out_dir: args.out,
        jobs: args.jobs,
        ..GeneratorConfig::default()
    };
    let generator = Generator::new(config, TemplateRenderer::new());
    let generation = generator.run(&set).context("generation failed")?;
    let out_dir = &generator.config().out_dir;
    let written = generation
        .write_to(out_dir)
        .with_context(|| format!("writing {}", out_dir.display()))?;

    info!(
        dialects = generation.dialects.len(),
        messages = generation.dispatch.len(),
        files = written,
        "done"
    );
    Ok(())
}
