//! Generator settings and logging setup.

use std::path::PathBuf;
use tracing_subscriber::util::TryInitError;

/// Settings of one generation run. The `mavgen` binary maps its flags onto this.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorConfig {
    /// Directory emissions are written under.
    pub out_dir: PathBuf,
    /// Threads used for per-message planning and emission (1 = on the calling thread).
    pub jobs: usize,
    /// Crate path used in generated `use` statements.
    pub runtime_crate: String,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            out_dir: PathBuf::from("generated"),
            jobs: 1,
            runtime_crate: "mavgen".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset, e.g. `info` or `mavgen=debug`.
    pub level: String,
    pub color: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "info".to_string(),
            color: true,
        }
    }
}

/// Install the global `tracing` subscriber. `RUST_LOG` wins over the configured level.
pub fn init_logging(config: &LoggingConfig) -> Result<(), TryInitError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_ansi(config.color).with_writer(std::io::stderr))
        .try_init()
}
