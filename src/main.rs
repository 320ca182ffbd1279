use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod container;
mod converter;
mod discovery;
mod error;
mod extract;
mod report;
mod table;
mod utils;

use config::{AppConfig, FailurePolicy, RecordPolicy};
use converter::Converter;

#[derive(Parser, Debug)]
#[command(name = "avro-sensor-export")]
#[command(version)]
#[command(
    about = "Convert wristband Avro recordings into per-stream CSV tables",
    long_about = None
)]
struct Cli {
    /// Directory scanned recursively for containers
    #[arg(env = "AVRO_EXPORT_ROOT")]
    root: Option<PathBuf>,

    /// TOML configuration file (embedded defaults otherwise)
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Extension of the input containers
    #[arg(long)]
    extension: Option<String>,

    /// How to treat containers holding more than one record
    #[arg(long, value_enum)]
    record_policy: Option<RecordPolicy>,

    /// Stop at the first file that fails to convert
    #[arg(long)]
    fail_fast: bool,

    /// Write a JSON conversion report to this path
    #[arg(long)]
    report: Option<PathBuf>,
}

impl Cli {
    fn load_config(&self) -> Result<AppConfig> {
        let mut config = match &self.config {
            Some(path) => AppConfig::load_from(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => AppConfig::load_default()?,
        };

        if let Some(root) = &self.root {
            config.input.root = Some(root.clone());
        }
        if let Some(ext) = &self.extension {
            config.input.extension = ext.clone();
        }
        if let Some(policy) = self.record_policy {
            config.conversion.record_policy = policy;
        }
        if self.fail_fast {
            config.conversion.failure_policy = FailurePolicy::Abort;
        }
        if let Some(report) = &self.report {
            config.conversion.report_path = Some(report.clone());
        }
        Ok(config)
    }
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.load_config()?;
    init_tracing(&config.logging.level);
    info!("Starting avro_sensor_export");

    let root = config.input_root()?;
    let converter = Converter::new(config.conversion.clone());
    let report = converter
        .run(&root, &config.input.extension)
        .with_context(|| format!("converting containers under {}", root.display()))?;

    if let Some(path) = &config.conversion.report_path {
        report.write(path)?;
    }

    if report.failed > 0 {
        anyhow::bail!("{} of {} containers failed to convert", report.failed, report.total());
    }
    Ok(())
}
