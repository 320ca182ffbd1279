use crate::config::{ConversionConfig, FailurePolicy};
use crate::container::read_container;
use crate::discovery::discover;
use crate::error::Result;
use crate::extract;
use crate::report::ConversionReport;
use crate::table::{write_tables, Table, WrittenTable};
use std::path::{Path, PathBuf};

/// Outcome of converting one container.
#[derive(Debug, Clone)]
pub struct ConvertedFile {
    pub input: PathBuf,
    pub timezone_offset_s: i64,
    pub outputs: Vec<WrittenTable>,
}

pub struct Converter {
    config: ConversionConfig,
}

impl Converter {
    pub fn new(config: ConversionConfig) -> Self {
        Converter { config }
    }

    /// Decode `path` and build its four tables without touching the disk.
    pub fn extract_tables(&self, path: &Path) -> Result<(i64, Vec<Table>)> {
        let start = extract::filename_timestamp(path)?;
        let recording = read_container(path, self.config.record_policy)?;
        let timezone_offset_s = recording.timezone_offset()?;

        let tables = vec![
            start,
            extract::manual_tags(&recording)?,
            extract::eda(&recording)?,
            extract::cardiac(&recording)?,
        ];
        Ok((timezone_offset_s, tables))
    }

    pub fn convert_file(&self, path: &Path) -> Result<ConvertedFile> {
        let (timezone_offset_s, tables) = self.extract_tables(path)?;
        let outputs = write_tables(path, &tables)?;
        Ok(ConvertedFile { input: path.to_path_buf(), timezone_offset_s, outputs })
    }

    /// Convert every container under `root`. A failing file is logged and
    /// recorded, then the batch moves on unless the failure policy is
    /// `abort`. Only an unreadable root or an abort return `Err`.
    pub fn run(&self, root: &Path, extension: &str) -> Result<ConversionReport> {
        let mut report = ConversionReport::new(root);

        for path in discover(root, extension)? {
            tracing::info!("processing file: {}", path.display());
            match self.convert_file(&path) {
                Ok(converted) => {
                    tracing::info!("participant done: {}", path.display());
                    report.record_converted(converted);
                }
                Err(e) => {
                    tracing::error!("failed to convert {}: {}", path.display(), e);
                    report.record_failed(&path, &e);
                    if self.config.failure_policy == FailurePolicy::Abort {
                        return Err(e);
                    }
                }
            }
        }

        tracing::info!(
            "batch finished: {} converted, {} failed",
            report.converted,
            report.failed
        );
        Ok(report)
    }
}
