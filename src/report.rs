use crate::converter::ConvertedFile;
use crate::error::{ConvertError, Result};
use crate::table::write_atomic;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Summary of one batch run, written as JSON when a report path is set.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionReport {
    pub generated_at_unix_ms: u128,
    pub root: PathBuf,
    pub converted: usize,
    pub failed: usize,
    pub files: Vec<FileReport>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Converted,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub input: PathBuf,
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone_offset_s: Option<i64>,
    pub outputs: Vec<OutputInfo>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OutputInfo {
    pub table: &'static str,
    pub path: PathBuf,
    pub rows: usize,
    pub sha256: String,
}

impl ConversionReport {
    pub fn new(root: &Path) -> Self {
        ConversionReport {
            generated_at_unix_ms: std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_millis(),
            root: root.to_path_buf(),
            converted: 0,
            failed: 0,
            files: Vec::new(),
        }
    }

    pub fn record_converted(&mut self, file: ConvertedFile) {
        self.converted += 1;
        self.files.push(FileReport {
            input: file.input,
            status: FileStatus::Converted,
            error: None,
            timezone_offset_s: Some(file.timezone_offset_s),
            outputs: file
                .outputs
                .into_iter()
                .map(|t| OutputInfo {
                    table: t.kind.suffix(),
                    path: t.path,
                    rows: t.rows,
                    sha256: t.sha256,
                })
                .collect(),
        });
    }

    pub fn record_failed(&mut self, input: &Path, error: &ConvertError) {
        self.failed += 1;
        self.files.push(FileReport {
            input: input.to_path_buf(),
            status: FileStatus::Failed,
            error: Some(error.to_string()),
            timezone_offset_s: None,
            outputs: Vec::new(),
        });
    }

    pub fn total(&self) -> usize {
        self.files.len()
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(|e| {
            ConvertError::io(path, std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })?;
        write_atomic(path, json.as_bytes())?;
        tracing::info!("conversion report written: {}", path.display());
        Ok(())
    }
}
