use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

/// What to do with a container holding more than one record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum RecordPolicy {
    /// Keep the last record read and warn about the rest.
    #[default]
    Last,
    /// Reject the container.
    ExactlyOne,
}

/// What the batch does after a file fails to convert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    #[default]
    Skip,
    Abort,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InputConfig {
    pub root: Option<PathBuf>,
    #[serde(default = "default_extension")]
    pub extension: String,
}

fn default_extension() -> String {
    "avro".to_string()
}

impl Default for InputConfig {
    fn default() -> Self {
        InputConfig { root: None, extension: default_extension() }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConversionConfig {
    #[serde(default)]
    pub record_policy: RecordPolicy,
    #[serde(default)]
    pub failure_policy: FailurePolicy,
    pub report_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig { level: default_log_level() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub conversion: ConversionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn load_default() -> anyhow::Result<Self> {
        let default = include_str!("../config/default.toml");
        let cfg: AppConfig = toml::from_str(default)?;
        Ok(cfg)
    }

    pub fn load_from(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let p = path.into();
        let s = fs::read_to_string(&p)?;
        let cfg: AppConfig = toml::from_str(&s)?;
        Ok(cfg)
    }

    /// Root directory to scan, or an error when neither the CLI, the
    /// environment nor the config file provided one.
    pub fn input_root(&self) -> anyhow::Result<PathBuf> {
        self.input.root.clone().ok_or_else(|| {
            anyhow::anyhow!(
                "no input root configured (pass ROOT, set AVRO_EXPORT_ROOT or input.root)"
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_embedded_defaults() -> anyhow::Result<()> {
        let cfg = AppConfig::load_default()?;
        assert!(cfg.input.root.is_none());
        assert_eq!(cfg.input.extension, "avro");
        assert_eq!(cfg.conversion.record_policy, RecordPolicy::Last);
        assert_eq!(cfg.conversion.failure_policy, FailurePolicy::Skip);
        assert!(cfg.conversion.report_path.is_none());
        assert_eq!(cfg.logging.level, "info");
        assert!(cfg.input_root().is_err());
        Ok(())
    }

    #[test]
    fn test_load_from_file() -> anyhow::Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(
            file,
            r#"
[input]
root = "/data/empatica"

[conversion]
record_policy = "exactly-one"
failure_policy = "abort"
report_path = "report.json"
"#
        )?;

        let cfg = AppConfig::load_from(file.path())?;
        assert_eq!(cfg.input_root()?, PathBuf::from("/data/empatica"));
        assert_eq!(cfg.input.extension, "avro");
        assert_eq!(cfg.conversion.record_policy, RecordPolicy::ExactlyOne);
        assert_eq!(cfg.conversion.failure_policy, FailurePolicy::Abort);
        assert_eq!(cfg.conversion.report_path, Some(PathBuf::from("report.json")));
        assert_eq!(cfg.logging.level, "info");
        Ok(())
    }

    #[test]
    fn test_sections_are_optional() -> anyhow::Result<()> {
        let cfg: AppConfig = toml::from_str("[logging]\nlevel = \"debug\"\n")?;
        assert_eq!(cfg.input.extension, "avro");
        assert_eq!(cfg.conversion.failure_policy, FailurePolicy::Skip);
        assert_eq!(cfg.logging.level, "debug");
        Ok(())
    }

    #[test]
    fn test_unknown_policy_rejected() {
        let raw = "[input]\n[conversion]\nrecord_policy = \"first\"\n";
        assert!(toml::from_str::<AppConfig>(raw).is_err());
    }
}
