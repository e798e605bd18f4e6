use crate::config::toml_config::ProbeConfig;
use crate::utils::error::{ProbeError, Result};
use crate::utils::validation::Validate;
use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "appraisal-probe")]
#[command(about = "Integration and diagnostic probes for the vehicle appraisal HTTP API")]
pub struct CliConfig {
    /// Base URL of the appraisal server (overrides the config file)
    #[arg(long)]
    pub base_url: Option<String>,

    /// Path to a TOML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Suites to run (comma-separated: vin,admin,ocr,analysis)
    #[arg(long, value_delimiter = ',')]
    pub suite: Vec<String>,

    /// Per-request timeout in seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Write the full report as JSON to this path
    #[arg(long)]
    pub report_json: Option<String>,

    /// Write one CSV row per check to this path
    #[arg(long)]
    pub report_csv: Option<String>,

    /// Stop after the first suite with a failing check
    #[arg(long)]
    pub fail_fast: bool,

    /// Identifier for this run
    #[arg(long)]
    pub run_id: Option<String>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub json_logs: bool,
}

impl CliConfig {
    /// 合併設定檔與命令列參數，命令列優先
    pub fn resolve(&self) -> Result<ProbeConfig> {
        let mut config = match &self.config {
            Some(path) => ProbeConfig::from_file(path).map_err(|e| ProbeError::ConfigError {
                message: format!("Failed to load config file '{}': {}", path, e),
            })?,
            None => ProbeConfig::default(),
        };

        if let Some(base_url) = &self.base_url {
            config.target.base_url = base_url.clone();
        }
        if let Some(timeout) = self.timeout_secs {
            config.target.timeout_seconds = timeout;
        }
        if !self.suite.is_empty() {
            config.suites.enabled = self.suite.clone();
        }
        if self.fail_fast {
            config.suites.fail_fast = true;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn run_id(&self) -> String {
        self.run_id
            .clone()
            .unwrap_or_else(|| format!("probe_{}", chrono::Utc::now().format("%Y%m%d_%H%M%S")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_cli_overrides_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[target]
base_url = "https://staging.example.com"
timeout_seconds = 20

[suites]
enabled = ["admin"]
"#
        )
        .unwrap();

        let cli = CliConfig::parse_from([
            "appraisal-probe",
            "--config",
            file.path().to_str().unwrap(),
            "--base-url",
            "http://localhost:4000",
            "--suite",
            "vin,ocr",
        ]);
        let config = cli.resolve().unwrap();

        assert_eq!(config.target.base_url, "http://localhost:4000");
        assert_eq!(config.target.timeout_seconds, 20);
        assert_eq!(config.enabled_suites(), vec!["vin", "ocr"]);
    }

    #[test]
    fn test_bad_suite_name_fails_validation() {
        let cli = CliConfig::parse_from(["appraisal-probe", "--suite", "vin,nope"]);
        assert!(cli.resolve().is_err());
    }

    #[test]
    fn test_missing_config_file() {
        let cli = CliConfig::parse_from(["appraisal-probe", "--config", "/nonexistent/probe.toml"]);
        let err = cli.resolve().unwrap_err();
        assert!(matches!(err, ProbeError::ConfigError { .. }));
    }

    #[test]
    fn test_resolve_leaves_vision_key_alone() {
        std::env::set_var("GEMINI_API_KEY", "unused-key");
        let config = CliConfig::parse_from(["appraisal-probe"]).resolve().unwrap();
        assert!(config.vision.api_key.is_none());
    }

    #[test]
    fn test_run_id_default_prefix() {
        let cli = CliConfig::parse_from(["appraisal-probe"]);
        assert!(cli.run_id().starts_with("probe_"));
        let cli = CliConfig::parse_from(["appraisal-probe", "--run-id", "nightly"]);
        assert_eq!(cli.run_id(), "nightly");
    }
}
