use crate::api::{GatewayOptions, DEFAULT_BASE_URL};
use crate::error::AppError;
use crate::highlight::HighlightStyle;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const API_URL_ENV: &str = "PODWATCH_API_URL";

/// Command-line flags. Anything given here wins over the config file and
/// the environment.
#[derive(Debug, Clone, Default, Parser)]
#[command(
    name = "podwatch-console",
    version,
    about = "Operator console for the podcast monitoring API"
)]
pub struct Cli {
    /// YAML config file (default: <config dir>/podwatch/config.yaml)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// API base URL, e.g. http://localhost:8000
    #[arg(long, value_name = "URL")]
    pub base_url: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Feed to select on startup
    #[arg(long, value_name = "FEED_ID")]
    pub feed: Option<String>,

    /// Mark highlights with [[brackets]] instead of ANSI colour
    #[arg(long)]
    pub no_color: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub log_level: String,
    pub color: bool,
    pub requested_feed: Option<String>,
    pub download_dir: PathBuf,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 30,
            log_level: "warn".to_string(),
            color: true,
            requested_feed: None,
            download_dir: PathBuf::from("."),
        }
    }
}

impl ConsoleConfig {
    /// Resolve the effective config for this process: defaults, then the
    /// YAML file, then `PODWATCH_API_URL` (environment or `.env` in
    /// `working_dir`), then `cli`.
    pub fn load(cli: &Cli, working_dir: &Path) -> Result<Self, AppError> {
        let mut config = match &cli.config {
            Some(path) => Self::from_file(path)?,
            None => match default_config_path().filter(|p| p.is_file()) {
                Some(path) => Self::from_file(&path)?,
                None => Self::default(),
            },
        };

        let env_url = std::env::var(API_URL_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .or_else(|| load_env_value(working_dir, API_URL_ENV));
        if let Some(url) = env_url {
            config.base_url = url;
        }

        config.apply_cli(cli);
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, AppError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(&content).map_err(|e| {
            AppError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(url) = &cli.base_url {
            self.base_url = url.clone();
        }
        if let Some(secs) = cli.timeout {
            self.timeout_secs = secs;
        }
        if let Some(feed) = &cli.feed {
            self.requested_feed = Some(feed.clone());
        }
        if cli.no_color {
            self.color = false;
        }
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.base_url.trim().is_empty() {
            return Err(AppError::Config("base_url must not be empty".to_string()));
        }
        if self.timeout_secs == 0 {
            return Err(AppError::Config(
                "timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn gateway_options(&self) -> GatewayOptions {
        GatewayOptions {
            base_url: self.base_url.trim().to_string(),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }

    pub fn highlight_style(&self) -> HighlightStyle {
        if self.color {
            HighlightStyle::Ansi
        } else {
            HighlightStyle::Brackets
        }
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("podwatch").join("config.yaml"))
}

/// Read `KEY=value` from a `.env` file in `dir`. Quotes around the value are
/// stripped; empty values count as unset.
pub fn load_env_value(dir: &Path, key: &str) -> Option<String> {
    let content = std::fs::read_to_string(dir.join(".env")).ok()?;
    let prefix = format!("{}=", key);
    content.lines().find_map(|line| {
        let value = line
            .trim()
            .strip_prefix(&prefix)?
            .trim()
            .trim_matches('"')
            .trim_matches('\'');
        (!value.is_empty()).then(|| value.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "base_url: http://monitor.internal:9000").unwrap();
        writeln!(file, "color: false").unwrap();

        let config = ConsoleConfig::from_file(&path).unwrap();
        assert_eq!(config.base_url, "http://monitor.internal:9000");
        assert!(!config.color);
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.highlight_style(), HighlightStyle::Brackets);
    }

    #[test]
    fn test_empty_file_is_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "\n").unwrap();
        assert_eq!(ConsoleConfig::from_file(&path).unwrap(), ConsoleConfig::default());
    }

    #[test]
    fn test_bad_yaml_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "timeout_secs: [not a number").unwrap();
        let err = ConsoleConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_explicit_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let cli = Cli {
            config: Some(dir.path().join("nope.yaml")),
            ..Cli::default()
        };
        assert!(ConsoleConfig::load(&cli, dir.path()).is_err());
    }

    #[test]
    fn test_cli_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "base_url: http://from-file:1\nrequested_feed: f1\n").unwrap();

        let cli = Cli::try_parse_from([
            "podwatch-console",
            "--config",
            path.to_str().unwrap(),
            "--base-url",
            "http://from-cli:2",
            "--timeout",
            "5",
            "--feed",
            "f9",
            "--no-color",
        ])
        .unwrap();

        let mut config = ConsoleConfig::from_file(&path).unwrap();
        config.apply_cli(&cli);
        assert_eq!(config.base_url, "http://from-cli:2");
        assert_eq!(config.requested_feed.as_deref(), Some("f9"));
        assert!(!config.color);
        assert_eq!(config.gateway_options().timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = ConsoleConfig {
            timeout_secs: 0,
            ..ConsoleConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_env_value_strips_quotes() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(".env"),
            "OTHER=1\nPODWATCH_API_URL=\"http://env-file:8000\"\n",
        )
        .unwrap();
        assert_eq!(
            load_env_value(dir.path(), API_URL_ENV).as_deref(),
            Some("http://env-file:8000")
        );
        assert_eq!(load_env_value(dir.path(), "MISSING"), None);
    }

    #[test]
    fn test_load_env_value_ignores_empty() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".env"), "PODWATCH_API_URL=''\n").unwrap();
        assert_eq!(load_env_value(dir.path(), API_URL_ENV), None);
    }
}
