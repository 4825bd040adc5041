use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use camino::Utf8PathBuf;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::domain::MissingPathPolicy;
use crate::error::ResolverError;
use crate::remote::{ANONYMOUS, DEFAULT_CONNECT_TIMEOUT, DEFAULT_HOST, DEFAULT_PORT, FtpSettings};
use crate::resolver::DEFAULT_ROOT;
use crate::retry::{Backoff, BackoffKind, DEFAULT_DELAY, DEFAULT_MAX_ATTEMPTS, RetryPolicy};

pub const CONFIG_FILE_NAME: &str = "dbsnp-build.json";
pub const SCHEMA_VERSION: u32 = 1;
pub const DEFAULT_INPUT: &str = "EBI_nonhuman_VR_71_VR_69.csv";
pub const DEFAULT_OUTPUT: &str = "EBI_nonhuman_VR_71_VR_69.output.csv";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub input: Option<String>,
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub delimiter: Option<String>,
    #[serde(default)]
    pub ftp: FtpConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub missing_path: Option<MissingPathPolicy>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct FtpConfig {
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub root: Option<String>,
    #[serde(default)]
    pub connect_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct RetryConfig {
    #[serde(default)]
    pub max_attempts: Option<u32>,
    #[serde(default)]
    pub delay_secs: Option<u64>,
    #[serde(default)]
    pub backoff: Option<BackoffKind>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub input: Utf8PathBuf,
    pub output: Utf8PathBuf,
    pub delimiter: u8,
    pub ftp: FtpSettings,
    pub root: String,
    pub retry: RetryPolicy,
    pub missing_path: MissingPathPolicy,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads `path` if given. Otherwise tries `dbsnp-build.json` in the
    /// current directory, then the user config directory, then defaults.
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, ResolverError> {
        let config_path = match path {
            Some(path) => Some(PathBuf::from(path)),
            None => default_config_paths().into_iter().find(|path| path.exists()),
        };

        let config = match config_path {
            Some(config_path) => {
                let content = fs::read_to_string(&config_path)
                    .map_err(|_| ResolverError::ConfigRead(config_path.clone()))?;
                serde_json::from_str(&content)
                    .map_err(|err| ResolverError::ConfigParse(err.to_string()))?
            }
            None => Config::default(),
        };

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, ResolverError> {
        let schema_version = config.schema_version.unwrap_or(SCHEMA_VERSION);
        if schema_version != SCHEMA_VERSION {
            return Err(ResolverError::ConfigInvalid(format!(
                "unsupported schema_version {schema_version} (expected {SCHEMA_VERSION})"
            )));
        }
        let delimiter = parse_delimiter(config.delimiter.as_deref().unwrap_or(","))?;

        let host = config
            .ftp
            .host
            .unwrap_or_else(|| DEFAULT_HOST.to_string());
        if host.trim().is_empty() {
            return Err(ResolverError::ConfigInvalid(
                "ftp.host must not be empty".to_string(),
            ));
        }

        let max_attempts = config.retry.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS);
        if max_attempts == 0 {
            return Err(ResolverError::ConfigInvalid(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        let backoff = Backoff {
            kind: config.retry.backoff.unwrap_or_default(),
            delay: config
                .retry
                .delay_secs
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_DELAY),
        };

        let ftp = FtpSettings {
            host: host.trim().to_string(),
            port: config.ftp.port.unwrap_or(DEFAULT_PORT),
            user: config.ftp.user.unwrap_or_else(|| ANONYMOUS.to_string()),
            password: config.ftp.password.unwrap_or_else(|| ANONYMOUS.to_string()),
            connect_timeout: config
                .ftp
                .connect_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_CONNECT_TIMEOUT),
        };

        Ok(ResolvedConfig {
            input: Utf8PathBuf::from(config.input.unwrap_or_else(|| DEFAULT_INPUT.to_string())),
            output: Utf8PathBuf::from(
                config.output.unwrap_or_else(|| DEFAULT_OUTPUT.to_string()),
            ),
            delimiter,
            ftp,
            root: config.ftp.root.unwrap_or_else(|| DEFAULT_ROOT.to_string()),
            retry: RetryPolicy::new(max_attempts, backoff),
            missing_path: config.missing_path.unwrap_or_default(),
        })
    }
}

pub fn parse_delimiter(value: &str) -> Result<u8, ResolverError> {
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(ch), None) if ch.is_ascii() => Ok(ch as u8),
        _ => Err(ResolverError::ConfigInvalid(format!(
            "delimiter must be a single ASCII character, got {value:?}"
        ))),
    }
}

fn default_config_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(CONFIG_FILE_NAME)];
    if let Some(dirs) = ProjectDirs::from("", "", "dbsnp-build") {
        paths.push(dirs.config_dir().join("config.json"));
    }
    paths
}
