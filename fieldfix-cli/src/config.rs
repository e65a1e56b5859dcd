//! Configuration file loading for fieldfix.
//!
//! Discovers and loads `fieldfix.toml` from the working directory, or from `--config`.
//! Merges config file settings with CLI arguments (CLI takes precedence).

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use fieldfix_core::settings::{
    AdminSettings, ExportSettings, SessionSettings, StoreSettings, TablePaths,
};
use fieldfix_ledger::GithubConfig;
use fs_err as fs;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// The config file name to search for.
pub const CONFIG_FILE_NAME: &str = "fieldfix.toml";

/// Top-level configuration from fieldfix.toml.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FieldfixConfig {
    /// Where the tables live.
    pub remote: RemoteConfig,

    /// Blob paths of the source tables and the ledger.
    pub tables: TablesConfig,

    /// Session tuning.
    pub session: SessionConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    Github,
    #[default]
    Directory,
}

/// Remote section of the config.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub backend: Backend,

    /// GitHub repository owner.
    pub owner: String,

    /// GitHub repository name.
    pub repo: String,

    pub branch: Option<String>,

    /// Override for GitHub Enterprise hosts.
    pub api_base: Option<String>,

    /// Root of the directory backend, relative to the working directory.
    pub dir: Option<Utf8PathBuf>,

    /// Connect and read timeout for remote calls.
    pub timeout_ms: Option<u64>,
}

/// Tables section of the config.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TablesConfig {
    pub constraints: Option<String>,
    pub logic: Option<String>,
    pub corrections: Option<String>,
}

/// Session section of the config.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// How long fetched source tables are reused.
    pub cache_ttl_secs: u64,

    /// Rows shown in the admin preview.
    pub preview_rows: usize,

    /// Extra append attempts after a version conflict.
    pub save_retries: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: 3600,
            preview_rows: 10,
            save_retries: 1,
        }
    }
}

/// Discover the fieldfix.toml config file.
///
/// Returns `None` if no config file is found in `dir`.
pub fn discover_config(dir: &Utf8Path) -> Option<Utf8PathBuf> {
    let config_path = dir.join(CONFIG_FILE_NAME);
    if config_path.exists() {
        debug!("found config file at {}", config_path);
        Some(config_path)
    } else {
        debug!("no config file found at {}", config_path);
        None
    }
}

/// Load and parse a fieldfix.toml config file.
pub fn load_config(path: &Utf8Path) -> anyhow::Result<FieldfixConfig> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read config file {}", path))?;
    parse_config(&contents).with_context(|| format!("parse config file {}", path))
}

/// Parse a config file from a string.
pub fn parse_config(contents: &str) -> anyhow::Result<FieldfixConfig> {
    let config: FieldfixConfig = toml::from_str(contents).context("invalid TOML")?;
    Ok(config)
}

/// Load the explicit config if given, else discover one in `dir`, else use defaults.
///
/// An explicit path that does not exist is an error.
pub fn load_or_default(
    explicit: Option<&Utf8Path>,
    dir: &Utf8Path,
) -> anyhow::Result<FieldfixConfig> {
    match explicit {
        Some(path) => load_config(path),
        None => match discover_config(dir) {
            Some(path) => load_config(&path),
            None => Ok(FieldfixConfig::default()),
        },
    }
}

/// CLI arguments that override the config file.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub backend: Option<Backend>,
    pub dir: Option<Utf8PathBuf>,
    pub token: Option<String>,
}

/// Merged configuration combining config file and CLI arguments.
#[derive(Debug, Clone)]
pub struct MergedConfig {
    pub store: StoreSettings,
    pub tables: TablePaths,
    pub cache_ttl: Duration,
    pub preview_rows: usize,
    pub save_retries: u32,
}

impl MergedConfig {
    pub fn session_settings(&self, enumerator: &str) -> SessionSettings {
        SessionSettings {
            enumerator: enumerator.trim().to_string(),
            tables: self.tables.clone(),
            cache_ttl: self.cache_ttl,
            save_retries: self.save_retries,
        }
    }

    /// `preview` overrides the configured row count.
    pub fn admin_settings(&self, preview: Option<usize>) -> AdminSettings {
        AdminSettings {
            corrections: self.tables.corrections.clone(),
            preview_rows: preview.unwrap_or(self.preview_rows),
        }
    }

    pub fn export_settings(&self, out_dir: Utf8PathBuf) -> ExportSettings {
        ExportSettings {
            corrections: self.tables.corrections.clone(),
            out_dir,
        }
    }
}

/// Builder for merging config file with CLI arguments.
pub struct ConfigMerger {
    config: FieldfixConfig,
}

impl ConfigMerger {
    /// Create a new merger from a loaded config.
    pub fn new(config: FieldfixConfig) -> Self {
        Self { config }
    }

    /// Merge with the global CLI arguments.
    ///
    /// A relative directory-backend root from the config file resolves against `base`.
    pub fn merge(self, cli: &CliOverrides, base: &Utf8Path) -> MergedConfig {
        let remote = self.config.remote;
        let backend = cli.backend.unwrap_or(remote.backend);

        let store = match backend {
            Backend::Github => {
                let defaults = GithubConfig::default();
                StoreSettings::Github(GithubConfig {
                    api_base: remote.api_base.unwrap_or(defaults.api_base),
                    owner: remote.owner,
                    repo: remote.repo,
                    branch: remote.branch.unwrap_or(defaults.branch),
                    token: cli.token.clone().unwrap_or_default(),
                    timeout: remote
                        .timeout_ms
                        .map(Duration::from_millis)
                        .unwrap_or(defaults.timeout),
                    commit_prefix: defaults.commit_prefix,
                })
            }
            Backend::Directory => {
                let root = match (&cli.dir, remote.dir) {
                    (Some(dir), _) => dir.clone(),
                    (None, Some(dir)) if dir.is_relative() => base.join(dir),
                    (None, Some(dir)) => dir,
                    (None, None) => base.to_path_buf(),
                };
                StoreSettings::Directory { root }
            }
        };

        let defaults = TablePaths::default();
        let tables = TablePaths {
            constraints: self.config.tables.constraints.unwrap_or(defaults.constraints),
            logic: self.config.tables.logic.unwrap_or(defaults.logic),
            corrections: self.config.tables.corrections.unwrap_or(defaults.corrections),
        };

        MergedConfig {
            store,
            tables,
            cache_ttl: Duration::from_secs(self.config.session.cache_ttl_secs),
            preview_rows: self.config.session.preview_rows,
            save_retries: self.config.session.save_retries,
        }
    }
}
