use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use nautobot_client::ClientConfig;
use serde::{Deserialize, Serialize};

use crate::cli::{Cli, OutputFormat};

pub const CONFIG_KEYS: &str = "url, token, validate_certs, timeout, format";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ProfileConfig {
    pub url: Option<String>,
    pub token: Option<String>,
    pub validate_certs: Option<bool>,
    pub timeout: Option<u64>,
    pub format: Option<String>,
}

impl ProfileConfig {
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "url" => self.url = Some(value.to_string()),
            "token" => self.token = Some(value.to_string()),
            "validate_certs" => {
                self.validate_certs = Some(
                    value
                        .parse()
                        .with_context(|| format!("validate_certs must be true or false, got {value}"))?,
                );
            }
            "timeout" => {
                self.timeout = Some(
                    value
                        .parse()
                        .with_context(|| format!("timeout must be a number of seconds, got {value}"))?,
                );
            }
            "format" => {
                parse_format(value)?;
                self.format = Some(value.to_string());
            }
            other => anyhow::bail!("Unknown config key: {other}. Valid keys: {CONFIG_KEYS}"),
        }
        Ok(())
    }
}

pub type ConfigFile = BTreeMap<String, ProfileConfig>;

/// Profile file location.
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    /// `~/.nbstate/config.toml`.
    pub fn default_location() -> Result<Self> {
        let dir = dirs::home_dir()
            .context("Cannot determine home directory")?
            .join(".nbstate");
        Ok(Self::at(dir.join("config.toml")))
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load_all(&self) -> Result<ConfigFile> {
        if !self.path.exists() {
            return Ok(ConfigFile::new());
        }
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        toml::from_str(&content).with_context(|| format!("Invalid config file {}", self.path.display()))
    }

    pub fn load_profile(&self, profile: &str) -> Result<ProfileConfig> {
        Ok(self.load_all()?.remove(profile).unwrap_or_default())
    }

    pub fn save_profile(&self, profile: &str, config: &ProfileConfig) -> Result<()> {
        let mut all = self.load_all()?;
        all.insert(profile.to_string(), config.clone());
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        let content = toml::to_string_pretty(&all)?;
        fs::write(&self.path, content)
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        Ok(())
    }
}

fn parse_format(value: &str) -> Result<OutputFormat> {
    match value {
        "json" => Ok(OutputFormat::Json),
        "table" => Ok(OutputFormat::Table),
        other => anyhow::bail!("Unknown format {other}. Valid formats: json, table"),
    }
}

/// `--format`, then the profile, then JSON.
pub fn resolve_format(cli: &Cli, profile: &ProfileConfig) -> Result<OutputFormat> {
    if let Some(format) = cli.format {
        return Ok(format);
    }
    profile
        .format
        .as_deref()
        .map(parse_format)
        .transpose()
        .map(Option::unwrap_or_default)
}

/// Flags and environment first, then the profile, then built-in defaults.
pub fn resolve_client_config(cli: &Cli, profile: &ProfileConfig) -> Result<ClientConfig> {
    let url = cli.url.clone().or_else(|| profile.url.clone()).context(
        "No Nautobot URL configured. Use --url, set NAUTOBOT_URL, or run: nbstate config set url <url>",
    )?;
    let token = cli.token.clone().or_else(|| profile.token.clone()).context(
        "No API token configured. Use --token, set NAUTOBOT_TOKEN, or run: nbstate config set token <token>",
    )?;

    let mut config = ClientConfig::new(url, token);
    if cli.no_validate_certs {
        config = config.with_validate_certs(false);
    } else if let Some(validate) = profile.validate_certs {
        config = config.with_validate_certs(validate);
    }
    if let Some(secs) = cli.timeout.or(profile.timeout) {
        config = config.with_timeout(Duration::from_secs(secs));
    }
    config.validate().context("Invalid connection settings")?;
    Ok(config)
}
