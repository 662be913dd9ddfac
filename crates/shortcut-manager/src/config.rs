use std::path::{Path, PathBuf};

use anyhow::Context;
use remote_exec::{HostKeyPolicy, RemoteConfig};
use serde::Deserialize;

pub const API_KEY_ENV: &str = "STEAMGRIDDB_API_KEY";

const CONFIG_DIR_NAME: &str = "steam-shortcut-manager";
const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Steam base directory, replacing the platform lookup.
    pub steam_dir: Option<String>,
    pub remote: Option<RemoteSection>,
    pub steamgriddb: Option<GridDbSection>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RemoteSection {
    /// `user@host`, optionally with `:port`.
    pub ssh: Option<String>,
    pub port: Option<u16>,
    pub password: Option<String>,
    pub key_file: Option<String>,
    #[serde(default)]
    pub verify_host_key: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GridDbSection {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
}

/// Command-line values that take precedence over the `[remote]` section.
#[derive(Debug, Default, Clone)]
pub struct RemoteOverrides {
    pub ssh: Option<String>,
    pub port: Option<u16>,
    pub password: Option<String>,
    pub key_file: Option<PathBuf>,
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| {
        home.join(".config")
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    })
}

pub fn load_config(path: &Path) -> anyhow::Result<AppConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config: AppConfig = toml::from_str(&raw)
        .with_context(|| format!("failed to parse config {}", path.display()))?;
    validate_config(&config)?;
    Ok(config)
}

/// An explicit path must exist; the default location is optional.
pub fn load_config_or_default(explicit: Option<&Path>) -> anyhow::Result<AppConfig> {
    if let Some(path) = explicit {
        return load_config(path);
    }
    match default_config_path() {
        Some(path) if path.is_file() => load_config(&path),
        _ => Ok(AppConfig::default()),
    }
}

pub fn validate_config(config: &AppConfig) -> anyhow::Result<()> {
    if let Some(steam_dir) = config.steam_dir.as_deref() {
        if steam_dir.trim().is_empty() {
            anyhow::bail!("steam_dir must not be empty when set");
        }
    }
    if let Some(remote) = config.remote.as_ref() {
        if let Some(ssh) = remote.ssh.as_deref() {
            validate_destination(ssh).context("invalid [remote] ssh")?;
        }
        if remote.port == Some(0) {
            anyhow::bail!("[remote] port must be between 1 and 65535");
        }
    }
    if let Some(griddb) = config.steamgriddb.as_ref() {
        if let Some(base_url) = griddb.base_url.as_deref() {
            let lower = base_url.to_ascii_lowercase();
            if !lower.starts_with("http://") && !lower.starts_with("https://") {
                anyhow::bail!("[steamgriddb] base_url must be an http(s) url");
            }
        }
    }
    Ok(())
}

fn validate_destination(ssh: &str) -> anyhow::Result<()> {
    let ssh = ssh.trim();
    if ssh.is_empty() {
        anyhow::bail!("ssh must be user@host");
    }
    if RemoteConfig::from_destination(ssh).is_none() {
        anyhow::bail!("ssh must be user@host, got {ssh}");
    }
    Ok(())
}

impl AppConfig {
    /// Left unexpanded: `~` belongs to whichever host the locator targets.
    pub fn steam_dir(&self, cli_override: Option<&str>) -> Option<String> {
        cli_override
            .map(str::to_string)
            .or_else(|| self.steam_dir.clone())
    }

    /// Remote target from flags and file, or `None` for local mode.
    pub fn remote_config(&self, overrides: &RemoteOverrides) -> anyhow::Result<Option<RemoteConfig>> {
        let file = self.remote.as_ref();
        let destination = overrides
            .ssh
            .as_deref()
            .or_else(|| file.and_then(|remote| remote.ssh.as_deref()));
        let Some(destination) = destination else {
            return Ok(None);
        };
        validate_destination(destination)?;
        let mut config = RemoteConfig::from_destination(destination)
            .with_context(|| format!("ssh must be user@host, got {destination}"))?;

        if let Some(port) = overrides.port {
            config.port = port;
        } else if !destination.contains(':') {
            if let Some(port) = file.and_then(|remote| remote.port) {
                config.port = port;
            }
        }
        config.password = overrides
            .password
            .clone()
            .or_else(|| file.and_then(|remote| remote.password.clone()));
        config.key_file = overrides.key_file.clone().or_else(|| {
            file.and_then(|remote| remote.key_file.as_deref())
                .map(expand_tilde)
        });
        if file.is_some_and(|remote| remote.verify_host_key) {
            config.host_key_policy = HostKeyPolicy::KnownHosts;
        }
        Ok(Some(config))
    }

    /// The environment variable wins over the file.
    pub fn griddb_api_key(&self, env_value: Option<String>) -> Option<String> {
        env_value
            .filter(|key| !key.trim().is_empty())
            .or_else(|| {
                self.steamgriddb
                    .as_ref()
                    .and_then(|griddb| griddb.api_key.clone())
            })
            .filter(|key| !key.trim().is_empty())
    }

    pub fn griddb_base_url(&self) -> Option<&str> {
        self.steamgriddb
            .as_ref()
            .and_then(|griddb| griddb.base_url.as_deref())
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}
