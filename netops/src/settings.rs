//! Run settings.
//!
//! Loaded once at start from a TOML file and passed by reference to
//! everything that needs a directory, a timeout or the mail relay.
//!
//! ```toml
//! [general]
//! inventory_dir = "/opt/netops/inventories"
//! output_dir = "/var/log/netops"
//! command_timeout_secs = 60
//!
//! [smtp]
//! server = "smtp.example.net"
//! port = 587
//! from = "netops@example.net"
//! user = "netops"
//! password = "app-password"
//! security = "starttls"
//! default_recipient = "noc@example.net"
//!
//! [ssh]
//! host_key_verification = "strict"
//! known_hosts_path = "/opt/netops/known_hosts"
//! connect_timeout_secs = 30
//! ```
//!
//! `[ssh]` may be left out entirely.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::debug;
use secrecy::SecretString;
use serde::{Deserialize, Deserializer};

use crate::error::{Result, SettingsError};
use crate::transport::HostKeyVerification;

/// Environment variable naming the settings file.
pub const ENV_CONFIG: &str = "NETOPS_CONFIG";

const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 60;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Settings for one run.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub general: General,
    pub smtp: SmtpSettings,
    #[serde(default)]
    pub ssh: SshSettings,
}

/// `[general]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct General {
    /// Directory holding `<name>.yml` inventories.
    pub inventory_dir: PathBuf,
    /// Directory receiving run transcripts.
    pub output_dir: PathBuf,
    /// Per-request timeout once a session is open.
    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,
}

impl General {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }
}

fn default_command_timeout() -> u64 {
    DEFAULT_COMMAND_TIMEOUT_SECS
}

/// `[ssh]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct SshSettings {
    #[serde(default)]
    pub host_key_verification: HostKeyVerification,
    /// known_hosts file; `~/.ssh/known_hosts` when unset.
    #[serde(default)]
    pub known_hosts_path: Option<PathBuf>,
    /// Bound on TCP connect plus SSH handshake.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

impl SshSettings {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl Default for SshSettings {
    fn default() -> Self {
        Self {
            host_key_verification: HostKeyVerification::default(),
            known_hosts_path: None,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
        }
    }
}

fn default_connect_timeout() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_SECS
}

/// How the SMTP connection is secured.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SmtpSecurity {
    /// Cleartext SMTP.
    #[default]
    Plain,
    /// Cleartext connection upgraded with STARTTLS.
    Starttls,
    /// TLS from the first byte (SMTPS).
    Ssl,
}

impl SmtpSecurity {
    pub fn default_port(self) -> u16 {
        match self {
            SmtpSecurity::Plain => 25,
            SmtpSecurity::Starttls => 587,
            SmtpSecurity::Ssl => 465,
        }
    }
}

/// `[smtp]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct SmtpSettings {
    pub server: String,
    #[serde(default)]
    pub port: Option<u16>,
    pub from: String,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default, deserialize_with = "deserialize_secret")]
    pub password: Option<SecretString>,
    #[serde(default)]
    pub security: SmtpSecurity,
    #[serde(default)]
    pub default_recipient: Option<String>,
}

impl SmtpSettings {
    /// Configured port, or the usual one for the security mode.
    pub fn port(&self) -> u16 {
        self.port.unwrap_or_else(|| self.security.default_port())
    }
}

fn deserialize_secret<'de, D>(deserializer: D) -> std::result::Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.map(SecretString::from))
}

impl Settings {
    /// Pick the settings file: the explicit path when given, otherwise
    /// `<config dir>/netops/netops.toml`.
    ///
    /// The `NETOPS_CONFIG` variable reaches this function through the CLI's
    /// `--config` flag.
    pub fn resolve_path(explicit: Option<&Path>) -> Result<PathBuf> {
        if let Some(path) = explicit {
            return Ok(path.to_path_buf());
        }
        let dir = dirs::config_dir().ok_or(SettingsError::NoConfigDir)?;
        Ok(dir.join("netops").join("netops.toml"))
    }

    /// Read and parse a settings file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(SettingsError::NotFound(path.to_path_buf()).into());
        }
        debug!("loading settings from {}", path.display());
        let content = fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let settings = toml::from_str(content).map_err(SettingsError::from)?;
        Ok(settings)
    }
}
