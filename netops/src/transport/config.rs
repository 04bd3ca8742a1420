//! SSH connection configuration.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use serde::Deserialize;

/// Host key verification mode, analogous to OpenSSH's `StrictHostKeyChecking`.
///
/// Spelled `strict`, `accept-new` or `disabled` in the settings file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HostKeyVerification {
    /// Reject unknown and changed keys.
    Strict,

    /// Accept and auto-learn unknown keys, but reject changed keys.
    #[default]
    AcceptNew,

    /// Accept all keys without checking. For lab use only.
    Disabled,
}

/// SSH connection configuration.
#[derive(Debug, Clone)]
pub struct SshConfig {
    /// Target host (hostname or IP address).
    pub host: String,

    /// SSH port (default: 22).
    pub port: u16,

    pub username: String,

    /// Password for keyboard-less password authentication.
    pub password: SecretString,

    /// Connection timeout.
    pub timeout: Duration,

    /// Terminal width for PTY.
    pub terminal_width: u32,

    /// Terminal height for PTY.
    pub terminal_height: u32,

    pub host_key_verification: HostKeyVerification,

    /// known_hosts file; `~/.ssh/known_hosts` when unset.
    pub known_hosts_path: Option<PathBuf>,
}

impl SshConfig {
    /// Password-authenticated config with defaults for everything else.
    pub fn new(host: impl Into<String>, username: impl Into<String>, password: SecretString) -> Self {
        Self {
            host: host.into(),
            port: 22,
            username: username.into(),
            password,
            timeout: Duration::from_secs(30),
            terminal_width: 511,
            terminal_height: 24,
            host_key_verification: HostKeyVerification::default(),
            known_hosts_path: None,
        }
    }

    /// Get the socket address for connection.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_defaults() {
        let config = SshConfig::new("10.0.0.1", "alice", SecretString::from("pw"));
        assert_eq!(config.socket_addr(), "10.0.0.1:22");
        assert_eq!(config.terminal_width, 511);
        assert_eq!(config.host_key_verification, HostKeyVerification::AcceptNew);
        assert_eq!(config.password.expose_secret(), "pw");
    }

    #[test]
    fn test_debug_redacts_password() {
        let config = SshConfig::new("r1", "alice", SecretString::from("hunter2"));
        assert!(!format!("{config:?}").contains("hunter2"));
    }
}
