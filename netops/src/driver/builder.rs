//! Builder for creating device drivers.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use super::junos::JunosDriver;
use crate::error::{DriverError, Result};
use crate::transport::config::{HostKeyVerification, SshConfig};

/// Builder for constructing a [`JunosDriver`].
///
/// # Example
///
/// ```rust,no_run
/// use netops::driver::{Driver, DriverBuilder};
///
/// # async fn example() -> Result<(), netops::Error> {
/// let mut driver = DriverBuilder::new("10.0.0.1")
///     .username("admin")
///     .password("secret")
///     .build()?;
/// driver.open().await?;
/// # Ok(())
/// # }
/// ```
pub struct DriverBuilder {
    host: String,
    port: u16,
    username: Option<String>,
    password: Option<SecretString>,
    timeout: Duration,
    command_timeout: Duration,
    host_key_verification: HostKeyVerification,
    known_hosts_path: Option<PathBuf>,
}

impl DriverBuilder {
    /// Create a new driver builder for the specified host.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 22,
            username: None,
            password: None,
            timeout: Duration::from_secs(30),
            command_timeout: Duration::from_secs(60),
            host_key_verification: HostKeyVerification::default(),
            known_hosts_path: None,
        }
    }

    /// Set the SSH port (default: 22).
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the username for authentication.
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Set the login password.
    pub fn password(mut self, password: impl Into<SecretString>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Set the connection timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the per-request timeout used once the session is open.
    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Set host key verification mode.
    pub fn host_key_verification(mut self, mode: HostKeyVerification) -> Self {
        self.host_key_verification = mode;
        self
    }

    /// Use a specific known_hosts file.
    pub fn known_hosts_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.known_hosts_path = Some(path.into());
        self
    }

    /// Build the driver.
    ///
    /// This creates the driver but does not connect.
    pub fn build(self) -> Result<JunosDriver> {
        let username = self.username.ok_or_else(|| DriverError::InvalidConfig {
            message: "Username is required".to_string(),
        })?;
        let password = self.password.ok_or_else(|| DriverError::InvalidConfig {
            message: "A password is required".to_string(),
        })?;

        let ssh_config = SshConfig {
            port: self.port,
            timeout: self.timeout,
            host_key_verification: self.host_key_verification,
            known_hosts_path: self.known_hosts_path,
            ..SshConfig::new(self.host, username, password)
        };

        Ok(JunosDriver::new(ssh_config, self.command_timeout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::Driver;

    #[test]
    fn test_build_requires_username() {
        let err = DriverBuilder::new("r1").password("pw").build().err();
        assert!(matches!(
            err,
            Some(crate::Error::Driver(DriverError::InvalidConfig { .. }))
        ));
    }

    #[test]
    fn test_build_requires_credential() {
        assert!(DriverBuilder::new("r1").username("alice").build().is_err());
    }

    #[test]
    fn test_build_is_not_connected() {
        let driver = DriverBuilder::new("10.0.0.1")
            .port(830)
            .username("alice")
            .password("pw")
            .command_timeout(Duration::from_secs(60))
            .build()
            .unwrap();
        assert!(!driver.is_open());
        assert_eq!(driver.host(), "10.0.0.1");
        assert_eq!(driver.mode(), None);
        assert_eq!(driver.command_timeout(), Duration::from_secs(60));
    }

    #[test]
    fn test_build_carries_host_key_settings() {
        let driver = DriverBuilder::new("10.0.0.1")
            .username("alice")
            .password("pw")
            .timeout(Duration::from_secs(5))
            .host_key_verification(HostKeyVerification::Strict)
            .known_hosts_path("/tmp/netops_known_hosts")
            .build()
            .unwrap();
        let config = driver.ssh_config();
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.host_key_verification, HostKeyVerification::Strict);
        assert_eq!(
            config.known_hosts_path.as_deref(),
            Some(std::path::Path::new("/tmp/netops_known_hosts"))
        );
    }
}
