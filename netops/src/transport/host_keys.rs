//! Host key checking against known_hosts.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use log::{debug, warn};
use russh::client;
use russh::keys::{self, PublicKey};

use super::config::{HostKeyVerification, SshConfig};
use crate::error::TransportError;

/// Slot where a rejected key's reason is left for `connect()`.
///
/// russh only reports `UnknownKey` when the handler refuses a key, so the
/// detailed reason travels out of band.
pub(super) type Rejection = Arc<Mutex<Option<TransportError>>>;

/// russh client handler enforcing a [`HostKeyVerification`] policy.
pub(super) struct HostKeyChecker {
    host: String,
    port: u16,
    policy: HostKeyVerification,
    known_hosts: Option<PathBuf>,
    rejection: Rejection,
}

impl HostKeyChecker {
    pub(super) fn new(config: &SshConfig) -> (Self, Rejection) {
        let rejection = Rejection::default();
        let checker = Self {
            host: config.host.clone(),
            port: config.port,
            policy: config.host_key_verification,
            known_hosts: config.known_hosts_path.clone(),
            rejection: rejection.clone(),
        };
        (checker, rejection)
    }

    /// Whether known_hosts already vouches for `key`.
    fn is_known(&self, key: &PublicKey) -> Result<bool, TransportError> {
        let lookup = match &self.known_hosts {
            Some(path) => keys::check_known_hosts_path(&self.host, self.port, key, path),
            None => keys::check_known_hosts(&self.host, self.port, key),
        };
        lookup.map_err(|e| match e {
            keys::Error::KeyChanged { line } => TransportError::HostKeyChanged {
                host: self.host.clone(),
                port: self.port,
                line,
            },
            other => TransportError::KnownHosts(other.to_string()),
        })
    }

    fn remember(&self, key: &PublicKey) -> Result<(), TransportError> {
        let saved = match &self.known_hosts {
            Some(path) => keys::known_hosts::learn_known_hosts_path(&self.host, self.port, key, path),
            None => keys::known_hosts::learn_known_hosts(&self.host, self.port, key),
        };
        saved.map_err(|e| TransportError::KnownHosts(e.to_string()))
    }

    /// Apply the policy to a presented key.
    fn verify(&self, key: &PublicKey) -> Result<(), TransportError> {
        if self.policy == HostKeyVerification::Disabled || self.is_known(key)? {
            return Ok(());
        }
        match self.policy {
            HostKeyVerification::Strict => Err(TransportError::HostKeyUnknown {
                host: self.host.clone(),
                port: self.port,
            }),
            _ => {
                match self.remember(key) {
                    Ok(()) => debug!("learned host key for {}:{}", self.host, self.port),
                    Err(e) => warn!("Failed to save host key: {}", e),
                }
                Ok(())
            }
        }
    }
}

impl client::Handler for HostKeyChecker {
    type Error = russh::Error;

    async fn check_server_key(&mut self, server_public_key: &PublicKey) -> Result<bool, Self::Error> {
        match self.verify(server_public_key) {
            Ok(()) => Ok(true),
            Err(e) => {
                if let Ok(mut slot) = self.rejection.lock() {
                    *slot = Some(e);
                }
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    const HOST_KEY: &str =
        "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIEW+IUSFyTalWBSVd3TtsqR3X7+8V7eRk/qjLj5M6fmL";

    fn checker(policy: HostKeyVerification, known_hosts: PathBuf) -> (HostKeyChecker, Rejection) {
        let mut config = SshConfig::new("10.0.0.1", "admin", SecretString::from("pw"));
        config.host_key_verification = policy;
        config.known_hosts_path = Some(known_hosts);
        HostKeyChecker::new(&config)
    }

    fn key() -> PublicKey {
        PublicKey::from_openssh(HOST_KEY).unwrap()
    }

    #[tokio::test]
    async fn test_strict_rejects_unknown_host() {
        let dir = tempfile::TempDir::new().unwrap();
        let (mut checker, rejection) =
            checker(HostKeyVerification::Strict, dir.path().join("known_hosts"));

        assert!(!client::Handler::check_server_key(&mut checker, &key()).await.unwrap());
        assert!(matches!(
            rejection.lock().unwrap().take(),
            Some(TransportError::HostKeyUnknown { port: 22, .. })
        ));
    }

    #[tokio::test]
    async fn test_accept_new_learns_key() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("known_hosts");
        let (mut checker, rejection) = checker(HostKeyVerification::AcceptNew, path.clone());

        assert!(client::Handler::check_server_key(&mut checker, &key()).await.unwrap());
        assert!(rejection.lock().unwrap().is_none());
        assert!(std::fs::read_to_string(&path).unwrap().contains("10.0.0.1"));

        // Now known, so strict mode accepts it too
        let (mut strict, _) = self::checker(HostKeyVerification::Strict, path);
        assert!(client::Handler::check_server_key(&mut strict, &key()).await.unwrap());
    }

    #[tokio::test]
    async fn test_disabled_accepts_anything() {
        let dir = tempfile::TempDir::new().unwrap();
        let (mut checker, _) = checker(HostKeyVerification::Disabled, dir.path().join("known_hosts"));
        assert!(client::Handler::check_server_key(&mut checker, &key()).await.unwrap());
    }
}
