//! SSH transport implementation using russh.

use std::sync::Arc;

use log::debug;
use russh::Channel;
use russh::client::{self, Handle, Msg};
use secrecy::ExposeSecret;

use super::config::SshConfig;
use super::host_keys::{HostKeyChecker, Rejection};
use crate::error::{Result, TransportError};

/// Authenticated SSH session to one device.
pub struct SshTransport {
    session: Handle<HostKeyChecker>,
    config: SshConfig,
}

impl SshTransport {
    /// Connect to the SSH server and authenticate.
    ///
    /// A rejected credential surfaces as [`TransportError::AuthenticationFailed`];
    /// every other failure means the device could not be reached.
    pub async fn connect(config: SshConfig) -> Result<Self> {
        debug!("connecting to {}", config.socket_addr());

        // Sessions sit idle while the operator reads a diff, so only the
        // connect itself is bounded.
        let russh_config = Arc::new(client::Config {
            inactivity_timeout: None,
            ..Default::default()
        });
        let (checker, rejection) = HostKeyChecker::new(&config);

        let connecting = client::connect(russh_config, (config.host.as_str(), config.port), checker);
        let mut session = match tokio::time::timeout(config.timeout, connecting).await {
            Err(_) => return Err(TransportError::Timeout(config.timeout).into()),
            Ok(Err(e)) => return Err(connect_error(&config, &rejection, e).into()),
            Ok(Ok(session)) => session,
        };

        authenticate(&mut session, &config).await?;
        debug!("authenticated to {} as {}", config.host, config.username);

        Ok(Self { session, config })
    }

    /// Open a channel with a PTY and an interactive shell.
    pub async fn open_channel(&self) -> Result<Channel<Msg>> {
        let channel = self
            .session
            .channel_open_session()
            .await
            .map_err(TransportError::Ssh)?;

        channel
            .request_pty(
                true,
                "xterm",
                self.config.terminal_width,
                self.config.terminal_height,
                0,
                0,
                &[],
            )
            .await
            .map_err(TransportError::Ssh)?;
        channel
            .request_shell(true)
            .await
            .map_err(TransportError::Ssh)?;

        Ok(channel)
    }

    /// Disconnect.
    pub async fn close(self) -> Result<()> {
        self.session
            .disconnect(russh::Disconnect::ByApplication, "", "en")
            .await
            .map_err(TransportError::Ssh)?;
        Ok(())
    }
}

/// Classify a failed connect: a refused host key wins, then socket errors,
/// then anything russh reported.
fn connect_error(config: &SshConfig, rejection: &Rejection, error: russh::Error) -> TransportError {
    if let Some(reason) = rejection.lock().ok().and_then(|mut slot| slot.take()) {
        return reason;
    }
    match error {
        russh::Error::IO(source) => TransportError::ConnectionFailed {
            host: config.host.clone(),
            port: config.port,
            source,
        },
        other => TransportError::Ssh(other),
    }
}

async fn authenticate(session: &mut Handle<HostKeyChecker>, config: &SshConfig) -> Result<()> {
    let result = session
        .authenticate_password(&config.username, config.password.expose_secret())
        .await
        .map_err(TransportError::Ssh)?;

    if !result.success() {
        return Err(TransportError::AuthenticationFailed {
            user: config.username.clone(),
        }
        .into());
    }
    Ok(())
}
