//! Configuration tables.
//!
//! A table is an in-memory description of one configuration object (a local
//! account, for now). Staging a table produces a [`PendingChange`]: the
//! ordered `set` statements that the candidate configuration will load.

use std::collections::BTreeSet;
use std::fmt;

use secrecy::{ExposeSecret, SecretString};
use ssh_key::{Algorithm, PublicKey};

use crate::driver::Driver;
use crate::error::{ConfigError, Result, TableError};

/// One configuration statement.
#[derive(Clone)]
pub struct Statement {
    text: String,
    masked: Option<String>,
}

impl Statement {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            masked: None,
        }
    }

    /// A statement ending in a secret value, which is never logged verbatim.
    pub fn sensitive(prefix: &str, secret: &str) -> Self {
        Self {
            text: format!("{prefix} {}", quote(secret)),
            masked: Some(format!("{prefix} \"********\"")),
        }
    }

    /// The statement as sent to the device.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_sensitive(&self) -> bool {
        self.masked.is_some()
    }
}

/// Display form, with secrets masked.
impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.masked.as_deref().unwrap_or(&self.text))
    }
}

impl fmt::Debug for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Statement({self})")
    }
}

/// A staged set of configuration edits.
///
/// Becomes meaningless once committed or rolled back; the candidate that
/// loaded it owns the resulting device-side state.
#[derive(Debug, Clone, Default)]
pub struct PendingChange {
    description: String,
    statements: Vec<Statement>,
}

impl PendingChange {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            statements: Vec::new(),
        }
    }

    pub fn push(&mut self, statement: Statement) {
        self.statements.push(statement);
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}

/// Something that can be staged as a [`PendingChange`].
pub trait ConfigTable {
    /// Produce the edits for this table.
    fn to_change(&self) -> Result<PendingChange>;
}

/// Local login account under `system login user`.
#[derive(Debug, Clone)]
pub struct UserConfigTable {
    pub username: String,
    pub class: Option<String>,
    pub full_name: Option<String>,
    pub password: Option<SecretString>,
    pub ssh_keys: Vec<String>,
}

impl UserConfigTable {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            class: None,
            full_name: None,
            password: None,
            ssh_keys: Vec::new(),
        }
    }

    fn prefix(&self) -> String {
        format!("set system login user {}", self.username)
    }
}

impl ConfigTable for UserConfigTable {
    fn to_change(&self) -> Result<PendingChange> {
        let prefix = self.prefix();
        let mut change = PendingChange::new(format!("local account {}", self.username));

        if let Some(class) = self.class.as_deref().filter(|c| !c.is_empty()) {
            change.push(Statement::new(format!("{prefix} class {class}")));
        }
        if let Some(name) = self.full_name.as_deref().filter(|n| !n.is_empty()) {
            change.push(Statement::new(format!("{prefix} full-name {}", quote(name))));
        }
        if let Some(password) = self
            .password
            .as_ref()
            .filter(|p| !p.expose_secret().is_empty())
        {
            change.push(Statement::sensitive(
                &format!("{prefix} authentication plain-text-password-value"),
                password.expose_secret(),
            ));
        }
        for key in &self.ssh_keys {
            let kind = junos_key_kind(key)?;
            change.push(Statement::new(format!(
                "{prefix} authentication {kind} {}",
                quote(key.trim())
            )));
        }

        Ok(change)
    }
}

/// Map an OpenSSH public key to the JUNOS `authentication` keyword.
pub fn junos_key_kind(key: &str) -> Result<&'static str> {
    let parsed =
        PublicKey::from_openssh(key.trim()).map_err(|e| TableError::InvalidKey(e.to_string()))?;
    let kind = match parsed.algorithm() {
        Algorithm::Rsa { .. } => "ssh-rsa",
        Algorithm::Ed25519 => "ssh-ed25519",
        Algorithm::Ecdsa { .. } => "ssh-ecdsa",
        Algorithm::Dsa => "ssh-dsa",
        other => return Err(TableError::UnsupportedKey(other.as_str().to_string()).into()),
    };
    Ok(kind)
}

/// Split authorized_keys style content into individual keys.
pub fn parse_key_file(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect()
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Local account names currently configured on the device.
pub async fn list_local_accounts<D: Driver>(driver: &mut D) -> Result<BTreeSet<String>> {
    let response = driver
        .send_command("show configuration system login | display set")
        .await?;
    if !response.is_success() {
        return Err(ConfigError::Load {
            message: response.failure_text(),
        }
        .into());
    }
    Ok(parse_login_users(&response.result))
}

fn parse_login_users(output: &str) -> BTreeSet<String> {
    output
        .lines()
        .filter_map(|line| line.trim().strip_prefix("set system login user "))
        .filter_map(|rest| rest.split_whitespace().next())
        .map(|name| name.trim_matches('"').to_string())
        .collect()
}
