//! Error types for netops.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for netops operations.
#[derive(Error, Debug)]
pub enum Error {
    /// SSH transport-level errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Channel operation errors
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    /// Driver-level errors
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    /// Candidate configuration errors (lock, load, commit, ...)
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Configuration table errors
    #[error("Table error: {0}")]
    Table(#[from] TableError),

    /// Inventory loading errors
    #[error("Inventory error: {0}")]
    Inventory(#[from] InventoryError),

    /// Settings file errors
    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    /// Run transcript errors
    #[error("Transcript error: {0}")]
    Transcript(#[from] TranscriptError),

    /// Email delivery errors
    #[error("Notification error: {0}")]
    Notify(#[from] NotifyError),

    /// Interactive prompt failed (closed terminal, no tty)
    #[error("Prompt error: {0}")]
    Prompt(#[source] io::Error),
}

impl Error {
    /// Whether this error is an authentication rejection.
    ///
    /// Authentication failures can be retried with a fresh credential; every
    /// other transport failure means the device is unreachable.
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            Error::Transport(TransportError::AuthenticationFailed { .. })
        )
    }
}

/// Transport layer errors (SSH connection, authentication).
#[derive(Error, Debug)]
pub enum TransportError {
    /// Failed to connect to host
    #[error("Connection failed to {host}:{port}: {source}")]
    ConnectionFailed {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    /// SSH handshake or protocol error
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),

    /// Authentication failed
    #[error("Authentication failed for user '{user}'")]
    AuthenticationFailed { user: String },

    /// Host is not present in known_hosts (strict mode)
    #[error("Host key for {host}:{port} is not in known_hosts")]
    HostKeyUnknown { host: String, port: u16 },

    /// Host key differs from the known_hosts entry
    #[error("Host key for {host}:{port} changed (known_hosts line {line})")]
    HostKeyChanged { host: String, port: u16, line: usize },

    /// known_hosts could not be read or written
    #[error("known_hosts error: {0}")]
    KnownHosts(String),

    /// Operation timed out
    #[error("Operation timed out after {0:?}")]
    Timeout(std::time::Duration),
}

/// Channel layer errors (pattern matching, PTY operations).
#[derive(Error, Debug)]
pub enum ChannelError {
    /// Pattern matching timed out
    #[error("Pattern not found within {0:?}")]
    PatternTimeout(std::time::Duration),

    /// Channel closed unexpectedly
    #[error("Channel closed")]
    Closed,

    /// SSH protocol error on the channel
    #[error("Channel SSH error: {0}")]
    Ssh(russh::Error),

    /// Invalid regex pattern
    #[error("Invalid regex pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

/// Driver layer errors (command execution, CLI mode tracking).
#[derive(Error, Debug)]
pub enum DriverError {
    /// Driver not connected
    #[error("Driver not connected - call open() first")]
    NotConnected,

    /// Driver already connected
    #[error("Driver already connected")]
    AlreadyConnected,

    /// Invalid configuration in the driver builder
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Prompt did not match any known CLI mode
    #[error("Unknown CLI mode from prompt: '{prompt}'")]
    UnknownMode { prompt: String },
}

/// Candidate configuration errors.
///
/// Each variant maps to one step of the lock/load/commit/unlock sequence.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Exclusive lock could not be acquired
    #[error("Unable to lock configuration: {message}")]
    Lock { message: String },

    /// A staged statement was rejected
    #[error("Unable to load configuration changes: {message}")]
    Load { message: String },

    /// The candidate diff could not be produced
    #[error("Unable to compare configuration: {message}")]
    Diff { message: String },

    /// Commit was rejected by the device
    #[error("Unable to commit configuration: {message}")]
    Commit { message: String },

    /// Candidate could not be reverted
    #[error("Unable to discard changes: {message}")]
    Rollback { message: String },

    /// Lock could not be released
    #[error("Unable to unlock configuration: {message}")]
    Unlock { message: String },

    /// Attempted a locked operation without holding the lock
    #[error("Configuration is not locked")]
    NotLocked,
}

/// Configuration table errors.
#[derive(Error, Debug)]
pub enum TableError {
    /// SSH public key could not be parsed
    #[error("Invalid SSH public key: {0}")]
    InvalidKey(String),

    /// SSH key algorithm has no JUNOS equivalent
    #[error("Unsupported SSH key algorithm '{0}'")]
    UnsupportedKey(String),
}

/// Inventory loading errors.
#[derive(Error, Debug)]
pub enum InventoryError {
    /// Named inventory file does not exist
    #[error("Inventory '{name}' not found, valid inventories: {}", available.join(", "))]
    NotFound { name: String, available: Vec<String> },

    /// Inventory file could not be read
    #[error("Cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Inventory file is not valid YAML
    #[error("Invalid inventory {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Settings file errors.
#[derive(Error, Debug)]
pub enum SettingsError {
    /// Settings file does not exist
    #[error("Config not found at {0}")]
    NotFound(PathBuf),

    /// Settings file could not be read
    #[error("Cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Settings file is not valid TOML
    #[error("Invalid settings: {0}")]
    Parse(#[from] toml::de::Error),

    /// No location to look for the settings file
    #[error("Cannot determine the configuration directory")]
    NoConfigDir,
}

/// Run transcript errors.
#[derive(Error, Debug)]
pub enum TranscriptError {
    /// Output directory or log file could not be created
    #[error("Cannot create {path}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Log could not be flushed, read back or converted
    #[error("Cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Email delivery errors.
#[derive(Error, Debug)]
pub enum NotifyError {
    /// Attachment file could not be read
    #[error("Error opening attachment file {path}: {source}")]
    Attachment {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Sender or recipient is not a valid address
    #[error("Invalid email address '{address}': {source}")]
    Address {
        address: String,
        #[source]
        source: lettre::address::AddressError,
    },

    /// Attachment content type could not be parsed
    #[error("Invalid content type: {0}")]
    ContentType(#[from] lettre::message::header::ContentTypeErr),

    /// Message could not be assembled
    #[error("Cannot build message: {0}")]
    Build(#[from] lettre::error::Error),

    /// SMTP conversation failed
    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

/// Result type alias using netops's Error.
pub type Result<T> = std::result::Result<T, Error>;
