//! SSH transport layer wrapping russh.
//!
//! Connection setup, host key checking, authentication and channel
//! creation. An authentication rejection is kept distinct from every
//! connectivity failure so callers can re-prompt for a password.

pub mod config;
mod host_keys;
mod ssh;

pub use config::{HostKeyVerification, SshConfig};
pub use ssh::SshTransport;
