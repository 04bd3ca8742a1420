//! # netops
//!
//! Operator-run configuration scripts for Juniper JUNOS devices.
//!
//! A run loads a device inventory, connects to each device over SSH, stages
//! a configuration change, shows the diff, and commits it under an exclusive
//! lock with a `<ticket>/<operator>` audit comment. Everything the operator
//! sees is teed into a transcript that is converted to HTML and mailed at the
//! end of the run.
//!
//! ## Layers
//!
//! - [`transport`]: SSH connection and authentication (russh)
//! - [`channel`]: PTY channel with tail-searched prompt buffer
//! - [`driver`]: JUNOS CLI driver and CLI mode tracking
//! - [`candidate`]: lock/load/diff/commit/rollback/unlock primitives
//! - [`sequencer`]: the change sequence built on a candidate
//! - [`transcript`] and [`notify`]: run log, HTML conversion and email
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use netops::driver::{Driver, DriverBuilder};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), netops::Error> {
//!     let mut driver = DriverBuilder::new("192.168.1.1")
//!         .username("admin")
//!         .password("secret")
//!         .build()?;
//!
//!     driver.open().await?;
//!     let response = driver.send_command("show version").await?;
//!     println!("{}", response.result);
//!     driver.close().await?;
//!     Ok(())
//! }
//! ```

/// Write one operator-facing line to a sink. A failed write is only logged;
/// losing a transcript line never aborts a change in flight.
macro_rules! report {
    ($out:expr, $($arg:tt)*) => {
        if let Err(e) = ::std::io::Write::write_fmt(
            &mut *$out,
            format_args!("{}\n", format_args!($($arg)*)),
        ) {
            ::log::warn!("cannot write to transcript: {}", e);
        }
    };
}

pub mod accounts;
pub mod ansi;
pub mod candidate;
pub mod channel;
pub mod connector;
pub mod driver;
pub mod error;
pub mod inventory;
pub mod notify;
pub mod prompt;
pub mod sequencer;
pub mod settings;
pub mod table;
pub mod transcript;
pub mod transport;

#[cfg(test)]
mod testing;

pub use error::{Error, Result};

// Re-export commonly used types
pub use candidate::{CandidateConfig, JunosCandidate};
pub use driver::{CliMode, Driver, DriverBuilder, JunosDriver, Response};
pub use inventory::{Device, Inventory};
pub use prompt::{ConsolePrompter, Prompter};
pub use sequencer::{ChangeState, CommitContext, SequenceReport};
pub use settings::Settings;
pub use transcript::Transcript;
