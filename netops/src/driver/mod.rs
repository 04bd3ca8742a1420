//! High-level driver for device interaction.
//!
//! The driver layer provides the API for sending CLI commands to a JUNOS
//! device and tracking whether the session is in operational or
//! configuration mode.

mod builder;
pub(crate) mod junos;
pub(crate) mod response;

pub use builder::DriverBuilder;
pub use junos::{CliMode, JunosDriver};
pub use response::Response;

use std::future::Future;

use regex::bytes::Regex;
use secrecy::SecretString;

use crate::error::Result;
use crate::table::Statement;

/// Trait for device drivers.
///
/// Everything above the transport (connector, candidate configuration,
/// account listing) talks to a device through this trait so it can be
/// exercised without a live SSH session.
pub trait Driver: Send {
    /// Open the connection to the device.
    fn open(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Close the connection. A no-op when already closed.
    fn close(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Send a command and wait for the prompt.
    fn send_command(&mut self, command: &str) -> impl Future<Output = Result<Response>> + Send;

    /// Send a configuration statement. Logs and the response carry the
    /// masked form of the statement.
    fn send_statement(
        &mut self,
        statement: &Statement,
    ) -> impl Future<Output = Result<Response>> + Send {
        self.send_command(statement.text())
    }

    /// Send a command that may stop on a question before the prompt.
    ///
    /// If the output ends in `question`, `answer` is sent and the driver
    /// waits for the prompt again. The returned response covers both steps.
    fn send_with_answer(
        &mut self,
        command: &str,
        question: &Regex,
        answer: &str,
    ) -> impl Future<Output = Result<Response>> + Send;

    /// Replace the password used by the next `open()`.
    fn set_password(&mut self, password: SecretString);

    /// Target host name or address.
    fn host(&self) -> &str;

    /// Check if the driver is connected.
    fn is_open(&self) -> bool;

    /// Current CLI mode, if connected.
    fn mode(&self) -> Option<CliMode>;
}
