//! Juniper JUNOS CLI driver.
//!
//! JUNOS has two CLI modes that matter here:
//! - operational mode with a `>` prompt
//! - configuration mode with a `#` prompt, usually preceded by an `[edit]`
//!   context line
//!
//! Prompt patterns are adapted from scrapli's JunOS driver.
//!
//! # Prompt Examples
//!
//! ```text
//! user@router>              # operational mode
//! {master:0}                # routing-engine indicator (separate line)
//! user@router>              # operational prompt on next line
//! [edit]
//! user@router#              # configuration mode
//! ```

use std::sync::LazyLock;
use std::time::{Duration, Instant};

use log::{debug, trace};
use regex::bytes::Regex;
use secrecy::SecretString;

use super::Driver;
use super::response::Response;
use crate::channel::{PtyChannel, PtyConfig};
use crate::error::{ChannelError, DriverError, Result};
use crate::table::Statement;
use crate::transport::{SshConfig, SshTransport};

const EXEC_PATTERN: &str = r"(?mi)^(\{\w+(:(\w+)?\d)?\}\n)?[\w\-@()/:\.]{1,63}>\s?$";
const CONFIG_PATTERN: &str = r"(?mi)^(\{\w+(:(\w+)?\d)?\}\[edit\]\n)?[\w\-@()/:\.]{1,63}#\s?$";

static EXEC_PROMPT: LazyLock<Regex> = LazyLock::new(|| Regex::new(EXEC_PATTERN).unwrap());
static CONFIG_PROMPT: LazyLock<Regex> = LazyLock::new(|| Regex::new(CONFIG_PATTERN).unwrap());
static ANY_PROMPT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!("(?:{EXEC_PATTERN})|(?:{CONFIG_PATTERN})")).unwrap());

/// Output substrings that mark a rejected command.
const FAILURE_PATTERNS: &[&str] = &[
    "unknown command",
    "syntax error",
    "error:",
    "missing argument",
    "is ambiguous",
    "No valid completions",
    "missing mandatory argument",
    "invalid numeric value",
];

/// Commands run right after login so output is never paged or wrapped.
const ON_OPEN_COMMANDS: &[&str] = &["set cli screen-length 0", "set cli screen-width 511"];

/// JUNOS CLI mode, derived from the prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliMode {
    /// Operational mode (`>`).
    Operational,
    /// Configuration mode (`#`).
    Configuration,
}

impl CliMode {
    /// Determine the mode from a prompt line.
    pub fn from_prompt(prompt: &str) -> Option<Self> {
        let prompt = prompt.trim_end();
        if EXEC_PROMPT.is_match(prompt.as_bytes()) {
            Some(CliMode::Operational)
        } else if CONFIG_PROMPT.is_match(prompt.as_bytes()) {
            Some(CliMode::Configuration)
        } else {
            None
        }
    }
}

/// Driver for a single JUNOS device over an SSH PTY.
pub struct JunosDriver {
    ssh_config: SshConfig,
    transport: Option<SshTransport>,
    channel: Option<PtyChannel>,
    command_timeout: Duration,
    mode: Option<CliMode>,
}

impl JunosDriver {
    /// Create a driver. Nothing is connected until [`Driver::open`].
    pub fn new(ssh_config: SshConfig, command_timeout: Duration) -> Self {
        Self {
            ssh_config,
            transport: None,
            channel: None,
            command_timeout,
            mode: None,
        }
    }

    /// Connection settings used by [`Driver::open`].
    pub fn ssh_config(&self) -> &SshConfig {
        &self.ssh_config
    }

    /// Per-request timeout applied once the session is open.
    pub fn command_timeout(&self) -> Duration {
        self.command_timeout
    }

    /// Build a response from raw channel output and update the tracked mode.
    ///
    /// `shown` is the form of `command` that may appear in logs and in the
    /// response.
    fn finish_response(
        &mut self,
        command: &str,
        shown: &str,
        data: &[u8],
        elapsed: Duration,
    ) -> Response {
        let raw = String::from_utf8_lossy(data).into_owned();
        let prompt = raw.lines().last().unwrap_or_default().trim().to_string();

        if let Some(mode) = CliMode::from_prompt(&prompt) {
            self.mode = Some(mode);
        }

        let result = normalize_output(&raw, command);
        let response = Response::new(shown, result, raw, prompt, elapsed);

        match detect_failure(&response.result) {
            Some(line) => {
                debug!("command '{}' failed: {}", shown, line);
                response.with_failure(line)
            }
            None => response,
        }
    }

    async fn exchange(&mut self, command: &str, shown: &str) -> Result<Response> {
        let channel = self.channel.as_mut().ok_or(DriverError::NotConnected)?;

        let start = Instant::now();
        trace!("> {}", shown);
        channel.send(command).await?;
        let data = channel.read_until_default(&ANY_PROMPT).await?;

        Ok(self.finish_response(command, shown, &data, start.elapsed()))
    }
}

impl Driver for JunosDriver {
    async fn open(&mut self) -> Result<()> {
        if self.channel.is_some() {
            return Err(DriverError::AlreadyConnected.into());
        }

        let transport = SshTransport::connect(self.ssh_config.clone()).await?;
        let channel = transport.open_channel().await?;
        let mut channel = PtyChannel::new(
            channel,
            PtyConfig {
                timeout: self.ssh_config.timeout,
                ..PtyConfig::default()
            },
        );

        let banner = channel.read_until_default(&ANY_PROMPT).await?;
        let banner = String::from_utf8_lossy(&banner);
        let prompt = banner.lines().last().unwrap_or_default().trim();
        let mode = CliMode::from_prompt(prompt).ok_or_else(|| DriverError::UnknownMode {
            prompt: prompt.to_string(),
        })?;
        debug!("{}: logged in, {:?} mode", self.ssh_config.host, mode);

        // From here on every request uses the fixed per-session timeout.
        channel.set_timeout(self.command_timeout);
        self.transport = Some(transport);
        self.channel = Some(channel);
        self.mode = Some(mode);

        for cmd in ON_OPEN_COMMANDS {
            self.send_command(cmd).await?;
        }

        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.mode = None;
        if let Some(channel) = self.channel.take() {
            if let Err(e) = channel.close().await {
                debug!("closing channel to {}: {}", self.ssh_config.host, e);
            }
        }
        if let Some(transport) = self.transport.take() {
            transport.close().await?;
        }
        Ok(())
    }

    async fn send_command(&mut self, command: &str) -> Result<Response> {
        self.exchange(command, command).await
    }

    async fn send_statement(&mut self, statement: &Statement) -> Result<Response> {
        self.exchange(statement.text(), &statement.to_string()).await
    }

    async fn send_with_answer(
        &mut self,
        command: &str,
        question: &Regex,
        answer: &str,
    ) -> Result<Response> {
        let channel = self.channel.as_mut().ok_or(DriverError::NotConnected)?;
        let either = Regex::new(&format!("(?:{})|(?:{})", ANY_PROMPT.as_str(), question.as_str()))
            .map_err(ChannelError::from)?;

        let start = Instant::now();
        channel.send(command).await?;
        let mut data = channel.read_until_default(&either).await?;

        if awaits_answer(&data, question) {
            debug!("answering '{}' to {:?}", answer, question.as_str());
            channel.send(answer).await?;
            data.extend(channel.read_until_default(&ANY_PROMPT).await?);
        }

        Ok(self.finish_response(command, command, &data, start.elapsed()))
    }

    fn set_password(&mut self, password: SecretString) {
        self.ssh_config.password = password;
    }

    fn host(&self) -> &str {
        &self.ssh_config.host
    }

    fn is_open(&self) -> bool {
        self.channel.is_some()
    }

    fn mode(&self) -> Option<CliMode> {
        self.mode
    }
}

/// Whether the output stopped on `question` rather than on a prompt.
pub(crate) fn awaits_answer(data: &[u8], question: &Regex) -> bool {
    question.is_match(data) && !ends_with_prompt(data)
}

fn ends_with_prompt(data: &[u8]) -> bool {
    let text = String::from_utf8_lossy(data);
    CliMode::from_prompt(text.lines().last().unwrap_or_default()).is_some()
}

/// Strip the command echo, the trailing prompt and the mode banner lines
/// (`[edit]`, `{master:0}`) that JUNOS prints before it.
pub(crate) fn normalize_output(raw: &str, command: &str) -> String {
    let mut lines: Vec<&str> = raw.lines().collect();

    if lines
        .first()
        .is_some_and(|first| !command.is_empty() && first.trim_end().ends_with(command.trim()))
    {
        lines.remove(0);
    }

    if lines
        .last()
        .is_some_and(|last| CliMode::from_prompt(last).is_some())
    {
        lines.pop();
    }

    while let Some(last) = lines.last() {
        let trimmed = last.trim();
        if trimmed.is_empty() || trimmed == "[edit]" || is_re_indicator(trimmed) {
            lines.pop();
        } else {
            break;
        }
    }

    while lines.first().is_some_and(|l| l.trim().is_empty()) {
        lines.remove(0);
    }

    lines.join("\n")
}

/// `{master:0}`, `{backup}`, `{master:0}[edit]` style routing-engine markers.
fn is_re_indicator(line: &str) -> bool {
    line.starts_with('{') && (line.ends_with('}') || line.ends_with("}[edit]"))
}

/// Return the first output line that matches a failure pattern.
pub(crate) fn detect_failure(output: &str) -> Option<String> {
    output
        .lines()
        .find(|line| FAILURE_PATTERNS.iter().any(|p| line.contains(p)))
        .map(|line| line.trim().to_string())
}
