//! Scripted doubles for driver, candidate and prompt seams.

use std::collections::{HashMap, VecDeque};
use std::io;
use std::sync::{Mutex, Once};
use std::time::Duration;

use log::{LevelFilter, Log, Metadata, Record};

use regex::bytes::Regex;
use secrecy::{ExposeSecret, SecretString};

use crate::candidate::CandidateConfig;
use crate::driver::{CliMode, Driver, Response};
use crate::driver::junos::{awaits_answer, detect_failure};
use crate::error::{ConfigError, Error, Result, TransportError};
use crate::prompt::Prompter;
use crate::table::PendingChange;

static LOG_LINES: Mutex<Vec<String>> = Mutex::new(Vec::new());
static LOGGER_INIT: Once = Once::new();

/// Logger that keeps every formatted record in memory.
struct CaptureLogger;

impl Log for CaptureLogger {
    fn enabled(&self, _: &Metadata<'_>) -> bool {
        true
    }

    fn log(&self, record: &Record<'_>) {
        if let Ok(mut lines) = LOG_LINES.lock() {
            lines.push(record.args().to_string());
        }
    }

    fn flush(&self) {}
}

static CAPTURE_LOGGER: CaptureLogger = CaptureLogger;

/// Route all log records, at every level, into memory for the test run.
pub(crate) fn capture_logs() {
    LOGGER_INIT.call_once(|| {
        if log::set_logger(&CAPTURE_LOGGER).is_ok() {
            log::set_max_level(LevelFilter::Trace);
        }
    });
}

/// Everything logged since [`capture_logs`] was first called.
pub(crate) fn logged() -> Vec<String> {
    LOG_LINES.lock().map(|lines| lines.clone()).unwrap_or_default()
}

/// Driver that replays canned outputs and records what was sent.
pub(crate) struct ScriptedDriver {
    host: String,
    open_results: VecDeque<Result<()>>,
    outputs: HashMap<String, VecDeque<String>>,
    open: bool,
    mode: Option<CliMode>,
    pub sent: Vec<String>,
    pub open_attempts: u32,
    pub passwords: Vec<String>,
    pub closed: bool,
}

impl ScriptedDriver {
    pub fn new(host: &str) -> Self {
        Self {
            host: host.to_string(),
            open_results: VecDeque::new(),
            outputs: HashMap::new(),
            open: false,
            mode: None,
            sent: Vec::new(),
            open_attempts: 0,
            passwords: Vec::new(),
            closed: false,
        }
    }

    pub fn connected(host: &str) -> Self {
        let mut driver = Self::new(host);
        driver.open = true;
        driver.mode = Some(CliMode::Operational);
        driver
    }

    /// Queue an output for `command`; the last queued output repeats.
    pub fn respond(&mut self, command: &str, output: &str) {
        self.outputs
            .entry(command.to_string())
            .or_default()
            .push_back(output.to_string());
    }

    pub fn open_fails_auth(mut self, times: usize) -> Self {
        for _ in 0..times {
            self.open_results
                .push_back(Err(TransportError::AuthenticationFailed {
                    user: "alice".to_string(),
                }
                .into()));
        }
        self
    }

    pub fn open_unreachable(mut self) -> Self {
        self.open_results.push_back(Err(TransportError::ConnectionFailed {
            host: self.host.clone(),
            port: 22,
            source: io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused"),
        }
        .into()));
        self
    }

    fn output_for(&mut self, command: &str) -> String {
        match self.outputs.get_mut(command) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or_default(),
            Some(queue) => queue.front().cloned().unwrap_or_default(),
            None => String::new(),
        }
    }

    fn reply(&mut self, command: &str) -> Result<Response> {
        if !self.open {
            return Err(crate::error::DriverError::NotConnected.into());
        }
        self.sent.push(command.to_string());
        let output = self.output_for(command);
        let response = Response::new(command, output.clone(), output, "admin@r1>", Duration::ZERO);
        let response = match detect_failure(&response.result) {
            Some(line) => response.with_failure(line),
            None => response,
        };
        if response.is_success() {
            if command.starts_with("configure") {
                self.mode = Some(CliMode::Configuration);
            } else if command == "exit configuration-mode" {
                self.mode = Some(CliMode::Operational);
            }
        }
        Ok(response)
    }
}

impl Driver for ScriptedDriver {
    async fn open(&mut self) -> Result<()> {
        self.open_attempts += 1;
        match self.open_results.pop_front() {
            Some(Err(e)) => Err(e),
            _ => {
                self.open = true;
                self.mode = Some(CliMode::Operational);
                Ok(())
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.open = false;
        self.mode = None;
        self.closed = true;
        Ok(())
    }

    async fn send_command(&mut self, command: &str) -> Result<Response> {
        self.reply(command)
    }

    async fn send_with_answer(
        &mut self,
        command: &str,
        question: &Regex,
        answer: &str,
    ) -> Result<Response> {
        let response = self.reply(command)?;
        if awaits_answer(response.raw_result.as_bytes(), question) {
            self.sent.push(format!("<answer {answer}>"));
        }
        Ok(response)
    }

    fn set_password(&mut self, password: SecretString) {
        self.passwords.push(password.expose_secret().to_string());
    }

    fn host(&self) -> &str {
        &self.host
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn mode(&self) -> Option<CliMode> {
        self.mode
    }
}

/// Prompter fed from queued answers.
#[derive(Default)]
pub(crate) struct ScriptedPrompter {
    answers: VecDeque<String>,
    secrets: VecDeque<String>,
    pub asked: Vec<String>,
}

impl ScriptedPrompter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answers<const N: usize>(mut self, answers: [&str; N]) -> Self {
        self.answers.extend(answers.iter().map(|a| a.to_string()));
        self
    }

    pub fn secrets<const N: usize>(mut self, secrets: [&str; N]) -> Self {
        self.secrets.extend(secrets.iter().map(|s| s.to_string()));
        self
    }
}

fn exhausted() -> Error {
    Error::Prompt(io::Error::new(io::ErrorKind::UnexpectedEof, "no scripted answer"))
}

impl Prompter for ScriptedPrompter {
    fn password(&mut self, prompt: &str) -> Result<SecretString> {
        self.asked.push(prompt.to_string());
        self.secrets
            .pop_front()
            .map(SecretString::from)
            .ok_or_else(exhausted)
    }

    fn input(&mut self, prompt: &str, default: Option<&str>) -> Result<String> {
        self.asked.push(prompt.to_string());
        let answer = self.answers.pop_front().ok_or_else(exhausted)?;
        match default {
            Some(default) if answer.is_empty() => Ok(default.to_string()),
            _ => Ok(answer),
        }
    }
}

/// Which candidate step to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FailAt {
    Lock,
    Load,
    Diff,
    Commit,
    Rollback,
    Unlock,
}

/// Candidate that records the call order and fails on request.
#[derive(Default)]
pub(crate) struct RecordingCandidate {
    pub calls: Vec<String>,
    fail: Vec<FailAt>,
    locked: bool,
}

impl RecordingCandidate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(steps: &[FailAt]) -> Self {
        Self {
            fail: steps.to_vec(),
            ..Self::default()
        }
    }

    fn fails(&self, step: FailAt) -> bool {
        self.fail.contains(&step)
    }
}

impl CandidateConfig for RecordingCandidate {
    async fn lock(&mut self) -> Result<()> {
        self.calls.push("lock".into());
        if self.fails(FailAt::Lock) {
            return Err(ConfigError::Lock {
                message: "configuration database locked by: bob".into(),
            }
            .into());
        }
        self.locked = true;
        Ok(())
    }

    async fn load(&mut self, change: &PendingChange) -> Result<()> {
        self.calls.push(format!("load {}", change.statements().len()));
        if self.fails(FailAt::Load) {
            return Err(ConfigError::Load {
                message: "syntax error".into(),
            }
            .into());
        }
        Ok(())
    }

    async fn diff(&mut self) -> Result<String> {
        self.calls.push("diff".into());
        if self.fails(FailAt::Diff) {
            return Err(ConfigError::Diff {
                message: "error: timeout".into(),
            }
            .into());
        }
        Ok("[edit system login]\n+    user ops {\n+        class super-user;\n+    }".into())
    }

    async fn commit(&mut self, comment: &str) -> Result<()> {
        self.calls.push(format!("commit {comment}"));
        if !self.locked {
            return Err(ConfigError::NotLocked.into());
        }
        if self.fails(FailAt::Commit) {
            return Err(ConfigError::Commit {
                message: "error: configuration check-out failed".into(),
            }
            .into());
        }
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        self.calls.push("rollback".into());
        if self.fails(FailAt::Rollback) {
            return Err(ConfigError::Rollback {
                message: "error: rollback failed".into(),
            }
            .into());
        }
        Ok(())
    }

    async fn unlock(&mut self) -> Result<()> {
        self.calls.push("unlock".into());
        self.locked = false;
        if self.fails(FailAt::Unlock) {
            return Err(ConfigError::Unlock {
                message: "error: unlock failed".into(),
            }
            .into());
        }
        Ok(())
    }

    fn is_locked(&self) -> bool {
        self.locked
    }
}
