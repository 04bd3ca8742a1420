//! Change sequencer.
//!
//! Drives a [`CandidateConfig`] through
//! `lock → load → diff → confirm → commit | rollback → unlock`.
//!
//! Once the lock is held, every exit path makes exactly one unlock attempt.
//! Failures after the lock are reported and never escalated: the caller
//! always gets a [`SequenceReport`] back and moves on to the next device.

use std::fmt;
use std::io::Write;

use colored::Colorize;
use log::{debug, warn};

use crate::candidate::CandidateConfig;
use crate::error::Error;
use crate::prompt::{Prompter, ask, is_affirmative};
use crate::table::PendingChange;

const APPLY_PROMPT: &str = "Do you want to apply these changes? y/n[N]";

/// Where a change is in the sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeState {
    Unlocked,
    Locked,
    Loaded,
    Confirmed,
    Declined,
    Committed,
    RolledBack,
}

impl fmt::Display for ChangeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChangeState::Unlocked => "unlocked",
            ChangeState::Locked => "locked",
            ChangeState::Loaded => "loaded",
            ChangeState::Confirmed => "confirmed",
            ChangeState::Declined => "declined",
            ChangeState::Committed => "committed",
            ChangeState::RolledBack => "rolled back",
        };
        f.write_str(name)
    }
}

/// Audit context for a commit.
#[derive(Debug, Clone)]
pub struct CommitContext {
    pub ticket: String,
    pub operator: String,
}

impl CommitContext {
    pub fn new(ticket: impl Into<String>, operator: impl Into<String>) -> Self {
        Self {
            ticket: ticket.into(),
            operator: operator.into(),
        }
    }

    /// Commit comment, `<ticket>/<operator>`.
    pub fn comment(&self) -> String {
        format!("{}/{}", self.ticket, self.operator)
    }
}

/// Outcome of one run of the sequence.
#[derive(Debug, Clone, Default)]
pub struct SequenceReport {
    /// States entered, in order. Starts with [`ChangeState::Unlocked`].
    pub transitions: Vec<ChangeState>,
    /// Diff shown to the operator, if one was produced.
    pub diff: Option<String>,
    /// Whether the device accepted the commit.
    pub committed: bool,
    /// Every failure reported along the way.
    pub failures: Vec<String>,
}

impl SequenceReport {
    fn enter(&mut self, state: ChangeState) {
        debug!("change state: {}", state);
        self.transitions.push(state);
    }

    fn fail<W: Write>(&mut self, out: &mut W, error: &Error) {
        let message = match error {
            Error::Config(inner) => inner.to_string(),
            other => other.to_string(),
        };
        report!(out, "{}", message);
        self.failures.push(message);
    }

    /// Last state entered.
    pub fn state(&self) -> Option<ChangeState> {
        self.transitions.last().copied()
    }

    /// Whether the sequence ended with the lock released.
    pub fn released(&self) -> bool {
        self.state() == Some(ChangeState::Unlocked)
    }
}

/// Run the change sequence for `change` on one device.
///
/// The operator is shown the diff and asked to confirm. Only an explicit
/// `y`/`Y` commits. Anything else, including a failed prompt, discards.
pub async fn apply_change<C, P, W>(
    candidate: &mut C,
    change: &PendingChange,
    context: &CommitContext,
    host: &str,
    prompter: &mut P,
    out: &mut W,
) -> SequenceReport
where
    C: CandidateConfig,
    P: Prompter,
    W: Write,
{
    let mut report = SequenceReport::default();
    report.enter(ChangeState::Unlocked);

    report!(out, "Locking the configuration");
    if let Err(e) = candidate.lock().await {
        report.fail(out, &e);
        return report;
    }
    report.enter(ChangeState::Locked);

    if let Err(e) = candidate.load(change).await {
        report.fail(out, &e);
        release(candidate, out, &mut report).await;
        return report;
    }
    report.enter(ChangeState::Loaded);

    let diff = match candidate.diff().await {
        Ok(diff) => diff,
        Err(e) => {
            report.fail(out, &e);
            release(candidate, out, &mut report).await;
            return report;
        }
    };

    report!(
        out,
        "{}",
        format!("Review the configuration changes to be applied on {host}").yellow()
    );
    report!(out, "{}", diff);
    report.diff = Some(diff);

    let confirmed = match ask(prompter, out, APPLY_PROMPT, Some("N")) {
        Ok(answer) => is_affirmative(&answer),
        Err(e) => {
            warn!("confirmation prompt failed, treating as declined: {}", e);
            false
        }
    };

    if confirmed {
        report.enter(ChangeState::Confirmed);
        report!(out, "Committing the configuration");
        match candidate.commit(&context.comment()).await {
            Ok(()) => {
                report.committed = true;
                report.enter(ChangeState::Committed);
            }
            Err(e) => {
                report.fail(out, &e);
                discard(candidate, out, &mut report).await;
            }
        }
    } else {
        report.enter(ChangeState::Declined);
        discard(candidate, out, &mut report).await;
    }

    release(candidate, out, &mut report).await;
    report
}

async fn discard<C: CandidateConfig, W: Write>(
    candidate: &mut C,
    out: &mut W,
    report: &mut SequenceReport,
) {
    report!(out, "Discarding changes");
    match candidate.rollback().await {
        Ok(()) => report.enter(ChangeState::RolledBack),
        Err(e) => report.fail(out, &e),
    }
}

async fn release<C: CandidateConfig, W: Write>(
    candidate: &mut C,
    out: &mut W,
    report: &mut SequenceReport,
) {
    report!(out, "Unlocking the configuration");
    match candidate.unlock().await {
        Ok(()) => report.enter(ChangeState::Unlocked),
        Err(e) => report.fail(out, &e),
    }
}
