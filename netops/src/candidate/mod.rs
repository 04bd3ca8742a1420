//! Candidate configuration traits.
//!
//! A candidate is the device-side edit buffer a [`PendingChange`] is loaded
//! into. Each step of the change sequence is one trait method so the
//! sequencer can be driven against a recording double.
//!
//! [`PendingChange`]: crate::table::PendingChange

mod junos;

pub use junos::JunosCandidate;

use std::future::Future;

use crate::error::Result;
use crate::table::PendingChange;

/// Exclusive-edit access to a device's candidate configuration.
pub trait CandidateConfig: Send {
    /// Acquire the exclusive configuration lock.
    fn lock(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Stage a pending change. Requires the lock.
    fn load(&mut self, change: &PendingChange) -> impl Future<Output = Result<()>> + Send;

    /// Human-readable diff of the staged, uncommitted edits.
    fn diff(&mut self) -> impl Future<Output = Result<String>> + Send;

    /// Commit the staged edits with an audit comment. Requires the lock.
    fn commit(&mut self, comment: &str) -> impl Future<Output = Result<()>> + Send;

    /// Discard all uncommitted edits.
    fn rollback(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Release the lock.
    fn unlock(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Whether the lock is currently held.
    fn is_locked(&self) -> bool;
}
