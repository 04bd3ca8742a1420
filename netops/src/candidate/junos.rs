//! JUNOS candidate configuration over the CLI.
//!
//! The lock is `configure exclusive`: while this session sits in exclusive
//! configuration mode no other user can edit the candidate. Leaving
//! configuration mode releases it.
//!
//! # Example
//!
//! ```rust,no_run
//! use netops::candidate::{CandidateConfig, JunosCandidate};
//! use netops::driver::{Driver, DriverBuilder};
//! use netops::table::{ConfigTable, UserConfigTable};
//!
//! # async fn example() -> Result<(), netops::Error> {
//! let mut driver = DriverBuilder::new("r1").username("admin").password("secret").build()?;
//! driver.open().await?;
//!
//! let change = UserConfigTable::new("ops").to_change()?;
//! let mut candidate = JunosCandidate::new(&mut driver);
//! candidate.lock().await?;
//! candidate.load(&change).await?;
//! println!("{}", candidate.diff().await?);
//! candidate.commit("CHG0042/admin").await?;
//! candidate.unlock().await?;
//! # Ok(())
//! # }
//! ```

use std::sync::LazyLock;

use log::{debug, trace, warn};
use regex::bytes::Regex;

use super::CandidateConfig;
use crate::driver::{CliMode, Driver};
use crate::error::{ConfigError, Result};
use crate::table::PendingChange;

/// Question JUNOS asks when leaving configuration mode with staged edits.
static DISCARD_QUESTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)\[yes,no\]\s*(\(\w+\))?\s*$").unwrap());

/// JUNOS candidate configuration guard.
///
/// Holds `&mut D` so nothing else can drive the session while the lock is
/// held.
pub struct JunosCandidate<'a, D: Driver> {
    driver: &'a mut D,
    locked: bool,
}

impl<'a, D: Driver> JunosCandidate<'a, D> {
    pub fn new(driver: &'a mut D) -> Self {
        Self {
            driver,
            locked: false,
        }
    }

    fn require_lock(&self) -> Result<()> {
        if self.locked {
            Ok(())
        } else {
            Err(ConfigError::NotLocked.into())
        }
    }
}

impl<D: Driver> CandidateConfig for JunosCandidate<'_, D> {
    async fn lock(&mut self) -> Result<()> {
        if self.locked {
            return Ok(());
        }
        debug!("{}: configure exclusive", self.driver.host());

        let response = self
            .driver
            .send_command("configure exclusive")
            .await
            .map_err(|e| ConfigError::Lock {
                message: e.to_string(),
            })?;

        if !response.is_success() || self.driver.mode() != Some(CliMode::Configuration) {
            return Err(ConfigError::Lock {
                message: response.failure_text(),
            }
            .into());
        }

        self.locked = true;
        Ok(())
    }

    async fn load(&mut self, change: &PendingChange) -> Result<()> {
        self.require_lock()?;
        debug!(
            "{}: loading {} ({} statements)",
            self.driver.host(),
            change.description(),
            change.statements().len()
        );

        for statement in change.statements() {
            trace!("load: {}", statement);
            let response = self
                .driver
                .send_statement(statement)
                .await
                .map_err(|e| ConfigError::Load {
                    message: format!("{statement}: {e}"),
                })?;
            if !response.is_success() {
                return Err(ConfigError::Load {
                    message: format!("{statement}: {}", response.failure_text()),
                }
                .into());
            }
        }
        Ok(())
    }

    async fn diff(&mut self) -> Result<String> {
        let response = self
            .driver
            .send_command("show | compare")
            .await
            .map_err(|e| ConfigError::Diff {
                message: e.to_string(),
            })?;
        if !response.is_success() {
            return Err(ConfigError::Diff {
                message: response.failure_text(),
            }
            .into());
        }
        Ok(response.result)
    }

    async fn commit(&mut self, comment: &str) -> Result<()> {
        self.require_lock()?;
        let command = format!("commit comment \"{}\"", comment.replace('"', "'"));
        debug!("{}: {}", self.driver.host(), command);

        let response = self
            .driver
            .send_command(&command)
            .await
            .map_err(|e| ConfigError::Commit {
                message: e.to_string(),
            })?;
        if !response.is_success() || !response.contains("commit complete") {
            return Err(ConfigError::Commit {
                message: response.failure_text(),
            }
            .into());
        }
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        let response = self
            .driver
            .send_command("rollback 0")
            .await
            .map_err(|e| ConfigError::Rollback {
                message: e.to_string(),
            })?;
        if !response.is_success() {
            return Err(ConfigError::Rollback {
                message: response.failure_text(),
            }
            .into());
        }
        Ok(())
    }

    async fn unlock(&mut self) -> Result<()> {
        if !self.locked {
            return Ok(());
        }
        // Leaving the session is the only way to release the lock, so it is
        // considered released whatever the device answers.
        self.locked = false;

        let response = self
            .driver
            .send_with_answer("exit configuration-mode", &DISCARD_QUESTION, "yes")
            .await
            .map_err(|e| ConfigError::Unlock {
                message: e.to_string(),
            })?;
        if !response.is_success() || self.driver.mode() != Some(CliMode::Operational) {
            return Err(ConfigError::Unlock {
                message: response.failure_text(),
            }
            .into());
        }
        Ok(())
    }

    fn is_locked(&self) -> bool {
        self.locked
    }
}

impl<D: Driver> Drop for JunosCandidate<'_, D> {
    fn drop(&mut self) {
        if self.locked {
            warn!(
                "{}: candidate dropped while holding the configuration lock",
                self.driver.host()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;

    use super::*;
    use crate::error::Error;
    use crate::table::{ConfigTable, Statement, UserConfigTable};
    use crate::testing::ScriptedDriver;

    const ENTER: &str =
        "warning: uncommitted changes will be discarded on exit\nEntering configuration mode";

    fn driver() -> ScriptedDriver {
        let mut driver = ScriptedDriver::connected("r1");
        driver.respond("configure exclusive", ENTER);
        driver
    }

    #[tokio::test]
    async fn test_lock_enters_exclusive_mode() {
        let mut driver = driver();
        let mut candidate = JunosCandidate::new(&mut driver);
        candidate.lock().await.unwrap();
        assert!(candidate.is_locked());
        candidate.unlock().await.unwrap();
        drop(candidate);

        assert_eq!(driver.sent, vec!["configure exclusive", "exit configuration-mode"]);
        assert_eq!(driver.mode(), Some(CliMode::Operational));
    }

    #[tokio::test]
    async fn test_lock_refused() {
        let mut driver = ScriptedDriver::connected("r1");
        driver.respond(
            "configure exclusive",
            "error: configuration database locked by:\n  bob terminal pts/1 (pid 4242) on since 2024-01-01",
        );
        let mut candidate = JunosCandidate::new(&mut driver);

        let err = candidate.lock().await.unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::Lock { ref message }) if message.contains("locked by")));
        assert!(!candidate.is_locked());
    }

    #[tokio::test]
    async fn test_load_and_commit() {
        let mut driver = driver();
        driver.respond("commit comment \"TICKET123/alice\"", "commit complete");
        let mut change = PendingChange::new("test");
        change.push(Statement::new("set system login user ops class super-user"));

        let mut candidate = JunosCandidate::new(&mut driver);
        candidate.lock().await.unwrap();
        candidate.load(&change).await.unwrap();
        candidate.commit("TICKET123/alice").await.unwrap();
        candidate.unlock().await.unwrap();
        drop(candidate);

        assert_eq!(
            driver.sent,
            vec![
                "configure exclusive",
                "set system login user ops class super-user",
                "commit comment \"TICKET123/alice\"",
                "exit configuration-mode",
            ]
        );
    }

    #[tokio::test]
    async fn test_unlock_discards_uncommitted_changes() {
        let mut driver = driver();
        driver.respond(
            "exit configuration-mode",
            "The configuration has been changed but not committed\nExit with uncommitted changes? [yes,no] (yes) ",
        );
        let mut change = PendingChange::new("test");
        change.push(Statement::new("set system login user ops class super-user"));

        let mut candidate = JunosCandidate::new(&mut driver);
        candidate.lock().await.unwrap();
        candidate.load(&change).await.unwrap();
        candidate.unlock().await.unwrap();
        drop(candidate);

        assert_eq!(
            &driver.sent[2..],
            &["exit configuration-mode", "<answer yes>"]
        );
        assert_eq!(driver.mode(), Some(CliMode::Operational));
    }

    #[tokio::test]
    async fn test_load_error_masks_password() {
        let mut table = UserConfigTable::new("ops");
        table.password = Some(SecretString::from("hunter2"));
        let change = table.to_change().unwrap();

        let mut driver = driver();
        driver.respond(change.statements()[0].text(), "                ^\nsyntax error.");
        let mut candidate = JunosCandidate::new(&mut driver);
        candidate.lock().await.unwrap();

        let err = candidate.load(&change).await.unwrap_err().to_string();
        assert!(err.contains("syntax error."));
        assert!(!err.contains("hunter2"));
        candidate.unlock().await.unwrap();
    }

    #[tokio::test]
    async fn test_commit_requires_lock() {
        let mut driver = driver();
        let mut candidate = JunosCandidate::new(&mut driver);
        let err = candidate.commit("T/alice").await.unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::NotLocked)));
        drop(candidate);
        assert!(driver.sent.is_empty());
    }

    #[tokio::test]
    async fn test_commit_without_confirmation_fails() {
        let mut driver = driver();
        driver.respond(
            "commit comment \"T/alice\"",
            "[edit system login user ops]\n  'class'\n    error: missing mandatory statement\nerror: configuration check-out failed",
        );
        let mut candidate = JunosCandidate::new(&mut driver);
        candidate.lock().await.unwrap();

        let err = candidate.commit("T/alice").await.unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::Commit { .. })));
        assert!(candidate.is_locked());
        candidate.unlock().await.unwrap();
    }

    #[tokio::test]
    async fn test_diff_and_rollback() {
        let mut driver = driver();
        driver.respond("show | compare", "[edit system login]\n+    user ops {\n+    }");
        driver.respond("rollback 0", "load complete");
        let mut candidate = JunosCandidate::new(&mut driver);
        candidate.lock().await.unwrap();

        let diff = candidate.diff().await.unwrap();
        assert!(diff.starts_with("[edit system login]"));
        candidate.rollback().await.unwrap();
        candidate.unlock().await.unwrap();
    }

    #[tokio::test]
    async fn test_unlock_without_lock_is_noop() {
        let mut driver = driver();
        let mut candidate = JunosCandidate::new(&mut driver);
        candidate.unlock().await.unwrap();
        drop(candidate);
        assert!(driver.sent.is_empty());
    }
}
