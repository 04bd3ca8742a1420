//! Operator prompts.
//!
//! Everything that needs an answer from the operator goes through the
//! [`Prompter`] capability, so the connector, the sequencer and the account
//! workflow can run against scripted answers in tests.

use std::io::{self, Write};

use dialoguer::{Input, Password};
use secrecy::SecretString;

use crate::error::{Error, Result};

/// Source of operator input.
pub trait Prompter {
    /// Ask for a secret without echo.
    fn password(&mut self, prompt: &str) -> Result<SecretString>;

    /// Ask for a line of text. An empty answer yields `default` when given.
    fn input(&mut self, prompt: &str, default: Option<&str>) -> Result<String>;
}

/// Ask for a line of text and record `<prompt>: <answer>` in `out`.
///
/// Terminal input never reaches the transcript on its own, so every
/// non-secret answer goes through here.
pub fn ask<P, W>(prompter: &mut P, out: &mut W, prompt: &str, default: Option<&str>) -> Result<String>
where
    P: Prompter + ?Sized,
    W: Write + ?Sized,
{
    let answer = prompter.input(prompt, default)?;
    report!(out, "{}: {}", prompt, answer);
    Ok(answer)
}

/// Only an explicit `y`/`Y` counts as yes.
pub fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim(), "y" | "Y")
}

/// Only an explicit `n`/`N` counts as no.
pub fn is_negative(answer: &str) -> bool {
    matches!(answer.trim(), "n" | "N")
}

/// Interactive prompter on the controlling terminal.
#[derive(Debug, Default)]
pub struct ConsolePrompter;

impl ConsolePrompter {
    pub fn new() -> Self {
        Self
    }
}

fn prompt_error(e: dialoguer::Error) -> Error {
    Error::Prompt(io::Error::other(e))
}

impl Prompter for ConsolePrompter {
    fn password(&mut self, prompt: &str) -> Result<SecretString> {
        let secret = Password::new()
            .with_prompt(prompt)
            .allow_empty_password(true)
            .interact()
            .map_err(prompt_error)?;
        Ok(SecretString::from(secret))
    }

    fn input(&mut self, prompt: &str, default: Option<&str>) -> Result<String> {
        // The answer is echoed by `ask`, not by dialoguer.
        let mut input = Input::<String>::new()
            .with_prompt(prompt)
            .allow_empty(true)
            .report(false);
        if let Some(default) = default {
            input = input.default(default.to_string());
        }
        input.interact_text().map_err(prompt_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedPrompter;

    #[test]
    fn test_is_affirmative() {
        assert!(is_affirmative("y"));
        assert!(is_affirmative(" Y\n"));
        assert!(!is_affirmative(""));
        assert!(!is_affirmative("yes"));
        assert!(!is_affirmative("N"));
    }

    #[test]
    fn test_ask_records_question_and_answer() {
        let mut prompter = ScriptedPrompter::new().answers(["", "y"]);
        let mut out = Vec::new();

        assert_eq!(ask(&mut prompter, &mut out, "Apply? y/n[N]", Some("N")).unwrap(), "N");
        assert_eq!(ask(&mut prompter, &mut out, "Ticket", None).unwrap(), "y");
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Apply? y/n[N]: N\nTicket: y\n"
        );
    }

    #[test]
    fn test_ask_failure_writes_nothing() {
        let mut prompter = ScriptedPrompter::new();
        let mut out = Vec::new();
        assert!(ask(&mut prompter, &mut out, "Ticket", None).is_err());
        assert!(out.is_empty());
    }
}
