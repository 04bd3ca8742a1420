//! Local account provisioning (`usercfg`).
//!
//! Creates or updates one local login account on every device of an
//! inventory. The operator describes the account once, confirms the device
//! list, and then reviews and confirms the diff on each device.

use std::env;
use std::fs;
use std::io::Write;
use std::path::Path;

use colored::Colorize;
use log::{info, warn};
use secrecy::{ExposeSecret, SecretString};

use crate::candidate::JunosCandidate;
use crate::connector;
use crate::driver::{Driver, DriverBuilder, JunosDriver};
use crate::error::Result;
use crate::inventory::{Device, Inventory};
use crate::notify::{Email, Mailer};
use crate::prompt::{Prompter, ask, is_affirmative, is_negative};
use crate::sequencer::{self, CommitContext, SequenceReport};
use crate::settings::Settings;
use crate::table::{ConfigTable, PendingChange, UserConfigTable, junos_key_kind, list_local_accounts, parse_key_file};
use crate::transcript::{Transcript, TranscriptPaths};

/// Transcript and script name.
pub const SCRIPT_NAME: &str = "usercfg";

const DEFAULT_ACCOUNT: &str = "Emergency";
const DEFAULT_FULL_NAME: &str = "Local emergency user account";
const DEFAULT_CLASS: &str = "super-user";
const NO_KEY: &str = "no key";

/// Re-asks after the first answer for the password repeat and the key path.
pub const MAX_RETRIES: u32 = 3;

const MAIL_BODY: &str = "This is the result of the script you ran";

/// What the operator asked for.
#[derive(Debug, Clone)]
pub struct AccountRequest {
    pub table: UserConfigTable,
    pub ticket: String,
}

/// Options given on the command line.
#[derive(Debug, Clone, Default)]
pub struct UsercfgOptions {
    pub inventory: String,
    pub user: Option<String>,
    pub password: Option<SecretString>,
    pub email: Option<String>,
}

/// What happened on one device.
#[derive(Debug, Clone)]
pub enum DeviceOutcome {
    /// No session could be opened.
    Unreachable,
    /// The change sequence ran.
    Sequenced(SequenceReport),
}

impl DeviceOutcome {
    pub fn committed(&self) -> bool {
        matches!(self, DeviceOutcome::Sequenced(report) if report.committed)
    }
}

/// Result of a whole run.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub cancelled: bool,
    pub outcomes: Vec<(String, DeviceOutcome)>,
    pub transcript: Option<TranscriptPaths>,
    pub mailed_to: Option<String>,
}

/// Ask the operator to describe the account.
pub fn collect_request<P: Prompter, W: Write>(prompter: &mut P, out: &mut W) -> Result<AccountRequest> {
    report!(out, "{}", "Enter the account to be modified or created".yellow());

    let mut username = String::new();
    while username.is_empty() {
        username = ask(prompter, out, "Account", Some(DEFAULT_ACCOUNT))?.trim().to_string();
    }

    let password = collect_password(prompter, out)?;
    let full_name = ask(prompter, out, "Full name", Some(DEFAULT_FULL_NAME))?;
    let class = ask(
        prompter,
        out,
        "Login class (e.g. operator, read-only, unauthorized)",
        Some(DEFAULT_CLASS),
    )?;
    let key_path = ask(prompter, out, "Path to SSH key", Some(NO_KEY))?;
    let ssh_keys = collect_ssh_keys(prompter, out, key_path)?;
    let ticket = ask(prompter, out, "Ticket", None)?.trim().to_string();

    let mut table = UserConfigTable::new(username);
    table.full_name = Some(full_name.trim().to_string());
    table.class = Some(class.trim().to_string());
    table.password = password;
    table.ssh_keys = ssh_keys;

    Ok(AccountRequest { table, ticket })
}

fn collect_password<P: Prompter, W: Write>(
    prompter: &mut P,
    out: &mut W,
) -> Result<Option<SecretString>> {
    let password = prompter.password("Password")?;
    if password.expose_secret().is_empty() {
        return Ok(None);
    }

    let mut repeat = prompter.password("Repeat the password")?;
    let mut retries = 0;
    while repeat.expose_secret() != password.expose_secret() {
        if retries == MAX_RETRIES {
            report!(out, "Too many failures, password won't be configured");
            return Ok(None);
        }
        retries += 1;
        repeat = prompter.password("Password doesn't match, repeat again")?;
    }
    Ok(Some(password))
}

fn collect_ssh_keys<P: Prompter, W: Write>(
    prompter: &mut P,
    out: &mut W,
    mut path: String,
) -> Result<Vec<String>> {
    let mut retries = 0;
    loop {
        let trimmed = path.trim();
        if trimmed.is_empty() || trimmed == NO_KEY {
            return Ok(Vec::new());
        }
        match read_ssh_keys(Path::new(trimmed)) {
            Ok(keys) => return Ok(keys),
            Err(reason) => report!(out, "{}", reason),
        }
        if retries == MAX_RETRIES {
            report!(out, "Too many failures, SSH key won't be configured");
            return Ok(Vec::new());
        }
        retries += 1;
        path = ask(prompter, out, "SSH key not found. Path to SSH key", Some(NO_KEY))?;
    }
}

/// Read and validate the public keys in an authorized_keys style file.
fn read_ssh_keys(path: &Path) -> std::result::Result<Vec<String>, String> {
    let content =
        fs::read_to_string(path).map_err(|e| format!("Cannot read {}: {}", path.display(), e))?;
    let keys = parse_key_file(&content);
    if keys.is_empty() {
        return Err(format!("No SSH public key in {}", path.display()));
    }
    for key in &keys {
        junos_key_kind(key).map_err(|e| format!("{}: {}", path.display(), e))?;
    }
    Ok(keys)
}

/// Show what is about to happen and ask to continue.
///
/// `n`/`N` (or just Enter) cancels, `y`/`Y` continues, anything else asks
/// again.
pub fn confirm_run<'a, P, W>(
    prompter: &mut P,
    out: &mut W,
    account: &str,
    devices: impl IntoIterator<Item = &'a str>,
) -> Result<bool>
where
    P: Prompter,
    W: Write,
{
    report!(
        out,
        "{}",
        format!("\nThis script will create or update login account {account} on following routers:")
            .yellow()
    );
    for device in devices {
        report!(out, "  - {}", device);
    }

    loop {
        let answer = ask(prompter, out, "Do you want to continue? y/n[N]", Some("N"))?;
        if is_affirmative(&answer) {
            return Ok(true);
        }
        if is_negative(&answer) {
            report!(out, "Script execution canceled");
            return Ok(false);
        }
    }
}

/// Admin credentials, prompting for whatever the command line left out.
pub fn collect_credentials<P: Prompter, W: Write>(
    prompter: &mut P,
    out: &mut W,
    user: Option<String>,
    password: Option<SecretString>,
) -> Result<(String, SecretString)> {
    let user = match user {
        Some(user) => user,
        None => {
            let default = env::var("USER").or_else(|_| env::var("USERNAME")).ok();
            let mut user = String::new();
            while user.is_empty() {
                user = ask(prompter, out, "Username", default.as_deref())?.trim().to_string();
            }
            user
        }
    };
    let password = match password {
        Some(password) => password,
        None => prompter.password("Password")?,
    };
    Ok((user, password))
}

/// Connect, show the current accounts, run the change, and close.
///
/// The session is closed on every path.
pub async fn configure_device<D, P, W>(
    driver: &mut D,
    change: &PendingChange,
    context: &CommitContext,
    prompter: &mut P,
    out: &mut W,
) -> DeviceOutcome
where
    D: Driver,
    P: Prompter,
    W: Write,
{
    let host = driver.host().to_string();
    let outcome = if connector::open_with_retry(driver, prompter, out).await {
        match list_local_accounts(driver).await {
            Ok(accounts) => {
                report!(out, "Local accounts:");
                for account in &accounts {
                    report!(out, "  {}", account);
                }
            }
            Err(e) => report!(out, "Cannot list local accounts: {}", e),
        }

        let mut candidate = JunosCandidate::new(driver);
        let report =
            sequencer::apply_change(&mut candidate, change, context, &host, prompter, out).await;
        DeviceOutcome::Sequenced(report)
    } else {
        DeviceOutcome::Unreachable
    };

    if let Err(e) = driver.close().await {
        warn!("closing session to {}: {}", host, e);
    }
    outcome
}

/// Driver for one inventory device, with the `[ssh]` and `[general]`
/// settings applied.
fn device_driver(
    settings: &Settings,
    device: &Device,
    user: &str,
    password: &SecretString,
) -> Result<JunosDriver> {
    let mut builder = DriverBuilder::new(&device.ip)
        .port(device.ssh_port())
        .username(user)
        .password(password.clone())
        .timeout(settings.ssh.connect_timeout())
        .command_timeout(settings.general.command_timeout())
        .host_key_verification(settings.ssh.host_key_verification);
    if let Some(path) = &settings.ssh.known_hosts_path {
        builder = builder.known_hosts_path(path);
    }
    builder.build()
}

/// Run the whole workflow against the named inventory.
///
/// Once the transcript is open it is finished and converted to HTML on every
/// path. An error that stops the run is written to it before being returned.
pub async fn run<P: Prompter>(
    settings: &Settings,
    options: UsercfgOptions,
    prompter: &mut P,
) -> Result<RunSummary> {
    let inventory = Inventory::load(&settings.general.inventory_dir, &options.inventory)?;
    let mut transcript = Transcript::start(&settings.general.output_dir, SCRIPT_NAME)?;
    let mut summary = RunSummary::default();

    let provisioned = provision(
        settings,
        &inventory,
        options,
        prompter,
        &mut transcript,
        &mut summary,
    )
    .await;
    if let Err(e) = &provisioned {
        let out = &mut transcript;
        report!(out, "{}", format!("Run aborted: {e}").red());
    }
    let finished = transcript.finish();
    let recipient = provisioned?;
    let paths = finished?;

    if let Some(recipient) = recipient {
        Mailer::new(&settings.smtp)
            .send(&Email::new(recipient.as_str(), MAIL_BODY).attach(&paths.html))?;
        summary.mailed_to = Some(recipient);
    }
    info!(
        "{} of {} devices committed",
        summary.outcomes.iter().filter(|(_, o)| o.committed()).count(),
        summary.outcomes.len()
    );

    summary.transcript = Some(paths);
    Ok(summary)
}

/// Everything between opening and finishing the transcript. Returns who the
/// transcript should be mailed to, if anyone.
async fn provision<P: Prompter>(
    settings: &Settings,
    inventory: &Inventory,
    options: UsercfgOptions,
    prompter: &mut P,
    out: &mut Transcript,
    summary: &mut RunSummary,
) -> Result<Option<String>> {
    report!(out, "Action: Configure local accounts\nDevices to run this on:");
    for name in inventory.names() {
        report!(out, "{}", name);
    }

    let request = collect_request(prompter, out)?;
    if !confirm_run(prompter, out, &request.table.username, inventory.names())? {
        summary.cancelled = true;
        return Ok(None);
    }

    let (user, password) = collect_credentials(prompter, out, options.user, options.password)?;
    let change = request.table.to_change()?;
    let context = CommitContext::new(request.ticket, user.clone());

    for (name, device) in inventory.iter() {
        report!(out, "==== Connecting to {} ====", name);
        let mut driver = device_driver(settings, device, &user, &password)?;
        let outcome = configure_device(&mut driver, &change, &context, prompter, out).await;
        summary.outcomes.push((name.to_string(), outcome));
    }

    let recipient = match options.email {
        Some(email) => {
            report!(out, "Email: {}", email);
            email
        }
        None => ask(prompter, out, "Email", settings.smtp.default_recipient.as_deref())?,
    };
    let recipient = recipient.trim().to_string();
    if recipient.is_empty() {
        warn!("no recipient given, transcript not mailed");
        return Ok(None);
    }
    Ok(Some(recipient))
}
