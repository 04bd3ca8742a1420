mod cli;

use anyhow::{Context, Result, bail};
use clap::Parser;
use colored::Colorize;
use secrecy::SecretString;

use cli::{Cli, Command, TestEmailArgs, UsercfgArgs};
use netops::accounts::{self, UsercfgOptions};
use netops::notify::{Email, Mailer};
use netops::{ConsolePrompter, Prompter, Settings};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let path = Settings::resolve_path(cli.config.as_deref())?;
    let settings = Settings::load(&path)
        .with_context(|| format!("Cannot load settings from {}", path.display()))?;

    match cli.command {
        Command::Usercfg(args) => usercfg(&settings, args).await,
        Command::TestEmail(args) => test_email(&settings, args),
    }
}

async fn usercfg(settings: &Settings, args: UsercfgArgs) -> Result<()> {
    let options = UsercfgOptions {
        inventory: args.inventory,
        user: args.user,
        password: args.password.map(SecretString::from),
        email: args.email,
    };
    let mut prompter = ConsolePrompter::new();

    let summary = accounts::run(settings, options, &mut prompter).await?;
    if summary.cancelled {
        return Ok(());
    }

    let committed = summary.outcomes.iter().filter(|(_, o)| o.committed()).count();
    println!(
        "{}",
        format!("{committed} of {} devices committed", summary.outcomes.len()).yellow()
    );
    if let Some(paths) = &summary.transcript {
        println!("Log: {}", paths.html.display());
    }
    if let Some(to) = &summary.mailed_to {
        println!("Log mailed to {to}");
    }
    Ok(())
}

fn test_email(settings: &Settings, args: TestEmailArgs) -> Result<()> {
    let to = match args.email {
        Some(email) => email,
        None => ConsolePrompter::new()
            .input("Email", settings.smtp.default_recipient.as_deref())?,
    };
    if to.trim().is_empty() {
        bail!("No recipient given");
    }

    let mut email = Email::new(to.trim(), "This is testing email");
    if let Some(file) = args.file {
        email = email.attach(file);
    }
    Mailer::new(&settings.smtp)
        .send(&email)
        .context("Test email failed")?;
    println!("Test email sent to {}", email.to);
    Ok(())
}
