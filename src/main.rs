use std::io::stdout;
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use gh_buddy_stats::buddy::BuddyReport;
use gh_buddy_stats::certificate::IdentifierAllocation;
use gh_buddy_stats::config::Configuration;
use gh_buddy_stats::error::{Error, FetchError, RateLimit, Result};
use gh_buddy_stats::export;
use gh_buddy_stats::leaderboard::Leaderboard;
use gh_buddy_stats::models::Issue;
use gh_buddy_stats::Bootstrap;

/// Statistics for a buddy exchange run on GitHub issues
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Configuration file (defaults to ./buddy-stats.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Repository owner, overrides the config file and GH_OWNER
    #[arg(long, global = true)]
    owner: Option<String>,

    /// Repository name, overrides the config file and GH_REPO
    #[arg(long, global = true)]
    repo: Option<String>,

    /// How to print the result
    #[arg(long, value_enum, default_value_t = Format::Text, global = true)]
    format: Format,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Open issues nobody is working on yet, or that ask for a codechecker
    Available,
    /// Who completed the most checks
    Leaderboard,
    /// Who received checks without giving back
    Buddies,
    /// The next free certificate number
    NextId,
    /// Remaining anonymous GitHub API requests
    RateLimit,
    /// Everything at once
    Report,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Format {
    Text,
    Csv,
    Json,
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        print_error(&e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let config = Configuration::load(args.config.as_deref())?
        .apply_env()
        .with_repository(args.owner, args.repo);
    let bootstrap = Bootstrap::new(config)?;
    let format = args.format;

    match args.command {
        Command::Available => print_available(&bootstrap.list_available_issues()?, format),
        Command::Leaderboard => print_leaderboard(&bootstrap.build_leaderboard()?, format),
        Command::Buddies => print_buddies(&bootstrap.build_buddy_report()?, format),
        Command::NextId => print_identifiers(&bootstrap.allocate_next_identifier()?, format),
        Command::RateLimit => print_rate_limit(&bootstrap.rate_limit()?, format),
        Command::Report => {
            let report = bootstrap.full_report()?;
            match format {
                Format::Json => return print_json(&report),
                Format::Csv => return export::report_csv(&report, stdout()),
                Format::Text => {}
            }
            print_available(&report.available, format)?;
            print_leaderboard(&report.leaderboard, format)?;
            print_buddies(&report.buddies, format)?;
            print_identifiers(&report.identifiers, format)
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    serde_json::to_writer_pretty(stdout(), value)?;
    println!();
    Ok(())
}

fn print_available(issues: &[Issue], format: Format) -> Result<()> {
    match format {
        Format::Json => print_json(&issues),
        Format::Csv => export::available_csv(issues, stdout()),
        Format::Text => {
            println!("{}", "Available issues".white().bold());
            if issues.is_empty() {
                println!("{}", "Nothing to pick up right now.".yellow());
            }
            for issue in issues {
                let assignees: Vec<&str> =
                    issue.assignees.iter().map(|u| u.login.as_str()).collect();
                let taken = match assignees.is_empty() {
                    true => String::new(),
                    false => format!(" ({})", assignees.join(", ")).yellow().to_string(),
                };
                println!(
                    "{:>6} {}{} {}",
                    format!("#{}", issue.number).blue(),
                    issue.title.white(),
                    taken,
                    issue.url.dimmed()
                );
            }
            println!();
            Ok(())
        }
    }
}

fn print_leaderboard(board: &Leaderboard, format: Format) -> Result<()> {
    match format {
        Format::Json => print_json(board),
        Format::Csv => export::leaderboard_csv(board, stdout()),
        Format::Text => {
            println!("{}", "Leaderboard".white().bold());
            println!(
                "{} {} {} {}",
                board.total_completed.to_string().white(),
                "completed checks by".green(),
                board.active_contributors.to_string().white(),
                "contributors".green()
            );
            for (rank, entry) in board.entries.iter().enumerate() {
                println!(
                    "{:>4}. {:<30} {:>4}  {} {}",
                    rank + 1,
                    entry.user.login.white(),
                    entry.completed_count.to_string().green(),
                    "last".dimmed(),
                    entry.last_completed_at.format("%Y-%m-%d")
                );
            }
            println!();
            Ok(())
        }
    }
}

fn print_buddies(report: &BuddyReport, format: Format) -> Result<()> {
    match format {
        Format::Json => print_json(report),
        Format::Csv => export::buddy_csv(report, stdout()),
        Format::Text => {
            println!("{}", "Find a buddy".white().bold());
            println!(
                "{:<30} {:>8} {:>9} {:>6} {:>7}",
                "user", "received", "conducted", "ratio", "deficit"
            );
            for entry in &report.entries {
                let deficit = match entry.deficit > 0 {
                    true => entry.deficit.to_string().red(),
                    false => entry.deficit.to_string().green(),
                };
                println!(
                    "{:<30} {:>8} {:>9} {:>6.2} {:>7}",
                    entry.user.login.white(),
                    entry.received_checks,
                    entry.conducted_checks,
                    entry.ratio,
                    deficit
                );
            }
            println!();
            Ok(())
        }
    }
}

fn print_identifiers(allocation: &IdentifierAllocation, format: Format) -> Result<()> {
    match format {
        Format::Json => print_json(allocation),
        Format::Csv => export::identifiers_csv(allocation, stdout()),
        Format::Text => {
            println!(
                "{} {}",
                "Next free certificate number:".green(),
                allocation.next.to_string().white().bold()
            );
            println!(
                "{} {}",
                "Numbers in use:".dimmed(),
                allocation.used.len()
            );
            Ok(())
        }
    }
}

fn print_rate_limit(limit: &RateLimit, format: Format) -> Result<()> {
    match format {
        Format::Json => print_json(limit),
        Format::Csv => export::rate_limit_csv(limit, stdout()),
        Format::Text => {
            let remaining = match limit.is_exhausted() {
                true => limit.remaining.to_string().red(),
                false => limit.remaining.to_string().green(),
            };
            println!("{} {}", "Requests remaining:".yellow(), remaining);
            if let Some(reset) = limit.reset_at() {
                println!("{} {}", "Window resets at:".yellow(), reset.to_rfc3339());
            }
            Ok(())
        }
    }
}

fn print_error(error: &Error) {
    match error {
        Error::Fetch(e @ FetchError::Transient { .. }) if e.is_rate_limited() => {
            let reset = e
                .rate_limit()
                .and_then(|r| r.reset_at())
                .map(|r| r.to_rfc3339())
                .unwrap_or_else(|| "later".to_string());
            eprintln!(
                "{} {}",
                "GitHub's anonymous rate limit is exhausted. Try again after".red(),
                reset.white()
            );
        }
        e => eprintln!("{}", e.to_string().bold().red()),
    }
}
