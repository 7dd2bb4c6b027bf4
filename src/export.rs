use std::io::Write;

use crate::buddy::BuddyReport;
use crate::certificate::IdentifierAllocation;
use crate::error::{RateLimit, Result};
use crate::leaderboard::Leaderboard;
use crate::models::Issue;
use crate::FullReport;

#[derive(serde::Serialize)]
struct LeaderboardRow<'a> {
    login: &'a str,
    completed: usize,
    last_completed_at: String,
    /// Space separated issue numbers
    issues: String,
}

#[derive(serde::Serialize)]
struct BuddyRow<'a> {
    login: &'a str,
    received: u64,
    conducted: u64,
    ratio: String,
    deficit: i64,
}

#[derive(serde::Serialize)]
struct AvailableRow<'a> {
    number: u64,
    title: &'a str,
    url: &'a str,
    assignees: String,
    labels: String,
}

#[derive(serde::Serialize)]
struct IdentifierRow {
    next: u32,
    /// Space separated certificate numbers already taken
    used: String,
}

#[derive(serde::Serialize)]
struct RateLimitRow {
    remaining: u32,
    limit: Option<u32>,
    reset: i64,
}

fn join<I: IntoIterator<Item = String>>(items: I) -> String {
    items.into_iter().collect::<Vec<_>>().join(" ")
}

pub fn leaderboard_csv<W: Write>(board: &Leaderboard, out: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    for entry in &board.entries {
        writer.serialize(LeaderboardRow {
            login: &entry.user.login,
            completed: entry.completed_count,
            last_completed_at: entry.last_completed_at.to_rfc3339(),
            issues: join(entry.completed_issue_numbers.iter().map(|n| n.to_string())),
        })?;
    }
    writer.flush()?;
    Ok(())
}

pub fn buddy_csv<W: Write>(report: &BuddyReport, out: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    for entry in &report.entries {
        writer.serialize(BuddyRow {
            login: &entry.user.login,
            received: entry.received_checks,
            conducted: entry.conducted_checks,
            ratio: format!("{:.2}", entry.ratio),
            deficit: entry.deficit,
        })?;
    }
    writer.flush()?;
    Ok(())
}

pub fn available_csv<W: Write>(issues: &[Issue], out: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    for issue in issues {
        writer.serialize(AvailableRow {
            number: issue.number,
            title: &issue.title,
            url: &issue.url,
            assignees: join(issue.assignees.iter().map(|u| u.login.clone())),
            labels: issue
                .labels
                .iter()
                .map(|l| l.name.as_str())
                .collect::<Vec<_>>()
                .join(";"),
        })?;
    }
    writer.flush()?;
    Ok(())
}

pub fn identifiers_csv<W: Write>(allocation: &IdentifierAllocation, out: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    writer.serialize(IdentifierRow {
        next: allocation.next,
        used: join(allocation.used.iter().map(|n| n.to_string())),
    })?;
    writer.flush()?;
    Ok(())
}

pub fn rate_limit_csv<W: Write>(limit: &RateLimit, out: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    writer.serialize(RateLimitRow {
        remaining: limit.remaining,
        limit: limit.limit,
        reset: limit.reset,
    })?;
    writer.flush()?;
    Ok(())
}

/// Every table of a report, each under a `# name` line and separated by a
/// blank line, so a reader can split the sections apart.
pub fn report_csv<W: Write>(report: &FullReport, mut out: W) -> Result<()> {
    writeln!(out, "# available")?;
    available_csv(&report.available, &mut out)?;
    writeln!(out, "\n# leaderboard")?;
    leaderboard_csv(&report.leaderboard, &mut out)?;
    writeln!(out, "\n# buddies")?;
    buddy_csv(&report.buddies, &mut out)?;
    writeln!(out, "\n# identifiers")?;
    identifiers_csv(&report.identifiers, &mut out)?;
    out.flush()?;
    Ok(())
}
