use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{Issue, User};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuddyEntry {
    pub user: User,
    /// Issues this user opened, i.e. checks done on their work
    pub received_checks: u64,
    /// Closed issues this user was assigned to, i.e. checks they did
    pub conducted_checks: u64,
    pub ratio: f64,
    pub deficit: i64,
}

impl BuddyEntry {
    fn new(user: User) -> Self {
        Self {
            user,
            received_checks: 0,
            conducted_checks: 0,
            ratio: 0.0,
            deficit: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuddyReport {
    /// Highest ratio first. Equal ratios keep first-seen order.
    pub entries: Vec<BuddyEntry>,
    pub generated_at: DateTime<Utc>,
}

/// Compare how many checks each user received with how many they did.
///
/// Every issue credits its author with a received check. Every closed issue
/// credits each distinct assignee with a conducted check. Only users who
/// received at least one check are reported. The ratio divides by at least
/// one, so someone who never checked anything has a ratio equal to the
/// number of checks they received.
pub fn build_buddy_report(issues: &[Issue], generated_at: DateTime<Utc>) -> BuddyReport {
    let mut entries: Vec<BuddyEntry> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    let mut seen_issues: HashSet<u64> = HashSet::new();
    let issues: Vec<&Issue> = issues
        .iter()
        .filter(|i| seen_issues.insert(i.number))
        .collect();

    for issue in &issues {
        let position = slot(&mut entries, &mut positions, &issue.author);
        entries[position].received_checks += 1;
    }

    for issue in issues.iter().filter(|i| i.is_closed()) {
        for user in issue.distinct_assignees() {
            let position = slot(&mut entries, &mut positions, user);
            entries[position].conducted_checks += 1;
        }
    }

    let mut entries: Vec<BuddyEntry> = entries
        .into_iter()
        .filter(|e| e.received_checks > 0)
        .map(|mut e| {
            e.ratio = e.received_checks as f64 / e.conducted_checks.max(1) as f64;
            e.deficit = e.received_checks as i64 - e.conducted_checks as i64;
            e
        })
        .collect();

    entries.sort_by(|a, b| b.ratio.total_cmp(&a.ratio));

    BuddyReport {
        entries,
        generated_at,
    }
}

/// Index of the user's entry, created on first sight.
fn slot(
    entries: &mut Vec<BuddyEntry>,
    positions: &mut HashMap<String, usize>,
    user: &User,
) -> usize {
    *positions.entry(user.login.clone()).or_insert_with(|| {
        entries.push(BuddyEntry::new(user.clone()));
        entries.len() - 1
    })
}
