use std::collections::{BTreeSet, HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{Issue, User};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardEntry {
    pub user: User,
    pub completed_count: usize,
    pub last_completed_at: DateTime<Utc>,
    pub completed_issue_numbers: BTreeSet<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Leaderboard {
    /// Most completed first. Users with the same count keep the order in
    /// which they first appeared, which is not a guaranteed total order.
    pub entries: Vec<LeaderboardEntry>,
    pub total_completed: usize,
    pub active_contributors: usize,
    pub generated_at: DateTime<Utc>,
}

/// Tally completed issues per assignee.
///
/// An issue counts as completed once it is closed with at least one person
/// assigned. Each distinct assignee gets credit for it; the issue itself
/// counts once towards `total_completed`. Open issues, unassigned issues and
/// repeated issue numbers are ignored.
pub fn build_leaderboard(issues: &[Issue], generated_at: DateTime<Utc>) -> Leaderboard {
    let mut entries: Vec<LeaderboardEntry> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut seen_issues: HashSet<u64> = HashSet::new();

    for issue in issues.iter().filter(|i| i.is_closed()) {
        let assignees = issue.distinct_assignees();
        if assignees.is_empty() || !seen_issues.insert(issue.number) {
            continue;
        }

        let completed_at = issue.completed_at();
        for user in assignees {
            let position = *positions.entry(user.login.clone()).or_insert_with(|| {
                entries.push(LeaderboardEntry {
                    user: user.clone(),
                    completed_count: 0,
                    last_completed_at: completed_at,
                    completed_issue_numbers: BTreeSet::new(),
                });
                entries.len() - 1
            });

            let entry = &mut entries[position];
            if entry.completed_issue_numbers.insert(issue.number) {
                entry.completed_count += 1;
            }
            if completed_at > entry.last_completed_at {
                entry.last_completed_at = completed_at;
            }
        }
    }

    // Stable sort: ties stay in first-seen order
    entries.sort_by(|a, b| b.completed_count.cmp(&a.completed_count));

    Leaderboard {
        active_contributors: entries.len(),
        total_completed: seen_issues.len(),
        entries,
        generated_at,
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::testing::{at, IssueBuilder};

    fn logins(board: &Leaderboard) -> Vec<&str> {
        board.entries.iter().map(|e| e.user.login.as_str()).collect()
    }

    #[test]
    fn test_counts_each_assignee_once_per_issue() {
        let issues = vec![
            IssueBuilder::closed(1).assignee("bob").assignee("carol").build(),
            IssueBuilder::closed(2).assignee("bob").assignee("bob").build(),
            IssueBuilder::closed(3).build(),
            IssueBuilder::open(4).assignee("carol").build(),
        ];
        let board = build_leaderboard(&issues, at("2024-06-01T00:00:00Z"));

        assert_eq!(board.total_completed, 2);
        assert_eq!(board.active_contributors, 2);
        assert_eq!(logins(&board), vec!["bob", "carol"]);
        assert_eq!(board.entries[0].completed_count, 2);
        assert_eq!(
            board.entries[0].completed_issue_numbers,
            BTreeSet::from([1, 2])
        );
        assert_eq!(board.entries[1].completed_count, 1);
    }

    #[test]
    fn test_last_completed_at_is_the_latest() {
        let issues = vec![
            IssueBuilder::closed(1)
                .closed_at("2024-05-01T00:00:00Z")
                .assignee("bob")
                .build(),
            IssueBuilder::closed(2)
                .closed_at("2024-03-01T00:00:00Z")
                .assignee("bob")
                .build(),
        ];
        let board = build_leaderboard(&issues, at("2024-06-01T00:00:00Z"));
        assert_eq!(
            board.entries[0].last_completed_at,
            at("2024-05-01T00:00:00Z")
        );
    }

    #[test]
    fn test_ties_keep_first_seen_order() {
        let issues = vec![
            IssueBuilder::closed(1).assignee("zed").build(),
            IssueBuilder::closed(2).assignee("amy").build(),
            IssueBuilder::closed(3).assignee("amy").build(),
            IssueBuilder::closed(4).assignee("kim").build(),
        ];
        let board = build_leaderboard(&issues, at("2024-06-01T00:00:00Z"));
        assert_eq!(logins(&board), vec!["amy", "zed", "kim"]);
    }

    #[test]
    fn test_repeated_issue_counts_once() {
        let issue = IssueBuilder::closed(1).assignee("bob").build();
        let board = build_leaderboard(&[issue.clone(), issue], at("2024-06-01T00:00:00Z"));
        assert_eq!(board.total_completed, 1);
        assert_eq!(board.entries[0].completed_count, 1);
    }

    #[test]
    fn test_empty_input() {
        let board = build_leaderboard(&[], at("2024-06-01T00:00:00Z"));
        assert!(board.entries.is_empty());
        assert_eq!(board.total_completed, 0);
        assert_eq!(board.active_contributors, 0);
    }

    #[test]
    fn test_same_snapshot_same_board() {
        let issues = vec![
            IssueBuilder::closed(1).assignee("bob").assignee("carol").build(),
            IssueBuilder::closed(2).assignee("carol").build(),
        ];
        let now = at("2024-06-01T00:00:00Z");
        let first = serde_json::to_string(&build_leaderboard(&issues, now)).unwrap();
        let second = serde_json::to_string(&build_leaderboard(&issues, now)).unwrap();
        assert_eq!(first, second);
    }

    const LOGINS: [&str; 4] = ["ann", "ben", "cat", "dan"];

    fn arb_issues() -> impl Strategy<Value = Vec<Issue>> {
        prop::collection::vec(
            (any::<bool>(), prop::collection::vec(0..LOGINS.len(), 0..4)),
            0..40,
        )
        .prop_map(|rows| {
            rows
                .into_iter()
                .enumerate()
                .map(|(n, (closed, assignees))| {
                    let builder = if closed {
                        IssueBuilder::closed(n as u64 + 1)
                    } else {
                        IssueBuilder::open(n as u64 + 1)
                    };
                    assignees
                        .into_iter()
                        .fold(builder, |b, i| b.assignee(LOGINS[i]))
                        .build()
                })
                .collect()
        })
    }

    proptest! {
        #[test]
        fn prop_total_counts_closed_assigned_issues(issues in arb_issues()) {
            let board = build_leaderboard(&issues, at("2024-06-01T00:00:00Z"));
            let expected = issues
                .iter()
                .filter(|i| i.is_closed() && !i.assignees.is_empty())
                .count();
            prop_assert_eq!(board.total_completed, expected);
            prop_assert_eq!(board.active_contributors, board.entries.len());
        }

        #[test]
        fn prop_count_matches_issue_numbers(issues in arb_issues()) {
            let board = build_leaderboard(&issues, at("2024-06-01T00:00:00Z"));
            for entry in &board.entries {
                prop_assert_eq!(entry.completed_count, entry.completed_issue_numbers.len());
            }
            for pair in board.entries.windows(2) {
                prop_assert!(pair[0].completed_count >= pair[1].completed_count);
            }
        }
    }
}
