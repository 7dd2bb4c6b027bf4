use chrono::{DateTime, Utc};

use crate::models::{Issue, IssueState, Label, User};

pub(crate) fn at(timestamp: &str) -> DateTime<Utc> {
    timestamp.parse().unwrap()
}

pub(crate) struct IssueBuilder {
    issue: Issue,
}

impl IssueBuilder {
    pub(crate) fn open(number: u64) -> Self {
        Self {
            issue: Issue {
                id: number + 10_000,
                number,
                title: format!("Issue {number}"),
                body: String::new(),
                url: format!("https://github.com/o/r/issues/{number}"),
                created_at: at("2024-01-01T00:00:00Z"),
                updated_at: at("2024-01-02T00:00:00Z"),
                closed_at: None,
                state: IssueState::Open,
                author: User::new("author"),
                assignees: vec![],
                labels: vec![],
                comment_count: 0,
            },
        }
    }

    pub(crate) fn closed(number: u64) -> Self {
        Self::open(number).closed_at("2024-02-01T00:00:00Z")
    }

    pub(crate) fn closed_at(mut self, timestamp: &str) -> Self {
        self.issue.state = IssueState::Closed;
        self.issue.closed_at = Some(at(timestamp));
        self
    }

    pub(crate) fn title(mut self, title: &str) -> Self {
        self.issue.title = title.to_string();
        self
    }

    pub(crate) fn author(mut self, login: &str) -> Self {
        self.issue.author = User::new(login);
        self
    }

    /// Pushed as given, repeats included.
    pub(crate) fn assignee(mut self, login: &str) -> Self {
        self.issue.assignees.push(User::new(login));
        self
    }

    pub(crate) fn label(mut self, name: &str) -> Self {
        self.issue.labels.push(Label::new(name));
        self
    }

    pub(crate) fn build(self) -> Issue {
        self.issue
    }
}
