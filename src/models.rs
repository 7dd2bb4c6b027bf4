//! Issue records as the rest of the crate sees them.
//!
//! GitHub's JSON is first deserialised into loosely typed `Raw*` records where
//! every field is optional, then validated into [`Issue`]. A record missing a
//! required field is rejected on its own instead of failing the whole page.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueState {
    Open,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct User {
    pub login: String,
    pub avatar_url: String,
    pub profile_url: String,
}

impl User {
    pub fn new(login: impl Into<String>) -> Self {
        let login = login.into();
        Self {
            avatar_url: format!("https://avatars.githubusercontent.com/{login}"),
            profile_url: format!("https://github.com/{login}"),
            login,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Label {
    pub name: String,
    pub color: String,
    pub description: Option<String>,
}

impl Label {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: "ededed".to_string(),
            description: None,
        }
    }

    /// Label names are compared case-insensitively, like GitHub does.
    pub fn matches(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name.trim())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Issue {
    pub id: u64,
    pub number: u64,
    pub title: String,
    pub body: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub state: IssueState,
    pub author: User,
    /// Legacy `assignee` first, then `assignees`, without repeats
    pub assignees: Vec<User>,
    pub labels: Vec<Label>,
    pub comment_count: u64,
}

impl Issue {
    pub fn has_label(&self, name: &str) -> bool {
        self.labels.iter().any(|l| l.matches(name))
    }

    pub fn is_open(&self) -> bool {
        self.state == IssueState::Open
    }

    pub fn is_closed(&self) -> bool {
        self.state == IssueState::Closed
    }

    /// Assignees with duplicate logins removed, first occurrence kept.
    pub fn distinct_assignees(&self) -> Vec<&User> {
        let mut seen: Vec<&User> = Vec::with_capacity(self.assignees.len());
        for user in &self.assignees {
            if !seen.iter().any(|u| u.login == user.login) {
                seen.push(user);
            }
        }
        seen
    }

    /// When the issue was completed, falling back to its last update when
    /// GitHub did not report a close date.
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.closed_at.unwrap_or(self.updated_at)
    }
}

/// Why a record coming from GitHub was not turned into an [`Issue`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    #[error("record is a pull request")]
    PullRequest,
    #[error("record is missing required field `{0}`")]
    Missing(&'static str),
}

#[derive(Debug, Default, Deserialize)]
pub struct RawUser {
    pub login: Option<String>,
    pub avatar_url: Option<String>,
    pub html_url: Option<String>,
}

impl RawUser {
    fn validate(self) -> Option<User> {
        let login = self.login.filter(|l| !l.is_empty())?;
        let fallback = User::new(login.clone());
        Some(User {
            avatar_url: self.avatar_url.unwrap_or(fallback.avatar_url),
            profile_url: self.html_url.unwrap_or(fallback.profile_url),
            login,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RawLabel {
    pub name: Option<String>,
    pub color: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawIssue {
    pub id: Option<u64>,
    pub number: Option<u64>,
    pub title: Option<String>,
    pub body: Option<String>,
    pub html_url: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub state: Option<IssueState>,
    pub user: Option<RawUser>,
    pub assignee: Option<RawUser>,
    pub assignees: Option<Vec<RawUser>>,
    pub labels: Option<Vec<RawLabel>>,
    pub comments: Option<u64>,
    pub pull_request: Option<serde_json::Value>,
}

impl RawIssue {
    pub fn validate(self) -> Result<Issue, RecordError> {
        if self.pull_request.is_some() {
            return Err(RecordError::PullRequest);
        }

        let author = self
            .user
            .and_then(RawUser::validate)
            .ok_or(RecordError::Missing("user"))?;

        // The legacy single assignee goes first, `assignees` may repeat it.
        let mut assignees: Vec<User> = Vec::new();
        let candidates = self
            .assignee
            .into_iter()
            .chain(self.assignees.unwrap_or_default());
        for user in candidates.filter_map(RawUser::validate) {
            if !assignees.iter().any(|a| a.login == user.login) {
                assignees.push(user);
            }
        }

        let labels = self
            .labels
            .unwrap_or_default()
            .into_iter()
            .filter_map(|l| {
                Some(Label {
                    name: l.name.filter(|n| !n.is_empty())?,
                    color: l.color.unwrap_or_default(),
                    description: l.description.filter(|d| !d.is_empty()),
                })
            })
            .collect();

        Ok(Issue {
            id: self.id.ok_or(RecordError::Missing("id"))?,
            number: self.number.ok_or(RecordError::Missing("number"))?,
            title: self.title.ok_or(RecordError::Missing("title"))?,
            body: self.body.unwrap_or_default(),
            url: self.html_url.ok_or(RecordError::Missing("html_url"))?,
            created_at: self.created_at.ok_or(RecordError::Missing("created_at"))?,
            updated_at: self.updated_at.ok_or(RecordError::Missing("updated_at"))?,
            closed_at: self.closed_at,
            state: self.state.ok_or(RecordError::Missing("state"))?,
            author,
            assignees,
            labels,
            comment_count: self.comments.unwrap_or(0),
        })
    }
}
