//! Aggregate the issues of one GitHub repository into the views a buddy
//! exchange needs: which issues are free to pick up, who completed the most
//! checks, who owes the community a check, and which certificate number
//! comes next.
//!
//! Every report is a pure function of a fetched issue list. [`Bootstrap`]
//! fetches the lists and runs the computations; it keeps no state between
//! calls.

use std::thread::{self, ScopedJoinHandle};

use chrono::{DateTime, Utc};
use tracing::info;

pub mod available;
pub mod buddy;
pub mod certificate;
pub mod config;
pub mod error;
pub mod export;
pub mod fetch;
pub mod leaderboard;
pub mod models;

#[cfg(test)]
mod testing;

use available::filter_available;
use buddy::{build_buddy_report, BuddyReport};
use certificate::{allocate, IdentifierAllocation};
use config::Configuration;
use error::{FetchError, RateLimit};
use fetch::{fetch_issues, GitHubClient, IssueQuery, PageSource, StateFilter};
use leaderboard::{build_leaderboard, Leaderboard};
use models::Issue;

/// The issue lists one round of fetches produced, one per query.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub open: Vec<Issue>,
    pub closed: Vec<Issue>,
    pub tracked: Vec<Issue>,
    pub all: Vec<Issue>,
}

/// All four views computed from one snapshot.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct FullReport {
    pub available: Vec<Issue>,
    pub leaderboard: Leaderboard,
    pub buddies: BuddyReport,
    pub identifiers: IdentifierAllocation,
}

pub struct Bootstrap<S = GitHubClient> {
    config: Configuration,
    source: S,
}

impl Bootstrap<GitHubClient> {
    /// Validate the configuration and talk to GitHub anonymously.
    pub fn new(config: Configuration) -> error::Result<Self> {
        config.validate()?;
        let source = GitHubClient::new(
            config.fetch.api_base.clone(),
            config.repository.owner.clone(),
            config.repository.name.clone(),
        )?;
        info!("working on {}", source.repository());
        Ok(Self { config, source })
    }
}

impl<S: PageSource> Bootstrap<S> {
    pub fn with_source(config: Configuration, source: S) -> Self {
        Self { config, source }
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Open issues, whatever their labels: the availability policy decides.
    pub fn available_query(&self) -> IssueQuery {
        IssueQuery::new(StateFilter::Open)
    }

    pub fn leaderboard_query(&self) -> IssueQuery {
        self.tracked(IssueQuery::new(StateFilter::Closed))
    }

    pub fn buddy_query(&self) -> IssueQuery {
        self.tracked(IssueQuery::new(StateFilter::All))
    }

    /// Certificates are numbered across the whole tracker, not one label.
    pub fn identifier_query(&self) -> IssueQuery {
        IssueQuery::new(StateFilter::All)
    }

    fn tracked(&self, query: IssueQuery) -> IssueQuery {
        match self.config.tracked_label() {
            Some(label) => query.with_label(label),
            None => query,
        }
    }

    fn fetch(&self, query: &IssueQuery) -> Result<Vec<Issue>, FetchError> {
        fetch_issues(&self.source, query, self.config.fetch_options())
    }

    pub fn list_available_issues(&self) -> Result<Vec<Issue>, FetchError> {
        let open = self.fetch(&self.available_query())?;
        Ok(self.available_from(&open))
    }

    pub fn build_leaderboard(&self) -> Result<Leaderboard, FetchError> {
        let closed = self.fetch(&self.leaderboard_query())?;
        Ok(build_leaderboard(&closed, Utc::now()))
    }

    pub fn build_buddy_report(&self) -> Result<BuddyReport, FetchError> {
        let all = self.fetch(&self.buddy_query())?;
        Ok(build_buddy_report(&all, Utc::now()))
    }

    pub fn allocate_next_identifier(&self) -> Result<IdentifierAllocation, FetchError> {
        let all = self.fetch(&self.identifier_query())?;
        Ok(allocate(all.iter().map(|i| i.title.as_str())))
    }

    pub fn rate_limit(&self) -> Result<RateLimit, FetchError> {
        self.source.fetch_rate_limit()
    }

    /// Run the four queries side by side.
    ///
    /// If any query fails the whole snapshot fails with the first error, in
    /// the order open, closed, tracked, all.
    pub fn fetch_snapshot(&self) -> Result<Snapshot, FetchError> {
        let (open, closed, tracked, all) = thread::scope(|s| {
            let open = s.spawn(|| self.fetch(&self.available_query()));
            let closed = s.spawn(|| self.fetch(&self.leaderboard_query()));
            let tracked = s.spawn(|| self.fetch(&self.buddy_query()));
            let all = s.spawn(|| self.fetch(&self.identifier_query()));
            (join(open), join(closed), join(tracked), join(all))
        });

        Ok(Snapshot {
            open: open?,
            closed: closed?,
            tracked: tracked?,
            all: all?,
        })
    }

    /// Fetch a snapshot and build every view from it.
    pub fn full_report(&self) -> Result<FullReport, FetchError> {
        let snapshot = self.fetch_snapshot()?;
        Ok(self.report_from(&snapshot, Utc::now()))
    }

    fn available_from(&self, open: &[Issue]) -> Vec<Issue> {
        filter_available(
            open,
            &self.config.availability_labels(),
            &self.config.availability,
        )
        .into_iter()
        .cloned()
        .collect()
    }

    /// Build every view from an already fetched snapshot.
    pub fn report_from(&self, snapshot: &Snapshot, generated_at: DateTime<Utc>) -> FullReport {
        FullReport {
            available: self.available_from(&snapshot.open),
            leaderboard: build_leaderboard(&snapshot.closed, generated_at),
            buddies: build_buddy_report(&snapshot.tracked, generated_at),
            identifiers: allocate(snapshot.all.iter().map(|i| i.title.as_str())),
        }
    }
}

fn join<T>(handle: ScopedJoinHandle<'_, T>) -> T {
    handle
        .join()
        .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
}
