use serde::{Deserialize, Serialize};

use crate::models::Issue;

/// Labels the availability rules look at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityLabels {
    pub buddy_exchange: String,
    pub needs_codechecker: String,
}

impl Default for AvailabilityLabels {
    fn default() -> Self {
        Self {
            buddy_exchange: "buddy exchange".to_string(),
            needs_codechecker: "needs codechecker".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityPolicy {
    /// Only list issues carrying the buddy exchange label
    #[serde(default)]
    pub require_buddy_label: bool,
}

/// Whether an open issue should be offered to someone looking for work.
///
/// An issue asking for a codechecker is always offered, even if people are
/// already assigned to it. Any other issue is offered only while nobody is
/// assigned.
pub fn is_available(
    issue: &Issue,
    labels: &AvailabilityLabels,
    policy: &AvailabilityPolicy,
) -> bool {
    if !issue.is_open() {
        return false;
    }
    if policy.require_buddy_label && !issue.has_label(&labels.buddy_exchange) {
        return false;
    }
    if issue.has_label(&labels.needs_codechecker) {
        return true;
    }
    issue.assignees.is_empty()
}

/// Keep the available issues, in the order they were given.
pub fn filter_available<'a>(
    issues: &'a [Issue],
    labels: &AvailabilityLabels,
    policy: &AvailabilityPolicy,
) -> Vec<&'a Issue> {
    issues
        .iter()
        .filter(|issue| is_available(issue, labels, policy))
        .collect()
}
