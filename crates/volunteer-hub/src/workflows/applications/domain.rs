use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::UserId;

/// Identifier wrapper for submitted applications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ApplicationId(pub String);

/// Identifier wrapper for posted opportunities.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OpportunityId(pub String);

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl fmt::Display for OpportunityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

/// Capacity fields consulted by the first-come-first-served policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OpportunityCapacity {
    pub slots: Option<u32>,
    pub fcfs: bool,
}

/// A volunteer opportunity posted by an organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Opportunity {
    pub id: OpportunityId,
    pub title: String,
    pub organization: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slots: Option<u32>,
    pub fcfs: bool,
}

impl Opportunity {
    pub fn capacity(&self) -> OpportunityCapacity {
        OpportunityCapacity {
            slots: self.slots,
            fcfs: self.fcfs,
        }
    }
}

/// Organizer input for posting an opportunity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOpportunity {
    pub title: String,
    pub organization: String,
    #[serde(default)]
    pub slots: Option<u32>,
    #[serde(default)]
    pub fcfs: bool,
}

/// Lifecycle of a student's application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Applied,
    Accepted,
    Declined,
    Waitlisted,
    Withdrawn,
    Done,
    Verify,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Applied => "applied",
            ApplicationStatus::Accepted => "accepted",
            ApplicationStatus::Declined => "declined",
            ApplicationStatus::Waitlisted => "waitlisted",
            ApplicationStatus::Withdrawn => "withdrawn",
            ApplicationStatus::Done => "done",
            ApplicationStatus::Verify => "verify",
        }
    }

    /// Declined and withdrawn applications no longer hold a place.
    pub const fn is_active(self) -> bool {
        !matches!(
            self,
            ApplicationStatus::Declined | ApplicationStatus::Withdrawn
        )
    }

    /// Statuses that record logged or verified hours.
    pub const fn records_hours(self) -> bool {
        matches!(self, ApplicationStatus::Verify | ApplicationStatus::Done)
    }

    pub const fn can_transition_to(self, next: ApplicationStatus) -> bool {
        use ApplicationStatus::*;

        matches!(
            (self, next),
            (Applied, Accepted | Declined | Waitlisted | Withdrawn)
                | (Waitlisted, Accepted | Declined | Withdrawn)
                | (Accepted, Declined | Withdrawn | Verify | Done)
                | (Verify, Accepted | Done)
                | (Done, Accepted)
        )
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

/// A student's application to an opportunity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub opportunity_id: OpportunityId,
    pub student_id: UserId,
    pub status: ApplicationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logged_hours: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified_hours: Option<f64>,
}
