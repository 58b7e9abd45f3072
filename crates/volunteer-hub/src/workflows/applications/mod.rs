//! Opportunity intake: posting, applying, first-come-first-served acceptance,
//! and the hours lifecycle that feeds progression.
//!
//! Capacity is enforced by [`ApplicationRepository::accept_if_below_capacity`]
//! under [`AcceptanceMode::Atomic`]. The read-then-write mode keeps the older
//! count-then-update sequence available for comparison.

pub mod acceptance;
pub mod domain;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use acceptance::{decide_acceptance, AcceptanceMode};
pub use domain::{
    Application, ApplicationId, ApplicationStatus, NewOpportunity, Opportunity,
    OpportunityCapacity, OpportunityId,
};
pub use repository::{
    ApplicationRepository, Notification, NotificationError, NotificationPublisher,
    OpportunityDirectory, RepositoryError,
};
pub use router::{application_router, ApplicationState};
pub use service::{ApplicationService, ApplicationServiceError};
