use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::identity::UserId;

use super::domain::{Application, ApplicationId, Opportunity, OpportunityId};

/// Storage abstraction for applications so the service can be exercised in isolation.
pub trait ApplicationRepository: Send + Sync {
    /// Stores a new application. Returns `Conflict` if the id is taken or the
    /// student already holds an active application to the same opportunity,
    /// checked in the same step as the write.
    fn insert(&self, application: Application) -> Result<Application, RepositoryError>;
    fn update(&self, application: Application) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &ApplicationId) -> Result<Option<Application>, RepositoryError>;
    fn count_accepted(&self, opportunity: &OpportunityId) -> Result<u64, RepositoryError>;
    fn list_for_opportunity(
        &self,
        opportunity: &OpportunityId,
    ) -> Result<Vec<Application>, RepositoryError>;
    fn list_for_student(&self, student: &UserId) -> Result<Vec<Application>, RepositoryError>;

    /// Promotes `application` to accepted only if fewer than `slots` applications
    /// for `opportunity` are accepted, as one indivisible step. Returns whether
    /// the promotion happened.
    fn accept_if_below_capacity(
        &self,
        application: &ApplicationId,
        opportunity: &OpportunityId,
        slots: u32,
    ) -> Result<bool, RepositoryError>;
}

/// Storage abstraction for posted opportunities.
pub trait OpportunityDirectory: Send + Sync {
    fn insert(&self, opportunity: Opportunity) -> Result<Opportunity, RepositoryError>;
    fn fetch(&self, id: &OpportunityId) -> Result<Option<Opportunity>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Outbound notification hook (in-app inbox, e-mail adapters).
pub trait NotificationPublisher: Send + Sync {
    fn publish(&self, notification: Notification) -> Result<(), NotificationError>;
}

/// Notification payload so routes/tests can assert integration boundaries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub template: String,
    pub recipient: UserId,
    pub application_id: ApplicationId,
    pub details: BTreeMap<String, String>,
}

/// Notification dispatch error.
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}
