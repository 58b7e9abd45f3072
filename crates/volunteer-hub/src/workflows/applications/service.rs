use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::http::StatusCode;
use chrono::Utc;
use tracing::{debug, info, warn};

use crate::identity::UserId;
use crate::workflows::progression::{HoursSource, StoreError};

use super::acceptance::{decide_acceptance, AcceptanceMode};
use super::domain::{
    Application, ApplicationId, ApplicationStatus, NewOpportunity, Opportunity, OpportunityId,
};
use super::repository::{
    ApplicationRepository, Notification, NotificationPublisher, OpportunityDirectory,
    RepositoryError,
};

/// Service composing the application store, opportunity directory, and FCFS policy.
pub struct ApplicationService<R, O, N> {
    repository: Arc<R>,
    opportunities: Arc<O>,
    notifications: Arc<N>,
    mode: AcceptanceMode,
}

static APPLICATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static OPPORTUNITY_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_application_id() -> ApplicationId {
    let id = APPLICATION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ApplicationId(format!("app-{id:06}"))
}

fn next_opportunity_id() -> OpportunityId {
    let id = OPPORTUNITY_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    OpportunityId(format!("opp-{id:06}"))
}

impl<R, O, N> ApplicationService<R, O, N>
where
    R: ApplicationRepository + 'static,
    O: OpportunityDirectory + 'static,
    N: NotificationPublisher + 'static,
{
    pub fn new(
        repository: Arc<R>,
        opportunities: Arc<O>,
        notifications: Arc<N>,
        mode: AcceptanceMode,
    ) -> Self {
        Self {
            repository,
            opportunities,
            notifications,
            mode,
        }
    }

    /// Post a new opportunity on behalf of an organization.
    pub fn post_opportunity(
        &self,
        input: NewOpportunity,
    ) -> Result<Opportunity, ApplicationServiceError> {
        let title = input.title.trim();
        if title.is_empty() {
            return Err(ApplicationServiceError::InvalidOpportunity(
                "title is required".to_string(),
            ));
        }
        if input.slots == Some(0) {
            return Err(ApplicationServiceError::InvalidOpportunity(
                "slots must be positive when set".to_string(),
            ));
        }

        let opportunity = Opportunity {
            id: next_opportunity_id(),
            title: title.to_string(),
            organization: input.organization.trim().to_string(),
            slots: input.slots,
            fcfs: input.fcfs,
        };

        let stored = self.opportunities.insert(opportunity)?;
        info!(opportunity = %stored.id, slots = ?stored.slots, fcfs = stored.fcfs, "opportunity posted");
        Ok(stored)
    }

    pub fn opportunity(&self, id: &OpportunityId) -> Result<Opportunity, ApplicationServiceError> {
        let opportunity = self
            .opportunities
            .fetch(id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(opportunity)
    }

    /// Create an `applied` application, then try to promote it under the FCFS policy.
    ///
    /// Only the initial insert can fail the call. Problems during the capacity
    /// check leave the application `applied`.
    pub fn apply(
        &self,
        student: &UserId,
        opportunity_id: &OpportunityId,
    ) -> Result<Application, ApplicationServiceError> {
        self.opportunity(opportunity_id)?;

        // Early rejection only; the store's insert enforces uniqueness.
        let duplicate = self
            .repository
            .list_for_student(student)?
            .into_iter()
            .any(|existing| {
                &existing.opportunity_id == opportunity_id && existing.status.is_active()
            });
        if duplicate {
            return Err(RepositoryError::Conflict.into());
        }

        let now = Utc::now();
        let application = Application {
            id: next_application_id(),
            opportunity_id: opportunity_id.clone(),
            student_id: student.clone(),
            status: ApplicationStatus::Applied,
            created_at: now,
            updated_at: now,
            logged_hours: None,
            verified_hours: None,
        };

        let mut stored = self.repository.insert(application)?;
        info!(application = %stored.id, opportunity = %opportunity_id, %student, "application submitted");

        match self.auto_accept(&stored) {
            Ok(true) => {
                stored.status = ApplicationStatus::Accepted;
                stored.updated_at = Utc::now();
                info!(application = %stored.id, mode = self.mode.label(), "application auto-accepted");
                self.notify(&stored, "application_accepted");
            }
            Ok(false) => {
                debug!(application = %stored.id, "application left pending organizer review");
            }
            Err(error) => {
                warn!(application = %stored.id, %error, "auto-accept check failed; application left pending");
            }
        }

        Ok(stored)
    }

    fn auto_accept(&self, application: &Application) -> Result<bool, RepositoryError> {
        let capacity = self
            .opportunities
            .fetch(&application.opportunity_id)?
            .ok_or(RepositoryError::NotFound)?
            .capacity();

        match self.mode {
            AcceptanceMode::Atomic => match capacity.slots {
                // An empty opportunity would admit; the store re-checks the live count.
                Some(slots) if decide_acceptance(&capacity, 0) => self
                    .repository
                    .accept_if_below_capacity(&application.id, &application.opportunity_id, slots),
                _ => Ok(false),
            },
            AcceptanceMode::ReadThenWrite => {
                let current = self
                    .repository
                    .count_accepted(&application.opportunity_id)?;
                if !decide_acceptance(&capacity, current) {
                    return Ok(false);
                }

                let mut promoted = application.clone();
                promoted.status = ApplicationStatus::Accepted;
                promoted.updated_at = Utc::now();
                self.repository.update(promoted)?;
                Ok(true)
            }
        }
    }

    /// Move an application along its lifecycle (organizer decisions, withdrawals, re-opening).
    ///
    /// `verify` and `done` carry hours, so they are reached only through
    /// [`Self::log_hours`] and [`Self::verify_hours`].
    pub fn transition(
        &self,
        application_id: &ApplicationId,
        next: ApplicationStatus,
    ) -> Result<Application, ApplicationServiceError> {
        let mut application = self.get(application_id)?;
        let from = application.status;
        if next.records_hours() || !from.can_transition_to(next) {
            return Err(ApplicationServiceError::InvalidTransition { from, to: next });
        }

        application.status = next;
        application.updated_at = Utc::now();
        self.repository.update(application.clone())?;
        info!(application = %application.id, %from, to = %next, "application status changed");

        match next {
            ApplicationStatus::Accepted => self.notify(&application, "application_accepted"),
            ApplicationStatus::Declined => self.notify(&application, "application_declined"),
            ApplicationStatus::Waitlisted => self.notify(&application, "application_waitlisted"),
            _ => {}
        }

        Ok(application)
    }

    /// Student submits hours for verification; moves the application to `verify`.
    pub fn log_hours(
        &self,
        application_id: &ApplicationId,
        student: &UserId,
        hours: f64,
    ) -> Result<Application, ApplicationServiceError> {
        validate_hours(hours)?;
        let mut application = self.get(application_id)?;
        if &application.student_id != student {
            return Err(ApplicationServiceError::NotOwner);
        }

        match application.status {
            ApplicationStatus::Accepted | ApplicationStatus::Verify => {}
            from => {
                return Err(ApplicationServiceError::InvalidTransition {
                    from,
                    to: ApplicationStatus::Verify,
                })
            }
        }

        application.status = ApplicationStatus::Verify;
        application.logged_hours = Some(hours);
        application.updated_at = Utc::now();
        self.repository.update(application.clone())?;
        info!(application = %application.id, hours, "hours submitted for verification");

        Ok(application)
    }

    /// Organizer confirms hours; the application is complete.
    pub fn verify_hours(
        &self,
        application_id: &ApplicationId,
        hours: f64,
    ) -> Result<Application, ApplicationServiceError> {
        validate_hours(hours)?;
        let mut application = self.get(application_id)?;
        let from = application.status;
        if !from.can_transition_to(ApplicationStatus::Done) {
            return Err(ApplicationServiceError::InvalidTransition {
                from,
                to: ApplicationStatus::Done,
            });
        }

        application.status = ApplicationStatus::Done;
        application.verified_hours = Some(hours);
        application.updated_at = Utc::now();
        self.repository.update(application.clone())?;
        info!(application = %application.id, hours, "hours verified");
        self.notify(&application, "hours_verified");

        Ok(application)
    }

    /// Fetch an application for API responses.
    pub fn get(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Application, ApplicationServiceError> {
        let application = self
            .repository
            .fetch(application_id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(application)
    }

    pub fn list_for_opportunity(
        &self,
        opportunity_id: &OpportunityId,
    ) -> Result<Vec<Application>, ApplicationServiceError> {
        self.opportunity(opportunity_id)?;
        Ok(self.repository.list_for_opportunity(opportunity_id)?)
    }

    /// Sum of verified hours across the student's completed applications.
    pub fn total_verified_hours(&self, student: &UserId) -> Result<f64, ApplicationServiceError> {
        let total: f64 = self
            .repository
            .list_for_student(student)?
            .iter()
            .filter(|application| application.status == ApplicationStatus::Done)
            .filter_map(|application| application.verified_hours)
            .sum();
        Ok(total)
    }

    fn notify(&self, application: &Application, template: &str) {
        let mut details = BTreeMap::new();
        details.insert(
            "opportunity_id".to_string(),
            application.opportunity_id.0.clone(),
        );
        details.insert("status".to_string(), application.status.label().to_string());
        if let Some(hours) = application.verified_hours {
            details.insert("verified_hours".to_string(), format!("{hours:.2}"));
        }

        let notification = Notification {
            template: template.to_string(),
            recipient: application.student_id.clone(),
            application_id: application.id.clone(),
            details,
        };

        if let Err(error) = self.notifications.publish(notification) {
            warn!(application = %application.id, template, %error, "notification dropped");
        }
    }
}

impl<R, O, N> HoursSource for ApplicationService<R, O, N>
where
    R: ApplicationRepository + 'static,
    O: OpportunityDirectory + 'static,
    N: NotificationPublisher + 'static,
{
    fn verified_hours(&self, user: &UserId) -> Result<f64, StoreError> {
        self.total_verified_hours(user)
            .map_err(|error| StoreError::Unavailable(error.to_string()))
    }
}

fn validate_hours(hours: f64) -> Result<(), ApplicationServiceError> {
    if hours.is_finite() && hours > 0.0 {
        Ok(())
    } else {
        Err(ApplicationServiceError::InvalidHours(hours))
    }
}

/// Error raised by the application service.
#[derive(Debug, thiserror::Error)]
pub enum ApplicationServiceError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("cannot move application from {from} to {to}")]
    InvalidTransition {
        from: ApplicationStatus,
        to: ApplicationStatus,
    },
    #[error("hours must be a positive number (found {0})")]
    InvalidHours(f64),
    #[error("invalid opportunity: {0}")]
    InvalidOpportunity(String),
    #[error("application belongs to another student")]
    NotOwner,
}

impl ApplicationServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApplicationServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
            ApplicationServiceError::Repository(RepositoryError::Conflict)
            | ApplicationServiceError::InvalidTransition { .. } => StatusCode::CONFLICT,
            ApplicationServiceError::Repository(RepositoryError::Unavailable(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApplicationServiceError::InvalidHours(_)
            | ApplicationServiceError::InvalidOpportunity(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApplicationServiceError::NotOwner => StatusCode::FORBIDDEN,
        }
    }
}
