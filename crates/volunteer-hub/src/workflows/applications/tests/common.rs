use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Barrier, Mutex};

use axum::response::Response;
use serde_json::Value;

use crate::identity::{IdentityError, IdentityProvider, UserId};
use crate::workflows::applications::domain::{
    Application, ApplicationId, ApplicationStatus, NewOpportunity, Opportunity, OpportunityId,
};
use crate::workflows::applications::repository::{
    ApplicationRepository, Notification, NotificationError, NotificationPublisher,
    OpportunityDirectory, RepositoryError,
};
use crate::workflows::applications::{AcceptanceMode, ApplicationService, ApplicationState};

pub(super) type MemoryService =
    ApplicationService<MemoryApplications, MemoryOpportunities, MemoryNotifications>;

pub(super) fn ana() -> UserId {
    UserId("student-ana".to_string())
}

pub(super) fn bo() -> UserId {
    UserId("student-bo".to_string())
}

pub(super) fn fcfs_opportunity(slots: Option<u32>) -> NewOpportunity {
    NewOpportunity {
        title: "Saturday food bank shift".to_string(),
        organization: "Eastside Pantry".to_string(),
        slots,
        fcfs: true,
    }
}

pub(super) fn reviewed_opportunity() -> NewOpportunity {
    NewOpportunity {
        title: "Library reading buddies".to_string(),
        organization: "City Library".to_string(),
        slots: Some(4),
        fcfs: false,
    }
}

pub(super) fn build_service(
    mode: AcceptanceMode,
) -> (
    MemoryService,
    Arc<MemoryApplications>,
    Arc<MemoryNotifications>,
) {
    let applications = Arc::new(MemoryApplications::default());
    let opportunities = Arc::new(MemoryOpportunities::default());
    let notifications = Arc::new(MemoryNotifications::default());
    let service = ApplicationService::new(
        applications.clone(),
        opportunities,
        notifications.clone(),
        mode,
    );
    (service, applications, notifications)
}

pub(super) fn build_state(
    service: MemoryService,
) -> ApplicationState<MemoryApplications, MemoryOpportunities, MemoryNotifications> {
    ApplicationState {
        service: Arc::new(service),
        identity: Arc::new(StaticIdentity::with_sessions(&[
            ("tok-ana", ana()),
            ("tok-bo", bo()),
        ])),
    }
}

#[derive(Default)]
pub(super) struct MemoryApplications {
    records: Mutex<BTreeMap<ApplicationId, Application>>,
}

impl MemoryApplications {
    pub(super) fn accepted_for(&self, opportunity: &OpportunityId) -> usize {
        let guard = self.records.lock().expect("applications mutex poisoned");
        guard
            .values()
            .filter(|record| {
                &record.opportunity_id == opportunity
                    && record.status == ApplicationStatus::Accepted
            })
            .count()
    }
}

/// Whether the student already has an active application to the same opportunity.
fn holds_active(
    records: &BTreeMap<ApplicationId, Application>,
    application: &Application,
) -> bool {
    records.values().any(|existing| {
        existing.student_id == application.student_id
            && existing.opportunity_id == application.opportunity_id
            && existing.status.is_active()
    })
}

impl ApplicationRepository for MemoryApplications {
    fn insert(&self, application: Application) -> Result<Application, RepositoryError> {
        let mut guard = self.records.lock().expect("applications mutex poisoned");
        if guard.contains_key(&application.id) || holds_active(&guard, &application) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(application.id.clone(), application.clone());
        Ok(application)
    }

    fn update(&self, application: Application) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("applications mutex poisoned");
        match guard.get_mut(&application.id) {
            Some(existing) => {
                *existing = application;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn fetch(&self, id: &ApplicationId) -> Result<Option<Application>, RepositoryError> {
        let guard = self.records.lock().expect("applications mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn count_accepted(&self, opportunity: &OpportunityId) -> Result<u64, RepositoryError> {
        Ok(self.accepted_for(opportunity) as u64)
    }

    fn list_for_opportunity(
        &self,
        opportunity: &OpportunityId,
    ) -> Result<Vec<Application>, RepositoryError> {
        let guard = self.records.lock().expect("applications mutex poisoned");
        Ok(guard
            .values()
            .filter(|record| &record.opportunity_id == opportunity)
            .cloned()
            .collect())
    }

    fn list_for_student(&self, student: &UserId) -> Result<Vec<Application>, RepositoryError> {
        let guard = self.records.lock().expect("applications mutex poisoned");
        Ok(guard
            .values()
            .filter(|record| &record.student_id == student)
            .cloned()
            .collect())
    }

    fn accept_if_below_capacity(
        &self,
        application: &ApplicationId,
        opportunity: &OpportunityId,
        slots: u32,
    ) -> Result<bool, RepositoryError> {
        let mut guard = self.records.lock().expect("applications mutex poisoned");
        let accepted = guard
            .values()
            .filter(|record| {
                &record.opportunity_id == opportunity
                    && record.status == ApplicationStatus::Accepted
            })
            .count() as u64;
        if accepted >= u64::from(slots) {
            return Ok(false);
        }

        let record = guard.get_mut(application).ok_or(RepositoryError::NotFound)?;
        record.status = ApplicationStatus::Accepted;
        Ok(true)
    }
}

/// Store whose accepted-count reads fail; inserts and updates still work.
#[derive(Default)]
pub(super) struct CountOutage {
    pub(super) inner: MemoryApplications,
}

impl ApplicationRepository for CountOutage {
    fn insert(&self, application: Application) -> Result<Application, RepositoryError> {
        self.inner.insert(application)
    }

    fn update(&self, application: Application) -> Result<(), RepositoryError> {
        self.inner.update(application)
    }

    fn fetch(&self, id: &ApplicationId) -> Result<Option<Application>, RepositoryError> {
        self.inner.fetch(id)
    }

    fn count_accepted(&self, _opportunity: &OpportunityId) -> Result<u64, RepositoryError> {
        Err(RepositoryError::Unavailable("count timed out".to_string()))
    }

    fn list_for_opportunity(
        &self,
        opportunity: &OpportunityId,
    ) -> Result<Vec<Application>, RepositoryError> {
        self.inner.list_for_opportunity(opportunity)
    }

    fn list_for_student(&self, student: &UserId) -> Result<Vec<Application>, RepositoryError> {
        self.inner.list_for_student(student)
    }

    fn accept_if_below_capacity(
        &self,
        _application: &ApplicationId,
        _opportunity: &OpportunityId,
        _slots: u32,
    ) -> Result<bool, RepositoryError> {
        Err(RepositoryError::Unavailable("count timed out".to_string()))
    }
}

/// Store that holds every capacity check at a barrier until all applicants arrive.
///
/// The read-then-write path waits after reading the count, so each applicant
/// sees the same stale value. The atomic path waits before taking the lock.
pub(super) struct Rendezvous {
    pub(super) inner: MemoryApplications,
    barrier: Barrier,
}

impl Rendezvous {
    pub(super) fn new(applicants: usize) -> Self {
        Self {
            inner: MemoryApplications::default(),
            barrier: Barrier::new(applicants),
        }
    }
}

impl ApplicationRepository for Rendezvous {
    fn insert(&self, application: Application) -> Result<Application, RepositoryError> {
        self.inner.insert(application)
    }

    fn update(&self, application: Application) -> Result<(), RepositoryError> {
        self.inner.update(application)
    }

    fn fetch(&self, id: &ApplicationId) -> Result<Option<Application>, RepositoryError> {
        self.inner.fetch(id)
    }

    fn count_accepted(&self, opportunity: &OpportunityId) -> Result<u64, RepositoryError> {
        let count = self.inner.count_accepted(opportunity)?;
        self.barrier.wait();
        Ok(count)
    }

    fn list_for_opportunity(
        &self,
        opportunity: &OpportunityId,
    ) -> Result<Vec<Application>, RepositoryError> {
        self.inner.list_for_opportunity(opportunity)
    }

    fn list_for_student(&self, student: &UserId) -> Result<Vec<Application>, RepositoryError> {
        self.inner.list_for_student(student)
    }

    fn accept_if_below_capacity(
        &self,
        application: &ApplicationId,
        opportunity: &OpportunityId,
        slots: u32,
    ) -> Result<bool, RepositoryError> {
        self.barrier.wait();
        self.inner
            .accept_if_below_capacity(application, opportunity, slots)
    }
}

/// Store that holds duplicate lookups at a barrier, so concurrent applications
/// from one student all pass the service's pre-check before either inserts.
pub(super) struct LookupRendezvous {
    pub(super) inner: MemoryApplications,
    barrier: Barrier,
}

impl LookupRendezvous {
    pub(super) fn new(callers: usize) -> Self {
        Self {
            inner: MemoryApplications::default(),
            barrier: Barrier::new(callers),
        }
    }
}

impl ApplicationRepository for LookupRendezvous {
    fn insert(&self, application: Application) -> Result<Application, RepositoryError> {
        self.inner.insert(application)
    }

    fn update(&self, application: Application) -> Result<(), RepositoryError> {
        self.inner.update(application)
    }

    fn fetch(&self, id: &ApplicationId) -> Result<Option<Application>, RepositoryError> {
        self.inner.fetch(id)
    }

    fn count_accepted(&self, opportunity: &OpportunityId) -> Result<u64, RepositoryError> {
        self.inner.count_accepted(opportunity)
    }

    fn list_for_opportunity(
        &self,
        opportunity: &OpportunityId,
    ) -> Result<Vec<Application>, RepositoryError> {
        self.inner.list_for_opportunity(opportunity)
    }

    fn list_for_student(&self, student: &UserId) -> Result<Vec<Application>, RepositoryError> {
        let existing = self.inner.list_for_student(student)?;
        self.barrier.wait();
        Ok(existing)
    }

    fn accept_if_below_capacity(
        &self,
        application: &ApplicationId,
        opportunity: &OpportunityId,
        slots: u32,
    ) -> Result<bool, RepositoryError> {
        self.inner
            .accept_if_below_capacity(application, opportunity, slots)
    }
}

#[derive(Default)]
pub(super) struct MemoryOpportunities {
    records: Mutex<HashMap<OpportunityId, Opportunity>>,
}

impl OpportunityDirectory for MemoryOpportunities {
    fn insert(&self, opportunity: Opportunity) -> Result<Opportunity, RepositoryError> {
        let mut guard = self.records.lock().expect("opportunities mutex poisoned");
        if guard.contains_key(&opportunity.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(opportunity.id.clone(), opportunity.clone());
        Ok(opportunity)
    }

    fn fetch(&self, id: &OpportunityId) -> Result<Option<Opportunity>, RepositoryError> {
        let guard = self.records.lock().expect("opportunities mutex poisoned");
        Ok(guard.get(id).cloned())
    }
}

#[derive(Default)]
pub(super) struct MemoryNotifications {
    sent: Mutex<Vec<Notification>>,
}

impl MemoryNotifications {
    pub(super) fn templates(&self) -> Vec<String> {
        let guard = self.sent.lock().expect("notification mutex poisoned");
        guard.iter().map(|note| note.template.clone()).collect()
    }

    pub(super) fn sent(&self) -> Vec<Notification> {
        self.sent.lock().expect("notification mutex poisoned").clone()
    }
}

impl NotificationPublisher for MemoryNotifications {
    fn publish(&self, notification: Notification) -> Result<(), NotificationError> {
        let mut guard = self.sent.lock().expect("notification mutex poisoned");
        guard.push(notification);
        Ok(())
    }
}

pub(super) struct DownNotifications;

impl NotificationPublisher for DownNotifications {
    fn publish(&self, _notification: Notification) -> Result<(), NotificationError> {
        Err(NotificationError::Transport("smtp refused".to_string()))
    }
}

pub(super) struct StaticIdentity {
    sessions: HashMap<String, UserId>,
}

impl StaticIdentity {
    pub(super) fn with_sessions(sessions: &[(&str, UserId)]) -> Self {
        Self {
            sessions: sessions
                .iter()
                .map(|(token, user)| (token.to_string(), user.clone()))
                .collect(),
        }
    }
}

impl IdentityProvider for StaticIdentity {
    fn current_user(&self, token: &str) -> Result<Option<UserId>, IdentityError> {
        Ok(self.sessions.get(token).cloned())
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 16 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
