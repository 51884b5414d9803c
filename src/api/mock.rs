//! Mock collaborators for testing.
//!
//! Each mock records the calls it receives and can be scripted to fail, so
//! controller behavior can be asserted without touching the filesystem.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use super::{
    EntityStore, EntityStoreError, Invitation, InvitationFields, NavigationIntent, Navigator,
    NewInvitation, PaymentDetails, PaymentOutcome, PaymentService,
};
use crate::types::InvitationId;

/// A call received by [`MockEntityStore`]
#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    Create(NewInvitation),
    Update(InvitationId, InvitationFields),
    Get(InvitationId),
}

/// In-memory entity store with a call log and scripted failures
#[derive(Debug, Clone, Default)]
pub struct MockEntityStore {
    invitations: Arc<Mutex<HashMap<InvitationId, Invitation>>>,
    /// Errors returned, in order, by the next create/update calls
    failures: Arc<Mutex<VecDeque<EntityStoreError>>>,
    pub call_log: Arc<Mutex<Vec<MockCall>>>,
    next_id: Arc<Mutex<usize>>,
}

impl MockEntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an existing invitation (for edit mode)
    pub fn insert(&self, invitation: Invitation) {
        self.invitations
            .lock()
            .unwrap()
            .insert(invitation.id.clone(), invitation);
    }

    /// Make the next create or update fail with `err`
    pub fn fail_next(&self, err: EntityStoreError) {
        self.failures.lock().unwrap().push_back(err);
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.call_log.lock().unwrap().clone()
    }

    pub fn create_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, MockCall::Create(_)))
            .count()
    }

    /// Ids targeted by update calls, in call order
    pub fn update_targets(&self) -> Vec<InvitationId> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                MockCall::Update(id, _) => Some(id),
                _ => None,
            })
            .collect()
    }

    pub fn stored(&self, id: &InvitationId) -> Option<Invitation> {
        self.invitations.lock().unwrap().get(id).cloned()
    }

    fn record(&self, call: MockCall) {
        self.call_log.lock().unwrap().push(call);
    }

    fn take_failure(&self) -> Option<EntityStoreError> {
        self.failures.lock().unwrap().pop_front()
    }
}

#[async_trait]
impl EntityStore for MockEntityStore {
    async fn create(&self, request: NewInvitation) -> Result<Invitation, EntityStoreError> {
        self.record(MockCall::Create(request.clone()));
        if let Some(err) = self.take_failure() {
            return Err(err);
        }

        let id = {
            let mut next = self.next_id.lock().unwrap();
            *next += 1;
            InvitationId::new(format!("inv-{}", *next))
        };
        let now = Utc::now();
        let invitation = Invitation {
            id: id.clone(),
            category: request.category,
            template_id: request.template_id,
            package: request.package,
            form_data: request.form_data,
            created_at: now,
            updated_at: now,
        };
        self.invitations.lock().unwrap().insert(id, invitation.clone());
        Ok(invitation)
    }

    async fn update(
        &self,
        id: &InvitationId,
        fields: InvitationFields,
    ) -> Result<Invitation, EntityStoreError> {
        self.record(MockCall::Update(id.clone(), fields.clone()));
        if let Some(err) = self.take_failure() {
            return Err(err);
        }

        let mut invitations = self.invitations.lock().unwrap();
        let invitation = invitations
            .get_mut(id)
            .ok_or_else(|| EntityStoreError::NotFound(id.clone()))?;
        if let Some(category) = fields.category {
            invitation.category = category;
        }
        if let Some(form_data) = fields.form_data {
            invitation.form_data = form_data;
        }
        if let Some(package) = fields.package {
            invitation.package = package;
        }
        if let Some(template) = fields.template_id {
            invitation.template_id = template;
        }
        invitation.updated_at = Utc::now();
        Ok(invitation.clone())
    }

    async fn get(&self, id: &InvitationId) -> Result<Invitation, EntityStoreError> {
        self.record(MockCall::Get(id.clone()));
        self.stored(id)
            .ok_or_else(|| EntityStoreError::NotFound(id.clone()))
    }
}

/// Payment service returning a fixed outcome
#[derive(Debug, Clone)]
pub struct MockPaymentService {
    outcome: PaymentOutcome,
    submitted: Arc<Mutex<Vec<PaymentDetails>>>,
}

impl MockPaymentService {
    pub fn succeeding() -> Self {
        Self {
            outcome: PaymentOutcome::succeeded("pay-mock"),
            submitted: Arc::default(),
        }
    }

    pub fn failing(error: &str) -> Self {
        Self {
            outcome: PaymentOutcome::failed(error),
            submitted: Arc::default(),
        }
    }

    pub fn submitted(&self) -> Vec<PaymentDetails> {
        self.submitted.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentService for MockPaymentService {
    async fn submit(&self, details: PaymentDetails) -> PaymentOutcome {
        self.submitted.lock().unwrap().push(details);
        self.outcome.clone()
    }
}

/// Navigator that remembers every intent it was given
#[derive(Debug, Clone, Default)]
pub struct RecordingNavigator {
    intents: Arc<Mutex<Vec<NavigationIntent>>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intents(&self) -> Vec<NavigationIntent> {
        self.intents.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, intent: NavigationIntent) {
        self.intents.lock().unwrap().push(intent);
    }
}
