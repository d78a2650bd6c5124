use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::definitions::{DefinitionSnapshot, ExamDefinitionStore, ExamDraft, ExamPatch};
use super::domain::{
    Attempt, AttemptId, ExamDefinition, ExamId, FunnelStatus, Identity, IdentityId, Role,
};
use super::error::{AssessmentError, MissingEntity, ValidationError};
use super::gate::{AccessGate, GateDecision};
use super::lifecycle::StatusLifecycleManager;
use super::repository::{AssessmentRepository, Notifier, RepositoryError};
use super::submission::{SubmissionRecorder, SubmitReceipt, SubmitRequest};

/// Registration payload. Every identity starts in `PENDING`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub email: String,
    pub role: Role,
    #[serde(default)]
    pub linked_exam_id: Option<ExamId>,
}

/// Service composing the definition store, access gate, submission recorder
/// and status lifecycle over one repository and notifier.
pub struct AssessmentService<R, N> {
    repository: Arc<R>,
    definitions: ExamDefinitionStore<R>,
    gate: AccessGate<R>,
    recorder: SubmissionRecorder<R, N>,
    lifecycle: Arc<StatusLifecycleManager<R, N>>,
}

impl<R, N> AssessmentService<R, N>
where
    R: AssessmentRepository + 'static,
    N: Notifier + 'static,
{
    pub fn new(repository: Arc<R>, notifier: Arc<N>) -> Self {
        let lifecycle = Arc::new(StatusLifecycleManager::new(repository.clone(), notifier));
        Self {
            definitions: ExamDefinitionStore::new(repository.clone()),
            gate: AccessGate::new(repository.clone()),
            recorder: SubmissionRecorder::new(repository.clone(), lifecycle.clone()),
            lifecycle,
            repository,
        }
    }

    /// Resolve the session identity supplied at the boundary.
    pub fn identity(&self, identity_id: &IdentityId) -> Result<Identity, AssessmentError> {
        self.repository
            .fetch_identity(identity_id)?
            .ok_or_else(|| AssessmentError::NotFound(MissingEntity::Identity(identity_id.clone())))
    }

    pub fn register(&self, registration: Registration) -> Result<Identity, AssessmentError> {
        let Registration {
            email,
            role,
            linked_exam_id,
        } = registration;

        if let Some(exam_id) = &linked_exam_id {
            self.definitions.fetch(exam_id)?;
        }

        let identity = self.repository.register_identity(Identity {
            id: IdentityId(Uuid::new_v4().to_string()),
            email,
            role,
            linked_exam_id,
            status: FunnelStatus::Pending,
        })?;
        info!(identity_id = %identity.id, role = ?identity.role, "identity registered");
        Ok(identity)
    }

    /// Record that the identity applied to the job tied to `exam_id`.
    pub fn link_exam(
        &self,
        identity_id: &IdentityId,
        exam_id: &ExamId,
    ) -> Result<Identity, AssessmentError> {
        self.definitions.fetch(exam_id)?;
        self.repository
            .link_exam(identity_id, exam_id)
            .map_err(|err| not_found_as(err, MissingEntity::Identity(identity_id.clone())))
    }

    pub fn create_exam(
        &self,
        reviewer: &Identity,
        draft: ExamDraft,
    ) -> Result<ExamDefinition, AssessmentError> {
        require_reviewer(reviewer)?;
        self.definitions.create(draft)
    }

    pub fn update_exam(
        &self,
        reviewer: &Identity,
        exam_id: &ExamId,
        patch: ExamPatch,
    ) -> Result<ExamDefinition, AssessmentError> {
        require_reviewer(reviewer)?;
        self.definitions.update(exam_id, patch)
    }

    pub fn exam_definition(
        &self,
        reviewer: &Identity,
        exam_id: &ExamId,
        now: DateTime<Utc>,
    ) -> Result<DefinitionSnapshot, AssessmentError> {
        require_reviewer(reviewer)?;
        self.definitions.get(exam_id, now)
    }

    pub fn fetch_exam(
        &self,
        identity: &Identity,
        exam_id: &ExamId,
        now: DateTime<Utc>,
    ) -> Result<GateDecision, AssessmentError> {
        self.gate.evaluate(identity, exam_id, now)
    }

    pub fn submit(
        &self,
        identity_id: &IdentityId,
        request: SubmitRequest,
        now: DateTime<Utc>,
    ) -> Result<SubmitReceipt, AssessmentError> {
        self.recorder.submit(identity_id, request, now)
    }

    pub fn set_status(
        &self,
        reviewer: &Identity,
        identity_id: &IdentityId,
        status: FunnelStatus,
    ) -> Result<Identity, AssessmentError> {
        self.lifecycle.set_status(reviewer, identity_id, status)
    }

    pub fn attempts_for_exam(
        &self,
        reviewer: &Identity,
        exam_id: &ExamId,
    ) -> Result<Vec<Attempt>, AssessmentError> {
        require_reviewer(reviewer)?;
        self.definitions.fetch(exam_id)?;
        Ok(self.repository.attempts_for_exam(exam_id)?)
    }

    /// Only the score of an attempt is mutable, and it may be set repeatedly.
    pub fn set_score(
        &self,
        reviewer: &Identity,
        attempt_id: &AttemptId,
        score: f32,
    ) -> Result<Attempt, AssessmentError> {
        require_reviewer(reviewer)?;
        if !score.is_finite() || score < 0.0 {
            return Err(ValidationError::InvalidScore.into());
        }

        let attempt = self
            .repository
            .set_attempt_score(attempt_id, score)
            .map_err(|err| not_found_as(err, MissingEntity::Attempt(attempt_id.clone())))?;
        info!(attempt_id = %attempt_id, reviewer_id = %reviewer.id, score, "attempt scored");
        Ok(attempt)
    }
}

fn require_reviewer(identity: &Identity) -> Result<(), AssessmentError> {
    if identity.is_reviewer() {
        Ok(())
    } else {
        Err(AssessmentError::AccessDenied)
    }
}

fn not_found_as(err: RepositoryError, entity: MissingEntity) -> AssessmentError {
    match err {
        RepositoryError::NotFound => AssessmentError::NotFound(entity),
        other => AssessmentError::Repository(other),
    }
}
