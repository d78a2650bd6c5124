use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use super::answers::validate_answers;
use super::domain::{AnswerSet, AttemptId, ExamId, IdentityId, NewAttempt};
use super::error::{AssessmentError, MissingEntity};
use super::lifecycle::StatusLifecycleManager;
use super::repository::{AssessmentRepository, Notifier, RepositoryError};

/// Submit request: `{ examId, answers }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    pub exam_id: ExamId,
    #[serde(default)]
    pub answers: AnswerSet,
}

/// Submit response on success: `{ success: true, attemptId }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReceipt {
    pub success: bool,
    pub attempt_id: AttemptId,
}

/// Records at most one finished answer set per identity and exam.
pub struct SubmissionRecorder<R, N> {
    repository: Arc<R>,
    lifecycle: Arc<StatusLifecycleManager<R, N>>,
}

impl<R, N> SubmissionRecorder<R, N>
where
    R: AssessmentRepository + 'static,
    N: Notifier + 'static,
{
    pub fn new(repository: Arc<R>, lifecycle: Arc<StatusLifecycleManager<R, N>>) -> Self {
        Self {
            repository,
            lifecycle,
        }
    }

    pub fn submit(
        &self,
        identity_id: &IdentityId,
        request: SubmitRequest,
        now: DateTime<Utc>,
    ) -> Result<SubmitReceipt, AssessmentError> {
        let SubmitRequest { exam_id, answers } = request;

        let identity = self
            .repository
            .fetch_identity(identity_id)?
            .ok_or_else(|| AssessmentError::NotFound(MissingEntity::Identity(identity_id.clone())))?;
        // Same linkage rule as the access gate: reviewers may take any exam.
        if !identity.is_reviewer() && !identity.is_linked_to(&exam_id) {
            return Err(AssessmentError::AccessDenied);
        }

        let definition = self
            .repository
            .fetch_exam(&exam_id)?
            .ok_or_else(|| AssessmentError::NotFound(MissingEntity::Exam(exam_id.clone())))?;

        // Early answer for a returning applicant; the insert below stays authoritative.
        if self.repository.find_attempt(identity_id, &exam_id)?.is_some() {
            info!(identity_id = %identity_id, exam_id = %exam_id, "duplicate submission rejected");
            return Err(AssessmentError::AlreadySubmitted);
        }

        validate_answers(&definition, &answers)?;

        let attempt = self
            .repository
            .create_attempt_atomic(NewAttempt {
                identity_id: identity_id.clone(),
                exam_id: exam_id.clone(),
                answers,
                submitted_at: now,
            })
            .map_err(|err| match err {
                RepositoryError::Conflict => {
                    info!(identity_id = %identity_id, exam_id = %exam_id, "duplicate submission rejected");
                    AssessmentError::AlreadySubmitted
                }
                other => AssessmentError::Repository(other),
            })?;
        info!(
            identity_id = %identity_id,
            exam_id = %exam_id,
            attempt_id = %attempt.id,
            "attempt recorded"
        );

        // The attempt is the record of truth; a failed status write is logged
        // rather than reported as a failed submission.
        if let Err(err) = self.lifecycle.complete_after_submission(identity_id) {
            error!(
                identity_id = %identity_id,
                attempt_id = %attempt.id,
                error = %err,
                "failed to advance funnel status after submission"
            );
        }

        Ok(SubmitReceipt {
            success: true,
            attempt_id: attempt.id,
        })
    }
}
