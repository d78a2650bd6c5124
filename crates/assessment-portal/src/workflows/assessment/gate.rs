use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::domain::{Availability, ExamDefinition, ExamId, Identity, QuestionSpec};
use super::error::{AssessmentError, MissingEntity};
use super::repository::AssessmentRepository;

/// Why the gate released or withheld question content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// An attempt exists; the window is not consulted.
    Completed(ExamDefinition),
    /// Reviewer preview, independent of the window.
    Preview(ExamDefinition),
    /// Applicant inside the window.
    Released(ExamDefinition),
    NotYetOpen(ExamDefinition),
    Expired(ExamDefinition),
}

impl GateDecision {
    pub fn definition(&self) -> &ExamDefinition {
        match self {
            GateDecision::Completed(definition)
            | GateDecision::Preview(definition)
            | GateDecision::Released(definition)
            | GateDecision::NotYetOpen(definition)
            | GateDecision::Expired(definition) => definition,
        }
    }

    pub const fn label(&self) -> &'static str {
        match self {
            GateDecision::Completed(_) => "completed",
            GateDecision::Preview(_) => "preview",
            GateDecision::Released(_) => "released",
            GateDecision::NotYetOpen(_) => "not_yet_open",
            GateDecision::Expired(_) => "expired",
        }
    }

    /// Wire shape returned to the presentation layer.
    pub fn into_view(self) -> ExamView {
        let (definition, questions_released, completed, expired) = match self {
            GateDecision::Completed(definition) => (definition, true, true, None),
            GateDecision::Preview(definition) | GateDecision::Released(definition) => {
                (definition, true, false, None)
            }
            GateDecision::NotYetOpen(definition) => (definition, false, false, None),
            GateDecision::Expired(definition) => (definition, false, false, Some(true)),
        };

        let ExamDefinition {
            id,
            title,
            questions,
            ..
        } = definition;

        ExamView {
            id,
            title,
            questions: if questions_released {
                questions
            } else {
                Vec::new()
            },
            completed,
            expired,
        }
    }
}

/// Fetch response: `{ id, title, questions, completed, expired? }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamView {
    pub id: ExamId,
    pub title: String,
    pub questions: Vec<QuestionSpec>,
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expired: Option<bool>,
}

/// Decides whether question content may be released to an identity at `now`.
pub struct AccessGate<R> {
    repository: Arc<R>,
}

impl<R> AccessGate<R>
where
    R: AssessmentRepository + 'static,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    pub fn evaluate(
        &self,
        identity: &Identity,
        exam_id: &ExamId,
        now: DateTime<Utc>,
    ) -> Result<GateDecision, AssessmentError> {
        if !identity.is_reviewer() && !identity.is_linked_to(exam_id) {
            return Err(AssessmentError::AccessDenied);
        }

        let definition = self
            .repository
            .fetch_exam(exam_id)?
            .ok_or_else(|| AssessmentError::NotFound(MissingEntity::Exam(exam_id.clone())))?;

        // Must precede the window check: a finished applicant whose window has
        // since closed sees completion, not expiry.
        let decision = if self
            .repository
            .find_attempt(&identity.id, exam_id)?
            .is_some()
        {
            GateDecision::Completed(definition)
        } else if identity.is_reviewer() {
            GateDecision::Preview(definition)
        } else {
            match definition.availability(now) {
                Availability::Open => GateDecision::Released(definition),
                Availability::NotYetOpen => GateDecision::NotYetOpen(definition),
                Availability::Closed => GateDecision::Expired(definition),
            }
        };

        debug!(
            identity_id = %identity.id,
            exam_id = %exam_id,
            decision = decision.label(),
            "access gate evaluated"
        );
        Ok(decision)
    }
}
