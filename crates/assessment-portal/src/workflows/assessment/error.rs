use std::fmt;

use super::domain::{AttemptId, ExamId, IdentityId, QuestionId};
use super::repository::RepositoryError;

/// One structural problem found while validating an exam definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionIssue {
    /// Position in the submitted question list; `None` for exam-level issues.
    pub question_index: Option<usize>,
    pub reason: String,
}

impl QuestionIssue {
    pub(crate) fn at(index: usize, reason: impl Into<String>) -> Self {
        Self {
            question_index: Some(index),
            reason: reason.into(),
        }
    }

    pub(crate) fn exam(reason: impl Into<String>) -> Self {
        Self {
            question_index: None,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for QuestionIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.question_index {
            Some(index) => write!(f, "question {index}: {}", self.reason),
            None => f.write_str(&self.reason),
        }
    }
}

/// Rejections for malformed definitions, answer payloads and scores.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("invalid exam definition: {}", join_issues(.issues))]
    Definition { issues: Vec<QuestionIssue> },
    #[error("question {question_id}: explanation required")]
    ExplanationRequired { question_id: QuestionId },
    #[error("question {question_id}: {actual} words exceeds the limit of {limit}")]
    WordLimitExceeded {
        question_id: QuestionId,
        limit: usize,
        actual: usize,
    },
    #[error("question {question_id} is not part of this exam")]
    UnknownQuestion { question_id: QuestionId },
    #[error("question {question_id}: '{value}' is not one of the options")]
    UnknownOption { question_id: QuestionId, value: String },
    #[error("question {question_id}: no option selected")]
    MissingSelection { question_id: QuestionId },
    #[error("score must be a finite, non-negative number")]
    InvalidScore,
}

impl ValidationError {
    /// Question the rejection points at, for answer-level failures.
    pub fn question_id(&self) -> Option<&QuestionId> {
        match self {
            ValidationError::ExplanationRequired { question_id }
            | ValidationError::WordLimitExceeded { question_id, .. }
            | ValidationError::UnknownQuestion { question_id }
            | ValidationError::UnknownOption { question_id, .. }
            | ValidationError::MissingSelection { question_id } => Some(question_id),
            ValidationError::Definition { .. } | ValidationError::InvalidScore => None,
        }
    }
}

fn join_issues(issues: &[QuestionIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Entity kinds reported by `AssessmentError::NotFound`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MissingEntity {
    Exam(ExamId),
    Identity(IdentityId),
    Attempt(AttemptId),
}

impl fmt::Display for MissingEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissingEntity::Exam(id) => write!(f, "exam {id}"),
            MissingEntity::Identity(id) => write!(f, "identity {id}"),
            MissingEntity::Attempt(id) => write!(f, "attempt {id}"),
        }
    }
}

/// Error raised by the assessment components.
///
/// Not-yet-open and expired exams are successful gate outcomes, not errors.
#[derive(Debug, thiserror::Error)]
pub enum AssessmentError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("identity is not permitted to access this exam")]
    AccessDenied,
    #[error("no identity supplied")]
    Unauthorized,
    #[error("an attempt has already been submitted for this exam")]
    AlreadySubmitted,
    #[error("{0} not found")]
    NotFound(MissingEntity),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
