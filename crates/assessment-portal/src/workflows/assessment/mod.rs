//! Assessment access and single-attempt submission.
//!
//! Reviewers maintain exam definitions, the access gate decides what an
//! identity may see at a given moment, the submission recorder stores one
//! attempt per identity and exam, and the status lifecycle tracks where the
//! applicant sits in the hiring funnel.

pub mod answers;
pub mod definitions;
pub mod domain;
pub mod error;
pub mod gate;
pub mod lifecycle;
pub mod repository;
pub mod router;
pub mod service;
pub mod store;
pub mod submission;

#[cfg(test)]
mod tests;

pub use definitions::{DefinitionSnapshot, ExamDefinitionStore, ExamDraft, ExamPatch};
pub use domain::{
    AnswerSet, AnswerValue, Attempt, AttemptId, Availability, ChoiceAnswer, ExamDefinition,
    ExamId, FunnelStatus, Identity, IdentityId, NewAttempt, QuestionId, QuestionKind,
    QuestionSpec, Role,
};
pub use error::{AssessmentError, MissingEntity, QuestionIssue, ValidationError};
pub use gate::{AccessGate, ExamView, GateDecision};
pub use lifecycle::{StatusLifecycleManager, StatusNotice};
pub use repository::{AssessmentRepository, Notifier, NotifierError, RepositoryError};
pub use router::{assessment_router, IDENTITY_HEADER};
pub use service::{AssessmentService, Registration};
pub use store::InMemoryAssessmentStore;
pub use submission::{SubmissionRecorder, SubmitReceipt, SubmitRequest};
