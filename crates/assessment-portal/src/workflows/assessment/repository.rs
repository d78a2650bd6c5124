use super::domain::{
    Attempt, AttemptId, ExamDefinition, ExamId, FunnelStatus, Identity, IdentityId, NewAttempt,
};

/// Storage abstraction so the components can be exercised in isolation.
///
/// `create_attempt_atomic` must enforce uniqueness of `(identity_id, exam_id)`
/// in the same step as the insert, e.g. through a unique index. Callers never
/// pair `find_attempt` with a later insert to get that guarantee.
pub trait AssessmentRepository: Send + Sync {
    fn insert_exam(&self, exam: ExamDefinition) -> Result<ExamDefinition, RepositoryError>;
    fn replace_exam(&self, exam: ExamDefinition) -> Result<(), RepositoryError>;
    fn fetch_exam(&self, id: &ExamId) -> Result<Option<ExamDefinition>, RepositoryError>;

    fn register_identity(&self, identity: Identity) -> Result<Identity, RepositoryError>;
    fn fetch_identity(&self, id: &IdentityId) -> Result<Option<Identity>, RepositoryError>;
    fn link_exam(&self, id: &IdentityId, exam_id: &ExamId) -> Result<Identity, RepositoryError>;
    /// Overwrite the status, returning the status it replaced alongside the
    /// updated identity.
    fn update_identity_status(
        &self,
        id: &IdentityId,
        status: FunnelStatus,
    ) -> Result<(FunnelStatus, Identity), RepositoryError>;
    /// Compare-and-set on the status. Returns `false` without writing when the
    /// current status differs from `expected`.
    fn transition_status_if(
        &self,
        id: &IdentityId,
        expected: FunnelStatus,
        next: FunnelStatus,
    ) -> Result<bool, RepositoryError>;

    fn find_attempt(
        &self,
        identity_id: &IdentityId,
        exam_id: &ExamId,
    ) -> Result<Option<Attempt>, RepositoryError>;
    /// Insert guarded by the `(identity_id, exam_id)` uniqueness constraint;
    /// a duplicate yields `RepositoryError::Conflict` and stores nothing.
    fn create_attempt_atomic(&self, attempt: NewAttempt) -> Result<Attempt, RepositoryError>;
    fn fetch_attempt(&self, id: &AttemptId) -> Result<Option<Attempt>, RepositoryError>;
    fn attempts_for_exam(&self, exam_id: &ExamId) -> Result<Vec<Attempt>, RepositoryError>;
    fn set_attempt_score(&self, id: &AttemptId, score: f32) -> Result<Attempt, RepositoryError>;
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

/// Outbound notification hook (e-mail or similar adapters).
pub trait Notifier: Send + Sync {
    fn send(&self, to_email: &str, subject: &str, body: &str) -> Result<(), NotifierError>;
}

/// Notification dispatch error.
#[derive(Debug, thiserror::Error)]
pub enum NotifierError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
    #[error("notification rejected for {recipient}: {reason}")]
    Rejected { recipient: String, reason: String },
}
