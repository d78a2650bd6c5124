use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use uuid::Uuid;

use super::domain::{
    Attempt, AttemptId, ExamDefinition, ExamId, FunnelStatus, Identity, IdentityId, NewAttempt,
};
use super::repository::{AssessmentRepository, RepositoryError};

#[derive(Default)]
struct StoreState {
    exams: HashMap<ExamId, ExamDefinition>,
    identities: HashMap<IdentityId, Identity>,
    attempts: HashMap<AttemptId, Attempt>,
    attempt_index: HashMap<(IdentityId, ExamId), AttemptId>,
}

/// Process-local repository backed by a single mutex.
///
/// The uniqueness index on `(identity_id, exam_id)` is checked and written
/// under the same lock as the attempt itself.
#[derive(Default, Clone)]
pub struct InMemoryAssessmentStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryAssessmentStore {
    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().expect("assessment store mutex poisoned")
    }

    pub fn attempt_count(&self) -> usize {
        self.lock().attempts.len()
    }
}

impl AssessmentRepository for InMemoryAssessmentStore {
    fn insert_exam(&self, exam: ExamDefinition) -> Result<ExamDefinition, RepositoryError> {
        let mut guard = self.lock();
        if guard.exams.contains_key(&exam.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.exams.insert(exam.id.clone(), exam.clone());
        Ok(exam)
    }

    fn replace_exam(&self, exam: ExamDefinition) -> Result<(), RepositoryError> {
        let mut guard = self.lock();
        match guard.exams.get_mut(&exam.id) {
            Some(slot) => {
                *slot = exam;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn fetch_exam(&self, id: &ExamId) -> Result<Option<ExamDefinition>, RepositoryError> {
        Ok(self.lock().exams.get(id).cloned())
    }

    fn register_identity(&self, identity: Identity) -> Result<Identity, RepositoryError> {
        let mut guard = self.lock();
        let duplicate_email = guard
            .identities
            .values()
            .any(|existing| existing.email.eq_ignore_ascii_case(&identity.email));
        if duplicate_email || guard.identities.contains_key(&identity.id) {
            return Err(RepositoryError::Conflict);
        }
        guard
            .identities
            .insert(identity.id.clone(), identity.clone());
        Ok(identity)
    }

    fn fetch_identity(&self, id: &IdentityId) -> Result<Option<Identity>, RepositoryError> {
        Ok(self.lock().identities.get(id).cloned())
    }

    fn link_exam(&self, id: &IdentityId, exam_id: &ExamId) -> Result<Identity, RepositoryError> {
        let mut guard = self.lock();
        let identity = guard
            .identities
            .get_mut(id)
            .ok_or(RepositoryError::NotFound)?;
        identity.linked_exam_id = Some(exam_id.clone());
        Ok(identity.clone())
    }

    fn update_identity_status(
        &self,
        id: &IdentityId,
        status: FunnelStatus,
    ) -> Result<(FunnelStatus, Identity), RepositoryError> {
        let mut guard = self.lock();
        let identity = guard
            .identities
            .get_mut(id)
            .ok_or(RepositoryError::NotFound)?;
        let previous = std::mem::replace(&mut identity.status, status);
        Ok((previous, identity.clone()))
    }

    fn transition_status_if(
        &self,
        id: &IdentityId,
        expected: FunnelStatus,
        next: FunnelStatus,
    ) -> Result<bool, RepositoryError> {
        let mut guard = self.lock();
        let identity = guard
            .identities
            .get_mut(id)
            .ok_or(RepositoryError::NotFound)?;
        if identity.status != expected {
            return Ok(false);
        }
        identity.status = next;
        Ok(true)
    }

    fn find_attempt(
        &self,
        identity_id: &IdentityId,
        exam_id: &ExamId,
    ) -> Result<Option<Attempt>, RepositoryError> {
        let guard = self.lock();
        let key = (identity_id.clone(), exam_id.clone());
        Ok(guard
            .attempt_index
            .get(&key)
            .and_then(|attempt_id| guard.attempts.get(attempt_id))
            .cloned())
    }

    fn create_attempt_atomic(&self, attempt: NewAttempt) -> Result<Attempt, RepositoryError> {
        let mut guard = self.lock();
        let key = (attempt.identity_id.clone(), attempt.exam_id.clone());
        if guard.attempt_index.contains_key(&key) {
            return Err(RepositoryError::Conflict);
        }

        let stored = Attempt {
            id: AttemptId(Uuid::new_v4().to_string()),
            identity_id: attempt.identity_id,
            exam_id: attempt.exam_id,
            answers: attempt.answers,
            submitted_at: attempt.submitted_at,
            score: None,
        };
        guard.attempt_index.insert(key, stored.id.clone());
        guard.attempts.insert(stored.id.clone(), stored.clone());
        Ok(stored)
    }

    fn fetch_attempt(&self, id: &AttemptId) -> Result<Option<Attempt>, RepositoryError> {
        Ok(self.lock().attempts.get(id).cloned())
    }

    fn attempts_for_exam(&self, exam_id: &ExamId) -> Result<Vec<Attempt>, RepositoryError> {
        let guard = self.lock();
        let mut attempts: Vec<Attempt> = guard
            .attempts
            .values()
            .filter(|attempt| &attempt.exam_id == exam_id)
            .cloned()
            .collect();
        attempts.sort_by(|a, b| a.submitted_at.cmp(&b.submitted_at).then(a.id.cmp(&b.id)));
        Ok(attempts)
    }

    fn set_attempt_score(&self, id: &AttemptId, score: f32) -> Result<Attempt, RepositoryError> {
        let mut guard = self.lock();
        let attempt = guard.attempts.get_mut(id).ok_or(RepositoryError::NotFound)?;
        attempt.score = Some(score);
        Ok(attempt.clone())
    }
}
