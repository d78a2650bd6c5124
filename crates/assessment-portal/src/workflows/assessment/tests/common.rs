use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::workflows::assessment::definitions::ExamDraft;
use crate::workflows::assessment::domain::{
    Attempt, AttemptId, ExamDefinition, ExamId, FunnelStatus, Identity, IdentityId, NewAttempt,
    QuestionId, QuestionKind, QuestionSpec, Role,
};
use crate::workflows::assessment::repository::{
    AssessmentRepository, Notifier, NotifierError, RepositoryError,
};
use crate::workflows::assessment::service::{AssessmentService, Registration};
use crate::workflows::assessment::store::InMemoryAssessmentStore;

pub(super) fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 20, hour, minute, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn words(count: usize) -> String {
    vec!["word"; count].join(" ")
}

pub(super) fn explained_choice(id: &str, word_limit: i64) -> QuestionSpec {
    QuestionSpec {
        id: QuestionId(id.to_string()),
        text: "Have you worked night shifts before?".to_string(),
        kind: QuestionKind::SingleChoice {
            options: vec!["Yes".to_string(), "No".to_string()],
            requires_explanation: true,
            explanation_label: Some("Please describe the schedule".to_string()),
            explanation_trigger: None,
        },
        word_limit,
    }
}

pub(super) fn freeform_choice(id: &str, word_limit: i64) -> QuestionSpec {
    QuestionSpec {
        id: QuestionId(id.to_string()),
        text: "Preferred start date?".to_string(),
        kind: QuestionKind::SingleChoiceWithFreeform {
            options: vec!["Immediately".to_string(), "Other".to_string()],
        },
        word_limit,
    }
}

pub(super) fn essay(id: &str, word_limit: i64) -> QuestionSpec {
    QuestionSpec {
        id: QuestionId(id.to_string()),
        text: "Describe a difficult customer interaction.".to_string(),
        kind: QuestionKind::FreeformText,
        word_limit,
    }
}

pub(super) fn windowed_draft(questions: Vec<QuestionSpec>) -> ExamDraft {
    ExamDraft {
        title: "Warehouse associate screening".to_string(),
        window_start: Some(at(5, 0)),
        window_end: Some(at(10, 30)),
        questions,
    }
}

#[derive(Default)]
pub(super) struct MemoryNotifier {
    sent: Mutex<Vec<(String, String, String)>>,
}

impl MemoryNotifier {
    pub(super) fn sent(&self) -> Vec<(String, String, String)> {
        self.sent.lock().expect("notifier mutex poisoned").clone()
    }
}

impl Notifier for MemoryNotifier {
    fn send(&self, to_email: &str, subject: &str, body: &str) -> Result<(), NotifierError> {
        self.sent.lock().expect("notifier mutex poisoned").push((
            to_email.to_string(),
            subject.to_string(),
            body.to_string(),
        ));
        Ok(())
    }
}

#[derive(Default)]
pub(super) struct FailingNotifier {
    calls: Mutex<usize>,
}

impl FailingNotifier {
    pub(super) fn calls(&self) -> usize {
        *self.calls.lock().expect("notifier mutex poisoned")
    }
}

impl Notifier for FailingNotifier {
    fn send(&self, _to_email: &str, _subject: &str, _body: &str) -> Result<(), NotifierError> {
        *self.calls.lock().expect("notifier mutex poisoned") += 1;
        Err(NotifierError::Transport("smtp relay offline".to_string()))
    }
}

pub(super) struct UnavailableRepository;

fn offline<T>() -> Result<T, RepositoryError> {
    Err(RepositoryError::Unavailable("database offline".to_string()))
}

impl AssessmentRepository for UnavailableRepository {
    fn insert_exam(&self, _exam: ExamDefinition) -> Result<ExamDefinition, RepositoryError> {
        offline()
    }

    fn replace_exam(&self, _exam: ExamDefinition) -> Result<(), RepositoryError> {
        offline()
    }

    fn fetch_exam(&self, _id: &ExamId) -> Result<Option<ExamDefinition>, RepositoryError> {
        offline()
    }

    fn register_identity(&self, _identity: Identity) -> Result<Identity, RepositoryError> {
        offline()
    }

    fn fetch_identity(&self, _id: &IdentityId) -> Result<Option<Identity>, RepositoryError> {
        offline()
    }

    fn link_exam(&self, _id: &IdentityId, _exam_id: &ExamId) -> Result<Identity, RepositoryError> {
        offline()
    }

    fn update_identity_status(
        &self,
        _id: &IdentityId,
        _status: FunnelStatus,
    ) -> Result<(FunnelStatus, Identity), RepositoryError> {
        offline()
    }

    fn transition_status_if(
        &self,
        _id: &IdentityId,
        _expected: FunnelStatus,
        _next: FunnelStatus,
    ) -> Result<bool, RepositoryError> {
        offline()
    }

    fn find_attempt(
        &self,
        _identity_id: &IdentityId,
        _exam_id: &ExamId,
    ) -> Result<Option<Attempt>, RepositoryError> {
        offline()
    }

    fn create_attempt_atomic(&self, _attempt: NewAttempt) -> Result<Attempt, RepositoryError> {
        offline()
    }

    fn fetch_attempt(&self, _id: &AttemptId) -> Result<Option<Attempt>, RepositoryError> {
        offline()
    }

    fn attempts_for_exam(&self, _exam_id: &ExamId) -> Result<Vec<Attempt>, RepositoryError> {
        offline()
    }

    fn set_attempt_score(&self, _id: &AttemptId, _score: f32) -> Result<Attempt, RepositoryError> {
        offline()
    }
}

pub(super) type MemoryService = AssessmentService<InMemoryAssessmentStore, MemoryNotifier>;

pub(super) fn build_service() -> (
    MemoryService,
    Arc<InMemoryAssessmentStore>,
    Arc<MemoryNotifier>,
) {
    let store = Arc::new(InMemoryAssessmentStore::default());
    let notifier = Arc::new(MemoryNotifier::default());
    let service = AssessmentService::new(store.clone(), notifier.clone());
    (service, store, notifier)
}

/// A reviewer, one windowed exam and an applicant linked to it.
pub(super) struct Fixture {
    pub(super) reviewer: Identity,
    pub(super) applicant: Identity,
    pub(super) exam: ExamDefinition,
}

pub(super) fn seed<R, N>(service: &AssessmentService<R, N>, questions: Vec<QuestionSpec>) -> Fixture
where
    R: AssessmentRepository + 'static,
    N: Notifier + 'static,
{
    let reviewer = service
        .register(Registration {
            email: "reviewer@example.com".to_string(),
            role: Role::Reviewer,
            linked_exam_id: None,
        })
        .expect("reviewer registers");
    let exam = service
        .create_exam(&reviewer, windowed_draft(questions))
        .expect("exam is valid");
    let applicant = service
        .register(Registration {
            email: "applicant@example.com".to_string(),
            role: Role::Applicant,
            linked_exam_id: Some(exam.id.clone()),
        })
        .expect("applicant registers");

    Fixture {
        reviewer,
        applicant,
        exam,
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
