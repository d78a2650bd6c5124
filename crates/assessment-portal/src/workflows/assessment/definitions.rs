use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use super::domain::{Availability, ExamDefinition, ExamId, QuestionKind, QuestionSpec};
use super::error::{AssessmentError, MissingEntity, QuestionIssue, ValidationError};
use super::repository::AssessmentRepository;

/// Reviewer input for a new exam.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamDraft {
    pub title: String,
    #[serde(default)]
    pub window_start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub window_end: Option<DateTime<Utc>>,
    pub questions: Vec<QuestionSpec>,
}

/// Partial update. A `Some(None)` window bound clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "explicit_null")]
    pub window_start: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "explicit_null")]
    pub window_end: Option<Option<DateTime<Utc>>>,
    #[serde(default)]
    pub questions: Option<Vec<QuestionSpec>>,
}

fn explicit_null<'de, D>(deserializer: D) -> Result<Option<Option<DateTime<Utc>>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<DateTime<Utc>>::deserialize(deserializer).map(Some)
}

/// Definition read with the informational window signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DefinitionSnapshot {
    #[serde(flatten)]
    pub definition: ExamDefinition,
    pub availability: Availability,
}

/// Validates and stores exam definitions. Never touched by the submission flow.
pub struct ExamDefinitionStore<R> {
    repository: Arc<R>,
}

impl<R> ExamDefinitionStore<R>
where
    R: AssessmentRepository + 'static,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    pub fn create(&self, draft: ExamDraft) -> Result<ExamDefinition, AssessmentError> {
        let ExamDraft {
            title,
            window_start,
            window_end,
            questions,
        } = draft;

        let definition = ExamDefinition {
            id: ExamId(Uuid::new_v4().to_string()),
            title,
            questions,
            window_start,
            window_end,
        };
        validate_definition(&definition)?;

        let stored = self.repository.insert_exam(definition)?;
        info!(exam_id = %stored.id, questions = stored.questions.len(), "exam definition created");
        Ok(stored)
    }

    pub fn update(&self, id: &ExamId, patch: ExamPatch) -> Result<ExamDefinition, AssessmentError> {
        let mut definition = self.fetch(id)?;
        let replaces_questions = patch.questions.is_some();

        if let Some(title) = patch.title {
            definition.title = title;
        }
        if let Some(window_start) = patch.window_start {
            definition.window_start = window_start;
        }
        if let Some(window_end) = patch.window_end {
            definition.window_end = window_end;
        }
        if let Some(questions) = patch.questions {
            definition.questions = questions;
        }
        validate_definition(&definition)?;

        if replaces_questions {
            let recorded = self.repository.attempts_for_exam(id)?.len();
            if recorded > 0 {
                warn!(
                    exam_id = %id,
                    attempts = recorded,
                    "question list replaced on an exam with recorded attempts"
                );
            }
        }

        self.repository.replace_exam(definition.clone())?;
        info!(exam_id = %id, "exam definition updated");
        Ok(definition)
    }

    pub fn get(&self, id: &ExamId, now: DateTime<Utc>) -> Result<DefinitionSnapshot, AssessmentError> {
        let definition = self.fetch(id)?;
        let availability = definition.availability(now);
        Ok(DefinitionSnapshot {
            definition,
            availability,
        })
    }

    pub(crate) fn fetch(&self, id: &ExamId) -> Result<ExamDefinition, AssessmentError> {
        self.repository
            .fetch_exam(id)?
            .ok_or_else(|| AssessmentError::NotFound(MissingEntity::Exam(id.clone())))
    }
}

/// Collects every structural issue instead of stopping at the first one.
pub fn validate_definition(definition: &ExamDefinition) -> Result<(), ValidationError> {
    let mut issues = Vec::new();

    if definition.title.trim().is_empty() {
        issues.push(QuestionIssue::exam("title must not be empty"));
    }
    if let (Some(start), Some(end)) = (definition.window_start, definition.window_end) {
        if start > end {
            issues.push(QuestionIssue::exam("windowStart must not be after windowEnd"));
        }
    }

    let mut seen = HashSet::new();
    for (index, question) in definition.questions.iter().enumerate() {
        if question.id.0.trim().is_empty() {
            issues.push(QuestionIssue::at(index, "question id must not be empty"));
        } else if !seen.insert(&question.id) {
            issues.push(QuestionIssue::at(
                index,
                format!("duplicate question id '{}'", question.id),
            ));
        }
        question_issues(index, question, &mut issues);
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::Definition { issues })
    }
}

fn question_issues(index: usize, question: &QuestionSpec, issues: &mut Vec<QuestionIssue>) {
    if question.word_limit < 0 {
        issues.push(QuestionIssue::at(index, "wordLimit must be zero or positive"));
    }

    if let Some(options) = question.kind.options() {
        if options.len() < 2 {
            issues.push(QuestionIssue::at(
                index,
                format!("{} requires at least two options", question.kind.label()),
            ));
        }
        if options.iter().any(|option| option.trim().is_empty()) {
            issues.push(QuestionIssue::at(index, "options must not be blank"));
        }
        let distinct: HashSet<&String> = options.iter().collect();
        if distinct.len() != options.len() {
            issues.push(QuestionIssue::at(index, "options must be distinct"));
        }
    }

    if let QuestionKind::SingleChoice {
        options,
        requires_explanation: true,
        explanation_label,
        explanation_trigger,
    } = &question.kind
    {
        let labelled = explanation_label
            .as_deref()
            .is_some_and(|label| !label.trim().is_empty());
        if !labelled {
            issues.push(QuestionIssue::at(
                index,
                "explanationLabel is required when requiresExplanation is set",
            ));
        }
        if let Some(trigger) = explanation_trigger {
            if !options.contains(trigger) {
                issues.push(QuestionIssue::at(
                    index,
                    format!("explanationTrigger '{trigger}' is not one of the options"),
                ));
            }
        }
    }
}
