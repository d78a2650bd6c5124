use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for exam definitions.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExamId(pub String);

/// Identifier of a question, unique within its exam.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionId(pub String);

/// Identifier wrapper for registered applicants and reviewers.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityId(pub String);

/// Identifier wrapper for recorded attempts.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttemptId(pub String);

macro_rules! display_id {
    ($($name:ident),*) => {
        $(
            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(&self.0)
                }
            }

            impl From<&str> for $name {
                fn from(value: &str) -> Self {
                    Self(value.to_string())
                }
            }
        )*
    };
}

display_id!(ExamId, QuestionId, IdentityId, AttemptId);

/// One question of an exam: prompt, kind-specific payload and the word budget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionSpec {
    pub id: QuestionId,
    pub text: String,
    #[serde(flatten)]
    pub kind: QuestionKind,
    /// `0` means unlimited. Signed so that negative input reaches validation
    /// instead of failing deserialization.
    #[serde(default)]
    pub word_limit: i64,
}

impl QuestionSpec {
    /// Positive word budget, or `None` when the question is unlimited.
    pub fn word_budget(&self) -> Option<usize> {
        usize::try_from(self.word_limit)
            .ok()
            .filter(|limit| *limit > 0)
    }
}

/// Question kinds with the fields that are only meaningful for that kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "kind",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum QuestionKind {
    SingleChoice {
        options: Vec<String>,
        #[serde(default)]
        requires_explanation: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        explanation_label: Option<String>,
        /// Option whose selection demands an explanation; the first option when unset.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        explanation_trigger: Option<String>,
    },
    SingleChoiceWithFreeform {
        options: Vec<String>,
    },
    FreeformText,
}

impl QuestionKind {
    pub const fn label(&self) -> &'static str {
        match self {
            QuestionKind::SingleChoice { .. } => "SINGLE_CHOICE",
            QuestionKind::SingleChoiceWithFreeform { .. } => "SINGLE_CHOICE_WITH_FREEFORM",
            QuestionKind::FreeformText => "FREEFORM_TEXT",
        }
    }

    pub fn options(&self) -> Option<&[String]> {
        match self {
            QuestionKind::SingleChoice { options, .. }
            | QuestionKind::SingleChoiceWithFreeform { options } => Some(options),
            QuestionKind::FreeformText => None,
        }
    }

    /// The option that makes an explanation mandatory, if this question asks for one.
    pub fn explanation_trigger(&self) -> Option<&str> {
        match self {
            QuestionKind::SingleChoice {
                options,
                requires_explanation: true,
                explanation_trigger,
                ..
            } => explanation_trigger
                .as_deref()
                .or_else(|| options.first().map(String::as_str)),
            _ => None,
        }
    }
}

/// Reusable exam template: ordered questions plus an optional release window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamDefinition {
    pub id: ExamId,
    pub title: String,
    pub questions: Vec<QuestionSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_start: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_end: Option<DateTime<Utc>>,
}

impl ExamDefinition {
    pub fn question(&self, id: &QuestionId) -> Option<&QuestionSpec> {
        self.questions.iter().find(|question| &question.id == id)
    }

    /// Where `now` falls relative to the window. Both bounds are inclusive.
    pub fn availability(&self, now: DateTime<Utc>) -> Availability {
        if self.window_start.is_some_and(|start| now < start) {
            Availability::NotYetOpen
        } else if self.window_end.is_some_and(|end| now > end) {
            Availability::Closed
        } else {
            Availability::Open
        }
    }
}

/// Informational window signal attached to definition reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Availability {
    Open,
    NotYetOpen,
    Closed,
}

/// Role supplied by the session provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Applicant,
    Reviewer,
}

/// Stage of an applicant in the hiring funnel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FunnelStatus {
    Pending,
    Completed,
    Passed,
    Failed,
    Interview,
    Hired,
    Rejected,
}

impl FunnelStatus {
    pub const fn label(self) -> &'static str {
        match self {
            FunnelStatus::Pending => "PENDING",
            FunnelStatus::Completed => "COMPLETED",
            FunnelStatus::Passed => "PASSED",
            FunnelStatus::Failed => "FAILED",
            FunnelStatus::Interview => "INTERVIEW",
            FunnelStatus::Hired => "HIRED",
            FunnelStatus::Rejected => "REJECTED",
        }
    }

    /// Statuses whose entry is announced to the applicant.
    pub const fn notifies(self) -> bool {
        matches!(
            self,
            FunnelStatus::Passed
                | FunnelStatus::Interview
                | FunnelStatus::Hired
                | FunnelStatus::Rejected
        )
    }
}

impl fmt::Display for FunnelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Registered applicant or reviewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: IdentityId,
    pub email: String,
    pub role: Role,
    /// Exam tied to the job the applicant most recently applied to.
    #[serde(default)]
    pub linked_exam_id: Option<ExamId>,
    pub status: FunnelStatus,
}

impl Identity {
    pub fn is_reviewer(&self) -> bool {
        self.role == Role::Reviewer
    }

    pub fn is_linked_to(&self, exam_id: &ExamId) -> bool {
        self.linked_exam_id.as_ref() == Some(exam_id)
    }
}

/// Answer payload for one question.
///
/// On the wire this is either a bare string or an object carrying the selected
/// `value` plus an optional `detail` (free-form choice) or `explanation`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Text(String),
    Choice(ChoiceAnswer),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChoiceAnswer {
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl AnswerValue {
    pub fn text(value: impl Into<String>) -> Self {
        AnswerValue::Text(value.into())
    }

    pub fn with_detail(value: impl Into<String>, detail: impl Into<String>) -> Self {
        AnswerValue::Choice(ChoiceAnswer {
            value: value.into(),
            detail: Some(detail.into()),
            explanation: None,
        })
    }

    pub fn with_explanation(value: impl Into<String>, explanation: impl Into<String>) -> Self {
        AnswerValue::Choice(ChoiceAnswer {
            value: value.into(),
            detail: None,
            explanation: Some(explanation.into()),
        })
    }

    /// Selected option, or the whole text for a bare string.
    pub fn value(&self) -> &str {
        match self {
            AnswerValue::Text(text) => text,
            AnswerValue::Choice(choice) => &choice.value,
        }
    }

    pub fn detail(&self) -> Option<&str> {
        match self {
            AnswerValue::Choice(choice) => choice.detail.as_deref(),
            AnswerValue::Text(_) => None,
        }
    }

    pub fn explanation(&self) -> Option<&str> {
        match self {
            AnswerValue::Choice(choice) => choice.explanation.as_deref(),
            AnswerValue::Text(_) => None,
        }
    }
}

pub type AnswerSet = BTreeMap<QuestionId, AnswerValue>;

/// One applicant's single recorded submission for one exam.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attempt {
    pub id: AttemptId,
    pub identity_id: IdentityId,
    pub exam_id: ExamId,
    pub answers: AnswerSet,
    pub submitted_at: DateTime<Utc>,
    #[serde(default)]
    pub score: Option<f32>,
}

/// Attempt payload handed to the repository before an id is assigned.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAttempt {
    pub identity_id: IdentityId,
    pub exam_id: ExamId,
    pub answers: AnswerSet,
    pub submitted_at: DateTime<Utc>,
}
