use super::domain::{AnswerSet, AnswerValue, ExamDefinition, QuestionKind, QuestionSpec};
use super::error::ValidationError;

/// Whitespace-delimited, non-empty tokens.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Check an answer set against the exam's current question list.
///
/// Questions are visited in exam order so the reported failure is stable.
/// Unanswered questions are accepted.
pub fn validate_answers(
    definition: &ExamDefinition,
    answers: &AnswerSet,
) -> Result<(), ValidationError> {
    if let Some(question_id) = answers
        .keys()
        .find(|question_id| definition.question(question_id).is_none())
    {
        return Err(ValidationError::UnknownQuestion {
            question_id: question_id.clone(),
        });
    }

    for question in &definition.questions {
        if let Some(answer) = answers.get(&question.id) {
            validate_answer(question, answer)?;
        }
    }

    Ok(())
}

fn validate_answer(question: &QuestionSpec, answer: &AnswerValue) -> Result<(), ValidationError> {
    if let Some(options) = question.kind.options() {
        let selected = answer.value().trim();
        if selected.is_empty() {
            return Err(ValidationError::MissingSelection {
                question_id: question.id.clone(),
            });
        }
        if !options.iter().any(|option| option == selected) {
            return Err(ValidationError::UnknownOption {
                question_id: question.id.clone(),
                value: selected.to_string(),
            });
        }
    }

    if let Some(trigger) = question.kind.explanation_trigger() {
        let explained = answer
            .explanation()
            .is_some_and(|explanation| !explanation.trim().is_empty());
        if answer.value().trim() == trigger && !explained {
            return Err(ValidationError::ExplanationRequired {
                question_id: question.id.clone(),
            });
        }
    }

    if let (Some(limit), Some(text)) = (question.word_budget(), free_text(&question.kind, answer)) {
        let actual = word_count(text);
        if actual > limit {
            return Err(ValidationError::WordLimitExceeded {
                question_id: question.id.clone(),
                limit,
                actual,
            });
        }
    }

    Ok(())
}

/// The field the word budget applies to for this kind of question.
fn free_text<'a>(kind: &QuestionKind, answer: &'a AnswerValue) -> Option<&'a str> {
    match kind {
        QuestionKind::FreeformText => Some(answer.value()),
        QuestionKind::SingleChoiceWithFreeform { .. } => answer.detail(),
        QuestionKind::SingleChoice { .. } => answer.explanation(),
    }
}
