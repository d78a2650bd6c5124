use super::common::*;
use crate::workflows::assessment::domain::{
    AnswerSet, AnswerValue, FunnelStatus, QuestionId, QuestionKind, QuestionSpec,
};
use crate::workflows::assessment::error::{AssessmentError, ValidationError};
use crate::workflows::assessment::repository::AssessmentRepository;
use crate::workflows::assessment::submission::SubmitRequest;
use std::sync::{Arc, Barrier};
use std::thread;

fn answers(entries: Vec<(&str, AnswerValue)>) -> AnswerSet {
    entries
        .into_iter()
        .map(|(id, value)| (QuestionId(id.to_string()), value))
        .collect()
}

fn submit(
    service: &MemoryService,
    fixture: &Fixture,
    entries: Vec<(&str, AnswerValue)>,
) -> Result<crate::workflows::assessment::SubmitReceipt, AssessmentError> {
    service.submit(
        &fixture.applicant.id,
        SubmitRequest {
            exam_id: fixture.exam.id.clone(),
            answers: answers(entries),
        },
        at(6, 0),
    )
}

#[test]
fn triggering_choice_without_explanation_is_rejected() {
    let (service, store, _) = build_service();
    let fixture = seed(&service, vec![explained_choice("q1", 100)]);

    for answer in [
        AnswerValue::text("Yes"),
        AnswerValue::with_explanation("Yes", "   "),
    ] {
        match submit(&service, &fixture, vec![("q1", answer)]) {
            Err(AssessmentError::Validation(ValidationError::ExplanationRequired { question_id })) => {
                assert_eq!(question_id.0, "q1")
            }
            other => panic!("expected explanation error, got {other:?}"),
        }
    }
    assert_eq!(store.attempt_count(), 0);
}

#[test]
fn non_triggering_choice_needs_no_explanation() {
    let (service, _, _) = build_service();
    let fixture = seed(&service, vec![explained_choice("q1", 100)]);

    let receipt = submit(&service, &fixture, vec![("q1", AnswerValue::text("No"))])
        .expect("submission accepted");
    assert!(receipt.success);
}

#[test]
fn configured_trigger_overrides_first_option() {
    let (service, _, _) = build_service();
    let question = QuestionSpec {
        kind: QuestionKind::SingleChoice {
            options: vec!["Yes".to_string(), "No".to_string()],
            requires_explanation: true,
            explanation_label: Some("Why not?".to_string()),
            explanation_trigger: Some("No".to_string()),
        },
        ..explained_choice("q1", 0)
    };
    let fixture = seed(&service, vec![question]);

    assert!(matches!(
        submit(&service, &fixture, vec![("q1", AnswerValue::text("No"))]),
        Err(AssessmentError::Validation(
            ValidationError::ExplanationRequired { .. }
        ))
    ));
    submit(&service, &fixture, vec![("q1", AnswerValue::text("Yes"))])
        .expect("first option no longer triggers");
}

#[test]
fn explanation_over_word_limit_reports_counts() {
    let (service, _, _) = build_service();
    let fixture = seed(&service, vec![explained_choice("q1", 100)]);

    match submit(
        &service,
        &fixture,
        vec![("q1", AnswerValue::with_explanation("Yes", words(120)))],
    ) {
        Err(AssessmentError::Validation(ValidationError::WordLimitExceeded {
            question_id,
            limit,
            actual,
        })) => {
            assert_eq!(question_id.0, "q1");
            assert_eq!(limit, 100);
            assert_eq!(actual, 120);
        }
        other => panic!("expected word limit error, got {other:?}"),
    }
}

#[test]
fn word_limit_applies_to_the_free_text_field_of_each_kind() {
    let (service, _, _) = build_service();
    let fixture = seed(&service, vec![freeform_choice("q1", 5), essay("q2", 3)]);

    assert!(matches!(
        submit(
            &service,
            &fixture,
            vec![("q1", AnswerValue::with_detail("Other", words(6)))]
        ),
        Err(AssessmentError::Validation(ValidationError::WordLimitExceeded { actual: 6, .. }))
    ));
    assert!(matches!(
        submit(&service, &fixture, vec![("q2", AnswerValue::text(words(4)))]),
        Err(AssessmentError::Validation(ValidationError::WordLimitExceeded { limit: 3, .. }))
    ));

    submit(
        &service,
        &fixture,
        vec![
            ("q1", AnswerValue::with_detail("Other", words(5))),
            ("q2", AnswerValue::text(format!("  {}  ", words(3)))),
        ],
    )
    .expect("answers at the limit are accepted");
}

#[test]
fn zero_word_limit_never_rejects() {
    let (service, _, _) = build_service();
    let fixture = seed(&service, vec![essay("q1", 0)]);

    submit(&service, &fixture, vec![("q1", AnswerValue::text(words(5_000)))])
        .expect("unlimited answer accepted");
}

#[test]
fn answers_must_reference_known_questions_and_options() {
    let (service, _, _) = build_service();
    let fixture = seed(&service, vec![explained_choice("q1", 0)]);

    assert!(matches!(
        submit(&service, &fixture, vec![("q9", AnswerValue::text("hello"))]),
        Err(AssessmentError::Validation(ValidationError::UnknownQuestion { .. }))
    ));
    assert!(matches!(
        submit(&service, &fixture, vec![("q1", AnswerValue::text("Maybe"))]),
        Err(AssessmentError::Validation(ValidationError::UnknownOption { .. }))
    ));
    assert!(matches!(
        submit(&service, &fixture, vec![("q1", AnswerValue::text(" "))]),
        Err(AssessmentError::Validation(ValidationError::MissingSelection { .. }))
    ));
}

#[test]
fn success_marks_applicant_completed_and_second_submit_is_rejected() {
    let (service, store, _) = build_service();
    let fixture = seed(&service, vec![essay("q1", 0)]);

    let receipt = submit(&service, &fixture, vec![("q1", AnswerValue::text("first"))])
        .expect("first submission accepted");
    let stored = store
        .find_attempt(&fixture.applicant.id, &fixture.exam.id)
        .expect("lookup succeeds")
        .expect("attempt stored");
    assert_eq!(stored.id, receipt.attempt_id);
    assert_eq!(stored.submitted_at, at(6, 0));
    assert_eq!(
        service.identity(&fixture.applicant.id).expect("identity").status,
        FunnelStatus::Completed
    );

    assert!(matches!(
        submit(&service, &fixture, vec![("q1", AnswerValue::text("second"))]),
        Err(AssessmentError::AlreadySubmitted)
    ));
    assert_eq!(store.attempt_count(), 1);
    assert_eq!(
        service.identity(&fixture.applicant.id).expect("identity").status,
        FunnelStatus::Completed
    );
}

#[test]
fn submission_does_not_regress_a_later_status() {
    let (service, _, _) = build_service();
    let fixture = seed(&service, vec![essay("q1", 0)]);
    service
        .set_status(&fixture.reviewer, &fixture.applicant.id, FunnelStatus::Interview)
        .expect("reviewer moves applicant");

    submit(&service, &fixture, vec![("q1", AnswerValue::text("late"))])
        .expect("submission accepted");

    assert_eq!(
        service.identity(&fixture.applicant.id).expect("identity").status,
        FunnelStatus::Interview
    );
}

#[test]
fn unlinked_applicants_cannot_submit() {
    let (service, _, _) = build_service();
    let fixture = seed(&service, vec![essay("q1", 0)]);

    let request = SubmitRequest {
        exam_id: fixture.exam.id.clone(),
        answers: answers(vec![("q1", AnswerValue::text("hi"))]),
    };

    let other_exam = SubmitRequest {
        exam_id: "another-exam".into(),
        ..request
    };
    assert!(matches!(
        service.submit(&fixture.applicant.id, other_exam, at(6, 0)),
        Err(AssessmentError::AccessDenied)
    ));
    assert!(matches!(
        service.submit(&"ghost".into(), SubmitRequest {
            exam_id: fixture.exam.id.clone(),
            answers: AnswerSet::new(),
        }, at(6, 0)),
        Err(AssessmentError::NotFound(_))
    ));
}

#[test]
fn reviewer_submits_once_without_a_link_then_sees_completion() {
    let (service, store, _) = build_service();
    let fixture = seed(&service, vec![essay("q1", 0)]);
    assert!(fixture.reviewer.linked_exam_id.is_none());

    let request = SubmitRequest {
        exam_id: fixture.exam.id.clone(),
        answers: answers(vec![("q1", AnswerValue::text("hi"))]),
    };
    let receipt = service
        .submit(&fixture.reviewer.id, request.clone(), at(6, 0))
        .expect("reviewer attempt accepted");
    assert!(receipt.success);
    assert!(matches!(
        service.submit(&fixture.reviewer.id, request, at(6, 5)),
        Err(AssessmentError::AlreadySubmitted)
    ));
    assert_eq!(store.attempt_count(), 1);

    let view = service
        .fetch_exam(&fixture.reviewer, &fixture.exam.id, at(12, 0))
        .expect("reviewer fetches")
        .into_view();
    assert!(view.completed);
    assert_eq!(view.expired, None);
}

#[test]
fn concurrent_submissions_record_exactly_one_attempt() {
    const CONTENDERS: usize = 16;

    let (service, store, _) = build_service();
    let fixture = seed(&service, vec![essay("q1", 0)]);
    let service = Arc::new(service);
    let barrier = Arc::new(Barrier::new(CONTENDERS));

    let handles: Vec<_> = (0..CONTENDERS)
        .map(|index| {
            let service = service.clone();
            let barrier = barrier.clone();
            let identity_id = fixture.applicant.id.clone();
            let exam_id = fixture.exam.id.clone();
            thread::spawn(move || {
                barrier.wait();
                service.submit(
                    &identity_id,
                    SubmitRequest {
                        exam_id,
                        answers: answers(vec![("q1", AnswerValue::text(format!("try {index}")))]),
                    },
                    at(6, 0),
                )
            })
        })
        .collect();

    let results: Vec<_> = handles
        .into_iter()
        .map(|handle| handle.join().expect("thread completes"))
        .collect();

    let accepted = results.iter().filter(|result| result.is_ok()).count();
    let duplicates = results
        .iter()
        .filter(|result| matches!(result, Err(AssessmentError::AlreadySubmitted)))
        .count();
    assert_eq!(accepted, 1);
    assert_eq!(duplicates, CONTENDERS - 1);
    assert_eq!(store.attempt_count(), 1);
}

#[test]
fn answer_objects_reject_unknown_keys() {
    let text: AnswerValue = serde_json::from_str(r#""plain answer""#).expect("text parses");
    assert_eq!(text, AnswerValue::text("plain answer"));

    let choice: AnswerValue =
        serde_json::from_str(r#"{"value":"Yes","explanation":"every other weekend"}"#)
            .expect("choice parses");
    assert_eq!(choice.explanation(), Some("every other weekend"));

    assert!(serde_json::from_str::<AnswerValue>(r#"{"value":"No","explanaton":"typo"}"#).is_err());
}
