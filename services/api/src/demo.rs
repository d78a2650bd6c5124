use crate::infra::{parse_timestamp, LoggingNotifier};
use assessment_portal::config::NotificationConfig;
use assessment_portal::error::AppError;
use assessment_portal::workflows::assessment::{
    AnswerSet, AnswerValue, AssessmentError, AssessmentService, ExamDraft, ExamId, ExamView,
    FunnelStatus, Identity, InMemoryAssessmentStore, QuestionId, QuestionKind, QuestionSpec,
    Registration, Role, SubmitRequest,
};
use chrono::{DateTime, Duration, Utc};
use clap::Args;
use std::sync::Arc;

type DemoService = AssessmentService<InMemoryAssessmentStore, LoggingNotifier>;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Window opening (RFC 3339). Defaults to 2026-01-20T05:00:00Z.
    #[arg(long, value_parser = crate::infra::parse_timestamp)]
    pub(crate) window_start: Option<DateTime<Utc>>,
    /// Window closing (RFC 3339). Defaults to 2026-01-20T10:30:00Z.
    #[arg(long, value_parser = crate::infra::parse_timestamp)]
    pub(crate) window_end: Option<DateTime<Utc>>,
    /// Word limit for the explanation answer (0 = unlimited).
    #[arg(long, default_value_t = 100)]
    pub(crate) word_limit: i64,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let window_start = match args.window_start {
        Some(start) => start,
        None => default_timestamp("2026-01-20T05:00:00Z")?,
    };
    let window_end = match args.window_end {
        Some(end) => end,
        None => default_timestamp("2026-01-20T10:30:00Z")?,
    };

    let notifier = Arc::new(
        LoggingNotifier::from_config(&NotificationConfig {
            sender: "recruiting@localhost".to_string(),
            enabled: true,
        })
        .recording(),
    );
    let service = AssessmentService::new(
        Arc::new(InMemoryAssessmentStore::default()),
        notifier.clone(),
    );

    println!("Assessment portal demo");
    let reviewer = service.register(Registration {
        email: "reviewer@example.com".to_string(),
        role: Role::Reviewer,
        linked_exam_id: None,
    })?;
    let exam = service.create_exam(
        &reviewer,
        ExamDraft {
            title: "Weekend availability screening".to_string(),
            window_start: Some(window_start),
            window_end: Some(window_end),
            questions: vec![QuestionSpec {
                id: QuestionId("q1".to_string()),
                text: "Are you available on weekends?".to_string(),
                kind: QuestionKind::SingleChoice {
                    options: vec!["Yes".to_string(), "No".to_string()],
                    requires_explanation: true,
                    explanation_label: Some("Which weekends work for you?".to_string()),
                    explanation_trigger: None,
                },
                word_limit: args.word_limit,
            }],
        },
    )?;
    println!(
        "- Exam {} open {} -> {}",
        exam.id,
        window_start.to_rfc3339(),
        window_end.to_rfc3339()
    );

    let applicant = service.register(Registration {
        email: "applicant@example.com".to_string(),
        role: Role::Applicant,
        linked_exam_id: Some(exam.id.clone()),
    })?;
    println!("- Applicant {} registered ({})", applicant.id, applicant.status);

    fetch_step(&service, &applicant, &exam.id, window_start - Duration::hours(1))?;
    let during = window_start + Duration::hours(1);
    fetch_step(&service, &applicant, &exam.id, during)?;

    let overflow = usize::try_from(args.word_limit).unwrap_or(0) + 20;
    submit_step(&service, &applicant, &exam.id, overflow, during);
    let within = usize::try_from(args.word_limit)
        .ok()
        .filter(|limit| *limit > 0)
        .map_or(90, |limit| limit.saturating_sub(10).max(1));
    submit_step(&service, &applicant, &exam.id, within, during);

    let status = service.identity(&applicant.id)?.status;
    println!("- Applicant status after submission: {status}");

    fetch_step(&service, &applicant, &exam.id, window_end + Duration::minutes(30))?;
    submit_step(&service, &applicant, &exam.id, 5, window_end);

    let updated = service.set_status(&reviewer, &applicant.id, FunnelStatus::Interview)?;
    println!("- Reviewer moved applicant to {}", updated.status);
    for message in notifier.outbox() {
        println!(
            "  Notification {} -> {}: {}",
            message.from, message.to, message.subject
        );
    }

    Ok(())
}

fn default_timestamp(raw: &str) -> Result<DateTime<Utc>, AppError> {
    parse_timestamp(raw).map_err(|err| {
        AppError::Io(std::io::Error::new(std::io::ErrorKind::InvalidInput, err))
    })
}

fn fetch_step(
    service: &DemoService,
    applicant: &Identity,
    exam_id: &ExamId,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    let view = service.fetch_exam(applicant, exam_id, now)?.into_view();
    println!("- Fetch at {}: {}", now.to_rfc3339(), describe(&view));
    Ok(())
}

fn describe(view: &ExamView) -> String {
    let expired = if view.expired == Some(true) {
        ", expired"
    } else {
        ""
    };
    format!(
        "{} question(s), completed={}{}",
        view.questions.len(),
        view.completed,
        expired
    )
}

fn submit_step(
    service: &DemoService,
    applicant: &Identity,
    exam_id: &ExamId,
    explanation_words: usize,
    now: DateTime<Utc>,
) {
    let explanation = vec!["weekend"; explanation_words].join(" ");
    let mut answers = AnswerSet::new();
    answers.insert(
        QuestionId("q1".to_string()),
        AnswerValue::with_explanation("Yes", explanation),
    );

    let request = SubmitRequest {
        exam_id: exam_id.clone(),
        answers,
    };
    match service.submit(&applicant.id, request, now) {
        Ok(receipt) => println!(
            "- Submit ({explanation_words} words): accepted as attempt {}",
            receipt.attempt_id
        ),
        Err(AssessmentError::AlreadySubmitted) => {
            println!("- Submit ({explanation_words} words): already submitted")
        }
        Err(err) => println!("- Submit ({explanation_words} words): rejected, {err}"),
    }
}
