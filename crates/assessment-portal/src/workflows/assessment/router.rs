use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use super::definitions::{ExamDraft, ExamPatch};
use super::domain::{AttemptId, ExamId, FunnelStatus, Identity, IdentityId};
use super::error::{AssessmentError, ValidationError};
use super::repository::{AssessmentRepository, Notifier, RepositoryError};
use super::service::{AssessmentService, Registration};
use super::submission::SubmitRequest;

/// Header carrying the already-authenticated session identity.
pub const IDENTITY_HEADER: &str = "x-identity-id";

type SharedService<R, N> = Arc<AssessmentService<R, N>>;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StatusUpdate {
    pub(crate) status: FunnelStatus,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ScoreUpdate {
    pub(crate) score: f32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ExamLink {
    pub(crate) exam_id: ExamId,
}

/// Router builder exposing the assessment endpoints.
pub fn assessment_router<R, N>(service: SharedService<R, N>) -> Router
where
    R: AssessmentRepository + 'static,
    N: Notifier + 'static,
{
    Router::new()
        .route("/api/v1/exams", post(create_exam_handler::<R, N>))
        .route(
            "/api/v1/exams/:exam_id",
            get(fetch_exam_handler::<R, N>).patch(update_exam_handler::<R, N>),
        )
        .route(
            "/api/v1/exams/:exam_id/definition",
            get(definition_handler::<R, N>),
        )
        .route(
            "/api/v1/exams/:exam_id/attempts",
            get(attempts_handler::<R, N>),
        )
        .route("/api/v1/attempts", post(submit_handler::<R, N>))
        .route(
            "/api/v1/attempts/:attempt_id/score",
            put(score_handler::<R, N>),
        )
        .route("/api/v1/identities", post(register_handler::<R, N>))
        .route(
            "/api/v1/identities/:identity_id/linked-exam",
            put(link_exam_handler::<R, N>),
        )
        .route(
            "/api/v1/identities/:identity_id/status",
            put(status_handler::<R, N>),
        )
        .with_state(service)
}

fn session_identity<R, N>(
    service: &AssessmentService<R, N>,
    headers: &HeaderMap,
) -> Result<Identity, AssessmentError>
where
    R: AssessmentRepository + 'static,
    N: Notifier + 'static,
{
    let identity_id = headers
        .get(IDENTITY_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or(AssessmentError::Unauthorized)?;
    service.identity(&IdentityId(identity_id.to_string()))
}

pub(crate) fn error_response(error: AssessmentError) -> Response {
    let (status, payload) = match &error {
        AssessmentError::Validation(validation) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            validation_payload(validation),
        ),
        AssessmentError::AccessDenied => (
            StatusCode::FORBIDDEN,
            json!({ "error": "access_denied", "message": error.to_string() }),
        ),
        AssessmentError::Unauthorized => (
            StatusCode::UNAUTHORIZED,
            json!({ "error": "unauthorized", "message": error.to_string() }),
        ),
        AssessmentError::AlreadySubmitted => (
            StatusCode::CONFLICT,
            json!({ "error": "already_submitted", "message": error.to_string() }),
        ),
        AssessmentError::NotFound(_) => (
            StatusCode::NOT_FOUND,
            json!({ "error": "not_found", "message": error.to_string() }),
        ),
        AssessmentError::Repository(RepositoryError::Conflict) => (
            StatusCode::CONFLICT,
            json!({ "error": "conflict", "message": error.to_string() }),
        ),
        AssessmentError::Repository(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({ "error": "internal", "message": error.to_string() }),
        ),
    };
    (status, axum::Json(payload)).into_response()
}

fn validation_payload(error: &ValidationError) -> serde_json::Value {
    let mut payload = json!({
        "error": "validation",
        "message": error.to_string(),
    });

    if let Some(question_id) = error.question_id() {
        payload["questionId"] = json!(question_id);
    }
    match error {
        ValidationError::WordLimitExceeded { limit, actual, .. } => {
            payload["wordLimit"] = json!(limit);
            payload["wordCount"] = json!(actual);
        }
        ValidationError::Definition { issues } => {
            payload["issues"] = issues
                .iter()
                .map(|issue| {
                    json!({
                        "questionIndex": issue.question_index,
                        "reason": issue.reason,
                    })
                })
                .collect();
        }
        _ => {}
    }
    payload
}

fn respond<T: serde::Serialize>(
    status: StatusCode,
    result: Result<T, AssessmentError>,
) -> Response {
    match result {
        Ok(body) => (status, axum::Json(body)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn fetch_exam_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    headers: HeaderMap,
    Path(exam_id): Path<String>,
) -> Response
where
    R: AssessmentRepository + 'static,
    N: Notifier + 'static,
{
    let now = Utc::now();
    let result = session_identity(&service, &headers).and_then(|identity| {
        service
            .fetch_exam(&identity, &ExamId(exam_id), now)
            .map(|decision| decision.into_view())
    });
    respond(StatusCode::OK, result)
}

/// Body rejections carry the JSON path of the offending field, such as
/// `answers.q1` for an answer object with an unexpected key.
fn malformed_body(rejection: JsonRejection) -> Response {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        axum::Json(json!({
            "error": "malformed_request",
            "message": rejection.body_text(),
        })),
    )
        .into_response()
}

pub(crate) async fn submit_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    headers: HeaderMap,
    payload: Result<axum::Json<SubmitRequest>, JsonRejection>,
) -> Response
where
    R: AssessmentRepository + 'static,
    N: Notifier + 'static,
{
    let axum::Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return malformed_body(rejection),
    };
    let now = Utc::now();
    let result = session_identity(&service, &headers)
        .and_then(|identity| service.submit(&identity.id, request, now));
    respond(StatusCode::CREATED, result)
}

pub(crate) async fn create_exam_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    headers: HeaderMap,
    axum::Json(draft): axum::Json<ExamDraft>,
) -> Response
where
    R: AssessmentRepository + 'static,
    N: Notifier + 'static,
{
    let result = session_identity(&service, &headers)
        .and_then(|reviewer| service.create_exam(&reviewer, draft));
    respond(StatusCode::CREATED, result)
}

pub(crate) async fn update_exam_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    headers: HeaderMap,
    Path(exam_id): Path<String>,
    axum::Json(patch): axum::Json<ExamPatch>,
) -> Response
where
    R: AssessmentRepository + 'static,
    N: Notifier + 'static,
{
    let result = session_identity(&service, &headers)
        .and_then(|reviewer| service.update_exam(&reviewer, &ExamId(exam_id), patch));
    respond(StatusCode::OK, result)
}

pub(crate) async fn definition_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    headers: HeaderMap,
    Path(exam_id): Path<String>,
) -> Response
where
    R: AssessmentRepository + 'static,
    N: Notifier + 'static,
{
    let now = Utc::now();
    let result = session_identity(&service, &headers)
        .and_then(|reviewer| service.exam_definition(&reviewer, &ExamId(exam_id), now));
    respond(StatusCode::OK, result)
}

pub(crate) async fn attempts_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    headers: HeaderMap,
    Path(exam_id): Path<String>,
) -> Response
where
    R: AssessmentRepository + 'static,
    N: Notifier + 'static,
{
    let result = session_identity(&service, &headers)
        .and_then(|reviewer| service.attempts_for_exam(&reviewer, &ExamId(exam_id)));
    respond(StatusCode::OK, result)
}

pub(crate) async fn score_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    headers: HeaderMap,
    Path(attempt_id): Path<String>,
    axum::Json(update): axum::Json<ScoreUpdate>,
) -> Response
where
    R: AssessmentRepository + 'static,
    N: Notifier + 'static,
{
    let result = session_identity(&service, &headers).and_then(|reviewer| {
        service.set_score(&reviewer, &AttemptId(attempt_id), update.score)
    });
    respond(StatusCode::OK, result)
}

pub(crate) async fn register_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    axum::Json(registration): axum::Json<Registration>,
) -> Response
where
    R: AssessmentRepository + 'static,
    N: Notifier + 'static,
{
    respond(StatusCode::CREATED, service.register(registration))
}

pub(crate) async fn link_exam_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    Path(identity_id): Path<String>,
    axum::Json(link): axum::Json<ExamLink>,
) -> Response
where
    R: AssessmentRepository + 'static,
    N: Notifier + 'static,
{
    let result = service.link_exam(&IdentityId(identity_id), &link.exam_id);
    respond(StatusCode::OK, result)
}

pub(crate) async fn status_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    headers: HeaderMap,
    Path(identity_id): Path<String>,
    axum::Json(update): axum::Json<StatusUpdate>,
) -> Response
where
    R: AssessmentRepository + 'static,
    N: Notifier + 'static,
{
    let result = session_identity(&service, &headers).and_then(|reviewer| {
        service.set_status(&reviewer, &IdentityId(identity_id), update.status)
    });
    respond(StatusCode::OK, result)
}
