//! Route handlers
//!
//! Handlers declare their requirements, take the prepared arguments and
//! hand them to a service. Whatever the service answers is returned as a
//! 200 outcome body; only rejections and faults produce other statuses.

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    response::Response,
};

use super::requirements::{PayloadSchema, Pipeline, Requirement, LOGIN_TOKEN_HEADER, LOGIN_TOKEN_REQUIRED};
use crate::error::{outcome_response, ApiResult, Rejection};
use crate::AppState;
use tracing::debug;

/// POST /access/check/face
pub async fn check_access_by_face(
    State(state): State<AppState>,
    request: Request,
) -> ApiResult<Response> {
    let mut args = Pipeline::new()
        .require(Requirement::room_token("room_id"))
        .require(Requirement::image("image"))
        .run(&state, request)
        .await?;

    let room_id = args.room_id("room_id")?;
    let image = args.image("image")?;

    let outcome = state.access_control.check_access_by_face(room_id, image).await?;
    outcome_response(&outcome)
}

/// POST /access/check/descriptor
pub async fn check_access_by_descriptor(
    State(state): State<AppState>,
    request: Request,
) -> ApiResult<Response> {
    let mut args = Pipeline::new()
        .require(Requirement::room_token("room_id"))
        .require(Requirement::json("payload", PayloadSchema::FaceDescriptor))
        .run(&state, request)
        .await?;

    let room_id = args.room_id("room_id")?;
    let payload = args.face_descriptor("payload")?;

    let outcome = state
        .access_control
        .check_access_by_descriptor(room_id, &payload.features)
        .await?;
    outcome_response(&outcome)
}

/// POST /access/visit/new
pub async fn record_visit(State(state): State<AppState>, request: Request) -> ApiResult<Response> {
    let mut args = Pipeline::new()
        .require(Requirement::room_token("room_id"))
        .require(Requirement::json("payload", PayloadSchema::VisitInfo))
        .run(&state, request)
        .await?;

    let room_id = args.room_id("room_id")?;
    let visit = args.visit_info("payload")?;

    let outcome = state
        .access_control
        .record_visit(room_id, visit.user_id, visit.datetime)
        .await?;
    outcome_response(&outcome)
}

/// POST /access/descriptor/calculate
pub async fn calculate_descriptor(
    State(state): State<AppState>,
    request: Request,
) -> ApiResult<Response> {
    let mut args = Pipeline::new()
        .require(Requirement::admin_token("admin_id"))
        .require(Requirement::image("image"))
        .run(&state, request)
        .await?;

    let admin_id = args.admin_id("admin_id")?;
    let image = args.image("image")?;
    debug!("Admin {} requested a descriptor calculation", admin_id);

    let outcome = state.access_control.calculate_descriptor(image).await?;
    outcome_response(&outcome)
}

/// GET /tasks/undone
pub async fn get_undone_tasks(
    State(state): State<AppState>,
    request: Request,
) -> ApiResult<Response> {
    let mut args = Pipeline::new()
        .require(Requirement::room_token("room_id"))
        .run(&state, request)
        .await?;

    let room_id = args.room_id("room_id")?;

    let outcome = state.tasks.get_undone_tasks(room_id).await?;
    outcome_response(&outcome)
}

/// POST /tasks/report
pub async fn report_task_performed(
    State(state): State<AppState>,
    request: Request,
) -> ApiResult<Response> {
    let mut args = Pipeline::new()
        .require(Requirement::room_token("room_id"))
        .require(Requirement::json("payload", PayloadSchema::TaskReport))
        .run(&state, request)
        .await?;

    let room_id = args.room_id("room_id")?;
    let report = args.task_report("payload")?;

    let outcome = state
        .tasks
        .report_task_performed(room_id, report.task_id, &report.new_status)
        .await?;
    outcome_response(&outcome)
}

/// POST /authorization/room/login
///
/// Not token-guarded: the login token itself is what gets checked.
pub async fn room_login(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Response> {
    let token = headers
        .get(LOGIN_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| Rejection::bad_request(LOGIN_TOKEN_REQUIRED))?;

    let outcome = state.authorization.log_in_room(token).await?;
    outcome_response(&outcome)
}
