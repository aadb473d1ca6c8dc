//! Requirement pipeline ordering and short-circuit behaviour

mod helpers;

use async_trait::async_trait;
use axum::http::StatusCode;
use facegate_node::api::requirements::{
    Inbound, PayloadSchema, Pipeline, Prepare, Prepared, Requirement,
};
use facegate_node::error::{ApiError, ApiResult};
use facegate_node::AppState;
use helpers::*;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Requirement that only counts how often it was prepared
struct Counting {
    hits: Arc<AtomicUsize>,
}

#[async_trait]
impl Prepare for Counting {
    fn name(&self) -> Option<&'static str> {
        None
    }

    fn kind(&self) -> &'static str {
        "counting"
    }

    async fn prepare(&self, _state: &AppState, _inbound: &mut Inbound) -> ApiResult<Prepared> {
        self.hits.fetch_add(1, Ordering::SeqCst);
        Ok(Prepared::Unit)
    }
}

fn rejection_status(result: ApiResult<impl std::fmt::Debug>) -> StatusCode {
    match result {
        Err(ApiError::Rejected(rejection)) => rejection.status,
        other => panic!("expected rejection, got {:?}", other),
    }
}

#[tokio::test]
async fn test_failed_requirement_skips_the_rest() {
    let app = setup().await;
    let hits = Arc::new(AtomicUsize::new(0));

    let pipeline = Pipeline::new()
        .require(Requirement::room_token("room_id"))
        .require(Counting { hits: hits.clone() });

    let result = pipeline
        .run(&app.state, get_request("/tasks/undone", None))
        .await;

    assert_eq!(rejection_status(result), StatusCode::BAD_REQUEST);
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_requirements_run_in_declared_order() {
    let app = setup().await;
    let hits = Arc::new(AtomicUsize::new(0));

    let pipeline = Pipeline::new()
        .require(Counting { hits: hits.clone() })
        .require(Requirement::room_token("room_id"))
        .require(Counting { hits: hits.clone() });

    let result = pipeline
        .run(&app.state, get_request("/tasks/undone", Some(("Room-Token", "forged"))))
        .await;

    assert_eq!(rejection_status(result), StatusCode::UNAUTHORIZED);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_all_satisfied_values_are_named() {
    let app = setup().await;
    let token = app.login("L7").await;
    let hits = Arc::new(AtomicUsize::new(0));

    let pipeline = Pipeline::new()
        .require(Requirement::room_token("room_id"))
        .require(Counting { hits: hits.clone() })
        .require(Requirement::json("payload", PayloadSchema::TaskReport));

    let request = json_request(
        "/tasks/report",
        Some(("Room-Token", token.as_str())),
        &json!({"task_id": 5, "new_status": "DONE"}),
    );
    let mut args = pipeline.run(&app.state, request).await.unwrap();

    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert_eq!(args.request().uri.path(), "/tasks/report");
    assert_eq!(args.room_id("room_id").unwrap(), 7);
    assert_eq!(args.task_report("payload").unwrap().task_id, 5);
    assert!(!args.contains("room_id"));
}

#[tokio::test]
async fn test_admin_token_injects_admin_id() {
    let app = setup().await;

    let mut args = Pipeline::new()
        .require(Requirement::admin_token("admin_id"))
        .run(&app.state, get_request("/x", Some(("Admin-Token", "A3"))))
        .await
        .unwrap();

    assert!(args.contains("admin_id"));
    assert_eq!(args.admin_id("admin_id").unwrap(), 3);

    let result = Pipeline::new()
        .require(Requirement::admin_token("admin_id"))
        .run(&app.state, get_request("/x", Some(("Admin-Token", "L7"))))
        .await;
    assert_eq!(rejection_status(result), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_body_shared_between_requirements() {
    let app = setup().await;

    let pipeline = Pipeline::new()
        .require(Requirement::json("first", PayloadSchema::FaceDescriptor))
        .require(Requirement::json("second", PayloadSchema::FaceDescriptor));

    let request = json_request("/x", None, &json!({"features": [1.0, 2.0]}));
    let mut args = pipeline.run(&app.state, request).await.unwrap();

    assert_eq!(args.face_descriptor("first").unwrap().features, vec![1.0, 2.0]);
    assert_eq!(args.face_descriptor("second").unwrap().features, vec![1.0, 2.0]);
}

#[tokio::test]
async fn test_taking_wrong_kind_is_internal_fault() {
    let app = setup().await;
    let token = app.login("L7").await;

    let mut args = Pipeline::new()
        .require(Requirement::room_token("room_id"))
        .run(&app.state, get_request("/tasks/undone", Some(("Room-Token", token.as_str()))))
        .await
        .unwrap();

    assert!(matches!(args.image("room_id"), Err(ApiError::Internal(_))));
    assert!(matches!(args.room_id("missing"), Err(ApiError::Internal(_))));
}
