//! facegate-node library - access-control node
//!
//! Rooms log in with their login token, then ask for access decisions by
//! face image or descriptor, record visits and work through their task
//! lists. Admins can compute anonymous descriptors.

use axum::{extract::DefaultBodyLimit, Router};
use chrono::Duration;
use facegate_common::time::Clock;
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod db;
pub mod error;
pub mod models;
pub mod recognition;
pub mod services;

use db::{AccessControlRepository, AuthorizationRepository, TasksRepository};
use recognition::{RecognitionEngine, RecognitionPool};
use services::{AccessControlService, AuthorizationService, ServiceRegistry, TasksService};

/// Application state shared across HTTP handlers
///
/// Built once at start-up. Services are reachable directly by field; the
/// registry holds the same instances for lifecycle hooks.
#[derive(Clone)]
pub struct AppState {
    pub authorization: Arc<AuthorizationService>,
    pub access_control: Arc<AccessControlService>,
    pub tasks: Arc<TasksService>,
    pub registry: ServiceRegistry,
}

impl AppState {
    /// Wire every service over the shared database session
    pub fn new(
        db: SqlitePool,
        engine: Arc<dyn RecognitionEngine>,
        pool: Arc<RecognitionPool>,
        clock: Arc<dyn Clock>,
        room_token_lifetime: Duration,
    ) -> Self {
        let authorization = Arc::new(AuthorizationService::new(
            AuthorizationRepository::new(db.clone()),
            clock,
            room_token_lifetime,
        ));
        let access_control = Arc::new(AccessControlService::new(
            AccessControlRepository::new(db.clone()),
            engine,
            pool,
        ));
        let tasks = Arc::new(TasksService::new(TasksRepository::new(db)));

        let mut registry = ServiceRegistry::new();
        registry.register(authorization.clone());
        registry.register(access_control.clone());
        registry.register(tasks.clone());

        Self {
            authorization,
            access_control,
            tasks,
            registry,
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};

    Router::new()
        .route("/access/check/face", post(api::check_access_by_face))
        .route("/access/check/descriptor", post(api::check_access_by_descriptor))
        .route("/access/visit/new", post(api::record_visit))
        .route("/access/descriptor/calculate", post(api::calculate_descriptor))
        .route("/tasks/undone", get(api::get_undone_tasks))
        .route("/tasks/report", post(api::report_task_performed))
        .route("/authorization/room/login", post(api::room_login))
        .merge(api::health_routes())
        .layer(DefaultBodyLimit::max(api::requirements::MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
