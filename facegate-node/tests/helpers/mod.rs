//! Shared fixtures for facegate-node integration tests
//!
//! Every test gets its own in-memory database seeded with:
//! - rooms 7 (Lab) and 8 (Hall), login tokens `L7` and `L8`
//! - admin 3 with token `A3`, manager 1
//! - user 42 (Ada Lovelace) owning descriptor 1 = unit vector on axis 0
//! - descriptor 2 = unit vector on axis 1, bound to nobody

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use chrono::{Duration, TimeZone, Utc};
use facegate_common::db::init_in_memory_database;
use facegate_common::time::ManualClock;
use facegate_node::recognition::{BaselineEngine, RecognitionPool};
use facegate_node::{build_router, AppState};
use image::{DynamicImage, ImageBuffer, ImageOutputFormat, Rgb, RgbImage};
use serde_json::Value;
use sqlx::SqlitePool;
use std::io::Cursor;
use std::sync::Arc;
use tower::util::ServiceExt;

pub const DESCRIPTOR_LEN: usize = 128;
pub const TOKEN_LIFETIME_SECS: i64 = 3600;
pub const BOUNDARY: &str = "facegate-test-boundary";

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub db: SqlitePool,
    pub clock: ManualClock,
    pub pool: Arc<RecognitionPool>,
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> axum::response::Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Log room in with its login token and return the temp token
    pub async fn login(&self, login_token: &str) -> String {
        let response = self
            .send(
                Request::builder()
                    .method("POST")
                    .uri("/authorization/room/login")
                    .header("Login-Token", login_token)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = read_json(response).await;
        assert_eq!(body["success"], true, "login failed: {}", body);
        body["result"]["temp_token"].as_str().unwrap().to_string()
    }

    pub async fn execute(&self, statement: &str) {
        sqlx::query(statement).execute(&self.db).await.unwrap();
    }

    pub async fn count(&self, table: &str) -> i64 {
        let (count,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(&self.db)
            .await
            .unwrap();
        count
    }
}

pub async fn setup() -> TestApp {
    let db = init_in_memory_database().await.unwrap();

    let unit_0 = serde_json::to_string(&unit_descriptor(0)).unwrap();
    let unit_1 = serde_json::to_string(&unit_descriptor(1)).unwrap();
    let seed = [
        "INSERT INTO rooms (id, name) VALUES (7, 'Lab'), (8, 'Hall')".to_string(),
        "INSERT INTO room_login_tokens (token, room_id) VALUES ('L7', 7), ('L8', 8)".to_string(),
        "INSERT INTO admins (id, name) VALUES (3, 'Root')".to_string(),
        "INSERT INTO admin_tokens (token, admin_id) VALUES ('A3', 3)".to_string(),
        "INSERT INTO managers (id, name) VALUES (1, 'Grace')".to_string(),
        "INSERT INTO users (id, name, surname, extra_info) VALUES (42, 'Ada', 'Lovelace', 'Analyst')"
            .to_string(),
        format!(
            "INSERT INTO user_face_descriptors (id, user_id, features) VALUES (1, 42, '{}')",
            unit_0
        ),
        format!(
            "INSERT INTO user_face_descriptors (id, user_id, features) VALUES (2, NULL, '{}')",
            unit_1
        ),
    ];
    for statement in &seed {
        sqlx::query(statement).execute(&db).await.unwrap();
    }

    let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap());
    let pool = Arc::new(RecognitionPool::new(1, 4));
    let state = AppState::new(
        db.clone(),
        Arc::new(BaselineEngine::new(DESCRIPTOR_LEN, 0.6)),
        pool.clone(),
        Arc::new(clock.clone()),
        Duration::seconds(TOKEN_LIFETIME_SECS),
    );
    state.registry.init_all().await.unwrap();

    TestApp {
        router: build_router(state.clone()),
        state,
        db,
        clock,
        pool,
    }
}

/// Unit vector along `axis`
pub fn unit_descriptor(axis: usize) -> Vec<f32> {
    let mut features = vec![0.0; DESCRIPTOR_LEN];
    features[axis] = 1.0;
    features
}

pub fn json_request(uri: &str, token: Option<(&str, &str)>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some((name, value)) = token {
        builder = builder.header(name, value);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn get_request(uri: &str, token: Option<(&str, &str)>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some((name, value)) = token {
        builder = builder.header(name, value);
    }
    builder.body(Body::empty()).unwrap()
}

/// Multipart request carrying one field; `filename: None` sends a plain
/// form value instead of a file
pub fn multipart_request(
    uri: &str,
    token: Option<(&str, &str)>,
    field: &str,
    filename: Option<&str>,
    content: &[u8],
) -> Request<Body> {
    let disposition = match filename {
        Some(filename) => format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n",
            field, filename
        ),
        None => format!("Content-Disposition: form-data; name=\"{}\"\r\n", field),
    };

    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n{}\r\n", BOUNDARY, disposition).as_bytes());
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

    let mut builder = Request::builder().method("POST").uri(uri).header(
        header::CONTENT_TYPE,
        format!("multipart/form-data; boundary={}", BOUNDARY),
    );
    if let Some((name, value)) = token {
        builder = builder.header(name, value);
    }
    builder.body(Body::from(body)).unwrap()
}

/// Deterministic textured picture, different for each `seed`
pub fn picture(width: u32, height: u32, seed: u32) -> DynamicImage {
    let img: RgbImage = ImageBuffer::from_fn(width, height, |x, y| {
        let v = ((x * 3 + y * seed + x * y / 7) % 253) as u8;
        Rgb([v, 255 - v, v / 2])
    });
    DynamicImage::ImageRgb8(img)
}

pub fn png_bytes(image: &DynamicImage) -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    image.write_to(&mut cursor, ImageOutputFormat::Png).unwrap();
    cursor.into_inner()
}

pub async fn read_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn read_text(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
