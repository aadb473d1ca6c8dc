//! Request requirements
//!
//! A handler declares an ordered [`Pipeline`] of requirements. Each one
//! either yields a typed value, stored under its name in [`Arguments`], or
//! rejects the request with a 400/401. Requirements run strictly in
//! declaration order and the first rejection ends the request: later
//! requirements are never prepared.
//!
//! The body is read at most once, on the first requirement that needs it,
//! and shared by any later requirement that looks at it again.

use async_trait::async_trait;
use axum::{
    body::{Body, Bytes},
    extract::{FromRequest, Multipart, Request},
    http::{header, request::Parts},
};
use image::DynamicImage;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use tracing::debug;

use crate::error::{ApiError, ApiResult, Rejection};
use crate::models::{FaceDescriptorPayload, TaskPerformingReport, VisitInfo};
use crate::AppState;

/// Upper bound for buffered request bodies
pub const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

pub const ROOM_TOKEN_HEADER: &str = "Room-Token";
pub const ADMIN_TOKEN_HEADER: &str = "Admin-Token";
pub const LOGIN_TOKEN_HEADER: &str = "Login-Token";

const ROOM_TOKEN_REQUIRED: &str = "Room-Token header is required.";
const ROOM_TOKEN_UNKNOWN: &str = "Unknown Room-Token value.";
const ROOM_TOKEN_EXPIRED: &str = "Token is already invalid.";
const ADMIN_TOKEN_REQUIRED: &str = "Admin-Token header is required.";
const ADMIN_TOKEN_UNKNOWN: &str = "Unknown token.";
pub const LOGIN_TOKEN_REQUIRED: &str = "Login-Token header is required.";
const MULTIPART_REQUIRED: &str = "Send image as multipart/form-data in field named «image».";
const IMAGE_FIELD_REQUIRED: &str = "Required «image» multipart field.";
const IMAGE_FIELD_NOT_FILE: &str = "Field «image» doesn't contain an image file.";
const IMAGE_UNDECODABLE: &str = "Cannot identify image file. It's invalid.";
const JSON_REQUIRED: &str = "Required application/json Content-Type.";
const JSON_WRONG_SCHEMA: &str = "Json data has wrong schema or types.";
const BODY_UNREADABLE: &str = "Request body is too large or unreadable.";

/// Inbound request as seen by requirements
pub struct Inbound {
    parts: Parts,
    body: Option<Body>,
    buffered: Option<Bytes>,
}

impl Inbound {
    pub fn new(request: Request) -> Self {
        let (parts, body) = request.into_parts();
        Self {
            parts,
            body: Some(body),
            buffered: None,
        }
    }

    pub fn parts(&self) -> &Parts {
        &self.parts
    }

    /// Header value, `None` when missing or not visible ASCII
    pub fn header(&self, name: &str) -> Option<&str> {
        self.parts.headers.get(name)?.to_str().ok()
    }

    /// Lower-cased media type without parameters
    pub fn content_type(&self) -> Option<String> {
        let raw = self.header(header::CONTENT_TYPE.as_str())?;
        let essence = raw.split(';').next().unwrap_or_default();
        Some(essence.trim().to_ascii_lowercase())
    }

    /// Whole body, read on first use
    pub async fn body(&mut self) -> ApiResult<Bytes> {
        if let Some(bytes) = &self.buffered {
            return Ok(bytes.clone());
        }

        let body = self.body.take().unwrap_or_default();
        let bytes = axum::body::to_bytes(body, MAX_BODY_BYTES)
            .await
            .map_err(|_| Rejection::bad_request(BODY_UNREADABLE))?;
        self.buffered = Some(bytes.clone());
        Ok(bytes)
    }

    fn into_parts(self) -> Parts {
        self.parts
    }
}

/// Value produced by a satisfied requirement
#[derive(Debug)]
pub enum Prepared {
    RoomId(i64),
    AdminId(i64),
    Image(DynamicImage),
    Payload(Payload),
    /// Requirement with nothing to hand over
    Unit,
}

/// Parsed JSON body
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    FaceDescriptor(FaceDescriptorPayload),
    VisitInfo(VisitInfo),
    TaskReport(TaskPerformingReport),
}

/// Shape a JSON body must have
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadSchema {
    FaceDescriptor,
    VisitInfo,
    TaskReport,
}

impl PayloadSchema {
    pub fn parse(&self, raw: &[u8]) -> serde_json::Result<Payload> {
        Ok(match self {
            PayloadSchema::FaceDescriptor => Payload::FaceDescriptor(from_json(raw)?),
            PayloadSchema::VisitInfo => Payload::VisitInfo(from_json(raw)?),
            PayloadSchema::TaskReport => Payload::TaskReport(from_json(raw)?),
        })
    }
}

fn from_json<T: DeserializeOwned>(raw: &[u8]) -> serde_json::Result<T> {
    serde_json::from_slice(raw)
}

/// A precondition a request must meet before its handler runs
#[async_trait]
pub trait Prepare: Send + Sync {
    /// Argument name the prepared value is stored under, if any
    fn name(&self) -> Option<&'static str>;

    /// Short label for logs
    fn kind(&self) -> &'static str;

    /// Produce the value, or reject with `ApiError::Rejected`
    async fn prepare(&self, state: &AppState, inbound: &mut Inbound) -> ApiResult<Prepared>;
}

/// Built-in requirements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// Live room temp token in `Room-Token`, yields the room id
    RoomToken { name: &'static str },
    /// Known admin token in `Admin-Token`, yields the admin id
    AdminToken { name: &'static str },
    /// Decodable image in the `image` multipart field
    Image { name: &'static str },
    /// JSON body matching `schema`
    Json {
        name: &'static str,
        schema: PayloadSchema,
    },
}

impl Requirement {
    pub fn room_token(name: &'static str) -> Self {
        Requirement::RoomToken { name }
    }

    pub fn admin_token(name: &'static str) -> Self {
        Requirement::AdminToken { name }
    }

    pub fn image(name: &'static str) -> Self {
        Requirement::Image { name }
    }

    pub fn json(name: &'static str, schema: PayloadSchema) -> Self {
        Requirement::Json { name, schema }
    }
}

#[async_trait]
impl Prepare for Requirement {
    fn name(&self) -> Option<&'static str> {
        match self {
            Requirement::RoomToken { name } => Some(*name),
            Requirement::AdminToken { name } => Some(*name),
            Requirement::Image { name } => Some(*name),
            Requirement::Json { name, .. } => Some(*name),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Requirement::RoomToken { .. } => "room-token",
            Requirement::AdminToken { .. } => "admin-token",
            Requirement::Image { .. } => "image",
            Requirement::Json { .. } => "json",
        }
    }

    async fn prepare(&self, state: &AppState, inbound: &mut Inbound) -> ApiResult<Prepared> {
        match self {
            Requirement::RoomToken { .. } => {
                let token = inbound.header(ROOM_TOKEN_HEADER).map(str::to_string);
                prepare_room_token(state, token).await
            }
            Requirement::AdminToken { .. } => {
                let token = inbound.header(ADMIN_TOKEN_HEADER).map(str::to_string);
                prepare_admin_token(state, token).await
            }
            Requirement::Image { .. } => prepare_image(inbound).await,
            Requirement::Json { schema, .. } => prepare_json(*schema, inbound).await,
        }
    }
}

// Header values are copied out: the inbound body is not `Sync`
async fn prepare_room_token(state: &AppState, token: Option<String>) -> ApiResult<Prepared> {
    let token = token.ok_or_else(|| Rejection::bad_request(ROOM_TOKEN_REQUIRED))?;

    let auth = state.authorization.authorize_room(&token).await?;
    if !auth.known() {
        return Err(Rejection::unauthorized(ROOM_TOKEN_UNKNOWN).into());
    }

    let room_id = auth
        .room_id()
        .ok_or_else(|| Rejection::unauthorized(ROOM_TOKEN_EXPIRED))?;
    Ok(Prepared::RoomId(room_id))
}

async fn prepare_admin_token(state: &AppState, token: Option<String>) -> ApiResult<Prepared> {
    let token = token.ok_or_else(|| Rejection::bad_request(ADMIN_TOKEN_REQUIRED))?;

    let admin_id = state
        .authorization
        .authorize_admin(&token)
        .await?
        .admin_id()
        .ok_or_else(|| Rejection::unauthorized(ADMIN_TOKEN_UNKNOWN))?;
    Ok(Prepared::AdminId(admin_id))
}

async fn prepare_image(inbound: &mut Inbound) -> ApiResult<Prepared> {
    let content_type = match inbound.content_type() {
        Some(essence) if essence == "multipart/form-data" => inbound
            .header(header::CONTENT_TYPE.as_str())
            .unwrap_or_default()
            .to_string(),
        _ => return Err(Rejection::bad_request(MULTIPART_REQUIRED).into()),
    };

    // Multipart needs a request of its own; the body stays buffered here
    let body = inbound.body().await?;
    let mut request = Request::builder()
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(body))
        .map_err(|e| ApiError::Internal(format!("Failed to rebuild request: {}", e)))?;
    // Carries the router's body limit over to the multipart parser
    *request.extensions_mut() = inbound.parts().extensions.clone();
    let mut multipart = Multipart::from_request(request, &())
        .await
        .map_err(|_| Rejection::bad_request(MULTIPART_REQUIRED))?;

    let bytes = loop {
        let field = multipart
            .next_field()
            .await
            .map_err(|_| Rejection::bad_request(MULTIPART_REQUIRED))?
            .ok_or_else(|| Rejection::bad_request(IMAGE_FIELD_REQUIRED))?;

        if field.name() != Some("image") {
            continue;
        }
        if field.file_name().is_none() {
            return Err(Rejection::bad_request(IMAGE_FIELD_NOT_FILE).into());
        }
        break field
            .bytes()
            .await
            .map_err(|_| Rejection::bad_request(MULTIPART_REQUIRED))?;
    };

    let decoded = tokio::task::spawn_blocking(move || image::load_from_memory(&bytes))
        .await
        .map_err(|e| ApiError::Internal(format!("Image decoding task failed: {}", e)))?;

    match decoded {
        Ok(image) => Ok(Prepared::Image(image)),
        Err(_) => Err(Rejection::bad_request(IMAGE_UNDECODABLE).into()),
    }
}

async fn prepare_json(schema: PayloadSchema, inbound: &mut Inbound) -> ApiResult<Prepared> {
    if inbound.content_type().as_deref() != Some("application/json") {
        return Err(Rejection::bad_request(JSON_REQUIRED).into());
    }

    let body = inbound.body().await?;
    let payload = schema
        .parse(&body)
        .map_err(|_| Rejection::bad_request(JSON_WRONG_SCHEMA))?;
    Ok(Prepared::Payload(payload))
}

/// Ordered list of requirements guarding one handler
#[derive(Default)]
pub struct Pipeline {
    requirements: Vec<Box<dyn Prepare>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn require(mut self, requirement: impl Prepare + 'static) -> Self {
        self.requirements.push(Box::new(requirement));
        self
    }

    /// Prepare every requirement in order, stopping at the first rejection
    pub async fn run(&self, state: &AppState, request: Request) -> ApiResult<Arguments> {
        let mut inbound = Inbound::new(request);
        let mut values = HashMap::new();

        for requirement in &self.requirements {
            match requirement.prepare(state, &mut inbound).await {
                Ok(value) => {
                    if let Some(name) = requirement.name() {
                        values.insert(name, value);
                    }
                }
                Err(ApiError::Rejected(rejection)) => {
                    debug!(
                        "Requirement {} rejected {} {}: {}",
                        requirement.kind(),
                        inbound.parts().method,
                        inbound.parts().uri.path(),
                        rejection
                    );
                    return Err(ApiError::Rejected(rejection));
                }
                Err(e) => return Err(e),
            }
        }

        Ok(Arguments {
            parts: inbound.into_parts(),
            values,
        })
    }
}

/// Prepared values keyed by argument name, plus the original request head
#[derive(Debug)]
pub struct Arguments {
    parts: Parts,
    values: HashMap<&'static str, Prepared>,
}

impl Arguments {
    pub fn request(&self) -> &Parts {
        &self.parts
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn take(&mut self, name: &'static str) -> ApiResult<Prepared> {
        self.values
            .remove(name)
            .ok_or_else(|| ApiError::Internal(format!("Argument '{}' was not prepared", name)))
    }

    pub fn room_id(&mut self, name: &'static str) -> ApiResult<i64> {
        match self.take(name)? {
            Prepared::RoomId(room_id) => Ok(room_id),
            other => Err(mismatch(name, &other)),
        }
    }

    pub fn admin_id(&mut self, name: &'static str) -> ApiResult<i64> {
        match self.take(name)? {
            Prepared::AdminId(admin_id) => Ok(admin_id),
            other => Err(mismatch(name, &other)),
        }
    }

    pub fn image(&mut self, name: &'static str) -> ApiResult<DynamicImage> {
        match self.take(name)? {
            Prepared::Image(image) => Ok(image),
            other => Err(mismatch(name, &other)),
        }
    }

    pub fn face_descriptor(&mut self, name: &'static str) -> ApiResult<FaceDescriptorPayload> {
        match self.take(name)? {
            Prepared::Payload(Payload::FaceDescriptor(payload)) => Ok(payload),
            other => Err(mismatch(name, &other)),
        }
    }

    pub fn visit_info(&mut self, name: &'static str) -> ApiResult<VisitInfo> {
        match self.take(name)? {
            Prepared::Payload(Payload::VisitInfo(payload)) => Ok(payload),
            other => Err(mismatch(name, &other)),
        }
    }

    pub fn task_report(&mut self, name: &'static str) -> ApiResult<TaskPerformingReport> {
        match self.take(name)? {
            Prepared::Payload(Payload::TaskReport(payload)) => Ok(payload),
            other => Err(mismatch(name, &other)),
        }
    }
}

fn mismatch(name: &str, value: &Prepared) -> ApiError {
    let kind = match value {
        Prepared::RoomId(_) => "room id",
        Prepared::AdminId(_) => "admin id",
        Prepared::Image(_) => "image",
        Prepared::Payload(_) => "payload",
        Prepared::Unit => "unit",
    };
    ApiError::Internal(format!("Argument '{}' holds an unexpected {}", name, kind))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inbound(content_type: Option<&str>, body: &'static str) -> Inbound {
        let mut builder = Request::builder().uri("/x");
        if let Some(content_type) = content_type {
            builder = builder.header(header::CONTENT_TYPE, content_type);
        }
        Inbound::new(builder.body(Body::from(body)).unwrap())
    }

    fn status_of(result: ApiResult<Prepared>) -> (u16, &'static str) {
        match result {
            Err(ApiError::Rejected(rejection)) => (rejection.status.as_u16(), rejection.message),
            other => panic!("expected rejection, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_content_type_essence() {
        let inbound = inbound(Some("Application/JSON; charset=utf-8"), "");
        assert_eq!(inbound.content_type().as_deref(), Some("application/json"));
    }

    #[tokio::test]
    async fn test_body_is_buffered_once() {
        let mut inbound = inbound(None, "hello");
        assert_eq!(inbound.body().await.unwrap(), Bytes::from_static(b"hello"));
        assert_eq!(inbound.body().await.unwrap(), Bytes::from_static(b"hello"));
    }

    #[tokio::test]
    async fn test_json_requires_content_type() {
        let mut inbound = inbound(Some("text/plain"), r#"{"features": [1.0]}"#);
        let result = prepare_json(PayloadSchema::FaceDescriptor, &mut inbound).await;
        assert_eq!(status_of(result), (400, JSON_REQUIRED));
    }

    #[tokio::test]
    async fn test_json_schema_mismatch_is_generic() {
        let mut inbound = inbound(Some("application/json"), r#"{"task_id": "seven"}"#);
        let result = prepare_json(PayloadSchema::TaskReport, &mut inbound).await;
        assert_eq!(status_of(result), (400, JSON_WRONG_SCHEMA));
    }

    #[tokio::test]
    async fn test_json_payload_parsed() {
        let mut inbound = inbound(
            Some("application/json"),
            r#"{"task_id": 3, "new_status": "DONE"}"#,
        );
        let prepared = prepare_json(PayloadSchema::TaskReport, &mut inbound)
            .await
            .unwrap();

        match prepared {
            Prepared::Payload(Payload::TaskReport(report)) => {
                assert_eq!(report.task_id, 3);
                assert_eq!(report.new_status, "DONE");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_image_requires_multipart() {
        let mut inbound = inbound(Some("application/json"), "{}");
        assert_eq!(status_of(prepare_image(&mut inbound).await), (400, MULTIPART_REQUIRED));
    }

    #[tokio::test]
    async fn test_image_field_must_be_file() {
        let body = "--XYZ\r\n\
                    Content-Disposition: form-data; name=\"image\"\r\n\
                    \r\n\
                    not a file\r\n\
                    --XYZ--\r\n";
        let mut inbound = inbound(Some("multipart/form-data; boundary=XYZ"), body);
        assert_eq!(status_of(prepare_image(&mut inbound).await), (400, IMAGE_FIELD_NOT_FILE));
    }

    #[tokio::test]
    async fn test_image_field_required() {
        let body = "--XYZ\r\n\
                    Content-Disposition: form-data; name=\"photo\"; filename=\"a.png\"\r\n\
                    \r\n\
                    xx\r\n\
                    --XYZ--\r\n";
        let mut inbound = inbound(Some("multipart/form-data; boundary=XYZ"), body);
        assert_eq!(status_of(prepare_image(&mut inbound).await), (400, IMAGE_FIELD_REQUIRED));
    }

    #[tokio::test]
    async fn test_undecodable_image() {
        let body = "--XYZ\r\n\
                    Content-Disposition: form-data; name=\"image\"; filename=\"a.png\"\r\n\
                    Content-Type: image/png\r\n\
                    \r\n\
                    definitely not png\r\n\
                    --XYZ--\r\n";
        let mut inbound = inbound(Some("multipart/form-data; boundary=XYZ"), body);
        assert_eq!(status_of(prepare_image(&mut inbound).await), (400, IMAGE_UNDECODABLE));
    }
}
