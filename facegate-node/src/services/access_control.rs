//! Access decisions
//!
//! Both check paths end the same way: a recognized descriptor is resolved to
//! its owner, then the owner's permission for the room decides
//! `have_access`. Image work runs on the [`RecognitionPool`]; descriptor
//! lookups are cheap and run inline.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use facegate_common::{Outcome, Result};
use image::DynamicImage;
use std::sync::Arc;
use tracing::{debug, info};

use super::Service;
use crate::db::AccessControlRepository;
use crate::models::{AccessCheck, AnonymousDescriptor, VisitRecording};
use crate::recognition::{Recognition, RecognitionEngine, RecognitionPool};

pub const IMAGE_NOT_NORMALIZED: &str = "Provided image is not normalized.";
pub const DESCRIPTOR_INVALID: &str = "Provided descriptor is invalid.";
pub const IMAGE_INVALID: &str = "Provided image is invalid.";
pub const CANNOT_NORMALIZE: &str = "Can't normalize image. Maybe there is no face.";

pub struct AccessControlService {
    repo: AccessControlRepository,
    engine: Arc<dyn RecognitionEngine>,
    pool: Arc<RecognitionPool>,
}

impl AccessControlService {
    pub fn new(
        repo: AccessControlRepository,
        engine: Arc<dyn RecognitionEngine>,
        pool: Arc<RecognitionPool>,
    ) -> Self {
        Self { repo, engine, pool }
    }

    pub async fn check_access_by_face(
        &self,
        room_id: i64,
        image: DynamicImage,
    ) -> Result<Outcome<AccessCheck>> {
        if !self.engine.check_image_normalized(&image) {
            return Ok(Outcome::error(IMAGE_NOT_NORMALIZED));
        }

        let engine = Arc::clone(&self.engine);
        let recognition = self.pool.run(move || engine.recognize(&image)).await?;

        self.resolve(room_id, recognition, "Calculated").await
    }

    pub async fn check_access_by_descriptor(
        &self,
        room_id: i64,
        descriptor: &[f32],
    ) -> Result<Outcome<AccessCheck>> {
        if !self.engine.check_descriptor_valid(descriptor) {
            return Ok(Outcome::error(DESCRIPTOR_INVALID));
        }

        let recognition = self.engine.recognize_by_descriptor(descriptor);
        self.resolve(room_id, recognition, "Provided").await
    }

    /// Record a visit if the user may (still) enter the room
    pub async fn record_visit(
        &self,
        room_id: i64,
        user_id: i64,
        datetime: DateTime<Utc>,
    ) -> Result<Outcome<VisitRecording>> {
        if !self.repo.check_access_permission_exist(user_id, room_id).await? {
            debug!("Visit of user {} to room {} not allowed", user_id, room_id);
            return Ok(Outcome::ok(VisitRecording::denied()));
        }

        let report = self.repo.create_visit_report(room_id, user_id, datetime).await?;
        debug!("Recorded visit {} of user {} to room {}", report.id, user_id, room_id);
        Ok(Outcome::ok(VisitRecording::recorded(report.id)))
    }

    /// Descriptor of an arbitrary image, never stored
    pub async fn calculate_descriptor(
        &self,
        image: DynamicImage,
    ) -> Result<Outcome<AnonymousDescriptor>> {
        if !self.engine.check_image_valid(&image) {
            return Ok(Outcome::error(IMAGE_INVALID));
        }

        let engine = Arc::clone(&self.engine);
        let normalized = self.pool.run(move || engine.normalize(&image)).await?;
        let Some(normalized) = normalized else {
            return Ok(Outcome::error(CANNOT_NORMALIZE));
        };

        let engine = Arc::clone(&self.engine);
        let features = self
            .pool
            .run(move || engine.calculate_descriptor(&normalized))
            .await?;

        Ok(Outcome::ok(AnonymousDescriptor { features }))
    }

    /// Rebuild the engine's index from every stored descriptor
    pub async fn refresh_descriptors(&self) -> Result<usize> {
        let descriptors = self.repo.get_all_face_descriptors().await?;
        let count = descriptors.len();

        self.engine.update_descriptors(
            descriptors
                .into_iter()
                .map(|descriptor| (descriptor.id, descriptor.features))
                .collect(),
        );

        info!("Loaded {} face descriptors into recognition index", count);
        Ok(count)
    }

    async fn resolve(
        &self,
        room_id: i64,
        recognition: Recognition,
        source: &str,
    ) -> Result<Outcome<AccessCheck>> {
        let Recognition::Known { descriptor_id } = recognition else {
            return Ok(Outcome::ok(AccessCheck::unknown()));
        };

        let Some(user) = self.repo.get_user_by_descriptor_id(descriptor_id).await? else {
            return Ok(Outcome::error(format!(
                "{} descriptor is known, but not bound to user. (descriptor_id = {})",
                source, descriptor_id
            )));
        };

        let have_access = self
            .repo
            .check_access_permission_exist(user.id, room_id)
            .await?;

        Ok(Outcome::ok(AccessCheck::known(user, have_access)))
    }
}

#[async_trait]
impl Service for AccessControlService {
    fn name(&self) -> &'static str {
        "access_control"
    }

    async fn init(&self) -> Result<()> {
        self.refresh_descriptors().await?;
        Ok(())
    }

    async fn deinit(&self) -> Result<()> {
        self.engine.update_descriptors(Vec::new());
        Ok(())
    }
}
