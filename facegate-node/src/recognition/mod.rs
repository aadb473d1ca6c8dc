//! Face recognition seam
//!
//! The node never looks inside the recognition engine: it asks the
//! questions listed on [`RecognitionEngine`] and branches on the answers.
//! CPU-heavy calls (normalization, descriptor extraction, raw-image
//! matching) go through the [`RecognitionPool`]; descriptor-only matching
//! is cheap and runs inline.

pub mod baseline;
pub mod index;
pub mod pool;

pub use baseline::BaselineEngine;
pub use index::DescriptorIndex;
pub use pool::RecognitionPool;

use image::DynamicImage;

use crate::models::Descriptor;

/// Answer of a match lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recognition {
    /// Close enough to a stored descriptor
    Known { descriptor_id: i64 },
    /// Nothing within tolerance
    Unknown,
}

impl Recognition {
    pub fn is_known_face(&self) -> bool {
        matches!(self, Recognition::Known { .. })
    }
}

/// Operations the node needs from a face recognition engine
///
/// Implementations must be callable from several worker threads at once.
pub trait RecognitionEngine: Send + Sync + 'static {
    /// Whether the image is usable at all as recognition input
    fn check_image_valid(&self, image: &DynamicImage) -> bool;

    /// Whether the image is already a normalized face crop
    fn check_image_normalized(&self, image: &DynamicImage) -> bool;

    /// Normalized face crop, `None` when no face can be found
    fn normalize(&self, image: &DynamicImage) -> Option<DynamicImage>;

    fn check_descriptor_valid(&self, descriptor: &[f32]) -> bool;

    fn calculate_descriptor(&self, normalized: &DynamicImage) -> Descriptor;

    /// Match a normalized image against the loaded descriptors
    fn recognize(&self, normalized: &DynamicImage) -> Recognition;

    fn recognize_by_descriptor(&self, descriptor: &[f32]) -> Recognition;

    /// Replace the loaded descriptors wholesale
    fn update_descriptors(&self, descriptors: Vec<(i64, Descriptor)>);
}
