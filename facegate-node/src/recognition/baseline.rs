//! Deterministic baseline engine
//!
//! Stands in for a trained face model during development and in tests. A
//! "normalized" image is a 150×150 luminance crop; its descriptor is the
//! mean luminance of an 8-column grid, mean-centred and scaled to unit length,
//! so two crops of the same picture land at distance 0 and a negative of it
//! lands at distance 2.

use image::{imageops::FilterType, DynamicImage, GenericImageView, GrayImage};

use super::{DescriptorIndex, Recognition, RecognitionEngine};
use crate::models::Descriptor;

/// Side of a normalized face crop
pub const NORMALIZED_SIDE: u32 = 150;

/// Smaller images are rejected outright
pub const MIN_SIDE: u32 = 32;

/// Descriptor grid width; rows grow with the descriptor length
const GRID_COLUMNS: u32 = 8;

/// Luminance variance under which a crop is treated as featureless
const MIN_VARIANCE: f32 = 1e-4;

pub struct BaselineEngine {
    index: DescriptorIndex,
    descriptor_len: usize,
}

impl BaselineEngine {
    pub fn new(descriptor_len: usize, tolerance: f32) -> Self {
        Self {
            index: DescriptorIndex::new(tolerance),
            descriptor_len,
        }
    }

    /// Columns and rows of the luminance grid, filled row by row
    fn grid(&self) -> (u32, u32) {
        let cells = self.descriptor_len.max(1) as u32;
        let cols = GRID_COLUMNS.min(cells);
        (cols, cells.div_ceil(cols))
    }
}

impl RecognitionEngine for BaselineEngine {
    fn check_image_valid(&self, image: &DynamicImage) -> bool {
        let (width, height) = image.dimensions();
        width >= MIN_SIDE && height >= MIN_SIDE
    }

    fn check_image_normalized(&self, image: &DynamicImage) -> bool {
        image.dimensions() == (NORMALIZED_SIDE, NORMALIZED_SIDE)
    }

    fn normalize(&self, image: &DynamicImage) -> Option<DynamicImage> {
        if !self.check_image_valid(image) {
            return None;
        }

        let (width, height) = image.dimensions();
        let side = width.min(height);
        let crop = image.crop_imm((width - side) / 2, (height - side) / 2, side, side);
        let luma = crop
            .resize_exact(NORMALIZED_SIDE, NORMALIZED_SIDE, FilterType::Triangle)
            .to_luma8();

        if luminance_variance(&luma) < MIN_VARIANCE {
            return None;
        }

        Some(DynamicImage::ImageLuma8(luma))
    }

    fn check_descriptor_valid(&self, descriptor: &[f32]) -> bool {
        descriptor.len() == self.descriptor_len && descriptor.iter().all(|x| x.is_finite())
    }

    fn calculate_descriptor(&self, normalized: &DynamicImage) -> Descriptor {
        let luma = normalized.to_luma8();
        let (width, height) = luma.dimensions();
        let (cols, rows) = self.grid();

        let mut features: Vec<f32> = (0..self.descriptor_len as u32)
            .map(|cell| {
                let (col, row) = (cell % cols, cell / cols);
                let (x0, x1) = (col * width / cols, (col + 1) * width / cols);
                let (y0, y1) = (row * height / rows, (row + 1) * height / rows);
                cell_mean(&luma, x0..x1, y0..y1)
            })
            .collect();

        let mean = features.iter().sum::<f32>() / features.len().max(1) as f32;
        features.iter_mut().for_each(|x| *x -= mean);

        let norm = features.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            features.iter_mut().for_each(|x| *x /= norm);
        }
        features
    }

    fn recognize(&self, normalized: &DynamicImage) -> Recognition {
        let descriptor = self.calculate_descriptor(normalized);
        self.index.lookup(&descriptor)
    }

    fn recognize_by_descriptor(&self, descriptor: &[f32]) -> Recognition {
        self.index.lookup(descriptor)
    }

    fn update_descriptors(&self, descriptors: Vec<(i64, Descriptor)>) {
        self.index.replace(descriptors);
    }
}

fn cell_mean(luma: &GrayImage, xs: std::ops::Range<u32>, ys: std::ops::Range<u32>) -> f32 {
    let mut sum = 0u64;
    let mut count = 0u64;
    for y in ys {
        for x in xs.clone() {
            sum += u64::from(luma.get_pixel(x, y).0[0]);
            count += 1;
        }
    }
    if count == 0 {
        0.0
    } else {
        sum as f32 / count as f32 / 255.0
    }
}

fn luminance_variance(luma: &GrayImage) -> f32 {
    let count = (luma.width() * luma.height()).max(1) as f32;
    let mean = luma.pixels().map(|p| f32::from(p.0[0]) / 255.0).sum::<f32>() / count;
    luma.pixels()
        .map(|p| {
            let d = f32::from(p.0[0]) / 255.0 - mean;
            d * d
        })
        .sum::<f32>()
        / count
}
