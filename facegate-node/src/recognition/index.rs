//! In-memory descriptor index
//!
//! Rebuilt in one pass at service start. Readers share it freely; the only
//! writer is the rebuild.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::Recognition;
use crate::models::Descriptor;

pub struct DescriptorIndex {
    entries: RwLock<Vec<(i64, Descriptor)>>,
    tolerance: f32,
}

impl DescriptorIndex {
    pub fn new(tolerance: f32) -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            tolerance,
        }
    }

    pub fn replace(&self, descriptors: Vec<(i64, Descriptor)>) {
        *self.write() = descriptors;
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Closest stored descriptor of the same length and its distance
    ///
    /// Ties go to the lowest descriptor id.
    pub fn nearest(&self, descriptor: &[f32]) -> Option<(i64, f32)> {
        self.read()
            .iter()
            .filter(|(_, stored)| stored.len() == descriptor.len())
            .map(|(id, stored)| (*id, euclidean_distance(stored, descriptor)))
            .min_by(|(a_id, a), (b_id, b)| a.total_cmp(b).then(a_id.cmp(b_id)))
    }

    /// Known iff the nearest descriptor lies within tolerance
    pub fn lookup(&self, descriptor: &[f32]) -> Recognition {
        match self.nearest(descriptor) {
            Some((descriptor_id, distance)) if distance <= self.tolerance => {
                Recognition::Known { descriptor_id }
            }
            _ => Recognition::Unknown,
        }
    }

    // Poisoning only means a writer panicked mid-replace; the Vec is still whole
    fn read(&self) -> RwLockReadGuard<'_, Vec<(i64, Descriptor)>> {
        self.entries.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<(i64, Descriptor)>> {
        self.entries.write().unwrap_or_else(|e| e.into_inner())
    }
}

pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}
