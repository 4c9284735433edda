// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Level registry and elevation matching.

use crate::error::{Error, Result};

/// Registered levels in insertion order, keyed by elevation.
///
/// Elevations are unique within `tolerance`. The handle type is opaque to
/// the kernel.
#[derive(Debug, Clone)]
pub struct LevelRegistry<H> {
    entries: Vec<(f64, H)>,
    tolerance: f64,
}

impl<H: Clone> LevelRegistry<H> {
    pub fn new(tolerance: f64) -> Self {
        Self {
            entries: Vec::new(),
            tolerance,
        }
    }

    /// Registers a level. Returns `false` (and keeps the existing entry) when
    /// a level within tolerance of `elevation` is already registered.
    pub fn register(&mut self, elevation: f64, handle: H) -> bool {
        if self.find(elevation).is_some() {
            return false;
        }
        self.entries.push((elevation, handle));
        true
    }

    /// Handle of the level within tolerance of `elevation`.
    pub fn find(&self, elevation: f64) -> Option<&H> {
        self.entries
            .iter()
            .find(|(e, _)| (e - elevation).abs() <= self.tolerance)
            .map(|(_, h)| h)
    }

    /// Nearest level to `elevation` and the offset `elevation - level`.
    ///
    /// Ties go to the level registered first.
    pub fn resolve(&self, elevation: f64) -> Result<(H, f64)> {
        let mut best: Option<&(f64, H)> = None;
        for entry in &self.entries {
            let gap = (elevation - entry.0).abs();
            if best.map_or(true, |b| gap < (elevation - b.0).abs()) {
                best = Some(entry);
            }
        }
        best.map(|(e, h)| (h.clone(), elevation - e))
            .ok_or(Error::UnresolvedLevel { elevation })
    }

    /// Registered `(elevation, handle)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (f64, &H)> {
        self.entries.iter().map(|(e, h)| (*e, h))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
