// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-run state and the final run report.

use std::collections::BTreeMap;

use nalgebra::Point3;
use rustc_hash::{FxHashMap, FxHashSet};
use scene2cad_core::{NodeKey, TypeRef};
use scene2cad_geometry::{LevelRegistry, NorthAlignment, Segment};
use serde::{Deserialize, Serialize};

use crate::config::RunConfig;
use crate::materializer::{ElementMeta, LevelHandle, WallHandle};

/// Deduplicated, insertion-ordered message list.
#[derive(Debug, Clone, Default)]
pub struct MessageLog {
    messages: Vec<String>,
    seen: FxHashSet<String>,
}

impl MessageLog {
    /// Adds `message` unless the same text was already recorded.
    pub fn push(&mut self, message: impl Into<String>) -> bool {
        let message = message.into();
        if self.seen.contains(&message) {
            return false;
        }
        self.seen.insert(message.clone());
        self.messages.push(message);
        true
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// A communal wall waiting for its space to be merged.
#[derive(Debug, Clone)]
pub struct WallCandidate {
    pub centerline: Segment,
    pub level: LevelHandle,
    pub height: f64,
    pub base_offset: f64,
    pub type_ref: Option<TypeRef>,
    pub source: NodeKey,
    pub meta: ElementMeta,
}

/// A communal door waiting for its space's walls to be built.
#[derive(Debug, Clone)]
pub struct DoorCandidate {
    pub position: Point3<f64>,
    pub type_ref: Option<TypeRef>,
    pub source: NodeKey,
    pub meta: ElementMeta,
}

/// Candidates grouped by space id, in order of first appearance.
#[derive(Debug)]
pub struct SpaceGroups<T> {
    index: FxHashMap<String, usize>,
    groups: Vec<(String, Vec<T>)>,
}

impl<T> Default for SpaceGroups<T> {
    fn default() -> Self {
        Self {
            index: FxHashMap::default(),
            groups: Vec::new(),
        }
    }
}

impl<T> SpaceGroups<T> {
    pub fn push(&mut self, space_id: &str, item: T) {
        match self.index.get(space_id) {
            Some(&i) => self.groups[i].1.push(item),
            None => {
                self.index.insert(space_id.to_string(), self.groups.len());
                self.groups.push((space_id.to_string(), vec![item]));
            }
        }
    }

    pub fn take(&mut self) -> Vec<(String, Vec<T>)> {
        self.index.clear();
        std::mem::take(&mut self.groups)
    }
}

/// Everything mutable during one run. Created by the driver at run start
/// and consumed into a [`RunReport`] at the end.
#[derive(Debug)]
pub struct RunContext {
    pub config: RunConfig,
    /// Fixed before any element is placed.
    pub north: NorthAlignment,
    pub levels: LevelRegistry<LevelHandle>,
    /// Name and roof flag per registered level.
    pub level_info: FxHashMap<LevelHandle, (String, bool)>,
    pub messages: MessageLog,
    pub communal_walls: SpaceGroups<WallCandidate>,
    pub communal_doors: SpaceGroups<DoorCandidate>,
    /// Built communal walls per space, for door hosting.
    pub built_communal: FxHashMap<String, Vec<(Segment, WallHandle)>>,
    /// Walls built directly from a scene node, for hosted children.
    pub built_walls: FxHashMap<NodeKey, WallHandle>,
    pub created: BTreeMap<String, usize>,
    pub walls_built: usize,
    pub communal_walls_built: usize,
    pub synthesized_walls_skipped: usize,
    pub site: Option<SiteLocation>,
    pub site_boundary: Vec<Point3<f64>>,
    pub bounds: Option<Bounds>,
    pub model_types: Vec<String>,
    pub apartment_categories: BTreeMap<String, Vec<String>>,
    pub project_name: Option<String>,
}

impl RunContext {
    pub fn new(config: RunConfig) -> Self {
        let level_tolerance = config.tolerances.level_tolerance;
        Self {
            config,
            north: NorthAlignment::default(),
            levels: LevelRegistry::new(level_tolerance),
            level_info: FxHashMap::default(),
            messages: MessageLog::default(),
            communal_walls: SpaceGroups::default(),
            communal_doors: SpaceGroups::default(),
            built_communal: FxHashMap::default(),
            built_walls: FxHashMap::default(),
            created: BTreeMap::new(),
            walls_built: 0,
            communal_walls_built: 0,
            synthesized_walls_skipped: 0,
            site: None,
            site_boundary: Vec::new(),
            bounds: None,
            model_types: Vec::new(),
            apartment_categories: BTreeMap::new(),
            project_name: None,
        }
    }

    /// Registers a level and remembers its name. Returns `false` for a
    /// duplicate elevation.
    pub fn register_level(
        &mut self,
        elevation: f64,
        handle: LevelHandle,
        name: &str,
        is_roof: bool,
    ) -> bool {
        if !self.levels.register(elevation, handle) {
            return false;
        }
        self.level_info.insert(handle, (name.to_string(), is_roof));
        true
    }

    pub fn count_created(&mut self, label: &str) {
        *self.created.entry(label.to_string()).or_default() += 1;
    }

    pub fn add_model_type(&mut self, model_type: &str) {
        if !self.model_types.iter().any(|m| m == model_type) {
            self.model_types.push(model_type.to_string());
        }
    }

    pub fn add_apartment_category(&mut self, elevation_key: String, category: &str) {
        let entry = self.apartment_categories.entry(elevation_key).or_default();
        if !entry.iter().any(|c| c == category) {
            entry.push(category.to_string());
        }
    }

    /// Grows the project bounds to contain `points`, keeping
    /// `project_bounds_padding` on every side.
    pub fn expand_bounds(&mut self, points: &[Point3<f64>]) {
        let padding = self.config.project_bounds_padding;
        for p in points {
            let padded_min = [p.x - padding, p.y - padding, p.z - padding];
            let padded_max = [p.x + padding, p.y + padding, p.z + padding];
            match &mut self.bounds {
                Some(b) => {
                    for i in 0..3 {
                        b.min[i] = b.min[i].min(padded_min[i]);
                        b.max[i] = b.max[i].max(padded_max[i]);
                    }
                }
                None => {
                    self.bounds = Some(Bounds {
                        min: padded_min,
                        max: padded_max,
                    })
                }
            }
        }
    }

    pub fn into_report(self) -> RunReport {
        RunReport {
            created: self.created,
            levels: self
                .levels
                .iter()
                .map(|(elevation, handle)| LevelSummary {
                    elevation,
                    name: self
                        .level_info
                        .get(handle)
                        .map(|(n, _)| n.clone())
                        .unwrap_or_default(),
                })
                .collect(),
            walls_built: self.walls_built,
            communal_walls_built: self.communal_walls_built,
            synthesized_walls_skipped: self.synthesized_walls_skipped,
            messages: self.messages.messages().to_vec(),
            angle_to_north: self.north.angle(),
            site: self.site,
            site_boundary: self
                .site_boundary
                .iter()
                .map(|p| {
                    let p = self.north.to_project_space(p);
                    [p.x, p.y, p.z]
                })
                .collect(),
            project_bounds: self.bounds,
            model_types: self.model_types,
            apartment_categories: self.apartment_categories,
            project_name: self.project_name,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SiteLocation {
    pub latitude: f64,
    pub longitude: f64,
}

/// Axis-aligned project extents.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelSummary {
    pub elevation: f64,
    pub name: String,
}

/// Summary of a finished run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Created element count per kind tag.
    pub created: BTreeMap<String, usize>,
    /// Registered levels in registration order.
    pub levels: Vec<LevelSummary>,
    pub walls_built: usize,
    pub communal_walls_built: usize,
    pub synthesized_walls_skipped: usize,
    /// Deduplicated per-element failures.
    pub messages: Vec<String>,
    /// Radians.
    pub angle_to_north: f64,
    pub site: Option<SiteLocation>,
    /// Property line vertices in project space.
    pub site_boundary: Vec<[f64; 3]>,
    pub project_bounds: Option<Bounds>,
    /// "Building" and/or "Site".
    pub model_types: Vec<String>,
    /// Apartment and room categories per elevation.
    pub apartment_categories: BTreeMap<String, Vec<String>>,
    pub project_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_message_log_dedups_in_order() {
        let mut log = MessageLog::default();
        assert!(log.push("b"));
        assert!(log.push("a"));
        assert!(!log.push("b"));
        assert_eq!(log.messages(), ["b", "a"]);
    }

    #[test]
    fn test_space_groups_keep_first_appearance_order() {
        let mut groups = SpaceGroups::default();
        groups.push("s2", 1);
        groups.push("s1", 2);
        groups.push("s2", 3);
        let taken = groups.take();
        assert_eq!(taken, [("s2".to_string(), vec![1, 3]), ("s1".to_string(), vec![2])]);
        assert!(groups.take().is_empty());
    }

    #[test]
    fn test_register_level_dedups_and_reports_names() {
        let mut ctx = RunContext::new(RunConfig::default());
        assert!(ctx.register_level(0.0, LevelHandle(1), "00", false));
        assert!(!ctx.register_level(0.0004, LevelHandle(2), "dup", false));
        assert!(ctx.register_level(3.0, LevelHandle(3), "01_RF", true));

        let report = ctx.into_report();
        let names: Vec<_> = report.levels.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, ["00", "01_RF"]);
    }

    #[test]
    fn test_expand_bounds_pads_every_side() {
        let mut ctx = RunContext::new(RunConfig::default());
        ctx.expand_bounds(&[Point3::new(0.0, 0.0, 0.0), Point3::new(10.0, 5.0, 0.0)]);
        let b = ctx.bounds.unwrap();
        for (got, want) in b.min.iter().zip([-3.048, -3.048, -3.048]) {
            assert_relative_eq!(*got, want, epsilon = 1e-12);
        }
        for (got, want) in b.max.iter().zip([13.048, 8.048, 3.048]) {
            assert_relative_eq!(*got, want, epsilon = 1e-12);
        }
    }
}
