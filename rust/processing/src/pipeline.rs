// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Run driver.
//!
//! A run has four phases:
//!
//! 1. pre-pass: site data and the angle to north, fixed before any placement
//! 2. level seeding from the target document
//! 3. depth-first element pass, parents before children
//! 4. communal walls, then communal doors
//!
//! All mutable state lives in the [`RunContext`] owned by the [`Pipeline`].

use nalgebra::{Point3, Vector3};
use scene2cad_core::{ElementKind, NodeKey, SceneArena, SceneNode};
use scene2cad_geometry::{
    close_loop, polygon_to_segments, world_pivot, Loop, NorthAlignment, Placement, Segment,
};

use crate::config::RunConfig;
use crate::context::{RunContext, RunReport, SiteLocation};
use crate::error::{Error, Result};
use crate::materializer::{ElementMeta, LevelHandle, MaterializeError, Materializer};

/// Runs a parsed scene against `doc`.
pub fn run<M: Materializer>(
    arena: &SceneArena,
    doc: &mut M,
    config: RunConfig,
) -> Result<RunReport> {
    Pipeline::new(arena, doc, config).run()
}

/// Parses a scene document and runs it against `doc`.
pub fn run_json<M: Materializer>(json: &str, doc: &mut M, config: RunConfig) -> Result<RunReport> {
    let raw = scene2cad_core::parse_scene(json)?;
    let arena = SceneArena::from_raw(raw)?;
    run(&arena, doc, config)
}

pub struct Pipeline<'a, M: Materializer> {
    pub(crate) arena: &'a SceneArena,
    pub(crate) doc: &'a mut M,
    pub(crate) ctx: RunContext,
}

impl<'a, M: Materializer> Pipeline<'a, M> {
    pub fn new(arena: &'a SceneArena, doc: &'a mut M, config: RunConfig) -> Self {
        Self {
            arena,
            doc,
            ctx: RunContext::new(config),
        }
    }

    pub fn run(mut self) -> Result<RunReport> {
        let root = self.arena.root().ok_or(Error::EmptyInput)?;

        tracing::info!(nodes = self.arena.len(), "Starting scene run");

        self.preprocess();
        self.seed_levels();
        self.traverse(root)?;
        self.build_communal_walls();
        self.build_communal_doors();

        tracing::info!(
            levels = self.ctx.levels.len(),
            walls = self.ctx.walls_built,
            communal_walls = self.ctx.communal_walls_built,
            messages = self.ctx.messages.len(),
            "Scene run complete"
        );
        Ok(self.ctx.into_report())
    }

    /// Collects site data and fixes the angle to north.
    fn preprocess(&mut self) {
        let arena = self.arena;
        let mut rotations = Vec::new();

        for key in arena.depth_first() {
            let Some(node) = arena.node(key) else {
                continue;
            };
            match node.kind {
                ElementKind::Site => {
                    if let (Some(latitude), Some(longitude)) =
                        (node.payload.latitude, node.payload.longitude)
                    {
                        self.ctx.site = Some(SiteLocation {
                            latitude,
                            longitude,
                        });
                    }
                    self.ctx.site_boundary = node.payload.polygon.clone();
                }
                ElementKind::Building if node.children().is_empty() => {
                    rotations.push(0.0);
                    if self.ctx.bounds.is_none() && !self.ctx.site_boundary.is_empty() {
                        let plan: Vec<Point3<f64>> = self
                            .ctx
                            .site_boundary
                            .iter()
                            .map(|p| Point3::new(p.x, p.y, 0.0))
                            .collect();
                        self.ctx.expand_bounds(&plan);
                    }
                }
                ElementKind::Apartment => rotations.push(node.rotation[2]),
                _ => {}
            }
        }

        if rotations.is_empty() {
            tracing::debug!("No apartment rotations, angle to north is zero");
        }
        self.ctx.north = NorthAlignment::from_rotations(rotations);
        tracing::info!(
            angle_deg = self.ctx.north.angle().to_degrees(),
            "Angle to north fixed"
        );
    }

    /// Registers the levels the document already holds.
    fn seed_levels(&mut self) {
        for level in self.doc.existing_levels() {
            if !self
                .ctx
                .register_level(level.elevation, level.handle, &level.name, false)
            {
                tracing::debug!(
                    elevation = level.elevation,
                    name = %level.name,
                    "Duplicate document level ignored"
                );
            }
        }
    }

    /// Depth-first walk from `root`. A failing element drops its subtree;
    /// a failing root aborts the run.
    fn traverse(&mut self, root: NodeKey) -> Result<()> {
        let arena = self.arena;
        let mut stack = vec![(root, Placement::root())];

        while let Some((key, placement)) = stack.pop() {
            let node = arena.get(key)?;
            if let Err(e) = self.visit(key, node, &placement) {
                if key == root {
                    return Err(e);
                }
                if e.is_broken_hierarchy() {
                    tracing::warn!(
                        element = %node.uuid,
                        kind = %node.kind,
                        error = %e,
                        "Broken parent chain, skipping element and its children"
                    );
                } else {
                    tracing::warn!(
                        element = %node.uuid,
                        kind = %node.kind,
                        error = %e,
                        "Skipping element and its children"
                    );
                }
                self.ctx
                    .messages
                    .push(format!("{e}. Element: {}", node.uuid));
                continue;
            }

            let child_placement = placement.descend(key, node);
            for &child in node.children().iter().rev() {
                stack.push((child, child_placement));
            }
        }
        Ok(())
    }

    /// Attributes stamped on every element created for `key`.
    pub(crate) fn meta(&self, key: NodeKey, node: &SceneNode) -> ElementMeta {
        let arena = self.arena;
        ElementMeta {
            uuid: node.uuid.clone(),
            building: arena
                .nearest_ancestor_of_kind(key, ElementKind::Building)
                .and_then(|b| arena.node(b))
                .map(|b| b.name.clone()),
        }
    }

    /// Records a per-element document failure.
    pub(crate) fn record_failure(&mut self, err: &MaterializeError, uuid: &str) {
        tracing::warn!(element = %uuid, error = %err, "Document rejected element");
        self.ctx.messages.push(format!("{err}. Element: {uuid}"));
    }

    pub(crate) fn count_created(&mut self, node: &SceneNode) {
        self.ctx.count_created(&node.tag);
    }

    /// World point rotated into project space.
    pub(crate) fn project(&self, world: &Point3<f64>) -> Point3<f64> {
        self.ctx.north.to_project_space(world)
    }

    /// Level and vertical offset for the element at its pivot `t`.
    ///
    /// The nearest registered level wins. With nothing registered, the level
    /// declared by the parent container (or its parent) is looked up in the
    /// document at the parent's reference elevation. `None` means the element
    /// cannot be placed; the message is already recorded. A missing
    /// grandparent is a broken hierarchy.
    pub(crate) fn level_for(
        &mut self,
        key: NodeKey,
        node: &SceneNode,
        placement: &Placement,
        t: &Vector3<f64>,
    ) -> Result<Option<(LevelHandle, f64)>> {
        let elevation = placement.world_pivot(node, t).z;
        if let Ok(resolved) = self.ctx.levels.resolve(elevation) {
            return Ok(Some(resolved));
        }

        let arena = self.arena;
        let Some(parent_key) = node.parent() else {
            self.unresolved_level(elevation, &node.uuid);
            return Ok(None);
        };
        let parent = arena.get(parent_key)?;
        // Outside a single-parent container the grandparent declares the level.
        let declared = if parent.kind.is_single_parent() {
            parent.payload.level
        } else {
            arena.get(arena.ancestor(key, 2)?)?.payload.level
        };

        let reference = world_pivot(arena, parent_key, &parent.anchor)?.z;
        match self
            .doc
            .find_level(reference, self.ctx.config.tolerances.level_tolerance)
        {
            Some(handle) => {
                let offset = declared.map_or(0.0, |d| d - reference);
                tracing::debug!(
                    element = %node.uuid,
                    reference,
                    offset,
                    "Placed on parent reference level"
                );
                Ok(Some((handle, offset)))
            }
            None => {
                self.unresolved_level(reference, &node.uuid);
                Ok(None)
            }
        }
    }

    fn unresolved_level(&mut self, elevation: f64, uuid: &str) {
        tracing::debug!(element = %uuid, elevation, "No level for element");
        self.ctx.messages.push(format!(
            "Level with elevation {elevation:.3} does not exist. Element: {uuid}"
        ));
    }

    /// Closed loop through an outline given in the node's local frame.
    pub(crate) fn polygon_loop(
        &self,
        node: &SceneNode,
        placement: &Placement,
        outline: &[Point3<f64>],
    ) -> Option<Loop> {
        let points: Vec<Point3<f64>> = outline
            .iter()
            .map(|v| self.project(&placement.world_point(node, v)))
            .collect();
        let segments = polygon_to_segments(&points, self.ctx.config.min_polygon_edge);
        if segments.is_empty() {
            return None;
        }
        Some(close_loop(
            segments,
            self.ctx.config.tolerances.loop_gap_tolerance,
        ))
    }

    /// Horizontal centerline through the middle of the node's box, or `None`
    /// when it is too short to build.
    pub(crate) fn centerline(&self, node: &SceneNode, placement: &Placement) -> Option<Segment> {
        let start = placement.world_pivot(node, &Vector3::new(0.0, 0.5, 0.0));
        let end = placement.world_pivot(node, &Vector3::new(1.0, 0.5, 0.0));
        let line = Segment::new(self.project(&start), self.project(&end));
        if line.length() < self.ctx.config.min_centerline_length {
            return None;
        }
        Some(line)
    }
}
