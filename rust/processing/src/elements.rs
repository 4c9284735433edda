// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-kind element handlers for the depth-first pass.

use nalgebra::{Point3, Vector3};
use scene2cad_core::{ElementKind, NodeKey, SceneNode};
use scene2cad_geometry::{close_loop, quad_segments, Loop, Placement};

use crate::context::{DoorCandidate, WallCandidate};
use crate::error::Result;
use crate::materializer::{BoundaryKind, MaterializeError, Materializer, WallSpec};
use crate::pipeline::Pipeline;

impl<M: Materializer> Pipeline<'_, M> {
    /// Handles one node. Its parent has already been handled.
    pub(crate) fn visit(
        &mut self,
        key: NodeKey,
        node: &SceneNode,
        placement: &Placement,
    ) -> Result<()> {
        if !node.payload.levels.is_empty() {
            self.create_levels(key, node, placement);
        }

        match node.kind {
            ElementKind::Building if !node.children().is_empty() => {
                self.ctx.add_model_type("Building");
            }
            ElementKind::Building => {
                self.create_site_level();
                self.ctx.add_model_type("Site");
                self.count_created(node);
            }
            ElementKind::Apartment => {
                self.count_created(node);
                if let Some(category) = &node.payload.category {
                    self.ctx
                        .add_apartment_category(node.position.z.to_string(), category);
                }
            }
            kind if kind.is_wall_like() => {
                if kind == ElementKind::Wall && self.is_communal_wall(key) {
                    self.collect_communal_wall(key, node, placement)?;
                } else {
                    self.create_wall(key, node, placement)?;
                }
            }
            ElementKind::Floor => {
                let profile = self.rectangle(node, placement);
                self.create_slab(key, node, placement, BoundaryKind::Floor, profile, 1.0)?;
            }
            ElementKind::Ceiling => {
                let profile = self.rectangle(node, placement);
                self.create_slab(key, node, placement, BoundaryKind::Ceiling, profile, 0.0)?;
            }
            ElementKind::Roof => {
                let profile = if node.payload.polygon.is_empty() {
                    Some(self.rectangle(node, placement))
                } else {
                    self.polygon_loop(node, placement, &node.payload.polygon)
                };
                match profile {
                    Some(profile) => self.create_slab(
                        key,
                        node,
                        placement,
                        BoundaryKind::Roof,
                        profile,
                        0.0,
                    )?,
                    None => tracing::debug!(element = %node.uuid, "Roof outline is degenerate"),
                }
            }
            ElementKind::Window => self.create_hosted(key, node, placement),
            ElementKind::Door => {
                if self.is_communal_door(key) {
                    self.collect_communal_door(key, node, placement);
                } else {
                    self.create_hosted(key, node, placement);
                }
            }
            kind if kind.is_room_space() => self.create_room(key, node, placement)?,
            ElementKind::Opening => self.create_opening(key, node, placement),
            ElementKind::World => self.ctx.project_name = Some(node.name.clone()),
            kind if kind.is_instantiable() => {
                self.ctx.messages.push(format!(
                    "Support for the '{kind}' category has not been implemented yet"
                ));
            }
            ElementKind::Unknown => {
                tracing::debug!(element = %node.uuid, tag = %node.tag, "Unknown element type");
                self.count_created(node);
            }
            _ => self.count_created(node),
        }
        Ok(())
    }

    fn create_levels(&mut self, key: NodeKey, node: &SceneNode, placement: &Placement) {
        let meta = self.meta(key, node);
        for def in &node.payload.levels {
            if self.ctx.levels.find(def.elevation).is_some() {
                tracing::debug!(elevation = def.elevation, "Level already registered");
                continue;
            }

            let name = def.name();
            let handle = match self.doc.create_level(def.elevation, &name) {
                Ok(handle) => handle,
                Err(e) => {
                    self.record_failure(&e, &node.uuid);
                    continue;
                }
            };
            self.ctx
                .register_level(def.elevation, handle, &name, def.is_roof);
            tracing::debug!(elevation = def.elevation, name = %name, "Created level");

            let areas = [
                (BoundaryKind::GrossExternalArea, &def.gea_polygon),
                (BoundaryKind::GrossInternalArea, &def.gia_polygon),
            ];
            for (kind, outline) in areas {
                if outline.is_empty() {
                    continue;
                }
                let Some(boundary) = self.polygon_loop(node, placement, outline) else {
                    continue;
                };
                if let Err(e) = self
                    .doc
                    .create_loop_boundary(kind, &boundary, handle, 0.0, None, &meta)
                {
                    self.record_failure(&e, &node.uuid);
                }
            }
        }
    }

    /// Single ground level for a site model.
    fn create_site_level(&mut self) {
        if self.ctx.levels.find(0.0).is_some() {
            return;
        }
        match self.doc.create_level(0.0, "00") {
            Ok(handle) => {
                self.ctx.register_level(0.0, handle, "00", false);
            }
            Err(e) => self.record_failure(&e, "site"),
        }
    }

    /// Walls enclosing a technical space, core or entrance are shared
    /// between rooms and merged after the pass.
    fn is_communal_wall(&self, key: NodeKey) -> bool {
        self.arena.ancestor_kind(key, 2) == Some(ElementKind::TechnicalSpace)
            || matches!(
                self.arena.ancestor_kind(key, 1),
                Some(ElementKind::Core | ElementKind::Entrance)
            )
    }

    fn is_communal_door(&self, key: NodeKey) -> bool {
        self.arena.ancestor_kind(key, 3) == Some(ElementKind::TechnicalSpace)
            || matches!(
                self.arena.ancestor_kind(key, 2),
                Some(ElementKind::Core | ElementKind::Entrance)
            )
    }

    /// Space the element at `depth` below it belongs to; modules are skipped.
    fn space_id(&self, key: NodeKey, depth: usize) -> Option<String> {
        let arena = self.arena;
        let owner = if arena.ancestor_kind(key, depth) == Some(ElementKind::Module) {
            arena.ancestor(key, depth + 1).ok()?
        } else {
            arena.ancestor(key, depth).ok()?
        };
        arena.node(owner).map(|n| n.uuid.clone())
    }

    fn create_wall(&mut self, key: NodeKey, node: &SceneNode, placement: &Placement) -> Result<()> {
        let Some(centerline) = self.centerline(node, placement) else {
            tracing::debug!(element = %node.uuid, "Degenerate wall centerline dropped");
            return Ok(());
        };
        let Some((level, base_offset)) =
            self.level_for(key, node, placement, &Vector3::zeros())?
        else {
            return Ok(());
        };
        if centerline.length() <= self.ctx.config.min_wall_length {
            tracing::debug!(
                element = %node.uuid,
                length = centerline.length(),
                "Wall too short to build"
            );
            return Ok(());
        }

        let spec = WallSpec {
            centerline,
            level,
            height: node.size.z,
            base_offset,
            type_ref: node.type_ref.clone(),
        };
        let meta = self.meta(key, node);
        match self.doc.create_wall(&spec, &meta) {
            Ok(handle) => {
                self.ctx.built_walls.insert(key, handle);
                self.ctx.walls_built += 1;
                self.count_created(node);
                if matches!(node.kind, ElementKind::Facade | ElementKind::Parapet) {
                    self.ctx.expand_bounds(&[centerline.start, centerline.end]);
                }
            }
            Err(e) => self.record_failure(&e, &node.uuid),
        }
        Ok(())
    }

    fn collect_communal_wall(
        &mut self,
        key: NodeKey,
        node: &SceneNode,
        placement: &Placement,
    ) -> Result<()> {
        let Some(space_id) = self.space_id(key, 1) else {
            return Ok(());
        };
        let Some(centerline) = self.centerline(node, placement) else {
            tracing::debug!(element = %node.uuid, "Degenerate wall centerline dropped");
            return Ok(());
        };
        let Some((level, base_offset)) =
            self.level_for(key, node, placement, &Vector3::zeros())?
        else {
            return Ok(());
        };

        let candidate = WallCandidate {
            centerline,
            level,
            height: node.size.z,
            base_offset,
            type_ref: node.type_ref.clone(),
            source: key,
            meta: self.meta(key, node),
        };
        self.ctx.communal_walls.push(&space_id, candidate);
        Ok(())
    }

    fn collect_communal_door(&mut self, key: NodeKey, node: &SceneNode, placement: &Placement) {
        let Some(space_id) = self.space_id(key, 2) else {
            return;
        };
        let candidate = DoorCandidate {
            position: self.project(&placement.world_instance_origin(node)),
            type_ref: node.type_ref.clone(),
            source: key,
            meta: self.meta(key, node),
        };
        self.ctx.communal_doors.push(&space_id, candidate);
    }

    /// Four bottom corners of the node's box as a closed loop.
    fn rectangle(&self, node: &SceneNode, placement: &Placement) -> Loop {
        let corners = [
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(1.0, 1.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
        ]
        .map(|t| self.project(&placement.world_pivot(node, &t)));
        close_loop(
            quad_segments(&corners),
            self.ctx.config.tolerances.loop_gap_tolerance,
        )
    }

    /// Floor, ceiling or roof. `top` selects the pivot height used to match
    /// the level: floors sit on their top face.
    fn create_slab(
        &mut self,
        key: NodeKey,
        node: &SceneNode,
        placement: &Placement,
        kind: BoundaryKind,
        profile: Loop,
        top: f64,
    ) -> Result<()> {
        let Some((level, offset)) =
            self.level_for(key, node, placement, &Vector3::new(0.0, 0.0, top))?
        else {
            return Ok(());
        };
        let meta = self.meta(key, node);
        match self.doc.create_loop_boundary(
            kind,
            &profile,
            level,
            offset,
            node.type_ref.as_ref(),
            &meta,
        ) {
            Ok(_) => self.count_created(node),
            Err(e) => self.record_failure(&e, &node.uuid),
        }
        Ok(())
    }

    /// Door or window on the wall built for its parent.
    fn create_hosted(&mut self, key: NodeKey, node: &SceneNode, placement: &Placement) {
        let host = node
            .parent()
            .and_then(|p| self.ctx.built_walls.get(&p).copied());
        let Some(host) = host else {
            let err = MaterializeError::NoHost(format!("{} {}", node.kind, node.uuid));
            self.record_failure(&err, &node.uuid);
            return;
        };

        let position = self.project(&placement.world_instance_origin(node));
        let meta = self.meta(key, node);
        match self.doc.create_hosted_instance(
            node.kind,
            node.type_ref.as_ref(),
            position,
            host,
            &meta,
        ) {
            Ok(_) => self.count_created(node),
            Err(e) => self.record_failure(&e, &node.uuid),
        }
    }

    fn create_room(&mut self, key: NodeKey, node: &SceneNode, placement: &Placement) -> Result<()> {
        let centre = self.project(&placement.world_pivot(node, &Vector3::new(0.5, 0.5, 0.0)));
        let shift = self.ctx.config.room_point_offset;
        let point = Point3::new(centre.x + shift, centre.y + shift, centre.z);

        // `data.level` indexes the registered levels in registration order.
        let level = match node.payload.level {
            Some(index) => {
                let found = self
                    .ctx
                    .levels
                    .iter()
                    .nth(index.max(0.0) as usize)
                    .map(|(_, h)| *h);
                if found.is_none() {
                    self.ctx.messages.push(format!(
                        "Level with index {index} does not exist. Element: {}",
                        node.uuid
                    ));
                }
                found
            }
            None => self
                .level_for(key, node, placement, &Vector3::zeros())?
                .map(|(h, _)| h),
        };
        let Some(level) = level else {
            return Ok(());
        };

        if self.ctx.level_info.get(&level).is_some_and(|(_, roof)| *roof) {
            tracing::debug!(element = %node.uuid, "No rooms on roof levels");
            return Ok(());
        }

        let name = capitalize(&node.tag);
        let meta = self.meta(key, node);
        match self.doc.create_room(level, point, &name, &meta) {
            Ok(_) => self.count_created(node),
            Err(e) => {
                self.record_failure(&e, &node.uuid);
                return Ok(());
            }
        }
        self.ctx
            .add_apartment_category(node.position.z.to_string(), &name);

        if !node.payload.polygon.is_empty() {
            if let Some(boundary) = self.polygon_loop(node, placement, &node.payload.polygon) {
                if let Err(e) = self.doc.create_loop_boundary(
                    BoundaryKind::Room,
                    &boundary,
                    level,
                    0.0,
                    None,
                    &meta,
                ) {
                    self.record_failure(&e, &node.uuid);
                }
            }
        }
        Ok(())
    }

    /// Box cut between the node's min and max corners through its parent wall.
    fn create_opening(&mut self, key: NodeKey, node: &SceneNode, placement: &Placement) {
        let host = node
            .parent()
            .and_then(|p| self.ctx.built_walls.get(&p).copied());
        let Some(host) = host else {
            let err = MaterializeError::NoHost(format!("{} {}", node.kind, node.uuid));
            self.record_failure(&err, &node.uuid);
            return;
        };

        // Facade openings are authored in world height; others relative to the level.
        let offset = if self.arena.ancestor_kind(key, 1) == Some(ElementKind::Facade) {
            0.0
        } else {
            -node.position.z
        };
        let corner = |t: Vector3<f64>| {
            let p = self.project(&placement.world_pivot(node, &t));
            Point3::new(p.x, p.y, p.z + offset)
        };
        let min = corner(Vector3::zeros());
        let max = corner(Vector3::new(1.0, 1.0, 1.0));

        let meta = self.meta(key, node);
        match self.doc.create_opening(host, min, max, &meta) {
            Ok(_) => self.count_created(node),
            Err(e) => self.record_failure(&e, &node.uuid),
        }
    }
}

/// First character uppercased.
fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("core"), "Core");
        assert_eq!(capitalize("TechnicalSpace"), "TechnicalSpace");
        assert_eq!(capitalize(""), "");
    }
}
