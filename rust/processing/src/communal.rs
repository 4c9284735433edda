// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Post-pass for walls and doors shared between spaces.

use scene2cad_core::ElementKind;
use scene2cad_geometry::{merge_communal_walls, select_door_host, Segment};

use crate::materializer::{MaterializeError, Materializer, WallSpec};
use crate::pipeline::Pipeline;

impl<M: Materializer> Pipeline<'_, M> {
    /// Merges each space's wall candidates and builds the result, spaces in
    /// order of first appearance.
    pub(crate) fn build_communal_walls(&mut self) {
        for (space_id, candidates) in self.ctx.communal_walls.take() {
            let centerlines: Vec<Segment> = candidates.iter().map(|c| c.centerline).collect();
            let merged = merge_communal_walls(&centerlines, &self.ctx.config.tolerances);
            tracing::debug!(
                space_id = %space_id,
                candidates = candidates.len(),
                merged = merged.len(),
                "Merged communal walls"
            );

            for wall in merged {
                let length = wall.centerline.length();
                if length < self.ctx.config.min_centerline_length {
                    continue;
                }
                let source = &candidates[wall.source];

                if wall.synthesized {
                    tracing::warn!(
                        space_id = %space_id,
                        length,
                        after = ?source.source,
                        "Synthesized wall segment bridging a gap"
                    );
                    if !self.ctx.config.bridge_wall_gaps {
                        self.ctx.synthesized_walls_skipped += 1;
                        self.ctx.messages.push(format!(
                            "Gap of {length:.3} between walls of space {space_id} was not bridged"
                        ));
                        continue;
                    }
                }

                let spec = WallSpec {
                    centerline: wall.centerline,
                    level: source.level,
                    height: source.height,
                    base_offset: source.base_offset,
                    type_ref: source.type_ref.clone(),
                };
                match self.doc.create_wall(&spec, &source.meta) {
                    Ok(handle) => {
                        self.ctx
                            .built_communal
                            .entry(space_id.clone())
                            .or_default()
                            .push((wall.centerline, handle));
                        self.ctx.walls_built += 1;
                        self.ctx.communal_walls_built += 1;
                        self.ctx.count_created(ElementKind::Wall.as_str());
                    }
                    Err(e) => self.record_failure(&e, &source.meta.uuid),
                }
            }
        }
    }

    /// Hosts every communal door on the nearest built wall of its space.
    pub(crate) fn build_communal_doors(&mut self) {
        for (space_id, doors) in self.ctx.communal_doors.take() {
            let walls = self
                .ctx
                .built_communal
                .get(&space_id)
                .cloned()
                .unwrap_or_default();
            let centerlines: Vec<Segment> = walls.iter().map(|(s, _)| *s).collect();

            for door in doors {
                let Some(index) = select_door_host(&centerlines, &door.position) else {
                    let err = MaterializeError::NoHost(format!("Door {}", door.meta.uuid));
                    self.record_failure(&err, &door.meta.uuid);
                    continue;
                };
                let host = walls[index].1;
                tracing::debug!(space_id = %space_id, door = ?door.source, "Hosting communal door");
                match self.doc.create_hosted_instance(
                    ElementKind::Door,
                    door.type_ref.as_ref(),
                    door.position,
                    host,
                    &door.meta,
                ) {
                    Ok(_) => self.ctx.count_created(ElementKind::Door.as_str()),
                    Err(e) => self.record_failure(&e, &door.meta.uuid),
                }
            }
        }
    }
}
