// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Element materializer boundary.
//!
//! The pipeline hands finished geometry to a [`Materializer`], which owns the
//! target document. Any call may fail with a [`MaterializeError`]; the
//! pipeline records the failure and moves on to the next element.
//!
//! [`RecordingMaterializer`] is an in-memory document that records every
//! call, used by the CLI and tests.

use nalgebra::Point3;
use rustc_hash::FxHashSet;
use scene2cad_core::{ElementKind, TypeRef};
use scene2cad_geometry::{Loop, Segment};
use serde::{Deserialize, Serialize};
use thiserror::Error;

macro_rules! handle_type {
    ($($name:ident),* $(,)?) => {
        $(
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
            #[serde(transparent)]
            pub struct $name(pub u32);
        )*
    };
}

handle_type!(LevelHandle, WallHandle, RoomHandle, BoundaryHandle, InstanceHandle, OpeningHandle);

/// Failure reported by the target document for a single element.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MaterializeError {
    #[error("Type of {kind} with Code: Category {category} and Code: Type {type_name} does not exist")]
    MissingType {
        kind: ElementKind,
        category: String,
        type_name: String,
    },

    #[error("{0}")]
    Rejected(String),

    #[error("No host wall for {0}")]
    NoHost(String),
}

/// What a loop boundary represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryKind {
    Floor,
    Ceiling,
    Roof,
    /// Gross external area plan boundary.
    GrossExternalArea,
    /// Gross internal area plan boundary.
    GrossInternalArea,
    /// Separation lines for a communal room.
    Room,
}

/// Attributes stamped on every created element.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementMeta {
    pub uuid: String,
    /// Name of the nearest enclosing building.
    pub building: Option<String>,
}

/// A wall to build.
#[derive(Debug, Clone, PartialEq)]
pub struct WallSpec {
    pub centerline: Segment,
    pub level: LevelHandle,
    pub height: f64,
    pub base_offset: f64,
    pub type_ref: Option<TypeRef>,
}

/// A level already present in the target document.
#[derive(Debug, Clone, PartialEq)]
pub struct ExistingLevel {
    pub elevation: f64,
    pub name: String,
    pub handle: LevelHandle,
}

pub type MaterializeResult<T> = std::result::Result<T, MaterializeError>;

/// Target document operations used by the pipeline.
pub trait Materializer {
    /// Levels the document holds before the run starts.
    fn existing_levels(&self) -> Vec<ExistingLevel>;

    /// Document level within `tolerance` of `elevation`, if any.
    fn find_level(&self, elevation: f64, tolerance: f64) -> Option<LevelHandle> {
        self.existing_levels()
            .into_iter()
            .find(|l| (l.elevation - elevation).abs() <= tolerance)
            .map(|l| l.handle)
    }

    fn create_level(&mut self, elevation: f64, name: &str) -> MaterializeResult<LevelHandle>;

    fn create_wall(&mut self, wall: &WallSpec, meta: &ElementMeta) -> MaterializeResult<WallHandle>;

    fn create_room(
        &mut self,
        level: LevelHandle,
        point: Point3<f64>,
        name: &str,
        meta: &ElementMeta,
    ) -> MaterializeResult<RoomHandle>;

    fn create_loop_boundary(
        &mut self,
        kind: BoundaryKind,
        boundary: &Loop,
        level: LevelHandle,
        offset: f64,
        type_ref: Option<&TypeRef>,
        meta: &ElementMeta,
    ) -> MaterializeResult<BoundaryHandle>;

    /// Door or window hosted on a wall; the instance takes the wall's level.
    fn create_hosted_instance(
        &mut self,
        kind: ElementKind,
        type_ref: Option<&TypeRef>,
        position: Point3<f64>,
        host: WallHandle,
        meta: &ElementMeta,
    ) -> MaterializeResult<InstanceHandle>;

    /// Cuts a box-shaped opening between two corners through a wall.
    fn create_opening(
        &mut self,
        host: WallHandle,
        min: Point3<f64>,
        max: Point3<f64>,
        meta: &ElementMeta,
    ) -> MaterializeResult<OpeningHandle>;
}

/// One recorded document operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "element", rename_all = "snake_case")]
pub enum Recorded {
    Level {
        handle: LevelHandle,
        elevation: f64,
        name: String,
    },
    Wall {
        handle: WallHandle,
        start: [f64; 3],
        end: [f64; 3],
        level: LevelHandle,
        height: f64,
        base_offset: f64,
        type_ref: Option<String>,
        meta: ElementMeta,
    },
    Room {
        handle: RoomHandle,
        level: LevelHandle,
        point: [f64; 3],
        name: String,
        meta: ElementMeta,
    },
    Boundary {
        handle: BoundaryHandle,
        kind: BoundaryKind,
        vertices: Vec<[f64; 3]>,
        level: LevelHandle,
        offset: f64,
        type_ref: Option<String>,
        meta: ElementMeta,
    },
    Instance {
        handle: InstanceHandle,
        kind: ElementKind,
        position: [f64; 3],
        host: WallHandle,
        level: Option<LevelHandle>,
        type_ref: Option<String>,
        meta: ElementMeta,
    },
    Opening {
        handle: OpeningHandle,
        host: WallHandle,
        min: [f64; 3],
        max: [f64; 3],
        meta: ElementMeta,
    },
}

/// In-memory document recording every operation in call order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RecordingMaterializer {
    #[serde(skip)]
    existing: Vec<ExistingLevel>,
    /// Known `category|type` codes. `None` accepts any type.
    #[serde(skip)]
    available_types: Option<FxHashSet<String>>,
    next_handle: u32,
    pub records: Vec<Recorded>,
}

impl RecordingMaterializer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Document that already contains levels at the given elevations.
    pub fn with_existing_levels<I>(mut self, elevations: I) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        for elevation in elevations {
            let handle = LevelHandle(self.next_id());
            self.existing.push(ExistingLevel {
                elevation,
                name: format!("Existing {elevation:.3}"),
                handle,
            });
        }
        self
    }

    /// Restricts typed elements to the given `category|type` codes.
    pub fn with_available_types<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.available_types = Some(codes.into_iter().map(Into::into).collect());
        self
    }

    pub fn walls(&self) -> impl Iterator<Item = &Recorded> {
        self.records
            .iter()
            .filter(|r| matches!(r, Recorded::Wall { .. }))
    }

    pub fn levels(&self) -> impl Iterator<Item = &Recorded> {
        self.records
            .iter()
            .filter(|r| matches!(r, Recorded::Level { .. }))
    }

    fn next_id(&mut self) -> u32 {
        self.next_handle += 1;
        self.next_handle
    }

    fn check_type(&self, kind: ElementKind, type_ref: Option<&TypeRef>) -> MaterializeResult<()> {
        let Some(available) = &self.available_types else {
            return Ok(());
        };
        match type_ref {
            Some(t) if available.contains(&t.to_string()) => Ok(()),
            other => Err(MaterializeError::MissingType {
                kind,
                category: other.map(|t| t.category.clone()).unwrap_or_default(),
                type_name: other.map(|t| t.type_name.clone()).unwrap_or_default(),
            }),
        }
    }

    fn wall_level(&self, wall: WallHandle) -> Option<LevelHandle> {
        self.records.iter().find_map(|r| match r {
            Recorded::Wall { handle, level, .. } if *handle == wall => Some(*level),
            _ => None,
        })
    }
}

impl Materializer for RecordingMaterializer {
    fn existing_levels(&self) -> Vec<ExistingLevel> {
        self.existing.clone()
    }

    fn create_level(&mut self, elevation: f64, name: &str) -> MaterializeResult<LevelHandle> {
        let handle = LevelHandle(self.next_id());
        self.records.push(Recorded::Level {
            handle,
            elevation,
            name: name.to_string(),
        });
        Ok(handle)
    }

    fn create_wall(&mut self, wall: &WallSpec, meta: &ElementMeta) -> MaterializeResult<WallHandle> {
        self.check_type(ElementKind::Wall, wall.type_ref.as_ref())?;
        let handle = WallHandle(self.next_id());
        self.records.push(Recorded::Wall {
            handle,
            start: to_array(&wall.centerline.start),
            end: to_array(&wall.centerline.end),
            level: wall.level,
            height: wall.height,
            base_offset: wall.base_offset,
            type_ref: wall.type_ref.as_ref().map(ToString::to_string),
            meta: meta.clone(),
        });
        Ok(handle)
    }

    fn create_room(
        &mut self,
        level: LevelHandle,
        point: Point3<f64>,
        name: &str,
        meta: &ElementMeta,
    ) -> MaterializeResult<RoomHandle> {
        let handle = RoomHandle(self.next_id());
        self.records.push(Recorded::Room {
            handle,
            level,
            point: to_array(&point),
            name: name.to_string(),
            meta: meta.clone(),
        });
        Ok(handle)
    }

    fn create_loop_boundary(
        &mut self,
        kind: BoundaryKind,
        boundary: &Loop,
        level: LevelHandle,
        offset: f64,
        type_ref: Option<&TypeRef>,
        meta: &ElementMeta,
    ) -> MaterializeResult<BoundaryHandle> {
        let element_kind = match kind {
            BoundaryKind::Floor => Some(ElementKind::Floor),
            BoundaryKind::Ceiling => Some(ElementKind::Ceiling),
            BoundaryKind::Roof => Some(ElementKind::Roof),
            _ => None,
        };
        if let Some(k) = element_kind {
            self.check_type(k, type_ref)?;
        }
        if boundary.len() < 3 {
            return Err(MaterializeError::Rejected(format!(
                "{kind:?} boundary needs at least 3 segments, got {}",
                boundary.len()
            )));
        }

        let handle = BoundaryHandle(self.next_id());
        self.records.push(Recorded::Boundary {
            handle,
            kind,
            vertices: boundary.vertices().iter().map(to_array).collect(),
            level,
            offset,
            type_ref: type_ref.map(ToString::to_string),
            meta: meta.clone(),
        });
        Ok(handle)
    }

    fn create_hosted_instance(
        &mut self,
        kind: ElementKind,
        type_ref: Option<&TypeRef>,
        position: Point3<f64>,
        host: WallHandle,
        meta: &ElementMeta,
    ) -> MaterializeResult<InstanceHandle> {
        self.check_type(kind, type_ref)?;
        let level = self.wall_level(host);
        let handle = InstanceHandle(self.next_id());
        self.records.push(Recorded::Instance {
            handle,
            kind,
            position: to_array(&position),
            host,
            level,
            type_ref: type_ref.map(ToString::to_string),
            meta: meta.clone(),
        });
        Ok(handle)
    }

    fn create_opening(
        &mut self,
        host: WallHandle,
        min: Point3<f64>,
        max: Point3<f64>,
        meta: &ElementMeta,
    ) -> MaterializeResult<OpeningHandle> {
        let handle = OpeningHandle(self.next_id());
        self.records.push(Recorded::Opening {
            handle,
            host,
            min: to_array(&min),
            max: to_array(&max),
            meta: meta.clone(),
        });
        Ok(handle)
    }
}

fn to_array(p: &Point3<f64>) -> [f64; 3] {
    [p.x, p.y, p.z]
}

#[cfg(test)]
mod tests {
    use super::*;
    use scene2cad_geometry::quad_segments;

    fn square() -> Loop {
        Loop::new(quad_segments(&[
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ]))
    }

    #[test]
    fn test_existing_levels_are_found_within_tolerance() {
        let doc = RecordingMaterializer::new().with_existing_levels([0.0, 3.0]);
        assert_eq!(doc.existing_levels().len(), 2);
        assert!(doc.find_level(3.0004, 0.001).is_some());
        assert!(doc.find_level(1.5, 0.001).is_none());
    }

    #[test]
    fn test_available_types_gate_typed_elements() {
        let mut doc = RecordingMaterializer::new().with_available_types(["WAL|A"]);
        let level = doc.create_level(0.0, "00").unwrap();
        let mut spec = WallSpec {
            centerline: Segment::new(Point3::origin(), Point3::new(1.0, 0.0, 0.0)),
            level,
            height: 3.0,
            base_offset: 0.0,
            type_ref: TypeRef::parse("WAL|A"),
        };
        assert!(doc.create_wall(&spec, &ElementMeta::default()).is_ok());

        spec.type_ref = TypeRef::parse("WAL|B");
        let err = doc.create_wall(&spec, &ElementMeta::default()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Type of Wall with Code: Category WAL and Code: Type B does not exist"
        );

        // Area boundaries are untyped.
        assert!(doc
            .create_loop_boundary(
                BoundaryKind::GrossExternalArea,
                &square(),
                level,
                0.0,
                None,
                &ElementMeta::default()
            )
            .is_ok());
    }

    #[test]
    fn test_hosted_instance_takes_wall_level() {
        let mut doc = RecordingMaterializer::new();
        let level = doc.create_level(3.0, "01").unwrap();
        let wall = doc
            .create_wall(
                &WallSpec {
                    centerline: Segment::new(Point3::origin(), Point3::new(2.0, 0.0, 0.0)),
                    level,
                    height: 3.0,
                    base_offset: 0.0,
                    type_ref: None,
                },
                &ElementMeta::default(),
            )
            .unwrap();
        doc.create_hosted_instance(
            ElementKind::Door,
            None,
            Point3::new(1.0, 0.0, 0.0),
            wall,
            &ElementMeta::default(),
        )
        .unwrap();

        match doc.records.last().unwrap() {
            Recorded::Instance { level: l, host, .. } => {
                assert_eq!(*l, Some(level));
                assert_eq!(*host, wall);
            }
            other => panic!("unexpected record {other:?}"),
        }
    }

    #[test]
    fn test_degenerate_boundary_rejected() {
        let mut doc = RecordingMaterializer::new();
        let level = doc.create_level(0.0, "00").unwrap();
        let open = Loop::new(square().segments()[..2].to_vec());
        assert!(matches!(
            doc.create_loop_boundary(
                BoundaryKind::Floor,
                &open,
                level,
                0.0,
                None,
                &ElementMeta::default()
            ),
            Err(MaterializeError::Rejected(_))
        ));
    }
}
