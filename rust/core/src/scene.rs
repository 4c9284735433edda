// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Arena-based scene tree.
//!
//! The [`SceneArena`] owns every node. A node refers to its parent by
//! [`NodeKey`] only, so the parent link is an id used to walk placement
//! chains, never an ownership edge. Children are stored as ordered keys.
//!
//! Import converts the authored Y-up document into the kernel's Z-up frame:
//!
//! | authored        | kernel                    |
//! |-----------------|---------------------------|
//! | `pos (x, y, z)` | `(x, -z, y)`              |
//! | `anchor`        | `(a0, 1 - a2, a1)`        |
//! | `size`          | `(s0, s2, s1)`            |
//! | `rot`           | `[r0, r2, r1]` (X, Y, Z)  |

use nalgebra::{Point3, Vector3};
use slotmap::{new_key_type, SlotMap};

use crate::error::{Error, Result};
use crate::kind::ElementKind;
use crate::schema::{RawData, RawLevel, RawNode};

new_key_type! {
    /// Key for a scene node.
    pub struct NodeKey;
}

/// Document type reference (`"category|type"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeRef {
    pub category: String,
    pub type_name: String,
}

impl TypeRef {
    pub fn parse(code: &str) -> Option<Self> {
        let (category, type_name) = code.split_once('|')?;
        Some(Self {
            category: category.to_string(),
            type_name: type_name.to_string(),
        })
    }
}

impl std::fmt::Display for TypeRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}|{}", self.category, self.type_name)
    }
}

/// A level definition in kernel coordinates.
#[derive(Debug, Clone)]
pub struct LevelDef {
    pub index: String,
    pub elevation: f64,
    pub is_roof: bool,
    /// Gross external area outline, in the owning node's local frame.
    pub gea_polygon: Vec<Point3<f64>>,
    /// Gross internal area outline, in the owning node's local frame.
    pub gia_polygon: Vec<Point3<f64>>,
}

impl LevelDef {
    /// Document name: zero-padded index, `_RF` suffix for roof levels.
    pub fn name(&self) -> String {
        if self.is_roof {
            format!("{:0>2}_RF", self.index)
        } else {
            format!("{:0>2}", self.index)
        }
    }
}

/// Per-type payload in kernel coordinates.
#[derive(Debug, Clone, Default)]
pub struct Payload {
    pub levels: Vec<LevelDef>,
    pub level: Option<f64>,
    pub category: Option<String>,
    /// Outline in the node's local frame.
    pub polygon: Vec<Point3<f64>>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// A scene node with its local placement in kernel coordinates.
#[derive(Debug, Clone)]
pub struct SceneNode {
    pub name: String,
    pub kind: ElementKind,
    /// Tag as authored, kept for messages about unknown kinds.
    pub tag: String,
    pub uuid: String,
    pub type_ref: Option<TypeRef>,
    pub position: Vector3<f64>,
    /// Rotation about kernel X, Y, Z in degrees.
    pub rotation: [f64; 3],
    pub size: Vector3<f64>,
    /// Placement origin inside the local bounding box, in `[0, 1]^3`.
    pub anchor: Vector3<f64>,
    pub payload: Payload,
    parent: Option<NodeKey>,
    children: Vec<NodeKey>,
}

impl SceneNode {
    /// Creates a node of the given kind with identity placement.
    pub fn new(kind: ElementKind) -> Self {
        Self {
            name: String::new(),
            kind,
            tag: kind.as_str().to_string(),
            uuid: String::new(),
            type_ref: None,
            position: Vector3::zeros(),
            rotation: [0.0; 3],
            size: Vector3::zeros(),
            anchor: Vector3::zeros(),
            payload: Payload::default(),
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn with_placement(
        mut self,
        position: Vector3<f64>,
        rotation: [f64; 3],
        size: Vector3<f64>,
        anchor: Vector3<f64>,
    ) -> Self {
        self.position = position;
        self.rotation = rotation;
        self.size = size;
        self.anchor = anchor;
        self
    }

    pub fn parent(&self) -> Option<NodeKey> {
        self.parent
    }

    pub fn children(&self) -> &[NodeKey] {
        &self.children
    }

    fn from_raw(raw: &RawNode) -> Result<Self> {
        let [px, py, pz] = vec3("pos", &raw.pos, [0.0; 3])?;
        let [rx, ry, rz] = vec3("rot", &raw.rot, [0.0; 3])?;
        let [sx, sy, sz] = vec3("size", &raw.size, [0.0; 3])?;
        let [ax, ay, az] = vec3("anchor", &raw.anchor, [0.0; 3])?;

        Ok(Self {
            name: raw.name.clone(),
            kind: ElementKind::from_tag(&raw.kind),
            tag: raw.kind.clone(),
            uuid: raw.uuid.clone(),
            type_ref: raw.modulous_id.as_deref().and_then(TypeRef::parse),
            position: Vector3::new(px, -pz, py),
            rotation: [rx, rz, ry],
            size: Vector3::new(sx, sz, sy),
            anchor: Vector3::new(ax, 1.0 - az, ay),
            payload: raw
                .data
                .as_ref()
                .map(payload_from_raw)
                .transpose()?
                .unwrap_or_default(),
            parent: None,
            children: Vec::new(),
        })
    }
}

/// Owner of all scene nodes.
#[derive(Debug, Default)]
pub struct SceneArena {
    nodes: SlotMap<NodeKey, SceneNode>,
    root: Option<NodeKey>,
}

impl SceneArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the arena from an authored document.
    ///
    /// Apartments are expanded from the root's templates (when any are
    /// defined) and muscle units are pruned before nodes are inserted.
    pub fn from_raw(mut raw: RawNode) -> Result<Self> {
        if raw.kind.is_empty() && raw.children.is_empty() {
            return Err(Error::EmptyScene);
        }

        let templates = std::mem::take(&mut raw.templates);
        if !templates.is_empty() {
            use_templates(&mut raw, &templates)?;
        }
        remove_muscle_units(&mut raw);

        let mut arena = Self::new();
        let mut stack: Vec<(&RawNode, Option<NodeKey>)> = vec![(&raw, None)];
        while let Some((node, parent)) = stack.pop() {
            let key = arena.insert(SceneNode::from_raw(node)?, parent)?;
            // Reverse so children are inserted in authored order.
            for child in node.children.iter().rev() {
                stack.push((child, Some(key)));
            }
        }
        Ok(arena)
    }

    /// Inserts a node under `parent`, or as the root when `parent` is `None`
    /// and no root exists yet.
    pub fn insert(&mut self, mut node: SceneNode, parent: Option<NodeKey>) -> Result<NodeKey> {
        if let Some(p) = parent {
            if !self.nodes.contains_key(p) {
                return Err(Error::NodeNotFound(p));
            }
        }

        node.parent = parent;
        node.children.clear();
        let key = self.nodes.insert(node);

        match parent {
            Some(p) => self.nodes[p].children.push(key),
            None => {
                if self.root.is_none() {
                    self.root = Some(key);
                }
            }
        }
        Ok(key)
    }

    /// Removes a single node. Its children keep their (now dangling) parent
    /// key, so placement walks through them report a broken hierarchy.
    pub fn remove(&mut self, key: NodeKey) -> Option<SceneNode> {
        let node = self.nodes.remove(key)?;
        if let Some(p) = node.parent {
            if let Some(parent) = self.nodes.get_mut(p) {
                parent.children.retain(|&c| c != key);
            }
        }
        if self.root == Some(key) {
            self.root = None;
        }
        Some(node)
    }

    pub fn root(&self) -> Option<NodeKey> {
        self.root
    }

    pub fn node(&self, key: NodeKey) -> Option<&SceneNode> {
        self.nodes.get(key)
    }

    /// Returns the node or [`Error::NodeNotFound`].
    pub fn get(&self, key: NodeKey) -> Result<&SceneNode> {
        self.nodes.get(key).ok_or(Error::NodeNotFound(key))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterates resolvable ancestors, nearest first. Stops at the root or at
    /// the first dangling parent key.
    pub fn ancestors(&self, key: NodeKey) -> Ancestors<'_> {
        Ancestors {
            arena: self,
            next: self.nodes.get(key).and_then(|n| n.parent),
        }
    }

    /// Ancestor at `depth` (1 = parent, 2 = grandparent, ...).
    pub fn ancestor(&self, key: NodeKey, depth: usize) -> Result<NodeKey> {
        let mut current = key;
        for _ in 0..depth {
            current = self
                .get(current)?
                .parent
                .filter(|p| self.nodes.contains_key(*p))
                .ok_or(Error::BrokenHierarchy { node: key, depth })?;
        }
        Ok(current)
    }

    /// Kind of the ancestor at `depth`, or `None` when the chain is shorter.
    pub fn ancestor_kind(&self, key: NodeKey, depth: usize) -> Option<ElementKind> {
        self.ancestor(key, depth)
            .ok()
            .and_then(|k| self.nodes.get(k))
            .map(|n| n.kind)
    }

    /// Nearest ancestor of the given kind.
    pub fn nearest_ancestor_of_kind(&self, key: NodeKey, kind: ElementKind) -> Option<NodeKey> {
        self.ancestors(key)
            .find(|&a| self.nodes.get(a).is_some_and(|n| n.kind == kind))
    }

    /// Pre-order traversal from the root: every parent precedes its children.
    pub fn depth_first(&self) -> Vec<NodeKey> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<NodeKey> = self.root.into_iter().collect();
        while let Some(key) = stack.pop() {
            order.push(key);
            if let Some(node) = self.nodes.get(key) {
                stack.extend(node.children.iter().rev().copied());
            }
        }
        order
    }
}

/// Iterator over a node's ancestors.
pub struct Ancestors<'a> {
    arena: &'a SceneArena,
    next: Option<NodeKey>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeKey;

    fn next(&mut self) -> Option<NodeKey> {
        let key = self.next?;
        let node = self.arena.nodes.get(key)?;
        self.next = node.parent;
        Some(key)
    }
}

/// Converts an authored Y-up vertex into kernel coordinates.
pub fn convert_vertex(v: &[f64]) -> Result<Point3<f64>> {
    let [x, y, z] = vec3("polygon", v, [0.0; 3])?;
    Ok(Point3::new(x, -z, y))
}

fn vec3(field: &'static str, values: &[f64], default: [f64; 3]) -> Result<[f64; 3]> {
    match values.len() {
        0 => Ok(default),
        3 => Ok([values[0], values[1], values[2]]),
        found => Err(Error::InvalidVector {
            field,
            expected: 3,
            found,
        }),
    }
}

fn convert_polygon(vertices: &[Vec<f64>]) -> Result<Vec<Point3<f64>>> {
    vertices.iter().map(|v| convert_vertex(v)).collect()
}

fn payload_from_raw(data: &RawData) -> Result<Payload> {
    Ok(Payload {
        levels: data
            .levels
            .iter()
            .map(level_from_raw)
            .collect::<Result<Vec<_>>>()?,
        level: data.level,
        category: data.category.clone(),
        polygon: convert_polygon(&data.polygon)?,
        latitude: data.latitude,
        longitude: data.longitude,
    })
}

fn level_from_raw(level: &RawLevel) -> Result<LevelDef> {
    Ok(LevelDef {
        index: level.level_index.clone(),
        elevation: level.elevation(),
        is_roof: level.is_roof,
        gea_polygon: convert_polygon(level.gea_polygon.as_deref().unwrap_or_default())?,
        gia_polygon: convert_polygon(level.gia_polygon.as_deref().unwrap_or_default())?,
    })
}

/// Replaces apartment children with those of the matching template.
fn use_templates(node: &mut RawNode, templates: &[RawNode]) -> Result<()> {
    if node.kind == ElementKind::Apartment.as_str() {
        let template = templates
            .iter()
            .find(|t| t.name == node.name)
            .ok_or_else(|| Error::MissingTemplate(node.name.clone()))?;
        node.children = template.children.clone();
        return Ok(());
    }
    for child in &mut node.children {
        use_templates(child, templates)?;
    }
    Ok(())
}

fn remove_muscle_units(node: &mut RawNode) {
    node.children
        .retain(|c| !c.data.as_ref().is_some_and(|d| d.dto_muscle_unit));
    for child in &mut node.children {
        remove_muscle_units(child);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::parse_scene;
    use approx::assert_relative_eq;

    fn scene(json: &str) -> SceneArena {
        SceneArena::from_raw(parse_scene(json).unwrap()).unwrap()
    }

    #[test]
    fn test_axis_conversion() {
        let arena = scene(
            r#"{"type": "Wall", "pos": [1, 2, 3], "rot": [10, 20, 30],
                "size": [4, 5, 6], "anchor": [0.1, 0.2, 0.3]}"#,
        );
        let node = arena.node(arena.root().unwrap()).unwrap();
        assert_relative_eq!(node.position, Vector3::new(1.0, -3.0, 2.0));
        assert_eq!(node.rotation, [10.0, 30.0, 20.0]);
        assert_relative_eq!(node.size, Vector3::new(4.0, 6.0, 5.0));
        assert_relative_eq!(node.anchor, Vector3::new(0.1, 0.7, 0.2), epsilon = 1e-12);
    }

    #[test]
    fn test_invalid_vector_rejected() {
        let raw = parse_scene(r#"{"type": "Wall", "pos": [1, 2]}"#).unwrap();
        let err = SceneArena::from_raw(raw).unwrap_err();
        assert!(matches!(err, Error::InvalidVector { field: "pos", found: 2, .. }));
    }

    #[test]
    fn test_empty_scene_rejected() {
        let raw = parse_scene("{}").unwrap();
        assert!(matches!(SceneArena::from_raw(raw), Err(Error::EmptyScene)));
    }

    #[test]
    fn test_depth_first_is_parent_before_child_in_authored_order() {
        let arena = scene(
            r#"{"type": "Site", "name": "s", "children": [
                {"type": "Building", "name": "b1", "children": [{"type": "Wall", "name": "w"}]},
                {"type": "Building", "name": "b2"}
            ]}"#,
        );
        let names: Vec<_> = arena
            .depth_first()
            .into_iter()
            .map(|k| arena.node(k).unwrap().name.clone())
            .collect();
        assert_eq!(names, ["s", "b1", "w", "b2"]);
    }

    #[test]
    fn test_templates_replace_apartment_children() {
        let arena = scene(
            r#"{"type": "Site", "children": [
                {"type": "Apartment", "name": "T1", "children": [{"type": "Wall", "name": "stale"}]}
            ], "templates": [
                {"type": "Apartment", "name": "T1", "children": [
                    {"type": "Wall", "name": "a"}, {"type": "Door", "name": "b"}
                ]}
            ]}"#,
        );
        let apartment = arena.children_of_root()[0];
        let names: Vec<_> = arena
            .node(apartment)
            .unwrap()
            .children()
            .iter()
            .map(|&k| arena.node(k).unwrap().name.clone())
            .collect();
        assert_eq!(names, ["a", "b"]);
    }

    #[test]
    fn test_missing_template_is_an_error() {
        let raw = parse_scene(
            r#"{"type": "Site", "children": [{"type": "Apartment", "name": "X"}],
                "templates": [{"type": "Apartment", "name": "Y"}]}"#,
        )
        .unwrap();
        assert!(matches!(SceneArena::from_raw(raw), Err(Error::MissingTemplate(n)) if n == "X"));
    }

    #[test]
    fn test_muscle_units_are_pruned() {
        let arena = scene(
            r#"{"type": "Building", "children": [
                {"type": "Module", "data": {"dtoMuscleUnit": true}, "children": [{"type": "Wall"}]},
                {"type": "Module"}
            ]}"#,
        );
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn test_ancestor_queries() {
        let arena = scene(
            r#"{"type": "Building", "name": "B", "children": [
                {"type": "Core", "children": [{"type": "Wall", "children": [{"type": "Door"}]}]}
            ]}"#,
        );
        let order = arena.depth_first();
        let door = order[3];
        assert_eq!(arena.ancestor_kind(door, 1), Some(ElementKind::Wall));
        assert_eq!(arena.ancestor_kind(door, 2), Some(ElementKind::Core));
        assert_eq!(arena.ancestor_kind(door, 4), None);
        assert!(matches!(
            arena.ancestor(door, 4),
            Err(Error::BrokenHierarchy { depth: 4, .. })
        ));
        let building = arena.nearest_ancestor_of_kind(door, ElementKind::Building).unwrap();
        assert_eq!(arena.node(building).unwrap().name, "B");
        assert_eq!(arena.ancestors(door).count(), 3);
    }

    #[test]
    fn test_remove_leaves_dangling_parent() {
        let mut arena = SceneArena::new();
        let root = arena.insert(SceneNode::new(ElementKind::Site), None).unwrap();
        let mid = arena.insert(SceneNode::new(ElementKind::Building), Some(root)).unwrap();
        let leaf = arena.insert(SceneNode::new(ElementKind::Wall), Some(mid)).unwrap();

        arena.remove(mid);
        assert!(arena.node(root).unwrap().children().is_empty());
        assert_eq!(arena.node(leaf).unwrap().parent(), Some(mid));
        assert!(matches!(
            arena.ancestor(leaf, 1),
            Err(Error::BrokenHierarchy { depth: 1, .. })
        ));
    }

    #[test]
    fn test_level_names_and_polygon_conversion() {
        let arena = scene(
            r#"{"type": "Building", "data": {"levels": [
                {"FFL": 0, "levelIndex": 1},
                {"FFL": 9, "levelIndex": 4, "isRoof": true, "GIAPolygon": [[1, 2, 3]]}
            ]}}"#,
        );
        let levels = &arena.node(arena.root().unwrap()).unwrap().payload.levels;
        assert_eq!(levels[0].name(), "01");
        assert_eq!(levels[1].name(), "04_RF");
        assert_relative_eq!(levels[1].gia_polygon[0], Point3::new(1.0, -3.0, 2.0));
    }

    #[test]
    fn test_type_ref_parse() {
        let t = TypeRef::parse("WAL|EXT-01").unwrap();
        assert_eq!(t.category, "WAL");
        assert_eq!(t.type_name, "EXT-01");
        assert_eq!(t.to_string(), "WAL|EXT-01");
        assert!(TypeRef::parse("nopipe").is_none());
    }

    impl SceneArena {
        fn children_of_root(&self) -> Vec<NodeKey> {
            self.node(self.root().unwrap()).unwrap().children().to_vec()
        }
    }
}
