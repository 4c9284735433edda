// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Element kinds
//!
//! Type tags are resolved once at import through [`KIND_TABLE`] so the
//! pipeline can dispatch with an exhaustive `match` instead of comparing
//! strings at every step.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of element kinds the authoring tool emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementKind {
    // Containers
    World,
    Site,
    Zone,
    Plot,
    Building,
    Apartment,
    Module,
    Balcony,

    // Shared spaces
    Core,
    Corridor,
    TechnicalSpace,
    Entrance,

    // Buildable elements
    Levels,
    Wall,
    Parapet,
    Facade,
    Floor,
    Ceiling,
    Roof,
    Door,
    Window,
    Opening,
    Room,
    Beam,
    Column,

    /// Tag not present in the table; the original tag stays on the node.
    Unknown,
}

/// Tag → kind lookup table. Tags are matched exactly.
pub const KIND_TABLE: &[(&str, ElementKind)] = &[
    ("World", ElementKind::World),
    ("Site", ElementKind::Site),
    ("Zone", ElementKind::Zone),
    ("Plot", ElementKind::Plot),
    ("Building", ElementKind::Building),
    ("Apartment", ElementKind::Apartment),
    ("Module", ElementKind::Module),
    ("Balcony", ElementKind::Balcony),
    ("Core", ElementKind::Core),
    ("Corridor", ElementKind::Corridor),
    ("TechnicalSpace", ElementKind::TechnicalSpace),
    ("Entrance", ElementKind::Entrance),
    ("Levels", ElementKind::Levels),
    ("Wall", ElementKind::Wall),
    ("Parapet", ElementKind::Parapet),
    ("Facade", ElementKind::Facade),
    ("Floor", ElementKind::Floor),
    ("Ceiling", ElementKind::Ceiling),
    ("Roof", ElementKind::Roof),
    ("Door", ElementKind::Door),
    ("Window", ElementKind::Window),
    ("Opening", ElementKind::Opening),
    ("Room", ElementKind::Room),
    ("Beam", ElementKind::Beam),
    ("Column", ElementKind::Column),
];

impl ElementKind {
    /// Resolve a type tag, falling back to [`ElementKind::Unknown`].
    pub fn from_tag(tag: &str) -> Self {
        KIND_TABLE
            .iter()
            .find(|(name, _)| *name == tag)
            .map(|(_, kind)| *kind)
            .unwrap_or(ElementKind::Unknown)
    }

    pub fn as_str(&self) -> &'static str {
        KIND_TABLE
            .iter()
            .find(|(_, kind)| kind == self)
            .map(|(name, _)| *name)
            .unwrap_or("Unknown")
    }

    /// Kinds that produce an entity in the target document.
    pub fn is_instantiable(&self) -> bool {
        matches!(
            self,
            ElementKind::Levels
                | ElementKind::Wall
                | ElementKind::Parapet
                | ElementKind::Facade
                | ElementKind::Floor
                | ElementKind::Ceiling
                | ElementKind::Roof
                | ElementKind::Door
                | ElementKind::Window
                | ElementKind::Opening
                | ElementKind::Room
                | ElementKind::Beam
                | ElementKind::Column
        )
    }

    /// Shared spaces that become rooms and host communal walls.
    pub fn is_room_space(&self) -> bool {
        matches!(
            self,
            ElementKind::TechnicalSpace
                | ElementKind::Core
                | ElementKind::Entrance
                | ElementKind::Corridor
        )
    }

    /// Containers whose own `level` payload applies directly to their children.
    pub fn is_single_parent(&self) -> bool {
        matches!(
            self,
            ElementKind::Core | ElementKind::Corridor | ElementKind::Building | ElementKind::Apartment
        )
    }

    /// Wall-like kinds built from a horizontal centerline.
    pub fn is_wall_like(&self) -> bool {
        matches!(
            self,
            ElementKind::Wall | ElementKind::Facade | ElementKind::Parapet
        )
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
