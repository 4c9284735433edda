// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # scene2cad Core
//!
//! Scene graph model for scene-to-CAD import.
//!
//! - **Schema**: serde model of the authored JSON document ([`RawNode`])
//! - **Element kinds**: closed [`ElementKind`] enum resolved once from type tags
//! - **Scene arena**: [`SceneArena`] owning every node, with parent links
//!   stored as [`NodeKey`]s
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use scene2cad_core::{parse_scene, SceneArena};
//!
//! let raw = parse_scene(&std::fs::read_to_string("scene.json")?)?;
//! let arena = SceneArena::from_raw(raw)?;
//! for key in arena.depth_first() {
//!     let node = arena.node(key).unwrap();
//!     println!("{} {}", node.kind, node.name);
//! }
//! ```

pub mod error;
pub mod kind;
pub mod scene;
pub mod schema;

pub use error::{Error, Result};
pub use kind::{ElementKind, KIND_TABLE};
pub use scene::{
    convert_vertex, Ancestors, LevelDef, NodeKey, Payload, SceneArena, SceneNode, TypeRef,
};
pub use schema::{parse_scene, RawData, RawLevel, RawNode};
