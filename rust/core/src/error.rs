// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for scene import and hierarchy queries.

use crate::scene::NodeKey;
use thiserror::Error;

/// Result type alias for scene operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while importing or navigating a scene.
#[derive(Error, Debug)]
pub enum Error {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The scene has no root element or the root carries nothing to build.
    #[error("scene is empty")]
    EmptyScene,

    /// An apartment references a template name that the root does not define.
    #[error("no template named '{0}' for apartment")]
    MissingTemplate(String),

    #[error("field '{field}' expects {expected} components, found {found}")]
    InvalidVector {
        field: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("scene node not found: {0:?}")]
    NodeNotFound(NodeKey),

    /// A node's parent chain ends before the required ancestor depth, or
    /// points at a node that is no longer in the arena.
    #[error("broken hierarchy at {node:?}: no ancestor at depth {depth}")]
    BrokenHierarchy { node: NodeKey, depth: usize },
}
