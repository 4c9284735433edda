// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Result type for geometry operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during geometry processing
#[derive(Error, Debug)]
pub enum Error {
    #[error("No level registered near elevation {elevation:.3}")]
    UnresolvedLevel { elevation: f64 },

    #[error("Scene error: {0}")]
    SceneError(#[from] scene2cad_core::Error),
}

impl Error {
    /// True when a node's parent chain could not be walked.
    pub fn is_broken_hierarchy(&self) -> bool {
        matches!(
            self,
            Error::SceneError(
                scene2cad_core::Error::BrokenHierarchy { .. }
                    | scene2cad_core::Error::NodeNotFound(_)
            )
        )
    }
}
