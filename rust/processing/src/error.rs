// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Run-level errors.
//!
//! Only structural failures abort a run. Failures scoped to one element are
//! collected as messages in the run context instead.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Scene has no elements to process")]
    EmptyInput,

    #[error("Scene error: {0}")]
    Scene(#[from] scene2cad_core::Error),

    #[error("Geometry error: {0}")]
    Geometry(#[from] scene2cad_geometry::Error),
}

impl Error {
    /// True when an element's parent chain could not be walked.
    pub fn is_broken_hierarchy(&self) -> bool {
        match self {
            Error::Scene(e) => matches!(
                e,
                scene2cad_core::Error::BrokenHierarchy { .. } | scene2cad_core::Error::NodeNotFound(_)
            ),
            Error::Geometry(e) => e.is_broken_hierarchy(),
            Error::EmptyInput => false,
        }
    }
}
