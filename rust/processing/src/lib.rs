// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Scene-to-CAD run pipeline.
//!
//! Walks a [`scene2cad_core::SceneArena`] depth-first, turns every element
//! into world geometry with the kernel in `scene2cad_geometry`, and hands the
//! result to a [`Materializer`]. Per-element failures are collected in the
//! [`RunReport`]; only structural failures end a run early.
//!
//! ```rust,ignore
//! use scene2cad_processing::{run_json, RecordingMaterializer, RunConfig};
//!
//! let mut doc = RecordingMaterializer::new();
//! let report = run_json(&json, &mut doc, RunConfig::from_env())?;
//! println!("{} walls, {} messages", report.walls_built, report.messages.len());
//! ```

mod communal;
pub mod config;
pub mod context;
mod elements;
pub mod error;
pub mod materializer;
pub mod pipeline;

pub use config::RunConfig;
pub use context::{Bounds, LevelSummary, MessageLog, RunContext, RunReport, SiteLocation};
pub use error::{Error, Result};
pub use materializer::{
    BoundaryHandle, BoundaryKind, ElementMeta, ExistingLevel, InstanceHandle, LevelHandle,
    MaterializeError, MaterializeResult, Materializer, OpeningHandle, Recorded,
    RecordingMaterializer, RoomHandle, WallHandle, WallSpec,
};
pub use pipeline::{run, run_json, Pipeline};
