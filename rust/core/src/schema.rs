// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Serde model of the authored scene document.
//!
//! These types mirror the JSON exactly as the authoring tool writes it
//! (Y-up coordinates, loose arrays). Conversion into the kernel frame
//! happens in [`crate::scene::SceneArena::from_raw`].

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::Result;

/// One node of the authored scene tree.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawNode {
    pub name: String,
    pub pos: Vec<f64>,
    pub rot: Vec<f64>,
    pub size: Vec<f64>,
    pub anchor: Vec<f64>,
    /// `"<code category>|<code type>"` identifying the document type to use.
    pub modulous_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    pub uuid: String,
    pub children: Vec<RawNode>,
    pub data: Option<RawData>,
    /// Apartment definitions, only present on the root.
    pub templates: Vec<RawNode>,
}

/// Per-type payload attached to a node.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawData {
    pub levels: Vec<RawLevel>,
    pub level: Option<f64>,
    pub category: Option<String>,
    pub polygon: Vec<Vec<f64>>,
    pub dto_muscle_unit: bool,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// A level definition carried by a building-like node.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawLevel {
    pub id: Option<String>,
    #[serde(alias = "uuId")]
    pub uuid: Option<String>,
    pub floor_world_bottom: f64,
    #[serde(rename = "FFL", alias = "ffl")]
    pub ffl: f64,
    #[serde(deserialize_with = "string_or_number")]
    pub level_index: String,
    pub is_roof: bool,
    #[serde(rename = "GEAPolygon", alias = "geaPolygon")]
    pub gea_polygon: Option<Vec<Vec<f64>>>,
    #[serde(rename = "GIAPolygon", alias = "giaPolygon")]
    pub gia_polygon: Option<Vec<Vec<f64>>>,
}

impl RawLevel {
    /// World elevation of the level: the floor bottom when set, else the
    /// finished floor level.
    pub fn elevation(&self) -> f64 {
        if self.floor_world_bottom != 0.0 {
            self.floor_world_bottom
        } else {
            self.ffl
        }
    }
}

/// Parse a scene document.
pub fn parse_scene(json: &str) -> Result<RawNode> {
    Ok(serde_json::from_str(json)?)
}

/// Level indices are written as either `"3"` or `3` depending on the exporter.
fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Index {
        Text(String),
        Int(i64),
        Float(f64),
    }

    Ok(match Option::<Index>::deserialize(deserializer)? {
        Some(Index::Text(s)) => s,
        Some(Index::Int(i)) => i.to_string(),
        Some(Index::Float(f)) => f.to_string(),
        None => String::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_node() {
        let node = parse_scene(r#"{"type": "Site", "uuid": "s1"}"#).unwrap();
        assert_eq!(node.kind, "Site");
        assert!(node.children.is_empty());
        assert!(node.pos.is_empty());
    }

    #[test]
    fn test_parse_levels_payload() {
        let json = r#"{
            "type": "Building",
            "name": "B1",
            "data": {
                "levels": [
                    {"FFL": 0.0, "levelIndex": 0},
                    {"floorWorldBottom": 3.2, "FFL": 3.0, "levelIndex": "1", "isRoof": true,
                     "GEAPolygon": [[0,0,0],[10,0,0],[10,0,-6],[0,0,-6]]}
                ]
            }
        }"#;
        let node = parse_scene(json).unwrap();
        let levels = &node.data.as_ref().unwrap().levels;
        assert_eq!(levels.len(), 2);
        assert_eq!(levels[0].level_index, "0");
        assert_eq!(levels[1].level_index, "1");
        assert!(levels[1].is_roof);
        assert_eq!(levels[1].elevation(), 3.2);
        assert_eq!(levels[0].elevation(), 0.0);
        assert_eq!(levels[1].gea_polygon.as_ref().unwrap().len(), 4);
    }

    #[test]
    fn test_parse_rejects_malformed_json() {
        assert!(parse_scene("{ not json").is_err());
    }
}
