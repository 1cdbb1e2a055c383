use serde::{Deserialize, Serialize};
use std::fmt;

#[cfg(feature = "bincode")]
use bincode::{Decode, Encode};

use crate::constants::{MAP_FORMAT_VERSION, ORIENTATION, RENDER_ORDER, TILED_VERSION};

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileMapError {
    // Tile data does not cover width x height tiles
    LayerSize { expected: usize, actual: usize },
}

impl fmt::Display for TileMapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LayerSize { expected, actual } => {
                write!(f, "tile layer needs {expected} tiles, got {actual}")
            }
        }
    }
}

impl std::error::Error for TileMapError {}

// ============================================================================
// Layers
// ============================================================================

/// Grid of tile gids, row-major.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "bincode", derive(Encode, Decode))]
pub struct TileLayer {
    pub data: Vec<u32>,
    pub height: u32,
    pub width: u32,
    pub name: String,
    pub opacity: f32,
    pub visible: bool,
    pub x: i32,
    pub y: i32,
}

impl TileLayer {
    pub fn new(name: impl Into<String>, width: u32, height: u32, data: Vec<u32>) -> Result<Self, TileMapError> {
        let expected = width as usize * height as usize;
        if data.len() != expected {
            return Err(TileMapError::LayerSize {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            data,
            height,
            width,
            name: name.into(),
            opacity: 1.0,
            visible: true,
            x: 0,
            y: 0,
        })
    }

    #[must_use]
    pub fn tile(&self, row: u32, col: u32) -> Option<u32> {
        if row >= self.height || col >= self.width {
            return None;
        }
        self.data.get((row * self.width + col) as usize).copied()
    }
}

/// A placed entity such as a spawn point. Coordinates are in pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "bincode", derive(Encode, Decode))]
pub struct MapObject {
    pub height: f32,
    pub id: u32,
    pub name: String,
    pub rotation: f32,
    #[serde(rename = "type")]
    pub kind: String,
    pub visible: bool,
    pub width: f32,
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "bincode", derive(Encode, Decode))]
pub struct ObjectLayer {
    pub draworder: String,
    pub name: String,
    pub objects: Vec<MapObject>,
    pub opacity: f32,
    pub visible: bool,
    pub x: i32,
    pub y: i32,
}

impl ObjectLayer {
    // Objects are sorted top-down (by y, then x) and numbered from `first_id`.
    #[must_use]
    pub fn topdown(name: impl Into<String>, mut objects: Vec<MapObject>, first_id: u32) -> Self {
        objects.sort_by(|a, b| a.y.total_cmp(&b.y).then(a.x.total_cmp(&b.x)));
        for (id, object) in (first_id..).zip(objects.iter_mut()) {
            object.id = id;
        }
        Self {
            draworder: "topdown".to_string(),
            name: name.into(),
            objects,
            opacity: 1.0,
            visible: true,
            x: 0,
            y: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "bincode", derive(Encode, Decode))]
#[serde(tag = "type")]
pub enum Layer {
    #[serde(rename = "tilelayer")]
    Tile(TileLayer),
    #[serde(rename = "objectgroup")]
    Object(ObjectLayer),
}

// ============================================================================
// Level Document
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "bincode", derive(Encode, Decode))]
pub struct TilesetRef {
    pub firstgid: u32,
    pub source: String,
}

/// Root of a generated level, in the tile-map interchange shape the client loads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "bincode", derive(Encode, Decode))]
pub struct LevelDocument {
    pub height: u32,
    pub width: u32,
    pub tileheight: u32,
    pub tilewidth: u32,
    pub layers: Vec<Layer>,
    pub tilesets: Vec<TilesetRef>,
    pub nextobjectid: u32,
    pub orientation: String,
    pub renderorder: String,
    pub tiledversion: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub version: u32,
}

impl LevelDocument {
    // `nextobjectid` is derived from the highest object id across all object layers.
    #[must_use]
    pub fn isometric(
        width: u32,
        height: u32,
        tile_width: u32,
        tile_height: u32,
        layers: Vec<Layer>,
        tilesets: Vec<TilesetRef>,
    ) -> Self {
        let max_id = layers
            .iter()
            .filter_map(|layer| match layer {
                Layer::Object(objects) => objects.objects.iter().map(|o| o.id).max(),
                Layer::Tile(_) => None,
            })
            .max()
            .unwrap_or(0);

        Self {
            height,
            width,
            tileheight: tile_height,
            tilewidth: tile_width,
            layers,
            tilesets,
            nextobjectid: max_id + 1,
            orientation: ORIENTATION.to_string(),
            renderorder: RENDER_ORDER.to_string(),
            tiledversion: TILED_VERSION.to_string(),
            kind: "map".to_string(),
            version: MAP_FORMAT_VERSION,
        }
    }

    #[must_use]
    pub fn tile_layer(&self, name: &str) -> Option<&TileLayer> {
        self.layers.iter().find_map(|layer| match layer {
            Layer::Tile(tiles) if tiles.name == name => Some(tiles),
            _ => None,
        })
    }

    #[must_use]
    pub fn object_layer(&self, name: &str) -> Option<&ObjectLayer> {
        self.layers.iter().find_map(|layer| match layer {
            Layer::Object(objects) if objects.name == name => Some(objects),
            _ => None,
        })
    }

    #[must_use]
    pub fn object_count(&self) -> usize {
        self.layers
            .iter()
            .map(|layer| match layer {
                Layer::Object(objects) => objects.objects.len(),
                Layer::Tile(_) => 0,
            })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn point(name: &str, x: f32, y: f32) -> MapObject {
        MapObject {
            height: 32.0,
            id: 0,
            name: name.to_string(),
            rotation: 0.0,
            kind: name.to_string(),
            visible: true,
            width: 32.0,
            x,
            y,
        }
    }

    #[test]
    fn tile_layer_rejects_short_data() {
        let err = TileLayer::new("floor", 3, 2, vec![1; 5]).unwrap_err();
        assert_eq!(err, TileMapError::LayerSize { expected: 6, actual: 5 });
    }

    #[test]
    fn tile_lookup_is_row_major() {
        let layer = TileLayer::new("floor", 3, 2, vec![0, 1, 2, 3, 4, 5]).unwrap();
        assert_eq!(layer.tile(1, 0), Some(3));
        assert_eq!(layer.tile(0, 2), Some(2));
        assert_eq!(layer.tile(2, 0), None);
    }

    #[test]
    fn objects_are_sorted_topdown_and_numbered() {
        let layer = ObjectLayer::topdown(
            "objects",
            vec![point("exit", 0.0, 64.0), point("spawn", 32.0, 0.0), point("key", 0.0, 0.0)],
            1,
        );
        let names: Vec<_> = layer.objects.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, ["key", "spawn", "exit"]);
        let ids: Vec<_> = layer.objects.iter().map(|o| o.id).collect();
        assert_eq!(ids, [1, 2, 3]);
    }

    #[test]
    fn next_object_id_follows_highest_id() {
        let objects = ObjectLayer::topdown("objects", vec![point("spawn", 0.0, 0.0), point("exit", 0.0, 32.0)], 1);
        let doc = LevelDocument::isometric(1, 1, 64, 32, vec![Layer::Object(objects)], Vec::new());
        assert_eq!(doc.nextobjectid, 3);
        assert_eq!(doc.object_count(), 2);

        let empty = LevelDocument::isometric(1, 1, 64, 32, Vec::new(), Vec::new());
        assert_eq!(empty.nextobjectid, 1);
    }

    #[test]
    fn serializes_with_interchange_field_names() {
        let floor = TileLayer::new("floor", 1, 1, vec![1]).unwrap();
        let objects = ObjectLayer::topdown("objects", vec![point("spawn", 0.0, 0.0)], 1);
        let doc = LevelDocument::isometric(
            1,
            1,
            64,
            32,
            vec![Layer::Tile(floor), Layer::Object(objects)],
            vec![TilesetRef {
                firstgid: 1,
                source: "iso-64x64-outside.json".to_string(),
            }],
        );

        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["type"], json!("map"));
        assert_eq!(value["orientation"], json!("isometric"));
        assert_eq!(value["nextobjectid"], json!(2));
        assert_eq!(value["layers"][0]["type"], json!("tilelayer"));
        assert_eq!(value["layers"][0]["data"], json!([1]));
        assert_eq!(value["layers"][1]["type"], json!("objectgroup"));
        assert_eq!(value["layers"][1]["draworder"], json!("topdown"));
        assert_eq!(value["layers"][1]["objects"][0]["type"], json!("spawn"));
        assert_eq!(value["tilesets"][0]["firstgid"], json!(1));

        let back: LevelDocument = serde_json::from_value(value).unwrap();
        assert_eq!(back, doc);
    }
}
