use std::fmt;

use super::grid::Coord;
use common::tilemap::TileMapError;

// ============================================================================
// Level Errors
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelError {
    InvalidDimensions { height: i32, width: i32 },
    DimensionsTooLarge { height: i32, width: i32, max: i32 },
    InvalidHallWidth { hall_width: i32, height: i32, width: i32 },
    // Carving asked to join cells that do not share an edge. Never expected
    // from a correct generator.
    InvalidAdjacency { a: Coord, b: Coord },
    TileMap(TileMapError),
}

impl LevelError {
    // Errors caused by the request rather than by the generator
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidDimensions { .. } | Self::DimensionsTooLarge { .. } | Self::InvalidHallWidth { .. }
        )
    }
}

impl fmt::Display for LevelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDimensions { height, width } => {
                write!(f, "invalid dimensions {height}x{width}: height and width must be positive")
            }
            Self::DimensionsTooLarge { height, width, max } => {
                write!(f, "dimensions {height}x{width} too large (max {max} per side)")
            }
            Self::InvalidHallWidth { hall_width, height, width } => {
                write!(
                    f,
                    "invalid hall width {hall_width} for a {height}x{width} level: must be at least 1, and below {} when wider than 1",
                    height.min(width)
                )
            }
            Self::InvalidAdjacency { a, b } => {
                write!(f, "cells {a:?} and {b:?} are not neighbours")
            }
            Self::TileMap(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for LevelError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::TileMap(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TileMapError> for LevelError {
    fn from(err: TileMapError) -> Self {
        Self::TileMap(err)
    }
}
