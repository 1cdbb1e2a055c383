// ============================================================================
// Map Geometry
// ============================================================================

// Isometric tiles are twice as wide as they are tall
pub const TILE_WIDTH: u32 = 64;
pub const TILE_HEIGHT: u32 = 32;

pub const ORIENTATION: &str = "isometric";
pub const RENDER_ORDER: &str = "right-down";
pub const TILED_VERSION: &str = "1.1.5";
pub const MAP_FORMAT_VERSION: u32 = 1;

// ============================================================================
// Tilesets
// ============================================================================

// Both tilesets are preloaded by the browser client under these names
pub const OUTSIDE_TILESET_SOURCE: &str = "iso-64x64-outside.json";
pub const BUILDING_TILESET_SOURCE: &str = "iso-64x64-building.json";

pub const OUTSIDE_FIRSTGID: u32 = 1;
pub const OUTSIDE_TILE_COUNT: u32 = 16;
pub const BUILDING_FIRSTGID: u32 = OUTSIDE_FIRSTGID + OUTSIDE_TILE_COUNT;

// ============================================================================
// Tile IDs
// ============================================================================

// Gid 0 means "no tile" in the tile-map format
pub const EMPTY_TILE: u32 = 0;
pub const FLOOR_TILE: u32 = OUTSIDE_FIRSTGID;

// Wall bits, combined into a mask per cell. The building tileset holds one tile
// per non-zero mask, so a walled cell maps to BUILDING_FIRSTGID + mask - 1.
pub const WALL_NORTH_BIT: u8 = 1;
pub const WALL_EAST_BIT: u8 = 2;
pub const WALL_SOUTH_BIT: u8 = 4;
pub const WALL_WEST_BIT: u8 = 8;

#[must_use]
pub const fn wall_tile(mask: u8) -> u32 {
    if mask == 0 {
        EMPTY_TILE
    } else {
        BUILDING_FIRSTGID + mask as u32 - 1
    }
}

// ============================================================================
// Layer Names
// ============================================================================

pub const FLOOR_LAYER_NAME: &str = "floor";
pub const WALL_LAYER_NAME: &str = "walls";
pub const OBJECT_LAYER_NAME: &str = "objects";

pub const SPAWN_OBJECT: &str = "spawn";
pub const EXIT_OBJECT: &str = "exit";

// ============================================================================
// Level Requests
// ============================================================================

pub const DEFAULT_HALL_WIDTH: i32 = 1;
pub const DEFAULT_MAX_LEVEL_SIZE: i32 = 256;
