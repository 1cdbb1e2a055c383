use super::{
    error::LevelError,
    grid::{Coord, Grid},
};
use common::{
    constants::{
        BUILDING_FIRSTGID, BUILDING_TILESET_SOURCE, EXIT_OBJECT, FLOOR_LAYER_NAME, FLOOR_TILE, OBJECT_LAYER_NAME,
        OUTSIDE_FIRSTGID, OUTSIDE_TILESET_SOURCE, SPAWN_OBJECT, TILE_HEIGHT, TILE_WIDTH, WALL_LAYER_NAME, wall_tile,
    },
    tilemap::{Layer, LevelDocument, MapObject, ObjectLayer, TileLayer, TilesetRef},
};

const SPAWN_CELL: Coord = (0, 0);

// ============================================================================
// Tile-Map Encoding
// ============================================================================

/// Converts a carved grid into a level document: a floor layer, a wall layer
/// keyed by each cell's wall mask, and an object layer with the spawn and exit.
pub fn encode(grid: &Grid) -> Result<LevelDocument, LevelError> {
    let width = grid.width() as u32;
    let height = grid.height() as u32;

    let floor = TileLayer::new(FLOOR_LAYER_NAME, width, height, vec![FLOOR_TILE; grid.len()])?;
    let walls = TileLayer::new(
        WALL_LAYER_NAME,
        width,
        height,
        grid.cells().map(|cell| wall_tile(cell.wall_mask())).collect(),
    )?;
    let objects = ObjectLayer::topdown(OBJECT_LAYER_NAME, place_objects(grid), 1);

    Ok(LevelDocument::isometric(
        width,
        height,
        TILE_WIDTH,
        TILE_HEIGHT,
        vec![Layer::Tile(floor), Layer::Tile(walls), Layer::Object(objects)],
        tilesets(),
    ))
}

#[must_use]
pub fn tilesets() -> Vec<TilesetRef> {
    vec![
        TilesetRef {
            firstgid: OUTSIDE_FIRSTGID,
            source: OUTSIDE_TILESET_SOURCE.to_string(),
        },
        TilesetRef {
            firstgid: BUILDING_FIRSTGID,
            source: BUILDING_TILESET_SOURCE.to_string(),
        },
    ]
}

// ============================================================================
// Object Placement
// ============================================================================

// Spawn in the top corner, exit on the cell farthest from it (first in
// row-major order on ties). A single-cell level gets no exit.
fn place_objects(grid: &Grid) -> Vec<MapObject> {
    let mut objects = vec![tile_object(SPAWN_OBJECT, SPAWN_CELL)];
    if let Some(exit) = farthest_cell(grid, SPAWN_CELL)
        && exit != SPAWN_CELL
    {
        objects.push(tile_object(EXIT_OBJECT, exit));
    }
    objects
}

fn farthest_cell(grid: &Grid, start: Coord) -> Option<Coord> {
    let mut best: Option<(usize, usize)> = None;
    for (index, distance) in grid.distances_from(start).into_iter().enumerate() {
        if let Some(distance) = distance
            && best.is_none_or(|(_, farthest)| distance > farthest)
        {
            best = Some((index, distance));
        }
    }
    best.map(|(index, _)| (index / grid.width(), index % grid.width()))
}

// Isometric object coordinates are measured in tile heights on both axes
fn tile_object(name: &str, (row, col): Coord) -> MapObject {
    let size = TILE_HEIGHT as f32;
    MapObject {
        height: size,
        id: 0,
        name: name.to_string(),
        rotation: 0.0,
        kind: name.to_string(),
        visible: true,
        width: size,
        x: col as f32 * size,
        y: row as f32 * size,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::maze::carve_maze;
    use rand::{SeedableRng, rngs::StdRng};

    fn carved(height: i32, width: i32, hall_width: usize) -> Grid {
        let mut grid = Grid::new(height, width).unwrap();
        carve_maze(&mut grid, hall_width, &mut StdRng::seed_from_u64(9)).unwrap();
        grid
    }

    #[test]
    fn layers_cover_every_cell() {
        let grid = carved(6, 9, 1);
        let doc = encode(&grid).unwrap();
        assert_eq!((doc.height, doc.width), (6, 9));
        for name in [FLOOR_LAYER_NAME, WALL_LAYER_NAME] {
            let layer = doc.tile_layer(name).unwrap();
            assert_eq!(layer.data.len(), 6 * 9);
            assert_eq!((layer.height, layer.width), (6, 9));
        }
        assert!(doc.tile_layer(FLOOR_LAYER_NAME).unwrap().data.iter().all(|&gid| gid == FLOOR_TILE));
    }

    #[test]
    fn wall_tiles_follow_wall_masks() {
        let grid = carved(5, 5, 1);
        let doc = encode(&grid).unwrap();
        let walls = doc.tile_layer(WALL_LAYER_NAME).unwrap();
        for cell in grid.cells() {
            let gid = walls.tile(cell.row as u32, cell.col as u32).unwrap();
            let expected = match cell.wall_mask() {
                0 => 0,
                mask => BUILDING_FIRSTGID + u32::from(mask) - 1,
            };
            assert_eq!(gid, expected);
        }
    }

    #[test]
    fn open_cells_have_no_wall_tile() {
        // Centre cells of 3x3 blocks have no walls
        let grid = carved(6, 6, 3);
        let doc = encode(&grid).unwrap();
        let walls = doc.tile_layer(WALL_LAYER_NAME).unwrap();
        let open = grid.cells().filter(|c| c.wall_mask() == 0).count();
        assert!(open >= 4);
        assert_eq!(walls.data.iter().filter(|&&gid| gid == 0).count(), open);
    }

    #[test]
    fn spawn_and_exit_are_numbered_topdown() {
        let grid = carved(8, 8, 1);
        let doc = encode(&grid).unwrap();
        let objects = &doc.object_layer(OBJECT_LAYER_NAME).unwrap().objects;
        assert_eq!(objects.len(), 2);
        assert_eq!(objects[0].name, SPAWN_OBJECT);
        assert_eq!((objects[0].x, objects[0].y), (0.0, 0.0));
        assert_eq!(objects[1].name, EXIT_OBJECT);
        assert_eq!(objects.iter().map(|o| o.id).collect::<Vec<_>>(), [1, 2]);
        assert_eq!(doc.nextobjectid, 3);
    }

    #[test]
    fn exit_is_farthest_from_spawn() {
        let grid = carved(7, 7, 1);
        let distances = grid.distances_from(SPAWN_CELL);
        let max = distances.iter().flatten().max().copied().unwrap();
        let exit = farthest_cell(&grid, SPAWN_CELL).unwrap();
        assert_eq!(distances[exit.0 * grid.width() + exit.1], Some(max));
    }

    #[test]
    fn single_cell_level_has_only_a_spawn() {
        let grid = carved(1, 1, 1);
        let doc = encode(&grid).unwrap();
        assert_eq!(doc.object_count(), 1);
        assert_eq!(doc.nextobjectid, 2);
        assert_eq!(doc.tile_layer(WALL_LAYER_NAME).unwrap().data, vec![wall_tile(0b1111)]);
    }

    #[test]
    fn tilesets_are_static() {
        let doc = encode(&carved(3, 3, 1)).unwrap();
        assert_eq!(doc.tilesets, tilesets());
        assert_eq!(doc.tilesets[0].firstgid, 1);
        assert_eq!(doc.tilesets[1].source, BUILDING_TILESET_SOURCE);
        assert_eq!((doc.tilewidth, doc.tileheight), (TILE_WIDTH, TILE_HEIGHT));
    }

    #[test]
    fn encoding_is_deterministic() {
        let grid = carved(9, 6, 1);
        assert_eq!(encode(&grid).unwrap(), encode(&grid).unwrap());
    }
}
