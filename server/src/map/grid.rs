use std::collections::VecDeque;

use super::error::LevelError;
use common::constants::{WALL_EAST_BIT, WALL_NORTH_BIT, WALL_SOUTH_BIT, WALL_WEST_BIT};

// (row, col)
pub type Coord = (usize, usize);

// ============================================================================
// Direction
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    pub const ALL: [Self; 4] = [Self::North, Self::South, Self::East, Self::West];

    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::North => Self::South,
            Self::South => Self::North,
            Self::East => Self::West,
            Self::West => Self::East,
        }
    }

    // Row/col offset of the neighbour in this direction
    #[must_use]
    pub const fn offset(self) -> (isize, isize) {
        match self {
            Self::North => (-1, 0),
            Self::South => (1, 0),
            Self::East => (0, 1),
            Self::West => (0, -1),
        }
    }
}

// ============================================================================
// Cell
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub row: usize,
    pub col: usize,
    pub visited: bool,
    pub has_north_wall: bool,
    pub has_south_wall: bool,
    pub has_east_wall: bool,
    pub has_west_wall: bool,
}

impl Cell {
    const fn walled(row: usize, col: usize) -> Self {
        Self {
            row,
            col,
            visited: false,
            has_north_wall: true,
            has_south_wall: true,
            has_east_wall: true,
            has_west_wall: true,
        }
    }

    #[must_use]
    pub const fn has_wall(&self, direction: Direction) -> bool {
        match direction {
            Direction::North => self.has_north_wall,
            Direction::South => self.has_south_wall,
            Direction::East => self.has_east_wall,
            Direction::West => self.has_west_wall,
        }
    }

    const fn set_wall(&mut self, direction: Direction, present: bool) {
        match direction {
            Direction::North => self.has_north_wall = present,
            Direction::South => self.has_south_wall = present,
            Direction::East => self.has_east_wall = present,
            Direction::West => self.has_west_wall = present,
        }
    }

    // Wall bits as used by the wall tile layer
    #[must_use]
    pub const fn wall_mask(&self) -> u8 {
        let mut mask = 0;
        if self.has_north_wall {
            mask |= WALL_NORTH_BIT;
        }
        if self.has_east_wall {
            mask |= WALL_EAST_BIT;
        }
        if self.has_south_wall {
            mask |= WALL_SOUTH_BIT;
        }
        if self.has_west_wall {
            mask |= WALL_WEST_BIT;
        }
        mask
    }
}

// ============================================================================
// Grid
// ============================================================================

/// Row-major `height × width` grid of cells with mirrored per-edge walls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    height: usize,
    width: usize,
    cells: Vec<Cell>,
}

impl Grid {
    /// Creates a grid with every wall present and nothing visited.
    pub fn new(height: i32, width: i32) -> Result<Self, LevelError> {
        if height <= 0 || width <= 0 {
            return Err(LevelError::InvalidDimensions { height, width });
        }
        let (height, width) = (height as usize, width as usize);
        let cells = (0..height)
            .flat_map(|row| (0..width).map(move |col| Cell::walled(row, col)))
            .collect();
        Ok(Self { height, width, cells })
    }

    #[must_use]
    pub const fn height(&self) -> usize {
        self.height
    }

    #[must_use]
    pub const fn width(&self) -> usize {
        self.width
    }

    pub(crate) const fn len(&self) -> usize {
        self.height * self.width
    }

    #[must_use]
    pub const fn contains(&self, (row, col): Coord) -> bool {
        row < self.height && col < self.width
    }

    const fn index(&self, (row, col): Coord) -> usize {
        row * self.width + col
    }

    #[must_use]
    pub fn cell(&self, coord: Coord) -> Option<&Cell> {
        if self.contains(coord) {
            self.cells.get(self.index(coord))
        } else {
            None
        }
    }

    // Cells in row-major order
    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter()
    }

    pub(super) fn mark_visited(&mut self, coord: Coord) {
        if self.contains(coord) {
            let index = self.index(coord);
            self.cells[index].visited = true;
        }
    }

    #[must_use]
    pub fn step(&self, (row, col): Coord, direction: Direction) -> Option<Coord> {
        let (dr, dc) = direction.offset();
        let next = (row.checked_add_signed(dr)?, col.checked_add_signed(dc)?);
        self.contains(next).then_some(next)
    }

    /// In-bounds neighbours of `coord`, at most four.
    #[must_use]
    pub fn neighbors(&self, coord: Coord) -> Vec<(Direction, Coord)> {
        if !self.contains(coord) {
            return Vec::new();
        }
        Direction::ALL
            .into_iter()
            .filter_map(|direction| self.step(coord, direction).map(|next| (direction, next)))
            .collect()
    }

    // Direction from `a` to `b` when they share an edge
    fn direction_between(&self, a: Coord, b: Coord) -> Option<Direction> {
        Direction::ALL
            .into_iter()
            .find(|&direction| self.step(a, direction) == Some(b))
    }

    /// Clears the wall between two adjacent cells on both sides.
    pub fn remove_wall(&mut self, a: Coord, b: Coord) -> Result<(), LevelError> {
        let direction = self
            .direction_between(a, b)
            .ok_or(LevelError::InvalidAdjacency { a, b })?;
        let (ia, ib) = (self.index(a), self.index(b));
        self.cells[ia].set_wall(direction, false);
        self.cells[ib].set_wall(direction.opposite(), false);
        Ok(())
    }

    // True when there is no wall between two adjacent cells
    #[must_use]
    pub fn is_open(&self, a: Coord, b: Coord) -> bool {
        self.direction_between(a, b)
            .and_then(|direction| self.cell(a).map(|cell| !cell.has_wall(direction)))
            .unwrap_or(false)
    }

    /// Every interior wall flag agrees with the matching flag of its neighbour.
    #[must_use]
    pub fn walls_consistent(&self) -> bool {
        self.cells.iter().all(|cell| {
            self.neighbors((cell.row, cell.col)).into_iter().all(|(direction, next)| {
                let other = &self.cells[self.index(next)];
                cell.has_wall(direction) == other.has_wall(direction.opposite())
            })
        })
    }

    /// Breadth-first step counts from `start` through open edges; `None` for
    /// unreachable cells. Indexed row-major.
    #[must_use]
    pub fn distances_from(&self, start: Coord) -> Vec<Option<usize>> {
        let mut distances = vec![None; self.len()];
        if !self.contains(start) {
            return distances;
        }

        let mut queue = VecDeque::new();
        distances[self.index(start)] = Some(0);
        queue.push_back(start);

        while let Some(coord) = queue.pop_front() {
            let cell = &self.cells[self.index(coord)];
            let distance = distances[self.index(coord)].unwrap_or(0);
            for (direction, next) in self.neighbors(coord) {
                let index = self.index(next);
                if !cell.has_wall(direction) && distances[index].is_none() {
                    distances[index] = Some(distance + 1);
                    queue.push_back(next);
                }
            }
        }

        distances
    }

    /// True when every cell can be reached from every other cell.
    #[must_use]
    pub fn all_cells_reachable(&self) -> bool {
        self.distances_from((0, 0)).iter().all(Option::is_some)
    }
}
