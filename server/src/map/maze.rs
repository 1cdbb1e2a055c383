use rand::{Rng, seq::SliceRandom};
use std::ops::Range;
use tracing::trace;

use super::{
    error::LevelError,
    grid::{Coord, Direction, Grid},
};

// ============================================================================
// Hall Width
// ============================================================================

// A hall width of 1 is always valid. Wider halls must leave room for at least
// one wall, so they have to be narrower than the shorter side.
pub fn validate_hall_width(height: i32, width: i32, hall_width: i32) -> Result<usize, LevelError> {
    if hall_width <= 0 || (hall_width > 1 && hall_width >= height.min(width)) {
        return Err(LevelError::InvalidHallWidth {
            hall_width,
            height,
            width,
        });
    }
    Ok(hall_width as usize)
}

// ============================================================================
// Block Layout
// ============================================================================

// Partition of the grid into hall_width × hall_width blocks. The last block
// row and column absorb the remainder, so no block is narrower than the hall.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockLayout {
    rows: Vec<Range<usize>>,
    cols: Vec<Range<usize>>,
}

impl BlockLayout {
    #[must_use]
    pub fn new(grid: &Grid, hall_width: usize) -> Self {
        Self {
            rows: spans(grid.height(), hall_width),
            cols: spans(grid.width(), hall_width),
        }
    }

    #[must_use]
    pub fn block_rows(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn block_cols(&self) -> usize {
        self.cols.len()
    }

    #[must_use]
    pub fn block_count(&self) -> usize {
        self.rows.len() * self.cols.len()
    }

    // Block containing a grid cell
    #[cfg(test)]
    fn block_of(&self, (row, col): Coord) -> Option<Coord> {
        let block_row = self.rows.iter().position(|span| span.contains(&row))?;
        let block_col = self.cols.iter().position(|span| span.contains(&col))?;
        Some((block_row, block_col))
    }

    fn index(&self, (block_row, block_col): Coord) -> usize {
        block_row * self.cols.len() + block_col
    }

    fn step(&self, (block_row, block_col): Coord, direction: Direction) -> Option<Coord> {
        let (dr, dc) = direction.offset();
        let row = block_row.checked_add_signed(dr)?;
        let col = block_col.checked_add_signed(dc)?;
        (row < self.rows.len() && col < self.cols.len()).then_some((row, col))
    }

    fn cells(&self, (block_row, block_col): Coord) -> impl Iterator<Item = Coord> + '_ {
        let cols = self.cols[block_col].clone();
        self.rows[block_row]
            .clone()
            .flat_map(move |row| cols.clone().map(move |col| (row, col)))
    }
}

fn spans(len: usize, hall_width: usize) -> Vec<Range<usize>> {
    let hall_width = hall_width.max(1);
    let count = (len / hall_width).max(1);
    (0..count)
        .map(|i| {
            let start = i * hall_width;
            let end = if i + 1 == count { len } else { start + hall_width };
            start..end
        })
        .collect()
}

// ============================================================================
// Generation Context
// ============================================================================

// State of one carving run: the grid being carved, the random source, and the
// backtracking frontier over blocks.
struct GenerationContext<'a, R: Rng + ?Sized> {
    grid: &'a mut Grid,
    rng: &'a mut R,
    blocks: BlockLayout,
    visited: Vec<bool>,
    stack: Vec<Coord>,
}

impl<'a, R: Rng + ?Sized> GenerationContext<'a, R> {
    fn new(grid: &'a mut Grid, hall_width: usize, rng: &'a mut R) -> Self {
        let blocks = BlockLayout::new(grid, hall_width);
        let visited = vec![false; blocks.block_count()];
        Self {
            grid,
            rng,
            blocks,
            visited,
            stack: Vec::new(),
        }
    }

    fn carve(mut self) -> Result<(), LevelError> {
        for block_row in 0..self.blocks.block_rows() {
            for block_col in 0..self.blocks.block_cols() {
                self.open_block((block_row, block_col))?;
            }
        }

        let start = (0, 0);
        self.visit(start);
        self.stack.push(start);

        while let Some(&current) = self.stack.last() {
            let candidates = self.unvisited_neighbors(current);
            if let Some(&(direction, next)) = candidates.choose(&mut *self.rng) {
                trace!(?current, ?next, ?direction, "joining blocks");
                self.join(current, next, direction)?;
                self.visit(next);
                self.stack.push(next);
            } else {
                self.stack.pop();
            }
        }

        Ok(())
    }

    fn visit(&mut self, block: Coord) {
        let index = self.blocks.index(block);
        self.visited[index] = true;
        for cell in self.blocks.cells(block) {
            self.grid.mark_visited(cell);
        }
    }

    fn unvisited_neighbors(&self, block: Coord) -> Vec<(Direction, Coord)> {
        Direction::ALL
            .into_iter()
            .filter_map(|direction| self.blocks.step(block, direction).map(|next| (direction, next)))
            .filter(|&(_, next)| !self.visited[self.blocks.index(next)])
            .collect()
    }

    // Remove every wall inside a block so it forms one open hall section
    fn open_block(&mut self, (block_row, block_col): Coord) -> Result<(), LevelError> {
        let rows = self.blocks.rows[block_row].clone();
        let cols = self.blocks.cols[block_col].clone();
        for row in rows.clone() {
            for col in cols.clone() {
                if col + 1 < cols.end {
                    self.grid.remove_wall((row, col), (row, col + 1))?;
                }
                if row + 1 < rows.end {
                    self.grid.remove_wall((row, col), (row + 1, col))?;
                }
            }
        }
        Ok(())
    }

    // Remove the walls along the whole boundary shared by two neighbouring blocks
    fn join(&mut self, a: Coord, b: Coord, direction: Direction) -> Result<(), LevelError> {
        match direction {
            Direction::North => self.join(b, a, Direction::South),
            Direction::West => self.join(b, a, Direction::East),
            Direction::South => {
                let upper = self.blocks.rows[a.0].clone();
                let lower = self.blocks.rows[b.0].clone();
                for col in self.blocks.cols[a.1].clone() {
                    self.grid.remove_wall((upper.end - 1, col), (lower.start, col))?;
                }
                Ok(())
            }
            Direction::East => {
                let left = self.blocks.cols[a.1].clone();
                let right = self.blocks.cols[b.1].clone();
                for row in self.blocks.rows[a.0].clone() {
                    self.grid.remove_wall((row, left.end - 1), (row, right.start))?;
                }
                Ok(())
            }
        }
    }
}

// ============================================================================
// Maze Carving
// ============================================================================

/// Carves a perfect maze over `hall_width`-sized blocks with a randomized
/// depth-first backtracker. Afterwards every cell is visited and reachable.
pub fn carve_maze<R: Rng + ?Sized>(grid: &mut Grid, hall_width: usize, rng: &mut R) -> Result<(), LevelError> {
    GenerationContext::new(grid, hall_width, rng).carve()
}
