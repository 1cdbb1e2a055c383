mod encode;
mod error;
mod grid;
mod maze;

use rand::{Rng, SeedableRng, rngs::StdRng};
use std::time::Instant;
use tracing::{info, instrument};

use common::{
    constants::{DEFAULT_HALL_WIDTH, DEFAULT_MAX_LEVEL_SIZE},
    protocol::CGenerateLevel,
    tilemap::LevelDocument,
};

pub use encode::{encode, tilesets};
pub use error::LevelError;
pub use grid::{Cell, Coord, Direction, Grid};
pub use maze::{BlockLayout, carve_maze, validate_hall_width};

// ============================================================================
// Level Generation
// ============================================================================

/// Generates a connected maze level of `height × width` tiles with halls
/// `hall_width` tiles wide.
pub fn generate_level<R: Rng + ?Sized>(
    height: i32,
    width: i32,
    hall_width: i32,
    rng: &mut R,
) -> Result<LevelDocument, LevelError> {
    let mut grid = Grid::new(height, width)?;
    let hall_width = validate_hall_width(height, width, hall_width)?;
    carve_maze(&mut grid, hall_width, rng)?;
    debug_assert!(grid.all_cells_reachable() && grid.walls_consistent());
    encode(&grid)
}

// ============================================================================
// Level Service
// ============================================================================

/// Request-facing entry point shared by all transports. Holds no per-request
/// state, so one instance can serve any number of concurrent requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelService {
    max_size: i32,
}

impl Default for LevelService {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LEVEL_SIZE)
    }
}

impl LevelService {
    #[must_use]
    pub const fn new(max_size: i32) -> Self {
        Self { max_size }
    }

    #[instrument(skip(self))]
    pub fn handle(&self, request: &CGenerateLevel) -> Result<LevelDocument, LevelError> {
        let CGenerateLevel {
            height,
            width,
            hall_width,
            seed,
        } = *request;

        if height <= 0 || width <= 0 {
            return Err(LevelError::InvalidDimensions { height, width });
        }
        if height > self.max_size || width > self.max_size {
            return Err(LevelError::DimensionsTooLarge {
                height,
                width,
                max: self.max_size,
            });
        }

        let hall_width = hall_width.unwrap_or(DEFAULT_HALL_WIDTH);
        let mut rng = seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);

        let started = Instant::now();
        let level = generate_level(height, width, hall_width, &mut rng)?;
        info!(
            "generated {}x{} level (hall width {}) in {:.2}ms",
            height,
            width,
            hall_width,
            started.elapsed().as_secs_f64() * 1000.0
        );
        Ok(level)
    }
}
