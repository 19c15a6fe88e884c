use serde::Serialize;
use tracing::debug;

use crate::error::{Result, WordloopError};
use crate::random::RandomSource;

/// The image is divided into `GRID_SIZE` x `GRID_SIZE` cells
pub const GRID_SIZE: u32 = 6;

/// Hand-picked anchor cells, listed with y growing upwards.
/// The center ring is left out so the word never covers the subject.
const CURATED_CELLS: [(u32, u32); 14] = [
    (0, 2),
    (0, 3),
    (1, 4),
    (3, 5),
    (4, 4),
    (5, 3),
    (5, 2),
    (4, 1),
    (2, 0),
    (1, 1),
    (0, 0),
    (5, 5),
    (0, 5),
    (5, 0),
];

/// Number of anchor cells, and so the ceiling on frames per video
pub const MAX_CELLS: usize = CURATED_CELLS.len();

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Cell {
    pub x: u32,
    pub y: u32,
}

/// Shuffled anchor cells for one image. Immutable once built; consume it
/// through a [`GridCursor`].
#[derive(Debug, Clone, Serialize)]
pub struct GridPlan {
    cells: Vec<Cell>,
    pub cell_width: u32,
    pub cell_height: u32,
}

impl GridPlan {
    pub fn new(width: u32, height: u32, rng: &mut RandomSource) -> Result<Self> {
        if width < GRID_SIZE || height < GRID_SIZE {
            return Err(WordloopError::Metadata(format!(
                "image {}x{} is smaller than one pixel per grid cell",
                width, height
            )));
        }

        let mut cells: Vec<Cell> = CURATED_CELLS
            .iter()
            .map(|&(x, y)| Cell { x, y: GRID_SIZE - y - 1 })
            .collect();
        rng.shuffle(&mut cells);

        let plan = Self {
            cells,
            cell_width: width / GRID_SIZE,
            cell_height: height / GRID_SIZE,
        };
        debug!(
            "Grid plan for {}x{}: cell {}x{}, order {:?}",
            width, height, plan.cell_width, plan.cell_height, plan.cells
        );
        Ok(plan)
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Fail unless at least `frames` cells are available
    pub fn ensure_capacity(&self, frames: usize) -> Result<()> {
        if frames > self.cells.len() {
            return Err(WordloopError::InsufficientCells {
                requested: frames,
                available: self.cells.len(),
            });
        }
        Ok(())
    }

    /// Pixel anchor at the center of `cell`
    pub fn anchor(&self, cell: Cell) -> (u32, u32) {
        (
            cell.x * self.cell_width + self.cell_width / 2,
            cell.y * self.cell_height + self.cell_height / 2,
        )
    }

    pub fn cursor(&self) -> GridCursor<'_> {
        GridCursor { plan: self, position: 0 }
    }
}

/// Read position over a [`GridPlan`]; each cell is handed out once
#[derive(Debug)]
pub struct GridCursor<'a> {
    plan: &'a GridPlan,
    position: usize,
}

impl GridCursor<'_> {
    pub fn remaining(&self) -> usize {
        self.plan.cells.len() - self.position
    }
}

impl Iterator for GridCursor<'_> {
    type Item = Cell;

    fn next(&mut self) -> Option<Cell> {
        let cell = self.plan.cells.get(self.position).copied()?;
        self.position += 1;
        Some(cell)
    }
}
