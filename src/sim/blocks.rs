//! Breakable block grid
//!
//! Blocks are logical rectangles; the host owns their collision bodies and
//! reports hits by block id. Clearing a row drops the rows above it by one
//! and refills row 0, so the grid never runs out.

use glam::Vec2;

use crate::Tuning;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Block {
    pub id: u32,
    pub row: u32,
    pub col: u32,
    pub center: Vec2,
    pub size: Vec2,
}

impl Block {
    #[inline]
    pub fn half_size(&self) -> Vec2 {
        self.size / 2.0
    }
}

#[derive(Debug, Clone)]
pub struct BlockGrid {
    blocks: Vec<Block>,
    rows: u32,
    cols: u32,
    size: Vec2,
    spacing: f32,
    start: Vec2,
    next_id: u32,
}

impl BlockGrid {
    pub fn new(tuning: &Tuning) -> Self {
        let cols = tuning.block_cols;
        let total_width =
            cols as f32 * tuning.block_width + cols.saturating_sub(1) as f32 * tuning.block_spacing;
        let start = Vec2::new(
            tuning.arena_width / 2.0 - total_width / 2.0 + tuning.block_width / 2.0,
            tuning.block_top,
        );
        let mut grid = Self {
            blocks: Vec::with_capacity((tuning.block_rows * cols) as usize),
            rows: tuning.block_rows,
            cols,
            size: Vec2::new(tuning.block_width, tuning.block_height),
            spacing: tuning.block_spacing,
            start,
            next_id: 0,
        };
        for row in 0..grid.rows {
            grid.fill_row(row);
        }
        grid
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn get(&self, id: u32) -> Option<&Block> {
        self.blocks.iter().find(|b| b.id == id)
    }

    /// Centre of the cell at (row, col)
    pub fn cell_center(&self, row: u32, col: u32) -> Vec2 {
        self.start
            + Vec2::new(
                col as f32 * (self.size.x + self.spacing),
                row as f32 * (self.size.y + self.spacing),
            )
    }

    /// Remove a block; `None` if it was already gone
    pub fn remove(&mut self, id: u32) -> Option<Block> {
        let i = self.blocks.iter().position(|b| b.id == id)?;
        Some(self.blocks.remove(i))
    }

    pub fn row_is_empty(&self, row: u32) -> bool {
        !self.blocks.iter().any(|b| b.row == row)
    }

    /// If `row` is empty, shift the rows above it down and refill row 0.
    /// Returns true when that happened.
    pub fn collapse_if_empty(&mut self, row: u32) -> bool {
        if !self.row_is_empty(row) {
            return false;
        }
        for i in 0..self.blocks.len() {
            if self.blocks[i].row < row {
                let (r, c) = (self.blocks[i].row + 1, self.blocks[i].col);
                self.blocks[i].row = r;
                self.blocks[i].center = self.cell_center(r, c);
            }
        }
        self.fill_row(0);
        log::info!("Block row {} cleared, grid shifted", row);
        true
    }

    fn fill_row(&mut self, row: u32) {
        for col in 0..self.cols {
            let id = self.next_id;
            self.next_id += 1;
            self.blocks.push(Block {
                id,
                row,
                col,
                center: self.cell_center(row, col),
                size: self.size,
            });
        }
    }
}
