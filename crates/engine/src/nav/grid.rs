use crate::geometry::Vec2;

use super::mask::WalkabilityMask;

/// Side length, in mask pixels, of one coarse navigation cell. Shared by grid
/// construction and every point/cell transform.
pub const GRID_CELL_SIZE_PX: u32 = 16;

/// Coarse cell position. Signed so that targets outside the mask can still be
/// expressed (they are simply unreachable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellCoord {
    pub x: i32,
    pub y: i32,
}

impl CellCoord {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn chebyshev_distance(self, other: CellCoord) -> u32 {
        self.x.abs_diff(other.x).max(self.y.abs_diff(other.y))
    }
}

/// A cell is walkable when transparent pixels are a strict majority of the
/// pixels it covers; ties block.
pub fn is_walkable_majority(transparent: u32, sampled: u32) -> bool {
    sampled > 0 && transparent.saturating_mul(2) > sampled
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkabilityGrid {
    width: u32,
    height: u32,
    cell_size: u32,
    mask_width: u32,
    mask_height: u32,
    walkable: Vec<bool>,
}

impl WalkabilityGrid {
    pub fn build(mask: &WalkabilityMask) -> Self {
        Self::build_with_cell_size(mask, GRID_CELL_SIZE_PX)
    }

    pub fn build_with_cell_size(mask: &WalkabilityMask, cell_size: u32) -> Self {
        let cell_size = cell_size.max(1);
        let mask_width = mask.width();
        let mask_height = mask.height();
        let width = mask_width.div_ceil(cell_size);
        let height = mask_height.div_ceil(cell_size);

        let mut walkable = Vec::with_capacity(width as usize * height as usize);
        for cell_y in 0..height {
            let y_start = cell_y * cell_size;
            let y_end = (y_start + cell_size).min(mask_height);
            for cell_x in 0..width {
                let x_start = cell_x * cell_size;
                let x_end = (x_start + cell_size).min(mask_width);
                let mut transparent = 0u32;
                let mut sampled = 0u32;
                for y in y_start..y_end {
                    for x in x_start..x_end {
                        sampled += 1;
                        if mask.is_walkable_pixel(x, y) {
                            transparent += 1;
                        }
                    }
                }
                walkable.push(is_walkable_majority(transparent, sampled));
            }
        }

        Self {
            width,
            height,
            cell_size,
            mask_width,
            mask_height,
            walkable,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn cell_size(&self) -> u32 {
        self.cell_size
    }

    pub fn cell_count(&self) -> usize {
        self.walkable.len()
    }

    pub fn walkable_cell_count(&self) -> usize {
        self.walkable.iter().filter(|walkable| **walkable).count()
    }

    pub fn index_of(&self, cell: CellCoord) -> Option<usize> {
        if cell.x < 0 || cell.y < 0 {
            return None;
        }
        let (x, y) = (cell.x as u32, cell.y as u32);
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }

    pub fn coord_of(&self, index: usize) -> CellCoord {
        let width = self.width.max(1) as usize;
        CellCoord {
            x: (index % width) as i32,
            y: (index / width) as i32,
        }
    }

    /// Out-of-bounds cells are not walkable.
    pub fn is_walkable(&self, cell: CellCoord) -> bool {
        self.index_of(cell)
            .and_then(|index| self.walkable.get(index))
            .copied()
            .unwrap_or(false)
    }

    pub fn cell_at(&self, point: Vec2) -> CellCoord {
        let size = self.cell_size as f32;
        CellCoord {
            x: (point.x / size).floor() as i32,
            y: (point.y / size).floor() as i32,
        }
    }

    /// Center of the in-bounds part of a cell, so partial edge cells yield a
    /// point inside the mask.
    pub fn cell_center(&self, cell: CellCoord) -> Vec2 {
        let size = self.cell_size as f32;
        let x_start = cell.x as f32 * size;
        let y_start = cell.y as f32 * size;
        let x_end = (x_start + size).min(self.mask_width as f32).max(x_start);
        let y_end = (y_start + size).min(self.mask_height as f32).max(y_start);
        Vec2 {
            x: (x_start + x_end) * 0.5,
            y: (y_start + y_end) * 0.5,
        }
    }
}
