mod grid;
mod mask;
mod path;

use std::collections::VecDeque;

use crate::geometry::Vec2;

pub use grid::{is_walkable_majority, CellCoord, WalkabilityGrid, GRID_CELL_SIZE_PX};
pub use mask::{MaskError, WalkabilityMask};
pub use path::{find_path, find_path_with_limit, CellPath, PathResolution, MAX_PATH_EXPANSIONS};

/// Waypoints in mask pixel space, consumed front to back by the motion
/// controller.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Path {
    waypoints: VecDeque<Vec2>,
    resolution: Option<PathResolution>,
}

impl Path {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_waypoints(waypoints: impl IntoIterator<Item = Vec2>) -> Self {
        Self {
            waypoints: waypoints.into_iter().collect(),
            resolution: None,
        }
    }

    pub fn from_cells(grid: &WalkabilityGrid, cell_path: &CellPath) -> Self {
        Self {
            waypoints: cell_path
                .cells
                .iter()
                .map(|cell| grid.cell_center(*cell))
                .collect(),
            resolution: Some(cell_path.resolution),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn resolution(&self) -> Option<PathResolution> {
        self.resolution
    }

    pub fn waypoints(&self) -> impl Iterator<Item = Vec2> + '_ {
        self.waypoints.iter().copied()
    }

    pub fn last_waypoint(&self) -> Option<Vec2> {
        self.waypoints.back().copied()
    }

    pub(crate) fn pop_front(&mut self) -> Option<Vec2> {
        self.waypoints.pop_front()
    }

    pub(crate) fn clear(&mut self) {
        self.waypoints.clear();
    }
}

/// Plans from one pixel-space point to another over the coarse grid.
pub fn plan_path(grid: &WalkabilityGrid, from: Vec2, to: Vec2) -> Path {
    let start = grid.cell_at(from);
    let end = grid.cell_at(to);
    let cell_path = find_path(grid, start, end);
    Path::from_cells(grid, &cell_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn planned_waypoints_are_cell_centers_in_pixel_space() {
        let mask = WalkabilityMask::from_alpha(64, 32, vec![0; 64 * 32]).expect("mask");
        let grid = WalkabilityGrid::build_with_cell_size(&mask, 16);
        let path = plan_path(&grid, Vec2::new(4.0, 4.0), Vec2::new(60.0, 4.0));
        assert_eq!(path.resolution(), Some(PathResolution::Reached));
        assert_eq!(
            path.waypoints().collect::<Vec<_>>(),
            vec![
                Vec2::new(24.0, 8.0),
                Vec2::new(40.0, 8.0),
                Vec2::new(56.0, 8.0)
            ]
        );
    }

    #[test]
    fn same_cell_target_yields_empty_path() {
        let mask = WalkabilityMask::from_alpha(32, 32, vec![0; 32 * 32]).expect("mask");
        let grid = WalkabilityGrid::build_with_cell_size(&mask, 16);
        let path = plan_path(&grid, Vec2::new(1.0, 1.0), Vec2::new(14.0, 14.0));
        assert!(path.is_empty());
        assert_eq!(path.resolution(), Some(PathResolution::Stay));
    }
}
