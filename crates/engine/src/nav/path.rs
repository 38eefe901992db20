use std::cmp::Ordering;

use tracing::debug;

use super::grid::{CellCoord, WalkabilityGrid};

/// Hard ceiling on node expansions per search.
pub const MAX_PATH_EXPANSIONS: usize = 20_000;

const AXIS_STEP_COST: f64 = 1.0;
const DIAGONAL_STEP_COST: f64 = std::f64::consts::SQRT_2;

const NEIGHBOR_OFFSETS: [(i32, i32); 8] = [
    (0, -1),
    (1, 0),
    (0, 1),
    (-1, 0),
    (1, -1),
    (1, 1),
    (-1, 1),
    (-1, -1),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathResolution {
    /// The path ends on the requested cell.
    Reached,
    /// The requested cell was not reached; the path ends on the explored cell
    /// closest to it.
    Closest,
    /// No movement: start is invalid or already the closest reachable cell.
    Stay,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CellPath {
    /// Cells to visit after the start cell, in order.
    pub cells: Vec<CellCoord>,
    pub resolution: PathResolution,
    pub expansions: usize,
}

impl CellPath {
    fn stay(expansions: usize) -> Self {
        Self {
            cells: Vec::new(),
            resolution: PathResolution::Stay,
            expansions,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct OpenNode {
    index: usize,
    g_cost: f64,
    h_cost: f64,
    f_cost: f64,
    insertion_order: u64,
}

/// A* over 8-connected cells with a Euclidean heuristic. Never fails: an
/// unreachable or out-of-bounds `end` yields the path to the explored cell
/// nearest to it, and a start that is itself that cell yields no movement.
pub fn find_path(grid: &WalkabilityGrid, start: CellCoord, end: CellCoord) -> CellPath {
    find_path_with_limit(grid, start, end, MAX_PATH_EXPANSIONS)
}

pub fn find_path_with_limit(
    grid: &WalkabilityGrid,
    start: CellCoord,
    end: CellCoord,
    max_expansions: usize,
) -> CellPath {
    let Some(start_index) = grid.index_of(start) else {
        return CellPath::stay(0);
    };
    if !grid.is_walkable(start) || start == end {
        return CellPath::stay(0);
    }

    let node_count = grid.cell_count();
    let mut closed = vec![false; node_count];
    let mut best_g = vec![f64::INFINITY; node_count];
    let mut parent = vec![None::<usize>; node_count];
    let mut open = Vec::new();
    let mut next_insertion = 0u64;

    let start_h = euclidean(start, end);
    best_g[start_index] = 0.0;
    open.push(OpenNode {
        index: start_index,
        g_cost: 0.0,
        h_cost: start_h,
        f_cost: start_h,
        insertion_order: next_insertion,
    });
    next_insertion += 1;

    let mut closest_index = start_index;
    let mut closest_h = start_h;
    let mut expansions = 0usize;

    while !open.is_empty() && expansions < max_expansions {
        let best = pick_best_open_node_index(&open);
        let current = open.swap_remove(best);
        if closed[current.index] || current.g_cost > best_g[current.index] {
            continue;
        }
        closed[current.index] = true;
        expansions += 1;

        if current.h_cost < closest_h {
            closest_h = current.h_cost;
            closest_index = current.index;
        }

        let coord = grid.coord_of(current.index);
        if coord == end {
            return CellPath {
                cells: reconstruct(grid, &parent, start_index, current.index),
                resolution: PathResolution::Reached,
                expansions,
            };
        }

        for (dx, dy) in NEIGHBOR_OFFSETS {
            let neighbor = CellCoord::new(coord.x + dx, coord.y + dy);
            let Some(neighbor_index) = grid.index_of(neighbor) else {
                continue;
            };
            if closed[neighbor_index] || !grid.is_walkable(neighbor) {
                continue;
            }
            let diagonal = dx != 0 && dy != 0;
            if diagonal
                && !(grid.is_walkable(CellCoord::new(coord.x + dx, coord.y))
                    && grid.is_walkable(CellCoord::new(coord.x, coord.y + dy)))
            {
                continue;
            }

            let step = if diagonal {
                DIAGONAL_STEP_COST
            } else {
                AXIS_STEP_COST
            };
            let tentative_g = current.g_cost + step;
            if tentative_g >= best_g[neighbor_index] {
                continue;
            }
            best_g[neighbor_index] = tentative_g;
            parent[neighbor_index] = Some(current.index);
            let h_cost = euclidean(neighbor, end);
            open.push(OpenNode {
                index: neighbor_index,
                g_cost: tentative_g,
                h_cost,
                f_cost: tentative_g + h_cost,
                insertion_order: next_insertion,
            });
            next_insertion += 1;
        }
    }

    if closest_index == start_index {
        debug!(
            start_x = start.x,
            start_y = start.y,
            end_x = end.x,
            end_y = end.y,
            expansions,
            "path_no_progress"
        );
        return CellPath::stay(expansions);
    }

    let cells = reconstruct(grid, &parent, start_index, closest_index);
    debug!(
        start_x = start.x,
        start_y = start.y,
        end_x = end.x,
        end_y = end.y,
        expansions,
        limit_hit = expansions >= max_expansions,
        steps = cells.len(),
        "path_fallback"
    );
    CellPath {
        cells,
        resolution: PathResolution::Closest,
        expansions,
    }
}

fn pick_best_open_node_index(open: &[OpenNode]) -> usize {
    let mut best_index = 0usize;
    for index in 1..open.len() {
        if open_node_order(&open[index], &open[best_index]) == Ordering::Less {
            best_index = index;
        }
    }
    best_index
}

/// Lowest f, then lowest h, then earliest insertion.
fn open_node_order(a: &OpenNode, b: &OpenNode) -> Ordering {
    a.f_cost
        .total_cmp(&b.f_cost)
        .then_with(|| a.h_cost.total_cmp(&b.h_cost))
        .then_with(|| a.insertion_order.cmp(&b.insertion_order))
}

fn reconstruct(
    grid: &WalkabilityGrid,
    parent: &[Option<usize>],
    start_index: usize,
    goal_index: usize,
) -> Vec<CellCoord> {
    let mut indices = Vec::new();
    let mut cursor = goal_index;
    while cursor != start_index {
        indices.push(cursor);
        match parent.get(cursor).copied().flatten() {
            Some(next) => cursor = next,
            None => break,
        }
    }
    indices.reverse();
    indices.into_iter().map(|index| grid.coord_of(index)).collect()
}

fn euclidean(a: CellCoord, b: CellCoord) -> f64 {
    let dx = f64::from(a.x) - f64::from(b.x);
    let dy = f64::from(a.y) - f64::from(b.y);
    (dx * dx + dy * dy).sqrt()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::nav::mask::WalkabilityMask;

    /// One mask pixel per cell so tests can draw grids directly.
    fn grid_from_rows(rows: &[&str]) -> WalkabilityGrid {
        let height = rows.len() as u32;
        let width = rows[0].len() as u32;
        let alpha = rows
            .iter()
            .flat_map(|row| row.chars().map(|ch| if ch == '#' { 255u8 } else { 0u8 }))
            .collect();
        let mask = WalkabilityMask::from_alpha(width, height, alpha).expect("mask");
        WalkabilityGrid::build_with_cell_size(&mask, 1)
    }

    fn open_grid(width: usize, height: usize) -> WalkabilityGrid {
        let row = ".".repeat(width);
        let rows = vec![row.as_str(); height];
        grid_from_rows(&rows)
    }

    fn assert_contiguous(start: CellCoord, cells: &[CellCoord]) {
        let mut previous = start;
        for cell in cells {
            assert_eq!(previous.chebyshev_distance(*cell), 1, "gap before {cell:?}");
            previous = *cell;
        }
    }

    #[test]
    fn open_grid_path_is_chebyshev_optimal_and_never_revisits() {
        let grid = open_grid(12, 9);
        let cases = [
            (CellCoord::new(0, 0), CellCoord::new(11, 8)),
            (CellCoord::new(5, 4), CellCoord::new(0, 4)),
            (CellCoord::new(2, 7), CellCoord::new(9, 1)),
            (CellCoord::new(3, 3), CellCoord::new(4, 4)),
        ];
        for (start, end) in cases {
            let path = find_path(&grid, start, end);
            assert_eq!(path.resolution, PathResolution::Reached);
            assert_eq!(
                path.cells.len() as u32,
                start.chebyshev_distance(end),
                "{start:?} -> {end:?}"
            );
            assert_eq!(path.cells.last(), Some(&end));
            assert_contiguous(start, &path.cells);
            let unique = path.cells.iter().collect::<HashSet<_>>();
            assert_eq!(unique.len(), path.cells.len());
            assert!(!path.cells.contains(&start));
        }
    }

    #[test]
    fn path_routes_around_walls() {
        let grid = grid_from_rows(&[
            ".......", //
            "...#...", //
            "...#...", //
            "...#...", //
            ".......",
        ]);
        let start = CellCoord::new(1, 2);
        let end = CellCoord::new(5, 2);
        let path = find_path(&grid, start, end);
        assert_eq!(path.resolution, PathResolution::Reached);
        assert_contiguous(start, &path.cells);
        for cell in &path.cells {
            assert!(grid.is_walkable(*cell), "stepped onto blocked cell {cell:?}");
        }
    }

    #[test]
    fn diagonal_moves_do_not_cut_blocked_corners() {
        let grid = grid_from_rows(&[
            ".#", //
            "..",
        ]);
        let path = find_path(&grid, CellCoord::new(0, 0), CellCoord::new(1, 1));
        assert_eq!(path.cells, vec![CellCoord::new(0, 1), CellCoord::new(1, 1)]);
    }

    #[test]
    fn isolated_goal_falls_back_to_closest_cell_next_to_barrier() {
        let grid = grid_from_rows(&[
            "....#..", //
            "....#..", //
            "....#..",
        ]);
        let start = CellCoord::new(0, 1);
        let end = CellCoord::new(6, 1);
        let path = find_path(&grid, start, end);
        assert_eq!(path.resolution, PathResolution::Closest);
        let last = *path.cells.last().expect("non-empty fallback");
        assert_eq!(last, CellCoord::new(3, 1));
        assert!(!grid.is_walkable(CellCoord::new(last.x + 1, last.y)));
        assert_contiguous(start, &path.cells);
    }

    #[test]
    fn empty_only_when_start_is_closest() {
        let grid = grid_from_rows(&[
            "#####", //
            "#.#.#", //
            "#####",
        ]);
        let path = find_path(&grid, CellCoord::new(1, 1), CellCoord::new(3, 1));
        assert_eq!(path.resolution, PathResolution::Stay);
        assert!(path.cells.is_empty());
    }

    #[test]
    fn invalid_start_or_same_cell_means_no_movement() {
        let grid = grid_from_rows(&[
            "#..", //
            "...",
        ]);
        assert!(find_path(&grid, CellCoord::new(0, 0), CellCoord::new(2, 1))
            .cells
            .is_empty());
        assert!(find_path(&grid, CellCoord::new(-3, 0), CellCoord::new(2, 1))
            .cells
            .is_empty());
        assert!(find_path(&grid, CellCoord::new(1, 1), CellCoord::new(1, 1))
            .cells
            .is_empty());
    }

    #[test]
    fn out_of_bounds_goal_walks_to_nearest_edge() {
        let grid = open_grid(6, 3);
        let path = find_path(&grid, CellCoord::new(0, 1), CellCoord::new(20, 1));
        assert_eq!(path.resolution, PathResolution::Closest);
        assert_eq!(path.cells.last(), Some(&CellCoord::new(5, 1)));
    }

    #[test]
    fn expansion_limit_returns_best_effort_progress() {
        let grid = open_grid(40, 40);
        let start = CellCoord::new(0, 0);
        let end = CellCoord::new(39, 39);
        let path = find_path_with_limit(&grid, start, end, 10);
        assert_eq!(path.expansions, 10);
        assert_eq!(path.resolution, PathResolution::Closest);
        let last = *path.cells.last().expect("progress");
        assert!(last.chebyshev_distance(end) < start.chebyshev_distance(end));
    }

    #[test]
    fn search_is_deterministic_on_symmetric_map() {
        let grid = grid_from_rows(&[
            ".....", //
            ".....", //
            "..#..", //
            ".....", //
            ".....",
        ]);
        let first = find_path(&grid, CellCoord::new(0, 2), CellCoord::new(4, 2));
        let second = find_path(&grid, CellCoord::new(0, 2), CellCoord::new(4, 2));
        assert_eq!(first, second);
    }
}
