//! Shortest-path solving over the visited-cell grid.
//!
//! Three interchangeable algorithms run on the same 4-connected unit-cost
//! graph: A* (Manhattan heuristic), Dijkstra (uniform cost, kept for
//! comparison) and breadth-first search. On this graph all three are
//! guaranteed to return paths of equal length; the exact cell sequence may
//! differ where several shortest paths exist.
//!
//! Walkability is purely "was this cell visited". Wall data is collected
//! and exported but not consulted here: the robot already avoided walls
//! while exploring, so every visited cell is known-drivable.

mod astar;
mod bfs;
mod dijkstra;

use std::str::FromStr;
use std::time::Instant;

use thiserror::Error;
use tracing::info;

use crate::core::{Cell, Heading, CELL_SIZE_CM};
use crate::grid::MazeGrid;

/// Solver selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Algorithm {
    AStar,
    Dijkstra,
    Bfs,
}

impl Algorithm {
    pub const ALL: [Algorithm; 3] = [Algorithm::AStar, Algorithm::Dijkstra, Algorithm::Bfs];

    pub fn name(self) -> &'static str {
        match self {
            Algorithm::AStar => "astar",
            Algorithm::Dijkstra => "dijkstra",
            Algorithm::Bfs => "bfs",
        }
    }
}

impl FromStr for Algorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "astar" | "a*" => Ok(Algorithm::AStar),
            "dijkstra" => Ok(Algorithm::Dijkstra),
            "bfs" => Ok(Algorithm::Bfs),
            other => Err(format!("unknown algorithm '{other}'")),
        }
    }
}

/// Why a solve request produced no path.
///
/// The first three are caller precondition errors; [`SolveError::NoPath`]
/// is a legitimate search outcome (disconnected visited-cell islands).
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SolveError {
    #[error("need at least 2 visited cells to solve (have {have})")]
    TooFewCells { have: usize },

    #[error("no start or end cell set")]
    MissingEndpoints,

    #[error("start and end are the same cell")]
    IdenticalEndpoints,

    #[error("no connected route between start and end")]
    NoPath,
}

/// A successful solve: the route plus search statistics.
#[derive(Clone, Debug, PartialEq)]
pub struct PathResult {
    /// Cells from start to end inclusive; consecutive cells are adjacent.
    pub cells: Vec<Cell>,
    /// Nodes expanded during the search.
    pub nodes_expanded: usize,
    pub algorithm: Algorithm,
}

impl PathResult {
    /// Number of cell-to-cell moves.
    pub fn edges(&self) -> usize {
        self.cells.len().saturating_sub(1)
    }

    /// Route length in centimeters.
    pub fn length_cm(&self) -> f32 {
        self.edges() as f32 * CELL_SIZE_CM
    }
}

/// Compute a shortest walkable route between the grid's start and end.
pub fn solve(grid: &MazeGrid, algorithm: Algorithm) -> Result<PathResult, SolveError> {
    if grid.cell_count() < 2 {
        return Err(SolveError::TooFewCells {
            have: grid.cell_count(),
        });
    }
    let (start, end) = match (grid.start(), grid.end()) {
        (Some(s), Some(e)) => (s, e),
        _ => return Err(SolveError::MissingEndpoints),
    };
    if start == end {
        return Err(SolveError::IdenticalEndpoints);
    }

    let t0 = Instant::now();
    let found = match algorithm {
        Algorithm::AStar => astar::search(grid, start, end),
        Algorithm::Dijkstra => dijkstra::search(grid, start, end),
        Algorithm::Bfs => bfs::search(grid, start, end),
    };

    match found {
        Some((cells, nodes_expanded)) => {
            let result = PathResult {
                cells,
                nodes_expanded,
                algorithm,
            };
            info!(
                algorithm = algorithm.name(),
                cells = result.cells.len(),
                length_cm = result.length_cm(),
                nodes_expanded,
                elapsed_us = t0.elapsed().as_micros() as u64,
                "route solved"
            );
            Ok(result)
        }
        None => Err(SolveError::NoPath),
    }
}

/// Walkable neighbors of a cell in fixed N, E, S, W order.
pub(crate) fn neighbors(grid: &MazeGrid, cell: Cell) -> impl Iterator<Item = Cell> + '_ {
    Heading::EXPANSION_ORDER
        .into_iter()
        .map(move |h| cell.step(h))
        .filter(|n| grid.is_walkable(n))
}

/// Walk the predecessor map back from the end to rebuild the path.
pub(crate) fn build_path(
    came_from: &std::collections::HashMap<Cell, Cell>,
    end: Cell,
) -> Vec<Cell> {
    let mut path = vec![end];
    let mut current = end;
    while let Some(&prev) = came_from.get(&current) {
        path.push(prev);
        current = prev;
    }
    path.reverse();
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Walls;

    fn grid_of(cells: &[(i32, i32)]) -> MazeGrid {
        let mut grid = MazeGrid::new();
        for &(c, r) in cells {
            grid.add_cell(Cell::new(c, r), Walls::NONE);
        }
        grid
    }

    #[test]
    fn test_too_few_cells() {
        let grid = grid_of(&[(0, 0)]);
        assert_eq!(
            solve(&grid, Algorithm::AStar),
            Err(SolveError::TooFewCells { have: 1 })
        );
    }

    #[test]
    fn test_missing_endpoints() {
        let grid = MazeGrid::new();
        assert_eq!(
            solve(&grid, Algorithm::Bfs),
            Err(SolveError::TooFewCells { have: 0 })
        );
    }

    #[test]
    fn test_identical_endpoints() {
        // End locked on the start cell, then more cells discovered.
        let mut grid = MazeGrid::new();
        grid.add_cell(Cell::new(0, 0), Walls::NONE);
        grid.lock_end();
        grid.add_cell(Cell::new(1, 0), Walls::NONE);
        assert_eq!(
            solve(&grid, Algorithm::Dijkstra),
            Err(SolveError::IdenticalEndpoints)
        );
    }

    #[test]
    fn test_unknown_algorithm_parse() {
        assert!("astar".parse::<Algorithm>().is_ok());
        assert!("A*".parse::<Algorithm>().is_ok());
        assert!("spanning-tree".parse::<Algorithm>().is_err());
    }

    #[test]
    fn test_neighbor_order_fixed() {
        let grid = grid_of(&[(1, 1), (1, 0), (2, 1), (1, 2), (0, 1)]);
        let order: Vec<Cell> = neighbors(&grid, Cell::new(1, 1)).collect();
        assert_eq!(
            order,
            vec![
                Cell::new(1, 0), // N
                Cell::new(2, 1), // E
                Cell::new(1, 2), // S
                Cell::new(0, 1), // W
            ]
        );
    }
}
