//! Breadth-first search.
//!
//! Frontier expansion over the unit-cost grid; guarantees a shortest path
//! by edge count.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::core::Cell;
use crate::grid::MazeGrid;

use super::{build_path, neighbors};

pub(super) fn search(grid: &MazeGrid, start: Cell, end: Cell) -> Option<(Vec<Cell>, usize)> {
    let mut seen: HashSet<Cell> = HashSet::from([start]);
    let mut came_from: HashMap<Cell, Cell> = HashMap::new();
    let mut frontier = VecDeque::from([start]);
    let mut expanded = 0usize;

    while let Some(cell) = frontier.pop_front() {
        if cell == end {
            return Some((build_path(&came_from, end), expanded));
        }
        expanded += 1;

        for nb in neighbors(grid, cell) {
            if seen.insert(nb) {
                came_from.insert(nb, cell);
                frontier.push_back(nb);
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Walls;

    #[test]
    fn test_l_shaped_route() {
        let mut grid = MazeGrid::new();
        for (c, r) in [(0, 0), (1, 0), (2, 0), (2, 1)] {
            grid.add_cell(Cell::new(c, r), Walls::NONE);
        }
        let (path, _) = search(&grid, Cell::new(0, 0), Cell::new(2, 1)).unwrap();
        assert_eq!(
            path,
            vec![
                Cell::new(0, 0),
                Cell::new(1, 0),
                Cell::new(2, 0),
                Cell::new(2, 1)
            ]
        );
    }

    #[test]
    fn test_disconnected_returns_none() {
        let mut grid = MazeGrid::new();
        grid.add_cell(Cell::new(0, 0), Walls::NONE);
        grid.add_cell(Cell::new(1, 0), Walls::NONE);
        grid.add_cell(Cell::new(5, 5), Walls::NONE);
        assert!(search(&grid, Cell::new(0, 0), Cell::new(5, 5)).is_none());
    }
}
