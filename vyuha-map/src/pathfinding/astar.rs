//! A* search with a Manhattan-distance heuristic.
//!
//! On a 4-connected grid with unit moves the Manhattan heuristic is
//! admissible and consistent, so the first time the goal is popped the
//! path is optimal. Ties on `f` break by insertion sequence (the node
//! pushed first wins) to keep results deterministic.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use crate::core::Cell;
use crate::grid::MazeGrid;

use super::{build_path, neighbors};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Node {
    f: u32,
    /// Push sequence number; earlier pushes win among equal `f`.
    seq: u32,
    cell: Cell,
}

impl Ord for Node {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap behavior.
        other
            .f
            .cmp(&self.f)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Node {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

pub(super) fn search(grid: &MazeGrid, start: Cell, end: Cell) -> Option<(Vec<Cell>, usize)> {
    let mut g_score: HashMap<Cell, u32> = HashMap::from([(start, 0)]);
    let mut came_from: HashMap<Cell, Cell> = HashMap::new();
    let mut open = BinaryHeap::new();
    let mut seq = 0u32;
    let mut expanded = 0usize;

    open.push(Node {
        f: start.manhattan(&end),
        seq,
        cell: start,
    });

    while let Some(Node { cell, .. }) = open.pop() {
        if cell == end {
            return Some((build_path(&came_from, end), expanded));
        }
        expanded += 1;

        let g = g_score[&cell];
        for nb in neighbors(grid, cell) {
            let tentative = g + 1;
            if tentative < g_score.get(&nb).copied().unwrap_or(u32::MAX) {
                came_from.insert(nb, cell);
                g_score.insert(nb, tentative);
                seq += 1;
                open.push(Node {
                    f: tentative + nb.manhattan(&end),
                    seq,
                    cell: nb,
                });
            }
        }
    }

    None
}
