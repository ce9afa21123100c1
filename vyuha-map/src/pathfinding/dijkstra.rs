//! Dijkstra's algorithm, uniform-cost variant.
//!
//! On the unit-cost visited-cell graph this is equivalent in result to A*
//! with a zero heuristic and to BFS; it is kept for comparison and must
//! produce paths of identical length to both on the same input.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use crate::core::Cell;
use crate::grid::MazeGrid;

use super::{build_path, neighbors};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct State {
    cost: u32,
    seq: u32,
    cell: Cell,
}

impl Ord for State {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap (BinaryHeap is a max-heap).
        other
            .cost
            .cmp(&self.cost)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

pub(super) fn search(grid: &MazeGrid, start: Cell, end: Cell) -> Option<(Vec<Cell>, usize)> {
    let mut dist: HashMap<Cell, u32> = HashMap::from([(start, 0)]);
    let mut came_from: HashMap<Cell, Cell> = HashMap::new();
    let mut heap = BinaryHeap::new();
    let mut seq = 0u32;
    let mut expanded = 0usize;

    heap.push(State {
        cost: 0,
        seq,
        cell: start,
    });

    while let Some(State { cost, cell, .. }) = heap.pop() {
        // Skip stale entries superseded by a shorter relaxation.
        if cost > dist.get(&cell).copied().unwrap_or(u32::MAX) {
            continue;
        }
        if cell == end {
            return Some((build_path(&came_from, end), expanded));
        }
        expanded += 1;

        for nb in neighbors(grid, cell) {
            let next = cost + 1;
            if next < dist.get(&nb).copied().unwrap_or(u32::MAX) {
                dist.insert(nb, next);
                came_from.insert(nb, cell);
                seq += 1;
                heap.push(State {
                    cost: next,
                    seq,
                    cell: nb,
                });
            }
        }
    }

    None
}
