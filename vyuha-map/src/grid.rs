//! The visited-cell maze grid.
//!
//! Accumulates cell and wall reports from the robot during exploration.
//! Cells are never removed once visited (only a full [`MazeGrid::reset`]
//! clears them) and wall flags only accumulate, so the model is monotone
//! with respect to the incoming feed: late or duplicated messages cannot
//! regress it.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::core::{Cell, Heading, Walls};

/// Bounding box of the visited area, in cell coordinates (inclusive).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Bounds {
    pub min_col: i32,
    pub max_col: i32,
    pub min_row: i32,
    pub max_row: i32,
}

/// Grid model of the maze as discovered so far.
#[derive(Clone, Debug, Default)]
pub struct MazeGrid {
    visited: HashSet<Cell>,
    /// Cells in first-discovery order; no duplicates.
    visit_order: Vec<Cell>,
    /// Wall flags per cell. May hold entries for unvisited neighbor cells
    /// filled in by propagation.
    wall_map: HashMap<Cell, Walls>,
    start: Option<Cell>,
    end: Option<Cell>,
    /// While exploration is active the end cell tracks the newest
    /// discovery; locking freezes it as the route goal.
    end_locked: bool,
    bounds: Bounds,
    /// Raw odometry samples in cm, kept for export of classic logs.
    points: Vec<(f32, f32)>,
    /// Last cell the robot reported from (display/status only).
    robot_cell: Option<Cell>,
}

impl MazeGrid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a cell report from the robot.
    ///
    /// Idempotent for membership; wall flags OR-merge and each reported
    /// wall is mirrored onto the neighbor's opposite side. On first
    /// insertion the bounding box and end cell update, and the very first
    /// cell ever becomes the start cell.
    pub fn add_cell(&mut self, cell: Cell, walls: Walls) {
        if walls.any() {
            self.wall_map.entry(cell).or_default().merge(walls);

            // A wall seen from this side exists on the neighbor's side too.
            // The neighbor may be unvisited or even carry contradictory data
            // from the field; the OR-merge treats that as noise, not an error.
            for heading in Heading::EXPANSION_ORDER {
                if side_reported(&walls, heading) {
                    let neighbor = cell.step(heading);
                    let entry = self.wall_map.entry(neighbor).or_default();
                    match heading.opposite() {
                        Heading::North => entry.north = true,
                        Heading::East => entry.east = true,
                        Heading::South => entry.south = true,
                        Heading::West => entry.west = true,
                    }
                }
            }
        }

        if self.visited.insert(cell) {
            self.visit_order.push(cell);

            if self.visit_order.len() == 1 {
                self.start = Some(cell);
                self.bounds = Bounds {
                    min_col: cell.col,
                    max_col: cell.col,
                    min_row: cell.row,
                    max_row: cell.row,
                };
            } else {
                self.bounds.min_col = self.bounds.min_col.min(cell.col);
                self.bounds.max_col = self.bounds.max_col.max(cell.col);
                self.bounds.min_row = self.bounds.min_row.min(cell.row);
                self.bounds.max_row = self.bounds.max_row.max(cell.row);
            }

            if !self.end_locked {
                self.end = Some(cell);
            }
            debug!(cell = %cell, total = self.visited.len(), "cell discovered");
        }

        self.robot_cell = Some(cell);
    }

    /// Record a raw odometry sample and visit its containing cell.
    pub fn add_point(&mut self, x_cm: f32, y_cm: f32) -> usize {
        self.points.push((x_cm, y_cm));
        self.add_cell(Cell::from_point_cm(x_cm, y_cm), Walls::NONE);
        self.points.len()
    }

    /// Clear all state back to an empty grid.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// True iff the cell was visited by the robot.
    pub fn is_walkable(&self, cell: &Cell) -> bool {
        self.visited.contains(cell)
    }

    /// Freeze the end cell so later discoveries stop moving the goal.
    pub fn lock_end(&mut self) {
        self.end_locked = true;
    }

    /// Resume tracking the newest discovery as the end cell.
    pub fn unlock_end(&mut self) {
        self.end_locked = false;
        if let Some(last) = self.visit_order.last() {
            self.end = Some(*last);
        }
    }

    pub fn start(&self) -> Option<Cell> {
        self.start
    }

    pub fn end(&self) -> Option<Cell> {
        self.end
    }

    pub fn end_locked(&self) -> bool {
        self.end_locked
    }

    pub fn cell_count(&self) -> usize {
        self.visited.len()
    }

    pub fn visit_order(&self) -> &[Cell] {
        &self.visit_order
    }

    pub fn walls(&self, cell: &Cell) -> Walls {
        self.wall_map.get(cell).copied().unwrap_or_default()
    }

    /// Cells with at least one recorded wall entry.
    pub fn wall_count(&self) -> usize {
        self.wall_map.len()
    }

    pub fn wall_map(&self) -> &HashMap<Cell, Walls> {
        &self.wall_map
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn points(&self) -> &[(f32, f32)] {
        &self.points
    }

    pub fn robot_cell(&self) -> Option<Cell> {
        self.robot_cell
    }
}

fn side_reported(walls: &Walls, heading: Heading) -> bool {
    match heading {
        Heading::North => walls.north,
        Heading::East => walls.east,
        Heading::South => walls.south,
        Heading::West => walls.west,
    }
}
