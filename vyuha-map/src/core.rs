//! Fundamental maze types: cells, walls and headings.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Side length of one maze cell in centimeters (competition ruling).
pub const CELL_SIZE_CM: f32 = 25.0;

/// A single 25×25 cm maze cell, identified by integer column and row.
///
/// Columns grow East, rows grow South. Cells compare and hash by value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cell {
    pub col: i32,
    pub row: i32,
}

impl Cell {
    pub const fn new(col: i32, row: i32) -> Self {
        Self { col, row }
    }

    /// The cell containing a world coordinate in centimeters.
    pub fn from_point_cm(x: f32, y: f32) -> Self {
        Self {
            col: (x / CELL_SIZE_CM).floor() as i32,
            row: (y / CELL_SIZE_CM).floor() as i32,
        }
    }

    /// Center of this cell in world centimeters.
    pub fn center_cm(&self) -> (f32, f32) {
        (
            self.col as f32 * CELL_SIZE_CM + CELL_SIZE_CM / 2.0,
            self.row as f32 * CELL_SIZE_CM + CELL_SIZE_CM / 2.0,
        )
    }

    /// The adjacent cell one step in the given heading.
    pub fn step(&self, heading: Heading) -> Self {
        let (dc, dr) = heading.delta();
        Self::new(self.col + dc, self.row + dr)
    }

    /// Manhattan distance to another cell, in cells.
    pub fn manhattan(&self, other: &Cell) -> u32 {
        self.col.abs_diff(other.col) + self.row.abs_diff(other.row)
    }

    /// True if `other` is exactly one cardinal step away.
    pub fn is_adjacent(&self, other: &Cell) -> bool {
        self.manhattan(other) == 1
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.col, self.row)
    }
}

/// Wall flags for the four sides of a cell.
///
/// Flags only accumulate: merging never clears a side that was already
/// reported as walled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Walls {
    pub north: bool,
    pub east: bool,
    pub south: bool,
    pub west: bool,
}

impl Walls {
    pub const NONE: Walls = Walls {
        north: false,
        east: false,
        south: false,
        west: false,
    };

    pub const fn new(north: bool, east: bool, south: bool, west: bool) -> Self {
        Self {
            north,
            east,
            south,
            west,
        }
    }

    /// OR-merge another report into this one.
    pub fn merge(&mut self, other: Walls) {
        self.north |= other.north;
        self.east |= other.east;
        self.south |= other.south;
        self.west |= other.west;
    }

    pub fn any(&self) -> bool {
        self.north || self.east || self.south || self.west
    }
}

/// Absolute robot heading on the grid.
///
/// East = 0°, South = 90°, West = 180°, North = 270°. Increasing row is
/// South, so the degree wheel matches the odometry frame, not a compass.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Heading {
    East,
    South,
    West,
    North,
}

impl Heading {
    /// All headings in fixed neighbor-expansion order: N, E, S, W.
    ///
    /// The solvers rely on this order for deterministic tie-breaking.
    pub const EXPANSION_ORDER: [Heading; 4] =
        [Heading::North, Heading::East, Heading::South, Heading::West];

    /// Absolute angle in degrees, in [0, 360).
    pub const fn degrees(self) -> i32 {
        match self {
            Heading::East => 0,
            Heading::South => 90,
            Heading::West => 180,
            Heading::North => 270,
        }
    }

    /// Heading from an angle that is a multiple of 90°.
    pub fn from_degrees(deg: i32) -> Option<Heading> {
        match deg.rem_euclid(360) {
            0 => Some(Heading::East),
            90 => Some(Heading::South),
            180 => Some(Heading::West),
            270 => Some(Heading::North),
            _ => None,
        }
    }

    /// Unit (col, row) delta of one step in this heading.
    pub const fn delta(self) -> (i32, i32) {
        match self {
            Heading::East => (1, 0),
            Heading::South => (0, 1),
            Heading::West => (-1, 0),
            Heading::North => (0, -1),
        }
    }

    /// Absolute heading of a single-cell step from `a` to `b`.
    ///
    /// Returns `None` when the cells are not 4-adjacent.
    pub fn between(a: Cell, b: Cell) -> Option<Heading> {
        match (b.col - a.col, b.row - a.row) {
            (1, 0) => Some(Heading::East),
            (0, 1) => Some(Heading::South),
            (-1, 0) => Some(Heading::West),
            (0, -1) => Some(Heading::North),
            _ => None,
        }
    }

    /// Minimal signed turn from `self` to `to`, in degrees.
    ///
    /// Always in {-90, 0, 90, 180}: a raw delta of 270° becomes -90° so
    /// the robot never turns the long way around. 180° is executed as two
    /// same-direction 90° rotations by the sequencer.
    pub fn turn_to(self, to: Heading) -> i32 {
        let delta = (to.degrees() - self.degrees()).rem_euclid(360);
        if delta == 270 {
            -90
        } else {
            delta
        }
    }

    /// The reverse heading; the neighbor's facing side when mirroring walls.
    pub const fn opposite(self) -> Heading {
        match self {
            Heading::East => Heading::West,
            Heading::South => Heading::North,
            Heading::West => Heading::East,
            Heading::North => Heading::South,
        }
    }
}

impl fmt::Display for Heading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Heading::East => "East",
            Heading::South => "South",
            Heading::West => "West",
            Heading::North => "North",
        };
        f.write_str(s)
    }
}

impl FromStr for Heading {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "east" | "e" => Ok(Heading::East),
            "south" | "s" => Ok(Heading::South),
            "west" | "w" => Ok(Heading::West),
            "north" | "n" => Ok(Heading::North),
            other => Err(format!("unknown heading '{other}'")),
        }
    }
}
