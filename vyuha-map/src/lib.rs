//! # Vyuha-Map: Maze Grid Model and Pathfinding
//!
//! Grid model and shortest-path solving for a maze built from 25×25 cm
//! cells, as discovered by a small wheeled robot during exploration.
//!
//! ## Overview
//!
//! The robot reports each cell it drives through, optionally with the
//! walls it sensed on the cell's four sides. This crate accumulates those
//! reports into a [`MazeGrid`] and computes shortest routes over the
//! visited cells with a choice of algorithm (A*, Dijkstra, BFS).
//!
//! ## Modules
//!
//! - [`core`]: Fundamental types ([`Cell`], [`Walls`], [`Heading`])
//! - [`grid`]: The [`MazeGrid`] visited-cell model
//! - [`pathfinding`]: Shortest-path solvers over the grid
//! - [`io`]: Text-format parsing and export of recorded cell logs
//!
//! ## Coordinate frame
//!
//! Columns grow East, rows grow South (screen convention inherited from
//! the robot's odometry). Headings are absolute: East = 0°, South = 90°,
//! West = 180°, North = 270°.

pub mod core;
pub mod grid;
pub mod io;
pub mod pathfinding;

pub use crate::core::{Cell, Heading, Walls, CELL_SIZE_CM};
pub use crate::grid::MazeGrid;
pub use crate::pathfinding::{solve, Algorithm, PathResult, SolveError};
