//! Shared state between the receiver thread and the control flow.
//!
//! Flags are plain atomics; the route status detail sits behind a lock.
//! Everything here is advisory except `abort`, `shutdown` and
//! `route_running`, which gate control flow.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::{Mutex, RwLock};

use vyuha_map::MazeGrid;

/// Human-readable route execution state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RouteState {
    #[default]
    Idle,
    Running,
    Done,
    Aborted,
}

impl RouteState {
    pub fn tag(self) -> &'static str {
        match self {
            RouteState::Idle => "idle",
            RouteState::Running => "running",
            RouteState::Done => "done",
            RouteState::Aborted => "aborted",
        }
    }
}

/// Progress snapshot published after every completed route segment.
#[derive(Clone, Copy, Debug, Default)]
pub struct RouteStatus {
    pub state: RouteState,
    /// Completed segment count.
    pub step: usize,
    /// Total segments in the route.
    pub total: usize,
}

/// Shared state for the whole robot session.
#[derive(Debug, Default)]
pub struct SharedState {
    /// Cooperative route abort flag (SIGINT or operator request).
    abort: AtomicBool,

    /// Graceful termination signal for worker threads.
    shutdown: AtomicBool,

    /// Robot handshake completed.
    connected: AtomicBool,

    /// At most one autonomous run per session may be active.
    route_running: AtomicBool,

    route_status: RwLock<RouteStatus>,

    /// When the last new cell arrived (mapping idle detection).
    last_cell_at: Mutex<Option<Instant>>,
}

impl SharedState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_abort(&self) {
        self.abort.store(true, Ordering::Release);
    }

    pub fn abort_requested(&self) -> bool {
        self.abort.load(Ordering::Acquire)
    }

    pub fn clear_abort(&self) {
        self.abort.store(false, Ordering::Release);
    }

    pub fn signal_shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
    }

    pub fn should_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::Release);
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Claim the single route slot. Returns false if a run is already
    /// active; the active run is unaffected.
    pub fn try_begin_route(&self) -> bool {
        self.route_running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn end_route(&self) {
        self.route_running.store(false, Ordering::Release);
    }

    pub fn route_active(&self) -> bool {
        self.route_running.load(Ordering::Acquire)
    }

    pub fn publish_progress(&self, state: RouteState, step: usize, total: usize) {
        *self.route_status.write() = RouteStatus { state, step, total };
    }

    pub fn route_status(&self) -> RouteStatus {
        *self.route_status.read()
    }

    /// Called by the receiver whenever a new cell arrives.
    pub fn note_cell(&self) {
        *self.last_cell_at.lock() = Some(Instant::now());
    }

    /// Seconds since the last new cell, if any arrived yet.
    pub fn secs_since_last_cell(&self) -> Option<f32> {
        self.last_cell_at.lock().map(|t| t.elapsed().as_secs_f32())
    }
}

/// Thread-safe maze grid handle.
pub type SharedGrid = Arc<RwLock<MazeGrid>>;
