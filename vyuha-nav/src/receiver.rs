//! Receiver thread: drains the inbound link feed and fans events out.
//!
//! Runs for the whole session at whatever rate the robot reports
//! (encoder bursts during motion, cell reports during mapping). Each
//! event goes to exactly one consumer:
//! - `STEPS` reports feed the [`PulseTracker`],
//! - `CELL` and odometry points feed the shared grid,
//! - the handshake and free text go to the log and connection flag.
//!
//! A read timeout on the socket bounds how long the loop can go without
//! checking the shutdown flag. Link loss signals shutdown so the main
//! thread stops waiting for mapping input.

use std::io::BufReader;
use std::net::TcpStream;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, info, warn};

use crate::error::Result;
use crate::link::{self, LinkEvent};
use crate::pulse::PulseTracker;
use crate::shared::{SharedGrid, SharedState};

pub struct ReceiverThread {
    reader: BufReader<TcpStream>,
    tracker: Arc<PulseTracker>,
    grid: SharedGrid,
    shared: Arc<SharedState>,
}

impl ReceiverThread {
    pub fn new(
        reader: BufReader<TcpStream>,
        tracker: Arc<PulseTracker>,
        grid: SharedGrid,
        shared: Arc<SharedState>,
    ) -> Self {
        Self {
            reader,
            tracker,
            grid,
            shared,
        }
    }

    /// Spawn the receiver on its own named thread.
    pub fn spawn(mut self) -> Result<JoinHandle<()>> {
        let handle = thread::Builder::new()
            .name("receiver".into())
            .spawn(move || self.run())
            .map_err(crate::error::NavError::Connection)?;
        Ok(handle)
    }

    fn run(&mut self) {
        info!("receiver thread started");

        loop {
            if self.shared.should_shutdown() {
                info!("receiver thread shutting down");
                break;
            }

            match link::read_line(&mut self.reader) {
                Ok(Some(line)) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    let event = link::parse_event(&line);
                    dispatch(event, &self.tracker, &self.grid, &self.shared);
                }
                // Read timeout; loop back and poll the shutdown flag.
                Ok(None) => {}
                Err(e) => {
                    warn!(error = %e, "link lost, ending session");
                    self.shared.set_connected(false);
                    self.shared.signal_shutdown();
                    break;
                }
            }
        }
    }
}

/// Route one inbound event to its consumer.
fn dispatch(event: LinkEvent, tracker: &PulseTracker, grid: &SharedGrid, shared: &SharedState) {
    match event {
        LinkEvent::Connected => {
            info!("robot handshake acknowledged");
            shared.set_connected(true);
        }
        LinkEvent::Pulses { left, right } => {
            tracker.on_pulses(left, right);
        }
        LinkEvent::Cell { cell, walls } => {
            debug!(%cell, ?walls, "cell report");
            grid.write().add_cell(cell, walls);
            shared.note_cell();
        }
        LinkEvent::Point { x, y } => {
            grid.write().add_point(x, y);
        }
        LinkEvent::Text(text) => {
            info!(robot = %text, "robot says");
        }
    }
}
