//! Robot command link: outbound tokens and the inbound event feed.
//!
//! The robot speaks a newline-delimited text protocol over a best-effort
//! link. Outbound commands are single tokens (`F`, `S`, `Z_STEPS`, ...);
//! inbound traffic is encoder reports (`STEPS:left,right`), discovered
//! cells (`CELL:col,row,N,E,S,W`), raw odometry samples (`x,y`) and the
//! connection handshake (`CONNECTED`).
//!
//! [`CommandSink`] is the seam between the route sequencer and the
//! transport: the sequencer only needs "send this token", so tests drive
//! it with a recording mock and a different transport only has to
//! implement this one trait.

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, info};

use vyuha_map::io::{parse_line, MapRecord};
use vyuha_map::{Cell, Walls};

use crate::error::{NavError, Result};

/// Outbound motion and mode commands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Forward,
    Backward,
    TurnLeft,
    TurnRight,
    Stop,
    /// Reset the robot's full odometry.
    ZeroOdometry,
    /// Reset only the step (encoder pulse) counter.
    ZeroSteps,
    SetSpeed(u16),
    /// Start autonomous maze mapping on the robot.
    AutonomousMode,
}

impl Command {
    /// Wire token for this command.
    pub fn token(&self) -> String {
        match self {
            Command::Forward => "F".into(),
            Command::Backward => "B".into(),
            Command::TurnLeft => "L".into(),
            Command::TurnRight => "R".into(),
            Command::Stop => "S".into(),
            Command::ZeroOdometry => "Z".into(),
            Command::ZeroSteps => "Z_STEPS".into(),
            Command::SetSpeed(v) => format!("V{v}"),
            Command::AutonomousMode => "MV".into(),
        }
    }
}

/// Fire-and-forget command channel to the robot.
///
/// Sends are best-effort: ordering is guaranteed only by single-threaded
/// issuance, and no acknowledgment is tracked.
pub trait CommandSink: Send + Sync {
    fn send(&self, cmd: Command) -> Result<()>;
}

/// One parsed inbound message.
#[derive(Clone, Debug, PartialEq)]
pub enum LinkEvent {
    /// Robot acknowledged the connection handshake.
    Connected,
    /// Encoder pulse counts since the last `Z_STEPS`.
    Pulses { left: u32, right: u32 },
    /// A discovered cell with wall flags.
    Cell { cell: Cell, walls: Walls },
    /// Raw odometry sample in cm.
    Point { x: f32, y: f32 },
    /// Anything else; logged verbatim for the operator.
    Text(String),
}

/// Parse one inbound line. Malformed coordinates are rejected here, at
/// the ingestion boundary; the grid never sees them.
pub fn parse_event(line: &str) -> LinkEvent {
    let trimmed = line.trim();
    if trimmed == "CONNECTED" {
        return LinkEvent::Connected;
    }

    if let Some(rest) = trimmed.strip_prefix("STEPS:") {
        let mut it = rest.splitn(2, ',');
        let left = it.next().and_then(|s| s.trim().parse::<u32>().ok());
        let right = it.next().and_then(|s| s.trim().parse::<u32>().ok());
        if let (Some(left), Some(right)) = (left, right) {
            return LinkEvent::Pulses { left, right };
        }
        return LinkEvent::Text(trimmed.to_string());
    }

    match parse_line(trimmed) {
        Some(MapRecord::Cell { cell, walls }) => LinkEvent::Cell { cell, walls },
        Some(MapRecord::Point { x, y }) => LinkEvent::Point { x, y },
        None => LinkEvent::Text(trimmed.to_string()),
    }
}

/// TCP transport to the robot bridge.
pub struct TcpLink {
    /// Write half; the read half is cloned off for the receiver thread.
    writer: Mutex<TcpStream>,
    stream: TcpStream,
}

impl TcpLink {
    /// Connect with timeout and send the `CONNECT` greeting.
    pub fn connect(addr: &str, timeout: Duration) -> Result<Self> {
        let sock_addr = addr
            .to_socket_addrs()
            .map_err(|e| NavError::Config(format!("Invalid address {addr}: {e}")))?
            .next()
            .ok_or_else(|| NavError::Config(format!("Address {addr} did not resolve")))?;

        let stream = TcpStream::connect_timeout(&sock_addr, timeout)?;
        stream.set_nodelay(true)?;
        info!(%addr, "link connected");

        let link = Self {
            writer: Mutex::new(stream.try_clone()?),
            stream,
        };
        link.send_raw("CONNECT")?;
        Ok(link)
    }

    /// Buffered reader over a clone of the stream, for the receiver thread.
    pub fn reader(&self) -> Result<BufReader<TcpStream>> {
        Ok(BufReader::new(self.stream.try_clone()?))
    }

    /// Read timeout governs how often the receiver thread can check the
    /// shutdown flag.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        self.stream.set_read_timeout(timeout)?;
        Ok(())
    }

    fn send_raw(&self, token: &str) -> Result<()> {
        let mut writer = self.writer.lock();
        writer.write_all(token.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }
}

impl CommandSink for TcpLink {
    fn send(&self, cmd: Command) -> Result<()> {
        let token = cmd.token();
        debug!(token, "send");
        self.send_raw(&token)
    }
}

/// Read one line from the link, mapping read-timeout to `Ok(None)` so the
/// caller can poll its shutdown flag.
pub fn read_line(reader: &mut BufReader<TcpStream>) -> Result<Option<String>> {
    let mut line = String::new();
    match reader.read_line(&mut line) {
        Ok(0) => Err(NavError::Protocol("link closed by peer".into())),
        Ok(_) => Ok(Some(line)),
        Err(e)
            if e.kind() == std::io::ErrorKind::WouldBlock
                || e.kind() == std::io::ErrorKind::TimedOut =>
        {
            Ok(None)
        }
        Err(e) => Err(NavError::Connection(e)),
    }
}
