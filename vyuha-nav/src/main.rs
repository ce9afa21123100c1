//! VyuhaNav - remote-control console for a maze-solving robot.
//!
//! Connects to the robot bridge over TCP, lets the robot map the maze
//! autonomously, solves the visited-cell graph with a pluggable
//! pathfinding algorithm and then drives the robot along the solution
//! using encoder-synchronized motion primitives.
//!
//! ## Threads
//!
//! - **Receiver thread**: drains the inbound feed (encoder pulses, cell
//!   reports, odometry points) into the pulse tracker and shared grid
//! - **Signal thread**: first Ctrl-C aborts the current activity,
//!   second one exits
//! - **Main thread**: mapping monitor, solve, route execution

mod config;
mod error;
mod link;
mod pulse;
mod receiver;
mod route;
mod shared;

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use signal_hook::consts::SIGINT;
use signal_hook::iterator::Signals;
use tracing::{error, info, warn};

use vyuha_map::{io as map_io, solve, Algorithm, Heading, MazeGrid, PathResult};

use config::NavConfig;
use error::{NavError, Result};
use link::{Command, CommandSink, TcpLink};
use pulse::PulseTracker;
use receiver::ReceiverThread;
use route::{suggest_heading, RouteOutcome, RouteRunner};
use shared::{SharedGrid, SharedState};

const USAGE: &str = "\
Usage: vyuha-nav [CONFIG.toml] [OPTIONS]

Options:
  --robot <host:port>     Robot bridge address (overrides config)
  --map <file>            Solve a saved map offline instead of driving
  --algorithm <name>      astar (default), dijkstra or bfs
  --heading <dir>         Initial robot heading: N, E, S or W
  --export <file>         Write the mapped grid to a file after mapping
  --no-drive              Map and solve, but do not execute the route
  --help                  Show this help
";

/// Parsed command line.
#[derive(Debug, Default, PartialEq)]
struct CliOptions {
    config_path: Option<PathBuf>,
    robot: Option<String>,
    map: Option<PathBuf>,
    algorithm: Option<Algorithm>,
    heading: Option<Heading>,
    export: Option<PathBuf>,
    no_drive: bool,
    help: bool,
}

impl CliOptions {
    fn parse<I: Iterator<Item = String>>(mut args: I) -> Result<Self> {
        fn value<I: Iterator<Item = String>>(args: &mut I, flag: &str) -> Result<String> {
            args.next()
                .ok_or_else(|| NavError::Config(format!("{flag} needs a value")))
        }

        let mut opts = Self::default();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--robot" => opts.robot = Some(value(&mut args, "--robot")?),
                "--map" => opts.map = Some(PathBuf::from(value(&mut args, "--map")?)),
                "--algorithm" => {
                    let name = value(&mut args, "--algorithm")?;
                    opts.algorithm = Some(Algorithm::from_str(&name).map_err(NavError::Config)?);
                }
                "--heading" => {
                    let name = value(&mut args, "--heading")?;
                    opts.heading = Some(Heading::from_str(&name).map_err(NavError::Config)?);
                }
                "--export" => opts.export = Some(PathBuf::from(value(&mut args, "--export")?)),
                "--no-drive" => opts.no_drive = true,
                "--help" | "-h" => opts.help = true,
                other if !other.starts_with("--") && opts.config_path.is_none() => {
                    opts.config_path = Some(PathBuf::from(other));
                }
                other => {
                    return Err(NavError::Config(format!("unknown option '{other}'")));
                }
            }
        }
        Ok(opts)
    }
}

fn load_config(opts: &CliOptions) -> Result<NavConfig> {
    let mut config = if let Some(path) = &opts.config_path {
        info!(path = %path.display(), "loading configuration");
        NavConfig::load(path)?
    } else if Path::new("vyuha.toml").exists() {
        info!("loading configuration from vyuha.toml");
        NavConfig::load(Path::new("vyuha.toml"))?
    } else {
        info!("using default configuration");
        NavConfig::default()
    };

    if let Some(robot) = &opts.robot {
        let (host, port) = robot
            .rsplit_once(':')
            .ok_or_else(|| NavError::Config(format!("--robot expects host:port, got '{robot}'")))?;
        config.connection.host = host.to_string();
        config.connection.port = port
            .parse()
            .map_err(|_| NavError::Config(format!("invalid port '{port}'")))?;
    }
    Ok(config)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("vyuha_nav=info".parse().unwrap())
                .add_directive("vyuha_map=info".parse().unwrap()),
        )
        .init();

    let opts = CliOptions::parse(std::env::args().skip(1)).inspect_err(|_| {
        eprint!("{USAGE}");
    })?;
    if opts.help {
        print!("{USAGE}");
        return Ok(());
    }

    info!("VyuhaNav v{}", env!("CARGO_PKG_VERSION"));

    let algorithm = opts.algorithm.unwrap_or(Algorithm::AStar);

    if let Some(map_path) = &opts.map {
        return solve_offline(map_path, algorithm, &opts);
    }

    let config = load_config(&opts)?;
    run_session(&config, algorithm, &opts)
}

/// Offline mode: load a saved map, solve it and report the path.
fn solve_offline(map_path: &Path, algorithm: Algorithm, opts: &CliOptions) -> Result<()> {
    let mut grid = MazeGrid::new();
    let records = map_io::load_file(&mut grid, map_path)
        .map_err(|e| NavError::Config(format!("failed to read map {}: {e}", map_path.display())))?;
    info!(
        records,
        cells = grid.cell_count(),
        walls = grid.wall_count(),
        "map loaded"
    );

    grid.lock_end();
    let result = solve(&grid, algorithm)?;
    report_path(&result);

    if let Some(export) = &opts.export {
        write_export(export, &grid)?;
    }
    Ok(())
}

fn write_export(path: &Path, grid: &MazeGrid) -> Result<()> {
    std::fs::write(path, map_io::export(grid))
        .map_err(|e| NavError::Config(format!("failed to write map {}: {e}", path.display())))?;
    info!(path = %path.display(), "map exported");
    Ok(())
}

/// Live mode: map, solve, drive.
fn run_session(config: &NavConfig, algorithm: Algorithm, opts: &CliOptions) -> Result<()> {
    let shared = Arc::new(SharedState::new());
    let grid: SharedGrid = Arc::new(RwLock::new(MazeGrid::new()));
    let tracker = Arc::new(PulseTracker::new());

    spawn_signal_thread(Arc::clone(&shared))?;

    let address = config.address();
    info!(%address, "connecting to robot bridge");
    let link = Arc::new(TcpLink::connect(
        &address,
        Duration::from_millis(config.connection.timeout_ms),
    )?);
    // Bounds how long the receiver can go without a shutdown check.
    link.set_read_timeout(Some(Duration::from_millis(250)))?;

    let receiver = ReceiverThread::new(
        link.reader()?,
        Arc::clone(&tracker),
        Arc::clone(&grid),
        Arc::clone(&shared),
    )
    .spawn()?;

    // Wait briefly for the robot's handshake; sends are fire-and-forget,
    // so after the timeout we proceed either way.
    let handshake_deadline =
        Instant::now() + Duration::from_millis(config.connection.timeout_ms);
    while !shared.is_connected() && Instant::now() < handshake_deadline {
        if shared.should_shutdown() {
            finish(&shared, receiver);
            return Ok(());
        }
        thread::sleep(Duration::from_millis(50));
    }
    if !shared.is_connected() {
        warn!("no CONNECTED handshake from the robot, proceeding anyway");
    }

    link.send(Command::SetSpeed(config.robot.speed))?;
    link.send(Command::AutonomousMode)?;
    info!("autonomous mapping started; Ctrl-C to stop it early");

    run_mapping_monitor(config, &grid, &shared, &receiver);
    link.send(Command::Stop)?;

    if shared.should_shutdown() {
        info!("session interrupted before solving");
        finish(&shared, receiver);
        return Ok(());
    }
    // A mapping-phase Ctrl-C must not leak into the route.
    shared.clear_abort();

    let path = {
        let mut grid = grid.write();
        grid.lock_end();
        solve(&grid, algorithm)?
    };
    report_path(&path);

    if let Some(export) = &opts.export {
        write_export(export, &grid.read())?;
    }

    if opts.no_drive {
        info!("--no-drive set, skipping route execution");
    } else {
        let heading = opts
            .heading
            .or_else(|| suggest_heading(&path.cells))
            .ok_or_else(|| NavError::Route("cannot determine initial heading".into()))?;
        info!(%heading, "executing route");

        let runner = RouteRunner::new(
            Arc::clone(&link) as Arc<dyn CommandSink>,
            Arc::clone(&tracker),
            Arc::clone(&shared),
            config,
        );
        match runner.run(&path.cells, heading)? {
            RouteOutcome::Completed => info!("robot reached the maze exit"),
            RouteOutcome::Aborted => warn!("route aborted before the exit"),
        }
    }

    finish(&shared, receiver);
    Ok(())
}

/// Wait until mapping goes idle, the operator interrupts, or the link drops.
fn run_mapping_monitor(
    config: &NavConfig,
    grid: &SharedGrid,
    shared: &SharedState,
    receiver: &thread::JoinHandle<()>,
) {
    let check_interval = Duration::from_millis(500);
    loop {
        thread::sleep(check_interval);

        if shared.should_shutdown() {
            break;
        }
        if shared.abort_requested() {
            info!("mapping stopped by operator");
            break;
        }
        if let Some(idle) = shared.secs_since_last_cell() {
            if idle >= config.mapping.idle_stop_secs {
                info!(
                    idle_secs = idle,
                    cells = grid.read().cell_count(),
                    "no new cells, mapping considered complete"
                );
                break;
            }
        }
        if receiver.is_finished() {
            warn!("receiver thread exited during mapping");
            break;
        }
    }
}

fn report_path(path: &PathResult) {
    let cells: Vec<String> = path.cells.iter().map(|c| c.to_string()).collect();
    info!(
        algorithm = path.algorithm.name(),
        cells = path.cells.len(),
        expanded = path.nodes_expanded,
        length_cm = path.length_cm(),
        "path found"
    );
    info!(route = cells.join(" -> "), "solution");
}

/// First Ctrl-C aborts the current activity, the second one exits.
fn spawn_signal_thread(shared: Arc<SharedState>) -> Result<()> {
    let mut signals = Signals::new([SIGINT])?;
    thread::Builder::new()
        .name("signals".into())
        .spawn(move || {
            for _ in signals.forever() {
                if shared.abort_requested() || shared.should_shutdown() {
                    shared.signal_shutdown();
                } else {
                    if shared.route_active() {
                        warn!("interrupt: aborting route (press again to exit)");
                    } else {
                        warn!("interrupt: stopping mapping (press again to exit)");
                    }
                    shared.request_abort();
                }
            }
        })
        .map_err(NavError::Connection)?;
    Ok(())
}

fn finish(shared: &SharedState, receiver: thread::JoinHandle<()>) {
    shared.signal_shutdown();
    if let Err(e) = receiver.join() {
        error!("receiver thread panicked: {:?}", e);
    }
    info!(
        route_state = shared.route_status().state.tag(),
        "VyuhaNav finished"
    );
}
