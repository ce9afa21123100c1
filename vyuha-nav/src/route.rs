//! Route execution: drive a solved path segment by segment.
//!
//! The robot was placed (or left by exploration) on the path's first
//! cell. For each segment the runner computes the minimal turn, executes
//! it as repeated 90° rotation primitives, then advances one cell. Every
//! primitive is synchronized against encoder feedback through
//! [`PulseTracker::wait_for`]; a timeout is logged and the run proceeds
//! with the best-effort pulse count.
//!
//! Exactly one motion primitive is in flight at any time (overlapping
//! primitives would corrupt the pulse-count synchronization) and only
//! one run may be active per session. Abort is cooperative: the flag is
//! checked between primitives, the in-flight wait is allowed to resolve
//! or time out, and a final stop is always sent.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use vyuha_map::{Cell, Heading, CELL_SIZE_CM};

use crate::config::{NavConfig, RobotConfig, RouteConfig};
use crate::error::{NavError, Result};
use crate::link::{Command, CommandSink};
use crate::pulse::PulseTracker;
use crate::shared::{RouteState, SharedState};

/// Terminal state of a route run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RouteOutcome {
    Completed,
    Aborted,
}

/// Drives a precomputed path over the command link.
pub struct RouteRunner {
    sink: Arc<dyn CommandSink>,
    tracker: Arc<PulseTracker>,
    shared: Arc<SharedState>,
    robot: RobotConfig,
    timing: RouteConfig,
}

impl RouteRunner {
    pub fn new(
        sink: Arc<dyn CommandSink>,
        tracker: Arc<PulseTracker>,
        shared: Arc<SharedState>,
        config: &NavConfig,
    ) -> Self {
        Self {
            sink,
            tracker,
            shared,
            robot: config.robot.clone(),
            timing: config.route.clone(),
        }
    }

    /// Execute the route. Blocks until the terminal state.
    ///
    /// `initial_heading` is where the robot's nose points before the
    /// first segment; supplied by the operator, or suggested from the
    /// path's first segment by [`suggest_heading`].
    pub fn run(&self, path: &[Cell], initial_heading: Heading) -> Result<RouteOutcome> {
        if path.len() < 2 {
            return Err(NavError::Route(
                "route needs at least 2 cells; solve the maze first".into(),
            ));
        }
        if !self.shared.try_begin_route() {
            return Err(NavError::Route("a route is already running".into()));
        }

        let result = self.drive(path, initial_heading);
        self.shared.end_route();
        result
    }

    fn drive(&self, path: &[Cell], initial_heading: Heading) -> Result<RouteOutcome> {
        let total = path.len() - 1;
        let mut heading = initial_heading;

        info!(
            steps = total,
            %initial_heading,
            start = %path[0],
            end = %path[path.len() - 1],
            "route started"
        );
        self.shared.publish_progress(RouteState::Running, 0, total);

        // Reset the robot's odometry once; the map itself is untouched.
        self.sink.send(Command::ZeroOdometry)?;
        self.settle(self.timing.settle_ms);

        let mut aborted = false;

        'segments: for (i, pair) in path.windows(2).enumerate() {
            if self.shared.abort_requested() {
                aborted = true;
                break;
            }

            let target = Heading::between(pair[0], pair[1]).ok_or_else(|| {
                NavError::Route(format!(
                    "path cells {} and {} are not adjacent",
                    pair[0], pair[1]
                ))
            })?;
            let turn = heading.turn_to(target);

            info!(
                step = i + 1,
                total,
                from = %pair[0],
                to = %pair[1],
                %target,
                turn_deg = turn,
                "segment"
            );

            if turn != 0 {
                let cmd = if turn > 0 {
                    Command::TurnRight
                } else {
                    Command::TurnLeft
                };
                let repetitions = turn.unsigned_abs() / 90;
                for rep in 0..repetitions {
                    if self.shared.abort_requested() {
                        aborted = true;
                        break 'segments;
                    }
                    debug!(rep = rep + 1, repetitions, ?cmd, "rotating 90°");
                    self.primitive(
                        cmd,
                        self.robot.pulses_per_turn,
                        self.timing.turn_timeout(),
                        self.timing.settle_ms,
                    )?;
                }
                heading = target;
            }

            if self.shared.abort_requested() {
                aborted = true;
                break;
            }

            self.primitive(
                Command::Forward,
                self.robot.pulses_per_cell,
                self.timing.forward_timeout(),
                self.timing.post_forward_settle_ms,
            )?;

            let remaining_cm = (total - (i + 1)) as f32 * CELL_SIZE_CM;
            self.shared.publish_progress(RouteState::Running, i + 1, total);
            info!(step = i + 1, total, %heading, remaining_cm, "segment done");
        }

        // Always leave the motors stopped.
        self.sink.send(Command::Stop)?;

        if aborted {
            self.shared.publish_progress(RouteState::Aborted, self.shared.route_status().step, total);
            warn!("route aborted by operator");
            Ok(RouteOutcome::Aborted)
        } else {
            self.shared.publish_progress(RouteState::Done, total, total);
            info!(
                last_pulses = self.tracker.current(),
                "route completed, robot at destination"
            );
            Ok(RouteOutcome::Completed)
        }
    }

    /// One atomic motion primitive: zero encoders, move, wait for the
    /// pulse target, stop, settle.
    fn primitive(
        &self,
        cmd: Command,
        target_pulses: u32,
        timeout: Duration,
        settle_after_ms: u64,
    ) -> Result<()> {
        self.tracker.reset();
        self.sink.send(Command::ZeroSteps)?;
        self.settle(self.timing.zero_settle_ms);

        self.sink.send(cmd)?;
        let achieved = self.tracker.wait_for(target_pulses as f32, timeout);
        self.sink.send(Command::Stop)?;

        debug!(?cmd, achieved, target_pulses, "primitive finished");
        self.settle(settle_after_ms);
        Ok(())
    }

    fn settle(&self, ms: u64) {
        if ms > 0 {
            thread::sleep(Duration::from_millis(ms));
        }
    }

    /// Calibration: one 90° right turn, reporting achieved vs target.
    pub fn test_turn(&self) -> Result<(f32, u32)> {
        self.calibration(
            Command::TurnRight,
            self.robot.pulses_per_turn,
            RouteConfig::turn_timeout,
        )
    }

    /// Calibration: one 25cm advance, reporting achieved vs target.
    pub fn test_advance(&self) -> Result<(f32, u32)> {
        self.calibration(
            Command::Forward,
            self.robot.pulses_per_cell,
            RouteConfig::forward_timeout,
        )
    }

    fn calibration(
        &self,
        cmd: Command,
        target: u32,
        timeout: impl Fn(&RouteConfig) -> Duration,
    ) -> Result<(f32, u32)> {
        if !self.shared.try_begin_route() {
            return Err(NavError::Route("a route is already running".into()));
        }

        let run = || -> Result<f32> {
            self.tracker.reset();
            self.sink.send(Command::ZeroSteps)?;
            self.settle(self.timing.zero_settle_ms);
            self.sink.send(cmd)?;
            let achieved = self.tracker.wait_for(target as f32, timeout(&self.timing));
            self.sink.send(Command::Stop)?;
            self.settle(self.timing.settle_ms);
            Ok(achieved)
        };
        let result = run();
        self.shared.end_route();

        let achieved = result?;
        info!(?cmd, achieved, target, "calibration primitive finished");
        Ok((achieved, target))
    }
}

/// Initial heading suggestion: the direction of the path's first segment
/// (what the original operator prompt precomputed as its default).
pub fn suggest_heading(path: &[Cell]) -> Option<Heading> {
    if path.len() < 2 {
        return None;
    }
    Heading::between(path[0], path[1])
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Records every sent command; optionally requests abort when the
    /// first Forward goes out, and feeds satisfying pulses right after
    /// each motion command so waits resolve instantly.
    struct MockLink {
        commands: Mutex<Vec<Command>>,
        tracker: Arc<PulseTracker>,
        shared: Arc<SharedState>,
        abort_on_forward: AtomicBool,
    }

    impl MockLink {
        fn new(tracker: Arc<PulseTracker>, shared: Arc<SharedState>) -> Self {
            Self {
                commands: Mutex::new(Vec::new()),
                tracker,
                shared,
                abort_on_forward: AtomicBool::new(false),
            }
        }

        fn sent(&self) -> Vec<Command> {
            self.commands.lock().clone()
        }

        fn count(&self, cmd: Command) -> usize {
            self.sent().iter().filter(|&&c| c == cmd).count()
        }
    }

    impl CommandSink for MockLink {
        fn send(&self, cmd: Command) -> Result<()> {
            self.commands.lock().push(cmd);
            match cmd {
                Command::Forward => {
                    if self.abort_on_forward.load(Ordering::Acquire) {
                        self.shared.request_abort();
                    }
                    self.tracker.on_pulses(100, 100);
                }
                Command::TurnLeft | Command::TurnRight => {
                    self.tracker.on_pulses(100, 100);
                }
                _ => {}
            }
            Ok(())
        }
    }

    fn fast_config() -> NavConfig {
        let mut config = NavConfig::default();
        config.route.settle_ms = 0;
        config.route.zero_settle_ms = 0;
        config.route.post_forward_settle_ms = 0;
        config.route.turn_timeout_ms = 100;
        config.route.forward_timeout_ms = 100;
        config
    }

    fn runner() -> (RouteRunner, Arc<MockLink>, Arc<SharedState>) {
        let tracker = Arc::new(PulseTracker::new());
        let shared = Arc::new(SharedState::new());
        let link = Arc::new(MockLink::new(Arc::clone(&tracker), Arc::clone(&shared)));
        let sink: Arc<dyn CommandSink> = Arc::clone(&link) as Arc<dyn CommandSink>;
        let runner = RouteRunner::new(sink, tracker, Arc::clone(&shared), &fast_config());
        (runner, link, shared)
    }

    #[test]
    fn test_straight_segment_no_turn() {
        let (runner, link, shared) = runner();
        let path = [Cell::new(0, 0), Cell::new(1, 0)];

        let outcome = runner.run(&path, Heading::East).unwrap();
        assert_eq!(outcome, RouteOutcome::Completed);
        assert_eq!(link.count(Command::Forward), 1);
        assert_eq!(link.count(Command::TurnLeft), 0);
        assert_eq!(link.count(Command::TurnRight), 0);
        assert_eq!(shared.route_status().state, RouteState::Done);
    }

    #[test]
    fn test_south_segment_turns_right_then_advances() {
        let (runner, link, _) = runner();
        let path = [Cell::new(0, 0), Cell::new(0, 1)];

        runner.run(&path, Heading::East).unwrap();
        assert_eq!(link.count(Command::TurnRight), 1);
        assert_eq!(link.count(Command::TurnLeft), 0);
        assert_eq!(link.count(Command::Forward), 1);

        // The rotation primitive completes before the advance starts.
        let sent = link.sent();
        let turn_idx = sent.iter().position(|&c| c == Command::TurnRight).unwrap();
        let fwd_idx = sent.iter().position(|&c| c == Command::Forward).unwrap();
        assert!(turn_idx < fwd_idx);
    }

    #[test]
    fn test_reverse_is_two_same_way_turns() {
        let (runner, link, _) = runner();
        // Facing West, path heads East: 180° = two right turns.
        let path = [Cell::new(0, 0), Cell::new(1, 0)];

        runner.run(&path, Heading::West).unwrap();
        assert_eq!(link.count(Command::TurnRight), 2);
        assert_eq!(link.count(Command::TurnLeft), 0);
        assert_eq!(link.count(Command::Forward), 1);
    }

    #[test]
    fn test_left_turn_for_north() {
        let (runner, link, _) = runner();
        // Facing East, path heads North: raw 270° shortens to one left.
        let path = [Cell::new(0, 0), Cell::new(0, -1)];

        runner.run(&path, Heading::East).unwrap();
        assert_eq!(link.count(Command::TurnLeft), 1);
        assert_eq!(link.count(Command::TurnRight), 0);
    }

    #[test]
    fn test_primitive_protocol_order() {
        let (runner, link, _) = runner();
        let path = [Cell::new(0, 0), Cell::new(1, 0)];

        runner.run(&path, Heading::East).unwrap();
        assert_eq!(
            link.sent(),
            vec![
                Command::ZeroOdometry,
                Command::ZeroSteps,
                Command::Forward,
                Command::Stop, // primitive stop
                Command::Stop, // final stop
            ]
        );
    }

    #[test]
    fn test_abort_mid_route_stops_issuance() {
        let (runner, link, shared) = runner();
        link.abort_on_forward.store(true, Ordering::Release);
        // Three straight segments; abort fires during the first advance.
        let path = [
            Cell::new(0, 0),
            Cell::new(1, 0),
            Cell::new(2, 0),
            Cell::new(3, 0),
        ];

        let outcome = runner.run(&path, Heading::East).unwrap();
        assert_eq!(outcome, RouteOutcome::Aborted);
        // The in-flight primitive resolved, no further advance was issued.
        assert_eq!(link.count(Command::Forward), 1);
        assert_eq!(shared.route_status().state, RouteState::Aborted);
        // Final stop still went out.
        assert_eq!(link.sent().last(), Some(&Command::Stop));
        // Slot released for a later run.
        assert!(shared.try_begin_route());
    }

    #[test]
    fn test_second_run_rejected_while_active() {
        let (runner, _, shared) = runner();
        assert!(shared.try_begin_route()); // simulate an active run
        let path = [Cell::new(0, 0), Cell::new(1, 0)];
        let err = runner.run(&path, Heading::East).unwrap_err();
        assert!(matches!(err, NavError::Route(_)));
        // The "first run" is unaffected.
        assert!(shared.route_active());
    }

    #[test]
    fn test_short_path_rejected() {
        let (runner, link, _) = runner();
        assert!(runner.run(&[Cell::new(0, 0)], Heading::East).is_err());
        assert!(link.sent().is_empty());
    }

    #[test]
    fn test_non_adjacent_path_rejected() {
        let (runner, _, shared) = runner();
        let path = [Cell::new(0, 0), Cell::new(2, 0)];
        assert!(runner.run(&path, Heading::East).is_err());
        // Slot must be released on the error path too.
        assert!(!shared.route_active());
    }

    #[test]
    fn test_timeout_is_not_fatal() {
        // A link that never feeds pulses: every wait times out, but the
        // route still completes with best-effort values.
        struct SilentLink {
            commands: Mutex<Vec<Command>>,
        }
        impl CommandSink for SilentLink {
            fn send(&self, cmd: Command) -> Result<()> {
                self.commands.lock().push(cmd);
                Ok(())
            }
        }

        let tracker = Arc::new(PulseTracker::new());
        let shared = Arc::new(SharedState::new());
        let link = Arc::new(SilentLink {
            commands: Mutex::new(Vec::new()),
        });
        let runner = RouteRunner::new(
            Arc::clone(&link) as Arc<dyn CommandSink>,
            tracker,
            Arc::clone(&shared),
            &fast_config(),
        );

        let path = [Cell::new(0, 0), Cell::new(1, 0)];
        let outcome = runner.run(&path, Heading::East).unwrap();
        assert_eq!(outcome, RouteOutcome::Completed);
        assert_eq!(shared.route_status().state, RouteState::Done);
    }

    #[test]
    fn test_calibration_single_primitive() {
        let (runner, link, _) = runner();
        let (_achieved, target) = runner.test_turn().unwrap();
        assert_eq!(target, 30);
        assert_eq!(link.count(Command::TurnRight), 1);
        assert_eq!(link.count(Command::Forward), 0);

        let (_achieved, target) = runner.test_advance().unwrap();
        assert_eq!(target, 46);
        assert_eq!(link.count(Command::Forward), 1);
    }

    #[test]
    fn test_suggest_heading() {
        assert_eq!(
            suggest_heading(&[Cell::new(0, 0), Cell::new(0, 1)]),
            Some(Heading::South)
        );
        assert_eq!(suggest_heading(&[Cell::new(0, 0)]), None);
    }
}
