//! Pick cycle state machine.
//!
//! One cycle runs SCAN → PLAN → ACTUATE → COOLDOWN and always ends back in
//! SCAN. Anything that goes wrong inside a cycle becomes a [`CycleOutcome`]
//! rather than an error, so the continuous loop keeps going until it is
//! cancelled.
//!
//! The actuation sequence for a target is:
//!
//! ```text
//! MoveToTarget  XY F <x> <y>      (or X F <x>, Y F <y>)
//! Descend       Z D <descend>
//! GripClose     C C
//! Ascend        Z U <ascend>
//! MoveHome      XY R <x> <y>      (or Y R <y>, X R <x>)
//! Release       C O
//! ```
//!
//! A failed send triggers exactly one reconnect and abandons the rest of the
//! sequence. The arm is left wherever the last accepted command put it.

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use hardware::actuator::{Axis, Direction, Grip, Lift};
use hardware::{Command, LinkResult};
use strum::{Display, EnumIter};
use tracing::{debug, error, info, warn};
use vision::Point2D;

use crate::calibration::MotionPlan;
use crate::cancel::CancelSignal;
use crate::config::CycleConfig;
use crate::debug_image;
use crate::error::SorterError;
use crate::session::{Scan, Session};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum CycleState {
    Scan,
    Plan,
    Actuate,
    Cooldown,
}

/// Named stages of the actuation sequence, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
pub enum ActuateStep {
    MoveToTarget,
    Descend,
    GripClose,
    Ascend,
    MoveHome,
    Release,
}

/// How a single cycle ended.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// Every command of the sequence was accepted.
    Completed { target: Point2D, plan: MotionPlan },
    /// Nothing large enough changed on the tray. No commands were sent.
    NoDetection,
    /// The camera could not deliver a frame. No commands were sent.
    DeviceUnavailable { message: String },
    /// The live frame could not be compared with the reference.
    DetectionFailed { message: String },
    /// A command was rejected during `step`; the cycle was abandoned.
    CommunicationFailure {
        step: ActuateStep,
        reconnected: bool,
        message: String,
    },
}

impl CycleOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, CycleOutcome::Completed { .. })
    }
}

/// Tally of a continuous run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub cycles: usize,
    pub completed: usize,
    pub no_detection: usize,
    pub device_failures: usize,
    pub detection_failures: usize,
    pub communication_failures: usize,
}

impl RunSummary {
    fn record(&mut self, outcome: &CycleOutcome) {
        self.cycles += 1;
        match outcome {
            CycleOutcome::Completed { .. } => self.completed += 1,
            CycleOutcome::NoDetection => self.no_detection += 1,
            CycleOutcome::DeviceUnavailable { .. } => self.device_failures += 1,
            CycleOutcome::DetectionFailed { .. } => self.detection_failures += 1,
            CycleOutcome::CommunicationFailure { .. } => self.communication_failures += 1,
        }
    }
}

/// Build the command sequence for one pick, grouped by step.
pub fn actuation_sequence(plan: &MotionPlan, cycle: &CycleConfig) -> Vec<(ActuateStep, Vec<Command>)> {
    let outbound = Direction::Forward;
    let travel = |direction: Direction| -> Vec<Command> {
        if cycle.combined_xy {
            return vec![Command::MoveXY {
                direction,
                x_seconds: plan.x_seconds,
                y_seconds: plan.y_seconds,
            }];
        }
        let x = Command::Move {
            axis: Axis::X,
            direction,
            seconds: plan.x_seconds,
        };
        let y = Command::Move {
            axis: Axis::Y,
            direction,
            seconds: plan.y_seconds,
        };
        // Retrace the outbound path on the way home
        if direction == outbound {
            vec![x, y]
        } else {
            vec![y, x]
        }
    };

    vec![
        (ActuateStep::MoveToTarget, travel(outbound)),
        (
            ActuateStep::Descend,
            vec![Command::Lift {
                lift: Lift::Down,
                seconds: cycle.descend_s,
            }],
        ),
        (ActuateStep::GripClose, vec![Command::Gripper(Grip::Close)]),
        (
            ActuateStep::Ascend,
            vec![Command::Lift {
                lift: Lift::Up,
                seconds: cycle.ascend_s,
            }],
        ),
        (ActuateStep::MoveHome, travel(outbound.reversed())),
        (ActuateStep::Release, vec![Command::Gripper(Grip::Open)]),
    ]
}

/// Drives pick cycles over a [`Session`].
pub struct Orchestrator {
    session: Session,
    state: CycleState,
    debug_dir: Option<PathBuf>,
    cycle_count: usize,
}

impl Orchestrator {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            state: CycleState::Scan,
            debug_dir: None,
            cycle_count: 0,
        }
    }

    /// Write an annotated rectified image for every detection into `dir`.
    pub fn with_debug_dir(mut self, dir: PathBuf) -> Self {
        self.debug_dir = Some(dir);
        self
    }

    pub fn state(&self) -> CycleState {
        self.state
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    fn transition(&mut self, next: CycleState) {
        if self.state != next {
            info!("{} -> {}", self.state, next);
            self.state = next;
        }
    }

    /// Run one full cycle and return to SCAN.
    pub fn run_cycle(&mut self) -> CycleOutcome {
        self.transition(CycleState::Scan);
        self.cycle_count += 1;

        let outcome = match self.session.scan() {
            Ok(scan) => self.handle_scan(scan),
            Err(SorterError::DeviceUnavailable(e)) => {
                warn!("Camera read failed: {e}");
                CycleOutcome::DeviceUnavailable {
                    message: e.to_string(),
                }
            }
            Err(e) => {
                warn!("Detection failed: {e}");
                CycleOutcome::DetectionFailed {
                    message: e.to_string(),
                }
            }
        };

        self.transition(CycleState::Cooldown);
        let cycle = &self.session.config().cycle;
        let pause = match outcome {
            CycleOutcome::DeviceUnavailable { .. } => cycle.device_retry(),
            _ => cycle.cooldown(),
        };
        pause_for(pause);
        self.transition(CycleState::Scan);

        outcome
    }

    fn handle_scan(&mut self, scan: Scan) -> CycleOutcome {
        let detection = &scan.detection;
        let target = match (detection.found, detection.centroid_full_frame) {
            (true, Some(target)) => target,
            _ => {
                info!(
                    "No object (largest region {:.0} px, {} regions)",
                    detection.area, detection.region_count
                );
                return CycleOutcome::NoDetection;
            }
        };
        self.save_debug_image(&scan);

        self.transition(CycleState::Plan);
        let plan = self.session.plan(target);
        info!(
            "Object at {} ({:.0} px), travel X {:.2}s Y {:.2}s",
            target, detection.area, plan.x_seconds, plan.y_seconds
        );

        self.transition(CycleState::Actuate);
        let sequence = actuation_sequence(&plan, &self.session.config().cycle);
        for (step, commands) in sequence {
            debug!("Step {step}");
            for command in &commands {
                if let Err(e) = self.session.dispatcher().send(command) {
                    error!("Sending {command:?} failed during {step}: {e}");
                    let reconnected = self.reconnect().is_ok();
                    return CycleOutcome::CommunicationFailure {
                        step,
                        reconnected,
                        message: e.to_string(),
                    };
                }
            }
        }

        CycleOutcome::Completed { target, plan }
    }

    fn save_debug_image(&self, scan: &Scan) {
        let Some(dir) = &self.debug_dir else {
            return;
        };
        let image = debug_image::annotate_detection(&scan.frame, &scan.detection);
        let name = format!("cycle_{:04}.png", self.cycle_count);
        match debug_image::save(dir, &name, &image) {
            Ok(path) => debug!("Saved debug image {}", path.display()),
            Err(e) => warn!("Could not save debug image {name}: {e}"),
        }
    }

    /// Single attempt to re-open the actuator link.
    pub fn reconnect(&mut self) -> LinkResult<()> {
        let result = self.session.dispatcher().reconnect();
        match &result {
            Ok(()) => info!("Reconnected"),
            Err(e) => error!("Reconnect failed: {e}"),
        }
        result
    }

    /// Exactly one cycle, including its cooldown.
    pub fn run_one_shot(&mut self) -> CycleOutcome {
        info!("One-shot pick");
        self.run_cycle()
    }

    /// Cycle until `cancel` reports a request. The signal is polled only
    /// between cycles.
    pub fn run_continuous(&mut self, cancel: &dyn CancelSignal) -> RunSummary {
        info!("Continuous sorting started");
        let mut summary = RunSummary::default();
        while !cancel.is_cancelled() {
            let outcome = self.run_cycle();
            summary.record(&outcome);
        }
        info!(
            "Continuous sorting stopped after {} cycles ({} picks)",
            summary.cycles, summary.completed
        );
        summary
    }

    /// Send an operator-typed line verbatim.
    ///
    /// Lines that are not recognised commands are still sent; the controller
    /// decides what to do with them.
    pub fn send_manual(&mut self, line: &str) -> LinkResult<()> {
        if let Err(e) = line.parse::<Command>() {
            warn!("{e}; sending anyway");
        }
        self.session.dispatcher().send(&Command::Raw(line.to_string()))
    }
}

fn pause_for(duration: Duration) {
    if !duration.is_zero() {
        debug!("Cooling down for {:.1}s", duration.as_secs_f64());
        thread::sleep(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    fn plan() -> MotionPlan {
        MotionPlan {
            x_seconds: 1.234,
            y_seconds: 0.5,
        }
    }

    fn lines(sequence: &[(ActuateStep, Vec<Command>)]) -> Vec<String> {
        sequence
            .iter()
            .flat_map(|(_, commands)| commands.iter().map(|c| c.to_string()))
            .collect()
    }

    #[test]
    fn combined_sequence() {
        let sequence = actuation_sequence(&plan(), &CycleConfig::default());
        assert_eq!(
            lines(&sequence),
            vec!["XY F 1.23 0.50", "Z D 2.30", "C C", "Z U 3.10", "XY R 1.23 0.50", "C O"]
        );
    }

    #[test]
    fn per_axis_sequence_retraces_path() {
        let cycle = CycleConfig {
            combined_xy: false,
            ..CycleConfig::default()
        };
        let sequence = actuation_sequence(&plan(), &cycle);
        assert_eq!(
            lines(&sequence),
            vec![
                "X F 1.23", "Y F 0.50", "Z D 2.30", "C C", "Z U 3.10", "Y R 0.50", "X R 1.23", "C O"
            ]
        );
    }

    #[test]
    fn steps_appear_in_order() {
        let sequence = actuation_sequence(&plan(), &CycleConfig::default());
        let steps: Vec<ActuateStep> = sequence.iter().map(|(step, _)| *step).collect();
        assert_eq!(steps, ActuateStep::iter().collect::<Vec<_>>());
    }

    #[test]
    fn summary_counts_outcomes() {
        let mut summary = RunSummary::default();
        summary.record(&CycleOutcome::NoDetection);
        summary.record(&CycleOutcome::Completed {
            target: Point2D::new(1.0, 2.0),
            plan: plan(),
        });
        summary.record(&CycleOutcome::CommunicationFailure {
            step: ActuateStep::Descend,
            reconnected: false,
            message: String::new(),
        });
        assert_eq!(summary.cycles, 3);
        assert_eq!(summary.completed, 1);
        assert_eq!(summary.no_detection, 1);
        assert_eq!(summary.communication_failures, 1);
    }
}
