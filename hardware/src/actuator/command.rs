//! Actuator command text protocol.
//!
//! Every command is a single line of whitespace-separated tokens:
//!
//! ```text
//! X F 1.23        axis X forward for 1.23 s
//! Y R 0.80        axis Y reverse for 0.80 s
//! XY F 1.23 0.80  both axes forward, X then Y durations
//! Z D 2.30        lower the gripper for 2.30 s
//! Z U 3.10        raise the gripper for 3.10 s
//! C C             close the gripper
//! C O             open the gripper
//! ```
//!
//! Durations always carry exactly two decimal places. The trailing newline
//! is added by the dispatcher, not by [`Command`]'s `Display`.

use std::fmt;
use std::str::FromStr;

use strum::{Display, EnumIter, EnumString};
use thiserror::Error;

/// Horizontal axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter)]
pub enum Axis {
    #[strum(serialize = "X")]
    X,
    #[strum(serialize = "Y")]
    Y,
}

/// Travel direction along a horizontal axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter)]
pub enum Direction {
    /// Away from home
    #[strum(serialize = "F")]
    Forward,
    /// Back toward home
    #[strum(serialize = "R")]
    Reverse,
}

impl Direction {
    pub fn reversed(self) -> Self {
        match self {
            Direction::Forward => Direction::Reverse,
            Direction::Reverse => Direction::Forward,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter)]
pub enum Lift {
    #[strum(serialize = "D")]
    Down,
    #[strum(serialize = "U")]
    Up,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter)]
pub enum Grip {
    #[strum(serialize = "C")]
    Close,
    #[strum(serialize = "O")]
    Open,
}

/// One actuator command line.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Move {
        axis: Axis,
        direction: Direction,
        seconds: f64,
    },
    MoveXY {
        direction: Direction,
        x_seconds: f64,
        y_seconds: f64,
    },
    Lift {
        lift: Lift,
        seconds: f64,
    },
    Gripper(Grip),
    /// Operator-typed line sent as-is
    Raw(String),
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Move {
                axis,
                direction,
                seconds,
            } => write!(f, "{axis} {direction} {seconds:.2}"),
            Command::MoveXY {
                direction,
                x_seconds,
                y_seconds,
            } => write!(f, "XY {direction} {x_seconds:.2} {y_seconds:.2}"),
            Command::Lift { lift, seconds } => write!(f, "Z {lift} {seconds:.2}"),
            Command::Gripper(grip) => write!(f, "C {grip}"),
            Command::Raw(line) => f.write_str(line),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("unrecognized command {line:?}: {reason}")]
pub struct CommandParseError {
    pub line: String,
    pub reason: &'static str,
}

fn parse_seconds(token: &str) -> Option<f64> {
    token.parse::<f64>().ok().filter(|s| s.is_finite() && *s >= 0.0)
}

impl FromStr for Command {
    type Err = CommandParseError;

    /// Parse a protocol line into a structured command. Never yields
    /// [`Command::Raw`].
    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let fail = |reason| CommandParseError {
            line: line.to_string(),
            reason,
        };
        let tokens: Vec<&str> = line.split_whitespace().collect();

        match tokens.as_slice() {
            ["XY", dir, x, y] => Ok(Command::MoveXY {
                direction: dir.parse().map_err(|_| fail("direction must be F or R"))?,
                x_seconds: parse_seconds(x).ok_or_else(|| fail("bad X duration"))?,
                y_seconds: parse_seconds(y).ok_or_else(|| fail("bad Y duration"))?,
            }),
            ["Z", lift, secs] => Ok(Command::Lift {
                lift: lift.parse().map_err(|_| fail("lift must be D or U"))?,
                seconds: parse_seconds(secs).ok_or_else(|| fail("bad duration"))?,
            }),
            ["C", grip] => Ok(Command::Gripper(
                grip.parse().map_err(|_| fail("gripper must be C or O"))?,
            )),
            [axis, dir, secs] => Ok(Command::Move {
                axis: axis.parse().map_err(|_| fail("axis must be X, Y, XY, Z or C"))?,
                direction: dir.parse().map_err(|_| fail("direction must be F or R"))?,
                seconds: parse_seconds(secs).ok_or_else(|| fail("bad duration"))?,
            }),
            [] => Err(fail("empty line")),
            _ => Err(fail("wrong number of tokens")),
        }
    }
}
