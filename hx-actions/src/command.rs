//! Seams to the motion controller
//!
//! The controller is reached only through these traits so actions can run
//! against a real controller binding, a simulator or a mock.

use std::collections::HashMap;
use std::time::Duration;

use hx_error::Result;

use crate::status::{MachineStatus, TaskMode, TaskState};

/// Timeout used when an action waits for a command to finish.
pub const WAIT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoCommand {
    Run { start_line: u32 },
    Step,
    Pause,
    Resume,
}

/// Outcome of waiting on the last issued command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Done,
    Executing,
    Error,
    Timeout,
}

#[cfg_attr(test, mockall::automock)]
pub trait MachineCommand {
    fn state(&mut self, state: TaskState) -> Result<()>;
    fn mode(&mut self, mode: TaskMode) -> Result<()>;
    fn auto(&mut self, cmd: AutoCommand) -> Result<()>;
    fn abort(&mut self) -> Result<()>;
    fn mdi(&mut self, command: &str) -> Result<()>;
    /// `None` homes all axes
    fn home(&mut self, axis: Option<usize>) -> Result<()>;
    fn unhome(&mut self, axis: Option<usize>) -> Result<()>;
    fn wait_complete(&mut self, timeout: Duration) -> Result<Completion>;
}

#[cfg_attr(test, mockall::automock)]
pub trait StatusSource {
    fn poll(&mut self) -> Result<MachineStatus>;
}

/// Float view of signal-bus pins, used to fill MDI templates.
#[cfg_attr(test, mockall::automock)]
pub trait PinLookup {
    fn float(&self, name: &str) -> Option<f64>;
}

/// Yes/no question put to the operator.
#[cfg_attr(test, mockall::automock)]
pub trait Confirm {
    fn confirm(&mut self, message: &str) -> bool;
}

impl PinLookup for HashMap<String, f64> {
    fn float(&self, name: &str) -> Option<f64> {
        self.get(name).copied()
    }
}

/// Confirm that always answers the same.
#[derive(Debug, Clone, Copy)]
pub struct FixedAnswer(pub bool);

impl Confirm for FixedAnswer {
    fn confirm(&mut self, _message: &str) -> bool {
        self.0
    }
}
