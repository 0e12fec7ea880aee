//! Machine status snapshot and change notifications
//!
//! ```text
//! StatusSource::poll ──► StatusWatcher::update ──► broadcast<StatusEvent>
//!                             (diff vs last)            │
//!                                                       ▼
//!                                              ActionSet::refresh
//! ```

use hx_error::Result;
use tokio::sync::broadcast;
use tracing::trace;

use crate::command::StatusSource;

/// Controller task state, ordered from most to least restrictive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TaskState {
    Estop,
    EstopReset,
    Off,
    On,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskMode {
    Manual,
    Auto,
    Mdi,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InterpState {
    Idle,
    Reading,
    Paused,
    Waiting,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MachineStatus {
    pub task_state: TaskState,
    pub task_mode: TaskMode,
    pub interp_state: InterpState,
    pub paused: bool,
    /// Per-joint homed flags
    pub homed: Vec<bool>,
    /// Bit i set when axis i is configured
    pub axis_mask: u32,
}

impl Default for MachineStatus {
    fn default() -> Self {
        Self {
            task_state: TaskState::Estop,
            task_mode: TaskMode::Manual,
            interp_state: InterpState::Idle,
            paused: false,
            homed: Vec::new(),
            axis_mask: 0,
        }
    }
}

impl MachineStatus {
    pub fn machine_on(&self) -> bool {
        self.task_state > TaskState::Off
    }

    /// A program is executing in auto mode.
    pub fn running(&self) -> bool {
        self.task_mode == TaskMode::Auto && self.interp_state != InterpState::Idle
    }

    /// Homed state of one axis, or of any configured axis when `axis` is `None`.
    pub fn homed(&self, axis: Option<usize>) -> bool {
        match axis {
            Some(i) => self.homed.get(i).copied().unwrap_or(false),
            None => self
                .homed
                .iter()
                .enumerate()
                .any(|(i, h)| *h && i < 32 && self.axis_mask & (1 << i) != 0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusEvent {
    StateEstop,
    StateEstopReset,
    StateOn,
    StateOff,
    InterpIdle,
    InterpRun,
    InterpPaused,
    InterpReading,
    InterpWaiting,
}

impl StatusEvent {
    fn for_state(state: TaskState) -> Self {
        match state {
            TaskState::Estop => StatusEvent::StateEstop,
            TaskState::EstopReset => StatusEvent::StateEstopReset,
            TaskState::Off => StatusEvent::StateOff,
            TaskState::On => StatusEvent::StateOn,
        }
    }

    fn for_interp(interp: InterpState) -> Self {
        match interp {
            InterpState::Idle => StatusEvent::InterpIdle,
            InterpState::Reading => StatusEvent::InterpReading,
            InterpState::Paused => StatusEvent::InterpPaused,
            InterpState::Waiting => StatusEvent::InterpWaiting,
        }
    }
}

/// Diffs successive status snapshots into events.
pub struct StatusWatcher {
    last: Option<(TaskState, InterpState)>,
    tx: broadcast::Sender<StatusEvent>,
}

impl StatusWatcher {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { last: None, tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StatusEvent> {
        self.tx.subscribe()
    }

    /// Compute the events for a new snapshot and broadcast them.
    pub fn update(&mut self, status: &MachineStatus) -> Vec<StatusEvent> {
        let state = status.task_state;
        let interp = status.interp_state;
        let mut events = Vec::new();

        match self.last {
            None => {
                // baseline so every listener starts from a known state
                events.push(if state == TaskState::Estop {
                    StatusEvent::StateEstop
                } else {
                    StatusEvent::StateEstopReset
                });
                events.push(StatusEvent::StateOff);
                events.push(StatusEvent::InterpIdle);
                if state == TaskState::On {
                    events.push(StatusEvent::StateOn);
                }
                if interp != InterpState::Idle {
                    events.push(StatusEvent::InterpRun);
                    events.push(StatusEvent::for_interp(interp));
                }
            }
            Some((old_state, old_interp)) => {
                if state != old_state {
                    if old_state == TaskState::On && state < TaskState::Off {
                        events.push(StatusEvent::StateOff);
                    }
                    events.push(StatusEvent::for_state(state));
                }
                if interp != old_interp {
                    if old_interp == InterpState::Idle {
                        events.push(StatusEvent::InterpRun);
                    }
                    events.push(StatusEvent::for_interp(interp));
                }
            }
        }
        self.last = Some((state, interp));

        for ev in &events {
            trace!("status event {:?}", ev);
            // no subscribers is fine
            let _ = self.tx.send(*ev);
        }
        events
    }

    pub fn poll(&mut self, source: &mut dyn StatusSource) -> Result<Vec<StatusEvent>> {
        let status = source.poll()?;
        Ok(self.update(&status))
    }
}
