//! Machine control actions
//!
//! Plain and two-state actions that issue motion-controller commands and keep
//! their sensitivity in step with machine status. The controller, the status
//! feed, pin values and operator prompts are reached through the traits in
//! [`command`], bundled in an [`ActionContext`].

pub mod action;
pub mod command;
pub mod context;
pub mod set;
pub mod status;
pub mod template;
pub mod toggle;

pub use action::{ensure_mode, Action, ActionKind};
pub use command::{AutoCommand, Completion, Confirm, MachineCommand, PinLookup, StatusSource};
pub use context::ActionContext;
pub use set::{ActionSet, WidgetState};
pub use status::{InterpState, MachineStatus, StatusEvent, StatusWatcher, TaskMode, TaskState};
pub use toggle::{Notice, ToggleAction, ToggleKind};
