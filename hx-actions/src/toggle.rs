//! Two-state actions
//!
//! A toggle holds the plain action run on its active edge and, for some
//! variants, the one run on its inactive edge. `toggle` is the user edge and
//! issues commands; `set_active` mirrors machine state and never does.

use std::time::Duration;

use hx_error::Result;
use tracing::debug;

use crate::action::{Action, ActionKind};
use crate::command::Completion;
use crate::context::ActionContext;
use crate::status::StatusEvent;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleKind {
    Estop,
    Power,
    Run,
    Stop,
    Pause,
    Mdi { command: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    MdiCommandStarted,
    MdiCommandStopped,
}

#[derive(Debug, Clone)]
pub struct ToggleAction {
    name: String,
    kind: ToggleKind,
    on_active: Action,
    on_inactive: Option<Action>,
    active: bool,
    sensitive: bool,
    mdi_pending: bool,
    notices: Vec<Notice>,
}

impl ToggleAction {
    pub fn new(name: impl Into<String>, kind: ToggleKind) -> Self {
        let name = name.into();
        let plain = |k: ActionKind| Action::new(name.clone(), k);
        let (on_active, on_inactive, active, sensitive) = match &kind {
            ToggleKind::Estop => (plain(ActionKind::Estop), Some(plain(ActionKind::EstopReset)), true, true),
            ToggleKind::Power => (plain(ActionKind::On), Some(plain(ActionKind::Off)), false, false),
            ToggleKind::Run => (plain(ActionKind::Run), None, false, false),
            ToggleKind::Stop => (plain(ActionKind::Stop), None, true, false),
            ToggleKind::Pause => (plain(ActionKind::Pause), Some(plain(ActionKind::Resume)), true, false),
            ToggleKind::Mdi { command } => {
                (plain(ActionKind::Mdi { command: command.clone() }), None, false, true)
            }
        };
        Self {
            name,
            kind,
            on_active,
            on_inactive,
            active,
            sensitive,
            mdi_pending: false,
            notices: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &ToggleKind {
        &self.kind
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_sensitive(&self) -> bool {
        self.sensitive
    }

    pub fn set_sensitive(&mut self, sensitive: bool) {
        self.sensitive = sensitive;
    }

    /// Change the displayed state without issuing anything.
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// MDI command issued and not yet finished
    pub fn is_pending(&self) -> bool {
        self.mdi_pending
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// User toggle: flip and run the matching edge action.
    ///
    /// Returns whether a command reached the controller.
    pub fn toggle(&mut self, ctx: &mut ActionContext) -> Result<bool> {
        if !self.sensitive {
            debug!("toggle {} is insensitive, ignoring", self.name);
            return Ok(false);
        }
        self.active = !self.active;

        if let ToggleKind::Mdi { .. } = self.kind {
            if !self.active {
                return Ok(false);
            }
            self.sensitive = false;
            self.notices.push(Notice::MdiCommandStarted);
            self.mdi_pending = true;
            let issued = self.on_active.run(ctx);
            if issued.is_err() {
                // nothing to wait for
                self.mdi_pending = false;
                self.active = false;
                self.sensitive = true;
                self.notices.push(Notice::MdiCommandStopped);
            }
            return issued;
        }

        if self.active {
            self.on_active.run(ctx)
        } else {
            match &self.on_inactive {
                Some(action) => action.run(ctx),
                None => Ok(false),
            }
        }
    }

    /// Follow machine state.
    pub fn on_status(&mut self, event: StatusEvent, ctx: &mut ActionContext) -> Result<()> {
        use StatusEvent::*;

        match (&self.kind, event) {
            (ToggleKind::Estop, StateEstop) => self.active = true,
            (ToggleKind::Estop, StateEstopReset) => self.active = false,

            (ToggleKind::Power, StateOn) => self.active = true,
            (ToggleKind::Power, StateOff) => self.active = false,
            (ToggleKind::Power, StateEstop) => self.sensitive = false,
            (ToggleKind::Power, StateEstopReset) => self.sensitive = true,

            (ToggleKind::Run | ToggleKind::Stop | ToggleKind::Pause | ToggleKind::Mdi { .. }, StateOff | StateEstop) => {
                self.sensitive = false
            }

            (ToggleKind::Run, InterpIdle) => {
                self.sensitive = ctx.machine_on()?;
                self.active = false;
            }
            (ToggleKind::Run, InterpRun) => {
                self.sensitive = false;
                self.active = true;
            }

            (ToggleKind::Stop, InterpIdle) => {
                self.sensitive = false;
                self.active = true;
            }
            (ToggleKind::Stop, InterpRun) => {
                self.sensitive = ctx.machine_on()?;
                self.active = false;
            }

            (ToggleKind::Pause, InterpIdle) => {
                self.sensitive = false;
                self.active = false;
            }
            (ToggleKind::Pause, InterpRun) => {
                self.sensitive = ctx.machine_on()?;
                self.active = false;
            }
            (ToggleKind::Pause, InterpPaused) => self.active = true,

            (ToggleKind::Mdi { .. }, InterpIdle) => self.sensitive = ctx.machine_on()?,
            (ToggleKind::Mdi { .. }, InterpRun) => self.sensitive = false,

            _ => {}
        }
        Ok(())
    }

    /// Check on a pending MDI command without blocking.
    pub fn poll(&mut self, ctx: &mut ActionContext) -> Result<()> {
        if !self.mdi_pending {
            return Ok(());
        }
        match ctx.command.wait_complete(Duration::ZERO)? {
            Completion::Timeout | Completion::Executing => Ok(()),
            done => {
                debug!("MDI {} finished: {:?}", self.name, done);
                self.mdi_pending = false;
                self.notices.push(Notice::MdiCommandStopped);
                self.set_active(false);
                self.sensitive = ctx.machine_on()?;
                Ok(())
            }
        }
    }
}
