use hx_error::Result;
use tracing::{debug, info};

use crate::command::{AutoCommand, WAIT_TIMEOUT};
use crate::context::ActionContext;
use crate::status::{InterpState, StatusEvent, TaskMode, TaskState};
use crate::template;

pub const REHOME_PROMPT: &str = "Axis is already homed, are you sure you want to re-home?";

/// Switch to one of `modes` unless already in one of them.
///
/// Returns false for an empty set or when a program is running in auto mode,
/// in which case the mode is left alone.
pub fn ensure_mode(ctx: &mut ActionContext, modes: &[TaskMode]) -> Result<bool> {
    let status = ctx.poll()?;
    let Some(first) = modes.first() else {
        return Ok(false);
    };
    if modes.contains(&status.task_mode) {
        return Ok(true);
    }
    if status.running() {
        return Ok(false);
    }
    debug!("switching mode {:?} -> {:?}", status.task_mode, first);
    ctx.command.mode(*first)?;
    ctx.command.wait_complete(WAIT_TIMEOUT)?;
    Ok(true)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionKind {
    Estop,
    EstopReset,
    On,
    Off,
    Run,
    Step,
    Pause,
    Resume,
    Stop,
    Mdi { command: String },
    /// `axis: None` homes all axes
    Home { axis: Option<usize>, confirm_homed: bool },
    Unhome { axis: Option<usize> },
}

/// A one-shot machine action.
#[derive(Debug, Clone)]
pub struct Action {
    name: String,
    kind: ActionKind,
    sensitive: bool,
}

impl Action {
    pub fn new(name: impl Into<String>, kind: ActionKind) -> Self {
        Self { name: name.into(), kind, sensitive: true }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &ActionKind {
        &self.kind
    }

    pub fn is_sensitive(&self) -> bool {
        self.sensitive
    }

    pub fn set_sensitive(&mut self, sensitive: bool) {
        self.sensitive = sensitive;
    }

    /// Run the action. Returns whether a command reached the controller.
    pub fn activate(&mut self, ctx: &mut ActionContext) -> Result<bool> {
        if !self.sensitive {
            debug!("action {} is insensitive, ignoring", self.name);
            return Ok(false);
        }
        self.run(ctx)
    }

    /// Run regardless of sensitivity; toggles track sensitivity themselves.
    pub(crate) fn run(&self, ctx: &mut ActionContext) -> Result<bool> {
        info!("action {}: {:?}", self.name, self.kind);
        match &self.kind {
            ActionKind::Estop => ctx.command.state(TaskState::Estop)?,
            ActionKind::EstopReset => ctx.command.state(TaskState::EstopReset)?,
            ActionKind::On => ctx.command.state(TaskState::On)?,
            ActionKind::Off => ctx.command.state(TaskState::Off)?,
            ActionKind::Run => {
                ensure_mode(ctx, &[TaskMode::Auto])?;
                ctx.command.auto(AutoCommand::Run { start_line: 0 })?;
            }
            ActionKind::Step => {
                ensure_mode(ctx, &[TaskMode::Auto])?;
                ctx.command.auto(AutoCommand::Step)?;
            }
            ActionKind::Pause => {
                let s = ctx.poll()?;
                if s.task_mode != TaskMode::Auto
                    || !matches!(s.interp_state, InterpState::Reading | InterpState::Waiting)
                {
                    return Ok(false);
                }
                ensure_mode(ctx, &[TaskMode::Auto])?;
                ctx.command.auto(AutoCommand::Pause)?;
            }
            ActionKind::Resume => {
                let s = ctx.poll()?;
                if !s.paused || !matches!(s.task_mode, TaskMode::Auto | TaskMode::Mdi) {
                    return Ok(false);
                }
                ensure_mode(ctx, &[TaskMode::Auto, TaskMode::Mdi])?;
                ctx.command.auto(AutoCommand::Resume)?;
            }
            ActionKind::Stop => {
                ctx.command.abort()?;
                ctx.command.wait_complete(WAIT_TIMEOUT)?;
            }
            ActionKind::Mdi { command } => {
                ensure_mode(ctx, &[TaskMode::Mdi])?;
                let cmd = template::substitute(command, ctx.pins.as_ref())?;
                ctx.command.mdi(&cmd)?;
            }
            ActionKind::Home { axis, confirm_homed } => {
                ensure_mode(ctx, &[TaskMode::Manual])?;
                if *confirm_homed && ctx.poll()?.homed(*axis) && !ctx.confirm.confirm(REHOME_PROMPT) {
                    return Ok(false);
                }
                ctx.command.home(*axis)?;
            }
            ActionKind::Unhome { axis } => {
                ensure_mode(ctx, &[TaskMode::Manual])?;
                ctx.command.unhome(*axis)?;
            }
        }
        Ok(true)
    }

    /// React to a status change. Only Step and MDI track machine state.
    pub fn on_status(&mut self, event: StatusEvent, ctx: &mut ActionContext) -> Result<()> {
        let tracks_run = match self.kind {
            ActionKind::Step => false,
            ActionKind::Mdi { .. } => true,
            _ => return Ok(()),
        };
        match event {
            StatusEvent::StateOff | StatusEvent::StateEstop => self.sensitive = false,
            StatusEvent::InterpIdle => self.sensitive = ctx.machine_on()?,
            StatusEvent::InterpRun if tracks_run => self.sensitive = false,
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{
        Completion, FixedAnswer, MockConfirm, MockMachineCommand, MockStatusSource,
    };
    use crate::status::MachineStatus;
    use mockall::predicate::eq;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    fn status_source(status: MachineStatus) -> MockStatusSource {
        let mut src = MockStatusSource::new();
        src.expect_poll().returning(move || Ok(status.clone()));
        src
    }

    fn ctx(cmd: MockMachineCommand, status: MachineStatus) -> ActionContext {
        ActionContext::new(
            Box::new(cmd),
            Box::new(status_source(status)),
            Box::new(HashMap::from([("xadc.temp".to_string(), 21.5)])),
            Box::new(FixedAnswer(true)),
        )
    }

    fn on_idle(mode: TaskMode) -> MachineStatus {
        MachineStatus { task_state: TaskState::On, task_mode: mode, ..Default::default() }
    }

    #[test]
    fn test_ensure_mode_already_in_mode() {
        let mut cmd = MockMachineCommand::new();
        cmd.expect_mode().never();
        let mut c = ctx(cmd, on_idle(TaskMode::Mdi));
        assert!(ensure_mode(&mut c, &[TaskMode::Auto, TaskMode::Mdi]).unwrap());
    }

    #[test]
    fn test_ensure_mode_empty_set() {
        let mut cmd = MockMachineCommand::new();
        cmd.expect_mode().never();
        let mut c = ctx(cmd, on_idle(TaskMode::Manual));
        assert!(!ensure_mode(&mut c, &[]).unwrap());
    }

    #[test]
    fn test_ensure_mode_refuses_while_running() {
        let mut cmd = MockMachineCommand::new();
        cmd.expect_mode().never();
        let status = MachineStatus { interp_state: InterpState::Reading, ..on_idle(TaskMode::Auto) };
        let mut c = ctx(cmd, status);
        assert!(!ensure_mode(&mut c, &[TaskMode::Manual]).unwrap());
    }

    #[test]
    fn test_ensure_mode_switches_to_first() {
        let mut cmd = MockMachineCommand::new();
        cmd.expect_mode().with(eq(TaskMode::Auto)).times(1).returning(|_| Ok(()));
        cmd.expect_wait_complete().times(1).returning(|_| Ok(Completion::Done));
        let mut c = ctx(cmd, on_idle(TaskMode::Manual));
        assert!(ensure_mode(&mut c, &[TaskMode::Auto, TaskMode::Mdi]).unwrap());
    }

    #[test]
    fn test_state_actions() {
        let mut cmd = MockMachineCommand::new();
        cmd.expect_state().with(eq(TaskState::EstopReset)).times(1).returning(|_| Ok(()));
        let mut c = ctx(cmd, MachineStatus::default());
        let mut a = Action::new("reset", ActionKind::EstopReset);
        assert!(a.activate(&mut c).unwrap());
    }

    #[test]
    fn test_run_from_line_zero() {
        let mut cmd = MockMachineCommand::new();
        cmd.expect_auto()
            .with(eq(AutoCommand::Run { start_line: 0 }))
            .times(1)
            .returning(|_| Ok(()));
        let mut c = ctx(cmd, on_idle(TaskMode::Auto));
        assert!(Action::new("run", ActionKind::Run).activate(&mut c).unwrap());
    }

    #[test]
    fn test_pause_only_while_reading_or_waiting() {
        let mut cmd = MockMachineCommand::new();
        cmd.expect_auto().never();
        let mut c = ctx(cmd, on_idle(TaskMode::Auto));
        assert!(!Action::new("pause", ActionKind::Pause).activate(&mut c).unwrap());

        let mut cmd = MockMachineCommand::new();
        cmd.expect_auto().with(eq(AutoCommand::Pause)).times(1).returning(|_| Ok(()));
        let status = MachineStatus { interp_state: InterpState::Waiting, ..on_idle(TaskMode::Auto) };
        let mut c = ctx(cmd, status);
        assert!(Action::new("pause", ActionKind::Pause).activate(&mut c).unwrap());
    }

    #[test]
    fn test_resume_requires_paused() {
        let mut cmd = MockMachineCommand::new();
        cmd.expect_auto().never();
        let mut c = ctx(cmd, on_idle(TaskMode::Auto));
        assert!(!Action::new("resume", ActionKind::Resume).activate(&mut c).unwrap());

        let mut cmd = MockMachineCommand::new();
        cmd.expect_auto().with(eq(AutoCommand::Resume)).times(1).returning(|_| Ok(()));
        let status = MachineStatus { paused: true, interp_state: InterpState::Paused, ..on_idle(TaskMode::Mdi) };
        let mut c = ctx(cmd, status);
        assert!(Action::new("resume", ActionKind::Resume).activate(&mut c).unwrap());
    }

    #[test]
    fn test_stop_aborts_and_waits() {
        let mut cmd = MockMachineCommand::new();
        cmd.expect_abort().times(1).returning(|| Ok(()));
        cmd.expect_wait_complete().times(1).returning(|_| Ok(Completion::Done));
        let mut c = ctx(cmd, on_idle(TaskMode::Auto));
        assert!(Action::new("stop", ActionKind::Stop).activate(&mut c).unwrap());
    }

    #[test]
    fn test_mdi_substitutes_pins() {
        let sent = Arc::new(Mutex::new(Vec::<String>::new()));
        let log = sent.clone();
        let mut cmd = MockMachineCommand::new();
        cmd.expect_mdi().times(1).returning(move |c| {
            log.lock().unwrap().push(c.to_string());
            Ok(())
        });
        let mut c = ctx(cmd, on_idle(TaskMode::Mdi));
        let mut a = Action::new("mdi", ActionKind::Mdi { command: "M104 S${xadc.temp}".into() });
        assert!(a.activate(&mut c).unwrap());
        assert_eq!(*sent.lock().unwrap(), vec!["M104 S21.5".to_string()]);
    }

    #[test]
    fn test_mdi_unknown_pin_sends_nothing() {
        let mut cmd = MockMachineCommand::new();
        cmd.expect_mdi().never();
        let mut c = ctx(cmd, on_idle(TaskMode::Mdi));
        let mut a = Action::new("mdi", ActionKind::Mdi { command: "G0 X$missing".into() });
        assert!(a.activate(&mut c).is_err());
    }

    #[test]
    fn test_home_confirms_rehoming() {
        let homed = MachineStatus { homed: vec![true], axis_mask: 1, ..on_idle(TaskMode::Manual) };

        let mut cmd = MockMachineCommand::new();
        cmd.expect_home().never();
        let mut confirm = MockConfirm::new();
        confirm.expect_confirm().times(1).returning(|msg| {
            assert_eq!(msg, REHOME_PROMPT);
            false
        });
        let mut c = ActionContext::new(
            Box::new(cmd),
            Box::new(status_source(homed.clone())),
            Box::new(HashMap::new()),
            Box::new(confirm),
        );
        let mut a = Action::new("home", ActionKind::Home { axis: None, confirm_homed: true });
        assert!(!a.activate(&mut c).unwrap());

        let mut cmd = MockMachineCommand::new();
        cmd.expect_home().with(eq(Some(0))).times(1).returning(|_| Ok(()));
        let mut c = ctx(cmd, homed);
        let mut a = Action::new("home", ActionKind::Home { axis: Some(0), confirm_homed: true });
        assert!(a.activate(&mut c).unwrap());
    }

    #[test]
    fn test_unhome_switches_to_manual() {
        let mut cmd = MockMachineCommand::new();
        cmd.expect_mode().with(eq(TaskMode::Manual)).times(1).returning(|_| Ok(()));
        cmd.expect_wait_complete().returning(|_| Ok(Completion::Done));
        cmd.expect_unhome().with(eq(None)).times(1).returning(|_| Ok(()));
        let mut c = ctx(cmd, on_idle(TaskMode::Auto));
        assert!(Action::new("unhome", ActionKind::Unhome { axis: None }).activate(&mut c).unwrap());
    }

    #[test]
    fn test_insensitive_action_does_nothing() {
        let mut cmd = MockMachineCommand::new();
        cmd.expect_state().never();
        let mut c = ctx(cmd, MachineStatus::default());
        let mut a = Action::new("on", ActionKind::On);
        a.set_sensitive(false);
        assert!(!a.activate(&mut c).unwrap());
    }

    #[test]
    fn test_step_and_mdi_sensitivity() {
        let mut c = ctx(MockMachineCommand::new(), on_idle(TaskMode::Manual));
        let mut step = Action::new("step", ActionKind::Step);
        let mut mdi = Action::new("mdi", ActionKind::Mdi { command: "G0".into() });

        for a in [&mut step, &mut mdi] {
            a.on_status(StatusEvent::StateEstop, &mut c).unwrap();
            assert!(!a.is_sensitive());
            a.on_status(StatusEvent::InterpIdle, &mut c).unwrap();
            assert!(a.is_sensitive());
        }

        step.on_status(StatusEvent::InterpRun, &mut c).unwrap();
        mdi.on_status(StatusEvent::InterpRun, &mut c).unwrap();
        assert!(step.is_sensitive());
        assert!(!mdi.is_sensitive());
    }

    #[test]
    fn test_other_actions_ignore_status() {
        let mut c = ctx(MockMachineCommand::new(), MachineStatus::default());
        let mut a = Action::new("estop", ActionKind::Estop);
        a.on_status(StatusEvent::StateEstop, &mut c).unwrap();
        assert!(a.is_sensitive());
    }
}
