use hx_error::Result;

use crate::command::{Confirm, MachineCommand, PinLookup, StatusSource};
use crate::status::MachineStatus;

/// Everything an action needs to talk to the machine.
///
/// Built once by the owner of the action set and handed to every action call.
pub struct ActionContext {
    pub command: Box<dyn MachineCommand>,
    pub status: Box<dyn StatusSource>,
    pub pins: Box<dyn PinLookup>,
    pub confirm: Box<dyn Confirm>,
}

impl ActionContext {
    pub fn new(
        command: Box<dyn MachineCommand>,
        status: Box<dyn StatusSource>,
        pins: Box<dyn PinLookup>,
        confirm: Box<dyn Confirm>,
    ) -> Self {
        Self { command, status, pins, confirm }
    }

    pub fn poll(&mut self) -> Result<MachineStatus> {
        self.status.poll()
    }

    pub fn machine_on(&mut self) -> Result<bool> {
        Ok(self.poll()?.machine_on())
    }
}
