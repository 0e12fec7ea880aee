use std::collections::HashMap;

use hx_error::{HalXadcError, Result};
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{debug, warn};

use crate::action::Action;
use crate::context::ActionContext;
use crate::status::{StatusEvent, StatusWatcher};
use crate::toggle::{Notice, ToggleAction};

/// Status events buffered between two refreshes.
const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
pub enum Entry {
    Plain(Action),
    Toggle(ToggleAction),
}

impl Entry {
    fn on_status(&mut self, event: StatusEvent, ctx: &mut ActionContext) -> Result<()> {
        match self {
            Entry::Plain(a) => a.on_status(event, ctx),
            Entry::Toggle(t) => t.on_status(event, ctx),
        }
    }
}

/// What a widget bound to an action should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WidgetState {
    pub sensitive: bool,
    /// `None` for plain actions
    pub active: Option<bool>,
}

/// Named actions sharing one context and one status feed.
pub struct ActionSet {
    ctx: ActionContext,
    watcher: StatusWatcher,
    events: broadcast::Receiver<StatusEvent>,
    entries: Vec<(String, Entry)>,
    index: HashMap<String, usize>,
}

impl ActionSet {
    pub fn new(ctx: ActionContext) -> Self {
        let watcher = StatusWatcher::new(EVENT_CAPACITY);
        let events = watcher.subscribe();
        Self { ctx, watcher, events, entries: Vec::new(), index: HashMap::new() }
    }

    pub fn context_mut(&mut self) -> &mut ActionContext {
        &mut self.ctx
    }

    fn insert(&mut self, name: String, entry: Entry) -> Result<()> {
        if self.index.contains_key(&name) {
            return Err(HalXadcError::DuplicateAction(name));
        }
        self.index.insert(name.clone(), self.entries.len());
        self.entries.push((name, entry));
        Ok(())
    }

    pub fn register_action(&mut self, action: Action) -> Result<()> {
        self.insert(action.name().to_string(), Entry::Plain(action))
    }

    pub fn register_toggle(&mut self, toggle: ToggleAction) -> Result<()> {
        self.insert(toggle.name().to_string(), Entry::Toggle(toggle))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    fn entry_mut(&mut self, name: &str) -> Result<&mut Entry> {
        let i = *self
            .index
            .get(name)
            .ok_or_else(|| HalXadcError::UnknownAction(name.to_string()))?;
        Ok(&mut self.entries[i].1)
    }

    /// Poll the machine and hand every resulting event to all actions.
    pub fn refresh(&mut self) -> Result<usize> {
        self.watcher.poll(self.ctx.status.as_mut())?;
        let mut delivered = 0;
        loop {
            match self.events.try_recv() {
                Ok(ev) => {
                    for (_, entry) in self.entries.iter_mut() {
                        entry.on_status(ev, &mut self.ctx)?;
                    }
                    delivered += 1;
                }
                Err(TryRecvError::Lagged(n)) => {
                    warn!("action set lagged {} status events", n);
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
        Ok(delivered)
    }

    /// Activate a plain action, or toggle a toggle action.
    pub fn activate(&mut self, name: &str) -> Result<bool> {
        let res = match self.index.get(name).copied() {
            Some(i) => match &mut self.entries[i].1 {
                Entry::Plain(a) => a.activate(&mut self.ctx),
                Entry::Toggle(t) => t.toggle(&mut self.ctx),
            },
            None => Err(HalXadcError::UnknownAction(name.to_string())),
        };
        if let Err(e) = &res {
            warn!("action {} failed: {}", name, e);
        }
        res
    }

    pub fn toggle(&mut self, name: &str) -> Result<bool> {
        let res = match self.index.get(name).copied() {
            Some(i) => match &mut self.entries[i].1 {
                Entry::Toggle(t) => t.toggle(&mut self.ctx),
                Entry::Plain(_) => Err(HalXadcError::UnknownAction(format!("{} is not a toggle", name))),
            },
            None => Err(HalXadcError::UnknownAction(name.to_string())),
        };
        if let Err(e) = &res {
            warn!("toggle {} failed: {}", name, e);
        }
        res
    }

    /// Refresh status and check pending MDI commands.
    pub fn poll(&mut self) -> Result<()> {
        self.refresh()?;
        for (name, entry) in self.entries.iter_mut() {
            if let Entry::Toggle(t) = entry {
                if let Err(e) = t.poll(&mut self.ctx) {
                    warn!("poll of {} failed: {}", name, e);
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    pub fn set_sensitive(&mut self, name: &str, sensitive: bool) -> Result<()> {
        match self.entry_mut(name)? {
            Entry::Plain(a) => a.set_sensitive(sensitive),
            Entry::Toggle(t) => t.set_sensitive(sensitive),
        }
        Ok(())
    }

    pub fn set_active(&mut self, name: &str, active: bool) -> Result<()> {
        match self.entry_mut(name)? {
            Entry::Toggle(t) => {
                t.set_active(active);
                Ok(())
            }
            Entry::Plain(_) => Err(HalXadcError::UnknownAction(format!("{} is not a toggle", name))),
        }
    }

    pub fn widget_state(&self, name: &str) -> Option<WidgetState> {
        let i = *self.index.get(name)?;
        Some(match &self.entries[i].1 {
            Entry::Plain(a) => WidgetState { sensitive: a.is_sensitive(), active: None },
            Entry::Toggle(t) => WidgetState { sensitive: t.is_sensitive(), active: Some(t.is_active()) },
        })
    }

    /// Notices raised by toggles since the last call.
    pub fn take_notices(&mut self) -> Vec<(String, Notice)> {
        let mut out = Vec::new();
        for (name, entry) in self.entries.iter_mut() {
            if let Entry::Toggle(t) = entry {
                out.extend(t.take_notices().into_iter().map(|n| (name.clone(), n)));
            }
        }
        if !out.is_empty() {
            debug!("{} action notice(s)", out.len());
        }
        out
    }
}
