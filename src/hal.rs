/*
 * This file is part of hal-xadc.
 *
 * Copyright (C) 2025 hal-xadc contributors
 *
 * hal-xadc is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * hal-xadc is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with hal-xadc. If not, see <https://www.gnu.org/licenses/>.
 */

//! Signal bus component
//!
//! A component owns a set of named output pins. Pins are registered before
//! `ready`, written after it, and released by `exit`. The in-memory component
//! keeps every value written so consumers and tests can inspect the history;
//! the status-file component mirrors the pin table into a JSON snapshot on
//! every `commit`.

use std::fs;
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use hx_actions::PinLookup;
use hx_error::{HalXadcError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PinType {
    Bit,
    Float,
}

impl PinType {
    fn label(&self) -> &'static str {
        match self {
            PinType::Bit => "a bit",
            PinType::Float => "a float",
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PinValue {
    Bit(bool),
    Float(f64),
}

impl PinValue {
    pub fn pin_type(&self) -> PinType {
        match self {
            PinValue::Bit(_) => PinType::Bit,
            PinValue::Float(_) => PinType::Float,
        }
    }

    pub fn as_bit(&self) -> Option<bool> {
        match self {
            PinValue::Bit(b) => Some(*b),
            PinValue::Float(_) => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            PinValue::Float(f) => Some(*f),
            PinValue::Bit(_) => None,
        }
    }

    fn default_for(ty: PinType) -> Self {
        match ty {
            PinType::Bit => PinValue::Bit(false),
            PinType::Float => PinValue::Float(0.0),
        }
    }

    fn to_json(self) -> Value {
        match self {
            PinValue::Bit(b) => json!(b),
            PinValue::Float(f) => json!(f),
        }
    }
}

/// Handle returned by `new_pin`; only valid for the component that issued it.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct PinId(usize);

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ComponentState {
    Registering,
    Ready,
    Exited,
}

/// Output side of a HAL-style component.
pub trait HalComponent {
    fn name(&self) -> &str;
    fn state(&self) -> ComponentState;
    /// Register an output pin; names are relative to the component.
    fn new_pin(&mut self, name: &str, ty: PinType) -> Result<PinId>;
    /// Finish registration; pins become writable.
    fn ready(&mut self) -> Result<()>;
    fn set(&mut self, pin: PinId, value: PinValue) -> Result<()>;
    fn get(&self, name: &str) -> Option<PinValue>;
    fn pin_names(&self) -> Vec<String>;
    /// Publish everything written since the last commit.
    fn commit(&mut self) -> Result<()>;
    /// Release the component; further writes are rejected.
    fn exit(&mut self) -> Result<()>;

    fn set_bit(&mut self, pin: PinId, value: bool) -> Result<()> {
        self.set(pin, PinValue::Bit(value))
    }

    fn set_float(&mut self, pin: PinId, value: f64) -> Result<()> {
        self.set(pin, PinValue::Float(value))
    }
}

#[derive(Debug, Clone)]
struct PinSlot {
    name: String,
    ty: PinType,
    value: PinValue,
    history: Vec<PinValue>,
}

/// In-process component holding the pin table.
#[derive(Debug, Clone)]
pub struct MemoryComponent {
    name: String,
    state: ComponentState,
    pins: Vec<PinSlot>,
    commits: u64,
}

impl MemoryComponent {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: ComponentState::Registering,
            pins: Vec::new(),
            commits: 0,
        }
    }

    /// Every value written to a pin, oldest first.
    pub fn history(&self, name: &str) -> Option<&[PinValue]> {
        self.pins.iter().find(|p| p.name == name).map(|p| p.history.as_slice())
    }

    pub fn float_history(&self, name: &str) -> Vec<f64> {
        self.history(name)
            .map(|h| h.iter().filter_map(|v| v.as_float()).collect())
            .unwrap_or_default()
    }

    pub fn bit_history(&self, name: &str) -> Vec<bool> {
        self.history(name)
            .map(|h| h.iter().filter_map(|v| v.as_bit()).collect())
            .unwrap_or_default()
    }

    pub fn commits(&self) -> u64 {
        self.commits
    }

    /// Pin table as `{"<component>.<pin>": value}` in registration order.
    pub fn snapshot(&self) -> Value {
        let mut pins = Map::new();
        for p in &self.pins {
            pins.insert(format!("{}.{}", self.name, p.name), p.value.to_json());
        }
        json!({
            "component": self.name,
            "ready": self.state == ComponentState::Ready,
            "tick": self.commits,
            "pins": Value::Object(pins),
        })
    }

    fn require(&self, want: ComponentState) -> Result<()> {
        if self.state == want {
            return Ok(());
        }
        let state = match self.state {
            ComponentState::Registering => "not ready",
            ComponentState::Ready => "already ready",
            ComponentState::Exited => "exited",
        };
        Err(HalXadcError::ComponentState { component: self.name.clone(), state })
    }
}

impl HalComponent for MemoryComponent {
    fn name(&self) -> &str {
        &self.name
    }

    fn state(&self) -> ComponentState {
        self.state
    }

    fn new_pin(&mut self, name: &str, ty: PinType) -> Result<PinId> {
        self.require(ComponentState::Registering)?;
        if name.is_empty() {
            return Err(HalXadcError::invalid_config("pin", "empty pin name"));
        }
        if self.pins.iter().any(|p| p.name == name) {
            return Err(HalXadcError::DuplicatePin(format!("{}.{}", self.name, name)));
        }
        self.pins.push(PinSlot {
            name: name.to_string(),
            ty,
            value: PinValue::default_for(ty),
            history: Vec::new(),
        });
        debug!("{}: new pin {}.{} ({:?})", self.name, self.name, name, ty);
        Ok(PinId(self.pins.len() - 1))
    }

    fn ready(&mut self) -> Result<()> {
        self.require(ComponentState::Registering)?;
        self.state = ComponentState::Ready;
        Ok(())
    }

    fn set(&mut self, pin: PinId, value: PinValue) -> Result<()> {
        self.require(ComponentState::Ready)?;
        let component = &self.name;
        let slot = self
            .pins
            .get_mut(pin.0)
            .ok_or_else(|| HalXadcError::UnknownPin(format!("{}#{}", component, pin.0)))?;
        if value.pin_type() != slot.ty {
            return Err(HalXadcError::PinTypeMismatch {
                pin: format!("{}.{}", component, slot.name),
                expected: slot.ty.label(),
            });
        }
        slot.value = value;
        slot.history.push(value);
        Ok(())
    }

    fn get(&self, name: &str) -> Option<PinValue> {
        self.pins.iter().find(|p| p.name == name).map(|p| p.value)
    }

    fn pin_names(&self) -> Vec<String> {
        self.pins.iter().map(|p| p.name.clone()).collect()
    }

    fn commit(&mut self) -> Result<()> {
        self.require(ComponentState::Ready)?;
        self.commits += 1;
        Ok(())
    }

    fn exit(&mut self) -> Result<()> {
        self.state = ComponentState::Exited;
        Ok(())
    }
}

/// MDI templates read pins by full (`<comp>.<pin>`) or relative name; bits read as 0/1.
impl PinLookup for MemoryComponent {
    fn float(&self, name: &str) -> Option<f64> {
        let local = name
            .strip_prefix(self.name.as_str())
            .and_then(|rest| rest.strip_prefix('.'))
            .unwrap_or(name);
        self.get(local).map(|v| match v {
            PinValue::Float(f) => f,
            PinValue::Bit(b) => f64::from(u8::from(b)),
        })
    }
}

/// Component that mirrors its pin table into a JSON file on every commit.
#[derive(Debug)]
pub struct StatusFileComponent {
    inner: MemoryComponent,
    path: PathBuf,
}

impl StatusFileComponent {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self { inner: MemoryComponent::new(name), path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn memory(&self) -> &MemoryComponent {
        &self.inner
    }

    fn write_snapshot(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.inner.snapshot())?;
        write_atomic(&self.path, json.as_bytes())
    }
}

/// Write via a temp file in the same directory, then rename over the target.
fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let map_err = |source| HalXadcError::FileWrite { path: path.to_path_buf(), source };
    let parent = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
    fs::create_dir_all(parent).map_err(map_err)?;
    let file_name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    let tmp = parent.join(format!(".{}.tmp", file_name));
    {
        let mut f = fs::File::create(&tmp).map_err(map_err)?;
        f.write_all(data).map_err(map_err)?;
        f.write_all(b"\n").map_err(map_err)?;
    }
    // Best-effort world-readable like the other files under /run
    let _ = fs::set_permissions(&tmp, fs::Permissions::from_mode(0o644));
    fs::rename(&tmp, path).map_err(map_err)
}

impl HalComponent for StatusFileComponent {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn state(&self) -> ComponentState {
        self.inner.state()
    }

    fn new_pin(&mut self, name: &str, ty: PinType) -> Result<PinId> {
        self.inner.new_pin(name, ty)
    }

    fn ready(&mut self) -> Result<()> {
        self.inner.ready()?;
        self.write_snapshot()
    }

    fn set(&mut self, pin: PinId, value: PinValue) -> Result<()> {
        self.inner.set(pin, value)
    }

    fn get(&self, name: &str) -> Option<PinValue> {
        self.inner.get(name)
    }

    fn pin_names(&self) -> Vec<String> {
        self.inner.pin_names()
    }

    fn commit(&mut self) -> Result<()> {
        self.inner.commit()?;
        self.write_snapshot()
    }

    fn exit(&mut self) -> Result<()> {
        self.inner.exit()?;
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => {
                warn!("Failed to remove status file {}: {}", self.path.display(), e);
                Ok(())
            }
        }
    }
}

impl<C: HalComponent + ?Sized> HalComponent for Box<C> {
    fn name(&self) -> &str {
        (**self).name()
    }
    fn state(&self) -> ComponentState {
        (**self).state()
    }
    fn new_pin(&mut self, name: &str, ty: PinType) -> Result<PinId> {
        (**self).new_pin(name, ty)
    }
    fn ready(&mut self) -> Result<()> {
        (**self).ready()
    }
    fn set(&mut self, pin: PinId, value: PinValue) -> Result<()> {
        (**self).set(pin, value)
    }
    fn get(&self, name: &str) -> Option<PinValue> {
        (**self).get(name)
    }
    fn pin_names(&self) -> Vec<String> {
        (**self).pin_names()
    }
    fn commit(&mut self) -> Result<()> {
        (**self).commit()
    }
    fn exit(&mut self) -> Result<()> {
        (**self).exit()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_register_then_write() {
        let mut c = MemoryComponent::new("xadc");
        let raw = c.new_pin("01.raw", PinType::Float).unwrap();
        let err = c.new_pin("error", PinType::Bit).unwrap();
        assert!(c.set_float(raw, 1.0).is_err(), "writes before ready must fail");
        c.ready().unwrap();
        c.set_float(raw, 12.5).unwrap();
        c.set_bit(err, true).unwrap();
        assert_eq!(c.get("01.raw"), Some(PinValue::Float(12.5)));
        assert_eq!(c.get("error"), Some(PinValue::Bit(true)));
        assert_eq!(c.pin_names(), vec!["01.raw", "error"]);
    }

    #[test]
    fn test_duplicate_pin_rejected() {
        let mut c = MemoryComponent::new("xadc");
        c.new_pin("watchdog", PinType::Bit).unwrap();
        let e = c.new_pin("watchdog", PinType::Bit).unwrap_err();
        assert!(matches!(e, HalXadcError::DuplicatePin(ref n) if n == "xadc.watchdog"));
    }

    #[test]
    fn test_no_registration_after_ready() {
        let mut c = MemoryComponent::new("xadc");
        c.ready().unwrap();
        assert!(matches!(
            c.new_pin("late", PinType::Bit),
            Err(HalXadcError::ComponentState { .. })
        ));
    }

    #[test]
    fn test_type_mismatch_rejected() {
        let mut c = MemoryComponent::new("xadc");
        let p = c.new_pin("error", PinType::Bit).unwrap();
        c.ready().unwrap();
        let e = c.set_float(p, 1.0).unwrap_err();
        assert!(matches!(e, HalXadcError::PinTypeMismatch { .. }));
        assert!(c.history("error").unwrap().is_empty());
    }

    #[test]
    fn test_history_and_exit() {
        let mut c = MemoryComponent::new("xadc");
        let p = c.new_pin("watchdog", PinType::Bit).unwrap();
        c.ready().unwrap();
        for b in [true, false, true] {
            c.set_bit(p, b).unwrap();
        }
        assert_eq!(c.bit_history("watchdog"), vec![true, false, true]);
        c.exit().unwrap();
        assert_eq!(c.state(), ComponentState::Exited);
        assert!(c.set_bit(p, false).is_err());
    }

    #[test]
    fn test_snapshot_shape() {
        let mut c = MemoryComponent::new("xadc");
        let p = c.new_pin("01.raw", PinType::Float).unwrap();
        c.ready().unwrap();
        c.set_float(p, 150.0).unwrap();
        c.commit().unwrap();
        let snap = c.snapshot();
        assert_eq!(snap["component"], "xadc");
        assert_eq!(snap["ready"], true);
        assert_eq!(snap["tick"], 1);
        assert_eq!(snap["pins"]["xadc.01.raw"], 150.0);
    }

    #[test]
    fn test_status_file_lifecycle() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("run").join("xadc.json");
        let mut c = StatusFileComponent::new("xadc", &path);
        let p = c.new_pin("error", PinType::Bit).unwrap();
        assert!(!path.exists());
        c.ready().unwrap();
        assert!(path.exists());

        c.set_bit(p, true).unwrap();
        c.commit().unwrap();
        let v: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(v["pins"]["xadc.error"], true);
        assert_eq!(v["tick"], 1);
        assert_eq!(c.memory().commits(), 1);

        c.exit().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_boxed_component_delegates() {
        let mut c: Box<dyn HalComponent> = Box::new(MemoryComponent::new("boxed"));
        let p = c.new_pin("x", PinType::Float).unwrap();
        c.ready().unwrap();
        c.set_float(p, 2.0).unwrap();
        assert_eq!(c.get("x"), Some(PinValue::Float(2.0)));
        assert_eq!(c.name(), "boxed");
    }

    #[test]
    fn test_pins_feed_mdi_templates() {
        let mut c = MemoryComponent::new("xadc");
        let temp = c.new_pin("01.value", PinType::Float).unwrap();
        let err = c.new_pin("error", PinType::Bit).unwrap();
        c.ready().unwrap();
        c.set_float(temp, 215.3).unwrap();
        c.set_bit(err, true).unwrap();

        let cmd = hx_actions::template::substitute("M104 S${xadc.01.value} P$error", &c).unwrap();
        assert_eq!(cmd, "M104 S215.3 P1");
        assert!(hx_actions::template::substitute("M104 S${01.value}", &c).is_err());
        assert_eq!(c.float("01.value"), Some(215.3));
        assert_eq!(c.float("error"), Some(1.0));
        assert_eq!(c.float("missing"), None);
    }
}
