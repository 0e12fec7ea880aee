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

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use hx_error::{HalXadcError, Result};
use tracing::{debug, info, warn};

use crate::adc;
use crate::config::SamplerConfig;
use crate::constants::sampler as pins;
use crate::divider::Baseboard;
use crate::filter::MovingAverage;
use crate::hal::{HalComponent, PinId, PinType};
use crate::thermistor::{round_tenth, ThermistorCurve};

/// Longest single sleep between shutdown checks.
const SHUTDOWN_POLL: Duration = Duration::from_millis(100);

/// A resolved channel before any pin exists for it.
#[derive(Debug, Clone)]
pub struct ResolvedChannel {
    pub id: String,
    pub source_path: PathBuf,
    pub curve: Option<ThermistorCurve>,
}

#[derive(Debug)]
struct Channel {
    id: String,
    source_path: PathBuf,
    filter: MovingAverage,
    curve: Option<ThermistorCurve>,
    raw_pin: PinId,
    value_pin: Option<PinId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub error: bool,
    pub watchdog: bool,
    /// Channels fully processed this tick
    pub published: usize,
    pub failure: Option<String>,
}

/// Resolve every configured channel: source file, readability and curve.
///
/// Runs before the bus component is created so a failure leaves no pins behind.
pub fn resolve_channels(config: &SamplerConfig) -> Result<Vec<ResolvedChannel>> {
    let mut out = Vec::with_capacity(config.channels.len());
    for spec in &config.channels {
        let source_path = adc::resolve_raw_path(&config.device_dir, &spec.id)?;
        adc::check_readable(&source_path)?;
        let curve = match &spec.curve {
            Some(name) => Some(ThermistorCurve::load(name, &config.thermistor_dir)?),
            None => None,
        };
        info!(
            "channel {}: {} ({})",
            spec.id,
            source_path.display(),
            curve.as_ref().map(|c| c.name()).unwrap_or(pins::NO_CURVE)
        );
        out.push(ResolvedChannel { id: spec.id.clone(), source_path, curve });
    }
    Ok(out)
}

/// Sampler-publisher loop over a bus component.
pub struct Sampler<C: HalComponent> {
    component: C,
    channels: Vec<Channel>,
    baseboard: Baseboard,
    r_pu: f64,
    interval: Duration,
    error_pin: PinId,
    no_error_pin: PinId,
    watchdog_pin: PinId,
    error: bool,
    watchdog: bool,
    ticks: u64,
}

impl<C: HalComponent> Sampler<C> {
    /// Register all pins, mark the component ready and publish the initial status.
    ///
    /// On failure the component is exited before the error is returned, so a
    /// status file written by `ready` does not outlive the process.
    pub fn new(config: &SamplerConfig, resolved: Vec<ResolvedChannel>, mut component: C) -> Result<Self> {
        let (channels, error_pin, no_error_pin, watchdog_pin) =
            match Self::register(config, resolved, &mut component) {
                Ok(pins) => pins,
                Err(e) => return Err(Self::abandon(component, e)),
            };

        let mut sampler = Self {
            component,
            channels,
            baseboard: config.baseboard,
            r_pu: config.r_pu,
            interval: config.interval,
            error_pin,
            no_error_pin,
            watchdog_pin,
            error: false,
            watchdog: true,
            ticks: 0,
        };
        if let Err(e) = sampler.publish_status().and_then(|_| sampler.component.commit()) {
            return Err(Self::abandon(sampler.component, e));
        }
        info!(
            "HAL component {} ready with {} channel(s)",
            sampler.component.name(),
            sampler.channels.len()
        );
        Ok(sampler)
    }

    fn register(
        config: &SamplerConfig,
        resolved: Vec<ResolvedChannel>,
        component: &mut C,
    ) -> Result<(Vec<Channel>, PinId, PinId, PinId)> {
        let mut channels = Vec::with_capacity(resolved.len());
        for rc in resolved {
            let raw_pin = component.new_pin(&format!("{}.{}", rc.id, pins::RAW_PIN_SUFFIX), PinType::Float)?;
            let value_pin = match rc.curve {
                Some(_) => Some(component.new_pin(
                    &format!("{}.{}", rc.id, pins::VALUE_PIN_SUFFIX),
                    PinType::Float,
                )?),
                None => None,
            };
            channels.push(Channel {
                id: rc.id,
                source_path: rc.source_path,
                filter: MovingAverage::new(config.filter_size),
                curve: rc.curve,
                raw_pin,
                value_pin,
            });
        }
        let error_pin = component.new_pin(pins::ERROR_PIN, PinType::Bit)?;
        let no_error_pin = component.new_pin(pins::NO_ERROR_PIN, PinType::Bit)?;
        let watchdog_pin = component.new_pin(pins::WATCHDOG_PIN, PinType::Bit)?;
        component.ready()?;
        Ok((channels, error_pin, no_error_pin, watchdog_pin))
    }

    fn abandon(mut component: C, err: HalXadcError) -> HalXadcError {
        if let Err(e) = component.exit() {
            warn!("Failed to release HAL component {}: {}", component.name(), e);
        }
        err
    }

    pub fn component(&self) -> &C {
        &self.component
    }

    pub fn error(&self) -> bool {
        self.error
    }

    pub fn watchdog(&self) -> bool {
        self.watchdog
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    fn publish_status(&mut self) -> Result<()> {
        self.component.set_bit(self.error_pin, self.error)?;
        self.component.set_bit(self.no_error_pin, !self.error)?;
        self.component.set_bit(self.watchdog_pin, self.watchdog)
    }

    /// Read, filter, convert and publish one channel.
    fn sample_channel(
        component: &mut C,
        ch: &mut Channel,
        baseboard: Baseboard,
        r_pu: f64,
    ) -> Result<()> {
        let raw = adc::read_raw(&ch.source_path)?;
        let mean = ch.filter.push(raw);
        component.set_float(ch.raw_pin, mean)?;
        if let (Some(curve), Some(pin)) = (&ch.curve, ch.value_pin) {
            let ohms = baseboard.resistance(mean, r_pu);
            let temp = round_tenth(curve.r2t(ohms));
            component.set_float(pin, temp)?;
        }
        Ok(())
    }

    /// One sampling pass over all channels followed by the status pins.
    ///
    /// Read failures only raise the error pin; bus failures are returned.
    pub fn tick(&mut self) -> Result<TickReport> {
        let mut published = 0;
        let mut failure: Option<String> = None;

        for ch in self.channels.iter_mut() {
            match Self::sample_channel(&mut self.component, ch, self.baseboard, self.r_pu) {
                Ok(()) => published += 1,
                Err(e) if e.is_transient() => {
                    failure = Some(format!("channel {}: {}", ch.id, e));
                    break;
                }
                Err(e) => return Err(e),
            }
        }

        let was_error = self.error;
        self.error = failure.is_some();
        match (&failure, was_error) {
            (Some(msg), false) => warn!("read failure, error pin raised: {}", msg),
            (Some(msg), true) => debug!("read failure persists: {}", msg),
            (None, true) => info!("all channels readable again, error pin cleared"),
            (None, false) => {}
        }

        self.watchdog = !self.watchdog;
        self.publish_status()?;
        self.component.commit()?;
        self.ticks += 1;

        Ok(TickReport { error: self.error, watchdog: self.watchdog, published, failure })
    }

    /// Tick until `shutdown` is set. Returns the first bus error.
    pub fn run(&mut self, shutdown: &AtomicBool) -> Result<()> {
        while !shutdown.load(Ordering::SeqCst) {
            let started = Instant::now();
            self.tick()?;
            self.sleep_remaining(started, shutdown);
        }
        debug!("shutdown requested after {} tick(s)", self.ticks);
        Ok(())
    }

    fn sleep_remaining(&self, started: Instant, shutdown: &AtomicBool) {
        // An interval past the clock's range never elapses; only shutdown ends it
        let deadline = started.checked_add(self.interval);
        loop {
            if shutdown.load(Ordering::SeqCst) {
                return;
            }
            let step = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return;
                    }
                    (deadline - now).min(SHUTDOWN_POLL)
                }
                None => SHUTDOWN_POLL,
            };
            thread::sleep(step);
        }
    }

    /// Release the component and hand it back.
    pub fn shutdown(mut self) -> Result<C> {
        self.component.exit()?;
        Ok(self.component)
    }
}

/// Resolve channels, then build the sampler on the component made by `make`.
pub fn build_sampler<C, F>(config: &SamplerConfig, make: F) -> Result<Sampler<C>>
where
    C: HalComponent,
    F: FnOnce(&SamplerConfig) -> C,
{
    let resolved = resolve_channels(config)?;
    if resolved.is_empty() {
        return Err(HalXadcError::MissingConfig("channels".into()));
    }
    Sampler::new(config, resolved, make(config))
}
