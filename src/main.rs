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

use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};

use hal_xadc::adc;
use hal_xadc::config::{Cli, SamplerConfig};
use hal_xadc::hal::{HalComponent, MemoryComponent, StatusFileComponent};
use hal_xadc::logger::{self, LogSink};
use hal_xadc::sampler::{resolve_channels, Sampler};
use hal_xadc::HalXadcError;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Set by the signal handler; the sampler finishes its tick and returns
static SHUTDOWN: AtomicBool = AtomicBool::new(false);

/// Report a startup error on stderr and exit 1.
///
/// Any component has already been released by `Sampler::new`.
fn startup_failure(err: &HalXadcError) -> ! {
    eprintln!("hal_xadc: {}", err);
    if let HalXadcError::ChannelNotFound { dir, .. } = err {
        let available = adc::list_raw_inputs(dir);
        if available.is_empty() {
            eprintln!("hal_xadc: no raw inputs found in {}", dir.display());
        } else {
            eprintln!("hal_xadc: available raw inputs: {}", available.join(", "));
        }
    }
    std::process::exit(1);
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let sink = logger::init_logging(cli.verbose);
    info!("hal_xadc {} starting", VERSION);
    info!("logging to {}", match sink { LogSink::Journald => "systemd journal", LogSink::Stderr => "stderr" });

    let config = match SamplerConfig::from_cli(&cli) {
        Ok(c) => c,
        Err(e) => startup_failure(&e),
    };

    // Every channel must resolve before the component exists
    let resolved = match resolve_channels(&config) {
        Ok(r) => r,
        Err(e) => startup_failure(&e),
    };

    if let Err(e) = ctrlc::set_handler(|| {
        SHUTDOWN.store(true, Ordering::SeqCst);
    }) {
        warn!("Failed to set signal handler: {}. Shutdown via signals may not work cleanly.", e);
    }

    let component: Box<dyn HalComponent> = match &config.status_file {
        Some(path) => {
            info!("mirroring pins to {}", path.display());
            Box::new(StatusFileComponent::new(&config.name, path))
        }
        None => Box::new(MemoryComponent::new(&config.name)),
    };

    let mut sampler = match Sampler::new(&config, resolved, component) {
        Ok(s) => s,
        Err(e) => startup_failure(&e),
    };

    let result = sampler.run(&SHUTDOWN);
    let exited = sampler.shutdown();
    info!("exiting HAL component {}", config.name);
    println!("exiting HAL component {}", config.name);

    result.with_context(|| format!("HAL component {} failed", config.name))?;
    exited.context("failed to release HAL component")?;
    Ok(())
}
