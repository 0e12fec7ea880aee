/*
 * Test utilities for hal-xadc
 *
 * Fake IIO device directories and ready-made sampler configurations shared by
 * the unit tests.
 */

use std::fs;
use std::path::Path;
use std::time::Duration;

use tempfile::TempDir;

use crate::config::{ChannelSpec, SamplerConfig};
use crate::divider::Baseboard;

/// Temporary directory laid out like `/sys/bus/iio/devices/iio:deviceN/`.
pub struct FakeIio {
    dir: TempDir,
}

impl FakeIio {
    pub fn new(files: &[(&str, &str)]) -> Self {
        let dir = TempDir::new().unwrap();
        for (name, content) in files {
            fs::write(dir.path().join(name), format!("{}\n", content)).unwrap();
        }
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Replace the content of a raw-value file.
    pub fn write(&self, name: &str, content: &str) {
        fs::write(self.dir.path().join(name), format!("{}\n", content)).unwrap();
    }
}

/// Config reading from the fake directory with a 1 ms interval.
pub fn fake_config(iio: &FakeIio, name: &str, channels: Vec<ChannelSpec>) -> SamplerConfig {
    SamplerConfig {
        name: name.to_string(),
        interval: Duration::from_millis(1),
        channels,
        filter_size: 10,
        baseboard: Baseboard::Replicookie,
        r_pu: 2000.0,
        device_dir: iio.path().to_path_buf(),
        thermistor_dir: iio.path().to_path_buf(),
        status_file: None,
    }
}
