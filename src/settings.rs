// Runtime settings: defaults, optional TOML file, CHARTDECK_* environment

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Quiet period before an edited filter value is applied
    pub debounce_ms: u64,
    /// Busy interval between a generate request and the chart being ready
    pub generate_delay_ms: u64,
    pub dashboard_capacity: usize,
    /// Rows sampled when checking that the y-axis column is numeric
    pub validation_sample_rows: usize,
    pub dashboard_path: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            debounce_ms: 500,
            generate_delay_ms: 400,
            dashboard_capacity: crate::dashboard::DEFAULT_CAPACITY,
            validation_sample_rows: 20,
            dashboard_path: PathBuf::from("dashboard.json"),
        }
    }
}

impl Settings {
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let defaults = Settings::default();
        let mut builder = Config::builder()
            .set_default("debounce_ms", defaults.debounce_ms as i64)?
            .set_default("generate_delay_ms", defaults.generate_delay_ms as i64)?
            .set_default("dashboard_capacity", defaults.dashboard_capacity as i64)?
            .set_default("validation_sample_rows", defaults.validation_sample_rows as i64)?
            .set_default("dashboard_path", defaults.dashboard_path.display().to_string())?;

        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }

        builder
            .add_source(Environment::with_prefix("CHARTDECK"))
            .build()?
            .try_deserialize()
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn generate_delay(&self) -> Duration {
        Duration::from_millis(self.generate_delay_ms)
    }
}
