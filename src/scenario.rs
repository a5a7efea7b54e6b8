use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::registry::{RegionConfig, RegionRegistry};
use crate::simulation::{SpreadTuning, TickScale, DEFAULT_TICKS_PER_DAY};

fn default_ticks_per_day() -> u32 {
    DEFAULT_TICKS_PER_DAY
}

fn default_snapshot_interval_days() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub description: Option<String>,
    pub seed: u64,
    /// Stepper calls per simulated day; 1 steps whole days.
    #[serde(default = "default_ticks_per_day")]
    pub ticks_per_day: u32,
    #[serde(default)]
    pub days: Option<u64>,
    #[serde(default = "default_snapshot_interval_days")]
    pub snapshot_interval_days: u64,
    #[serde(default)]
    pub origin: Option<String>,
    #[serde(default)]
    pub spread: SpreadTuning,
    #[serde(default)]
    pub logging: LoggingConfig,
    pub regions: BTreeMap<String, RegionConfig>,
    #[serde(default)]
    pub land_connections: BTreeMap<String, Vec<String>>,
}

pub struct ScenarioLoader {
    base_dir: PathBuf,
}

impl ScenarioLoader {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    pub fn load(&self, file: impl AsRef<Path>) -> Result<Scenario> {
        let path = self.base_dir.join(file);
        let data = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read scenario file {}", path.display()))?;
        let scenario: Scenario = serde_yaml::from_str(&data)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(scenario)
    }
}

impl Scenario {
    /// Validates the region and adjacency tables into a registry.
    pub fn build_registry(&self) -> Result<RegionRegistry> {
        RegionRegistry::new(self.regions.clone(), self.land_connections.clone())
            .with_context(|| format!("Scenario '{}' has an invalid region table", self.name))
    }

    pub fn tick_scale(&self) -> TickScale {
        TickScale::from_ticks_per_day(self.ticks_per_day)
    }

    pub fn days(&self, override_days: Option<u64>) -> u64 {
        override_days.or(self.days).unwrap_or(365)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
name: duo
seed: 3
regions:
  east: { population: 1000, healthcare_score: 0.4 }
  west: { population: 2000, healthcare_score: 0.9, airports_open: false }
land_connections:
  east: [west]
  west: [east]
"#;

    #[test]
    fn defaults_fill_optional_fields() {
        let scenario: Scenario = serde_yaml::from_str(MINIMAL).unwrap();
        assert_eq!(scenario.ticks_per_day, 20);
        assert_eq!(scenario.snapshot_interval_days, 30);
        assert_eq!(scenario.logging.level, "info");
        assert_eq!(scenario.spread, SpreadTuning::default());
        assert_eq!(scenario.days(None), 365);
        assert_eq!(scenario.days(Some(12)), 12);
        assert!(scenario.regions["east"].airports_open);
        assert!(!scenario.regions["west"].airports_open);
        assert_eq!(scenario.build_registry().unwrap().len(), 2);
    }

    #[test]
    fn partial_spread_tuning_keeps_other_defaults() {
        let text = format!("{MINIMAL}spread:\n  export_cooldown_days: 3\nticks_per_day: 1\n");
        let scenario: Scenario = serde_yaml::from_str(&text).unwrap();
        assert_eq!(scenario.spread.export_cooldown_days, 3);
        assert_eq!(scenario.spread.min_pressure, 0.03);
        assert_eq!(scenario.tick_scale(), TickScale::PerDay);
    }

    #[test]
    fn asymmetric_tables_fail_to_build() {
        let text = MINIMAL.replace("west: [east]", "west: []");
        let scenario: Scenario = serde_yaml::from_str(&text).unwrap();
        assert!(scenario.build_registry().is_err());
    }
}
