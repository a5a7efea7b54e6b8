use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::colour::Rgba;
use crate::region::Region;
use crate::simulation::Simulation;

/// Numbers shown in the HUD, for the whole world or one selected region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HudStats {
    pub label: String,
    pub infected: u64,
    pub dead: u64,
    pub living: u64,
    pub population: u64,
}

impl HudStats {
    pub fn global<'a>(regions: impl IntoIterator<Item = &'a Region>) -> Self {
        let (mut infected, mut dead, mut living, mut population) = (0.0, 0.0, 0.0, 0);
        for region in regions {
            infected += region.infected();
            dead += region.dead();
            living += region.living();
            population += region.population();
        }
        Self {
            label: "Global".to_string(),
            infected: infected as u64,
            dead: dead as u64,
            living: living as u64,
            population,
        }
    }

    pub fn for_region(region: &Region) -> Self {
        Self {
            label: display_name(region.name()),
            infected: region.infected() as u64,
            dead: region.dead() as u64,
            living: region.living() as u64,
            population: region.population(),
        }
    }
}

/// `south_east_asia` -> `South East Asia`.
pub fn display_name(key: &str) -> String {
    key.split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionSnapshot {
    pub name: String,
    pub population: u64,
    pub healthcare_score: f64,
    pub susceptible: f64,
    pub exposed: f64,
    pub infected: f64,
    pub recovered: f64,
    pub dead: f64,
    pub severity: f64,
    pub colour: Rgba,
}

impl From<&Region> for RegionSnapshot {
    fn from(region: &Region) -> Self {
        Self {
            name: region.name().to_string(),
            population: region.population(),
            healthcare_score: region.healthcare_score(),
            susceptible: region.susceptible(),
            exposed: region.exposed(),
            infected: region.infected(),
            recovered: region.recovered(),
            dead: region.dead(),
            severity: region.visual_severity_ratio(),
            colour: region.colour(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub scenario: String,
    pub disease: String,
    pub day: u64,
    pub tick: u64,
    pub totals: HudStats,
    pub wiped_out: Vec<String>,
    pub regions: Vec<RegionSnapshot>,
}

impl WorldSnapshot {
    pub fn capture(
        scenario: &str,
        disease: &str,
        simulation: &Simulation,
        wiped_out: &[String],
    ) -> Self {
        Self {
            scenario: scenario.to_string(),
            disease: disease.to_string(),
            day: simulation.day(),
            tick: simulation.tick(),
            totals: HudStats::global(simulation.regions()),
            wiped_out: wiped_out.to_vec(),
            regions: simulation.regions().map(RegionSnapshot::from).collect(),
        }
    }

    pub fn region(&self, name: &str) -> Option<&RegionSnapshot> {
        self.regions.iter().find(|region| region.name == name)
    }
}

/// Writes a JSON frame every `interval_days` simulated days; 0 disables output.
pub struct SnapshotWriter {
    dir: PathBuf,
    interval_days: u64,
}

impl SnapshotWriter {
    pub fn new(dir: impl AsRef<Path>, interval_days: u64) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            interval_days,
        }
    }

    pub fn maybe_write(&self, snapshot: &WorldSnapshot) -> Result<Option<PathBuf>> {
        if self.interval_days == 0 || snapshot.day == 0 || snapshot.day % self.interval_days != 0 {
            return Ok(None);
        }
        let dir = self.dir.join(&snapshot.scenario);
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create snapshot dir {}", dir.display()))?;
        let path = dir.join(format!("day_{:06}.json", snapshot.day));
        let json = serde_json::to_string_pretty(snapshot)?;
        fs::write(&path, json)
            .with_context(|| format!("Failed to write snapshot {}", path.display()))?;
        tracing::debug!(path = %path.display(), day = snapshot.day, "snapshot written");
        Ok(Some(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_are_title_cased() {
        assert_eq!(display_name("greenland_and_iceland"), "Greenland And Iceland");
        assert_eq!(display_name("uk"), "Uk");
    }

    #[test]
    fn hud_totals_sum_regions() {
        let mut a = Region::new("a", 1_000, 0.0, true);
        a.seed_infection(10);
        let b = Region::new("b", 500, 0.0, true);
        let stats = HudStats::global([&a, &b]);
        assert_eq!(stats.label, "Global");
        assert_eq!(stats.infected, 10);
        assert_eq!(stats.living, 1_500);
        assert_eq!(stats.population, 1_500);
        assert_eq!(HudStats::for_region(&a).label, "A");
    }
}
