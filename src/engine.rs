use std::path::PathBuf;

use anyhow::Result;
use thiserror::Error;

use crate::{
    disease::DiseaseProfile,
    rng::RngManager,
    simulation::{Simulation, SpreadTuning, StepReport},
    snapshot::{HudStats, SnapshotWriter, WorldSnapshot},
};

const LAND_SPREAD_STREAM: &str = "land_spread";

pub struct EngineSettings {
    pub scenario_name: String,
    pub seed: u64,
    pub tuning: SpreadTuning,
    pub snapshot_interval_days: u64,
    pub snapshot_dir: PathBuf,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no outbreak origin chosen yet")]
    NotStarted,
    #[error("outbreak already started in '{0}'")]
    AlreadyStarted(String),
}

/// Drives a [`Simulation`] for one disease at the simulation's tick scale.
pub struct Engine {
    simulation: Simulation,
    disease: DiseaseProfile,
    rng: RngManager,
    snapshot_writer: SnapshotWriter,
    settings: EngineSettings,
    origin: Option<String>,
    wiped_out: Vec<String>,
}

impl Engine {
    pub fn new(settings: EngineSettings, simulation: Simulation, disease: DiseaseProfile) -> Self {
        Self {
            rng: RngManager::new(settings.seed),
            snapshot_writer: SnapshotWriter::new(
                &settings.snapshot_dir,
                settings.snapshot_interval_days,
            ),
            simulation,
            disease,
            settings,
            origin: None,
            wiped_out: Vec::new(),
        }
    }

    pub fn simulation(&self) -> &Simulation {
        &self.simulation
    }

    pub fn disease(&self) -> &DiseaseProfile {
        &self.disease
    }

    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    /// Regions that have lost their whole living population, in the order it happened.
    pub fn wiped_out(&self) -> &[String] {
        &self.wiped_out
    }

    pub fn day(&self) -> u64 {
        self.simulation.day()
    }

    /// Seeds the disease's initial infections in `origin`. Only allowed once per game.
    pub fn start_outbreak(&mut self, origin: &str) -> Result<f64> {
        if let Some(existing) = &self.origin {
            return Err(EngineError::AlreadyStarted(existing.clone()).into());
        }
        let seeded = self
            .simulation
            .seed_outbreak(origin, self.disease.initial_infected)?;
        self.origin = Some(origin.to_string());
        tracing::info!(
            disease = %self.disease.name,
            origin,
            seeded,
            "outbreak started"
        );
        Ok(seeded)
    }

    /// Runs one stepper call with the disease rates divided to the tick scale.
    pub fn step(&mut self) -> Result<StepReport> {
        if self.origin.is_none() {
            return Err(EngineError::NotStarted.into());
        }
        let ticks_per_day = self.simulation.scale().ticks_per_day();
        let rates = self.disease.rates().per_tick(ticks_per_day);
        let rng = self.rng.stream(LAND_SPREAD_STREAM);
        let report = self
            .simulation
            .advance_one_day(&rates, &self.settings.tuning, rng);

        if report.day_boundary {
            self.record_wiped_out();
            self.log_progress(&report);
            self.snapshot_writer.maybe_write(&self.snapshot())?;
        }
        Ok(report)
    }

    pub fn run_days(&mut self, days: u64) -> Result<()> {
        self.run_with_hook(days, |_| {})
    }

    /// Steps until `days` more simulated days have passed, handing a snapshot
    /// to `hook` at every day boundary.
    pub fn run_with_hook<F>(&mut self, days: u64, mut hook: F) -> Result<()>
    where
        F: FnMut(WorldSnapshot),
    {
        let target = self.simulation.day() + days;
        while self.simulation.day() < target {
            if self.step()?.day_boundary {
                hook(self.snapshot());
            }
        }
        Ok(())
    }

    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot::capture(
            &self.settings.scenario_name,
            &self.disease.name,
            &self.simulation,
            &self.wiped_out,
        )
    }

    pub fn totals(&self) -> HudStats {
        HudStats::global(self.simulation.regions())
    }

    fn record_wiped_out(&mut self) {
        for region in self.simulation.regions() {
            if region.population() > 0
                && region.living() < 1.0
                && !self.wiped_out.iter().any(|name| name == region.name())
            {
                tracing::warn!(region = region.name(), day = self.simulation.day(), "region wiped out");
                self.wiped_out.push(region.name().to_string());
            }
        }
    }

    fn log_progress(&self, report: &StepReport) {
        let interval = self.disease.log_interval_days;
        if interval == 0 || report.day % interval != 0 {
            return;
        }
        let totals = self.totals();
        tracing::info!(
            day = report.day,
            infected = totals.infected,
            dead = totals.dead,
            living = totals.living,
            exports = report.exports.len(),
            "day summary"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        disease::Difficulty,
        region::Region,
        registry::LandGraph,
        simulation::TickScale,
    };

    fn engine(scale: TickScale) -> Engine {
        let simulation = Simulation::from_regions(
            [Region::new("testland", 1_000_000, 0.0, true)],
            LandGraph::default(),
            scale,
        );
        let settings = EngineSettings {
            scenario_name: "unit".into(),
            seed: 1,
            tuning: SpreadTuning::default(),
            snapshot_interval_days: 0,
            snapshot_dir: PathBuf::from("unused"),
        };
        Engine::new(
            settings,
            simulation,
            DiseaseProfile::from_preset("Test Pox", Difficulty::Medium),
        )
    }

    #[test]
    fn stepping_requires_an_origin() {
        let mut engine = engine(TickScale::PerDay);
        assert!(engine.step().is_err());
        assert_eq!(engine.start_outbreak("testland").unwrap(), 300.0);
        assert!(engine.start_outbreak("testland").is_err());
        assert!(engine.step().is_ok());
    }

    #[test]
    fn run_days_counts_simulated_days_not_calls() {
        let mut engine = engine(TickScale::SubDay { ticks_per_day: 20 });
        engine.start_outbreak("testland").unwrap();
        let mut days = Vec::new();
        engine
            .run_with_hook(3, |snapshot| days.push(snapshot.day))
            .unwrap();
        assert_eq!(days, [1, 2, 3]);
        assert_eq!(engine.simulation().tick(), 60);
    }
}
