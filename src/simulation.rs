//! SEIRD stepper with healthcare-modulated rates and land-border seeding.

use std::collections::{BTreeMap, HashMap};

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::region::Region;
use crate::registry::{LandGraph, RegionRegistry};

pub const DEFAULT_TICKS_PER_DAY: u32 = 20;

/// Rates below this are treated as already divided per tick by [`TickScale::infer`].
const PER_TICK_RATE_THRESHOLD: f64 = 0.5;
/// Strongest healthcare cuts infectivity and lethality by this fraction.
const HEALTHCARE_DAMPING: f64 = 0.25;
const EXPORT_MIN_ACTIVE: f64 = 2_000.0;
const EXPORT_MID_ACTIVE: f64 = 20_000.0;
const EXPORT_HIGH_ACTIVE: f64 = 100_000.0;
const EXPORT_CHANCE_CAP: f64 = 0.18;
const EXPORT_SEED_MIN: f64 = 1.0;
const EXPORT_SEED_MAX: f64 = 250.0;

/// How many stepper calls make up one simulated day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TickScale {
    PerDay,
    SubDay { ticks_per_day: u32 },
}

impl TickScale {
    pub fn from_ticks_per_day(ticks_per_day: u32) -> Self {
        if ticks_per_day <= 1 {
            TickScale::PerDay
        } else {
            TickScale::SubDay { ticks_per_day }
        }
    }

    /// Legacy helper for callers that only have rate magnitudes and no declared
    /// scale. Nothing in this crate relies on it; scenarios always declare
    /// `ticks_per_day`.
    ///
    /// Both infectivity and severity below 0.5 means rates were pre-divided per
    /// tick. Lethality is a fraction of resolving cases and takes no part.
    pub fn infer(infectivity_rate: f64, severity_rate: f64) -> Self {
        if infectivity_rate < PER_TICK_RATE_THRESHOLD && severity_rate < PER_TICK_RATE_THRESHOLD {
            TickScale::SubDay {
                ticks_per_day: DEFAULT_TICKS_PER_DAY,
            }
        } else {
            TickScale::PerDay
        }
    }

    pub fn ticks_per_day(self) -> u32 {
        match self {
            TickScale::PerDay => 1,
            TickScale::SubDay { ticks_per_day } => ticks_per_day.max(1),
        }
    }

    pub fn day_fraction(self) -> f64 {
        1.0 / self.ticks_per_day() as f64
    }
}

impl Default for TickScale {
    fn default() -> Self {
        TickScale::SubDay {
            ticks_per_day: DEFAULT_TICKS_PER_DAY,
        }
    }
}

/// Disease parameters for one stepper call, at the caller's tick scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiseaseRates {
    pub infectivity_rate: f64,
    pub severity_rate: f64,
    /// Fraction of resolving cases that die.
    pub lethality_rate: f64,
    pub incubation_days: f64,
}

impl DiseaseRates {
    /// Divides the daily infectivity and severity across `ticks_per_day` calls.
    pub fn per_tick(self, ticks_per_day: u32) -> Self {
        let ticks = ticks_per_day.max(1) as f64;
        Self {
            infectivity_rate: self.infectivity_rate / ticks,
            severity_rate: self.severity_rate / ticks,
            ..self
        }
    }
}

fn default_immunity_decay_rate() -> f64 {
    0.01
}

fn default_min_pressure() -> f64 {
    0.03
}

fn default_export_base_chance() -> f64 {
    0.04
}

fn default_export_cooldown_days() -> u64 {
    8
}

fn default_export_seed_base() -> f64 {
    25.0
}

/// Balancing knobs that rarely change within a game.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpreadTuning {
    #[serde(default = "default_immunity_decay_rate")]
    pub immunity_decay_rate: f64,
    #[serde(default = "default_min_pressure")]
    pub min_pressure: f64,
    /// Scales the caseload bands: 0.25x below 20k active, 0.75x below 100k, 1.5x above.
    #[serde(default = "default_export_base_chance")]
    pub export_base_chance: f64,
    #[serde(default = "default_export_cooldown_days")]
    pub export_cooldown_days: u64,
    #[serde(default = "default_export_seed_base")]
    pub export_seed_base: f64,
}

impl Default for SpreadTuning {
    fn default() -> Self {
        Self {
            immunity_decay_rate: default_immunity_decay_rate(),
            min_pressure: default_min_pressure(),
            export_base_chance: default_export_base_chance(),
            export_cooldown_days: default_export_cooldown_days(),
            export_seed_base: default_export_seed_base(),
        }
    }
}

impl SpreadTuning {
    fn band_chance(&self, active: f64) -> f64 {
        if active >= EXPORT_HIGH_ACTIVE {
            self.export_base_chance * 1.5
        } else if active >= EXPORT_MID_ACTIVE {
            self.export_base_chance * 0.75
        } else {
            self.export_base_chance * 0.25
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandExport {
    pub source: String,
    pub destination: String,
    pub day: u64,
    pub seeded: f64,
}

/// What a single stepper call changed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepReport {
    pub day: u64,
    pub tick: u64,
    pub day_boundary: bool,
    pub new_exposed: f64,
    pub new_infected: f64,
    pub new_recovered: f64,
    pub new_dead: f64,
    pub exports: Vec<LandExport>,
}

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("unknown region '{0}'")]
    UnknownRegion(String),
}

#[derive(Debug, Default)]
struct Flows {
    new_exposed: f64,
    new_infected: f64,
    recovered: f64,
    dead: f64,
}

pub struct Simulation {
    regions: BTreeMap<String, Region>,
    land: LandGraph,
    scale: TickScale,
    day: u64,
    tick: u64,
    last_export_day: HashMap<String, u64>,
}

impl Simulation {
    pub fn new(registry: &RegionRegistry, scale: TickScale) -> Self {
        Self::from_regions(registry.build_regions(), registry.land().clone(), scale)
    }

    pub fn from_regions(
        regions: impl IntoIterator<Item = Region>,
        land: LandGraph,
        scale: TickScale,
    ) -> Self {
        Self {
            regions: regions
                .into_iter()
                .map(|region| (region.name().to_string(), region))
                .collect(),
            land,
            scale,
            day: 0,
            tick: 0,
            last_export_day: HashMap::new(),
        }
    }

    pub fn region(&self, name: &str) -> Option<&Region> {
        self.regions.get(name)
    }

    /// Regions in name order.
    pub fn regions(&self) -> impl Iterator<Item = &Region> {
        self.regions.values()
    }

    pub fn land(&self) -> &LandGraph {
        &self.land
    }

    pub fn scale(&self) -> TickScale {
        self.scale
    }

    /// Completed simulated days.
    pub fn day(&self) -> u64 {
        self.day
    }

    /// Stepper calls so far.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn last_export_day(&self, region: &str) -> Option<u64> {
        self.last_export_day.get(region).copied()
    }

    pub fn disease_exists(&self) -> bool {
        self.regions.values().any(|region| region.active_cases() > 0.0)
    }

    /// Starts the outbreak: moves up to `count` susceptible people in `region` to infected.
    pub fn seed_outbreak(&mut self, region: &str, count: u64) -> Result<f64, SimulationError> {
        let target = self
            .regions
            .get_mut(region)
            .ok_or_else(|| SimulationError::UnknownRegion(region.to_string()))?;
        let seeded = target.seed_infection(count);
        target.refresh_colour();
        Ok(seeded)
    }

    /// Advances every region by one call at the simulation's tick scale.
    ///
    /// `rates` must already be expressed per call; land exports only run when
    /// the call completes a simulated day.
    pub fn advance_one_day<R: Rng + ?Sized>(
        &mut self,
        rates: &DiseaseRates,
        tuning: &SpreadTuning,
        rng: &mut R,
    ) -> StepReport {
        let ticks_per_day = self.scale.ticks_per_day();
        let disease_exists = self.disease_exists();

        let mut report = StepReport::default();
        for region in self.regions.values_mut() {
            if let Some(flows) = transition(region, rates, tuning, self.scale, disease_exists) {
                report.new_exposed += flows.new_exposed;
                report.new_infected += flows.new_infected;
                report.new_recovered += flows.recovered;
                report.new_dead += flows.dead;
            }
        }

        self.tick += 1;
        if self.tick % ticks_per_day as u64 == 0 {
            self.day += 1;
            report.day_boundary = true;
            report.exports = self.spread_over_land(rates, tuning, rng);
        }

        for region in self.regions.values_mut() {
            region.refresh_colour();
        }

        report.day = self.day;
        report.tick = self.tick;
        report
    }

    fn spread_over_land<R: Rng + ?Sized>(
        &mut self,
        rates: &DiseaseRates,
        tuning: &SpreadTuning,
        rng: &mut R,
    ) -> Vec<LandExport> {
        let daily_infectivity = rates.infectivity_rate * self.scale.ticks_per_day() as f64;
        let sources: Vec<String> = self.regions.keys().cloned().collect();
        let mut exports = Vec::new();

        for source in sources {
            let active = match self.regions.get(&source) {
                Some(region) => region.active_cases(),
                None => continue,
            };
            let neighbours = self.land.neighbours(&source);
            if active <= 0.0 || neighbours.is_empty() {
                continue;
            }
            if let Some(last) = self.last_export_day.get(&source) {
                if self.day.saturating_sub(*last) < tuning.export_cooldown_days {
                    continue;
                }
            }
            if active < EXPORT_MIN_ACTIVE {
                continue;
            }

            let chance = (tuning.band_chance(active) * daily_infectivity).min(EXPORT_CHANCE_CAP);
            if rng.gen::<f64>() >= chance {
                continue;
            }

            let destination = neighbours[rng.gen_range(0..neighbours.len())].clone();
            let Some(target) = self.regions.get_mut(&destination) else {
                continue;
            };
            if target.susceptible() <= 0.0 {
                continue;
            }

            let seed = (tuning.export_seed_base * daily_infectivity)
                .clamp(EXPORT_SEED_MIN, EXPORT_SEED_MAX);
            let seeded = target.import_exposed(seed);
            tracing::debug!(
                source = %source,
                destination = %destination,
                day = self.day,
                seeded,
                "land export"
            );
            self.last_export_day.insert(source.clone(), self.day);
            exports.push(LandExport {
                source,
                destination,
                day: self.day,
                seeded,
            });
        }
        exports
    }
}

fn transition(
    region: &mut Region,
    rates: &DiseaseRates,
    tuning: &SpreadTuning,
    scale: TickScale,
    disease_exists: bool,
) -> Option<Flows> {
    if region.population() == 0 {
        return None;
    }
    let population = region.population() as f64;
    let ticks_per_day = scale.ticks_per_day() as f64;
    let incubation_days = if rates.incubation_days > 0.0 {
        rates.incubation_days
    } else {
        1.0
    };

    let healthcare_factor = 1.0 - HEALTHCARE_DAMPING * region.healthcare_score();
    let infectivity = rates.infectivity_rate * healthcare_factor;
    let lethality = rates.lethality_rate * healthcare_factor;

    let mut pressure = region.infected / population;
    let has_local_cases = region.infected > 0.0 || region.exposed > 0.0;
    if disease_exists && has_local_cases && pressure < tuning.min_pressure {
        pressure = tuning.min_pressure;
    }

    let new_exposed = clamp_flow(region.susceptible * infectivity * pressure, region.susceptible);
    let new_infected = clamp_flow(region.exposed / (incubation_days * ticks_per_day), region.exposed);
    let resolving = clamp_flow(region.infected * rates.severity_rate, region.infected);
    let dead = clamp_flow(resolving * lethality, resolving);
    let recovered = resolving - dead;
    let lost_immunity = clamp_flow(
        region.recovered * tuning.immunity_decay_rate * scale.day_fraction(),
        region.recovered,
    );

    region.susceptible = (region.susceptible + lost_immunity - new_exposed).max(0.0);
    region.exposed = (region.exposed + new_exposed - new_infected).max(0.0);
    region.infected = (region.infected + new_infected - resolving).max(0.0);
    region.recovered = (region.recovered + recovered - lost_immunity).max(0.0);
    region.dead += dead;

    Some(Flows {
        new_exposed,
        new_infected,
        recovered,
        dead,
    })
}

fn clamp_flow(value: f64, available: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, available.max(0.0))
}

#[cfg(test)]
mod tests {
    use rand::rngs::mock::StepRng;

    use super::*;

    fn lone_region(region: Region, scale: TickScale) -> Simulation {
        Simulation::from_regions([region], LandGraph::default(), scale)
    }

    fn rates(infectivity: f64, severity: f64, lethality: f64, incubation: f64) -> DiseaseRates {
        DiseaseRates {
            infectivity_rate: infectivity,
            severity_rate: severity,
            lethality_rate: lethality,
            incubation_days: incubation,
        }
    }

    #[test]
    fn single_day_flows_follow_the_model() {
        let mut region = Region::new("testland", 1_000_000, 0.0, true);
        region.seed_infection(100_000);
        region.exposed = 30_000.0;
        region.susceptible -= 30_000.0;
        region.recovered = 10_000.0;
        region.susceptible -= 10_000.0;
        let mut sim = lone_region(region, TickScale::PerDay);

        let report = sim.advance_one_day(
            &rates(0.5, 0.1, 0.2, 3.0),
            &SpreadTuning::default(),
            &mut StepRng::new(0, 0),
        );

        // pressure 0.1; S 860k
        assert!((report.new_exposed - 860_000.0 * 0.5 * 0.1).abs() < 1e-6);
        assert!((report.new_infected - 10_000.0).abs() < 1e-6);
        assert!((report.new_dead - 10_000.0 * 0.2).abs() < 1e-6);
        assert!((report.new_recovered - 8_000.0).abs() < 1e-6);

        let region = sim.region("testland").unwrap();
        assert!((region.susceptible() - (860_000.0 + 100.0 - 43_000.0)).abs() < 1e-6);
        assert!((region.recovered() - (10_000.0 + 8_000.0 - 100.0)).abs() < 1e-6);
        assert!((region.total() - 1_000_000.0).abs() < 1e-6);
        assert!(report.day_boundary);
        assert_eq!(sim.day(), 1);
    }

    #[test]
    fn healthcare_damps_infectivity_and_lethality() {
        let mut strong = Region::new("strong", 1_000_000, 1.0, true);
        strong.seed_infection(100_000);
        let mut weak = Region::new("weak", 1_000_000, 0.0, true);
        weak.seed_infection(100_000);
        let mut sim = Simulation::from_regions([strong, weak], LandGraph::default(), TickScale::PerDay);

        sim.advance_one_day(
            &rates(0.4, 0.5, 0.4, 3.0),
            &SpreadTuning::default(),
            &mut StepRng::new(0, 0),
        );
        let strong = sim.region("strong").unwrap();
        let weak = sim.region("weak").unwrap();
        assert!((strong.dead() - 50_000.0 * 0.4 * 0.75).abs() < 1e-6);
        assert!((weak.dead() - 50_000.0 * 0.4).abs() < 1e-6);
        assert!(strong.exposed() < weak.exposed());
    }

    #[test]
    fn sub_day_scale_crosses_day_boundary_every_twenty_calls() {
        let mut region = Region::new("testland", 10_000, 0.3, true);
        region.seed_infection(10);
        let mut sim = lone_region(region, TickScale::default());
        let daily = rates(1.4, 0.12, 0.08, 3.0);
        let per_tick = daily.per_tick(DEFAULT_TICKS_PER_DAY);
        let mut rng = StepRng::new(0, 0);

        for call in 1..=19 {
            let report = sim.advance_one_day(&per_tick, &SpreadTuning::default(), &mut rng);
            assert!(!report.day_boundary, "call {call} should stay inside day one");
        }
        let report = sim.advance_one_day(&per_tick, &SpreadTuning::default(), &mut rng);
        assert!(report.day_boundary);
        assert_eq!(sim.day(), 1);
        assert_eq!(sim.tick(), 20);
    }

    #[test]
    fn immunity_decay_is_scaled_by_day_fraction() {
        let mut region = Region::new("testland", 1_000, 0.0, true);
        region.recovered = 1_000.0;
        region.susceptible = 0.0;
        let mut sim = lone_region(region, TickScale::SubDay { ticks_per_day: 10 });
        sim.advance_one_day(
            &rates(0.1, 0.1, 0.1, 3.0),
            &SpreadTuning::default(),
            &mut StepRng::new(0, 0),
        );
        let region = sim.region("testland").unwrap();
        assert!((region.susceptible() - 1.0).abs() < 1e-9);
        assert!((region.recovered() - 999.0).abs() < 1e-9);
    }

    #[test]
    fn non_positive_incubation_is_treated_as_one_day() {
        let mut region = Region::new("testland", 1_000, 0.0, true);
        region.exposed = 100.0;
        region.susceptible = 900.0;
        let mut sim = lone_region(region, TickScale::PerDay);
        let report = sim.advance_one_day(
            &rates(0.0, 0.0, 0.0, 0.0),
            &SpreadTuning::default(),
            &mut StepRng::new(0, 0),
        );
        assert!((report.new_infected - 100.0).abs() < 1e-9);
    }

    #[test]
    fn empty_regions_are_skipped() {
        let mut sim = lone_region(Region::new("void", 0, 0.0, true), TickScale::PerDay);
        let report = sim.advance_one_day(
            &rates(2.0, 0.5, 0.5, 3.0),
            &SpreadTuning::default(),
            &mut StepRng::new(0, 0),
        );
        assert_eq!(report.new_exposed, 0.0);
        assert_eq!(sim.region("void").unwrap().total(), 0.0);
    }

    #[test]
    fn colours_refresh_after_each_call() {
        let mut region = Region::new("testland", 1_000, 0.0, true);
        region.seed_infection(500);
        let mut sim = lone_region(region, TickScale::PerDay);
        sim.advance_one_day(
            &rates(0.1, 0.1, 0.1, 3.0),
            &SpreadTuning::default(),
            &mut StepRng::new(0, 0),
        );
        let region = sim.region("testland").unwrap();
        assert_eq!(
            region.colour(),
            crate::colour::severity_colour(region.visual_severity_ratio())
        );
    }

    #[test]
    fn seeding_unknown_region_fails() {
        let mut sim = lone_region(Region::new("testland", 1_000, 0.0, true), TickScale::PerDay);
        assert!(matches!(
            sim.seed_outbreak("atlantis", 10),
            Err(SimulationError::UnknownRegion(_))
        ));
        assert_eq!(sim.seed_outbreak("testland", 10).unwrap(), 10.0);
        assert!(sim.disease_exists());
    }

    #[test]
    fn infer_uses_infectivity_and_severity_only() {
        assert_eq!(
            TickScale::infer(0.07, 0.006),
            TickScale::SubDay { ticks_per_day: 20 }
        );
        assert_eq!(TickScale::infer(1.4, 0.12), TickScale::PerDay);
        assert_eq!(TickScale::infer(0.2, 0.6), TickScale::PerDay);
        assert_eq!(TickScale::from_ticks_per_day(1), TickScale::PerDay);
        assert_eq!(TickScale::SubDay { ticks_per_day: 0 }.ticks_per_day(), 1);
    }

    #[test]
    fn band_chances_match_caseload_bands() {
        let tuning = SpreadTuning::default();
        assert!((tuning.band_chance(2_000.0) - 0.01).abs() < 1e-12);
        assert!((tuning.band_chance(19_999.0) - 0.01).abs() < 1e-12);
        assert!((tuning.band_chance(20_000.0) - 0.03).abs() < 1e-12);
        assert!((tuning.band_chance(100_000.0) - 0.06).abs() < 1e-12);
    }
}
