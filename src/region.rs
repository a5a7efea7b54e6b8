use serde::{Deserialize, Serialize};

use crate::colour::{severity_colour, Rgba};

/// Dead fraction at which a region starts reading as wiped out on the map.
const DEAD_BLEND_START: f64 = 0.96;

/// One map area with its SEIRD compartments.
///
/// Compartments are fractional people; `susceptible + exposed + infected +
/// recovered + dead` stays equal to `population` up to float drift.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Region {
    name: String,
    population: u64,
    healthcare_score: f64,
    airports_open: bool,
    pub(crate) susceptible: f64,
    pub(crate) exposed: f64,
    pub(crate) infected: f64,
    pub(crate) recovered: f64,
    pub(crate) dead: f64,
    pub(crate) colour: Rgba,
}

impl Region {
    pub fn new(
        name: impl Into<String>,
        population: u64,
        healthcare_score: f64,
        airports_open: bool,
    ) -> Self {
        let healthcare_score = if healthcare_score.is_nan() {
            0.0
        } else {
            healthcare_score.clamp(0.0, 1.0)
        };
        Self {
            name: name.into(),
            population,
            healthcare_score,
            airports_open,
            susceptible: population as f64,
            exposed: 0.0,
            infected: 0.0,
            recovered: 0.0,
            dead: 0.0,
            colour: Rgba::LAND,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn population(&self) -> u64 {
        self.population
    }

    pub fn healthcare_score(&self) -> f64 {
        self.healthcare_score
    }

    pub fn airports_open(&self) -> bool {
        self.airports_open
    }

    pub fn set_airports_open(&mut self, open: bool) {
        self.airports_open = open;
    }

    pub fn susceptible(&self) -> f64 {
        self.susceptible
    }

    pub fn exposed(&self) -> f64 {
        self.exposed
    }

    pub fn infected(&self) -> f64 {
        self.infected
    }

    pub fn recovered(&self) -> f64 {
        self.recovered
    }

    pub fn dead(&self) -> f64 {
        self.dead
    }

    pub fn colour(&self) -> Rgba {
        self.colour
    }

    /// Exposed plus infected.
    pub fn active_cases(&self) -> f64 {
        self.exposed + self.infected
    }

    /// Everyone not dead.
    pub fn living(&self) -> f64 {
        self.susceptible + self.exposed + self.infected + self.recovered
    }

    pub fn total(&self) -> f64 {
        self.living() + self.dead
    }

    pub fn infection_ratio(&self) -> f64 {
        if self.population == 0 {
            return 0.0;
        }
        self.infected / self.population as f64
    }

    /// Map severity in `[0, 1]`, weighted so deaths dominate late in an outbreak.
    pub fn visual_severity_ratio(&self) -> f64 {
        if self.population == 0 {
            return 0.0;
        }
        let population = self.population as f64;
        let infected_ratio = self.infected / population;
        let dead_ratio = self.dead / population;

        let mut severity = 0.2 * (infected_ratio * 3.0).min(1.0) + 0.8 * dead_ratio.powi(3);
        if dead_ratio >= DEAD_BLEND_START {
            let t = ((dead_ratio - DEAD_BLEND_START) / (1.0 - DEAD_BLEND_START)).clamp(0.0, 1.0);
            severity += (1.0 - severity) * t;
        }
        severity.clamp(0.0, 1.0)
    }

    /// Moves up to `count` people from susceptible to infected; returns how many moved.
    pub fn seed_infection(&mut self, count: u64) -> f64 {
        let seeded = (count as f64).min(self.susceptible).max(0.0);
        self.susceptible -= seeded;
        self.infected += seeded;
        seeded
    }

    /// Moves up to `count` people from susceptible to exposed; returns how many moved.
    pub(crate) fn import_exposed(&mut self, count: f64) -> f64 {
        let seeded = count.min(self.susceptible).max(0.0);
        self.susceptible -= seeded;
        self.exposed += seeded;
        seeded
    }

    pub(crate) fn refresh_colour(&mut self) {
        self.colour = severity_colour(self.visual_severity_ratio());
    }
}
