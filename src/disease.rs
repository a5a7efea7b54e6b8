//! The player's disease: difficulty presets and the persisted JSON profile.

use std::{
    fmt, fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::simulation::DiseaseRates;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DifficultyPreset {
    pub initial_infected: u64,
    pub infectivity_rate: f64,
    pub severity_rate: f64,
    pub lethality_rate: f64,
}

impl Difficulty {
    pub fn preset(self) -> DifficultyPreset {
        match self {
            // fast visible start, quick turnover
            Difficulty::Easy => DifficultyPreset {
                initial_infected: 1_000,
                infectivity_rate: 3.0,
                severity_rate: 0.5,
                lethality_rate: 0.5,
            },
            Difficulty::Medium => DifficultyPreset {
                initial_infected: 300,
                infectivity_rate: 1.4,
                severity_rate: 0.12,
                lethality_rate: 0.08,
            },
            Difficulty::Hard => DifficultyPreset {
                initial_infected: 100,
                infectivity_rate: 0.95,
                severity_rate: 0.08,
                lethality_rate: 0.05,
            },
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Difficulty::Easy => "EASY",
            Difficulty::Medium => "MEDIUM",
            Difficulty::Hard => "HARD",
        };
        f.write_str(label)
    }
}

fn default_log_interval_days() -> u64 {
    5
}

fn default_incubation_days() -> u32 {
    3
}

fn default_initial_infected() -> u64 {
    1
}

/// Initial disease configuration chosen before a game starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiseaseProfile {
    pub name: String,
    pub difficulty: Difficulty,
    #[serde(default = "default_initial_infected")]
    pub initial_infected: u64,
    #[serde(default = "default_log_interval_days")]
    pub log_interval_days: u64,
    #[serde(default)]
    pub history: Vec<serde_json::Value>,
    #[serde(default)]
    pub wiped_out_order: Vec<String>,
    pub infectivity_rate: f64,
    pub severity_rate: f64,
    pub lethality_rate: f64,
    #[serde(default = "default_incubation_days")]
    pub incubation_days: u32,
    #[serde(default)]
    pub timestamp_created: i64,
}

#[derive(Debug, Error)]
pub enum DiseaseError {
    #[error("disease name must contain at least one letter, digit, space, '_' or '-'")]
    InvalidName,
    #[error("{field} must be positive, got {value}")]
    NonPositiveRate { field: &'static str, value: f64 },
}

impl DiseaseProfile {
    pub fn from_preset(name: impl Into<String>, difficulty: Difficulty) -> Self {
        let preset = difficulty.preset();
        Self {
            name: name.into(),
            difficulty,
            initial_infected: preset.initial_infected,
            log_interval_days: default_log_interval_days(),
            history: Vec::new(),
            wiped_out_order: Vec::new(),
            infectivity_rate: preset.infectivity_rate,
            severity_rate: preset.severity_rate,
            lethality_rate: preset.lethality_rate,
            incubation_days: default_incubation_days(),
            timestamp_created: chrono::Utc::now().timestamp(),
        }
    }

    /// Daily-scale rates for the stepper.
    pub fn rates(&self) -> DiseaseRates {
        DiseaseRates {
            infectivity_rate: self.infectivity_rate,
            severity_rate: self.severity_rate,
            lethality_rate: self.lethality_rate,
            incubation_days: self.incubation_days as f64,
        }
    }

    pub fn validate(&self) -> Result<(), DiseaseError> {
        if sanitize_file_stem(&self.name).is_empty() {
            return Err(DiseaseError::InvalidName);
        }
        for (field, value) in [
            ("infectivity_rate", self.infectivity_rate),
            ("severity_rate", self.severity_rate),
            ("lethality_rate", self.lethality_rate),
        ] {
            if value.is_nan() || value <= 0.0 {
                return Err(DiseaseError::NonPositiveRate { field, value });
            }
        }
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("Failed to read disease file {}", path.display()))?;
        let profile: DiseaseProfile = serde_json::from_str(&data)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        profile
            .validate()
            .with_context(|| format!("Invalid disease file {}", path.display()))?;
        Ok(profile)
    }

    /// Writes `<dir>/<sanitised name>.json`, creating `dir` if needed.
    pub fn save(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        self.validate()?;
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        let path = dir.join(format!("{}.json", sanitize_file_stem(&self.name)));
        let json = serde_json::to_string_pretty(self)?;
        fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;
        tracing::info!(path = %path.display(), difficulty = %self.difficulty, "disease file created");
        Ok(path)
    }
}

/// Keeps letters, digits, spaces, `_` and `-`, then trims trailing whitespace.
pub fn sanitize_file_stem(name: &str) -> String {
    let kept: String = name
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '_' | '-'))
        .collect();
    kept.trim_end().to_string()
}
