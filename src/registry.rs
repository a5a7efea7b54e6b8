//! Static region table and land adjacency, validated once at load time.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::colour::{ColourError, Rgba};
use crate::region::Region;

fn default_airports_open() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionConfig {
    pub population: u64,
    pub healthcare_score: f64,
    #[serde(default = "default_airports_open")]
    pub airports_open: bool,
    /// `rrggbbaa` colour of this region in the id map image.
    #[serde(default)]
    pub id_colour: Option<String>,
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("registry must define at least one region")]
    Empty,
    #[error("region '{0}' must have a positive population")]
    EmptyPopulation(String),
    #[error("land connections list unknown region '{0}'")]
    UnknownRegion(String),
    #[error("land connection from '{from}' references unknown region '{to}'")]
    UnknownNeighbour { from: String, to: String },
    #[error("region '{0}' lists itself as a land neighbour")]
    SelfLoop(String),
    #[error("land connection {from} -> {to} has no reverse edge")]
    Asymmetric { from: String, to: String },
    #[error("region '{region}' has an invalid id colour")]
    IdColour {
        region: String,
        #[source]
        source: ColourError,
    },
    #[error("id colour {colour} is shared by '{first}' and '{second}'")]
    DuplicateIdColour {
        colour: String,
        first: String,
        second: String,
    },
}

/// Symmetric land adjacency between regions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LandGraph {
    neighbours: BTreeMap<String, Vec<String>>,
}

impl LandGraph {
    /// Builds a graph, rejecting self loops and one-way edges.
    pub fn new(connections: BTreeMap<String, Vec<String>>) -> Result<Self, RegistryError> {
        let graph = Self {
            neighbours: connections,
        };
        for (from, targets) in &graph.neighbours {
            for to in targets {
                if to == from {
                    return Err(RegistryError::SelfLoop(from.clone()));
                }
                if !graph.neighbours(to).iter().any(|back| back == from) {
                    return Err(RegistryError::Asymmetric {
                        from: from.clone(),
                        to: to.clone(),
                    });
                }
            }
        }
        Ok(graph)
    }

    pub fn neighbours(&self, region: &str) -> &[String] {
        self.neighbours
            .get(region)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn regions(&self) -> impl Iterator<Item = &str> {
        self.neighbours.keys().map(String::as_str)
    }

    fn edges(&self) -> impl Iterator<Item = (&str, &str)> {
        self.neighbours
            .iter()
            .flat_map(|(from, targets)| targets.iter().map(move |to| (from.as_str(), to.as_str())))
    }
}

/// Read-only lookup table of every playable region.
#[derive(Debug, Clone)]
pub struct RegionRegistry {
    regions: BTreeMap<String, RegionConfig>,
    land: LandGraph,
    id_lookup: HashMap<(u8, u8, u8), String>,
}

impl RegionRegistry {
    pub fn new(
        regions: BTreeMap<String, RegionConfig>,
        land_connections: BTreeMap<String, Vec<String>>,
    ) -> Result<Self, RegistryError> {
        if regions.is_empty() {
            return Err(RegistryError::Empty);
        }
        for (name, config) in &regions {
            if config.population == 0 {
                return Err(RegistryError::EmptyPopulation(name.clone()));
            }
        }

        let land = LandGraph::new(land_connections)?;
        if let Some(unknown) = land.regions().find(|name| !regions.contains_key(*name)) {
            return Err(RegistryError::UnknownRegion(unknown.to_string()));
        }
        if let Some((from, to)) = land.edges().find(|(_, to)| !regions.contains_key(*to)) {
            return Err(RegistryError::UnknownNeighbour {
                from: from.to_string(),
                to: to.to_string(),
            });
        }

        let mut id_lookup: HashMap<(u8, u8, u8), String> = HashMap::new();
        for (name, config) in &regions {
            let Some(hex) = &config.id_colour else {
                continue;
            };
            let colour = Rgba::from_hex(hex).map_err(|source| RegistryError::IdColour {
                region: name.clone(),
                source,
            })?;
            if let Some(first) = id_lookup.insert(colour.rgb(), name.clone()) {
                return Err(RegistryError::DuplicateIdColour {
                    colour: colour.to_hex(),
                    first,
                    second: name.clone(),
                });
            }
        }

        Ok(Self {
            regions,
            land,
            id_lookup,
        })
    }

    /// Fresh regions for a new game, ordered by name.
    pub fn build_regions(&self) -> Vec<Region> {
        self.regions
            .iter()
            .map(|(name, config)| {
                Region::new(
                    name.clone(),
                    config.population,
                    config.healthcare_score,
                    config.airports_open,
                )
            })
            .collect()
    }

    pub fn land(&self) -> &LandGraph {
        &self.land
    }

    pub fn config(&self, name: &str) -> Option<&RegionConfig> {
        self.regions.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.regions.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn total_population(&self) -> u64 {
        self.regions.values().map(|config| config.population).sum()
    }

    /// Resolves an id-map pixel to its region; alpha is ignored.
    pub fn region_at_colour(&self, pixel: Rgba) -> Option<&str> {
        self.id_lookup.get(&pixel.rgb()).map(String::as_str)
    }
}
