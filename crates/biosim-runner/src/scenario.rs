//! JSON scenario files: island map, seed, parameter overrides, the initial
//! population and a list of stages to run.

use biosim_core::{
    DiseaseConfig, Error, ParamOverrides, PopulationEntry, Result, SimulationConfig, Species,
    Terrain,
};
use biosim_world::Simulation;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::str::FromStr;
use tracing::debug;

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    pub island_map: String,
    #[serde(default)]
    pub seed: u64,
    /// Overrides keyed by species name ("Herbivore", "Carnivore")
    #[serde(default)]
    pub animal_parameters: BTreeMap<String, ParamOverrides>,
    /// Overrides keyed by terrain code ("L", "H")
    #[serde(default)]
    pub landscape_parameters: BTreeMap<String, ParamOverrides>,
    #[serde(default)]
    pub disease: DiseaseConfig,
    #[serde(default)]
    pub initial_population: Vec<PopulationEntry>,
    #[serde(default)]
    pub stages: Vec<Stage>,
}

/// Animals added at the start of the stage, then `years` annual cycles.
#[derive(Debug, Clone, Deserialize)]
pub struct Stage {
    pub years: u32,
    #[serde(default)]
    pub add_population: Vec<PopulationEntry>,
}

impl Scenario {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn total_years(&self) -> u32 {
        self.stages.iter().map(|stage| stage.years).sum()
    }

    /// Build the simulation with overrides applied before any animal is
    /// placed, so sampled birth weights use the overridden tables.
    pub fn build(&self, seed_override: Option<u64>) -> Result<Simulation> {
        let config = SimulationConfig {
            seed: seed_override.unwrap_or(self.seed),
            disease: self.disease.clone(),
            ..Default::default()
        };
        let mut sim = Simulation::new(&self.island_map, &[], config)?;

        for (name, overrides) in &self.animal_parameters {
            let species = Species::from_str(name)?;
            sim.set_animal_parameters(species, overrides)?;
            debug!(species = %species, keys = overrides.len(), "Applied animal parameters");
        }

        for (code, overrides) in &self.landscape_parameters {
            let terrain = parse_terrain_code(code)?;
            sim.set_landscape_parameters(terrain, overrides)?;
            debug!(terrain = %code, keys = overrides.len(), "Applied landscape parameters");
        }

        sim.add_population(&self.initial_population)?;
        Ok(sim)
    }
}

fn parse_terrain_code(code: &str) -> Result<Terrain> {
    let mut chars = code.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Terrain::from_code(c)
            .ok_or_else(|| Error::Parameter(format!("unknown landscape code '{}'", code))),
        _ => Err(Error::Parameter(format!(
            "landscape key must be a single character, got '{}'",
            code
        ))),
    }
}
