//! Configuration types for the simulation.
//!
//! Parameter tables are plain values owned by the simulation driver. Overrides
//! never mutate a table in place: `with_overrides` validates the whole request
//! and returns a new table, so a rejected override leaves the old one intact.

use crate::{Error, Result, Species, Terrain};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Partial parameter mapping as supplied by callers, e.g. `{"zeta": 3.2}`
pub type ParamOverrides = BTreeMap<String, serde_json::Value>;

/// Per-species constants governing birth, feeding, fitness, migration,
/// reproduction and death
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesParams {
    /// Mean birth weight
    pub w_birth: f64,
    /// Standard deviation of birth weight
    pub sigma_birth: f64,
    /// Fraction of eaten food converted to weight
    pub beta: f64,
    /// Yearly fractional weight loss
    pub eta: f64,
    pub a_half: f64,
    pub phi_age: f64,
    pub w_half: f64,
    pub phi_weight: f64,
    /// Migration probability factor
    pub mu: f64,
    pub gamma: f64,
    pub zeta: f64,
    pub xi: f64,
    /// Death probability factor
    pub omega: f64,
    /// Appetite
    #[serde(rename = "F")]
    pub f: f64,
    /// Fitness difference at which a kill becomes certain (carnivores only)
    #[serde(rename = "DeltaPhiMax", default, skip_serializing_if = "Option::is_none")]
    pub delta_phi_max: Option<f64>,
}

const SPECIES_KEYS: [&str; 14] = [
    "w_birth",
    "sigma_birth",
    "beta",
    "eta",
    "a_half",
    "phi_age",
    "w_half",
    "phi_weight",
    "mu",
    "gamma",
    "zeta",
    "xi",
    "omega",
    "F",
];

impl SpeciesParams {
    pub fn herbivore() -> Self {
        Self {
            w_birth: 8.0,
            sigma_birth: 1.5,
            beta: 0.9,
            eta: 0.05,
            a_half: 40.0,
            phi_age: 0.6,
            w_half: 10.0,
            phi_weight: 0.1,
            mu: 0.25,
            gamma: 0.2,
            zeta: 3.5,
            xi: 1.2,
            omega: 0.4,
            f: 10.0,
            delta_phi_max: None,
        }
    }

    pub fn carnivore() -> Self {
        Self {
            w_birth: 6.0,
            sigma_birth: 1.0,
            beta: 0.75,
            eta: 0.125,
            a_half: 40.0,
            phi_age: 0.3,
            w_half: 4.0,
            phi_weight: 0.4,
            mu: 0.4,
            gamma: 0.8,
            zeta: 3.5,
            xi: 1.1,
            omega: 0.8,
            f: 50.0,
            delta_phi_max: Some(10.0),
        }
    }

    pub fn defaults_for(species: Species) -> Self {
        match species {
            Species::Herbivore => Self::herbivore(),
            Species::Carnivore => Self::carnivore(),
        }
    }

    /// Return a copy with `overrides` applied, or an error if any entry is invalid
    pub fn with_overrides(&self, species: Species, overrides: &ParamOverrides) -> Result<Self> {
        let mut updated = self.clone();

        for (key, value) in overrides {
            let number = numeric_value(key, value)?;
            let slot = updated.slot_mut(species, key)?;
            *slot = number;
        }

        updated.validate(species)?;
        debug!(species = %species, keys = overrides.len(), "Species parameters overridden");
        Ok(updated)
    }

    /// Check sign and domain constraints on the whole table
    pub fn validate(&self, species: Species) -> Result<()> {
        let values = [
            ("w_birth", self.w_birth),
            ("sigma_birth", self.sigma_birth),
            ("beta", self.beta),
            ("eta", self.eta),
            ("a_half", self.a_half),
            ("phi_age", self.phi_age),
            ("w_half", self.w_half),
            ("phi_weight", self.phi_weight),
            ("mu", self.mu),
            ("gamma", self.gamma),
            ("zeta", self.zeta),
            ("xi", self.xi),
            ("omega", self.omega),
            ("F", self.f),
        ];
        for (key, value) in values {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::Parameter(format!(
                    "{} parameter '{}' must be a non-negative number, got {}",
                    species, key, value
                )));
            }
        }

        if self.eta <= 0.0 || self.eta > 1.0 {
            return Err(Error::Parameter(format!(
                "{} parameter 'eta' must lie in (0, 1], got {}",
                species, self.eta
            )));
        }

        match (species, self.delta_phi_max) {
            (Species::Carnivore, Some(dpm)) if dpm.is_finite() && dpm > 0.0 => Ok(()),
            (Species::Carnivore, Some(dpm)) => Err(Error::Parameter(format!(
                "Carnivore parameter 'DeltaPhiMax' must be strictly positive, got {}",
                dpm
            ))),
            (Species::Carnivore, None) => Err(Error::Parameter(
                "Carnivore parameter 'DeltaPhiMax' is required".to_string(),
            )),
            (Species::Herbivore, Some(_)) => Err(Error::Parameter(
                "Herbivore has no parameter 'DeltaPhiMax'".to_string(),
            )),
            (Species::Herbivore, None) => Ok(()),
        }
    }

    fn slot_mut(&mut self, species: Species, key: &str) -> Result<&mut f64> {
        let slot = match key {
            "w_birth" => &mut self.w_birth,
            "sigma_birth" => &mut self.sigma_birth,
            "beta" => &mut self.beta,
            "eta" => &mut self.eta,
            "a_half" => &mut self.a_half,
            "phi_age" => &mut self.phi_age,
            "w_half" => &mut self.w_half,
            "phi_weight" => &mut self.phi_weight,
            "mu" => &mut self.mu,
            "gamma" => &mut self.gamma,
            "zeta" => &mut self.zeta,
            "xi" => &mut self.xi,
            "omega" => &mut self.omega,
            "F" => &mut self.f,
            "DeltaPhiMax" if species == Species::Carnivore => {
                self.delta_phi_max.get_or_insert(0.0)
            }
            _ => {
                return Err(Error::Parameter(format!(
                    "unknown {} parameter '{}' (expected one of {}{})",
                    species,
                    key,
                    SPECIES_KEYS.join(", "),
                    if species == Species::Carnivore { ", DeltaPhiMax" } else { "" }
                )))
            }
        };
        Ok(slot)
    }
}

/// Fodder constants for a vegetated terrain kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandscapeParams {
    /// Fodder available at the start of each year
    pub f_max: f64,
}

impl LandscapeParams {
    pub fn lowland() -> Self {
        Self { f_max: 800.0 }
    }

    pub fn highland() -> Self {
        Self { f_max: 300.0 }
    }

    pub fn with_overrides(&self, terrain: Terrain, overrides: &ParamOverrides) -> Result<Self> {
        let mut updated = self.clone();

        for (key, value) in overrides {
            let number = numeric_value(key, value)?;
            if number < 0.0 {
                return Err(Error::Parameter(format!(
                    "{:?} parameter '{}' must be non-negative, got {}",
                    terrain, key, number
                )));
            }
            match key.as_str() {
                "f_max" => updated.f_max = number,
                other => {
                    return Err(Error::Parameter(format!(
                        "unknown {:?} parameter '{}' (expected f_max)",
                        terrain, other
                    )))
                }
            }
        }

        debug!(terrain = ?terrain, f_max = updated.f_max, "Landscape parameters overridden");
        Ok(updated)
    }
}

/// All parameter tables used by one simulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParameterSet {
    pub herbivore: SpeciesParams,
    pub carnivore: SpeciesParams,
    pub lowland: LandscapeParams,
    pub highland: LandscapeParams,
}

impl Default for ParameterSet {
    fn default() -> Self {
        Self {
            herbivore: SpeciesParams::defaults_for(Species::Herbivore),
            carnivore: SpeciesParams::defaults_for(Species::Carnivore),
            lowland: LandscapeParams::lowland(),
            highland: LandscapeParams::highland(),
        }
    }
}

impl ParameterSet {
    pub fn species(&self, species: Species) -> &SpeciesParams {
        match species {
            Species::Herbivore => &self.herbivore,
            Species::Carnivore => &self.carnivore,
        }
    }

    /// Yearly fodder maximum for a terrain kind
    pub fn fodder_max(&self, terrain: Terrain) -> f64 {
        match terrain {
            Terrain::Lowland => self.lowland.f_max,
            Terrain::Highland => self.highland.f_max,
            Terrain::Water | Terrain::Desert => 0.0,
        }
    }

    pub fn with_species_overrides(&self, species: Species, overrides: &ParamOverrides) -> Result<Self> {
        let mut updated = self.clone();
        let params = self.species(species).with_overrides(species, overrides)?;
        match species {
            Species::Herbivore => updated.herbivore = params,
            Species::Carnivore => updated.carnivore = params,
        }
        Ok(updated)
    }

    pub fn with_landscape_overrides(&self, terrain: Terrain, overrides: &ParamOverrides) -> Result<Self> {
        let mut updated = self.clone();
        match terrain {
            Terrain::Lowland => updated.lowland = self.lowland.with_overrides(terrain, overrides)?,
            Terrain::Highland => updated.highland = self.highland.with_overrides(terrain, overrides)?,
            Terrain::Water | Terrain::Desert => {
                return Err(Error::Parameter(format!(
                    "'{}' is not a landscape type with parameters",
                    terrain.code()
                )))
            }
        }
        Ok(updated)
    }

    pub fn validate(&self) -> Result<()> {
        self.herbivore.validate(Species::Herbivore)?;
        self.carnivore.validate(Species::Carnivore)?;
        for (terrain, params) in [(Terrain::Lowland, &self.lowland), (Terrain::Highland, &self.highland)] {
            if !params.f_max.is_finite() || params.f_max < 0.0 {
                return Err(Error::Parameter(format!(
                    "{:?} f_max must be non-negative, got {}",
                    terrain, params.f_max
                )));
            }
        }
        Ok(())
    }
}

/// Optional yearly disease outbreak
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiseaseConfig {
    pub enabled: bool,
    /// Chance of an outbreak in any given year
    pub outbreak_probability: f64,
    /// Fraction of weight lost in an outbreak year, replacing the regular loss
    pub weight_loss_fraction: f64,
}

impl Default for DiseaseConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            outbreak_probability: 1.0 / 30.0,
            weight_loss_fraction: 0.5,
        }
    }
}

impl DiseaseConfig {
    pub fn validate(&self) -> Result<()> {
        for (key, value) in [
            ("outbreak_probability", self.outbreak_probability),
            ("weight_loss_fraction", self.weight_loss_fraction),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::Configuration(format!(
                    "disease {} must lie in [0, 1], got {}",
                    key, value
                )));
            }
        }
        Ok(())
    }
}

/// Simulation configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Random seed for reproducibility
    pub seed: u64,
    pub parameters: ParameterSet,
    pub disease: DiseaseConfig,
}

impl SimulationConfig {
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.parameters.validate()?;
        self.disease.validate()
    }
}

fn numeric_value(key: &str, value: &serde_json::Value) -> Result<f64> {
    value.as_f64().ok_or_else(|| {
        Error::Parameter(format!(
            "parameter '{}' must be an integer or float, got {}",
            key, value
        ))
    })
}
