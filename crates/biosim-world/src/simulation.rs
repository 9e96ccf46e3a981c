//! Simulation driver: owns the island, the parameter tables and the RNG.

use crate::animal::Animal;
use crate::island::{Island, YearReport};
use biosim_core::{
    Error, IslandSnapshot, ParamOverrides, ParameterSet, PopulationEntry, Result, Species,
    SpeciesCounts, SimulationConfig, Terrain,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, instrument};

pub struct Simulation {
    island: Island,
    config: SimulationConfig,
    rng: ChaCha8Rng,
    year: u32,
}

impl Simulation {
    pub fn new(
        island_map: &str,
        initial_population: &[PopulationEntry],
        config: SimulationConfig,
    ) -> Result<Self> {
        config.validate()?;
        let island = Island::from_map(island_map)?;
        let rng = ChaCha8Rng::seed_from_u64(config.seed);

        let mut sim = Self {
            island,
            config,
            rng,
            year: 0,
        };
        sim.add_population(initial_population)?;

        info!(
            seed = sim.config.seed,
            rows = sim.island.rows(),
            cols = sim.island.cols(),
            herbivores = sim.num_animals_per_species().herbivores,
            carnivores = sim.num_animals_per_species().carnivores,
            disease = sim.config.disease.enabled,
            "Simulation created"
        );
        Ok(sim)
    }

    /// Default parameters with the given seed
    pub fn with_seed(island_map: &str, initial_population: &[PopulationEntry], seed: u64) -> Result<Self> {
        Self::new(island_map, initial_population, SimulationConfig::with_seed(seed))
    }

    pub fn set_animal_parameters(&mut self, species: Species, overrides: &ParamOverrides) -> Result<()> {
        self.config.parameters = self
            .config
            .parameters
            .with_species_overrides(species, overrides)?;
        Ok(())
    }

    pub fn set_landscape_parameters(&mut self, terrain: Terrain, overrides: &ParamOverrides) -> Result<()> {
        self.config.parameters = self
            .config
            .parameters
            .with_landscape_overrides(terrain, overrides)?;
        Ok(())
    }

    /// Place animals on the island. Every record is checked before any
    /// animal is added.
    pub fn add_population(&mut self, entries: &[PopulationEntry]) -> Result<()> {
        for entry in entries {
            self.island.check_location(entry.location)?;
            for individual in &entry.population {
                if let Some(weight) = individual.weight {
                    if !weight.is_finite() || weight <= 0.0 {
                        return Err(Error::Configuration(format!(
                            "{} at {} has weight {}, expected a positive number",
                            individual.species, entry.location, weight
                        )));
                    }
                }
            }
        }

        let mut added = SpeciesCounts::default();
        for entry in entries {
            for individual in &entry.population {
                let animal = match individual.weight {
                    Some(weight) => Animal::new(individual.species, individual.age, weight),
                    None => {
                        let params = self.config.parameters.species(individual.species);
                        let mut newborn = Animal::newborn(individual.species, params, &mut self.rng);
                        newborn.age = individual.age;
                        newborn
                    }
                };
                match animal.species {
                    Species::Herbivore => added.herbivores += 1,
                    Species::Carnivore => added.carnivores += 1,
                }
                self.island.place(entry.location, animal)?;
            }
        }

        debug!(
            herbivores = added.herbivores,
            carnivores = added.carnivores,
            year = self.year,
            "Population added"
        );
        Ok(())
    }

    /// Run one annual cycle
    pub fn step(&mut self) -> YearReport {
        let outbreak_fraction = self.roll_outbreak();
        let report = self
            .island
            .annual_cycle(&self.config.parameters, outbreak_fraction, &mut self.rng);
        self.year += 1;

        if report.outbreak {
            info!(year = self.year, "Disease outbreak");
        }

        let counts = self.island.counts();
        debug!(
            event = "annual_cycle",
            year = self.year,
            herbivores = counts.herbivores,
            carnivores = counts.carnivores,
            births = report.births,
            deaths = report.deaths,
            kills = report.herbivores_killed,
            migrations = report.migrations,
            fodder_eaten = report.fodder_eaten,
            "Year complete"
        );

        report
    }

    fn roll_outbreak(&mut self) -> Option<f64> {
        let disease = &self.config.disease;
        if !disease.enabled {
            return None;
        }
        (self.rng.gen::<f64>() < disease.outbreak_probability).then_some(disease.weight_loss_fraction)
    }

    /// Advance the island by `years` annual cycles
    pub fn simulate(&mut self, years: u32) -> Result<()> {
        self.simulate_with(years, years.max(1), |_| {})
    }

    /// Advance by `years`, passing a snapshot to `on_snapshot` for the initial
    /// state (when starting from year 0) and after every year divisible by `every`.
    #[instrument(skip(self, on_snapshot), fields(start_year = self.year))]
    pub fn simulate_with<F>(&mut self, years: u32, every: u32, mut on_snapshot: F) -> Result<()>
    where
        F: FnMut(&IslandSnapshot),
    {
        if every == 0 {
            return Err(Error::Configuration(
                "snapshot interval must be at least one year".to_string(),
            ));
        }

        info!("Starting simulation for {} years", years);

        if self.year == 0 {
            on_snapshot(&self.snapshot());
        }

        for _ in 0..years {
            self.step();
            if self.year % every == 0 {
                on_snapshot(&self.snapshot());
            }
        }

        let counts = self.island.counts();
        info!(
            event = "simulation_complete",
            year = self.year,
            herbivores = counts.herbivores,
            carnivores = counts.carnivores,
            "Simulation finished"
        );
        Ok(())
    }

    /// Last year simulated
    pub fn year(&self) -> u32 {
        self.year
    }

    pub fn num_animals(&self) -> usize {
        self.island.counts().total()
    }

    pub fn num_animals_per_species(&self) -> SpeciesCounts {
        self.island.counts()
    }

    pub fn island(&self) -> &Island {
        &self.island
    }

    pub fn parameters(&self) -> &ParameterSet {
        &self.config.parameters
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn snapshot(&self) -> IslandSnapshot {
        let params = &self.config.parameters;
        IslandSnapshot {
            year: self.year,
            counts: self.island.counts(),
            herbivore_density: self.island.density(Species::Herbivore),
            carnivore_density: self.island.density(Species::Carnivore),
            herbivores: self.island.samples(Species::Herbivore, params),
            carnivores: self.island.samples(Species::Carnivore, params),
        }
    }
}
