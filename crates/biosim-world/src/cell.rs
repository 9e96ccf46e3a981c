//! A single island cell: terrain, fodder, resident animals and the inbound
//! staging buckets used while migration is in progress.

use crate::animal::Animal;
use biosim_core::{Direction, ParameterSet, Species, SpeciesCounts, SpeciesSamples, Terrain};
use rand::seq::SliceRandom;
use rand::Rng;

/// Result of one feeding phase in a cell
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FeedingOutcome {
    pub fodder_eaten: f64,
    pub herbivores_killed: usize,
}

#[derive(Debug, Clone)]
pub struct Cell {
    terrain: Terrain,
    fodder: f64,
    herbivores: Vec<Animal>,
    carnivores: Vec<Animal>,
    /// Migrants that arrived this year, indexed by the direction they came from
    inbound: [Vec<Animal>; 4],
}

impl Cell {
    pub fn new(terrain: Terrain) -> Self {
        Self {
            terrain,
            fodder: 0.0,
            herbivores: Vec::new(),
            carnivores: Vec::new(),
            inbound: Default::default(),
        }
    }

    pub fn terrain(&self) -> Terrain {
        self.terrain
    }

    pub fn fodder(&self) -> f64 {
        self.fodder
    }

    pub fn is_habitable(&self) -> bool {
        self.terrain.is_habitable()
    }

    pub fn is_occupied(&self) -> bool {
        !self.herbivores.is_empty() || !self.carnivores.is_empty()
    }

    pub fn herbivores(&self) -> &[Animal] {
        &self.herbivores
    }

    pub fn carnivores(&self) -> &[Animal] {
        &self.carnivores
    }

    pub fn residents(&self, species: Species) -> &[Animal] {
        match species {
            Species::Herbivore => &self.herbivores,
            Species::Carnivore => &self.carnivores,
        }
    }

    fn residents_mut(&mut self, species: Species) -> &mut Vec<Animal> {
        match species {
            Species::Herbivore => &mut self.herbivores,
            Species::Carnivore => &mut self.carnivores,
        }
    }

    pub fn counts(&self) -> SpeciesCounts {
        SpeciesCounts::new(self.herbivores.len(), self.carnivores.len())
    }

    /// Add a resident. Habitability is checked by the island before placement.
    pub fn add_animal(&mut self, animal: Animal) {
        debug_assert!(self.is_habitable(), "animals cannot live in water");
        self.residents_mut(animal.species).push(animal);
    }

    pub fn regrow_fodder(&mut self, params: &ParameterSet) {
        self.fodder = params.fodder_max(self.terrain);
    }

    /// Herbivores graze in random order, then carnivores hunt from fittest to
    /// least fit against the herbivores sorted by ascending fitness.
    pub fn feed_all<R: Rng + ?Sized>(&mut self, params: &ParameterSet, rng: &mut R) -> FeedingOutcome {
        let mut outcome = FeedingOutcome::default();

        self.herbivores.shuffle(rng);
        for herbivore in self.herbivores.iter_mut() {
            if self.fodder <= 0.0 {
                break;
            }
            let eaten = herbivore.consume_fodder(&params.herbivore, self.fodder);
            self.fodder -= eaten;
            outcome.fodder_eaten += eaten;
        }

        if self.carnivores.is_empty() || self.herbivores.is_empty() {
            return outcome;
        }

        let hunter = &params.carnivore;
        let prey = &params.herbivore;
        self.carnivores
            .sort_by(|a, b| b.fitness(hunter).total_cmp(&a.fitness(hunter)));
        self.herbivores
            .sort_by(|a, b| a.fitness(prey).total_cmp(&b.fitness(prey)));

        for carnivore in self.carnivores.iter_mut() {
            if self.herbivores.is_empty() {
                break;
            }
            let killed = carnivore.consume_herbivores(hunter, &self.herbivores, prey, rng);
            outcome.herbivores_killed += killed.len();
            remove_indices(&mut self.herbivores, &killed);
        }

        outcome
    }

    /// Every animal of a species with at least two members tries to give birth.
    /// Newborns join only after the whole pass. Returns the number of births.
    pub fn reproduce_all<R: Rng + ?Sized>(&mut self, params: &ParameterSet, rng: &mut R) -> usize {
        let mut births = 0;

        for species in Species::all() {
            let species_params = params.species(species);
            let residents = self.residents_mut(species);
            let count = residents.len();
            if count < 2 {
                continue;
            }

            let mut newborns = Vec::new();
            for parent in residents.iter_mut() {
                if let Some(offspring) = parent.reproduce(species_params, count, rng) {
                    newborns.push(offspring);
                }
            }
            births += newborns.len();
            residents.extend(newborns);
        }

        births
    }

    pub fn age_all(&mut self) {
        for animal in self.herbivores.iter_mut().chain(self.carnivores.iter_mut()) {
            animal.age_one_year();
        }
    }

    /// Apply the yearly weight loss; `outbreak_fraction` replaces the species'
    /// `eta` in a disease year.
    pub fn lose_weight_all(&mut self, params: &ParameterSet, outbreak_fraction: Option<f64>) {
        for species in Species::all() {
            let species_params = params.species(species);
            for animal in self.residents_mut(species).iter_mut() {
                match outbreak_fraction {
                    Some(fraction) => animal.lose_weight_fraction(fraction),
                    None => animal.lose_weight(species_params),
                }
            }
        }
    }

    /// Remove animals that die this year; returns the number removed
    pub fn cull_dead<R: Rng + ?Sized>(&mut self, params: &ParameterSet, rng: &mut R) -> usize {
        let mut deaths = 0;

        for species in Species::all() {
            let species_params = params.species(species);
            let residents = self.residents_mut(species);
            let before = residents.len();
            let survivors: Vec<Animal> = std::mem::take(residents)
                .into_iter()
                .filter(|animal| !animal.dies(species_params, &mut *rng))
                .collect();
            deaths += before - survivors.len();
            *residents = survivors;
        }

        deaths
    }

    /// Pick migrants and a random direction for each. Animals headed for a
    /// habitable neighbour leave the resident lists and are returned grouped by
    /// direction of travel; everyone else stays put for the year. Animals
    /// born this year never migrate.
    ///
    /// `neighbor_habitable` is indexed by `Direction::index`.
    pub fn stage_outbound_migrants<R: Rng + ?Sized>(
        &mut self,
        neighbor_habitable: [bool; 4],
        params: &ParameterSet,
        rng: &mut R,
    ) -> [Vec<Animal>; 4] {
        let mut outbound: [Vec<Animal>; 4] = Default::default();

        for species in Species::all() {
            let species_params = params.species(species);
            let residents = std::mem::take(self.residents_mut(species));
            let mut staying = Vec::with_capacity(residents.len());

            for animal in residents {
                if !animal.born_this_year && animal.migrates(species_params, rng) {
                    let direction = Direction::ALL[rng.gen_range(0..Direction::ALL.len())];
                    if neighbor_habitable[direction.index()] {
                        outbound[direction.index()].push(animal);
                        continue;
                    }
                }
                staying.push(animal);
            }

            *self.residents_mut(species) = staying;
        }

        outbound
    }

    /// Hold migrants arriving from the neighbour in direction `from`
    pub fn receive_migrants(&mut self, from: Direction, migrants: Vec<Animal>) {
        debug_assert!(migrants.is_empty() || self.is_habitable());
        self.inbound[from.index()].extend(migrants);
    }

    pub fn has_staged_migrants(&self) -> bool {
        self.inbound.iter().any(|bucket| !bucket.is_empty())
    }

    /// Merge all staged migrants into the resident lists; returns how many arrived
    pub fn settle_migrants(&mut self) -> usize {
        let mut arrived = 0;
        for bucket in self.inbound.iter_mut() {
            arrived += bucket.len();
            for animal in bucket.drain(..) {
                match animal.species {
                    Species::Herbivore => self.herbivores.push(animal),
                    Species::Carnivore => self.carnivores.push(animal),
                }
            }
        }
        arrived
    }

    pub fn samples(&self, species: Species, params: &ParameterSet) -> SpeciesSamples {
        let species_params = params.species(species);
        let mut samples = SpeciesSamples::default();
        for animal in self.residents(species) {
            samples.push(animal.age, animal.weight, animal.fitness(species_params));
        }
        samples
    }
}

/// Drop the animals at `indices` (ascending) while keeping the order of the rest
fn remove_indices(animals: &mut Vec<Animal>, indices: &[usize]) {
    if indices.is_empty() {
        return;
    }
    let mut doomed = vec![false; animals.len()];
    for &index in indices {
        doomed[index] = true;
    }
    let mut position = 0;
    animals.retain(|_| {
        let keep = !doomed[position];
        position += 1;
        keep
    });
}
