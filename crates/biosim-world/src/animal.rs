//! Animal state and yearly behaviour.
//!
//! An animal only carries age and weight; its fitness is derived from both on
//! every call. All species constants come from the caller's `SpeciesParams`
//! and every random decision draws from the caller's RNG.

use biosim_core::{AnimalId, Species, SpeciesParams};
use rand::Rng;
use serde::{Deserialize, Serialize};

const MAX_BIRTH_WEIGHT_DRAWS: usize = 100;

/// An animal on the island
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Animal {
    pub id: AnimalId,
    pub species: Species,
    pub age: u32,
    pub weight: f64,
    /// Set on offspring until their first birthday; they stay in their birth
    /// cell during that year's migration.
    #[serde(default)]
    pub born_this_year: bool,
}

impl Animal {
    pub fn new(species: Species, age: u32, weight: f64) -> Self {
        Self {
            id: AnimalId::new(),
            species,
            age,
            weight,
            born_this_year: false,
        }
    }

    /// A newborn with a sampled birth weight
    pub fn newborn<R: Rng + ?Sized>(species: Species, params: &SpeciesParams, rng: &mut R) -> Self {
        Self::new(species, 0, sample_birth_weight(params, rng))
    }

    pub fn is_herbivore(&self) -> bool {
        self.species == Species::Herbivore
    }

    pub fn fitness(&self, params: &SpeciesParams) -> f64 {
        if self.weight <= 0.0 {
            return 0.0;
        }
        sigmoid(params.phi_age, self.age as f64, params.a_half)
            * sigmoid(-params.phi_weight, self.weight, params.w_half)
    }

    pub fn age_one_year(&mut self) {
        self.age += 1;
        self.born_this_year = false;
    }

    /// Regular yearly loss of `eta * weight`
    pub fn lose_weight(&mut self, params: &SpeciesParams) {
        self.lose_weight_fraction(params.eta);
    }

    pub fn lose_weight_fraction(&mut self, fraction: f64) {
        self.weight -= fraction * self.weight;
    }

    pub fn dies<R: Rng + ?Sized>(&self, params: &SpeciesParams, rng: &mut R) -> bool {
        if self.weight <= 0.0 {
            return true;
        }
        rng.gen::<f64>() < params.omega * (1.0 - self.fitness(params))
    }

    pub fn migrates<R: Rng + ?Sized>(&self, params: &SpeciesParams, rng: &mut R) -> bool {
        rng.gen::<f64>() < params.mu * self.fitness(params)
    }

    /// Attempt to give birth, given `same_species` animals of this species in the cell
    /// before any births this year.
    pub fn reproduce<R: Rng + ?Sized>(
        &mut self,
        params: &SpeciesParams,
        same_species: usize,
        rng: &mut R,
    ) -> Option<Animal> {
        if self.weight < params.zeta * (params.w_birth + params.sigma_birth) {
            return None;
        }

        let mates = same_species.saturating_sub(1) as f64;
        let probability = (params.gamma * self.fitness(params) * mates).min(1.0);
        if rng.gen::<f64>() >= probability {
            return None;
        }

        let mut offspring = Animal::newborn(self.species, params, rng);
        let cost = params.xi * offspring.weight;
        if self.weight < cost {
            return None;
        }
        self.weight -= cost;
        offspring.born_this_year = true;
        Some(offspring)
    }

    /// Eat up to the appetite from `available` fodder; returns the amount eaten
    pub fn consume_fodder(&mut self, params: &SpeciesParams, available: f64) -> f64 {
        debug_assert!(self.is_herbivore(), "only herbivores graze");
        if available <= 0.0 {
            return 0.0;
        }
        let eaten = available.min(params.f);
        self.weight += params.beta * eaten;
        eaten
    }

    /// Hunt through `prey`, which must be sorted by ascending fitness.
    ///
    /// Returns the indices into `prey` of the herbivores killed, in ascending
    /// order. The caller removes them from the cell.
    pub fn consume_herbivores<R: Rng + ?Sized>(
        &mut self,
        params: &SpeciesParams,
        prey: &[Animal],
        prey_params: &SpeciesParams,
        rng: &mut R,
    ) -> Vec<usize> {
        let mut killed = Vec::new();
        let Some(delta_phi_max) = params.delta_phi_max else {
            return killed;
        };

        let mut eaten = 0.0;
        for (index, herbivore) in prey.iter().enumerate() {
            let remaining = params.f - eaten;
            if remaining <= 0.0 {
                break;
            }

            let own_fitness = self.fitness(params);
            let prey_fitness = herbivore.fitness(prey_params);
            if own_fitness <= prey_fitness {
                break;
            }

            let kill_probability = ((own_fitness - prey_fitness) / delta_phi_max).min(1.0);
            if rng.gen::<f64>() < kill_probability {
                let meal = remaining.min(herbivore.weight);
                self.weight += params.beta * meal;
                eaten += meal;
                killed.push(index);
            }
        }

        killed
    }
}

/// Logistic curve `1 / (1 + exp(k * (x - x0)))`
pub fn sigmoid(k: f64, x: f64, x0: f64) -> f64 {
    1.0 / (1.0 + (k * (x - x0)).exp())
}

/// Draw a strictly positive birth weight from the species' normal distribution
pub fn sample_birth_weight<R: Rng + ?Sized>(params: &SpeciesParams, rng: &mut R) -> f64 {
    for _ in 0..MAX_BIRTH_WEIGHT_DRAWS {
        let weight = params.w_birth + params.sigma_birth * standard_normal(rng);
        if weight > 0.0 {
            return weight;
        }
    }
    // Only reachable with a degenerate table such as w_birth = sigma_birth = 0
    params.w_birth.max(f64::MIN_POSITIVE)
}

fn standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    let u1 = rng.gen::<f64>().max(f64::MIN_POSITIVE);
    let u2 = rng.gen::<f64>();
    (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn herbivore_params() -> SpeciesParams {
        SpeciesParams::herbivore()
    }

    fn carnivore_params() -> SpeciesParams {
        SpeciesParams::carnivore()
    }

    /// Abramowitz & Stegun 7.1.26
    fn erf(x: f64) -> f64 {
        let sign = if x < 0.0 { -1.0 } else { 1.0 };
        let x = x.abs();
        let t = 1.0 / (1.0 + 0.3275911 * x);
        let poly = t
            * (0.254829592
                + t * (-0.284496736 + t * (1.421413741 + t * (-1.453152027 + t * 1.061405429))));
        sign * (1.0 - poly * (-x * x).exp())
    }

    fn normal_cdf(x: f64, mean: f64, std_dev: f64) -> f64 {
        0.5 * (1.0 + erf((x - mean) / (std_dev * std::f64::consts::SQRT_2)))
    }

    #[test]
    fn test_newborn_has_age_zero() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let animal = Animal::newborn(Species::Herbivore, &herbivore_params(), &mut rng);
        assert_eq!(animal.age, 0);
        assert!(animal.weight > 0.0);
    }

    #[test]
    fn test_birthday_clears_newborn_mark() {
        let mut animal = Animal::new(Species::Herbivore, 0, 8.0);
        assert!(!animal.born_this_year);
        animal.born_this_year = true;
        animal.age_one_year();
        assert!(!animal.born_this_year);
        assert_eq!(animal.age, 1);
    }

    #[test]
    fn test_aging() {
        let mut animal = Animal::new(Species::Carnivore, 0, 10.0);
        for n in 0..5 {
            animal.age_one_year();
            assert_eq!(animal.age, n + 1);
        }
    }

    #[test]
    fn test_birth_weights_are_normal() {
        let mut rng = ChaCha8Rng::seed_from_u64(123456);
        for params in [herbivore_params(), carnivore_params()] {
            let mut weights: Vec<f64> = (0..1000)
                .map(|_| sample_birth_weight(&params, &mut rng))
                .collect();
            assert!(weights.iter().all(|&w| w > 0.0));

            // Kolmogorov-Smirnov against N(w_birth, sigma_birth), alpha = 0.01
            weights.sort_by(|a, b| a.total_cmp(b));
            let n = weights.len() as f64;
            let statistic = weights
                .iter()
                .enumerate()
                .map(|(i, &w)| {
                    let cdf = normal_cdf(w, params.w_birth, params.sigma_birth);
                    let above = (i as f64 + 1.0) / n - cdf;
                    let below = cdf - i as f64 / n;
                    above.max(below)
                })
                .fold(0.0, f64::max);
            assert!(statistic < 1.628 / n.sqrt(), "KS statistic {}", statistic);
        }
    }

    #[test]
    fn test_degenerate_birth_weight_stays_positive() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let params = SpeciesParams {
            w_birth: 0.0,
            sigma_birth: 0.0,
            ..herbivore_params()
        };
        assert!(sample_birth_weight(&params, &mut rng) > 0.0);
    }

    #[test]
    fn test_fitness_zero_without_weight() {
        let params = herbivore_params();
        assert_eq!(Animal::new(Species::Herbivore, 3, 0.0).fitness(&params), 0.0);
        assert_eq!(Animal::new(Species::Herbivore, 3, -2.0).fitness(&params), 0.0);
    }

    #[test]
    fn test_fitness_ordering() {
        let params = herbivore_params();
        let young_heavy = Animal::new(Species::Herbivore, 2, 40.0);
        let old_light = Animal::new(Species::Herbivore, 60, 5.0);
        assert!(young_heavy.fitness(&params) > old_light.fitness(&params));
    }

    proptest! {
        #[test]
        fn prop_fitness_in_unit_interval(age in 0u32..500, weight in -50.0f64..1000.0) {
            for (species, params) in [
                (Species::Herbivore, herbivore_params()),
                (Species::Carnivore, carnivore_params()),
            ] {
                let fitness = Animal::new(species, age, weight).fitness(&params);
                prop_assert!((0.0..=1.0).contains(&fitness));
            }
        }
    }

    #[test]
    fn test_lose_weight() {
        let params = herbivore_params();
        let mut animal = Animal::new(Species::Herbivore, 5, 20.0);
        animal.lose_weight(&params);
        assert!((animal.weight - 19.0).abs() < 1e-12);
        animal.lose_weight(&params);
        assert!((animal.weight - 18.05).abs() < 1e-12);
    }

    #[test]
    fn test_no_death_without_omega() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let params = SpeciesParams {
            omega: 0.0,
            ..herbivore_params()
        };
        let animal = Animal::new(Species::Herbivore, 80, 1.0);
        for _ in 0..100 {
            assert!(!animal.dies(&params, &mut rng));
        }
    }

    #[test]
    fn test_certain_death_without_weight() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let params = SpeciesParams {
            omega: 1.0,
            ..herbivore_params()
        };
        let animal = Animal::new(Species::Herbivore, 5, 0.0);
        for _ in 0..100 {
            assert!(animal.dies(&params, &mut rng));
        }
    }

    #[test]
    fn test_migration_probability_bounds() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let animal = Animal::new(Species::Carnivore, 5, 30.0);
        let never = SpeciesParams {
            mu: 0.0,
            ..carnivore_params()
        };
        let always = SpeciesParams {
            mu: 1000.0,
            ..carnivore_params()
        };
        for _ in 0..100 {
            assert!(!animal.migrates(&never, &mut rng));
            assert!(animal.migrates(&always, &mut rng));
        }
    }

    #[test]
    fn test_no_birth_below_weight_threshold() {
        let mut rng = ChaCha8Rng::seed_from_u64(6);
        let params = herbivore_params();
        // zeta * (w_birth + sigma_birth) = 33.25
        let mut animal = Animal::new(Species::Herbivore, 5, 33.0);
        for _ in 0..50 {
            assert!(animal.reproduce(&params, 100, &mut rng).is_none());
        }
        assert_eq!(animal.weight, 33.0);
    }

    #[test]
    fn test_no_birth_when_alone() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let params = herbivore_params();
        let mut animal = Animal::new(Species::Herbivore, 5, 80.0);
        for _ in 0..50 {
            assert!(animal.reproduce(&params, 1, &mut rng).is_none());
        }
    }

    #[test]
    fn test_birth_transfers_weight() {
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        let params = SpeciesParams {
            gamma: 10.0,
            ..herbivore_params()
        };
        let mut parent = Animal::new(Species::Herbivore, 5, 100.0);
        let offspring = parent
            .reproduce(&params, 10, &mut rng)
            .expect("birth is certain");
        assert_eq!(offspring.species, Species::Herbivore);
        assert_eq!(offspring.age, 0);
        assert!(offspring.born_this_year);
        assert!(!parent.born_this_year);
        assert!(offspring.weight > 0.0);
        assert!((parent.weight - (100.0 - params.xi * offspring.weight)).abs() < 1e-9);
    }

    #[test]
    fn test_birth_aborted_when_parent_too_light() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let params = SpeciesParams {
            gamma: 10.0,
            xi: 100.0,
            ..herbivore_params()
        };
        let mut parent = Animal::new(Species::Herbivore, 5, 34.0);
        for _ in 0..20 {
            assert!(parent.reproduce(&params, 10, &mut rng).is_none());
        }
        assert_eq!(parent.weight, 34.0);
    }

    #[test]
    fn test_consume_fodder() {
        let params = herbivore_params();
        let mut animal = Animal::new(Species::Herbivore, 5, 20.0);

        assert_eq!(animal.consume_fodder(&params, 300.0), 10.0);
        assert!((animal.weight - 29.0).abs() < 1e-12);

        assert_eq!(animal.consume_fodder(&params, 4.0), 4.0);
        assert!((animal.weight - 32.6).abs() < 1e-12);

        assert_eq!(animal.consume_fodder(&params, 0.0), 0.0);
        assert!((animal.weight - 32.6).abs() < 1e-12);
    }

    #[test]
    fn test_unfit_carnivore_kills_nothing() {
        let mut rng = ChaCha8Rng::seed_from_u64(10);
        let mut carnivore = Animal::new(Species::Carnivore, 100, 1.0);
        let prey: Vec<Animal> = (0..10)
            .map(|_| Animal::new(Species::Herbivore, 5, 30.0))
            .collect();
        let killed = carnivore.consume_herbivores(&carnivore_params(), &prey, &herbivore_params(), &mut rng);
        assert!(killed.is_empty());
        assert_eq!(carnivore.weight, 1.0);
    }

    #[test]
    fn test_carnivore_stops_at_appetite() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let params = SpeciesParams {
            delta_phi_max: Some(0.5),
            ..carnivore_params()
        };
        let mut carnivore = Animal::new(Species::Carnivore, 5, 50.0);
        let prey: Vec<Animal> = (0..15)
            .map(|_| Animal::new(Species::Herbivore, 50, 5.0))
            .collect();

        let killed = carnivore.consume_herbivores(&params, &prey, &herbivore_params(), &mut rng);

        // F = 50 and each herbivore weighs 5
        assert_eq!(killed, (0..10).collect::<Vec<_>>());
        assert!((carnivore.weight - (50.0 + params.beta * params.f)).abs() < 1e-9);
    }

    #[test]
    fn test_partial_last_meal() {
        let mut rng = ChaCha8Rng::seed_from_u64(12);
        let params = SpeciesParams {
            delta_phi_max: Some(0.5),
            f: 12.0,
            ..carnivore_params()
        };
        let mut carnivore = Animal::new(Species::Carnivore, 5, 50.0);
        let prey: Vec<Animal> = (0..5)
            .map(|_| Animal::new(Species::Herbivore, 50, 5.0))
            .collect();

        let killed = carnivore.consume_herbivores(&params, &prey, &herbivore_params(), &mut rng);

        // 5 + 5 + 2 of the third
        assert_eq!(killed, vec![0, 1, 2]);
        assert!((carnivore.weight - (50.0 + params.beta * 12.0)).abs() < 1e-9);
    }

    #[test]
    fn test_killed_indices_are_unique() {
        let mut rng = ChaCha8Rng::seed_from_u64(13);
        let params = carnivore_params();
        let prey_params = herbivore_params();
        let mut prey: Vec<Animal> = (0..40)
            .map(|i| Animal::new(Species::Herbivore, i % 30, 3.0 + i as f64))
            .collect();
        prey.sort_by(|a, b| a.fitness(&prey_params).total_cmp(&b.fitness(&prey_params)));

        let mut carnivore = Animal::new(Species::Carnivore, 3, 40.0);
        let killed = carnivore.consume_herbivores(&params, &prey, &prey_params, &mut rng);

        let mut deduped = killed.clone();
        deduped.dedup();
        assert_eq!(deduped, killed);
        assert!(killed.windows(2).all(|w| w[0] < w[1]));
        assert!(killed.iter().all(|&i| i < prey.len()));
    }
}
