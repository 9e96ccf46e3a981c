//! Population statistics handed to external consumers.

use crate::Species;
use serde::{Deserialize, Serialize};

/// Number of animals per species
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeciesCounts {
    pub herbivores: usize,
    pub carnivores: usize,
}

impl SpeciesCounts {
    pub fn new(herbivores: usize, carnivores: usize) -> Self {
        Self {
            herbivores,
            carnivores,
        }
    }

    pub fn total(&self) -> usize {
        self.herbivores + self.carnivores
    }

    pub fn get(&self, species: Species) -> usize {
        match species {
            Species::Herbivore => self.herbivores,
            Species::Carnivore => self.carnivores,
        }
    }
}

impl std::ops::AddAssign for SpeciesCounts {
    fn add_assign(&mut self, other: Self) {
        self.herbivores += other.herbivores;
        self.carnivores += other.carnivores;
    }
}

/// Count, mean and range of one sampled property
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleSummary {
    pub count: usize,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

impl SampleSummary {
    pub fn from_values<I: IntoIterator<Item = f64>>(values: I) -> Self {
        let mut summary = Self {
            count: 0,
            mean: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        };
        let mut sum = 0.0;
        for value in values {
            summary.count += 1;
            sum += value;
            summary.min = summary.min.min(value);
            summary.max = summary.max.max(value);
        }
        if summary.count == 0 {
            return Self::default();
        }
        summary.mean = sum / summary.count as f64;
        summary
    }
}

/// Per-animal age, weight and fitness samples for one species
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpeciesSamples {
    pub ages: Vec<u32>,
    pub weights: Vec<f64>,
    pub fitness: Vec<f64>,
}

impl SpeciesSamples {
    pub fn push(&mut self, age: u32, weight: f64, fitness: f64) {
        self.ages.push(age);
        self.weights.push(weight);
        self.fitness.push(fitness);
    }

    pub fn extend(&mut self, other: SpeciesSamples) {
        self.ages.extend(other.ages);
        self.weights.extend(other.weights);
        self.fitness.extend(other.fitness);
    }

    pub fn len(&self) -> usize {
        self.ages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ages.is_empty()
    }

    pub fn age_summary(&self) -> SampleSummary {
        SampleSummary::from_values(self.ages.iter().map(|&a| a as f64))
    }

    pub fn weight_summary(&self) -> SampleSummary {
        SampleSummary::from_values(self.weights.iter().copied())
    }

    pub fn fitness_summary(&self) -> SampleSummary {
        SampleSummary::from_values(self.fitness.iter().copied())
    }
}

/// Island state after a given year
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IslandSnapshot {
    pub year: u32,
    pub counts: SpeciesCounts,
    /// Herbivores per cell, row-major
    pub herbivore_density: Vec<Vec<usize>>,
    /// Carnivores per cell, row-major
    pub carnivore_density: Vec<Vec<usize>>,
    pub herbivores: SpeciesSamples,
    pub carnivores: SpeciesSamples,
}

impl IslandSnapshot {
    pub fn samples(&self, species: Species) -> &SpeciesSamples {
        match species {
            Species::Herbivore => &self.herbivores,
            Species::Carnivore => &self.carnivores,
        }
    }

    pub fn density(&self, species: Species) -> &[Vec<usize>] {
        match species {
            Species::Herbivore => &self.herbivore_density,
            Species::Carnivore => &self.carnivore_density,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_species_counts() {
        let mut counts = SpeciesCounts::new(10, 3);
        assert_eq!(counts.total(), 13);
        counts += SpeciesCounts::new(1, 2);
        assert_eq!(counts.get(Species::Herbivore), 11);
        assert_eq!(counts.get(Species::Carnivore), 5);
    }

    #[test]
    fn test_sample_summary() {
        let summary = SampleSummary::from_values([1.0, 2.0, 6.0]);
        assert_eq!(summary.count, 3);
        assert_eq!(summary.mean, 3.0);
        assert_eq!(summary.min, 1.0);
        assert_eq!(summary.max, 6.0);

        let empty = SampleSummary::from_values(std::iter::empty());
        assert_eq!(empty, SampleSummary::default());
    }

    #[test]
    fn test_species_samples() {
        let mut samples = SpeciesSamples::default();
        samples.push(2, 10.0, 0.5);
        samples.push(4, 20.0, 0.7);

        let mut more = SpeciesSamples::default();
        more.push(6, 30.0, 0.9);
        samples.extend(more);

        assert_eq!(samples.len(), 3);
        assert_eq!(samples.age_summary().mean, 4.0);
        assert_eq!(samples.weight_summary().max, 30.0);
        assert!((samples.fitness_summary().mean - 0.7).abs() < 1e-12);
    }
}
