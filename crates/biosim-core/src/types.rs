//! Core type definitions for the simulation.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Unique identifier for an individual animal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnimalId(pub Uuid);

impl AnimalId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AnimalId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AnimalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The two species living on the island
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Species {
    Herbivore,
    Carnivore,
}

impl Species {
    pub fn all() -> [Species; 2] {
        [Species::Herbivore, Species::Carnivore]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Species::Herbivore => "Herbivore",
            Species::Carnivore => "Carnivore",
        }
    }
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Species {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Herbivore" => Ok(Species::Herbivore),
            "Carnivore" => Ok(Species::Carnivore),
            other => Err(Error::Parameter(format!(
                "unknown species '{}', expected Herbivore or Carnivore",
                other
            ))),
        }
    }
}

/// Terrain kind of a single island cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Terrain {
    Water,
    Desert,
    Lowland,
    Highland,
}

impl Terrain {
    /// Map character used in island map text
    pub fn from_code(code: char) -> Option<Terrain> {
        match code {
            'W' => Some(Terrain::Water),
            'D' => Some(Terrain::Desert),
            'L' => Some(Terrain::Lowland),
            'H' => Some(Terrain::Highland),
            _ => None,
        }
    }

    pub fn code(&self) -> char {
        match self {
            Terrain::Water => 'W',
            Terrain::Desert => 'D',
            Terrain::Lowland => 'L',
            Terrain::Highland => 'H',
        }
    }

    pub fn is_habitable(&self) -> bool {
        !matches!(self, Terrain::Water)
    }
}

/// Compass direction used for migration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    North = 0,
    South = 1,
    East = 2,
    West = 3,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
    ];

    /// (row, col) offset of the neighbour in this direction
    pub fn to_delta(&self) -> (isize, isize) {
        match self {
            Direction::North => (-1, 0),
            Direction::South => (1, 0),
            Direction::East => (0, 1),
            Direction::West => (0, -1),
        }
    }

    pub fn opposite(&self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::East => Direction::West,
            Direction::West => Direction::East,
        }
    }

    pub fn index(&self) -> usize {
        *self as usize
    }
}

/// 1-indexed (row, column) location on the island, as used in population records.
///
/// Signed so that records with zero or negative coordinates still parse and
/// are rejected at placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location(pub i64, pub i64);

impl Location {
    pub fn new(row: i64, col: i64) -> Self {
        Self(row, col)
    }

    pub fn row(&self) -> i64 {
        self.0
    }

    pub fn col(&self) -> i64 {
        self.1
    }

    /// Zero-based grid coordinates, or None for a row/column below 1
    pub fn to_grid(&self) -> Option<(usize, usize)> {
        let row = usize::try_from(self.row()).ok()?.checked_sub(1)?;
        let col = usize::try_from(self.col()).ok()?.checked_sub(1)?;
        Some((row, col))
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.0, self.1)
    }
}

/// One animal in a population record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Individual {
    pub species: Species,
    #[serde(default)]
    pub age: u32,
    /// Sampled from the species birth weight distribution when absent
    #[serde(default)]
    pub weight: Option<f64>,
}

impl Individual {
    pub fn new(species: Species, age: u32, weight: f64) -> Self {
        Self {
            species,
            age,
            weight: Some(weight),
        }
    }
}

/// A group of animals to place in one cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationEntry {
    #[serde(rename = "loc")]
    pub location: Location,
    #[serde(rename = "pop")]
    pub population: Vec<Individual>,
}

impl PopulationEntry {
    pub fn new(location: Location, population: Vec<Individual>) -> Self {
        Self {
            location,
            population,
        }
    }

    /// `count` identical animals at one location
    pub fn uniform(location: Location, species: Species, age: u32, weight: f64, count: usize) -> Self {
        Self::new(
            location,
            (0..count)
                .map(|_| Individual::new(species, age, weight))
                .collect(),
        )
    }
}
