//! The island grid and its annual cycle.
//!
//! Cells live in a flat row-major arena. Every border cell is water, which
//! keeps migration targets in bounds and lets the migration sweep treat only
//! interior cells as sources.

use crate::animal::Animal;
use crate::cell::Cell;
use biosim_core::{
    Direction, Error, Location, ParameterSet, Result, Species, SpeciesCounts, SpeciesSamples,
    Terrain,
};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// What happened on the island during one year
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct YearReport {
    pub fodder_eaten: f64,
    pub herbivores_killed: usize,
    pub births: usize,
    pub migrations: usize,
    pub deaths: usize,
    pub outbreak: bool,
}

#[derive(Debug, Clone)]
pub struct Island {
    rows: usize,
    cols: usize,
    cells: Vec<Cell>,
}

impl Island {
    /// Parse a map of `W`, `D`, `L`, `H` characters, one line per row.
    ///
    /// Surrounding whitespace on each line and blank leading/trailing lines are
    /// ignored. Rows must have equal length and the border must be all water.
    pub fn from_map(map: &str) -> Result<Self> {
        let lines: Vec<&str> = map.lines().map(str::trim).collect();
        let first = lines.iter().position(|line| !line.is_empty());
        let last = lines.iter().rposition(|line| !line.is_empty());
        let (Some(first), Some(last)) = (first, last) else {
            return Err(Error::Map("no island map was given".to_string()));
        };
        let lines = &lines[first..=last];

        let rows = lines.len();
        let cols = lines[0].chars().count();
        let mut cells = Vec::with_capacity(rows * cols);

        for (row, line) in lines.iter().enumerate() {
            let length = line.chars().count();
            if length != cols {
                return Err(Error::Map(format!(
                    "row {} has length {}, expected {}",
                    row + 1,
                    length,
                    cols
                )));
            }
            for (col, code) in line.chars().enumerate() {
                let terrain = Terrain::from_code(code).ok_or_else(|| {
                    Error::Map(format!(
                        "illegal character '{}' at ({}, {})",
                        code,
                        row + 1,
                        col + 1
                    ))
                })?;
                cells.push(Cell::new(terrain));
            }
        }

        let island = Self { rows, cols, cells };
        for row in 0..rows {
            for col in 0..cols {
                let on_border = row == 0 || col == 0 || row == rows - 1 || col == cols - 1;
                if on_border && island.cells[island.index(row, col)].terrain() != Terrain::Water {
                    return Err(Error::Map(format!(
                        "island must be surrounded by water, found {:?} at ({}, {})",
                        island.cells[island.index(row, col)].terrain(),
                        row + 1,
                        col + 1
                    )));
                }
            }
        }

        debug!(rows, cols, "Island map parsed");
        Ok(island)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    fn index(&self, row: usize, col: usize) -> usize {
        row * self.cols + col
    }

    /// Zero-based cell access
    pub fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        if row < self.rows && col < self.cols {
            Some(&self.cells[self.index(row, col)])
        } else {
            None
        }
    }

    /// Iterator over all cells with their zero-based (row, col)
    pub fn iter(&self) -> impl Iterator<Item = ((usize, usize), &Cell)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, cell)| ((i / self.cols, i % self.cols), cell))
    }

    fn neighbor_index(&self, row: usize, col: usize, direction: Direction) -> Option<usize> {
        let (dr, dc) = direction.to_delta();
        let row = row.checked_add_signed(dr)?;
        let col = col.checked_add_signed(dc)?;
        (row < self.rows && col < self.cols).then(|| self.index(row, col))
    }

    /// Resolve a 1-indexed location to a habitable cell index
    fn habitable_index(&self, location: Location) -> Result<usize> {
        let (row, col) = location
            .to_grid()
            .filter(|&(row, col)| row < self.rows && col < self.cols)
            .ok_or_else(|| {
                Error::Placement(format!(
                    "location {} does not exist on a {}x{} island",
                    location, self.rows, self.cols
                ))
            })?;
        let index = self.index(row, col);
        let terrain = self.cells[index].terrain();
        if !terrain.is_habitable() {
            return Err(Error::Placement(format!(
                "animals cannot be placed at {} ({:?})",
                location, terrain
            )));
        }
        Ok(index)
    }

    /// Check that a location exists and can host animals
    pub fn check_location(&self, location: Location) -> Result<()> {
        self.habitable_index(location).map(|_| ())
    }

    /// Put an animal into the cell at a 1-indexed location
    pub fn place(&mut self, location: Location, animal: Animal) -> Result<()> {
        let index = self.habitable_index(location)?;
        self.cells[index].add_animal(animal);
        Ok(())
    }

    pub fn counts(&self) -> SpeciesCounts {
        let mut counts = SpeciesCounts::default();
        for cell in &self.cells {
            counts += cell.counts();
        }
        counts
    }

    /// Number of animals of a species per cell, as a rows x cols matrix
    pub fn density(&self, species: Species) -> Vec<Vec<usize>> {
        self.cells
            .chunks(self.cols)
            .map(|row| row.iter().map(|cell| cell.residents(species).len()).collect())
            .collect()
    }

    pub fn samples(&self, species: Species, params: &ParameterSet) -> SpeciesSamples {
        let mut samples = SpeciesSamples::default();
        for cell in self.cells.iter().filter(|cell| cell.is_occupied()) {
            samples.extend(cell.samples(species, params));
        }
        samples
    }

    /// Advance the island by one year.
    ///
    /// Phases run over the whole grid in order: regrowth, feeding,
    /// reproduction, migration, aging, weight loss, death. `outbreak_fraction`
    /// replaces the regular weight loss in a disease year.
    pub fn annual_cycle<R: Rng + ?Sized>(
        &mut self,
        params: &ParameterSet,
        outbreak_fraction: Option<f64>,
        rng: &mut R,
    ) -> YearReport {
        let mut report = YearReport {
            outbreak: outbreak_fraction.is_some(),
            ..Default::default()
        };

        for cell in self.cells.iter_mut().filter(|cell| cell.is_habitable()) {
            cell.regrow_fodder(params);
        }

        for cell in self.cells.iter_mut().filter(|cell| cell.is_habitable() && cell.is_occupied()) {
            let outcome = cell.feed_all(params, rng);
            report.fodder_eaten += outcome.fodder_eaten;
            report.herbivores_killed += outcome.herbivores_killed;
        }

        for cell in self.cells.iter_mut().filter(|cell| cell.is_habitable() && cell.is_occupied()) {
            report.births += cell.reproduce_all(params, rng);
        }

        report.migrations = self.migrate(params, rng);

        for cell in self.cells.iter_mut().filter(|cell| cell.is_occupied()) {
            cell.age_all();
        }

        for cell in self.cells.iter_mut().filter(|cell| cell.is_occupied()) {
            cell.lose_weight_all(params, outbreak_fraction);
        }

        for cell in self.cells.iter_mut().filter(|cell| cell.is_occupied()) {
            report.deaths += cell.cull_dead(params, rng);
        }

        report
    }

    /// Move migrating animals to neighbouring cells; returns how many moved.
    ///
    /// One raster pass over the grid. Interior cells hand their migrants to the
    /// receiving neighbour's inbound bucket, where they cannot be picked as
    /// migrants again. After visiting (row, col), every neighbour of
    /// (row - 1, col - 1) has been visited, so its buckets are complete and
    /// are merged into its residents.
    pub fn migrate<R: Rng + ?Sized>(&mut self, params: &ParameterSet, rng: &mut R) -> usize {
        if self.rows < 3 || self.cols < 3 {
            return 0;
        }

        let mut moved = 0;
        for row in 1..self.rows {
            for col in 1..self.cols {
                if row < self.rows - 1 && col < self.cols - 1 {
                    moved += self.stage_migrants_from(row, col, params, rng);
                }
                let finished = self.index(row - 1, col - 1);
                self.cells[finished].settle_migrants();
            }
        }

        debug_assert!(self.cells.iter().all(|cell| !cell.has_staged_migrants()));
        moved
    }

    fn stage_migrants_from<R: Rng + ?Sized>(
        &mut self,
        row: usize,
        col: usize,
        params: &ParameterSet,
        rng: &mut R,
    ) -> usize {
        let index = self.index(row, col);
        if !self.cells[index].is_habitable() || !self.cells[index].is_occupied() {
            return 0;
        }

        let neighbors = Direction::ALL.map(|direction| self.neighbor_index(row, col, direction));
        let habitable = neighbors.map(|neighbor| {
            neighbor.map_or(false, |neighbor| self.cells[neighbor].is_habitable())
        });

        let outbound = self.cells[index].stage_outbound_migrants(habitable, params, rng);

        let mut moved = 0;
        for (direction, migrants) in Direction::ALL.into_iter().zip(outbound) {
            if migrants.is_empty() {
                continue;
            }
            let Some(target) = neighbors[direction.index()] else {
                continue;
            };
            moved += migrants.len();
            trace!(row, col, ?direction, count = migrants.len(), "Migrants staged");
            self.cells[target].receive_migrants(direction.opposite(), migrants);
        }
        moved
    }
}
