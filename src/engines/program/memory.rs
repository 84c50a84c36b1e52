use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Scratch matrix shared by every agent of a population.
///
/// Reads take the shared lock and writes the exclusive one, so concurrent
/// agents never observe a half-written row. No ordering across agents is
/// promised.
#[derive(Debug)]
pub struct SharedMemory {
    rows: usize,
    cols: usize,
    cells: RwLock<Vec<f64>>,
}

/// Plain copy of the matrix for checkpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemorySnapshot {
    pub rows: usize,
    pub cols: usize,
    pub cells: Vec<f64>,
}

impl SharedMemory {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            cells: RwLock::new(vec![0.0; rows * cols]),
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn read(&self, row: usize, col: usize) -> f64 {
        if self.rows == 0 || self.cols == 0 {
            return 0.0;
        }
        let row = row % self.rows;
        let col = col % self.cols;
        self.read_cells()[row * self.cols + col]
    }

    /// Chance that a write lands on `row`; peaks at the center row
    pub fn write_probability(&self, row: usize) -> f64 {
        let center = (self.rows / 2) as f64;
        let distance = (row as f64 - center).abs();
        (0.25 - (0.01 * distance).powi(2)).max(0.0)
    }

    /// Copy the register file into each row that wins its draw.
    pub fn write<R: Rng>(&self, registers: &[f64], rng: &mut R) {
        let width = self.cols.min(registers.len());
        if width == 0 {
            return;
        }
        let chosen: Vec<usize> = (0..self.rows)
            .filter(|&row| rng.gen::<f64>() < self.write_probability(row))
            .collect();
        if chosen.is_empty() {
            return;
        }

        let mut cells = self.write_cells();
        for row in chosen {
            let start = row * self.cols;
            cells[start..start + width].copy_from_slice(&registers[..width]);
        }
    }

    pub fn clear(&self) {
        self.write_cells().iter_mut().for_each(|c| *c = 0.0);
    }

    pub fn snapshot(&self) -> MemorySnapshot {
        MemorySnapshot {
            rows: self.rows,
            cols: self.cols,
            cells: self.read_cells().clone(),
        }
    }

    pub fn from_snapshot(snapshot: MemorySnapshot) -> Self {
        let mut cells = snapshot.cells;
        cells.resize(snapshot.rows * snapshot.cols, 0.0);
        Self {
            rows: snapshot.rows,
            cols: snapshot.cols,
            cells: RwLock::new(cells),
        }
    }

    // A writer that panicked mid-copy leaves finite values behind, so the
    // poisoned guard is still usable.
    fn read_cells(&self) -> RwLockReadGuard<'_, Vec<f64>> {
        self.cells.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_cells(&self) -> RwLockWriteGuard<'_, Vec<f64>> {
        self.cells.write().unwrap_or_else(|e| e.into_inner())
    }
}
