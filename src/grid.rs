// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The sampled field: one `Cell` per sample point, held in a single
//! row-major arena.  Orbits refer to cells by their offset in the
//! arena, never by reference, so any number of workers can share a
//! `&Grid` and bump counters through it.

use itertools::iproduct;
use num::Complex;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::planes::{CellIndex, Plane, ScreenPosition};
use crate::real::Real;

/// One sample of the complex plane, and the number of escaping orbits
/// that have passed through it.
#[derive(Debug)]
pub struct Cell<F> {
    point: Complex<F>,
    screen: ScreenPosition<F>,
    counter: AtomicU32,
}

impl<F: Real> Cell<F> {
    fn new(point: Complex<F>, screen: ScreenPosition<F>, counter: u32) -> Self {
        Cell {
            point,
            screen,
            counter: AtomicU32::new(counter),
        }
    }

    /// The sample point.  Fixed for the life of the cell.
    pub fn point(&self) -> Complex<F> {
        self.point
    }

    /// Where the cell lands on the drawing canvas.
    pub fn screen(&self) -> ScreenPosition<F> {
        self.screen
    }

    /// The current visit count.
    pub fn counter(&self) -> u32 {
        self.counter.load(Ordering::Relaxed)
    }

    /// Add one visit and return the new count.
    ///
    /// TODO: the counter wraps on overflow; decide between saturating
    /// and a 64-bit counter once the CSV format can carry either.
    pub fn visit(&self) -> u32 {
        self.counter.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
    }

    /// Add a batch of visits and return the new count.
    pub fn add(&self, visits: u32) -> u32 {
        self.counter
            .fetch_add(visits, Ordering::Relaxed)
            .wrapping_add(visits)
    }
}

/// The largest counter seen so far, shared by every unit of work in a
/// run.
#[derive(Debug, Default)]
pub struct MaxCounter(AtomicU32);

impl MaxCounter {
    /// Starts at zero.
    pub fn new() -> Self {
        MaxCounter(AtomicU32::new(0))
    }

    /// Record a counter value; the maximum only ever grows.
    pub fn observe(&self, value: u32) {
        self.0.fetch_max(value, Ordering::Relaxed);
    }

    /// The maximum recorded so far.
    pub fn get(&self) -> u32 {
        self.0.load(Ordering::Relaxed)
    }
}

/// A square arena of cells covering a `Plane`.
#[derive(Debug)]
pub struct Grid<F> {
    plane: Plane<F>,
    cells: Vec<Cell<F>>,
}

impl<F: Real> Grid<F> {
    /// Build every cell of the plane with a zero counter.
    pub fn new(plane: Plane<F>) -> Grid<F> {
        let n = plane.cells_per_row();
        let cells = iproduct!(0..n, 0..n)
            .map(|(row, column)| {
                let point = plane.cell_to_point(CellIndex(row, column));
                Cell::new(point, plane.screen_position(&point), 0)
            })
            .collect();
        Grid { plane, cells }
    }

    /// Rebuild a grid from persisted `(point, counter)` pairs in
    /// row-major order.  Returns `None` if the number of samples does
    /// not match the plane.
    pub fn from_samples<I>(plane: Plane<F>, samples: I) -> Option<Grid<F>>
    where
        I: IntoIterator<Item = (Complex<F>, u32)>,
    {
        let cells: Vec<Cell<F>> = samples
            .into_iter()
            .map(|(point, counter)| Cell::new(point, plane.screen_position(&point), counter))
            .collect();
        if cells.len() != plane.len() {
            return None;
        }
        Some(Grid { plane, cells })
    }

    /// The plane this grid samples.
    pub fn plane(&self) -> &Plane<F> {
        &self.plane
    }

    /// Number of cells along each side.
    pub fn cells_per_row(&self) -> usize {
        self.plane.cells_per_row()
    }

    /// Total number of cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether the grid has no cells.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// The cell at a grid position.
    pub fn get(&self, cell: CellIndex) -> &Cell<F> {
        &self.cells[self.plane.offset(cell)]
    }

    /// The cell at a row-major offset.
    pub fn at(&self, offset: usize) -> &Cell<F> {
        &self.cells[offset]
    }

    /// One row of cells.
    pub fn row(&self, row: usize) -> &[Cell<F>] {
        let n = self.cells_per_row();
        &self.cells[row * n..(row + 1) * n]
    }

    /// Every cell in row-major order.
    pub fn cells(&self) -> &[Cell<F>] {
        &self.cells
    }

    /// Snapshot of every counter in row-major order.
    pub fn counters(&self) -> Vec<u32> {
        self.cells.iter().map(Cell::counter).collect()
    }

    /// The largest counter in the grid, found by scanning.
    pub fn scan_max(&self) -> u32 {
        self.cells.iter().map(Cell::counter).max().unwrap_or(0)
    }
}

/// A finished run: the populated grid and its largest counter.  This
/// is what the image and CSV writers consume.
#[derive(Debug)]
pub struct Buddhabrot<F> {
    /// The populated grid.
    pub grid: Grid<F>,
    /// The largest counter in `grid`.
    pub max_count: u32,
}

impl<F: Real> Buddhabrot<F> {
    /// Pair a grid with the maximum reported by the engine that
    /// filled it.
    pub fn new(grid: Grid<F>, max: &MaxCounter) -> Self {
        Buddhabrot {
            grid,
            max_count: max.get(),
        }
    }

    /// Pair a grid with a freshly scanned maximum, as a loader does.
    pub fn rescanned(grid: Grid<F>) -> Self {
        let max_count = grid.scan_max();
        Buddhabrot { grid, max_count }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn new_grid_is_zeroed_and_inverted() {
        let grid = Grid::new(Plane::<f64>::standard(5));
        assert_eq!(grid.len(), 25);
        assert!(grid.counters().iter().all(|&c| c == 0));
        assert_eq!(grid.get(CellIndex(4, 0)).point(), Complex::new(-2.5, -1.75));
        assert_eq!(grid.get(CellIndex(0, 0)).point().re, -2.5 + 0.7 * 4.0);
        assert_eq!(grid.row(2)[3].point(), grid.get(CellIndex(2, 3)).point());
    }

    #[test]
    fn visits_and_adds_accumulate() {
        let grid = Grid::new(Plane::<f64>::standard(3));
        let cell = grid.at(4);
        assert_eq!(cell.visit(), 1);
        assert_eq!(cell.visit(), 2);
        assert_eq!(cell.add(5), 7);
        assert_eq!(grid.get(CellIndex(1, 1)).counter(), 7);
        assert_eq!(grid.scan_max(), 7);
    }

    #[test]
    fn max_counter_only_grows() {
        let max = MaxCounter::new();
        max.observe(3);
        max.observe(1);
        assert_eq!(max.get(), 3);
        max.observe(9);
        assert_eq!(max.get(), 9);
    }

    #[test]
    fn concurrent_visits_are_not_lost() {
        let grid = Arc::new(Grid::new(Plane::<f64>::standard(3)));
        let max = Arc::new(MaxCounter::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let grid = grid.clone();
                let max = max.clone();
                thread::spawn(move || {
                    for _ in 0..10_000 {
                        max.observe(grid.at(0).visit());
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(grid.at(0).counter(), 80_000);
        assert_eq!(max.get(), 80_000);
    }

    #[test]
    fn from_samples_checks_length() {
        let plane = Plane::<f64>::standard(2);
        let samples = vec![(Complex::new(0.0, 0.0), 1); 3];
        assert!(Grid::from_samples(plane, samples).is_none());
        let samples = vec![(Complex::new(0.0, 0.0), 1), (Complex::new(1.0, 0.0), 4)]
            .into_iter()
            .cycle()
            .take(4);
        let loaded = Buddhabrot::rescanned(Grid::from_samples(plane, samples).unwrap());
        assert_eq!(loaded.max_count, 4);
        assert_eq!(loaded.grid.at(1).point(), Complex::new(1.0, 0.0));
    }
}
