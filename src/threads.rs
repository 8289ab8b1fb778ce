// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The threaded renderer.  Every sample in the grid is evaluated
//! exactly once, spread across a fixed pool of scoped threads.
//!
//! Work is handed out by striding over rows: worker `k` of `W` takes
//! rows `k`, `k + W`, `k + 2W` and so on.  There is no work stealing;
//! the cost of one sample is roughly uniform across a row, so stripes
//! come out even enough.  Orbits wander over the whole grid, so every
//! worker writes to cells it does not own.  All such writes go through
//! the cells' atomic counters and the shared `MaxCounter`.

use crossbeam::thread::ScopedJoinHandle;
use log::debug;
use std::panic;

use crate::escape::{Evaluator, Mode};
use crate::grid::{Buddhabrot, Grid, MaxCounter};
use crate::planes::Plane;
use crate::real::Real;

/// Worker count used when the host cannot say how many it has.
pub const FALLBACK_WORKERS: usize = 4;

/// The host's parallelism, or `FALLBACK_WORKERS` when it reports none.
pub fn default_workers() -> usize {
    match num_cpus::get() {
        0 => FALLBACK_WORKERS,
        n => n,
    }
}

/// The rows a worker is responsible for.
pub fn stripe(worker: usize, workers: usize, rows: usize) -> impl Iterator<Item = usize> {
    (worker..rows).step_by(workers.max(1))
}

/// Takes a plane, an iteration budget and a mode, and renders the
/// whole grid on the CPU.  Once built this should not change.
pub struct ThreadedRenderer<F> {
    plane: Plane<F>,
    iterations: u32,
    mode: Mode,
}

impl<F: Real> ThreadedRenderer<F> {
    /// Requires the plane to sample, the number of iterations per
    /// orbit, and which orbits count.
    pub fn new(plane: Plane<F>, iterations: u32, mode: Mode) -> Self {
        ThreadedRenderer {
            plane,
            iterations,
            mode,
        }
    }

    /// The single-threaded render, for comparison and small grids.
    pub fn render_single(&self) -> Buddhabrot<F> {
        let grid = Grid::new(self.plane);
        let max = MaxCounter::new();
        {
            let mut evaluator = Evaluator::new(&grid, &max, self.iterations, self.mode);
            for cell in grid.cells() {
                evaluator.evaluate(cell.point());
            }
        }
        Buddhabrot::new(grid, &max)
    }

    /// Render with `workers` threads.  Blocks until every worker has
    /// finished its stripe.
    pub fn render(&self, workers: usize) -> Buddhabrot<F> {
        let grid = Grid::new(self.plane);
        let max = MaxCounter::new();
        let rows = grid.cells_per_row();
        {
            let (grid, max) = (&grid, &max);
            let counted = run_workers(workers, |worker| {
                let mut evaluator = Evaluator::new(grid, max, self.iterations, self.mode);
                let mut escaped = 0_usize;
                for row in stripe(worker, workers, rows) {
                    for cell in grid.row(row) {
                        if evaluator.evaluate(cell.point()) {
                            escaped += 1;
                        }
                    }
                }
                escaped
            });
            for (worker, escaped) in counted.iter().enumerate() {
                debug!("worker {} counted {} orbits", worker, escaped);
            }
        }
        Buddhabrot::new(grid, &max)
    }
}

/// Run `work(k)` for every worker `k` on its own scoped thread and
/// collect the results in worker order.  A worker that panics takes
/// the caller down with it; there are no partial renders.
pub fn run_workers<T, W>(workers: usize, work: W) -> Vec<T>
where
    T: Send,
    W: Fn(usize) -> T + Sync,
{
    let work = &work;
    let result = crossbeam::scope(|spawner| {
        let handles: Vec<ScopedJoinHandle<T>> = (0..workers)
            .map(|worker| spawner.spawn(move |_| work(worker)))
            .collect();
        handles
            .into_iter()
            .map(|handle| match handle.join() {
                Ok(value) => value,
                Err(payload) => panic::resume_unwind(payload),
            })
            .collect::<Vec<T>>()
    });
    match result {
        Ok(values) => values,
        Err(payload) => panic::resume_unwind(payload),
    }
}
