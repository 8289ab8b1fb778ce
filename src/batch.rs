// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! How an iteration budget is cut into GPU dispatches.
//!
//! A single dispatch that runs too many iterations can trip the
//! driver's watchdog, so each phase runs `budget / per_batch` full
//! batches and then one short batch for whatever is left.  Trajectory
//! state is carried between batches by the dispatcher; this module
//! only does the arithmetic.

/// Scale factor of the per-batch iteration heuristic.
const HEURISTIC_SCALE: f64 = 3.28E11;

/// Exponent of the per-batch iteration heuristic.
const HEURISTIC_EXPONENT: f64 = -2.06;

/// Anti-mode orbits almost never leave the window, so every point
/// runs its full batch; give each batch an eighth of the work.
const ANTI_DIVISOR: u32 = 8;

/// The default iterations per batch for a grid.  Falls off roughly
/// with the square of the resolution, since every cell is a work
/// item competing for the same time slice.
pub fn default_batch_size(cells_per_row: usize, anti: bool) -> u32 {
    let estimate = HEURISTIC_SCALE * (cells_per_row.max(1) as f64).powf(HEURISTIC_EXPONENT);
    let size = if estimate >= u32::MAX as f64 {
        u32::MAX
    } else {
        (estimate as u32).max(1)
    };
    if anti {
        (size / ANTI_DIVISOR + u32::from(size % ANTI_DIVISOR != 0)).max(1)
    } else {
        size
    }
}

/// One dispatch: run `steps` iterations, the first of which is global
/// iterate number `start`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Batch {
    /// Global index of the first iterate in this batch.
    pub start: u32,
    /// Number of iterates in this batch.
    pub steps: u32,
}

/// The sequence of batches for one phase.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BatchPlan {
    iterations: u32,
    per_batch: u32,
}

impl BatchPlan {
    /// Cut `iterations` into batches of at most `per_batch`.
    pub fn new(iterations: u32, per_batch: u32) -> Self {
        BatchPlan {
            iterations,
            per_batch: per_batch.max(1),
        }
    }

    /// The ceiling on iterations in one batch.
    pub fn per_batch(&self) -> u32 {
        self.per_batch
    }

    /// Number of full-size batches.
    pub fn full_batches(&self) -> u32 {
        self.iterations / self.per_batch
    }

    /// Size of the trailing short batch, zero if the budget divides
    /// evenly.
    pub fn remainder(&self) -> u32 {
        self.iterations % self.per_batch
    }

    /// Total number of dispatches.
    pub fn len(&self) -> u32 {
        self.full_batches() + u32::from(self.remainder() != 0)
    }

    /// Whether there is nothing to dispatch.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The batches, strictly in iteration order.
    pub fn batches(&self) -> impl Iterator<Item = Batch> {
        let per_batch = self.per_batch;
        let full = (0..self.full_batches()).map(move |i| Batch {
            start: i * per_batch,
            steps: per_batch,
        });
        let remainder = self.remainder();
        let start = self.full_batches() * per_batch;
        let tail = Some(Batch {
            start,
            steps: remainder,
        })
        .filter(|b| b.steps != 0);
        full.chain(tail)
    }
}
