// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The escape evaluator.  Given one sample point, iterate the
//! Mandelbrot map, bucket each iterate into the cell it lands in, and
//! if the orbit satisfies the escape predicate, count every bucketed
//! visit.
//!
//! An orbit is tracked only while it stays inside the sampled window.
//! The first iterate that lands outside ends the orbit early; the
//! predicate is then judged on that last iterate.

use num::Complex;

use crate::grid::{Grid, MaxCounter};
use crate::planes::Plane;
use crate::real::Real;

/// The escape threshold on the modulus.  Not configurable.
pub const ESCAPE_RADIUS: f64 = 2.0;

/// Which orbits get counted.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Count orbits whose last iterate has modulus above 2.
    Normal,
    /// Count orbits whose last iterate has modulus below 2.
    Anti,
}

impl Mode {
    /// `true` selects `Anti`.
    pub fn from_anti(anti: bool) -> Self {
        if anti {
            Mode::Anti
        } else {
            Mode::Normal
        }
    }

    /// Whether this is the anti-buddhabrot.
    pub fn is_anti(self) -> bool {
        self == Mode::Anti
    }

    /// The escape predicate.  Uses the squared modulus against the
    /// squared radius, so a point sitting exactly on the circle
    /// satisfies neither mode.
    pub fn escaped<F: Real>(self, z: &Complex<F>) -> bool {
        let radius = F::from_f64_lossy(ESCAPE_RADIUS);
        let m = z.norm_sqr();
        match self {
            Mode::Normal => m > radius * radius,
            Mode::Anti => m < radius * radius,
        }
    }
}

/// Follow the orbit of `c` for up to `iterations` steps, pushing the
/// offset of every in-window iterate onto `visited`.  Iterate 0 is
/// never bucketed.  Returns the last iterate computed.
pub fn trace<F: Real>(
    plane: &Plane<F>,
    c: Complex<F>,
    iterations: u32,
    visited: &mut Vec<usize>,
) -> Complex<F> {
    let mut z = Complex::new(F::zero(), F::zero());
    for i in 0..iterations {
        z = z * z + c;
        if i == 0 {
            continue;
        }
        match plane.point_to_offset(&z) {
            Some(offset) => visited.push(offset),
            None => break,
        }
    }
    z
}

/// Evaluates sample points against a shared grid.  Each worker owns
/// one of these; the visited buffer is reused between samples.
pub struct Evaluator<'a, F> {
    grid: &'a Grid<F>,
    max: &'a MaxCounter,
    iterations: u32,
    mode: Mode,
    visited: Vec<usize>,
}

impl<'a, F: Real> Evaluator<'a, F> {
    /// Borrow the grid and the shared maximum for the life of the
    /// evaluator.
    pub fn new(grid: &'a Grid<F>, max: &'a MaxCounter, iterations: u32, mode: Mode) -> Self {
        Evaluator {
            grid,
            max,
            iterations,
            mode,
            visited: Vec::new(),
        }
    }

    /// Run one sample.  A cell visited several times by the same orbit
    /// is counted once per visit.  Returns whether the orbit was
    /// counted.
    pub fn evaluate(&mut self, c: Complex<F>) -> bool {
        self.visited.clear();
        let z = trace(self.grid.plane(), c, self.iterations, &mut self.visited);
        if !self.mode.escaped(&z) {
            return false;
        }
        for &offset in &self.visited {
            let count = self.grid.at(offset).visit();
            self.max.observe(count);
        }
        true
    }
}
