#![deny(missing_docs)]
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Buddhabrot accumulator
//!
//! The Buddhabrot is a variant of the Mandelbrot set that explores
//! "what's in the black heart" of the Mandelbrot.  Every point `c` of a
//! square region of the complex plane is iterated as `z = z² + c`,
//! starting from zero.  Each iterate is itself a coordinate on the
//! plane; mapping it to the cell of the grid that contains it and
//! incrementing that cell's counter plots the "orbit" of the point.
//!
//! Only some orbits are kept.  A Buddhabrot keeps the orbits of points
//! that escape (land outside the radius-2 disc after the whole
//! budget); an anti-Buddhabrot keeps the orbits of points that stay
//! inside.  An orbit that leaves the window stops contributing there
//! and then.
//!
//! There are two engines that compute the same grid: a striped pool of
//! CPU threads (`threads`) and, behind the `gpu` feature, a batched
//! compute pipeline (`gpu`).  Either one yields a `Buddhabrot`: the
//! populated grid and its maximum counter, ready for the writers in
//! `io`.

pub mod batch;
pub mod config;
pub mod error;
pub mod escape;
#[cfg(feature = "gpu")]
pub mod gpu;
pub mod grid;
pub mod io;
pub mod planes;
pub mod real;
pub mod threads;

pub use config::{ExecutionMode, GpuOptions, RunConfig};
pub use error::{Error, Result};
pub use escape::Mode;
pub use grid::{Buddhabrot, Cell, Grid, MaxCounter};
pub use planes::{CellIndex, Plane};
pub use real::Real;
pub use threads::ThreadedRenderer;

/// Validate `config` and render it on the CPU.  A GPU configuration is
/// refused; the engine is never picked on the caller's behalf.
pub fn render_threaded(config: &RunConfig) -> Result<Buddhabrot<f64>> {
    config.validate()?;
    let workers = match config.mode {
        ExecutionMode::Threads(workers) => workers,
        ExecutionMode::Gpu(_) => {
            return Err(Error::Config(
                "a GPU configuration cannot be rendered on CPU threads".to_string(),
            ))
        }
    };
    let renderer = ThreadedRenderer::new(
        Plane::standard(config.cells_per_row),
        config.iterations,
        config.escape_mode(),
    );
    Ok(renderer.render(workers))
}
