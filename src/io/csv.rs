// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The tabular dump: one `real,imaginary,counter` line per cell in
//! row-major order under a fixed header.  Reals are written in their
//! shortest round-trip form, so a dump read back is the grid that was
//! written.

use log::info;
use num::Complex;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::error::{Error, Result};
use crate::grid::{Buddhabrot, Grid};
use crate::planes::Plane;
use crate::real::Real;

/// The first line of every dump.
pub const HEADER: &str = "pixel_real,pixel_imag,counter";

/// Write a grid as CSV to any writer.
pub fn write_grid<F: Real, W: Write>(grid: &Grid<F>, out: &mut W) -> std::io::Result<()> {
    writeln!(out, "{}", HEADER)?;
    for cell in grid.cells() {
        let point = cell.point();
        writeln!(out, "{},{},{}", point.re, point.im, cell.counter())?;
    }
    out.flush()
}

/// Write a grid as CSV to a file.
pub fn write_csv<F: Real, P: AsRef<Path>>(grid: &Grid<F>, path: P) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|e| Error::io(path, e))?;
    let mut out = BufWriter::new(file);
    write_grid(grid, &mut out).map_err(|e| Error::io(path, e))?;
    info!("Saved fractal data to {}", path.display());
    Ok(())
}

fn field<T: std::str::FromStr>(value: Option<&str>, name: &str, line: usize) -> Result<T> {
    let value = value.ok_or_else(|| Error::Csv {
        line,
        reason: format!("missing {}", name),
    })?;
    value.trim().parse().map_err(|_| Error::Csv {
        line,
        reason: format!("could not parse {} {:?}", name, value),
    })
}

/// The exact square root of `n`, if it has one.
fn square_side(n: usize) -> Option<usize> {
    let side = (n as f64).sqrt().round() as usize;
    if side * side == n {
        Some(side)
    } else {
        None
    }
}

/// Read a dump from any reader.  The resolution is inferred from the
/// number of data lines, which must be a perfect square; the maximum
/// is recomputed from the counters.
pub fn read_csv<F: Real, R: Read>(input: R) -> Result<Buddhabrot<F>> {
    let mut samples: Vec<(Complex<F>, u32)> = vec![];
    for (number, line) in BufReader::new(input).lines().enumerate() {
        let line = line.map_err(|e| Error::Csv {
            line: number + 1,
            reason: e.to_string(),
        })?;
        if number == 0 || line.trim().is_empty() {
            continue;
        }
        let mut fields = line.split(',');
        let re: F = field(fields.next(), "real part", number + 1)?;
        let im: F = field(fields.next(), "imaginary part", number + 1)?;
        let counter: u32 = field(fields.next(), "counter", number + 1)?;
        samples.push((Complex::new(re, im), counter));
    }

    let side = square_side(samples.len()).ok_or(Error::NotSquare(samples.len()))?;
    if side == 0 {
        return Err(Error::NotSquare(0));
    }
    let grid = Grid::from_samples(Plane::standard(side), samples)
        .ok_or_else(|| Error::NotSquare(side * side))?;
    Ok(Buddhabrot::rescanned(grid))
}

/// Read a dump from a file.
pub fn load_csv<F: Real, P: AsRef<Path>>(path: P) -> Result<Buddhabrot<F>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    let loaded = read_csv(file)?;
    info!(
        "Loaded fractal of {} x {} cells from {}",
        loaded.grid.cells_per_row(),
        loaded.grid.cells_per_row(),
        path.display()
    );
    Ok(loaded)
}
