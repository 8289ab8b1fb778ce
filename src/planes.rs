// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Contains the Plane struct, which describes the relationship between
//! a square grid of cells and the square window of the complex plane
//! it samples.  The window is described by its left-lower corner and
//! the edge length of one cell; the grid has `cells_per_row` cells on
//! each side.
//!
//! Rows walk the real axis and columns walk the imaginary axis.  When
//! the grid is *built*, row 0 holds the largest real part (the axis is
//! inverted so the image sits upright when drawn); when an orbit is
//! *bucketed*, row 0 is the smallest real part.  Both conventions are
//! load-bearing for reproducing reference output, so both live here.

use num::Complex;

use crate::real::Real;

/// Length of the real axis covered by the standard window.
pub const REAL_SPAN: f64 = 3.5;

/// Left-lower corner of the standard window.
pub const STANDARD_MIN: (f64, f64) = (-2.5, -1.75);

/// Left-lower corner of the on-screen canvas.
pub const SCREEN_MIN: (f64, f64) = (-1.0, -1.0);

/// Length of one side of the on-screen canvas.
pub const SCREEN_SPAN: f64 = 2.0;

/// A `(row, column)` position in the grid.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct CellIndex(pub usize, pub usize);

/// The position of a cell on the `[-1, 1]²` drawing canvas.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ScreenPosition<F> {
    /// Horizontal canvas position of the cell's left edge.
    pub x: F,
    /// Vertical canvas position of the cell's lower edge.
    pub y: F,
}

/// The square window of the complex plane a grid samples.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Plane<F> {
    cells_per_row: usize,
    min: Complex<F>,
    cell_width: F,
}

impl<F: Real> Plane<F> {
    /// Takes the number of cells along each side, the left-lower
    /// corner of the window, and the edge length of one cell.
    pub fn new(cells_per_row: usize, min: Complex<F>, cell_width: F) -> Plane<F> {
        Plane {
            cells_per_row,
            min,
            cell_width,
        }
    }

    /// The window every run uses: 3.5 units of the real axis starting
    /// at `-2.5 - 1.75i`, split into `cells_per_row` cells.
    pub fn standard(cells_per_row: usize) -> Plane<F> {
        let span = F::from_f64_lossy(REAL_SPAN);
        Plane::new(
            cells_per_row,
            Complex::new(
                F::from_f64_lossy(STANDARD_MIN.0),
                F::from_f64_lossy(STANDARD_MIN.1),
            ),
            span / F::from_index(cells_per_row),
        )
    }

    /// Number of cells along each side of the grid.
    pub fn cells_per_row(&self) -> usize {
        self.cells_per_row
    }

    /// The total number of cells in the grid.
    pub fn len(&self) -> usize {
        self.cells_per_row * self.cells_per_row
    }

    /// Describes that the plane has no cells at all.
    pub fn is_empty(&self) -> bool {
        self.cells_per_row == 0
    }

    /// Left-lower corner of the window.
    pub fn min(&self) -> Complex<F> {
        self.min
    }

    /// Edge length of one cell, in plane units.
    pub fn cell_width(&self) -> F {
        self.cell_width
    }

    /// The sample point stored at a grid position.  The row axis is
    /// inverted: row 0 is the right-hand edge of the window.
    pub fn cell_to_point(&self, cell: CellIndex) -> Complex<F> {
        let CellIndex(row, column) = cell;
        let flipped = self.cells_per_row - 1 - row;
        Complex::new(
            self.min.re + self.cell_width * F::from_index(flipped),
            self.min.im + self.cell_width * F::from_index(column),
        )
    }

    /// Given a point on the complex plane, find the cell it falls in
    /// by direct index computation.  Points outside the window (and
    /// NaNs) have no cell.
    pub fn point_to_cell(&self, point: &Complex<F>) -> Option<CellIndex> {
        let row = ((point.re - self.min.re) / self.cell_width).floor();
        let column = ((point.im - self.min.im) / self.cell_width).floor();
        let last = F::from_index(self.cells_per_row) - F::one();
        let zero = F::zero();
        if !(row >= zero && row <= last && column >= zero && column <= last) {
            return None;
        }
        Some(CellIndex(row.to_usize()?, column.to_usize()?))
    }

    /// The linear offset of a cell in row-major storage.
    pub fn offset(&self, cell: CellIndex) -> usize {
        cell.0 * self.cells_per_row + cell.1
    }

    /// Reverses `offset`.
    pub fn index(&self, offset: usize) -> CellIndex {
        CellIndex(offset / self.cells_per_row, offset % self.cells_per_row)
    }

    /// Map a point straight to its row-major offset.
    pub fn point_to_offset(&self, point: &Complex<F>) -> Option<usize> {
        self.point_to_cell(point).map(|cell| self.offset(cell))
    }

    /// Project a sample point onto the drawing canvas.
    pub fn screen_position(&self, point: &Complex<F>) -> ScreenPosition<F> {
        let screen_width = self.screen_cell_width();
        ScreenPosition {
            x: ((self.min.re - point.re) / self.cell_width * screen_width).abs()
                + F::from_f64_lossy(SCREEN_MIN.0),
            y: ((self.min.im - point.im) / self.cell_width * screen_width).abs()
                + F::from_f64_lossy(SCREEN_MIN.1),
        }
    }

    /// Edge length of one cell on the drawing canvas.
    pub fn screen_cell_width(&self) -> F {
        F::from_f64_lossy(SCREEN_SPAN) / F::from_index(self.cells_per_row)
    }
}
