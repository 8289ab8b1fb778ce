// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Turns a populated grid into an RGBA image.  Brightness is the
//! logarithm of a cell's counter relative to the logarithm of the
//! maximum; anything in the bottom quarter is drawn black.

use image::{Rgba, RgbaImage};
use log::info;
use std::path::Path;

use crate::error::Result;
use crate::grid::Buddhabrot;
use crate::real::Real;

/// Cells dimmer than this fraction of the maximum are black.
const BRIGHTNESS_FLOOR: f64 = 0.25;

/// Colour and blending for the rendered image.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Palette {
    /// The colour of the brightest cells.
    pub colour: [u8; 3],
    /// Put brightness in the alpha channel instead of scaling the
    /// colour.  How this looks depends on the viewer.
    pub alpha: bool,
}

impl Default for Palette {
    fn default() -> Self {
        Palette {
            colour: [0, 0, 255],
            alpha: false,
        }
    }
}

impl Palette {
    /// How bright a cell is, from 0 to 1.
    pub fn brightness(counter: u32, max_count: u32) -> f64 {
        if counter == 0 {
            return 0.0;
        }
        if max_count <= 1 {
            return 1.0;
        }
        let p = (counter as f64).ln() / (max_count as f64).ln();
        if p <= BRIGHTNESS_FLOOR {
            0.0
        } else {
            p.min(1.0)
        }
    }

    /// The pixel for one cell.
    pub fn pixel(&self, counter: u32, max_count: u32) -> Rgba<u8> {
        let p = Palette::brightness(counter, max_count);
        if p == 0.0 {
            return Rgba([0, 0, 0, 255]);
        }
        let [r, g, b] = self.colour;
        if self.alpha {
            Rgba([r, g, b, (p * 255.0) as u8])
        } else {
            let scale = |c: u8| (f64::from(c) * p) as u8;
            Rgba([scale(r), scale(g), scale(b), 255])
        }
    }
}

/// Draw the grid into a `width` by `width` image.  Each pixel samples
/// the cell under it, so the image can be larger or smaller than the
/// grid.
pub fn render_image<F: Real>(result: &Buddhabrot<F>, width: u32, palette: &Palette) -> RgbaImage {
    let grid = &result.grid;
    let n = grid.cells_per_row() as u64;
    let width = width.max(1);
    RgbaImage::from_fn(width, width, |x, y| {
        let row = (u64::from(y) * n / u64::from(width)) as usize;
        let column = (u64::from(x) * n / u64::from(width)) as usize;
        let offset = row * grid.cells_per_row() + column;
        palette.pixel(grid.at(offset).counter(), result.max_count)
    })
}

/// Draw the grid and save it as a PNG.
pub fn write_png<F: Real, P: AsRef<Path>>(
    result: &Buddhabrot<F>,
    path: P,
    width: u32,
    palette: &Palette,
) -> Result<()> {
    let path = path.as_ref();
    render_image(result, width, palette).save(path)?;
    info!("Saved fractal to {}", path.display());
    Ok(())
}
