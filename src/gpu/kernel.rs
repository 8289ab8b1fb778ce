// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Loading and specialising the escape kernel source.  WGSL has no
//! preprocessor, so the build-time constants are prepended to the
//! source as `const` declarations.  Any change to them means a new
//! shader module.

use num::Complex;
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::escape::ESCAPE_RADIUS;
use crate::planes::Plane;
use crate::real::Real;

/// Entry point of the filter kernel.
pub const FILTER_ENTRY_POINT: &str = "filter_escapes";

/// Entry point of the count kernel.
pub const COUNT_ENTRY_POINT: &str = "count_visits";

/// The values baked into one compiled program.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct KernelConstants<F> {
    /// Grid resolution.
    pub cells_per_row: u32,
    /// Anti-buddhabrot predicate.
    pub anti: bool,
    /// Ceiling on iterations in one dispatch.
    pub iterations_max: u32,
    /// Left-lower corner of the window.
    pub min: Complex<F>,
    /// Edge length of one cell.
    pub cell_width: F,
}

impl<F: Real> KernelConstants<F> {
    /// The constants for a plane.
    pub fn new(plane: &Plane<F>, anti: bool, iterations_max: u32) -> Self {
        KernelConstants {
            cells_per_row: plane.cells_per_row() as u32,
            anti,
            iterations_max,
            min: plane.min(),
            cell_width: plane.cell_width(),
        }
    }

    /// The WGSL declarations for these constants.
    pub fn header(&self) -> String {
        let radius = F::from_f64_lossy(ESCAPE_RADIUS);
        let last = F::from_index(self.cells_per_row as usize) - F::one();
        format!(
            "alias Real = {ty};\n\
             const CELLS_PER_ROW: u32 = {n}u;\n\
             const ANTI: bool = {anti};\n\
             const ITERATIONS_MAX: u32 = {max}u;\n\
             const MIN_RE: Real = {min_re};\n\
             const MIN_IM: Real = {min_im};\n\
             const CELL_WIDTH: Real = {width};\n\
             const LAST_CELL: Real = {last};\n\
             const ZERO: Real = {zero};\n\
             const ESCAPE_RADIUS_SQ: Real = {radius_sq};\n",
            ty = F::WGSL_TYPE,
            n = self.cells_per_row,
            anti = self.anti,
            max = self.iterations_max,
            min_re = self.min.re.wgsl_literal(),
            min_im = self.min.im.wgsl_literal(),
            width = self.cell_width.wgsl_literal(),
            last = last.wgsl_literal(),
            zero = F::zero().wgsl_literal(),
            radius_sq = (radius * radius).wgsl_literal(),
        )
    }

    /// Prepend the constants to the kernel source.
    pub fn specialise(&self, source: &str) -> String {
        format!("{}\n{}", self.header(), source)
    }
}

/// Read the kernel source as text.
pub fn load_source<P: AsRef<Path>>(path: P) -> Result<String> {
    let path = path.as_ref();
    fs::read_to_string(path).map_err(|source| Error::KernelSource {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_bakes_in_constants() {
        let plane = Plane::<f32>::standard(5);
        let header = KernelConstants::new(&plane, true, 1200).header();
        assert!(header.starts_with("alias Real = f32;\n"));
        assert!(header.contains("const CELLS_PER_ROW: u32 = 5u;"));
        assert!(header.contains("const ANTI: bool = true;"));
        assert!(header.contains("const ITERATIONS_MAX: u32 = 1200u;"));
        assert!(header.contains("const MIN_RE: Real = -2.5f;"));
        assert!(header.contains("const MIN_IM: Real = -1.75f;"));
        assert!(header.contains("const CELL_WIDTH: Real = 0.7f;"));
        assert!(header.contains("const LAST_CELL: Real = 4.0f;"));
        assert!(header.contains("const ESCAPE_RADIUS_SQ: Real = 4.0f;"));
    }

    #[test]
    fn double_header_uses_f64() {
        let plane = Plane::<f64>::standard(11);
        let header = KernelConstants::new(&plane, false, 10).header();
        assert!(header.starts_with("alias Real = f64;\n"));
        assert!(header.contains("const ANTI: bool = false;"));
        assert!(header.contains("const MIN_RE: Real = f64(-2.5);"));
        assert!(header.contains("const ZERO: Real = f64(0.0);"));
    }

    fn validate(source: &str, capabilities: naga::valid::Capabilities) {
        let module = match naga::front::wgsl::parse_str(source) {
            Ok(module) => module,
            Err(e) => panic!("{}", e.emit_to_string(source)),
        };
        naga::valid::Validator::new(naga::valid::ValidationFlags::all(), capabilities)
            .validate(&module)
            .unwrap();
    }

    #[test]
    fn specialised_single_kernel_validates() {
        let source = load_source(crate::config::KERNEL_PATH).unwrap();
        for &anti in &[false, true] {
            let constants = KernelConstants::new(&Plane::<f32>::standard(11), anti, 50);
            validate(
                &constants.specialise(&source),
                naga::valid::Capabilities::empty(),
            );
        }
    }

    #[test]
    fn specialised_double_kernel_validates() {
        let source = load_source(crate::config::KERNEL_PATH).unwrap();
        for &anti in &[false, true] {
            let constants = KernelConstants::new(&Plane::<f64>::standard(11), anti, 50);
            validate(
                &constants.specialise(&source),
                naga::valid::Capabilities::FLOAT64,
            );
        }
    }

    #[test]
    fn shipped_kernel_source_loads() {
        let source = load_source(crate::config::KERNEL_PATH).unwrap();
        assert!(source.contains(FILTER_ENTRY_POINT));
        assert!(source.contains(COUNT_ENTRY_POINT));
    }

    #[test]
    fn missing_kernel_source_is_reported() {
        match load_source("no/such/kernel.wgsl") {
            Err(Error::KernelSource { .. }) => {}
            other => panic!("expected KernelSource error, got {:?}", other),
        }
    }
}
