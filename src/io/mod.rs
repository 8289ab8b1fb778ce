// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Writers and readers for finished grids.  A run leaves behind
//! `NAME.png` for looking at and `NAME.csv` for loading again later.

pub mod csv;
pub mod png;

pub use self::csv::{load_csv, read_csv, write_csv};
pub use self::png::{write_png, Palette};
