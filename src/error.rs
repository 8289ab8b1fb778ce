// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors.  GPU setup failures are all fatal and every one of them
//! says what to try next; the binary prints the message and exits.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Everything that can stop a run.
#[derive(Debug, Error)]
pub enum Error {
    /// The run configuration makes no sense.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Reading or writing an output file failed.
    #[error("i/o error on {}: {}", .path.display(), .source)]
    Io {
        /// The file involved.
        path: PathBuf,
        /// What went wrong.
        #[source]
        source: io::Error,
    },

    /// The PNG encoder failed.
    #[error("could not write image: {0}")]
    Image(#[from] image::ImageError),

    /// A line of a CSV dump could not be read.
    #[error("malformed csv at line {line}: {reason}")]
    Csv {
        /// One-based line number.
        line: usize,
        /// What was wrong with it.
        reason: String,
    },

    /// A CSV dump whose row count is not a perfect square.
    #[error("csv has {0} data rows, which is not a square grid")]
    NotSquare(usize),

    /// No adapter was found.
    #[error("no GPU adapter found. Check the graphics driver install or use the threaded renderer")]
    AdapterNotFound,

    /// The adapter refused to hand out a device.
    #[error("could not open a GPU device ({0}). Check the graphics driver install or use the threaded renderer")]
    Device(String),

    /// The kernel source file could not be read.
    #[error(
        "could not read kernel source {}: {}. Run from the directory that contains kernels/",
        .path.display(),
        .source
    )]
    KernelSource {
        /// Where we looked.
        path: PathBuf,
        /// Why it failed.
        #[source]
        source: io::Error,
    },

    /// The kernel did not compile or a pipeline could not be built.
    #[error("failed to build the escape kernel. Check the graphics driver install or use the threaded renderer\n{0}")]
    KernelBuild(String),

    /// Device memory could not be allocated.
    #[error("failed to allocate device memory ({0}). Use a lower resolution or iteration count")]
    Allocation(String),

    /// A result buffer could not be read back.
    #[error("failed to read results back from the GPU ({0}). Use a lower iterations-per-batch value")]
    Readback(String),
}

impl Error {
    /// Attach a path to an I/O error.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

/// Shorthand used across the crate.
pub type Result<T> = std::result::Result<T, Error>;
