// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Run configuration.  Fixed before the first sample is evaluated and
//! never changed during a run.

use std::path::PathBuf;

use crate::batch::default_batch_size;
use crate::error::{Error, Result};
use crate::escape::Mode;
use crate::threads::default_workers;

/// Where the kernel source is read from, relative to the working
/// directory.
pub const KERNEL_PATH: &str = "kernels/escape.wgsl";

/// Knobs that only the GPU engine reads.
#[derive(Clone, Debug, PartialEq)]
pub struct GpuOptions {
    /// Iterations per dispatch.  `None` uses the resolution heuristic.
    pub batch_size: Option<u32>,
    /// The kernel source file.
    pub kernel_path: PathBuf,
}

impl Default for GpuOptions {
    fn default() -> Self {
        GpuOptions {
            batch_size: None,
            kernel_path: PathBuf::from(KERNEL_PATH),
        }
    }
}

/// Which engine a run uses.  Never both.
#[derive(Clone, Debug, PartialEq)]
pub enum ExecutionMode {
    /// The threaded CPU engine with this many workers.
    Threads(usize),
    /// The batched GPU engine.
    Gpu(GpuOptions),
}

impl Default for ExecutionMode {
    fn default() -> Self {
        ExecutionMode::Threads(default_workers())
    }
}

/// Everything a run needs to know.
#[derive(Clone, Debug, PartialEq)]
pub struct RunConfig {
    /// The grid's resolution; there are this many cells per side.
    pub cells_per_row: usize,
    /// Iterations per orbit.  Zero is legal and counts nothing.
    pub iterations: u32,
    /// Render the anti-buddhabrot.
    pub anti: bool,
    /// Which engine to use.
    pub mode: ExecutionMode,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            cells_per_row: 501,
            iterations: 500,
            anti: false,
            mode: ExecutionMode::default(),
        }
    }
}

impl RunConfig {
    /// Reject configurations no engine can run.
    pub fn validate(&self) -> Result<()> {
        if self.cells_per_row == 0 {
            return Err(Error::Config("cells per row must be positive".to_string()));
        }
        match self.mode {
            ExecutionMode::Threads(0) => {
                Err(Error::Config("thread count must be positive".to_string()))
            }
            ExecutionMode::Gpu(GpuOptions {
                batch_size: Some(0),
                ..
            }) => Err(Error::Config(
                "iterations per batch must be positive".to_string(),
            )),
            _ => Ok(()),
        }
    }

    /// The escape predicate this run counts with.
    pub fn escape_mode(&self) -> Mode {
        Mode::from_anti(self.anti)
    }

    /// Iterations per GPU dispatch: the override if one was given,
    /// otherwise the heuristic for this grid and mode.
    pub fn batch_size(&self) -> u32 {
        match &self.mode {
            ExecutionMode::Gpu(GpuOptions {
                batch_size: Some(size),
                ..
            }) => *size,
            _ => default_batch_size(self.cells_per_row, self.anti),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gpu(batch_size: Option<u32>) -> RunConfig {
        RunConfig {
            cells_per_row: 2001,
            mode: ExecutionMode::Gpu(GpuOptions {
                batch_size,
                ..GpuOptions::default()
            }),
            ..RunConfig::default()
        }
    }

    #[test]
    fn default_config_is_valid() {
        assert!(RunConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_sized_grid_is_rejected() {
        let config = RunConfig {
            cells_per_row: 0,
            ..RunConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_threads_is_rejected() {
        let config = RunConfig {
            mode: ExecutionMode::Threads(0),
            ..RunConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_batch_override_is_rejected() {
        assert!(gpu(Some(0)).validate().is_err());
        assert!(gpu(Some(1)).validate().is_ok());
    }

    #[test]
    fn batch_override_wins_over_heuristic() {
        assert_eq!(gpu(Some(1234)).batch_size(), 1234);
        assert_eq!(gpu(None).batch_size(), default_batch_size(2001, false));
    }

    #[test]
    fn anti_override_is_not_divided() {
        let mut config = gpu(Some(800));
        config.anti = true;
        assert_eq!(config.batch_size(), 800);
        assert_eq!(config.escape_mode(), Mode::Anti);
    }
}
