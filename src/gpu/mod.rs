// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The GPU renderer.  Same result as the threaded renderer, computed
//! in two phases of batched compute dispatches:
//!
//! 1. *Filter* runs every sample point for the whole budget and keeps
//!    only the escape verdict.  No bucketing, so it is cheap.
//! 2. *Count* re-runs just the points that escaped, from scratch, and
//!    this time counts every cell their orbits visit.
//!
//! Setup failures (no adapter, no device, unreadable or broken kernel,
//! out of device memory) are errors; there is no silent fallback to
//! the CPU.

mod buffer;
pub mod dispatch;
pub mod kernel;

use log::info;
use std::path::Path;

use self::dispatch::{run_phase, KernelRole, Kernels};
use self::kernel::{load_source, KernelConstants};
use crate::batch::BatchPlan;
use crate::error::{Error, Result};
use crate::escape::Mode;
use crate::grid::{Buddhabrot, Grid, MaxCounter};
use crate::planes::Plane;
use crate::real::{precision_name, Real};

/// Floating-point width the device computes in.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Precision {
    /// 32-bit.
    Single,
    /// 64-bit.
    Double,
}

/// An open device and its queue.
pub struct Gpu {
    device: wgpu::Device,
    queue: wgpu::Queue,
    precision: Precision,
    adapter_name: String,
}

impl Gpu {
    /// Find a high-performance adapter and open a device on it,
    /// turning on 64-bit shader arithmetic when the adapter has it.
    pub fn open() -> Result<Gpu> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            force_fallback_adapter: false,
            compatible_surface: None,
        }))
        .ok_or(Error::AdapterNotFound)?;

        let (precision, required_features) =
            if adapter.features().contains(wgpu::Features::SHADER_F64) {
                (Precision::Double, wgpu::Features::SHADER_F64)
            } else {
                (Precision::Single, wgpu::Features::empty())
            };

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("buddhagrid-device"),
                required_features,
                required_limits: adapter.limits(),
            },
            None,
        ))
        .map_err(|e| Error::Device(e.to_string()))?;

        let adapter_name = adapter.get_info().name;
        info!("Using GPU adapter {}", adapter_name);

        Ok(Gpu {
            device,
            queue,
            precision,
            adapter_name,
        })
    }

    /// What the device computes in.  Render with `f64` only when this
    /// is `Double`.
    pub fn precision(&self) -> Precision {
        self.precision
    }

    /// The adapter's name, as the driver reports it.
    pub fn adapter_name(&self) -> &str {
        &self.adapter_name
    }

    /// Render a `cells_per_row` grid of the standard window.
    ///
    /// Each phase is cut into batches of at most `per_batch`
    /// iterations; `kernel_path` is the WGSL source to specialise.
    pub fn render<F: Real>(
        &self,
        cells_per_row: usize,
        iterations: u32,
        mode: Mode,
        per_batch: u32,
        kernel_path: &Path,
    ) -> Result<Buddhabrot<F>> {
        info!(
            "Using {}-bit ({}) floating point precision",
            F::PRECISION,
            precision_name::<F>()
        );
        info!("Iterations per group := {}", per_batch);

        let plane = Plane::<F>::standard(cells_per_row);
        let grid = Grid::new(plane);
        let max = MaxCounter::new();

        let source = load_source(kernel_path)?;
        let constants = KernelConstants::new(&plane, mode.is_anti(), per_batch);
        let kernels = Kernels::build(self, &constants.specialise(&source))?;
        let plan = BatchPlan::new(iterations, per_batch);

        let origins: Vec<F> = grid
            .cells()
            .iter()
            .flat_map(|cell| [cell.point().re, cell.point().im])
            .collect();
        let points = grid.len();
        let mut escapes = vec![0_u32; points];
        run_phase(
            self,
            &kernels,
            KernelRole::Filter,
            &origins,
            points,
            &plan,
            |_, flags| escapes.copy_from_slice(&flags[..points]),
        )?;

        let escaping: Vec<usize> = escapes
            .iter()
            .enumerate()
            .filter(|(_, flag)| **flag != 0)
            .map(|(offset, _)| offset)
            .collect();
        info!(
            "Correctly escaping points found := {}/{}",
            escaping.len(),
            grid.len()
        );

        if !escaping.is_empty() {
            let origins: Vec<F> = escaping
                .iter()
                .flat_map(|&offset| {
                    let point = grid.at(offset).point();
                    [point.re, point.im]
                })
                .collect();
            run_phase(
                self,
                &kernels,
                KernelRole::Count,
                &origins,
                grid.len(),
                &plan,
                |_, visits| {
                    for (offset, &count) in visits.iter().enumerate().take(grid.len()) {
                        if count != 0 {
                            max.observe(grid.at(offset).add(count));
                        }
                    }
                },
            )?;
        }

        Ok(Buddhabrot::new(grid, &max))
    }
}
