// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The batched dispatcher.  One phase runs one kernel over a set of
//! sample points for the whole iteration budget, a batch at a time.
//! Between batches the trajectory state makes a round trip through
//! the host: it is uploaded before each dispatch and read back after,
//! so the next batch resumes where the last one stopped.

use log::debug;
use std::fmt;

use super::buffer::{self, Buffer};
use super::kernel::{COUNT_ENTRY_POINT, FILTER_ENTRY_POINT};
use super::Gpu;
use crate::batch::{Batch, BatchPlan};
use crate::error::{Error, Result};
use crate::real::Real;

/// Workgroup size for both kernels is `(1, WORKGROUP_SIZE_Y, 1)`.
pub const WORKGROUP_SIZE_Y: u32 = 64;

/// Corresponds to `DISPATCH_STRIDE / WORKGROUP_SIZE_Y` in the kernel.
pub const DISPATCH_SIZE_Y: u32 = 1024;

/**
Dispatch size for `total_work` points.

`dispatch_workgroups` is limited to 65535 workgroups per dimension, so
the points are laid out over two.  With workgroups of `(1, 64, 1)` and a
`y` dispatch of 1024, one `x` slice covers `1024 * 64 = 65536` points,
and point `global_invocation_id.x * 65536 + global_invocation_id.y` is
handled by exactly one invocation.  Up to 65535 redundant invocations
are dispatched; the kernels ignore indices past the point count.
*/
pub fn dispatch_size(total_work: usize) -> (u32, u32, u32) {
    let x = total_work / (DISPATCH_SIZE_Y * WORKGROUP_SIZE_Y) as usize + 1;
    (x as u32, DISPATCH_SIZE_Y, 1)
}

/// Which kernel a phase runs.  The batching is the same for both;
/// what differs is what the result buffer holds.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum KernelRole {
    /// Decide which points escape, with no bucketing.  The results are
    /// one flag per point.
    Filter,
    /// Re-run escaping points and count every visited cell.  The
    /// results are one counter per grid cell, fresh each batch.
    Count,
}

impl KernelRole {
    fn entry_point(self) -> &'static str {
        match self {
            KernelRole::Filter => FILTER_ENTRY_POINT,
            KernelRole::Count => COUNT_ENTRY_POINT,
        }
    }

    fn results_len(self, points: usize, cells: usize) -> usize {
        match self {
            KernelRole::Filter => points,
            KernelRole::Count => cells,
        }
    }
}

impl fmt::Display for KernelRole {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            KernelRole::Filter => write!(f, "filter"),
            KernelRole::Count => write!(f, "count"),
        }
    }
}

#[repr(C)]
#[derive(bytemuck::Pod, bytemuck::Zeroable, Clone, Copy, Debug)]
struct BatchParams {
    start: u32,
    steps: u32,
    count: u32,
    padding: u32,
}

/// Both compiled kernels, sharing one bind group layout.
pub struct Kernels {
    layout: wgpu::BindGroupLayout,
    filter: wgpu::ComputePipeline,
    count: wgpu::ComputePipeline,
}

fn storage_entry(binding: u32, read_only: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

impl Kernels {
    /// Compile specialised kernel source.  Compilation and validation
    /// errors are captured and returned with the compiler's message.
    pub fn build(gpu: &Gpu, source: &str) -> Result<Kernels> {
        let device = &gpu.device;
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("escape-kernels"),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("escape-bind-group-layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                storage_entry(1, true),
                storage_entry(2, false),
                storage_entry(3, false),
                storage_entry(4, false),
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("escape-pipeline-layout"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });

        let pipeline = |role: KernelRole| {
            device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(role.entry_point()),
                layout: Some(&pipeline_layout),
                module: &module,
                entry_point: role.entry_point(),
            })
        };
        let filter = pipeline(KernelRole::Filter);
        let count = pipeline(KernelRole::Count);

        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            return Err(Error::KernelBuild(error.to_string()));
        }

        Ok(Kernels {
            layout,
            filter,
            count,
        })
    }

    fn pipeline(&self, role: KernelRole) -> &wgpu::ComputePipeline {
        match role {
            KernelRole::Filter => &self.filter,
            KernelRole::Count => &self.count,
        }
    }
}

/// Device-side buffers for one phase, plus the staging buffers used to
/// read them back.
struct PhaseBuffers<F> {
    params: Buffer<BatchParams>,
    origins: Buffer<F>,
    trajectories: Buffer<F>,
    halted: Buffer<u32>,
    results: Buffer<u32>,
    trajectories_out: Buffer<F>,
    halted_out: Buffer<u32>,
    results_out: Buffer<u32>,
}

impl<F: Real> PhaseBuffers<F> {
    fn allocate(gpu: &Gpu, origins: &[F], results_len: usize) -> Result<Self> {
        let device = &gpu.device;
        let points = (origins.len() / 2) as u64;
        let working = wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC;
        let staging = wgpu::BufferUsages::MAP_READ;

        device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        let buffers = PhaseBuffers {
            params: buffer::Builder::new(1)
                .with_label("batch-params")
                .with_usage(wgpu::BufferUsages::UNIFORM)
                .create(device),
            origins: buffer::Builder::from(origins)
                .with_label("origins")
                .with_usage(wgpu::BufferUsages::STORAGE)
                .create(device),
            trajectories: buffer::Builder::new(points * 2)
                .with_label("trajectories")
                .with_usage(working)
                .create(device),
            halted: buffer::Builder::new(points)
                .with_label("halted")
                .with_usage(working)
                .create(device),
            results: buffer::Builder::new(results_len as u64)
                .with_label("results")
                .with_usage(working)
                .create(device),
            trajectories_out: buffer::Builder::new(points * 2)
                .with_label("trajectories-staging")
                .with_usage(staging)
                .create(device),
            halted_out: buffer::Builder::new(points)
                .with_label("halted-staging")
                .with_usage(staging)
                .create(device),
            results_out: buffer::Builder::new(results_len as u64)
                .with_label("results-staging")
                .with_usage(staging)
                .create(device),
        };
        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            return Err(Error::Allocation(error.to_string()));
        }
        Ok(buffers)
    }
}

/// Run one phase of `role` over `origins` (interleaved real and
/// imaginary parts) on a grid of `cells` cells.  After every batch
/// `on_batch` receives that batch's results.  Batches run strictly in
/// order; each is waited on before the next is submitted.
pub fn run_phase<F, B>(
    gpu: &Gpu,
    kernels: &Kernels,
    role: KernelRole,
    origins: &[F],
    cells: usize,
    plan: &BatchPlan,
    mut on_batch: B,
) -> Result<()>
where
    F: Real,
    B: FnMut(Batch, &[u32]),
{
    let points = origins.len() / 2;
    let buffers = PhaseBuffers::allocate(gpu, origins, role.results_len(points, cells))?;

    let bind_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("escape-bind-group"),
        layout: &kernels.layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: buffers.params.binding_resource(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: buffers.origins.binding_resource(),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: buffers.trajectories.binding_resource(),
            },
            wgpu::BindGroupEntry {
                binding: 3,
                resource: buffers.halted.binding_resource(),
            },
            wgpu::BindGroupEntry {
                binding: 4,
                resource: buffers.results.binding_resource(),
            },
        ],
    });

    let mut trajectories = vec![F::zero(); points * 2];
    let mut halted = vec![0_u32; points];
    let (x, y, z) = dispatch_size(points);
    let total = plan.len();

    for (i, batch) in plan.batches().enumerate() {
        buffers.params.write(
            &gpu.queue,
            &[BatchParams {
                start: batch.start,
                steps: batch.steps,
                count: points as u32,
                padding: 0,
            }],
        );
        buffers.trajectories.write(&gpu.queue, &trajectories);
        buffers.halted.write(&gpu.queue, &halted);

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("escape-batch"),
            });
        encoder.clear_buffer(buffers.results.buffer(), 0, None);
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("escape-pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(kernels.pipeline(role));
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups(x, y, z);
        }
        buffers
            .trajectories
            .copy_to(&mut encoder, &buffers.trajectories_out);
        buffers.halted.copy_to(&mut encoder, &buffers.halted_out);
        buffers.results.copy_to(&mut encoder, &buffers.results_out);
        gpu.queue.submit(Some(encoder.finish()));

        trajectories = buffers.trajectories_out.read(&gpu.device)?;
        halted = buffers.halted_out.read(&gpu.device)?;
        let results = buffers.results_out.read(&gpu.device)?;
        trajectories.truncate(points * 2);
        halted.truncate(points);

        debug!("{} batch {}/{}", role, i + 1, total);
        on_batch(batch, &results);
    }
    Ok(())
}
