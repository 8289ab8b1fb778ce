// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! These need an adapter.  On a machine without one every test returns
//! early and passes.

#![cfg(feature = "gpu")]

use buddhagrid::config::KERNEL_PATH;
use buddhagrid::gpu::{Gpu, Precision};
use buddhagrid::{Buddhabrot, Mode, Plane, Real, ThreadedRenderer};
use std::path::Path;

fn open() -> Option<Gpu> {
    match Gpu::open() {
        Ok(gpu) => Some(gpu),
        Err(e) => {
            eprintln!("skipping GPU test: {}", e);
            None
        }
    }
}

fn render<F: Real>(gpu: &Gpu, n: usize, iterations: u32, mode: Mode, per_batch: u32) -> Buddhabrot<F> {
    gpu.render::<F>(n, iterations, mode, per_batch, Path::new(KERNEL_PATH))
        .expect("GPU render")
}

// Device arithmetic may contract multiplies and adds, so a handful of
// orbits can diverge from the host's; the totals must stay close.
fn assert_close<F: Real>(gpu: &Buddhabrot<F>, cpu: &Buddhabrot<F>) {
    let gpu = gpu.grid.counters();
    let cpu = cpu.grid.counters();
    assert_eq!(gpu.len(), cpu.len());
    let total: u64 = cpu.iter().map(|&c| u64::from(c)).sum();
    let difference: u64 = gpu
        .iter()
        .zip(&cpu)
        .map(|(&a, &b)| u64::from(a.max(b) - a.min(b)))
        .sum();
    assert!(
        difference * 50 <= total.max(50),
        "GPU and CPU disagree by {} of {} visits",
        difference,
        total
    );
}

fn compare<F: Real>(gpu: &Gpu, mode: Mode) {
    let n = 41;
    let iterations = 200;
    let device = render::<F>(gpu, n, iterations, mode, iterations);
    let host = ThreadedRenderer::new(Plane::<F>::standard(n), iterations, mode).render(4);
    assert_close(&device, &host);
}

#[test]
fn gpu_matches_threads() {
    let gpu = match open() {
        Some(gpu) => gpu,
        None => return,
    };
    for &mode in &[Mode::Normal, Mode::Anti] {
        match gpu.precision() {
            Precision::Double => compare::<f64>(&gpu, mode),
            Precision::Single => compare::<f32>(&gpu, mode),
        }
    }
}

fn exact<F: Real>(gpu: &Gpu) {
    let host = |mode| ThreadedRenderer::new(Plane::<F>::standard(11), 50, mode).render(2);
    for &mode in &[Mode::Normal, Mode::Anti] {
        let expected = host(mode);
        for &per_batch in &[50, 7, 1] {
            let device = render::<F>(gpu, 11, 50, mode, per_batch);
            assert_eq!(device.grid.counters(), expected.grid.counters());
            assert_eq!(device.max_count, expected.max_count);
        }
    }
}

#[test]
fn small_gpu_grid_matches_threads_exactly() {
    let gpu = match open() {
        Some(gpu) => gpu,
        None => return,
    };
    match gpu.precision() {
        Precision::Double => exact::<f64>(&gpu),
        Precision::Single => exact::<f32>(&gpu),
    }
}

#[test]
fn batching_does_not_change_the_result() {
    let gpu = match open() {
        Some(gpu) => gpu,
        None => return,
    };
    let whole = render::<f32>(&gpu, 31, 100, Mode::Normal, 100);
    let batched = render::<f32>(&gpu, 31, 100, Mode::Normal, 7);
    assert_eq!(whole.grid.counters(), batched.grid.counters());
    assert_eq!(whole.max_count, batched.max_count);
}

#[test]
fn zero_iterations_count_nothing_on_the_gpu() {
    let gpu = match open() {
        Some(gpu) => gpu,
        None => return,
    };
    for &mode in &[Mode::Normal, Mode::Anti] {
        let result = render::<f32>(&gpu, 9, 0, mode, 10);
        assert!(result.grid.counters().iter().all(|&c| c == 0));
        assert_eq!(result.max_count, 0);
    }
}

#[test]
fn missing_kernel_source_is_an_error() {
    let gpu = match open() {
        Some(gpu) => gpu,
        None => return,
    };
    let result = gpu.render::<f32>(9, 10, Mode::Normal, 10, Path::new("no/such/kernel.wgsl"));
    assert!(matches!(result, Err(buddhagrid::Error::KernelSource { .. })));
}

#[test]
fn broken_kernel_reports_the_compiler_diagnostic() {
    let gpu = match open() {
        Some(gpu) => gpu,
        None => return,
    };
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.wgsl");
    std::fs::write(&path, "fn {\n").unwrap();
    match gpu.render::<f32>(9, 10, Mode::Normal, 10, &path) {
        Err(buddhagrid::Error::KernelBuild(message)) => {
            assert!(message.contains("expected identifier"), "{}", message)
        }
        Err(e) => panic!("expected a kernel build error, got {}", e),
        Ok(_) => panic!("a broken kernel rendered"),
    }
}
