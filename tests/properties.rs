// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use buddhagrid::escape::trace;
use buddhagrid::io::{load_csv, write_csv};
use buddhagrid::{
    render_threaded, CellIndex, Error, ExecutionMode, GpuOptions, Mode, Plane, RunConfig,
    ThreadedRenderer,
};
use num::Complex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn rows(counters: &[u32], n: usize) -> Vec<Vec<u32>> {
    counters.chunks(n).map(|row| row.to_vec()).collect()
}

#[test]
fn every_in_window_iterate_lands_in_the_grid() {
    let plane = Plane::<f64>::standard(37);
    let mut rng = StdRng::seed_from_u64(0x00b0_dd4a);
    for _ in 0..10_000 {
        let point = Complex::new(rng.gen_range(-2.5..1.0), rng.gen_range(-1.75..1.75));
        let CellIndex(row, column) = plane
            .point_to_cell(&point)
            .expect("point inside the window has a cell");
        assert!(row < 37 && column < 37);
    }
    for _ in 0..10_000 {
        let point = Complex::new(rng.gen_range(1.0..10.0), rng.gen_range(-10.0..10.0));
        assert_eq!(plane.point_to_cell(&point), None);
    }
}

#[test]
fn traced_offsets_are_in_bounds() {
    let plane = Plane::<f64>::standard(23);
    let mut rng = StdRng::seed_from_u64(7);
    let mut visited = vec![];
    for _ in 0..500 {
        let c = Complex::new(rng.gen_range(-2.5..1.0), rng.gen_range(-1.75..1.75));
        visited.clear();
        trace(&plane, c, 200, &mut visited);
        assert!(visited.iter().all(|&offset| offset < plane.len()));
    }
}

#[test]
fn zero_iterations_count_nothing() {
    for &mode in &[Mode::Normal, Mode::Anti] {
        let result = ThreadedRenderer::new(Plane::<f64>::standard(15), 0, mode).render(3);
        assert!(result.grid.counters().iter().all(|&c| c == 0));
        assert_eq!(result.max_count, 0);
    }
}

#[test]
fn maximum_matches_the_largest_counter() {
    for &n in &[5, 11, 31] {
        for &mode in &[Mode::Normal, Mode::Anti] {
            let result = ThreadedRenderer::new(Plane::<f64>::standard(n), 80, mode).render(4);
            assert_eq!(result.max_count, result.grid.scan_max());
        }
    }
}

#[test]
fn csv_dump_loads_back_identically() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dump.csv");
    let result = ThreadedRenderer::new(Plane::<f64>::standard(17), 120, Mode::Normal).render(2);
    write_csv(&result.grid, &path).unwrap();

    let loaded = load_csv::<f64, _>(&path).unwrap();
    assert_eq!(loaded.grid.cells_per_row(), 17);
    assert_eq!(loaded.max_count, result.max_count);
    for (a, b) in result.grid.cells().iter().zip(loaded.grid.cells()) {
        assert_eq!(a.point(), b.point());
        assert_eq!(a.counter(), b.counter());
    }
}

#[test]
fn worker_count_does_not_change_the_result() {
    let renderer = ThreadedRenderer::new(Plane::<f64>::standard(29), 150, Mode::Normal);
    let single = renderer.render_single();
    for &workers in &[1, 2, 8] {
        let result = renderer.render(workers);
        assert_eq!(result.grid.counters(), single.grid.counters());
        assert_eq!(result.max_count, single.max_count);
    }
}

#[test]
fn small_buddhabrot_matches_reference_grid() {
    let result = ThreadedRenderer::new(Plane::<f64>::standard(5), 10, Mode::Normal).render(2);
    assert_eq!(
        rows(&result.grid.counters(), 5),
        vec![
            vec![1, 0, 0, 0, 1],
            vec![0, 2, 2, 2, 0],
            vec![2, 0, 0, 0, 2],
            vec![0, 1, 0, 1, 0],
            vec![0, 2, 0, 2, 0],
        ]
    );
    assert_eq!(result.max_count, 2);

    // Rows run down the real axis from the right-hand edge; columns run
    // up the imaginary axis.
    let reals = [
        0.2999999999999998,
        -0.40000000000000036,
        -1.1,
        -1.8,
        -2.5,
    ];
    let imags = [
        -1.75,
        -1.05,
        -0.3500000000000001,
        0.34999999999999964,
        1.0499999999999998,
    ];
    for (row, &re) in reals.iter().enumerate() {
        for (column, &im) in imags.iter().enumerate() {
            let point = result.grid.get(CellIndex(row, column)).point();
            assert_eq!(point, Complex::new(re, im), "cell ({}, {})", row, column);
        }
    }
}

#[test]
fn small_anti_buddhabrot_matches_reference_grid() {
    let plane = Plane::<f64>::standard(5);
    let anti = ThreadedRenderer::new(plane, 10, Mode::Anti).render(3);
    assert_eq!(
        rows(&anti.grid.counters(), 5),
        vec![
            vec![0, 0, 0, 0, 0],
            vec![0, 0, 2, 0, 0],
            vec![0, 0, 2, 0, 0],
            vec![0, 7, 20, 7, 0],
            vec![0, 0, 0, 0, 0],
        ]
    );
    assert_eq!(anti.max_count, 20);

    let normal = ThreadedRenderer::new(plane, 10, Mode::Normal).render(3);
    assert_ne!(anti.grid.counters(), normal.grid.counters());
}

#[test]
fn larger_grids_match_reference_totals() {
    let plane = Plane::<f64>::standard(11);
    let normal = ThreadedRenderer::new(plane, 50, Mode::Normal).render(4);
    assert_eq!(normal.grid.counters().iter().sum::<u32>(), 132);
    assert_eq!(normal.max_count, 4);

    let anti = ThreadedRenderer::new(plane, 50, Mode::Anti).render(4);
    assert_eq!(anti.grid.counters().iter().sum::<u32>(), 792);
    assert_eq!(anti.max_count, 131);
}

#[test]
fn threaded_render_refuses_a_gpu_configuration() {
    let config = RunConfig {
        cells_per_row: 5,
        iterations: 10,
        mode: ExecutionMode::Gpu(GpuOptions::default()),
        ..RunConfig::default()
    };
    assert!(matches!(render_threaded(&config), Err(Error::Config(_))));

    let config = RunConfig {
        mode: ExecutionMode::Threads(2),
        ..config
    };
    assert_eq!(render_threaded(&config).unwrap().max_count, 2);
}

#[test]
fn orbit_ending_on_the_escape_circle_counts_in_neither_mode() {
    // c = -2 goes -2, 2, 2, 2, ... and finishes with |z|² exactly 4.
    let plane = Plane::new(5, Complex::new(-2.5_f64, -2.5), 1.0);
    let grid = buddhagrid::Grid::new(plane);
    let max = buddhagrid::MaxCounter::new();
    for &mode in &[Mode::Normal, Mode::Anti] {
        let mut evaluator = buddhagrid::escape::Evaluator::new(&grid, &max, 8, mode);
        assert!(!evaluator.evaluate(Complex::new(-2.0, 0.0)));
    }
    assert_eq!(grid.scan_max(), 0);
    assert_eq!(max.get(), 0);
}
