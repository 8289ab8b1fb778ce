// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use clap::{App, Arg, ArgMatches};
use log::info;
use std::path::PathBuf;
use std::str::FromStr;

use buddhagrid::io::{load_csv, write_csv, write_png, Palette};
use buddhagrid::real::{precision_name, Real};
use buddhagrid::threads::default_workers;
use buddhagrid::{Buddhabrot, ExecutionMode, GpuOptions, Result, RunConfig};

fn parse_list<T: FromStr>(s: &str, separator: char) -> Option<Vec<T>> {
    s.split(separator)
        .map(|part| T::from_str(part.trim()).ok())
        .collect()
}

fn parse_colour(s: &str) -> Option<[u8; 3]> {
    match parse_list::<u8>(s, ',')?.as_slice() {
        &[r, g, b] => Some([r, g, b]),
        _ => None,
    }
}

fn validate_colour(s: &str, err: &str) -> std::result::Result<(), String> {
    match parse_colour(s) {
        Some(_) => Ok(()),
        None => Err(err.to_string()),
    }
}

fn validate_range<T: FromStr + Ord>(
    s: &str,
    low: T,
    high: T,
    isnotanumber_err: &str,
    isnotinrange_err: &str,
) -> std::result::Result<(), String> {
    match T::from_str(s) {
        Ok(i) => {
            if i >= low && i <= high {
                Ok(())
            } else {
                Err(isnotinrange_err.to_string())
            }
        }
        Err(_) => Err(isnotanumber_err.to_string()),
    }
}

const ANTI: &str = "anti";
const GPU: &str = "gpu";
const SAVE: &str = "save";
const LOAD: &str = "load";
const ALPHA: &str = "alpha";
const WINDOW_WIDTH: &str = "window-width";
const CELLS_PER_ROW: &str = "cells-per-row";
const ITERATIONS: &str = "iterations";
const ITERATIONS_MAX: &str = "iterations-max";
const COLOUR: &str = "colour";
const THREADS: &str = "threads";
const KERNEL: &str = "kernel";

const MAX_THREADS: usize = 4096;

fn args<'a>(default_threads: &'a str) -> ArgMatches<'a> {
    App::new("buddha")
        .version("0.3.0")
        .author("Elf M. Sternberg <elf.sternberg@gmail.com>")
        .about("Buddhabrot cell-grid accumulator")
        .arg(
            Arg::with_name(ANTI)
                .long(ANTI)
                .short("a")
                .help("Render the anti-buddhabrot"),
        )
        .arg(
            Arg::with_name(GPU)
                .long(GPU)
                .short("o")
                .help("Render on the GPU instead of CPU threads"),
        )
        .arg(
            Arg::with_name(SAVE)
                .long(SAVE)
                .short("s")
                .takes_value(true)
                .default_value("buddhabrot")
                .help("Write NAME.png and NAME.csv"),
        )
        .arg(
            Arg::with_name(LOAD)
                .long(LOAD)
                .short("l")
                .takes_value(true)
                .help("Load a CSV dump instead of computing"),
        )
        .arg(
            Arg::with_name(ALPHA)
                .long(ALPHA)
                .short("4")
                .help("Put brightness in the alpha channel"),
        )
        .arg(
            Arg::with_name(WINDOW_WIDTH)
                .long(WINDOW_WIDTH)
                .short("w")
                .takes_value(true)
                .default_value("501")
                .validator(|s| {
                    validate_range(
                        &s,
                        1_u32,
                        65_535,
                        "Could not parse window width",
                        "Window width must be between 1 and 65535",
                    )
                })
                .help("Edge of the output image in pixels"),
        )
        .arg(
            Arg::with_name(CELLS_PER_ROW)
                .long(CELLS_PER_ROW)
                .short("p")
                .takes_value(true)
                .validator(|s| {
                    validate_range(
                        &s,
                        1_usize,
                        65_535,
                        "Could not parse cells per row",
                        "Cells per row must be between 1 and 65535",
                    )
                })
                .help("Grid resolution; defaults to the window width"),
        )
        .arg(
            Arg::with_name(ITERATIONS)
                .long(ITERATIONS)
                .short("i")
                .takes_value(true)
                .default_value("500")
                .validator(|s| {
                    validate_range(
                        &s,
                        0_u32,
                        u32::MAX,
                        "Could not parse iteration count",
                        "Iteration count out of range",
                    )
                })
                .help("Iterations per orbit"),
        )
        .arg(
            Arg::with_name(ITERATIONS_MAX)
                .long(ITERATIONS_MAX)
                .short("m")
                .takes_value(true)
                .default_value("0")
                .validator(|s| {
                    validate_range(
                        &s,
                        0_u32,
                        u32::MAX,
                        "Could not parse iterations per batch",
                        "Iterations per batch out of range",
                    )
                })
                .help("GPU iterations per batch; 0 picks one from the resolution"),
        )
        .arg(
            Arg::with_name(COLOUR)
                .long(COLOUR)
                .short("c")
                .takes_value(true)
                .default_value("0,0,255")
                .validator(|s| validate_colour(&s, "Could not parse colour; expected R,G,B"))
                .help("Colour of the brightest cells"),
        )
        .arg(
            Arg::with_name(THREADS)
                .long(THREADS)
                .short("t")
                .takes_value(true)
                .default_value(default_threads)
                .validator(|s| {
                    validate_range(
                        &s,
                        1,
                        MAX_THREADS,
                        "Could not parse thread count",
                        &format!("Thread count must be between 1 and {}", MAX_THREADS),
                    )
                })
                .help("Number of threads to use in solver"),
        )
        .arg(
            Arg::with_name(KERNEL)
                .long(KERNEL)
                .takes_value(true)
                .default_value(buddhagrid::config::KERNEL_PATH)
                .help("Kernel source for the GPU renderer"),
        )
        .get_matches()
}

// Every value below has been through a validator or has a default.
fn value<T: FromStr>(matches: &ArgMatches, name: &str) -> T {
    match matches.value_of(name).map(T::from_str) {
        Some(Ok(v)) => v,
        _ => unreachable!("{} was validated", name),
    }
}

fn config(matches: &ArgMatches) -> RunConfig {
    let cells_per_row = match matches.value_of(CELLS_PER_ROW) {
        Some(_) => value(matches, CELLS_PER_ROW),
        None => value(matches, WINDOW_WIDTH),
    };
    let mode = if matches.is_present(GPU) {
        ExecutionMode::Gpu(GpuOptions {
            batch_size: match value::<u32>(matches, ITERATIONS_MAX) {
                0 => None,
                n => Some(n),
            },
            kernel_path: PathBuf::from(matches.value_of(KERNEL).unwrap_or_default()),
        })
    } else {
        ExecutionMode::Threads(value(matches, THREADS))
    };
    RunConfig {
        cells_per_row,
        iterations: value(matches, ITERATIONS),
        anti: matches.is_present(ANTI),
        mode,
    }
}

fn finish<F: Real>(
    result: &Buddhabrot<F>,
    save: &str,
    width: u32,
    palette: &Palette,
    csv: bool,
) -> Result<()> {
    info!("Max count := {}", result.max_count);
    write_png(result, format!("{}.png", save), width, palette)?;
    if csv {
        write_csv(&result.grid, format!("{}.csv", save))?;
    }
    Ok(())
}

#[cfg(feature = "gpu")]
fn render_gpu(config: &RunConfig, options: &GpuOptions, out: Output) -> Result<()> {
    use buddhagrid::gpu::{Gpu, Precision};

    let gpu = Gpu::open()?;
    let mode = config.escape_mode();
    let per_batch = config.batch_size();
    match gpu.precision() {
        Precision::Double => {
            let result = gpu.render::<f64>(
                config.cells_per_row,
                config.iterations,
                mode,
                per_batch,
                &options.kernel_path,
            )?;
            out.write(&result)
        }
        Precision::Single => {
            let result = gpu.render::<f32>(
                config.cells_per_row,
                config.iterations,
                mode,
                per_batch,
                &options.kernel_path,
            )?;
            out.write(&result)
        }
    }
}

#[cfg(not(feature = "gpu"))]
fn render_gpu(_: &RunConfig, _: &GpuOptions, _: Output) -> Result<()> {
    Err(buddhagrid::Error::Config(
        "this build has no GPU support; rebuild with --features gpu".to_string(),
    ))
}

struct Output<'a> {
    save: &'a str,
    width: u32,
    palette: Palette,
}

impl<'a> Output<'a> {
    fn write<F: Real>(&self, result: &Buddhabrot<F>) -> Result<()> {
        finish(result, self.save, self.width, &self.palette, true)
    }
}

fn run(matches: &ArgMatches) -> Result<()> {
    let out = Output {
        save: matches.value_of(SAVE).unwrap_or("buddhabrot"),
        width: value(matches, WINDOW_WIDTH),
        palette: Palette {
            colour: matches
                .value_of(COLOUR)
                .and_then(parse_colour)
                .unwrap_or(Palette::default().colour),
            alpha: matches.is_present(ALPHA),
        },
    };

    if let Some(path) = matches.value_of(LOAD) {
        info!("Loading {}", path);
        let result = load_csv::<f64, _>(path)?;
        return finish(&result, out.save, out.width, &out.palette, false);
    }

    let config = config(matches);
    config.validate()?;
    info!(
        "Rendering a {}x{} {} grid, {} iterations per orbit",
        config.cells_per_row,
        config.cells_per_row,
        if config.anti { "anti-buddhabrot" } else { "buddhabrot" },
        config.iterations
    );

    match &config.mode {
        ExecutionMode::Threads(workers) => {
            info!(
                "Using {} threads, {}-bit ({}) floating point precision",
                workers,
                f64::PRECISION,
                precision_name::<f64>()
            );
            let result = buddhagrid::render_threaded(&config)?;
            out.write(&result)
        }
        ExecutionMode::Gpu(options) => render_gpu(&config, options, out),
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let default_threads = default_workers().to_string();
    let matches = args(&default_threads);

    if let Err(e) = run(&matches) {
        eprintln!("Render failure: {}", e);
        std::process::exit(1);
    }
}
