// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The floating-point type used for plane coordinates and trajectory
//! arithmetic.  Everything downstream of the configuration is generic
//! over a `Real`, and a run picks exactly one: the threaded engine
//! uses `f64`, the GPU engine uses whatever the device can do.

use num::{Float, FromPrimitive, ToPrimitive};
use std::fmt::{Debug, Display};
use std::str::FromStr;

/// A floating-point type that can live on both sides of the
/// host/device boundary.
pub trait Real:
    Float
    + FromPrimitive
    + ToPrimitive
    + FromStr
    + Debug
    + Display
    + Default
    + bytemuck::Pod
    + Send
    + Sync
    + 'static
{
    /// Width of the representation, in bits.
    const PRECISION: u32;

    /// The name of this type in WGSL.
    const WGSL_TYPE: &'static str;

    /// The WGSL spelling of this value, typed so that the shader
    /// compiler does not fall back to an abstract float.
    fn wgsl_literal(self) -> String;

    /// Lossless-enough conversion from the `f64` constants used to
    /// describe the plane.
    fn from_f64_lossy(v: f64) -> Self;

    /// Conversion from a grid index.
    fn from_index(v: usize) -> Self;
}

impl Real for f32 {
    const PRECISION: u32 = 32;
    const WGSL_TYPE: &'static str = "f32";

    fn wgsl_literal(self) -> String {
        format!("{:?}f", self)
    }

    fn from_f64_lossy(v: f64) -> Self {
        v as f32
    }

    fn from_index(v: usize) -> Self {
        v as f32
    }
}

impl Real for f64 {
    const PRECISION: u32 = 64;
    const WGSL_TYPE: &'static str = "f64";

    // naga will not negate an `lf` literal, so go through the
    // constructor instead.
    fn wgsl_literal(self) -> String {
        format!("f64({:?})", self)
    }

    fn from_f64_lossy(v: f64) -> Self {
        v
    }

    fn from_index(v: usize) -> Self {
        v as f64
    }
}

/// Human-readable name for a precision, for the run banner.
pub fn precision_name<F: Real>() -> &'static str {
    match F::PRECISION {
        64 => "double",
        _ => "float",
    }
}
