// SPDX-License-Identifier: MIT
//! # conform-scale: Frame and Calibration Conforming (CPU path)
//!
//! Converts camera frames captured at a device's native resolution into the
//! fixed landscape resolution a computer-vision consumer expects, and
//! recomputes the camera intrinsics for exactly the same crop and scale.
//!
//! ## Key Components
//!
//! - [`geometry`]: crop-axis decision, centered crop planning, even-rounded extents
//! - [`image`]: borrowed CPU image views (packed and 4:2:0 planar)
//! - [`cpu`]: single-pass crop + scale + format conversion + mirror
//! - [`intrinsics`]: focal length / principal point remapping
//!
//! ## Consistency
//!
//! The pixels and the calibration are transformed by independent code, so they
//! only agree if both cut along the same axis. [`geometry::crop_axis`] is the
//! one place that decision is made; the planner, the remapper and the GPU
//! display transform all call it.
//!
//! ## Usage Example
//!
//! ```rust
//! use conform_scale::cpu::{ConversionParams, ConversionStatus, CpuResampler};
//! use conform_scale::geometry::{OutputResolution, Size};
//! use conform_scale::image::{CpuImage, PixelFormat};
//! use conform_scale::intrinsics::{Intrinsics, IntrinsicsRemapper};
//!
//! let frame = vec![0u8; 1280 * 720 * 4];
//! let image = CpuImage::packed(&frame, 1280, 720, PixelFormat::Rgba32);
//! let target = OutputResolution::new(640, 480)?;
//!
//! let params = ConversionParams::new(target, PixelFormat::Rgb24);
//! let mut pixels = vec![0u8; params.buffer_len()?];
//! let status = CpuResampler::new().convert(&image, &params, &mut pixels)?;
//! assert_eq!(status, ConversionStatus::Converted);
//!
//! let camera = Intrinsics::new((900.0, 900.0), (640.0, 360.0), Size::new(1280, 720));
//! let mut k = [0.0f32; 9];
//! IntrinsicsRemapper.remap_into(&camera, target, &mut k)?;
//! assert!((k[0] - 600.0).abs() < 1e-3);
//! # Ok::<(), conform_scale::ScaleError>(())
//! ```

pub mod cpu;
pub mod error;
pub mod geometry;
pub mod image;
pub mod intrinsics;

pub use error::ScaleError;
