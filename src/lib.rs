//! # Frame Conform Library
//!
//! Conforms camera frames to a fixed landscape output: crop to the output
//! aspect ratio, scale, convert the pixel format, optionally rotate and
//! mirror, and remap the camera intrinsics so they describe the pixels that
//! were actually kept.
//!
//! ## Architecture
//!
//! - `conform_scale` (sub-crate): crop planning, the CPU resampler and the
//!   intrinsics remapper. Pure functions over borrowed buffers.
//! - `gpu`: the device seam, the display transform, the shader cache, the GPU
//!   resampler and the render worker that confines them to one thread.
//! - `processing`: async frame-processing adapter over the CPU path.
//! - `config`: configuration, validation and startup-time mirror resolution.
//! - `error`: error types shared by all of the above.
//!
//! Every path decides the crop axis through
//! [`conform_scale::geometry::crop_axis`], so pixels and calibration always
//! agree on what was cut.
//!
//! ## Example
//!
//! ```rust
//! use frame_conform::config::ConformConfig;
//! use frame_conform::processing::{CameraFrame, ConformProcessor, FrameProcessor};
//! use conform_scale::geometry::Size;
//! use conform_scale::image::PixelFormat;
//! use conform_scale::intrinsics::Intrinsics;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = ConformConfig::new(640, 480, PixelFormat::Rgba32).resolve()?;
//! let mut processor = ConformProcessor::new(&settings);
//! processor.initialize(Size::new(1280, 720)).await?;
//!
//! let intrinsics = Intrinsics::new((900.0, 900.0), (640.0, 360.0), Size::new(1280, 720));
//! let frame = CameraFrame::packed(vec![0; 1280 * 720 * 4], 1280, 720, PixelFormat::Rgba32, intrinsics);
//! if let Some(out) = processor.process_frame(frame).await? {
//!     assert_eq!(out.matrix[0], 600.0);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod gpu;
pub mod processing;

/// Re-export error types for convenience
pub use error::{ConformError, ConformResult, ErrorSeverity, HasRecoverySuggestion, HasSeverity};

/// Re-export the CPU-side building blocks
pub use conform_scale::cpu::{ConversionParams, ConversionStatus, CpuResampler};
pub use conform_scale::geometry::{crop_axis, plan_crop, CropAxis, CropRect, OutputResolution, Size};
pub use conform_scale::image::{CpuImage, PixelFormat, Plane};
pub use conform_scale::intrinsics::{remap_intrinsics, Intrinsics, IntrinsicsRemapper};
