// SPDX-License-Identifier: MIT
//! Error type shared by the geometry, CPU and intrinsics paths.

use fast_image_resize as fir;

use crate::geometry::Size;
use crate::image::PixelFormat;

#[derive(Debug)]
pub enum ScaleError {
    /// Output resolution is not strictly landscape (`w > h`).
    NotLandscape { w: u32, h: u32 },
    /// A resolution with a zero side was supplied where pixels are required.
    ZeroDimension(Size),
    /// The crop rectangle collapsed to zero pixels on one axis.
    EmptyCrop,
    /// Planar formats can be read but never written.
    UnsupportedOutputFormat(PixelFormat),
    BufferSizeMismatch { expected: usize, actual: usize },
    PlaneCountMismatch { format: PixelFormat, expected: usize, actual: usize },
    PlaneTooSmall { plane: usize, required: usize, actual: usize },
    Fir(fir::ResizeError),
    ImageBuf(fir::ImageBufferError),
}

impl From<fir::ResizeError> for ScaleError { fn from(e: fir::ResizeError) -> Self { Self::Fir(e) } }
impl From<fir::ImageBufferError> for ScaleError { fn from(e: fir::ImageBufferError) -> Self { Self::ImageBuf(e) } }

impl std::fmt::Display for ScaleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScaleError::NotLandscape { w, h } => {
                write!(f, "Output resolution {}x{} is not landscape (width must exceed height)", w, h)
            }
            ScaleError::ZeroDimension(s) => write!(f, "Resolution {}x{} has a zero dimension", s.w, s.h),
            ScaleError::EmptyCrop => write!(f, "Crop rectangle is empty"),
            ScaleError::UnsupportedOutputFormat(p) => write!(f, "Unsupported output pixel format: {:?}", p),
            ScaleError::BufferSizeMismatch { expected, actual } => {
                write!(f, "Destination buffer is {} bytes, expected {}", actual, expected)
            }
            ScaleError::PlaneCountMismatch { format, expected, actual } => {
                write!(f, "{:?} image needs {} planes, got {}", format, expected, actual)
            }
            ScaleError::PlaneTooSmall { plane, required, actual } => {
                write!(f, "Plane {} holds {} bytes, needs at least {}", plane, actual, required)
            }
            ScaleError::Fir(e) => write!(f, "Fast image resize error: {}", e),
            ScaleError::ImageBuf(e) => write!(f, "Image buffer error: {}", e),
        }
    }
}

impl std::error::Error for ScaleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ScaleError::Fir(e) => Some(e),
            ScaleError::ImageBuf(e) => Some(e),
            _ => None,
        }
    }
}
