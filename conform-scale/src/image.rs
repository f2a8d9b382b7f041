// SPDX-License-Identifier: MIT
//! Borrowed CPU image views handed over by a frame source.
//!
//! The frame source owns the bytes; a [`CpuImage`] only describes them. Packed
//! formats carry a single plane, [`PixelFormat::Yuv420`] carries Y, U and V
//! planes with independent row and pixel strides, so I420 as well as the
//! interleaved NV12/NV21 layouts are expressed by pointing the U and V views
//! into the shared chroma buffer with a pixel stride of 2.

use crate::error::ScaleError;
use crate::geometry::Size;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum PixelFormat {
    /// 8-bit grayscale.
    #[clap(name = "r8")]
    R8,
    /// Packed R, G, B.
    #[clap(name = "rgb24")]
    Rgb24,
    /// Packed R, G, B, A.
    #[clap(name = "rgba32")]
    Rgba32,
    /// Packed B, G, R, A.
    #[clap(name = "bgra32")]
    Bgra32,
    /// 4:2:0 subsampled Y + U + V planes. Input only.
    #[clap(name = "yuv420")]
    Yuv420,
}

impl PixelFormat {
    /// Bytes per pixel for packed formats, `None` for planar ones.
    pub fn bytes_per_pixel(self) -> Option<usize> {
        match self {
            PixelFormat::R8 => Some(1),
            PixelFormat::Rgb24 => Some(3),
            PixelFormat::Rgba32 | PixelFormat::Bgra32 => Some(4),
            PixelFormat::Yuv420 => None,
        }
    }

    pub fn plane_count(self) -> usize {
        match self {
            PixelFormat::Yuv420 => 3,
            _ => 1,
        }
    }

    pub fn is_packed(self) -> bool {
        self.bytes_per_pixel().is_some()
    }

    /// Destination byte length for a packed image of `size`.
    pub fn buffer_len(self, size: Size) -> Result<usize, ScaleError> {
        let bpp = self
            .bytes_per_pixel()
            .ok_or(ScaleError::UnsupportedOutputFormat(self))?;
        Ok(size.area() * bpp)
    }
}

/// One plane of raw bytes.
#[derive(Clone, Copy, Debug)]
pub struct Plane<'a> {
    pub data: &'a [u8],
    /// Bytes between the starts of two consecutive rows.
    pub row_stride: usize,
    /// Bytes between two horizontally adjacent samples.
    pub pixel_stride: usize,
}

impl<'a> Plane<'a> {
    pub fn new(data: &'a [u8], row_stride: usize, pixel_stride: usize) -> Self {
        Self { data, row_stride, pixel_stride }
    }

    /// Minimum byte length for `cols` x `rows` samples of `sample_len` bytes each.
    fn required_len(&self, cols: u32, rows: u32, sample_len: usize) -> usize {
        if cols == 0 || rows == 0 {
            return 0;
        }
        (rows as usize - 1) * self.row_stride + (cols as usize - 1) * self.pixel_stride + sample_len
    }

    #[inline]
    pub(crate) fn at(&self, x: u32, y: u32) -> usize {
        y as usize * self.row_stride + x as usize * self.pixel_stride
    }
}

/// A CPU-resident frame as described by the frame source.
#[derive(Clone, Debug)]
pub struct CpuImage<'a> {
    pub size: Size,
    pub format: PixelFormat,
    pub planes: Vec<Plane<'a>>,
    /// Set by the frame source; invalid images are skipped by every consumer.
    pub valid: bool,
}

impl<'a> CpuImage<'a> {
    /// Tightly packed single-plane image.
    ///
    /// A planar `format` yields an image that fails [`CpuImage::validate`];
    /// use [`CpuImage::yuv420`] for those.
    pub fn packed(data: &'a [u8], width: u32, height: u32, format: PixelFormat) -> Self {
        let bpp = format.bytes_per_pixel().unwrap_or(1);
        Self::packed_with_stride(data, width, height, width as usize * bpp, format)
    }

    /// Packed single-plane image whose rows are `row_stride` bytes apart.
    pub fn packed_with_stride(
        data: &'a [u8],
        width: u32,
        height: u32,
        row_stride: usize,
        format: PixelFormat,
    ) -> Self {
        let bpp = format.bytes_per_pixel().unwrap_or(1);
        Self {
            size: Size::new(width, height),
            format,
            planes: vec![Plane::new(data, row_stride, bpp)],
            valid: true,
        }
    }

    /// 4:2:0 image from its three planes.
    pub fn yuv420(width: u32, height: u32, y: Plane<'a>, u: Plane<'a>, v: Plane<'a>) -> Self {
        Self {
            size: Size::new(width, height),
            format: PixelFormat::Yuv420,
            planes: vec![y, u, v],
            valid: true,
        }
    }

    /// Mark the image with the frame source's validity flag.
    pub fn with_valid(mut self, valid: bool) -> Self {
        self.valid = valid;
        self
    }

    /// Check plane count and that every plane covers its declared extent.
    pub fn validate(&self) -> Result<(), ScaleError> {
        if self.size.is_empty() {
            return Err(ScaleError::ZeroDimension(self.size));
        }
        let expected = self.format.plane_count();
        if self.planes.len() != expected {
            return Err(ScaleError::PlaneCountMismatch {
                format: self.format,
                expected,
                actual: self.planes.len(),
            });
        }
        for (index, plane) in self.planes.iter().enumerate() {
            let required = match (self.format.bytes_per_pixel(), index) {
                (Some(bpp), _) => plane.required_len(self.size.w, self.size.h, bpp),
                (None, 0) => plane.required_len(self.size.w, self.size.h, 1),
                (None, _) => plane.required_len(self.size.w.div_ceil(2), self.size.h.div_ceil(2), 1),
            };
            if plane.data.len() < required {
                return Err(ScaleError::PlaneTooSmall {
                    plane: index,
                    required,
                    actual: plane.data.len(),
                });
            }
        }
        Ok(())
    }
}
