// SPDX-License-Identifier: MIT
// CPU conformer: crop + nearest scale + pixel-format conversion + optional
// mirror in a single pass, written straight into a caller-provided dst buffer.
// Same-format 4-byte frames without mirroring go through fast_image_resize.

use fast_image_resize as fir;
use fir::images::{TypedImage, TypedImageRef};
use fir::pixels::U8x4;
use fir::{ResizeAlg, ResizeOptions, Resizer};
use tracing::debug;

use crate::error::ScaleError;
use crate::geometry::{plan_crop, CropRect, OutputResolution};
use crate::image::{CpuImage, PixelFormat, Plane};

/// What to produce from a source frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConversionParams {
    pub output: OutputResolution,
    pub format: PixelFormat,
    /// Reverse the column order of the output.
    pub mirror_x: bool,
}

impl ConversionParams {
    pub fn new(output: OutputResolution, format: PixelFormat) -> Self {
        Self { output, format, mirror_x: false }
    }

    pub fn mirrored(mut self, mirror_x: bool) -> Self {
        self.mirror_x = mirror_x;
        self
    }

    /// Exact destination length in bytes.
    pub fn buffer_len(&self) -> Result<usize, ScaleError> {
        self.format.buffer_len(self.output.size())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConversionStatus {
    Converted,
    /// The frame source flagged the image invalid; dst was not touched.
    SkippedInvalidImage,
}

/// Scratch rows for padded 4-byte sources headed to fast_image_resize,
/// which wants tightly packed input. Grows to the largest frame seen.
pub struct Staging {
    rows: Vec<u8>,
}

impl Staging {
    pub fn with_capacity(bytes: usize) -> Self {
        Self { rows: Vec::with_capacity(bytes) }
    }

    /// Copy `rows` rows of `row_bytes` each out of `plane`, dropping the
    /// row padding.
    fn pack(&mut self, plane: &Plane<'_>, row_bytes: usize, rows: usize) -> &[u8] {
        let len = row_bytes * rows;
        if self.rows.len() < len {
            self.rows.resize(len, 0);
        }
        for (r, dst) in self.rows[..len].chunks_exact_mut(row_bytes).enumerate() {
            let start = r * plane.row_stride;
            dst.copy_from_slice(&plane.data[start..start + row_bytes]);
        }
        &self.rows[..len]
    }
}

/// Reusable CPU resampler. Holds only scratch memory, so one instance per
/// thread is enough and no state leaks between frames.
pub struct CpuResampler {
    resizer: Resizer,
    staging: Staging,
    columns: Vec<u32>,
}

impl Default for CpuResampler {
    fn default() -> Self {
        Self::new()
    }
}

impl CpuResampler {
    pub fn new() -> Self {
        Self::with_staging(Staging::with_capacity(0))
    }

    pub fn with_staging(staging: Staging) -> Self {
        Self {
            resizer: Resizer::new(),
            staging,
            columns: Vec::new(),
        }
    }

    /// Conform `image` to `params`, writing into `dst`.
    ///
    /// `dst` must be exactly `params.buffer_len()` bytes. An invalid image is
    /// reported as [`ConversionStatus::SkippedInvalidImage`] and leaves `dst`
    /// untouched.
    pub fn convert(
        &mut self,
        image: &CpuImage<'_>,
        params: &ConversionParams,
        dst: &mut [u8],
    ) -> Result<ConversionStatus, ScaleError> {
        if !image.valid {
            debug!(size = %image.size, "skipping invalid image");
            return Ok(ConversionStatus::SkippedInvalidImage);
        }

        let expected = params.buffer_len()?;
        if dst.len() != expected {
            return Err(ScaleError::BufferSizeMismatch { expected, actual: dst.len() });
        }
        image.validate()?;

        let crop = plan_crop(image.size, params.output);
        if crop.is_empty() {
            return Err(ScaleError::EmptyCrop);
        }

        let same_packed4 = image.format == params.format
            && params.format.bytes_per_pixel() == Some(4)
            && image.planes[0].pixel_stride == 4;
        if same_packed4 && !params.mirror_x {
            self.resize_packed4(image, crop, params, dst)?;
        } else {
            self.sample_nearest(image, crop, params, dst);
        }
        Ok(ConversionStatus::Converted)
    }

    fn resize_packed4(
        &mut self,
        image: &CpuImage<'_>,
        crop: CropRect,
        params: &ConversionParams,
        dst: &mut [u8],
    ) -> Result<(), ScaleError> {
        let plane = &image.planes[0];
        let (w, h) = (image.size.w, image.size.h);
        let tight_row_bytes = (w as usize) * 4;
        let tight_len = tight_row_bytes * (h as usize);

        let src: &[u8] = if plane.row_stride == tight_row_bytes {
            &plane.data[..tight_len]
        } else {
            self.staging.pack(plane, tight_row_bytes, h as usize)
        };

        let src_view = TypedImageRef::<U8x4>::from_buffer(w, h, src)?;
        let out = params.output.size();
        let mut dst_image = TypedImage::<U8x4>::from_buffer(out.w, out.h, dst)?;

        let opts = ResizeOptions::new()
            .resize_alg(ResizeAlg::Nearest)
            .crop(
                f64::from(crop.x_min),
                f64::from(crop.y_min),
                f64::from(crop.width()),
                f64::from(crop.height()),
            )
            .use_alpha(false);
        self.resizer.resize_typed::<U8x4>(&src_view, &mut dst_image, &opts)?;
        Ok(())
    }

    fn sample_nearest(
        &mut self,
        image: &CpuImage<'_>,
        crop: CropRect,
        params: &ConversionParams,
        dst: &mut [u8],
    ) {
        let out = params.output.size();
        let bpp = params.format.bytes_per_pixel().unwrap_or(1);

        // Pixel-centre sampling: column x reads (2x + 1) / 2 * crop_w / out_w.
        let (crop_w, out_w) = (u64::from(crop.width()), u64::from(out.w));
        self.columns.clear();
        self.columns.extend((0..out.w).map(|x| {
            let x = if params.mirror_x { out.w - 1 - x } else { x };
            crop.x_min + ((2 * u64::from(x) + 1) * crop_w / (2 * out_w)) as u32
        }));

        let (crop_h, out_h) = (u64::from(crop.height()), u64::from(out.h));
        let row_bytes = out.w as usize * bpp;
        for (y, row) in dst.chunks_exact_mut(row_bytes).enumerate() {
            let sy = crop.y_min + ((2 * y as u64 + 1) * crop_h / (2 * out_h)) as u32;
            for (px, &sx) in row.chunks_exact_mut(bpp).zip(&self.columns) {
                write_pixel(image, sx, sy, params.format, px);
            }
        }
    }
}

#[inline]
fn write_pixel(image: &CpuImage<'_>, x: u32, y: u32, format: PixelFormat, px: &mut [u8]) {
    match format {
        PixelFormat::R8 => px[0] = read_gray(image, x, y),
        PixelFormat::Rgb24 => {
            let [r, g, b, _] = read_rgba(image, x, y);
            px.copy_from_slice(&[r, g, b]);
        }
        PixelFormat::Rgba32 => px.copy_from_slice(&read_rgba(image, x, y)),
        PixelFormat::Bgra32 => {
            let [r, g, b, a] = read_rgba(image, x, y);
            px.copy_from_slice(&[b, g, r, a]);
        }
        // rejected by ConversionParams::buffer_len before sampling starts
        PixelFormat::Yuv420 => {}
    }
}

#[inline]
fn read_rgba(image: &CpuImage<'_>, x: u32, y: u32) -> [u8; 4] {
    let plane = &image.planes[0];
    let d = plane.data;
    let i = plane.at(x, y);
    match image.format {
        PixelFormat::R8 => [d[i], d[i], d[i], 255],
        PixelFormat::Rgb24 => [d[i], d[i + 1], d[i + 2], 255],
        PixelFormat::Rgba32 => [d[i], d[i + 1], d[i + 2], d[i + 3]],
        PixelFormat::Bgra32 => [d[i + 2], d[i + 1], d[i], d[i + 3]],
        PixelFormat::Yuv420 => {
            let (u, v) = (&image.planes[1], &image.planes[2]);
            let (cx, cy) = (x / 2, y / 2);
            yuv_to_rgba(d[i], u.data[u.at(cx, cy)], v.data[v.at(cx, cy)])
        }
    }
}

#[inline]
fn read_gray(image: &CpuImage<'_>, x: u32, y: u32) -> u8 {
    match image.format {
        PixelFormat::R8 | PixelFormat::Yuv420 => {
            let plane = &image.planes[0];
            plane.data[plane.at(x, y)]
        }
        _ => {
            let [r, g, b, _] = read_rgba(image, x, y);
            luma(r, g, b)
        }
    }
}

#[inline]
fn luma(r: u8, g: u8, b: u8) -> u8 {
    ((77 * u32::from(r) + 150 * u32::from(g) + 29 * u32::from(b)) >> 8) as u8
}

/// BT.601 limited range.
#[inline]
fn yuv_to_rgba(y: u8, u: u8, v: u8) -> [u8; 4] {
    let c = i32::from(y) - 16;
    let d = i32::from(u) - 128;
    let e = i32::from(v) - 128;
    let r = (298 * c + 409 * e + 128) >> 8;
    let g = (298 * c - 100 * d - 208 * e + 128) >> 8;
    let b = (298 * c + 516 * d + 128) >> 8;
    [clamp_u8(r), clamp_u8(g), clamp_u8(b), 255]
}

#[inline]
fn clamp_u8(v: i32) -> u8 {
    v.clamp(0, 255) as u8
}
