// SPDX-License-Identifier: MIT
//! # Crop Planning
//!
//! Every consumer of a conformed frame assumes the pixels and the calibration
//! were cut the same way. This module owns that decision:
//!
//! 1. [`crop_axis`] picks the axis to crop for an (input, output) pair. It is the
//!    single decision point used by the crop planner, the intrinsics remapper and
//!    the GPU display transform.
//! 2. [`plan_crop`] turns the decision into a centered rectangle in input pixels.
//! 3. [`calculate_height`] / [`calculate_width`] give the even-rounded extent
//!    of the kept region, as required by chroma-subsampled consumers.
//!
//! Output resolutions are always landscape. [`OutputResolution`] can only be
//! built through a checked constructor, so the planner never sees a portrait
//! target.

use tracing::debug;

use crate::error::ScaleError;

/// Represents a 2D size with width and height in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct Size {
    pub w: u32,
    pub h: u32,
}

impl Size {
    pub const fn new(w: u32, h: u32) -> Self {
        Self { w, h }
    }

    pub fn is_empty(self) -> bool {
        self.w == 0 || self.h == 0
    }

    /// Pixel count as `usize`, for buffer sizing.
    pub fn area(self) -> usize {
        (self.w as usize) * (self.h as usize)
    }

    /// Swap width and height (quarter-turn rotation).
    pub fn transposed(self) -> Self {
        Self { w: self.h, h: self.w }
    }
}

impl std::fmt::Display for Size {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.w, self.h)
    }
}

/// A landscape target resolution (`w > h > 0`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct OutputResolution(Size);

impl OutputResolution {
    pub fn new(w: u32, h: u32) -> Result<Self, ScaleError> {
        if w == 0 || h == 0 {
            return Err(ScaleError::ZeroDimension(Size { w, h }));
        }
        if w <= h {
            return Err(ScaleError::NotLandscape { w, h });
        }
        Ok(Self(Size { w, h }))
    }

    pub fn size(self) -> Size {
        self.0
    }

    pub fn width(self) -> u32 {
        self.0.w
    }

    pub fn height(self) -> u32 {
        self.0.h
    }
}

impl TryFrom<Size> for OutputResolution {
    type Error = ScaleError;

    fn try_from(size: Size) -> Result<Self, Self::Error> {
        Self::new(size.w, size.h)
    }
}

impl std::fmt::Display for OutputResolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// The single axis along which input pixels are discarded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CropAxis {
    /// Input is wider than the target: columns are removed.
    X,
    /// Input is taller than (or exactly as wide as) the target: rows are removed.
    Y,
}

/// Decide which axis to crop when fitting `input` into `output`.
///
/// Compares `in_w / in_h` against `out_w / out_h` by exact cross-multiplication.
/// Equal ratios select [`CropAxis::Y`] with a zero-height cut.
pub fn crop_axis(input: Size, output: OutputResolution) -> CropAxis {
    let wide = u64::from(input.w) * u64::from(output.height());
    let tall = u64::from(input.h) * u64::from(output.width());
    if wide > tall {
        CropAxis::X
    } else {
        CropAxis::Y
    }
}

/// Crop rectangle in input pixel coordinates, half-open on both axes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CropRect {
    pub x_min: u32,
    pub x_max: u32,
    pub y_min: u32,
    pub y_max: u32,
}

impl CropRect {
    /// Rectangle covering the whole of `size`.
    pub fn full(size: Size) -> Self {
        Self {
            x_min: 0,
            x_max: size.w,
            y_min: 0,
            y_max: size.h,
        }
    }

    pub fn width(&self) -> u32 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> u32 {
        self.y_max - self.y_min
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// Axis along which this rectangle removes pixels from `input`, if any.
    pub fn cropped_axis(&self, input: Size) -> Option<CropAxis> {
        if self.width() < input.w {
            Some(CropAxis::X)
        } else if self.height() < input.h {
            Some(CropAxis::Y)
        } else {
            None
        }
    }
}

/// Compute the centered crop of `input` matching the aspect ratio of `output`.
///
/// When the ratios already match the whole input is returned.
pub fn plan_crop(input: Size, output: OutputResolution) -> CropRect {
    let (in_w, in_h) = (f64::from(input.w), f64::from(input.h));
    let (out_w, out_h) = (f64::from(output.width()), f64::from(output.height()));
    let axis = crop_axis(input, output);

    let rect = match axis {
        CropAxis::X => {
            let scale = (out_w * in_h / out_h) / in_w;
            let translate = (1.0 - scale) / 2.0;
            CropRect {
                x_min: (translate * in_w).floor() as u32,
                x_max: (((translate + scale) * in_w).floor() as u32).min(input.w),
                y_min: 0,
                y_max: input.h,
            }
        }
        CropAxis::Y => {
            if input.is_empty() {
                return CropRect::full(input);
            }
            let scale = (out_h * in_w / out_w) / in_h;
            let translate = (1.0 - scale) / 2.0;
            CropRect {
                x_min: 0,
                x_max: input.w,
                y_min: (translate * in_h).floor() as u32,
                y_max: (((translate + scale) * in_h).floor() as u32).min(input.h),
            }
        }
    };

    debug!(%input, %output, ?axis, ?rect, "planned crop");
    rect
}

/// Height of the region of a `width`-wide image that has the aspect of `aspect`,
/// floored and cleared to the nearest smaller even number.
pub fn calculate_height(width: u32, aspect: OutputResolution) -> u32 {
    let ideal = u64::from(aspect.height()) * u64::from(width) / u64::from(aspect.width());
    (ideal as u32) & !1
}

/// Width counterpart of [`calculate_height`].
pub fn calculate_width(height: u32, aspect: OutputResolution) -> u32 {
    let ideal = u64::from(aspect.width()) * u64::from(height) / u64::from(aspect.height());
    (ideal as u32) & !1
}
