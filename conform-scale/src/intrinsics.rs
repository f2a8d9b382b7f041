// SPDX-License-Identifier: MIT
//! # Intrinsics Remapping
//!
//! Recomputes the pinhole intrinsics of a camera after its frame has been
//! cropped and scaled to an [`OutputResolution`]. The crop axis comes from
//! [`crop_axis`], the same decision the crop planner and the GPU display
//! transform use, so the remapped calibration always describes the pixels
//! that were actually produced.
//!
//! ## Layout
//!
//! Downstream consumers expect a flattened 3x3 matrix in column-major order:
//!
//! ```text
//! | fx  0  cx |      [0] [3] [6]
//! |  0 fy  cy |  ->  [1] [4] [7]
//! |  0  0   1 |      [2] [5] [8]
//! ```
//!
//! [`write_column_major`] touches only indices 0, 4, 6, 7 and 8.

use crate::error::ScaleError;
use crate::geometry::{calculate_height, calculate_width, crop_axis, CropAxis, OutputResolution, Size};

/// Pixel-space projection parameters, valid only for `resolution`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Intrinsics {
    /// Focal length in pixels (fx, fy)
    pub focal_length: (f32, f32),
    /// Principal point in pixels (cx, cy)
    pub principal_point: (f32, f32),
    /// Image size these parameters were computed for
    pub resolution: Size,
}

impl Intrinsics {
    pub fn new(focal_length: (f32, f32), principal_point: (f32, f32), resolution: Size) -> Self {
        Self {
            focal_length,
            principal_point,
            resolution,
        }
    }

    /// Full column-major camera matrix with explicit zeros.
    pub fn to_column_major(&self) -> [f32; 9] {
        let mut m = [0.0; 9];
        write_column_major(self, &mut m);
        m
    }
}

/// Write fx, fy, cx, cy and the homogeneous 1 into a column-major 3x3 buffer.
/// The remaining entries are left as the caller provided them.
pub fn write_column_major(intrinsics: &Intrinsics, out: &mut [f32; 9]) {
    out[0] = intrinsics.focal_length.0;
    out[4] = intrinsics.focal_length.1;
    out[6] = intrinsics.principal_point.0;
    out[7] = intrinsics.principal_point.1;
    out[8] = 1.0;
}

/// Remap `input` to the crop/scale that conforms its resolution to `output`.
pub fn remap_intrinsics(input: &Intrinsics, output: OutputResolution) -> Result<Intrinsics, ScaleError> {
    let in_size = input.resolution;
    if in_size.is_empty() {
        return Err(ScaleError::ZeroDimension(in_size));
    }

    let (mut fx, mut fy) = (f64::from(input.focal_length.0), f64::from(input.focal_length.1));
    let (mut cx, mut cy) = (f64::from(input.principal_point.0), f64::from(input.principal_point.1));
    let (out_w, out_h) = (f64::from(output.width()), f64::from(output.height()));

    let (width_ratio, height_ratio) = match crop_axis(in_size, output) {
        CropAxis::Y => {
            let implied_height = calculate_height(in_size.w, output);
            if implied_height == 0 {
                return Err(ScaleError::EmptyCrop);
            }
            let offset = (in_size.h - implied_height) / 2;
            cy -= f64::from(offset);
            (out_w / f64::from(in_size.w), out_h / f64::from(implied_height))
        }
        CropAxis::X => {
            let new_width = calculate_width(in_size.h, output);
            if new_width == 0 {
                return Err(ScaleError::EmptyCrop);
            }
            let offset = (in_size.w - new_width) / 2;
            cx -= f64::from(offset);
            (out_w / f64::from(new_width), out_h / f64::from(in_size.h))
        }
    };

    fx *= width_ratio;
    cx *= width_ratio;
    fy *= height_ratio;
    cy *= height_ratio;

    Ok(Intrinsics {
        focal_length: (fx as f32, fy as f32),
        principal_point: (cx as f32, cy as f32),
        resolution: output.size(),
    })
}

/// Stateless remapper writing straight into a consumer-owned matrix.
#[derive(Clone, Copy, Debug, Default)]
pub struct IntrinsicsRemapper;

impl IntrinsicsRemapper {
    /// Remap and write indices {0, 4, 6, 7, 8} of `out`; other entries are untouched.
    pub fn remap_into(
        &self,
        input: &Intrinsics,
        output: OutputResolution,
        out: &mut [f32; 9],
    ) -> Result<Intrinsics, ScaleError> {
        let remapped = remap_intrinsics(input, output)?;
        write_column_major(&remapped, out);
        Ok(remapped)
    }
}
