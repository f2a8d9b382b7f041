//! # Display Transform
//!
//! Builds the 3x3 affine matrix the resample shader uses to look up source
//! texels. The matrix maps normalized *destination* coordinates (`u`, `v` in
//! `[0, 1]`, origin top-left) to normalized *source* coordinates.
//!
//! Applied to a destination point, the composition is:
//!
//! 1. centered crop/scale in display space, along the axis chosen by
//!    [`crop_axis`] for the (rotated source, destination) pair,
//! 2. optional horizontal mirror,
//! 3. inverse rotation from display space back into sensor space.
//!
//! For [`Rotation::None`] and [`Rotation::Rotate180`] the crop axis is therefore
//! exactly the one the CPU crop planner and the intrinsics remapper pick for
//! the same resolutions.
//! For quarter turns, remap the intrinsics returned by
//! [`Rotation::orient_intrinsics`] to get the same agreement.

use conform_scale::geometry::{crop_axis, CropAxis, OutputResolution, Size};
use conform_scale::intrinsics::Intrinsics;

/// Clockwise rotation applied to the sensor image to obtain the display image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, clap::ValueEnum)]
pub enum Rotation {
    #[default]
    #[clap(name = "0")]
    None,
    #[clap(name = "90")]
    Clockwise90,
    #[clap(name = "180")]
    Rotate180,
    #[clap(name = "270")]
    CounterClockwise90,
}

impl Rotation {
    pub fn degrees(self) -> u32 {
        match self {
            Rotation::None => 0,
            Rotation::Clockwise90 => 90,
            Rotation::Rotate180 => 180,
            Rotation::CounterClockwise90 => 270,
        }
    }

    pub fn is_quarter_turn(self) -> bool {
        matches!(self, Rotation::Clockwise90 | Rotation::CounterClockwise90)
    }

    /// Size of the sensor image once rotated into display orientation.
    pub fn oriented(self, sensor: Size) -> Size {
        if self.is_quarter_turn() {
            sensor.transposed()
        } else {
            sensor
        }
    }

    /// Sensor intrinsics re-expressed in display orientation, at
    /// `self.oriented(camera.resolution)`. Quarter turns swap the focal
    /// lengths; the principal point follows the same mapping as the pixels.
    pub fn orient_intrinsics(self, camera: &Intrinsics) -> Intrinsics {
        let (w, h) = (camera.resolution.w as f32, camera.resolution.h as f32);
        let (fx, fy) = camera.focal_length;
        let (cx, cy) = camera.principal_point;
        let (focal, principal) = match self {
            Rotation::None => return *camera,
            Rotation::Clockwise90 => ((fy, fx), (h - cy, cx)),
            Rotation::Rotate180 => ((fx, fy), (w - cx, h - cy)),
            Rotation::CounterClockwise90 => ((fy, fx), (cy, w - cx)),
        };
        Intrinsics::new(focal, principal, self.oriented(camera.resolution))
    }

    /// Display-space to sensor-space mapping in normalized coordinates.
    fn inverse(self) -> Affine2 {
        match self {
            Rotation::None => Affine2::IDENTITY,
            // s = v, t = 1 - u
            Rotation::Clockwise90 => Affine2::from_rows([[0.0, 1.0, 0.0], [-1.0, 0.0, 1.0], [0.0, 0.0, 1.0]]),
            // s = 1 - u, t = 1 - v
            Rotation::Rotate180 => Affine2::from_rows([[-1.0, 0.0, 1.0], [0.0, -1.0, 1.0], [0.0, 0.0, 1.0]]),
            // s = 1 - v, t = u
            Rotation::CounterClockwise90 => {
                Affine2::from_rows([[0.0, -1.0, 1.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]])
            }
        }
    }
}

/// Storage order of a flattened 3x3 matrix.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatrixLayout {
    RowMajor,
    ColumnMajor,
}

/// 2D affine transform in homogeneous coordinates, stored as rows.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Affine2 {
    rows: [[f64; 3]; 3],
}

impl Affine2 {
    pub const IDENTITY: Self = Self {
        rows: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
    };

    pub fn from_rows(rows: [[f64; 3]; 3]) -> Self {
        Self { rows }
    }

    /// `self * rhs`: the transform that applies `rhs` first, then `self`.
    pub fn after(&self, rhs: &Affine2) -> Affine2 {
        let mut rows = [[0.0; 3]; 3];
        for (r, row) in rows.iter_mut().enumerate() {
            for (c, cell) in row.iter_mut().enumerate() {
                *cell = (0..3).map(|k| self.rows[r][k] * rhs.rows[k][c]).sum();
            }
        }
        Affine2 { rows }
    }

    pub fn apply(&self, u: f64, v: f64) -> (f64, f64) {
        let m = &self.rows;
        (m[0][0] * u + m[0][1] * v + m[0][2], m[1][0] * u + m[1][1] * v + m[1][2])
    }

    pub fn to_layout(&self, layout: MatrixLayout) -> [f32; 9] {
        let mut out = [0.0f32; 9];
        for r in 0..3 {
            for c in 0..3 {
                let i = match layout {
                    MatrixLayout::RowMajor => r * 3 + c,
                    MatrixLayout::ColumnMajor => c * 3 + r,
                };
                out[i] = self.rows[r][c] as f32;
            }
        }
        out
    }

    /// Rebuild from a flattened row-major matrix.
    pub fn from_row_major(m: &[f32; 9]) -> Self {
        let f = |i: usize| f64::from(m[i]);
        Self::from_rows([[f(0), f(1), f(2)], [f(3), f(4), f(5)], [f(6), f(7), f(8)]])
    }
}

/// Centered uniform crop of `oriented` that fills `dst` without distortion.
fn crop_scale(oriented: Size, dst: OutputResolution) -> Affine2 {
    let (w, h) = (f64::from(oriented.w), f64::from(oriented.h));
    let (dw, dh) = (f64::from(dst.width()), f64::from(dst.height()));
    if oriented.is_empty() {
        return Affine2::IDENTITY;
    }
    match crop_axis(oriented, dst) {
        CropAxis::X => {
            let s = (dw * h / dh) / w;
            Affine2::from_rows([[s, 0.0, (1.0 - s) / 2.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]])
        }
        CropAxis::Y => {
            let s = (dh * w / dw) / h;
            Affine2::from_rows([[1.0, 0.0, 0.0], [0.0, s, (1.0 - s) / 2.0], [0.0, 0.0, 1.0]])
        }
    }
}

/// Destination-to-source transform as an [`Affine2`].
pub fn display_transform_matrix(src: Size, dst: OutputResolution, rotation: Rotation, mirror_x: bool) -> Affine2 {
    let crop = crop_scale(rotation.oriented(src), dst);
    let mirror = if mirror_x {
        Affine2::from_rows([[-1.0, 0.0, 1.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]])
    } else {
        Affine2::IDENTITY
    };
    rotation.inverse().after(&mirror.after(&crop))
}

/// Flattened destination-to-source transform in the requested layout.
pub fn display_transform(
    src: Size,
    dst: OutputResolution,
    rotation: Rotation,
    mirror_x: bool,
    layout: MatrixLayout,
) -> [f32; 9] {
    display_transform_matrix(src, dst, rotation, mirror_x).to_layout(layout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use conform_scale::geometry::plan_crop;

    fn out(w: u32, h: u32) -> OutputResolution {
        OutputResolution::new(w, h).unwrap()
    }

    fn close(a: (f64, f64), b: (f64, f64)) -> bool {
        (a.0 - b.0).abs() < 1e-9 && (a.1 - b.1).abs() < 1e-9
    }

    #[test]
    fn matching_aspect_without_rotation_is_identity() {
        let m = display_transform(Size::new(1920, 1080), out(640, 360), Rotation::None, false, MatrixLayout::RowMajor);
        assert_eq!(m, [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn crop_matches_cpu_planner_edges() {
        let src = Size::new(1280, 720);
        let dst = out(640, 480);
        let t = display_transform_matrix(src, dst, Rotation::None, false);
        let rect = plan_crop(src, dst);
        let (left, top) = t.apply(0.0, 0.0);
        let (right, bottom) = t.apply(1.0, 1.0);
        assert!((left * 1280.0 - f64::from(rect.x_min)).abs() < 1.0);
        assert!((right * 1280.0 - f64::from(rect.x_max)).abs() < 1.0);
        assert!(close((top, bottom), (0.0, 1.0)));
    }

    #[test]
    fn crop_axis_agrees_with_planner_for_upright_frames() {
        let sizes = [(1280, 720), (640, 480), (1440, 1080), (641, 360), (720, 1280), (4032, 3024)];
        let outputs = [(640, 480), (1280, 720), (300, 100), (641, 640)];
        for &(w, h) in &sizes {
            for &(ow, oh) in &outputs {
                let src = Size::new(w, h);
                let dst = out(ow, oh);
                for rotation in [Rotation::None, Rotation::Rotate180] {
                    let m = display_transform(src, dst, rotation, false, MatrixLayout::RowMajor);
                    let x_scale = m[0].abs();
                    let y_scale = m[4].abs();
                    match crop_axis(src, dst) {
                        CropAxis::X => assert!(x_scale < 1.0 && y_scale == 1.0, "{:?} -> {:?}: {:?}", src, dst, m),
                        CropAxis::Y => assert!(x_scale == 1.0 && y_scale <= 1.0, "{:?} -> {:?}: {:?}", src, dst, m),
                    }
                }
            }
        }
    }

    #[test]
    fn quarter_turn_crops_on_rotated_size() {
        // Portrait 720x1280 sensor rotated into landscape 1280x720 needs no crop.
        let t = display_transform_matrix(Size::new(720, 1280), out(1280, 720), Rotation::Clockwise90, false);
        // Display top-left comes from the sensor's bottom-left.
        assert!(close(t.apply(0.0, 0.0), (0.0, 1.0)));
        // Display top-right comes from the sensor's top-left.
        assert!(close(t.apply(1.0, 0.0), (0.0, 0.0)));
        assert!(close(t.apply(1.0, 1.0), (1.0, 0.0)));
    }

    #[test]
    fn counter_clockwise_is_inverse_of_clockwise() {
        let src = Size::new(1080, 1920);
        let dst = out(1920, 1080);
        let cw = display_transform_matrix(src, dst, Rotation::Clockwise90, false);
        let ccw = display_transform_matrix(src, dst, Rotation::CounterClockwise90, false);
        for (u, v) in [(0.0, 0.0), (0.25, 0.75), (1.0, 0.5)] {
            let (s, t) = cw.apply(u, v);
            let (s2, t2) = ccw.apply(u, v);
            // Opposite quarter turns differ by a half turn.
            assert!(close((s, t), (1.0 - s2, 1.0 - t2)));
        }
    }

    #[test]
    fn mirror_flips_horizontally_after_crop() {
        let t = display_transform_matrix(Size::new(16, 4), out(4, 2), Rotation::None, true);
        assert!(close(t.apply(0.0, 0.0), (0.75, 0.0)));
        assert!(close(t.apply(1.0, 1.0), (0.25, 1.0)));
    }

    #[test]
    fn oriented_principal_point_maps_back_to_sensor() {
        // Portrait sensor turned into an uncropped 8x4 display.
        let sensor = Size::new(4, 8);
        let camera = Intrinsics::new((3.0, 5.0), (1.0, 2.0), sensor);
        for rotation in [Rotation::Clockwise90, Rotation::CounterClockwise90] {
            let display = rotation.orient_intrinsics(&camera);
            assert_eq!(display.resolution, Size::new(8, 4));

            let t = display_transform_matrix(sensor, out(8, 4), rotation, false);
            let (u, v) = (
                f64::from(display.principal_point.0) / 8.0,
                f64::from(display.principal_point.1) / 4.0,
            );
            assert!(close(t.apply(u, v), (1.0 / 4.0, 2.0 / 8.0)), "{:?}", rotation);
        }

        let cw = Rotation::Clockwise90.orient_intrinsics(&camera);
        assert_eq!(cw.focal_length, (5.0, 3.0));
        assert_eq!(cw.principal_point, (6.0, 1.0));
        let ccw = Rotation::CounterClockwise90.orient_intrinsics(&camera);
        assert_eq!(ccw.principal_point, (2.0, 3.0));
        let half = Rotation::Rotate180.orient_intrinsics(&camera);
        assert_eq!(half.principal_point, (3.0, 6.0));
    }

    #[test]
    fn layouts_are_transposes() {
        let src = Size::new(1280, 720);
        let row = display_transform(src, out(640, 480), Rotation::Clockwise90, true, MatrixLayout::RowMajor);
        let col = display_transform(src, out(640, 480), Rotation::Clockwise90, true, MatrixLayout::ColumnMajor);
        for r in 0..3 {
            for c in 0..3 {
                assert_eq!(row[r * 3 + c], col[c * 3 + r]);
            }
        }
        let rebuilt = Affine2::from_row_major(&row);
        let (s, t) = rebuilt.apply(0.5, 0.5);
        assert!((s - 0.5).abs() < 1e-6 && (t - 0.5).abs() < 1e-6);
    }
}
