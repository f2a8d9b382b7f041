//! Common test utilities for the frame-conform integration tests
//!
//! Synthetic frames whose pixel values encode their own coordinates, so a
//! conformed output can be traced back to the source pixel it came from.

#![allow(dead_code)]

pub mod test_frames {
    use conform_scale::geometry::Size;
    use conform_scale::image::PixelFormat;
    use conform_scale::intrinsics::Intrinsics;
    use frame_conform::processing::CameraFrame;

    /// Gray RGBA frame with value `x + width * y` at every pixel.
    pub fn coordinate_ramp(width: u32, height: u32) -> Vec<u8> {
        let mut data = Vec::with_capacity((width * height * 4) as usize);
        for y in 0..height {
            for x in 0..width {
                let v = (x + width * y) as u8;
                data.extend_from_slice(&[v, v, v, 255]);
            }
        }
        data
    }

    /// RGBA frame storing its own column in red and row in green.
    /// Coordinates wrap past 255.
    pub fn coordinate_grid(width: u32, height: u32) -> Vec<u8> {
        let mut data = Vec::with_capacity((width * height * 4) as usize);
        for y in 0..height {
            for x in 0..width {
                data.extend_from_slice(&[x as u8, y as u8, 0, 255]);
            }
        }
        data
    }

    /// Frame with a centered principal point and focal length `focal`.
    pub fn ramp_frame(width: u32, height: u32, focal: f32) -> CameraFrame {
        let size = Size::new(width, height);
        let intrinsics = Intrinsics::new((focal, focal), (width as f32 / 2.0, height as f32 / 2.0), size);
        CameraFrame::packed(coordinate_ramp(width, height), width, height, PixelFormat::Rgba32, intrinsics)
    }

    /// Solid frame with the camera from the worked 1280x720 example.
    pub fn hd_frame(color: [u8; 4]) -> CameraFrame {
        let data: Vec<u8> = std::iter::repeat(color).take(1280 * 720).flatten().collect();
        let intrinsics = Intrinsics::new((900.0, 900.0), (640.0, 360.0), Size::new(1280, 720));
        CameraFrame::packed(data, 1280, 720, PixelFormat::Rgba32, intrinsics)
    }
}

pub mod assertions {
    /// Assert two floats agree to within `eps`.
    pub fn assert_close(actual: f32, expected: f32, eps: f32) {
        assert!(
            (actual - expected).abs() <= eps,
            "expected {} got {} (eps {})",
            expected,
            actual,
            eps
        );
    }
}
