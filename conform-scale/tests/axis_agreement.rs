//! Cross-component agreement between the crop planner and the intrinsics remapper.
//!
//! For a sweep of (input, output) pairs the principal point must move by the
//! same offset the crop rectangle removes, on the same axis.

use conform_scale::geometry::{crop_axis, plan_crop, CropAxis, OutputResolution, Size};
use conform_scale::intrinsics::{remap_intrinsics, Intrinsics};

const INPUTS: &[(u32, u32)] = &[
    (640, 480),
    (1280, 720),
    (1920, 1080),
    (1440, 1080),
    (2048, 1536),
    (4032, 3024),
    (641, 360),
    (1921, 1080),
    (1000, 999),
    (720, 1280),
];

const OUTPUTS: &[(u32, u32)] = &[(640, 480), (640, 360), (1280, 720), (256, 144), (300, 100), (641, 640)];

#[test]
fn planner_and_remapper_cut_the_same_axis() {
    for &(iw, ih) in INPUTS {
        for &(ow, oh) in OUTPUTS {
            let input = Size::new(iw, ih);
            let output = OutputResolution::new(ow, oh).unwrap();
            let axis = crop_axis(input, output);
            let rect = plan_crop(input, output);

            // Principal point at the origin isolates the crop offset.
            let camera = Intrinsics::new((100.0, 100.0), (0.0, 0.0), input);
            let remapped = remap_intrinsics(&camera, output).unwrap();
            let (cx, cy) = remapped.principal_point;
            let (fx, fy) = remapped.focal_length;

            match axis {
                CropAxis::X => {
                    assert_eq!(rect.height(), ih, "{}x{} -> {}x{}", iw, ih, ow, oh);
                    assert!(cy.abs() < 1e-4, "y moved while cropping x: {}", cy);
                    assert!(cx <= 0.0);
                    // Same offset in input pixels, up to the even-rounding of the kept width.
                    let offset = -cx / (fx / 100.0);
                    assert!((offset - rect.x_min as f32).abs() <= 1.5, "offset {} vs crop {:?}", offset, rect);
                }
                CropAxis::Y => {
                    assert_eq!(rect.width(), iw, "{}x{} -> {}x{}", iw, ih, ow, oh);
                    assert!(cx.abs() < 1e-4, "x moved while cropping y: {}", cx);
                    assert!(cy <= 0.0);
                    let offset = -cy / (fy / 100.0);
                    assert!((offset - rect.y_min as f32).abs() <= 1.5, "offset {} vs crop {:?}", offset, rect);
                }
            }
            assert_eq!(remapped.resolution, output.size());
        }
    }
}

#[test]
fn focal_scale_tracks_kept_region() {
    for &(iw, ih) in INPUTS {
        for &(ow, oh) in OUTPUTS {
            let input = Size::new(iw, ih);
            let output = OutputResolution::new(ow, oh).unwrap();
            let rect = plan_crop(input, output);
            let camera = Intrinsics::new((1000.0, 1000.0), (0.0, 0.0), input);
            let remapped = remap_intrinsics(&camera, output).unwrap();

            let sx = ow as f32 / rect.width() as f32;
            let sy = oh as f32 / rect.height() as f32;
            let (fx, fy) = remapped.focal_length;
            assert!((fx / 1000.0 - sx).abs() / sx < 0.01, "fx {} vs scale {}", fx, sx);
            assert!((fy / 1000.0 - sy).abs() / sy < 0.01, "fy {} vs scale {}", fy, sy);
        }
    }
}
