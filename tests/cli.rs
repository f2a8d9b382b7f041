//! End-to-end runs of the `conform` binary

mod common;

use std::path::Path;
use std::process::{Command, Output};

use common::test_frames::coordinate_ramp;
use tempfile::TempDir;

fn conform(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_conform"))
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .expect("failed to run conform")
}

fn write_ramp(path: &Path, width: u32, height: u32) {
    image::save_buffer(path, &coordinate_ramp(width, height), width, height, image::ColorType::Rgba8).unwrap();
}

#[test]
fn plan_prints_crop_and_intrinsics() {
    let out = conform(&[
        "plan", "--input", "1280x720", "--output", "640x480", "--fx", "900", "--fy", "900", "--cx", "640", "--cy",
        "360",
    ]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let report: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(report["axis"], "X");
    assert_eq!(report["crop"]["x_min"], 160);
    assert_eq!(report["crop"]["x_max"], 1120);
    let matrix = report["intrinsics"]["matrix"].as_array().unwrap();
    assert_eq!(matrix.len(), 9);
    assert!((matrix[0].as_f64().unwrap() - 600.0).abs() < 1e-3);
    assert!((matrix[7].as_f64().unwrap() - 240.0).abs() < 1e-3);
}

#[test]
fn plan_rejects_portrait_output() {
    let out = conform(&["plan", "--input", "1280x720", "--output", "480x640"]);
    assert!(!out.status.success());
}

#[test]
fn convert_cpu_writes_conformed_image() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in.png");
    let output = dir.path().join("out.png");
    write_ramp(&input, 16, 4);

    let out = conform(&[
        "convert",
        input.to_str().unwrap(),
        output.to_str().unwrap(),
        "--output",
        "4x2",
        "--format",
        "r8",
        "--mirror",
        "never",
    ]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let result = image::open(&output).unwrap().to_luma8();
    assert_eq!(result.dimensions(), (4, 2));
    assert_eq!(result.into_raw(), vec![21, 23, 25, 27, 53, 55, 57, 59]);
}

#[test]
fn convert_gpu_rotates() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("portrait.png");
    let output = dir.path().join("landscape.png");
    write_ramp(&input, 4, 8);

    let out = conform(&[
        "convert",
        input.to_str().unwrap(),
        output.to_str().unwrap(),
        "--output",
        "8x4",
        "--rotation",
        "90",
        "--filter",
        "point",
        "--mirror",
        "never",
        "--gpu",
    ]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let result = image::open(&output).unwrap().to_rgba8();
    assert_eq!(result.dimensions(), (8, 4));
    assert_eq!(result.get_pixel(0, 0).0[0], 28);
    assert_eq!(result.get_pixel(7, 3).0[0], 3);
}

fn assert_intrinsics(stdout: &[u8], expected: [f64; 4]) {
    let report: serde_json::Value = serde_json::from_slice(stdout).unwrap();
    let intrinsics = &report["intrinsics"];
    for (key, want) in ["fx", "fy", "cx", "cy"].into_iter().zip(expected) {
        let got = intrinsics[key].as_f64().unwrap();
        assert!((got - want).abs() < 1e-3, "{}: expected {} got {}", key, want, got);
    }
    assert_eq!(intrinsics["matrix"].as_array().unwrap().len(), 9);
}

#[test]
fn convert_gpu_remaps_given_intrinsics() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("hd.png");
    let output = dir.path().join("vga.png");
    write_ramp(&input, 1280, 720);

    let out = conform(&[
        "convert",
        input.to_str().unwrap(),
        output.to_str().unwrap(),
        "--gpu",
        "--fx",
        "900",
        "--fy",
        "900",
        "--cx",
        "640",
        "--cy",
        "360",
    ]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert_intrinsics(&out.stdout, [600.0, 600.0, 320.0, 240.0]);
    assert_eq!(image::open(&output).unwrap().to_rgba8().dimensions(), (640, 480));
}

#[test]
fn convert_gpu_rotates_intrinsics_with_the_frame() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("portrait.png");
    let output = dir.path().join("landscape.png");
    write_ramp(&input, 720, 1280);

    // Sensor principal point sits 40 px above centre; after a clockwise turn
    // it sits 40 px right of centre in the 1280x720 display frame.
    let out = conform(&[
        "convert",
        input.to_str().unwrap(),
        output.to_str().unwrap(),
        "--output",
        "1280x720",
        "--rotation",
        "90",
        "--gpu",
        "--fx",
        "800",
        "--fy",
        "900",
        "--cx",
        "360",
        "--cy",
        "600",
    ]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert_intrinsics(&out.stdout, [900.0, 800.0, 680.0, 360.0]);
}

#[test]
fn convert_cpu_and_gpu_report_the_same_intrinsics() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("hd.png");
    write_ramp(&input, 1280, 720);

    let mut reports = Vec::new();
    for (name, gpu) in [("cpu.png", false), ("gpu.png", true)] {
        let output = dir.path().join(name);
        let mut args = vec![
            "convert",
            input.to_str().unwrap(),
            output.to_str().unwrap(),
            "--fx",
            "900",
            "--fy",
            "900",
            "--cx",
            "640",
            "--cy",
            "360",
        ];
        if gpu {
            args.push("--gpu");
        }
        let out = conform(&args);
        assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
        let report: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
        reports.push(report["intrinsics"]["matrix"].clone());
    }
    assert_eq!(reports[0], reports[1]);
}

#[test]
fn convert_reports_fatal_config_errors_with_a_hint() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in.png");
    write_ramp(&input, 16, 4);

    let out = conform(&[
        "convert",
        input.to_str().unwrap(),
        dir.path().join("out.png").to_str().unwrap(),
        "--output",
        "480x640",
    ]);
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("use a landscape resolution"), "{}", stderr);
    assert!(stderr.contains("Configuration error in 'output'"), "{}", stderr);
}
