use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use clap::{Args, Parser, Subcommand};
use conform_scale::geometry::{OutputResolution, Size, crop_axis, plan_crop};
use conform_scale::image::PixelFormat;
use conform_scale::intrinsics::{Intrinsics, IntrinsicsRemapper};
use frame_conform::config::{ConformConfig, ConformSettings, MirrorPolicy};
use frame_conform::error::{classify, ConformError, HasRecoverySuggestion, HasSeverity};
use frame_conform::gpu::{
    FilterMode, GpuRequest, GpuResampler, GpuStatus, RenderWorker, Rotation, SoftwareDevice, TextureFormat,
};
use frame_conform::processing::{CameraFrame, ConformProcessor, ConformedFrame, FrameProcessor};
use serde_json::json;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Conform camera frames to a landscape output resolution:
/// crop to aspect, scale, convert, rotate, mirror and remap intrinsics.
#[derive(Parser, Debug)]
#[command(name = "conform")]
#[command(about = "Crop, scale and reformat camera frames with matching intrinsics")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the crop decision (and remapped intrinsics) as JSON
    Plan {
        /// Input resolution, e.g. 1280x720
        #[arg(long, value_parser = parse_size)]
        input: Size,

        /// Landscape output resolution, e.g. 640x480
        #[arg(long, value_parser = parse_size)]
        output: Size,

        #[command(flatten)]
        intrinsics: IntrinsicsArgs,
    },
    /// Conform an image file, write the result and print the remapped
    /// intrinsics as JSON
    Convert {
        /// Source image (any format the image crate reads)
        input_path: PathBuf,

        /// Destination image; the extension selects the encoder
        output_path: PathBuf,

        /// Landscape output resolution
        #[arg(long = "output", value_parser = parse_size, default_value = "640x480")]
        resolution: Size,

        #[arg(long, value_enum, default_value = "rgba32")]
        format: PixelFormat,

        #[arg(long, value_enum, default_value = "auto")]
        mirror: MirrorPolicy,

        /// Sensor-to-display rotation in degrees (GPU path only)
        #[arg(long, value_enum, default_value = "0")]
        rotation: Rotation,

        #[arg(long, value_enum, default_value = "bilinear")]
        filter: FilterMode,

        /// Use the software GPU device on a render worker
        #[arg(long)]
        gpu: bool,

        #[command(flatten)]
        intrinsics: IntrinsicsArgs,
    },
}

#[derive(Args, Debug, Clone, Copy)]
struct IntrinsicsArgs {
    #[arg(long, requires_all = ["fy", "cx", "cy"])]
    fx: Option<f32>,
    #[arg(long)]
    fy: Option<f32>,
    #[arg(long)]
    cx: Option<f32>,
    #[arg(long)]
    cy: Option<f32>,
}

impl IntrinsicsArgs {
    fn at(&self, resolution: Size) -> Option<Intrinsics> {
        Some(Intrinsics::new((self.fx?, self.fy?), (self.cx?, self.cy?), resolution))
    }

    /// Given intrinsics, or a nominal camera with a centered principal point.
    fn or_nominal(&self, resolution: Size) -> Intrinsics {
        self.at(resolution).unwrap_or_else(|| {
            let f = resolution.w.max(resolution.h) as f32;
            Intrinsics::new((f, f), (resolution.w as f32 / 2.0, resolution.h as f32 / 2.0), resolution)
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let result = run(cli.command).await;
    if let Err(error) = &result {
        report(error);
    }
    result
}

async fn run(command: Command) -> Result<()> {
    match command {
        Command::Plan {
            input,
            output,
            intrinsics,
        } => plan(input, output, intrinsics),
        Command::Convert {
            input_path,
            output_path,
            resolution,
            format,
            mirror,
            rotation,
            filter,
            gpu,
            intrinsics,
        } => {
            let config = ConformConfig {
                output_width: resolution.w,
                output_height: resolution.h,
                output_format: format,
                rotation,
                filter,
                mirror,
                ..ConformConfig::default()
            };
            let settings = config.resolve()?;
            if gpu {
                convert_gpu(input_path, output_path, settings, intrinsics).await
            } else {
                convert_cpu(&input_path, &output_path, &settings, intrinsics).await
            }
        }
    }
}

/// Logs go to stderr so the JSON on stdout stays machine-readable.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Log how a failed run should be treated before anyhow prints the chain.
fn report(error: &anyhow::Error) {
    let Some(conform) = error.downcast_ref::<ConformError>() else {
        return;
    };
    error!(
        category = conform.category(),
        severity = ?conform.severity(),
        fatal = classify::is_fatal(conform),
        hint = conform.recovery_suggestion().unwrap_or("none"),
        "{}",
        conform
    );
}

/// Parse "WxH" into a size
fn parse_size(s: &str) -> std::result::Result<Size, String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{}'", s))?;
    let w = w.trim().parse::<u32>().map_err(|e| format!("invalid width '{}': {}", w, e))?;
    let h = h.trim().parse::<u32>().map_err(|e| format!("invalid height '{}': {}", h, e))?;
    Ok(Size::new(w, h))
}

fn plan(input: Size, output: Size, intrinsics: IntrinsicsArgs) -> Result<()> {
    let output = OutputResolution::try_from(output).context("output resolution")?;
    let axis = crop_axis(input, output);
    let rect = plan_crop(input, output);

    let mut report = json!({
        "input": input.to_string(),
        "output": output.to_string(),
        "axis": format!("{:?}", axis),
        "crop": {
            "x_min": rect.x_min,
            "x_max": rect.x_max,
            "y_min": rect.y_min,
            "y_max": rect.y_max,
        },
    });
    if let Some(camera) = intrinsics.at(input) {
        let mut matrix = [0.0f32; 9];
        let remapped = IntrinsicsRemapper.remap_into(&camera, output, &mut matrix)?;
        report["intrinsics"] = intrinsics_json(&remapped, &matrix);
    }
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn intrinsics_json(intrinsics: &Intrinsics, matrix: &[f32; 9]) -> serde_json::Value {
    json!({
        "fx": intrinsics.focal_length.0,
        "fy": intrinsics.focal_length.1,
        "cx": intrinsics.principal_point.0,
        "cy": intrinsics.principal_point.1,
        "matrix": matrix,
    })
}

/// Print the calibration that goes with a written frame.
fn print_conformed(resolution: OutputResolution, intrinsics: &Intrinsics, matrix: &[f32; 9]) -> Result<()> {
    info!(
        fx = intrinsics.focal_length.0,
        fy = intrinsics.focal_length.1,
        cx = intrinsics.principal_point.0,
        cy = intrinsics.principal_point.1,
        "remapped intrinsics"
    );
    let report = json!({
        "output": resolution.to_string(),
        "intrinsics": intrinsics_json(intrinsics, matrix),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn convert_cpu(
    input_path: &Path,
    output_path: &Path,
    settings: &ConformSettings,
    intrinsics: IntrinsicsArgs,
) -> Result<()> {
    let source = image::open(input_path)
        .with_context(|| format!("failed to open {}", input_path.display()))?
        .to_rgba8();
    let size = Size::new(source.width(), source.height());
    let frame = CameraFrame::packed(
        source.into_raw(),
        size.w,
        size.h,
        PixelFormat::Rgba32,
        intrinsics.or_nominal(size),
    );

    let mut processor = ConformProcessor::new(settings);
    processor.initialize(size).await?;
    let conformed = processor
        .process_frame(frame)
        .await?
        .ok_or_else(|| anyhow!("frame was skipped"))?;

    let ConformedFrame {
        data,
        resolution,
        format,
        intrinsics,
        matrix,
        ..
    } = conformed;
    save(output_path, &data, resolution, format)?;
    print_conformed(resolution, &intrinsics, &matrix)
}

async fn convert_gpu(
    input_path: PathBuf,
    output_path: PathBuf,
    settings: ConformSettings,
    intrinsics: IntrinsicsArgs,
) -> Result<()> {
    let target_format = match settings.output_format {
        PixelFormat::Rgba32 => TextureFormat::Rgba8Unorm,
        PixelFormat::Bgra32 => TextureFormat::Bgra8Unorm,
        PixelFormat::R8 => TextureFormat::R8Unorm,
        other => bail!("GPU path cannot render {:?}", other),
    };

    let output = settings.output;
    // Everything below blocks on the render worker.
    let (remapped, matrix) = tokio::task::spawn_blocking(move || -> Result<(Intrinsics, [f32; 9])> {
        let source = image::open(&input_path)
            .with_context(|| format!("failed to open {}", input_path.display()))?
            .to_rgba8();
        let size = Size::new(source.width(), source.height());

        // The pass crops the rotated frame, so the camera has to be rotated first.
        let camera = settings.rotation.orient_intrinsics(&intrinsics.or_nominal(size));
        let mut matrix = [0.0f32; 9];
        let remapped = IntrinsicsRemapper
            .remap_into(&camera, settings.output, &mut matrix)
            .map_err(|e| ConformError::scale("remap intrinsics", e))?;

        let mut device = SoftwareDevice::new();
        device.register_program(settings.shader_name.clone());
        let src = device.create_texture(size, TextureFormat::Rgba8Unorm, FilterMode::Point)?;
        device.upload(src, source.as_raw())?;
        let dst = device.create_texture(settings.output.size(), target_format, FilterMode::Point)?;

        let worker = RenderWorker::spawn(device, GpuResampler::new(settings.shader_name.clone()))?;
        let request = GpuRequest::new(src, dst)
            .with_rotation(settings.rotation)
            .with_filter(settings.filter)
            .mirrored(settings.mirror_x);
        if worker.resample(request)? == GpuStatus::SkippedMissingShader {
            bail!("resample program '{}' is not available", settings.shader_name);
        }
        let pixels = worker.run(move |device, _| device.read_back(dst))??;
        save(&output_path, &pixels, settings.output, settings.output_format)?;
        Ok((remapped, matrix))
    })
    .await??;
    print_conformed(output, &remapped, &matrix)
}

fn save(path: &Path, data: &[u8], resolution: OutputResolution, format: PixelFormat) -> Result<()> {
    let (w, h) = (resolution.width(), resolution.height());
    let result = match format {
        PixelFormat::Rgba32 => image::save_buffer(path, data, w, h, image::ColorType::Rgba8),
        PixelFormat::Rgb24 => image::save_buffer(path, data, w, h, image::ColorType::Rgb8),
        PixelFormat::R8 => image::save_buffer(path, data, w, h, image::ColorType::L8),
        PixelFormat::Bgra32 => {
            let rgba: Vec<u8> = data
                .chunks_exact(4)
                .flat_map(|px| [px[2], px[1], px[0], px[3]])
                .collect();
            image::save_buffer(path, &rgba, w, h, image::ColorType::Rgba8)
        }
        PixelFormat::Yuv420 => bail!("cannot save planar output"),
    };
    result.with_context(|| format!("failed to write {}", path.display()))?;
    info!(path = %path.display(), %resolution, ?format, "wrote conformed frame");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("1280x720").unwrap(), Size::new(1280, 720));
        assert_eq!(parse_size("640X480").unwrap(), Size::new(640, 480));
        assert!(parse_size("640").is_err());
        assert!(parse_size("ax480").is_err());
    }

    #[test]
    fn test_nominal_intrinsics() {
        let args = IntrinsicsArgs {
            fx: None,
            fy: None,
            cx: None,
            cy: None,
        };
        let camera = args.or_nominal(Size::new(1280, 720));
        assert_eq!(camera.focal_length, (1280.0, 1280.0));
        assert_eq!(camera.principal_point, (640.0, 360.0));
    }
}
