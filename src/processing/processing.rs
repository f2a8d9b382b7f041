//! # Frame Processing
//!
//! Async adapter between a frame source and the CPU conforming path. Each
//! [`CameraFrame`] carries its pixels and the intrinsics valid for its
//! resolution; [`ConformProcessor`] turns it into a [`ConformedFrame`] whose
//! pixels and calibration were cut by the same crop decision.
//!
//! Frames use `Arc<Vec<u8>>` so they can be handed to several consumers
//! without copying.

use std::sync::Arc;

use async_trait::async_trait;
use conform_scale::cpu::{ConversionParams, ConversionStatus, CpuResampler};
use conform_scale::geometry::{OutputResolution, Size};
use conform_scale::image::{CpuImage, PixelFormat, Plane};
use conform_scale::intrinsics::{Intrinsics, IntrinsicsRemapper};
use tracing::{debug, warn};

use crate::config::ConformSettings;
use crate::error::{ConformError, ConformResult};
use crate::gpu::transform::Rotation;

/// Abstract frame processing interface.
#[async_trait]
pub trait FrameProcessor: Send + Sync {
    /// Initialize the processor with the input size and return the output size.
    async fn initialize(&mut self, input_size: Size) -> ConformResult<Size>;

    /// Process a single frame.
    ///
    /// # Returns
    /// The conformed frame, or `None` when the frame was skipped
    async fn process_frame(&mut self, frame: CameraFrame) -> ConformResult<Option<ConformedFrame>>;
}

/// One plane of a [`CameraFrame`].
#[derive(Debug, Clone)]
pub struct FramePlane {
    pub data: Arc<Vec<u8>>,
    /// Bytes between the starts of consecutive rows
    pub row_stride: usize,
    /// Bytes between horizontally adjacent samples
    pub pixel_stride: usize,
}

/// A frame as delivered by a camera source.
#[derive(Debug, Clone)]
pub struct CameraFrame {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub planes: Vec<FramePlane>,
    /// Cleared by the source for frames that must not be used
    pub valid: bool,
    /// Calibration at `width` x `height`
    pub intrinsics: Intrinsics,
    /// Optional presentation timestamp in nanoseconds
    pub pts_ns: Option<u64>,
}

impl CameraFrame {
    /// Tightly packed single-plane frame.
    pub fn packed(data: Vec<u8>, width: u32, height: u32, format: PixelFormat, intrinsics: Intrinsics) -> Self {
        let bpp = format.bytes_per_pixel().unwrap_or(1);
        Self {
            width,
            height,
            format,
            planes: vec![FramePlane {
                data: Arc::new(data),
                row_stride: width as usize * bpp,
                pixel_stride: bpp,
            }],
            valid: true,
            intrinsics,
            pts_ns: None,
        }
    }

    pub fn with_valid(mut self, valid: bool) -> Self {
        self.valid = valid;
        self
    }

    pub fn with_pts(mut self, pts_ns: u64) -> Self {
        self.pts_ns = Some(pts_ns);
        self
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Borrowed view for the CPU resampler.
    pub fn as_image(&self) -> CpuImage<'_> {
        CpuImage {
            size: self.size(),
            format: self.format,
            planes: self
                .planes
                .iter()
                .map(|p| Plane::new(p.data.as_slice(), p.row_stride, p.pixel_stride))
                .collect(),
            valid: self.valid,
        }
    }
}

/// Output of [`ConformProcessor`].
#[derive(Debug, Clone)]
pub struct ConformedFrame {
    /// Tightly packed pixels in `format`
    pub data: Arc<Vec<u8>>,
    pub resolution: OutputResolution,
    pub format: PixelFormat,
    /// Intrinsics remapped to `resolution`
    pub intrinsics: Intrinsics,
    /// Column-major 3x3 camera matrix, zero outside {0, 4, 6, 7, 8}
    pub matrix: [f32; 9],
    pub pts_ns: Option<u64>,
}

impl ConformedFrame {
    /// Row stride of `data` in bytes.
    pub fn stride(&self) -> usize {
        self.resolution.width() as usize * self.format.bytes_per_pixel().unwrap_or(1)
    }
}

/// CPU crop + scale + convert, paired with the matching intrinsics remap.
pub struct ConformProcessor {
    params: ConversionParams,
    resampler: CpuResampler,
    remapper: IntrinsicsRemapper,
    input_size: Option<Size>,
}

impl ConformProcessor {
    pub fn new(settings: &ConformSettings) -> Self {
        if settings.rotation != Rotation::None {
            warn!(
                rotation = settings.rotation.degrees(),
                "CPU conforming does not rotate; rotation applies to the GPU path only"
            );
        }
        Self {
            params: ConversionParams::new(settings.output, settings.output_format).mirrored(settings.mirror_x),
            resampler: CpuResampler::new(),
            remapper: IntrinsicsRemapper,
            input_size: None,
        }
    }

    pub fn params(&self) -> &ConversionParams {
        &self.params
    }

    /// Synchronous body of [`FrameProcessor::process_frame`].
    pub fn conform(&mut self, frame: &CameraFrame) -> ConformResult<Option<ConformedFrame>> {
        if let Some(expected) = self.input_size {
            if expected != frame.size() {
                debug!(expected = %expected, actual = %frame.size(), "input size changed");
            }
        }
        if !frame.valid {
            return Ok(None);
        }
        if frame.intrinsics.resolution != frame.size() {
            return Err(ConformError::validation(
                "intrinsics.resolution",
                format!("must match frame size {}", frame.size()),
                frame.intrinsics.resolution.to_string(),
            ));
        }

        // Degenerate crops fail here, before any pixels are touched.
        let mut matrix = [0.0f32; 9];
        let intrinsics = self
            .remapper
            .remap_into(&frame.intrinsics, self.params.output, &mut matrix)
            .map_err(|e| ConformError::scale("remap intrinsics", e))?;

        let len = self
            .params
            .buffer_len()
            .map_err(|e| ConformError::scale("size output buffer", e))?;
        let mut data = vec![0u8; len];
        let status = self
            .resampler
            .convert(&frame.as_image(), &self.params, &mut data)
            .map_err(|e| ConformError::scale("cpu conform", e))?;
        if status == ConversionStatus::SkippedInvalidImage {
            return Ok(None);
        }

        Ok(Some(ConformedFrame {
            data: Arc::new(data),
            resolution: self.params.output,
            format: self.params.format,
            intrinsics,
            matrix,
            pts_ns: frame.pts_ns,
        }))
    }
}

#[async_trait]
impl FrameProcessor for ConformProcessor {
    async fn initialize(&mut self, input_size: Size) -> ConformResult<Size> {
        if input_size.is_empty() {
            return Err(ConformError::validation("input_size", "must be non-zero", input_size.to_string()));
        }
        self.input_size = Some(input_size);
        debug!(input = %input_size, output = %self.params.output, "conform processor initialized");
        Ok(self.params.output.size())
    }

    async fn process_frame(&mut self, frame: CameraFrame) -> ConformResult<Option<ConformedFrame>> {
        self.conform(&frame)
    }
}
