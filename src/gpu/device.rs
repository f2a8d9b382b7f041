//! GPU device abstraction
//!
//! The seam between the resampler and a concrete graphics stack. Textures and
//! programs are opaque handles owned by the device; the resampler only ever
//! reads descriptions, toggles the sampling filter and submits passes.

use conform_scale::geometry::Size;

use crate::error::ConformResult;

/// Platform-agnostic texture handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(u64);

impl TextureHandle {
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Handle to a compiled shader program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramHandle(u64);

impl ProgramHandle {
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFormat {
    Rgba8Unorm,
    Bgra8Unorm,
    R8Unorm,
}

impl TextureFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            TextureFormat::Rgba8Unorm | TextureFormat::Bgra8Unorm => 4,
            TextureFormat::R8Unorm => 1,
        }
    }
}

/// Sampling filter of a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum FilterMode {
    #[clap(name = "point")]
    Point,
    #[default]
    #[clap(name = "bilinear")]
    Bilinear,
    #[clap(name = "trilinear")]
    Trilinear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureDesc {
    pub size: Size,
    pub format: TextureFormat,
    pub filter: FilterMode,
}

/// One full-target draw with the resample program.
#[derive(Debug, Clone, Copy)]
pub struct ResamplePass {
    pub program: ProgramHandle,
    pub source: TextureHandle,
    pub target: TextureHandle,
    /// Destination-to-source transform, row-major, normalized coordinates.
    pub transform: [f32; 9],
}

/// Operations the resampler needs from a graphics device.
///
/// Implementations are used from a single execution context; see
/// [`crate::gpu::worker::RenderWorker`].
pub trait GpuDevice {
    fn describe(&self, texture: TextureHandle) -> ConformResult<TextureDesc>;

    fn filter_mode(&self, texture: TextureHandle) -> ConformResult<FilterMode> {
        Ok(self.describe(texture)?.filter)
    }

    fn set_filter_mode(&mut self, texture: TextureHandle, mode: FilterMode) -> ConformResult<()>;

    /// Locate (and compile, if the backend needs to) a program by name.
    fn find_program(&mut self, name: &str) -> Option<ProgramHandle>;

    /// Execute `pass`, overwriting every texel of the target.
    fn resample(&mut self, pass: &ResamplePass) -> ConformResult<()>;
}
