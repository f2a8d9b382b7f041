//! # Configuration Module
//!
//! Configuration structures and validation for frame conforming. It is the
//! common interface between the CLI and the library: the CLI fills a
//! [`ConformConfig`], validates it once, and resolves it into the
//! [`ConformSettings`] every frame is processed with.
//!
//! ## Configuration Parameters
//!
//! | Parameter | Type | Range | Description |
//! |-----------|------|-------|-------------|
//! | `output_width` | `u32` | > `output_height` | Target width in pixels |
//! | `output_height` | `u32` | > 0 | Target height in pixels |
//! | `output_format` | `PixelFormat` | packed formats | Destination pixel layout |
//! | `rotation` | `Rotation` | 0/90/180/270 | Sensor-to-display rotation (GPU path) |
//! | `filter` | `FilterMode` | point/bilinear/trilinear | Source filter during the GPU pass |
//! | `mirror` | `MirrorPolicy` | auto/always/never | Horizontal mirroring |
//! | `shader_name` | `String` | non-empty | Resample program to look up |
//!
//! ## Mirroring
//!
//! Mirroring is decided once at startup by [`ConformConfig::resolve`].
//! `auto` reads `FRAME_CONFORM_MIRROR_X` (`1`/`true`/`yes` or `0`/`false`/`no`)
//! and otherwise follows the platform default: mirrored on iOS, not mirrored
//! elsewhere.
//!
//! ## Examples
//!
//! ```rust
//! use frame_conform::config::config::{ConformConfig, MirrorPolicy};
//!
//! let mut config = ConformConfig::default();
//! config.mirror = MirrorPolicy::Always;
//! assert!(config.validate().is_ok());
//!
//! let settings = config.resolve().unwrap();
//! assert!(settings.mirror_x);
//! assert_eq!(settings.output.width(), 640);
//! ```

use conform_scale::geometry::OutputResolution;
use conform_scale::image::PixelFormat;

use crate::error::{ConformError, ConformResult};
use crate::gpu::device::FilterMode;
use crate::gpu::shader::DEFAULT_SHADER_NAME;
use crate::gpu::transform::Rotation;

/// Environment variable consulted by [`MirrorPolicy::Auto`].
pub const MIRROR_ENV: &str = "FRAME_CONFORM_MIRROR_X";

/// How the horizontal mirror flag is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum MirrorPolicy {
    /// Environment override, then the platform default.
    #[default]
    #[clap(name = "auto")]
    Auto,
    #[clap(name = "always")]
    Always,
    #[clap(name = "never")]
    Never,
}

impl MirrorPolicy {
    /// Resolve against an arbitrary variable lookup.
    pub fn resolve_with<F>(self, lookup: F) -> ConformResult<bool>
    where
        F: FnOnce(&str) -> Option<String>,
    {
        match self {
            MirrorPolicy::Always => Ok(true),
            MirrorPolicy::Never => Ok(false),
            MirrorPolicy::Auto => match lookup(MIRROR_ENV) {
                Some(raw) => parse_flag(&raw)
                    .ok_or_else(|| ConformError::config(MIRROR_ENV, raw, "expected 1/true/yes or 0/false/no")),
                None => Ok(platform_mirrors()),
            },
        }
    }

    /// Resolve against the process environment.
    pub fn resolve(self) -> ConformResult<bool> {
        self.resolve_with(|key| std::env::var(key).ok())
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    }
}

/// Front cameras on iOS deliver unmirrored frames that consumers expect mirrored.
fn platform_mirrors() -> bool {
    cfg!(target_os = "ios")
}

/// Configuration structure for frame conforming.
///
/// # Examples
///
/// ```rust
/// use frame_conform::config::config::{ConformConfig, MirrorPolicy};
/// use frame_conform::gpu::{FilterMode, Rotation};
/// use conform_scale::image::PixelFormat;
///
/// let config = ConformConfig {
///     output_width: 1280,
///     output_height: 720,
///     output_format: PixelFormat::Bgra32,
///     rotation: Rotation::Clockwise90,
///     filter: FilterMode::Bilinear,
///     mirror: MirrorPolicy::Never,
///     shader_name: "frame-conform/resample".to_string(),
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConformConfig {
    /// Target width. Must be strictly greater than `output_height`.
    pub output_width: u32,

    /// Target height. Must be non-zero.
    pub output_height: u32,

    /// Destination pixel layout. Planar formats are input-only.
    pub output_format: PixelFormat,

    /// Clockwise rotation from sensor to display orientation. Only the GPU
    /// path rotates.
    pub rotation: Rotation,

    /// Filter the source texture is sampled with during the GPU pass.
    pub filter: FilterMode,

    pub mirror: MirrorPolicy,

    /// Name the resample program is looked up under.
    pub shader_name: String,
}

impl Default for ConformConfig {
    /// Default values:
    /// - `output_width` x `output_height`: 640x480
    /// - `output_format`: `rgba32`
    /// - `rotation`: none
    /// - `filter`: bilinear
    /// - `mirror`: auto
    /// - `shader_name`: [`DEFAULT_SHADER_NAME`]
    fn default() -> Self {
        Self {
            output_width: 640,
            output_height: 480,
            output_format: PixelFormat::Rgba32,
            rotation: Rotation::None,
            filter: FilterMode::Bilinear,
            mirror: MirrorPolicy::Auto,
            shader_name: DEFAULT_SHADER_NAME.to_string(),
        }
    }
}

/// A validated configuration with the mirror flag resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConformSettings {
    pub output: OutputResolution,
    pub output_format: PixelFormat,
    pub rotation: Rotation,
    pub filter: FilterMode,
    pub mirror_x: bool,
    pub shader_name: String,
}

impl ConformConfig {
    pub fn new(output_width: u32, output_height: u32, output_format: PixelFormat) -> Self {
        Self {
            output_width,
            output_height,
            output_format,
            ..Self::default()
        }
    }

    /// Validates the configuration parameters.
    pub fn validate(&self) -> ConformResult<()> {
        self.output_resolution()?;
        if !self.output_format.is_packed() {
            return Err(ConformError::config(
                "output_format",
                format!("{:?}", self.output_format),
                "output must be a packed format",
            ));
        }
        if self.shader_name.trim().is_empty() {
            return Err(ConformError::config("shader_name", "", "must not be empty"));
        }
        Ok(())
    }

    pub fn output_resolution(&self) -> ConformResult<OutputResolution> {
        OutputResolution::new(self.output_width, self.output_height).map_err(|e| {
            ConformError::config(
                "output",
                format!("{}x{}", self.output_width, self.output_height),
                e.to_string(),
            )
            .with_recovery_suggestion("use a landscape resolution such as 640x480")
        })
    }

    /// Validate and resolve everything that is decided once at startup,
    /// reading the mirror override from the process environment.
    pub fn resolve(&self) -> ConformResult<ConformSettings> {
        self.resolve_with(|key| std::env::var(key).ok())
    }

    pub fn resolve_with<F>(&self, lookup: F) -> ConformResult<ConformSettings>
    where
        F: FnOnce(&str) -> Option<String>,
    {
        self.validate()?;
        Ok(ConformSettings {
            output: self.output_resolution()?,
            output_format: self.output_format,
            rotation: self.rotation,
            filter: self.filter,
            mirror_x: self.mirror.resolve_with(lookup)?,
            shader_name: self.shader_name.clone(),
        })
    }
}
