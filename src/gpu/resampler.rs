//! GPU crop + scale + rotate + mirror.

use std::ops::{Deref, DerefMut};

use conform_scale::geometry::OutputResolution;
use tracing::{debug, warn};

use super::device::{FilterMode, GpuDevice, ResamplePass, TextureHandle};
use super::shader::ShaderCache;
use super::transform::{display_transform, MatrixLayout, Rotation};
use crate::error::{ConformError, ConformResult};

/// Outcome of a GPU conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpuStatus {
    Converted,
    /// The resample program could not be found; the target was not written.
    SkippedMissingShader,
}

#[derive(Debug, Clone, Copy)]
pub struct GpuRequest {
    pub source: TextureHandle,
    /// Pre-sized to the landscape output resolution.
    pub target: TextureHandle,
    pub rotation: Rotation,
    /// Filter applied to the source for the duration of the pass.
    pub filter: FilterMode,
    pub mirror_x: bool,
}

impl GpuRequest {
    pub fn new(source: TextureHandle, target: TextureHandle) -> Self {
        Self {
            source,
            target,
            rotation: Rotation::None,
            filter: FilterMode::default(),
            mirror_x: false,
        }
    }

    pub fn with_rotation(mut self, rotation: Rotation) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_filter(mut self, filter: FilterMode) -> Self {
        self.filter = filter;
        self
    }

    pub fn mirrored(mut self, mirror_x: bool) -> Self {
        self.mirror_x = mirror_x;
        self
    }
}

/// Switches a texture's filter mode and puts the original back on drop.
///
/// Derefs to the device so the pass is issued through the guard.
pub struct FilterModeOverride<'a, D: GpuDevice + ?Sized> {
    device: &'a mut D,
    texture: TextureHandle,
    original: Option<FilterMode>,
}

impl<'a, D: GpuDevice + ?Sized> FilterModeOverride<'a, D> {
    pub fn apply(device: &'a mut D, texture: TextureHandle, mode: FilterMode) -> ConformResult<Self> {
        let current = device.filter_mode(texture)?;
        let original = if current != mode {
            device.set_filter_mode(texture, mode)?;
            Some(current)
        } else {
            None
        };
        Ok(Self {
            device,
            texture,
            original,
        })
    }
}

impl<D: GpuDevice + ?Sized> Deref for FilterModeOverride<'_, D> {
    type Target = D;

    fn deref(&self) -> &D {
        self.device
    }
}

impl<D: GpuDevice + ?Sized> DerefMut for FilterModeOverride<'_, D> {
    fn deref_mut(&mut self) -> &mut D {
        self.device
    }
}

impl<D: GpuDevice + ?Sized> Drop for FilterModeOverride<'_, D> {
    fn drop(&mut self) {
        if let Some(original) = self.original.take() {
            if let Err(e) = self.device.set_filter_mode(self.texture, original) {
                warn!(texture = self.texture.raw(), "failed to restore filter mode: {}", e);
            }
        }
    }
}

/// Converts a GPU-resident frame into a pre-sized target texture.
///
/// Uses [`super::shader::DEFAULT_SHADER_NAME`] unless built with [`GpuResampler::new`].
/// Owns the shader cache, so a resampler (and the device it is used with)
/// belongs to a single render context; see [`super::worker::RenderWorker`].
#[derive(Debug, Default)]
pub struct GpuResampler {
    shader: ShaderCache,
}

impl GpuResampler {
    pub fn new(shader_name: impl Into<String>) -> Self {
        Self {
            shader: ShaderCache::new(shader_name),
        }
    }

    pub fn shader(&self) -> &ShaderCache {
        &self.shader
    }

    pub fn resample<D: GpuDevice + ?Sized>(&self, device: &mut D, request: &GpuRequest) -> ConformResult<GpuStatus> {
        let source = device.describe(request.source)?;
        let target = device.describe(request.target)?;
        let output = OutputResolution::try_from(target.size)
            .map_err(|e| ConformError::scale("gpu resample", e).with_context("target texture size"))?;

        let Some(program) = self.shader.get_or_load(device) else {
            warn!(
                shader = %self.shader.name(),
                "resample program not found, skipping frame"
            );
            return Ok(GpuStatus::SkippedMissingShader);
        };

        let transform = display_transform(
            source.size,
            output,
            request.rotation,
            request.mirror_x,
            MatrixLayout::RowMajor,
        );
        debug!(
            source = %source.size,
            target = %output,
            rotation = request.rotation.degrees(),
            mirror_x = request.mirror_x,
            "gpu resample"
        );

        let mut device = FilterModeOverride::apply(device, request.source, request.filter)?;
        device.resample(&ResamplePass {
            program,
            source: request.source,
            target: request.target,
            transform,
        })?;
        Ok(GpuStatus::Converted)
    }
}
