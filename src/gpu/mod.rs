//! GPU path: device seam, display transform, shader cache, resampler and the
//! render worker that confines them to one thread.

pub mod device;
pub mod resampler;
pub mod shader;
pub mod software;
pub mod transform;
pub mod worker;

pub use device::{FilterMode, GpuDevice, ProgramHandle, TextureDesc, TextureFormat, TextureHandle};
pub use resampler::{FilterModeOverride, GpuRequest, GpuResampler, GpuStatus};
pub use shader::{ShaderCache, DEFAULT_SHADER_NAME};
pub use software::SoftwareDevice;
pub use transform::{display_transform, display_transform_matrix, Affine2, MatrixLayout, Rotation};
pub use worker::RenderWorker;
