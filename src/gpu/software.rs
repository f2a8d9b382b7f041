//! CPU-resident [`GpuDevice`] used as the reference backend.
//!
//! Textures live in host memory and a resample pass evaluates the transform
//! for every destination pixel centre, exactly as a full-screen fragment
//! shader would.

use std::collections::HashMap;

use conform_scale::geometry::Size;
use tracing::debug;

use super::device::{
    FilterMode, GpuDevice, ProgramHandle, ResamplePass, TextureDesc, TextureFormat, TextureHandle,
};
use crate::error::{ConformError, ConformResult};

#[derive(Debug)]
struct Texture {
    desc: TextureDesc,
    data: Vec<u8>,
}

impl Texture {
    fn rgba_at(&self, x: u32, y: u32) -> [u8; 4] {
        let bpp = self.desc.format.bytes_per_pixel();
        let i = (y as usize * self.desc.size.w as usize + x as usize) * bpp;
        let px = &self.data[i..i + bpp];
        match self.desc.format {
            TextureFormat::Rgba8Unorm => [px[0], px[1], px[2], px[3]],
            TextureFormat::Bgra8Unorm => [px[2], px[1], px[0], px[3]],
            TextureFormat::R8Unorm => [px[0], px[0], px[0], 255],
        }
    }

    /// Clamp-to-edge lookup at normalized coordinates.
    fn sample(&self, s: f64, t: f64, filter: FilterMode) -> [u8; 4] {
        let Size { w, h } = self.desc.size;
        match filter {
            FilterMode::Point => {
                let x = (s * f64::from(w)).floor().clamp(0.0, f64::from(w - 1)) as u32;
                let y = (t * f64::from(h)).floor().clamp(0.0, f64::from(h - 1)) as u32;
                self.rgba_at(x, y)
            }
            // No mip chain is kept, so trilinear degrades to bilinear.
            FilterMode::Bilinear | FilterMode::Trilinear => {
                let fx = (s * f64::from(w) - 0.5).clamp(0.0, f64::from(w - 1));
                let fy = (t * f64::from(h) - 0.5).clamp(0.0, f64::from(h - 1));
                let (x0, y0) = (fx.floor() as u32, fy.floor() as u32);
                let (x1, y1) = ((x0 + 1).min(w - 1), (y0 + 1).min(h - 1));
                let (ax, ay) = (fx - f64::from(x0), fy - f64::from(y0));
                let (p00, p10) = (self.rgba_at(x0, y0), self.rgba_at(x1, y0));
                let (p01, p11) = (self.rgba_at(x0, y1), self.rgba_at(x1, y1));
                let mut out = [0u8; 4];
                for c in 0..4 {
                    let top = f64::from(p00[c]) * (1.0 - ax) + f64::from(p10[c]) * ax;
                    let bottom = f64::from(p01[c]) * (1.0 - ax) + f64::from(p11[c]) * ax;
                    out[c] = (top * (1.0 - ay) + bottom * ay).round().clamp(0.0, 255.0) as u8;
                }
                out
            }
        }
    }

    fn store(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        let bpp = self.desc.format.bytes_per_pixel();
        let i = (y as usize * self.desc.size.w as usize + x as usize) * bpp;
        let px = &mut self.data[i..i + bpp];
        match self.desc.format {
            TextureFormat::Rgba8Unorm => px.copy_from_slice(&rgba),
            TextureFormat::Bgra8Unorm => px.copy_from_slice(&[rgba[2], rgba[1], rgba[0], rgba[3]]),
            TextureFormat::R8Unorm => {
                let [r, g, b, _] = rgba.map(u32::from);
                px[0] = ((77 * r + 150 * g + 29 * b) >> 8) as u8;
            }
        }
    }
}

/// Host-memory graphics device.
#[derive(Debug, Default)]
pub struct SoftwareDevice {
    textures: HashMap<TextureHandle, Texture>,
    programs: HashMap<String, ProgramHandle>,
    next_id: u64,
    program_lookups: usize,
    passes: usize,
}

impl SoftwareDevice {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Make a program available under `name`.
    pub fn register_program(&mut self, name: impl Into<String>) -> ProgramHandle {
        let handle = ProgramHandle::from_raw(self.next_id());
        self.programs.insert(name.into(), handle);
        handle
    }

    /// Allocate a zero-filled texture.
    pub fn create_texture(
        &mut self,
        size: Size,
        format: TextureFormat,
        filter: FilterMode,
    ) -> ConformResult<TextureHandle> {
        if size.is_empty() {
            return Err(ConformError::validation("texture size", "must be non-zero", size.to_string()));
        }
        let handle = TextureHandle::from_raw(self.next_id());
        let desc = TextureDesc { size, format, filter };
        let data = vec![0u8; size.area() * format.bytes_per_pixel()];
        self.textures.insert(handle, Texture { desc, data });
        Ok(handle)
    }

    /// Replace a texture's contents with tightly packed pixels.
    pub fn upload(&mut self, texture: TextureHandle, pixels: &[u8]) -> ConformResult<()> {
        let tex = self.texture_mut(texture)?;
        if pixels.len() != tex.data.len() {
            return Err(ConformError::validation(
                "upload",
                format!("expected {} bytes", tex.data.len()),
                pixels.len().to_string(),
            ));
        }
        tex.data.copy_from_slice(pixels);
        Ok(())
    }

    pub fn read_back(&self, texture: TextureHandle) -> ConformResult<Vec<u8>> {
        Ok(self.texture(texture)?.data.clone())
    }

    /// Number of `find_program` calls seen so far.
    pub fn program_lookups(&self) -> usize {
        self.program_lookups
    }

    /// Number of resample passes executed.
    pub fn passes(&self) -> usize {
        self.passes
    }

    fn texture(&self, handle: TextureHandle) -> ConformResult<&Texture> {
        self.textures
            .get(&handle)
            .ok_or_else(|| ConformError::gpu("texture lookup", format!("unknown texture {}", handle.raw())))
    }

    fn texture_mut(&mut self, handle: TextureHandle) -> ConformResult<&mut Texture> {
        self.textures
            .get_mut(&handle)
            .ok_or_else(|| ConformError::gpu("texture lookup", format!("unknown texture {}", handle.raw())))
    }
}

impl GpuDevice for SoftwareDevice {
    fn describe(&self, texture: TextureHandle) -> ConformResult<TextureDesc> {
        Ok(self.texture(texture)?.desc)
    }

    fn set_filter_mode(&mut self, texture: TextureHandle, mode: FilterMode) -> ConformResult<()> {
        self.texture_mut(texture)?.desc.filter = mode;
        Ok(())
    }

    fn find_program(&mut self, name: &str) -> Option<ProgramHandle> {
        self.program_lookups += 1;
        self.programs.get(name).copied()
    }

    fn resample(&mut self, pass: &ResamplePass) -> ConformResult<()> {
        if !self.programs.values().any(|p| *p == pass.program) {
            return Err(ConformError::gpu("resample", format!("unknown program {}", pass.program.raw())));
        }
        if pass.source == pass.target {
            return Err(ConformError::gpu("resample", "source and target must differ"));
        }
        // Take the target out so the source can be borrowed alongside it.
        let mut target = self
            .textures
            .remove(&pass.target)
            .ok_or_else(|| ConformError::gpu("resample", format!("unknown texture {}", pass.target.raw())))?;
        let result = self.texture(pass.source).map(|source| {
            let m = pass.transform.map(f64::from);
            let Size { w, h } = target.desc.size;
            let filter = source.desc.filter;
            for y in 0..h {
                let v = (f64::from(y) + 0.5) / f64::from(h);
                for x in 0..w {
                    let u = (f64::from(x) + 0.5) / f64::from(w);
                    let s = m[0] * u + m[1] * v + m[2];
                    let t = m[3] * u + m[4] * v + m[5];
                    target.store(x, y, source.sample(s, t, filter));
                }
            }
        });
        self.textures.insert(pass.target, target);
        result?;
        self.passes += 1;
        debug!(source = pass.source.raw(), target = pass.target.raw(), "software resample pass");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_pass_copies_texels() {
        let mut device = SoftwareDevice::new();
        let program = device.register_program("copy");
        let size = Size::new(2, 2);
        let src = device.create_texture(size, TextureFormat::Rgba8Unorm, FilterMode::Point).unwrap();
        let dst = device.create_texture(size, TextureFormat::Bgra8Unorm, FilterMode::Point).unwrap();
        let pixels: Vec<u8> = (0..16).collect();
        device.upload(src, &pixels).unwrap();

        let pass = ResamplePass {
            program,
            source: src,
            target: dst,
            transform: [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
        };
        device.resample(&pass).unwrap();

        let out = device.read_back(dst).unwrap();
        assert_eq!(&out[..4], &[2, 1, 0, 3]);
        assert_eq!(&out[12..], &[14, 13, 12, 15]);
        assert_eq!(device.passes(), 1);
    }

    #[test]
    fn bilinear_blends_neighbours() {
        let mut device = SoftwareDevice::new();
        let program = device.register_program("blend");
        let src = device
            .create_texture(Size::new(2, 1), TextureFormat::R8Unorm, FilterMode::Bilinear)
            .unwrap();
        let dst = device
            .create_texture(Size::new(2, 1), TextureFormat::R8Unorm, FilterMode::Point)
            .unwrap();
        device.upload(src, &[0, 200]).unwrap();
        // Sample both destination texels at the source midpoint.
        let pass = ResamplePass {
            program,
            source: src,
            target: dst,
            transform: [0.0, 0.0, 0.5, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
        };
        device.resample(&pass).unwrap();
        assert_eq!(device.read_back(dst).unwrap(), vec![100, 100]);
    }

    #[test]
    fn unknown_handles_are_errors() {
        let mut device = SoftwareDevice::new();
        let missing = TextureHandle::from_raw(99);
        assert!(device.describe(missing).is_err());
        assert!(device.set_filter_mode(missing, FilterMode::Point).is_err());
        assert_eq!(device.find_program("nope"), None);
        assert_eq!(device.program_lookups(), 1);
    }

    #[test]
    fn upload_checks_length() {
        let mut device = SoftwareDevice::new();
        let tex = device
            .create_texture(Size::new(2, 2), TextureFormat::Rgba8Unorm, FilterMode::Point)
            .unwrap();
        assert!(device.upload(tex, &[0; 3]).is_err());
    }
}
