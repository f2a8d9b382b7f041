//! Lazily loaded resample program.

use std::cell::Cell;

use once_cell::unsync::OnceCell;
use tracing::{debug, info};

use super::device::{GpuDevice, ProgramHandle};

/// Name the resample program is registered under.
pub const DEFAULT_SHADER_NAME: &str = "frame-conform/resample";

/// Owned handle to the resample program, loaded on first successful use.
///
/// The cache is `Send` but not `Sync`: it can move onto the render thread but
/// cannot be shared between threads, which keeps every lookup on one execution
/// context.
#[derive(Debug)]
pub struct ShaderCache {
    name: String,
    program: OnceCell<ProgramHandle>,
    compilations: Cell<usize>,
    accesses: Cell<usize>,
}

impl ShaderCache {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            program: OnceCell::new(),
            compilations: Cell::new(0),
            accesses: Cell::new(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Return the cached program, looking it up on `device` the first time.
    ///
    /// A failed lookup is not cached; the next call asks the device again.
    pub fn get_or_load<D: GpuDevice + ?Sized>(&self, device: &mut D) -> Option<ProgramHandle> {
        self.accesses.set(self.accesses.get() + 1);
        self.program
            .get_or_try_init(|| {
                let program = device.find_program(&self.name).ok_or(())?;
                self.compilations.set(self.compilations.get() + 1);
                info!(shader = %self.name, program = program.raw(), "resample program loaded");
                Ok::<_, ()>(program)
            })
            .ok()
            .copied()
            .or_else(|| {
                debug!(shader = %self.name, "resample program not available");
                None
            })
    }

    pub fn is_loaded(&self) -> bool {
        self.program.get().is_some()
    }

    /// Successful loads. Stays at one for the life of the cache.
    pub fn compilations(&self) -> usize {
        self.compilations.get()
    }

    /// Calls to [`ShaderCache::get_or_load`].
    pub fn accesses(&self) -> usize {
        self.accesses.get()
    }
}

impl Default for ShaderCache {
    fn default() -> Self {
        Self::new(DEFAULT_SHADER_NAME)
    }
}
