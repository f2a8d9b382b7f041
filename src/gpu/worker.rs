//! Dedicated render thread.
//!
//! The device and the [`GpuResampler`] (with its shader cache) move onto one
//! thread at spawn time and never leave it. Callers on any thread submit jobs
//! through a bounded channel and block until the job's reply arrives, which
//! serializes every GPU conversion.

use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Sender};
use tracing::{info, warn};

use super::device::GpuDevice;
use super::resampler::{GpuRequest, GpuResampler, GpuStatus};
use crate::error::{ConformError, ConformResult};

const JOB_QUEUE_DEPTH: usize = 4;

type Job<D> = Box<dyn FnOnce(&mut D, &GpuResampler) + Send>;

pub struct RenderWorker<D> {
    sender: Option<Sender<Job<D>>>,
    handle: Option<JoinHandle<()>>,
}

impl<D: GpuDevice + Send + 'static> RenderWorker<D> {
    pub fn spawn(device: D, resampler: GpuResampler) -> ConformResult<Self> {
        let (sender, receiver) = bounded::<Job<D>>(JOB_QUEUE_DEPTH);
        let handle = thread::Builder::new()
            .name("frame-conform-render".into())
            .spawn(move || {
                let mut device = device;
                info!(shader = %resampler.shader().name(), "render worker started");
                for job in receiver.iter() {
                    job(&mut device, &resampler);
                }
                info!(
                    compilations = resampler.shader().compilations(),
                    accesses = resampler.shader().accesses(),
                    "render worker stopped"
                );
            })
            .map_err(|e| ConformError::io("spawn render worker", e))?;

        Ok(Self {
            sender: Some(sender),
            handle: Some(handle),
        })
    }

    /// Run `job` on the render thread and wait for its result.
    pub fn run<R, F>(&self, job: F) -> ConformResult<R>
    where
        F: FnOnce(&mut D, &GpuResampler) -> R + Send + 'static,
        R: Send + 'static,
    {
        let sender = self
            .sender
            .as_ref()
            .ok_or_else(|| ConformError::worker("render worker is shut down"))?;
        let (reply_tx, reply_rx) = bounded(1);
        sender
            .send(Box::new(move |device: &mut D, resampler: &GpuResampler| {
                // The caller may have given up waiting.
                let _ = reply_tx.send(job(device, resampler));
            }))
            .map_err(|_| ConformError::worker("render worker is not running"))?;
        reply_rx
            .recv()
            .map_err(|_| ConformError::worker("render job ended without a reply"))
    }

    pub fn resample(&self, request: GpuRequest) -> ConformResult<GpuStatus> {
        self.run(move |device, resampler| resampler.resample(device, &request))?
    }
}

impl<D> Drop for RenderWorker<D> {
    fn drop(&mut self) {
        // Closing the channel ends the worker loop.
        self.sender.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("render worker panicked");
            }
        }
    }
}
