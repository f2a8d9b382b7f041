//! # Processing Module
//!
//! This module contains the async frame-processing adapter for conforming.

pub mod processing;

// Re-export commonly used types for convenience
pub use processing::{CameraFrame, ConformProcessor, ConformedFrame, FramePlane, FrameProcessor};
