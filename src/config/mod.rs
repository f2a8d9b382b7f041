//! # Configuration Module
//!
//! This module provides the configuration structures for frame conforming.

pub mod config;

pub use config::{ConformConfig, ConformSettings, MirrorPolicy};
