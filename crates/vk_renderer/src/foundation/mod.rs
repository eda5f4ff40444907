//! Foundation module - small utilities used throughout the viewer
//!
//! - Logging setup
//! - Math aliases and camera helpers
//! - Frame timing

pub mod logging;
pub mod math;
pub mod time;
