//! Shared Utilities
//!
//! Path resolution, template rendering, and directory staging helpers used
//! across backends.

pub mod paths;
pub mod templates;
pub mod upload;
