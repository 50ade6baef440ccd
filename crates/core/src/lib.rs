//! Core crate for frameblur: box-blur kernel, kernel registry and shared
//! configuration/logging plumbing.

pub mod alloc;
pub mod blur;
pub mod config;
pub mod error;
pub mod geometry;
pub mod kernels;
pub mod logging;
pub mod metadata;
pub mod op;
pub mod params;
pub mod registry;
pub mod types;

pub use error::BlurError;
