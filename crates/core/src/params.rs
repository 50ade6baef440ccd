//! Blur parameter decoding and window geometry.

use prost::Message;
use tracing::debug;

use crate::error::{BlurError, Result};

/// Wire form of the blur configuration.
#[derive(Clone, Copy, PartialEq, Message)]
pub struct BlurArgs {
    #[prost(int32, tag = "1")]
    pub kernel_size: i32,
    #[prost(double, tag = "2")]
    pub sigma: f64,
}

impl BlurArgs {
    pub fn new(kernel_size: i32, sigma: f64) -> Self {
        Self { kernel_size, sigma }
    }

    pub fn to_blob(&self) -> Vec<u8> {
        self.encode_to_vec()
    }
}

/// Validated blur configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlurParameters {
    pub window_size: u32,
    /// Carried through configuration but not applied: the filter is an
    /// unweighted box average.
    pub sigma: f64,
}

impl BlurParameters {
    /// Decode a `BlurArgs` blob.
    pub fn resolve(blob: &[u8]) -> Result<Self> {
        if blob.is_empty() {
            return Err(BlurError::Config("empty configuration blob".to_string()));
        }

        let args = BlurArgs::decode(blob).map_err(|e| BlurError::Config(e.to_string()))?;
        if args.kernel_size <= 0 {
            return Err(BlurError::Config(format!(
                "kernel_size must be positive, got {}",
                args.kernel_size
            )));
        }

        debug!(
            kernel_size = args.kernel_size,
            sigma = args.sigma,
            "Resolved blur parameters"
        );

        Ok(Self {
            window_size: args.kernel_size as u32,
            sigma: args.sigma,
        })
    }

    pub fn extents(&self) -> WindowExtents {
        WindowExtents::from_window_size(self.window_size)
    }
}

/// How far the averaging window reaches to each side of its center pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowExtents {
    pub left: usize,
    pub right: usize,
}

impl WindowExtents {
    /// `left = ceil(k/2) - 1`, `right = floor(k/2)`. `k` must be positive.
    pub fn from_window_size(window_size: u32) -> Self {
        debug_assert!(window_size > 0);
        let k = window_size as usize;
        Self {
            left: k.div_ceil(2) - 1,
            right: k / 2,
        }
    }

    pub fn side(&self) -> usize {
        self.left + self.right + 1
    }

    pub fn area(&self) -> u64 {
        let side = self.side() as u64;
        side * side
    }
}
