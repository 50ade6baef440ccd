//! Box blur over RGB24 frames.
//!
//! Each interior output sample is the truncated mean of a square window of
//! input samples from the same channel. Pixels whose window would leave the
//! frame form the border band and are never written: they keep whatever the
//! allocator produced.

use std::panic;
use std::thread;

use tracing::{debug, trace};

use crate::alloc::SharedAllocator;
use crate::error::{BlurError, Result};
use crate::geometry::FrameGeometry;
use crate::params::WindowExtents;

const CHANNELS: usize = 3;

/// Blur `src` into `dst`. Both must hold exactly `geometry.frame_len()` bytes.
pub fn box_blur_into(src: &[u8], dst: &mut [u8], geometry: FrameGeometry, extents: WindowExtents) {
    let (width, height) = (geometry.width(), geometry.height());
    let WindowExtents { left, right } = extents;
    let stride = width * CHANNELS;
    let area = extents.area();

    debug_assert_eq!(src.len(), geometry.frame_len());
    debug_assert_eq!(dst.len(), geometry.frame_len());

    for y in left..height.saturating_sub(right) {
        for x in left..width.saturating_sub(right) {
            let out = y * stride + x * CHANNELS;
            for c in 0..CHANNELS {
                let mut sum: u64 = 0;
                for wy in (y - left)..=(y + right) {
                    let row = &src[wy * stride..(wy + 1) * stride];
                    for wx in (x - left)..=(x + right) {
                        sum += row[wx * CHANNELS + c] as u64;
                    }
                }
                dst[out + c] = (sum / area) as u8;
            }
        }
    }
}

/// Box blur bound to one frame geometry and window.
#[derive(Debug, Clone, Copy)]
pub struct BoxBlur {
    geometry: FrameGeometry,
    extents: WindowExtents,
}

impl BoxBlur {
    pub fn new(geometry: FrameGeometry, extents: WindowExtents) -> Self {
        Self { geometry, extents }
    }

    pub fn geometry(&self) -> FrameGeometry {
        self.geometry
    }

    pub fn extents(&self) -> WindowExtents {
        self.extents
    }

    /// Blur one frame into a freshly allocated buffer.
    pub fn blur_frame(&self, input: &[u8], allocator: &SharedAllocator) -> Vec<u8> {
        let mut output = allocator.allocate(input.len());
        box_blur_into(input, &mut output, self.geometry, self.extents);
        output
    }

    /// Blur every frame of a batch, preserving order.
    ///
    /// Frame sizes are checked before any output buffer is allocated. With
    /// `workers > 1` the batch is split into contiguous chunks blurred on
    /// scoped threads.
    pub fn blur_batch(
        &self,
        frames: &[&[u8]],
        allocator: &SharedAllocator,
        workers: usize,
    ) -> Result<Vec<Vec<u8>>> {
        let expected = self.geometry.frame_len();
        for (index, frame) in frames.iter().enumerate() {
            if frame.len() != expected {
                return Err(BlurError::FrameSizeMismatch {
                    index,
                    expected,
                    actual: frame.len(),
                });
            }
        }

        let workers = workers.clamp(1, frames.len().max(1));
        debug!(
            frames = frames.len(),
            workers,
            geometry = %self.geometry,
            left = self.extents.left,
            right = self.extents.right,
            "Blurring batch"
        );

        if workers == 1 {
            return Ok(frames
                .iter()
                .map(|frame| self.blur_frame(frame, allocator))
                .collect());
        }

        let chunk_len = frames.len().div_ceil(workers);
        let outputs = thread::scope(|scope| {
            let handles: Vec<_> = frames
                .chunks(chunk_len)
                .enumerate()
                .map(|(chunk_index, chunk)| {
                    scope.spawn(move || {
                        trace!(chunk_index, frames = chunk.len(), "Blur worker started");
                        chunk
                            .iter()
                            .map(|frame| self.blur_frame(frame, allocator))
                            .collect::<Vec<_>>()
                    })
                })
                .collect();

            handles
                .into_iter()
                .flat_map(|handle| match handle.join() {
                    Ok(chunk_outputs) => chunk_outputs,
                    Err(payload) => panic::resume_unwind(payload),
                })
                .collect::<Vec<_>>()
        });

        Ok(outputs)
    }
}
