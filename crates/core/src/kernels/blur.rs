//! Blur kernel: box-blurs the `frame` column and re-emits `frame_info`.
//!
//! Arguments are resolved once at construction. A kernel whose arguments
//! fail to decode stays invalid and refuses every batch with the error it
//! recorded.

use anyhow::Result;
use tracing::{info, warn};

use crate::alloc::SharedAllocator;
use crate::blur::BoxBlur;
use crate::error::BlurError;
use crate::geometry::{FrameGeometry, GeometryTracker};
use crate::metadata::emit_frame_info;
use crate::op::{ColumnDefinition, Kernel, KernelConfig, OpDefinition};
use crate::params::{BlurParameters, WindowExtents};
use crate::types::{Column, ColumnType, Row};

pub const BLUR_OP: &str = "Blur";

#[derive(Debug)]
enum KernelState {
    Ready {
        params: BlurParameters,
        extents: WindowExtents,
    },
    Invalid(BlurError),
}

pub struct BlurKernel {
    state: KernelState,
    tracker: GeometryTracker,
    workers: usize,
    allocator: SharedAllocator,
}

impl BlurKernel {
    pub fn new(config: &KernelConfig) -> Self {
        let state = match BlurParameters::resolve(&config.args) {
            Ok(params) => {
                let extents = params.extents();
                info!(
                    kernel_size = params.window_size,
                    sigma = params.sigma,
                    left = extents.left,
                    right = extents.right,
                    "Blur kernel ready"
                );
                KernelState::Ready { params, extents }
            }
            Err(error) => {
                warn!(%error, "Blur kernel is invalid");
                KernelState::Invalid(error)
            }
        };

        Self {
            state,
            tracker: GeometryTracker::new(),
            workers: config.workers.max(1),
            allocator: config.allocator.clone(),
        }
    }

    pub fn op_definition() -> OpDefinition {
        OpDefinition {
            name: BLUR_OP.to_string(),
            inputs: vec![
                ColumnDefinition::new("frame", ColumnType::Frame),
                ColumnDefinition::new("frame_info", ColumnType::FrameInfo),
            ],
            outputs: vec![
                ColumnDefinition::new("frame", ColumnType::Frame),
                ColumnDefinition::new("frame_info", ColumnType::FrameInfo),
            ],
        }
    }

    pub fn parameters(&self) -> Option<&BlurParameters> {
        match &self.state {
            KernelState::Ready { params, .. } => Some(params),
            KernelState::Invalid(_) => None,
        }
    }

    pub fn extents(&self) -> Option<WindowExtents> {
        match &self.state {
            KernelState::Ready { extents, .. } => Some(*extents),
            KernelState::Invalid(_) => None,
        }
    }

    pub fn geometry(&self) -> Option<FrameGeometry> {
        self.tracker.current()
    }

    /// Blur one batch. Returns `[frame, frame_info]` output columns.
    pub fn process_batch(
        &mut self,
        frames: &Column,
        frame_infos: &Column,
    ) -> std::result::Result<Vec<Column>, BlurError> {
        let extents = match &self.state {
            KernelState::Ready { extents, .. } => *extents,
            KernelState::Invalid(error) => return Err(error.clone()),
        };

        if frames.len() != frame_infos.len() {
            return Err(BlurError::ColumnMismatch(format!(
                "frame column has {} rows but frame_info column has {}",
                frames.len(),
                frame_infos.len()
            )));
        }

        if frames.is_empty() {
            return Ok(vec![Column::new(), Column::new()]);
        }
        let Some(geometry) = self.tracker.resolve(&frame_infos.rows)? else {
            return Ok(vec![Column::new(), Column::new()]);
        };

        let inputs: Vec<&[u8]> = frames.rows.iter().map(Row::as_slice).collect();
        let blurred = BoxBlur::new(geometry, extents).blur_batch(
            &inputs,
            &self.allocator,
            self.workers,
        )?;
        self.tracker.commit(geometry);

        let frame_column = Column::from_rows(blurred.into_iter().map(Row::from_vec).collect());
        let info_column = Column::from_rows(emit_frame_info(geometry, frames.len()));

        Ok(vec![frame_column, info_column])
    }
}

impl Kernel for BlurKernel {
    fn op_name(&self) -> &str {
        BLUR_OP
    }

    fn validate(&self) -> std::result::Result<(), BlurError> {
        match &self.state {
            KernelState::Ready { .. } => Ok(()),
            KernelState::Invalid(error) => Err(error.clone()),
        }
    }

    fn execute(&mut self, inputs: &[Column]) -> Result<Vec<Column>> {
        if let KernelState::Invalid(error) = &self.state {
            return Err(error.clone().into());
        }

        let [frames, frame_infos] = inputs else {
            return Err(BlurError::ColumnMismatch(format!(
                "Blur expects 2 input columns (frame, frame_info), got {}",
                inputs.len()
            ))
            .into());
        };

        Ok(self.process_batch(frames, frame_infos)?)
    }
}
