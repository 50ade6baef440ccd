use thiserror::Error;

/// Failures surfaced by the blur kernel.
///
/// The type is `Clone` so that an invalid kernel can hand the exact error it
/// recorded at construction back to every later caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BlurError {
    #[error("Could not parse BlurArgs: {0}")]
    Config(String),

    #[error("Could not parse FrameInfo: {0}")]
    FrameInfo(String),

    #[error("Invalid frame geometry: width={width}, height={height}")]
    Geometry { width: i64, height: i64 },

    #[error("Frame geometry differs within one batch: row 0 is {first}, row {index} is {other}")]
    MixedGeometry {
        index: usize,
        first: String,
        other: String,
    },

    #[error("Frame {index} has {actual} bytes, expected {expected}")]
    FrameSizeMismatch {
        index: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Column mismatch: {0}")]
    ColumnMismatch(String),
}

pub type Result<T> = std::result::Result<T, BlurError>;
