//! Frame geometry records and the per-stream geometry cache.

use std::fmt;

use prost::Message;
use tracing::debug;

use crate::error::{BlurError, Result};
use crate::types::Row;

/// Wire form of a frame's dimensions.
#[derive(Clone, Copy, PartialEq, Eq, Message)]
pub struct FrameInfo {
    #[prost(int32, tag = "1")]
    pub width: i32,
    #[prost(int32, tag = "2")]
    pub height: i32,
}

impl FrameInfo {
    pub fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }
}

const CHANNELS: usize = 3;

/// Validated dimensions of an RGB24 frame.
///
/// Both sides are positive and fit the `int32` wire fields, and the frame's
/// byte length fits in a single allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameGeometry {
    width: usize,
    height: usize,
    frame_len: usize,
    info: FrameInfo,
}

impl FrameGeometry {
    pub fn new(width: i64, height: i64) -> Result<Self> {
        let invalid = || BlurError::Geometry { width, height };

        let info = FrameInfo::new(
            i32::try_from(width).map_err(|_| invalid())?,
            i32::try_from(height).map_err(|_| invalid())?,
        );
        if info.width <= 0 || info.height <= 0 {
            return Err(invalid());
        }

        let width = usize::try_from(info.width).map_err(|_| invalid())?;
        let height = usize::try_from(info.height).map_err(|_| invalid())?;
        let frame_len = width
            .checked_mul(height)
            .and_then(|pixels| pixels.checked_mul(CHANNELS))
            .filter(|len| *len <= isize::MAX as usize)
            .ok_or_else(invalid)?;

        Ok(Self {
            width,
            height,
            frame_len,
            info,
        })
    }

    pub fn decode(blob: &[u8]) -> Result<Self> {
        let info = FrameInfo::decode(blob).map_err(|e| BlurError::FrameInfo(e.to_string()))?;
        Self::new(i64::from(info.width), i64::from(info.height))
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Byte length of one RGB24 frame of this size.
    pub fn frame_len(&self) -> usize {
        self.frame_len
    }

    pub fn to_info(&self) -> FrameInfo {
        self.info
    }

    /// Serialized `FrameInfo` record, as carried by the `frame_info` column.
    pub fn encode_info(&self) -> Vec<u8> {
        self.info.encode_to_vec()
    }
}

impl fmt::Display for FrameGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Holds the geometry of the stream currently flowing through a kernel.
#[derive(Debug, Default)]
pub struct GeometryTracker {
    current: Option<FrameGeometry>,
}

impl GeometryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<FrameGeometry> {
        self.current
    }

    /// Read the geometry column of one batch without touching the cache.
    ///
    /// All rows must agree. An empty column yields the cached geometry.
    pub fn resolve(&self, rows: &[Row]) -> Result<Option<FrameGeometry>> {
        let Some(first_row) = rows.first() else {
            return Ok(self.current);
        };

        let first = FrameGeometry::decode(first_row.as_slice())?;
        for (index, row) in rows.iter().enumerate().skip(1) {
            let other = FrameGeometry::decode(row.as_slice())?;
            if other != first {
                return Err(BlurError::MixedGeometry {
                    index,
                    first: first.to_string(),
                    other: other.to_string(),
                });
            }
        }

        Ok(Some(first))
    }

    /// Record the geometry of a batch that completed.
    pub fn commit(&mut self, geometry: FrameGeometry) {
        if self.current != Some(geometry) {
            debug!(
                previous = ?self.current,
                width = geometry.width,
                height = geometry.height,
                "Frame geometry changed"
            );
            self.current = Some(geometry);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info_row(width: i32, height: i32) -> Row {
        Row::from_vec(FrameInfo::new(width, height).encode_to_vec())
    }

    #[test]
    fn test_geometry_rejects_non_positive_dimensions() {
        assert_eq!(
            FrameGeometry::new(0, 10),
            Err(BlurError::Geometry {
                width: 0,
                height: 10
            })
        );
        assert!(FrameGeometry::new(10, -1).is_err());
        assert!(FrameGeometry::new(1, 1).is_ok());
    }

    #[test]
    fn test_geometry_frame_len() {
        let geometry = FrameGeometry::new(4, 2).unwrap();
        assert_eq!(geometry.frame_len(), 24);
        assert_eq!(geometry.to_string(), "4x2");
    }

    #[test]
    fn test_decode_roundtrip_through_info() {
        let geometry = FrameGeometry::new(640, 480).unwrap();
        let blob = geometry.encode_info();
        assert_eq!(FrameGeometry::decode(&blob).unwrap(), geometry);
    }

    #[test]
    fn test_decode_empty_blob_is_zero_geometry() {
        // Proto3 defaults every field to 0.
        assert!(matches!(
            FrameGeometry::decode(&[]),
            Err(BlurError::Geometry { width: 0, height: 0 })
        ));
    }

    #[test]
    fn test_decode_garbage_blob_fails() {
        assert!(matches!(
            FrameGeometry::decode(&[0xFF]),
            Err(BlurError::FrameInfo(_))
        ));
    }

    #[test]
    fn test_geometry_rejects_dimensions_beyond_int32() {
        assert_eq!(
            FrameGeometry::new(1 << 31, 1),
            Err(BlurError::Geometry {
                width: 1 << 31,
                height: 1
            })
        );
        assert!(FrameGeometry::new(1, i64::from(u32::MAX)).is_err());

        let widest = FrameGeometry::new(i64::from(i32::MAX), 1).unwrap();
        assert_eq!(widest.to_info(), FrameInfo::new(i32::MAX, 1));
    }

    #[test]
    fn test_geometry_rejects_unallocatable_frame() {
        let max = i64::from(i32::MAX);
        assert_eq!(
            FrameGeometry::new(max, max),
            Err(BlurError::Geometry {
                width: max,
                height: max
            })
        );
    }

    #[test]
    fn test_tracker_commits_and_replaces() {
        let mut tracker = GeometryTracker::new();
        assert_eq!(tracker.current(), None);

        let first = tracker.resolve(&[info_row(8, 6), info_row(8, 6)]).unwrap();
        assert_eq!(first, Some(FrameGeometry::new(8, 6).unwrap()));
        assert_eq!(tracker.current(), None);
        tracker.commit(first.unwrap());

        let second = tracker.resolve(&[info_row(4, 4)]).unwrap().unwrap();
        assert_eq!(second, FrameGeometry::new(4, 4).unwrap());
        assert_eq!(tracker.current(), first);
        tracker.commit(second);
        assert_eq!(tracker.current(), Some(second));
    }

    #[test]
    fn test_tracker_keeps_geometry_for_empty_batch() {
        let mut tracker = GeometryTracker::new();
        assert_eq!(tracker.resolve(&[]).unwrap(), None);
        tracker.commit(FrameGeometry::new(3, 3).unwrap());
        assert_eq!(
            tracker.resolve(&[]).unwrap(),
            Some(FrameGeometry::new(3, 3).unwrap())
        );
    }

    #[test]
    fn test_tracker_rejects_mixed_batch() {
        let tracker = GeometryTracker::new();
        let err = tracker
            .resolve(&[info_row(8, 6), info_row(8, 6), info_row(6, 8)])
            .unwrap_err();
        assert_eq!(
            err,
            BlurError::MixedGeometry {
                index: 2,
                first: "8x6".to_string(),
                other: "6x8".to_string(),
            }
        );
    }

    #[test]
    fn test_tracker_rejects_invalid_geometry() {
        let tracker = GeometryTracker::new();
        assert!(matches!(
            tracker.resolve(&[info_row(-2, 5)]),
            Err(BlurError::Geometry { width: -2, height: 5 })
        ));
    }
}
