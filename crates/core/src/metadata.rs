//! Per-frame geometry records for the `frame_info` output column.

use prost::bytes::BytesMut;
use prost::Message;

use crate::geometry::FrameGeometry;
use crate::types::Row;

/// Encode `count` identical `FrameInfo` records into one contiguous block
/// and return one row per record, each a view into that block.
pub fn emit_frame_info(geometry: FrameGeometry, count: usize) -> Vec<Row> {
    if count == 0 {
        return Vec::new();
    }

    let record = geometry.to_info().encode_to_vec();
    let record_len = record.len();

    let mut block = BytesMut::with_capacity(record_len * count);
    for _ in 0..count {
        block.extend_from_slice(&record);
    }

    let block = block.freeze();
    (0..count)
        .map(|i| Row::from_bytes(block.slice(i * record_len..(i + 1) * record_len)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::FrameInfo;

    #[test]
    fn test_emit_one_record_per_frame() {
        let geometry = FrameGeometry::new(1920, 1080).unwrap();
        let rows = emit_frame_info(geometry, 4);

        assert_eq!(rows.len(), 4);
        for row in &rows {
            let info = FrameInfo::decode(row.as_slice()).unwrap();
            assert_eq!(info, FrameInfo::new(1920, 1080));
            assert_eq!(row.as_slice(), rows[0].as_slice());
        }
    }

    #[test]
    fn test_records_share_one_contiguous_block() {
        let geometry = FrameGeometry::new(5, 5).unwrap();
        let rows = emit_frame_info(geometry, 3);
        let record_len = geometry.to_info().encoded_len();

        let base = rows[0].as_slice().as_ptr();
        for (i, row) in rows.iter().enumerate() {
            assert_eq!(row.len(), record_len);
            assert_eq!(row.as_slice().as_ptr(), base.wrapping_add(i * record_len));
        }
        let total: usize = rows.iter().map(Row::len).sum();
        assert_eq!(total, 3 * record_len);
    }

    #[test]
    fn test_emit_zero_records() {
        let geometry = FrameGeometry::new(2, 2).unwrap();
        assert!(emit_frame_info(geometry, 0).is_empty());
    }
}
