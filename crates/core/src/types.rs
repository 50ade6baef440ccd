pub use prost::bytes::Bytes;
use serde::{Deserialize, Serialize};

/// One owned buffer flowing through a column.
///
/// Rows are move-only. Several rows may be views into one shared backing
/// allocation (the metadata block), which is released once the last of
/// them is dropped.
#[derive(Debug)]
pub struct Row {
    buffer: Bytes,
}

impl Row {
    pub fn from_vec(data: Vec<u8>) -> Self {
        Self {
            buffer: Bytes::from(data),
        }
    }

    /// Wrap a shared buffer, e.g. a slice of a larger block, without copying.
    pub fn from_bytes(buffer: Bytes) -> Self {
        Self { buffer }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Take the bytes out of the row. Does not copy when the row owns its
    /// allocation exclusively.
    pub fn into_vec(self) -> Vec<u8> {
        Vec::from(self.buffer)
    }
}

impl From<Vec<u8>> for Row {
    fn from(data: Vec<u8>) -> Self {
        Self::from_vec(data)
    }
}

impl AsRef<[u8]> for Row {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

/// An ordered batch of rows for one named input or output.
#[derive(Debug, Default)]
pub struct Column {
    pub rows: Vec<Row>,
}

impl Column {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: Vec<Row>) -> Self {
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn push(&mut self, row: Row) {
        self.rows.push(row);
    }
}

/// Column payload kind, used in op declarations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnType {
    /// Raw RGB24 frame bytes.
    Frame,
    /// Serialized `FrameInfo` geometry record.
    FrameInfo,
}
