use anyhow::Result;
use serde::Serialize;

use crate::alloc::SharedAllocator;
use crate::error::BlurError;
use crate::types::{Column, ColumnType};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnDefinition {
    pub name: String,
    pub column_type: ColumnType,
}

impl ColumnDefinition {
    pub fn new(name: &str, column_type: ColumnType) -> Self {
        Self {
            name: name.to_string(),
            column_type,
        }
    }
}

/// Declared shape of an op: its named input and output columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OpDefinition {
    pub name: String,
    pub inputs: Vec<ColumnDefinition>,
    pub outputs: Vec<ColumnDefinition>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DeviceType {
    Cpu,
}

/// Everything a kernel factory gets at construction time.
#[derive(Debug, Clone, Default)]
pub struct KernelConfig {
    /// Serialized op arguments.
    pub args: Vec<u8>,
    /// Worker threads a kernel may use inside one batch. 0 and 1 both mean
    /// sequential.
    pub workers: usize,
    pub allocator: SharedAllocator,
}

impl KernelConfig {
    pub fn new(args: Vec<u8>) -> Self {
        Self {
            args,
            workers: 1,
            allocator: SharedAllocator::default(),
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_allocator(mut self, allocator: SharedAllocator) -> Self {
        self.allocator = allocator;
        self
    }
}

/// Core kernel trait that all registered kernels implement.
pub trait Kernel: Send {
    fn op_name(&self) -> &str;

    /// Reports whether construction succeeded. An invalid kernel keeps
    /// returning the same error for its whole lifetime.
    fn validate(&self) -> std::result::Result<(), BlurError>;

    /// Process one batch. Output columns follow the op's declared order and
    /// hold one row per input row.
    fn execute(&mut self, inputs: &[Column]) -> Result<Vec<Column>>;
}
