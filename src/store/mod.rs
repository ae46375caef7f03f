//! The relational side: where records are written and where technical
//! values come from.

pub mod change;
pub mod memory;
pub mod sequence;

use crate::core::{Record, Result, Value};
use std::sync::Arc;

pub use change::Change;
pub use memory::{InMemoryRecordStore, StoreStats};
pub use sequence::{CounterSequence, InMemorySequences, UuidSequence};

/// Primitive record operations against a caller-managed connection/session.
///
/// Writes return the number of affected rows; the persister turns zero into
/// an optimistic-lock conflict where a row was expected.
pub trait RecordStore: Send + Sync {
    fn insert(&self, record: &Record) -> Result<usize>;

    /// Writes every column of `record`. When the table has a version column
    /// the write only applies if the stored version equals the record's, and
    /// the stored version is incremented.
    fn update(&self, record: &Record) -> Result<usize>;

    fn delete(&self, record: &Record) -> Result<usize>;

    /// Version-conditioned increment of the version column only.
    fn increment_version(&self, record: &Record) -> Result<usize>;

    /// Records of `table` whose columns equal every criterion.
    fn select(&self, table: &str, criteria: &[(&str, Value)]) -> Result<Vec<Record>>;
}

/// A source of fresh technical values.
pub trait Sequence: Send + Sync {
    fn name(&self) -> &str;

    fn next_value(&self) -> Result<Value>;
}

pub trait SequenceSource: Send + Sync {
    fn sequence(&self, name: &str) -> Option<Arc<dyn Sequence>>;
}
