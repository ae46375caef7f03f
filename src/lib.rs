// ============================================================================
// aggmirror Library
// ============================================================================

//! Aggregate persistence: nested entity/value-object graphs to relational
//! records and back, with one lifecycle event per written instance.
//!
//! An aggregate is persisted in three steps:
//!
//! 1. [`access::AccessModelBuilder`] walks the root instance using the
//!    [`model::TypeModelProvider`] and produces a tree of structural
//!    positions, each paired with the [`mirror::RecordMapper`] registered
//!    for it.
//! 2. [`persist::Persister`] diffs the new tree against the one built from
//!    the stored state and cascades inserts (parents first), updates and
//!    deletes (children first), asking the [`provider`] module for
//!    identities, value-object keys and parent foreign keys.
//! 3. [`AggregateRepository`] publishes one event per write and reads the
//!    aggregate back.
//!
//! ```
//! use aggmirror::sample::{SampleStack, sample_order};
//!
//! # fn main() -> aggmirror::Result<()> {
//! let stack = SampleStack::new()?;
//! let order = stack.repository.insert(sample_order())?;
//! assert!(order.id.is_some());
//! assert_eq!(stack.events.len(), 6);
//! # Ok(())
//! # }
//! ```

pub mod access;
pub mod config;
pub mod core;
pub mod mirror;
pub mod model;
pub mod persist;
pub mod prelude;
pub mod provider;
pub mod repository;
pub mod sample;
pub mod store;

// Re-export main types for convenience
pub use config::{NamingConvention, PersistenceConfig};
pub use core::{DataType, PersistenceError, Record, Result, TableDef, Value};
pub use repository::{
    AggregateFetcher, AggregateRepository, AggregateRoot, FetcherResult, PersistenceContext,
    PersistenceEvent, PersistenceEventPublisher, PersistenceEventType,
};
