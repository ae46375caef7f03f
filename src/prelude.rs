//! Recommended imports grouped by abstraction level.
//!
//! `dx` is what application code needs to describe and persist aggregates.
//! `advanced` exposes the engine internals for custom repositories.

pub mod dx {
    //! Describing domain types, mapping them to records and persisting them
    //! through a repository.
    pub use crate::config::PersistenceConfig;
    pub use crate::core::{Column, DataType, ForeignKeyDef, PersistenceError, Record, Result, TableDef, Value};
    pub use crate::identity_type;
    pub use crate::mirror::{RecordMirror, RecordMirrorRegistry};
    pub use crate::model::{
        DomainObject, DomainRef, DomainType, FieldDescriptor, FieldValue, Identity, IdentityType,
        TypeDescriptor, TypeModelRegistry, unknown_field,
    };
    pub use crate::repository::{
        AggregateFetcher, AggregateRepository, AggregateRoot, CollectingEventPublisher,
        FetcherResult, LoggingEventPublisher, PersistenceContext, PersistenceEvent,
        PersistenceEventPublisher, PersistenceEventType,
    };
    pub use crate::store::{InMemoryRecordStore, InMemorySequences, RecordStore};
}

pub mod advanced {
    //! Access models, the persister and the providers it drives.
    pub use crate::access::{AccessModel, AccessModelBuilder, PositionKey, StructuralPosition};
    pub use crate::mirror::RecordMapper;
    pub use crate::persist::{PersistAction, PersistOutcome, PersistedChange, Persister};
    pub use crate::provider::{IdentityProvider, ParentReferenceProvider, ValueObjectIdProvider};
    pub use crate::store::{Sequence, SequenceSource};
}
