//! The aggregate repository façade and what it publishes.

pub mod aggregate_repository;
pub mod context;
pub mod event;
pub mod fetcher;

pub use aggregate_repository::{AggregateRepository, AggregateRoot};
pub use context::{PersistenceContext, PersistenceContextBuilder};
pub use event::{
    CollectingEventPublisher, EventSummary, LoggingEventPublisher, NoopEventPublisher,
    PersistenceEvent, PersistenceEventPublisher, PersistenceEventType,
};
pub use fetcher::{AggregateFetcher, FetcherResult};
