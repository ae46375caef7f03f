//! A complete sample aggregate wired to the in-memory store.
//!
//! `PurchaseOrder` (root) owns `OrderLine` entities, which own `LineNote`
//! entities. `ShippingAddress` and `OrderTag` are value objects with rows of
//! their own; `Money` is inlined into the order row and `GeoPoint` into the
//! address row.

pub mod domain;
pub mod fetcher;
pub mod mirrors;
pub mod schema;

pub use domain::{
    GeoPoint, LineId, LineNote, Money, NoteId, OrderId, OrderLine, OrderTag, PurchaseOrder,
    ShippingAddress, type_model,
};
pub use fetcher::PurchaseOrderFetcher;
pub use mirrors::SampleMirrors;
pub use schema::{SampleSchema, sequences};

use crate::config::PersistenceConfig;
use crate::core::Result;
use crate::repository::{
    AggregateRepository, CollectingEventPublisher, PersistenceContext, PersistenceEventPublisher,
};
use crate::store::{InMemoryRecordStore, RecordStore};
use std::sync::Arc;

/// Store, context, repository and an event collector for the sample aggregate.
pub struct SampleStack {
    pub store: Arc<InMemoryRecordStore>,
    pub context: Arc<PersistenceContext>,
    pub events: Arc<CollectingEventPublisher>,
    pub repository: AggregateRepository<PurchaseOrder>,
}

impl SampleStack {
    pub fn new() -> Result<Self> {
        Self::with_config(PersistenceConfig::default())
    }

    pub fn with_config(config: PersistenceConfig) -> Result<Self> {
        let events = Arc::new(CollectingEventPublisher::new());
        Self::with_publisher(config, events.clone(), events)
    }

    /// Like [`with_config`](Self::with_config) but publishing to `publisher`;
    /// `events` only collects when it is that publisher.
    pub fn with_publisher(
        config: PersistenceConfig,
        publisher: Arc<dyn PersistenceEventPublisher>,
        events: Arc<CollectingEventPublisher>,
    ) -> Result<Self> {
        let schema = SampleSchema::new();
        let mirrors = SampleMirrors::new(&schema);
        let store = Arc::new(InMemoryRecordStore::with_tables(schema.tables())?);
        let record_store: Arc<dyn RecordStore> = store.clone();

        let context = Arc::new(
            PersistenceContext::builder()
                .type_model(Arc::new(type_model()))
                .mirrors(mirrors.registry())
                .store(record_store.clone())
                .sequences(Arc::new(sequences()))
                .config(config)
                .build()?,
        );
        let fetcher = Arc::new(PurchaseOrderFetcher::new(record_store, mirrors));
        let repository = AggregateRepository::new(context.clone(), fetcher, publisher);

        Ok(Self {
            store,
            context,
            events,
            repository,
        })
    }
}

/// An order with two lines (the first carrying a note), a shipping address
/// and one tag.
pub fn sample_order() -> PurchaseOrder {
    PurchaseOrder::new("ACME", Money::new(12_500, "EUR"))
        .with_line(OrderLine::new("widget", 2).with_note("gift wrap"))
        .with_line(OrderLine::new("gadget", 1))
        .with_shipping(ShippingAddress::new("1 Main St", "Springfield"))
        .with_tag("priority")
}
