use super::context::PersistenceContext;
use super::event::{PersistenceEvent, PersistenceEventPublisher};
use super::fetcher::{AggregateFetcher, FetcherResult};
use crate::core::{PersistenceError, Result};
use crate::model::{DomainObject, DomainRef, DomainType, IdentityType, downcast};
use crate::persist::PersistedChange;
use std::sync::Arc;
use tracing::{Level, event, info_span};

/// A domain type that roots an aggregate.
pub trait AggregateRoot: DomainObject + DomainType + Clone {
    type Id: IdentityType;

    /// `None` until the aggregate has been inserted.
    fn id(&self) -> Option<Self::Id>;
}

/// Insert, update, delete and find for one aggregate type.
///
/// Every call runs on the caller's thread inside whatever transaction the
/// caller holds on the store. Events are published as the underlying writes
/// succeed; on error the ones already published stay published.
pub struct AggregateRepository<A: AggregateRoot> {
    context: Arc<PersistenceContext>,
    fetcher: Arc<dyn AggregateFetcher<A>>,
    publisher: Arc<dyn PersistenceEventPublisher>,
}

impl<A: AggregateRoot> AggregateRepository<A> {
    pub fn new(
        context: Arc<PersistenceContext>,
        fetcher: Arc<dyn AggregateFetcher<A>>,
        publisher: Arc<dyn PersistenceEventPublisher>,
    ) -> Self {
        Self {
            context,
            fetcher,
            publisher,
        }
    }

    pub fn context(&self) -> &Arc<PersistenceContext> {
        &self.context
    }

    /// Persists a new aggregate and returns it as read back from the store.
    pub fn insert(&self, root: A) -> Result<A> {
        let span = info_span!("repository.insert", aggregate = A::TYPE_NAME);
        let _enter = span.enter();

        let model = self
            .context
            .access_model_builder()
            .build_access_model(Arc::new(root))?;
        let outcome = self
            .context
            .persister()
            .insert(&model, &mut |change: &PersistedChange| self.publish(change))?;

        let id = Self::id_of(&outcome.root)?;
        self.refetch(&id)
    }

    /// Reconciles `root` with its stored state and returns the result as
    /// read back from the store.
    pub fn update(&self, root: A) -> Result<A> {
        let id = root.id().ok_or_else(|| {
            PersistenceError::Mapping(format!("Cannot update a {} without identity", A::TYPE_NAME))
        })?;
        let span = info_span!("repository.update", aggregate = A::TYPE_NAME, id = ?id);
        let _enter = span.enter();

        let old = self
            .fetcher
            .fetch_by_id(&id)?
            .ok_or_else(|| not_found::<A>(&id))?;
        let builder = self.context.access_model_builder();
        let old_model = builder.build_access_model(Arc::new(old))?;
        let new_model = builder.build_access_model(Arc::new(root))?;

        let outcome = self.context.persister().update(
            &new_model,
            Some(&old_model),
            &mut |change: &PersistedChange| self.publish(change),
        )?;
        event!(Level::DEBUG, writes = outcome.changes.len(), "aggregate reconciled");

        self.refetch(&id)
    }

    /// Deletes the aggregate with `id`; returns it as it was, or `None` if
    /// nothing was stored under that id.
    pub fn delete_by_id(&self, id: &A::Id) -> Result<Option<A>> {
        let span = info_span!("repository.delete", aggregate = A::TYPE_NAME, id = ?id);
        let _enter = span.enter();

        let Some(existing) = self.fetcher.fetch_by_id(id)? else {
            event!(Level::DEBUG, "nothing to delete");
            return Ok(None);
        };
        let model = self
            .context
            .access_model_builder()
            .build_access_model(Arc::new(existing.clone()))?;
        self.context
            .persister()
            .delete(&model, &mut |change: &PersistedChange| self.publish(change))?;
        Ok(Some(existing))
    }

    pub fn find_result_by_id(&self, id: &A::Id) -> Result<FetcherResult<A>> {
        let span = info_span!("repository.find", aggregate = A::TYPE_NAME, id = ?id);
        let _enter = span.enter();

        match self.fetcher.fetch_by_id(id)? {
            Some(found) => {
                let model = self
                    .context
                    .access_model_builder()
                    .build_access_model(Arc::new(found.clone()))?;
                Ok(FetcherResult::found(found, model))
            }
            None => Ok(FetcherResult::empty()),
        }
    }

    pub fn find_by_id(&self, id: &A::Id) -> Result<Option<A>> {
        self.fetcher.fetch_by_id(id)
    }

    fn publish(&self, change: &PersistedChange) {
        if let Some(event) = PersistenceEvent::from_change(change) {
            self.publisher.publish(event);
        }
    }

    fn refetch(&self, id: &A::Id) -> Result<A> {
        self.fetcher
            .fetch_by_id(id)?
            .ok_or_else(|| not_found::<A>(id))
    }

    fn id_of(root: &DomainRef) -> Result<A::Id> {
        downcast::<A>(root.as_ref())?.id().ok_or_else(|| {
            PersistenceError::Mapping(format!(
                "{} has no identity after insert",
                A::TYPE_NAME
            ))
        })
    }
}

fn not_found<A: AggregateRoot>(id: &A::Id) -> PersistenceError {
    PersistenceError::AggregateNotFound(format!("{} {:?}", A::TYPE_NAME, id))
}
