use super::aggregate_repository::AggregateRoot;
use crate::access::AccessModel;
use crate::core::Result;
use std::sync::Arc;

/// Reads an aggregate back from the store by its root identity.
pub trait AggregateFetcher<A: AggregateRoot>: Send + Sync {
    fn fetch_by_id(&self, id: &A::Id) -> Result<Option<A>>;
}

/// A fetched aggregate together with the access model built over it.
#[derive(Debug, Clone)]
pub struct FetcherResult<A> {
    value: Option<A>,
    access_model: Option<Arc<AccessModel>>,
}

impl<A> FetcherResult<A> {
    pub fn empty() -> Self {
        Self {
            value: None,
            access_model: None,
        }
    }

    pub fn found(value: A, access_model: Arc<AccessModel>) -> Self {
        Self {
            value: Some(value),
            access_model: Some(access_model),
        }
    }

    pub fn is_found(&self) -> bool {
        self.value.is_some()
    }

    pub fn value(&self) -> Option<&A> {
        self.value.as_ref()
    }

    pub fn into_value(self) -> Option<A> {
        self.value
    }

    pub fn access_model(&self) -> Option<&Arc<AccessModel>> {
        self.access_model.as_ref()
    }
}
