use crate::access::AccessModelBuilder;
use crate::config::PersistenceConfig;
use crate::core::{PersistenceError, Result};
use crate::mirror::RecordMirrorRegistry;
use crate::model::TypeModelProvider;
use crate::persist::Persister;
use crate::provider::{IdentityProvider, ParentReferenceProvider, ValueObjectIdProvider};
use crate::store::{RecordStore, SequenceSource};
use std::sync::Arc;

/// The persistence stack for one store: type model, mappers, providers,
/// access-model builder and persister. Sequence caches live in the providers
/// owned here, so two contexts never share them.
pub struct PersistenceContext {
    type_model: Arc<dyn TypeModelProvider>,
    mirrors: Arc<RecordMirrorRegistry>,
    store: Arc<dyn RecordStore>,
    config: PersistenceConfig,
    builder: AccessModelBuilder,
    persister: Persister,
    identities: Arc<IdentityProvider>,
}

impl PersistenceContext {
    pub fn builder() -> PersistenceContextBuilder {
        PersistenceContextBuilder::default()
    }

    pub fn type_model(&self) -> &Arc<dyn TypeModelProvider> {
        &self.type_model
    }

    pub fn mirrors(&self) -> &Arc<RecordMirrorRegistry> {
        &self.mirrors
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    pub fn config(&self) -> &PersistenceConfig {
        &self.config
    }

    pub fn access_model_builder(&self) -> &AccessModelBuilder {
        &self.builder
    }

    pub fn persister(&self) -> &Persister {
        &self.persister
    }

    pub fn identity_provider(&self) -> &Arc<IdentityProvider> {
        &self.identities
    }
}

#[derive(Default)]
pub struct PersistenceContextBuilder {
    type_model: Option<Arc<dyn TypeModelProvider>>,
    mirrors: Option<RecordMirrorRegistry>,
    store: Option<Arc<dyn RecordStore>>,
    sequences: Option<Arc<dyn SequenceSource>>,
    config: PersistenceConfig,
}

impl PersistenceContextBuilder {
    pub fn type_model(mut self, type_model: Arc<dyn TypeModelProvider>) -> Self {
        self.type_model = Some(type_model);
        self
    }

    pub fn mirrors(mut self, mirrors: RecordMirrorRegistry) -> Self {
        self.mirrors = Some(mirrors);
        self
    }

    pub fn store(mut self, store: Arc<dyn RecordStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn sequences(mut self, sequences: Arc<dyn SequenceSource>) -> Self {
        self.sequences = Some(sequences);
        self
    }

    pub fn config(mut self, config: PersistenceConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<PersistenceContext> {
        self.config.validate()?;
        let type_model = self.type_model.ok_or_else(|| missing("type model"))?;
        let store = self.store.ok_or_else(|| missing("record store"))?;
        let sequences = self.sequences.ok_or_else(|| missing("sequence source"))?;
        let mirrors = Arc::new(self.mirrors.ok_or_else(|| missing("record mirror registry"))?);
        let naming = self.config.naming.clone();

        let identities = Arc::new(IdentityProvider::new(
            type_model.clone(),
            sequences.clone(),
            naming.clone(),
        ));
        let value_object_ids = Arc::new(ValueObjectIdProvider::new(
            store.clone(),
            mirrors.clone(),
            type_model.clone(),
            sequences,
            naming,
        ));
        let parent_references = Arc::new(ParentReferenceProvider::new(mirrors.clone()));
        let persister = Persister::new(
            store.clone(),
            type_model.clone(),
            identities.clone(),
            value_object_ids,
            parent_references,
            self.config.clone(),
        );

        Ok(PersistenceContext {
            builder: AccessModelBuilder::new(type_model.clone(), mirrors.clone()),
            type_model,
            mirrors,
            store,
            config: self.config,
            persister,
            identities,
        })
    }
}

fn missing(what: &str) -> PersistenceError {
    PersistenceError::Configuration(format!("Persistence context needs a {}", what))
}
