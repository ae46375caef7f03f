use super::SequenceCache;
use crate::config::NamingConvention;
use crate::core::naming::{identity_sequence_candidates, simple_type_name};
use crate::core::{PersistenceError, Result};
use crate::model::{Identity, TypeModelProvider};
use crate::store::SequenceSource;
use std::sync::Arc;

/// Hands out fresh identities for entities inserted without one.
///
/// One sequence per identity type, named after the identity's simple type
/// name: `OrderId` draws from `ORDER_ID_SEQ` (or `order_id_seq`).
pub struct IdentityProvider {
    type_model: Arc<dyn TypeModelProvider>,
    sequences: SequenceCache,
    naming: NamingConvention,
}

impl IdentityProvider {
    pub fn new(
        type_model: Arc<dyn TypeModelProvider>,
        sequences: Arc<dyn SequenceSource>,
        naming: NamingConvention,
    ) -> Self {
        Self {
            type_model,
            sequences: SequenceCache::new(sequences),
            naming,
        }
    }

    pub fn provide_for(&self, entity_type: &str) -> Result<Identity> {
        let field = self.type_model.identity_field_of(entity_type).ok_or_else(|| {
            PersistenceError::Configuration(format!(
                "Entity type '{}' declares no identity field",
                entity_type
            ))
        })?;
        let identity_type = field.declared_type.as_str();
        let candidates = identity_sequence_candidates(identity_type, &self.naming.sequence_suffix);
        let sequence = self.sequences.resolve(
            simple_type_name(identity_type),
            &candidates,
            identity_type,
        )?;
        Ok(Identity::new(identity_type, sequence.next_value()?))
    }

    /// Identity types whose sequence has been resolved so far.
    pub fn cached_sequences(&self) -> usize {
        self.sequences.cached()
    }
}
