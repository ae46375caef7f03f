//! Technical-key providers used by the persister: identities for new
//! entities, surrogate keys for value-object rows, and foreign keys copied
//! down from ancestors.

pub mod identity;
pub mod parent_reference;
pub mod value_object_id;

pub use identity::IdentityProvider;
pub use parent_reference::ParentReferenceProvider;
pub use value_object_id::ValueObjectIdProvider;

use crate::access::StructuralPosition;
use crate::core::{PersistenceError, Record, Result};
use crate::mirror::{RecordMapper, RecordMirrorRegistry};
use crate::store::{Sequence, SequenceSource};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Sequence lookups by derived name, resolved once per key.
pub(crate) struct SequenceCache {
    source: Arc<dyn SequenceSource>,
    resolved: RwLock<HashMap<String, Arc<dyn Sequence>>>,
}

impl SequenceCache {
    pub(crate) fn new(source: Arc<dyn SequenceSource>) -> Self {
        Self {
            source,
            resolved: RwLock::new(HashMap::new()),
        }
    }

    /// First of `candidates` the source knows, cached under `key`.
    pub(crate) fn resolve(&self, key: &str, candidates: &[String], owner: &str) -> Result<Arc<dyn Sequence>> {
        if let Some(sequence) = self.resolved.read()?.get(key) {
            return Ok(sequence.clone());
        }

        let sequence = candidates
            .iter()
            .find_map(|name| self.source.sequence(name))
            .ok_or_else(|| {
                PersistenceError::Configuration(format!(
                    "No sequence found for '{}' (tried {})",
                    owner,
                    candidates.join(", ")
                ))
            })?;

        self.resolved
            .write()?
            .entry(key.to_string())
            .or_insert_with(|| sequence.clone());
        Ok(sequence)
    }

    pub(crate) fn cached(&self) -> usize {
        self.resolved.read().map(|r| r.len()).unwrap_or(0)
    }
}

/// The mapper registered for `position` and the record it derives from the
/// position's instance, or `None` when the instance has no row of its own.
pub(crate) fn map_position(
    registry: &RecordMirrorRegistry,
    position: &StructuralPosition,
) -> Result<Option<(Arc<dyn RecordMapper>, Record)>> {
    let Some(mapper) = registry.lookup(position.instance().type_name(), &position.accessor_path())
    else {
        return Ok(None);
    };
    let record = mapper.map_instance(
        position.instance().as_ref(),
        position.root_instance().as_ref(),
    )?;
    Ok(Some((mapper, record)))
}
