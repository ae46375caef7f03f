use super::record_mapper::{RecordMapper, RecordMirror};
use crate::core::{PersistenceError, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// Record mappers by domain type, with optional overrides for one accessor path.
///
/// The same domain type may be stored in different tables depending on where
/// it sits in the aggregate; a path registration wins over the type default.
#[derive(Clone, Default)]
pub struct RecordMirrorRegistry {
    by_type: HashMap<String, Arc<dyn RecordMapper>>,
    by_path: HashMap<(String, String), Arc<dyn RecordMapper>>,
}

impl RecordMirrorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<M: RecordMirror>(mut self, mirror: M) -> Self {
        let mapper: Arc<dyn RecordMapper> = Arc::new(mirror);
        self.by_type
            .insert(mapper.domain_object_type().to_string(), mapper);
        self
    }

    /// Registers `mirror` only for instances reached via `accessor_path` from the root.
    pub fn register_at_path<M: RecordMirror>(mut self, accessor_path: &[&str], mirror: M) -> Self {
        let mapper: Arc<dyn RecordMapper> = Arc::new(mirror);
        let key = (
            mapper.domain_object_type().to_string(),
            accessor_path.join("."),
        );
        self.by_path.insert(key, mapper);
        self
    }

    pub fn lookup(&self, type_name: &str, accessor_path: &[&str]) -> Option<Arc<dyn RecordMapper>> {
        self.by_path
            .get(&(type_name.to_string(), accessor_path.join(".")))
            .or_else(|| self.by_type.get(type_name))
            .cloned()
    }

    pub fn require(&self, type_name: &str, accessor_path: &[&str]) -> Result<Arc<dyn RecordMapper>> {
        self.lookup(type_name, accessor_path).ok_or_else(|| {
            PersistenceError::Configuration(format!(
                "No record mapper found for domain type '{}' at '{}'",
                type_name,
                accessor_path.join(".")
            ))
        })
    }

    /// All registered mappers, type defaults first.
    pub fn mappers(&self) -> impl Iterator<Item = &Arc<dyn RecordMapper>> {
        self.by_type.values().chain(self.by_path.values())
    }

    pub fn len(&self) -> usize {
        self.by_type.len() + self.by_path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
