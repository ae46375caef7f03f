use thiserror::Error;

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Persistence configuration error: {0}")]
    Configuration(String),

    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("Optimistic lock conflict on '{record_type}': {message}")]
    OptimisticLock {
        record_type: String,
        message: String,
    },

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Mapping error: {0}")]
    Mapping(String),

    #[error("Aggregate not found: {0}")]
    AggregateNotFound(String),

    #[error("Record store error: {0}")]
    Store(String),

    #[error("Lock error: {0}")]
    LockError(String),
}

impl PersistenceError {
    pub fn optimistic_lock(record_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::OptimisticLock {
            record_type: record_type.into(),
            message: message.into(),
        }
    }

    /// True for the one condition a caller may sensibly retry after reloading.
    pub fn is_optimistic_lock(&self) -> bool {
        matches!(self, Self::OptimisticLock { .. })
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_) | Self::SchemaMismatch(_))
    }
}

pub type Result<T> = std::result::Result<T, PersistenceError>;

impl<T> From<std::sync::PoisonError<T>> for PersistenceError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::LockError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optimistic_lock_classification() {
        let err = PersistenceError::optimistic_lock("PURCHASE_ORDER", "version 3 is stale");
        assert!(err.is_optimistic_lock());
        assert!(!err.is_configuration());
        assert_eq!(
            err.to_string(),
            "Optimistic lock conflict on 'PURCHASE_ORDER': version 3 is stale"
        );
    }

    #[test]
    fn test_schema_mismatch_is_configuration() {
        let err = PersistenceError::SchemaMismatch("no ID column".into());
        assert!(err.is_configuration());
        assert!(!err.is_optimistic_lock());
    }
}
