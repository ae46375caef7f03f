use crate::access::StructuralPosition;
use crate::core::Record;
use crate::model::DomainRef;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// What reconciliation decided for one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PersistAction {
    Insert,
    Update,
    Delete,
    Unchanged,
}

impl fmt::Display for PersistAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::Unchanged => "UNCHANGED",
        };
        write!(f, "{}", name)
    }
}

/// A record write that succeeded.
#[derive(Clone)]
pub struct PersistedChange {
    pub action: PersistAction,
    pub instance: DomainRef,
    /// `None` when `instance` is the aggregate root itself.
    pub aggregate_root: Option<DomainRef>,
    pub record: Record,
    pub position: Arc<StructuralPosition>,
}

impl PersistedChange {
    pub fn record_type(&self) -> &str {
        self.record.record_type()
    }
}

impl fmt::Debug for PersistedChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistedChange")
            .field("action", &self.action)
            .field("position", &self.position.key().to_string())
            .field("record", &self.record)
            .finish()
    }
}

/// Writes performed by one persister call, in execution order, and the root
/// instance as persisted (carrying any generated identity).
#[derive(Debug, Clone)]
pub struct PersistOutcome {
    pub changes: Vec<PersistedChange>,
    pub root: DomainRef,
}

impl PersistOutcome {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn count(&self, action: PersistAction) -> usize {
        self.changes.iter().filter(|c| c.action == action).count()
    }
}
