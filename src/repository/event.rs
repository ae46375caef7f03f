use crate::core::Value;
use crate::model::DomainRef;
use crate::persist::{PersistAction, PersistedChange};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PersistenceEventType {
    Inserted,
    Updated,
    Deleted,
}

impl PersistenceEventType {
    pub fn from_action(action: PersistAction) -> Option<Self> {
        match action {
            PersistAction::Insert => Some(Self::Inserted),
            PersistAction::Update => Some(Self::Updated),
            PersistAction::Delete => Some(Self::Deleted),
            PersistAction::Unchanged => None,
        }
    }
}

impl fmt::Display for PersistenceEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Inserted => "INSERTED",
            Self::Updated => "UPDATED",
            Self::Deleted => "DELETED",
        };
        write!(f, "{}", name)
    }
}

/// Lifecycle event for one entity or value-object instance that was written.
#[derive(Clone)]
pub struct PersistenceEvent {
    event_id: Uuid,
    event_type: PersistenceEventType,
    instance: DomainRef,
    aggregate_root: Option<DomainRef>,
    record_type: String,
    primary_key: Vec<Value>,
    occurred_at: DateTime<Utc>,
}

impl PersistenceEvent {
    /// `None` for unchanged nodes, which never produce events.
    pub fn from_change(change: &PersistedChange) -> Option<Self> {
        let event_type = PersistenceEventType::from_action(change.action)?;
        Some(Self {
            event_id: Uuid::new_v4(),
            event_type,
            instance: change.instance.clone(),
            aggregate_root: change.aggregate_root.clone(),
            record_type: change.record_type().to_string(),
            primary_key: change.record.primary_key(),
            occurred_at: Utc::now(),
        })
    }

    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn event_type(&self) -> PersistenceEventType {
        self.event_type
    }

    pub fn instance(&self) -> &DomainRef {
        &self.instance
    }

    /// Absent when the event is about the aggregate root itself.
    pub fn aggregate_root(&self) -> Option<&DomainRef> {
        self.aggregate_root.as_ref()
    }

    pub fn record_type(&self) -> &str {
        &self.record_type
    }

    pub fn primary_key(&self) -> &[Value] {
        &self.primary_key
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    pub fn summary(&self) -> EventSummary {
        EventSummary {
            event_id: self.event_id,
            event_type: self.event_type,
            instance_type: self.instance.type_name().to_string(),
            aggregate_root_type: self
                .aggregate_root
                .as_ref()
                .map(|root| root.type_name().to_string()),
            record_type: self.record_type.clone(),
            primary_key: self.primary_key.clone(),
            occurred_at: self.occurred_at,
        }
    }
}

impl fmt::Debug for PersistenceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistenceEvent")
            .field("event_type", &self.event_type)
            .field("instance", &self.instance)
            .field("record_type", &self.record_type)
            .field("primary_key", &self.primary_key)
            .finish()
    }
}

/// Serializable view of a [`PersistenceEvent`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventSummary {
    pub event_id: Uuid,
    pub event_type: PersistenceEventType,
    pub instance_type: String,
    pub aggregate_root_type: Option<String>,
    pub record_type: String,
    pub primary_key: Vec<Value>,
    pub occurred_at: DateTime<Utc>,
}

/// Fire-and-continue sink for persistence events.
pub trait PersistenceEventPublisher: Send + Sync {
    fn publish(&self, event: PersistenceEvent);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEventPublisher;

impl PersistenceEventPublisher for NoopEventPublisher {
    fn publish(&self, _event: PersistenceEvent) {}
}

/// Keeps every published event in memory.
#[derive(Debug, Default)]
pub struct CollectingEventPublisher {
    events: Mutex<Vec<PersistenceEvent>>,
}

impl CollectingEventPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<PersistenceEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Drains the collected events.
    pub fn take(&self) -> Vec<PersistenceEvent> {
        self.events
            .lock()
            .map(|mut e| std::mem::take(&mut *e))
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.events.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PersistenceEventPublisher for CollectingEventPublisher {
    fn publish(&self, event: PersistenceEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

/// Logs one line per event at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingEventPublisher;

impl PersistenceEventPublisher for LoggingEventPublisher {
    fn publish(&self, event: PersistenceEvent) {
        match serde_json::to_string(&event.summary()) {
            Ok(json) => log::info!("persistence event {}", json),
            Err(err) => log::warn!("Cannot serialize persistence event: {}", err),
        }
    }
}
