use super::{Sequence, SequenceSource};
use crate::core::{Result, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use uuid::Uuid;

/// Monotonic integer sequence.
#[derive(Debug)]
pub struct CounterSequence {
    name: String,
    next: AtomicI64,
}

impl CounterSequence {
    pub fn new(name: impl Into<String>) -> Self {
        Self::starting_at(name, 1)
    }

    pub fn starting_at(name: impl Into<String>, start: i64) -> Self {
        Self {
            name: name.into(),
            next: AtomicI64::new(start),
        }
    }

    /// The value the next call to `next_value` hands out.
    pub fn peek(&self) -> i64 {
        self.next.load(Ordering::SeqCst)
    }
}

impl Sequence for CounterSequence {
    fn name(&self) -> &str {
        &self.name
    }

    fn next_value(&self) -> Result<Value> {
        Ok(Value::Integer(self.next.fetch_add(1, Ordering::SeqCst)))
    }
}

/// Random v4 UUIDs.
#[derive(Debug)]
pub struct UuidSequence {
    name: String,
}

impl UuidSequence {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Sequence for UuidSequence {
    fn name(&self) -> &str {
        &self.name
    }

    fn next_value(&self) -> Result<Value> {
        Ok(Value::Uuid(Uuid::new_v4()))
    }
}

/// Named sequences held in memory. Lookup is by exact name; the providers
/// try the case variants themselves.
#[derive(Clone, Default)]
pub struct InMemorySequences {
    sequences: HashMap<String, Arc<dyn Sequence>>,
}

impl InMemorySequences {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(self, name: &str) -> Self {
        self.with_sequence(Arc::new(CounterSequence::new(name)))
    }

    pub fn define_starting_at(self, name: &str, start: i64) -> Self {
        self.with_sequence(Arc::new(CounterSequence::starting_at(name, start)))
    }

    pub fn define_uuid(self, name: &str) -> Self {
        self.with_sequence(Arc::new(UuidSequence::new(name)))
    }

    pub fn with_sequence(mut self, sequence: Arc<dyn Sequence>) -> Self {
        self.sequences.insert(sequence.name().to_string(), sequence);
        self
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.sequences.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }
}

impl SequenceSource for InMemorySequences {
    fn sequence(&self, name: &str) -> Option<Arc<dyn Sequence>> {
        self.sequences.get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_sequence() {
        let sequences = InMemorySequences::new()
            .define("ORDER_ID_SEQ")
            .define_starting_at("LINE_ID_SEQ", 100);

        let order = sequences.sequence("ORDER_ID_SEQ").unwrap();
        assert_eq!(order.next_value().unwrap(), Value::Integer(1));
        assert_eq!(order.next_value().unwrap(), Value::Integer(2));

        let line = sequences.sequence("LINE_ID_SEQ").unwrap();
        assert_eq!(line.next_value().unwrap(), Value::Integer(100));

        assert!(sequences.sequence("order_id_seq").is_none());
        assert_eq!(sequences.names(), vec!["LINE_ID_SEQ", "ORDER_ID_SEQ"]);
    }

    #[test]
    fn test_uuid_sequence_is_unique() {
        let sequences = InMemorySequences::new().define_uuid("TOKEN_SEQ");
        let seq = sequences.sequence("TOKEN_SEQ").unwrap();
        let a = seq.next_value().unwrap();
        let b = seq.next_value().unwrap();
        assert!(a.as_uuid().is_some());
        assert_ne!(a, b);
    }
}
