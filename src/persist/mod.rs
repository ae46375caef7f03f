//! Reconciles access models against the record store.

pub mod action;
pub mod persister;

pub use action::{PersistAction, PersistOutcome, PersistedChange};
pub use persister::Persister;
