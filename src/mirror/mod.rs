//! Record mappers: domain instance <-> flat relational record.

pub mod record_mapper;
pub mod registry;

pub use record_mapper::{RecordMapper, RecordMirror};
pub use registry::RecordMirrorRegistry;
