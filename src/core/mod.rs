pub mod error;
pub mod naming;
pub mod record;
pub mod types;
pub mod value;

pub use error::{PersistenceError, Result};
pub use record::Record;
pub use types::{Column, DataType, ForeignKeyDef, TableDef};
pub use value::Value;
