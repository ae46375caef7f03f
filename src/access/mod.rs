//! The domain object instance access model: a tree of structural positions
//! over one aggregate, each paired with the mapper that persists it.

pub mod access_model;
pub mod builder;
pub mod position;

pub use access_model::{AccessModel, DomainObjectInstanceAccessModel};
pub use builder::AccessModelBuilder;
pub use position::{Discriminator, KeySegment, PathSegment, PositionKey, StructuralPosition};
