//! Minimal runtime schema model.
//!
//! Entity metadata proper lives outside this crate; this is the lossy
//! projection the filter engine needs to resolve property chains, check
//! relation multiplicity, and convert constants.

mod entity;
mod property;
mod registry;

pub use entity::{EntityModel, EntityRef};
pub use property::{Cardinality, PropertyKind, PropertyModel, PropertyRef, ScalarKind};
pub use registry::{SchemaRegistry, SchemaRegistryBuilder};

use thiserror::Error as ThisError;

///
/// SchemaError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum SchemaError {
    #[error("unknown entity '{entity}'")]
    UnknownEntity { entity: String },

    #[error("entity '{entity}' is registered more than once")]
    DuplicateEntity { entity: String },

    #[error("entity '{entity}' declares property '{property}' more than once")]
    DuplicateProperty { entity: String, property: String },

    #[error("relation '{entity}.{property}' targets unregistered entity '{target}'")]
    UnknownRelationTarget {
        entity: String,
        property: String,
        target: String,
    },

    #[error("cannot combine a filter over '{left}' with a filter over '{right}'")]
    EntityMismatch { left: String, right: String },
}
