use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc};

///
/// ScalarKind
/// Value shape of a non-relation property.
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum ScalarKind {
    Blob,
    Bool,
    Float64,
    Int,
    Text,
    Timestamp,
    Uint,
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Blob => "blob",
            Self::Bool => "bool",
            Self::Float64 => "float64",
            Self::Int => "int",
            Self::Text => "text",
            Self::Timestamp => "timestamp",
            Self::Uint => "uint",
        };
        write!(f, "{label}")
    }
}

///
/// Cardinality
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Cardinality {
    /// At most one related row; traversable inside a comparison chain.
    ManyToOne,
    /// Any number of related rows; only reachable through an existence test.
    OneToMany,
}

///
/// PropertyKind
///

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum PropertyKind {
    Scalar(ScalarKind),
    Relation {
        target: String,
        cardinality: Cardinality,
    },
}

///
/// PropertyModel
/// One property of an entity, as seen by the filter engine.
///

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct PropertyModel {
    owner: String,
    name: String,
    kind: PropertyKind,
    nullable: bool,
}

pub type PropertyRef = Arc<PropertyModel>;

impl PropertyModel {
    fn new(name: impl Into<String>, kind: PropertyKind) -> Self {
        Self {
            owner: String::new(),
            name: name.into(),
            kind,
            nullable: false,
        }
    }

    #[must_use]
    pub fn scalar(name: impl Into<String>, kind: ScalarKind) -> Self {
        Self::new(name, PropertyKind::Scalar(kind))
    }

    #[must_use]
    pub fn many_to_one(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(
            name,
            PropertyKind::Relation {
                target: target.into(),
                cardinality: Cardinality::ManyToOne,
            },
        )
    }

    #[must_use]
    pub fn one_to_many(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(
            name,
            PropertyKind::Relation {
                target: target.into(),
                cardinality: Cardinality::OneToMany,
            },
        )
    }

    /// Mark the property as accepting `Value::Null`.
    #[must_use]
    pub const fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub(super) fn with_owner(mut self, owner: &str) -> Self {
        owner.clone_into(&mut self.owner);
        self
    }

    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn kind(&self) -> &PropertyKind {
        &self.kind
    }

    #[must_use]
    pub const fn is_nullable(&self) -> bool {
        self.nullable
    }

    #[must_use]
    pub const fn scalar_kind(&self) -> Option<ScalarKind> {
        match self.kind {
            PropertyKind::Scalar(kind) => Some(kind),
            PropertyKind::Relation { .. } => None,
        }
    }

    #[must_use]
    pub const fn is_relation(&self) -> bool {
        matches!(self.kind, PropertyKind::Relation { .. })
    }

    #[must_use]
    pub const fn cardinality(&self) -> Option<Cardinality> {
        match self.kind {
            PropertyKind::Relation { cardinality, .. } => Some(cardinality),
            PropertyKind::Scalar(_) => None,
        }
    }

    /// Name of the related entity, for relation properties.
    #[must_use]
    pub fn target(&self) -> Option<&str> {
        match &self.kind {
            PropertyKind::Relation { target, .. } => Some(target),
            PropertyKind::Scalar(_) => None,
        }
    }
}
