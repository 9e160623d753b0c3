use crate::model::property::{PropertyModel, PropertyRef};
use std::sync::Arc;

///
/// EntityModel
/// Runtime model for one entity schema.
///

#[derive(Debug, Eq, PartialEq)]
pub struct EntityModel {
    name: String,
    properties: Vec<PropertyRef>,
}

/// Shared handle to a registered entity model.
pub type EntityRef = Arc<EntityModel>;

impl EntityModel {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: Vec::new(),
        }
    }

    /// Append a property; declaration order is preserved.
    #[must_use]
    pub fn with_property(mut self, property: PropertyModel) -> Self {
        let property = property.with_owner(&self.name);
        self.properties.push(Arc::new(property));
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn properties(&self) -> &[PropertyRef] {
        &self.properties
    }

    #[must_use]
    pub fn property(&self, name: &str) -> Option<&PropertyRef> {
        self.properties.iter().find(|p| p.name() == name)
    }
}
