use crate::model::{EntityModel, EntityRef, SchemaError};
use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

///
/// SchemaRegistry
///
/// Immutable set of entity models. Every relation target is guaranteed to be
/// registered, so chain resolution never dangles.
///

#[derive(Clone, Debug, Default)]
pub struct SchemaRegistry {
    entities: BTreeMap<String, EntityRef>,
}

impl SchemaRegistry {
    #[must_use]
    pub fn builder() -> SchemaRegistryBuilder {
        SchemaRegistryBuilder::default()
    }

    pub fn entity(&self, name: &str) -> Result<EntityRef, SchemaError> {
        self.entities
            .get(name)
            .cloned()
            .ok_or_else(|| SchemaError::UnknownEntity {
                entity: name.to_string(),
            })
    }
}

///
/// SchemaRegistryBuilder
///

#[derive(Debug, Default)]
pub struct SchemaRegistryBuilder {
    entities: Vec<EntityModel>,
}

impl SchemaRegistryBuilder {
    #[must_use]
    pub fn entity(mut self, model: EntityModel) -> Self {
        self.entities.push(model);
        self
    }

    /// Validate and freeze the registry.
    pub fn build(self) -> Result<SchemaRegistry, SchemaError> {
        let mut entities = BTreeMap::new();

        for model in self.entities {
            let mut seen = BTreeSet::new();
            for property in model.properties() {
                if !seen.insert(property.name()) {
                    return Err(SchemaError::DuplicateProperty {
                        entity: model.name().to_string(),
                        property: property.name().to_string(),
                    });
                }
            }

            let name = model.name().to_string();
            if entities.insert(name.clone(), Arc::new(model)).is_some() {
                return Err(SchemaError::DuplicateEntity { entity: name });
            }
        }

        for entity in entities.values() {
            for property in entity.properties() {
                if let Some(target) = property.target()
                    && !entities.contains_key(target)
                {
                    return Err(SchemaError::UnknownRelationTarget {
                        entity: entity.name().to_string(),
                        property: property.name().to_string(),
                        target: target.to_string(),
                    });
                }
            }
        }

        Ok(SchemaRegistry { entities })
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PropertyModel, ScalarKind};

    #[test]
    fn dangling_relation_target_is_rejected() {
        let err = SchemaRegistry::builder()
            .entity(EntityModel::new("Order").with_property(PropertyModel::many_to_one(
                "address", "Address",
            )))
            .build()
            .unwrap_err();

        assert_eq!(
            err,
            SchemaError::UnknownRelationTarget {
                entity: "Order".to_string(),
                property: "address".to_string(),
                target: "Address".to_string(),
            }
        );
    }

    #[test]
    fn duplicate_property_is_rejected() {
        let err = SchemaRegistry::builder()
            .entity(
                EntityModel::new("Order")
                    .with_property(PropertyModel::scalar("orderTotal", ScalarKind::Int))
                    .with_property(PropertyModel::scalar("orderTotal", ScalarKind::Uint)),
            )
            .build()
            .unwrap_err();

        assert!(matches!(err, SchemaError::DuplicateProperty { .. }));
    }

    #[test]
    fn duplicate_entity_is_rejected() {
        let err = SchemaRegistry::builder()
            .entity(EntityModel::new("Order"))
            .entity(EntityModel::new("Order"))
            .build()
            .unwrap_err();

        assert!(matches!(err, SchemaError::DuplicateEntity { .. }));
    }

    #[test]
    fn properties_record_their_owner() {
        let registry = SchemaRegistry::builder()
            .entity(
                EntityModel::new("Address")
                    .with_property(PropertyModel::scalar("addressCity", ScalarKind::Text)),
            )
            .build()
            .unwrap();

        let address = registry.entity("Address").unwrap();
        assert_eq!(address.property("addressCity").unwrap().owner(), "Address");
        assert!(registry.entity("Missing").is_err());
    }
}
