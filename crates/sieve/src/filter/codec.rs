//! CBOR encoding of filters and value sets.
//!
//! Filters are written as a structural tree that names entities and
//! properties. Decoding resolves every name against the context's schema
//! and rebuilds through the interner, so a decoded filter is the canonical
//! instance, sentinels included.
//!
//! A left-deep junction run is written as one operand list, so long runs
//! stay shallow on the wire.

use crate::{
    error::{BindingError, FilterError, Span},
    filter::{
        chain::{ChainUsage, ChainedProperty, Segment, resolve_chain},
        context::{FilterContext, coerce_for_chain},
        node::{ExistsFilter, Filter, FilterNode, Operand, PropertyFilter, RelOp},
        values::FilterValues,
    },
    model::{EntityRef, SchemaError},
    serialize::{SerializeError, deserialize, serialize},
    value::Value,
};
use serde::{Deserialize, Serialize};

///
/// HopRepr
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct HopRepr {
    pub property: String,
    pub outer: bool,
}

///
/// FilterRepr
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum FilterRepr {
    Open {
        entity: String,
    },
    Closed {
        entity: String,
    },
    Property {
        entity: String,
        chain: Vec<HopRepr>,
        op: RelOp,
        operand: Operand,
    },
    Exists {
        entity: String,
        chain: Vec<HopRepr>,
        negated: bool,
        sub: Box<Self>,
    },
    /// Operands of a left-deep run, folded from the left on decode.
    And(Vec<Self>),
    Or(Vec<Self>),
}

///
/// FilterValuesRepr
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct FilterValuesRepr {
    pub filter: FilterRepr,
    pub values: Vec<Option<Value>>,
}

/// Operands along the left spine of `filter`'s junction run, leftmost first.
fn left_run(filter: &Filter) -> Vec<FilterRepr> {
    let mut rights = Vec::new();
    let mut current = filter;

    loop {
        match (filter.node(), current.node()) {
            (FilterNode::And(..), FilterNode::And(left, right))
            | (FilterNode::Or(..), FilterNode::Or(left, right)) => {
                rights.push(FilterRepr::from(right));
                current = left;
            }
            _ => break,
        }
    }

    rights.push(FilterRepr::from(current));
    rights.reverse();
    rights
}

fn hops_of(chain: &ChainedProperty) -> Vec<HopRepr> {
    chain
        .iter()
        .map(|hop| HopRepr {
            property: hop.property().name().to_string(),
            outer: hop.is_outer(),
        })
        .collect()
}

impl From<&Filter> for FilterRepr {
    fn from(filter: &Filter) -> Self {
        let entity = filter.entity().name().to_string();

        match filter.node() {
            FilterNode::Open => Self::Open { entity },
            FilterNode::Closed => Self::Closed { entity },
            FilterNode::Property(property) => Self::Property {
                entity,
                chain: hops_of(property.chain()),
                op: property.op(),
                operand: property.operand().clone(),
            },
            FilterNode::Exists(exists) => Self::Exists {
                entity,
                chain: hops_of(exists.chain()),
                negated: exists.is_negated(),
                sub: Box::new(exists.sub_filter().into()),
            },
            FilterNode::And(..) => Self::And(left_run(filter)),
            FilterNode::Or(..) => Self::Or(left_run(filter)),
        }
    }
}

impl From<&FilterValues> for FilterValuesRepr {
    fn from(values: &FilterValues) -> Self {
        Self {
            filter: values.filter().into(),
            values: values.raw_values().to_vec(),
        }
    }
}

impl FilterContext {
    pub fn encode_filter(&self, filter: &Filter) -> Result<Vec<u8>, FilterError> {
        Ok(serialize(&FilterRepr::from(filter))?)
    }

    pub fn decode_filter(&self, bytes: &[u8]) -> Result<Filter, FilterError> {
        let repr: FilterRepr = deserialize(bytes)?;

        self.filter_from_repr(&repr)
    }

    pub fn encode_values(&self, values: &FilterValues) -> Result<Vec<u8>, FilterError> {
        Ok(serialize(&FilterValuesRepr::from(values))?)
    }

    /// Decode a value set; the encoded filter must be bound.
    pub fn decode_values(&self, bytes: &[u8]) -> Result<FilterValues, FilterError> {
        let repr: FilterValuesRepr = deserialize(bytes)?;
        let filter = self.filter_from_repr(&repr.filter)?;

        if let Some(unbound) = filter
            .property_filters()
            .into_iter()
            .find(|leaf| leaf.as_property().is_some_and(|p| *p.operand() == Operand::Unbound))
        {
            return Err(BindingError::Unbound {
                filter: unbound.to_string(),
            }
            .into());
        }

        FilterValues::from_parts(filter, repr.values)
    }

    /// Rebuild a canonical filter from its structural form.
    pub fn filter_from_repr(&self, repr: &FilterRepr) -> Result<Filter, FilterError> {
        match repr {
            FilterRepr::Open { entity } => Ok(self.open(&self.entity(entity)?)),
            FilterRepr::Closed { entity } => Ok(self.closed(&self.entity(entity)?)),
            FilterRepr::Property {
                entity,
                chain,
                op,
                operand,
            } => {
                let entity = self.entity(entity)?;
                let chain = self.chain_from_repr(&entity, chain, ChainUsage::Comparison)?.0;
                let operand = match operand {
                    Operand::Constant(value) => {
                        Operand::Constant(coerce_for_chain(&chain, value.clone())?)
                    }
                    other => other.clone(),
                };

                Ok(self.intern(
                    &entity,
                    FilterNode::Property(PropertyFilter {
                        chain,
                        op: *op,
                        operand,
                    }),
                ))
            }
            FilterRepr::Exists {
                entity,
                chain,
                negated,
                sub,
            } => {
                let entity = self.entity(entity)?;
                let (chain, target) = self.chain_from_repr(&entity, chain, ChainUsage::Exists)?;
                let sub = self.filter_from_repr(sub)?;

                if let Some(target) = target
                    && target.name() != sub.entity().name()
                {
                    return Err(SchemaError::EntityMismatch {
                        left: target.name().to_string(),
                        right: sub.entity().name().to_string(),
                    }
                    .into());
                }

                self.intern_exists(
                    &entity,
                    ExistsFilter {
                        chain,
                        sub,
                        negated: *negated,
                    },
                )
            }
            FilterRepr::And(operands) => self.run_from_repr(operands, Self::and),
            FilterRepr::Or(operands) => self.run_from_repr(operands, Self::or),
        }
    }

    fn run_from_repr(
        &self,
        operands: &[FilterRepr],
        join: fn(&Self, &Filter, &Filter) -> Result<Filter, FilterError>,
    ) -> Result<Filter, FilterError> {
        let Some((first, rest)) = operands.split_first() else {
            let err = SerializeError::Deserialize("empty junction in encoded filter".into());
            return Err(err.into());
        };

        rest.iter().try_fold(self.filter_from_repr(first)?, |acc, next| {
            join(self, &acc, &self.filter_from_repr(next)?)
        })
    }

    fn chain_from_repr(
        &self,
        entity: &EntityRef,
        hops: &[HopRepr],
        usage: ChainUsage,
    ) -> Result<(ChainedProperty, Option<EntityRef>), FilterError> {
        let text = hops
            .iter()
            .map(|hop| hop.property.as_str())
            .collect::<Vec<_>>()
            .join(".");

        let mut offset = 0;
        let segments = hops
            .iter()
            .map(|hop| {
                let span = Span::new(offset, offset + hop.property.len());
                offset = span.end + 1;

                Segment {
                    name: &hop.property,
                    outer: hop.outer,
                    span,
                }
            })
            .collect::<Vec<_>>();

        let resolved = resolve_chain(self.schema(), entity, &segments, usage, &text)?;

        Ok((resolved.chain, resolved.target))
    }
}

///
/// TESTS
///
