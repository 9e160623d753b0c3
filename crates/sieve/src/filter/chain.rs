use crate::{
    error::{FilterError, Span},
    model::{Cardinality, EntityRef, PropertyKind, PropertyRef, SchemaRegistry},
};
use derive_more::Deref;
use std::{fmt, sync::Arc};

///
/// ChainHop
/// One property traversal step.
///

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct ChainHop {
    property: PropertyRef,
    outer: bool,
}

impl ChainHop {
    #[must_use]
    pub const fn property(&self) -> &PropertyRef {
        &self.property
    }

    /// A missing related row satisfies the predicate instead of failing it.
    #[must_use]
    pub const fn is_outer(&self) -> bool {
        self.outer
    }
}

///
/// ChainedProperty
///
/// Dotted sequence of one or more hops, rooted at one entity. Every hop but
/// the last is a many-to-one relation; the last hop is a scalar for
/// comparisons or a one-to-many relation for existence tests.
///

#[derive(Clone, Debug, Deref, Eq, Hash, PartialEq)]
#[deref(forward)]
pub struct ChainedProperty {
    hops: Arc<[ChainHop]>,
}

impl ChainedProperty {
    fn new(hops: Vec<ChainHop>) -> Self {
        debug_assert!(!hops.is_empty(), "chain must have at least one hop");

        Self { hops: hops.into() }
    }

    /// Entity the chain starts from.
    #[must_use]
    pub fn root_entity(&self) -> &str {
        self.hops[0].property.owner()
    }

    #[must_use]
    pub fn last_property(&self) -> &PropertyRef {
        &self.hops[self.hops.len() - 1].property
    }

    /// Number of relation hops traversed before the final property.
    #[must_use]
    pub fn join_depth(&self) -> usize {
        self.hops.len() - 1
    }

    #[must_use]
    pub fn has_outer_join(&self) -> bool {
        self.hops.iter().any(ChainHop::is_outer)
    }

    ///
    /// Flip the join direction of every traversed relation hop.
    ///
    /// The final hop is left alone: it is the compared property, not a join.
    /// Applying this twice yields the original chain.
    ///
    pub(crate) fn with_joins_flipped(&self) -> Self {
        let last = self.hops.len() - 1;
        let hops = self
            .hops
            .iter()
            .enumerate()
            .map(|(i, hop)| ChainHop {
                property: hop.property.clone(),
                outer: if i < last { !hop.outer } else { hop.outer },
            })
            .collect::<Vec<_>>();

        Self::new(hops)
    }
}

impl fmt::Display for ChainedProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, hop) in self.hops.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            if hop.outer {
                write!(f, "({})", hop.property.name())?;
            } else {
                f.write_str(hop.property.name())?;
            }
        }

        Ok(())
    }
}

///
/// Segment
/// Unresolved hop as written in filter text.
///

#[derive(Clone, Copy, Debug)]
pub(crate) struct Segment<'a> {
    pub name: &'a str,
    pub outer: bool,
    pub span: Span,
}

///
/// ChainUsage
/// What the final hop must be.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum ChainUsage {
    /// Leaf comparison: final hop is a scalar, never parenthesized.
    Comparison,
    /// Existence test: final hop is a one-to-many relation.
    Exists,
    /// Standalone chain: any final hop.
    Any,
}

///
/// ResolvedChain
///

#[derive(Debug)]
pub(crate) struct ResolvedChain {
    pub chain: ChainedProperty,
    /// Entity reached by the final hop, when it is a relation.
    pub target: Option<EntityRef>,
}

///
/// Resolve text segments against `entity`, validating relation multiplicity
/// and outer-join placement.
///
pub(crate) fn resolve_chain(
    schema: &SchemaRegistry,
    entity: &EntityRef,
    segments: &[Segment<'_>],
    usage: ChainUsage,
    text: &str,
) -> Result<ResolvedChain, FilterError> {
    let Some(last_index) = segments.len().checked_sub(1) else {
        return Err(FilterError::malformed(
            "expected a property name",
            Span::default(),
            text,
        ));
    };

    let mut current = entity.clone();
    let mut hops = Vec::with_capacity(segments.len());
    let mut target = None;

    for (i, segment) in segments.iter().enumerate() {
        let Some(property) = current.property(segment.name).cloned() else {
            return Err(FilterError::malformed(
                format!(
                    "entity '{}' has no property '{}'",
                    current.name(),
                    segment.name
                ),
                segment.span,
                text,
            ));
        };

        let is_last = i == last_index;

        if segment.outer && is_last && usage == ChainUsage::Comparison {
            return Err(FilterError::malformed(
                format!(
                    "outer join parentheses cannot wrap the compared property '{}'",
                    segment.name
                ),
                segment.span,
                text,
            ));
        }
        if segment.outer && !property.is_relation() {
            return Err(FilterError::malformed(
                format!(
                    "outer join parentheses apply only to relations; '{}' is not a relation",
                    segment.name
                ),
                segment.span,
                text,
            ));
        }

        if is_last {
            check_final_hop(&property, usage, segment, text)?;
        } else {
            check_traversal_hop(&property, segment, text)?;
        }

        if let PropertyKind::Relation { target: name, .. } = property.kind() {
            let next = schema.entity(name)?;
            if is_last {
                target = Some(next);
            } else {
                current = next;
            }
        }

        hops.push(ChainHop {
            property,
            outer: segment.outer,
        });
    }

    Ok(ResolvedChain {
        chain: ChainedProperty::new(hops),
        target,
    })
}

fn check_traversal_hop(
    property: &PropertyRef,
    segment: &Segment<'_>,
    text: &str,
) -> Result<(), FilterError> {
    match property.cardinality() {
        Some(Cardinality::ManyToOne) => Ok(()),
        Some(Cardinality::OneToMany) => Err(FilterError::malformed(
            format!(
                "one-to-many relation '{}' can only be the final hop of an existence test",
                segment.name
            ),
            segment.span,
            text,
        )),
        None => Err(FilterError::malformed(
            format!(
                "property '{}' is not a relation and cannot be traversed",
                segment.name
            ),
            segment.span,
            text,
        )),
    }
}

fn check_final_hop(
    property: &PropertyRef,
    usage: ChainUsage,
    segment: &Segment<'_>,
    text: &str,
) -> Result<(), FilterError> {
    let message = match (usage, property.cardinality()) {
        (ChainUsage::Any, _)
        | (ChainUsage::Comparison, None)
        | (ChainUsage::Exists, Some(Cardinality::OneToMany)) => return Ok(()),

        (ChainUsage::Comparison, Some(Cardinality::OneToMany)) => format!(
            "one-to-many relation '{0}' requires an existence test, e.g. '{0}()'",
            segment.name
        ),
        (ChainUsage::Comparison, Some(Cardinality::ManyToOne)) => format!(
            "relation '{}' cannot be compared directly; compare one of its properties",
            segment.name
        ),
        (ChainUsage::Exists, Some(Cardinality::ManyToOne)) => format!(
            "existence test requires a one-to-many relation; '{}' is many-to-one",
            segment.name
        ),
        (ChainUsage::Exists, None) => format!(
            "existence test requires a one-to-many relation; '{}' is not a relation",
            segment.name
        ),
    };

    Err(FilterError::malformed(message, segment.span, text))
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use crate::{error::FilterError, test_fixtures::context};

    #[test]
    fn outer_segments_render_in_parentheses() {
        let ctx = context();
        let chain = ctx.parse_chain("Shipment", "(order).(address).addressCity").unwrap();

        assert_eq!(chain.to_string(), "(order).(address).addressCity");
        assert_eq!(chain.len(), 3);
        assert_eq!(chain.join_depth(), 2);
        assert!(chain[0].is_outer());
        assert!(chain[1].is_outer());
        assert!(!chain[2].is_outer());
        assert_eq!(chain.root_entity(), "Shipment");
        assert_eq!(chain.last_property().owner(), "Address");
    }

    #[test]
    fn flipping_joins_twice_is_identity() {
        let ctx = context();
        let chain = ctx.parse_chain("Shipment", "(order).address.addressCity").unwrap();
        let flipped = chain.with_joins_flipped();

        assert_eq!(flipped.to_string(), "order.(address).addressCity");
        assert_eq!(flipped.with_joins_flipped(), chain);
    }

    #[test]
    fn scalar_cannot_be_traversed() {
        let ctx = context();
        let err = ctx.parse_chain("Order", "orderTotal.addressCity").unwrap_err();

        assert!(matches!(err, FilterError::Malformed { .. }));
        assert_eq!(err.span().map(|s| s.range()), Some(0..10));
    }

    #[test]
    fn scalar_cannot_be_outer() {
        let ctx = context();
        let err = ctx.parse_chain("Order", "(orderTotal)").unwrap_err();

        assert!(matches!(err, FilterError::Malformed { .. }));
    }

    #[test]
    fn relation_final_hop_may_be_outer_in_standalone_chain() {
        let ctx = context();
        let chain = ctx.parse_chain("Order", "(shipments)").unwrap();

        assert!(chain[0].is_outer());
    }

    #[test]
    fn unknown_property_reports_its_span() {
        let ctx = context();
        let err = ctx.parse_chain("Order", "address.nowhere").unwrap_err();

        assert_eq!(err.span().map(|s| s.range()), Some(8..15));
    }
}
