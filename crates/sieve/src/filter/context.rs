use crate::{
    config::FilterConfig,
    error::{FilterError, Span},
    filter::{
        chain::{ChainUsage, ChainedProperty},
        node::{ExistsFilter, Filter, FilterNode, Operand, PropertyFilter, RelOp},
        parse::Parser,
        values::FilterValues,
    },
    model::{EntityRef, SchemaError, SchemaRegistry},
    value::Value,
};
use dashmap::{DashMap, mapref::entry::Entry};
use std::sync::Arc;
use tracing::debug;

///
/// FilterContext
///
/// Owns the schema registry and the interning tables. Every filter-producing
/// operation goes through a context, so structurally equal filters built
/// anywhere against the same context are the same instance.
///
/// Cloning is cheap; clones share the tables. Safe to use from any number
/// of threads.
///

#[derive(Clone)]
pub struct FilterContext {
    inner: Arc<ContextInner>,
}

pub(super) struct ContextInner {
    pub schema: SchemaRegistry,
    pub config: FilterConfig,
    /// Canonical instance per structural key.
    pub nodes: DashMap<NodeKey, Filter>,
    /// Complement pairs, recorded in both directions.
    pub complements: DashMap<Filter, Filter>,
    /// Bound form of each filter passed to `bind`.
    pub bound: DashMap<Filter, Filter>,
    /// Parse results keyed by entity and token sequence.
    pub parsed: DashMap<(String, String), Filter>,
}

///
/// NodeKey
///

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub(super) struct NodeKey {
    entity: String,
    node: FilterNode,
}

impl FilterContext {
    #[must_use]
    pub fn new(schema: SchemaRegistry) -> Self {
        Self::build(schema, FilterConfig::default())
    }

    pub fn with_config(schema: SchemaRegistry, config: FilterConfig) -> Result<Self, FilterError> {
        config.validate()?;

        Ok(Self::build(schema, config))
    }

    fn build(schema: SchemaRegistry, config: FilterConfig) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                schema,
                config,
                nodes: DashMap::new(),
                complements: DashMap::new(),
                bound: DashMap::new(),
                parsed: DashMap::new(),
            }),
        }
    }

    pub(super) fn tables(&self) -> &ContextInner {
        &self.inner
    }

    #[must_use]
    pub fn schema(&self) -> &SchemaRegistry {
        &self.inner.schema
    }

    #[must_use]
    pub fn config(&self) -> &FilterConfig {
        &self.inner.config
    }

    pub fn entity(&self, name: &str) -> Result<EntityRef, FilterError> {
        Ok(self.inner.schema.entity(name)?)
    }

    ///
    /// INTERNING
    ///

    /// Return the canonical instance of `node`, inserting it if unseen.
    pub(crate) fn intern(&self, entity: &EntityRef, node: FilterNode) -> Filter {
        let key = NodeKey {
            entity: entity.name().to_string(),
            node,
        };

        if let Some(found) = self.inner.nodes.get(&key) {
            return found.clone();
        }

        match self.inner.nodes.entry(key) {
            Entry::Occupied(entry) => entry.get().clone(),
            Entry::Vacant(entry) => {
                let filter = Filter::new(entity.clone(), entry.key().node.clone());
                debug!(entity = entity.name(), filter = %filter, "interned filter node");
                entry.insert(filter.clone());
                filter
            }
        }
    }

    /// Intern `node` unless it would exceed the configured depth.
    pub(crate) fn intern_within_depth(
        &self,
        entity: &EntityRef,
        node: FilterNode,
    ) -> Result<Filter, FilterError> {
        let limit = self.inner.config.max_filter_depth;
        if node.depth() > limit {
            debug!(entity = entity.name(), limit, "filter rejected as too deep");
            return Err(FilterError::FilterTooDeep { limit });
        }

        Ok(self.intern(entity, node))
    }

    /// Intern an existence test; its sub-filter may not be `closed`.
    pub(crate) fn intern_exists(
        &self,
        entity: &EntityRef,
        exists: ExistsFilter,
    ) -> Result<Filter, FilterError> {
        if exists.sub.is_closed() {
            let text = format!("{}(closed)", exists.chain);

            return Err(FilterError::malformed(
                "existence test over a closed sub-filter",
                Span::new(0, text.len()),
                &text,
            ));
        }

        self.intern_within_depth(entity, FilterNode::Exists(exists))
    }

    ///
    /// SENTINELS
    ///

    /// Always-true filter; one instance per entity.
    #[must_use]
    pub fn open(&self, entity: &EntityRef) -> Filter {
        self.intern(entity, FilterNode::Open)
    }

    /// Always-false filter; one instance per entity.
    #[must_use]
    pub fn closed(&self, entity: &EntityRef) -> Filter {
        self.intern(entity, FilterNode::Closed)
    }

    ///
    /// PARSING
    ///

    /// Parse `text` against the named entity.
    pub fn filter_for(&self, entity: &str, text: &str) -> Result<Filter, FilterError> {
        let entity = self.entity(entity)?;
        self.parse(&entity, text)
    }

    pub fn parse(&self, entity: &EntityRef, text: &str) -> Result<Filter, FilterError> {
        let parser = Parser::new(self, text)?;
        if !self.inner.config.parse_cache {
            return parser.parse_filter(entity);
        }

        // whitespace variants of one query share an entry
        let cache_key = (entity.name().to_string(), parser.token_text());
        if let Some(found) = self.inner.parsed.get(&cache_key) {
            debug!(entity = entity.name(), text, "parse cache hit");
            return Ok(found.clone());
        }

        let filter = parser.parse_filter(entity)?;

        self.inner.parsed.insert(cache_key, filter.clone());

        Ok(filter)
    }

    /// Parse a standalone property chain such as `(address).addressCity`.
    pub fn parse_chain(&self, entity: &str, text: &str) -> Result<ChainedProperty, FilterError> {
        let entity = self.entity(entity)?;

        Parser::new(self, text)?.parse_standalone_chain(&entity)
    }

    ///
    /// PROGRAMMATIC CONSTRUCTION
    ///

    /// Comparison leaf with an unbound `?` parameter.
    pub fn property(
        &self,
        entity: &EntityRef,
        path: &str,
        op: RelOp,
    ) -> Result<Filter, FilterError> {
        let chain = self.leaf_chain(entity, path)?;

        Ok(self.intern(
            entity,
            FilterNode::Property(PropertyFilter {
                chain,
                op,
                operand: Operand::Unbound,
            }),
        ))
    }

    /// Comparison leaf against a fixed constant.
    ///
    /// The constant is converted to the compared property's type here; a
    /// value that cannot be converted is rejected at construction.
    pub fn constant(
        &self,
        entity: &EntityRef,
        path: &str,
        op: RelOp,
        value: impl Into<Value>,
    ) -> Result<Filter, FilterError> {
        let chain = self.leaf_chain(entity, path)?;
        let value = coerce_for_chain(&chain, value.into())?;

        Ok(self.intern(
            entity,
            FilterNode::Property(PropertyFilter {
                chain,
                op,
                operand: Operand::Constant(value),
            }),
        ))
    }

    /// Existence test over the one-to-many relation at the end of `path`.
    ///
    /// An open `sub` matches any related row; a closed `sub` is rejected,
    /// since no existence test over it can be written as text.
    pub fn exists(
        &self,
        entity: &EntityRef,
        path: &str,
        sub: &Filter,
        negated: bool,
    ) -> Result<Filter, FilterError> {
        let resolved = Parser::new(self, path)?.parse_chain_for(entity, ChainUsage::Exists)?;

        if let Some(target) = &resolved.target
            && target.name() != sub.entity().name()
        {
            return Err(SchemaError::EntityMismatch {
                left: target.name().to_string(),
                right: sub.entity().name().to_string(),
            }
            .into());
        }

        self.intern_exists(
            entity,
            ExistsFilter {
                chain: resolved.chain,
                sub: sub.clone(),
                negated,
            },
        )
    }

    fn leaf_chain(&self, entity: &EntityRef, path: &str) -> Result<ChainedProperty, FilterError> {
        Ok(Parser::new(self, path)?
            .parse_chain_for(entity, ChainUsage::Comparison)?
            .chain)
    }

    ///
    /// COMPOSITION
    ///

    /// Conjunction of two filters over the same entity.
    pub fn and(&self, left: &Filter, right: &Filter) -> Result<Filter, FilterError> {
        check_same_entity(left, right)?;

        self.and_unchecked(left, right)
    }

    /// Disjunction of two filters over the same entity.
    pub fn or(&self, left: &Filter, right: &Filter) -> Result<Filter, FilterError> {
        check_same_entity(left, right)?;

        self.or_unchecked(left, right)
    }

    ///
    /// AND with sentinel simplification:
    /// - x & open   → x
    /// - x & closed → closed
    ///
    /// The entity check is the caller's; the depth limit is checked here.
    ///
    pub(crate) fn and_unchecked(
        &self,
        left: &Filter,
        right: &Filter,
    ) -> Result<Filter, FilterError> {
        if left.is_closed() || right.is_open() {
            return Ok(left.clone());
        }
        if right.is_closed() || left.is_open() {
            return Ok(right.clone());
        }

        self.intern_within_depth(left.entity(), FilterNode::And(left.clone(), right.clone()))
    }

    ///
    /// OR with sentinel simplification:
    /// - x | closed → x
    /// - x | open   → open
    ///
    pub(crate) fn or_unchecked(
        &self,
        left: &Filter,
        right: &Filter,
    ) -> Result<Filter, FilterError> {
        if left.is_open() || right.is_closed() {
            return Ok(left.clone());
        }
        if right.is_open() || left.is_closed() {
            return Ok(right.clone());
        }

        self.intern_within_depth(left.entity(), FilterNode::Or(left.clone(), right.clone()))
    }

    ///
    /// VALUES
    ///

    /// Bind `filter` and return a value set with every slot blank.
    #[must_use]
    pub fn initial_filter_values(&self, filter: &Filter) -> FilterValues {
        FilterValues::new(self.bind(filter))
    }
}

fn check_same_entity(left: &Filter, right: &Filter) -> Result<(), FilterError> {
    if left.entity().name() == right.entity().name() {
        Ok(())
    } else {
        Err(SchemaError::EntityMismatch {
            left: left.entity().name().to_string(),
            right: right.entity().name().to_string(),
        }
        .into())
    }
}

/// Convert `value` to the type of the chain's final property.
pub(crate) fn coerce_for_chain(
    chain: &ChainedProperty,
    value: Value,
) -> Result<Value, FilterError> {
    let property = chain.last_property();
    let Some(kind) = property.scalar_kind() else {
        return Err(FilterError::unsupported_constant(
            chain.to_string(),
            "relation properties cannot hold constants",
        ));
    };

    let label = value.label();
    let rendered = value.to_string();

    value
        .coerce_to(kind, property.is_nullable())
        .ok_or_else(|| {
            FilterError::unsupported_constant(
                chain.to_string(),
                format!("cannot convert {label} {rendered} to {kind}"),
            )
        })
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use crate::{
        config::FilterConfig,
        error::FilterError,
        filter::RelOp,
        model::SchemaError,
        test_fixtures::{context, context_with},
        value::Value,
    };
    use std::thread;

    #[test]
    fn sentinels_are_singletons_per_entity() {
        let ctx = context();
        let order = ctx.entity("Order").unwrap();
        let address = ctx.entity("Address").unwrap();

        assert_eq!(ctx.open(&order), ctx.open(&order));
        assert_eq!(ctx.closed(&order), ctx.closed(&order));
        assert_ne!(ctx.open(&order), ctx.closed(&order));
        assert_ne!(ctx.open(&order), ctx.open(&address));
    }

    #[test]
    fn sentinel_simplification() {
        let ctx = context();
        let order = ctx.entity("Order").unwrap();
        let f = ctx.filter_for("Order", "orderTotal > ?").unwrap();
        let open = ctx.open(&order);
        let closed = ctx.closed(&order);

        assert_eq!(ctx.and(&f, &open).unwrap(), f);
        assert_eq!(ctx.and(&open, &f).unwrap(), f);
        assert_eq!(ctx.and(&f, &closed).unwrap(), closed);
        assert_eq!(ctx.or(&f, &closed).unwrap(), f);
        assert_eq!(ctx.or(&closed, &f).unwrap(), f);
        assert_eq!(ctx.or(&f, &open).unwrap(), open);
    }

    #[test]
    fn independently_built_filters_are_identical() {
        let ctx = context();
        let order = ctx.entity("Order").unwrap();

        let parsed = ctx.filter_for("Order", "orderTotal > ? & orderNumber = ?").unwrap();
        let built = ctx
            .and(
                &ctx.property(&order, "orderTotal", RelOp::Gt).unwrap(),
                &ctx.property(&order, "orderNumber", RelOp::Eq).unwrap(),
            )
            .unwrap();

        assert_eq!(parsed, built);
    }

    #[test]
    fn combining_entities_is_rejected() {
        let ctx = context();
        let order = ctx.filter_for("Order", "orderTotal > ?").unwrap();
        let address = ctx.filter_for("Address", "addressCity = ?").unwrap();

        let err = ctx.and(&order, &address).unwrap_err();
        assert!(matches!(
            err,
            FilterError::Schema(SchemaError::EntityMismatch { .. })
        ));
    }

    #[test]
    fn constants_are_converted_at_construction() {
        let ctx = context();
        let order = ctx.entity("Order").unwrap();

        let f = ctx.constant(&order, "orderTotal", RelOp::Ge, 100u8).unwrap();
        assert_eq!(
            f.as_property().unwrap().constant(),
            Some(&Value::Int(100))
        );
        assert_eq!(f.to_string(), "orderTotal >= 100");

        let err = ctx
            .constant(&order, "orderTotal", RelOp::Ge, "lots")
            .unwrap_err();
        assert!(matches!(err, FilterError::UnsupportedConstant { .. }));

        let err = ctx
            .constant(&order, "orderNumber", RelOp::Eq, Value::Null)
            .unwrap_err();
        assert!(matches!(err, FilterError::UnsupportedConstant { .. }));

        let f = ctx
            .constant(&order, "orderComments", RelOp::Eq, Value::Null)
            .unwrap();
        assert_eq!(f.to_string(), "orderComments = null");
    }

    #[test]
    fn exists_checks_sub_filter_entity() {
        let ctx = context();
        let order = ctx.entity("Order").unwrap();
        let notes = ctx.filter_for("Shipment", "shipmentNotes = ?").unwrap();
        let wrong = ctx.filter_for("Address", "addressCity = ?").unwrap();

        let f = ctx.exists(&order, "shipments", &notes, false).unwrap();
        assert_eq!(f, ctx.filter_for("Order", "shipments(shipmentNotes = ?)").unwrap());

        let err = ctx.exists(&order, "shipments", &wrong, false).unwrap_err();
        assert!(matches!(err, FilterError::Schema(_)));

        let err = ctx.exists(&order, "address", &wrong, false).unwrap_err();
        assert!(matches!(err, FilterError::Malformed { .. }));
    }

    #[test]
    fn exists_over_closed_is_rejected() {
        let ctx = context();
        let order = ctx.entity("Order").unwrap();
        let shipment = ctx.entity("Shipment").unwrap();

        let err = ctx
            .exists(&order, "shipments", &ctx.closed(&shipment), false)
            .unwrap_err();
        assert!(matches!(err, FilterError::Malformed { .. }));

        // an open sub-filter renders as `shipments()` and parses back
        let any = ctx.exists(&order, "shipments", &ctx.open(&shipment), false).unwrap();
        assert_eq!(ctx.filter_for("Order", &any.to_string()).unwrap(), any);
    }

    #[test]
    fn parse_cache_ignores_whitespace() {
        let ctx = context();
        let a = ctx.filter_for("Order", "orderTotal>?&!shipments()").unwrap();
        let b = ctx
            .filter_for("Order", "  orderTotal >  ?\n& ! shipments ( )")
            .unwrap();

        assert_eq!(a, b);
        assert_eq!(ctx.tables().parsed.len(), 1);
    }

    #[test]
    fn junctions_past_the_depth_limit_are_rejected() {
        let ctx = context_with(FilterConfig {
            max_filter_depth: 2,
            ..Default::default()
        });
        let order = ctx.entity("Order").unwrap();
        let total = ctx.property(&order, "orderTotal", RelOp::Gt).unwrap();
        let number = ctx.property(&order, "orderNumber", RelOp::Eq).unwrap();

        let pair = ctx.and(&total, &number).unwrap();
        assert_eq!(pair.depth(), 2);

        let err = ctx.or(&pair, &total).unwrap_err();
        assert_eq!(err, FilterError::FilterTooDeep { limit: 2 });

        // sentinel simplification builds nothing new
        assert_eq!(ctx.and(&pair, &ctx.open(&order)).unwrap(), pair);

        let shipment = ctx
            .filter_for("Shipment", "shipmentID = ? & shipmentNotes = ?")
            .unwrap();
        let err = ctx.exists(&order, "shipments", &shipment, false).unwrap_err();
        assert_eq!(err, FilterError::FilterTooDeep { limit: 2 });
    }

    #[test]
    fn concurrent_interning_yields_one_instance() {
        let ctx = context();
        let text = "address.addressCity = ? | orderTotal < ? & shipments(shipmentNotes != ?)";

        let handles = (0..8)
            .map(|_| {
                let ctx = ctx.clone();
                thread::spawn(move || {
                    let order = ctx.entity("Order").unwrap();
                    let left = ctx.property(&order, "address.addressCity", RelOp::Eq).unwrap();
                    let notes = ctx.filter_for("Shipment", "shipmentNotes != ?").unwrap();
                    let right = ctx
                        .and(
                            &ctx.property(&order, "orderTotal", RelOp::Lt).unwrap(),
                            &ctx.exists(&order, "shipments", &notes, false).unwrap(),
                        )
                        .unwrap();
                    ctx.or(&left, &right).unwrap()
                })
            })
            .collect::<Vec<_>>();

        let built = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .collect::<Vec<_>>();
        let parsed = ctx.filter_for("Order", text).unwrap();

        for filter in built {
            assert_eq!(filter, parsed);
        }
    }
}
