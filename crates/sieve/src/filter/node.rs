use crate::{
    filter::chain::ChainedProperty,
    model::EntityRef,
    value::Value,
};
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    hash::{Hash, Hasher},
    sync::Arc,
};

///
/// Filter AST
///
/// Immutable, canonical predicate trees scoped to one entity schema.
/// Nodes are only created through `FilterContext`, which interns them, so
/// two structurally equal filters are always the same allocation and
/// equality is pointer identity.
///

///
/// RelOp
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum RelOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl RelOp {
    /// Logical complement: `!(a op b)` is `a dual(op) b`.
    #[must_use]
    pub const fn dual(self) -> Self {
        match self {
            Self::Eq => Self::Ne,
            Self::Ne => Self::Eq,
            Self::Lt => Self::Ge,
            Self::Ge => Self::Lt,
            Self::Le => Self::Gt,
            Self::Gt => Self::Le,
        }
    }

    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }
}

impl fmt::Display for RelOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

///
/// Operand
///
/// Right-hand side of a property comparison.
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Operand {
    /// `?` not yet assigned a bind id.
    Unbound,
    /// `?` with a bind id; the n-th occurrence of the same leaf gets id n.
    Bound(u32),
    /// Fixed value, already converted to the property's type.
    Constant(Value),
}

impl Operand {
    #[must_use]
    pub const fn is_parameter(&self) -> bool {
        matches!(self, Self::Unbound | Self::Bound(_))
    }
}

///
/// PropertyFilter
///

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct PropertyFilter {
    pub(crate) chain: ChainedProperty,
    pub(crate) op: RelOp,
    pub(crate) operand: Operand,
}

impl PropertyFilter {
    #[must_use]
    pub const fn chain(&self) -> &ChainedProperty {
        &self.chain
    }

    #[must_use]
    pub const fn op(&self) -> RelOp {
        self.op
    }

    #[must_use]
    pub const fn operand(&self) -> &Operand {
        &self.operand
    }

    #[must_use]
    pub const fn bind_id(&self) -> Option<u32> {
        match self.operand {
            Operand::Bound(id) => Some(id),
            _ => None,
        }
    }

    #[must_use]
    pub const fn constant(&self) -> Option<&Value> {
        match &self.operand {
            Operand::Constant(value) => Some(value),
            _ => None,
        }
    }

    /// Same leaf with a different operand.
    pub(crate) fn with_operand(&self, operand: Operand) -> Self {
        Self {
            chain: self.chain.clone(),
            op: self.op,
            operand,
        }
    }

    /// Dual operator over the chain with every join direction flipped.
    pub(crate) fn complement(&self) -> Self {
        Self {
            chain: self.chain.with_joins_flipped(),
            op: self.op.dual(),
            operand: self.operand.clone(),
        }
    }
}

///
/// ExistsFilter
///
/// Existence test over a one-to-many relation. `sub` is evaluated against
/// the related entity; an open `sub` matches any related row.
///

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct ExistsFilter {
    pub(crate) chain: ChainedProperty,
    pub(crate) sub: Filter,
    pub(crate) negated: bool,
}

impl ExistsFilter {
    #[must_use]
    pub const fn chain(&self) -> &ChainedProperty {
        &self.chain
    }

    #[must_use]
    pub const fn sub_filter(&self) -> &Filter {
        &self.sub
    }

    #[must_use]
    pub const fn is_negated(&self) -> bool {
        self.negated
    }
}

///
/// FilterNode
///
/// Closed sum of node kinds. Children are canonical `Filter` handles, so the
/// derived `Eq`/`Hash` compare children by identity and a node doubles as its
/// own interning key.
///

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum FilterNode {
    Open,
    Closed,
    Property(PropertyFilter),
    Exists(ExistsFilter),
    And(Filter, Filter),
    Or(Filter, Filter),
}

impl FilterNode {
    /// Levels in a filter rooted at this node; a leaf has depth 1.
    #[must_use]
    pub fn depth(&self) -> usize {
        match self {
            Self::Open | Self::Closed | Self::Property(_) => 1,
            Self::Exists(exists) => exists.sub.depth() + 1,
            Self::And(left, right) | Self::Or(left, right) => left.depth().max(right.depth()) + 1,
        }
    }
}

///
/// Filter
///
/// Cheap, shareable handle to a canonical node.
///

#[derive(Clone)]
pub struct Filter {
    inner: Arc<FilterInner>,
}

struct FilterInner {
    entity: EntityRef,
    node: FilterNode,
    depth: usize,
}

impl Filter {
    pub(crate) fn new(entity: EntityRef, node: FilterNode) -> Self {
        let depth = node.depth();

        Self {
            inner: Arc::new(FilterInner {
                entity,
                node,
                depth,
            }),
        }
    }

    /// Entity schema this filter applies to.
    #[must_use]
    pub fn entity(&self) -> &EntityRef {
        &self.inner.entity
    }

    #[must_use]
    pub fn node(&self) -> &FilterNode {
        &self.inner.node
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.inner.depth
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        matches!(self.node(), FilterNode::Open)
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        matches!(self.node(), FilterNode::Closed)
    }

    #[must_use]
    pub fn as_property(&self) -> Option<&PropertyFilter> {
        match self.node() {
            FilterNode::Property(property) => Some(property),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_exists(&self) -> Option<&ExistsFilter> {
        match self.node() {
            FilterNode::Exists(exists) => Some(exists),
            _ => None,
        }
    }

    /// True when no leaf carries an unbound `?`.
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.property_filters()
            .iter()
            .filter_map(Self::as_property)
            .all(|p| !matches!(p.operand, Operand::Unbound))
    }

    /// Stable identity of the canonical node.
    #[must_use]
    pub fn id(&self) -> usize {
        Arc::as_ptr(&self.inner).addr()
    }

    ///
    /// Render with `lookup` supplying a value for parameter leaves.
    /// Leaves without a value print as `?`.
    ///
    pub(crate) fn render(
        &self,
        out: &mut fmt::Formatter<'_>,
        lookup: &dyn Fn(&Self) -> Option<Value>,
    ) -> fmt::Result {
        match self.node() {
            FilterNode::Open => out.write_str("open"),
            FilterNode::Closed => out.write_str("closed"),
            FilterNode::Property(property) => {
                write!(out, "{} {} ", property.chain, property.op)?;
                match &property.operand {
                    Operand::Constant(value) => write!(out, "{value}"),
                    Operand::Unbound | Operand::Bound(_) => match lookup(self) {
                        Some(value) => write!(out, "{value}"),
                        None => out.write_str("?"),
                    },
                }
            }
            FilterNode::Exists(exists) => {
                if exists.negated {
                    out.write_str("!")?;
                }
                write!(out, "{}(", exists.chain)?;
                if !exists.sub.is_open() {
                    exists.sub.render(out, lookup)?;
                }
                out.write_str(")")
            }
            FilterNode::And(left, right) => self.render_junction(out, lookup, left, right, " & "),
            FilterNode::Or(left, right) => self.render_junction(out, lookup, left, right, " | "),
        }
    }

    fn render_junction(
        &self,
        out: &mut fmt::Formatter<'_>,
        lookup: &dyn Fn(&Self) -> Option<Value>,
        left: &Self,
        right: &Self,
        symbol: &str,
    ) -> fmt::Result {
        let prec = self.precedence();

        // left-associative: only a looser left child needs parentheses
        if left.precedence() < prec {
            out.write_str("(")?;
            left.render(out, lookup)?;
            out.write_str(")")?;
        } else {
            left.render(out, lookup)?;
        }

        out.write_str(symbol)?;

        if right.precedence() <= prec {
            out.write_str("(")?;
            right.render(out, lookup)?;
            out.write_str(")")
        } else {
            right.render(out, lookup)
        }
    }

    fn precedence(&self) -> u8 {
        match self.node() {
            FilterNode::Or(..) => 1,
            FilterNode::And(..) => 2,
            _ => 3,
        }
    }
}

impl PartialEq for Filter {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Filter {}

impl Hash for Filter {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.render(f, &|_| None)
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Filter<{}>({self})", self.entity().name())
    }
}
