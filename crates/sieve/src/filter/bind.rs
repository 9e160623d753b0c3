use crate::filter::{
    context::FilterContext,
    node::{ExistsFilter, Filter, FilterNode, Operand, PropertyFilter},
};
use std::collections::HashMap;
use tracing::trace;

///
/// BindCounters
///
/// Next bind id per leaf shape. A shape is the leaf with its operand
/// cleared, so every occurrence of `a = ?` draws from one counter.
///

#[derive(Default)]
struct BindCounters {
    next: HashMap<PropertyFilter, u32>,
}

impl BindCounters {
    /// Seed from ids already present so a partly bound filter never reuses
    /// an id for a different occurrence.
    fn seed(&mut self, filter: &Filter) {
        for leaf in filter.property_filters() {
            let Some(property) = leaf.as_property() else {
                continue;
            };
            if let Operand::Bound(id) = property.operand {
                let shape = property.with_operand(Operand::Unbound);
                let next = self.next.entry(shape).or_default();
                *next = (*next).max(id.saturating_add(1));
            }
        }
    }

    fn take(&mut self, shape: &PropertyFilter) -> u32 {
        let next = self.next.entry(shape.clone()).or_default();
        let id = *next;
        *next = next.saturating_add(1);
        id
    }
}

impl FilterContext {
    ///
    /// Assign a bind id to every unbound `?`.
    ///
    /// Leaves are visited left to right, depth first, including the leaves
    /// of existence sub-filters. The n-th unbound occurrence of a leaf gets
    /// id n, so a clause bound on its own is the same instance as that
    /// clause inside a larger bound filter. Constants are untouched.
    ///
    #[must_use]
    pub fn bind(&self, filter: &Filter) -> Filter {
        if filter.is_bound() {
            return filter.clone();
        }
        if let Some(found) = self.tables().bound.get(filter) {
            return found.clone();
        }

        let mut counters = BindCounters::default();
        counters.seed(filter);
        let bound = self.bind_node(filter, &mut counters);

        trace!(filter = %filter, "bound filter parameters");
        self.tables().bound.insert(filter.clone(), bound.clone());

        bound
    }

    fn bind_node(&self, filter: &Filter, counters: &mut BindCounters) -> Filter {
        match filter.node() {
            FilterNode::Open | FilterNode::Closed => filter.clone(),
            FilterNode::Property(property) => match property.operand {
                Operand::Unbound => {
                    let id = counters.take(property);
                    self.intern(
                        filter.entity(),
                        FilterNode::Property(property.with_operand(Operand::Bound(id))),
                    )
                }
                Operand::Bound(_) | Operand::Constant(_) => filter.clone(),
            },
            FilterNode::Exists(exists) => {
                let sub = self.bind_node(&exists.sub, counters);
                if sub == exists.sub {
                    return filter.clone();
                }

                self.intern(
                    filter.entity(),
                    FilterNode::Exists(ExistsFilter {
                        chain: exists.chain.clone(),
                        sub,
                        negated: exists.negated,
                    }),
                )
            }
            // binding keeps the shape, so the depth limit already holds
            FilterNode::And(left, right) => {
                let left = self.bind_node(left, counters);
                let right = self.bind_node(right, counters);
                self.intern(filter.entity(), FilterNode::And(left, right))
            }
            FilterNode::Or(left, right) => {
                let left = self.bind_node(left, counters);
                let right = self.bind_node(right, counters);
                self.intern(filter.entity(), FilterNode::Or(left, right))
            }
        }
    }
}

///
/// TESTS
///
