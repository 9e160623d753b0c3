use crate::filter::{
    context::FilterContext,
    node::{ExistsFilter, Filter, FilterNode},
};

impl FilterContext {
    ///
    /// Logical complement.
    ///
    /// - open ↔ closed
    /// - comparisons take the dual operator and flip every join hop
    /// - existence tests toggle their negation
    /// - and/or follow De Morgan
    ///
    /// Both directions of each pair are cached, so `not(not(f))` returns
    /// `f` itself. The complement has the same shape and depth as `filter`,
    /// and junction children are never sentinels, so nothing here can fail.
    ///
    #[must_use]
    pub fn not(&self, filter: &Filter) -> Filter {
        if let Some(found) = self.tables().complements.get(filter) {
            return found.clone();
        }

        let complement = match filter.node() {
            FilterNode::Open => self.closed(filter.entity()),
            FilterNode::Closed => self.open(filter.entity()),
            FilterNode::Property(property) => {
                self.intern(filter.entity(), FilterNode::Property(property.complement()))
            }
            FilterNode::Exists(exists) => self.intern(
                filter.entity(),
                FilterNode::Exists(ExistsFilter {
                    chain: exists.chain.clone(),
                    sub: exists.sub.clone(),
                    negated: !exists.negated,
                }),
            ),
            FilterNode::And(left, right) => self.intern(
                filter.entity(),
                FilterNode::Or(self.not(left), self.not(right)),
            ),
            FilterNode::Or(left, right) => self.intern(
                filter.entity(),
                FilterNode::And(self.not(left), self.not(right)),
            ),
        };

        let tables = self.tables();
        tables.complements.insert(complement.clone(), filter.clone());
        tables.complements.insert(filter.clone(), complement.clone());

        complement
    }
}

///
/// TESTS
///
