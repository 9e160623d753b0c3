use crate::filter::node::{ExistsFilter, Filter, FilterNode, PropertyFilter};

///
/// FilterVisitor
///
/// One method per node kind. `Context` is caller state threaded through the
/// traversal; junction methods decide themselves whether and in what order
/// to descend into `left` and `right`.
///

pub trait FilterVisitor {
    type Context;
    type Output;

    fn visit_open(&mut self, filter: &Filter, cx: &mut Self::Context) -> Self::Output;

    fn visit_closed(&mut self, filter: &Filter, cx: &mut Self::Context) -> Self::Output;

    fn visit_property(
        &mut self,
        filter: &Filter,
        property: &PropertyFilter,
        cx: &mut Self::Context,
    ) -> Self::Output;

    fn visit_exists(
        &mut self,
        filter: &Filter,
        exists: &ExistsFilter,
        cx: &mut Self::Context,
    ) -> Self::Output;

    fn visit_and(
        &mut self,
        filter: &Filter,
        left: &Filter,
        right: &Filter,
        cx: &mut Self::Context,
    ) -> Self::Output;

    fn visit_or(
        &mut self,
        filter: &Filter,
        left: &Filter,
        right: &Filter,
        cx: &mut Self::Context,
    ) -> Self::Output;
}

impl Filter {
    /// Dispatch to the visitor method for this node's kind.
    pub fn accept<V>(&self, visitor: &mut V, cx: &mut V::Context) -> V::Output
    where
        V: FilterVisitor + ?Sized,
    {
        match self.node() {
            FilterNode::Open => visitor.visit_open(self, cx),
            FilterNode::Closed => visitor.visit_closed(self, cx),
            FilterNode::Property(property) => visitor.visit_property(self, property, cx),
            FilterNode::Exists(exists) => visitor.visit_exists(self, exists, cx),
            FilterNode::And(left, right) => visitor.visit_and(self, left, right, cx),
            FilterNode::Or(left, right) => visitor.visit_or(self, left, right, cx),
        }
    }

    /// Comparison leaves in left-to-right order, duplicates kept, including
    /// the leaves of existence sub-filters.
    #[must_use]
    pub fn property_filters(&self) -> Vec<Self> {
        let mut leaves = Vec::new();
        self.accept(&mut LeafCollector, &mut leaves);

        leaves
    }
}

///
/// LeafCollector
///

struct LeafCollector;

impl FilterVisitor for LeafCollector {
    type Context = Vec<Filter>;
    type Output = ();

    fn visit_open(&mut self, _: &Filter, _: &mut Vec<Filter>) {}

    fn visit_closed(&mut self, _: &Filter, _: &mut Vec<Filter>) {}

    fn visit_property(&mut self, filter: &Filter, _: &PropertyFilter, cx: &mut Vec<Filter>) {
        cx.push(filter.clone());
    }

    fn visit_exists(&mut self, _: &Filter, exists: &ExistsFilter, cx: &mut Vec<Filter>) {
        exists.sub_filter().accept(self, cx);
    }

    fn visit_and(&mut self, _: &Filter, left: &Filter, right: &Filter, cx: &mut Vec<Filter>) {
        left.accept(self, cx);
        right.accept(self, cx);
    }

    fn visit_or(&mut self, _: &Filter, left: &Filter, right: &Filter, cx: &mut Vec<Filter>) {
        left.accept(self, cx);
        right.accept(self, cx);
    }
}

///
/// TESTS
///
