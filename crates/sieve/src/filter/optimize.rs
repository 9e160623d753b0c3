use crate::{
    error::FilterError,
    filter::{
        context::FilterContext,
        node::{ExistsFilter, Filter, FilterNode},
    },
};
use std::fmt;
use tracing::trace;

///
/// CostTier
///
/// Evaluation cost classes, cheapest first.
///

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum CostTier {
    /// Comparison on the entity's own property.
    Joinless,
    /// Comparison reached through inner many-to-one joins only.
    InnerJoin,
    /// Comparison reached through at least one outer join.
    OuterJoin,
    /// Existence test over a one-to-many relation.
    Exists,
}

impl fmt::Display for CostTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Joinless => "joinless",
            Self::InnerJoin => "inner-join",
            Self::OuterJoin => "outer-join",
            Self::Exists => "exists",
        };

        f.write_str(label)
    }
}

///
/// EvaluationCost
///
/// Ordered by tier; existence tests are then ordered by traversal depth.
/// Comparisons carry depth 0, so comparisons in one tier tie.
///

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct EvaluationCost {
    pub tier: CostTier,
    pub depth: usize,
}

impl EvaluationCost {
    const FREE: Self = Self {
        tier: CostTier::Joinless,
        depth: 0,
    };
}

impl Filter {
    /// Short-circuit cost; a junction costs as much as its dearest operand.
    #[must_use]
    pub fn evaluation_cost(&self) -> EvaluationCost {
        match self.node() {
            FilterNode::Open | FilterNode::Closed => EvaluationCost::FREE,
            FilterNode::Property(property) => {
                let chain = property.chain();
                let tier = if chain.join_depth() == 0 {
                    CostTier::Joinless
                } else if chain.has_outer_join() {
                    CostTier::OuterJoin
                } else {
                    CostTier::InnerJoin
                };

                EvaluationCost { tier, depth: 0 }
            }
            FilterNode::Exists(exists) => EvaluationCost {
                tier: CostTier::Exists,
                depth: exists.chain().len(),
            },
            FilterNode::And(left, right) | FilterNode::Or(left, right) => {
                left.evaluation_cost().max(right.evaluation_cost())
            }
        }
    }
}

impl FilterContext {
    ///
    /// Reorder junction operands so cheaper tests run first.
    ///
    /// Each run of one junction kind is flattened, its operands optimized,
    /// stably sorted by cost, and rebuilt left-deep. Existence sub-filters
    /// are optimized too. Truth value, polarity, and normal form are kept.
    ///
    /// A balanced run comes back left-deep, so the result can be deeper
    /// than the input and fail the depth limit.
    ///
    pub fn optimize(&self, filter: &Filter) -> Result<Filter, FilterError> {
        let optimized = self.optimize_node(filter)?;
        if optimized != *filter {
            trace!(from = %filter, to = %optimized, "reordered filter");
        }

        Ok(optimized)
    }

    fn optimize_node(&self, filter: &Filter) -> Result<Filter, FilterError> {
        match filter.node() {
            FilterNode::Open | FilterNode::Closed | FilterNode::Property(_) => Ok(filter.clone()),
            FilterNode::Exists(exists) => {
                let sub = self.optimize_node(&exists.sub)?;
                if sub == exists.sub {
                    return Ok(filter.clone());
                }

                self.intern_exists(
                    filter.entity(),
                    ExistsFilter {
                        chain: exists.chain.clone(),
                        sub,
                        negated: exists.negated,
                    },
                )
            }
            FilterNode::And(..) => self.reorder(filter, true),
            FilterNode::Or(..) => self.reorder(filter, false),
        }
    }

    fn reorder(&self, filter: &Filter, conjunction: bool) -> Result<Filter, FilterError> {
        let mut operands = Vec::new();
        flatten(filter, conjunction, &mut operands);

        let mut operands = operands
            .into_iter()
            .map(|operand| self.optimize_node(&operand))
            .collect::<Result<Vec<_>, _>>()?;
        operands.sort_by_cached_key(Filter::evaluation_cost);

        let mut operands = operands.into_iter();
        let Some(first) = operands.next() else {
            return Ok(filter.clone());
        };

        operands.try_fold(first, |acc, next| {
            if conjunction {
                self.and_unchecked(&acc, &next)
            } else {
                self.or_unchecked(&acc, &next)
            }
        })
    }
}

/// Operands of the maximal same-kind junction run rooted at `filter`.
fn flatten(filter: &Filter, conjunction: bool, out: &mut Vec<Filter>) {
    match (filter.node(), conjunction) {
        (FilterNode::And(left, right), true) | (FilterNode::Or(left, right), false) => {
            flatten(left, conjunction, out);
            flatten(right, conjunction, out);
        }
        _ => out.push(filter.clone()),
    }
}

///
/// TESTS
///
