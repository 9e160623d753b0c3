//! Disjunctive and conjunctive normal forms.
//!
//! Both rewrites share one clause expansion: operands of the outer junction
//! are concatenated, operands of the inner junction are distributed by
//! cross product. Existence tests are atoms; their sub-filters are left as
//! written. Results are rebuilt left-deep through the context, so repeated
//! rewrites return the same instance.

use crate::{
    error::FilterError,
    filter::{
        context::FilterContext,
        node::{Filter, FilterNode},
    },
};
use tracing::{debug, trace};

///
/// Junction
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Junction {
    And,
    Or,
}

impl Junction {
    const fn dual(self) -> Self {
        match self {
            Self::And => Self::Or,
            Self::Or => Self::And,
        }
    }

    fn split(self, filter: &Filter) -> Option<(&Filter, &Filter)> {
        match (self, filter.node()) {
            (Self::And, FilterNode::And(left, right)) | (Self::Or, FilterNode::Or(left, right)) => {
                Some((left, right))
            }
            _ => None,
        }
    }
}

type Clauses = Vec<Vec<Filter>>;

impl FilterContext {
    /// Or of Ands; no `Or` appears beneath an `And`.
    pub fn disjunctive_normal_form(&self, filter: &Filter) -> Result<Filter, FilterError> {
        let clauses = self.normal_form_clauses(filter, Junction::Or)?;

        self.rebuild(filter, clauses, Junction::Or)
    }

    /// And of Ors; no `And` appears beneath an `Or`.
    pub fn conjunctive_normal_form(&self, filter: &Filter) -> Result<Filter, FilterError> {
        let clauses = self.normal_form_clauses(filter, Junction::And)?;

        self.rebuild(filter, clauses, Junction::And)
    }

    /// The And-clauses of the disjunctive normal form, in order.
    pub fn disjunctive_normal_form_split(
        &self,
        filter: &Filter,
    ) -> Result<Vec<Filter>, FilterError> {
        let clauses = self.normal_form_clauses(filter, Junction::Or)?;

        clauses
            .into_iter()
            .map(|clause| self.fold(filter, clause, Junction::And))
            .collect()
    }

    /// The Or-clauses of the conjunctive normal form, in order.
    pub fn conjunctive_normal_form_split(
        &self,
        filter: &Filter,
    ) -> Result<Vec<Filter>, FilterError> {
        let clauses = self.normal_form_clauses(filter, Junction::And)?;

        clauses
            .into_iter()
            .map(|clause| self.fold(filter, clause, Junction::Or))
            .collect()
    }

    fn normal_form_clauses(
        &self,
        filter: &Filter,
        outer: Junction,
    ) -> Result<Clauses, FilterError> {
        let limit = self.config().max_normal_form_clauses;
        let clauses = expand(filter, outer, limit).inspect_err(|_| {
            debug!(filter = %filter, limit, "normal form rewrite rejected");
        })?;

        trace!(filter = %filter, ?outer, clauses = clauses.len(), "expanded normal form");

        Ok(clauses)
    }

    fn rebuild(
        &self,
        filter: &Filter,
        clauses: Clauses,
        outer: Junction,
    ) -> Result<Filter, FilterError> {
        let inner = outer.dual();
        let clauses = clauses
            .into_iter()
            .map(|clause| self.fold(filter, clause, inner))
            .collect::<Result<Vec<_>, _>>()?;

        self.fold(filter, clauses, outer)
    }

    /// Left-deep junction of `operands`; an empty list is the junction's
    /// identity over `filter`'s entity.
    fn fold(
        &self,
        filter: &Filter,
        operands: Vec<Filter>,
        junction: Junction,
    ) -> Result<Filter, FilterError> {
        let mut operands = operands.into_iter();
        let Some(first) = operands.next() else {
            return Ok(match junction {
                Junction::And => self.open(filter.entity()),
                Junction::Or => self.closed(filter.entity()),
            });
        };

        operands.try_fold(first, |acc, next| match junction {
            Junction::And => self.and_unchecked(&acc, &next),
            Junction::Or => self.or_unchecked(&acc, &next),
        })
    }
}

/// Clause lists for `filter`: outer junction of inner-junction clauses.
fn expand(filter: &Filter, outer: Junction, limit: usize) -> Result<Clauses, FilterError> {
    if let Some((left, right)) = outer.split(filter) {
        let mut clauses = expand(left, outer, limit)?;
        clauses.extend(expand(right, outer, limit)?);
        check_limit(clauses.len(), limit)?;

        return Ok(clauses);
    }

    if let Some((left, right)) = outer.dual().split(filter) {
        let left = expand(left, outer, limit)?;
        let right = expand(right, outer, limit)?;
        check_limit(left.len().saturating_mul(right.len()), limit)?;

        let mut clauses = Vec::with_capacity(left.len() * right.len());
        for l in &left {
            for r in &right {
                clauses.push(l.iter().chain(r).cloned().collect());
            }
        }

        return Ok(clauses);
    }

    Ok(vec![vec![filter.clone()]])
}

fn check_limit(count: usize, limit: usize) -> Result<(), FilterError> {
    if count > limit {
        Err(FilterError::NormalFormTooLarge { limit })
    } else {
        Ok(())
    }
}

impl Filter {
    /// No `Or` appears beneath an `And`.
    #[must_use]
    pub fn is_disjunctive_normal_form(&self) -> bool {
        is_normal_form(self, Junction::Or)
    }

    /// No `And` appears beneath an `Or`.
    #[must_use]
    pub fn is_conjunctive_normal_form(&self) -> bool {
        is_normal_form(self, Junction::And)
    }
}

fn is_normal_form(filter: &Filter, outer: Junction) -> bool {
    if let Some((left, right)) = outer.split(filter) {
        return is_normal_form(left, outer) && is_normal_form(right, outer);
    }

    is_flat(filter, outer.dual())
}

fn is_flat(filter: &Filter, inner: Junction) -> bool {
    match inner.split(filter) {
        Some((left, right)) => is_flat(left, inner) && is_flat(right, inner),
        None => !matches!(filter.node(), FilterNode::And(..) | FilterNode::Or(..)),
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use crate::{
        config::FilterConfig,
        error::FilterError,
        test_fixtures::{context, context_with},
    };

    #[test]
    fn and_distributes_over_or() {
        let ctx = context();
        let f = ctx
            .filter_for("Order", "orderTotal > ? & (orderNumber = ? | orderID = ?)")
            .unwrap();
        let dnf = ctx.disjunctive_normal_form(&f).unwrap();

        assert_eq!(
            dnf.to_string(),
            "orderTotal > ? & orderNumber = ? | orderTotal > ? & orderID = ?"
        );
        assert!(dnf.is_disjunctive_normal_form());
        assert!(!f.is_disjunctive_normal_form());
        assert!(f.is_conjunctive_normal_form());
    }

    #[test]
    fn or_distributes_over_and() {
        let ctx = context();
        let f = ctx
            .filter_for("Order", "orderTotal > ? | orderNumber = ? & orderID = ?")
            .unwrap();
        let cnf = ctx.conjunctive_normal_form(&f).unwrap();

        assert_eq!(
            cnf.to_string(),
            "(orderTotal > ? | orderNumber = ?) & (orderTotal > ? | orderID = ?)"
        );
        assert!(cnf.is_conjunctive_normal_form());
    }

    #[test]
    fn rewrites_are_idempotent_and_identity_stable() {
        let ctx = context();
        let f = ctx
            .filter_for(
                "Order",
                "(orderTotal > ? | orderNumber = ?) & (orderID = ? | shipments() & address.addressCity = ?)",
            )
            .unwrap();

        let dnf = ctx.disjunctive_normal_form(&f).unwrap();
        assert_eq!(ctx.disjunctive_normal_form(&dnf).unwrap(), dnf);
        assert_eq!(ctx.disjunctive_normal_form(&f).unwrap(), dnf);

        let cnf = ctx.conjunctive_normal_form(&f).unwrap();
        assert_eq!(ctx.conjunctive_normal_form(&cnf).unwrap(), cnf);
    }

    #[test]
    fn sentinels_and_atoms_are_fixed_points() {
        let ctx = context();
        let order = ctx.entity("Order").unwrap();
        let leaf = ctx.filter_for("Order", "orderTotal > ?").unwrap();
        let exists = ctx
            .filter_for("Order", "shipments(shipmentNotes = ? | shipmentID = ?)")
            .unwrap();

        for f in [ctx.open(&order), ctx.closed(&order), leaf, exists] {
            assert_eq!(ctx.disjunctive_normal_form(&f).unwrap(), f);
            assert_eq!(ctx.conjunctive_normal_form(&f).unwrap(), f);
            assert_eq!(ctx.disjunctive_normal_form_split(&f).unwrap(), vec![f.clone()]);
            assert_eq!(ctx.conjunctive_normal_form_split(&f).unwrap(), vec![f.clone()]);
        }
    }

    #[test]
    fn splits_of_disjunction() {
        let ctx = context();
        let f = ctx.bind(&ctx.filter_for("Address", "addressCity = ? | addressZip = ?").unwrap());

        assert_eq!(
            ctx.disjunctive_normal_form_split(&f).unwrap(),
            vec![
                ctx.bind(&ctx.filter_for("Address", "addressCity = ?").unwrap()),
                ctx.bind(&ctx.filter_for("Address", "addressZip = ?").unwrap()),
            ]
        );
        assert_eq!(ctx.conjunctive_normal_form_split(&f).unwrap(), vec![f]);
    }

    #[test]
    fn splits_of_conjunction() {
        let ctx = context();
        let f = ctx.bind(&ctx.filter_for("Address", "addressCity = ? & addressZip = ?").unwrap());

        assert_eq!(ctx.disjunctive_normal_form_split(&f).unwrap(), vec![f.clone()]);
        assert_eq!(
            ctx.conjunctive_normal_form_split(&f).unwrap(),
            vec![
                ctx.bind(&ctx.filter_for("Address", "addressCity = ?").unwrap()),
                ctx.bind(&ctx.filter_for("Address", "addressZip = ?").unwrap()),
            ]
        );
    }

    #[test]
    fn clause_limit_rejects_explosive_rewrites() {
        let ctx = context_with(FilterConfig {
            max_normal_form_clauses: 4,
            ..Default::default()
        });
        let f = ctx
            .filter_for(
                "Address",
                "(addressCity = ? | addressZip = ?) & (addressState = ? | addressLine1 = ?) & (addressID = ? | addressCountry = ?)",
            )
            .unwrap();

        let err = ctx.disjunctive_normal_form(&f).unwrap_err();
        assert_eq!(err, FilterError::NormalFormTooLarge { limit: 4 });

        // already conjunctive: three clauses fit
        assert_eq!(ctx.conjunctive_normal_form(&f).unwrap(), f);
    }

    #[test]
    fn rebuilt_clauses_respect_the_depth_limit() {
        let ctx = context_with(FilterConfig {
            max_filter_depth: 3,
            ..Default::default()
        });
        let f = ctx
            .filter_for(
                "Address",
                "(addressCity = ? | addressZip = ?) & (addressState = ? | addressLine1 = ?)",
            )
            .unwrap();
        assert_eq!(f.depth(), 3);

        let err = ctx.disjunctive_normal_form(&f).unwrap_err();
        assert_eq!(err, FilterError::FilterTooDeep { limit: 3 });

        // four two-leaf clauses split without building the outer junction
        assert_eq!(ctx.disjunctive_normal_form_split(&f).unwrap().len(), 4);
    }
}
