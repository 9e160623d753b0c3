use crate::{
    error::{BindingError, FilterError},
    filter::{
        context::coerce_for_chain,
        node::{Filter, Operand},
    },
    value::Value,
};
use std::{fmt, sync::Arc};

///
/// FilterValues
///
/// A bound filter plus the values supplied for its parameters so far.
///
/// There is one slot per distinct bound leaf, in first-occurrence order;
/// a leaf referenced several times is filled once for all occurrences.
/// Supplying a value returns a new `FilterValues`; the receiver is never
/// modified.
///

#[derive(Clone, Debug)]
pub struct FilterValues {
    filter: Filter,
    slots: Arc<[Filter]>,
    values: Vec<Option<Value>>,
    blank: usize,
}

impl FilterValues {
    /// All slots blank. `filter` is expected to be bound.
    pub(crate) fn new(filter: Filter) -> Self {
        let mut slots: Vec<Filter> = Vec::new();
        for leaf in filter.property_filters() {
            let is_parameter = leaf
                .as_property()
                .is_some_and(|p| p.operand().is_parameter());
            if is_parameter && !slots.contains(&leaf) {
                slots.push(leaf);
            }
        }

        let blank = slots.len();

        Self {
            filter,
            slots: slots.into(),
            values: vec![None; blank],
            blank,
        }
    }

    /// Rebuild from decoded parts; every value is converted to its slot's type.
    pub(crate) fn from_parts(
        filter: Filter,
        values: Vec<Option<Value>>,
    ) -> Result<Self, FilterError> {
        let mut result = Self::new(filter);
        if values.len() > result.slots.len() {
            return Err(BindingError::TooManyValues {
                slots: result.slots.len(),
            }
            .into());
        }

        for (index, value) in values.into_iter().enumerate() {
            if let Some(value) = value {
                result.fill(index, value)?;
            }
        }

        Ok(result)
    }

    #[must_use]
    pub const fn filter(&self) -> &Filter {
        &self.filter
    }

    /// Distinct parameter leaves in slot order.
    #[must_use]
    pub fn slots(&self) -> &[Filter] {
        &self.slots
    }

    pub(crate) fn raw_values(&self) -> &[Option<Value>] {
        &self.values
    }

    #[must_use]
    pub const fn blank_parameter_count(&self) -> usize {
        self.blank
    }

    #[must_use]
    pub const fn is_fully_bound(&self) -> bool {
        self.blank == 0
    }

    /// Parameter leaves still waiting for a value, in slot order.
    #[must_use]
    pub fn blank_parameters(&self) -> Vec<Filter> {
        self.slots
            .iter()
            .zip(&self.values)
            .filter(|(_, value)| value.is_none())
            .map(|(slot, _)| slot.clone())
            .collect()
    }

    ///
    /// Fill the lowest blank slot.
    ///
    /// The value is converted to the leaf property's type; a value that
    /// cannot be converted is rejected.
    ///
    pub fn with(&self, value: impl Into<Value>) -> Result<Self, FilterError> {
        let Some(index) = self.values.iter().position(Option::is_none) else {
            return Err(BindingError::TooManyValues {
                slots: self.slots.len(),
            }
            .into());
        };

        let mut next = self.clone();
        next.fill(index, value.into())?;

        Ok(next)
    }

    /// Fill blank slots in order, one per value.
    pub fn with_values<I, V>(&self, values: I) -> Result<Self, FilterError>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        values
            .into_iter()
            .try_fold(self.clone(), |acc, value| acc.with(value))
    }

    /// Values for every parameter occurrence of the whole filter.
    pub fn supplied_values(&self) -> Result<Vec<Value>, FilterError> {
        self.supplied_values_for(&self.filter)
    }

    ///
    /// Values for `sub`'s parameters, in `sub`'s own left-to-right order.
    ///
    /// A slot referenced several times by `sub` appears once per reference.
    /// Every slot `sub` uses must already be filled.
    ///
    pub fn supplied_values_for(&self, sub: &Filter) -> Result<Vec<Value>, FilterError> {
        let mut out = Vec::new();
        let mut missing = 0;

        for leaf in sub.property_filters() {
            let Some(property) = leaf.as_property() else {
                continue;
            };
            if !property.operand().is_parameter() {
                continue;
            }
            if matches!(property.operand(), Operand::Unbound) {
                return Err(BindingError::Unbound {
                    filter: leaf.to_string(),
                }
                .into());
            }

            match &self.values[self.slot_index(&leaf)?] {
                Some(value) => out.push(value.clone()),
                None => missing += 1,
            }
        }

        if missing > 0 {
            return Err(BindingError::BlankSlots { remaining: missing }.into());
        }

        Ok(out)
    }

    fn slot_index(&self, leaf: &Filter) -> Result<usize, FilterError> {
        self.slots.iter().position(|slot| slot == leaf).ok_or_else(|| {
            BindingError::UnknownParameter {
                filter: leaf.to_string(),
            }
            .into()
        })
    }

    fn fill(&mut self, index: usize, value: Value) -> Result<(), FilterError> {
        let Some(property) = self.slots[index].as_property() else {
            return Err(BindingError::UnknownParameter {
                filter: self.slots[index].to_string(),
            }
            .into());
        };

        let value = coerce_for_chain(property.chain(), value)?;
        if self.values[index].replace(value).is_none() {
            self.blank -= 1;
        }

        Ok(())
    }
}

impl fmt::Display for FilterValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.filter.render(f, &|leaf| {
            self.slots
                .iter()
                .position(|slot| slot == leaf)
                .and_then(|index| self.values[index].clone())
        })
    }
}

///
/// TESTS
///
