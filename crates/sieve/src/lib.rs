//! Sieve: a canonical filter expression engine over typed entity schemas.
//!
//! Filters are parsed from a small predicate grammar or built in code,
//! interned so that structurally equal trees are one shared instance, and
//! rewritten (complement, normal forms, short-circuit ordering) without
//! ever being mutated. Parameter values are supplied through immutable
//! `FilterValues` sets.

pub mod config;
pub mod error;
pub mod filter;
pub mod model;
pub mod serialize;
pub mod value;

// test
#[cfg(test)]
pub(crate) mod test_fixtures;

///
/// Prelude
///
/// Domain vocabulary only; errors and serializers stay in their modules.
///

pub mod prelude {
    pub use crate::{
        filter::{Filter, FilterContext, FilterValues, RelOp},
        model::{EntityModel, PropertyModel, ScalarKind, SchemaRegistry},
        value::Value,
    };
}
