//! Filter algebra: construction, canonicalization, and rewrites.

mod bind;
mod chain;
mod codec;
mod complement;
mod context;
mod explain;
mod node;
mod normal_form;
mod optimize;
mod parse;
mod values;
mod visitor;


pub use chain::{ChainHop, ChainedProperty};
pub use codec::{FilterRepr, FilterValuesRepr, HopRepr};
pub use context::FilterContext;
pub use node::{ExistsFilter, Filter, FilterNode, Operand, PropertyFilter, RelOp};
pub use optimize::{CostTier, EvaluationCost};
pub use values::FilterValues;
pub use visitor::FilterVisitor;
