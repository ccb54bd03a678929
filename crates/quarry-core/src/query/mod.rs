//! Filter translation: the `Where` input model, operators, path resolution,
//! operand sanitizing, and composition into a backend-native filter.

mod compose;
mod filter;
mod operator;
mod param;
pub(crate) mod path;
mod sanitize;
mod subquery;


pub use compose::{ParsedQuery, QueryRequest, Translator};
pub use filter::Where;
pub use operator::{Operator, OperatorMap, UnknownOperator};
pub use path::{PathPart, StoragePath};
