//! Entity validation engine.
//!
//! Checks an entity payload against a runtime-defined schema. Pure logic:
//! the result depends only on the inputs and the engine never fails.

pub mod evaluator;
pub mod rules;

pub use evaluator::validate;
pub use rules::ValidationResult;
