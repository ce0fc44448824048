//! Event-driven rule engine.
//!
//! This crate provides:
//! - A declarative rule table (action rules and property rules) loaded once at startup
//! - Per-event rule validation and predicate evaluation
//! - Output templates rendered with minijinja into action or property payloads
//! - Concurrent evaluation of every rule with aggregated failures
//! - Entry points that always signal completion to the host runtime

pub mod condition;
pub mod error;
pub mod evaluator;
pub mod reactor;
pub mod schema;
pub mod table;
pub mod templates;
pub mod validation;

pub use error::{BranchFailure, EvaluationError, RuleError, TableError};
pub use evaluator::RuleEvaluator;
pub use reactor::{Completion, Reactor};
pub use table::RuleTable;
