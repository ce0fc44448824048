//! Error types for rule tables and rule evaluation.

use std::any::Any;

use reactor_core::PayloadError;
use reactor_remote::{DispatchError, RemoteError};

/// Why a single rule branch failed for one event.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    /// The rule is structurally malformed. `rule` is its serialized form.
    #[error("Rule is invalid ({reason}): {rule}")]
    InvalidRule { rule: String, reason: String },

    /// The rule matched but no entity could be resolved to receive its output.
    #[error("Thng not specified, output of rule '{rule}' not created")]
    MissingTarget { rule: String },

    #[error("Payload classification failed: {0}")]
    PayloadClassification(#[from] PayloadError),

    #[error("Remote operation failed: {0}")]
    RemoteOperation(#[from] RemoteError),

    /// The branch panicked while dispatching. Siblings are unaffected.
    #[error("Rule branch panicked: {0}")]
    Panicked(String),
}

impl RuleError {
    /// Short machine-friendly name of the error kind, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            RuleError::InvalidRule { .. } => "invalid_rule",
            RuleError::MissingTarget { .. } => "missing_target",
            RuleError::PayloadClassification(_) => "payload_classification",
            RuleError::RemoteOperation(_) => "remote_operation",
            RuleError::Panicked(_) => "panicked",
        }
    }
}

impl From<DispatchError> for RuleError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::Classification(e) => RuleError::PayloadClassification(e),
            DispatchError::Remote(e) => RuleError::RemoteOperation(e),
        }
    }
}

/// One failed rule branch.
#[derive(Debug)]
pub struct BranchFailure {
    /// Name of the rule whose branch failed.
    pub rule: String,
    pub error: RuleError,
}

/// Every branch that failed while evaluating one event, in table order.
#[derive(Debug, thiserror::Error)]
#[error("{} rule(s) failed, first: {}", .failures.len(), first_message(.failures))]
pub struct EvaluationError {
    pub failures: Vec<BranchFailure>,
}

impl EvaluationError {
    pub fn first(&self) -> Option<&RuleError> {
        self.failures.first().map(|f| &f.error)
    }
}

fn first_message(failures: &[BranchFailure]) -> String {
    failures
        .first()
        .map(|f| format!("[{}] {}", f.rule, f.error))
        .unwrap_or_default()
}

/// Best-effort text of a caught panic payload.
pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

/// Errors raised while loading or installing a rule table.
#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// The process-wide table was already fixed.
    #[error("Rule table is already installed")]
    AlreadyInstalled,
}
