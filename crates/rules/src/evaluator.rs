//! Rule evaluation for action and property-change events.
//!
//! Every rule in the relevant list gets its own branch. A branch validates
//! its rule, checks the predicate, renders the payload and dispatches it.
//! All of that is synchronous except the dispatch. Branches run
//! concurrently; the evaluator waits for all of them and reports every
//! failure instead of stopping at the first one.
//!
//! Rules never see each other's side effects within one event, and two
//! branches may update the same entity concurrently.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::future::join_all;
use futures::FutureExt;
use reactor_core::{Action, ActionEvent, Payload, PropertyChangeEvent};
use reactor_remote::OutputDispatcher;
use serde_json::json;
use tracing::info;

use crate::condition::{ActionCondition, PropertyCondition};
use crate::error::{panic_message, BranchFailure, EvaluationError, RuleError};
use crate::schema::Rule;
use crate::table::RuleTable;
use crate::templates::TemplateError;
use crate::validation::validate_rule;

/// A matched rule, ready to dispatch.
struct Fired {
    target: String,
    payload: Payload,
}

/// Evaluates the rule table against inbound events.
#[derive(Debug, Clone)]
pub struct RuleEvaluator {
    table: Arc<RuleTable>,
    dispatcher: OutputDispatcher,
}

impl RuleEvaluator {
    pub fn new(table: Arc<RuleTable>, dispatcher: OutputDispatcher) -> Self {
        Self { table, dispatcher }
    }

    pub fn table(&self) -> &RuleTable {
        &self.table
    }

    /// Run every action rule against `event`.
    pub async fn check_action_rules(&self, event: &ActionEvent) -> Result<(), EvaluationError> {
        let action = &event.action;
        let branches = self
            .table
            .action_rules
            .iter()
            .map(|rule| self.branch(rule, prepare_action(rule, action)));
        self.settle(&self.table.action_rules, branches).await
    }

    /// Run every property rule against `event`.
    pub async fn check_property_rules(
        &self,
        event: &PropertyChangeEvent,
    ) -> Result<(), EvaluationError> {
        let branches = self
            .table
            .property_rules
            .iter()
            .map(|rule| self.branch(rule, prepare_property(rule, event)));
        self.settle(&self.table.property_rules, branches).await
    }

    /// Dispatch stage of one branch. `prepared` was computed eagerly.
    ///
    /// A panic during dispatch is caught here so that it fails only this
    /// branch and never unwinds through the sibling branches in flight.
    fn branch<'a, W>(
        &'a self,
        rule: &'a Rule<W>,
        prepared: Result<Option<Fired>, RuleError>,
    ) -> impl Future<Output = Result<(), RuleError>> + 'a {
        async move {
            let Some(fired) = prepared? else {
                return Ok(());
            };
            info!(
                rule = %rule.name,
                thng = %fired.target,
                kind = fired.payload.kind(),
                "running rule"
            );
            let dispatch = self.dispatcher.dispatch(&fired.target, &fired.payload);
            match AssertUnwindSafe(dispatch).catch_unwind().await {
                Ok(result) => result.map(|_| ()).map_err(RuleError::from),
                Err(panic) => Err(RuleError::Panicked(panic_message(panic.as_ref()))),
            }
        }
    }

    /// Wait for every branch and gather failures in table order.
    async fn settle<W, I, F>(&self, rules: &[Rule<W>], branches: I) -> Result<(), EvaluationError>
    where
        I: Iterator<Item = F>,
        F: Future<Output = Result<(), RuleError>>,
    {
        // Collecting first runs every predicate before any dispatch is polled.
        let branches: Vec<F> = branches.collect();
        let outcomes = join_all(branches).await;

        let failures: Vec<BranchFailure> = rules
            .iter()
            .zip(outcomes)
            .filter_map(|(rule, outcome)| {
                outcome.err().map(|error| BranchFailure {
                    rule: rule.name.clone(),
                    error,
                })
            })
            .collect();

        if failures.is_empty() {
            Ok(())
        } else {
            Err(EvaluationError { failures })
        }
    }
}

/// Validate, match and produce for one action rule.
fn prepare_action(
    rule: &Rule<ActionCondition>,
    action: &Action,
) -> Result<Option<Fired>, RuleError> {
    let (when, create) = validate_rule(rule)?;
    if !when.matches(action) {
        return Ok(None);
    }

    let target = action.target().ok_or_else(|| RuleError::MissingTarget {
        rule: rule.name.clone(),
    })?;

    let ctx = json!({ "action": action, "thng": target });
    let payload = create.render(&ctx).map_err(|e| produce_error(rule, e))?;
    Ok(Some(Fired {
        target: target.to_string(),
        payload,
    }))
}

/// Validate, match and produce for one property rule.
///
/// Only the first changed key (in event order) that satisfies the predicate
/// fires the rule.
fn prepare_property(
    rule: &Rule<PropertyCondition>,
    event: &PropertyChangeEvent,
) -> Result<Option<Fired>, RuleError> {
    let (when, create) = validate_rule(rule)?;
    let Some((key, change)) = event
        .changes
        .iter()
        .find(|(key, change)| when.matches(key, &change.new_value))
    else {
        return Ok(None);
    };

    let ctx = json!({ "key": key, "value": change.new_value, "thng": event.thng.id });
    let payload = create.render(&ctx).map_err(|e| produce_error(rule, e))?;
    Ok(Some(Fired {
        target: event.thng.id.clone(),
        payload,
    }))
}

fn produce_error<W: serde::Serialize>(rule: &Rule<W>, err: TemplateError) -> RuleError {
    match err {
        TemplateError::Payload(e) => RuleError::PayloadClassification(e),
        other => RuleError::InvalidRule {
            rule: serde_json::to_string(rule).unwrap_or_else(|_| rule.name.clone()),
            reason: other.to_string(),
        },
    }
}
