//! Event entry points bound to the host runtime.
//!
//! Each handler runs the matching evaluator and then signals completion to
//! the host exactly once. Failures are logged here and never reach the host.
//! A panic inside one branch's dispatch is caught by the evaluator and
//! reported like any other branch failure; anything that still unwinds out
//! of an evaluation is caught here.

use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use reactor_core::{ActionEvent, HostEvent, PropertyChangeEvent};
use tracing::error;

use crate::error::{panic_message, EvaluationError};
use crate::evaluator::RuleEvaluator;

/// How an event finished, handed to the host's completion callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Succeeded,
    /// At least one rule branch failed; details went to the log.
    Failed,
}

#[derive(Debug, Clone)]
pub struct Reactor {
    evaluator: RuleEvaluator,
}

impl Reactor {
    pub fn new(evaluator: RuleEvaluator) -> Self {
        Self { evaluator }
    }

    pub fn evaluator(&self) -> &RuleEvaluator {
        &self.evaluator
    }

    pub async fn on_action_created<D>(&self, event: ActionEvent, done: D)
    where
        D: FnOnce(Completion),
    {
        handle(
            "actionCreated",
            self.evaluator.check_action_rules(&event),
            done,
        )
        .await
    }

    pub async fn on_thng_properties_changed<D>(&self, event: PropertyChangeEvent, done: D)
    where
        D: FnOnce(Completion),
    {
        handle(
            "thngPropertiesChanged",
            self.evaluator.check_property_rules(&event),
            done,
        )
        .await
    }

    /// Route an enveloped event to its entry point.
    pub async fn on_event<D>(&self, event: HostEvent, done: D)
    where
        D: FnOnce(Completion),
    {
        match event {
            HostEvent::ActionCreated(e) => self.on_action_created(e, done).await,
            HostEvent::ThngPropertiesChanged(e) => self.on_thng_properties_changed(e, done).await,
        }
    }
}

async fn handle<F, D>(event: &'static str, evaluation: F, done: D)
where
    F: Future<Output = Result<(), EvaluationError>>,
    D: FnOnce(Completion),
{
    let completion = match AssertUnwindSafe(evaluation).catch_unwind().await {
        Ok(Ok(())) => Completion::Succeeded,
        Ok(Err(e)) => {
            error!(event, error = %e, "rule evaluation failed");
            for failure in &e.failures {
                error!(
                    event,
                    rule = %failure.rule,
                    kind = failure.error.kind(),
                    error = %failure.error,
                    "rule branch failed"
                );
            }
            Completion::Failed
        }
        Err(panic) => {
            let message = panic_message(panic.as_ref());
            error!(event, panic = %message, "rule evaluation panicked");
            Completion::Failed
        }
    };
    done(completion);
}
