//! Diffing computed values against the response and emitting minimal updates.

mod debounce;

pub use debounce::Debouncer;

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::dispatch::WorkerDispatcher;
use crate::error::Result;
use crate::types::{
    find_items_with_path, AnswerValue, ItemPath, Questionnaire, QuestionnaireItem,
    QuestionnaireResponse,
};

/// One changed item: where it lives, what it becomes, and the definition
/// item it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerUpdate {
    pub path: ItemPath,
    pub item: QuestionnaireItem,
    pub values: Vec<AnswerValue>,
}

/// State mutations the orchestrator emits. Always batched: one action covers
/// every changed item of a cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateAction {
    AnswerValues { updates: Vec<AnswerUpdate> },
}

/// The store boundary. The evaluation pipeline never mutates the response
/// directly; everything goes through dispatched actions.
#[async_trait]
pub trait Dispatch: Send + Sync {
    async fn dispatch(&self, action: UpdateAction);
}

/// Optional batching capability: collect per-item updates and apply them as
/// one atomic transition. Callers without one get a single batched action
/// from the orchestrator instead.
#[async_trait]
pub trait ActionRequester: Send {
    fn set_new_answer(
        &mut self,
        link_id: &str,
        values: Vec<AnswerValue>,
        repeat_index: Option<usize>,
    );

    async fn dispatch_all_actions(&mut self, dispatch: &dyn Dispatch);
}

/// Drives one evaluation cycle: submit to the dispatcher, diff the computed
/// values against the current response, emit only what changed.
pub struct UpdateOrchestrator {
    dispatcher: Arc<WorkerDispatcher>,
}

impl UpdateOrchestrator {
    pub fn new(dispatcher: Arc<WorkerDispatcher>) -> Self {
        Self { dispatcher }
    }

    /// Run the calculators and apply changed values. Missing questionnaire or
    /// response makes this a no-op, not an error. Unchanged values (deep
    /// equality) emit nothing, which is what keeps repeated cycles from
    /// churning the store.
    pub async fn run_calculators(
        &self,
        questionnaire: Option<&Questionnaire>,
        response: Option<&QuestionnaireResponse>,
        dispatch: &dyn Dispatch,
        mut requester: Option<&mut dyn ActionRequester>,
    ) -> Result<()> {
        let (Some(questionnaire), Some(response)) = (questionnaire, response) else {
            return Ok(());
        };

        let pad = self
            .dispatcher
            .submit(questionnaire.clone(), response.clone())
            .await?;

        let mut updates = Vec::new();
        for (link_id, values) in pad.iter() {
            let Some(definition) = questionnaire.find_item(link_id) else {
                continue;
            };

            for (existing, path) in find_items_with_path(link_id, response) {
                if existing.answer_values() == values {
                    continue;
                }
                match requester.as_deref_mut() {
                    Some(requester) => {
                        let repeat_index = if definition.repeats() {
                            path.last().map(|segment| segment.index)
                        } else {
                            None
                        };
                        requester.set_new_answer(link_id, values.to_vec(), repeat_index);
                    }
                    None => updates.push(AnswerUpdate {
                        path,
                        item: definition.clone(),
                        values: values.to_vec(),
                    }),
                }
            }
        }

        match requester {
            Some(requester) => requester.dispatch_all_actions(dispatch).await,
            None if !updates.is_empty() => {
                debug!(changed = updates.len(), "dispatching batched answer update");
                dispatch.dispatch(UpdateAction::AnswerValues { updates }).await;
            }
            None => {}
        }

        Ok(())
    }
}
