mod common;

use async_trait::async_trait;
use common::*;
use refero_core::*;

use std::sync::{Arc, Mutex};

/// Store double: records every dispatched action.
#[derive(Default)]
struct RecordingStore {
    actions: Mutex<Vec<UpdateAction>>,
}

#[async_trait]
impl Dispatch for RecordingStore {
    async fn dispatch(&self, action: UpdateAction) {
        self.actions.lock().unwrap().push(action);
    }
}

impl RecordingStore {
    fn dispatched(&self) -> Vec<UpdateAction> {
        self.actions.lock().unwrap().clone()
    }

    /// Apply recorded answer updates back onto a response, the way the store
    /// reducer would.
    fn apply_to(&self, response: &mut QuestionnaireResponse) {
        for action in self.dispatched() {
            let UpdateAction::AnswerValues { updates } = action;
            for update in updates {
                if let Some(item) = item_at_path_mut(&update.path, response) {
                    item.answer = update
                        .values
                        .iter()
                        .cloned()
                        .map(QuestionnaireResponseAnswer::new)
                        .collect();
                }
            }
        }
    }
}

/// Minimal batching requester: collects updates, then applies them in one
/// dispatch call.
#[derive(Default)]
struct BatchingRequester {
    collected: Vec<(String, Vec<AnswerValue>, Option<usize>)>,
}

#[async_trait]
impl ActionRequester for BatchingRequester {
    fn set_new_answer(
        &mut self,
        link_id: &str,
        values: Vec<AnswerValue>,
        repeat_index: Option<usize>,
    ) {
        self.collected
            .push((link_id.to_string(), values, repeat_index));
    }

    async fn dispatch_all_actions(&mut self, dispatch: &dyn Dispatch) {
        if self.collected.is_empty() {
            return;
        }
        let updates = self
            .collected
            .drain(..)
            .map(|(link_id, values, _)| AnswerUpdate {
                path: vec![PathSegment::new(link_id.clone(), 0)],
                item: QuestionnaireItem::new(link_id, ItemType::Integer),
                values,
            })
            .collect();
        dispatch.dispatch(UpdateAction::AnswerValues { updates }).await;
    }
}

#[tokio::test]
async fn end_to_end_emits_exactly_one_batched_action() {
    let questionnaire = create_test_questionnaire();
    let response = create_test_response();
    let store = RecordingStore::default();

    let orchestrator = UpdateOrchestrator::new(Arc::new(WorkerDispatcher::new()));
    orchestrator
        .run_calculators(Some(&questionnaire), Some(&response), &store, None)
        .await
        .unwrap();

    let actions = store.dispatched();
    assert_eq!(actions.len(), 1);
    let UpdateAction::AnswerValues { updates } = &actions[0];
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].item.link_id, "calculated");
    assert_eq!(updates[0].values, vec![AnswerValue::Integer(42)]);
}

#[tokio::test]
async fn unchanged_values_dispatch_nothing() {
    let questionnaire = create_test_questionnaire();
    // `calculated` already holds the value the expression produces.
    let response = QuestionnaireResponse::new()
        .with_item(QuestionnaireResponseItem::new("input").with_answer(AnswerValue::Integer(42)))
        .with_item(
            QuestionnaireResponseItem::new("calculated").with_answer(AnswerValue::Integer(42)),
        );
    let store = RecordingStore::default();

    let orchestrator = UpdateOrchestrator::new(Arc::new(WorkerDispatcher::new()));
    orchestrator
        .run_calculators(Some(&questionnaire), Some(&response), &store, None)
        .await
        .unwrap();

    assert!(store.dispatched().is_empty());
}

#[tokio::test]
async fn second_run_after_convergence_is_a_no_op() {
    let questionnaire = create_test_questionnaire();
    let mut response = create_test_response();
    let store = RecordingStore::default();
    let orchestrator = UpdateOrchestrator::new(Arc::new(WorkerDispatcher::new()));

    orchestrator
        .run_calculators(Some(&questionnaire), Some(&response), &store, None)
        .await
        .unwrap();
    assert_eq!(store.dispatched().len(), 1);
    store.apply_to(&mut response);

    orchestrator
        .run_calculators(Some(&questionnaire), Some(&response), &store, None)
        .await
        .unwrap();
    // Still just the first action; convergence emits nothing new.
    assert_eq!(store.dispatched().len(), 1);
}

#[tokio::test]
async fn missing_inputs_are_a_no_op() {
    let questionnaire = create_test_questionnaire();
    let response = create_test_response();
    let store = RecordingStore::default();
    let orchestrator = UpdateOrchestrator::new(Arc::new(WorkerDispatcher::new()));

    orchestrator
        .run_calculators(None, Some(&response), &store, None)
        .await
        .unwrap();
    orchestrator
        .run_calculators(Some(&questionnaire), None, &store, None)
        .await
        .unwrap();

    assert!(store.dispatched().is_empty());
}

#[tokio::test]
async fn action_requester_receives_updates_and_one_dispatch() {
    let questionnaire = create_scoring_questionnaire();
    let response = create_scoring_response(10, 20);
    let store = RecordingStore::default();
    let mut requester = BatchingRequester::default();

    let orchestrator = UpdateOrchestrator::new(Arc::new(WorkerDispatcher::new()));
    orchestrator
        .run_calculators(
            Some(&questionnaire),
            Some(&response),
            &store,
            Some(&mut requester),
        )
        .await
        .unwrap();

    // sum=30 and average=15 both changed, delivered as one action.
    let actions = store.dispatched();
    assert_eq!(actions.len(), 1);
    let UpdateAction::AnswerValues { updates } = &actions[0];
    assert_eq!(updates.len(), 2);
    assert_eq!(updates[0].values, vec![AnswerValue::Integer(30)]);
    assert_eq!(updates[1].values, vec![AnswerValue::Decimal(15.0)]);
}

#[tokio::test]
async fn expression_failure_surfaces_as_an_error_result() {
    let questionnaire = Questionnaire::new().with_item(
        QuestionnaireItem::new("broken", ItemType::Integer)
            .with_calculated_expression("unknownFn()"),
    );
    let response =
        QuestionnaireResponse::new().with_item(QuestionnaireResponseItem::new("broken"));
    let store = RecordingStore::default();

    let orchestrator = UpdateOrchestrator::new(Arc::new(WorkerDispatcher::new()));
    let result = orchestrator
        .run_calculators(Some(&questionnaire), Some(&response), &store, None)
        .await;

    assert!(result.is_err());
    assert!(store.dispatched().is_empty());
}

#[tokio::test]
async fn reconcile_then_calculate_round_trip() {
    // A freshly loaded pairing: response is empty, reconciliation builds the
    // skeleton, the calculators fill it in.
    let questionnaire = create_scoring_questionnaire();
    let skeleton = sync_questionnaire_response(&questionnaire, &QuestionnaireResponse::new());
    assert_eq!(skeleton.item.len(), 4);

    let mut filled = skeleton.clone();
    filled.item[0].answer = vec![QuestionnaireResponseAnswer::new(AnswerValue::Integer(10))];
    filled.item[1].answer = vec![QuestionnaireResponseAnswer::new(AnswerValue::Integer(20))];

    let mut response = filled.clone();
    let store = RecordingStore::default();
    let orchestrator = UpdateOrchestrator::new(Arc::new(WorkerDispatcher::new()));
    orchestrator
        .run_calculators(Some(&questionnaire), Some(&response), &store, None)
        .await
        .unwrap();
    store.apply_to(&mut response);

    let sum = response.item.iter().find(|i| i.link_id == "sum").unwrap();
    assert_eq!(sum.answer_values(), vec![AnswerValue::Integer(30)]);
    let average = response.item.iter().find(|i| i.link_id == "average").unwrap();
    assert_eq!(average.answer_values(), vec![AnswerValue::Decimal(15.0)]);
}
