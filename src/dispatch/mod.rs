//! Single-flight FIFO dispatch of evaluation work to the background worker.
//!
//! The dispatcher is the only owner of the worker handle, its lifecycle
//! state, and the task queue. Exactly one task is in flight at any time;
//! everything else waits in submission order. Once the worker is disabled it
//! stays disabled for the life of the process and every task runs the
//! in-process fallback instead.

mod worker;

pub use worker::{
    run_calculators_sync, ThreadWorkerFactory, WorkerFactory, WorkerHandle, WorkerReply,
    WorkerRequest,
};

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::warn;

use crate::error::{ReferoError, Result};
use crate::fhirpath::FhirPathExtensions;
use crate::types::{AnswerPad, Questionnaire, QuestionnaireResponse};

#[derive(Debug, Clone, Default)]
pub struct DispatcherConfig {
    /// Optional deadline for a single worker reply. `None` preserves the
    /// historical behavior of waiting indefinitely.
    pub task_deadline: Option<Duration>,
}

enum WorkerState {
    Uninitialized,
    Active(WorkerHandle),
    Disabled,
}

struct QueuedTask {
    questionnaire: Questionnaire,
    response: QuestionnaireResponse,
    reply: oneshot::Sender<Result<AnswerPad>>,
}

/// Owns the evaluation queue and the worker lifecycle. Cheap to clone the
/// public surface via `Arc`; must be constructed inside a tokio runtime.
pub struct WorkerDispatcher {
    queue_tx: mpsc::UnboundedSender<QueuedTask>,
}

impl WorkerDispatcher {
    pub fn new() -> Self {
        Self::with_factory(Arc::new(ThreadWorkerFactory), DispatcherConfig::default())
    }

    pub fn with_factory(factory: Arc<dyn WorkerFactory>, config: DispatcherConfig) -> Self {
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        tokio::spawn(run_actor(queue_rx, factory, config));
        Self { queue_tx }
    }

    /// Queue one evaluation. Resolves when the task's turn completes, whether
    /// the worker or the in-process fallback handled it.
    pub async fn submit(
        &self,
        questionnaire: Questionnaire,
        response: QuestionnaireResponse,
    ) -> Result<AnswerPad> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.queue_tx
            .send(QueuedTask {
                questionnaire,
                response,
                reply: reply_tx,
            })
            .map_err(|_| ReferoError::Dispatcher {
                message: "dispatcher actor stopped".to_string(),
            })?;

        reply_rx.await.map_err(|_| ReferoError::Dispatcher {
            message: "task dropped before completion".to_string(),
        })?
    }
}

impl Default for WorkerDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

async fn run_actor(
    mut queue_rx: mpsc::UnboundedReceiver<QueuedTask>,
    factory: Arc<dyn WorkerFactory>,
    config: DispatcherConfig,
) {
    let extensions = FhirPathExtensions::new();
    let mut state = WorkerState::Uninitialized;

    // Strict FIFO: one task at a time, in submission order.
    while let Some(task) = queue_rx.recv().await {
        let result = dispatch_one(
            &mut state,
            &factory,
            &config,
            &extensions,
            &task.questionnaire,
            &task.response,
        )
        .await;
        let _ = task.reply.send(result);
    }
}

async fn dispatch_one(
    state: &mut WorkerState,
    factory: &Arc<dyn WorkerFactory>,
    config: &DispatcherConfig,
    extensions: &FhirPathExtensions,
    questionnaire: &Questionnaire,
    response: &QuestionnaireResponse,
) -> Result<AnswerPad> {
    if matches!(state, WorkerState::Uninitialized) {
        match factory.spawn() {
            Ok(handle) => *state = WorkerState::Active(handle),
            Err(e) => {
                warn!(error = %e, "worker construction failed, falling back to in-process evaluation");
                *state = WorkerState::Disabled;
            }
        }
    }

    // Taking the handle out makes every error path leave the state Disabled
    // and drop the handle, which terminates the worker thread.
    match std::mem::replace(state, WorkerState::Disabled) {
        WorkerState::Active(mut handle) => {
            let request = WorkerRequest {
                questionnaire: questionnaire.clone(),
                questionnaire_response: response.clone(),
            };
            let encoded = serde_json::to_string(&request)?;

            if handle.request_tx.send(encoded).is_err() {
                warn!("worker request channel closed, disabling worker");
                return run_calculators_sync(extensions, questionnaire, response);
            }

            let reply = match config.task_deadline {
                Some(deadline) => {
                    match tokio::time::timeout(deadline, handle.reply_rx.recv()).await {
                        Ok(reply) => reply,
                        Err(_) => {
                            warn!("worker reply deadline exceeded, disabling worker");
                            return Err(ReferoError::worker("worker reply deadline exceeded"));
                        }
                    }
                }
                None => handle.reply_rx.recv().await,
            };

            match reply {
                Some(encoded) => match serde_json::from_str::<WorkerReply>(&encoded) {
                    Ok(WorkerReply::Success { fhir_scores }) => {
                        *state = WorkerState::Active(handle);
                        Ok(fhir_scores)
                    }
                    Ok(WorkerReply::Error { message, stack }) => {
                        warn!(%message, "worker reported an error, disabling worker");
                        Err(ReferoError::Worker { message, stack })
                    }
                    Err(e) => {
                        // A malformed reply is a runtime error, not a task
                        // failure: fall back for the in-flight task.
                        warn!(error = %e, "undecodable worker reply, disabling worker");
                        run_calculators_sync(extensions, questionnaire, response)
                    }
                },
                None => {
                    warn!("worker died without a structured reply, disabling worker");
                    run_calculators_sync(extensions, questionnaire, response)
                }
            }
        }
        WorkerState::Disabled => run_calculators_sync(extensions, questionnaire, response),
        WorkerState::Uninitialized => unreachable!("worker state initialized above"),
    }
}
