//! # Refero Core
//!
//! Response synchronization and asynchronous calculator engine for FHIR
//! Questionnaires: reconciles a QuestionnaireResponse tree against its
//! Questionnaire definition, evaluates FHIRPath calculated and score
//! expressions off the main task, and converges computed values into the
//! response through minimal batched updates.
//!
//! ## Features
//!
//! - **Reconciliation**: pure, idempotent structural alignment of a response
//!   to its definition, preserving existing answers
//! - **Expression evaluation**: FHIRPath-subset engine with a process-wide
//!   compiled-expression cache
//! - **Worker dispatch**: strict-FIFO single-flight queue against one
//!   background worker, with permanent in-process fallback on failure
//! - **Update orchestration**: deep-equality diffing and batched actions so
//!   unchanged values never touch the store
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use refero_core::*;
//!
//! # async fn example() -> Result<()> {
//! let questionnaire: Questionnaire = serde_json::from_str("{}")?;
//! let response: QuestionnaireResponse = serde_json::from_str("{}")?;
//!
//! // Make the response structurally match its definition
//! let response = sync_questionnaire_response(&questionnaire, &response);
//!
//! // Evaluate calculated expressions through the dispatcher
//! let dispatcher = WorkerDispatcher::new();
//! let scores = dispatcher.submit(questionnaire, response).await?;
//! # Ok(())
//! # }
//! ```

pub mod dispatch;
pub mod error;
pub mod fhirpath;
pub mod orchestrator;
pub mod reconcile;
pub mod types;

pub use dispatch::{
    run_calculators_sync, DispatcherConfig, ThreadWorkerFactory, WorkerDispatcher, WorkerFactory,
    WorkerHandle, WorkerReply, WorkerRequest,
};
pub use error::Result; // Our Result type takes precedence
pub use error::ReferoError;
pub use fhirpath::FhirPathExtensions;
pub use orchestrator::{
    ActionRequester, AnswerUpdate, Debouncer, Dispatch, UpdateAction, UpdateOrchestrator,
};
pub use reconcile::sync_questionnaire_response;
pub use types::*;
