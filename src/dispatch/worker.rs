use serde::{Deserialize, Serialize};
use std::io;
use std::sync::mpsc as std_mpsc;
use std::thread;
use tokio::sync::mpsc;

use crate::error::Result;
use crate::fhirpath::FhirPathExtensions;
use crate::types::{AnswerPad, Questionnaire, QuestionnaireResponse};

/// One evaluation request crossing the worker boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerRequest {
    pub questionnaire: Questionnaire,
    pub questionnaire_response: QuestionnaireResponse,
}

/// Worker reply, decoded explicitly rather than duck-typed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "lowercase")]
pub enum WorkerReply {
    #[serde(rename_all = "camelCase")]
    Success { fhir_scores: AnswerPad },
    Error {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        stack: Option<String>,
    },
}

/// Channels to a live worker. Dropping the handle closes the request channel,
/// which terminates the worker thread.
pub struct WorkerHandle {
    pub request_tx: std_mpsc::Sender<String>,
    pub reply_rx: mpsc::UnboundedReceiver<String>,
}

/// Constructs the background execution unit. Swappable so tests can count
/// constructions or simulate construction failure.
pub trait WorkerFactory: Send + Sync {
    fn spawn(&self) -> io::Result<WorkerHandle>;
}

/// Default factory: one dedicated OS thread running the evaluation loop.
pub struct ThreadWorkerFactory;

impl WorkerFactory for ThreadWorkerFactory {
    fn spawn(&self) -> io::Result<WorkerHandle> {
        let (request_tx, request_rx) = std_mpsc::channel::<String>();
        let (reply_tx, reply_rx) = mpsc::unbounded_channel::<String>();

        thread::Builder::new()
            .name("refero-calculators".to_string())
            .spawn(move || {
                let extensions = FhirPathExtensions::new();
                while let Ok(message) = request_rx.recv() {
                    let reply = handle_request(&extensions, &message);
                    let encoded = serde_json::to_string(&reply).unwrap_or_else(|e| {
                        format!(
                            r#"{{"type":"error","payload":{{"message":{}}}}}"#,
                            serde_json::Value::String(e.to_string())
                        )
                    });
                    if reply_tx.send(encoded).is_err() {
                        break;
                    }
                }
            })?;

        Ok(WorkerHandle {
            request_tx,
            reply_rx,
        })
    }
}

fn handle_request(extensions: &FhirPathExtensions, message: &str) -> WorkerReply {
    let outcome = serde_json::from_str::<WorkerRequest>(message)
        .map_err(crate::error::ReferoError::from)
        .and_then(|request| {
            run_calculators_sync(
                extensions,
                &request.questionnaire,
                &request.questionnaire_response,
            )
        });

    match outcome {
        Ok(fhir_scores) => WorkerReply::Success { fhir_scores },
        Err(e) => WorkerReply::Error {
            message: e.to_string(),
            stack: None,
        },
    }
}

/// In-process evaluation: the main-thread fallback path and the body the
/// worker itself runs.
pub fn run_calculators_sync(
    extensions: &FhirPathExtensions,
    questionnaire: &Questionnaire,
    response: &QuestionnaireResponse,
) -> Result<AnswerPad> {
    let updated = extensions.evaluate_all_expressions(questionnaire, response)?;
    extensions.calculate_fhir_scores(questionnaire, &updated)
}
