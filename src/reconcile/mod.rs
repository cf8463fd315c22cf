//! Structural alignment of a QuestionnaireResponse to its Questionnaire.

mod engine;

pub use engine::sync_questionnaire_response;
