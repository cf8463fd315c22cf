use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReferoError {
    #[error("Expression parse error: {message}")]
    Parse { message: String },

    #[error("Expression evaluation error: {message}")]
    Evaluation { message: String },

    #[error("Worker error: {message}")]
    Worker {
        message: String,
        stack: Option<String>,
    },

    #[error("Dispatcher unavailable: {message}")]
    Dispatcher { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ReferoError {
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    pub fn evaluation(message: impl Into<String>) -> Self {
        Self::Evaluation {
            message: message.into(),
        }
    }

    pub fn worker(message: impl Into<String>) -> Self {
        Self::Worker {
            message: message.into(),
            stack: None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ReferoError>;
