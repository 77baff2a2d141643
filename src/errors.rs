use thiserror::Error;

/// Failure categories of a single generation attempt.
///
/// `Display` carries the detail for logs; `user_message` is what the
/// terminal shows.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    #[error("transport error: {0}")] Transport(String),
    #[error("empty response from model")] Empty,
    #[error("malformed response: {0}")] Malformed(String),
}

impl GenerationError {
    pub fn user_message(&self) -> &'static str {
        match self {
            GenerationError::Transport(_) => {
                "Failed to generate ideas. The AI model might be busy or an error occurred. Please try again in a moment."
            }
            GenerationError::Empty => "The AI model returned an empty response. Please try again.",
            GenerationError::Malformed(_) => {
                "Failed to parse the AI's response. The data might be malformed. Please try again."
            }
        }
    }
}

impl From<reqwest::Error> for GenerationError {
    fn from(e: reqwest::Error) -> Self {
        GenerationError::Transport(e.to_string())
    }
}
