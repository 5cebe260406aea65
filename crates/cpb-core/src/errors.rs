/// Core error type for the channel post bot.
///
/// Adapter crates map their specific errors into this type so the dialogue
/// can decide per kind whether to re-prompt, guide, or reset the operator.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Operator input that can be corrected by answering the same prompt again.
    #[error("invalid input: {0}")]
    Validation(String),

    /// Something the step depends on (linked channel, saved draft) is absent.
    #[error("missing prerequisite: {0}")]
    MissingPrerequisite(String),

    #[error("storage failure: {0}")]
    Storage(String),

    /// The transport rejected the final post; carries the transport's reason.
    #[error("{0}")]
    Publish(String),

    #[error("external error: {0}")]
    External(String),
}

impl From<sqlx::Error> for Error {
    fn from(e: sqlx::Error) -> Self {
        Error::Storage(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
