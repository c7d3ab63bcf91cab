use thiserror::Error;

/// Failures the interactive loop reports to the user and then keeps going.
#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum ReplError {
    #[error("Invalid code block index. Please enter a number between 1 and {count}.")]
    InvalidIndex { index: usize, count: usize },

    #[error("terminal size unavailable")]
    TerminalSizeUnavailable,

    #[error("clipboard unavailable: {0}")]
    Clipboard(String),

    #[error("invalid model: {0}")]
    UnknownModel(String),

    #[error("{provider} request failed: {message}")]
    Api {
        provider: &'static str,
        message: String,
    },
}
