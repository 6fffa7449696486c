use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    InvalidConfig(String),
    InvalidData(String),
    /// No rule fires for this input pair (all firing strengths are numerically zero).
    DegenerateInput {
        error: f64,
        delta_error: f64,
    },
    NumericInstability(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Prefix the message with `context` (e.g. `"epoch 3"`).
    ///
    /// `DegenerateInput` carries structured data and is returned unchanged.
    pub fn context(self, context: &str) -> Self {
        match self {
            Error::InvalidConfig(msg) => Error::InvalidConfig(format!("{context}: {msg}")),
            Error::InvalidData(msg) => Error::InvalidData(format!("{context}: {msg}")),
            Error::NumericInstability(msg) => {
                Error::NumericInstability(format!("{context}: {msg}"))
            }
            e @ Error::DegenerateInput { .. } => e,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
            Error::InvalidData(msg) => write!(f, "invalid data: {msg}"),
            Error::DegenerateInput { error, delta_error } => write!(
                f,
                "degenerate input: no rule fires for error={error}, delta_error={delta_error}"
            ),
            Error::NumericInstability(msg) => write!(f, "numeric instability: {msg}"),
        }
    }
}

impl std::error::Error for Error {}
