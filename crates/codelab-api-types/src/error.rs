use thiserror::Error;

/// Errors raised while mapping raw wire values into typed form.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiTypeError {
    #[error("unknown language key: {0}")]
    UnknownLanguageKey(String),
    #[error("unknown judge language id: {0}")]
    UnknownLanguageId(String),
    #[error("response envelope carried no data: {0}")]
    EmptyEnvelope(String),
}
