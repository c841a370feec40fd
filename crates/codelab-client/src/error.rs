use thiserror::Error;

/// Failure classification for calls against the lab API.
///
/// Cancellation is deliberately its own variant: an aborted request is not a
/// failure and must never surface as a toast.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The service answered with an error envelope. `status` is the
    /// machine-readable code from the response body when present, falling
    /// back to the HTTP status.
    #[error("{message}")]
    Status { status: Option<u16>, message: String },
    /// The request never produced a response.
    #[error("request failed: {0}")]
    Transport(String),
    /// The response arrived but could not be decoded.
    #[error("response decoding failed: {0}")]
    Decode(String),
    /// The caller aborted the request.
    #[error("request cancelled")]
    Cancelled,
}

impl ApiError {
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => *status,
            _ => None,
        }
    }

    /// 401 and 403 both route the user back to the login view.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self.status_code(), Some(401) | Some(403))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ApiError::Cancelled)
    }

    /// The user-facing toast for this failure, or `None` when no toast should
    /// be shown. A server-provided message wins over the lookup table.
    pub fn toast(&self) -> Option<String> {
        match self {
            ApiError::Cancelled => None,
            ApiError::Status { message, .. } if !message.trim().is_empty() => {
                Some(message.clone())
            }
            ApiError::Status { status, .. } => Some(toast_message(*status).to_string()),
            ApiError::Transport(_) | ApiError::Decode(_) => Some(toast_message(None).to_string()),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> ApiError {
        if err.is_decode() {
            return ApiError::Decode(err.to_string());
        }
        ApiError::Transport(err.to_string())
    }
}

/// Pure status-code to default-message table, kept separate from the UI so it
/// can be tested on its own.
pub fn toast_message(status: Option<u16>) -> &'static str {
    match status {
        Some(400) => "That input looks malformed. Check the fields and try again.",
        Some(401) => "You need to sign in to do that.",
        Some(403) => "You are not allowed to do that.",
        Some(404) => "Couldn't find what you were looking for.",
        Some(409) => "That value is already taken.",
        Some(413) => "That file is too large to upload.",
        Some(500) => "The server hit an internal error. Please try again.",
        _ => "Something went wrong. Please try again.",
    }
}
