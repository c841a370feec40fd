use codelab_client::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Info,
    Success,
    Error,
}

/// A transient notification shown over whatever view is active.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub kind: ToastKind,
    pub text: String,
}

impl Toast {
    pub fn info(text: &str) -> Toast {
        return Toast {
            kind: ToastKind::Info,
            text: text.to_string(),
        };
    }

    pub fn success(text: &str) -> Toast {
        return Toast {
            kind: ToastKind::Success,
            text: text.to_string(),
        };
    }

    pub fn error(text: &str) -> Toast {
        return Toast {
            kind: ToastKind::Error,
            text: text.to_string(),
        };
    }

    /// Cancellation is user-initiated and produces no toast at all.
    pub fn from_api_error(err: &ApiError) -> Option<Toast> {
        return err.toast().map(|text| Toast {
            kind: ToastKind::Error,
            text,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancellation_produces_no_toast() {
        assert_eq!(Toast::from_api_error(&ApiError::Cancelled), None);
    }

    #[test]
    fn test_server_message_becomes_an_error_toast() {
        let err = ApiError::Status {
            status: Some(409),
            message: "Email already registered".to_string(),
        };

        let toast = Toast::from_api_error(&err).unwrap();
        assert_eq!(toast.kind, ToastKind::Error);
        assert_eq!(toast.text, "Email already registered");
    }
}
