use serde::Deserialize;
use serde::Serialize;

use crate::error::ApiTypeError;

/// Body envelope every lab endpoint wraps its payload in.
///
/// Error responses reuse the same shape with `success: false`, an explicit
/// `"data": null`, and a machine-readable `status_code` the client
/// classifies toasts from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub status_code: u16,
    pub data: Option<T>,
    pub message: String,
    pub success: bool,
}

impl<T> ApiResponse<T> {
    pub fn into_data(self) -> Result<T, ApiTypeError> {
        self.data.ok_or(ApiTypeError::EmptyEnvelope(self.message))
    }
}
