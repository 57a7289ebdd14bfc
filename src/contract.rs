//! Response shapes of the collection endpoints
//!
//! These are the JSON bodies the request layer sends back. Field names are
//! camelCase on the wire.

use flowmuse_core::Error;
use serde::{Deserialize, Serialize};

/// Body of a single delete
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteResponse {
    /// Requested id
    pub id: String,
    /// Whether anything was removed
    pub deleted: bool,
}

/// Body of a batch delete
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteManyResponse {
    /// Ids that were present and removed
    pub deleted_count: usize,
    /// Requested ids, echoed back
    pub ids: Vec<String>,
}

/// Body of a seed request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedResponse {
    /// Always `true`: seeding is idempotent
    pub seeded: bool,
}

impl Default for SeedResponse {
    fn default() -> Self {
        SeedResponse { seeded: true }
    }
}

/// Envelope wrapping every endpoint response
///
/// ```
/// use flowmuse::ApiResponse;
///
/// let ok = ApiResponse::ok(3);
/// assert_eq!(serde_json::to_string(&ok).unwrap(), r#"{"success":true,"data":3}"#);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Whether the operation succeeded
    pub success: bool,
    /// Payload on success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Message on failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Canonical error code on failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl<T> ApiResponse<T> {
    /// Successful response carrying `data`
    pub fn ok(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            error: None,
            code: None,
        }
    }

    /// Failed response describing `err`
    pub fn from_error(err: &Error) -> Self {
        ApiResponse {
            success: false,
            data: None,
            error: Some(err.to_string()),
            code: Some(err.code().to_string()),
        }
    }
}

impl<T> From<crate::Result<T>> for ApiResponse<T> {
    fn from(result: crate::Result<T>) -> Self {
        match result {
            Ok(data) => ApiResponse::ok(data),
            Err(e) => ApiResponse::from_error(&e),
        }
    }
}
