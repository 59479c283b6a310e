//! Request and response messages of the `SyncService` RPC surface.
//!
//! Field names follow the service IDL. Missing string fields default to the
//! empty string, as they would for an unset proto3 field.

use serde::{Deserialize, Serialize};

/// A resource change event.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SyncResourceRequest {
    pub event_type: String,
    pub resource_type: String,
    pub namespace: String,
    pub name: String,
    pub cluster: String,
    pub uid: String,
    /// JSON-encoded resource payload
    pub data_json: String,
}

/// A namespace change event.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SyncNamespaceRequest {
    pub event_type: String,
    pub name: String,
    pub cluster: String,
    pub uid: String,
    pub data_json: String,
}

/// Outcome of a sync call. Returned for every request, successful or not.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SyncResponse {
    pub success: bool,
    pub message: String,
}

impl SyncResponse {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_default_to_empty() {
        let request: SyncNamespaceRequest =
            serde_json::from_str(r#"{"event_type": "ADDED", "name": "default"}"#).unwrap();
        assert_eq!(request.event_type, "ADDED");
        assert_eq!(request.name, "default");
        assert_eq!(request.uid, "");
        assert_eq!(request.data_json, "");
    }

    #[test]
    fn test_response_constructors() {
        assert_eq!(
            SyncResponse::success("ok"),
            SyncResponse {
                success: true,
                message: "ok".to_string()
            }
        );
        assert!(!SyncResponse::failure("No UID provided").success);
    }
}
