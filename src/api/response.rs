use serde::{Deserialize, Serialize};

use crate::{error::FieldErrors, storage::ContactPage};

/// Uniform wire envelope. Success and failure share the same shape; only
/// the flag and the payload side differ.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<PageMeta>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<FieldErrors>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(message: &str, data: T) -> Self {
        Self {
            success: true,
            message: message.to_string(),
            data: Some(data),
            meta: None,
            errors: None,
            error: None,
        }
    }

    pub fn ok_with_meta(message: &str, data: T, meta: PageMeta) -> Self {
        Self {
            meta: Some(meta),
            ..Self::ok(message, data)
        }
    }
}

impl ApiResponse<()> {
    /// Success without a payload (logout, delete).
    pub fn message_only(message: &str) -> Self {
        Self {
            success: true,
            message: message.to_string(),
            data: None,
            meta: None,
            errors: None,
            error: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    pub current_page: u32,
    pub last_page: u32,
    pub per_page: u32,
    pub total: u64,
}

impl Default for PageMeta {
    fn default() -> Self {
        Self {
            current_page: 1,
            last_page: 1,
            per_page: 15,
            total: 0,
        }
    }
}

impl From<&ContactPage> for PageMeta {
    fn from(page: &ContactPage) -> Self {
        Self {
            current_page: page.current_page,
            last_page: page.last_page,
            per_page: page.per_page,
            total: page.total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AuthPayload;

    // AuthPayload has no Default impl; the envelope must still
    // deserialize for it when the optional fields are absent.
    #[test]
    fn envelope_deserializes_for_payloads_without_default() {
        let json = r#"{
            "success": true,
            "message": "Login successful",
            "data": {
                "user": {
                    "id": "8b91d7a2-64c4-4d17-a04e-9e3a7d1f8b53",
                    "name": "Test User",
                    "email": "test@example.com"
                },
                "token": "abc123"
            }
        }"#;

        let envelope: ApiResponse<AuthPayload> = serde_json::from_str(json).unwrap();
        assert!(envelope.success);
        assert_eq!(envelope.data.unwrap().token, "abc123");
        assert!(envelope.meta.is_none());
        assert!(envelope.errors.is_none());
        assert!(envelope.error.is_none());
    }

    #[test]
    fn failure_envelope_round_trips_field_errors() {
        let json = r#"{
            "success": false,
            "message": "Validation failed",
            "errors": { "email": ["Email is required."] }
        }"#;

        let envelope: ApiResponse<AuthPayload> = serde_json::from_str(json).unwrap();
        assert!(!envelope.success);
        assert!(envelope.data.is_none());
        assert!(envelope.errors.unwrap().contains("email"));
    }
}
