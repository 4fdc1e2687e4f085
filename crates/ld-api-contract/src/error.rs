//! JSON error body returned by every non-2xx response

use serde::{Deserialize, Serialize};

/// Wire representation of a request failure.
///
/// `error` is a stable machine-readable kind; `message` is human-readable
/// detail safe to show in the frontend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_body_wire_format() {
        let body = ErrorBody::new("not_found", "Project not found");
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "error": "not_found", "message": "Project not found" })
        );
    }
}
