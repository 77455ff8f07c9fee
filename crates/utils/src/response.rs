use serde::Serialize;
use ts_rs::TS;

/// Response envelope shared with the TypeScript client. Soft domain
/// outcomes ("limit reached", "already a member") travel as
/// `success: false` with a code, while transport and server errors use
/// HTTP status codes.
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            code: None,
        }
    }

    pub fn rejected(error: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            code: Some(code.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_omits_error_fields() {
        let json = serde_json::to_value(ApiResponse::success(42)).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["data"], 42);
        assert!(json.get("error").is_none());
    }

    #[test]
    fn rejection_carries_error_and_code() {
        let json =
            serde_json::to_value(ApiResponse::<()>::rejected("limit reached", "limit_reached"))
                .unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "limit reached");
        assert_eq!(json["code"], "limit_reached");
    }
}
