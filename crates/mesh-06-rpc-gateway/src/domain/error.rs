//! RPC error types with JSON-RPC 2.0 error codes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// JSON-RPC 2.0 error codes.
pub mod codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;

    // Server errors (-32000 to -32099)
    pub const SERVER_ERROR: i32 = -32000;
    pub const METHOD_NOT_SUPPORTED: i32 = -32004;
    pub const LIMIT_EXCEEDED: i32 = -32005;
}

/// Error returned to a single RPC caller.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiError {
    pub code: i32,
    pub message: String,
    pub data: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn parse_error(details: impl Into<String>) -> Self {
        Self::new(codes::PARSE_ERROR, format!("Parse error: {}", details.into()))
    }

    pub fn invalid_request(details: impl Into<String>) -> Self {
        Self::new(codes::INVALID_REQUEST, format!("Invalid request: {}", details.into()))
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::new(codes::METHOD_NOT_FOUND, format!("Method not found: {method}"))
    }

    pub fn invalid_params(details: impl Into<String>) -> Self {
        Self::new(codes::INVALID_PARAMS, format!("Invalid params: {}", details.into()))
    }

    pub fn internal(details: impl Into<String>) -> Self {
        Self::new(codes::INTERNAL_ERROR, format!("Internal error: {}", details.into()))
    }

    /// Failure of an operation the caller asked for, such as a peer dial.
    pub fn server_error(details: impl Into<String>) -> Self {
        Self::new(codes::SERVER_ERROR, details.into())
    }

    pub fn method_not_supported(method: &str, reason: &str) -> Self {
        Self::new(
            codes::METHOD_NOT_SUPPORTED,
            format!("Method not supported: {method} ({reason})"),
        )
    }

    pub fn limit_exceeded(limit: impl Into<String>) -> Self {
        Self::new(codes::LIMIT_EXCEEDED, format!("Limit exceeded: {}", limit.into()))
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl Serialize for ApiError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("ApiError", 3)?;
        state.serialize_field("code", &self.code)?;
        state.serialize_field("message", &self.message)?;
        if let Some(ref data) = self.data {
            state.serialize_field("data", data)?;
        }
        state.end()
    }
}

impl<'de> Deserialize<'de> for ApiError {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct ErrorHelper {
            code: i32,
            message: String,
            data: Option<serde_json::Value>,
        }

        let helper = ErrorHelper::deserialize(deserializer)?;
        Ok(ApiError {
            code: helper.code,
            message: helper.message,
            data: helper.data,
        })
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        if e.is_syntax() || e.is_eof() {
            ApiError::parse_error(e.to_string())
        } else {
            ApiError::invalid_params(e.to_string())
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Gateway-level errors (not JSON-RPC, internal use)
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("server bind error: {0}")]
    Bind(String),

    #[error("server error: {0}")]
    Serve(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = ApiError::method_not_found("mesh_foo");
        assert_eq!(err.code, codes::METHOD_NOT_FOUND);
        assert!(err.message.contains("mesh_foo"));
    }

    #[test]
    fn test_error_serialization_omits_empty_data() {
        let err = ApiError::invalid_params("perPage must be positive");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], -32602);
        assert!(json.get("data").is_none());
        assert_eq!(serde_json::from_value::<ApiError>(json).unwrap(), err);
    }

    #[test]
    fn test_from_serde_error() {
        let syntax: Result<serde_json::Value, _> = serde_json::from_str("{oops");
        assert_eq!(ApiError::from(syntax.unwrap_err()).code, codes::PARSE_ERROR);

        let shape: Result<Vec<u8>, _> = serde_json::from_str("\"text\"");
        assert_eq!(ApiError::from(shape.unwrap_err()).code, codes::INVALID_PARAMS);
    }
}
