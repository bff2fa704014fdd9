//! JSON-RPC 2.0 envelope types shared by the client and test servers.

use serde::{Deserialize, Serialize};

/// Protocol version string carried in every envelope.
pub const JSONRPC_VERSION: &str = "2.0";

/// Standard JSON-RPC error codes used by the planning service.
pub mod codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
}

/// A JSON-RPC 2.0 request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
    pub id: u64,
}

impl JsonRpcRequest {
    pub fn new(method: impl Into<String>, params: serde_json::Value, id: u64) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            params,
            id,
        }
    }
}

/// Error object of a failed JSON-RPC call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// A JSON-RPC 2.0 response. Exactly one of `result` and `error` is set
/// by a well-behaved server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    /// `None` only when the server could not parse the request id.
    pub id: Option<u64>,
}

impl JsonRpcResponse {
    pub fn success(id: u64, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: Some(result),
            error: None,
            id: Some(id),
        }
    }

    pub fn failure(id: Option<u64>, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
                data: None,
            }),
            id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_serializes_envelope() {
        let request = JsonRpcRequest::new("MotionPlanner.HandleStartRequest", json!({"id": "x"}), 7);
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "jsonrpc": "2.0",
                "method": "MotionPlanner.HandleStartRequest",
                "params": {"id": "x"},
                "id": 7
            })
        );
    }

    #[test]
    fn test_error_response_omits_result() {
        let response = JsonRpcResponse::failure(Some(3), codes::METHOD_NOT_FOUND, "no such method");
        let value = serde_json::to_value(&response).unwrap();
        assert!(value.get("result").is_none());
        assert_eq!(value["error"]["code"], json!(-32601));
    }

    #[test]
    fn test_response_parses_without_data_field() {
        let raw = r#"{"jsonrpc":"2.0","error":{"code":-32000,"message":"planner busy"},"id":1}"#;
        let response: JsonRpcResponse = serde_json::from_str(raw).unwrap();
        let err = response.error.unwrap();
        assert_eq!(err.code, -32000);
        assert_eq!(err.data, None);
        assert_eq!(response.result, None);
    }
}
