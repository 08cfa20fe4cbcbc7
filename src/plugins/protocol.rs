// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! JSON-RPC protocol for external plugins
//!
//! Each invocation spawns the plugin program, writes one request line to its
//! stdin and closes it. The last non-empty stdout line is the reply.
//!
//! # Request Format
//!
//! ```json
//! {
//!   "jsonrpc": "2.0",
//!   "method": "execute",
//!   "params": { "command": "get_forecast", "args": { "city": "Paris" } },
//!   "id": 1
//! }
//! ```
//!
//! `init` and `cleanup` requests carry `{}` as params.
//!
//! # Response Format
//!
//! ```json
//! { "jsonrpc": "2.0", "result": { "success": true, "message": "Sunny" }, "id": 1 }
//! ```
//!
//! # Error Response Format
//!
//! ```json
//! { "jsonrpc": "2.0", "error": { "code": -32000, "message": "Error description" }, "id": 1 }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::PluginReply;

/// JSON-RPC request sent to an external plugin.
#[derive(Debug, Clone, Serialize)]
pub struct Request {
    pub jsonrpc: &'static str,
    pub method: &'static str,
    pub params: Value,
    pub id: u64,
}

impl Request {
    /// Run a plugin command
    pub fn execute(command: &str, args: Value, id: u64) -> Self {
        Self {
            jsonrpc: "2.0",
            method: "execute",
            params: serde_json::json!({ "command": command, "args": args }),
            id,
        }
    }

    pub fn init(id: u64) -> Self {
        Self::lifecycle("init", id)
    }

    pub fn cleanup(id: u64) -> Self {
        Self::lifecycle("cleanup", id)
    }

    fn lifecycle(method: &'static str, id: u64) -> Self {
        Self {
            jsonrpc: "2.0",
            method,
            params: serde_json::json!({}),
            id,
        }
    }

    /// Serialize to a single JSON line (without the newline).
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// JSON-RPC response from an external plugin.
#[derive(Debug, Clone, Deserialize)]
pub struct Response {
    #[serde(default)]
    pub jsonrpc: Option<String>,
    pub result: Option<ResultPayload>,
    pub error: Option<ErrorPayload>,
    #[serde(default)]
    pub id: Option<u64>,
}

impl Response {
    pub fn parse(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some() || self.result.as_ref().is_some_and(|r| !r.success)
    }

    /// True when the plugin does not implement the requested method
    pub fn is_method_not_found(&self) -> bool {
        self.error
            .as_ref()
            .is_some_and(|e| e.code == error_codes::METHOD_NOT_FOUND)
    }

    /// Collapse into the reply the registry hands back
    pub fn into_reply(self) -> PluginReply {
        if let Some(error) = self.error {
            PluginReply::failed(error.message)
        } else if let Some(result) = self.result {
            PluginReply {
                success: result.success,
                message: result.message,
            }
        } else {
            PluginReply::failed("No output")
        }
    }
}

/// Successful result payload.
#[derive(Debug, Clone, Deserialize)]
pub struct ResultPayload {
    #[serde(default = "default_success")]
    pub success: bool,
    #[serde(default)]
    pub message: String,
}

fn default_success() -> bool {
    true
}

/// Error payload in response.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorPayload {
    pub code: i32,
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}

/// JSON-RPC error codes the host reacts to.
pub mod error_codes {
    /// Sent by plugins that have no `init` or `cleanup` handler
    pub const METHOD_NOT_FOUND: i32 = -32601;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_execute() {
        let request = Request::execute("get_forecast", serde_json::json!({"city": "Paris"}), 7);
        assert_eq!(request.method, "execute");
        assert_eq!(request.params["command"], "get_forecast");
        assert_eq!(request.params["args"]["city"], "Paris");

        let json = request.to_json();
        assert!(json.contains("\"jsonrpc\":\"2.0\""));
        assert!(json.contains("\"id\":7"));
        assert!(!json.contains('\n'));
    }

    #[test]
    fn test_lifecycle_requests() {
        assert_eq!(Request::init(1).method, "init");
        assert_eq!(Request::cleanup(2).method, "cleanup");
        assert_eq!(Request::cleanup(2).params, serde_json::json!({}));
    }

    #[test]
    fn test_response_success() {
        let response =
            Response::parse(r#"{"result":{"success":true,"message":"Forecast: sunny"}}"#).unwrap();
        assert!(!response.is_error());
        assert_eq!(response.into_reply(), PluginReply::ok("Forecast: sunny"));
    }

    #[test]
    fn test_response_result_failure() {
        let response =
            Response::parse(r#"{"jsonrpc":"2.0","result":{"success":false,"message":"no"},"id":1}"#)
                .unwrap();
        assert!(response.is_error());
        assert_eq!(response.into_reply(), PluginReply::failed("no"));
    }

    #[test]
    fn test_response_error() {
        let response =
            Response::parse(r#"{"error":{"code":-32602,"message":"unknown city"}}"#).unwrap();
        assert!(response.is_error());
        assert!(!response.is_method_not_found());
        assert_eq!(response.into_reply(), PluginReply::failed("unknown city"));
    }

    #[test]
    fn test_response_method_not_found() {
        let response =
            Response::parse(r#"{"error":{"code":-32601,"message":"no init"},"id":4}"#).unwrap();
        assert!(response.is_method_not_found());
    }

    #[test]
    fn test_response_empty() {
        let response = Response::parse(r#"{"jsonrpc":"2.0","id":3}"#).unwrap();
        assert_eq!(response.into_reply(), PluginReply::failed("No output"));
    }
}
