// Copyright (c) 2020-present, UMD Database Group.
//
// This program is free software: you can use, redistribute, and/or modify
// it under the terms of the GNU Affero General Public License, version 3
// or later ("AGPL"), as published by the Free Software Foundation.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or
// FITNESS FOR A PARTICULAR PURPOSE.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <http://www.gnu.org/licenses/>.

//! API Gateway proxy integrations.
//!
//! The functions here turn an API Gateway proxy request into a call of the
//! counter service or the pizza workflow, and the answer into the response a
//! Lambda proxy integration returns.

use crate::configs::{PATTERNS_COUNTER_RESOURCE, PATTERNS_DEFAULT_FLAVOUR};
use crate::counter::{CounterService, CounterStore};
use crate::error::PatternError;
use crate::pizza::{PizzaWorkflow, WorkflowInput};
use aws_lambda_events::event::apigw::ApiGatewayProxyRequest;
use log::{error, info, warn};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;

/// Query parameter naming the counter.
pub const SYSTEM_KEY_PARAM: &str = "systemKey";
/// Query parameter naming the ordered flavour.
pub const FLAVOUR_PARAM: &str = "flavour";

/// A Lambda proxy integration response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayResponse {
    /// HTTP status code.
    pub status_code:       u16,
    /// Response headers.
    pub headers:           HashMap<String, String>,
    /// Response body.
    pub body:              String,
    /// Always false: bodies are text.
    pub is_base64_encoded: bool,
}

impl GatewayResponse {
    /// A `text/plain` response.
    pub fn text(status_code: u16, body: impl Into<String>) -> Self {
        Self::with_content_type(status_code, "text/plain", body.into())
    }

    /// An `application/json` response.
    pub fn json(status_code: u16, body: &Value) -> Self {
        Self::with_content_type(status_code, "application/json", body.to_string())
    }

    fn with_content_type(status_code: u16, content_type: &str, body: String) -> Self {
        let mut headers = HashMap::new();
        headers.insert("Content-Type".to_owned(), content_type.to_owned());
        Self {
            status_code,
            headers,
            body,
            is_base64_encoded: false,
        }
    }

    /// The response as the JSON document API Gateway expects.
    pub fn to_json(&self) -> Value {
        json!({
            "statusCode": self.status_code,
            "headers": self.headers,
            "body": self.body,
            "isBase64Encoded": self.is_base64_encoded,
        })
    }
}

/// The path the counter is served on, e.g. `/counter`.
pub fn counter_path() -> String {
    format!("/{}", *PATTERNS_COUNTER_RESOURCE)
}

/// `GET /counter?systemKey=<key>`: increments the counter and answers its
/// prior value as a bare decimal number.
///
/// | Outcome                 | Status |
/// |-------------------------|--------|
/// | incremented             | 200    |
/// | path other than counter | 404    |
/// | method other than GET   | 405    |
/// | missing `systemKey`     | 400    |
/// | counter not initialized | 404    |
/// | store unavailable       | 503    |
/// | anything else           | 500    |
pub async fn counter_response<S: CounterStore>(
    service: &CounterService<S>,
    request: &ApiGatewayProxyRequest,
) -> GatewayResponse {
    let path = request.path.as_deref().unwrap_or("/");
    if path.trim_end_matches('/') != counter_path() {
        warn!("No route for {}", path);
        return GatewayResponse::text(404, format!("no route for {}", path));
    }
    let method = request.http_method.as_str();
    if method != "GET" {
        warn!("{} not allowed on {}", method, path);
        let mut response = GatewayResponse::text(405, format!("{} not allowed", method));
        response.headers.insert("Allow".to_owned(), "GET".to_owned());
        return response;
    }

    let key = match request
        .query_string_parameters
        .first(SYSTEM_KEY_PARAM)
        .map(|k| k.trim())
        .filter(|k| !k.is_empty())
    {
        Some(key) => key,
        None => {
            return GatewayResponse::text(
                400,
                format!("missing query parameter {}", SYSTEM_KEY_PARAM),
            )
        }
    };

    match service.increment(key).await {
        Ok(prior) => {
            info!("Counter {} served {}", key, prior);
            GatewayResponse::text(200, prior.to_string())
        }
        Err(e) => {
            let status = match e {
                PatternError::NotFound(_) => 404,
                PatternError::StoreUnavailable(_) => 503,
                ref e if e.is_client_error() => 400,
                _ => 500,
            };
            if e.is_client_error() {
                warn!("Counter {} rejected: {}", key, e);
            } else {
                error!("Counter {} failed: {}", key, e);
            }
            GatewayResponse::text(status, e.to_string())
        }
    }
}

/// The pizzeria front door: orders the `flavour` query parameter, or the
/// default flavour if there is none, and answers the workflow outcome as JSON.
/// An unusable flavour is a 400; any other failure a 500.
pub fn order_response(workflow: &PizzaWorkflow, request: &ApiGatewayProxyRequest) -> GatewayResponse {
    let flavour = request
        .query_string_parameters
        .first(FLAVOUR_PARAM)
        .map(|f| f.to_string())
        .unwrap_or_else(|| PATTERNS_DEFAULT_FLAVOUR.to_string());

    match workflow.evaluate(&WorkflowInput::new(flavour)) {
        Ok(result) => {
            info!(
                "Order {}",
                if result.is_accepted() { "accepted" } else { "rejected" }
            );
            GatewayResponse::json(200, &result.to_json())
        }
        Err(e) if e.is_client_error() => {
            warn!("Order rejected as invalid: {}", e);
            GatewayResponse::json(400, &json!({ "message": e.to_string() }))
        }
        Err(e) => {
            error!("Order failed: {}", e);
            GatewayResponse::json(500, &json!({ "message": "There was an error" }))
        }
    }
}
