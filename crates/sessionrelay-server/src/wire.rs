//! Request/response framing (§4.8): one JSON document per line. A request
//! without `id` is a notification from the client and gets no response; a
//! response echoes the request's `id`; a server-originated notification
//! has `method = "event/<type>"`, `params`, and no `id`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ErrorCode;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    Number(i64),
    String(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Request {
    pub method: String,
    #[serde(default)]
    pub id: Option<RequestId>,
    #[serde(default)]
    pub params: Option<Value>,
}

impl Request {
    /// §4.8: absent `id` marks the request as a notification, which gets
    /// no response regardless of whether the handler succeeds.
    pub fn wants_response(&self) -> bool {
        self.id.is_some()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ResponseError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ResponseError {
    pub fn from_error(err: &crate::error::Error) -> Self {
        let ErrorCode(code) = err.code();
        ResponseError { code, message: err.to_string(), data: None }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Response {
    pub id: RequestId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ResponseError>,
}

impl Response {
    pub fn ok(id: RequestId, result: Value) -> Self {
        Response { id, result: Some(result), error: None }
    }

    pub fn err(id: RequestId, error: &crate::error::Error) -> Self {
        Response { id, result: None, error: Some(ResponseError::from_error(error)) }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub method: String,
    pub params: Value,
}

/// One line written to a client: either a request's response or a
/// server-initiated notification. Both travel over the same outbound
/// channel (§4.8 "Delivery") and are subject to the same backpressure.
#[derive(Debug, Clone)]
pub enum OutboundMessage {
    Response(Response),
    Notification(Notification),
}

impl OutboundMessage {
    pub fn to_line(&self) -> serde_json::Result<String> {
        let value = match self {
            OutboundMessage::Response(resp) => serde_json::to_value(resp)?,
            OutboundMessage::Notification(note) => serde_json::to_value(note)?,
        };
        serde_json::to_string(&value)
    }
}
