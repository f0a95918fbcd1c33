//! JSON-RPC-like request/response framing and error codes.
//!
//! Grounded in `original_source/server/json_rpc.py`: the wire schema
//! (`{"method", "params"}` in, `{"result"}` / `{"error": {"code", "message"}}`
//! out) and the error code table are carried over verbatim; the strict
//! typed-params validation is new (spec.md §9 replaces the original's
//! duck-typed `dict.get` lookups).

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;
pub const NO_MUSIC_PLAYING: i64 = -32000;
pub const NO_PLAYLIST_PLAYING: i64 = -32001;

/// A decoded `{"method", "params"}` request.
#[derive(Clone, Debug, Deserialize)]
pub struct Request {
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: i64,
    pub message: String,
}

/// A `{"result"}` / `{"error"}` response; exactly one field is ever populated.
#[derive(Debug, Serialize)]
pub struct Response {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl Response {
    pub fn ok(result: impl Serialize) -> Self {
        Self {
            result: Some(serde_json::to_value(result).expect("result must serialize")),
            error: None,
        }
    }

    pub fn err(code: i64, message: impl Into<String>) -> Self {
        Self {
            result: None,
            error: Some(ErrorBody {
                code,
                message: message.into(),
            }),
        }
    }
}

impl From<&crate::error::LumenError> for Response {
    fn from(e: &crate::error::LumenError) -> Self {
        use crate::error::LumenError::*;
        match e {
            Parse => Response::err(PARSE_ERROR, "Parse error"),
            InvalidRequest => Response::err(INVALID_REQUEST, "Invalid Request"),
            MethodNotFound => Response::err(METHOD_NOT_FOUND, "Method not found"),
            InvalidParams(msg) => Response::err(INVALID_PARAMS, msg.clone()),
            NoMusicPlaying => Response::err(NO_MUSIC_PLAYING, "No music is currently playing"),
            NoPlaylistPlaying => Response::err(NO_PLAYLIST_PLAYING, "No animation playlist is currently playing"),
            Internal(err) => Response::err(-32603, err.to_string()),
        }
    }
}

/// Accumulates bytes from a stream until they parse as one complete JSON
/// value, capping growth at `max_len` (spec.md §9's "implicit JSON framing").
pub struct FrameReader {
    buffer: Vec<u8>,
    max_len: usize,
}

impl FrameReader {
    pub fn new(max_len: usize) -> Self {
        Self {
            buffer: Vec::new(),
            max_len,
        }
    }

    /// Feeds newly received bytes in. Returns `Some(value)` and clears the
    /// buffer once a complete JSON document has accumulated, `None` while a
    /// message is still incomplete, or an overflow error if the cap is hit.
    pub fn push(&mut self, bytes: &[u8]) -> Result<Option<Value>, crate::error::LumenError> {
        self.buffer.extend_from_slice(bytes);
        if self.buffer.len() > self.max_len {
            self.buffer.clear();
            return Err(crate::error::LumenError::Parse);
        }
        let mut de = serde_json::Deserializer::from_slice(&self.buffer);
        match Value::deserialize(&mut de) {
            Ok(value) => {
                let consumed = de.byte_offset();
                self.buffer.drain(0..consumed);
                Ok(Some(value))
            }
            Err(e) if e.is_eof() => Ok(None),
            Err(_) => {
                self.buffer.clear();
                Err(crate::error::LumenError::Parse)
            }
        }
    }
}

/// Parses a raw JSON value into a [`Request`], producing the spec's error
/// taxonomy for malformed or incomplete top-level shapes.
pub fn parse_request(value: Value) -> Result<Request, crate::error::LumenError> {
    let obj = value.as_object().ok_or(crate::error::LumenError::InvalidRequest)?;
    if !obj.contains_key("method") || !obj.contains_key("params") {
        return Err(crate::error::LumenError::InvalidRequest);
    }
    serde_json::from_value(value).map_err(|_| crate::error::LumenError::InvalidRequest)
}
