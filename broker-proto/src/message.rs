use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CodecError;

/// The three message shapes that cross a routing plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageType {
    RequestValue,
    WriteValue,
    Reply,
}

/// The universal wire object that crosses every routing plane. `dst` is absent on pure publications (the topic is
/// carried out-of-band as the first publish-ingress/egress frame instead); `status` is only
/// meaningful on `Reply`; `timestamp` and `payload` are both optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub message_type: Option<MessageType>,
    pub from: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dst: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl Message {
    pub fn request_value(from: impl Into<String>, dst: impl Into<String>, payload: Option<Value>) -> Self {
        Self {
            message_type: Some(MessageType::RequestValue),
            from: from.into(),
            dst: Some(dst.into()),
            status: None,
            timestamp: None,
            payload,
        }
    }

    pub fn write_value(from: impl Into<String>, dst: impl Into<String>, payload: Value) -> Self {
        Self {
            message_type: Some(MessageType::WriteValue),
            from: from.into(),
            dst: Some(dst.into()),
            status: None,
            timestamp: None,
            payload: Some(payload),
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn reply(
        from: impl Into<String>,
        dst: impl Into<String>,
        status: i64,
        timestamp: f64,
        payload: Option<Value>,
    ) -> Self {
        Self {
            message_type: Some(MessageType::Reply),
            from: from.into(),
            dst: Some(dst.into()),
            status: Some(status),
            timestamp: Some(timestamp),
            payload,
        }
    }

    /// A bare publication: `{from, timestamp, payload}` — no `type` or `dst` field at all.
    pub fn publication(from: impl Into<String>, timestamp: f64, payload: Option<Value>) -> Self {
        Self {
            message_type: None,
            from: from.into(),
            dst: None,
            status: None,
            timestamp: Some(timestamp),
            payload,
        }
    }

    /// Encode this message as a single UTF-8 JSON frame.
    pub fn encode(&self) -> Vec<u8> {
        // A `Message` only ever contains JSON-representable fields, so this cannot fail.
        serde_json::to_vec(self).expect("Message always serializes")
    }

    /// Decode a single contiguous byte sequence.
    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Decode a message whose JSON body was split across several frames; the frames are
    /// concatenated in order before parsing (mirrors `Message.join_frames` in the original).
    pub fn decode_frames<B: AsRef<[u8]>>(frames: &[B]) -> Result<Self, CodecError> {
        let mut joined = Vec::new();
        for frame in frames {
            joined.extend_from_slice(frame.as_ref());
        }
        Self::decode(&joined)
    }
}
