//! Chat message payloads.
//!
//! Outbound messages have a single canonical shape ([`SendMessage`]). Inbound
//! messages have been seen in three shapes across gateway revisions:
//!
//! ```text
//! canonical  { sender, kind, content, imageRef?: {url, name}, timestamp?, correlationId? }
//! revision   { from: {name}, type, content, imageUrl?, imageName? }
//! legacy     { sender, message }
//! ```
//!
//! [`InboundMessage::from_value`] accepts all three and never fails; absent
//! fields stay `None` so the session layer can apply its own defaults.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::legacy;

/// Kind of chat message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    /// Plain text.
    #[default]
    Text,
    /// Source code, rendered monospaced.
    Code,
    /// Image with optional caption.
    Image,
}

impl MessageKind {
    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Code => "code",
            Self::Image => "image",
        }
    }

    /// Parse a wire name. `None` if unknown.
    #[must_use]
    pub fn from_wire(name: &str) -> Option<Self> {
        match name {
            "text" => Some(Self::Text),
            "code" => Some(Self::Code),
            "image" => Some(Self::Image),
            _ => None,
        }
    }
}

/// Reference to an image resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    /// Resolvable resource handle (URL).
    pub url: String,
    /// Original file name, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ImageRef {
    /// Create a reference with a file name.
    pub fn new(url: impl Into<String>, name: impl Into<String>) -> Self {
        Self { url: url.into(), name: Some(name.into()) }
    }
}

/// Outbound chat message (canonical typed form).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessage {
    /// Message kind.
    pub kind: MessageKind,
    /// Body text or image caption.
    pub content: String,
    /// Image reference. Present iff `kind` is [`MessageKind::Image`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_ref: Option<ImageRef>,
    /// Client-generated id echoed back by the gateway.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
}

impl SendMessage {
    /// Degraded string form of this message.
    ///
    /// Code is fenced, images collapse to their file-name marker, and the
    /// correlation id is lost.
    #[must_use]
    pub fn to_legacy(&self) -> String {
        match self.kind {
            MessageKind::Text => self.content.clone(),
            MessageKind::Code => legacy::wrap_code(&self.content),
            MessageKind::Image => {
                let name = self.image_ref.as_ref().and_then(|i| i.name.as_deref()).unwrap_or("");
                legacy::image_marker(name)
            },
        }
    }
}

/// Inbound chat message, decoded leniently.
///
/// Every field that a gateway may omit is optional. Serializes to the
/// canonical shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundMessage {
    /// Display name of the author.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,
    /// Declared or inferred kind.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<MessageKind>,
    /// Body text or caption.
    pub content: String,
    /// Image reference.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_ref: Option<ImageRef>,
    /// Server timestamp, milliseconds since the Unix epoch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u64>,
    /// Correlation id of the originating [`SendMessage`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
}

impl InboundMessage {
    /// Build the canonical echo of an outbound message.
    pub fn from_send(sender: impl Into<String>, message: SendMessage, timestamp: u64) -> Self {
        Self {
            sender: Some(sender.into()),
            kind: Some(message.kind),
            content: message.content,
            image_ref: message.image_ref,
            timestamp: Some(timestamp),
            correlation_id: message.correlation_id,
        }
    }

    /// Interpret a legacy string body.
    ///
    /// A fully fenced body is classified as code and unwrapped. Anything else
    /// is left unclassified.
    pub fn from_legacy_text(sender: Option<String>, text: &str) -> Self {
        let (kind, content) = match legacy::unwrap_code(text) {
            Some(inner) => (Some(MessageKind::Code), inner.to_string()),
            None => (None, text.to_string()),
        };
        Self { sender, kind, content, ..Self::default() }
    }

    /// Decode any known payload shape. Never fails.
    ///
    /// Unknown kinds are dropped (left `None`) and logged. A payload that is
    /// neither an object nor a string is rendered as its JSON text.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::String(text) => Self::from_legacy_text(None, text),
            Value::Object(obj) => Self::from_object(obj),
            Value::Null => Self::default(),
            other => {
                tracing::warn!(payload = %other, "newMessage payload is not an object");
                Self { content: other.to_string(), ..Self::default() }
            },
        }
    }

    fn from_object(obj: &Map<String, Value>) -> Self {
        let sender = str_field(obj, "sender")
            .or_else(|| obj.get("sender").and_then(|s| s.get("name")).and_then(Value::as_str))
            .or_else(|| obj.get("from").and_then(|f| f.get("name")).and_then(Value::as_str))
            .or_else(|| str_field(obj, "from"))
            .map(str::to_string);

        let declared = str_field(obj, "kind").or_else(|| str_field(obj, "type"));
        let kind = declared.and_then(|name| {
            let kind = MessageKind::from_wire(name);
            if kind.is_none() {
                tracing::warn!(kind = name, "unknown message kind");
            }
            kind
        });

        let content = str_field(obj, "content").or_else(|| str_field(obj, "message")).unwrap_or("");

        let image_ref = match obj.get("imageRef") {
            Some(Value::Object(image)) => str_field(image, "url").map(|url| ImageRef {
                url: url.to_string(),
                name: str_field(image, "name").map(str::to_string),
            }),
            _ => str_field(obj, "imageUrl").map(|url| ImageRef {
                url: url.to_string(),
                name: str_field(obj, "imageName").map(str::to_string),
            }),
        };

        let timestamp = obj.get("timestamp").and_then(|t| {
            t.as_u64().or_else(|| t.as_f64().filter(|f| f.is_finite() && *f >= 0.0).map(|f| f as u64))
        });

        let correlation_id = str_field(obj, "correlationId").map(str::to_string);

        let mut message = if kind.is_none() {
            Self::from_legacy_text(sender, content)
        } else {
            Self { sender, kind, content: content.to_string(), ..Self::default() }
        };
        message.image_ref = image_ref;
        message.timestamp = timestamp;
        message.correlation_id = correlation_id;
        message
    }
}

fn str_field<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    obj.get(key).and_then(Value::as_str)
}
