//! Conversation messages.
//!
//! # Invariants
//!
//! - An image reference exists iff the message is an image. The body is a
//!   tagged union, so the invariant holds by construction.
//! - The sender is never empty. Inbound messages without one are attributed
//!   to [`ANONYMOUS`].

use std::fmt;

use bolt_proto::{ImageRef, InboundMessage, MessageKind, SendMessage};

use crate::env::Environment;

/// Sender used when the gateway omits one.
pub const ANONYMOUS: &str = "anonymous";

/// Content placeholder for an image message that arrived without a reference.
pub const MISSING_IMAGE: &str = "[image]";

/// Message body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageBody {
    /// Plain text
    Text(String),
    /// Source code
    Code(String),
    /// Image with a (possibly empty) caption
    Image {
        /// Caption text
        caption: String,
        /// Image resource
        image: ImageRef,
    },
}

impl MessageBody {
    /// Message kind.
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::Text(_) => MessageKind::Text,
            Self::Code(_) => MessageKind::Code,
            Self::Image { .. } => MessageKind::Image,
        }
    }

    /// Text content. For images, the caption.
    pub fn content(&self) -> &str {
        match self {
            Self::Text(content) | Self::Code(content) => content,
            Self::Image { caption, .. } => caption,
        }
    }

    /// Image reference, for image messages.
    pub fn image(&self) -> Option<&ImageRef> {
        match self {
            Self::Image { image, .. } => Some(image),
            Self::Text(_) | Self::Code(_) => None,
        }
    }
}

/// Where a message came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Appended locally on send, not yet seen from the gateway
    LocalOptimistic,
    /// Delivered by the gateway
    Confirmed,
}

/// Client-generated id linking an optimistic message to its echo.
///
/// 16 random bytes rendered as 32 lower-case hex characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CorrelationId(String);

impl CorrelationId {
    /// Generate a fresh id from the environment's randomness.
    pub fn generate<E: Environment>(env: &E) -> Self {
        let mut bytes = [0u8; 16];
        env.random_bytes(&mut bytes);
        Self(bytes.iter().map(|b| format!("{b:02x}")).collect())
    }

    /// Id as sent on the wire.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for CorrelationId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A message in the conversation log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Display name of the author
    pub sender: String,
    /// Body
    pub body: MessageBody,
    /// Milliseconds since the Unix epoch
    pub timestamp: u64,
    /// Local or gateway origin
    pub origin: Origin,
    /// Correlation id, if one was generated or echoed
    pub correlation_id: Option<CorrelationId>,
}

impl Message {
    /// Normalize a leniently decoded inbound message.
    ///
    /// Missing sender becomes [`ANONYMOUS`], missing kind becomes text,
    /// missing timestamp becomes `received_at`. An image without a reference
    /// degrades to text showing the file name (or [`MISSING_IMAGE`]).
    pub fn from_inbound(inbound: InboundMessage, received_at: u64) -> Self {
        let sender = match inbound.sender.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => {
                tracing::warn!("inbound message without sender");
                ANONYMOUS.to_string()
            },
        };

        let body = match (inbound.kind.unwrap_or_default(), inbound.image_ref) {
            (MessageKind::Text, _) => MessageBody::Text(inbound.content),
            (MessageKind::Code, _) => MessageBody::Code(inbound.content),
            (MessageKind::Image, Some(image)) => {
                MessageBody::Image { caption: inbound.content, image }
            },
            (MessageKind::Image, None) => {
                tracing::warn!("image message without reference, showing as text");
                let content = if inbound.content.is_empty() {
                    MISSING_IMAGE.to_string()
                } else {
                    inbound.content
                };
                MessageBody::Text(content)
            },
        };

        Self {
            sender,
            body,
            timestamp: inbound.timestamp.unwrap_or(received_at),
            origin: Origin::Confirmed,
            correlation_id: inbound.correlation_id.map(CorrelationId::from),
        }
    }

    /// Outbound typed form of this message.
    pub fn to_send(&self) -> SendMessage {
        SendMessage {
            kind: self.body.kind(),
            content: self.body.content().to_string(),
            image_ref: self.body.image().cloned(),
            correlation_id: self.correlation_id.as_ref().map(|id| id.as_str().to_string()),
        }
    }

    /// Whether the gateway has not yet confirmed this message.
    pub fn is_pending(&self) -> bool {
        self.origin == Origin::LocalOptimistic
    }
}
