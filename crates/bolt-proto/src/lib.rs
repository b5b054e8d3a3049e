//! Bolt wire protocol
//!
//! Logical events exchanged with the session gateway, framed as JSON
//! envelopes over a WebSocket text stream.
//!
//! # Layers
//!
//! - [`Frame`]: the raw envelope (`{"event": .., "data": ..}`). Routing only,
//!   the payload stays an untyped JSON value.
//! - [`Payload`]: typed view of a frame, one variant per [`EventName`].
//! - [`legacy`]: the degraded string encodings (fenced code, image markers)
//!   that older gateways still emit.
//!
//! Outbound payloads always use the canonical typed shape unless the caller
//! explicitly asks for the legacy string form. Inbound payloads are decoded
//! leniently: every shape observed in the wild is accepted and collapsed into
//! [`InboundMessage`].

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod errors;
pub mod event;
pub mod frame;
pub mod legacy;
pub mod payloads;

pub use errors::{ProtocolError, Result};
pub use event::EventName;
pub use frame::Frame;
pub use payloads::{
    Payload,
    chat::{ImageRef, InboundMessage, MessageKind, SendMessage},
    error::ErrorPayload,
    presence::PresenceUpdate,
};
