//! Wire codec for handing conversations across component boundaries.
//!
//! Payloads are bincode with fixed-width little-endian integers. The fourteen
//! persisted fields are written in declaration order of [`WireConversation`];
//! `position` never goes on the wire.

use bincode::Options;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

use crate::config::StoreConfig;
use crate::error::{ConversationError, ConversationResult};
use crate::locator::Locator;
use crate::models::{Conversation, NO_POSITION};

/// Default upper bound on a decoded payload, in bytes.
pub const DEFAULT_MAX_WIRE_BYTES: u64 = 1024 * 1024;

fn encode_options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_little_endian()
        .with_no_limit()
}

#[derive(Serialize, Deserialize)]
struct WireConversation<'a> {
    id: i64,
    uri: Option<Cow<'a, str>>,
    subject: Cow<'a, str>,
    date_ms: i64,
    snippet: Option<Cow<'a, str>>,
    has_attachments: bool,
    message_list_uri: Option<Cow<'a, str>>,
    senders: Cow<'a, str>,
    num_messages: i32,
    num_drafts: i32,
    sending_state: i32,
    priority: i32,
    read: bool,
    starred: bool,
}

impl<'a> From<&'a Conversation> for WireConversation<'a> {
    fn from(conversation: &'a Conversation) -> Self {
        WireConversation {
            id: conversation.id,
            uri: conversation.uri.as_ref().map(|l| Cow::Borrowed(l.as_str())),
            subject: Cow::Borrowed(&conversation.subject),
            date_ms: conversation.date_ms,
            snippet: conversation.snippet.as_deref().map(Cow::Borrowed),
            has_attachments: conversation.has_attachments,
            message_list_uri: conversation
                .message_list_uri
                .as_ref()
                .map(|l| Cow::Borrowed(l.as_str())),
            senders: Cow::Borrowed(&conversation.senders),
            num_messages: conversation.num_messages,
            num_drafts: conversation.num_drafts,
            sending_state: conversation.sending_state,
            priority: conversation.priority,
            read: conversation.read,
            starred: conversation.starred,
        }
    }
}

fn parse_locator(
    field: &'static str,
    raw: Option<Cow<'_, str>>,
) -> ConversationResult<Option<Locator>> {
    raw.map(|raw| Locator::parse_field(field, &raw)).transpose()
}

impl WireConversation<'_> {
    fn into_conversation(self) -> ConversationResult<Conversation> {
        Ok(Conversation {
            id: self.id,
            uri: parse_locator("uri", self.uri)?,
            subject: self.subject.into_owned(),
            date_ms: self.date_ms,
            snippet: self.snippet.map(Cow::into_owned),
            has_attachments: self.has_attachments,
            message_list_uri: parse_locator("message_list_uri", self.message_list_uri)?,
            senders: self.senders.into_owned(),
            num_messages: self.num_messages,
            num_drafts: self.num_drafts,
            sending_state: self.sending_state,
            priority: self.priority,
            read: self.read,
            starred: self.starred,
            position: NO_POSITION,
        })
    }
}

fn decode_error(err: bincode::Error) -> ConversationError {
    match &*err {
        bincode::ErrorKind::Io(io) if io.kind() == std::io::ErrorKind::UnexpectedEof => {
            ConversationError::TruncatedWire("payload ended before the final field".to_string())
        }
        _ => ConversationError::InvalidWire(err.to_string()),
    }
}

/// Encoder/decoder. The size bound applies to decoding only; any record
/// encodes.
#[derive(Debug, Clone, Copy)]
pub struct WireCodec {
    max_bytes: u64,
}

impl WireCodec {
    pub fn new(max_bytes: u64) -> Self {
        Self { max_bytes }
    }

    /// Codec that accepts payloads of any size.
    pub fn unbounded() -> Self {
        Self::new(u64::MAX)
    }

    pub fn from_config(config: &StoreConfig) -> Self {
        Self::new(config.wire_max_bytes)
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    fn decode_options(&self) -> impl Options {
        bincode::DefaultOptions::new()
            .with_fixint_encoding()
            .with_little_endian()
            .with_limit(self.max_bytes)
            .allow_trailing_bytes()
    }

    pub fn encode(&self, conversation: &Conversation) -> ConversationResult<Vec<u8>> {
        encode_options()
            .serialize(&WireConversation::from(conversation))
            .map_err(|e| ConversationError::InvalidWire(e.to_string()))
    }

    /// Decode one payload. The payload must hold exactly the fourteen fields.
    pub fn decode(&self, bytes: &[u8]) -> ConversationResult<Conversation> {
        let wire: WireConversation = self.decode_options().deserialize(bytes).map_err(decode_error)?;

        let consumed = encode_options().serialized_size(&wire).map_err(decode_error)?;
        if consumed != bytes.len() as u64 {
            return Err(ConversationError::TruncatedWire(format!(
                "{} bytes left after the final field",
                bytes.len() as u64 - consumed
            )));
        }

        wire.into_conversation()
    }
}

impl Default for WireCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_WIRE_BYTES)
    }
}

impl Conversation {
    pub fn to_wire(&self) -> ConversationResult<Vec<u8>> {
        WireCodec::unbounded().encode(self)
    }

    /// Decode without a size bound; use a configured [`WireCodec`] for
    /// payloads from outside the process.
    pub fn from_wire(bytes: &[u8]) -> ConversationResult<Conversation> {
        WireCodec::unbounded().decode(bytes)
    }
}
