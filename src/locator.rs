//! Opaque resource locators addressing conversations and their message lists.
//!
//! A locator is kept as the validated string it was parsed from. Callers never
//! look inside it; they only compare, format and hand it back to the store.

use regex::Regex;
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::error::{ConversationError, ConversationResult};

static LOCATOR_REGEX: OnceLock<Regex> = OnceLock::new();

/// `scheme ":" rest` with an RFC 3986 scheme and no whitespace or control characters.
fn get_locator_regex() -> &'static Regex {
    LOCATOR_REGEX.get_or_init(|| {
        Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*:[^\s\p{Cc}]+$").expect("Invalid locator regex")
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Locator(String);

impl Locator {
    /// Parse a locator, reporting `field` in the error when the input is rejected.
    pub fn parse_field(field: &'static str, input: &str) -> ConversationResult<Self> {
        if get_locator_regex().is_match(input) {
            Ok(Locator(input.to_string()))
        } else {
            Err(ConversationError::malformed_locator(field, input))
        }
    }

    pub fn parse(input: &str) -> ConversationResult<Self> {
        Self::parse_field("locator", input)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Scheme portion, e.g. `content` for `content://mail/conversations/1`.
    pub fn scheme(&self) -> &str {
        self.0.split_once(':').map(|(scheme, _)| scheme).unwrap_or("")
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Locator {
    type Err = ConversationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Locator::parse(s)
    }
}

impl Serialize for Locator {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}
