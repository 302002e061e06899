//! Canonical intent messages
//!
//! Wire layout signed by the enclave and rebuilt by the verifier:
//!
//! ```text
//! intent: u8 || timestamp_ms: u64 (little-endian) || bcs(payload)
//! ```
//!
//! BCS writes struct fields in declaration order, integers fixed-width
//! little-endian and strings/byte vectors with a ULEB128 length prefix, so
//! every payload value has exactly one encoding. Changing field order, a
//! field width or an intent number invalidates all previously issued
//! signatures.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{OracleError, Result};

/// Upper bound on any single text field in a payload
pub const MAX_FIELD_LEN: usize = 4096;

/// Domain-separation tag. Values are part of the wire format; never reuse one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum IntentScope {
    Weather = 0,
    Inference = 1,
}

impl IntentScope {
    pub fn tag(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            IntentScope::Weather => "weather",
            IntentScope::Inference => "inference",
        }
    }
}

impl TryFrom<u8> for IntentScope {
    type Error = OracleError;

    fn try_from(tag: u8) -> Result<Self> {
        match tag {
            0 => Ok(IntentScope::Weather),
            1 => Ok(IntentScope::Inference),
            other => Err(OracleError::MalformedPayload(format!("unknown intent tag {}", other))),
        }
    }
}

impl fmt::Display for IntentScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), self.tag())
    }
}

/// A payload shape bound to exactly one intent
pub trait IntentPayload: Serialize {
    const INTENT: IntentScope;

    /// Reject values that violate the payload's fixed shape
    fn validate(&self) -> Result<()>;

    /// Enclave-side cleanup applied before signing. The verifier never
    /// normalizes; it only validates.
    fn normalize(self) -> Self
    where
        Self: Sized,
    {
        self
    }
}

/// The signed envelope, as emitted by the enclave
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentMessage<P> {
    pub intent: u8,
    pub timestamp_ms: u64,
    pub data: P,
}

impl<P: IntentPayload> IntentMessage<P> {
    pub fn new(data: P, timestamp_ms: u64) -> Self {
        Self {
            intent: P::INTENT.tag(),
            timestamp_ms,
            data,
        }
    }
}

#[derive(Serialize)]
struct MessageRef<'a, P: ?Sized> {
    intent: u8,
    timestamp_ms: u64,
    data: &'a P,
}

/// Bytes that are signed for (`intent`, `timestamp_ms`, `payload`)
pub fn canonical_message<P: Serialize + ?Sized>(
    intent: u8,
    timestamp_ms: u64,
    payload: &P,
) -> Result<Vec<u8>> {
    bcs::to_bytes(&MessageRef {
        intent,
        timestamp_ms,
        data: payload,
    })
    .map_err(|e| OracleError::MalformedPayload(format!("canonical encoding: {}", e)))
}

/// Single-line text no longer than [`MAX_FIELD_LEN`] bytes
pub fn validate_text(field: &str, value: &str) -> Result<()> {
    if value.len() > MAX_FIELD_LEN {
        return Err(OracleError::MalformedPayload(format!(
            "{} is {} bytes, limit is {}",
            field,
            value.len(),
            MAX_FIELD_LEN
        )));
    }
    if value.chars().any(char::is_control) {
        return Err(OracleError::MalformedPayload(format!(
            "{} contains control characters",
            field
        )));
    }
    Ok(())
}

/// Flatten free-form model output into clean single-line text.
///
/// Control characters become spaces, markdown emphasis and heading markers
/// are dropped, `$` is spelled `USD `, double quotes and backticks become
/// single quotes and backslashes become slashes.
pub fn sanitize_text(raw: &str) -> String {
    let spaced: String = raw
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();
    spaced
        .replace('*', "")
        .replace('$', "USD ")
        .replace('#', "")
        .replace('`', "'")
        .replace('"', "'")
        .replace('\\', "/")
        .replace("  ", " ")
        .trim()
        .to_string()
}

/// Lighter cleanup for user-supplied questions: only line breaks and double
/// quotes are rewritten
pub fn sanitize_question(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| match c {
            '"' => '\'',
            c if c.is_control() => ' ',
            c => c,
        })
        .collect();
    cleaned.trim().to_string()
}
