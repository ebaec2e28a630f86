//! Compact share tokens for proposal records.
//!
//! A token is `base64(percent_escape(json([sender, recipient, handle, message, theme])))`.
//! The array position is the wire contract; field names never travel. Record
//! ids and creation timestamps are dropped on encode and regenerated on decode.

use base64::{
    alphabet,
    engine::{
        general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD},
        DecodePaddingMode,
    },
    Engine as _,
};
use chrono::{DateTime, Utc};
use percent_encoding::{percent_decode, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Deserialize;
use shared::domain::{ProposalContent, ProposalId, ProposalRecord, Theme};
use thiserror::Error;

/// Characters left unescaped by `encodeURIComponent`.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

const LENIENT: GeneralPurposeConfig = GeneralPurposeConfig::new()
    .with_decode_padding_mode(DecodePaddingMode::Indifferent)
    .with_decode_allow_trailing_bits(true);
const STANDARD_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::STANDARD, LENIENT);
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::URL_SAFE, LENIENT);

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("token is empty")]
    Empty,
    #[error("token is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("malformed percent escape at byte {position}")]
    Escape { position: usize },
    #[error("escaped payload is not valid UTF-8")]
    Utf8,
    #[error("payload is neither a proposal array nor a legacy proposal object: {0}")]
    Shape(#[source] serde_json::Error),
}

#[derive(Deserialize)]
struct WireTuple(String, String, String, String, Theme);

impl From<WireTuple> for ProposalContent {
    fn from(WireTuple(sender_name, recipient_name, contact_handle, message, theme): WireTuple) -> Self {
        Self {
            sender_name,
            recipient_name,
            contact_handle,
            message,
            theme,
        }
    }
}

/// Object shape of tokens minted before the positional format.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyObject {
    sender_name: String,
    recipient_name: String,
    contact_handle: String,
    message: String,
    theme: Theme,
}

impl From<LegacyObject> for ProposalContent {
    fn from(legacy: LegacyObject) -> Self {
        Self {
            sender_name: legacy.sender_name,
            recipient_name: legacy.recipient_name,
            contact_handle: legacy.contact_handle,
            message: legacy.message,
            theme: legacy.theme,
        }
    }
}

pub fn encode(record: &ProposalRecord) -> String {
    encode_content(record.content())
}

pub fn encode_content(content: &ProposalContent) -> String {
    let wire = serde_json::json!([
        content.sender_name,
        content.recipient_name,
        content.contact_handle,
        content.message,
        content.theme.as_str(),
    ]);
    let escaped = utf8_percent_encode(&wire.to_string(), URI_COMPONENT).to_string();
    STANDARD.encode(escaped)
}

/// Returns `None` for anything that is not a well-formed token.
pub fn decode(token: &str) -> Option<ProposalRecord> {
    try_decode(token).ok()
}

pub fn try_decode(token: &str) -> Result<ProposalRecord, DecodeError> {
    decode_at(token, Utc::now())
}

pub fn decode_at(token: &str, now: DateTime<Utc>) -> Result<ProposalRecord, DecodeError> {
    let content = decode_content(token)?;
    Ok(ProposalRecord::new(ProposalId::shared(), content, now))
}

pub fn decode_content(token: &str) -> Result<ProposalContent, DecodeError> {
    let json = unwrap_token(token)?;
    match serde_json::from_str::<WireTuple>(&json) {
        Ok(wire) => Ok(wire.into()),
        Err(positional) => serde_json::from_str::<LegacyObject>(&json)
            .map(ProposalContent::from)
            .map_err(|_| DecodeError::Shape(positional)),
    }
}

fn unwrap_token(token: &str) -> Result<String, DecodeError> {
    let token = token.trim();
    let token = token.strip_prefix('#').unwrap_or(token);
    if token.is_empty() {
        return Err(DecodeError::Empty);
    }

    let escaped = STANDARD_LENIENT
        .decode(token)
        .or_else(|err| URL_SAFE_LENIENT.decode(token).map_err(|_| err))?;
    check_escapes(&escaped)?;
    percent_decode(&escaped)
        .decode_utf8()
        .map(|text| text.into_owned())
        .map_err(|_| DecodeError::Utf8)
}

/// `percent_decode` passes stray `%` through; tokens must not contain any.
fn check_escapes(bytes: &[u8]) -> Result<(), DecodeError> {
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let well_formed = bytes
                .get(i + 1..i + 3)
                .is_some_and(|pair| pair.iter().all(u8::is_ascii_hexdigit));
            if !well_formed {
                return Err(DecodeError::Escape { position: i });
            }
            i += 3;
        } else {
            i += 1;
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
