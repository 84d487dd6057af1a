//! Tag payloads: the opaque string embedded in QR codes and deep links.
//!
//! A payload is the tag's JSON, base64-encoded, then escaped the way a
//! browser's `encodeURIComponent` escapes it. Tags printed before schools
//! were recorded carry no `school`; decoding reports those separately so the
//! caller decides where the school comes from.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::model::{Tag, SCHOOL_NOT_SPECIFIED};
use crate::storage::IdentityStore;

/// Characters `encodeURIComponent` leaves unescaped.
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

// Padded on encode; decode accepts payloads with or without padding.
const PAYLOAD_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Escape `text` for use as one URI component.
#[must_use]
pub fn encode_uri_component(text: &str) -> String {
    utf8_percent_encode(text, URI_COMPONENT).to_string()
}

/// Encode a tag into a URL-safe payload.
///
/// # Errors
///
/// Returns an error if the tag cannot be serialized.
pub fn encode(tag: &Tag) -> Result<String> {
    let json = serde_json::to_vec(tag)?;
    Ok(encode_uri_component(&PAYLOAD_BASE64.encode(json)))
}

/// A payload decoded without consulting any store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedPayload {
    /// Every field was present.
    Complete(Tag),
    /// A legacy payload without a school; the tag's `school` is empty.
    MissingSchool(Tag),
}

impl DecodedPayload {
    /// Whether the school still has to be found.
    #[must_use]
    pub fn needs_school(&self) -> bool {
        matches!(self, Self::MissingSchool(_))
    }

    /// The tag code carried by the payload.
    #[must_use]
    pub fn code(&self) -> &str {
        match self {
            Self::Complete(tag) | Self::MissingSchool(tag) => &tag.code,
        }
    }

    /// Finish decoding, filling a missing school from the account that owns
    /// a tag with the same code, or [`SCHOOL_NOT_SPECIFIED`] if none does.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be scanned.
    pub fn resolve<S: IdentityStore + ?Sized>(self, accounts: &S) -> Result<Tag> {
        let mut tag = match self {
            Self::Complete(tag) => return Ok(tag),
            Self::MissingSchool(tag) => tag,
        };

        let owner_school = accounts
            .scan()?
            .find(|(_, account)| account.tags.iter().any(|owned| owned.code == tag.code))
            .map(|(_, account)| account.school().map(str::to_string));

        tag.school = match owner_school {
            Some(Some(school)) => school,
            Some(None) | None => SCHOOL_NOT_SPECIFIED.to_string(),
        };
        warn!(code = %tag.code, school = %tag.school, "Recovered school for legacy tag payload");
        Ok(tag)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireTag {
    #[serde(default, rename = "tagId")]
    code: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    grade: Option<String>,
    #[serde(default)]
    class_name: Option<String>,
    #[serde(default)]
    parent_phone: Option<String>,
    #[serde(default)]
    school: Option<String>,
}

fn required(value: Option<String>, key: &str) -> Result<String> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| Error::corrupt_payload(format!("missing {key}")))
}

// Tags printed by the browser app were base64'd one byte per character, so
// anything that is not UTF-8 is read back as Latin-1.
fn payload_text(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => {
            debug!("Payload is not UTF-8, reading it as Latin-1");
            e.into_bytes().into_iter().map(char::from).collect()
        }
    }
}

/// Decode a payload without touching any store.
///
/// # Errors
///
/// Returns [`Error::CorruptPayload`] if the payload is not valid escaped
/// base64 JSON or lacks a required field.
pub fn decode_payload(payload: &str) -> Result<DecodedPayload> {
    let unescaped = percent_decode_str(payload.trim())
        .decode_utf8()
        .map_err(|e| Error::corrupt_payload(format!("bad escape sequence: {e}")))?;
    let compact: String = unescaped.split_ascii_whitespace().collect();
    let bytes = PAYLOAD_BASE64
        .decode(compact.as_bytes())
        .map_err(|e| Error::corrupt_payload(format!("bad base64: {e}")))?;
    let json = payload_text(bytes);
    let wire: WireTag = serde_json::from_str(&json)
        .map_err(|e| Error::corrupt_payload(format!("bad JSON: {e}")))?;

    let tag = Tag {
        name: required(wire.name, "name")?,
        grade: required(wire.grade, "grade")?,
        class_name: required(wire.class_name, "className")?,
        parent_phone: required(wire.parent_phone, "parentPhone")?,
        code: required(wire.code, "tagId")?,
        school: wire.school.unwrap_or_default(),
    };

    debug!(code = %tag.code, "Decoded tag payload");
    if tag.has_school() {
        Ok(DecodedPayload::Complete(tag))
    } else {
        Ok(DecodedPayload::MissingSchool(tag))
    }
}

/// Decode a payload, recovering a missing school from `accounts`.
///
/// # Errors
///
/// Returns [`Error::CorruptPayload`] for malformed payloads, or a storage
/// error if the legacy lookup cannot scan the store.
pub fn decode<S: IdentityStore + ?Sized>(payload: &str, accounts: &S) -> Result<Tag> {
    decode_payload(payload)?.resolve(accounts)
}
