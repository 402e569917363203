#![deny(missing_docs)]
//! Core type definitions shared between the otpgate verification service and its clients.
//!
//! This crate groups together the strongly-typed values and message structures used across
//! the phone-number verification system. It provides:
//!
//! * A validated [`PhoneNumber`] wrapper around the E.164 numbering plan.
//! * The [`SessionRecord`] central entity and its append-only attempt logs (see [`session`]).
//! * The public error taxonomy callers see at the RPC edge (see [`error`]).
//! * Versioned wire types for client/server communication (see [`api`]).

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod api;
pub mod error;
pub mod session;

pub use error::PublicError;
pub use session::{CheckAttempt, CheckOutcome, SendAttempt, SendOutcome, SessionRecord};

/// Opaque 128-bit session identifier, assigned at session creation and stable for its life.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Generates a new random session id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps an existing [`Uuid`].
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Returns the inner [`Uuid`].
    pub fn into_inner(self) -> Uuid {
        self.0
    }

    /// Returns the 16-byte representation used on the wire.
    pub fn as_bytes(&self) -> [u8; 16] {
        *self.0.as_bytes()
    }

    /// Reconstructs a [`SessionId`] from its 16-byte wire representation.
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl From<Uuid> for SessionId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

/// A validated E.164 phone number.
///
/// Internally this wraps [`phonenumber::PhoneNumber`]; on the wire it is carried as a 64-bit
/// integer holding the country code and subscriber digits with no leading `+`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PhoneNumber(phonenumber::PhoneNumber);

/// Error returned when a phone number fails to parse or is not a plausible E.164 number.
#[derive(Debug, Clone, thiserror::Error)]
#[error("illegal phone number")]
pub struct IllegalPhoneNumber;

impl PhoneNumber {
    /// Parses a phone number from its wire representation: the country code and subscriber
    /// number concatenated as decimal digits, with no leading `+` (e.g. `15555550100` for
    /// `+1 555-555-0100`).
    ///
    /// Returns [`IllegalPhoneNumber`] if the value does not parse as a plausible number, or is
    /// `0` (the sentinel the wire format uses for "absent").
    pub fn from_e164_u64(value: u64) -> Result<Self, IllegalPhoneNumber> {
        if value == 0 {
            return Err(IllegalPhoneNumber);
        }
        let candidate = format!("+{value}");
        let parsed = phonenumber::parse(None, &candidate).map_err(|_| IllegalPhoneNumber)?;
        if !phonenumber::is_valid(&parsed) {
            return Err(IllegalPhoneNumber);
        }
        Ok(Self(parsed))
    }

    /// Renders the number back to its wire representation (country code + subscriber digits,
    /// no leading `+`).
    pub fn to_e164_u64(&self) -> u64 {
        let formatted =
            phonenumber::format(&self.0).mode(phonenumber::Mode::E164).to_string();
        formatted
            .trim_start_matches('+')
            .parse()
            .expect("E.164 formatted number is all decimal digits")
    }

    /// Returns the ISO 3166-1 alpha-2 country this number belongs to, if determinable.
    pub fn country_id(&self) -> Option<phonenumber::country::Id> {
        self.0.country().id()
    }

    /// Returns the numeric calling code (e.g. `1` for the US, `44` for the UK). Used as half
    /// of the selection strategy's routing-table key.
    pub fn calling_code(&self) -> u16 {
        self.0.code().value() as u16
    }

    /// Returns the last `count` decimal digits of the subscriber number, left-padded with
    /// leading zeroes if the number is shorter than `count` digits. Used by the `last-digits`
    /// development adapter.
    pub fn last_digits(&self, count: usize) -> String {
        let all_digits = self.to_e164_u64().to_string();
        if all_digits.len() <= count {
            format!("{all_digits:0>width$}", width = count)
        } else {
            all_digits[all_digits.len() - count..].to_owned()
        }
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "+{}", self.to_e164_u64())
    }
}

impl Serialize for PhoneNumber {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(self.to_e164_u64())
    }
}

impl<'de> Deserialize<'de> for PhoneNumber {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = u64::deserialize(deserializer)?;
        Self::from_e164_u64(value).map_err(serde::de::Error::custom)
    }
}

/// The delivery channel used for a verification attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Transport {
    /// Deliver the code as a text message.
    Sms,
    /// Deliver the code via an automated voice call.
    Voice,
}

impl Transport {
    /// Short, lowercase, stable name used as part of rate-limiter keys and metrics labels.
    pub fn tag(&self) -> &'static str {
        match self {
            Transport::Sms => "sms",
            Transport::Voice => "voice",
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A caller-supplied hint about the client application making the request (e.g. `ios`,
/// `android`). Free-form but never empty; adapters may use it to pick a localized template.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientType(String);

impl ClientType {
    /// Sentinel used when the caller did not supply a client type.
    pub fn unknown() -> Self {
        Self("unknown".to_owned())
    }

    /// Wraps a caller-supplied client type string, falling back to [`ClientType::unknown`] for
    /// empty/whitespace-only input.
    pub fn new(value: impl Into<String>) -> Self {
        let trimmed = value.into();
        if trimmed.trim().is_empty() {
            Self::unknown()
        } else {
            Self(trimmed)
        }
    }

    /// Borrows the client type as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ClientType {
    fn default() -> Self {
        Self::unknown()
    }
}

impl fmt::Display for ClientType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A parsed `Accept-Language`-style list of language ranges, most preferred first.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LanguageRanges(Vec<String>);

impl LanguageRanges {
    /// Parses a comma-separated list of IETF language tags. Unknown formatting is preserved
    /// verbatim; this layer does not validate BCP-47 syntax, only splits and trims.
    pub fn parse(raw: &str) -> Self {
        Self(
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
                .collect(),
        )
    }

    /// Returns the language ranges in preference order.
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Returns `true` if no language preference was supplied.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_e164() {
        let number = PhoneNumber::from_e164_u64(15555550100).unwrap();
        assert_eq!(number.to_e164_u64(), 15555550100);
    }

    #[test]
    fn calling_code_for_us_number() {
        let number = PhoneNumber::from_e164_u64(15555550100).unwrap();
        assert_eq!(number.calling_code(), 1);
    }

    #[test]
    fn rejects_zero() {
        assert!(PhoneNumber::from_e164_u64(0).is_err());
    }

    #[test]
    fn rejects_implausible_number() {
        assert!(PhoneNumber::from_e164_u64(1).is_err());
    }

    #[test]
    fn last_digits_pads_short_numbers() {
        let number = PhoneNumber::from_e164_u64(15555550100).unwrap();
        assert_eq!(number.last_digits(6), "550100");
    }

    #[test]
    fn language_ranges_parse_and_trim() {
        let ranges = LanguageRanges::parse(" en-US, fr ;q=0.5,, de");
        assert_eq!(ranges.as_slice(), ["en-US", "fr ;q=0.5", "de"]);
    }

    #[test]
    fn client_type_empty_falls_back_to_unknown() {
        assert_eq!(ClientType::new("   "), ClientType::unknown());
    }
}
