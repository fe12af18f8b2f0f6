//! Identifiers and the contact record — the leaf data types of Folk.
//!
//! A contact record is the normalized bag of typed fields one backend holds
//! for one person. Everything above it (composites, aggregates, matches) is
//! derived from these records plus the identity mapping.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// ─── ContactId ───────────────────────────────────────────────────────────────

/// The stable identifier a source assigns to one of its contacts.
///
/// Opaque and source-defined; Folk never interprets it beyond checking that
/// it does not carry the person-uri scheme prefix.
#[derive(
  Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ContactId(pub String);

impl ContactId {
  pub fn new(id: impl Into<String>) -> Self { Self(id.into()) }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for ContactId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<&str> for ContactId {
  fn from(s: &str) -> Self { Self(s.to_owned()) }
}

impl From<String> for ContactId {
  fn from(s: String) -> Self { Self(s) }
}

// ─── PersonId ────────────────────────────────────────────────────────────────

/// URI scheme prefix distinguishing person uris from raw contact ids.
pub const PERSON_SCHEME: &str = "folk://";

/// The durable identity a set of merged contacts shares.
///
/// Stored as an integer; surfaced externally as `folk://<int>`.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  Serialize,
  Deserialize,
)]
#[serde(transparent)]
pub struct PersonId(pub i64);

impl PersonId {
  /// Render the external uri form.
  pub fn uri(&self) -> String { format!("{PERSON_SCHEME}{}", self.0) }

  /// Sniff `s` for the person scheme.
  ///
  /// Returns `Ok(None)` when `s` is a raw contact id (no prefix), and an
  /// error only when the prefix is present but the integer is malformed.
  pub fn from_uri(s: &str) -> Result<Option<Self>> {
    let Some(rest) = s.strip_prefix(PERSON_SCHEME) else {
      return Ok(None);
    };
    rest
      .parse::<i64>()
      .map(|n| Some(Self(n)))
      .map_err(|_| Error::InvalidPersonUri(s.to_owned()))
  }
}

impl fmt::Display for PersonId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{PERSON_SCHEME}{}", self.0)
  }
}

// ─── ContactRecord ───────────────────────────────────────────────────────────

/// The normalized field bag one source holds for one contact.
///
/// Single-valued fields are `Option<String>`; an empty string counts as
/// absent everywhere (merging, matching). Multi-valued fields are plain
/// vectors in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactRecord {
  // ── Single-valued ─────────────────────────────────────────────────────
  pub name:            Option<String>,
  pub formatted_name:  Option<String>,
  pub family_name:     Option<String>,
  pub given_name:      Option<String>,
  pub additional_name: Option<String>,
  pub prefix:          Option<String>,
  pub suffix:          Option<String>,
  pub nickname:        Option<String>,
  /// Path or URL to the contact's photo; no binary data lives in a record.
  pub photo:           Option<String>,

  // ── Multi-valued ──────────────────────────────────────────────────────
  pub emails:     Vec<String>,
  pub phones:     Vec<String>,
  pub im_handles: Vec<String>,
  pub addresses:  Vec<String>,
  pub categories: Vec<String>,
  /// Cryptographic keys, stored as armored text.
  pub keys:       Vec<String>,
  pub groups:     Vec<String>,
}

impl ContactRecord {
  /// True when no field carries a value.
  pub fn is_empty(&self) -> bool {
    self == &Self::default()
  }

  /// The display name: `name` falling back to `formatted_name`.
  pub fn display_name(&self) -> Option<&str> {
    non_empty(&self.name).or_else(|| non_empty(&self.formatted_name))
  }

  /// Deserialise an interchange record (source snapshots, CLI contact
  /// sets); missing fields default to empty.
  pub fn from_json(value: serde_json::Value) -> Result<Self> {
    Ok(serde_json::from_value(value)?)
  }
}

/// `Some(s)` only when the option holds a non-empty string.
pub(crate) fn non_empty(v: &Option<String>) -> Option<&str> {
  v.as_deref().filter(|s| !s.is_empty())
}

// ─── Tests ───────────────────────────────────────────────────────────────────
