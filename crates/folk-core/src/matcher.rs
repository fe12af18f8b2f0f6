//! The duplicate matcher — pairwise field comparison over a collection.
//!
//! This is the naive O(n²) scan, kept synchronous and pure so callers can
//! run it inline over small collections or offload it (see the engine's
//! scan module) for large ones. Given the same input order, output order
//! and match sets are deterministic.

use serde::Serialize;

use crate::{aggregate::PersonAggregate, record::ContactRecord};

// ─── Comparable fields ───────────────────────────────────────────────────────

/// The field kinds the matcher compares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchField {
  Name,
  Nickname,
  Email,
  Phone,
}

/// The comparable values of one entry, gathered across all member records
/// of its aggregate. Empty strings are dropped at construction so the
/// comparison never has to re-check.
#[derive(Debug, Clone, Default)]
pub struct MatchValues {
  pub names:     Vec<String>,
  pub nicknames: Vec<String>,
  pub emails:    Vec<String>,
  pub phones:    Vec<String>,
}

impl MatchValues {
  pub fn for_records<'a>(
    records: impl IntoIterator<Item = &'a ContactRecord>,
  ) -> Self {
    let mut values = Self::default();
    for record in records {
      if let Some(name) = record.display_name() {
        push_unique(&mut values.names, name);
      }
      if let Some(nick) = record.nickname.as_deref().filter(|s| !s.is_empty()) {
        push_unique(&mut values.nicknames, nick);
      }
      for email in &record.emails {
        push_unique(&mut values.emails, email);
      }
      for phone in &record.phones {
        push_unique(&mut values.phones, phone);
      }
    }
    values
  }

  pub fn for_aggregate(aggregate: &PersonAggregate) -> Self {
    Self::for_records(aggregate.records())
  }

  /// The field kinds on which `self` and `other` overlap.
  ///
  /// A field matches when both value lists are non-empty and share at least
  /// one exact (case-sensitive) value. Single-valued fields degenerate to
  /// one-element lists, giving plain equality.
  pub fn matched_fields(&self, other: &Self) -> Vec<MatchField> {
    let mut fields = Vec::new();
    if overlaps(&self.names, &other.names) {
      fields.push(MatchField::Name);
    }
    if overlaps(&self.nicknames, &other.nicknames) {
      fields.push(MatchField::Nickname);
    }
    if overlaps(&self.emails, &other.emails) {
      fields.push(MatchField::Email);
    }
    if overlaps(&self.phones, &other.phones) {
      fields.push(MatchField::Phone);
    }
    fields
  }
}

fn push_unique(values: &mut Vec<String>, value: &str) {
  if !value.is_empty() && !values.iter().any(|v| v == value) {
    values.push(value.to_owned());
  }
}

fn overlaps(a: &[String], b: &[String]) -> bool {
  !a.is_empty() && !b.is_empty() && b.iter().any(|v| a.contains(v))
}

// ─── Match ───────────────────────────────────────────────────────────────────

/// A candidate-duplicate pairing. Transient: consumed by a decision step
/// that may eventually call merge, never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct Match<K> {
  /// The field kinds both entries share a value on; never empty.
  pub fields: Vec<MatchField>,
  /// The entry appearing earlier in the scanned collection.
  pub first:  K,
  /// The entry appearing later.
  pub second: K,
}

// ─── Scans ───────────────────────────────────────────────────────────────────

/// Compare every pair of entries, earlier-first, in insertion order.
pub fn find_all_matches<K: Clone>(entries: &[(K, MatchValues)]) -> Vec<Match<K>> {
  let mut matches = Vec::new();
  for (i, (key, values)) in entries.iter().enumerate() {
    for (earlier_key, earlier_values) in &entries[..i] {
      let fields = earlier_values.matched_fields(values);
      if !fields.is_empty() {
        matches.push(Match {
          fields,
          first: earlier_key.clone(),
          second: key.clone(),
        });
      }
    }
  }
  matches
}

/// Compare one entry against every other entry.
///
/// An unknown `target` yields an empty result, not an error — the restricted
/// search degrades to a no-op scan.
pub fn find_matches_for<K: Clone + PartialEq>(
  target: &K,
  entries: &[(K, MatchValues)],
) -> Vec<Match<K>> {
  let Some((_, target_values)) = entries.iter().find(|(k, _)| k == target)
  else {
    return Vec::new();
  };

  let mut matches = Vec::new();
  for (key, values) in entries {
    if key == target {
      continue;
    }
    let fields = target_values.matched_fields(values);
    if !fields.is_empty() {
      matches.push(Match {
        fields,
        first: target.clone(),
        second: key.clone(),
      });
    }
  }
  matches
}

// ─── Tests ───────────────────────────────────────────────────────────────────
