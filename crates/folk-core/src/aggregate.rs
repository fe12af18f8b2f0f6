//! The person aggregate — a live view over the contacts sharing one person.
//!
//! Never persisted; always derivable from the identity mapping plus the
//! live contact records. The composite is recomputed eagerly on every
//! membership or content change, so reads are free.

use serde::Serialize;

use crate::{
  merge::merge_records,
  record::{ContactId, ContactRecord},
};

/// The contacts currently grouped under one person key, plus their folded
/// composite record.
///
/// The key is a person uri (`folk://<n>`) for merged persons, or the
/// contact's own id for a standalone singleton. Members keep first-seen
/// order, which is also the merge precedence order.
#[derive(Debug, Clone, Serialize)]
pub struct PersonAggregate {
  key:       String,
  members:   Vec<(ContactId, ContactRecord)>,
  composite: ContactRecord,
}

impl PersonAggregate {
  /// Build an aggregate from an ordered set of member contacts.
  pub fn new(
    key: impl Into<String>,
    members: Vec<(ContactId, ContactRecord)>,
  ) -> Self {
    let mut aggregate = Self {
      key: key.into(),
      members,
      composite: ContactRecord::default(),
    };
    aggregate.reload();
    aggregate
  }

  /// Build a singleton aggregate from one contact.
  pub fn from_single(
    key: impl Into<String>,
    contact_id: ContactId,
    record: ContactRecord,
  ) -> Self {
    Self::new(key, vec![(contact_id, record)])
  }

  pub fn key(&self) -> &str { &self.key }

  /// False only for an aggregate with zero member contacts.
  pub fn is_valid(&self) -> bool { !self.members.is_empty() }

  pub fn len(&self) -> usize { self.members.len() }

  pub fn is_empty(&self) -> bool { self.members.is_empty() }

  /// The folded composite view of all members.
  pub fn composite(&self) -> &ContactRecord { &self.composite }

  pub fn contact(&self, contact_id: &ContactId) -> Option<&ContactRecord> {
    self
      .members
      .iter()
      .find(|(id, _)| id == contact_id)
      .map(|(_, record)| record)
  }

  pub fn contact_ids(&self) -> impl Iterator<Item = &ContactId> {
    self.members.iter().map(|(id, _)| id)
  }

  pub fn records(&self) -> impl Iterator<Item = &ContactRecord> {
    self.members.iter().map(|(_, record)| record)
  }

  pub fn contains(&self, contact_id: &ContactId) -> bool {
    self.members.iter().any(|(id, _)| id == contact_id)
  }

  /// Insert or replace a member record, then recompute the composite.
  /// An existing member keeps its position in the precedence order.
  pub fn update_contact(&mut self, contact_id: ContactId, record: ContactRecord) {
    match self.members.iter_mut().find(|(id, _)| *id == contact_id) {
      Some((_, slot)) => *slot = record,
      None => self.members.push((contact_id, record)),
    }
    self.reload();
  }

  /// Remove a member and recompute. Returns the record if it was present.
  pub fn remove_contact(&mut self, contact_id: &ContactId) -> Option<ContactRecord> {
    let pos = self.members.iter().position(|(id, _)| id == contact_id)?;
    let (_, record) = self.members.remove(pos);
    self.reload();
    Some(record)
  }

  fn reload(&mut self) {
    let records: Vec<ContactRecord> =
      self.members.iter().map(|(_, r)| r.clone()).collect();
    self.composite = merge_records(&records);
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
