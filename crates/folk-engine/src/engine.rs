//! [`Aggregator`] — the live collection of person aggregates.
//!
//! Aggregates live in an arena keyed by person key (a `folk://` uri for
//! merged persons, the contact's own id for singletons), with a separate
//! contact → key index. Moving a contact between aggregates is an index
//! update plus a record move; no aggregate ever owns another.

use std::collections::{BTreeMap, HashMap};

use folk_core::{
  aggregate::PersonAggregate,
  matcher::{self, Match, MatchValues},
  notify::PersonChange,
  record::{ContactId, ContactRecord},
  source::{ContactSource, SourceEvent},
  store::IdentityStore,
};
use tokio::sync::broadcast;

use crate::{Error, Result};

/// Maintains the person aggregates for every live contact, synchronized
/// with the identity store and the source event streams.
///
/// Invariant: every live contact id belongs to exactly one aggregate, and
/// an aggregate with zero members does not exist.
pub struct Aggregator<S: IdentityStore> {
  store:      S,
  /// Arena of aggregates. A BTreeMap so iteration (and thus the duplicate
  /// scan order) is deterministic.
  aggregates: BTreeMap<String, PersonAggregate>,
  /// contact id → key of the aggregate currently holding it.
  index:      HashMap<ContactId, String>,
}

impl<S: IdentityStore> Aggregator<S> {
  pub fn new(store: S) -> Self {
    Self {
      store,
      aggregates: BTreeMap::new(),
      index: HashMap::new(),
    }
  }

  pub fn store(&self) -> &S { &self.store }

  // ── Population ────────────────────────────────────────────────────────

  /// Initial population from one source: fetch its current contacts and
  /// group them under the store's mapping.
  pub async fn seed<Src: ContactSource>(&mut self, source: &Src) -> Result<()> {
    match source.current_contacts().await {
      Ok(contacts) => self.seed_contacts(contacts).await,
      // A failing source is skipped, not fatal; the collection stays
      // consistent with whatever was received before.
      Err(e) => {
        tracing::warn!(source = source.name(), error = %e, "source fetch failed, skipping");
        Ok(())
      }
    }
  }

  /// Group a batch of contacts under the store's person mapping.
  ///
  /// The batch is keyed by contact id, so the same contact cannot arrive
  /// twice. Contacts are inserted in id order to keep composite precedence
  /// deterministic across runs.
  pub async fn seed_contacts(
    &mut self,
    contacts: HashMap<ContactId, ContactRecord>,
  ) -> Result<()> {
    let mapping = self.store.all_persons().await.map_err(Error::store)?;
    let mut person_of: HashMap<ContactId, String> = HashMap::new();
    for (person_id, members) in mapping {
      for contact_id in members {
        person_of.insert(contact_id, person_id.uri());
      }
    }

    let mut batch: Vec<_> = contacts.into_iter().collect();
    batch.sort_by(|a, b| a.0.cmp(&b.0));

    for (contact_id, record) in batch {
      let key = person_of
        .get(&contact_id)
        .cloned()
        .unwrap_or_else(|| contact_id.as_str().to_owned());
      self.insert_under(key, contact_id, record);
    }
    Ok(())
  }

  // ── Source events ─────────────────────────────────────────────────────

  pub async fn apply_source_event(&mut self, event: SourceEvent) -> Result<()> {
    match event {
      SourceEvent::Added { contact_id, record } => {
        self.add_contact(contact_id, record).await
      }
      SourceEvent::Changed { contact_id, record } => {
        self.change_contact(contact_id, record).await
      }
      SourceEvent::Removed { contact_id } => {
        self.remove_contact(&contact_id);
        Ok(())
      }
    }
  }

  /// A new contact appeared at a source: look up its person and add it to
  /// the matching aggregate, or create a singleton.
  pub async fn add_contact(
    &mut self,
    contact_id: ContactId,
    record: ContactRecord,
  ) -> Result<()> {
    if let Some(key) = self.index.get(&contact_id).cloned() {
      // Duplicate add: treat as a change in place.
      self.update_in(&key, contact_id, record);
      return Ok(());
    }

    let key = self
      .store
      .person_for_contact(&contact_id)
      .await
      .map_err(Error::store)?;
    self.insert_under(key, contact_id, record);
    Ok(())
  }

  /// A contact's record changed: update it inside its current aggregate.
  pub async fn change_contact(
    &mut self,
    contact_id: ContactId,
    record: ContactRecord,
  ) -> Result<()> {
    match self.index.get(&contact_id).cloned() {
      Some(key) => {
        self.update_in(&key, contact_id, record);
        Ok(())
      }
      // Change for a contact we never saw added: degrade to an add.
      None => self.add_contact(contact_id, record).await,
    }
  }

  /// A contact disappeared from its source. Destroys the aggregate when
  /// the last member leaves.
  pub fn remove_contact(&mut self, contact_id: &ContactId) {
    let Some(key) = self.index.remove(contact_id) else {
      tracing::debug!(%contact_id, "remove for unknown contact, ignoring");
      return;
    };
    if let Some(aggregate) = self.aggregates.get_mut(&key) {
      aggregate.remove_contact(contact_id);
      if !aggregate.is_valid() {
        self.aggregates.remove(&key);
      }
    }
  }

  // ── Identity-change notifications ─────────────────────────────────────

  /// Apply a store notification, possibly originating in another process.
  ///
  /// Idempotent: a duplicate delivery finds the contact already in the
  /// right aggregate and does nothing.
  pub fn apply_change(&mut self, change: PersonChange) {
    match change {
      PersonChange::AddedToPerson {
        contact_id,
        person_id,
      } => {
        let target = person_id.uri();
        match self.index.get(&contact_id) {
          Some(key) if *key == target => {} // already there
          Some(_) => self.move_contact(&contact_id, target),
          None => {
            // The record hasn't arrived from any source yet; the grouping
            // will be picked up when it does.
            tracing::debug!(%contact_id, person = %person_id, "change for unknown contact, skipping");
          }
        }
      }
      PersonChange::RemovedFromPerson { contact_id } => {
        let standalone = contact_id.as_str().to_owned();
        match self.index.get(&contact_id) {
          Some(key) if *key == standalone => {} // already standalone
          Some(_) => self.move_contact(&contact_id, standalone),
          None => {
            tracing::debug!(%contact_id, "removal for unknown contact, skipping");
          }
        }
      }
    }
  }

  // ── Event loop ────────────────────────────────────────────────────────

  /// Serialized event handling: drain both streams on this task until both
  /// close. Lagged receivers are logged and resumed — dropped notifications
  /// only delay regrouping until the next event for that contact. A store
  /// failure while applying one event is likewise a per-item skip: the
  /// faulty event changes nothing, the loop keeps serving the rest.
  pub async fn run(
    &mut self,
    mut events: broadcast::Receiver<SourceEvent>,
    mut changes: broadcast::Receiver<PersonChange>,
  ) {
    let mut events_open = true;
    let mut changes_open = true;

    while events_open || changes_open {
      tokio::select! {
        event = events.recv(), if events_open => match event {
          Ok(event) => {
            if let Err(e) = self.apply_source_event(event).await {
              tracing::warn!(error = %e, "source event failed, skipping");
            }
          }
          Err(broadcast::error::RecvError::Lagged(n)) => {
            tracing::warn!(missed = n, "source event stream lagged");
          }
          Err(broadcast::error::RecvError::Closed) => events_open = false,
        },
        change = changes.recv(), if changes_open => match change {
          Ok(change) => self.apply_change(change),
          Err(broadcast::error::RecvError::Lagged(n)) => {
            tracing::warn!(missed = n, "change stream lagged");
          }
          Err(broadcast::error::RecvError::Closed) => changes_open = false,
        },
      }
    }
  }

  // ── Read surface ──────────────────────────────────────────────────────

  pub fn person(&self, key: &str) -> Option<&PersonAggregate> {
    self.aggregates.get(key)
  }

  pub fn person_for_contact(
    &self,
    contact_id: &ContactId,
  ) -> Option<&PersonAggregate> {
    self.index.get(contact_id).and_then(|k| self.aggregates.get(k))
  }

  pub fn people(&self) -> impl Iterator<Item = &PersonAggregate> {
    self.aggregates.values()
  }

  pub fn len(&self) -> usize { self.aggregates.len() }

  pub fn is_empty(&self) -> bool { self.aggregates.is_empty() }

  // ── Duplicate scanning ────────────────────────────────────────────────

  /// Snapshot of every aggregate's comparable values, in key order.
  /// Feed this to [`crate::spawn_scan`] to run the scan off-task.
  pub fn match_entries(&self) -> Vec<(String, MatchValues)> {
    self
      .aggregates
      .values()
      .map(|a| (a.key().to_owned(), MatchValues::for_aggregate(a)))
      .collect()
  }

  /// Inline full scan; prefer [`crate::spawn_scan`] for large collections.
  pub fn find_all_matches(&self) -> Vec<Match<String>> {
    matcher::find_all_matches(&self.match_entries())
  }

  /// Inline scan restricted to one aggregate key. An unknown key yields no
  /// matches.
  pub fn find_matches_for(&self, key: &str) -> Vec<Match<String>> {
    matcher::find_matches_for(&key.to_owned(), &self.match_entries())
  }

  // ── Internals ─────────────────────────────────────────────────────────

  fn insert_under(
    &mut self,
    key: String,
    contact_id: ContactId,
    record: ContactRecord,
  ) {
    self.index.insert(contact_id.clone(), key.clone());
    match self.aggregates.get_mut(&key) {
      Some(aggregate) => aggregate.update_contact(contact_id, record),
      None => {
        self
          .aggregates
          .insert(key.clone(), PersonAggregate::from_single(key, contact_id, record));
      }
    }
  }

  fn update_in(&mut self, key: &str, contact_id: ContactId, record: ContactRecord) {
    if let Some(aggregate) = self.aggregates.get_mut(key) {
      aggregate.update_contact(contact_id, record);
    }
  }

  /// Reparent a contact into the aggregate at `target`, recomputing the
  /// composite on both sides.
  fn move_contact(&mut self, contact_id: &ContactId, target: String) {
    let Some(old_key) = self.index.get(contact_id).cloned() else {
      return;
    };

    let record = match self.aggregates.get_mut(&old_key) {
      Some(old) => {
        let record = old.remove_contact(contact_id);
        if !old.is_valid() {
          self.aggregates.remove(&old_key);
        }
        record
      }
      None => None,
    };

    let Some(record) = record else {
      // Index said the contact was here but the aggregate disagrees;
      // drop the stale index entry.
      self.index.remove(contact_id);
      return;
    };

    self.insert_under(target, contact_id.clone(), record);
  }
}
