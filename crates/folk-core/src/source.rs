//! The contact-source seam.
//!
//! Concrete sources (address book, IM roster, mail) live outside this
//! workspace; they implement [`ContactSource`] and are registered
//! explicitly at startup. The engine only ever sees plain records and
//! events through this trait.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::record::{ContactId, ContactRecord};

/// A change in a source's contact collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceEvent {
  Added {
    contact_id: ContactId,
    record:     ContactRecord,
  },
  Changed {
    contact_id: ContactId,
    record:     ContactRecord,
  },
  Removed {
    contact_id: ContactId,
  },
}

/// One backend's view of its contacts: a snapshot for initial population
/// plus a live event stream.
///
/// Fetches are asynchronous and must not be assumed to complete in
/// issuance order; a failed fetch is the source's per-item problem and must
/// never poison the engine.
pub trait ContactSource: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Short stable name for diagnostics (e.g. `"addressbook"`).
  fn name(&self) -> &str;

  /// The source's current contacts, keyed by contact id. Keying by id
  /// guarantees the engine can never be handed the same contact twice.
  async fn current_contacts(
    &self,
  ) -> Result<HashMap<ContactId, ContactRecord>, Self::Error>;

  /// Subscribe to the live add/change/remove stream.
  fn subscribe(&self) -> broadcast::Receiver<SourceEvent>;
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn events_serialise_with_a_kind_tag() {
    let event = SourceEvent::Added {
      contact_id: ContactId::new("a"),
      record:     ContactRecord {
        name: Some("Al".into()),
        ..Default::default()
      },
    };

    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["kind"], "added");
    assert_eq!(json["contact_id"], "a");

    let back: SourceEvent = serde_json::from_value(json).unwrap();
    assert_eq!(back, event);
  }

  #[test]
  fn removed_round_trips() {
    let event = SourceEvent::Removed {
      contact_id: ContactId::new("gone"),
    };
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["kind"], "removed");
    let back: SourceEvent = serde_json::from_value(json).unwrap();
    assert_eq!(back, event);
  }
}
