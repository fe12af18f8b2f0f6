//! Identity-change notifications and the broadcast bus carrying them.
//!
//! The bus decouples the identity store from any specific transport: the
//! in-process default is a tokio broadcast channel, and an IPC bridge can
//! republish the same messages to other processes. Delivery is
//! fire-and-forget with at-least-once semantics, so consumers must apply
//! changes idempotently.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::record::{ContactId, PersonId};

/// A change to the persisted contact → person mapping.
///
/// On reassignment the store emits `RemovedFromPerson` before
/// `AddedToPerson`, once per contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PersonChange {
  AddedToPerson {
    contact_id: ContactId,
    person_id:  PersonId,
  },
  RemovedFromPerson {
    contact_id: ContactId,
  },
}

/// Cloneable handle on the shared notification channel.
#[derive(Debug, Clone)]
pub struct ChangeBus {
  sender: broadcast::Sender<PersonChange>,
}

impl ChangeBus {
  pub fn new(capacity: usize) -> Self {
    let (sender, _) = broadcast::channel(capacity);
    Self { sender }
  }

  /// Broadcast a change. A send error only means no receiver is currently
  /// subscribed, which is fine for fire-and-forget delivery.
  pub fn publish(&self, change: PersonChange) {
    let _ = self.sender.send(change);
  }

  pub fn subscribe(&self) -> broadcast::Receiver<PersonChange> {
    self.sender.subscribe()
  }
}

impl Default for ChangeBus {
  fn default() -> Self { Self::new(64) }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn publish_reaches_every_subscriber() {
    let bus = ChangeBus::default();
    let mut rx1 = bus.subscribe();
    let mut rx2 = bus.subscribe();

    let change = PersonChange::AddedToPerson {
      contact_id: ContactId::new("a"),
      person_id:  PersonId(1),
    };
    bus.publish(change.clone());

    assert_eq!(rx1.recv().await.unwrap(), change);
    assert_eq!(rx2.recv().await.unwrap(), change);
  }

  #[test]
  fn publish_without_subscribers_does_not_panic() {
    let bus = ChangeBus::default();
    bus.publish(PersonChange::RemovedFromPerson {
      contact_id: ContactId::new("a"),
    });
  }
}
