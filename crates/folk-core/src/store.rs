//! The `IdentityStore` trait — the persistence boundary for merge state.
//!
//! The trait is implemented by storage backends (e.g. `folk-store-sqlite`).
//! The engine and the CLI depend on this abstraction, not on any concrete
//! backend.

use std::collections::HashMap;
use std::future::Future;

use crate::record::{ContactId, PersonId};

/// Abstraction over the durable contact → person mapping.
///
/// Every mutating operation is all-or-nothing: on failure no partial
/// mapping state is observable. Implementations publish a
/// [`PersonChange`](crate::notify::PersonChange) per affected contact only
/// after the mutation is durably committed.
///
/// All methods return `Send` futures so the trait can be used from
/// multi-threaded async runtimes.
pub trait IdentityStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Unite the given identities under one person.
  ///
  /// `ids` may mix raw contact ids and `folk://` person uris. Fewer than
  /// two parties is a validation failure: `Ok(None)`, no state change.
  /// Otherwise returns the surviving person id — the first person uri
  /// among the inputs, or a freshly allocated id when all inputs are raw
  /// contacts.
  fn merge_contacts<'a>(
    &'a self,
    ids: &'a [String],
  ) -> impl Future<Output = Result<Option<PersonId>, Self::Error>> + Send + 'a;

  /// Detach an identity.
  ///
  /// A person uri dissolves the whole person (every member reverts to
  /// standalone); a raw contact id detaches just that contact. Returns
  /// whether any mapping row was actually deleted — an unknown id is a
  /// successful no-op reporting `false`.
  fn unmerge_contact<'a>(
    &'a self,
    id: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// The full mapping, person → member contacts. Used to rehydrate
  /// aggregates on startup.
  fn all_persons(
    &self,
  ) -> impl Future<Output = Result<HashMap<PersonId, Vec<ContactId>>, Self::Error>>
  + Send
  + '_;

  /// Member contacts of one person; unknown persons yield an empty list.
  fn contacts_for_person(
    &self,
    person_id: PersonId,
  ) -> impl Future<Output = Result<Vec<ContactId>, Self::Error>> + Send + '_;

  /// The person uri a contact belongs to, or the contact id itself when it
  /// has no mapping ("identity is itself", never an error).
  fn person_for_contact<'a>(
    &'a self,
    contact_id: &'a ContactId,
  ) -> impl Future<Output = Result<String, Self::Error>> + Send + 'a;
}
