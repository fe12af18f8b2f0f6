//! [`SqliteStore`] — the SQLite implementation of [`IdentityStore`].

use std::{collections::HashMap, path::Path};

use rusqlite::OptionalExtension as _;

use folk_core::{
  notify::{ChangeBus, PersonChange},
  record::{ContactId, PersonId},
  store::IdentityStore,
};

use crate::{Error, Result, schema::SCHEMA};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Folk identity store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted and the bus
/// is a channel handle. Mutations run in one transaction each; the change
/// bus sees a mutation only after its transaction has committed, so
/// listeners can never observe mapping state that was later rolled back.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
  bus:  ChangeBus,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>, bus: ChangeBus) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn, bus };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory(bus: ChangeBus) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn, bus };
    store.init_schema().await?;
    Ok(store)
  }

  /// The notification channel this store publishes on.
  pub fn bus(&self) -> &ChangeBus { &self.bus }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  fn publish_all(&self, changes: Vec<PersonChange>) {
    for change in changes {
      self.bus.publish(change);
    }
  }
}

// ─── Transaction helpers ─────────────────────────────────────────────────────

/// The next free person id: `max(person_id) + 1`, starting at 1.
fn next_person_id(tx: &rusqlite::Transaction<'_>) -> rusqlite::Result<i64> {
  let max: Option<i64> = tx.query_row(
    "SELECT MAX(person_id) FROM persons",
    [],
    |row| row.get(0),
  )?;
  Ok(max.unwrap_or(0) + 1)
}

fn member_contacts(
  tx: &rusqlite::Transaction<'_>,
  person: PersonId,
) -> rusqlite::Result<Vec<String>> {
  let mut stmt =
    tx.prepare("SELECT contact_id FROM persons WHERE person_id = ?1")?;
  let rows = stmt
    .query_map([person.0], |row| row.get::<_, String>(0))?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(rows)
}

// ─── IdentityStore impl ──────────────────────────────────────────────────────

impl IdentityStore for SqliteStore {
  type Error = Error;

  async fn merge_contacts(&self, ids: &[String]) -> Result<Option<PersonId>> {
    // Partition into existing person uris and raw contact ids.
    let mut persons: Vec<PersonId> = Vec::new();
    let mut contacts: Vec<String> = Vec::new();
    for id in ids {
      match PersonId::from_uri(id).map_err(Error::Core)? {
        Some(person) => persons.push(person),
        None => contacts.push(id.clone()),
      }
    }

    // Merging requires at least two parties.
    if persons.len() + contacts.len() < 2 {
      return Ok(None);
    }

    let persons_only = persons.len() > 1 && contacts.is_empty();
    let first_person = persons.first().copied();

    let (target, changes) = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let target = match first_person {
          Some(person) => person,
          None => PersonId(next_person_id(&tx)?),
        };

        let mut changes = Vec::new();

        if persons_only {
          // Reassign the members of every other person to the target.
          for person in persons.iter().filter(|p| **p != target) {
            for contact_id in member_contacts(&tx, *person)? {
              tx.execute(
                "UPDATE persons SET person_id = ?1 WHERE contact_id = ?2",
                rusqlite::params![target.0, contact_id],
              )?;
              changes.push(PersonChange::RemovedFromPerson {
                contact_id: ContactId::new(contact_id.clone()),
              });
              changes.push(PersonChange::AddedToPerson {
                contact_id: ContactId::new(contact_id),
                person_id:  target,
              });
            }
          }
        } else {
          // Raw contacts are newly inserted under the target.
          for contact_id in &contacts {
            tx.execute(
              "INSERT INTO persons (contact_id, person_id) VALUES (?1, ?2)",
              rusqlite::params![contact_id, target.0],
            )?;
            changes.push(PersonChange::AddedToPerson {
              contact_id: ContactId::new(contact_id.clone()),
              person_id:  target,
            });
          }
        }

        tx.commit()?;
        Ok((target, changes))
      })
      .await?;

    tracing::debug!(person = %target, affected = changes.len(), "merged contacts");
    self.publish_all(changes);
    Ok(Some(target))
  }

  async fn unmerge_contact(&self, id: &str) -> Result<bool> {
    let (deleted, changes) = match PersonId::from_uri(id).map_err(Error::Core)? {
      // Dissolve the whole person.
      Some(person) => {
        self
          .conn
          .call(move |conn| {
            let tx = conn.transaction()?;
            let members = member_contacts(&tx, person)?;
            tx.execute(
              "DELETE FROM persons WHERE person_id = ?1",
              [person.0],
            )?;
            tx.commit()?;

            let changes = members
              .into_iter()
              .map(|contact_id| PersonChange::RemovedFromPerson {
                contact_id: ContactId::new(contact_id),
              })
              .collect::<Vec<_>>();
            Ok((!changes.is_empty(), changes))
          })
          .await?
      }

      // Detach a single contact back to standalone identity.
      None => {
        let contact_id = id.to_owned();
        self
          .conn
          .call(move |conn| {
            let tx = conn.transaction()?;
            let rows = tx.execute(
              "DELETE FROM persons WHERE contact_id = ?1",
              [contact_id.clone()],
            )?;
            tx.commit()?;

            let changes = if rows > 0 {
              vec![PersonChange::RemovedFromPerson {
                contact_id: ContactId::new(contact_id),
              }]
            } else {
              Vec::new()
            };
            Ok((rows > 0, changes))
          })
          .await?
      }
    };

    tracing::debug!(id, deleted, "unmerged");
    self.publish_all(changes);
    Ok(deleted)
  }

  async fn all_persons(&self) -> Result<HashMap<PersonId, Vec<ContactId>>> {
    let rows: Vec<(i64, String)> = self
      .conn
      .call(|conn| {
        let mut stmt =
          conn.prepare("SELECT person_id, contact_id FROM persons")?;
        let rows = stmt
          .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    let mut mapping: HashMap<PersonId, Vec<ContactId>> = HashMap::new();
    for (person_id, contact_id) in rows {
      mapping
        .entry(PersonId(person_id))
        .or_default()
        .push(ContactId::new(contact_id));
    }
    Ok(mapping)
  }

  async fn contacts_for_person(&self, person_id: PersonId) -> Result<Vec<ContactId>> {
    let contacts: Vec<String> = self
      .conn
      .call(move |conn| {
        let mut stmt =
          conn.prepare("SELECT contact_id FROM persons WHERE person_id = ?1")?;
        let rows = stmt
          .query_map([person_id.0], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(contacts.into_iter().map(ContactId::new).collect())
  }

  async fn person_for_contact(&self, contact_id: &ContactId) -> Result<String> {
    let id = contact_id.as_str().to_owned();
    let person: Option<i64> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT person_id FROM persons WHERE contact_id = ?1",
              [id],
              |row| row.get(0),
            )
            .optional()?,
        )
      })
      .await?;

    Ok(match person {
      Some(n) => PersonId(n).uri(),
      // No mapping: the contact is its own identity.
      None => contact_id.as_str().to_owned(),
    })
  }
}
