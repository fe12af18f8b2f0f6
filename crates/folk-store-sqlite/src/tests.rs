//! Integration tests for `SqliteStore` against an in-memory database.

use folk_core::{
  notify::{ChangeBus, PersonChange},
  record::{ContactId, PersonId},
  store::IdentityStore,
};

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory(ChangeBus::default())
    .await
    .expect("in-memory store")
}

fn ids(ids: &[&str]) -> Vec<String> {
  ids.iter().map(|s| s.to_string()).collect()
}

// ─── Merging ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn merge_two_contacts_allocates_a_person() {
  let s = store().await;

  let person = s.merge_contacts(&ids(&["c1", "c2"])).await.unwrap();
  assert_eq!(person, Some(PersonId(1)));

  let members = s.contacts_for_person(PersonId(1)).await.unwrap();
  assert_eq!(members, vec![ContactId::new("c1"), ContactId::new("c2")]);
}

#[tokio::test]
async fn merge_single_id_is_rejected_without_state_change() {
  let s = store().await;

  let person = s.merge_contacts(&ids(&["c1"])).await.unwrap();
  assert_eq!(person, None);

  assert!(s.all_persons().await.unwrap().is_empty());
}

#[tokio::test]
async fn merge_empty_input_is_rejected() {
  let s = store().await;
  assert_eq!(s.merge_contacts(&[]).await.unwrap(), None);
}

#[tokio::test]
async fn person_ids_allocate_monotonically() {
  let s = store().await;

  let p1 = s.merge_contacts(&ids(&["a", "b"])).await.unwrap().unwrap();
  let p2 = s.merge_contacts(&ids(&["c", "d"])).await.unwrap().unwrap();
  assert_eq!(p1, PersonId(1));
  assert_eq!(p2, PersonId(2));
}

#[tokio::test]
async fn merge_contact_into_existing_person() {
  let s = store().await;

  let person = s.merge_contacts(&ids(&["a", "b"])).await.unwrap().unwrap();
  let uri = person.uri();
  let again = s.merge_contacts(&ids(&[uri.as_str(), "c"])).await.unwrap();

  // The existing person id is reused as the target.
  assert_eq!(again, Some(person));
  let members = s.contacts_for_person(person).await.unwrap();
  assert_eq!(members.len(), 3);
  assert!(members.contains(&ContactId::new("c")));
}

#[tokio::test]
async fn merge_two_persons_reassigns_members_to_the_first() {
  let s = store().await;

  let p1 = s.merge_contacts(&ids(&["c1", "c2"])).await.unwrap().unwrap();
  let p2 = s.merge_contacts(&ids(&["c3", "c4"])).await.unwrap().unwrap();

  let (u1, u2) = (p1.uri(), p2.uri());
  let merged = s
    .merge_contacts(&ids(&[u1.as_str(), u2.as_str()]))
    .await
    .unwrap();
  assert_eq!(merged, Some(p1));

  // p1 absorbed everything; p2 is gone.
  let members = s.contacts_for_person(p1).await.unwrap();
  assert_eq!(members.len(), 4);
  assert!(s.contacts_for_person(p2).await.unwrap().is_empty());

  let mapping = s.all_persons().await.unwrap();
  assert_eq!(mapping.len(), 1);
}

#[tokio::test]
async fn merge_malformed_person_uri_errors() {
  let s = store().await;
  let err = s
    .merge_contacts(&ids(&["folk://bogus", "c1"]))
    .await
    .unwrap_err();
  assert!(matches!(err, crate::Error::Core(_)));
}

// ─── Unmerging ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn merge_unmerge_round_trip_restores_standalone_identity() {
  let s = store().await;

  let person = s.merge_contacts(&ids(&["c1", "c2"])).await.unwrap().unwrap();
  assert_eq!(
    s.person_for_contact(&ContactId::new("c1")).await.unwrap(),
    person.uri()
  );

  assert!(s.unmerge_contact(&person.uri()).await.unwrap());

  assert_eq!(
    s.person_for_contact(&ContactId::new("c1")).await.unwrap(),
    "c1"
  );
  assert_eq!(
    s.person_for_contact(&ContactId::new("c2")).await.unwrap(),
    "c2"
  );
}

#[tokio::test]
async fn unmerge_single_contact_detaches_only_it() {
  let s = store().await;

  let person = s
    .merge_contacts(&ids(&["c1", "c2", "c3"]))
    .await
    .unwrap()
    .unwrap();

  assert!(s.unmerge_contact("c2").await.unwrap());

  let members = s.contacts_for_person(person).await.unwrap();
  assert_eq!(members, vec![ContactId::new("c1"), ContactId::new("c3")]);
  assert_eq!(
    s.person_for_contact(&ContactId::new("c2")).await.unwrap(),
    "c2"
  );
}

#[tokio::test]
async fn unmerge_unknown_id_is_a_no_op_reporting_false() {
  let s = store().await;
  assert!(!s.unmerge_contact("never-seen").await.unwrap());
  assert!(!s.unmerge_contact("folk://999").await.unwrap());
}

// ─── Lookups ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn unmapped_contact_is_its_own_identity() {
  let s = store().await;
  assert_eq!(
    s.person_for_contact(&ContactId::new("loner")).await.unwrap(),
    "loner"
  );
}

#[tokio::test]
async fn all_persons_groups_by_person() {
  let s = store().await;

  let p1 = s.merge_contacts(&ids(&["a", "b"])).await.unwrap().unwrap();
  let p2 = s.merge_contacts(&ids(&["c", "d"])).await.unwrap().unwrap();

  let mapping = s.all_persons().await.unwrap();
  assert_eq!(mapping.len(), 2);
  assert_eq!(mapping[&p1].len(), 2);
  assert_eq!(mapping[&p2].len(), 2);
}

// ─── Notifications ───────────────────────────────────────────────────────────

#[tokio::test]
async fn merge_notifies_added_per_contact() {
  let bus = ChangeBus::default();
  let mut rx = bus.subscribe();
  let s = SqliteStore::open_in_memory(bus).await.unwrap();

  let person = s.merge_contacts(&ids(&["c1", "c2"])).await.unwrap().unwrap();

  assert_eq!(
    rx.recv().await.unwrap(),
    PersonChange::AddedToPerson {
      contact_id: ContactId::new("c1"),
      person_id:  person,
    }
  );
  assert_eq!(
    rx.recv().await.unwrap(),
    PersonChange::AddedToPerson {
      contact_id: ContactId::new("c2"),
      person_id:  person,
    }
  );
}

#[tokio::test]
async fn person_merge_notifies_removed_then_added_per_moved_contact() {
  let bus = ChangeBus::default();
  let s = SqliteStore::open_in_memory(bus.clone()).await.unwrap();

  let p1 = s.merge_contacts(&ids(&["c1", "c2"])).await.unwrap().unwrap();
  let p2 = s.merge_contacts(&ids(&["c3"])).await.unwrap();
  assert_eq!(p2, None); // single id: no person created

  let p2 = s.merge_contacts(&ids(&["c3", "c4"])).await.unwrap().unwrap();

  let (u1, u2) = (p1.uri(), p2.uri());
  let mut rx = bus.subscribe();
  s.merge_contacts(&ids(&[u1.as_str(), u2.as_str()])).await.unwrap();

  // Each of p2's members leaves p2 then joins p1, in that order.
  for contact in ["c3", "c4"] {
    assert_eq!(
      rx.recv().await.unwrap(),
      PersonChange::RemovedFromPerson {
        contact_id: ContactId::new(contact),
      }
    );
    assert_eq!(
      rx.recv().await.unwrap(),
      PersonChange::AddedToPerson {
        contact_id: ContactId::new(contact),
        person_id:  p1,
      }
    );
  }
}

#[tokio::test]
async fn unmerge_person_notifies_removed_per_member() {
  let bus = ChangeBus::default();
  let s = SqliteStore::open_in_memory(bus.clone()).await.unwrap();

  let person = s.merge_contacts(&ids(&["c1", "c2"])).await.unwrap().unwrap();

  let mut rx = bus.subscribe();
  s.unmerge_contact(&person.uri()).await.unwrap();

  let mut removed = vec![
    match rx.recv().await.unwrap() {
      PersonChange::RemovedFromPerson { contact_id } => contact_id,
      other => panic!("unexpected change: {other:?}"),
    },
    match rx.recv().await.unwrap() {
      PersonChange::RemovedFromPerson { contact_id } => contact_id,
      other => panic!("unexpected change: {other:?}"),
    },
  ];
  removed.sort();
  assert_eq!(removed, vec![ContactId::new("c1"), ContactId::new("c2")]);
}

#[tokio::test]
async fn no_op_unmerge_publishes_nothing() {
  let bus = ChangeBus::default();
  let s = SqliteStore::open_in_memory(bus.clone()).await.unwrap();

  let mut rx = bus.subscribe();
  s.unmerge_contact("ghost").await.unwrap();

  assert!(matches!(
    rx.try_recv(),
    Err(tokio::sync::broadcast::error::TryRecvError::Empty)
  ));
}
