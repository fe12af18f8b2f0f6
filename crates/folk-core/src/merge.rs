//! The field merger — folds member records into one composite record.
//!
//! Precedence is positional: records are folded in the order given, single
//! fields go to the first record with a non-empty value, multi fields union
//! in order with exact duplicates skipped. The fold is pure and idempotent.

use crate::record::{ContactRecord, non_empty};

/// Fold `records` into one composite record.
///
/// - Zero records yields the empty record.
/// - One record is returned as-is (fast path, no field walk).
/// - Otherwise: first-non-empty wins for single fields, ordered
///   duplicate-free union for multi fields.
pub fn merge_records(records: &[ContactRecord]) -> ContactRecord {
  if records.len() == 1 {
    return records[0].clone();
  }

  let mut composite = ContactRecord::default();
  for record in records {
    fold_into(&mut composite, record);
  }
  composite
}

fn fold_into(composite: &mut ContactRecord, record: &ContactRecord) {
  // Multi-valued fields: union in order, skipping exact duplicates.
  union_into(&mut composite.emails, &record.emails);
  union_into(&mut composite.phones, &record.phones);
  union_into(&mut composite.im_handles, &record.im_handles);
  union_into(&mut composite.addresses, &record.addresses);
  union_into(&mut composite.categories, &record.categories);
  union_into(&mut composite.keys, &record.keys);
  union_into(&mut composite.groups, &record.groups);

  // Single-valued fields: first non-empty wins, later records never
  // override an already-set value.
  first_wins(&mut composite.name, &record.name);
  first_wins(&mut composite.formatted_name, &record.formatted_name);
  first_wins(&mut composite.family_name, &record.family_name);
  first_wins(&mut composite.given_name, &record.given_name);
  first_wins(&mut composite.additional_name, &record.additional_name);
  first_wins(&mut composite.prefix, &record.prefix);
  first_wins(&mut composite.suffix, &record.suffix);
  first_wins(&mut composite.nickname, &record.nickname);
  first_wins(&mut composite.photo, &record.photo);
}

fn union_into(target: &mut Vec<String>, values: &[String]) {
  for value in values {
    if !target.contains(value) {
      target.push(value.clone());
    }
  }
}

fn first_wins(target: &mut Option<String>, value: &Option<String>) {
  if non_empty(target).is_none()
    && let Some(v) = non_empty(value)
  {
    *target = Some(v.to_owned());
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  fn al() -> ContactRecord {
    ContactRecord {
      name: Some("Al".into()),
      emails: vec!["a@x.com".into()],
      ..Default::default()
    }
  }

  fn robert() -> ContactRecord {
    ContactRecord {
      name: Some("Robert".into()),
      nickname: Some("Bob".into()),
      emails: vec!["a@x.com".into(), "bob@x.com".into()],
      phones: vec!["+1555".into()],
      ..Default::default()
    }
  }

  #[test]
  fn empty_input_yields_empty_composite() {
    assert!(merge_records(&[]).is_empty());
  }

  #[test]
  fn single_record_returned_unchanged() {
    assert_eq!(merge_records(&[al()]), al());
  }

  #[test]
  fn first_non_empty_wins_for_single_fields() {
    let composite = merge_records(&[al(), robert()]);
    assert_eq!(composite.name.as_deref(), Some("Al"));
    // Al has no nickname, so Robert's fills the gap.
    assert_eq!(composite.nickname.as_deref(), Some("Bob"));
  }

  #[test]
  fn multi_fields_union_in_order_without_duplicates() {
    let composite = merge_records(&[al(), robert()]);
    assert_eq!(composite.emails, &["a@x.com", "bob@x.com"]);
    assert_eq!(composite.phones, &["+1555"]);
  }

  #[test]
  fn empty_string_does_not_claim_a_single_field() {
    let blank = ContactRecord {
      name: Some(String::new()),
      ..Default::default()
    };
    let composite = merge_records(&[blank, al()]);
    assert_eq!(composite.name.as_deref(), Some("Al"));
  }

  #[test]
  fn merge_is_idempotent() {
    let once = merge_records(&[al(), robert()]);
    let twice = merge_records(&[once.clone(), once.clone()]);
    assert_eq!(once, twice);
  }
}
