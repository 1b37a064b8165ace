//! Tests for `StageType`.

use super::StageType;

#[test]
fn display_stem() {
  assert_eq!(StageType::Stem.to_string(), "stem");
}

#[test]
fn display_branch() {
  assert_eq!(StageType::Branch.to_string(), "branch");
}

#[test]
fn children_keep_parent_type() {
  assert_eq!(StageType::Stem.child_type(), StageType::Stem);
  assert_eq!(StageType::Branch.child_type(), StageType::Branch);
}

#[test]
fn serializes_lowercase() {
  assert_eq!(serde_json::to_string(&StageType::Branch).unwrap(), "\"branch\"");
}
