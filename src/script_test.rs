//! Tests for edit script parsing.

use crate::script::{is_node_id, parse_script, strip_comment};
use crate::types::{EditAction, EditCommand};

#[test]
fn parses_commands_in_order() {
  let src = "append stage_0\nfork stage_1\nappend stage_3\n";
  let cmds = parse_script(src).unwrap();
  assert_eq!(
    cmds,
    vec![
      EditCommand::append("stage_0"),
      EditCommand::fork("stage_1"),
      EditCommand::append("stage_3"),
    ]
  );
}

#[test]
fn skips_blank_lines_and_comments() {
  let src = r#"
    # build a fork
    append stage_0   // spine grows

    FORK stage_1
  "#;
  let cmds = parse_script(src).unwrap();
  assert_eq!(cmds.len(), 2);
  assert_eq!(cmds[1].action, EditAction::AddFork);
}

#[test]
fn empty_script_is_ok() {
  assert!(parse_script("").unwrap().is_empty());
  assert!(parse_script("# nothing\n\n").unwrap().is_empty());
}

#[test]
fn unknown_verb_reports_line() {
  let err = parse_script("append stage_0\ndelete stage_1\n").unwrap_err();
  assert!(err.starts_with("line 2:"), "{}", err);
  assert!(err.contains("delete"));
}

#[test]
fn missing_target_is_error() {
  let err = parse_script("fork").unwrap_err();
  assert!(err.contains("needs a target"));
}

#[test]
fn trailing_tokens_are_error() {
  let err = parse_script("append stage_0 stage_1").unwrap_err();
  assert!(err.contains("unexpected 'stage_1'"));
}

#[test]
fn invalid_node_id_is_error() {
  let err = parse_script("append stage.0").unwrap_err();
  assert!(err.contains("invalid node id"));
}

#[test]
fn strip_comment_cuts_earliest_marker() {
  assert_eq!(strip_comment("append a // b # c"), "append a ");
  assert_eq!(strip_comment("fork a # b // c"), "fork a ");
  assert_eq!(strip_comment("fork a"), "fork a");
}

#[test]
fn node_id_charset() {
  assert!(is_node_id("stage_12"));
  assert!(is_node_id("my-stage"));
  assert!(!is_node_id(""));
  assert!(!is_node_id("a b"));
}
