//! Line-oriented edit scripts.
//!
//! One command per line: `append <node-id>` or `fork <node-id>`. Blank lines
//! and `#` / `//` comments are ignored. Verbs are case-insensitive.
//!
//! ```text
//! # grow the spine, then fork below the new stage
//! append stage_0
//! fork stage_1
//! ```

use tracing::instrument;

use crate::types::{EditAction, EditCommand};

/// Parses a script into commands. Errors name the offending 1-based line.
#[instrument(level = "trace", skip(source))]
pub fn parse_script(source: &str) -> Result<Vec<EditCommand>, String> {
  let mut commands = Vec::new();
  for (i, raw) in source.lines().enumerate() {
    let line = strip_comment(raw).trim();
    if line.is_empty() {
      continue;
    }
    let command = parse_line(line).map_err(|e| format!("line {}: {}", i + 1, e))?;
    commands.push(command);
  }
  Ok(commands)
}

/// Drops everything from the first `#` or `//` on.
pub(crate) fn strip_comment(line: &str) -> &str {
  let cut = [line.find('#'), line.find("//")]
    .into_iter()
    .flatten()
    .min()
    .unwrap_or(line.len());
  &line[..cut]
}

fn parse_line(line: &str) -> Result<EditCommand, String> {
  let mut words = line.split_whitespace();
  let verb = words.next().ok_or("expected a command")?;
  let action = parse_action(verb)?;
  let target = words
    .next()
    .ok_or_else(|| format!("'{}' needs a target node id", verb))?;
  if !is_node_id(target) {
    return Err(format!("invalid node id '{}'", target));
  }
  if let Some(extra) = words.next() {
    return Err(format!("unexpected '{}' after node id", extra));
  }
  Ok(EditCommand {
    action,
    target: target.into(),
  })
}

fn parse_action(verb: &str) -> Result<EditAction, String> {
  if verb.eq_ignore_ascii_case("append") {
    Ok(EditAction::AppendStage)
  } else if verb.eq_ignore_ascii_case("fork") {
    Ok(EditAction::AddFork)
  } else {
    Err(format!("unknown command '{}' (expected 'append' or 'fork')", verb))
  }
}

/// Node ids are ASCII alphanumerics, `_` and `-`.
pub(crate) fn is_node_id(s: &str) -> bool {
  !s.is_empty()
    && s
      .chars()
      .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
