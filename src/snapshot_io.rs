//! Pipeline snapshot files.
//!
//! A snapshot file is the pretty-printed JSON of a [GraphSnapshot]. Saving
//! writes a sibling `.tmp` file and renames it over the target, so a reader
//! never sees a half-written snapshot. Loading rejects unknown format versions
//! before any structural checks run.

use std::io::{Error, ErrorKind};
use std::path::{Path, PathBuf};

use tracing::{debug, instrument};

use crate::config::EditorConfig;
use crate::editor::PipelineEditor;
use crate::graph_model::{GraphSnapshot, SNAPSHOT_VERSION};

/// Default filename for a pipeline snapshot.
pub const SNAPSHOT_FILENAME: &str = "pipeline.json";

fn invalid_data(e: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Error {
  Error::new(ErrorKind::InvalidData, e)
}

fn temp_path(path: &Path) -> PathBuf {
  let mut name = path.file_name().unwrap_or_default().to_os_string();
  name.push(".tmp");
  path.with_file_name(name)
}

/// Writes `snapshot` to `path`, creating parent directories and replacing any
/// existing file in one rename.
#[instrument(level = "trace", skip(path, snapshot), fields(path = %path.display()))]
pub fn save_snapshot(path: &Path, snapshot: &GraphSnapshot) -> Result<(), Error> {
  let json = serde_json::to_string_pretty(snapshot).map_err(invalid_data)?;
  if let Some(parent) = path.parent() {
    std::fs::create_dir_all(parent)?;
  }
  let tmp = temp_path(path);
  std::fs::write(&tmp, json)?;
  std::fs::rename(&tmp, path)?;
  debug!(
    nodes = snapshot.nodes.len(),
    links = snapshot.links.len(),
    "snapshot saved"
  );
  Ok(())
}

/// Reads a snapshot from `path`.
///
/// Missing files keep their `NotFound` kind. Malformed JSON and snapshots of
/// another format version are `InvalidData`.
#[instrument(level = "trace", skip(path), fields(path = %path.display()))]
pub fn load_snapshot(path: &Path) -> Result<GraphSnapshot, Error> {
  let bytes = std::fs::read(path)?;
  let snapshot: GraphSnapshot = serde_json::from_slice(&bytes).map_err(invalid_data)?;
  if snapshot.version != SNAPSHOT_VERSION {
    return Err(invalid_data(format!(
      "unsupported snapshot version {} (expected {})",
      snapshot.version, SNAPSHOT_VERSION
    )));
  }
  Ok(snapshot)
}

/// Loads the snapshot at `path` and restores an editor from it. Structural
/// problems in the file surface as `InvalidData`.
pub fn restore_editor(path: &Path, config: EditorConfig) -> Result<PipelineEditor, Error> {
  let snapshot = load_snapshot(path)?;
  PipelineEditor::from_snapshot(&snapshot, config).map_err(invalid_data)
}
