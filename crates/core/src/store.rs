//! On-disk macro storage.
//!
//! One JSON document per (profile, macro key) slot under
//! `<root>/profile_<p>/s<n>.json`, profiles numbered from 1. Slots are
//! replaced atomically, so a reader never sees a half-written macro.

use crate::error::{Error, Result};
use crate::macros::{Macro, MacroStep};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Current macro file schema version.
pub const SCHEMA_VERSION: u32 = 1;

fn schema_v1() -> u32 {
    1
}

#[derive(Debug, Serialize, Deserialize)]
struct MacroFile {
    #[serde(default = "schema_v1")]
    version: u32,
    steps: Vec<MacroStep>,
}

/// Serialize a macro in the current schema.
pub fn encode(m: &Macro) -> Result<Vec<u8>> {
    let file = MacroFile {
        version: SCHEMA_VERSION,
        steps: m.steps.clone(),
    };
    let mut bytes = serde_json::to_vec_pretty(&file)
        .map_err(|e| Error::MacroPersistence(format!("serialize: {e}")))?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Parse a macro file of this or an older schema.
pub fn decode(bytes: &[u8]) -> Result<Macro> {
    let file: MacroFile = serde_json::from_slice(bytes)
        .map_err(|e| Error::MacroPersistence(format!("parse: {e}")))?;
    if file.version > SCHEMA_VERSION {
        return Err(Error::MacroPersistence(format!(
            "unsupported schema version {} (newest known {SCHEMA_VERSION})",
            file.version
        )));
    }
    Ok(Macro { steps: file.steps })
}

/// Directory-backed macro store.
#[derive(Debug, Clone)]
pub struct MacroStore {
    root: PathBuf,
}

impl MacroStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn slot_path(&self, profile: usize, key: u8) -> PathBuf {
        self.root
            .join(format!("profile_{}", profile + 1))
            .join(format!("s{key}.json"))
    }

    /// Load a slot. `Ok(None)` when nothing is bound.
    pub fn load(&self, profile: usize, key: u8) -> Result<Option<Macro>> {
        let path = self.slot_path(profile, key);
        let bytes = match fs::read(&path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(Error::MacroPersistence(format!(
                    "read {}: {e}",
                    path.display()
                )))
            }
        };
        decode(&bytes)
            .map(Some)
            .map_err(|e| Error::MacroPersistence(format!("{}: {e}", path.display())))
    }

    /// Replace a slot with `m`.
    ///
    /// The new content is written to a temporary sibling and renamed over
    /// the old file; on failure the previous macro stays in place.
    pub fn save(&self, profile: usize, key: u8, m: &Macro) -> Result<()> {
        let path = self.slot_path(profile, key);
        let dir = path
            .parent()
            .ok_or_else(|| Error::MacroPersistence(format!("{} has no parent", path.display())))?;
        fs::create_dir_all(dir)
            .map_err(|e| Error::MacroPersistence(format!("create {}: {e}", dir.display())))?;

        let bytes = encode(m)?;
        let tmp = path.with_extension("json.tmp");
        let result = fs::write(&tmp, &bytes).and_then(|()| fs::rename(&tmp, &path));
        if let Err(e) = result {
            fs::remove_file(&tmp).ok();
            return Err(Error::MacroPersistence(format!(
                "write {}: {e}",
                path.display()
            )));
        }

        debug!(path = %path.display(), steps = m.steps.len(), "Macro saved");
        Ok(())
    }
}

/// Fresh, empty directory for one test.
#[cfg(test)]
pub(crate) fn scratch_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("sidewinderd-{tag}-{}", std::process::id()));
    fs::remove_dir_all(&dir).ok();
    fs::create_dir_all(&dir).unwrap();
    dir
}
