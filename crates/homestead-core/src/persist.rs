//! JSON file persistence for the assignment store.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info};

use crate::error::Result;
use crate::store::{AssignmentStore, StoreRecord};

/// Default file name inside a data directory.
pub const STORE_FILE_NAME: &str = "homestead.json";

/// A store record on disk.
#[derive(Debug, Clone)]
pub struct StoreFile {
    path: PathBuf,
}

impl StoreFile {
    /// Store file at an explicit path.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Store file with the default name inside `dir`.
    pub fn in_dir<P: AsRef<Path>>(dir: P) -> Self {
        Self::new(dir.as_ref().join(STORE_FILE_NAME))
    }

    /// Location of the record.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the store, never failing.
    ///
    /// A missing file yields an empty store. An unreadable or malformed record
    /// is logged, moved aside to `<name>.corrupt`, and replaced by an empty
    /// store at index 0.
    pub fn load(&self) -> AssignmentStore {
        if !self.path.exists() {
            info!(path = %self.path.display(), "No store record found, starting empty");
            return AssignmentStore::new();
        }

        match self.try_load() {
            Ok(store) => {
                info!(
                    path = %self.path.display(),
                    cursor = %store.cursor(),
                    assignments = store.len(),
                    "Loaded store record"
                );
                store
            }
            Err(e) => {
                error!(
                    path = %self.path.display(),
                    error = %e,
                    "Store record is corrupt, starting empty at index 0"
                );
                self.quarantine();
                AssignmentStore::new()
            }
        }
    }

    /// Load the store, surfacing read and parse errors.
    pub fn try_load(&self) -> Result<AssignmentStore> {
        let data = fs::read(&self.path)?;
        let record: StoreRecord = serde_json::from_slice(&data)?;
        AssignmentStore::from_record(record)
    }

    /// Write the store and clear its dirty flag.
    ///
    /// The record goes to a sibling temp file first and is renamed into place,
    /// so a crash mid-write leaves the previous record intact.
    pub fn save(&self, store: &mut AssignmentStore) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let data = serde_json::to_vec_pretty(&store.to_record())?;
        let tmp = self.sibling("tmp");
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(&data)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;

        store.mark_clean();
        debug!(
            path = %self.path.display(),
            cursor = %store.cursor(),
            assignments = store.len(),
            "Saved store record"
        );
        Ok(())
    }

    /// Save only when the store has unflushed changes. Returns whether it wrote.
    pub fn save_if_dirty(&self, store: &mut AssignmentStore) -> Result<bool> {
        if !store.is_dirty() {
            return Ok(false);
        }
        self.save(store)?;
        Ok(true)
    }

    fn sibling(&self, extension: &str) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".");
        name.push(extension);
        self.path.with_file_name(name)
    }

    fn quarantine(&self) {
        let target = self.sibling("corrupt");
        if let Err(e) = fs::rename(&self.path, &target) {
            error!(
                path = %self.path.display(),
                error = %e,
                "Failed to move corrupt store record aside"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::participant::ParticipantId;
    use homestead_topology::{HomePos, SpiralIndex};
    use tempfile::tempdir;

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempdir().unwrap();
        let file = StoreFile::in_dir(dir.path());

        let store = file.load();
        assert!(store.is_empty());
        assert_eq!(store.cursor(), SpiralIndex::ORIGIN);
    }

    #[test]
    fn save_then_load_roundtrip() {
        let dir = tempdir().unwrap();
        let file = StoreFile::in_dir(dir.path());
        let a = ParticipantId::from_name("a");
        let b = ParticipantId::from_name("b");

        let mut store = AssignmentStore::new();
        store.set_cursor(SpiralIndex(7));
        store.put_assignment(a, HomePos::new(8, 65, 8));
        store.put_assignment(b, HomePos::new(-392, 320, 408));
        file.save(&mut store).unwrap();
        assert!(!store.is_dirty());

        let loaded = file.load();
        assert_eq!(loaded.cursor(), SpiralIndex(7));
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.get_assignment(a), Some(HomePos::new(8, 65, 8)));
        assert_eq!(loaded.get_assignment(b), Some(HomePos::new(-392, 320, 408)));
    }

    #[test]
    fn save_if_dirty_skips_clean_store() {
        let dir = tempdir().unwrap();
        let file = StoreFile::in_dir(dir.path());

        let mut store = AssignmentStore::new();
        assert!(!file.save_if_dirty(&mut store).unwrap());
        assert!(!file.path().exists());

        store.set_cursor(SpiralIndex(1));
        assert!(file.save_if_dirty(&mut store).unwrap());
        assert!(file.path().exists());
        assert!(!file.save_if_dirty(&mut store).unwrap());
    }

    #[test]
    fn corrupt_file_loads_empty_and_is_kept_aside() {
        let dir = tempdir().unwrap();
        let file = StoreFile::in_dir(dir.path());
        fs::write(file.path(), b"{ not json").unwrap();

        assert!(file.try_load().is_err());
        let store = file.load();

        assert!(store.is_empty());
        assert_eq!(store.cursor(), SpiralIndex::ORIGIN);
        assert!(!file.path().exists());
        assert!(dir.path().join("homestead.json.corrupt").exists());
    }

    #[test]
    fn negative_index_is_corrupt() {
        let dir = tempdir().unwrap();
        let file = StoreFile::in_dir(dir.path());
        fs::write(file.path(), br#"{"spiral_index": -4, "assignments": []}"#).unwrap();

        let store = file.load();
        assert_eq!(store.cursor(), SpiralIndex::ORIGIN);
    }

    #[test]
    fn homes_without_cursor_are_quarantined() {
        let dir = tempdir().unwrap();
        let file = StoreFile::in_dir(dir.path());
        let id = ParticipantId::from_name("orphan");
        let json = format!(
            r#"{{"assignments": [{{"participant_id": "{id}", "x": 8, "y": 65, "z": 8}}]}}"#
        );
        fs::write(file.path(), json).unwrap();

        assert!(matches!(file.try_load(), Err(crate::Error::CorruptRecord(_))));
        let store = file.load();
        assert!(store.is_empty());
        assert!(dir.path().join("homestead.json.corrupt").exists());
    }

    #[test]
    fn save_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let file = StoreFile::new(dir.path().join("nested/deeper/store.json"));
        let mut store = AssignmentStore::new();
        store.set_cursor(SpiralIndex(3));

        file.save(&mut store).unwrap();
        assert_eq!(file.load().cursor(), SpiralIndex(3));
    }
}
