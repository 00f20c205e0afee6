//! Persistent tile blob storage keyed by tile position.
//!
//! A store is an append-only table of `(row, col) -> blob`. It answers
//! three questions only: which of these positions are absent, insert one
//! row, and read one row back.

use crate::coord::TilePosition;
use crate::error::StoreError;
use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

pub trait TileStore {
    /// Positions from `positions` with no stored row, in input order.
    fn missing(&self, positions: &[TilePosition]) -> Result<Vec<TilePosition>, StoreError>;

    /// Insert one row. Returns `false` and leaves the stored row untouched
    /// if `position` is already present.
    fn insert(&mut self, position: TilePosition, blob: &[u8]) -> Result<bool, StoreError>;

    fn select(&self, position: TilePosition) -> Result<Option<Vec<u8>>, StoreError>;
}

/// In-process store, lost on drop.
#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: HashMap<TilePosition, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl TileStore for MemoryStore {
    fn missing(&self, positions: &[TilePosition]) -> Result<Vec<TilePosition>, StoreError> {
        Ok(positions
            .iter()
            .filter(|pos| !self.rows.contains_key(pos))
            .copied()
            .collect())
    }

    fn insert(&mut self, position: TilePosition, blob: &[u8]) -> Result<bool, StoreError> {
        if self.rows.contains_key(&position) {
            return Ok(false);
        }
        self.rows.insert(position, blob.to_vec());
        Ok(true)
    }

    fn select(&self, position: TilePosition) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.rows.get(&position).cloned())
    }
}

/// Directory-backed store, one file per position:
///
/// ```text
/// <root>/<row>/<row>_<col>.tile
/// ```
#[derive(Debug, Clone)]
pub struct DiskStore {
    root: PathBuf,
}

impl DiskStore {
    /// Open (creating if needed) the store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> crate::error::Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|source| StoreError::Open {
            path: root.clone(),
            source,
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn row_directory(&self, row: i32) -> PathBuf {
        self.root.join(row.to_string())
    }

    pub fn tile_path(&self, position: TilePosition) -> PathBuf {
        self.row_directory(position.row)
            .join(format!("{}_{}.tile", position.row, position.col))
    }

    fn io_error(path: &Path) -> impl FnOnce(io::Error) -> StoreError + '_ {
        move |source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl TileStore for DiskStore {
    fn missing(&self, positions: &[TilePosition]) -> Result<Vec<TilePosition>, StoreError> {
        let mut out = Vec::new();
        for &position in positions {
            let path = self.tile_path(position);
            if !path.try_exists().map_err(Self::io_error(&path))? {
                out.push(position);
            }
        }
        Ok(out)
    }

    fn insert(&mut self, position: TilePosition, blob: &[u8]) -> Result<bool, StoreError> {
        let path = self.tile_path(position);
        let dir = self.row_directory(position.row);
        fs::create_dir_all(&dir).map_err(Self::io_error(&dir))?;

        // Write aside, then link into place: the link fails if the row
        // exists and readers never see a partial blob.
        let tmp = dir.join(format!(
            ".{}_{}.{}.tmp",
            position.row,
            position.col,
            std::process::id()
        ));
        let written = fs::File::create(&tmp)
            .and_then(|mut f| {
                f.write_all(blob)?;
                f.sync_all()
            })
            .map_err(Self::io_error(&tmp));
        if let Err(e) = written {
            let _ = fs::remove_file(&tmp);
            return Err(e);
        }

        let linked = fs::hard_link(&tmp, &path);
        let _ = fs::remove_file(&tmp);
        match linked {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                debug!(row = position.row, col = position.col, "Tile already stored");
                Ok(false)
            }
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }

    fn select(&self, position: TilePosition) -> Result<Option<Vec<u8>>, StoreError> {
        let path = self.tile_path(position);
        match fs::read(&path) {
            Ok(blob) => Ok(Some(blob)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn pos(row: i32, col: i32) -> TilePosition {
        TilePosition::new(row, col)
    }

    fn exercise(store: &mut dyn TileStore) {
        let wanted = [pos(3, 4), pos(-1, 7), pos(3, 5)];
        assert_eq!(store.missing(&wanted).unwrap(), wanted.to_vec());

        assert!(store.insert(pos(-1, 7), b"north").unwrap());
        assert_eq!(store.missing(&wanted).unwrap(), vec![pos(3, 4), pos(3, 5)]);
        assert_eq!(store.select(pos(-1, 7)).unwrap().as_deref(), Some(&b"north"[..]));
        assert_eq!(store.select(pos(3, 4)).unwrap(), None);

        // Append-only: a second insert is ignored.
        assert!(!store.insert(pos(-1, 7), b"other").unwrap());
        assert_eq!(store.select(pos(-1, 7)).unwrap().as_deref(), Some(&b"north"[..]));
    }

    #[test]
    fn test_memory_store() {
        let mut store = MemoryStore::new();
        exercise(&mut store);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_disk_store() {
        let dir = TempDir::new().unwrap();
        let mut store = DiskStore::open(dir.path().join("tiles")).unwrap();
        exercise(&mut store);
        assert!(dir.path().join("tiles/-1/-1_7.tile").is_file());
    }

    #[test]
    fn test_disk_store_persists_across_instances() {
        let dir = TempDir::new().unwrap();
        {
            let mut store = DiskStore::open(dir.path()).unwrap();
            store.insert(pos(10, 20), &[1, 2, 3]).unwrap();
        }
        let store = DiskStore::open(dir.path()).unwrap();
        assert_eq!(store.select(pos(10, 20)).unwrap(), Some(vec![1, 2, 3]));
        assert!(store.missing(&[pos(10, 20)]).unwrap().is_empty());
    }

    #[test]
    fn test_disk_store_leaves_no_temp_files() {
        let dir = TempDir::new().unwrap();
        let mut store = DiskStore::open(dir.path()).unwrap();
        store.insert(pos(1, 1), b"a").unwrap();
        store.insert(pos(1, 1), b"b").unwrap();

        let names: Vec<_> = fs::read_dir(store.row_directory(1))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("1_1.tile")]);
    }

    #[test]
    fn test_open_fails_on_file_root() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("not-a-dir");
        fs::write(&file, b"x").unwrap();
        assert!(matches!(
            DiskStore::open(&file),
            Err(crate::error::Error::Store(StoreError::Open { .. }))
        ));
    }
}
