//! Byte storage collaborator, used by [`crate::Level::save`] and [`crate::Level::load_from`].

use ahash::AHashMap;
use log::trace;
use std::{
    fs, io,
    path::{Component, Path, PathBuf},
};

pub trait Storage {
    fn read_all(&self, path: &str) -> io::Result<Vec<u8>>;
    fn write_all(&mut self, path: &str, bytes: &[u8]) -> io::Result<()>;
}

/// Filesystem storage rooted at a directory. Paths are relative to the root and may not
/// escape it.
#[derive(Debug, Clone)]
pub struct DirectoryStorage {
    root: PathBuf,
}

impl DirectoryStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> io::Result<PathBuf> {
        let relative = Path::new(path);
        let is_contained = relative
            .components()
            .all(|component| matches!(component, Component::Normal(_) | Component::CurDir));

        if !is_contained || path.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("path `{path}` is outside of the storage directory"),
            ));
        }

        Ok(self.root.join(relative))
    }
}

impl Storage for DirectoryStorage {
    fn read_all(&self, path: &str) -> io::Result<Vec<u8>> {
        let full_path = self.resolve(path)?;
        trace!("Reading `{}`", full_path.display());
        fs::read(full_path)
    }

    fn write_all(&mut self, path: &str, bytes: &[u8]) -> io::Result<()> {
        let full_path = self.resolve(path)?;
        trace!("Writing {} bytes to `{}`", bytes.len(), full_path.display());
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(full_path, bytes)
    }
}

/// In-memory storage, mostly for tests and tools.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    files: AHashMap<String, Vec<u8>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &str) -> Option<&[u8]> {
        self.files.get(path).map(Vec::as_slice)
    }

    /// Direct access to a stored file, for poking at its bytes.
    pub fn get_mut(&mut self, path: &str) -> Option<&mut Vec<u8>> {
        self.files.get_mut(path)
    }

    pub fn insert(&mut self, path: &str, bytes: Vec<u8>) {
        self.files.insert(path.to_owned(), bytes);
    }
}

impl Storage for MemoryStorage {
    fn read_all(&self, path: &str) -> io::Result<Vec<u8>> {
        self.files.get(path).cloned().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("no file named `{path}`"))
        })
    }

    fn write_all(&mut self, path: &str, bytes: &[u8]) -> io::Result<()> {
        self.files.insert(path.to_owned(), bytes.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_storage_missing_file() {
        let mut storage = MemoryStorage::new();
        let error = storage.read_all("levels/1.lvl").unwrap_err();
        assert_eq!(error.kind(), io::ErrorKind::NotFound);

        storage.write_all("levels/1.lvl", b"GLVL").unwrap();
        assert_eq!(storage.read_all("levels/1.lvl").unwrap(), b"GLVL");
    }

    #[test]
    fn directory_storage_stays_inside_root() {
        let storage = DirectoryStorage::new("/tmp/golf");
        for path in ["../secrets", "/etc/passwd", "levels/../../x", ""] {
            let error = storage.resolve(path).unwrap_err();
            assert_eq!(error.kind(), io::ErrorKind::InvalidInput, "{path}");
        }
        assert_eq!(
            storage.resolve("levels/./1.lvl").unwrap(),
            Path::new("/tmp/golf/levels/./1.lvl")
        );
    }

    #[test]
    fn directory_storage_round_trip() {
        let root = std::env::temp_dir().join(format!("golf_lvl_storage_{}", std::process::id()));
        let mut storage = DirectoryStorage::new(&root);
        storage.write_all("nested/level.lvl", &[1, 2, 3]).unwrap();
        assert_eq!(storage.read_all("nested/level.lvl").unwrap(), vec![1, 2, 3]);
        fs::remove_dir_all(root).unwrap();
    }
}
