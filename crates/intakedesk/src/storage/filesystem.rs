use std::io::Write;
use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::error::StorageError;
use crate::sanitize::sanitize_filename;

/// A document written to storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredDocument {
    /// Storage key relative to the root: `{intake_id}/{millis}-{filename}`.
    pub key: String,
    /// Public URL the extraction pipeline fetches the document from.
    pub url: String,
    pub path: PathBuf,
}

/// Filesystem-backed document store.
///
/// Documents live under `root`, one directory per intake, and are served by
/// the HTTP server beneath `public_base_url`.
#[derive(Debug, Clone)]
pub struct DocumentStorage {
    root: PathBuf,
    public_base_url: String,
}

impl DocumentStorage {
    pub fn new<P: AsRef<Path>>(root: P, public_base_url: &str) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn url_for(&self, key: &str) -> String {
        format!("{}/{}", self.public_base_url, key)
    }

    /// Writes `content` for the given intake and returns where it landed.
    pub fn put(
        &self,
        intake_id: &str,
        original_filename: &str,
        content: &[u8],
        now: DateTime<Utc>,
    ) -> Result<StoredDocument, StorageError> {
        if !is_safe_component(intake_id) {
            return Err(StorageError::InvalidKey(intake_id.to_string()));
        }

        let dir_path = self.root.join(intake_id);
        self.ensure_directory(&dir_path)?;

        let filename = format!(
            "{}-{}",
            now.timestamp_millis(),
            sanitize_filename(original_filename)
        );
        let (path, filename) = self.store_with_atomic_creation(&dir_path, &filename, content)?;

        let key = format!("{}/{}", intake_id, filename);
        log::debug!("Stored document {} ({} bytes)", key, content.len());

        Ok(StoredDocument {
            url: self.url_for(&key),
            key,
            path,
        })
    }

    /// Removes a stored document. Missing files are not an error.
    pub fn remove(&self, key: &str) -> Result<(), StorageError> {
        let path = self.resolve(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::RemoveFile { path, source: e }),
        }
    }

    /// Maps a key back to its path, refusing anything that escapes the root.
    pub fn resolve(&self, key: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(key);
        let safe = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(relative))
    }

    /// Creates the file with `create_new` so concurrent uploads in the same
    /// millisecond never overwrite each other; collisions get a numeric suffix.
    fn store_with_atomic_creation(
        &self,
        dir_path: &Path,
        filename: &str,
        content: &[u8],
    ) -> Result<(PathBuf, String), StorageError> {
        let (base, ext) = match filename.rfind('.') {
            Some(dot_pos) => (&filename[..dot_pos], Some(&filename[dot_pos..])),
            None => (filename, None),
        };

        for counter in 1..=100 {
            let try_filename = if counter == 1 {
                filename.to_string()
            } else {
                match ext {
                    Some(ext) => format!("{}_{}{}", base, counter, ext),
                    None => format!("{}_{}", base, counter),
                }
            };
            let try_path = dir_path.join(&try_filename);

            match std::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&try_path)
            {
                Ok(mut file) => {
                    file.write_all(content)
                        .map_err(|e| StorageError::WriteFile {
                            path: try_path.clone(),
                            source: e,
                        })?;
                    return Ok((try_path, try_filename));
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(e) => {
                    return Err(StorageError::WriteFile {
                        path: try_path,
                        source: e,
                    })
                }
            }
        }

        Err(StorageError::FileExists(dir_path.join(filename)))
    }

    fn ensure_directory(&self, path: &Path) -> Result<(), StorageError> {
        std::fs::create_dir_all(path).map_err(|e| StorageError::CreateDirectory {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

fn is_safe_component(value: &str) -> bool {
    !value.is_empty()
        && value != "."
        && value != ".."
        && !value.contains(['/', '\\'])
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn at_millis(millis: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(millis).unwrap()
    }

    #[test]
    fn test_put_writes_under_intake_directory() {
        let temp_dir = TempDir::new().unwrap();
        let storage = DocumentStorage::new(temp_dir.path(), "http://localhost:8080/documents/");

        let doc = storage
            .put("abc", "Crash Report.pdf", b"%PDF-1.7", at_millis(1_700_000_000_000))
            .unwrap();

        assert_eq!(doc.key, "abc/1700000000000-Crash_Report.pdf");
        assert_eq!(
            doc.url,
            "http://localhost:8080/documents/abc/1700000000000-Crash_Report.pdf"
        );
        assert_eq!(std::fs::read(&doc.path).unwrap(), b"%PDF-1.7");
    }

    #[test]
    fn test_put_same_millisecond_does_not_overwrite() {
        let temp_dir = TempDir::new().unwrap();
        let storage = DocumentStorage::new(temp_dir.path(), "http://x");
        let now = at_millis(42);

        let first = storage.put("abc", "r.pdf", b"one", now).unwrap();
        let second = storage.put("abc", "r.pdf", b"two", now).unwrap();

        assert_eq!(first.key, "abc/42-r.pdf");
        assert_eq!(second.key, "abc/42-r_2.pdf");
        assert_eq!(std::fs::read(&first.path).unwrap(), b"one");
    }

    #[test]
    fn test_put_rejects_path_like_intake_id() {
        let temp_dir = TempDir::new().unwrap();
        let storage = DocumentStorage::new(temp_dir.path(), "http://x");
        assert!(matches!(
            storage.put("../evil", "r.pdf", b"x", at_millis(0)),
            Err(StorageError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_put_fails_when_root_is_a_file() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("not-a-dir");
        std::fs::write(&root, b"").unwrap();
        let storage = DocumentStorage::new(&root, "http://x");

        assert!(matches!(
            storage.put("abc", "r.pdf", b"x", at_millis(0)),
            Err(StorageError::CreateDirectory { .. })
        ));
    }

    #[test]
    fn test_remove() {
        let temp_dir = TempDir::new().unwrap();
        let storage = DocumentStorage::new(temp_dir.path(), "http://x");
        let doc = storage.put("abc", "r.pdf", b"x", at_millis(0)).unwrap();

        storage.remove(&doc.key).unwrap();
        assert!(!doc.path.exists());
        storage.remove(&doc.key).unwrap();
    }

    #[test]
    fn test_resolve_rejects_traversal() {
        let storage = DocumentStorage::new("/srv/docs", "http://x");
        assert!(storage.resolve("../etc/passwd").is_err());
        assert!(storage.resolve("/etc/passwd").is_err());
        assert!(storage.resolve("").is_err());
        assert_eq!(
            storage.resolve("abc/1-r.pdf").unwrap(),
            PathBuf::from("/srv/docs/abc/1-r.pdf")
        );
    }
}
