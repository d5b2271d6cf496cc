use crate::services::prelude::*;
use crate::services::utils::{ext_from_filename, ext_from_mime};

pub const FILES_DIR_NAME: &str = "files";
static FILE_COUNTER: AtomicU64 = AtomicU64::new(0);

pub struct StoredFile {
    /// Path relative to the data directory, always with `/` separators.
    pub rel_path: String,
    pub size: i64,
}

pub fn store_bytes(
    data_dir: &Path,
    filename: &str,
    mime: &str,
    bytes: &[u8],
) -> CatalogResult<StoredFile> {
    let ext = ext_from_filename(filename)
        .or_else(|| ext_from_mime(mime))
        .unwrap_or_else(|| "bin".to_string());
    let nonce = FILE_COUNTER.fetch_add(1, Ordering::Relaxed);
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let mut name_hasher = Sha256::new();
    name_hasher.update(bytes);
    name_hasher.update(nanos.to_string().as_bytes());
    name_hasher.update(nonce.to_string().as_bytes());
    let unique_hash = format!("{:x}", name_hasher.finalize());
    let rel_dir = PathBuf::from(FILES_DIR_NAME).join(&unique_hash[0..2]);
    let rel_path = rel_dir.join(format!("{}.{}", unique_hash, ext));
    fs::create_dir_all(data_dir.join(&rel_dir))?;
    fs::write(data_dir.join(&rel_path), bytes)?;
    Ok(StoredFile {
        rel_path: rel_path.to_string_lossy().replace('\\', "/"),
        size: bytes.len() as i64,
    })
}

/// Resolves a stored path, refusing anything outside the files directory.
pub fn resolve_stored(data_dir: &Path, rel_path: &str) -> Option<PathBuf> {
    let rel = Path::new(rel_path);
    let inside = rel.starts_with(FILES_DIR_NAME)
        && rel
            .components()
            .all(|c| matches!(c, std::path::Component::Normal(_)));
    inside.then(|| data_dir.join(rel))
}

pub fn read_stored(data_dir: &Path, rel_path: &str) -> CatalogResult<Vec<u8>> {
    let path = resolve_stored(data_dir, rel_path).ok_or(CatalogError::NotFound("File content"))?;
    match fs::read(&path) {
        Ok(bytes) => Ok(bytes),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            Err(CatalogError::NotFound("File content"))
        }
        Err(err) => Err(err.into()),
    }
}

/// Deletes stored bytes. Failures are logged and swallowed so the catalog
/// never waits on storage.
pub fn remove_stored(data_dir: &Path, rel_path: &str) {
    let Some(full_path) = resolve_stored(data_dir, rel_path) else {
        tracing::warn!(path = rel_path, "refusing to remove file outside storage");
        return;
    };
    if let Err(err) = fs::remove_file(&full_path) {
        if err.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(path = rel_path, error = %err, "failed to remove stored file");
        }
        return;
    }
    if let Some(parent) = full_path.parent() {
        let _ = fs::remove_dir(parent);
    }
}

pub fn remove_all_stored(data_dir: &Path, rel_paths: &[String]) {
    for rel in rel_paths {
        remove_stored(data_dir, rel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_read_remove() {
        let dir = tempfile::tempdir().unwrap();
        let stored = store_bytes(dir.path(), "notes.pdf", "application/pdf", b"%PDF-1.4").unwrap();
        assert!(stored.rel_path.starts_with("files/"));
        assert!(stored.rel_path.ends_with(".pdf"));
        assert_eq!(stored.size, 8);
        assert_eq!(read_stored(dir.path(), &stored.rel_path).unwrap(), b"%PDF-1.4");
        remove_stored(dir.path(), &stored.rel_path);
        assert!(matches!(
            read_stored(dir.path(), &stored.rel_path),
            Err(CatalogError::NotFound(_))
        ));
    }

    #[test]
    fn test_same_bytes_get_distinct_paths() {
        let dir = tempfile::tempdir().unwrap();
        let a = store_bytes(dir.path(), "a.txt", "", b"same").unwrap();
        let b = store_bytes(dir.path(), "a.txt", "", b"same").unwrap();
        assert_ne!(a.rel_path, b.rel_path);
    }

    #[test]
    fn test_resolve_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        assert!(resolve_stored(dir.path(), "../secret").is_none());
        assert!(resolve_stored(dir.path(), "files/../db.sqlite").is_none());
        assert!(resolve_stored(dir.path(), "/etc/passwd").is_none());
        assert!(resolve_stored(dir.path(), "files/ab/x.pdf").is_some());
    }

    #[test]
    fn test_remove_missing_is_quiet() {
        let dir = tempfile::tempdir().unwrap();
        remove_stored(dir.path(), "files/zz/missing.pdf");
    }
}
