use std::path::{Path, PathBuf};

/// File name used when the client did not send a usable one.
pub const FALLBACK_FILE_NAME: &str = "input.jpg";

/// Stores uploaded images under a fixed directory.
///
/// Files keep their original name and are never removed.
#[derive(Clone, Debug)]
pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Destination of an upload named `file_name`.
    ///
    /// Only the last path component of the client name is kept.
    pub fn path_for(&self, file_name: Option<&str>) -> PathBuf {
        let name = file_name
            .and_then(|name| name.rsplit(['/', '\\']).next())
            .map(str::trim)
            .filter(|name| !name.is_empty() && *name != "." && *name != "..")
            .unwrap_or(FALLBACK_FILE_NAME);

        self.dir.join(name)
    }

    /// Write the upload to disk and return where it landed.
    pub async fn save(&self, file_name: Option<&str>, bytes: &[u8]) -> std::io::Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let path = self.path_for(file_name);
        tokio::fs::write(&path, bytes).await?;
        log::debug!("Stored {} bytes at {}", bytes.len(), path.display());

        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_only_the_file_name() {
        let store = UploadStore::new("uploads");
        assert_eq!(
            store.path_for(Some("cat.png")),
            PathBuf::from("uploads/cat.png")
        );
        assert_eq!(
            store.path_for(Some("../../etc/passwd")),
            PathBuf::from("uploads/passwd")
        );
        assert_eq!(
            store.path_for(Some("C:\\Users\\me\\dog.jpeg")),
            PathBuf::from("uploads/dog.jpeg")
        );
    }

    #[test]
    fn falls_back_on_unusable_names() {
        let store = UploadStore::new("uploads");
        let fallback = PathBuf::from("uploads").join(FALLBACK_FILE_NAME);
        assert_eq!(store.path_for(None), fallback);
        assert_eq!(store.path_for(Some("")), fallback);
        assert_eq!(store.path_for(Some("..")), fallback);
        assert_eq!(store.path_for(Some("dir/")), fallback);
    }

    #[tokio::test]
    async fn save_creates_dir_and_overwrites() -> std::io::Result<()> {
        let tmp = tempfile::tempdir()?;
        let store = UploadStore::new(tmp.path().join("uploads"));

        let first = store.save(Some("a.png"), b"first").await?;
        let second = store.save(Some("a.png"), b"second").await?;

        assert_eq!(first, second);
        assert_eq!(first, tmp.path().join("uploads").join("a.png"));
        assert_eq!(std::fs::read(&first)?, b"second");
        Ok(())
    }
}
