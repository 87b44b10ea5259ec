//! Upload directory layout.
//!
//! Each upload gets a fresh directory `<upload_root>/<uuid hex>`; files keep
//! their sanitized names. Scripts record the path relative to the data
//! directory as `uploads/<upload id>/<filename>`.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::debug;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Invalid filename: {0:?}")]
    InvalidFilename(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Reduce an uploaded filename to a safe basename.
///
/// Directory components are dropped, whitespace becomes `_`, and only ASCII
/// letters, digits, `.`, `-` and `_` survive. Returns `None` when nothing
/// usable is left.
pub fn sanitize_filename(name: &str) -> Option<String> {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);

    let sanitized: String = base
        .chars()
        .filter_map(|c| match c {
            c if c.is_ascii_alphanumeric() => Some(c),
            '.' | '-' | '_' => Some(c),
            c if c.is_whitespace() => Some('_'),
            _ => None,
        })
        .collect();

    let trimmed = sanitized.trim_matches(|c| c == '.' || c == '_');
    if trimmed.is_empty() {
        return None;
    }

    // Only ASCII remains, so byte slicing is safe
    if trimmed.len() > 100 {
        Some(trimmed[trimmed.len() - 100..].to_string())
    } else {
        Some(trimmed.to_string())
    }
}

/// Root of all upload directories.
#[derive(Debug, Clone)]
pub struct UploadStore {
    root: PathBuf,
}

impl UploadStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create a fresh, uniquely named upload directory.
    pub async fn create_upload(&self) -> Result<UploadDir, StorageError> {
        let id = uuid::Uuid::new_v4().simple().to_string();
        let path = self.root.join(&id);
        tokio::fs::create_dir_all(&path).await?;
        debug!("Created upload directory {}", path.display());
        Ok(UploadDir { id, path })
    }
}

/// One upload's directory.
#[derive(Debug, Clone)]
pub struct UploadDir {
    pub id: String,
    pub path: PathBuf,
}

/// A file written into an upload directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedFile {
    pub filename: String,
    pub path: PathBuf,
    /// `uploads/<upload id>/<filename>`
    pub relative_path: String,
}

impl UploadDir {
    /// Write `content` under the sanitized form of `original_name`.
    ///
    /// Existing files are never replaced: a taken name gets a numeric
    /// suffix before its extension (`image.png`, `image_1.png`, ...).
    pub async fn save(&self, original_name: &str, content: &[u8]) -> Result<SavedFile, StorageError> {
        let sanitized = sanitize_filename(original_name)
            .ok_or_else(|| StorageError::InvalidFilename(original_name.to_string()))?;
        let (stem, ext) = split_extension(&sanitized);

        let mut attempt = 0u32;
        loop {
            let filename = if attempt == 0 {
                sanitized.clone()
            } else {
                format!("{}_{}{}", stem, attempt, ext)
            };
            let path = self.path.join(&filename);

            let opened = tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await;

            match opened {
                Ok(mut file) => {
                    file.write_all(content).await?;
                    file.flush().await?;
                    if attempt > 0 {
                        debug!("Saved {:?} as {} to avoid a name clash", original_name, filename);
                    }
                    return Ok(SavedFile {
                        relative_path: format!("uploads/{}/{}", self.id, filename),
                        filename,
                        path,
                    });
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => attempt += 1,
                Err(e) => return Err(e.into()),
            }
        }
    }
}

/// Split `name.ext` into `("name", ".ext")`. Names without a dot keep an empty extension.
fn split_extension(filename: &str) -> (&str, &str) {
    match filename.rfind('.') {
        Some(index) if index > 0 => filename.split_at(index),
        _ => (filename, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("answer.pdf").as_deref(), Some("answer.pdf"));
        assert_eq!(
            sanitize_filename("My Answer Sheet (1).pdf").as_deref(),
            Some("My_Answer_Sheet_1.pdf")
        );
        assert_eq!(
            sanitize_filename("../../etc/passwd").as_deref(),
            Some("passwd")
        );
        assert_eq!(
            sanitize_filename("C:\\Users\\me\\scan.jpg").as_deref(),
            Some("scan.jpg")
        );
        assert_eq!(sanitize_filename(".hidden").as_deref(), Some("hidden"));
        assert_eq!(sanitize_filename(""), None);
        assert_eq!(sanitize_filename("日本語"), None);
        assert_eq!(sanitize_filename(".."), None);
    }

    #[test]
    fn test_sanitize_limits_length() {
        let long = format!("{}.pdf", "a".repeat(200));
        let sanitized = sanitize_filename(&long).unwrap();
        assert_eq!(sanitized.len(), 100);
        assert!(sanitized.ends_with(".pdf"));
    }

    #[tokio::test]
    async fn test_upload_directories_are_unique() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path().join("uploads"));

        let first = store.create_upload().await.unwrap();
        let second = store.create_upload().await.unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(first.id.len(), 32);
        assert!(first.path.is_dir());
        assert!(second.path.is_dir());
    }

    #[tokio::test]
    async fn test_save_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path());
        let upload = store.create_upload().await.unwrap();

        let saved = upload.save("page 1.png", b"image").await.unwrap();

        assert_eq!(saved.filename, "page_1.png");
        assert_eq!(
            saved.relative_path,
            format!("uploads/{}/page_1.png", upload.id)
        );
        assert_eq!(std::fs::read(&saved.path).unwrap(), b"image");

        assert!(matches!(
            upload.save("///", b"x").await,
            Err(StorageError::InvalidFilename(_))
        ));
    }

    #[tokio::test]
    async fn test_save_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path());
        let upload = store.create_upload().await.unwrap();

        let first = upload.save("image.png", b"one").await.unwrap();
        let second = upload.save("image.png", b"two").await.unwrap();
        let third = upload.save("dir/image.png", b"three").await.unwrap();
        let bare = upload.save("notes", b"a").await.unwrap();
        let bare_again = upload.save("notes", b"b").await.unwrap();

        assert_eq!(first.filename, "image.png");
        assert_eq!(second.filename, "image_1.png");
        assert_eq!(third.filename, "image_2.png");
        assert_eq!(
            second.relative_path,
            format!("uploads/{}/image_1.png", upload.id)
        );
        assert_eq!(std::fs::read(&first.path).unwrap(), b"one");
        assert_eq!(std::fs::read(&second.path).unwrap(), b"two");
        assert_eq!(std::fs::read(&third.path).unwrap(), b"three");
        assert_eq!(bare_again.filename, "notes_1");
        assert_eq!(std::fs::read(&bare.path).unwrap(), b"a");
    }

    #[test]
    fn test_split_extension() {
        assert_eq!(split_extension("scan.page.jpg"), ("scan.page", ".jpg"));
        assert_eq!(split_extension("README"), ("README", ""));
    }
}
