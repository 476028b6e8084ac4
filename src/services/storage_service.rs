use std::path::PathBuf;

use bytes::Bytes;
use chrono::Utc;
use tokio::fs;
use uuid::Uuid;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Pdf,
    Jpeg,
    Png,
    Gif,
    Mp4,
    Webm,
}

impl FileKind {
    pub fn mime_type(self) -> &'static str {
        match self {
            FileKind::Pdf => "application/pdf",
            FileKind::Jpeg => "image/jpeg",
            FileKind::Png => "image/png",
            FileKind::Gif => "image/gif",
            FileKind::Mp4 => "video/mp4",
            FileKind::Webm => "video/webm",
        }
    }

    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or_default().trim();
        match essence.to_ascii_lowercase().as_str() {
            "application/pdf" => Some(FileKind::Pdf),
            "image/jpeg" | "image/jpg" => Some(FileKind::Jpeg),
            "image/png" => Some(FileKind::Png),
            "image/gif" => Some(FileKind::Gif),
            "video/mp4" => Some(FileKind::Mp4),
            "video/webm" => Some(FileKind::Webm),
            _ => None,
        }
    }

    /// Checks the leading signature bytes.
    pub fn matches(self, data: &[u8]) -> bool {
        match self {
            FileKind::Pdf => data.starts_with(b"%PDF"),
            FileKind::Jpeg => data.starts_with(&[0xFF, 0xD8, 0xFF]),
            FileKind::Png => data.starts_with(&[0x89, 0x50, 0x4E, 0x47]),
            FileKind::Gif => data.starts_with(b"GIF8"),
            FileKind::Mp4 => data.len() >= 8 && &data[4..8] == b"ftyp",
            FileKind::Webm => data.starts_with(&[0x1A, 0x45, 0xDF, 0xA3]),
        }
    }
}

pub const DOCUMENT_KINDS: &[FileKind] = &[FileKind::Pdf, FileKind::Jpeg, FileKind::Png];
pub const MEDIA_KINDS: &[FileKind] = &[
    FileKind::Jpeg,
    FileKind::Png,
    FileKind::Gif,
    FileKind::Mp4,
    FileKind::Webm,
];

/// A multipart file part read fully into memory.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub original_name: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub filename: String,
    /// Path below the uploads root, with `/` separators, as served under `/uploads`.
    pub relative_path: String,
    pub size: i64,
    pub kind: FileKind,
}

/// Local upload directory with type and size checks.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
    max_bytes: usize,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>, max_bytes: usize) -> Self {
        Self {
            root: root.into(),
            max_bytes,
        }
    }

    pub fn check(&self, file: &UploadedFile, allowed: &[FileKind]) -> Result<FileKind> {
        if file.data.is_empty() {
            return Err(Error::BadRequest("File is required".into()));
        }
        if file.data.len() > self.max_bytes {
            return Err(Error::BadRequest(format!(
                "File is too large (max {} bytes)",
                self.max_bytes
            )));
        }
        let kind = file
            .content_type
            .as_deref()
            .and_then(FileKind::from_mime)
            .filter(|kind| allowed.contains(kind))
            .ok_or_else(|| Error::BadRequest("Invalid file type".into()))?;
        if !kind.matches(&file.data) {
            return Err(Error::BadRequest(
                "File content does not match its declared type".into(),
            ));
        }
        Ok(kind)
    }

    /// Validates `file` and writes it under `subdir` with a collision-free name.
    pub async fn save(
        &self,
        subdir: &str,
        file: &UploadedFile,
        allowed: &[FileKind],
    ) -> Result<StoredFile> {
        let kind = self.check(file, allowed)?;

        let dir = self.root.join(subdir);
        fs::create_dir_all(&dir).await?;

        let filename = format!(
            "{}-{}-{}",
            Utc::now().timestamp_millis(),
            Uuid::new_v4().simple(),
            sanitize_filename(&file.original_name)
        );
        fs::write(dir.join(&filename), &file.data).await.map_err(|e| {
            tracing::error!(error = %e, subdir, "failed to write upload");
            Error::Internal("Failed to save file".into())
        })?;

        Ok(StoredFile {
            relative_path: format!("{}/{}", subdir, filename),
            filename,
            size: file.data.len() as i64,
            kind,
        })
    }

    /// Best effort; a missing file is not an error.
    pub async fn remove(&self, relative_path: &str) {
        let path = self.root.join(relative_path);
        if let Err(e) = fs::remove_file(&path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(error = %e, path = %path.display(), "failed to delete upload");
            }
        }
    }
}

/// Keeps the original name recognisable while making it safe as a single path segment.
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let trimmed = cleaned.trim_start_matches('.');
    if trimmed.is_empty() {
        "file".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(name: &str, mime: &str, data: &'static [u8]) -> UploadedFile {
        UploadedFile {
            original_name: name.into(),
            content_type: Some(mime.into()),
            data: Bytes::from_static(data),
        }
    }

    fn temp_root() -> PathBuf {
        std::env::temp_dir().join(format!("buildtrust-uploads-{}", Uuid::new_v4()))
    }

    #[test]
    fn sanitize_strips_directories_and_spaces() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("my licence.pdf"), "my_licence.pdf");
        assert_eq!(sanitize_filename("C:\\docs\\id card.png"), "id_card.png");
        assert_eq!(sanitize_filename(".."), "file");
    }

    #[test]
    fn check_rejects_wrong_type_size_and_content() {
        let store = FileStore::new(temp_root(), 16);
        assert_eq!(
            store.check(&upload("a.pdf", "application/pdf", b"%PDF-1.4"), DOCUMENT_KINDS).unwrap(),
            FileKind::Pdf
        );
        assert!(store.check(&upload("a.gif", "image/gif", b"GIF89a"), DOCUMENT_KINDS).is_err());
        assert!(store.check(&upload("a.pdf", "application/pdf", b"not a pdf"), DOCUMENT_KINDS).is_err());
        assert!(store
            .check(&upload("a.pdf", "application/pdf", b"%PDF-0123456789abcdef"), DOCUMENT_KINDS)
            .is_err());
        assert!(store.check(&upload("a.pdf", "application/pdf", b""), DOCUMENT_KINDS).is_err());
    }

    #[test]
    fn video_signatures_are_recognised() {
        assert!(FileKind::Mp4.matches(b"\x00\x00\x00\x18ftypmp42"));
        assert!(FileKind::Webm.matches(&[0x1A, 0x45, 0xDF, 0xA3, 0x01]));
        assert!(!FileKind::Mp4.matches(b"ftyp"));
    }

    #[tokio::test]
    async fn save_then_remove_round_trip_on_disk() {
        let root = temp_root();
        let store = FileStore::new(&root, 1024);
        let stored = store
            .save("license", &upload("my licence.png", "image/png", b"\x89PNG\r\n\x1a\n"), DOCUMENT_KINDS)
            .await
            .unwrap();

        assert!(stored.filename.ends_with("-my_licence.png"));
        assert_eq!(stored.size, 8);
        let path = root.join(&stored.relative_path);
        assert!(path.exists());

        store.remove(&stored.relative_path).await;
        assert!(!path.exists());
        store.remove(&stored.relative_path).await;

        let _ = std::fs::remove_dir_all(root);
    }
}
