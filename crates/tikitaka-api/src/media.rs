use std::path::{Path, PathBuf};

use axum::extract::Multipart;
use tokio::fs;
use tracing::{info, warn};
use uuid::Uuid;

/// Public URL prefix under which the upload root is served.
pub const PUBLIC_PREFIX: &str = "/uploads";

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("No file was provided")]
    Empty,

    #[error("File exceeds the {limit_mb} MB limit")]
    TooLarge { limit_mb: usize },

    #[error("Unsupported file type")]
    UnsupportedType,

    #[error("Malformed upload")]
    Malformed,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// What an upload is for. Decides the sub-directory, naming and what files
/// are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    PostImage,
    Avatar,
}

impl MediaKind {
    pub fn dir(self) -> &'static str {
        match self {
            MediaKind::PostImage => "posts",
            MediaKind::Avatar => "profiles",
        }
    }

    fn prefix(self) -> &'static str {
        match self {
            MediaKind::PostImage => "post",
            MediaKind::Avatar => "profile",
        }
    }

    /// Multipart field carrying the file.
    pub fn field(self) -> &'static str {
        match self {
            MediaKind::PostImage => "image",
            MediaKind::Avatar => "avatar",
        }
    }

    pub fn max_bytes(self) -> usize {
        match self {
            MediaKind::PostImage => 10 * 1024 * 1024,
            MediaKind::Avatar => 5 * 1024 * 1024,
        }
    }

    fn extensions(self) -> &'static [&'static str] {
        match self {
            MediaKind::PostImage => &["jpeg", "jpg", "png", "gif", "mp4", "mov"],
            MediaKind::Avatar => &["jpeg", "jpg", "png", "gif"],
        }
    }

    /// Accept a file when both its extension and (if sent) its content type
    /// fit this kind. Returns the normalised extension.
    fn accept(self, file_name: &str, content_type: Option<&str>) -> Option<String> {
        let ext = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())?;
        if !self.extensions().contains(&ext.as_str()) {
            return None;
        }

        let mime_ok = match content_type.map(|c| c.to_ascii_lowercase()) {
            None => true,
            Some(mime) => match mime.as_str() {
                "image/jpeg" | "image/jpg" | "image/png" | "image/gif" => true,
                m => self == MediaKind::PostImage && m.starts_with("video/"),
            },
        };
        mime_ok.then_some(ext)
    }
}

/// A file read from a multipart body, not yet stored.
#[derive(Debug)]
pub struct Upload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

/// Read the file field for `kind` out of a multipart body, enforcing the
/// size limit while streaming. Other fields are skipped.
pub async fn read_upload(multipart: &mut Multipart, kind: MediaKind) -> Result<Upload, MediaError> {
    while let Some(mut field) = multipart.next_field().await.map_err(|e| {
        warn!("Failed to read multipart field: {}", e);
        MediaError::Malformed
    })? {
        if field.name() != Some(kind.field()) {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(str::to_string);
        let mut data = Vec::new();
        while let Some(chunk) = field.chunk().await.map_err(|e| {
            warn!("Failed to read upload data: {}", e);
            MediaError::Malformed
        })? {
            if data.len() + chunk.len() > kind.max_bytes() {
                return Err(MediaError::TooLarge {
                    limit_mb: kind.max_bytes() / (1024 * 1024),
                });
            }
            data.extend_from_slice(&chunk);
        }

        if data.is_empty() {
            return Err(MediaError::Empty);
        }
        return Ok(Upload {
            file_name,
            content_type,
            data,
        });
    }

    Err(MediaError::Empty)
}

/// Uploaded media on local disk, laid out as `{root}/{kind dir}/{file}` and
/// served as `/uploads/{kind dir}/{file}`.
#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
}

impl MediaStore {
    pub async fn new(root: PathBuf) -> anyhow::Result<Self> {
        for kind in [MediaKind::PostImage, MediaKind::Avatar] {
            fs::create_dir_all(root.join(kind.dir())).await?;
        }
        info!("Media storage directory: {}", root.display());
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Validate and write an upload. Returns its public URL.
    pub async fn save(&self, kind: MediaKind, upload: &Upload) -> Result<String, MediaError> {
        let ext = kind
            .accept(&upload.file_name, upload.content_type.as_deref())
            .ok_or(MediaError::UnsupportedType)?;

        let name = format!(
            "{}-{}-{}.{}",
            kind.prefix(),
            chrono::Utc::now().timestamp_millis(),
            Uuid::new_v4().simple(),
            ext
        );
        let path = self.root.join(kind.dir()).join(&name);

        if let Err(e) = fs::write(&path, &upload.data).await {
            // Never leave a partial file behind
            let _ = fs::remove_file(&path).await;
            return Err(e.into());
        }

        info!("Stored {} ({} bytes)", path.display(), upload.data.len());
        Ok(format!("{PUBLIC_PREFIX}/{}/{name}", kind.dir()))
    }

    /// Whether `url` names a file of `kind` that currently exists.
    pub async fn exists(&self, kind: MediaKind, url: &str) -> bool {
        match self.resolve(url) {
            Some((dir, path)) if dir == kind.dir() => fs::try_exists(&path).await.unwrap_or(false),
            _ => false,
        }
    }

    /// Remove the file behind a public URL. Missing files and URLs outside
    /// the store are logged and ignored.
    pub async fn delete(&self, url: &str) {
        let Some((_, path)) = self.resolve(url) else {
            warn!("Refusing to delete media outside the upload root: {}", url);
            return;
        };

        match fs::remove_file(&path).await {
            Ok(()) => info!("Deleted media {}", url),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Media {} already gone", url);
            }
            Err(e) => warn!("Failed to delete media {}: {}", url, e),
        }
    }

    /// Map `/uploads/{dir}/{file}` to a path under the root. Anything else,
    /// including traversal attempts, maps to `None`.
    fn resolve(&self, url: &str) -> Option<(&'static str, PathBuf)> {
        let rest = url.strip_prefix(PUBLIC_PREFIX)?.strip_prefix('/')?;
        let (dir, file) = rest.split_once('/')?;
        let dir = [MediaKind::PostImage, MediaKind::Avatar]
            .into_iter()
            .map(MediaKind::dir)
            .find(|d| *d == dir)?;

        let safe = !file.is_empty()
            && !file.starts_with('.')
            && !file.contains(['/', '\\'])
            && file != "..";
        safe.then(|| (dir, self.root.join(dir).join(file)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(name: &str, mime: Option<&str>, data: &[u8]) -> Upload {
        Upload {
            file_name: name.into(),
            content_type: mime.map(str::to_string),
            data: data.to_vec(),
        }
    }

    #[test]
    fn acceptance_depends_on_kind() {
        assert_eq!(MediaKind::PostImage.accept("goal.PNG", Some("image/png")).as_deref(), Some("png"));
        assert_eq!(MediaKind::PostImage.accept("goal.mov", Some("video/quicktime")).as_deref(), Some("mov"));
        assert!(MediaKind::Avatar.accept("goal.mp4", Some("video/mp4")).is_none());
        assert!(MediaKind::Avatar.accept("me.png", Some("video/mp4")).is_none());
        assert!(MediaKind::PostImage.accept("notes.txt", Some("text/plain")).is_none());
        assert!(MediaKind::PostImage.accept("no_extension", None).is_none());
    }

    #[tokio::test]
    async fn save_then_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = MediaStore::new(dir.path().to_path_buf()).await.unwrap();

        let url = store
            .save(MediaKind::PostImage, &upload("gol.jpg", Some("image/jpeg"), b"jpegdata"))
            .await
            .unwrap();
        assert!(url.starts_with("/uploads/posts/post-"));
        assert!(url.ends_with(".jpg"));
        assert!(store.exists(MediaKind::PostImage, &url).await);
        assert!(!store.exists(MediaKind::Avatar, &url).await);

        store.delete(&url).await;
        assert!(!store.exists(MediaKind::PostImage, &url).await);

        // Deleting again only logs
        store.delete(&url).await;
    }

    #[tokio::test]
    async fn unsupported_files_are_not_written() {
        let dir = tempfile::tempdir().unwrap();
        let store = MediaStore::new(dir.path().to_path_buf()).await.unwrap();

        let err = store
            .save(MediaKind::Avatar, &upload("clip.mp4", Some("video/mp4"), b"data"))
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::UnsupportedType));

        let mut entries = fs::read_dir(dir.path().join("profiles")).await.unwrap();
        assert!(entries.next_entry().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn traversal_urls_do_not_resolve() {
        let dir = tempfile::tempdir().unwrap();
        let store = MediaStore::new(dir.path().to_path_buf()).await.unwrap();

        assert!(store.resolve("/uploads/posts/../../etc/passwd").is_none());
        assert!(store.resolve("/uploads/secrets/file.png").is_none());
        assert!(store.resolve("/elsewhere/posts/file.png").is_none());
        assert!(store.resolve("/uploads/posts/..").is_none());
        assert!(store.resolve("/uploads/posts/ok.png").is_some());
    }
}
