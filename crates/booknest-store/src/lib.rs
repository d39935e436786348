use std::path::{Path, PathBuf};

use booknest_types::utils::file_ext;
use tokio::fs;
use tracing::{debug, warn};

pub mod error;

use error::{StoreError, StoreResult};

const COVERS_PATH_PREFIX: &str = "covers";

pub const MAX_COVER_BYTES: u64 = 5 * 1024 * 1024;
pub const MAX_COVER_MB: u64 = MAX_COVER_BYTES / (1024 * 1024);

const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif"];

const MAX_PATH_LEN: usize = 4095;
const MAX_SEGMENT_LEN: usize = 255;
const MAX_PATH_DEPTH: usize = 10;
const PATH_INVALID_CHARS: &str = r#"/\:"#;

fn is_segment_invalid(s: &str) -> bool {
    s.is_empty()
        || s.starts_with(".")
        || s.len() > MAX_SEGMENT_LEN
        || s.chars()
            .any(|c| PATH_INVALID_CHARS.contains(c) || c.is_ascii_control())
}

fn validate_path(path: &str) -> StoreResult<()> {
    if path.is_empty() {
        return Err(StoreError::InvalidPath);
    }
    if path.starts_with("/") || path.ends_with("/") {
        return Err(StoreError::InvalidPath);
    }
    if path.len() > MAX_PATH_LEN {
        return Err(StoreError::InvalidPath);
    }
    let segments = path.split('/').collect::<Vec<_>>();
    if segments.len() > MAX_PATH_DEPTH {
        return Err(StoreError::InvalidPath);
    }
    let invalid_path = segments.into_iter().any(is_segment_invalid);
    if invalid_path {
        Err(StoreError::InvalidPath)
    } else {
        Ok(())
    }
}

/// relative path, utf8, validated not to escape the store root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidPath(String);

impl ValidPath {
    pub fn new(path: impl Into<String>) -> StoreResult<Self> {
        let path = path.into();
        validate_path(path.as_str()).inspect_err(|_| debug!("Invalid path: {path}"))?;
        Ok(ValidPath(path))
    }
}

impl std::str::FromStr for ValidPath {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ValidPath::new(s)
    }
}

impl AsRef<str> for ValidPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<ValidPath> for String {
    fn from(value: ValidPath) -> Self {
        value.0
    }
}

fn cover_path(ext: &str) -> StoreResult<ValidPath> {
    let id = uuid::Uuid::new_v4().to_string();
    ValidPath::new(format!("{COVERS_PATH_PREFIX}/{id}.{ext}"))
}

/// Local file store for cover images. Enforces the upload policy (image
/// extensions only, bounded size) and writes through a temp file so a
/// partially written cover is never visible under its final name.
#[derive(Clone, Debug)]
pub struct CoverStore {
    root: PathBuf,
}

impl CoverStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        CoverStore { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn local_path(&self, path: &ValidPath) -> PathBuf {
        self.root.join(path.as_ref())
    }

    /// Stores uploaded cover bytes under a fresh name, returning the
    /// store relative path to persist on the book record.
    pub async fn store_cover(&self, original_name: &str, data: &[u8]) -> StoreResult<ValidPath> {
        let ext = file_ext(original_name).ok_or(StoreError::UnsupportedImageType)?;
        if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
            return Err(StoreError::UnsupportedImageType);
        }
        if data.is_empty() {
            return Err(StoreError::EmptyFile);
        }
        if data.len() as u64 > MAX_COVER_BYTES {
            return Err(StoreError::TooLarge {
                limit_mb: MAX_COVER_MB,
            });
        }

        let dest = cover_path(&ext)?;
        let final_path = self.local_path(&dest);
        if let Some(parent) = final_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let tmp_ext = format!("{}.tmp", uuid::Uuid::new_v4());
        let tmp_path = final_path.with_extension(tmp_ext);
        fs::write(&tmp_path, data).await?;
        if let Err(e) = fs::rename(&tmp_path, &final_path).await {
            fs::remove_file(&tmp_path).await.ok();
            return Err(e.into());
        }
        debug!("Stored cover {original_name} as {}", dest.as_ref());
        Ok(dest)
    }

    /// Best-effort removal of a previously stored cover. Failures are
    /// logged and swallowed, an orphaned file is acceptable.
    pub async fn delete_cover(&self, path: &str) {
        let valid = match ValidPath::new(path) {
            Ok(p) => p,
            Err(_) => {
                warn!("Refusing to delete cover with invalid path: {path}");
                return;
            }
        };
        let local = self.local_path(&valid);
        match fs::try_exists(&local).await {
            Ok(true) => {
                if let Err(e) = fs::remove_file(&local).await {
                    warn!("Failed to delete old cover {local:?}: {e}");
                }
            }
            Ok(false) => debug!("Old cover {local:?} already gone"),
            Err(e) => warn!("Cannot stat old cover {local:?}: {e}"),
        }
    }

    pub async fn contains(&self, path: &str) -> bool {
        match ValidPath::new(path) {
            Ok(valid) => fs::try_exists(self.local_path(&valid)).await.unwrap_or(false),
            Err(_) => false,
        }
    }
}
