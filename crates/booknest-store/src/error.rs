pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Display texts double as the user facing reason when an upload is refused.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("Invalid image path")]
    InvalidPath,
    #[error("Only JPG, PNG and GIF images are allowed")]
    UnsupportedImageType,
    #[error("Cover image is too large, maximum size is {limit_mb} MB")]
    TooLarge { limit_mb: u64 },
    #[error("Uploaded file is empty")]
    EmptyFile,
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
