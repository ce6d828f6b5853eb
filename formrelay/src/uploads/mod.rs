//! Temporary storage for files attached to `/send-file` submissions.
//!
//! An upload lives on disk only while its request is being relayed. Every upload is
//! written below a single root directory with a collision-free name, and every open or
//! delete is checked against that root by the [`guard`] first.

pub mod guard;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use axum::extract::multipart::{Field, MultipartError};
use axum::http::StatusCode;
use bytes::Bytes;
use chrono::Utc;
use futures::{Stream, StreamExt, TryStreamExt};
use tokio::io::AsyncWriteExt;

use crate::config::UploadConfig;
use crate::errors::{Error, Result};

/// Longest client-supplied file name kept in the stored name
const MAX_NAME_LEN: usize = 100;

/// A file accepted from a multipart request and written to the upload directory.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Absolute path inside the upload directory
    pub path: PathBuf,
    /// File name as sent by the client
    pub original_name: String,
    pub mime_type: String,
    pub size_bytes: u64,
}

impl UploadedFile {
    /// Whether the bot API should receive this as a photo rather than a document.
    ///
    /// SVG is an image type but the photo endpoint rejects it.
    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/") && self.mime_type != "image/svg+xml"
    }
}

/// An opened upload, ready to be streamed to the bot API.
#[derive(Debug)]
pub struct Attachment {
    pub file: tokio::fs::File,
    pub file_name: String,
    pub mime_type: String,
    pub size_bytes: u64,
}

/// Owner of the upload directory.
#[derive(Debug, Clone)]
pub struct UploadStore {
    root: PathBuf,
    max_file_size: u64,
    allowed_mime_types: Arc<[String]>,
}

impl UploadStore {
    /// Create the upload directory if needed and resolve it to its canonical path.
    pub async fn new(config: &UploadConfig) -> anyhow::Result<Self> {
        tokio::fs::create_dir_all(&config.temp_dir)
            .await
            .with_context(|| format!("Failed to create upload directory {}", config.temp_dir.display()))?;
        let root = tokio::fs::canonicalize(&config.temp_dir)
            .await
            .with_context(|| format!("Failed to resolve upload directory {}", config.temp_dir.display()))?;

        Ok(Self {
            root,
            max_file_size: config.max_file_size,
            allowed_mime_types: config.allowed_mime_types.iter().map(|m| m.to_ascii_lowercase()).collect(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    pub fn accepts(&self, mime_type: &str) -> bool {
        self.allowed_mime_types.iter().any(|allowed| allowed == mime_type)
    }

    /// Translate a multipart failure, keeping body-limit violations distinguishable.
    pub fn multipart_error(&self, error: MultipartError) -> Error {
        if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Error::FileTooLarge {
                max_bytes: self.max_file_size,
            }
        } else {
            Error::Upload {
                message: error.body_text(),
            }
        }
    }

    /// Stream a multipart file field to disk.
    pub async fn save_field(&self, field: Field<'_>) -> Result<UploadedFile> {
        let original_name = field.file_name().unwrap_or_default().to_string();
        let mime_type = resolve_mime_type(field.content_type(), &original_name);
        let chunks = field.map_err(|e| self.multipart_error(e));

        self.save(&original_name, &mime_type, chunks).await
    }

    /// Write `chunks` to a fresh file in the upload directory.
    ///
    /// The MIME type is checked before anything touches the disk. The size limit is
    /// checked before each chunk is written; on any failure the partial file is removed.
    pub async fn save<S>(&self, original_name: &str, mime_type: &str, chunks: S) -> Result<UploadedFile>
    where
        S: Stream<Item = Result<Bytes>>,
    {
        if !self.accepts(mime_type) {
            tracing::debug!(file = %original_name, mime_type = %mime_type, "Rejecting upload with disallowed MIME type");
            return Err(Error::UnsupportedFileType {
                mime_type: mime_type.to_string(),
            });
        }

        let path = self.root.join(stored_file_name(original_name));
        guard::ensure_within(&path, &self.root).await?;

        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|e| Error::Internal {
                operation: format!("create upload file {}: {e}", path.display()),
            })?;

        match self.write_chunks(&mut file, chunks).await {
            Ok(size_bytes) => {
                tracing::info!(
                    file = %original_name,
                    mime_type = %mime_type,
                    size_bytes = size_bytes,
                    "Stored upload"
                );
                Ok(UploadedFile {
                    path,
                    original_name: original_name.to_string(),
                    mime_type: mime_type.to_string(),
                    size_bytes,
                })
            }
            Err(e) => {
                drop(file);
                self.remove_path(&path).await;
                Err(e)
            }
        }
    }

    async fn write_chunks<S>(&self, file: &mut tokio::fs::File, chunks: S) -> Result<u64>
    where
        S: Stream<Item = Result<Bytes>>,
    {
        let mut chunks = std::pin::pin!(chunks);
        let mut total_size = 0u64;

        while let Some(chunk) = chunks.next().await {
            let chunk = chunk?;
            total_size += chunk.len() as u64;

            if total_size > self.max_file_size {
                tracing::warn!(
                    total_size = total_size,
                    max_file_size = self.max_file_size,
                    "File size limit exceeded, aborting upload"
                );
                return Err(Error::FileTooLarge {
                    max_bytes: self.max_file_size,
                });
            }

            file.write_all(&chunk).await.map_err(|e| Error::Internal {
                operation: format!("write upload chunk: {e}"),
            })?;
        }

        file.flush().await.map_err(|e| Error::Internal {
            operation: format!("flush upload: {e}"),
        })?;
        Ok(total_size)
    }

    /// Open an upload for reading. Refused if the path escapes the upload directory.
    pub async fn open(&self, upload: &UploadedFile) -> Result<Attachment> {
        guard::ensure_within(&upload.path, &self.root).await?;

        let file = tokio::fs::File::open(&upload.path).await.map_err(|e| Error::Internal {
            operation: format!("open upload {}: {e}", upload.path.display()),
        })?;

        Ok(Attachment {
            file,
            file_name: upload.original_name.clone(),
            mime_type: upload.mime_type.clone(),
            size_bytes: upload.size_bytes,
        })
    }

    /// Delete an upload. Failures are logged, never returned.
    pub async fn remove(&self, upload: &UploadedFile) {
        self.remove_path(&upload.path).await;
    }

    async fn remove_path(&self, path: &Path) {
        if guard::ensure_within(path, &self.root).await.is_err() {
            return;
        }

        match tokio::fs::remove_file(path).await {
            Ok(()) => tracing::debug!(path = %path.display(), "Removed upload"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Upload already gone");
            }
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "Failed to remove upload"),
        }
    }

    /// Remove uploads left behind by a previous process (e.g. after a crash mid-request).
    ///
    /// Only files named like [`stored_file_name`] output are touched, so anything else
    /// sharing the directory survives. Returns the number of files removed.
    pub async fn purge(&self) -> anyhow::Result<usize> {
        let mut entries = tokio::fs::read_dir(&self.root)
            .await
            .with_context(|| format!("Failed to list upload directory {}", self.root.display()))?;

        let mut removed = 0;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            if !entry.file_name().to_str().is_some_and(is_stored_file_name) {
                tracing::debug!(path = %entry.path().display(), "Leaving foreign file in upload directory");
                continue;
            }
            let path = entry.path();
            self.remove_path(&path).await;
            if tokio::fs::symlink_metadata(&path).await.is_err() {
                removed += 1;
            }
        }
        Ok(removed)
    }
}

/// Pick the MIME type for an uploaded part.
///
/// The declared type wins unless it is missing or the generic `application/octet-stream`
/// browsers send for unknown types, in which case it is guessed from the file name.
pub fn resolve_mime_type(declared: Option<&str>, file_name: &str) -> String {
    let declared = declared
        .and_then(|m| m.split(';').next())
        .map(|m| m.trim().to_ascii_lowercase())
        .filter(|m| !m.is_empty() && m != "application/octet-stream");

    declared
        .or_else(|| mime_guess::from_path(file_name).first().map(|m| m.essence_str().to_string()))
        .unwrap_or_else(|| "application/octet-stream".to_string())
}

/// `<unix millis>-<random>-<sanitized name>`, unique across concurrent requests.
fn stored_file_name(original_name: &str) -> String {
    format!(
        "{}-{}-{}",
        Utc::now().timestamp_millis(),
        rand::random::<u32>(),
        safe_file_name(original_name)
    )
}

/// Whether `name` has the shape produced by [`stored_file_name`].
fn is_stored_file_name(name: &str) -> bool {
    let mut parts = name.splitn(3, '-');
    let (Some(millis), Some(random), Some(safe_name)) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };

    !millis.is_empty()
        && millis.bytes().all(|b| b.is_ascii_digit())
        && random.bytes().all(|b| b.is_ascii_digit())
        && random.parse::<u32>().is_ok()
        && !safe_name.is_empty()
        && safe_name.len() <= MAX_NAME_LEN
        && safe_name.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}

/// Keep only the last path component and replace anything outside `[A-Za-z0-9._-]`.
fn safe_file_name(original_name: &str) -> String {
    let base = original_name.rsplit(['/', '\\']).next().unwrap_or_default();
    let safe: String = base
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') { c } else { '_' })
        .take(MAX_NAME_LEN)
        .collect();

    if safe.is_empty() { "upload".to_string() } else { safe }
}
