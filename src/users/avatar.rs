use bytes::Bytes;
use uuid::Uuid;

use crate::error::{
    AppError, AppResult, MAX_FILE_SIZE_MSG, NOT_ALLOWED_FILE_EXTENSION_MSG,
    NOT_ALLOWED_IMAGE_HEADER_MSG,
};

pub const MAX_AVATAR_BYTES: usize = 1 << 20;
const SNIFF_LEN: usize = 512;
const ALLOWED_CONTENT_TYPES: &[&str] = &["image/jpeg", "image/jpg", "image/png"];
const ALLOWED_EXTENSIONS: &[&str] = &["jpeg", "jpg", "png"];

/// A validated avatar file, ready to be stored.
#[derive(Debug, Clone)]
pub struct AvatarUpload {
    pub bucket: String,
    pub content_type: &'static str,
    pub extension: &'static str,
    pub body: Bytes,
}

impl AvatarUpload {
    /// Validates size, declared type, file extension and the actual bytes.
    pub fn new(
        bucket: String,
        file_name: &str,
        declared_type: &str,
        body: Bytes,
    ) -> AppResult<Self> {
        if body.len() > MAX_AVATAR_BYTES {
            return Err(AppError::bad_request(MAX_FILE_SIZE_MSG));
        }
        if !ALLOWED_CONTENT_TYPES.contains(&declared_type) {
            return Err(AppError::bad_request(NOT_ALLOWED_IMAGE_HEADER_MSG)
                .with_cause(anyhow::anyhow!("declared content type {:?}", declared_type)));
        }
        if !file_extension(file_name).is_some_and(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str())) {
            return Err(AppError::bad_request(NOT_ALLOWED_FILE_EXTENSION_MSG)
                .with_cause(anyhow::anyhow!("file name {:?}", file_name)));
        }
        let kind = sniff_image_type(&body).ok_or_else(|| {
            AppError::bad_request(NOT_ALLOWED_IMAGE_HEADER_MSG)
                .with_cause(anyhow::anyhow!("content of {:?} is not jpeg or png", file_name))
        })?;

        // stored type follows the bytes, not the client's claim
        Ok(Self {
            bucket,
            content_type: kind.content_type(),
            extension: kind.extension(),
            body,
        })
    }

    pub fn object_key(&self, user_id: Uuid) -> String {
        format!("avatars/{}/{}.{}", user_id, Uuid::new_v4(), self.extension)
    }
}

fn file_extension(file_name: &str) -> Option<String> {
    let (stem, ext) = file_name.rsplit_once('.')?;
    if stem.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
}

impl ImageKind {
    pub fn content_type(self) -> &'static str {
        match self {
            ImageKind::Jpeg => "image/jpeg",
            ImageKind::Png => "image/png",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ImageKind::Jpeg => "jpg",
            ImageKind::Png => "png",
        }
    }
}

/// Image kind detected from magic numbers in the leading bytes.
pub fn sniff_image_type(body: &[u8]) -> Option<ImageKind> {
    let head = &body[..body.len().min(SNIFF_LEN)];
    if head.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some(ImageKind::Jpeg)
    } else if head.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        Some(ImageKind::Png)
    } else {
        None
    }
}
