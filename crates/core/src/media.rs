use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum MediaError {
    #[error("media cloud name is not configured")]
    MissingCloudName,
    #[error("invalid media URL: {0}")]
    InvalidUrl(String),
    #[error("file is {size} bytes, the limit is {max}")]
    TooLarge { size: u64, max: u64 },
    #[error("unsupported {kind} file type: {file_name}")]
    UnsupportedType { kind: MediaKind, file_name: String },
    #[error("unknown media kind: {0}")]
    UnknownKind(String),
}

//
// ─── KIND ──────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Upload size limit shared by both kinds.
    pub const MAX_UPLOAD_BYTES: u64 = 50 * 1024 * 1024;

    /// Resource type on the media host; also the multipart field name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
        }
    }

    #[must_use]
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            Self::Image => &["jpg", "jpeg", "png", "gif", "webp"],
            Self::Video => &["mp4", "mov", "avi", "webm"],
        }
    }

    /// Best-effort MIME type from the file extension.
    #[must_use]
    pub fn mime_for(self, file_name: &str) -> &'static str {
        match extension(file_name).as_deref() {
            Some("jpg" | "jpeg") => "image/jpeg",
            Some("png") => "image/png",
            Some("gif") => "image/gif",
            Some("webp") => "image/webp",
            Some("mp4") => "video/mp4",
            Some("mov") => "video/quicktime",
            Some("avi") => "video/x-msvideo",
            Some("webm") => "video/webm",
            _ => "application/octet-stream",
        }
    }

    /// Client-side upload check: size limit and a known extension.
    ///
    /// # Errors
    ///
    /// `TooLarge` or `UnsupportedType`.
    pub fn check_upload(self, file_name: &str, size: u64) -> Result<(), MediaError> {
        if size > Self::MAX_UPLOAD_BYTES {
            return Err(MediaError::TooLarge {
                size,
                max: Self::MAX_UPLOAD_BYTES,
            });
        }
        match extension(file_name) {
            Some(ext) if self.extensions().contains(&ext.as_str()) => Ok(()),
            _ => Err(MediaError::UnsupportedType {
                kind: self,
                file_name: file_name.to_owned(),
            }),
        }
    }
}

fn extension(file_name: &str) -> Option<String> {
    let (stem, ext) = file_name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaKind {
    type Err = MediaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "image" => Ok(Self::Image),
            "video" => Ok(Self::Video),
            other => Err(MediaError::UnknownKind(other.to_owned())),
        }
    }
}

//
// ─── DELIVERY URLS ─────────────────────────────────────────────────────────────
//

/// Builds delivery URLs on the media host for one cloud.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaHost {
    base: Url,
    cloud_name: String,
}

impl MediaHost {
    pub const DEFAULT_BASE: &'static str = "https://res.cloudinary.com/";

    /// # Errors
    ///
    /// `MissingCloudName` for a blank cloud name.
    pub fn new(cloud_name: impl Into<String>) -> Result<Self, MediaError> {
        Self::with_base(Self::DEFAULT_BASE, cloud_name)
    }

    /// # Errors
    ///
    /// `InvalidUrl` when `base` cannot be a URL base, `MissingCloudName` for a
    /// blank cloud name.
    pub fn with_base(base: &str, cloud_name: impl Into<String>) -> Result<Self, MediaError> {
        let cloud_name = cloud_name.into().trim().to_owned();
        if cloud_name.is_empty() {
            return Err(MediaError::MissingCloudName);
        }
        let base = Url::parse(base).map_err(|e| MediaError::InvalidUrl(e.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(MediaError::InvalidUrl(base.to_string()));
        }
        Ok(Self { base, cloud_name })
    }

    #[must_use]
    pub fn cloud_name(&self) -> &str {
        &self.cloud_name
    }

    /// Image URL, optionally cropped to fill `width` (and `height`).
    /// An empty public id gives an empty string.
    #[must_use]
    pub fn image_url(&self, public_id: &str, width: Option<u32>, height: Option<u32>) -> String {
        let transform = match (width, height) {
            (Some(w), Some(h)) => Some(format!("c_fill,w_{w},h_{h}")),
            (Some(w), None) => Some(format!("c_fill,w_{w}")),
            _ => None,
        };
        self.build(MediaKind::Image, public_id, transform.as_deref())
    }

    #[must_use]
    pub fn video_url(&self, public_id: &str) -> String {
        self.build(MediaKind::Video, public_id, None)
    }

    /// A stored reference is either already a full URL or a public id.
    #[must_use]
    pub fn resolve(&self, kind: MediaKind, reference: &str) -> String {
        let reference = reference.trim();
        if Url::parse(reference).is_ok() {
            return reference.to_owned();
        }
        match kind {
            MediaKind::Image => self.image_url(reference, None, None),
            MediaKind::Video => self.video_url(reference),
        }
    }

    fn build(&self, kind: MediaKind, public_id: &str, transform: Option<&str>) -> String {
        let public_id = public_id.trim().trim_matches('/');
        if public_id.is_empty() {
            return String::new();
        }
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .push(&self.cloud_name)
                .push(kind.as_str())
                .push("upload");
            if let Some(transform) = transform {
                segments.push(transform);
            }
            segments.extend(public_id.split('/'));
        }
        url.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host() -> MediaHost {
        MediaHost::new("demo").unwrap()
    }

    #[test]
    fn image_url_with_fill_transform() {
        assert_eq!(
            host().image_url("tutorials/keran", Some(300), Some(200)),
            "https://res.cloudinary.com/demo/image/upload/c_fill,w_300,h_200/tutorials/keran"
        );
        assert_eq!(
            host().image_url("keran", Some(300), None),
            "https://res.cloudinary.com/demo/image/upload/c_fill,w_300/keran"
        );
        assert_eq!(
            host().image_url("keran", None, Some(200)),
            "https://res.cloudinary.com/demo/image/upload/keran"
        );
    }

    #[test]
    fn video_url_uses_video_path() {
        assert_eq!(
            host().video_url("clip"),
            "https://res.cloudinary.com/demo/video/upload/clip"
        );
    }

    #[test]
    fn empty_public_id_gives_empty_url() {
        assert_eq!(host().image_url("  ", Some(10), Some(10)), "");
        assert_eq!(host().video_url(""), "");
    }

    #[test]
    fn resolve_passes_full_urls_through() {
        let url = "https://cdn.example.com/a.png";
        assert_eq!(host().resolve(MediaKind::Image, url), url);
        assert_eq!(
            host().resolve(MediaKind::Video, "clip"),
            "https://res.cloudinary.com/demo/video/upload/clip"
        );
    }

    #[test]
    fn blank_cloud_name_is_rejected() {
        assert_eq!(MediaHost::new(" "), Err(MediaError::MissingCloudName));
    }

    #[test]
    fn upload_check_enforces_size_and_type() {
        assert!(MediaKind::Image.check_upload("foto.PNG", 1024).is_ok());
        assert!(matches!(
            MediaKind::Image.check_upload("clip.mp4", 1024),
            Err(MediaError::UnsupportedType { .. })
        ));
        assert!(matches!(
            MediaKind::Video.check_upload("clip.mp4", MediaKind::MAX_UPLOAD_BYTES + 1),
            Err(MediaError::TooLarge { .. })
        ));
        assert!(MediaKind::Video.check_upload("noext", 1).is_err());
    }

    #[test]
    fn mime_and_kind_parsing() {
        assert_eq!(MediaKind::Video.mime_for("a.mov"), "video/quicktime");
        assert_eq!("Image".parse::<MediaKind>().unwrap(), MediaKind::Image);
        assert!("audio".parse::<MediaKind>().is_err());
    }
}
