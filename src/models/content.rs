use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use std::path::Path;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ModerationStatus {
    Pending,
    Approved,
    Rejected,
}

impl ModerationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModerationStatus::Pending => "pending",
            ModerationStatus::Approved => "approved",
            ModerationStatus::Rejected => "rejected",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(ModerationStatus::Pending),
            "approved" => Some(ModerationStatus::Approved),
            "rejected" => Some(ModerationStatus::Rejected),
            _ => None,
        }
    }
}

/// A piece of creator media. The file itself lives under the upload root.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContentItem {
    pub id: Uuid,
    pub creator_id: Uuid,
    pub title: String,
    pub file_path: String,
    pub status: ModerationStatus,
    pub created_at: DateTime<Utc>,
}

impl ContentItem {
    pub fn new(creator_id: Uuid, title: String, file_path: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            creator_id,
            title,
            file_path,
            status: ModerationStatus::Pending,
            created_at: Utc::now(),
        }
    }
}

/// Raster formats the gate knows how to serve.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
}

impl ImageFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
            "png" => Some(ImageFormat::Png),
            _ => None,
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_detection() {
        assert_eq!(ImageFormat::from_path(Path::new("alice/a.JPG")), Some(ImageFormat::Jpeg));
        assert_eq!(ImageFormat::from_path(Path::new("alice/a.jpeg")), Some(ImageFormat::Jpeg));
        assert_eq!(ImageFormat::from_path(Path::new("alice/a.png")), Some(ImageFormat::Png));
        assert_eq!(ImageFormat::from_path(Path::new("alice/a.gif")), None);
        assert_eq!(ImageFormat::from_path(Path::new("alice/noext")), None);
    }

    #[test]
    fn test_new_content_is_pending() {
        let item = ContentItem::new(Uuid::new_v4(), "sunset".to_string(), "alice/x.png".to_string());
        assert_eq!(item.status, ModerationStatus::Pending);
    }
}
