use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

use crate::errors::ContentError;
use crate::models::common::WATERMARK_TEXT;
use crate::models::content::{ContentItem, ImageFormat};
use crate::services::entitlement::EntitlementService;
use crate::services::store::ContentCatalog;
use crate::services::watermark::WatermarkRenderer;

/// Image bytes ready to be sent to the viewer.
#[derive(Debug, Clone)]
pub struct ServedAsset {
    pub bytes: Vec<u8>,
    pub format: ImageFormat,
    pub filename: String,
    pub watermarked: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DownloadDecision {
    Grant { path: PathBuf, filename: String },
    Deny,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Download {
    File { bytes: Vec<u8>, filename: String },
    Denied,
}

/// Decides what a subscriber gets to see of a creator's media.
#[derive(Clone)]
pub struct ContentGate {
    catalog: Arc<dyn ContentCatalog>,
    entitlements: EntitlementService,
    renderer: WatermarkRenderer,
    upload_root: PathBuf,
}

impl ContentGate {
    pub fn new(
        catalog: Arc<dyn ContentCatalog>,
        entitlements: EntitlementService,
        upload_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            catalog,
            entitlements,
            renderer: WatermarkRenderer::new(),
            upload_root: upload_root.into(),
        }
    }

    /// Original bytes for subscribers, a watermarked copy for everyone else.
    /// Not being subscribed is never an error here.
    pub async fn resolve_view(&self, subscriber_id: Uuid, content_id: Uuid) -> Result<ServedAsset, ContentError> {
        log::info!(
            "serve_protected_image content_id={} user_id={}",
            content_id, subscriber_id
        );

        let content = self.lookup(content_id).await?;
        let path = self.asset_path(&content)?;
        let format = ImageFormat::from_path(&path).ok_or_else(|| {
            let extension = extension_of(&path);
            log::warn!("unsupported_image_format content_id={} extension={}", content_id, extension);
            ContentError::UnsupportedFormat(extension)
        })?;

        let subscribed = self.entitlements.is_entitled(subscriber_id, content.creator_id).await?;
        let original = read_asset(&path).await?;
        let filename = file_name(&path);

        if subscribed {
            log::info!("image_served_original content_id={} user_id={}", content_id, subscriber_id);
            return Ok(ServedAsset {
                bytes: original,
                format,
                filename,
                watermarked: false,
            });
        }

        let bytes = self
            .renderer
            .apply(&original, format, WATERMARK_TEXT)
            .map_err(|e| {
                log::error!("watermark_failed content_id={} error={}", content_id, e);
                ContentError::from(e)
            })?;
        log::info!("image_served_watermarked content_id={} user_id={}", content_id, subscriber_id);

        Ok(ServedAsset {
            bytes,
            format,
            filename,
            watermarked: true,
        })
    }

    pub async fn authorize_download(
        &self,
        subscriber_id: Uuid,
        content_id: Uuid,
    ) -> Result<DownloadDecision, ContentError> {
        let content = self.lookup(content_id).await?;

        if !self.entitlements.is_entitled(subscriber_id, content.creator_id).await? {
            log::info!(
                "download_denied content_id={} user_id={} creator_id={}",
                content_id, subscriber_id, content.creator_id
            );
            return Ok(DownloadDecision::Deny);
        }

        let path = self.asset_path(&content)?;
        if !tokio::fs::try_exists(&path).await? {
            log::warn!("asset_missing content_id={} path={}", content_id, path.display());
            return Err(ContentError::AssetMissingOnStorage(path));
        }

        let filename = file_name(&path);
        Ok(DownloadDecision::Grant { path, filename })
    }

    /// The original file in full, or nothing.
    pub async fn download(&self, subscriber_id: Uuid, content_id: Uuid) -> Result<Download, ContentError> {
        match self.authorize_download(subscriber_id, content_id).await? {
            DownloadDecision::Grant { path, filename } => {
                let bytes = read_asset(&path).await?;
                log::info!(
                    "download_granted content_id={} user_id={} bytes={}",
                    content_id,
                    subscriber_id,
                    bytes.len()
                );
                Ok(Download::File { bytes, filename })
            }
            DownloadDecision::Deny => Ok(Download::Denied),
        }
    }

    async fn lookup(&self, content_id: Uuid) -> Result<ContentItem, ContentError> {
        self.catalog.find_content(content_id).await?.ok_or_else(|| {
            log::info!("content_not_found content_id={}", content_id);
            ContentError::ContentNotFound(content_id)
        })
    }

    /// Joins the stored relative path onto the upload root. Anything that
    /// could land outside the root is treated as missing.
    fn asset_path(&self, content: &ContentItem) -> Result<PathBuf, ContentError> {
        let relative = Path::new(&content.file_path);
        let contained = !content.file_path.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));

        if !contained {
            log::warn!(
                "asset_path_rejected content_id={} file_path={}",
                content.id, content.file_path
            );
            return Err(ContentError::AssetMissingOnStorage(relative.to_path_buf()));
        }
        Ok(self.upload_root.join(relative))
    }
}

async fn read_asset(path: &Path) -> Result<Vec<u8>, ContentError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            log::warn!("asset_missing path={}", path.display());
            Err(ContentError::AssetMissingOnStorage(path.to_path_buf()))
        }
        Err(e) => Err(ContentError::Io(e)),
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|ext| ext.to_string_lossy().into_owned())
        .unwrap_or_default()
}
