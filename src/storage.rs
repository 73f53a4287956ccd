//! # Storage Module
//!
//! Rehosts product images into object storage so drafts only ever carry
//! durable public URLs. Sources are either raw bytes (generated images,
//! rendered cards, chat attachments) or remote URLs to download first.

use async_trait::async_trait;
use chrono::Utc;
use image::ImageFormat;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::StorageSettings;
use crate::errors::StorageError;
use crate::http::build_client;
use crate::product::ProductTable;
use crate::text_processing::{slugify, truncate_chars};

/// Timeout for downloading a remote source image
pub const SOURCE_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(15);
/// Timeout for the upload request
pub const UPLOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Where the image to rehost comes from
#[derive(Debug, Clone, PartialEq)]
pub enum ImageSource {
    Bytes {
        data: Vec<u8>,
        content_type: Option<String>,
    },
    Url(String),
}

impl ImageSource {
    pub fn bytes(data: Vec<u8>) -> Self {
        ImageSource::Bytes {
            data,
            content_type: None,
        }
    }
}

/// Boundary between the pipeline and durable storage
#[async_trait]
pub trait Rehoster: Send + Sync {
    /// Store the image and return its public URL.
    ///
    /// A source that cannot be downloaded or is not an image yields
    /// [`StorageError::Source`]; a failed write yields
    /// [`StorageError::Upload`].
    async fn rehost(
        &self,
        source: ImageSource,
        filename_hint: &str,
        table: ProductTable,
    ) -> Result<String, StorageError>;
}

/// MIME type and file extension of an encoded image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageKind {
    pub mime: &'static str,
    pub extension: &'static str,
}

const SVG: ImageKind = ImageKind {
    mime: "image/svg+xml",
    extension: "svg",
};

fn kind_from_format(format: ImageFormat) -> Option<ImageKind> {
    let kind = match format {
        ImageFormat::Png => ImageKind { mime: "image/png", extension: "png" },
        ImageFormat::Jpeg => ImageKind { mime: "image/jpeg", extension: "jpg" },
        ImageFormat::Gif => ImageKind { mime: "image/gif", extension: "gif" },
        ImageFormat::WebP => ImageKind { mime: "image/webp", extension: "webp" },
        ImageFormat::Bmp => ImageKind { mime: "image/bmp", extension: "bmp" },
        ImageFormat::Ico => ImageKind { mime: "image/x-icon", extension: "ico" },
        ImageFormat::Avif => ImageKind { mime: "image/avif", extension: "avif" },
        _ => return None,
    };
    Some(kind)
}

fn kind_from_content_type(content_type: &str) -> Option<ImageKind> {
    let mime = content_type.split(';').next()?.trim().to_lowercase();
    let format = match mime.as_str() {
        "image/svg+xml" => return Some(SVG),
        "image/png" => ImageFormat::Png,
        "image/jpeg" | "image/jpg" => ImageFormat::Jpeg,
        "image/gif" => ImageFormat::Gif,
        "image/webp" => ImageFormat::WebP,
        "image/bmp" => ImageFormat::Bmp,
        "image/x-icon" | "image/vnd.microsoft.icon" => ImageFormat::Ico,
        "image/avif" => ImageFormat::Avif,
        _ => return None,
    };
    kind_from_format(format)
}

/// Sniff the image kind from magic bytes, an SVG prefix, or the declared
/// content type, in that order.
pub fn detect_image_kind(data: &[u8], declared: Option<&str>) -> Option<ImageKind> {
    if data.is_empty() {
        return None;
    }
    if let Some(kind) = image::guess_format(data).ok().and_then(kind_from_format) {
        return Some(kind);
    }
    let head = String::from_utf8_lossy(&data[..data.len().min(512)]).to_lowercase();
    let head = head.trim_start_matches('\u{feff}').trim_start();
    if head.starts_with("<svg") || (head.starts_with("<?xml") && head.contains("<svg")) {
        return Some(SVG);
    }
    declared.and_then(kind_from_content_type)
}

/// `<slug>-<unix millis>.<ext>`
pub fn object_name(filename_hint: &str, extension: &str) -> String {
    let slug = slugify(filename_hint, "-");
    let slug = if slug.is_empty() {
        "image".to_string()
    } else {
        truncate_chars(&slug, 60).trim_end_matches('-').to_string()
    };
    format!("{}-{}.{}", slug, Utc::now().timestamp_millis(), extension)
}

/// Supabase-compatible storage REST API
pub struct SupabaseStorage {
    settings: StorageSettings,
    download_client: Client,
    upload_client: Client,
}

impl SupabaseStorage {
    pub fn new(settings: StorageSettings) -> Self {
        Self {
            settings,
            download_client: build_client(SOURCE_DOWNLOAD_TIMEOUT),
            upload_client: build_client(UPLOAD_TIMEOUT),
        }
    }

    /// Bucket and folder for a table
    pub fn destination(&self, table: ProductTable) -> (&str, &str) {
        match table {
            ProductTable::Products => (
                self.settings.products_bucket.as_str(),
                self.settings.products_folder.as_str(),
            ),
            ProductTable::ExclusiveProducts => (
                self.settings.exclusive_bucket.as_str(),
                self.settings.exclusive_folder.as_str(),
            ),
        }
    }

    fn object_path(&self, table: ProductTable, file: &str) -> String {
        let (bucket, folder) = self.destination(table);
        let folder = folder.trim_matches('/');
        if folder.is_empty() {
            format!("{bucket}/{file}")
        } else {
            format!("{bucket}/{folder}/{file}")
        }
    }

    pub fn public_url(&self, table: ProductTable, file: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}",
            self.settings.base_url,
            self.object_path(table, file)
        )
    }

    async fn download(&self, url: &str) -> Result<(Vec<u8>, Option<String>), StorageError> {
        let response = self
            .download_client
            .get(url)
            .send()
            .await
            .map_err(|e| StorageError::Source(format!("{url}: {e}")))?;
        if !response.status().is_success() {
            return Err(StorageError::Source(format!("{url}: status {}", response.status())));
        }
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let data = response
            .bytes()
            .await
            .map_err(|e| StorageError::Source(format!("{url}: {e}")))?;
        Ok((data.to_vec(), content_type))
    }
}

#[async_trait]
impl Rehoster for SupabaseStorage {
    async fn rehost(
        &self,
        source: ImageSource,
        filename_hint: &str,
        table: ProductTable,
    ) -> Result<String, StorageError> {
        let (data, content_type) = match source {
            ImageSource::Bytes { data, content_type } => (data, content_type),
            ImageSource::Url(url) => self.download(&url).await?,
        };

        let kind = detect_image_kind(&data, content_type.as_deref())
            .ok_or_else(|| StorageError::Source("payload is not a recognizable image".into()))?;
        let file = object_name(filename_hint, kind.extension);
        debug!(file = %file, mime = kind.mime, bytes = data.len(), "Uploading image");

        let response = self
            .upload_client
            .post(format!(
                "{}/storage/v1/object/{}",
                self.settings.base_url,
                self.object_path(table, &file)
            ))
            .bearer_auth(&self.settings.service_key)
            .header("apikey", &self.settings.service_key)
            .header("x-upsert", "true")
            .header(reqwest::header::CONTENT_TYPE, kind.mime)
            .body(data)
            .send()
            .await
            .map_err(|e| StorageError::Upload(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::Upload(format!(
                "status {}: {}",
                status,
                truncate_chars(&body, 200)
            )));
        }

        let url = self.public_url(table, &file);
        info!(url = %url, table = table.table_name(), "Image rehosted");
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

    fn settings() -> StorageSettings {
        StorageSettings {
            base_url: "https://store.example.com".into(),
            service_key: "service".into(),
            products_bucket: "images".into(),
            products_folder: "products".into(),
            exclusive_bucket: "vault".into(),
            exclusive_folder: "/".into(),
        }
    }

    #[test]
    fn test_detect_by_magic_bytes() {
        let kind = detect_image_kind(PNG_MAGIC, Some("text/plain")).unwrap();
        assert_eq!(kind.extension, "png");
        let jpeg = [0xFF, 0xD8, 0xFF, 0xE0, 0, 0];
        assert_eq!(detect_image_kind(&jpeg, None).unwrap().mime, "image/jpeg");
    }

    #[test]
    fn test_detect_svg_prefix() {
        let svg = br#"<?xml version="1.0"?><svg xmlns="http://www.w3.org/2000/svg"></svg>"#;
        assert_eq!(detect_image_kind(svg, None), Some(SVG));
        assert_eq!(detect_image_kind(b"  <svg></svg>", None), Some(SVG));
    }

    #[test]
    fn test_detect_falls_back_to_content_type() {
        assert_eq!(
            detect_image_kind(b"opaque", Some("image/svg+xml; charset=utf-8")),
            Some(SVG)
        );
        assert_eq!(detect_image_kind(b"<html>", Some("text/html")), None);
        assert_eq!(detect_image_kind(b"", Some("image/png")), None);
    }

    #[test]
    fn test_object_name_shape() {
        let name = object_name("Netflix Premium 4K!", "png");
        assert!(name.starts_with("netflix-premium-4k-"));
        assert!(name.ends_with(".png"));
        assert!(object_name("***", "jpg").starts_with("image-"));
    }

    #[test]
    fn test_destinations_and_urls() {
        let storage = SupabaseStorage::new(settings());
        assert_eq!(storage.destination(ProductTable::Products), ("images", "products"));
        assert_eq!(
            storage.public_url(ProductTable::Products, "a.png"),
            "https://store.example.com/storage/v1/object/public/images/products/a.png"
        );
        assert_eq!(
            storage.public_url(ProductTable::ExclusiveProducts, "b.png"),
            "https://store.example.com/storage/v1/object/public/vault/b.png"
        );
    }
}
