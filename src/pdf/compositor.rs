//! Signature and stamp overlay.
//!
//! Assets arrive as base64 (optionally a `data:` URL) or as a URL/path the
//! storage backend can fetch. A failure on either image is logged and that
//! image is left out; it never fails the document.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::ImageFormat;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use super::document::{DecodedImage, ReportDocument};
use crate::storage::{is_remote_url, ObjectStorage};

/// Stamp width in points at scale 1.0.
pub const BASE_STAMP_SIZE: f32 = 70.0;

/// A signature or stamp that is present but cannot be used.
#[derive(Debug, Error)]
pub enum PartialAssetError {
    #[error("{asset} is not valid base64: {source}")]
    Base64 {
        asset: &'static str,
        #[source]
        source: base64::DecodeError,
    },
    #[error("{asset} could not be fetched: {reason}")]
    Fetch { asset: &'static str, reason: String },
    #[error("{asset} is neither PNG nor JPEG: {source}")]
    Decode {
        asset: &'static str,
        #[source]
        source: image::ImageError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SignerRole {
    Principal,
    Teacher,
    Examiner,
}

fn default_stamp_scale() -> f32 {
    1.0
}

fn default_stamp_opacity() -> f32 {
    0.4
}

/// Signer profile as supplied by the caller.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignatureAsset {
    pub role: SignerRole,
    pub display_name: String,
    /// Role line printed above the signature, e.g. "Kepala Sekolah".
    pub title: String,
    #[serde(default)]
    pub signature: Option<String>,
    #[serde(default)]
    pub stamp: Option<String>,
    #[serde(default = "default_stamp_scale")]
    pub stamp_scale: f32,
    #[serde(default)]
    pub stamp_offset_x: f32,
    #[serde(default)]
    pub stamp_offset_y: f32,
    #[serde(default = "default_stamp_opacity")]
    pub stamp_opacity: f32,
}

impl SignatureAsset {
    pub fn new(role: SignerRole, display_name: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            role,
            display_name: display_name.into(),
            title: title.into(),
            signature: None,
            stamp: None,
            stamp_scale: default_stamp_scale(),
            stamp_offset_x: 0.0,
            stamp_offset_y: 0.0,
            stamp_opacity: default_stamp_opacity(),
        }
    }
}

#[derive(Debug, Clone)]
struct PreparedStamp {
    image: DecodedImage,
    scale: f32,
    offset_x: f32,
    offset_y: f32,
    opacity: f32,
}

/// Decoded images ready to draw onto a signature footprint.
#[derive(Debug, Clone, Default)]
pub struct PreparedSignature {
    signature: Option<DecodedImage>,
    stamp: Option<PreparedStamp>,
}

impl PreparedSignature {
    pub fn has_signature(&self) -> bool {
        self.signature.is_some()
    }

    pub fn has_stamp(&self) -> bool {
        self.stamp.is_some()
    }

    /// Draw into the footprint whose top-left corner is (`x`, `y`).
    ///
    /// The signature is fitted inside the footprint keeping its aspect ratio.
    /// The stamp is `BASE_STAMP_SIZE * scale` wide, centered on the footprint,
    /// then shifted by its offsets (positive y moves down).
    pub fn draw(&self, doc: &mut ReportDocument, x: f32, y: f32, width: f32, height: f32) {
        if let Some(signature) = &self.signature {
            let (w, h) = fit_within(signature, width, height);
            let handle = doc.add_image(signature.clone());
            doc.page().image(
                handle,
                x + (width - w) / 2.0,
                y + (height - h) / 2.0,
                w,
                h,
                None,
            );
        }

        if let Some(stamp) = &self.stamp {
            let w = BASE_STAMP_SIZE * stamp.scale;
            let h = w * stamp.image.height as f32 / stamp.image.width.max(1) as f32;
            let sx = x + width / 2.0 - w / 2.0 + stamp.offset_x;
            let sy = y + height / 2.0 - h / 2.0 + stamp.offset_y;
            let handle = doc.add_image(stamp.image.clone());
            let state = doc.opacity_state(stamp.opacity);
            doc.page().image(handle, sx, sy, w, h, Some(state));
        }
    }
}

fn fit_within(image: &DecodedImage, width: f32, height: f32) -> (f32, f32) {
    let (iw, ih) = (image.width.max(1) as f32, image.height.max(1) as f32);
    let scale = (width / iw).min(height / ih);
    (iw * scale, ih * scale)
}

/// PNG first, JPEG as the fallback.
pub fn decode_image(bytes: &[u8], asset: &'static str) -> Result<DecodedImage, PartialAssetError> {
    let decoded = image::load_from_memory_with_format(bytes, ImageFormat::Png)
        .or_else(|_| image::load_from_memory_with_format(bytes, ImageFormat::Jpeg))
        .map_err(|source| PartialAssetError::Decode { asset, source })?;
    let rgba = decoded.to_rgba8();
    Ok(DecodedImage::from_rgba(rgba.width(), rgba.height(), rgba.as_raw()))
}

fn decode_base64(encoded: &str, asset: &'static str) -> Result<Vec<u8>, PartialAssetError> {
    let payload = match encoded.split_once(";base64,") {
        Some((prefix, data)) if prefix.starts_with("data:") => data,
        _ => encoded,
    };
    let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD
        .decode(compact)
        .map_err(|source| PartialAssetError::Base64 { asset, source })
}

/// URLs and `/path/file.ext` references go through storage. Base64 never
/// contains '.', and JPEG base64 itself starts with '/'.
fn is_fetchable(source: &str) -> bool {
    is_remote_url(source) || (source.starts_with('/') && source.contains('.'))
}

pub struct SignatureCompositor {
    storage: Arc<dyn ObjectStorage>,
}

impl SignatureCompositor {
    pub fn new(storage: Arc<dyn ObjectStorage>) -> Self {
        Self { storage }
    }

    /// Resolve and decode both images. Never fails; unusable images are dropped.
    pub async fn prepare(&self, asset: &SignatureAsset) -> PreparedSignature {
        let signature = match asset.signature.as_deref() {
            Some(source) => self.load(source, "signature").await,
            None => None,
        };
        let stamp = match asset.stamp.as_deref() {
            Some(source) => self.load(source, "stamp").await.map(|image| PreparedStamp {
                image,
                scale: if asset.stamp_scale > 0.0 {
                    asset.stamp_scale
                } else {
                    default_stamp_scale()
                },
                offset_x: asset.stamp_offset_x,
                offset_y: asset.stamp_offset_y,
                opacity: asset.stamp_opacity.clamp(0.0, 1.0),
            }),
            None => None,
        };
        PreparedSignature { signature, stamp }
    }

    async fn load(&self, source: &str, asset: &'static str) -> Option<DecodedImage> {
        let source = source.trim();
        if source.is_empty() {
            return None;
        }
        match self.resolve(source, asset).await {
            Ok(image) => Some(image),
            Err(e) => {
                log::warn!("Rendering without {}: {}", asset, e);
                None
            }
        }
    }

    async fn resolve(&self, source: &str, asset: &'static str) -> Result<DecodedImage, PartialAssetError> {
        let bytes = if is_fetchable(source) {
            self.storage
                .fetch(source)
                .await
                .map_err(|e| PartialAssetError::Fetch {
                    asset,
                    reason: e.to_string(),
                })?
        } else {
            decode_base64(source, asset)?
        };
        decode_image(&bytes, asset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgba};
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = ImageBuffer::from_pixel(width, height, Rgba([200u8, 30, 30, 255]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
        let img: ImageBuffer<image::Rgb<u8>, Vec<u8>> =
            ImageBuffer::from_pixel(width, height, image::Rgb([30u8, 30, 200]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Jpeg).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_decode_png_then_jpeg() {
        let png = decode_image(&png_bytes(4, 2), "signature").unwrap();
        assert_eq!((png.width, png.height), (4, 2));

        let jpeg = decode_image(&jpeg_bytes(6, 3), "signature").unwrap();
        assert_eq!((jpeg.width, jpeg.height), (6, 3));

        assert!(matches!(
            decode_image(b"not an image", "stamp"),
            Err(PartialAssetError::Decode { asset: "stamp", .. })
        ));
    }

    #[test]
    fn test_decode_base64_accepts_data_url() {
        let raw = png_bytes(2, 2);
        let encoded = STANDARD.encode(&raw);

        assert_eq!(decode_base64(&encoded, "signature").unwrap(), raw);
        let data_url = format!("data:image/png;base64,{}", encoded);
        assert_eq!(decode_base64(&data_url, "signature").unwrap(), raw);
        assert!(decode_base64("%%%not-base64%%%", "stamp").is_err());
    }

    #[test]
    fn test_jpeg_base64_is_not_mistaken_for_a_path() {
        let encoded = STANDARD.encode(jpeg_bytes(2, 2));
        assert!(encoded.starts_with("/9j/"));
        assert!(!is_fetchable(&encoded));
        assert!(is_fetchable("/uploads/signatures/kepala.png"));
        assert!(is_fetchable("https://example.test/stamp.png"));
    }

    #[test]
    fn test_asset_defaults_from_json() {
        let asset: SignatureAsset = serde_json::from_str(
            r#"{"role":"principal","displayName":"Ustadz Ahmad","title":"Kepala Sekolah"}"#,
        )
        .unwrap();
        assert_eq!(asset.stamp_scale, 1.0);
        assert_eq!(asset.stamp_offset_x, 0.0);
        assert_eq!(asset.stamp_offset_y, 0.0);
        assert_eq!(asset.stamp_opacity, 0.4);
    }

    #[test]
    fn test_fit_within_keeps_aspect_ratio() {
        let wide = DecodedImage::from_rgba(400, 100, &vec![0u8; 400 * 100 * 4]);
        let (w, h) = fit_within(&wide, 120.0, 50.0);
        assert!((w - 120.0).abs() < 1e-3);
        assert!((h - 30.0).abs() < 1e-3);
    }
}
