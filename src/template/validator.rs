//! Upload validation for certificate template canvases.
//!
//! Checks run in order: size limit, PNG/JPEG signature, then pixel
//! dimensions and landscape orientation. The dimension check needs an image
//! decoder; whether one works is probed once per validator and cached. When
//! the probe fails the validator stays on the basic checks for the rest of
//! the process and reports the default canvas size instead.

use std::io::Cursor;
use std::sync::{Arc, OnceLock};

use serde::Serialize;
use utoipa::ToSchema;

pub const MAX_TEMPLATE_BYTES: usize = 5_000_000;
pub const MIN_WIDTH: u32 = 800;
pub const MIN_HEIGHT: u32 = 500;
pub const MIN_ASPECT_RATIO: f64 = 1.2;
/// Canvas size assumed when dimensions cannot be decoded.
pub const DEFAULT_CANVAS: (u32, u32) = (932, 661);

const PNG_MAGIC: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF];

/// 1x1 PNG used to check that the decoder actually works.
const PROBE_PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52,
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F, 0x15, 0xC4,
    0x89, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x44, 0x41, 0x54, 0x78, 0xDA, 0x63, 0x64, 0x60, 0xF8, 0x5F,
    0x0F, 0x00, 0x02, 0x87, 0x01, 0x80, 0xEB, 0x47, 0xBA, 0x92, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45,
    0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TemplateFormat {
    Png,
    Jpeg,
}

impl TemplateFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
        }
    }
}

/// Detect PNG/JPEG from the leading magic bytes.
pub fn sniff_format(bytes: &[u8]) -> Option<TemplateFormat> {
    if bytes.starts_with(PNG_MAGIC) {
        Some(TemplateFormat::Png)
    } else if bytes.starts_with(JPEG_MAGIC) {
        Some(TemplateFormat::Jpeg)
    } else {
        None
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TemplateMetadata {
    pub width: u32,
    pub height: u32,
    pub format: TemplateFormat,
    pub size_bytes: usize,
    /// True when dimensions were not decoded and `DEFAULT_CANVAS` was assumed.
    pub basic_validation: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ValidationOutcome {
    pub valid: bool,
    pub error: Option<String>,
    pub metadata: Option<TemplateMetadata>,
}

impl ValidationOutcome {
    fn rejected(error: impl Into<String>, metadata: Option<TemplateMetadata>) -> Self {
        Self {
            valid: false,
            error: Some(error.into()),
            metadata,
        }
    }

    fn accepted(metadata: TemplateMetadata) -> Self {
        Self {
            valid: true,
            error: None,
            metadata: Some(metadata),
        }
    }
}

/// Reads pixel dimensions out of encoded image bytes.
pub trait DimensionDecoder: Send + Sync {
    fn name(&self) -> &'static str;
    fn dimensions(&self, bytes: &[u8]) -> Result<(u32, u32), String>;
}

/// Decoder backed by the `image` crate; only the header is parsed.
pub struct ImageCrateDecoder;

impl DimensionDecoder for ImageCrateDecoder {
    fn name(&self) -> &'static str {
        "image"
    }

    fn dimensions(&self, bytes: &[u8]) -> Result<(u32, u32), String> {
        image::ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| e.to_string())?
            .into_dimensions()
            .map_err(|e| e.to_string())
    }
}

/// Check that the `image` decoder can read a known-good PNG.
pub fn probe_image_decoder() -> Option<Arc<dyn DimensionDecoder>> {
    let decoder = ImageCrateDecoder;
    match decoder.dimensions(PROBE_PNG) {
        Ok((1, 1)) => Some(Arc::new(decoder)),
        Ok(other) => {
            log::warn!(
                "Image decoder probe returned unexpected dimensions {:?}; using basic template validation",
                other
            );
            None
        }
        Err(e) => {
            log::warn!(
                "Image decoder unavailable ({}); using basic template validation",
                e
            );
            None
        }
    }
}

type DecoderProbe = Box<dyn Fn() -> Option<Arc<dyn DimensionDecoder>> + Send + Sync>;

pub struct TemplateValidator {
    probe: DecoderProbe,
    decoder: OnceLock<Option<Arc<dyn DimensionDecoder>>>,
}

impl Default for TemplateValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateValidator {
    pub fn new() -> Self {
        Self::with_probe(probe_image_decoder)
    }

    /// Validator whose decoder is resolved by `probe` on first use.
    pub fn with_probe<F>(probe: F) -> Self
    where
        F: Fn() -> Option<Arc<dyn DimensionDecoder>> + Send + Sync + 'static,
    {
        Self {
            probe: Box::new(probe),
            decoder: OnceLock::new(),
        }
    }

    /// Validator that never decodes dimensions.
    pub fn basic() -> Self {
        Self::with_probe(|| None)
    }

    fn decoder(&self) -> Option<&Arc<dyn DimensionDecoder>> {
        self.decoder
            .get_or_init(|| {
                let decoder = (self.probe)();
                match &decoder {
                    Some(d) => log::info!("Template validator using '{}' decoder", d.name()),
                    None => log::info!("Template validator running in basic mode"),
                }
                decoder
            })
            .as_ref()
    }

    pub fn decoder_available(&self) -> bool {
        self.decoder().is_some()
    }

    pub fn validate(&self, bytes: &[u8]) -> ValidationOutcome {
        if bytes.len() > MAX_TEMPLATE_BYTES {
            return ValidationOutcome::rejected(
                format!(
                    "file is {} bytes; the maximum template size is {} bytes (5 MB)",
                    bytes.len(),
                    MAX_TEMPLATE_BYTES
                ),
                None,
            );
        }

        let Some(format) = sniff_format(bytes) else {
            return ValidationOutcome::rejected("file is not a PNG or JPEG image", None);
        };

        let Some(decoder) = self.decoder() else {
            let (width, height) = DEFAULT_CANVAS;
            return ValidationOutcome::accepted(TemplateMetadata {
                width,
                height,
                format,
                size_bytes: bytes.len(),
                basic_validation: true,
            });
        };

        let (width, height) = match decoder.dimensions(bytes) {
            Ok(dimensions) => dimensions,
            Err(e) => {
                return ValidationOutcome::rejected(
                    format!("image dimensions could not be read: {}", e),
                    None,
                )
            }
        };

        let metadata = TemplateMetadata {
            width,
            height,
            format,
            size_bytes: bytes.len(),
            basic_validation: false,
        };

        if width < MIN_WIDTH {
            return ValidationOutcome::rejected(
                format!("image width {}px is below the minimum of {}px", width, MIN_WIDTH),
                Some(metadata),
            );
        }
        if height < MIN_HEIGHT {
            return ValidationOutcome::rejected(
                format!(
                    "image height {}px is below the minimum of {}px",
                    height, MIN_HEIGHT
                ),
                Some(metadata),
            );
        }
        let ratio = width as f64 / height as f64;
        if ratio < MIN_ASPECT_RATIO {
            return ValidationOutcome::rejected(
                format!(
                    "template must be landscape: aspect ratio {:.2} is below {:.1} ({}x{})",
                    ratio, MIN_ASPECT_RATIO, width, height
                ),
                Some(metadata),
            );
        }

        ValidationOutcome::accepted(metadata)
    }
}
