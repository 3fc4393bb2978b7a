use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use serde::Deserialize;
use utoipa::IntoParams;

use super::common::{format_indonesian_date, report_filename};
use super::spec::{render_report, RenderAssets, ReportRequest};
use super::{GeneratedDocument, RenderError};
use crate::config::SchoolProfile;
use crate::pdf::compositor::decode_image;
use crate::pdf::{DecodedImage, SignatureCompositor};
use crate::storage::ObjectStorage;
use crate::template::TemplateRepository;

/// Per-request render options.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RenderOptions {
    /// Serve with `Content-Disposition: inline` instead of `attachment`.
    #[serde(default)]
    pub inline: bool,
    /// Printed date; defaults to today in Indonesian long form.
    #[serde(default)]
    pub date: Option<String>,
}

pub struct ReportService {
    templates: Arc<TemplateRepository>,
    storage: Arc<dyn ObjectStorage>,
    compositor: SignatureCompositor,
    school: SchoolProfile,
    logo_cache: Cache<String, Arc<DecodedImage>>,
}

impl ReportService {
    pub fn new(
        templates: Arc<TemplateRepository>,
        storage: Arc<dyn ObjectStorage>,
        school: SchoolProfile,
    ) -> Self {
        let logo_cache = Cache::builder()
            .time_to_live(Duration::from_secs(30 * 60))
            .max_capacity(8)
            .build();

        Self {
            templates,
            compositor: SignatureCompositor::new(storage.clone()),
            storage,
            school,
            logo_cache,
        }
    }

    /// Validate, resolve assets, lay out and serialize one report.
    ///
    /// The active template is read once; a concurrent deactivation only
    /// affects later requests.
    pub async fn render<R: ReportRequest>(
        &self,
        request: &R,
        options: &RenderOptions,
    ) -> Result<GeneratedDocument, RenderError> {
        request.validate().map_err(RenderError::InvalidRequest)?;

        let tanggal = options
            .date
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string)
            .unwrap_or_else(format_indonesian_date);
        let spec = request.build_spec(&self.school, &tanggal);

        let mut assets = RenderAssets {
            school_name: self.school.name.clone(),
            school_address: self.school.address.clone(),
            ..RenderAssets::default()
        };

        if spec.background_template {
            assets.background = Some(self.active_canvas().await?);
        }
        assets.logo_left = self.logo(self.school.logo_left.as_deref()).await;
        assets.logo_right = self.logo(self.school.logo_right.as_deref()).await;
        assets.signature = self.compositor.prepare(request.signer()).await;

        let pdf = render_report(&spec, &assets)?;
        let filename = report_filename(spec.filename_prefix, &spec.subject_name);
        log::info!("Rendered {} ({} bytes)", filename, pdf.len());

        Ok(GeneratedDocument {
            filename,
            pdf,
            tanggal,
        })
    }

    async fn active_canvas(&self) -> Result<DecodedImage, RenderError> {
        let template = self
            .templates
            .get_active()
            .await?
            .ok_or(RenderError::NoActiveTemplate)?;

        let bytes = self
            .storage
            .fetch(&template.storage_key)
            .await
            .map_err(|source| {
                log::error!(
                    "Active template {} unreachable at {}: {}",
                    template.id,
                    template.storage_key,
                    source
                );
                RenderError::AssetUnreachable {
                    location: template.storage_key.clone(),
                    source,
                }
            })?;

        log::debug!(
            "Using template {} ({}x{}) as certificate canvas",
            template.id,
            template.width,
            template.height
        );
        decode_image(&bytes, "template").map_err(|e| RenderError::TemplateUndecodable {
            id: template.id,
            reason: e.to_string(),
        })
    }

    /// Masthead logos are decoration: a missing logo only costs a warning.
    async fn logo(&self, location: Option<&str>) -> Option<DecodedImage> {
        let location = location?.trim();
        if location.is_empty() {
            return None;
        }
        if let Some(cached) = self.logo_cache.get(location).await {
            return Some(cached.as_ref().clone());
        }

        let decoded = match self.storage.fetch(location).await {
            Ok(bytes) => decode_image(&bytes, "logo").map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };
        match decoded {
            Ok(image) => {
                self.logo_cache
                    .insert(location.to_string(), Arc::new(image.clone()))
                    .await;
                Some(image)
            }
            Err(reason) => {
                log::warn!("Rendering masthead without logo {}: {}", location, reason);
                None
            }
        }
    }
}
