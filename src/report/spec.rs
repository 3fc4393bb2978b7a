//! Per-report layout description and the single renderer every report goes through.

use crate::pdf::layout::{
    render_header, render_metadata_grid, render_paragraphs, render_signature_block,
    render_summary_box, render_table, render_title, render_title_sized, Masthead, SignatureBlock,
    TableSpec,
};
use super::validation::Validate;
use crate::config::SchoolProfile;
use crate::pdf::{DecodedImage, PageSize, PreparedSignature, ReportDocument, SignatureAsset};

pub const PAGE_MARGIN: f32 = 40.0;
pub const CERTIFICATE_MARGIN: f32 = 60.0;

#[derive(Debug, Clone)]
pub enum ReportBody {
    Table(TableSpec),
    Text(String),
}

/// Everything a report type contributes: data and column configuration only.
#[derive(Debug, Clone)]
pub struct ReportSpec {
    pub page: PageSize,
    pub margin: f32,
    pub background_template: bool,
    pub title: String,
    pub title_size: f32,
    pub subtitle: Option<String>,
    pub identity_left: Vec<(String, String)>,
    pub identity_right: Vec<(String, String)>,
    pub body: ReportBody,
    pub summary: Vec<(String, String)>,
    pub city: String,
    pub date: String,
    pub signer: SignatureAsset,
    pub filename_prefix: &'static str,
    pub subject_name: String,
}

/// Decoded images resolved before layout starts.
#[derive(Debug, Clone, Default)]
pub struct RenderAssets {
    pub school_name: String,
    pub school_address: String,
    pub logo_left: Option<DecodedImage>,
    pub logo_right: Option<DecodedImage>,
    pub background: Option<DecodedImage>,
    pub signature: PreparedSignature,
}

/// Lay out `spec` in the fixed order header, title, metadata grid, body,
/// summary, signature block.
pub fn build_document(spec: &ReportSpec, assets: &RenderAssets) -> ReportDocument {
    let mut doc = ReportDocument::new(spec.page, spec.margin);

    if spec.background_template {
        if let Some(background) = &assets.background {
            doc.set_background(background.clone());
        }
    }

    let masthead = Masthead {
        name: assets.school_name.clone(),
        address: assets.school_address.clone(),
        logo_left: assets.logo_left.clone().map(|logo| doc.add_image(logo)),
        logo_right: assets.logo_right.clone().map(|logo| doc.add_image(logo)),
    };
    render_header(&mut doc, &masthead);

    if spec.title_size > 14.0 {
        render_title_sized(&mut doc, &spec.title, spec.title_size);
    } else {
        render_title(&mut doc, &spec.title);
    }
    if let Some(subtitle) = &spec.subtitle {
        render_title_sized(&mut doc, subtitle, 11.0);
    }

    if !spec.identity_left.is_empty() || !spec.identity_right.is_empty() {
        render_metadata_grid(&mut doc, &spec.identity_left, &spec.identity_right);
    }

    match &spec.body {
        ReportBody::Table(table) => {
            render_table(&mut doc, table);
        }
        ReportBody::Text(text) => {
            render_paragraphs(&mut doc, text, 12.0);
        }
    }

    render_summary_box(&mut doc, &spec.summary);

    render_signature_block(
        &mut doc,
        &SignatureBlock {
            city: &spec.city,
            date: &spec.date,
            role: &spec.signer.title,
            signer_name: &spec.signer.display_name,
            signature: Some(&assets.signature),
        },
    );

    doc
}

/// A report request: validated, then turned into a [`ReportSpec`].
pub trait ReportRequest: Validate {
    fn signer(&self) -> &SignatureAsset;

    fn build_spec(&self, school: &SchoolProfile, date: &str) -> ReportSpec;
}

pub fn render_report(spec: &ReportSpec, assets: &RenderAssets) -> Result<Vec<u8>, lopdf::Error> {
    build_document(spec, assets).finish(&spec.title)
}
