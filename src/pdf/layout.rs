//! Layout primitives shared by every report.
//!
//! Each primitive draws at the document cursor and leaves the cursor below
//! what it drew. None of them keeps state between calls.

use super::compositor::PreparedSignature;
use super::document::{Color, ImageHandle, PageOps, ReportDocument};
use super::fonts::{fit_text, wrap_text, Font};

pub const HEADER_LOGO_SIZE: f32 = 56.0;
pub const METADATA_ROW_HEIGHT: f32 = 16.0;
pub const TABLE_HEADER_HEIGHT: f32 = 20.0;
pub const TABLE_ROW_HEIGHT: f32 = 18.0;
pub const SIGNATURE_BLOCK_WIDTH: f32 = 200.0;
pub const SIGNATURE_FOOTPRINT: (f32, f32) = (120.0, 50.0);

const CELL_PADDING: f32 = 4.0;
const METADATA_LABEL_WIDTH: f32 = 90.0;

pub const PRIMARY: Color = Color(22, 101, 52);
pub const ZEBRA: Color = Color(240, 253, 244);
pub const BORDER: Color = Color(190, 190, 190);
pub const MUTED: Color = Color(90, 90, 90);

/// Institution masthead content.
#[derive(Debug, Clone, Default)]
pub struct Masthead {
    pub name: String,
    pub address: String,
    pub logo_left: Option<ImageHandle>,
    pub logo_right: Option<ImageHandle>,
}

/// Logos left and right, centered name and address, then a thick rule and a thin accent rule.
pub fn render_header(doc: &mut ReportDocument, masthead: &Masthead) -> f32 {
    let top = doc.cursor();
    let (left, right) = (doc.left(), doc.right());
    let center = left + doc.content_width() / 2.0;
    let text_width = doc.content_width() - 2.0 * (HEADER_LOGO_SIZE + 8.0);

    let page = doc.page();
    if let Some(logo) = masthead.logo_left {
        page.image(logo, left, top, HEADER_LOGO_SIZE, HEADER_LOGO_SIZE, None);
    }
    if let Some(logo) = masthead.logo_right {
        page.image(
            logo,
            right - HEADER_LOGO_SIZE,
            top,
            HEADER_LOGO_SIZE,
            HEADER_LOGO_SIZE,
            None,
        );
    }

    let name = fit_text(&masthead.name.to_uppercase(), Font::Bold, 16.0, text_width);
    page.text_centered(center, top + 22.0, Font::Bold, 16.0, PRIMARY, &name);

    let mut baseline = top + 38.0;
    for line in wrap_text(&masthead.address, Font::Regular, 9.0, text_width)
        .iter()
        .take(2)
    {
        page.text_centered(center, baseline, Font::Regular, 9.0, MUTED, line);
        baseline += 11.0;
    }

    let rule = top + HEADER_LOGO_SIZE + 6.0;
    page.line(left, rule, right, rule, 2.0, Color::BLACK);
    page.line(left, rule + 3.0, right, rule + 3.0, 0.75, Color::BLACK);

    doc.set_cursor(rule + 3.0 + 16.0);
    doc.cursor()
}

/// Centered bold title line.
pub fn render_title(doc: &mut ReportDocument, text: &str) -> f32 {
    render_title_sized(doc, text, 14.0)
}

pub fn render_title_sized(doc: &mut ReportDocument, text: &str, size: f32) -> f32 {
    doc.ensure_space(size * 2.0);
    let center = doc.left() + doc.content_width() / 2.0;
    let baseline = doc.cursor() + size;
    let fitted = fit_text(text, Font::Bold, size, doc.content_width());
    doc.page()
        .text_centered(center, baseline, Font::Bold, size, Color::BLACK, &fitted);
    doc.advance(size * 1.8)
}

/// Two independent label/value columns.
///
/// The cursor ends exactly `max(left, right) * METADATA_ROW_HEIGHT` below
/// where the grid started.
pub fn render_metadata_grid(
    doc: &mut ReportDocument,
    left_pairs: &[(String, String)],
    right_pairs: &[(String, String)],
) -> f32 {
    let rows = left_pairs.len().max(right_pairs.len());
    doc.ensure_space(rows as f32 * METADATA_ROW_HEIGHT);

    let start = doc.cursor();
    let column_width = doc.content_width() / 2.0;
    let columns = [(doc.left(), left_pairs), (doc.left() + column_width, right_pairs)];

    let page = doc.page();
    for (x, pairs) in columns {
        let value_width = column_width - METADATA_LABEL_WIDTH - 8.0;
        for (idx, (label, value)) in pairs.iter().enumerate() {
            let baseline = start + idx as f32 * METADATA_ROW_HEIGHT + 11.0;
            page.text(x, baseline, Font::Regular, 10.0, MUTED, label);
            let value = format!(": {}", value);
            let value = fit_text(&value, Font::Bold, 10.0, value_width);
            page.text(
                x + METADATA_LABEL_WIDTH,
                baseline,
                Font::Bold,
                10.0,
                Color::BLACK,
                &value,
            );
        }
    }

    doc.set_cursor(start + rows as f32 * METADATA_ROW_HEIGHT);
    doc.advance(10.0);
    start + rows as f32 * METADATA_ROW_HEIGHT
}

/// Table columns; widths are relative and scaled to the content width.
#[derive(Debug, Clone)]
pub struct TableSpec {
    pub head: Vec<String>,
    pub widths: Vec<f32>,
    pub rows: Vec<Vec<String>>,
}

impl TableSpec {
    fn column_widths(&self, available: f32) -> Vec<f32> {
        let total: f32 = self.widths.iter().sum();
        if total <= 0.0 || self.widths.len() != self.head.len() {
            let even = available / self.head.len().max(1) as f32;
            return vec![even; self.head.len()];
        }
        self.widths.iter().map(|w| w / total * available).collect()
    }
}

/// Filled header band with light header text.
pub fn header_band(page_height: f32, left: f32, top: f32, head: &[String], widths: &[f32]) -> PageOps {
    let mut ops = PageOps::new(page_height);
    let total: f32 = widths.iter().sum();
    ops.fill_rect(left, top, total, TABLE_HEADER_HEIGHT, PRIMARY);

    let mut x = left;
    for (label, width) in head.iter().zip(widths) {
        let label = fit_text(label, Font::Bold, 9.0, width - 2.0 * CELL_PADDING);
        ops.text(
            x + CELL_PADDING,
            top + 13.5,
            Font::Bold,
            9.0,
            Color::WHITE,
            &label,
        );
        ops.stroke_rect(x, top, *width, TABLE_HEADER_HEIGHT, 0.5, BORDER);
        x += width;
    }
    ops
}

/// Zebra-striped table that continues onto new pages, redrawing the header band on each.
pub fn render_table(doc: &mut ReportDocument, table: &TableSpec) -> f32 {
    let widths = table.column_widths(doc.content_width());
    let left = doc.left();
    let page_height = doc.size().height;

    doc.ensure_space(TABLE_HEADER_HEIGHT + TABLE_ROW_HEIGHT);
    let band = header_band(page_height, left, doc.cursor(), &table.head, &widths);
    doc.page().extend(band);
    doc.advance(TABLE_HEADER_HEIGHT);

    for (idx, row) in table.rows.iter().enumerate() {
        if doc.remaining_height() < TABLE_ROW_HEIGHT {
            doc.new_page();
            let band = header_band(page_height, left, doc.cursor(), &table.head, &widths);
            doc.page().extend(band);
            doc.advance(TABLE_HEADER_HEIGHT);
        }

        let top = doc.cursor();
        let page = doc.page();
        if idx % 2 == 1 {
            page.fill_rect(left, top, widths.iter().sum(), TABLE_ROW_HEIGHT, ZEBRA);
        }
        let mut x = left;
        for (col, width) in widths.iter().enumerate() {
            let cell = row.get(col).map(String::as_str).unwrap_or("");
            let cell = fit_text(cell, Font::Regular, 9.0, width - 2.0 * CELL_PADDING);
            page.text(
                x + CELL_PADDING,
                top + 12.5,
                Font::Regular,
                9.0,
                Color::BLACK,
                &cell,
            );
            page.stroke_rect(x, top, *width, TABLE_ROW_HEIGHT, 0.5, BORDER);
            x += width;
        }
        doc.advance(TABLE_ROW_HEIGHT);
    }

    doc.advance(12.0)
}

/// Bordered box of bold label/value lines.
pub fn render_summary_box(doc: &mut ReportDocument, lines: &[(String, String)]) -> f32 {
    if lines.is_empty() {
        return doc.cursor();
    }
    let height = lines.len() as f32 * 16.0 + 12.0;
    doc.ensure_space(height);

    let (left, top, width) = (doc.left(), doc.cursor(), doc.content_width());
    let page = doc.page();
    page.fill_rect(left, top, width, height, ZEBRA);
    page.stroke_rect(left, top, width, height, 0.75, PRIMARY);
    for (idx, (label, value)) in lines.iter().enumerate() {
        let baseline = top + 6.0 + idx as f32 * 16.0 + 11.0;
        page.text(left + 10.0, baseline, Font::Regular, 10.0, Color::BLACK, label);
        page.text(
            left + 10.0 + METADATA_LABEL_WIDTH + 30.0,
            baseline,
            Font::Bold,
            10.0,
            Color::BLACK,
            &format!(": {}", value),
        );
    }
    doc.advance(height + 16.0)
}

/// Centered wrapped text; blank lines separate paragraphs.
pub fn render_paragraphs(doc: &mut ReportDocument, text: &str, size: f32) -> f32 {
    let center = doc.left() + doc.content_width() / 2.0;
    let line_height = size * 1.5;
    for line in wrap_text(text, Font::Regular, size, doc.content_width() * 0.85) {
        doc.ensure_space(line_height);
        let baseline = doc.cursor() + size;
        doc.page()
            .text_centered(center, baseline, Font::Regular, size, Color::BLACK, &line);
        doc.advance(line_height);
    }
    doc.advance(size)
}

/// Labels for the signature block.
#[derive(Debug, Clone)]
pub struct SignatureBlock<'a> {
    pub city: &'a str,
    pub date: &'a str,
    pub role: &'a str,
    pub signer_name: &'a str,
    pub signature: Option<&'a PreparedSignature>,
}

/// Total height drawn by `render_signature_block`.
pub fn signature_block_height() -> f32 {
    46.0 + SIGNATURE_FOOTPRINT.1 + 20.0
}

/// Right-aligned block: city and date, acknowledgement, role, signature footprint, signer name.
///
/// Without a signature image the footprint keeps its size and gets a ruled
/// line for a handwritten signature.
pub fn render_signature_block(doc: &mut ReportDocument, block: &SignatureBlock<'_>) -> f32 {
    doc.ensure_space(signature_block_height());

    let x = doc.right() - SIGNATURE_BLOCK_WIDTH;
    let center = x + SIGNATURE_BLOCK_WIDTH / 2.0;
    let top = doc.cursor();

    let page = doc.page();
    let dated = format!("{}, {}", block.city, block.date);
    page.text_centered(center, top + 12.0, Font::Regular, 10.0, Color::BLACK, &dated);
    page.text_centered(center, top + 26.0, Font::Regular, 10.0, Color::BLACK, "Mengetahui,");
    page.text_centered(center, top + 40.0, Font::Regular, 10.0, Color::BLACK, block.role);

    let (fw, fh) = SIGNATURE_FOOTPRINT;
    let fx = center - fw / 2.0;
    let fy = top + 46.0;
    let has_image = block.signature.map(|s| s.has_signature()).unwrap_or(false);
    if !has_image {
        page.line(fx, fy + fh, fx + fw, fy + fh, 0.75, Color::BLACK);
    }
    if let Some(signature) = block.signature {
        signature.draw(doc, fx, fy, fw, fh);
    }

    let name_baseline = fy + fh + 14.0;
    doc.page().text_centered(
        center,
        name_baseline,
        Font::Bold,
        11.0,
        Color::BLACK,
        block.signer_name,
    );
    doc.set_cursor(top + signature_block_height());
    doc.cursor()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::document::PageSize;

    fn pairs(n: usize) -> Vec<(String, String)> {
        (0..n)
            .map(|i| (format!("Label {}", i), format!("Nilai {}", i)))
            .collect()
    }

    fn table(rows: usize) -> TableSpec {
        TableSpec {
            head: vec!["No".into(), "Aspek".into(), "Nilai".into()],
            widths: vec![1.0, 6.0, 2.0],
            rows: (1..=rows)
                .map(|i| vec![i.to_string(), format!("Aspek {}", i), "90".into()])
                .collect(),
        }
    }

    #[test]
    fn test_metadata_grid_advance_is_symmetric() {
        let mut a = ReportDocument::new(PageSize::A4_PORTRAIT, 40.0);
        let mut b = ReportDocument::new(PageSize::A4_PORTRAIT, 40.0);
        let start = a.cursor();

        let end_a = render_metadata_grid(&mut a, &pairs(3), &pairs(1));
        let end_b = render_metadata_grid(&mut b, &pairs(1), &pairs(3));

        assert_eq!(end_a, end_b);
        assert_eq!(end_a, start + 3.0 * METADATA_ROW_HEIGHT);
        assert_eq!(a.cursor(), b.cursor());
    }

    #[test]
    fn test_table_fits_on_one_page() {
        let mut doc = ReportDocument::new(PageSize::A4_PORTRAIT, 40.0);
        render_table(&mut doc, &table(10));
        assert_eq!(doc.page_count(), 1);
    }

    #[test]
    fn test_table_redraws_header_band_on_every_page() {
        let mut doc = ReportDocument::new(PageSize::A4_PORTRAIT, 40.0);
        doc.advance(200.0);
        let first_top = doc.cursor();
        let spec = table(80);
        render_table(&mut doc, &spec);

        assert!(doc.page_count() >= 2);
        let widths = spec.column_widths(doc.content_width());
        let height = doc.size().height;

        let first_band = header_band(height, doc.left(), first_top, &spec.head, &widths)
            .encode()
            .unwrap();
        let continued_band = header_band(height, doc.left(), doc.margin(), &spec.head, &widths)
            .encode()
            .unwrap();

        let first_page = doc.page_ops(0).unwrap().encode().unwrap();
        assert!(first_page.starts_with(&first_band));
        for idx in 1..doc.page_count() {
            let page = doc.page_ops(idx).unwrap().encode().unwrap();
            assert!(page.starts_with(&continued_band), "page {} lacks header band", idx);
        }
    }

    #[test]
    fn test_table_row_count_drives_page_count() {
        let usable = PageSize::A4_PORTRAIT.height - 80.0 - TABLE_HEADER_HEIGHT;
        let per_page = (usable / TABLE_ROW_HEIGHT).floor() as usize;

        let mut doc = ReportDocument::new(PageSize::A4_PORTRAIT, 40.0);
        render_table(&mut doc, &table(per_page));
        assert_eq!(doc.page_count(), 1);

        let mut doc = ReportDocument::new(PageSize::A4_PORTRAIT, 40.0);
        render_table(&mut doc, &table(per_page + 1));
        assert_eq!(doc.page_count(), 2);
    }

    #[test]
    fn test_signature_block_without_image_draws_rule() {
        let mut doc = ReportDocument::new(PageSize::A4_PORTRAIT, 40.0);
        let start = doc.cursor();
        let end = render_signature_block(
            &mut doc,
            &SignatureBlock {
                city: "Jakarta",
                date: "19 Oktober 2026",
                role: "Kepala Sekolah",
                signer_name: "Ustadz Ahmad",
                signature: None,
            },
        );
        assert_eq!(end, start + signature_block_height());

        let ops = doc.page_ops(0).unwrap().operations();
        assert!(ops.iter().any(|op| op.operator == "l"));
        assert!(!ops.iter().any(|op| op.operator == "Do"));
    }

    #[test]
    fn test_header_draws_double_rule() {
        let mut doc = ReportDocument::new(PageSize::A4_PORTRAIT, 40.0);
        render_header(
            &mut doc,
            &Masthead {
                name: "Rumah Tahfidz".into(),
                address: "Jl. Merdeka No. 1".into(),
                ..Masthead::default()
            },
        );
        let widths: Vec<f32> = doc
            .page_ops(0)
            .unwrap()
            .operations()
            .iter()
            .filter(|op| op.operator == "w")
            .filter_map(|op| op.operands.first().and_then(|o| o.as_float().ok()))
            .collect();
        assert_eq!(widths, vec![2.0, 0.75]);
    }
}
