//! In-memory page buffer with a vertical cursor.
//!
//! Coordinates passed to drawing calls are measured from the top-left corner
//! of the page in points; conversion to PDF user space (bottom-left origin)
//! happens here and nowhere else.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};

use super::fonts::{encode_win_ansi, Font};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

impl PageSize {
    pub const A4_PORTRAIT: PageSize = PageSize {
        width: 595.28,
        height: 841.89,
    };
    pub const A4_LANDSCAPE: PageSize = PageSize {
        width: 841.89,
        height: 595.28,
    };
}

/// 8-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color(pub u8, pub u8, pub u8);

impl Color {
    pub const BLACK: Color = Color(0, 0, 0);
    pub const WHITE: Color = Color(255, 255, 255);

    fn operands(&self) -> Vec<Object> {
        [self.0, self.1, self.2]
            .iter()
            .map(|c| Object::Real(*c as f32 / 255.0))
            .collect()
    }
}

/// Decoded raster ready to embed as an image XObject.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub rgb: Vec<u8>,
    /// Present only when at least one pixel is not fully opaque.
    pub alpha: Option<Vec<u8>>,
}

impl DecodedImage {
    pub fn from_rgba(width: u32, height: u32, rgba: &[u8]) -> Self {
        let mut rgb = Vec::with_capacity((width * height * 3) as usize);
        let mut alpha = Vec::with_capacity((width * height) as usize);
        for px in rgba.chunks_exact(4) {
            rgb.extend_from_slice(&px[..3]);
            alpha.push(px[3]);
        }
        let translucent = alpha.iter().any(|a| *a != u8::MAX);
        Self {
            width,
            height,
            rgb,
            alpha: translucent.then_some(alpha),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageHandle(usize);

impl ImageHandle {
    fn resource_name(&self) -> String {
        format!("Im{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpacityState(usize);

impl OpacityState {
    fn resource_name(&self) -> String {
        format!("GS{}", self.0)
    }
}

/// Drawing operations for one page, in top-down coordinates.
#[derive(Debug, Clone)]
pub struct PageOps {
    page_height: f32,
    ops: Vec<Operation>,
}

impl PageOps {
    pub fn new(page_height: f32) -> Self {
        Self {
            page_height,
            ops: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn operations(&self) -> &[Operation] {
        &self.ops
    }

    pub fn into_operations(self) -> Vec<Operation> {
        self.ops
    }

    pub fn extend(&mut self, other: PageOps) {
        self.ops.extend(other.ops);
    }

    pub fn encode(&self) -> Result<Vec<u8>, lopdf::Error> {
        Content {
            operations: self.ops.clone(),
        }
        .encode()
    }

    fn op(&mut self, operator: &str, operands: Vec<Object>) {
        self.ops.push(Operation::new(operator, operands));
    }

    fn fill_color(&mut self, color: Color) {
        self.op("rg", color.operands());
    }

    fn stroke_color(&mut self, color: Color) {
        self.op("RG", color.operands());
    }

    /// Draw `text` with its baseline at `baseline` points from the top.
    pub fn text(&mut self, x: f32, baseline: f32, font: Font, size: f32, color: Color, text: &str) {
        if text.is_empty() {
            return;
        }
        self.fill_color(color);
        self.op("BT", vec![]);
        self.op("Tf", vec![font.resource_name().into(), size.into()]);
        self.op("Td", vec![x.into(), (self.page_height - baseline).into()]);
        self.op(
            "Tj",
            vec![Object::String(encode_win_ansi(text), StringFormat::Literal)],
        );
        self.op("ET", vec![]);
    }

    pub fn text_centered(
        &mut self,
        center_x: f32,
        baseline: f32,
        font: Font,
        size: f32,
        color: Color,
        text: &str,
    ) {
        let x = center_x - font.text_width(text, size) / 2.0;
        self.text(x, baseline, font, size, color, text);
    }

    pub fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Color) {
        self.fill_color(color);
        self.op(
            "re",
            vec![
                x.into(),
                (self.page_height - y - height).into(),
                width.into(),
                height.into(),
            ],
        );
        self.op("f", vec![]);
    }

    pub fn stroke_rect(
        &mut self,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        line_width: f32,
        color: Color,
    ) {
        self.op("w", vec![line_width.into()]);
        self.stroke_color(color);
        self.op(
            "re",
            vec![
                x.into(),
                (self.page_height - y - height).into(),
                width.into(),
                height.into(),
            ],
        );
        self.op("S", vec![]);
    }

    pub fn line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, line_width: f32, color: Color) {
        self.op("w", vec![line_width.into()]);
        self.stroke_color(color);
        self.op("m", vec![x1.into(), (self.page_height - y1).into()]);
        self.op("l", vec![x2.into(), (self.page_height - y2).into()]);
        self.op("S", vec![]);
    }

    /// Draw an image scaled into the box whose top-left corner is (`x`, `y`).
    pub fn image(
        &mut self,
        handle: ImageHandle,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        opacity: Option<OpacityState>,
    ) {
        self.op("q", vec![]);
        if let Some(state) = opacity {
            self.op("gs", vec![state.resource_name().as_str().into()]);
        }
        self.op(
            "cm",
            vec![
                width.into(),
                0.0f32.into(),
                0.0f32.into(),
                height.into(),
                x.into(),
                (self.page_height - y - height).into(),
            ],
        );
        self.op("Do", vec![handle.resource_name().as_str().into()]);
        self.op("Q", vec![]);
    }
}

/// A report being assembled: pages, embedded images and the layout cursor.
pub struct ReportDocument {
    size: PageSize,
    margin: f32,
    pages: Vec<PageOps>,
    images: Vec<DecodedImage>,
    opacity_states: Vec<f32>,
    background: Option<ImageHandle>,
    cursor: f32,
}

impl ReportDocument {
    pub fn new(size: PageSize, margin: f32) -> Self {
        Self {
            size,
            margin,
            pages: vec![PageOps::new(size.height)],
            images: Vec::new(),
            opacity_states: Vec::new(),
            background: None,
            cursor: margin,
        }
    }

    pub fn size(&self) -> PageSize {
        self.size
    }

    pub fn margin(&self) -> f32 {
        self.margin
    }

    pub fn left(&self) -> f32 {
        self.margin
    }

    pub fn right(&self) -> f32 {
        self.size.width - self.margin
    }

    pub fn content_width(&self) -> f32 {
        self.size.width - 2.0 * self.margin
    }

    pub fn cursor(&self) -> f32 {
        self.cursor
    }

    pub fn set_cursor(&mut self, y: f32) {
        self.cursor = y;
    }

    pub fn advance(&mut self, dy: f32) -> f32 {
        self.cursor += dy;
        self.cursor
    }

    pub fn remaining_height(&self) -> f32 {
        self.size.height - self.margin - self.cursor
    }

    pub fn page(&mut self) -> &mut PageOps {
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    pub fn new_page(&mut self) {
        self.pages.push(PageOps::new(self.size.height));
        self.cursor = self.margin;
        if let Some(handle) = self.background {
            self.draw_background(handle);
        }
    }

    /// Start a new page unless `height` still fits below the cursor.
    /// Returns true when a page break happened.
    pub fn ensure_space(&mut self, height: f32) -> bool {
        if self.remaining_height() >= height || self.cursor <= self.margin {
            return false;
        }
        self.new_page();
        true
    }

    pub fn add_image(&mut self, image: DecodedImage) -> ImageHandle {
        self.images.push(image);
        ImageHandle(self.images.len() - 1)
    }

    pub fn opacity_state(&mut self, opacity: f32) -> OpacityState {
        let opacity = opacity.clamp(0.0, 1.0);
        if let Some(idx) = self.opacity_states.iter().position(|o| *o == opacity) {
            return OpacityState(idx);
        }
        self.opacity_states.push(opacity);
        OpacityState(self.opacity_states.len() - 1)
    }

    /// Full-bleed image painted under the content of this and every later page.
    pub fn set_background(&mut self, image: DecodedImage) {
        let handle = self.add_image(image);
        self.background = Some(handle);
        let mut page = PageOps::new(self.size.height);
        page.image(handle, 0.0, 0.0, self.size.width, self.size.height, None);
        let current = self.page();
        let existing = std::mem::replace(current, page);
        current.extend(existing);
    }

    fn draw_background(&mut self, handle: ImageHandle) {
        let PageSize { width, height } = self.size;
        self.page().image(handle, 0.0, 0.0, width, height, None);
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn page_ops(&self, index: usize) -> Option<&PageOps> {
        self.pages.get(index)
    }

    /// Serialize to PDF bytes.
    pub fn finish(self, title: &str) -> Result<Vec<u8>, lopdf::Error> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let font_regular = doc.add_object(font_dictionary(Font::Regular));
        let font_bold = doc.add_object(font_dictionary(Font::Bold));

        let mut xobjects = Dictionary::new();
        for (idx, image) in self.images.iter().enumerate() {
            let image_id = embed_image(&mut doc, image);
            xobjects.set(ImageHandle(idx).resource_name(), image_id);
        }

        let mut graphics_states = Dictionary::new();
        for (idx, opacity) in self.opacity_states.iter().enumerate() {
            graphics_states.set(
                OpacityState(idx).resource_name(),
                dictionary! {
                    "Type" => "ExtGState",
                    "ca" => *opacity,
                    "CA" => *opacity,
                },
            );
        }

        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                Font::Regular.resource_name() => font_regular,
                Font::Bold.resource_name() => font_bold,
            },
            "XObject" => xobjects,
            "ExtGState" => graphics_states,
        });

        let page_count = self.pages.len();
        let mut kids: Vec<Object> = Vec::with_capacity(page_count);
        for page in self.pages {
            let content = Content {
                operations: page.into_operations(),
            };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let media_box: Vec<Object> = vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Real(self.size.width),
            Object::Real(self.size.height),
        ];
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count as i64,
            "Resources" => resources_id,
            "MediaBox" => media_box,
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let info_id = doc.add_object(dictionary! {
            "Title" => Object::String(encode_win_ansi(title), StringFormat::Literal),
            "Producer" => Object::string_literal("tahfidz-docs-server"),
        });
        doc.trailer.set("Info", info_id);

        doc.compress();
        let mut buffer = Vec::new();
        doc.save_to(&mut buffer)?;
        Ok(buffer)
    }
}

fn font_dictionary(font: Font) -> Dictionary {
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => font.base_font(),
        "Encoding" => "WinAnsiEncoding",
    }
}

fn embed_image(doc: &mut Document, image: &DecodedImage) -> ObjectId {
    let mut info = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => image.width as i64,
        "Height" => image.height as i64,
        "ColorSpace" => "DeviceRGB",
        "BitsPerComponent" => 8,
    };
    if let Some(alpha) = &image.alpha {
        let smask_id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => image.width as i64,
                "Height" => image.height as i64,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
            },
            alpha.clone(),
        ));
        info.set("SMask", smask_id);
    }
    doc.add_object(Stream::new(info, image.rgb.clone()))
}
