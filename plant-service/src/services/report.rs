//! PDF report rendering.
//!
//! Rendering happens in two steps: [`ReportRenderer::layout`] flows the
//! report into positioned elements page by page, then the pages are drawn
//! with `printpdf` using the builtin Helvetica font. All coordinates in this
//! module are PDF points measured from the top-left of the page.

use crate::services::data_uri;
use chrono::NaiveDate;
use image::DynamicImage;
use printpdf::{lopdf, BuiltinFont, Image, ImageTransform, Mm, PdfDocument};
use thiserror::Error;

pub const REPORT_TITLE: &str = "Plant Analysis Report";

const TITLE_SIZE: f32 = 24.0;
const DATE_SIZE: f32 = 24.0;
const BODY_SIZE: f32 = 14.0;

/// Line advance as a multiple of the font size.
const LINE_HEIGHT: f32 = 1.2;
/// Distance from the top of a line to its baseline, as a multiple of the font size.
const ASCENT: f32 = 0.75;

/// Bounding box for the embedded image.
const IMAGE_BOX: f32 = 500.0;

/// Largest pixel edge kept for embedding: twice the box, enough for print.
const MAX_IMAGE_EDGE: u32 = 1000;

const MM_PER_PT: f32 = 25.4 / 72.0;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("PDF generation failed: {0}")]
    Pdf(String),

    #[error("Render task failed: {0}")]
    Task(String),
}

#[derive(Debug, Error)]
pub enum ImageLoadError {
    #[error(transparent)]
    DataUri(#[from] data_uri::DataUriError),

    #[error("unsupported image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("image has no pixels")]
    Empty,
}

/// Everything that goes into one report.
#[derive(Debug, Clone)]
pub struct ReportContent {
    pub text: String,
    /// Image as a data URI (or bare base64).
    pub image: Option<String>,
    pub date: NaiveDate,
}

/// Page geometry in points. Defaults to US Letter with one-inch margins.
#[derive(Debug, Clone, Copy)]
pub struct PageSetup {
    pub width: f32,
    pub height: f32,
    pub margin: f32,
}

impl Default for PageSetup {
    fn default() -> Self {
        Self {
            width: 612.0,
            height: 792.0,
            margin: 72.0,
        }
    }
}

impl PageSetup {
    fn content_width(&self) -> f32 {
        self.width - 2.0 * self.margin
    }

    fn bottom(&self) -> f32 {
        self.height - self.margin
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Align {
    Left,
    Center,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Text {
        text: String,
        size: f32,
        x: f32,
        baseline: f32,
    },
    Image {
        x: f32,
        top: f32,
        width: f32,
        height: f32,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageLayout {
    pub elements: Vec<Element>,
}

#[derive(Debug, Clone, Default)]
pub struct ReportRenderer {
    page: PageSetup,
}

impl ReportRenderer {
    /// Render the report to PDF bytes.
    ///
    /// An image that cannot be decoded is left out; the rest of the report
    /// is still produced.
    pub fn render(&self, content: &ReportContent) -> Result<Vec<u8>, RenderError> {
        let image = content
            .image
            .as_deref()
            .filter(|uri| !uri.trim().is_empty())
            .and_then(|uri| match load_image(uri) {
                Ok(image) => Some(image),
                Err(e) => {
                    tracing::warn!(error = %e, "Omitting undecodable image from report");
                    None
                }
            });

        let pages = self.layout(content, image.as_ref().map(|i| (i.width(), i.height())));

        tracing::debug!(
            pages = pages.len(),
            text_len = content.text.len(),
            with_image = image.is_some(),
            "Report laid out"
        );

        self.draw(&pages, image.as_ref())
    }

    /// Flow title, date, body text and image (given its pixel size) onto pages.
    pub fn layout(
        &self,
        content: &ReportContent,
        image_size: Option<(u32, u32)>,
    ) -> Vec<PageLayout> {
        let mut flow = Flow::new(self.page);

        flow.text(REPORT_TITLE, TITLE_SIZE, Align::Center);
        flow.move_down(TITLE_SIZE);
        flow.text(
            &format!("Date: {}", content.date.format("%-m/%-d/%Y")),
            DATE_SIZE,
            Align::Left,
        );
        flow.move_down(DATE_SIZE);
        flow.text(&to_pdf_text(&content.text), BODY_SIZE, Align::Left);

        if let Some((width, height)) = image_size {
            flow.move_down(BODY_SIZE);
            let max_width = IMAGE_BOX.min(self.page.content_width());
            let (width, height) = fit_within(width as f32, height as f32, max_width, IMAGE_BOX);
            flow.image(width, height);
        }

        flow.finish()
    }

    fn draw(
        &self,
        pages: &[PageLayout],
        image: Option<&DynamicImage>,
    ) -> Result<Vec<u8>, RenderError> {
        let page_width = Mm(self.page.width * MM_PER_PT);
        let page_height = Mm(self.page.height * MM_PER_PT);

        let (doc, first_page, first_layer) =
            PdfDocument::new(REPORT_TITLE, page_width, page_height, "Layer 1");
        let font = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| RenderError::Pdf(e.to_string()))?;

        let mut layers = vec![doc.get_page(first_page).get_layer(first_layer)];
        for _ in 1..pages.len() {
            let (page, layer) = doc.add_page(page_width, page_height, "Layer 1");
            layers.push(doc.get_page(page).get_layer(layer));
        }

        for (page, layer) in pages.iter().zip(layers) {
            for element in &page.elements {
                match element {
                    Element::Text {
                        text,
                        size,
                        x,
                        baseline,
                    } => {
                        layer.use_text(
                            text.as_str(),
                            *size,
                            Mm(x * MM_PER_PT),
                            Mm((self.page.height - baseline) * MM_PER_PT),
                            &font,
                        );
                    }
                    Element::Image {
                        x,
                        top,
                        width,
                        height,
                    } => {
                        let Some(image) = image else { continue };
                        let bottom = self.page.height - top - height;
                        // At 72 dpi one pixel is one point before scaling.
                        Image::from_dynamic_image(image).add_to_layer(
                            layer.clone(),
                            ImageTransform {
                                translate_x: Some(Mm(x * MM_PER_PT)),
                                translate_y: Some(Mm(bottom * MM_PER_PT)),
                                scale_x: Some(width / image.width() as f32),
                                scale_y: Some(height / image.height() as f32),
                                dpi: Some(72.0),
                                ..Default::default()
                            },
                        );
                    }
                }
            }
        }

        let bytes = doc
            .save_to_bytes()
            .map_err(|e| RenderError::Pdf(e.to_string()))?;
        compress(&bytes)
    }
}

/// Flate-encode every stream that is not already filtered. Raw image
/// pixels are the bulk of a report.
fn compress(pdf: &[u8]) -> Result<Vec<u8>, RenderError> {
    let mut document =
        lopdf::Document::load_mem(pdf).map_err(|e| RenderError::Pdf(e.to_string()))?;
    document.compress();

    let mut out = Vec::with_capacity(pdf.len() / 2);
    document
        .save_to(&mut out)
        .map_err(|e| RenderError::Pdf(e.to_string()))?;
    Ok(out)
}

/// Decode a data URI into an RGB image ready for embedding, shrunk so
/// neither edge exceeds [`MAX_IMAGE_EDGE`] pixels.
pub fn load_image(uri: &str) -> Result<DynamicImage, ImageLoadError> {
    let decoded = data_uri::decode(uri)?;
    let mut image = image::load_from_memory(&decoded.data)?;
    drop(decoded);

    if image.width() == 0 || image.height() == 0 {
        return Err(ImageLoadError::Empty);
    }
    if image.width() > MAX_IMAGE_EDGE || image.height() > MAX_IMAGE_EDGE {
        image = image.thumbnail(MAX_IMAGE_EDGE, MAX_IMAGE_EDGE);
    }
    Ok(DynamicImage::ImageRgb8(image.to_rgb8()))
}

/// Scale `width`×`height` to fit the box, keeping the aspect ratio.
pub fn fit_within(width: f32, height: f32, max_width: f32, max_height: f32) -> (f32, f32) {
    let scale = (max_width / width).min(max_height / height);
    (width * scale, height * scale)
}

/// Cursor that places lines top to bottom, breaking pages as needed.
struct Flow {
    page: PageSetup,
    pages: Vec<PageLayout>,
    y: f32,
}

impl Flow {
    fn new(page: PageSetup) -> Self {
        Self {
            page,
            pages: vec![PageLayout::default()],
            y: page.margin,
        }
    }

    fn new_page(&mut self) {
        self.pages.push(PageLayout::default());
        self.y = self.page.margin;
    }

    /// Make room for `height` points, starting a page if the current one is full.
    /// A fresh page always accepts, so oversized items cannot loop.
    fn reserve(&mut self, height: f32) {
        let page_is_fresh = self.y <= self.page.margin;
        if !page_is_fresh && self.y + height > self.page.bottom() {
            self.new_page();
        }
    }

    fn push(&mut self, element: Element) {
        if let Some(page) = self.pages.last_mut() {
            page.elements.push(element);
        }
    }

    fn text(&mut self, text: &str, size: f32, align: Align) {
        let width = self.page.content_width();
        for line in wrap_text(text, size, width) {
            let line_height = size * LINE_HEIGHT;
            self.reserve(line_height);

            if !line.is_empty() {
                let x = match align {
                    Align::Left => self.page.margin,
                    Align::Center => {
                        self.page.margin + ((width - text_width(&line, size)) / 2.0).max(0.0)
                    }
                };
                let baseline = self.y + size * ASCENT;
                self.push(Element::Text {
                    text: line,
                    size,
                    x,
                    baseline,
                });
            }
            self.y += line_height;
        }
    }

    fn move_down(&mut self, size: f32) {
        self.y += size * LINE_HEIGHT;
    }

    fn image(&mut self, width: f32, height: f32) {
        self.reserve(height);
        let x = self.page.margin + (self.page.content_width() - width) / 2.0;
        let top = self.y;
        self.push(Element::Image {
            x,
            top,
            width,
            height,
        });
        self.y += height;
    }

    fn finish(self) -> Vec<PageLayout> {
        self.pages
    }
}

/// Helvetica advance widths (AFM, 1/1000 em) for 0x20..=0x7E.
const HELVETICA_ASCII: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '../
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // 0..?
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // @..O
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // P.._
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // `..o
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // p..~
];

/// Helvetica advance widths (AFM, 1/1000 em) for 0xA0..=0xFF.
const HELVETICA_LATIN1: [u16; 96] = [
    278, 333, 556, 556, 556, 556, 260, 556, 333, 737, 370, 556, 584, 333, 737, 333, // A0..AF
    400, 584, 333, 333, 333, 556, 537, 278, 333, 333, 365, 556, 834, 834, 834, 611, // B0..BF
    667, 667, 667, 667, 667, 667, 1000, 722, 667, 667, 667, 667, 278, 278, 278, 278, // C0..CF
    722, 722, 778, 778, 778, 778, 778, 584, 778, 722, 722, 722, 722, 667, 667, 611, // D0..DF
    556, 556, 556, 556, 556, 556, 889, 500, 556, 556, 556, 556, 278, 278, 278, 278, // E0..EF
    556, 556, 556, 556, 556, 556, 556, 584, 611, 556, 556, 556, 556, 500, 556, 500, // F0..FF
];

/// Helvetica advance width in ems. Glyphs outside WinAnsi count as a full em.
fn glyph_width(c: char) -> f32 {
    let code = c as u32;
    let units = match code {
        0x20..=0x7E => HELVETICA_ASCII[(code - 0x20) as usize],
        0xA0..=0xFF => HELVETICA_LATIN1[(code - 0xA0) as usize],
        _ => 1000,
    };
    f32::from(units) / 1000.0
}

fn text_width(text: &str, size: f32) -> f32 {
    text.chars().map(glyph_width).sum::<f32>() * size
}

/// Greedy word wrap. Existing line breaks are kept, blank lines come back
/// as empty strings, and words wider than the line are split.
pub fn wrap_text(text: &str, size: f32, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let paragraph = paragraph.trim_end_matches('\r');
        let mut current = String::new();

        for word in paragraph.split_whitespace() {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{} {}", current, word)
            };

            if text_width(&candidate, size) <= max_width {
                current = candidate;
                continue;
            }

            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }

            if text_width(word, size) <= max_width {
                current = word.to_string();
            } else {
                for c in word.chars() {
                    current.push(c);
                    if text_width(&current, size) > max_width {
                        current.pop();
                        lines.push(std::mem::take(&mut current));
                        current.push(c);
                    }
                }
            }
        }

        lines.push(current);
    }

    lines
}

/// Map text onto what the builtin (WinAnsi) fonts can show.
fn to_pdf_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\u{2018}' | '\u{2019}' => out.push('\''),
            '\u{201C}' | '\u{201D}' => out.push('"'),
            '\u{2013}' | '\u{2014}' => out.push('-'),
            '\u{2022}' => out.push('-'),
            '\u{2026}' => out.push_str("..."),
            '\t' => out.push(' '),
            '\n' => out.push('\n'),
            c if c.is_control() => {}
            c if (c as u32) < 0x100 => out.push(c),
            _ => out.push('?'),
        }
    }
    out
}
