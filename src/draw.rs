//! Direct-draw renderer – paints the data sheet straight onto a single PDF
//! page with printpdf vector ops and a running top-to-bottom cursor.
//!
//! The page is never split: everything is stamped "Page 1 of 1" and content
//! that runs past the footer band is drawn off-page (a warning is logged).

use std::io::Write;

use printpdf::{Mm, PdfDocument, PdfPage};

use crate::assets::AssetResolver;
use crate::content::{SectionBody, SheetView, ZebraTable};
use crate::error::{ensure_pdf, Result};
use crate::fonts::{wrap_text, FontManager};
use crate::model::ParsedDocument;
use crate::paint::{self, Canvas, ImageResource, Rgb3, BLACK};
use crate::pipeline::{DatasheetConfig, Renderer};

const PT_TO_MM: f32 = 0.352778;
const LINE_FACTOR: f32 = 1.15;

const BRAND_RED: Rgb3 = [0.788, 0.118, 0.259]; // #c91e42
const ZEBRA_SHADE: Rgb3 = [0.886, 0.886, 0.886]; // #e2e2e2

const HEADER_Y: f32 = 30.0;
const LOGO_Y: f32 = 20.0;
const LOGO_BOX: (f32, f32) = (80.0, 30.0);
const PRODUCT_IMAGE_BOX: (f32, f32) = (150.0, 150.0);
const FOOTER_OFFSET: f32 = 40.0;
const FOOTER_INSET: f32 = 20.0;

const BULLET_RADIUS: f32 = 2.0;
const BULLET_INDENT: f32 = 10.0;
const TEXT_INDENT: f32 = 20.0;

pub const LOGO_PLACEHOLDER: &str = "[Logo placeholder]";
pub const PRODUCT_IMAGE_PLACEHOLDER: &str = "[Product image placeholder]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Align {
    Left,
    Center,
    Right,
}

/// One logical piece of text the renderer drew, in drawing order.
///
/// `section` is the index of the section the text belongs to, `None` for the
/// header, title block and footer.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptEntry {
    pub section: Option<usize>,
    pub text: String,
}

/// A composed single-page document, ready to serialise.
pub struct Composition {
    doc: PdfDocument,
    pub transcript: Vec<TranscriptEntry>,
    /// True when content ran into (or past) the footer band.
    pub overflowed: bool,
}

impl Composition {
    pub fn to_pdf(&self) -> Vec<u8> {
        paint::save(&self.doc)
    }

    /// Texts drawn for section `index`, in order.
    pub fn section_texts(&self, index: usize) -> Vec<&str> {
        self.transcript
            .iter()
            .filter(|e| e.section == Some(index))
            .map(|e| e.text.as_str())
            .collect()
    }
}

/// Renders through printpdf drawing primitives. Cheap to share across
/// threads; every call builds its own document.
#[derive(Debug, Clone, Default)]
pub struct DirectDrawRenderer {
    config: DatasheetConfig,
    fonts: FontManager,
}

impl DirectDrawRenderer {
    pub fn new(config: DatasheetConfig) -> Self {
        Self {
            config,
            fonts: FontManager::new(),
        }
    }

    /// Lay the document out onto one page without serialising it.
    pub fn compose(&self, document: &ParsedDocument, assets: &AssetResolver) -> Composition {
        let view = SheetView::from_document(document);
        let title = if view.header.trim().is_empty() {
            self.config.title.as_str()
        } else {
            view.header.as_str()
        };
        let mut doc = PdfDocument::new(title);

        let mut composer = Composer {
            config: &self.config,
            fonts: &self.fonts,
            canvas: Canvas::new(self.config.page_height),
            y: 0.0,
            section: None,
            transcript: Vec::new(),
        };
        composer.header(&mut doc, &view, assets);
        composer.title_block(&view);
        composer.product_image(&mut doc, &view, assets);
        for (index, section) in view.sections.iter().enumerate() {
            composer.section = Some(index);
            if !section.subtitle.is_empty() {
                composer.record(&section.subtitle);
                composer.paragraph(&section.subtitle, 11.0, true, Align::Left, None);
                composer.move_down(0.2, 11.0);
            }
            match &section.body {
                SectionBody::List(items) => {
                    // The first list shares its rows with the floating
                    // product image.
                    let width = if index == 0 {
                        composer.content_width() * 0.6
                    } else {
                        composer.content_width()
                    };
                    composer.bullet_list(items, width);
                }
                SectionBody::KeyValue(pairs) => composer.key_value_table(pairs),
                SectionBody::Zebra(table) => composer.zebra_table(table),
            }
            composer.move_down(0.3, 10.0);
        }
        composer.section = None;

        let overflowed = composer.y > self.config.page_height - FOOTER_OFFSET;
        if overflowed {
            log::warn!(
                "content ends at y={:.1}pt, past the footer band; direct-draw output is a single page",
                composer.y
            );
        }
        composer.footer(&view, &self.config.version_date());

        let page_w = Mm(self.config.page_width * PT_TO_MM);
        let page_h = Mm(self.config.page_height * PT_TO_MM);
        let Composer {
            canvas, transcript, ..
        } = composer;
        doc.with_pages(vec![PdfPage::new(page_w, page_h, canvas.into_ops())]);

        Composition {
            doc,
            transcript,
            overflowed,
        }
    }
}

impl Renderer for DirectDrawRenderer {
    fn name(&self) -> &'static str {
        "direct-draw"
    }

    fn render(
        &self,
        document: &ParsedDocument,
        assets: &AssetResolver,
        sink: &mut dyn Write,
    ) -> Result<()> {
        let bytes = self.compose(document, assets).to_pdf();
        ensure_pdf(&bytes)?;
        sink.write_all(&bytes)?;
        sink.flush()?;
        log::debug!("direct-draw wrote {} bytes", bytes.len());
        Ok(())
    }
}

struct Composer<'a> {
    config: &'a DatasheetConfig,
    fonts: &'a FontManager,
    canvas: Canvas,
    /// Top of the next line, from the top edge of the page.
    y: f32,
    section: Option<usize>,
    transcript: Vec<TranscriptEntry>,
}

impl Composer<'_> {
    fn left(&self) -> f32 {
        self.config.margin_left
    }

    fn content_width(&self) -> f32 {
        self.config.page_width - self.config.margin_left - self.config.margin_right
    }

    fn line_height(size: f32) -> f32 {
        size * LINE_FACTOR
    }

    fn record(&mut self, text: &str) {
        self.transcript.push(TranscriptEntry {
            section: self.section,
            text: text.to_string(),
        });
    }

    fn move_down(&mut self, lines: f32, size: f32) {
        self.y += lines * Self::line_height(size);
    }

    /// Draw wrapped text at the cursor and advance past it.
    fn paragraph(&mut self, text: &str, size: f32, bold: bool, align: Align, width: Option<f32>) {
        let width = width.unwrap_or_else(|| self.content_width());
        let left = self.left();
        self.y = self.text_block(text, left, self.y, width, size, bold, BLACK, align);
    }

    /// Draw wrapped text inside `[x, x + width]` starting at `top`; returns
    /// the y below the last line.
    #[allow(clippy::too_many_arguments)]
    fn text_block(
        &mut self,
        text: &str,
        x: f32,
        top: f32,
        width: f32,
        size: f32,
        bold: bool,
        color: Rgb3,
        align: Align,
    ) -> f32 {
        let mut y = top;
        for line in wrap_text(text, size, bold, width, self.fonts) {
            let w = self.fonts.measure_text_width(&line, size, bold);
            let line_x = match align {
                Align::Left => x,
                Align::Center => x + (width - w).max(0.0) / 2.0,
                Align::Right => x + (width - w).max(0.0),
            };
            self.canvas
                .text(line_x, y + self.fonts.ascender(size), size, bold, color, &line);
            y += Self::line_height(size);
        }
        y
    }

    fn load_image(
        doc: &mut PdfDocument,
        assets: &AssetResolver,
        path: &std::path::Path,
    ) -> std::result::Result<ImageResource, String> {
        let bytes = assets
            .read(path)
            .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
        paint::register_image(doc, &bytes)
    }

    fn header(&mut self, doc: &mut PdfDocument, view: &SheetView, assets: &AssetResolver) {
        let left = self.left();
        let width = self.content_width();
        self.record(&view.header);
        self.canvas.text(
            left,
            HEADER_Y + self.fonts.ascender(14.0),
            14.0,
            true,
            BRAND_RED,
            &view.header,
        );

        let logo = assets.find_logo().and_then(|path| {
            Self::load_image(doc, assets, &path)
                .map_err(|e| log::warn!("logo {} not drawn: {e}", path.display()))
                .ok()
        });
        match logo {
            Some(img) => {
                let (w, h) = img.fit(LOGO_BOX.0, LOGO_BOX.1);
                let x = self.config.page_width - self.config.margin_right - w;
                self.canvas.image(&img, x, LOGO_Y, w, h);
            }
            None => {
                self.record(LOGO_PLACEHOLDER);
                self.text_block(
                    LOGO_PLACEHOLDER,
                    left,
                    LOGO_Y,
                    width,
                    10.0,
                    false,
                    BLACK,
                    Align::Right,
                );
            }
        }

        self.y = HEADER_Y + Self::line_height(14.0);
        self.move_down(2.0, 10.0);
    }

    fn title_block(&mut self, view: &SheetView) {
        if !view.title.is_empty() {
            self.record(&view.title);
            self.paragraph(&view.title, 14.0, true, Align::Left, None);
        }
        self.move_down(0.3, 14.0);

        for line in [&view.code, &view.power_supply] {
            if !line.is_empty() {
                self.record(line);
                self.paragraph(line, 10.0, false, Align::Right, None);
            }
            self.move_down(0.2, 10.0);
        }
    }

    /// The product image floats at the right edge; the cursor stays put.
    fn product_image(&mut self, doc: &mut PdfDocument, view: &SheetView, assets: &AssetResolver) {
        let image = assets.find_product_image(&view.header).and_then(|path| {
            Self::load_image(doc, assets, &path)
                .map_err(|e| log::warn!("product image {} not drawn: {e}", path.display()))
                .ok()
        });
        match image {
            Some(img) => {
                let (w, h) = img.fit(PRODUCT_IMAGE_BOX.0, PRODUCT_IMAGE_BOX.1);
                let x = self.config.page_width - self.config.margin_right - PRODUCT_IMAGE_BOX.0;
                self.canvas.image(&img, x, self.y + 10.0, w, h);
            }
            None => {
                self.record(PRODUCT_IMAGE_PLACEHOLDER);
                self.paragraph(PRODUCT_IMAGE_PLACEHOLDER, 10.0, false, Align::Left, None);
            }
        }
        self.move_down(0.3, 10.0);
    }

    fn bullet_list(&mut self, items: &[String], width: f32) {
        let size = 10.0;
        let left = self.left();
        for item in items {
            self.record(item);
            let center_y = self.y + self.fonts.ascender(size) - size * 0.3;
            self.canvas
                .fill_circle(left + BULLET_INDENT, center_y, BULLET_RADIUS, BLACK);
            self.y = self.text_block(
                item,
                left + TEXT_INDENT,
                self.y,
                width - TEXT_INDENT,
                size,
                false,
                BLACK,
                Align::Left,
            );
        }
        self.move_down(0.3, size);
    }

    /// Borderless two-column table.
    fn key_value_table(&mut self, pairs: &[[String; 2]]) {
        if pairs.is_empty() {
            return;
        }
        let (size, pad_v, pad_h) = (10.0, 2.0, 5.0);
        let col_w = self.content_width() / 2.0;
        let left = self.left();
        for pair in pairs {
            let top = self.y;
            let mut bottom = top;
            for (col, text) in pair.iter().enumerate() {
                self.record(text);
                let x = left + col as f32 * col_w + pad_h;
                let end = self.text_block(
                    text,
                    x,
                    top + pad_v,
                    col_w - 2.0 * pad_h,
                    size,
                    false,
                    BLACK,
                    Align::Left,
                );
                bottom = bottom.max(end);
            }
            self.y = bottom + pad_v;
        }
        self.move_down(0.3, size);
    }

    /// Striped table: shaded even columns, bold header with a heavy rule
    /// beneath, closing rule under the last row.
    fn zebra_table(&mut self, table: &ZebraTable) {
        if table.columns == 0 || table.rows.is_empty() {
            return;
        }
        let (size, pad_v, pad_h) = (8.0, 3.0, 5.0);
        let left = self.left();
        let width = self.content_width();
        let col_w = width / table.columns as f32;
        let last = table.rows.len() - 1;

        for (r, row) in table.rows.iter().enumerate() {
            let bold = r == 0;
            let lines = row
                .iter()
                .map(|cell| wrap_text(cell, size, bold, col_w - 2.0 * pad_h, self.fonts).len())
                .max()
                .unwrap_or(1);
            let row_h = lines as f32 * Self::line_height(size) + 2.0 * pad_v;
            let top = self.y;

            for col in (0..table.columns).filter(|c| ZebraTable::is_shaded(*c)) {
                self.canvas
                    .fill_rect(left + col as f32 * col_w, top, col_w, row_h, ZEBRA_SHADE);
            }
            for (col, cell) in row.iter().enumerate() {
                self.record(cell);
                self.text_block(
                    cell,
                    left + col as f32 * col_w + pad_h,
                    top + pad_v,
                    col_w - 2.0 * pad_h,
                    size,
                    bold,
                    BLACK,
                    Align::Center,
                );
            }
            if r == 0 {
                self.canvas.line(left, top, left + width, top, 1.0, BLACK);
                self.canvas
                    .line(left, top + row_h, left + width, top + row_h, 2.0, BLACK);
            } else if r == last {
                self.canvas
                    .line(left, top + row_h, left + width, top + row_h, 1.0, BLACK);
            }
            self.y = top + row_h;
        }
        self.move_down(0.3, 10.0);
    }

    fn footer(&mut self, view: &SheetView, version_date: &str) {
        let size = 7.0;
        let y = self.config.page_height - FOOTER_OFFSET;
        let width = self.config.page_width - 2.0 * FOOTER_INSET;

        if !view.footer.is_empty() {
            self.record(&view.footer);
            self.text_block(
                &view.footer,
                FOOTER_INSET,
                y,
                width,
                size,
                false,
                BLACK,
                Align::Left,
            );
        }
        let stamp = format!("Version: {version_date}    Page 1 of 1");
        self.record(&stamp);
        self.text_block(&stamp, FOOTER_INSET, y, width, size, false, BLACK, Align::Right);

        let disclaimer = self.config.disclaimer.clone();
        self.record(&disclaimer);
        self.text_block(
            &disclaimer,
            FOOTER_INSET,
            y + 10.0,
            width,
            size,
            false,
            BLACK,
            Align::Left,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Cell, Section, SectionData};

    fn renderer() -> DirectDrawRenderer {
        DirectDrawRenderer::new(DatasheetConfig::default())
    }

    fn no_assets() -> AssetResolver {
        AssetResolver::new("/definitely/not/here")
    }

    #[test]
    fn empty_document_renders_pdf() {
        let mut out = Vec::new();
        renderer()
            .render(&ParsedDocument::default(), &no_assets(), &mut out)
            .unwrap();
        assert_eq!(&out[0..4], b"%PDF");
    }

    #[test]
    fn placeholders_when_assets_missing() {
        let comp = renderer().compose(&ParsedDocument::default(), &no_assets());
        let texts: Vec<_> = comp.transcript.iter().map(|e| e.text.as_str()).collect();
        assert!(texts.contains(&LOGO_PLACEHOLDER));
        assert!(texts.contains(&PRODUCT_IMAGE_PLACEHOLDER));
        assert!(texts.iter().any(|t| t.ends_with("Page 1 of 1")));
    }

    #[test]
    fn zebra_percentages_are_drawn() {
        let doc = ParsedDocument {
            sections: vec![Section {
                subtitle: "Efficiency".into(),
                data: SectionData::ZebraTable(vec![
                    vec![Cell::from("A"), Cell::from("B"), Cell::from("C")],
                    vec![Cell::from("x"), Cell::Number(0.5), Cell::from("z"), Cell::from("extra")],
                ]),
            }],
            ..ParsedDocument::default()
        };
        let comp = renderer().compose(&doc, &no_assets());
        assert_eq!(
            comp.section_texts(0),
            ["Efficiency", "A", "B", "C", "x", "50 %", "z"]
        );
    }

    #[test]
    fn long_documents_overflow_single_page() {
        let items = (0..200).map(|i| format!("Feature {i}")).collect();
        let doc = ParsedDocument {
            sections: vec![Section {
                subtitle: String::new(),
                data: SectionData::List(items),
            }],
            ..ParsedDocument::default()
        };
        let comp = renderer().compose(&doc, &no_assets());
        assert!(comp.overflowed);
        let bytes = comp.to_pdf();
        assert_eq!(&bytes[0..4], b"%PDF");
    }
}
