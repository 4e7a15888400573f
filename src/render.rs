//! PDF renderer – takes a [`LayoutConfig`] and produces PDF bytes using
//! `printpdf` (v0.8 ops-based API).

use std::collections::HashMap;

use printpdf::{Mm, PdfDocument, PdfPage};

use crate::layout_config::*;
use crate::paint::{self, Canvas, ImageResource};

/// 1 pt = 0.352778 mm.
const PT_TO_MM: f32 = 0.352778;

/// Render a LayoutConfig into PDF bytes.
///
/// Images whose `src` is not a base64 data URI, or whose bytes cannot be
/// decoded, are skipped with a `log::warn`.
pub fn render_pdf(config: &LayoutConfig) -> Result<Vec<u8>, String> {
    let page_w = Mm(config.page_width_pt * PT_TO_MM);
    let page_h = Mm(config.page_height_pt * PT_TO_MM);

    let mut doc = PdfDocument::new(&config.title);
    let images = register_images(&mut doc, config);

    let mut pages: Vec<PdfPage> = config
        .pages
        .iter()
        .map(|page| {
            let mut canvas = Canvas::new(config.page_height_pt);
            for lbox in &page.boxes {
                render_box(&mut canvas, lbox, &images);
            }
            PdfPage::new(page_w, page_h, canvas.into_ops())
        })
        .collect();

    if pages.is_empty() {
        pages.push(PdfPage::new(page_w, page_h, Vec::new()));
    }

    doc.with_pages(pages);
    Ok(paint::save(&doc))
}

/// Register every distinct image source once.
fn register_images(doc: &mut PdfDocument, config: &LayoutConfig) -> HashMap<String, ImageResource> {
    let mut images = HashMap::new();
    let sources = config
        .pages
        .iter()
        .flat_map(|p| p.boxes.iter())
        .filter_map(|b| b.image.as_ref().map(|i| i.src.as_str()));

    for src in sources {
        if images.contains_key(src) {
            continue;
        }
        let registered = paint::parse_data_uri(src).and_then(|bytes| paint::register_image(doc, &bytes));
        match registered {
            Ok(resource) => {
                images.insert(src.to_string(), resource);
            }
            Err(e) => log::warn!("Skipping image: {e}"),
        }
    }
    images
}

fn render_box(canvas: &mut Canvas, lbox: &LayoutBox, images: &HashMap<String, ImageResource>) {
    if let Some(bg) = lbox.background_color {
        if lbox.width > 0.0 && lbox.height > 0.0 {
            canvas.fill_rect(lbox.x, lbox.y, lbox.width, lbox.height, bg);
        }
    }

    // Borders are drawn inside the box edge.
    if let Some(edge) = &lbox.border_top {
        let y = lbox.y + edge.width / 2.0;
        canvas.line(lbox.x, y, lbox.x + lbox.width, y, edge.width, edge.color);
    }
    if let Some(edge) = &lbox.border_bottom {
        let y = lbox.y + lbox.height - edge.width / 2.0;
        canvas.line(lbox.x, y, lbox.x + lbox.width, y, edge.width, edge.color);
    }

    if let Some(image) = &lbox.image {
        if let Some(resource) = images.get(&image.src) {
            canvas.image(resource, lbox.x, lbox.y, lbox.width, lbox.height);
        }
    }

    if let Some(line) = &lbox.line {
        for fragment in &line.fragments {
            canvas.text(
                lbox.x + fragment.x_offset,
                lbox.y + fragment.baseline,
                fragment.font_size,
                fragment.bold,
                fragment.color,
                &fragment.text,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_empty_document() {
        let config = LayoutConfig::a4("empty");
        let bytes = render_pdf(&config).unwrap();
        assert!(bytes.len() > 100, "PDF should have content");
        assert_eq!(&bytes[0..5], b"%PDF-");
    }

    #[test]
    fn bad_images_are_skipped() {
        let mut config = LayoutConfig::a4("img");
        config.pages.push(PageLayout {
            page_index: 0,
            boxes: vec![LayoutBox {
                image: Some(ImageContent {
                    src: "data:image/png;base64,AAAA".to_string(),
                }),
                background_color: Some([0.9, 0.9, 0.9]),
                ..LayoutBox::new(10.0, 10.0, 50.0, 50.0, 0)
            }],
        });
        let bytes = render_pdf(&config).unwrap();
        assert_eq!(&bytes[0..5], b"%PDF-");
    }
}
