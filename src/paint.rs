//! Painting primitives over printpdf's (v0.8) op list.
//!
//! All coordinates taken here use a top-left origin with y growing down, in
//! points; conversion to PDF's bottom-left origin happens in this module
//! only. Shared by the direct-draw renderer and the layout engine.

use base64::{engine::general_purpose::STANDARD as BASE64_STD, Engine as _};
use printpdf::*;

/// RGB colour (0.0 – 1.0).
pub type Rgb3 = [f32; 3];

pub const BLACK: Rgb3 = [0.0, 0.0, 0.0];

/// Parse `#rrggbb` / `#rgb`.
pub fn hex(hex: &str) -> Option<Rgb3> {
    let hex = hex.trim().trim_start_matches('#');
    let channel = |s: &str| u8::from_str_radix(s, 16).ok().map(|v| v as f32 / 255.0);
    match hex.len() {
        6 => Some([channel(&hex[0..2])?, channel(&hex[2..4])?, channel(&hex[4..6])?]),
        3 => Some([
            channel(&hex[0..1].repeat(2))?,
            channel(&hex[1..2].repeat(2))?,
            channel(&hex[2..3].repeat(2))?,
        ]),
        _ => None,
    }
}

fn color(c: Rgb3) -> Color {
    Color::Rgb(Rgb {
        r: c[0],
        g: c[1],
        b: c[2],
        icc_profile: None,
    })
}

fn point(x: f32, y: f32) -> LinePoint {
    LinePoint {
        p: Point { x: Pt(x), y: Pt(y) },
        bezier: false,
    }
}

/// An op sink for one page.
pub struct Canvas {
    page_height: f32,
    ops: Vec<Op>,
}

impl Canvas {
    pub fn new(page_height: f32) -> Self {
        Self {
            page_height,
            ops: Vec::new(),
        }
    }

    pub fn into_ops(self) -> Vec<Op> {
        self.ops
    }

    fn flip(&self, y: f32) -> f32 {
        self.page_height - y
    }

    pub fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, fill: Rgb3) {
        let top = self.flip(y);
        let bottom = top - height;
        self.ops.push(Op::SetFillColor { col: color(fill) });
        self.ops.push(Op::DrawPolygon {
            polygon: Polygon {
                rings: vec![PolygonRing {
                    points: vec![
                        point(x, bottom),
                        point(x + width, bottom),
                        point(x + width, top),
                        point(x, top),
                    ],
                }],
                mode: PaintMode::Fill,
                winding_order: WindingOrder::NonZero,
            },
        });
    }

    /// Filled circle approximated by a 16-gon; good enough at bullet sizes.
    pub fn fill_circle(&mut self, cx: f32, cy: f32, radius: f32, fill: Rgb3) {
        let cy = self.flip(cy);
        let points = (0..16)
            .map(|i| {
                let a = i as f32 * std::f32::consts::TAU / 16.0;
                point(cx + radius * a.cos(), cy + radius * a.sin())
            })
            .collect();
        self.ops.push(Op::SetFillColor { col: color(fill) });
        self.ops.push(Op::DrawPolygon {
            polygon: Polygon {
                rings: vec![PolygonRing { points }],
                mode: PaintMode::Fill,
                winding_order: WindingOrder::NonZero,
            },
        });
    }

    pub fn line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, thickness: f32, stroke: Rgb3) {
        let (y1, y2) = (self.flip(y1), self.flip(y2));
        self.ops.push(Op::SetOutlineColor { col: color(stroke) });
        self.ops.push(Op::SetOutlineThickness { pt: Pt(thickness) });
        self.ops.push(Op::DrawLine {
            line: Line {
                points: vec![point(x1, y1), point(x2, y2)],
                is_closed: false,
            },
        });
    }

    /// Draw one line of text whose *baseline* sits at `baseline_y`.
    pub fn text(
        &mut self,
        x: f32,
        baseline_y: f32,
        font_size: f32,
        bold: bool,
        fill: Rgb3,
        text: &str,
    ) {
        if text.is_empty() {
            return;
        }
        let font = if bold {
            BuiltinFont::HelveticaBold
        } else {
            BuiltinFont::Helvetica
        };
        let y = self.flip(baseline_y);
        self.ops.push(Op::StartTextSection);
        self.ops.push(Op::SetTextCursor {
            pos: Point { x: Pt(x), y: Pt(y) },
        });
        self.ops.push(Op::SetFontSizeBuiltinFont {
            size: Pt(font_size),
            font,
        });
        self.ops.push(Op::SetFillColor { col: color(fill) });
        self.ops.push(Op::WriteTextBuiltinFont {
            items: vec![TextItem::Text(to_winlatin(text))],
            font,
        });
        self.ops.push(Op::EndTextSection);
    }

    /// Place a registered image so it fills the box at (`x`, `y`) of
    /// `width` × `height` points.
    pub fn image(&mut self, image: &ImageResource, x: f32, y: f32, width: f32, height: f32) {
        let bottom = self.flip(y + height);
        // At dpi=72 printpdf renders 1 px = 1 pt.
        let scale_x = if image.px_width > 0 {
            width / image.px_width as f32
        } else {
            1.0
        };
        let scale_y = if image.px_height > 0 {
            height / image.px_height as f32
        } else {
            1.0
        };
        self.ops.push(Op::UseXobject {
            id: image.xobj_id.clone(),
            transform: XObjectTransform {
                translate_x: Some(Pt(x)),
                translate_y: Some(Pt(bottom)),
                dpi: Some(72.0),
                scale_x: Some(scale_x),
                scale_y: Some(scale_y),
                rotate: None,
            },
        });
    }
}

/// A printpdf XObject together with the pixel dimensions of the source image.
#[derive(Debug, Clone)]
pub struct ImageResource {
    pub xobj_id: XObjectId,
    pub px_width: u32,
    pub px_height: u32,
}

impl ImageResource {
    /// Largest box of the image's aspect ratio that fits `max_w` × `max_h`.
    pub fn fit(&self, max_w: f32, max_h: f32) -> (f32, f32) {
        fit_box(self.px_width, self.px_height, max_w, max_h)
    }
}

pub fn fit_box(px_width: u32, px_height: u32, max_w: f32, max_h: f32) -> (f32, f32) {
    if px_width == 0 || px_height == 0 {
        return (max_w, max_h);
    }
    let scale = (max_w / px_width as f32).min(max_h / px_height as f32);
    (px_width as f32 * scale, px_height as f32 * scale)
}

/// Decode image bytes and register them with the document.
pub fn register_image(doc: &mut PdfDocument, bytes: &[u8]) -> Result<ImageResource, String> {
    // Decode with the `image` crate to obtain pixel dimensions.
    let dyn_img = ::image::load_from_memory(bytes).map_err(|e| format!("decode error: {e}"))?;
    let (px_width, px_height) = (dyn_img.width(), dyn_img.height());

    let mut warnings: Vec<PdfWarnMsg> = Vec::new();
    let raw = RawImage::decode_from_bytes(bytes, &mut warnings)
        .map_err(|e| format!("PDF encode error: {e}"))?;
    let xobj_id = doc.add_image(&raw);

    Ok(ImageResource {
        xobj_id,
        px_width,
        px_height,
    })
}

/// Parse a `data:<mime>;base64,<data>` URI and return the raw decoded bytes.
pub fn parse_data_uri(src: &str) -> Result<Vec<u8>, String> {
    let rest = src.strip_prefix("data:").ok_or_else(|| {
        let preview: String = src.chars().take(80).collect();
        format!("image src must be a base64 data URI, got {preview:?}")
    })?;
    let (header, data) = rest
        .split_once(',')
        .ok_or_else(|| "invalid data URI: missing `,` separator".to_string())?;
    if !header.contains(";base64") {
        return Err("only base64-encoded data URIs are supported".to_string());
    }
    BASE64_STD
        .decode(data.trim())
        .map_err(|e| format!("base64 decode error: {e}"))
}

/// Build a `data:image/png;base64,…` URI.
pub fn png_data_uri(bytes: &[u8]) -> String {
    format!("data:image/png;base64,{}", BASE64_STD.encode(bytes))
}

/// Serialise a finished document.
pub fn save(doc: &PdfDocument) -> Vec<u8> {
    doc.save(&PdfSaveOptions::default(), &mut Vec::new())
}

/// Convert a UTF-8 string to raw Windows-1252 bytes then wrap in a String so
/// printpdf writes the bytes unchanged into the PDF stream (builtin fonts use
/// WinAnsiEncoding, so each glyph is one byte 0x00–0xFF).
fn to_winlatin(s: &str) -> String {
    let bytes: Vec<u8> = s
        .chars()
        .map(|c| match c {
            '\u{20AC}' => 0x80, // euro
            '\u{201A}' => 0x82, // single low-9 quote
            '\u{201E}' => 0x84, // double low-9 quote
            '\u{2026}' => 0x85, // ellipsis
            '\u{2018}' => 0x91, // left single quote
            '\u{2019}' => 0x92, // right single quote
            '\u{201C}' => 0x93, // left double quote
            '\u{201D}' => 0x94, // right double quote
            '\u{2022}' => 0x95, // bullet
            '\u{2013}' => 0x96, // en-dash
            '\u{2014}' => 0x97, // em-dash
            '\u{2122}' => 0x99, // trademark
            '\u{00A0}' => 0x20, // non-breaking space -> space
            c if (c as u32) < 256 => c as u8,
            _ => b'?',
        })
        .collect();
    // SAFETY: intentionally non-UTF-8 for 0x80-0xFF; printpdf passes these
    // bytes straight to the PDF stream, decoded by WinAnsiEncoding.
    #[allow(unsafe_code)]
    unsafe {
        String::from_utf8_unchecked(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_colours() {
        assert_eq!(hex("#ffffff"), Some([1.0, 1.0, 1.0]));
        assert_eq!(hex("000"), Some([0.0, 0.0, 0.0]));
        let red = hex("#c91e42").unwrap();
        assert!((red[0] - 0.788).abs() < 0.01);
        assert_eq!(hex("#12"), None);
    }

    #[test]
    fn data_uri_round_trip() {
        let uri = png_data_uri(b"\x89PNG");
        assert!(uri.starts_with("data:image/png;base64,"));
        assert_eq!(parse_data_uri(&uri).unwrap(), b"\x89PNG");
        assert!(parse_data_uri("logo.png").is_err());
        assert!(parse_data_uri("data:image/png,raw").is_err());
    }

    #[test]
    fn fit_keeps_aspect_ratio() {
        assert_eq!(fit_box(200, 100, 80.0, 30.0), (60.0, 30.0));
        assert_eq!(fit_box(100, 100, 150.0, 150.0), (150.0, 150.0));
        assert_eq!(fit_box(0, 10, 5.0, 6.0), (5.0, 6.0));
    }
}
