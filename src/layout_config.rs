//! Layout config – the intermediate representation between pagination and
//! PDF rendering. Encodes exactly what goes on each page, in page-absolute
//! points with a top-left origin.

use serde::{Deserialize, Serialize};

/// A complete paginated document ready for rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Document title embedded in the PDF metadata.
    pub title: String,
    /// Width of each page in PDF points (1 pt = 1/72 inch).
    pub page_width_pt: f32,
    /// Height of each page in PDF points.
    pub page_height_pt: f32,
    /// Ordered list of pages; never empty once paginated.
    pub pages: Vec<PageLayout>,
}

/// One page of content. Boxes are painted in ascending `depth`, ties in
/// list order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageLayout {
    pub page_index: usize,
    pub boxes: Vec<LayoutBox>,
}

/// A positioned rectangle with optional decoration and content.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LayoutBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// Nesting depth in the source tree; parents paint before children.
    pub depth: usize,

    pub background_color: Option<[f32; 3]>,
    pub border_top: Option<BorderEdge>,
    pub border_bottom: Option<BorderEdge>,

    pub line: Option<TextLine>,
    pub image: Option<ImageContent>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BorderEdge {
    pub width: f32,
    pub color: [f32; 3],
}

/// One laid-out line of text.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TextLine {
    pub fragments: Vec<TextFragment>,
}

impl TextLine {
    pub fn text(&self) -> String {
        self.fragments.iter().map(|f| f.text.as_str()).collect()
    }
}

/// A run of text in one font, size and colour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextFragment {
    pub text: String,
    /// Offset from the owning box's left edge (may be negative for list
    /// markers hanging in the gutter).
    pub x_offset: f32,
    /// Baseline offset from the owning box's top edge.
    pub baseline: f32,
    pub font_size: f32,
    pub bold: bool,
    pub color: [f32; 3],
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageContent {
    pub src: String,
}

impl LayoutConfig {
    /// An empty A4 document.
    pub fn a4(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            // A4: 210mm × 297mm = 595.28 × 841.89 points
            page_width_pt: 595.28,
            page_height_pt: 841.89,
            pages: Vec::new(),
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// The lines of text on page `index`, top to bottom.
    pub fn page_lines(&self, index: usize) -> Vec<String> {
        let Some(page) = self.pages.get(index) else {
            return Vec::new();
        };
        let mut lines: Vec<(f32, f32, String)> = page
            .boxes
            .iter()
            .filter_map(|b| b.line.as_ref().map(|l| (b.y, b.x, l.text())))
            .filter(|(_, _, text)| !text.is_empty())
            .collect();
        lines.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)));
        lines.into_iter().map(|(_, _, text)| text).collect()
    }

    /// Serialise to JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    /// Deserialise from JSON.
    pub fn from_json(json: &str) -> Result<Self, String> {
        serde_json::from_str(json).map_err(|e| e.to_string())
    }
}

impl LayoutBox {
    pub fn new(x: f32, y: f32, width: f32, height: f32, depth: usize) -> Self {
        Self {
            x,
            y,
            width,
            height,
            depth,
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.background_color.is_none()
            && self.border_top.is_none()
            && self.border_bottom.is_none()
            && self.line.is_none()
            && self.image.is_none()
    }
}
