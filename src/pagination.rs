//! Pagination – splits the continuous layout tree into pages.
//!
//! Handles:
//! - page boundaries inside the top/bottom print margins
//! - `page-break-before` hints
//! - keeping atomic boxes (lines, table rows, flex rows) whole
//! - repeating a table's header row when the table continues
//! - containers whose background or borders span several pages

use crate::layout::{BoxContent, BoxRole, PositionedBox};
use crate::layout_config::*;

/// Tolerance for boxes that end exactly on a page boundary.
const EPSILON: f32 = 0.01;

/// Page size and vertical print margins, in points.
#[derive(Debug, Clone, Copy)]
pub struct PageGeometry {
    pub page_width: f32,
    pub page_height: f32,
    pub margin_top: f32,
    pub margin_bottom: f32,
}

impl PageGeometry {
    pub fn content_height(&self) -> f32 {
        (self.page_height - self.margin_top - self.margin_bottom).max(1.0)
    }
}

/// Convert positioned boxes into a paginated [`LayoutConfig`]. The result
/// always has at least one page, and each page lists its boxes in paint
/// order.
pub fn paginate(boxes: &[PositionedBox], geometry: &PageGeometry, title: &str) -> LayoutConfig {
    let mut paginator = Paginator {
        content_height: geometry.content_height(),
        margin_top: geometry.margin_top,
        offset: 0.0,
        pages: vec![PageLayout::default()],
    };
    for b in boxes {
        paginator.walk(b, None, 0);
    }

    let mut pages = paginator.pages;
    for page in &mut pages {
        page.boxes.sort_by_key(|b| b.depth);
    }
    log::debug!("paginated into {} page(s)", pages.len());

    LayoutConfig {
        title: title.to_string(),
        page_width_pt: geometry.page_width,
        page_height_pt: geometry.page_height,
        pages,
    }
}

struct Paginator {
    content_height: f32,
    margin_top: f32,
    /// Accumulated downward shift of the layout caused by page breaks.
    offset: f32,
    pages: Vec<PageLayout>,
}

impl Paginator {
    /// Page index for a shifted document y.
    fn page_of(&self, y: f32) -> usize {
        ((y + EPSILON) / self.content_height).floor().max(0.0) as usize
    }

    fn page_mut(&mut self, index: usize) -> &mut PageLayout {
        while self.pages.len() <= index {
            let page_index = self.pages.len();
            self.pages.push(PageLayout {
                page_index,
                boxes: Vec::new(),
            });
        }
        &mut self.pages[index]
    }

    /// Push everything from `doc_y` onwards to the start of the next page,
    /// unless it already starts one.
    fn break_before(&mut self, doc_y: f32) {
        let top = doc_y + self.offset;
        let page = self.page_of(top);
        if top - page as f32 * self.content_height > EPSILON {
            self.offset += (page + 1) as f32 * self.content_height - top;
        }
    }

    /// Place a box and its subtree; returns the shifted top of the first
    /// atom placed.
    fn walk(&mut self, b: &PositionedBox, header: Option<&PositionedBox>, depth: usize) -> f32 {
        if b.break_before {
            self.break_before(b.y);
        }
        if b.atomic || b.children.is_empty() {
            return self.place(b, header, depth);
        }

        let table_header = if b.role == BoxRole::Table {
            b.children.iter().find(|c| c.role == BoxRole::TableHeader)
        } else {
            None
        };

        let mut start = b.y + self.offset;
        let mut first_atom = None;
        for child in &b.children {
            let repeat = table_header.filter(|_| child.role != BoxRole::TableHeader);
            let top = self.walk(child, repeat, depth + 1);
            first_atom.get_or_insert(top);
        }
        // The first child was pushed onto a later page: so is this box.
        if let Some(top) = first_atom {
            let page = self.page_of(top);
            if page > self.page_of(start) {
                start = page as f32 * self.content_height;
            }
        }
        let end = (b.y + b.height + self.offset).max(start);
        self.emit_segments(b, start, end, depth);
        first_atom.unwrap_or(start)
    }

    /// Place an unsplittable box, moving it to the next page if it would
    /// straddle a boundary. Boxes taller than a page are left to overflow.
    fn place(&mut self, b: &PositionedBox, header: Option<&PositionedBox>, depth: usize) -> f32 {
        let mut top = b.y + self.offset;
        let page = self.page_of(top);
        let page_end = (page + 1) as f32 * self.content_height;

        if b.height <= self.content_height + EPSILON && top + b.height > page_end + EPSILON {
            self.offset += page_end - top;
            top = page_end;
            if let Some(h) = header {
                self.emit(h, top - h.y, depth);
                self.offset += h.height;
                top += h.height;
            }
        }
        self.emit(b, self.offset, depth);
        top
    }

    /// Emit an atom shifted by `dy`, on the page where its top lands.
    fn emit(&mut self, b: &PositionedBox, dy: f32, depth: usize) {
        let page = self.page_of(b.y + dy);
        let shift = dy - page as f32 * self.content_height + self.margin_top;
        flatten_into(b, shift, depth, &mut self.page_mut(page).boxes);
    }

    /// Background and border pieces of a container, one per page it spans.
    /// The top border goes on the first piece and the bottom border on the
    /// last.
    fn emit_segments(&mut self, b: &PositionedBox, start: f32, end: f32, depth: usize) {
        let decorated = !b.background.is_transparent()
            || b.border_top.is_visible()
            || b.border_bottom.is_visible();
        if !decorated {
            return;
        }
        let first = self.page_of(start);
        let last = self.page_of((end - EPSILON).max(start));
        for page in first..=last {
            let page_top = page as f32 * self.content_height;
            let seg_top = start.max(page_top);
            let seg_bottom = end.min(page_top + self.content_height);
            if first != last && seg_bottom - seg_top <= EPSILON {
                continue;
            }
            let mut segment = to_layout_box(b, seg_top - page_top + self.margin_top, seg_bottom - seg_top, depth);
            if page != first {
                segment.border_top = None;
            }
            if page != last {
                segment.border_bottom = None;
            }
            segment.line = None;
            segment.image = None;
            self.page_mut(page).boxes.push(segment);
        }
    }
}

/// Append `b` and its descendants, shifted down by `dy`, in pre-order.
pub fn flatten_into(b: &PositionedBox, dy: f32, depth: usize, out: &mut Vec<LayoutBox>) {
    let lb = to_layout_box(b, b.y + dy, b.height, depth);
    if !lb.is_empty() {
        out.push(lb);
    }
    for child in &b.children {
        flatten_into(child, dy, depth + 1, out);
    }
}

fn to_layout_box(b: &PositionedBox, y: f32, height: f32, depth: usize) -> LayoutBox {
    let mut lb = LayoutBox::new(b.x, y, b.width, height, depth);
    if !b.background.is_transparent() {
        lb.background_color = Some(b.background.rgb());
    }
    if b.border_top.is_visible() {
        lb.border_top = Some(BorderEdge {
            width: b.border_top.width,
            color: b.border_top.color.rgb(),
        });
    }
    if b.border_bottom.is_visible() {
        lb.border_bottom = Some(BorderEdge {
            width: b.border_bottom.width,
            color: b.border_bottom.color.rgb(),
        });
    }
    match &b.content {
        BoxContent::Line(fragments) => {
            lb.line = Some(TextLine {
                fragments: fragments
                    .iter()
                    .map(|f| TextFragment {
                        text: f.text.clone(),
                        x_offset: f.x_offset,
                        baseline: f.baseline,
                        font_size: f.font_size,
                        bold: f.bold,
                        color: f.color.rgb(),
                    })
                    .collect(),
            });
        }
        BoxContent::Image { src } => lb.image = Some(ImageContent { src: src.clone() }),
        BoxContent::None => {}
    }
    lb
}
