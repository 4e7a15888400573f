//! Layout engine – uses Taffy to compute block, flex and table geometry from
//! a styled DOM tree, then converts the result into positioned boxes in
//! continuous document coordinates (before pagination).
//!
//! Blocks are flex columns, `display: flex` rows are flex rows and tables are
//! columns of flex rows whose cells follow the first row's widths. Runs of
//! inline content become measured Taffy leaves and are broken into line
//! boxes here, with word wrapping and subscripts. Margins do not collapse.

use std::collections::HashMap;

use taffy::prelude::{
    AvailableSpace, LengthPercentage, LengthPercentageAuto, NodeId, Rect, Size, TaffyTree,
};

use crate::dom::Tag;
use crate::fonts::{FontManager, ASCENDER};
use crate::paint::parse_data_uri;
use crate::style::{
    AlignItems, Border, Color, ComputedStyle, Dimension, Display, FlexDirection, JustifyContent,
    ListStyle, StyledNode, TextAlign, VerticalAlign,
};

/// CSS reference pixels to points.
const PX_TO_PT: f32 = 0.75;

/// Line width used when measuring max-content runs.
const UNBOUNDED: f32 = 1.0e6;

// ---------------------------------------------------------------------------
// Intermediate layout tree (pre-pagination)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BoxRole {
    #[default]
    Block,
    Table,
    /// A `<thead>` row, repeated when its table continues on a new page.
    TableHeader,
}

/// A run of text sharing one font, positioned relative to its line box.
#[derive(Debug, Clone)]
pub struct Fragment {
    pub text: String,
    pub x_offset: f32,
    pub baseline: f32,
    pub font_size: f32,
    pub bold: bool,
    pub color: Color,
}

#[derive(Debug, Clone)]
pub enum BoxContent {
    None,
    Line(Vec<Fragment>),
    Image { src: String },
}

/// A positioned box in document coordinates (before page splitting).
#[derive(Debug, Clone)]
pub struct PositionedBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub background: Color,
    pub border_top: Border,
    pub border_bottom: Border,
    pub content: BoxContent,
    pub children: Vec<PositionedBox>,
    /// Must not be split across pages.
    pub atomic: bool,
    pub break_before: bool,
    pub role: BoxRole,
}

impl PositionedBox {
    fn empty(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            background: Color::TRANSPARENT,
            border_top: Border::NONE,
            border_bottom: Border::NONE,
            content: BoxContent::None,
            children: Vec::new(),
            atomic: false,
            break_before: false,
            role: BoxRole::Block,
        }
    }

    fn decorate(&mut self, style: &ComputedStyle) {
        self.background = style.background_color;
        self.border_top = style.border_top;
        self.border_bottom = style.border_bottom;
    }

    pub fn translate(&mut self, dx: f32, dy: f32) {
        self.x += dx;
        self.y += dy;
        for child in &mut self.children {
            child.translate(dx, dy);
        }
    }

    fn first_line_mut(&mut self) -> Option<&mut PositionedBox> {
        if matches!(self.content, BoxContent::Line(_)) {
            return Some(self);
        }
        self.children.iter_mut().find_map(|c| c.first_line_mut())
    }

    /// Text of every line in the subtree, in document order.
    pub fn lines(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_lines(&mut out);
        out
    }

    fn collect_lines(&self, out: &mut Vec<String>) {
        if let BoxContent::Line(fragments) = &self.content {
            out.push(fragments.iter().map(|f| f.text.as_str()).collect());
        }
        for child in &self.children {
            child.collect_lines(out);
        }
    }
}

// ---------------------------------------------------------------------------
// Inline formatting
// ---------------------------------------------------------------------------

enum Atom<'n> {
    Word {
        text: String,
        style: &'n ComputedStyle,
        space_before: bool,
    },
    Image {
        src: String,
        width: f32,
        height: f32,
        space_before: bool,
    },
    Break,
}

enum LineItem<'n> {
    Text {
        text: String,
        style: &'n ComputedStyle,
        x: f32,
    },
    Image {
        src: String,
        x: f32,
        width: f32,
        height: f32,
    },
}

/// Non-breaking spaces stay inside words.
fn is_collapsible(c: char) -> bool {
    c.is_whitespace() && c != '\u{00A0}'
}

/// Lines laid out from an inline run.
struct LineSet {
    boxes: Vec<PositionedBox>,
    height: f32,
    /// Widest line before alignment.
    widest: f32,
}

/// Breaks inline content into line boxes.
struct InlineLayout<'f> {
    fonts: &'f FontManager,
}

impl<'f> InlineLayout<'f> {
    /// Break an inline run into line boxes starting at (`x`, `y`).
    fn lines(
        &self,
        run: &[&StyledNode],
        x: f32,
        y: f32,
        width: f32,
        block: &ComputedStyle,
    ) -> LineSet {
        let mut atoms = Vec::new();
        let mut pending_space = false;
        for node in run {
            self.collect_atoms(node, width, &mut atoms, &mut pending_space);
        }

        let mut out = Vec::new();
        let mut cursor = y;
        let mut line: Vec<LineItem> = Vec::new();
        let mut used = 0.0f32;
        let mut widest = 0.0f32;

        for atom in atoms {
            match atom {
                Atom::Break => {
                    widest = widest.max(used);
                    cursor = self.finish_line(std::mem::take(&mut line), used, x, cursor, width, block, true, &mut out);
                    used = 0.0;
                }
                Atom::Word {
                    text,
                    style,
                    space_before,
                } => {
                    let (size, bold) = (style.font_size, style.is_bold());
                    let word_w = self.fonts.measure_text_width(&text, size, bold);
                    let space_w = if space_before && !line.is_empty() {
                        self.fonts.measure_text_width(" ", size, bold)
                    } else {
                        0.0
                    };
                    if !line.is_empty() && used + space_w + word_w > width + 0.01 {
                        widest = widest.max(used);
                        cursor = self.finish_line(std::mem::take(&mut line), used, x, cursor, width, block, false, &mut out);
                        push_text(&mut line, text, style, 0.0, false);
                        used = word_w;
                    } else {
                        push_text(&mut line, text, style, used, space_w > 0.0);
                        used += space_w + word_w;
                    }
                }
                Atom::Image {
                    src,
                    width: w,
                    height: h,
                    space_before,
                } => {
                    let space_w = if space_before && !line.is_empty() {
                        self.fonts.measure_text_width(" ", block.font_size, false)
                    } else {
                        0.0
                    };
                    let mut at = used + space_w;
                    if !line.is_empty() && at + w > width + 0.01 {
                        widest = widest.max(used);
                        cursor = self.finish_line(std::mem::take(&mut line), used, x, cursor, width, block, false, &mut out);
                        at = 0.0;
                    }
                    line.push(LineItem::Image {
                        src,
                        x: at,
                        width: w,
                        height: h,
                    });
                    used = at + w;
                }
            }
        }
        if !line.is_empty() {
            widest = widest.max(used);
            cursor = self.finish_line(line, used, x, cursor, width, block, false, &mut out);
        }
        LineSet {
            boxes: out,
            height: cursor - y,
            widest,
        }
    }

    fn collect_atoms<'n>(
        &self,
        node: &'n StyledNode,
        width: f32,
        atoms: &mut Vec<Atom<'n>>,
        pending_space: &mut bool,
    ) {
        match node {
            StyledNode::Text { text, style } => {
                if text.starts_with(is_collapsible) {
                    *pending_space = true;
                }
                for word in text.split(is_collapsible).filter(|w| !w.is_empty()) {
                    atoms.push(Atom::Word {
                        text: word.to_string(),
                        style,
                        space_before: *pending_space,
                    });
                    *pending_space = true;
                }
                *pending_space = text.ends_with(is_collapsible);
            }
            StyledNode::Element { tag: Tag::Br, .. } => {
                atoms.push(Atom::Break);
                *pending_space = false;
            }
            StyledNode::Element {
                tag: Tag::Img,
                style,
                attrs,
                ..
            } => {
                let (w, h) = image_size(style, attrs, width);
                atoms.push(Atom::Image {
                    src: image_src(attrs),
                    width: w,
                    height: h,
                    space_before: *pending_space,
                });
                *pending_space = false;
            }
            StyledNode::Element { children, .. } => {
                for child in children {
                    self.collect_atoms(child, width, atoms, pending_space);
                }
            }
        }
    }

    /// Close a line: size it from its tallest item, align it, append it.
    #[allow(clippy::too_many_arguments)]
    fn finish_line(
        &self,
        items: Vec<LineItem>,
        used: f32,
        x: f32,
        top: f32,
        width: f32,
        block: &ComputedStyle,
        keep_empty: bool,
        out: &mut Vec<PositionedBox>,
    ) -> f32 {
        if items.is_empty() && !keep_empty {
            return top;
        }
        // (ascent, descent) of a line box with half-leading.
        let metrics = |size: f32, line_h: f32| {
            let ascent = (line_h - size) / 2.0 + size * ASCENDER;
            (ascent, line_h - ascent)
        };
        let (mut ascent, mut descent) = metrics(block.font_size, block.line_height_pt());
        for item in &items {
            match item {
                LineItem::Text { style, .. } if style.vertical_align == VerticalAlign::Baseline => {
                    let (a, d) = metrics(style.font_size, style.line_height_pt());
                    ascent = ascent.max(a);
                    descent = descent.max(d);
                }
                LineItem::Text { .. } => {}
                LineItem::Image { height, .. } => ascent = ascent.max(*height),
            }
        }

        let slack = (width - used).max(0.0);
        let shift = match block.text_align {
            TextAlign::Left => 0.0,
            TextAlign::Center => slack / 2.0,
            TextAlign::Right => slack,
        };

        let mut line_box = PositionedBox::empty(x, top, width, ascent + descent);
        line_box.atomic = true;
        let mut fragments = Vec::new();
        for item in items {
            match item {
                LineItem::Text {
                    text,
                    style,
                    x: item_x,
                } => {
                    let drop = if style.vertical_align == VerticalAlign::Sub {
                        style.font_size * 0.3
                    } else {
                        0.0
                    };
                    fragments.push(Fragment {
                        text,
                        x_offset: shift + item_x,
                        baseline: ascent + drop,
                        font_size: style.font_size,
                        bold: style.is_bold(),
                        color: style.color,
                    });
                }
                LineItem::Image {
                    src,
                    x: item_x,
                    width: w,
                    height: h,
                } => {
                    let mut img = PositionedBox::empty(x + shift + item_x, top + ascent - h, w, h);
                    img.content = BoxContent::Image { src };
                    line_box.children.push(img);
                }
            }
        }
        line_box.content = BoxContent::Line(fragments);
        out.push(line_box);
        top + ascent + descent
    }

    /// Hang a bullet or number left of the item's first line.
    fn attach_marker(&self, item: &mut PositionedBox, s: &ComputedStyle, ordinal: usize, text_x: f32) {
        let marker = match s.list_style {
            ListStyle::Disc => "\u{2022}".to_string(),
            ListStyle::Decimal => format!("{ordinal}."),
            ListStyle::None => return,
        };
        let width = self.fonts.measure_text_width(&marker, s.font_size, false);
        let Some(line) = item.first_line_mut() else {
            return;
        };
        let BoxContent::Line(fragments) = &mut line.content else {
            return;
        };
        let baseline = fragments
            .first()
            .map(|f| f.baseline)
            .unwrap_or_else(|| self.fonts.ascender(s.font_size));
        let marker_x = text_x - s.font_size * 0.5 - width;
        fragments.insert(
            0,
            Fragment {
                text: marker,
                x_offset: marker_x - line.x,
                baseline,
                font_size: s.font_size,
                bold: false,
                color: s.color,
            },
        );
    }
}

/// Append a word at `x` (the pen position before any separating space).
fn push_text<'n>(
    line: &mut Vec<LineItem<'n>>,
    word: String,
    style: &'n ComputedStyle,
    x: f32,
    spaced: bool,
) {
    if let Some(LineItem::Text {
        text, style: prev, ..
    }) = line.last_mut()
    {
        if std::ptr::eq(*prev, style) {
            if spaced {
                text.push(' ');
            }
            text.push_str(&word);
            return;
        }
    }
    // A run starting after a space carries it, so line text reads naturally.
    let text = if spaced { format!(" {word}") } else { word };
    line.push(LineItem::Text { text, style, x });
}

// ---------------------------------------------------------------------------
// Build Taffy tree from styled nodes
// ---------------------------------------------------------------------------

/// Consecutive inline siblings laid out as one measured leaf.
struct InlineRun<'n> {
    nodes: Vec<&'n StyledNode>,
    /// Style of the enclosing block (alignment, strut).
    block: &'n ComputedStyle,
}

enum NodeKind {
    Block,
    Image { src: String },
    /// Index into [`LayoutBuilder::runs`].
    Run(usize),
    /// Empty cell padding a short table row.
    Filler,
}

struct NodeInfo<'n> {
    style: &'n ComputedStyle,
    kind: NodeKind,
    role: BoxRole,
    atomic: bool,
    /// 1-based position among list-item siblings.
    ordinal: usize,
}

/// How a flex row sizes one of its items.
#[derive(Clone, Copy)]
enum ItemSizing {
    /// In normal flow: stretched across the container.
    Flow,
    /// Fixed-width items keep their width; the rest share what remains.
    FlexRow,
    /// A table cell in a column of the given width (`None`: equal share).
    Cell(Option<Dimension>),
}

struct LayoutBuilder<'n, 'f> {
    taffy: TaffyTree<usize>,
    inline: InlineLayout<'f>,
    runs: Vec<InlineRun<'n>>,
    nodes: HashMap<NodeId, NodeInfo<'n>>,
}

fn layout_err(e: impl std::fmt::Display) -> String {
    format!("layout failed: {e}")
}

impl<'n, 'f> LayoutBuilder<'n, 'f> {
    fn new(fonts: &'f FontManager) -> Self {
        Self {
            taffy: TaffyTree::new(),
            inline: InlineLayout { fonts },
            runs: Vec::new(),
            nodes: HashMap::new(),
        }
    }

    fn register(&mut self, node: NodeId, style: &'n ComputedStyle, kind: NodeKind) -> &mut NodeInfo<'n> {
        self.nodes.entry(node).or_insert(NodeInfo {
            style,
            kind,
            role: BoxRole::Block,
            atomic: false,
            ordinal: 0,
        })
    }

    /// Children in normal flow: inline runs become leaves, blocks become
    /// nodes, list items are numbered.
    fn build_flow(
        &mut self,
        children: &'n [StyledNode],
        block: &'n ComputedStyle,
        width_hint: f32,
    ) -> Result<Vec<NodeId>, String> {
        let mut ids = Vec::new();
        let mut run: Vec<&'n StyledNode> = Vec::new();
        let mut ordinal = 0usize;

        for child in children {
            if is_inline_level(child) {
                run.push(child);
                continue;
            }
            if let Some(id) = self.build_run(std::mem::take(&mut run), block, ItemSizing::Flow)? {
                ids.push(id);
            }
            if child.style().display == Display::ListItem {
                ordinal += 1;
            }
            let id = self.build_block(child, ItemSizing::Flow, width_hint)?;
            if let Some(info) = self.nodes.get_mut(&id) {
                info.ordinal = ordinal;
            }
            ids.push(id);
        }
        if let Some(id) = self.build_run(run, block, ItemSizing::Flow)? {
            ids.push(id);
        }
        Ok(ids)
    }

    /// A measured leaf for an inline run; `None` for whitespace-only runs.
    fn build_run(
        &mut self,
        nodes: Vec<&'n StyledNode>,
        block: &'n ComputedStyle,
        sizing: ItemSizing,
    ) -> Result<Option<NodeId>, String> {
        if nodes.iter().all(|n| is_blank_text(n)) {
            return Ok(None);
        }
        let index = self.runs.len();
        self.runs.push(InlineRun { nodes, block });
        let mut style = taffy::Style::default();
        apply_item_sizing(&mut style, sizing, None);
        let id = self.taffy.new_leaf_with_context(style, index).map_err(layout_err)?;
        self.register(id, block, NodeKind::Run(index));
        Ok(Some(id))
    }

    fn build_block(
        &mut self,
        node: &'n StyledNode,
        sizing: ItemSizing,
        width_hint: f32,
    ) -> Result<NodeId, String> {
        let StyledNode::Element {
            tag,
            style: s,
            children,
            attrs,
        } = node
        else {
            // Loose text as a flex item.
            let id = self.build_run(vec![node], node.style(), sizing)?;
            return match id {
                Some(id) => Ok(id),
                None => {
                    let id = self.taffy.new_leaf(taffy::Style::default()).map_err(layout_err)?;
                    self.register(id, node.style(), NodeKind::Filler);
                    Ok(id)
                }
            };
        };

        if *tag == Tag::Img {
            let (w, h) = image_size(s, attrs, width_hint);
            let mut ts = computed_to_taffy(s);
            ts.size = Size {
                width: taffy::Dimension::Length(w),
                height: taffy::Dimension::Length(h),
            };
            ts.max_size = Size::auto();
            ts.flex_shrink = 0.0;
            let id = self.taffy.new_leaf(ts).map_err(layout_err)?;
            self.register(id, s, NodeKind::Image { src: image_src(attrs) });
            return Ok(id);
        }

        let inner_hint = s.width.resolve(width_hint).unwrap_or(width_hint)
            - s.padding_left
            - s.padding_right;
        let is_flex_row = s.display == Display::Flex && s.flex_direction == FlexDirection::Row;
        let mut ts = computed_to_taffy(s);
        apply_item_sizing(&mut ts, sizing, Some(s));

        let (child_ids, role) = if is_flex_row {
            ts.flex_direction = taffy::FlexDirection::Row;
            ts.justify_content = Some(match s.justify_content {
                JustifyContent::Start => taffy::JustifyContent::Start,
                JustifyContent::End => taffy::JustifyContent::End,
                JustifyContent::Center => taffy::JustifyContent::Center,
                JustifyContent::SpaceBetween => taffy::JustifyContent::SpaceBetween,
            });
            ts.align_items = Some(match s.align_items {
                AlignItems::Start => taffy::AlignItems::Start,
                AlignItems::End => taffy::AlignItems::End,
                AlignItems::Center => taffy::AlignItems::Center,
                AlignItems::Stretch => taffy::AlignItems::Stretch,
            });
            ts.gap = Size {
                width: LengthPercentage::Length(s.gap),
                height: LengthPercentage::Length(0.0),
            };
            let mut ids = Vec::new();
            for item in children.iter().filter(|c| !is_blank_text(c)) {
                ids.push(self.build_block(item, ItemSizing::FlexRow, inner_hint)?);
            }
            (ids, BoxRole::Block)
        } else if s.display == Display::Table {
            (self.build_table_rows(children, inner_hint)?, BoxRole::Table)
        } else {
            (self.build_flow(children, s, inner_hint)?, BoxRole::Block)
        };

        let id = self.taffy.new_with_children(ts, &child_ids).map_err(layout_err)?;
        let info = self.register(id, s, NodeKind::Block);
        info.role = role;
        info.atomic = s.page_break_inside_avoid || is_flex_row;
        Ok(id)
    }

    /// Rows of a table (row groups flattened), each a flex row whose cells
    /// follow the first row's column widths.
    fn build_table_rows(&mut self, children: &'n [StyledNode], width_hint: f32) -> Result<Vec<NodeId>, String> {
        let mut rows: Vec<(&'n StyledNode, bool)> = Vec::new();
        for child in children {
            let StyledNode::Element {
                tag,
                style,
                children: grandchildren,
                ..
            } = child
            else {
                continue;
            };
            match style.display {
                Display::TableRowGroup => rows.extend(
                    grandchildren
                        .iter()
                        .filter(|r| r.style().display == Display::TableRow)
                        .map(|r| (r, *tag == Tag::Thead)),
                ),
                Display::TableRow => rows.push((child, false)),
                _ => {}
            }
        }

        let columns = rows.iter().map(|(r, _)| table_cells(r).len()).max().unwrap_or(0);
        if columns == 0 {
            return Ok(Vec::new());
        }
        let widths: Vec<Option<Dimension>> = (0..columns)
            .map(|i| {
                rows.first()
                    .and_then(|(r, _)| table_cells(r).get(i).map(|c| c.style().width))
                    .filter(|w| *w != Dimension::Auto)
            })
            .collect();
        let cell_hint = width_hint / columns as f32;

        let mut ids = Vec::with_capacity(rows.len());
        for (row, header) in rows {
            let cells = table_cells(row);
            let mut cell_ids = Vec::with_capacity(columns);
            for (i, width) in widths.iter().enumerate() {
                let id = match cells.get(i) {
                    Some(cell) => self.build_block(cell, ItemSizing::Cell(*width), cell_hint)?,
                    None => {
                        let mut ts = taffy::Style::default();
                        apply_item_sizing(&mut ts, ItemSizing::Cell(*width), None);
                        let id = self.taffy.new_leaf(ts).map_err(layout_err)?;
                        self.register(id, row.style(), NodeKind::Filler);
                        id
                    }
                };
                cell_ids.push(id);
            }

            let s = row.style();
            let mut ts = computed_to_taffy(s);
            ts.flex_direction = taffy::FlexDirection::Row;
            ts.align_items = Some(taffy::AlignItems::Stretch);
            ts.size.width = taffy::Dimension::Percent(1.0);
            let id = self.taffy.new_with_children(ts, &cell_ids).map_err(layout_err)?;
            let info = self.register(id, s, NodeKind::Block);
            info.atomic = true;
            if header {
                info.role = BoxRole::TableHeader;
            }
            ids.push(id);
        }
        Ok(ids)
    }

    /// Convert the computed Taffy layout of `node` into positioned boxes.
    fn extract(&self, node: NodeId, offset_x: f32, offset_y: f32, out: &mut Vec<PositionedBox>) -> Result<(), String> {
        let layout = self.taffy.layout(node).map_err(layout_err)?;
        let x = offset_x + layout.location.x;
        let y = offset_y + layout.location.y;
        let (width, height) = (layout.size.width, layout.size.height);
        let Some(info) = self.nodes.get(&node) else {
            return Ok(());
        };

        match &info.kind {
            NodeKind::Filler => {}
            NodeKind::Run(index) => {
                let run = &self.runs[*index];
                out.extend(self.inline.lines(&run.nodes, x, y, width, run.block).boxes);
            }
            NodeKind::Image { src } => {
                let mut b = PositionedBox::empty(x, y, width, height);
                b.decorate(info.style);
                b.content = BoxContent::Image { src: src.clone() };
                out.push(b);
            }
            NodeKind::Block => {
                let mut b = PositionedBox::empty(x, y, width, height);
                b.decorate(info.style);
                for child in self.taffy.children(node).map_err(layout_err)? {
                    self.extract(child, x, y, &mut b.children)?;
                }
                b.atomic = info.atomic;
                b.break_before = info.style.page_break_before;
                b.role = info.role;
                if info.style.display == Display::ListItem {
                    let text_x = x + info.style.padding_left;
                    self.inline.attach_marker(&mut b, info.style, info.ordinal, text_x);
                }
                out.push(b);
            }
        }
        Ok(())
    }
}

/// Taffy style of a block-level box: a flex column with the box model.
fn computed_to_taffy(s: &ComputedStyle) -> taffy::Style {
    taffy::Style {
        display: taffy::Display::Flex,
        flex_direction: taffy::FlexDirection::Column,
        align_items: Some(taffy::AlignItems::Stretch),
        size: Size {
            width: dim_to_taffy(s.width),
            height: taffy::Dimension::Auto,
        },
        min_size: Size {
            width: taffy::Dimension::Auto,
            height: match s.height {
                Dimension::Pt(h) => taffy::Dimension::Length(h),
                _ => taffy::Dimension::Auto,
            },
        },
        max_size: Size {
            width: dim_to_taffy(s.max_width),
            height: taffy::Dimension::Auto,
        },
        margin: Rect {
            top: LengthPercentageAuto::Length(s.margin_top),
            right: LengthPercentageAuto::Length(s.margin_right),
            bottom: LengthPercentageAuto::Length(s.margin_bottom),
            left: LengthPercentageAuto::Length(s.margin_left),
        },
        padding: Rect {
            top: LengthPercentage::Length(s.padding_top),
            right: LengthPercentage::Length(s.padding_right),
            bottom: LengthPercentage::Length(s.padding_bottom),
            left: LengthPercentage::Length(s.padding_left),
        },
        // Only horizontal rules are drawn; they still take up space.
        border: Rect {
            top: LengthPercentage::Length(s.border_top.width),
            right: LengthPercentage::Length(0.0),
            bottom: LengthPercentage::Length(s.border_bottom.width),
            left: LengthPercentage::Length(0.0),
        },
        ..taffy::Style::default()
    }
}

fn apply_item_sizing(ts: &mut taffy::Style, sizing: ItemSizing, s: Option<&ComputedStyle>) {
    let explicit = s.is_some_and(|s| s.width != Dimension::Auto);
    match sizing {
        ItemSizing::Flow => {}
        ItemSizing::FlexRow if explicit => {
            ts.flex_grow = 0.0;
            ts.flex_shrink = 0.0;
        }
        ItemSizing::FlexRow => share_remaining(ts),
        ItemSizing::Cell(Some(width)) => {
            ts.size.width = dim_to_taffy(width);
            ts.flex_grow = 0.0;
            ts.flex_shrink = 0.0;
        }
        ItemSizing::Cell(None) => {
            ts.size.width = taffy::Dimension::Auto;
            share_remaining(ts);
        }
    }
    if matches!(sizing, ItemSizing::Cell(_)) {
        // Cell content sits in the vertical middle.
        ts.justify_content = Some(taffy::JustifyContent::Center);
    }
}

fn share_remaining(ts: &mut taffy::Style) {
    ts.flex_basis = taffy::Dimension::Length(0.0);
    ts.flex_grow = 1.0;
    ts.flex_shrink = 1.0;
    ts.min_size.width = taffy::Dimension::Length(0.0);
}

fn dim_to_taffy(d: Dimension) -> taffy::Dimension {
    match d {
        Dimension::Auto => taffy::Dimension::Auto,
        Dimension::Pt(v) => taffy::Dimension::Length(v),
        Dimension::Percent(p) => taffy::Dimension::Percent(p / 100.0),
    }
}

fn is_blank_text(node: &StyledNode) -> bool {
    matches!(node, StyledNode::Text { text, .. } if text.trim().is_empty())
}

fn is_inline_level(node: &StyledNode) -> bool {
    match node {
        StyledNode::Text { .. } => true,
        StyledNode::Element { style, .. } => style.display.is_inline(),
    }
}

fn table_cells(row: &StyledNode) -> Vec<&StyledNode> {
    match row {
        StyledNode::Element { children, .. } => children
            .iter()
            .filter(|c| c.style().display == Display::TableCell)
            .filter(|c| matches!(c, StyledNode::Element { .. }))
            .collect(),
        StyledNode::Text { .. } => Vec::new(),
    }
}

fn image_src(attrs: &HashMap<String, String>) -> String {
    attrs.get("src").cloned().unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Image sizing
// ---------------------------------------------------------------------------

/// Used size of an image: explicit dimensions, else intrinsic size (aspect
/// preserved), then clamped by max-width / max-height.
fn image_size(style: &ComputedStyle, attrs: &HashMap<String, String>, container: f32) -> (f32, f32) {
    let intrinsic = attrs.get("src").and_then(|src| intrinsic_size(src));
    let known_w = style.width.resolve(container);
    let known_h = match style.height {
        Dimension::Pt(h) => Some(h),
        _ => None,
    };
    let (mut w, mut h) = match (known_w, known_h, intrinsic) {
        (Some(w), Some(h), _) => (w, h),
        (Some(w), None, Some((iw, ih))) => (w, w * ih / iw),
        (None, Some(h), Some((iw, ih))) => (h * iw / ih, h),
        (None, None, Some(size)) => size,
        (Some(w), None, None) => (w, 0.0),
        (None, Some(h), None) => (0.0, h),
        (None, None, None) => (0.0, 0.0),
    };
    if let Some(max_w) = style.max_width.resolve(container) {
        if w > max_w && w > 0.0 {
            h *= max_w / w;
            w = max_w;
        }
    }
    if let Dimension::Pt(max_h) = style.max_height {
        if h > max_h && h > 0.0 {
            w *= max_h / h;
            h = max_h;
        }
    }
    (w, h)
}

/// Pixel size of a data-URI image in points; `None` if it cannot be decoded.
fn intrinsic_size(src: &str) -> Option<(f32, f32)> {
    let bytes = parse_data_uri(src).ok()?;
    let img = ::image::load_from_memory(&bytes).ok()?;
    let (w, h) = (img.width() as f32, img.height() as f32);
    if w == 0.0 || h == 0.0 {
        return None;
    }
    Some((w * PX_TO_PT, h * PX_TO_PT))
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Lay out a styled tree inside a column starting at `x` of `width` points,
/// returning top-level boxes in document coordinates (y starts at 0).
pub fn compute_layout(
    styled_nodes: &[StyledNode],
    x: f32,
    width: f32,
    fonts: &FontManager,
) -> Result<Vec<PositionedBox>, String> {
    let mut builder = LayoutBuilder::new(fonts);
    let root_style: &ComputedStyle = &ComputedStyle::default();
    let child_ids = builder.build_flow(styled_nodes, root_style, width)?;

    let root_layout = taffy::Style {
        display: taffy::Display::Flex,
        flex_direction: taffy::FlexDirection::Column,
        size: Size {
            width: taffy::Dimension::Length(width),
            height: taffy::Dimension::Auto,
        },
        ..taffy::Style::default()
    };
    let root = builder
        .taffy
        .new_with_children(root_layout, &child_ids)
        .map_err(layout_err)?;

    let LayoutBuilder {
        taffy, inline, runs, ..
    } = &mut builder;
    taffy
        .compute_layout_with_measure(
            root,
            Size {
                width: AvailableSpace::Definite(width),
                height: AvailableSpace::MaxContent,
            },
            |known, available, _node, context, _style| {
                let Some(index) = context else {
                    return Size::ZERO;
                };
                let run = &runs[*index];
                let line_width = known.width.unwrap_or(match available.width {
                    AvailableSpace::Definite(w) => w,
                    AvailableSpace::MaxContent => UNBOUNDED,
                    AvailableSpace::MinContent => 0.0,
                });
                let set = inline.lines(&run.nodes, 0.0, 0.0, line_width, run.block);
                Size {
                    width: known.width.unwrap_or(set.widest),
                    height: known.height.unwrap_or(set.height),
                }
            },
        )
        .map_err(layout_err)?;

    let mut boxes = Vec::new();
    for child in builder.taffy.children(root).map_err(layout_err)? {
        builder.extract(child, x, 0.0, &mut boxes)?;
    }
    let bottom = boxes.last().map_or(0.0, |b| b.y + b.height);
    log::debug!("laid out {} top-level boxes, {bottom:.1}pt tall", boxes.len());
    Ok(boxes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_html;
    use crate::style::{build_styled_tree, Stylesheet};

    fn layout(html: &str, css: &str, width: f32) -> Vec<PositionedBox> {
        let dom = parse_html(html);
        let styled = build_styled_tree(&dom, &Stylesheet::parse(css));
        compute_layout(&styled, 0.0, width, &FontManager::new()).unwrap()
    }

    fn all_lines(boxes: &[PositionedBox]) -> Vec<String> {
        boxes.iter().flat_map(PositionedBox::lines).collect()
    }

    #[test]
    fn paragraphs_stack_vertically() {
        let boxes = layout("<p>One</p><p>Two</p>", "", 400.0);
        assert_eq!(boxes.len(), 2);
        assert!(boxes[1].y >= boxes[0].y + boxes[0].height - 0.01);
        assert_eq!(all_lines(&boxes), ["One", "Two"]);
    }

    #[test]
    fn margins_and_padding_offset_content() {
        let boxes = layout(
            r#"<div style="margin-top: 10pt; padding: 5pt">x</div>"#,
            "",
            400.0,
        );
        let block = &boxes[0];
        assert!((block.y - 10.0).abs() < 0.01);
        let line = &block.children[0];
        assert!((line.y - 15.0).abs() < 0.01);
        assert!((line.x - 5.0).abs() < 0.01);
        assert!((line.width - 390.0).abs() < 0.01);
    }

    #[test]
    fn inline_spans_share_a_line() {
        let boxes = layout(
            r#"<div>Page <span class="pageNumber">2</span> of <span>3</span></div>"#,
            "",
            400.0,
        );
        assert_eq!(all_lines(&boxes), ["Page 2 of 3"]);
    }

    #[test]
    fn long_text_wraps() {
        let text = "word ".repeat(60);
        let boxes = layout(&format!("<p>{text}</p>"), "p { font-size: 10pt }", 200.0);
        let lines = all_lines(&boxes);
        assert!(lines.len() > 3, "{lines:?}");
        assert!(lines.iter().all(|l| l.starts_with("word")));
        let p = &boxes[0];
        let last = p.children.last().unwrap();
        assert!((last.y + last.height - (p.y + p.height)).abs() < 0.01);
    }

    #[test]
    fn br_forces_a_new_line() {
        let boxes = layout("<div>a<br>b</div>", "", 400.0);
        assert_eq!(all_lines(&boxes), ["a", "b"]);
    }

    #[test]
    fn subscript_sits_below_baseline() {
        let boxes = layout("<p>V<sub>in</sub></p>", "", 400.0);
        let line = boxes[0].children[0].clone();
        let BoxContent::Line(fragments) = &line.content else {
            panic!("expected a line");
        };
        assert_eq!(fragments.len(), 2);
        assert_eq!(fragments[1].text, "in");
        assert!(fragments[1].baseline > fragments[0].baseline);
        assert!(fragments[1].font_size < fragments[0].font_size);
        assert!(fragments[1].x_offset > fragments[0].x_offset);
    }

    #[test]
    fn list_items_get_markers() {
        let boxes = layout("<ul><li>Alpha</li><li>Beta</li></ul><ol><li>x</li><li>y</li></ol>", "", 400.0);
        assert_eq!(all_lines(&boxes), ["\u{2022}Alpha", "\u{2022}Beta", "1.x", "2.y"]);
        let unstyled = layout(
            r#"<ul style="list-style: none"><li>Alpha</li></ul>"#,
            "",
            400.0,
        );
        assert_eq!(all_lines(&unstyled), ["Alpha"]);
    }

    #[test]
    fn table_columns_share_width() {
        let boxes = layout(
            "<table><thead><tr><th>A</th><th>B</th></tr></thead><tbody><tr><td>1</td><td>2</td></tr></tbody></table>",
            "",
            300.0,
        );
        let table = &boxes[0];
        assert_eq!(table.role, BoxRole::Table);
        assert_eq!(table.children.len(), 2);
        assert_eq!(table.children[0].role, BoxRole::TableHeader);
        let cells = &table.children[1].children;
        assert_eq!(cells.len(), 2);
        assert!((cells[1].x - 150.0).abs() < 0.01);
        assert!((cells[0].width - 150.0).abs() < 0.01);
    }

    #[test]
    fn short_rows_keep_column_positions() {
        let boxes = layout(
            r#"<table><tr><td style="width: 100pt">a</td><td>b</td><td>c</td></tr><tr><td>x</td><td>y</td></tr></table>"#,
            "",
            300.0,
        );
        let short = &boxes[0].children[1].children;
        assert_eq!(short.len(), 2);
        assert!((short[0].width - 100.0).abs() < 0.01);
        assert!((short[1].x - 100.0).abs() < 0.01);
        assert!((short[1].width - 100.0).abs() < 0.01);
    }

    #[test]
    fn cells_stretch_to_row_height() {
        let boxes = layout(
            "<table><tr><td>short</td><td>one two three four five six seven</td></tr></table>",
            "td { background: #e2e2e2 }",
            120.0,
        );
        let row = &boxes[0].children[0];
        assert!(row.height > 20.0);
        assert!(row.children.iter().all(|c| (c.height - row.height).abs() < 0.01));
        // The short cell's single line is centred vertically.
        let short_line = &row.children[0].children[0];
        assert!(short_line.y > row.y + 1.0);
    }

    #[test]
    fn flex_row_places_fixed_item_at_the_end() {
        let boxes = layout(
            r#"<div style="display: flex"><div>Title</div><div style="width: 80pt">Logo</div></div>"#,
            "",
            400.0,
        );
        let row = &boxes[0];
        assert!(row.atomic);
        assert_eq!(row.children.len(), 2);
        assert!((row.children[1].x - 320.0).abs() < 0.01);
        assert!((row.children[0].width - 320.0).abs() < 0.01);
    }

    #[test]
    fn images_use_explicit_size_and_max_bounds() {
        let mut attrs = HashMap::new();
        attrs.insert("src".to_string(), "not-a-data-uri".to_string());
        let style = ComputedStyle {
            width: Dimension::Pt(300.0),
            height: Dimension::Pt(150.0),
            max_width: Dimension::Pt(150.0),
            ..ComputedStyle::default()
        };
        assert_eq!(image_size(&style, &attrs, 500.0), (150.0, 75.0));
    }
}
