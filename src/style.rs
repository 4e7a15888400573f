//! Style resolver – applies embedded `<style>` sheets and inline `style`
//! attributes to produce a flat [`ComputedStyle`] per element.
//!
//! Cascade order: inherited text properties, tag defaults, stylesheet rules
//! (by specificity, then source order), inline declarations. All lengths are
//! resolved to points.

use std::collections::HashMap;

use crate::dom::{DomNode, ElementNode, Tag};

/// Fully resolved style for a single element.
#[derive(Debug, Clone)]
pub struct ComputedStyle {
    // Display / layout
    pub display: Display,
    pub flex_direction: FlexDirection,
    pub justify_content: JustifyContent,
    pub align_items: AlignItems,
    pub gap: f32,

    // Sizing
    pub width: Dimension,
    pub height: Dimension,
    pub max_width: Dimension,
    pub max_height: Dimension,

    // Spacing (pt)
    pub margin_top: f32,
    pub margin_right: f32,
    pub margin_bottom: f32,
    pub margin_left: f32,
    pub padding_top: f32,
    pub padding_right: f32,
    pub padding_bottom: f32,
    pub padding_left: f32,

    // Horizontal rules; side borders are not drawn.
    pub border_top: Border,
    pub border_bottom: Border,

    // Typography (inherited)
    pub font_size: f32,
    pub font_weight: FontWeight,
    pub color: Color,
    pub text_align: TextAlign,
    pub line_height: f32,
    pub list_style: ListStyle,

    pub vertical_align: VerticalAlign,
    pub background_color: Color,

    // Page break
    pub page_break_before: bool,
    pub page_break_inside_avoid: bool,
}

impl Default for ComputedStyle {
    fn default() -> Self {
        Self {
            display: Display::Block,
            flex_direction: FlexDirection::Row,
            justify_content: JustifyContent::Start,
            align_items: AlignItems::Stretch,
            gap: 0.0,
            width: Dimension::Auto,
            height: Dimension::Auto,
            max_width: Dimension::Auto,
            max_height: Dimension::Auto,
            margin_top: 0.0,
            margin_right: 0.0,
            margin_bottom: 0.0,
            margin_left: 0.0,
            padding_top: 0.0,
            padding_right: 0.0,
            padding_bottom: 0.0,
            padding_left: 0.0,
            border_top: Border::NONE,
            border_bottom: Border::NONE,
            font_size: 12.0,
            font_weight: FontWeight::Normal,
            color: Color::BLACK,
            text_align: TextAlign::Left,
            line_height: 1.2,
            list_style: ListStyle::Disc,
            vertical_align: VerticalAlign::Baseline,
            background_color: Color::TRANSPARENT,
            page_break_before: false,
            page_break_inside_avoid: false,
        }
    }
}

impl ComputedStyle {
    /// A fresh style carrying only the inherited properties of `parent`.
    pub fn inherit_from(parent: &ComputedStyle) -> Self {
        Self {
            font_size: parent.font_size,
            font_weight: parent.font_weight,
            color: parent.color,
            text_align: parent.text_align,
            line_height: parent.line_height,
            list_style: parent.list_style,
            ..Self::default()
        }
    }

    pub fn is_bold(&self) -> bool {
        self.font_weight == FontWeight::Bold
    }

    /// Line box height in points.
    pub fn line_height_pt(&self) -> f32 {
        self.font_size * self.line_height
    }
}

// ---------------------------------------------------------------------------
// Supporting enums
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Display {
    Block,
    Flex,
    Inline,
    InlineBlock,
    ListItem,
    Table,
    TableRowGroup,
    TableRow,
    TableCell,
    None,
}

impl Display {
    pub fn is_inline(self) -> bool {
        matches!(self, Display::Inline | Display::InlineBlock)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlexDirection {
    Row,
    Column,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JustifyContent {
    Start,
    End,
    Center,
    SpaceBetween,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignItems {
    Start,
    End,
    Center,
    Stretch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontWeight {
    Normal,
    Bold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerticalAlign {
    Baseline,
    Sub,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListStyle {
    Disc,
    Decimal,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Dimension {
    Auto,
    Pt(f32),
    Percent(f32),
}

impl Dimension {
    /// Resolve against the containing block's width.
    pub fn resolve(self, container: f32) -> Option<f32> {
        match self {
            Dimension::Auto => None,
            Dimension::Pt(v) => Some(v),
            Dimension::Percent(p) => Some(container * p / 100.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Border {
    pub width: f32,
    pub color: Color,
}

impl Border {
    pub const NONE: Self = Self {
        width: 0.0,
        color: Color::BLACK,
    };

    pub fn is_visible(&self) -> bool {
        self.width > 0.0 && !self.color.is_transparent()
    }
}

/// RGBA colour (0.0 – 1.0).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const BLACK: Self = Self::opaque(0.0, 0.0, 0.0);
    pub const WHITE: Self = Self::opaque(1.0, 1.0, 1.0);
    pub const TRANSPARENT: Self = Self {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 0.0,
    };

    const fn opaque(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub fn is_transparent(&self) -> bool {
        self.a < 0.001
    }

    pub fn rgb(&self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }

    /// `#rgb`, `#rrggbb`, `rgb(r, g, b)` or a handful of names.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim().to_ascii_lowercase();
        if value.starts_with('#') {
            let [r, g, b] = crate::paint::hex(&value)?;
            return Some(Self::opaque(r, g, b));
        }
        if let Some(args) = value
            .strip_prefix("rgb(")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            let channels: Vec<f32> = args
                .split(',')
                .filter_map(|c| c.trim().parse::<f32>().ok())
                .collect();
            if let [r, g, b] = channels[..] {
                return Some(Self::opaque(r / 255.0, g / 255.0, b / 255.0));
            }
            return None;
        }
        match value.as_str() {
            "black" => Some(Self::BLACK),
            "white" => Some(Self::WHITE),
            "transparent" => Some(Self::TRANSPARENT),
            "red" => Some(Self::opaque(1.0, 0.0, 0.0)),
            "gray" | "grey" => Some(Self::opaque(0.5, 0.5, 0.5)),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Stylesheets
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

/// `tag.class.class`; `None` tag matches any element.
#[derive(Debug, Clone, PartialEq)]
struct Compound {
    tag: Option<String>,
    classes: Vec<String>,
}

impl Compound {
    fn parse(text: &str) -> Option<Self> {
        let mut parts = text.split('.');
        let tag = match parts.next()? {
            "" | "*" => None,
            t if t.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') => {
                Some(t.to_ascii_lowercase())
            }
            _ => return None,
        };
        let classes: Vec<String> = parts.map(str::to_string).collect();
        if classes.iter().any(String::is_empty) {
            return None;
        }
        Some(Self { tag, classes })
    }

    fn matches(&self, element: &ElementNode) -> bool {
        if let Some(tag) = &self.tag {
            if tag != element.tag.name() {
                return false;
            }
        }
        let have = element.classes();
        self.classes.iter().all(|c| have.contains(&c.as_str()))
    }
}

/// A compound chain; the last compound is the subject.
#[derive(Debug, Clone, PartialEq)]
struct Selector {
    subject: Compound,
    /// Ancestor requirements, nearest first.
    ancestors: Vec<(Combinator, Compound)>,
}

impl Selector {
    fn parse(text: &str) -> Option<Self> {
        let spaced = text.replace('>', " > ");
        let mut compounds: Vec<Compound> = Vec::new();
        let mut combinators: Vec<Combinator> = Vec::new();
        let mut pending = Combinator::Descendant;
        for token in spaced.split_whitespace() {
            if token == ">" {
                pending = Combinator::Child;
                continue;
            }
            if !compounds.is_empty() {
                combinators.push(pending);
            }
            compounds.push(Compound::parse(token)?);
            pending = Combinator::Descendant;
        }
        let subject = compounds.pop()?;
        let ancestors = compounds
            .into_iter()
            .zip(combinators)
            .rev()
            .map(|(compound, comb)| (comb, compound))
            .collect();
        Some(Self { subject, ancestors })
    }

    /// (class count, tag count)
    fn specificity(&self) -> (usize, usize) {
        std::iter::once(&self.subject)
            .chain(self.ancestors.iter().map(|(_, c)| c))
            .fold((0, 0), |(classes, tags), c| {
                (classes + c.classes.len(), tags + usize::from(c.tag.is_some()))
            })
    }

    /// `ancestors` runs root first, parent last.
    fn matches(&self, element: &ElementNode, ancestors: &[&ElementNode]) -> bool {
        if !self.subject.matches(element) {
            return false;
        }
        let mut remaining = ancestors;
        for (combinator, compound) in &self.ancestors {
            match combinator {
                Combinator::Child => match remaining.split_last() {
                    Some((parent, rest)) if compound.matches(parent) => remaining = rest,
                    _ => return false,
                },
                Combinator::Descendant => {
                    match remaining.iter().rposition(|a| compound.matches(a)) {
                        Some(i) => remaining = &remaining[..i],
                        None => return false,
                    }
                }
            }
        }
        true
    }
}

#[derive(Debug, Clone)]
struct Rule {
    selector: Selector,
    declarations: Vec<(String, String)>,
    order: usize,
}

/// Parsed `<style>` rules. At-rules and unsupported selectors are skipped.
#[derive(Debug, Clone, Default)]
pub struct Stylesheet {
    rules: Vec<Rule>,
}

impl Stylesheet {
    pub fn parse(css: &str) -> Self {
        let css = strip_comments(css);
        let mut rules = Vec::new();
        let mut rest = css.as_str();
        while let Some(open) = rest.find('{') {
            let prelude = rest[..open].trim();
            let Some(close) = rest[open..].find('}').map(|i| open + i) else {
                break;
            };
            let body = &rest[open + 1..close];
            rest = &rest[close + 1..];

            if prelude.starts_with('@') {
                // Nested at-rule blocks (`@media`) would leave a dangling
                // brace; drop it.
                if body.contains('{') {
                    rest = rest.trim_start().strip_prefix('}').unwrap_or(rest);
                }
                continue;
            }
            let declarations = parse_declarations(body);
            for text in prelude.split(',') {
                match Selector::parse(text) {
                    Some(selector) => rules.push(Rule {
                        selector,
                        declarations: declarations.clone(),
                        order: rules.len(),
                    }),
                    None => log::debug!("unsupported selector {:?} skipped", text.trim()),
                }
            }
        }
        Self { rules }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Declarations that apply to `element`, in cascade order.
    fn matching(&self, element: &ElementNode, ancestors: &[&ElementNode]) -> Vec<&(String, String)> {
        let mut matched: Vec<&Rule> = self
            .rules
            .iter()
            .filter(|r| r.selector.matches(element, ancestors))
            .collect();
        matched.sort_by_key(|r| (r.selector.specificity(), r.order));
        matched.iter().flat_map(|r| r.declarations.iter()).collect()
    }
}

fn strip_comments(css: &str) -> String {
    let mut out = String::with_capacity(css.len());
    let mut rest = css;
    while let Some(start) = rest.find("/*") {
        out.push_str(&rest[..start]);
        rest = match rest[start + 2..].find("*/") {
            Some(end) => &rest[start + 2 + end + 2..],
            None => "",
        };
    }
    out.push_str(rest);
    out
}

fn parse_declarations(body: &str) -> Vec<(String, String)> {
    body.split(';')
        .filter_map(|decl| {
            let (prop, val) = decl.split_once(':')?;
            let prop = prop.trim().to_ascii_lowercase();
            let val = val.trim().trim_end_matches("!important").trim();
            (!prop.is_empty() && !val.is_empty()).then(|| (prop, val.to_string()))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Style resolution
// ---------------------------------------------------------------------------

/// Resolve the style for an element.
pub fn resolve_style(
    element: &ElementNode,
    ancestors: &[&ElementNode],
    parent: Option<&ComputedStyle>,
    sheet: &Stylesheet,
) -> ComputedStyle {
    let mut style = parent.map(ComputedStyle::inherit_from).unwrap_or_default();
    apply_tag_defaults(&mut style, &element.tag);

    for (prop, val) in sheet.matching(element, ancestors) {
        apply_css_property(&mut style, prop, val);
    }
    if let Some(inline) = element.inline_style() {
        for (prop, val) in parse_declarations(inline) {
            apply_css_property(&mut style, &prop, &val);
        }
    }
    style
}

/// User-agent defaults, in points.
fn apply_tag_defaults(s: &mut ComputedStyle, tag: &Tag) {
    match tag {
        Tag::H1 | Tag::H2 | Tag::H3 => {
            s.font_size = match tag {
                Tag::H1 => 24.0,
                Tag::H2 => 18.0,
                _ => 14.0,
            };
            s.font_weight = FontWeight::Bold;
            s.margin_bottom = s.font_size * 0.5;
        }
        Tag::P => s.margin_bottom = 6.0,
        Tag::Ul | Tag::Ol => {
            s.padding_left = 18.0;
            s.margin_bottom = 6.0;
            s.list_style = if *tag == Tag::Ol {
                ListStyle::Decimal
            } else {
                ListStyle::Disc
            };
        }
        Tag::Li => s.display = Display::ListItem,
        Tag::Table => s.display = Display::Table,
        Tag::Thead | Tag::Tbody => s.display = Display::TableRowGroup,
        Tag::Tr => s.display = Display::TableRow,
        Tag::Td | Tag::Th => {
            s.display = Display::TableCell;
            s.padding_top = 1.0;
            s.padding_right = 1.0;
            s.padding_bottom = 1.0;
            s.padding_left = 1.0;
            if *tag == Tag::Th {
                s.font_weight = FontWeight::Bold;
                s.text_align = TextAlign::Center;
            }
        }
        Tag::Span | Tag::Br => s.display = Display::Inline,
        Tag::Sub => {
            s.display = Display::Inline;
            s.vertical_align = VerticalAlign::Sub;
            s.font_size *= 0.83;
        }
        Tag::Img => s.display = Display::InlineBlock,
        Tag::Head | Tag::Title | Tag::Meta | Tag::Style => s.display = Display::None,
        Tag::Html | Tag::Body | Tag::Div | Tag::Unknown(_) => {}
    }
}

fn apply_css_property(s: &mut ComputedStyle, prop: &str, val: &str) {
    let em = s.font_size;
    let length = |v: &str| parse_length(v, em);
    match prop {
        "display" => {
            s.display = match val {
                "block" => Display::Block,
                "flex" => Display::Flex,
                "inline" => Display::Inline,
                "inline-block" => Display::InlineBlock,
                "list-item" => Display::ListItem,
                "table" => Display::Table,
                "table-row-group" | "table-header-group" => Display::TableRowGroup,
                "table-row" => Display::TableRow,
                "table-cell" => Display::TableCell,
                "none" => Display::None,
                _ => s.display,
            }
        }
        "flex-direction" => {
            s.flex_direction = match val {
                "column" => FlexDirection::Column,
                _ => FlexDirection::Row,
            }
        }
        "justify-content" => {
            s.justify_content = match val {
                "flex-end" | "end" | "right" => JustifyContent::End,
                "center" => JustifyContent::Center,
                "space-between" => JustifyContent::SpaceBetween,
                _ => JustifyContent::Start,
            }
        }
        "align-items" => {
            s.align_items = match val {
                "flex-start" | "start" => AlignItems::Start,
                "flex-end" | "end" => AlignItems::End,
                "center" => AlignItems::Center,
                _ => AlignItems::Stretch,
            }
        }
        "gap" | "column-gap" => {
            if let Some(v) = length(val) {
                s.gap = v;
            }
        }
        "font-size" => {
            if let Some(pct) = val.strip_suffix('%').and_then(|p| p.trim().parse::<f32>().ok()) {
                s.font_size = em * pct / 100.0;
            } else if let Some(v) = length(val) {
                s.font_size = v;
            }
        }
        "font-weight" => {
            s.font_weight = match val {
                "bold" | "bolder" | "600" | "700" | "800" | "900" => FontWeight::Bold,
                _ => FontWeight::Normal,
            }
        }
        "color" => {
            if let Some(c) = Color::parse(val) {
                s.color = c;
            }
        }
        "background-color" | "background" => {
            if let Some(c) = Color::parse(val) {
                s.background_color = c;
            }
        }
        "text-align" => {
            s.text_align = match val {
                "center" => TextAlign::Center,
                "right" | "end" => TextAlign::Right,
                _ => TextAlign::Left,
            }
        }
        "line-height" => {
            if val == "normal" {
                s.line_height = 1.2;
            } else if let Ok(v) = val.parse::<f32>() {
                s.line_height = v;
            } else if let Some(v) = length(val) {
                if em > 0.0 {
                    s.line_height = v / em;
                }
            }
        }
        "vertical-align" => {
            s.vertical_align = match val {
                "sub" => VerticalAlign::Sub,
                _ => VerticalAlign::Baseline,
            }
        }
        "list-style" | "list-style-type" => {
            s.list_style = match val.split_whitespace().next().unwrap_or("") {
                "none" => ListStyle::None,
                "decimal" => ListStyle::Decimal,
                _ => ListStyle::Disc,
            }
        }
        "width" => s.width = parse_dimension(val, em),
        "height" => s.height = parse_dimension(val, em),
        "max-width" => s.max_width = parse_dimension(val, em),
        "max-height" => s.max_height = parse_dimension(val, em),
        "margin" => {
            if let Some([t, r, b, l]) = parse_box_shorthand(val, em) {
                (s.margin_top, s.margin_right, s.margin_bottom, s.margin_left) = (t, r, b, l);
            }
        }
        "margin-top" => s.margin_top = length(val).unwrap_or(s.margin_top),
        "margin-right" => s.margin_right = length(val).unwrap_or(s.margin_right),
        "margin-bottom" => s.margin_bottom = length(val).unwrap_or(s.margin_bottom),
        "margin-left" => s.margin_left = length(val).unwrap_or(s.margin_left),
        "padding" => {
            if let Some([t, r, b, l]) = parse_box_shorthand(val, em) {
                (s.padding_top, s.padding_right, s.padding_bottom, s.padding_left) = (t, r, b, l);
            }
        }
        "padding-top" => s.padding_top = length(val).unwrap_or(s.padding_top),
        "padding-right" => s.padding_right = length(val).unwrap_or(s.padding_right),
        "padding-bottom" => s.padding_bottom = length(val).unwrap_or(s.padding_bottom),
        "padding-left" => s.padding_left = length(val).unwrap_or(s.padding_left),
        "border" => {
            let border = parse_border(val, em);
            s.border_top = border;
            s.border_bottom = border;
        }
        "border-top" => s.border_top = parse_border(val, em),
        "border-bottom" => s.border_bottom = parse_border(val, em),
        "border-width" => {
            if let Some(v) = length(val) {
                s.border_top.width = v;
                s.border_bottom.width = v;
            }
        }
        "border-color" => {
            if let Some(c) = Color::parse(val) {
                s.border_top.color = c;
                s.border_bottom.color = c;
            }
        }
        "page-break-before" | "break-before" => {
            s.page_break_before = matches!(val, "always" | "page");
        }
        "page-break-inside" | "break-inside" => {
            s.page_break_inside_avoid = val == "avoid";
        }
        _ => {}
    }
}

/// A CSS length in points. Unitless zero is accepted; `px` follows the
/// 96 dpi reference pixel.
pub fn parse_length(value: &str, em: f32) -> Option<f32> {
    let value = value.trim();
    let (number, factor) = if let Some(n) = value.strip_suffix("pt") {
        (n, 1.0)
    } else if let Some(n) = value.strip_suffix("px") {
        (n, 0.75)
    } else if let Some(n) = value.strip_suffix("mm") {
        (n, 72.0 / 25.4)
    } else if let Some(n) = value.strip_suffix("cm") {
        (n, 72.0 / 2.54)
    } else if let Some(n) = value.strip_suffix("in") {
        (n, 72.0)
    } else if let Some(n) = value.strip_suffix("em") {
        (n.trim_end_matches('r'), em)
    } else if value == "0" {
        ("0", 1.0)
    } else {
        return None;
    };
    number.trim().parse::<f32>().ok().map(|n| n * factor)
}

fn parse_dimension(value: &str, em: f32) -> Dimension {
    let value = value.trim();
    if let Some(pct) = value.strip_suffix('%') {
        return pct
            .trim()
            .parse()
            .map(Dimension::Percent)
            .unwrap_or(Dimension::Auto);
    }
    parse_length(value, em)
        .map(Dimension::Pt)
        .unwrap_or(Dimension::Auto)
}

/// 1–4 value margin/padding shorthand; `auto` counts as zero.
fn parse_box_shorthand(value: &str, em: f32) -> Option<[f32; 4]> {
    let parts: Vec<f32> = value
        .split_whitespace()
        .map(|p| if p == "auto" { Some(0.0) } else { parse_length(p, em) })
        .collect::<Option<_>>()?;
    match parts[..] {
        [a] => Some([a, a, a, a]),
        [v, h] => Some([v, h, v, h]),
        [t, h, b] => Some([t, h, b, h]),
        [t, r, b, l] => Some([t, r, b, l]),
        _ => None,
    }
}

/// `<width> <style> <color>` in any order; `none` hides the edge.
fn parse_border(value: &str, em: f32) -> Border {
    let mut border = Border {
        width: 1.0,
        color: Color::BLACK,
    };
    for part in value.split_whitespace() {
        match part {
            "none" | "hidden" => return Border::NONE,
            "thin" => border.width = 0.75,
            "medium" => border.width = 2.25,
            "thick" => border.width = 3.75,
            "solid" | "dashed" | "dotted" | "double" => {}
            other => {
                if let Some(w) = parse_length(other, em) {
                    border.width = w;
                } else if let Some(c) = Color::parse(other) {
                    border.color = c;
                }
            }
        }
    }
    border
}

// ---------------------------------------------------------------------------
// Styled DOM tree
// ---------------------------------------------------------------------------

/// A DOM node annotated with its computed style.
#[derive(Debug, Clone)]
pub enum StyledNode {
    Element {
        tag: Tag,
        style: ComputedStyle,
        children: Vec<StyledNode>,
        /// Original attributes (image sources, alt text).
        attrs: HashMap<String, String>,
    },
    Text {
        text: String,
        style: ComputedStyle,
    },
}

impl StyledNode {
    pub fn style(&self) -> &ComputedStyle {
        match self {
            StyledNode::Element { style, .. } | StyledNode::Text { style, .. } => style,
        }
    }
}

/// Build a styled tree from a DOM tree, resolving styles top-down.
/// `display: none` subtrees are dropped; whitespace-only text collapses to
/// a single space.
pub fn build_styled_tree(nodes: &[DomNode], sheet: &Stylesheet) -> Vec<StyledNode> {
    let root = ComputedStyle::default();
    styled_children(nodes, &root, &mut Vec::new(), sheet)
}

fn styled_children<'a>(
    nodes: &'a [DomNode],
    parent_style: &ComputedStyle,
    ancestors: &mut Vec<&'a ElementNode>,
    sheet: &Stylesheet,
) -> Vec<StyledNode> {
    let mut result = Vec::new();
    for node in nodes {
        match node {
            DomNode::Element(e) => {
                let style = resolve_style(e, ancestors, Some(parent_style), sheet);
                if style.display == Display::None {
                    continue;
                }
                ancestors.push(e);
                let children = styled_children(&e.children, &style, ancestors, sheet);
                ancestors.pop();
                result.push(StyledNode::Element {
                    tag: e.tag.clone(),
                    style,
                    children,
                    attrs: e.attributes.clone(),
                });
            }
            DomNode::Text(text) => {
                if text.is_empty() {
                    continue;
                }
                let mut style = ComputedStyle::inherit_from(parent_style);
                style.vertical_align = parent_style.vertical_align;
                let text = if text.trim().is_empty() {
                    " ".to_string()
                } else {
                    text.clone()
                };
                result.push(StyledNode::Text { text, style });
            }
        }
    }
    result
}
