//! HTML parser – converts an HTML string into a simple DOM tree.
//!
//! Only the controlled subset produced by the data sheet templates is
//! understood:
//! - Document: html, head, title, meta, style, body
//! - Block: div, p, h1-h3, ul, ol, li, table, thead, tbody, tr, td, th
//! - Inline: span, sub, br, img
//!
//! Styling comes from `class` / `style` attributes and `<style>` sheets
//! (see [`crate::style`]).

use std::collections::HashMap;

/// The tag name of a supported element.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Tag {
    Html,
    Head,
    Title,
    Meta,
    Style,
    Body,
    Div,
    P,
    H1,
    H2,
    H3,
    Ul,
    Ol,
    Li,
    Table,
    Thead,
    Tbody,
    Tr,
    Td,
    Th,
    Span,
    Sub,
    Br,
    Img,
    /// Unknown tags are kept so their text survives; they lay out as divs.
    Unknown(String),
}

impl Tag {
    pub fn from_name(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "html" => Tag::Html,
            "head" => Tag::Head,
            "title" => Tag::Title,
            "meta" => Tag::Meta,
            "style" => Tag::Style,
            "body" => Tag::Body,
            "div" => Tag::Div,
            "p" => Tag::P,
            "h1" => Tag::H1,
            "h2" => Tag::H2,
            "h3" => Tag::H3,
            "ul" => Tag::Ul,
            "ol" => Tag::Ol,
            "li" => Tag::Li,
            "table" => Tag::Table,
            "thead" => Tag::Thead,
            "tbody" => Tag::Tbody,
            "tr" => Tag::Tr,
            "td" => Tag::Td,
            "th" => Tag::Th,
            "span" => Tag::Span,
            "sub" => Tag::Sub,
            "br" => Tag::Br,
            "img" => Tag::Img,
            other => Tag::Unknown(other.to_string()),
        }
    }

    /// Lower-case name as written in selectors.
    pub fn name(&self) -> &str {
        match self {
            Tag::Html => "html",
            Tag::Head => "head",
            Tag::Title => "title",
            Tag::Meta => "meta",
            Tag::Style => "style",
            Tag::Body => "body",
            Tag::Div => "div",
            Tag::P => "p",
            Tag::H1 => "h1",
            Tag::H2 => "h2",
            Tag::H3 => "h3",
            Tag::Ul => "ul",
            Tag::Ol => "ol",
            Tag::Li => "li",
            Tag::Table => "table",
            Tag::Thead => "thead",
            Tag::Tbody => "tbody",
            Tag::Tr => "tr",
            Tag::Td => "td",
            Tag::Th => "th",
            Tag::Span => "span",
            Tag::Sub => "sub",
            Tag::Br => "br",
            Tag::Img => "img",
            Tag::Unknown(name) => name,
        }
    }

    /// Elements without content or closing tag.
    fn is_void(&self) -> bool {
        matches!(self, Tag::Img | Tag::Br | Tag::Meta)
            || matches!(self, Tag::Unknown(n) if n == "link" || n == "hr")
    }

    /// Elements whose content is raw text up to the matching close tag.
    fn is_raw_text(&self) -> bool {
        matches!(self, Tag::Style | Tag::Title)
            || matches!(self, Tag::Unknown(n) if n == "script")
    }
}

/// A node in our DOM tree.
#[derive(Debug, Clone)]
pub enum DomNode {
    Element(ElementNode),
    Text(String),
}

/// An element node carrying tag, attributes, and children.
#[derive(Debug, Clone)]
pub struct ElementNode {
    pub tag: Tag,
    pub attributes: HashMap<String, String>,
    pub children: Vec<DomNode>,
}

impl ElementNode {
    pub fn new(tag: Tag) -> Self {
        Self {
            tag,
            attributes: HashMap::new(),
            children: Vec::new(),
        }
    }

    pub fn classes(&self) -> Vec<&str> {
        self.attributes
            .get("class")
            .map(|c| c.split_whitespace().collect())
            .unwrap_or_default()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().contains(&class)
    }

    pub fn inline_style(&self) -> Option<&str> {
        self.attributes.get("style").map(|s| s.as_str())
    }

    pub fn src(&self) -> Option<&str> {
        self.attributes.get("src").map(|s| s.as_str())
    }

    /// Concatenated text of all descendants.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(&self.children, &mut out);
        out
    }

    /// Child elements, skipping text nodes.
    pub fn element_children(&self) -> impl Iterator<Item = &ElementNode> {
        self.children.iter().filter_map(|c| match c {
            DomNode::Element(e) => Some(e),
            DomNode::Text(_) => None,
        })
    }
}

fn collect_text(nodes: &[DomNode], out: &mut String) {
    for node in nodes {
        match node {
            DomNode::Text(t) => out.push_str(t),
            DomNode::Element(e) => collect_text(&e.children, out),
        }
    }
}

// ---------------------------------------------------------------------------
// Parser – simple recursive descent over HTML
// ---------------------------------------------------------------------------

/// Parse an HTML string into a list of DOM nodes. Never fails; malformed
/// markup degrades to whatever structure could be recovered.
pub fn parse_html(html: &str) -> Vec<DomNode> {
    let mut parser = Parser::new(html);
    parser.parse_nodes()
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn parse_nodes(&mut self) -> Vec<DomNode> {
        let mut nodes = Vec::new();
        loop {
            self.skip_whitespace_preserve();
            if self.eof() || self.starts_with("</") {
                break;
            }
            if let Some(node) = self.parse_node() {
                nodes.push(node);
            }
        }
        nodes
    }

    fn parse_node(&mut self) -> Option<DomNode> {
        if self.starts_with("<!--") {
            self.skip_past("-->");
            return None;
        }
        if self.starts_with("<!") || self.starts_with("<?") {
            // doctype / processing instruction
            self.skip_past(">");
            return None;
        }
        let next_is_name = self.input[self.pos..]
            .chars()
            .nth(1)
            .is_some_and(|c| c.is_ascii_alphabetic());
        if self.starts_with("<") && next_is_name {
            Some(self.parse_element())
        } else {
            Some(self.parse_text())
        }
    }

    fn parse_text(&mut self) -> DomNode {
        let start = self.pos;
        // A stray '<' that does not open a tag is literal text.
        self.advance(1);
        while !self.eof() && !self.starts_with("<") {
            self.advance(1);
        }
        DomNode::Text(decode_entities(&self.input[start..self.pos]))
    }

    fn parse_element(&mut self) -> DomNode {
        self.advance(1); // '<'
        let tag_name = self.parse_name();
        let mut elem = ElementNode::new(Tag::from_name(&tag_name));

        loop {
            self.skip_whitespace();
            if self.eof() || self.starts_with(">") || self.starts_with("/>") {
                break;
            }
            let (key, value) = self.parse_attribute();
            if key.is_empty() {
                // Unparseable attribute junk; step over it.
                self.advance(1);
                continue;
            }
            elem.attributes.insert(key.to_ascii_lowercase(), value);
        }

        if self.starts_with("/>") {
            self.advance(2);
            return DomNode::Element(elem);
        }
        if self.starts_with(">") {
            self.advance(1);
        }
        if elem.tag.is_void() {
            return DomNode::Element(elem);
        }

        if elem.tag.is_raw_text() {
            let close = format!("</{}", elem.tag.name());
            let start = self.pos;
            let end = self.input[start..]
                .to_ascii_lowercase()
                .find(&close)
                .map(|i| start + i)
                .unwrap_or(self.input.len());
            elem.children
                .push(DomNode::Text(self.input[start..end].to_string()));
            self.pos = end;
        } else {
            elem.children = self.parse_nodes();
        }

        // Any closing tag closes the current element.
        if self.starts_with("</") {
            self.advance(2);
            self.parse_name();
            self.skip_past(">");
        }

        DomNode::Element(elem)
    }

    fn parse_name(&mut self) -> String {
        let start = self.pos;
        while !self.eof() {
            let c = self.current_char();
            if c.is_alphanumeric() || c == '-' || c == '_' || c == ':' {
                self.advance(1);
            } else {
                break;
            }
        }
        self.input[start..self.pos].to_string()
    }

    fn parse_attribute(&mut self) -> (String, String) {
        let key = self.parse_name();
        self.skip_whitespace();
        if !self.starts_with("=") {
            return (key, String::new());
        }
        self.advance(1);
        self.skip_whitespace();
        (key, self.parse_attr_value())
    }

    fn parse_attr_value(&mut self) -> String {
        for quote in ["\"", "'"] {
            if self.starts_with(quote) {
                self.advance(1);
                let start = self.pos;
                while !self.eof() && !self.starts_with(quote) {
                    self.advance(1);
                }
                let val = decode_entities(&self.input[start..self.pos]);
                if !self.eof() {
                    self.advance(1);
                }
                return val;
            }
        }
        let start = self.pos;
        while !self.eof() {
            let c = self.current_char();
            if c.is_whitespace() || c == '>' {
                break;
            }
            self.advance(1);
        }
        decode_entities(&self.input[start..self.pos])
    }

    fn skip_whitespace(&mut self) {
        while !self.eof() && self.current_char().is_whitespace() {
            self.advance(1);
        }
    }

    /// Skip whitespace-only runs between tags; keep it when it leads into text.
    fn skip_whitespace_preserve(&mut self) {
        let saved = self.pos;
        self.skip_whitespace();
        if !self.eof() && !self.starts_with("<") {
            self.pos = saved;
        }
    }

    fn skip_past(&mut self, marker: &str) {
        match self.input[self.pos..].find(marker) {
            Some(i) => self.pos += i + marker.len(),
            None => self.pos = self.input.len(),
        }
    }

    fn starts_with(&self, s: &str) -> bool {
        self.input[self.pos..].starts_with(s)
    }

    fn eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn current_char(&self) -> char {
        self.input[self.pos..].chars().next().unwrap_or('\0')
    }

    fn advance(&mut self, n: usize) {
        for _ in 0..n {
            if let Some(c) = self.input[self.pos..].chars().next() {
                self.pos += c.len_utf8();
            }
        }
    }
}

/// Decode the named entities our escaper emits plus numeric references.
pub fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest
            .find(';')
            .filter(|&semi| semi <= 10)
            .and_then(|semi| decode_entity(&rest[1..semi]).map(|c| (c, semi)));
        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &rest[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{00A0}'),
        _ => {
            let num = name.strip_prefix('#')?;
            let code = match num.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => num.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}

// ---------------------------------------------------------------------------
// Convenience helpers
// ---------------------------------------------------------------------------

/// Find the `<body>` element and return its children, or return all nodes if
/// no `<body>` is present.
pub fn body_children(nodes: &[DomNode]) -> Vec<DomNode> {
    for node in nodes {
        if let DomNode::Element(e) = node {
            if e.tag == Tag::Body {
                return e.children.clone();
            }
            if e.tag == Tag::Html {
                let inner = body_children(&e.children);
                if !inner.is_empty() {
                    return inner;
                }
            }
        }
    }
    nodes
        .iter()
        .filter(|n| !matches!(n, DomNode::Element(e) if e.tag == Tag::Head || e.tag == Tag::Style))
        .cloned()
        .collect()
}

/// The `<body>` element itself (so its own styles apply), or the loose
/// top-level content of a fragment.
pub fn body_root(nodes: &[DomNode]) -> Vec<DomNode> {
    fn find(nodes: &[DomNode]) -> Option<&ElementNode> {
        nodes.iter().find_map(|node| match node {
            DomNode::Element(e) if e.tag == Tag::Body => Some(e),
            DomNode::Element(e) if e.tag == Tag::Html => find(&e.children),
            _ => None,
        })
    }
    match find(nodes) {
        Some(body) => vec![DomNode::Element(body.clone())],
        None => body_children(nodes),
    }
}

/// Concatenated contents of every `<style>` element, in document order.
pub fn stylesheet_text(nodes: &[DomNode]) -> String {
    let mut css = String::new();
    for node in nodes {
        if let DomNode::Element(e) = node {
            if e.tag == Tag::Style {
                css.push_str(&e.text_content());
                css.push('\n');
            } else {
                css.push_str(&stylesheet_text(&e.children));
            }
        }
    }
    css
}

/// Text of the first `<title>` element.
pub fn document_title(nodes: &[DomNode]) -> Option<String> {
    nodes.iter().find_map(|node| match node {
        DomNode::Element(e) if e.tag == Tag::Title => Some(decode_entities(e.text_content().trim())),
        DomNode::Element(e) => document_title(&e.children),
        DomNode::Text(_) => None,
    })
}

/// Every element carrying `class`, in document order.
pub fn elements_with_class<'a>(nodes: &'a [DomNode], class: &str) -> Vec<&'a ElementNode> {
    let mut found = Vec::new();
    walk_class(nodes, class, &mut found);
    found
}

fn walk_class<'a>(nodes: &'a [DomNode], class: &str, found: &mut Vec<&'a ElementNode>) {
    for node in nodes {
        if let DomNode::Element(e) = node {
            if e.has_class(class) {
                found.push(e);
            }
            walk_class(&e.children, class, found);
        }
    }
}

/// Replace the children of every element carrying `class` with `text`.
pub fn replace_class_text(nodes: &mut [DomNode], class: &str, text: &str) {
    for node in nodes {
        if let DomNode::Element(e) = node {
            if e.has_class(class) {
                e.children = vec![DomNode::Text(text.to_string())];
            } else {
                replace_class_text(&mut e.children, class, text);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first_element(nodes: &[DomNode]) -> &ElementNode {
        match &nodes[0] {
            DomNode::Element(e) => e,
            DomNode::Text(t) => panic!("expected element, got text {t:?}"),
        }
    }

    #[test]
    fn parse_simple_div() {
        let nodes = parse_html(r#"<div class="content-section shaded"><p>Hello</p></div>"#);
        assert_eq!(nodes.len(), 1);
        let e = first_element(&nodes);
        assert_eq!(e.tag, Tag::Div);
        assert_eq!(e.classes(), vec!["content-section", "shaded"]);
        assert!(e.has_class("shaded"));
        assert_eq!(e.children.len(), 1);
    }

    #[test]
    fn parse_void_elements() {
        let nodes = parse_html(r#"<p>a<br>b<img src="data:x" alt="Logo">c</p>"#);
        let p = first_element(&nodes);
        assert_eq!(p.children.len(), 5);
        assert_eq!(p.text_content(), "abc");
    }

    #[test]
    fn parse_subscript() {
        let nodes = parse_html("<li>V<sub>in</sub> max</li>");
        let li = first_element(&nodes);
        let sub = li.element_children().next().unwrap();
        assert_eq!(sub.tag, Tag::Sub);
        assert_eq!(li.text_content(), "Vin max");
    }

    #[test]
    fn style_contents_are_raw_text() {
        let html = "<html><head><style>td > p { color: #fff }</style><title>A &amp; B</title></head><body><p>x</p></body></html>";
        let nodes = parse_html(html);
        assert!(stylesheet_text(&nodes).contains("td > p"));
        assert_eq!(document_title(&nodes).as_deref(), Some("A & B"));
        let body = body_children(&nodes);
        assert_eq!(body.len(), 1);
    }

    #[test]
    fn entities_decode() {
        assert_eq!(decode_entities("&lt;b&gt; &amp;amp; &#39;x&#x27;"), "<b> &amp; 'x'");
        assert_eq!(decode_entities("AT&T"), "AT&T");
        assert_eq!(decode_entities("a & b; c"), "a & b; c");
    }

    #[test]
    fn parse_table_groups() {
        let html = "<table class=\"zebra\"><thead><tr><th>A</th></tr></thead><tbody><tr><td>1</td></tr><tr><td>2</td></tr></tbody></table>";
        let nodes = parse_html(html);
        let table = first_element(&nodes);
        let groups: Vec<_> = table.element_children().map(|e| e.tag.clone()).collect();
        assert_eq!(groups, vec![Tag::Thead, Tag::Tbody]);
    }

    #[test]
    fn class_text_replacement() {
        let mut nodes =
            parse_html(r#"<div>Page <span class="pageNumber"></span> of <span class="totalPages"></span></div>"#);
        replace_class_text(&mut nodes, "pageNumber", "2");
        replace_class_text(&mut nodes, "totalPages", "3");
        assert_eq!(first_element(&nodes).text_content(), "Page 2 of 3");
        assert_eq!(elements_with_class(&nodes, "pageNumber").len(), 1);
    }

    #[test]
    fn stray_angle_bracket_is_text() {
        let nodes = parse_html("<p>a < b</p>");
        assert_eq!(first_element(&nodes).text_content(), "a < b");
    }
}
