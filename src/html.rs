//! HTML/print renderer – fills the data sheet templates and has a print
//! engine turn the markup into PDF bytes.

use std::fmt;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::assets::AssetResolver;
use crate::content::{SectionBody, SheetView, ZebraTable};
use crate::engine::{LayoutEngine, PrintEngine, PrintOptions, SessionGuard};
use crate::error::{ensure_pdf, Result};
use crate::model::ParsedDocument;
use crate::paint::png_data_uri;
use crate::pipeline::{DatasheetConfig, Renderer};
use crate::templates::{datasheet_template, fill, footer_template};

/// `word_token` → `word<sub>token</sub>`.
static SUBSCRIPT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([\p{L}\p{N}]+)_([\p{L}\p{N}]+)").expect("valid subscript regex"));

const LOGO_PLACEHOLDER_HTML: &str = r#"<span style="font-size: 10pt;">[Logo placeholder]</span>"#;

/// Shown in the header when the document has no product name.
pub const PRODUCT_NAME_FALLBACK: &str = "Product Name";

/// A filled document and the options to print it with.
#[derive(Debug, Clone, PartialEq)]
pub struct PrintJob {
    pub html: String,
    pub options: PrintOptions,
}

/// Renders by printing HTML. Every call acquires its own print session and
/// closes it before returning.
#[derive(Clone)]
pub struct HtmlPrintRenderer {
    config: DatasheetConfig,
    engine: Arc<dyn PrintEngine>,
}

impl fmt::Debug for HtmlPrintRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HtmlPrintRenderer")
            .field("config", &self.config)
            .field("engine", &self.engine.name())
            .finish()
    }
}

impl Default for HtmlPrintRenderer {
    fn default() -> Self {
        Self::new(DatasheetConfig::default())
    }
}

impl HtmlPrintRenderer {
    /// Print with the in-process layout engine.
    pub fn new(config: DatasheetConfig) -> Self {
        Self::with_engine(config, Arc::new(LayoutEngine::new()))
    }

    pub fn with_engine(config: DatasheetConfig, engine: Arc<dyn PrintEngine>) -> Self {
        Self { config, engine }
    }

    pub fn engine_name(&self) -> &str {
        self.engine.name()
    }

    /// Fill the templates for `document`.
    pub fn build_markup(&self, document: &ParsedDocument, assets: &AssetResolver) -> PrintJob {
        let view = SheetView::from_document(document);

        let logo = match assets.find_logo().and_then(|p| inline_png(assets, &p)) {
            Some(uri) => format!(r#"<img src="{uri}" class="logo" alt="Logo">"#),
            None => LOGO_PLACEHOLDER_HTML.to_string(),
        };
        let product_image = assets
            .find_product_image(&document.header)
            .and_then(|p| inline_png(assets, &p))
            .map(|uri| {
                format!(
                    r#"<div class="product-image-container"><img src="{uri}" class="product-image" alt="Product"></div>"#
                )
            })
            .unwrap_or_default();

        let product_name = if view.header.is_empty() {
            PRODUCT_NAME_FALLBACK
        } else {
            view.header.as_str()
        };
        let name_html = text(product_name);
        let title = text(&view.title);
        let code = text(&view.code);
        let power_supply = text(&view.power_supply);
        let sections = sections_html(&view);

        let body = fill(
            datasheet_template(),
            &[
                ("productName", &name_html),
                ("logoImage", &logo),
                ("title", &title),
                ("code", &code),
                ("powerSupply", &power_supply),
                ("productImage", &product_image),
                ("sectionsHtml", &sections),
            ],
        );

        let footer_text = text(&view.footer);
        let version_date = self.config.version_date();
        let disclaimer = text(&self.config.disclaimer);
        let footer = fill(
            footer_template(),
            &[
                ("footerText", &footer_text),
                ("versionDate", &version_date),
                ("disclaimer", &disclaimer),
            ],
        );

        let options = PrintOptions {
            title: if view.header.trim().is_empty() {
                self.config.title.clone()
            } else {
                view.header.clone()
            },
            page_width: self.config.page_width,
            page_height: self.config.page_height,
            margin_top: self.config.margin_top,
            margin_right: self.config.margin_right,
            margin_bottom: self.config.margin_bottom,
            margin_left: self.config.margin_left,
            print_background: true,
            footer_template: Some(footer),
        };
        PrintJob {
            html: body,
            options,
        }
    }
}

impl Renderer for HtmlPrintRenderer {
    fn name(&self) -> &'static str {
        "html-print"
    }

    fn render(
        &self,
        document: &ParsedDocument,
        assets: &AssetResolver,
        sink: &mut dyn Write,
    ) -> Result<()> {
        let job = self.build_markup(document, assets);
        log::debug!(
            "printing {} bytes of HTML with the '{}' engine",
            job.html.len(),
            self.engine.name()
        );

        let mut session = SessionGuard::launch(self.engine.as_ref())?;
        let printed = session.print(&job.html, &job.options);
        let closed = session.close();
        let bytes = printed?;
        closed?;

        ensure_pdf(&bytes)?;
        sink.write_all(&bytes)?;
        sink.flush()?;
        log::debug!("html-print wrote {} bytes", bytes.len());
        Ok(())
    }
}

fn inline_png(assets: &AssetResolver, path: &Path) -> Option<String> {
    match assets.read(path) {
        Ok(bytes) => Some(png_data_uri(&bytes)),
        Err(e) => {
            log::warn!("could not read {}: {e}", path.display());
            None
        }
    }
}

/// Escape for element content and attribute values.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Apply the subscript transform to already-escaped text.
pub fn subscript(escaped: &str) -> String {
    SUBSCRIPT.replace_all(escaped, "$1<sub>$2</sub>").into_owned()
}

/// A textual field as markup: escaped, then subscripted.
fn text(s: &str) -> String {
    subscript(&escape(s))
}

fn sections_html(view: &SheetView) -> String {
    let mut html = String::new();
    for section in &view.sections {
        html.push_str("<div class=\"content-section\">\n");
        if !section.subtitle.is_empty() {
            html.push_str(&format!("<div class=\"subtitle\">{}</div>\n", text(&section.subtitle)));
        }
        match &section.body {
            SectionBody::List(items) => list_html(&mut html, items),
            SectionBody::KeyValue(pairs) => key_value_html(&mut html, pairs),
            SectionBody::Zebra(table) => zebra_html(&mut html, table),
        }
        html.push_str("</div>\n");
    }
    html
}

fn list_html(html: &mut String, items: &[String]) {
    html.push_str("<ul class=\"features-list\">\n");
    for item in items {
        html.push_str(&format!("  <li>{}</li>\n", text(item)));
    }
    html.push_str("</ul>\n");
}

fn key_value_html(html: &mut String, pairs: &[[String; 2]]) {
    html.push_str("<table class=\"invisible\">\n");
    for [key, value] in pairs {
        html.push_str(&format!("  <tr><td>{}</td><td>{}</td></tr>\n", text(key), text(value)));
    }
    html.push_str("</table>\n");
}

fn zebra_html(html: &mut String, table: &ZebraTable) {
    let Some(header) = table.header() else {
        return;
    };
    html.push_str("<table class=\"zebra\">\n  <thead>\n    <tr>\n");
    for (i, cell) in header.iter().enumerate() {
        html.push_str(&format!("      <th{}>{}</th>\n", shade_attr(i), text(cell)));
    }
    html.push_str("    </tr>\n  </thead>\n  <tbody>\n");
    let body = table.body();
    for (r, row) in body.iter().enumerate() {
        if r + 1 == body.len() {
            html.push_str("    <tr class=\"last-row\">\n");
        } else {
            html.push_str("    <tr>\n");
        }
        for (i, cell) in row.iter().enumerate() {
            html.push_str(&format!("      <td{}>{}</td>\n", shade_attr(i), text(cell)));
        }
        html.push_str("    </tr>\n");
    }
    html.push_str("  </tbody>\n</table>\n");
}

fn shade_attr(column: usize) -> &'static str {
    if ZebraTable::is_shaded(column) {
        " class=\"shade\""
    } else {
        ""
    }
}
