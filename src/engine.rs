//! Print engines – turn a complete HTML document into PDF bytes.
//!
//! An engine is a factory for sessions. A session is an acquired resource
//! (for Chromium, a browser process) that must be closed exactly once;
//! [`SessionGuard`] enforces that on every exit path, including unwinding.

use crate::dom::{
    body_children, body_root, document_title, parse_html, replace_class_text, stylesheet_text,
};
use crate::error::{RenderError, Result};
use crate::fonts::FontManager;
use crate::layout::compute_layout;
use crate::layout_config::LayoutConfig;
use crate::pagination::{flatten_into, paginate, PageGeometry};
use crate::render::render_pdf;
use crate::style::{build_styled_tree, Stylesheet};

/// Page geometry and chrome for one print, in points.
#[derive(Debug, Clone, PartialEq)]
pub struct PrintOptions {
    /// PDF title; falls back to the document's `<title>` when empty.
    pub title: String,
    pub page_width: f32,
    pub page_height: f32,
    pub margin_top: f32,
    pub margin_right: f32,
    pub margin_bottom: f32,
    pub margin_left: f32,
    pub print_background: bool,
    /// HTML stamped into the bottom margin of every page. Elements with the
    /// classes `pageNumber`, `totalPages`, `date` and `title` get their text
    /// replaced per page.
    pub footer_template: Option<String>,
}

impl Default for PrintOptions {
    fn default() -> Self {
        Self {
            title: String::new(),
            // A4
            page_width: 595.28,
            page_height: 841.89,
            margin_top: 40.0,
            margin_right: 40.0,
            margin_bottom: 60.0,
            margin_left: 40.0,
            print_background: true,
            footer_template: None,
        }
    }
}

/// A live print session.
pub trait PrintSession: Send {
    fn print(&mut self, html: &str, options: &PrintOptions) -> Result<Vec<u8>>;

    /// Release the session's resources. Called at most once.
    fn close(&mut self) -> Result<()>;
}

/// Something that can start print sessions.
pub trait PrintEngine: Send + Sync {
    fn name(&self) -> &str;

    fn launch(&self) -> Result<Box<dyn PrintSession>>;
}

/// Owns a session and closes it exactly once: explicitly via
/// [`SessionGuard::close`] or, failing that, on drop.
pub struct SessionGuard {
    engine: String,
    session: Option<Box<dyn PrintSession>>,
}

impl SessionGuard {
    /// Launch a session on `engine`. On failure nothing is left running.
    pub fn launch(engine: &dyn PrintEngine) -> Result<Self> {
        let session = engine.launch()?;
        log::debug!("print session started on '{}'", engine.name());
        Ok(Self {
            engine: engine.name().to_string(),
            session: Some(session),
        })
    }

    pub fn print(&mut self, html: &str, options: &PrintOptions) -> Result<Vec<u8>> {
        match self.session.as_mut() {
            Some(session) => session.print(html, options),
            None => Err(RenderError::Print(format!(
                "session on '{}' is already closed",
                self.engine
            ))),
        }
    }

    /// Close the session, surfacing teardown errors.
    pub fn close(mut self) -> Result<()> {
        match self.session.take() {
            Some(mut session) => {
                log::debug!("closing print session on '{}'", self.engine);
                session.close()
            }
            None => Ok(()),
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if let Some(mut session) = self.session.take() {
            log::debug!("closing abandoned print session on '{}'", self.engine);
            if let Err(e) = session.close() {
                log::warn!("print session on '{}' failed to close: {e}", self.engine);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// In-process layout engine
// ---------------------------------------------------------------------------

/// Prints with the crate's own HTML layout pipeline: parse, style, lay out,
/// paginate, render.
#[derive(Debug, Clone, Copy, Default)]
pub struct LayoutEngine {
    fonts: FontManager,
}

impl LayoutEngine {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PrintEngine for LayoutEngine {
    fn name(&self) -> &str {
        "layout"
    }

    fn launch(&self) -> Result<Box<dyn PrintSession>> {
        Ok(Box::new(LayoutSession {
            fonts: self.fonts,
            closed: false,
        }))
    }
}

struct LayoutSession {
    fonts: FontManager,
    closed: bool,
}

impl PrintSession for LayoutSession {
    fn print(&mut self, html: &str, options: &PrintOptions) -> Result<Vec<u8>> {
        if self.closed {
            return Err(RenderError::Print("layout session is closed".into()));
        }
        let config = layout_html(html, options, &self.fonts)?;
        render_pdf(&config).map_err(RenderError::Print)
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}

/// Lay out and paginate an HTML document without rendering it.
pub fn layout_html(html: &str, options: &PrintOptions, fonts: &FontManager) -> Result<LayoutConfig> {
    let dom = parse_html(html);
    let sheet = Stylesheet::parse(&stylesheet_text(&dom));
    log::debug!("document stylesheet has {} rule(s)", sheet.len());
    let styled = build_styled_tree(&body_root(&dom), &sheet);

    let content_width = (options.page_width - options.margin_left - options.margin_right).max(1.0);
    let boxes = compute_layout(&styled, options.margin_left, content_width, fonts).map_err(RenderError::Print)?;

    let geometry = PageGeometry {
        page_width: options.page_width,
        page_height: options.page_height,
        margin_top: options.margin_top,
        margin_bottom: options.margin_bottom,
    };
    let title = if options.title.is_empty() {
        document_title(&dom).unwrap_or_default()
    } else {
        options.title.clone()
    };
    let mut config = paginate(&boxes, &geometry, &title);

    if !options.print_background {
        for page in &mut config.pages {
            for b in &mut page.boxes {
                b.background_color = None;
            }
        }
    }
    if let Some(template) = &options.footer_template {
        stamp_footer(&mut config, template, options, fonts)?;
    }
    Ok(config)
}

/// Lay the footer template out once per page, with that page's number.
fn stamp_footer(
    config: &mut LayoutConfig,
    template: &str,
    options: &PrintOptions,
    fonts: &FontManager,
) -> Result<()> {
    let dom = parse_html(template);
    let sheet = Stylesheet::parse(&stylesheet_text(&dom));
    let total = config.pages.len().to_string();
    let date = chrono::Local::now().format("%Y-%m-%d").to_string();
    let title = config.title.clone();

    let width = (options.page_width - options.margin_left - options.margin_right).max(1.0);
    let top = options.page_height - options.margin_bottom;

    for page in &mut config.pages {
        let mut nodes = body_children(&dom);
        replace_class_text(&mut nodes, "pageNumber", &(page.page_index + 1).to_string());
        replace_class_text(&mut nodes, "totalPages", &total);
        replace_class_text(&mut nodes, "date", &date);
        replace_class_text(&mut nodes, "title", &title);

        let styled = build_styled_tree(&nodes, &sheet);
        let boxes = compute_layout(&styled, options.margin_left, width, fonts).map_err(RenderError::Print)?;
        for b in &boxes {
            flatten_into(b, top, 0, &mut page.boxes);
        }
    }
    Ok(())
}
