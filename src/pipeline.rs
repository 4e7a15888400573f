//! Pipeline – configuration, the renderer seam, and the one-call path from
//! rows to PDF bytes.

use std::io::Write;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::assets::AssetResolver;
use crate::draw::DirectDrawRenderer;
use crate::error::Result;
use crate::html::HtmlPrintRenderer;
use crate::model::{Cell, ParsedDocument};
use crate::parser::parse;

/// Configuration shared by both renderers. Lengths are in points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasheetConfig {
    /// PDF title used when the document has no product name.
    pub title: String,
    /// Page width in points (default: A4 = 595.28).
    pub page_width: f32,
    /// Page height in points (default: A4 = 841.89).
    pub page_height: f32,
    pub margin_top: f32,
    pub margin_right: f32,
    pub margin_bottom: f32,
    pub margin_left: f32,
    /// Printed beneath the footer line.
    pub disclaimer: String,
    /// Fixed version date; today's UTC date when unset.
    pub version_date: Option<NaiveDate>,
}

impl Default for DatasheetConfig {
    fn default() -> Self {
        Self {
            title: "Product data sheet".to_string(),
            page_width: 595.28,
            page_height: 841.89,
            margin_top: 40.0,
            margin_right: 50.0,
            margin_bottom: 60.0,
            margin_left: 50.0,
            disclaimer: "Data is subject to change without notice.".to_string(),
            version_date: None,
        }
    }
}

impl DatasheetConfig {
    /// The footer's version date, `YYYY-MM-DD`.
    pub fn version_date(&self) -> String {
        self.version_date
            .unwrap_or_else(|| Utc::now().date_naive())
            .format("%Y-%m-%d")
            .to_string()
    }

    /// Load from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// A PDF backend. Implementations hold only immutable configuration, so one
/// instance can serve concurrent calls.
pub trait Renderer: Send + Sync {
    fn name(&self) -> &'static str;

    /// Write a complete PDF for `document` to `sink`. On `Err` the sink may
    /// hold a partial write and must be discarded.
    fn render(
        &self,
        document: &ParsedDocument,
        assets: &AssetResolver,
        sink: &mut dyn Write,
    ) -> Result<()>;
}

/// The available renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    #[default]
    DirectDraw,
    /// HTML printed by the in-process layout engine.
    HtmlPrint,
}

impl Backend {
    pub fn renderer(self, config: DatasheetConfig) -> Box<dyn Renderer> {
        match self {
            Backend::DirectDraw => Box::new(DirectDrawRenderer::new(config)),
            Backend::HtmlPrint => Box::new(HtmlPrintRenderer::new(config)),
        }
    }
}

/// Full pipeline: rows → parsed document → PDF bytes.
pub fn generate_datasheet<R: AsRef<[Cell]>>(
    rows: &[R],
    renderer: &dyn Renderer,
    assets: &AssetResolver,
) -> Result<Vec<u8>> {
    let document = parse(rows);
    log::debug!(
        "parsed {} section(s); rendering with {}",
        document.sections.len(),
        renderer.name()
    );
    let mut out = Vec::new();
    renderer.render(&document, assets, &mut out)?;
    Ok(out)
}
