//! # datasheet-forge – tagged spreadsheet rows → product data sheet PDFs
//!
//! Rows of loosely typed cells carry a tagging convention (`_header_`,
//! `_list_`, `_zebraTable_`, …). The crate recovers a structured document
//! from them and renders it through one of two interchangeable backends:
//!
//! 1. **Parse** – rows → [`ParsedDocument`] ([`parser`])
//! 2. **Resolve** – logo and product image lookup under an uploads root ([`assets`])
//! 3. **View** – the data decisions both backends share ([`content`])
//! 4. **Render**, either
//!    - directly with printpdf vector ops on one page ([`draw`]), or
//!    - by filling HTML templates ([`html`]) and printing them with a
//!      [`PrintEngine`] ([`engine`]): the in-process layout pipeline
//!      ([`dom`] → [`style`] → [`layout`] → [`pagination`] → [`render`]) or,
//!      with the `chromium` feature, a headless browser.

pub mod assets;
#[cfg(feature = "chromium")]
pub mod chromium;
pub mod content;
pub mod dom;
pub mod draw;
pub mod engine;
pub mod error;
pub mod fonts;
pub mod html;
pub mod layout;
pub mod layout_config;
pub mod model;
pub mod pagination;
pub mod paint;
pub mod parser;
pub mod pipeline;
pub mod render;
pub mod style;
pub mod templates;

// Re-exports for convenience
pub use assets::AssetResolver;
#[cfg(feature = "chromium")]
pub use chromium::ChromiumEngine;
pub use content::SheetView;
pub use draw::DirectDrawRenderer;
pub use engine::{LayoutEngine, PrintEngine, PrintOptions, PrintSession, SessionGuard};
pub use error::{RenderError, Result};
pub use html::HtmlPrintRenderer;
pub use model::{Cell, ParsedDocument, Row, Section, SectionKind};
pub use parser::{parse, TagParser};
pub use pipeline::{generate_datasheet, Backend, DatasheetConfig, Renderer};
