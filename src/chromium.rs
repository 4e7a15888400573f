//! Headless Chromium print engine (cargo feature `chromium`).
//!
//! Each session owns its own browser process; closing the session (or
//! dropping it) kills the process.

use std::sync::Arc;

use headless_chrome::types::PrintToPdfOptions;
use headless_chrome::{Browser, LaunchOptions, Tab};

use crate::engine::{PrintEngine, PrintOptions, PrintSession};
use crate::error::{RenderError, Result};

const POINTS_PER_INCH: f64 = 72.0;

/// Launches a disposable headless Chromium per session.
#[derive(Debug, Clone, Default)]
pub struct ChromiumEngine {
    /// Explicit browser binary; `None` lets `headless_chrome` find one.
    pub executable: Option<std::path::PathBuf>,
}

impl ChromiumEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn launch_error(&self, reason: impl ToString) -> RenderError {
        RenderError::Launch {
            engine: self.name().to_string(),
            reason: reason.to_string(),
        }
    }
}

impl PrintEngine for ChromiumEngine {
    fn name(&self) -> &str {
        "chromium"
    }

    fn launch(&self) -> Result<Box<dyn PrintSession>> {
        let options = LaunchOptions::default_builder()
            .headless(true)
            .sandbox(false)
            .path(self.executable.clone())
            .build()
            .map_err(|e| self.launch_error(e))?;
        let browser = Browser::new(options).map_err(|e| self.launch_error(e))?;
        let tab = browser.new_tab().map_err(|e| self.launch_error(e))?;
        Ok(Box::new(ChromiumSession {
            browser: Some(browser),
            tab,
        }))
    }
}

struct ChromiumSession {
    browser: Option<Browser>,
    tab: Arc<Tab>,
}

impl ChromiumSession {
    /// Load `html` into a blank page with `document.write`.
    fn load(&self, html: &str) -> Result<()> {
        let navigation = |e: &dyn std::fmt::Display| RenderError::Navigation(e.to_string());
        self.tab
            .navigate_to("about:blank")
            .and_then(|tab| tab.wait_until_navigated())
            .map_err(|e| navigation(&e))?;
        let literal = serde_json::to_string(html).map_err(|e| navigation(&e))?;
        self.tab
            .evaluate(
                &format!("document.open(); document.write({literal}); document.close();"),
                false,
            )
            .map_err(|e| navigation(&e))?;
        Ok(())
    }
}

impl PrintSession for ChromiumSession {
    fn print(&mut self, html: &str, options: &PrintOptions) -> Result<Vec<u8>> {
        if self.browser.is_none() {
            return Err(RenderError::Print("chromium session is closed".into()));
        }
        self.load(html)?;

        let inches = |pt: f32| Some(f64::from(pt) / POINTS_PER_INCH);
        let pdf_options = PrintToPdfOptions {
            print_background: Some(options.print_background),
            display_header_footer: Some(options.footer_template.is_some()),
            header_template: Some("<span></span>".to_string()),
            footer_template: options.footer_template.clone(),
            paper_width: inches(options.page_width),
            paper_height: inches(options.page_height),
            margin_top: inches(options.margin_top),
            margin_bottom: inches(options.margin_bottom),
            margin_left: inches(options.margin_left),
            margin_right: inches(options.margin_right),
            ..Default::default()
        };
        self.tab
            .print_to_pdf(Some(pdf_options))
            .map_err(|e| RenderError::Print(e.to_string()))
    }

    fn close(&mut self) -> Result<()> {
        if let Some(browser) = self.browser.take() {
            log::debug!("shutting down headless chromium");
            drop(browser);
        }
        Ok(())
    }
}
