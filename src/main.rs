//! datasheet – command-line rows → product data sheet PDF.
//!
//! Usage:
//!   datasheet <rows.json> [output.pdf] [--backend direct|html]
//!             [--engine layout|chromium] [--uploads DIR] [--config cfg.json]
//!
//! `rows.json` is a JSON array of rows, each an array of strings, numbers,
//! booleans or nulls. If `output.pdf` is omitted the PDF is written next to
//! the input with the same stem.

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::{Parser, ValueEnum};

use datasheet_forge::{
    generate_datasheet, AssetResolver, DatasheetConfig, DirectDrawRenderer, HtmlPrintRenderer,
    LayoutEngine, PrintEngine, Renderer, Row,
};

#[derive(Parser)]
#[command(author, version, about = "Render tagged spreadsheet rows into a product data sheet PDF")]
struct Cli {
    /// JSON file holding the rows (array of arrays of scalars).
    input: PathBuf,

    /// Output path (default: input stem with .pdf).
    output: Option<PathBuf>,

    /// Which renderer draws the PDF.
    #[arg(long, value_enum, default_value_t = BackendArg::Direct)]
    backend: BackendArg,

    /// Print engine for the html backend.
    #[arg(long, value_enum, default_value_t = EngineArg::Layout)]
    engine: EngineArg,

    /// Directory searched for the logo and product images.
    #[arg(long, env = "DATASHEET_UPLOADS_DIR", default_value = "uploads")]
    uploads: PathBuf,

    /// JSON file overriding the default page and footer configuration.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum BackendArg {
    Direct,
    Html,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum EngineArg {
    Layout,
    Chromium,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(err) = run(&cli) {
        eprintln!("Error: {err}");
        print_error_sources(err.as_ref());
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<(), Box<dyn Error>> {
    let rows: Vec<Row> = serde_json::from_str(&read(&cli.input)?)
        .map_err(|e| format!("'{}' is not a JSON array of rows: {e}", cli.input.display()))?;

    let config = match &cli.config {
        Some(path) => DatasheetConfig::from_json(&read(path)?)
            .map_err(|e| format!("invalid config '{}': {e}", path.display()))?,
        None => DatasheetConfig::default(),
    };

    let renderer: Box<dyn Renderer> = match cli.backend {
        BackendArg::Direct => Box::new(DirectDrawRenderer::new(config)),
        BackendArg::Html => Box::new(HtmlPrintRenderer::with_engine(config, print_engine(cli.engine)?)),
    };
    let assets = AssetResolver::new(&cli.uploads);

    let bytes = generate_datasheet(&rows, renderer.as_ref(), &assets)?;

    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| cli.input.with_extension("pdf"));
    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(&output, &bytes).map_err(|e| format!("writing '{}': {e}", output.display()))?;

    eprintln!(
        "Wrote '{}' ({} bytes, {} backend)",
        output.display(),
        bytes.len(),
        renderer.name()
    );
    Ok(())
}

fn read(path: &Path) -> Result<String, Box<dyn Error>> {
    fs::read_to_string(path).map_err(|e| format!("reading '{}': {e}", path.display()).into())
}

fn print_engine(choice: EngineArg) -> Result<Arc<dyn PrintEngine>, Box<dyn Error>> {
    match choice {
        EngineArg::Layout => Ok(Arc::new(LayoutEngine::new())),
        #[cfg(feature = "chromium")]
        EngineArg::Chromium => Ok(Arc::new(datasheet_forge::ChromiumEngine::new())),
        #[cfg(not(feature = "chromium"))]
        EngineArg::Chromium => Err("this build has no chromium engine; rebuild with --features chromium".into()),
    }
}

fn print_error_sources(mut error: &(dyn Error + 'static)) {
    while let Some(source) = error.source() {
        eprintln!("  caused by: {source}");
        error = source;
    }
}
