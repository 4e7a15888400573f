//! Integration tests for the datasheet pipeline.
//!
//! These tests validate:
//! - Tag parsing of spreadsheet rows
//! - Asset lookup under an uploads root
//! - Content parity between the direct-draw and HTML/print backends
//! - Print session lifecycle on success, failure and panic
//! - Pagination and page stamping in the layout engine

use std::fs;
use std::io::{self, Cursor, Write};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::NaiveDate;
use datasheet_forge::dom::{elements_with_class, parse_html, ElementNode, Tag};
use datasheet_forge::engine::layout_html;
use datasheet_forge::fonts::FontManager;
use datasheet_forge::model::{Section, SectionData};
use datasheet_forge::{
    generate_datasheet, parse, AssetResolver, Cell, DatasheetConfig, DirectDrawRenderer,
    HtmlPrintRenderer, ParsedDocument, PrintEngine, PrintOptions, PrintSession, RenderError,
    Renderer, Row, TagParser,
};
use tempfile::TempDir;

// =====================================================================
// Helpers
// =====================================================================

fn row(cells: &[&str]) -> Row {
    cells.iter().map(|c| Cell::from(*c)).collect()
}

fn config() -> DatasheetConfig {
    DatasheetConfig {
        version_date: NaiveDate::from_ymd_opt(2024, 3, 9),
        ..DatasheetConfig::default()
    }
}

fn no_assets() -> AssetResolver {
    AssetResolver::new("/nonexistent/uploads")
}

fn assert_valid_pdf(bytes: &[u8]) {
    assert!(bytes.len() > 100, "PDF too small: {} bytes", bytes.len());
    assert_eq!(&bytes[0..5], b"%PDF-", "Missing PDF header");
}

fn png_bytes() -> Vec<u8> {
    let img = image::DynamicImage::ImageRgb8(image::RgbImage::new(8, 4));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

fn sample_rows() -> Vec<Row> {
    vec![
        row(&["_header_"]),
        row(&["Lamp 3000"]),
        row(&["_title_"]),
        row(&["LED floodlight"]),
        row(&["_code_"]),
        row(&["LF-3000"]),
        row(&["_powerSupply_"]),
        row(&["230 V AC"]),
        row(&["_subtitle_"]),
        row(&["Features"]),
        row(&["_list_"]),
        row(&["Die-cast housing"]),
        row(&[""]),
        row(&["IP66 & IK08"]),
        row(&["_subtitle_"]),
        row(&["Ratings"]),
        row(&["_invisible_table_"]),
        row(&["Voltage", "230 V"]),
        row(&["", ""]),
        vec![Cell::from("Weight"), Cell::Number(2.5)],
        row(&["_subtitle_"]),
        row(&["Efficiency"]),
        row(&["_zebraTable_"]),
        row(&["Mode", "Output", "Share"]),
        vec![Cell::from("eco"), Cell::Number(1200.0), Cell::Number(0.5)],
        vec![Cell::from("boost"), Cell::Number(3000.0), Cell::Number(1.0)],
        row(&["_footer_"]),
        row(&["Acme Lighting"]),
    ]
}

/// Texts of each `content-section` in the HTML, in document order:
/// subtitle, list items, then table cells row by row.
fn html_section_texts(html: &str) -> Vec<Vec<String>> {
    fn collect(element: &ElementNode, out: &mut Vec<String>) {
        for child in element.element_children() {
            match child.tag {
                Tag::Li | Tag::Th | Tag::Td => out.push(child.text_content()),
                Tag::Div if child.has_class("subtitle") => out.push(child.text_content()),
                _ => collect(child, out),
            }
        }
    }
    let dom = parse_html(html);
    elements_with_class(&dom, "content-section")
        .into_iter()
        .map(|section| {
            let mut texts = Vec::new();
            collect(section, &mut texts);
            texts
        })
        .collect()
}

// =====================================================================
// Parser properties
// =====================================================================

#[test]
fn empty_input_gives_empty_document() {
    let doc = parse::<Row>(&[]);
    assert_eq!(doc, ParsedDocument::default());
    assert!(doc.sections.is_empty());
    assert_eq!(doc.header, "");
    assert_eq!(doc.power_supply, "");
}

#[test]
fn scalar_tags_take_the_next_row() {
    assert_eq!(parse(&[row(&["_header_"]), row(&["Acme"])]).header, "Acme");
    assert_eq!(parse(&[row(&["_header_"])]).header, "");
}

#[test]
fn blank_list_rows_are_dropped() {
    let doc = parse(&[row(&["_list_"]), row(&["A"]), row(&[""]), row(&["B"])]);
    assert_eq!(doc.sections[0].data, SectionData::List(vec!["A".into(), "B".into()]));
}

#[test]
fn fully_blank_table_rows_are_dropped() {
    let doc = parse(&[
        row(&["_invisible_table_"]),
        row(&["k", "v"]),
        row(&["", ""]),
        row(&["k2", "v2"]),
    ]);
    assert_eq!(doc.sections[0].len(), 2);
}

#[test]
fn incremental_parser_matches_batch_parse() {
    let rows = sample_rows();
    let mut parser = TagParser::new();
    for r in &rows {
        parser.feed(r);
    }
    assert_eq!(parser.finish(), parse(&rows));
}

#[test]
fn rows_deserialise_from_json() {
    let rows: Vec<Row> =
        serde_json::from_str(r#"[["_list_"], ["a", 1, true, null], [0.25]]"#).unwrap();
    assert_eq!(rows[1][1], Cell::Number(1.0));
    assert_eq!(rows[1][3], Cell::Absent);
    let doc = parse(&rows);
    assert_eq!(doc.sections[0].data, SectionData::List(vec!["a".into(), "0.25".into()]));
}

// =====================================================================
// Asset resolver
// =====================================================================

fn uploads(files: &[&str]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for name in files {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, png_bytes()).unwrap();
    }
    dir
}

fn file_name(path: &Path) -> String {
    path.file_name().unwrap().to_string_lossy().into_owned()
}

#[test]
fn product_image_match_ignores_case_and_whitespace() {
    let dir = uploads(&["a/ProductX.png"]);
    let found = AssetResolver::new(dir.path()).find_product_image("Product X").unwrap();
    assert_eq!(file_name(&found), "ProductX.png");

    let dir = uploads(&["b/Product X.png"]);
    let found = AssetResolver::new(dir.path()).find_product_image("product x").unwrap();
    assert_eq!(file_name(&found), "Product X.png");
}

#[test]
fn empty_product_name_is_not_found() {
    let dir = uploads(&["Thing.png"]);
    let assets = AssetResolver::new(dir.path());
    assert!(assets.find_product_image("").is_none());
}

#[test]
fn whitespace_product_name_matches_any_png() {
    let dir = uploads(&["shots/photo.png", "shots/zz.png"]);
    let found = AssetResolver::new(dir.path()).find_product_image("   ").unwrap();
    assert_eq!(file_name(&found), "photo.png");
}

#[test]
fn lone_underscore_closes_the_open_list() {
    let doc = parse(&[row(&["_list_"]), row(&["a"]), row(&["_"]), row(&["b"])]);
    assert_eq!(doc.sections.len(), 1);
    assert_eq!(doc.sections[0].data, SectionData::List(vec!["a".into()]));
}

#[test]
fn logo_lookup_is_deterministic() {
    let dir = uploads(&["z/logo.png", "a/Company-LOGO.png", "a/logo.jpg"]);
    let found = AssetResolver::new(dir.path()).find_logo().unwrap();
    assert_eq!(file_name(&found), "Company-LOGO.png");
    assert!(AssetResolver::new(dir.path().join("missing")).find_logo().is_none());
}

// =====================================================================
// Renderer parity
// =====================================================================

#[test]
fn both_backends_render_percentages() {
    let doc = parse(&[
        row(&["_zebraTable_"]),
        row(&["A", "B", "C"]),
        vec![Cell::from("x"), Cell::Number(0.5), Cell::from("z")],
    ]);
    let drawn = DirectDrawRenderer::new(config()).compose(&doc, &no_assets());
    assert!(drawn.section_texts(0).contains(&"50 %"));

    let job = HtmlPrintRenderer::new(config()).build_markup(&doc, &no_assets());
    assert!(html_section_texts(&job.html)[0].contains(&"50 %".to_string()));
}

#[test]
fn backends_agree_on_section_content() {
    let doc = parse(&sample_rows());
    let drawn = DirectDrawRenderer::new(config()).compose(&doc, &no_assets());
    let job = HtmlPrintRenderer::new(config()).build_markup(&doc, &no_assets());
    let html_sections = html_section_texts(&job.html);

    assert_eq!(html_sections.len(), doc.sections.len());
    for (i, html_texts) in html_sections.iter().enumerate() {
        let drawn_texts: Vec<String> = drawn.section_texts(i).into_iter().map(String::from).collect();
        assert_eq!(&drawn_texts, html_texts, "section {i}");
    }
    assert_eq!(html_sections[0], ["Features", "Die-cast housing", "IP66 & IK08"]);
    assert_eq!(html_sections[1], ["Ratings", "Voltage", "230 V", "Weight", "2.5"]);
    assert_eq!(
        html_sections[2],
        ["Efficiency", "Mode", "Output", "Share", "eco", "1200", "50 %", "boost", "3000", "1"]
    );
}

#[test]
fn key_value_rows_with_text_past_the_value_are_shown() {
    let doc = parse(&[row(&["_invisible_table_"]), row(&["", "", "note"]), row(&["k", "v"])]);
    let drawn = DirectDrawRenderer::new(config()).compose(&doc, &no_assets());
    assert_eq!(drawn.section_texts(0), ["", "", "k", "v"]);

    let job = HtmlPrintRenderer::new(config()).build_markup(&doc, &no_assets());
    assert_eq!(html_section_texts(&job.html)[0], ["", "", "k", "v"]);
}

#[test]
fn empty_zebra_table_keeps_its_subtitle() {
    let doc = ParsedDocument {
        sections: vec![Section {
            subtitle: "Specs".into(),
            data: SectionData::ZebraTable(Vec::new()),
        }],
        ..ParsedDocument::default()
    };
    let drawn = DirectDrawRenderer::new(config()).compose(&doc, &no_assets());
    assert_eq!(drawn.section_texts(0), ["Specs"]);

    let job = HtmlPrintRenderer::new(config()).build_markup(&doc, &no_assets());
    assert_eq!(html_section_texts(&job.html)[0], ["Specs"]);
}

#[test]
fn subscripts_only_in_html() {
    let doc = parse(&[row(&["_list_"]), row(&["V_in max"])]);
    let job = HtmlPrintRenderer::new(config()).build_markup(&doc, &no_assets());
    assert!(job.html.contains("<li>V<sub>in</sub> max</li>"));
    let drawn = DirectDrawRenderer::new(config()).compose(&doc, &no_assets());
    assert_eq!(drawn.section_texts(0), ["V_in max"]);
}

#[test]
fn resolved_images_are_used_by_both_backends() {
    let dir = uploads(&["brand/logo.png", "products/Lamp 3000.png"]);
    let assets = AssetResolver::new(dir.path());
    let doc = parse(&sample_rows());

    let job = HtmlPrintRenderer::new(config()).build_markup(&doc, &assets);
    assert!(job.html.contains(r#"class="logo""#));
    assert!(job.html.contains(r#"class="product-image""#));
    assert!(job.html.contains("data:image/png;base64,"));
    assert!(!job.html.contains("[Logo placeholder]"));

    let drawn = DirectDrawRenderer::new(config()).compose(&doc, &assets);
    assert!(drawn.transcript.iter().all(|e| !e.text.contains("placeholder")));
    assert_valid_pdf(&drawn.to_pdf());
}

#[test]
fn full_pipeline_produces_pdfs() {
    let dir = uploads(&["logo.png"]);
    let assets = AssetResolver::new(dir.path());
    let draw = DirectDrawRenderer::new(config());
    let html = HtmlPrintRenderer::new(config());
    for renderer in [&draw as &dyn Renderer, &html] {
        let bytes = generate_datasheet(&sample_rows(), renderer, &assets).unwrap();
        assert_valid_pdf(&bytes);
    }
}

// =====================================================================
// Failure paths
// =====================================================================

struct BrokenSink;

impl Write for BrokenSink {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn sink_errors_are_reported_once() {
    let doc = parse(&sample_rows());
    let err = DirectDrawRenderer::new(config())
        .render(&doc, &no_assets(), &mut BrokenSink)
        .unwrap_err();
    assert!(matches!(err, RenderError::Io(_)));

    let err = HtmlPrintRenderer::new(config())
        .render(&doc, &no_assets(), &mut BrokenSink)
        .unwrap_err();
    assert!(matches!(err, RenderError::Io(_)));
}

#[derive(Clone, Copy, PartialEq)]
enum Behaviour {
    Succeed,
    FailLaunch,
    FailPrint,
    Panic,
    NotPdf,
    FailClose,
}

#[derive(Default)]
struct Counters {
    launched: AtomicUsize,
    closed: AtomicUsize,
}

struct FakeEngine {
    behaviour: Behaviour,
    counters: Arc<Counters>,
}

struct FakeSession {
    behaviour: Behaviour,
    counters: Arc<Counters>,
}

impl PrintEngine for FakeEngine {
    fn name(&self) -> &str {
        "fake"
    }

    fn launch(&self) -> datasheet_forge::Result<Box<dyn PrintSession>> {
        if self.behaviour == Behaviour::FailLaunch {
            return Err(RenderError::Launch {
                engine: "fake".into(),
                reason: "no browser".into(),
            });
        }
        self.counters.launched.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeSession {
            behaviour: self.behaviour,
            counters: self.counters.clone(),
        }))
    }
}

impl PrintSession for FakeSession {
    fn print(&mut self, html: &str, _options: &PrintOptions) -> datasheet_forge::Result<Vec<u8>> {
        match self.behaviour {
            Behaviour::FailPrint => Err(RenderError::Print("renderer crashed".into())),
            Behaviour::Panic => panic!("print engine exploded"),
            Behaviour::NotPdf => Ok(html.as_bytes().to_vec()),
            _ => Ok(b"%PDF-1.7 fake".to_vec()),
        }
    }

    fn close(&mut self) -> datasheet_forge::Result<()> {
        self.counters.closed.fetch_add(1, Ordering::SeqCst);
        if self.behaviour == Behaviour::FailClose {
            return Err(RenderError::Teardown("browser did not exit".into()));
        }
        Ok(())
    }
}

fn fake_renderer(behaviour: Behaviour) -> (HtmlPrintRenderer, Arc<Counters>) {
    let counters = Arc::new(Counters::default());
    let engine = FakeEngine {
        behaviour,
        counters: counters.clone(),
    };
    (HtmlPrintRenderer::with_engine(config(), Arc::new(engine)), counters)
}

#[test]
fn session_closed_once_on_success() {
    let (renderer, counters) = fake_renderer(Behaviour::Succeed);
    let mut out = Vec::new();
    renderer.render(&parse(&sample_rows()), &no_assets(), &mut out).unwrap();
    assert_eq!(out, b"%PDF-1.7 fake");
    assert_eq!(counters.launched.load(Ordering::SeqCst), 1);
    assert_eq!(counters.closed.load(Ordering::SeqCst), 1);
}

#[test]
fn session_closed_once_on_print_failure() {
    let (renderer, counters) = fake_renderer(Behaviour::FailPrint);
    let mut out = Vec::new();
    let err = renderer
        .render(&parse(&sample_rows()), &no_assets(), &mut out)
        .unwrap_err();
    assert!(matches!(err, RenderError::Print(_)));
    assert!(out.is_empty());
    assert_eq!(counters.closed.load(Ordering::SeqCst), 1);
}

#[test]
fn launch_failure_leaves_nothing_open() {
    let (renderer, counters) = fake_renderer(Behaviour::FailLaunch);
    let err = renderer
        .render(&parse(&sample_rows()), &no_assets(), &mut Vec::new())
        .unwrap_err();
    assert!(matches!(err, RenderError::Launch { .. }));
    assert_eq!(counters.launched.load(Ordering::SeqCst), 0);
    assert_eq!(counters.closed.load(Ordering::SeqCst), 0);
}

#[test]
fn session_closed_once_when_print_panics() {
    let (renderer, counters) = fake_renderer(Behaviour::Panic);
    let doc = parse(&sample_rows());
    let result = catch_unwind(AssertUnwindSafe(|| {
        renderer.render(&doc, &no_assets(), &mut Vec::new())
    }));
    assert!(result.is_err());
    assert_eq!(counters.closed.load(Ordering::SeqCst), 1);
}

#[test]
fn teardown_failure_fails_the_render() {
    let (renderer, counters) = fake_renderer(Behaviour::FailClose);
    let mut out = Vec::new();
    let err = renderer
        .render(&parse(&sample_rows()), &no_assets(), &mut out)
        .unwrap_err();
    assert!(matches!(err, RenderError::Teardown(_)));
    assert!(out.is_empty());
    assert_eq!(counters.closed.load(Ordering::SeqCst), 1);
}

#[test]
fn non_pdf_output_is_rejected() {
    let (renderer, counters) = fake_renderer(Behaviour::NotPdf);
    let mut out = Vec::new();
    let err = renderer
        .render(&parse(&sample_rows()), &no_assets(), &mut out)
        .unwrap_err();
    assert!(matches!(err, RenderError::Pdf(_)));
    assert!(out.is_empty());
    assert_eq!(counters.closed.load(Ordering::SeqCst), 1);
}

// =====================================================================
// Layout engine
// =====================================================================

#[test]
fn long_sheets_paginate_with_page_numbers() {
    let mut rows = vec![row(&["_header_"]), row(&["Lamp 3000"]), row(&["_list_"])];
    rows.extend((0..150).map(|i| row(&[&format!("feature number {i}")])));
    let doc = parse(&rows);

    let job = HtmlPrintRenderer::new(config()).build_markup(&doc, &no_assets());
    let layout = layout_html(&job.html, &job.options, &FontManager::new()).unwrap();
    let pages = layout.page_count();
    assert!(pages >= 2, "expected several pages, got {pages}");

    let mut features = 0;
    for i in 0..pages {
        let lines = layout.page_lines(i);
        let stamp = format!("Page {} of {pages}", i + 1);
        assert!(lines.iter().any(|l| l.contains(&stamp)), "page {i}: {lines:?}");
        assert!(lines.iter().any(|l| l.contains("Version: 2024-03-09")));
        features += lines.iter().filter(|l| l.contains("feature number")).count();
    }
    assert_eq!(features, 150);
}

#[test]
fn direct_draw_stays_on_one_page() {
    let mut rows = vec![row(&["_list_"])];
    rows.extend((0..150).map(|i| row(&[&format!("feature number {i}")])));
    let composition = DirectDrawRenderer::new(config()).compose(&parse(&rows), &no_assets());
    assert!(composition.overflowed);
    assert!(composition
        .transcript
        .iter()
        .any(|e| e.text.contains("Page 1 of 1")));
}

// =====================================================================
// Concurrency
// =====================================================================

#[test]
fn renderers_are_shareable_across_threads() {
    let draw = Arc::new(DirectDrawRenderer::new(config()));
    let html = Arc::new(HtmlPrintRenderer::new(config()));
    let doc = Arc::new(parse(&sample_rows()));

    std::thread::scope(|scope| {
        for i in 0..4 {
            let renderer: Arc<dyn Renderer> = if i % 2 == 0 {
                draw.clone() as Arc<dyn Renderer>
            } else {
                html.clone() as Arc<dyn Renderer>
            };
            let doc = doc.clone();
            scope.spawn(move || {
                let mut out = Vec::new();
                renderer.render(&doc, &no_assets(), &mut out).unwrap();
                assert_valid_pdf(&out);
            });
        }
    });
}
