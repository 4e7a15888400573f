//! Tag parser – recovers a [`ParsedDocument`] from tagged spreadsheet rows.
//!
//! Structure is carried by *tag rows*: rows whose first cell reads `_name_`.
//! Scalar tags (`_header_`, `_title_`, …) take their value from the row that
//! follows; section tags (`_list_`, `_invisible_table_`, `_zebraTable_`)
//! collect every following row until the next tag or the end of input.
//!
//! The scan is a small state machine ([`ScanState`]) so the flush-on-tag
//! rule lives in exactly one place. Parsing is total: any input, however
//! sparse or inconsistent, produces a document.

use crate::model::{is_blank_row, Cell, ParsedDocument, Row, Section, SectionData};

/// Document fields filled from the row following a scalar tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarField {
    Header,
    Footer,
    Title,
    Code,
    PowerSupply,
    /// Not a document field: the subtitle of the next flushed section.
    Subtitle,
}

/// The tag vocabulary understood by the parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tag {
    Scalar(ScalarField),
    List,
    KeyValueTable,
    ZebraTable,
    /// Well-formed but unrecognised; closes any open section.
    Unknown(String),
}

impl Tag {
    /// Classify a row. Returns `None` for data rows.
    pub fn of_row(row: &[Cell]) -> Option<Tag> {
        let first = row.first().map(Cell::as_text).unwrap_or_default();
        Self::from_name(&first)
    }

    /// Classify a tag name such as `_list_`. Returns `None` when `name` does
    /// not both start and end with an underscore; a lone `_` qualifies.
    pub fn from_name(name: &str) -> Option<Tag> {
        if !name.starts_with('_') || !name.ends_with('_') {
            return None;
        }
        let tag = match name {
            "_header_" => Tag::Scalar(ScalarField::Header),
            "_footer_" => Tag::Scalar(ScalarField::Footer),
            "_title_" => Tag::Scalar(ScalarField::Title),
            "_code_" => Tag::Scalar(ScalarField::Code),
            "_powerSupply_" => Tag::Scalar(ScalarField::PowerSupply),
            "_subtitle_" => Tag::Scalar(ScalarField::Subtitle),
            "_list_" => Tag::List,
            "_invisible_table_" => Tag::KeyValueTable,
            "_zebraTable_" => Tag::ZebraTable,
            other => Tag::Unknown(other.to_string()),
        };
        Some(tag)
    }
}

/// Scan state. Section states own their accumulator.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ScanState {
    #[default]
    Idle,
    AwaitingScalarValue(ScalarField),
    InList(Vec<String>),
    InKeyValueTable(Vec<Row>),
    InZebraTable(Vec<Row>),
}

impl ScanState {
    fn entering(tag: &Tag) -> Self {
        match tag {
            Tag::Scalar(field) => ScanState::AwaitingScalarValue(*field),
            Tag::List => ScanState::InList(Vec::new()),
            Tag::KeyValueTable => ScanState::InKeyValueTable(Vec::new()),
            Tag::ZebraTable => ScanState::InZebraTable(Vec::new()),
            Tag::Unknown(_) => ScanState::Idle,
        }
    }

    /// The accumulated section body, if this state holds a non-empty one.
    fn into_section_data(self) -> Option<SectionData> {
        let data = match self {
            ScanState::InList(items) if !items.is_empty() => SectionData::List(items),
            ScanState::InKeyValueTable(rows) if !rows.is_empty() => {
                SectionData::KeyValueTable(rows)
            }
            ScanState::InZebraTable(rows) if !rows.is_empty() => SectionData::ZebraTable(rows),
            _ => return None,
        };
        Some(data)
    }
}

/// Incremental tag parser. Feed rows in order, then [`TagParser::finish`].
#[derive(Debug, Default)]
pub struct TagParser {
    state: ScanState,
    pending_subtitle: String,
    document: ParsedDocument,
}

impl TagParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current scan state (exposed for inspection in tests and logs).
    pub fn state(&self) -> &ScanState {
        &self.state
    }

    /// Consume one row.
    pub fn feed(&mut self, row: &[Cell]) {
        if let Some(tag) = Tag::of_row(row) {
            self.open(tag);
            return;
        }

        match &mut self.state {
            ScanState::Idle => {}
            ScanState::AwaitingScalarValue(field) => {
                let field = *field;
                let value = row.first().map(Cell::as_text).unwrap_or_default();
                self.assign(field, value);
                self.state = ScanState::Idle;
            }
            ScanState::InList(items) => {
                let first = row.first().map(Cell::as_text).unwrap_or_default();
                if !first.trim().is_empty() {
                    items.push(first);
                }
            }
            ScanState::InKeyValueTable(rows) | ScanState::InZebraTable(rows) => {
                if !is_blank_row(row) {
                    rows.push(row.to_vec());
                }
            }
        }
    }

    /// Flush any open section and return the document.
    pub fn finish(mut self) -> ParsedDocument {
        self.flush();
        log::debug!(
            "parsed document: {} section(s), header {:?}",
            self.document.sections.len(),
            self.document.header
        );
        self.document
    }

    fn open(&mut self, tag: Tag) {
        if let ScanState::AwaitingScalarValue(field) = &self.state {
            log::debug!("{field:?} tag followed directly by a tag row; leaving it unset");
        }
        if let Tag::Unknown(name) = &tag {
            log::debug!("unrecognised tag {name:?}");
        }
        self.flush();
        self.state = ScanState::entering(&tag);
    }

    fn flush(&mut self) {
        let state = std::mem::take(&mut self.state);
        if let Some(data) = state.into_section_data() {
            self.document.sections.push(Section {
                subtitle: std::mem::take(&mut self.pending_subtitle),
                data,
            });
        }
    }

    fn assign(&mut self, field: ScalarField, value: String) {
        let doc = &mut self.document;
        match field {
            ScalarField::Header => doc.header = value,
            ScalarField::Footer => doc.footer = value,
            ScalarField::Title => doc.title = value,
            ScalarField::Code => doc.code = value,
            ScalarField::PowerSupply => doc.power_supply = value,
            ScalarField::Subtitle => self.pending_subtitle = value,
        }
    }
}

/// Parse tagged rows into a document. Never fails.
pub fn parse<R: AsRef<[Cell]>>(rows: &[R]) -> ParsedDocument {
    let mut parser = TagParser::new();
    for row in rows {
        parser.feed(row.as_ref());
    }
    parser.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SectionKind;

    fn rows(data: &[&[&str]]) -> Vec<Row> {
        data.iter()
            .map(|r| r.iter().map(|c| Cell::from(*c)).collect())
            .collect()
    }

    #[test]
    fn tag_names() {
        assert_eq!(Tag::from_name("_list_"), Some(Tag::List));
        assert_eq!(
            Tag::from_name("_foo_"),
            Some(Tag::Unknown("_foo_".to_string()))
        );
        assert_eq!(Tag::from_name("_"), Some(Tag::Unknown("_".to_string())));
        assert_eq!(Tag::from_name("__"), Some(Tag::Unknown("__".to_string())));
        assert_eq!(Tag::from_name(""), None);
        assert_eq!(Tag::from_name("list"), None);
        assert_eq!(Tag::from_name("_list"), None);
    }

    #[test]
    fn state_transitions() {
        let mut p = TagParser::new();
        assert_eq!(p.state(), &ScanState::Idle);
        p.feed(&[Cell::from("_title_")]);
        assert_eq!(
            p.state(),
            &ScanState::AwaitingScalarValue(ScalarField::Title)
        );
        p.feed(&[Cell::from("Lamp")]);
        assert_eq!(p.state(), &ScanState::Idle);
        p.feed(&[Cell::from("_zebraTable_")]);
        p.feed(&[Cell::from("A")]);
        assert_eq!(
            p.state(),
            &ScanState::InZebraTable(vec![vec![Cell::from("A")]])
        );
        let doc = p.finish();
        assert_eq!(doc.title, "Lamp");
        assert_eq!(doc.sections[0].kind(), SectionKind::ZebraTable);
    }

    #[test]
    fn subtitle_attaches_to_next_section_and_resets() {
        let doc = parse(&rows(&[
            &["_subtitle_"],
            &["Features"],
            &["_list_"],
            &["a"],
            &["_list_"],
            &["b"],
        ]));
        assert_eq!(doc.sections.len(), 2);
        assert_eq!(doc.sections[0].subtitle, "Features");
        assert_eq!(doc.sections[1].subtitle, "");
    }

    #[test]
    fn subtitle_survives_empty_section() {
        let doc = parse(&rows(&[
            &["_subtitle_"],
            &["Specs"],
            &["_list_"],
            &["_invisible_table_"],
            &["k", "v"],
        ]));
        assert_eq!(doc.sections.len(), 1);
        assert_eq!(doc.sections[0].subtitle, "Specs");
        assert_eq!(doc.sections[0].kind(), SectionKind::KeyValueTable);
    }

    #[test]
    fn unknown_tag_closes_section() {
        let doc = parse(&rows(&[&["_list_"], &["a"], &["_note_"], &["ignored"]]));
        assert_eq!(doc.sections.len(), 1);
        assert_eq!(doc.sections[0].data, SectionData::List(vec!["a".into()]));
    }

    #[test]
    fn lone_underscore_is_an_unknown_tag() {
        let doc = parse(&rows(&[&["_list_"], &["a"], &["_"], &["b"]]));
        assert_eq!(doc.sections.len(), 1);
        assert_eq!(doc.sections[0].data, SectionData::List(vec!["a".into()]));
    }

    #[test]
    fn list_items_keep_raw_text() {
        let doc = parse(&rows(&[&["_list_"], &["  padded  "], &["   "]]));
        assert_eq!(
            doc.sections[0].data,
            SectionData::List(vec!["  padded  ".into()])
        );
    }

    #[test]
    fn numeric_cells_are_coerced() {
        let doc = parse(&[
            vec![Cell::from("_code_")],
            vec![Cell::Number(4711.0)],
            vec![Cell::from("_list_")],
            vec![Cell::Number(0.5)],
            vec![Cell::Absent, Cell::from("second column only")],
        ]);
        assert_eq!(doc.code, "4711");
        assert_eq!(doc.sections[0].data, SectionData::List(vec!["0.5".into()]));
    }

    #[test]
    fn empty_rows_are_tolerated() {
        let doc = parse(&[vec![], vec![Cell::from("_header_")], vec![]]);
        assert_eq!(doc.header, "");
        assert!(doc.sections.is_empty());
    }
}
