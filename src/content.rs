//! Content view – every *data* decision the renderers share.
//!
//! Both backends paint a [`SheetView`] rather than the raw document, so
//! blank-row filtering, zebra column counting, cell padding and percentage
//! formatting happen exactly once. Backends only decide *how* to paint.

use crate::model::{is_blank_row, Cell, ParsedDocument, Row, SectionData};

#[derive(Debug, Clone, PartialEq)]
pub struct SheetView {
    pub header: String,
    pub title: String,
    pub code: String,
    pub power_supply: String,
    pub footer: String,
    pub sections: Vec<SectionView>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SectionView {
    pub subtitle: String,
    pub body: SectionBody,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SectionBody {
    List(Vec<String>),
    /// Key/value pairs; missing cells are `""`.
    KeyValue(Vec<[String; 2]>),
    Zebra(ZebraTable),
}

/// A striped table. `rows[0]` is the header row; every row has exactly
/// `columns` cells.
#[derive(Debug, Clone, PartialEq)]
pub struct ZebraTable {
    pub columns: usize,
    pub rows: Vec<Vec<String>>,
}

impl ZebraTable {
    pub fn header(&self) -> Option<&[String]> {
        self.rows.first().map(Vec::as_slice)
    }

    pub fn body(&self) -> &[Vec<String>] {
        self.rows.get(1..).unwrap_or(&[])
    }

    /// Even column indices are shaded.
    pub fn is_shaded(column: usize) -> bool {
        column % 2 == 0
    }
}

impl SheetView {
    pub fn from_document(doc: &ParsedDocument) -> Self {
        Self {
            header: doc.header.clone(),
            title: doc.title.clone(),
            code: doc.code.clone(),
            power_supply: doc.power_supply.clone(),
            footer: doc.footer.clone(),
            sections: doc
                .sections
                .iter()
                .map(|s| SectionView {
                    subtitle: s.subtitle.clone(),
                    body: SectionBody::from_data(&s.data),
                })
                .collect(),
        }
    }
}

impl SectionBody {
    fn from_data(data: &SectionData) -> Self {
        match data {
            SectionData::List(items) => SectionBody::List(items.clone()),
            SectionData::KeyValueTable(rows) => SectionBody::KeyValue(key_value_rows(rows)),
            SectionData::ZebraTable(rows) => SectionBody::Zebra(zebra_table(rows)),
        }
    }

    /// Every text item of the body in reading order.
    pub fn texts(&self) -> Vec<&str> {
        match self {
            SectionBody::List(items) => items.iter().map(String::as_str).collect(),
            SectionBody::KeyValue(pairs) => pairs
                .iter()
                .flat_map(|p| p.iter().map(String::as_str))
                .collect(),
            SectionBody::Zebra(table) => table
                .rows
                .iter()
                .flat_map(|r| r.iter().map(String::as_str))
                .collect(),
        }
    }
}

fn cell_text(row: &[Cell], index: usize) -> String {
    row.get(index).map(Cell::display_text).unwrap_or_default()
}

/// Any row with a non-blank cell is shown as a key/value pair; cells past
/// the second are ignored and a missing cell reads as "".
fn key_value_rows(rows: &[Row]) -> Vec<[String; 2]> {
    rows.iter()
        .filter(|row| !is_blank_row(row))
        .map(|row| [cell_text(row, 0), cell_text(row, 1)])
        .collect()
}

/// Column count is the number of non-blank header cells; every row is cut
/// (or padded) to that width.
fn zebra_table(rows: &[Row]) -> ZebraTable {
    let columns = rows
        .first()
        .map(|header| header.iter().filter(|c| !c.is_blank()).count())
        .unwrap_or(0);
    let rows = rows
        .iter()
        .filter(|row| !is_blank_row(row))
        .map(|row| (0..columns).map(|i| cell_text(row, i)).collect())
        .collect();
    ZebraTable { columns, rows }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Section;

    #[test]
    fn zebra_columns_follow_header() {
        let rows = vec![
            vec![Cell::from("A"), Cell::Absent, Cell::from("B"), Cell::from("C")],
            vec![
                Cell::from("1"),
                Cell::Number(0.5),
                Cell::from("3"),
                Cell::from("4"),
                Cell::from("5"),
            ],
            vec![Cell::from("x")],
        ];
        let table = zebra_table(&rows);
        assert_eq!(table.columns, 3);
        assert_eq!(table.rows[0], vec!["A", "", "B"]);
        assert_eq!(table.rows[1], vec!["1", "50 %", "3"]);
        assert_eq!(table.rows[2], vec!["x", "", ""]);
        assert_eq!(table.body().len(), 2);
    }

    #[test]
    fn key_value_pads_missing_cells() {
        let rows = vec![
            vec![Cell::from("Voltage")],
            vec![Cell::Absent, Cell::from("v")],
            vec![Cell::Absent, Cell::Absent],
        ];
        assert_eq!(
            key_value_rows(&rows),
            vec![
                ["Voltage".to_string(), String::new()],
                [String::new(), "v".to_string()]
            ]
        );
    }

    #[test]
    fn key_value_keeps_rows_with_text_past_the_value() {
        let rows = vec![
            vec![Cell::Absent, Cell::from(""), Cell::from("note")],
            vec![Cell::from("k"), Cell::from("v")],
        ];
        assert_eq!(
            key_value_rows(&rows),
            vec![
                [String::new(), String::new()],
                ["k".to_string(), "v".to_string()]
            ]
        );
    }

    #[test]
    fn view_preserves_section_order() {
        let doc = ParsedDocument {
            sections: vec![
                Section {
                    subtitle: "one".into(),
                    data: SectionData::List(vec!["a".into()]),
                },
                Section {
                    subtitle: "two".into(),
                    data: SectionData::KeyValueTable(vec![vec![Cell::from("k")]]),
                },
            ],
            ..ParsedDocument::default()
        };
        let view = SheetView::from_document(&doc);
        let subtitles: Vec<_> = view.sections.iter().map(|s| s.subtitle.as_str()).collect();
        assert_eq!(subtitles, ["one", "two"]);
        assert_eq!(view.sections[1].body.texts(), ["k", ""]);
    }
}
