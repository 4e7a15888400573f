//! Document model – the values shared by the parser and both renderers.
//!
//! A [`ParsedDocument`] is built once per parse and never mutated afterwards;
//! renderers only ever borrow it.

use serde::{Deserialize, Serialize};

/// One spreadsheet cell as extracted from the first worksheet.
///
/// Deserialises from plain JSON scalars: strings, numbers, booleans and
/// `null` (absent).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    #[default]
    Absent,
    Boolean(bool),
    Number(f64),
    Text(String),
}

/// An ordered sequence of cells. Rows are ragged: lengths vary.
pub type Row = Vec<Cell>;

impl Cell {
    /// Coerce the cell to text the way a spreadsheet would display it.
    pub fn as_text(&self) -> String {
        match self {
            Cell::Absent => String::new(),
            Cell::Boolean(b) => b.to_string(),
            Cell::Number(n) => format_number(*n),
            Cell::Text(s) => s.clone(),
        }
    }

    /// Absent, or a string containing only whitespace.
    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Absent => true,
            Cell::Text(s) => s.trim().is_empty(),
            Cell::Boolean(_) | Cell::Number(_) => false,
        }
    }

    /// A number strictly between 0 and 1 is a percentage.
    pub fn as_percentage(&self) -> Option<i64> {
        match self {
            Cell::Number(v) if *v > 0.0 && *v < 1.0 => Some((v * 100.0).round() as i64),
            _ => None,
        }
    }

    /// Text shown in a table cell: percentages as `NN %`, everything else
    /// coerced with [`Cell::as_text`].
    pub fn display_text(&self) -> String {
        match self.as_percentage() {
            Some(pct) => format!("{pct} %"),
            None => self.as_text(),
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Cell::Text(s)
    }
}

impl From<f64> for Cell {
    fn from(n: f64) -> Self {
        Cell::Number(n)
    }
}

impl From<bool> for Cell {
    fn from(b: bool) -> Self {
        Cell::Boolean(b)
    }
}

impl<T: Into<Cell>> From<Option<T>> for Cell {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Cell::Absent)
    }
}

/// Shortest round-trip rendering: `3` rather than `3.0`. Magnitudes of
/// 1e21 and above, or below 1e-6, use exponent form with a signed exponent
/// (`1e+21`, `1.5e-7`).
fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n == 0.0 {
        // Covers -0.0 as well.
        "0".to_string()
    } else if n.abs() >= 1e21 || n.abs() < 1e-6 {
        let exp = format!("{n:e}");
        match exp.split_once('e') {
            Some((mantissa, power)) if !power.starts_with('-') => format!("{mantissa}e+{power}"),
            _ => exp,
        }
    } else {
        format!("{n}")
    }
}

/// True when every cell of the row is blank (an empty row included).
pub fn is_blank_row(row: &[Cell]) -> bool {
    row.iter().all(Cell::is_blank)
}

/// The body kinds a section can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    List,
    KeyValueTable,
    ZebraTable,
}

/// Section body; the variant determines the [`SectionKind`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionData {
    /// Non-blank items, stored untrimmed.
    List(Vec<String>),
    /// Rows with at least one non-blank cell.
    KeyValueTable(Vec<Row>),
    /// Rows with at least one non-blank cell; `data[0]` is the header row.
    ZebraTable(Vec<Row>),
}

/// A contiguous run of list or table data with its optional subtitle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    #[serde(default)]
    pub subtitle: String,
    pub data: SectionData,
}

impl Section {
    pub fn kind(&self) -> SectionKind {
        match self.data {
            SectionData::List(_) => SectionKind::List,
            SectionData::KeyValueTable(_) => SectionKind::KeyValueTable,
            SectionData::ZebraTable(_) => SectionKind::ZebraTable,
        }
    }

    /// Number of items or rows in the section body.
    pub fn len(&self) -> usize {
        match &self.data {
            SectionData::List(items) => items.len(),
            SectionData::KeyValueTable(rows) | SectionData::ZebraTable(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The structured product data sheet recovered from tagged rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedDocument {
    pub header: String,
    pub footer: String,
    pub title: String,
    pub code: String,
    pub power_supply: String,
    pub sections: Vec<Section>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_coerce_without_trailing_zero() {
        assert_eq!(Cell::Number(3.0).as_text(), "3");
        assert_eq!(Cell::Number(2.5).as_text(), "2.5");
        assert_eq!(Cell::Number(-0.0).as_text(), "0");
        assert_eq!(Cell::Number(f64::INFINITY).as_text(), "Infinity");
    }

    #[test]
    fn extreme_numbers_use_exponent_form() {
        assert_eq!(Cell::Number(1e21).as_text(), "1e+21");
        assert_eq!(Cell::Number(-2.5e22).as_text(), "-2.5e+22");
        assert_eq!(Cell::Number(1.5e-7).as_text(), "1.5e-7");
        assert_eq!(Cell::Number(1e20).as_text(), "100000000000000000000");
        assert_eq!(Cell::Number(0.000001).as_text(), "0.000001");
    }

    #[test]
    fn blankness() {
        assert!(Cell::Absent.is_blank());
        assert!(Cell::from("   ").is_blank());
        assert!(!Cell::Number(0.0).is_blank());
        assert!(!Cell::Boolean(false).is_blank());
        assert!(is_blank_row(&[]));
        assert!(is_blank_row(&[Cell::Absent, Cell::from("\t")]));
        assert!(!is_blank_row(&[Cell::Absent, Cell::from("x")]));
    }

    #[test]
    fn percentages() {
        assert_eq!(Cell::Number(0.5).display_text(), "50 %");
        assert_eq!(Cell::Number(0.125).display_text(), "13 %");
        assert_eq!(Cell::Number(1.0).display_text(), "1");
        assert_eq!(Cell::Number(0.0).display_text(), "0");
        assert_eq!(Cell::from("0.5").display_text(), "0.5");
    }

    #[test]
    fn cells_deserialise_from_json_scalars() {
        let row: Row = serde_json::from_str(r#"["a", 1.5, true, null]"#).unwrap();
        assert_eq!(
            row,
            vec![
                Cell::from("a"),
                Cell::Number(1.5),
                Cell::Boolean(true),
                Cell::Absent
            ]
        );
    }
}
