use std::fmt;

// ---------------------------------------------------------------------------
// CellValue – a single spreadsheet cell
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value as produced by the spreadsheet codec.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Bool(bool),
    /// Blank cell. Rendered as the literal `NULL`.
    Null,
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Guess a typed value from a text field (CSV import).
    ///
    /// Empty → Null. A field becomes a Number or Bool only when it is exactly
    /// how that value displays, so `"00123"`, `"1e3"` or `"TRUE"` stay text.
    pub fn infer(s: &str) -> Self {
        match s {
            "" => return CellValue::Null,
            "true" => return CellValue::Bool(true),
            "false" => return CellValue::Bool(false),
            _ => {}
        }
        if let Ok(n) = s.parse::<f64>() {
            let number = CellValue::Number(n);
            if n.is_finite() && number.to_string() == s {
                return number;
            }
        }
        CellValue::Text(s.to_string())
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => write!(f, "{s}"),
            // Integral values print without decimals, like the sheet shows them.
            CellValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                write!(f, "{}", *n as i64)
            }
            CellValue::Number(n) => write!(f, "{n}"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Null => write!(f, "NULL"),
        }
    }
}

// ---------------------------------------------------------------------------
// Row – one record of the sheet
// ---------------------------------------------------------------------------

/// One data row, aligned with [`Dataset::columns`].
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub cells: Vec<CellValue>,
}

impl Row {
    pub fn new(cells: Vec<CellValue>) -> Self {
        Row { cells }
    }
}

// ---------------------------------------------------------------------------
// Dataset – the complete loaded sheet
// ---------------------------------------------------------------------------

/// The first sheet of a loaded workbook. Immutable once built; a new load or
/// a new filter produces a new value instead of editing this one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    /// Header names in display order.
    pub columns: Vec<String>,
    /// All rows, each holding exactly `columns.len()` cells.
    pub rows: Vec<Row>,
}

impl Dataset {
    /// Build a dataset, padding or truncating rows to the header width.
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.cells.resize(width, CellValue::Null);
                row
            })
            .collect();
        Dataset { columns, rows }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the dataset has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column in the header, if it exists.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Materialise the given rows (in the given order) as a new dataset.
    pub fn subset(&self, indices: &[usize]) -> Dataset {
        Dataset {
            columns: self.columns.clone(),
            rows: indices
                .iter()
                .filter_map(|&i| self.rows.get(i).cloned())
                .collect(),
        }
    }
}
