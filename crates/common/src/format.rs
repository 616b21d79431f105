//! Result serialization selected by a query link's file extension
//!
//! Html and Xml are routed but currently render exactly like Text.

use crate::client::{Datum, Row, RowSet};
use crate::path;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Csv,
    Json,
    Html,
    Xml,
}

impl OutputFormat {
    /// Format for a file path; unknown or missing extensions are Text
    pub fn from_path(file: &str) -> Self {
        match path::extension(file) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => OutputFormat::Csv,
            Some(ext) if ext.eq_ignore_ascii_case("json") => OutputFormat::Json,
            Some(ext) if ext.eq_ignore_ascii_case("html") => OutputFormat::Html,
            Some(ext) if ext.eq_ignore_ascii_case("xml") => OutputFormat::Xml,
            _ => OutputFormat::Text,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Text => "text",
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
            OutputFormat::Html => "html",
            OutputFormat::Xml => "xml",
        }
    }

    pub fn header(&self) -> &'static str {
        match self {
            OutputFormat::Json => "[",
            _ => "",
        }
    }

    pub fn footer(&self) -> &'static str {
        match self {
            OutputFormat::Json => "]\n",
            _ => "",
        }
    }

    pub fn row_start(&self) -> &'static str {
        match self {
            OutputFormat::Json => "[",
            _ => "",
        }
    }

    pub fn row_end(&self) -> &'static str {
        match self {
            OutputFormat::Json => "]",
            _ => "\n",
        }
    }

    /// Emitted between two consecutive rows
    pub fn row_separator(&self) -> &'static str {
        match self {
            OutputFormat::Json => ",",
            _ => "",
        }
    }

    /// Emitted between two present values of a row
    pub fn separator(&self) -> &'static str {
        match self {
            OutputFormat::Csv | OutputFormat::Json => ",",
            _ => " ",
        }
    }

    pub fn escape_datum(&self, datum: &Datum) -> String {
        let raw = match datum {
            Datum::Number(n) => return n.clone(),
            Datum::Text(s) => s,
        };

        match self {
            OutputFormat::Csv => format!("\"{}\"", raw.replace('"', "\"\"")),
            // escapes backslashes and control characters too
            OutputFormat::Json => serde_json::Value::from(raw.as_str()).to_string(),
            OutputFormat::Text | OutputFormat::Html | OutputFormat::Xml => raw.clone(),
        }
    }

    /// Append one row; NULL cells produce no token and no separator
    pub fn write_row(&self, row: &Row, out: &mut String) {
        out.push_str(self.row_start());
        let mut present = row.iter().flatten();
        if let Some(first) = present.next() {
            out.push_str(&self.escape_datum(first));
            for datum in present {
                out.push_str(self.separator());
                out.push_str(&self.escape_datum(datum));
            }
        }
        out.push_str(self.row_end());
    }

    /// Drain a row set into the complete formatted result
    pub fn render(&self, rows: &mut RowSet) -> Vec<u8> {
        let mut out = String::new();

        if *self == OutputFormat::Csv {
            out.push_str(&rows.columns().join(self.separator()));
            out.push('\n');
        } else {
            out.push_str(self.header());
        }

        let mut first = true;
        while let Some(row) = rows.next_row() {
            if !first {
                out.push_str(self.row_separator());
            }
            first = false;
            self.write_row(&row, &mut out);
        }

        out.push_str(self.footer());
        out.into_bytes()
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
