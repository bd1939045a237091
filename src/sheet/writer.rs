use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use log::{debug, info};
use regex::Regex;
use rust_xlsxwriter::{Format, Workbook};
use serde_json::{Map, Value};

use crate::error::TableError;

const EXTENSION: &str = "xlsx";

// Worksheet limits; row 0 holds the header.
const MAX_COLUMNS: usize = 16_384;
const MAX_ROWS: usize = 1_048_576;

static NON_ALNUM_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9]+").expect("valid regex"));

static CODE_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^\s*```[A-Za-z0-9_-]*\s*\n(.*?)\n?\s*```\s*$").expect("valid regex")
});

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
    Bool(bool),
    Empty,
}

impl Cell {
    fn from_json(v: &Value) -> Self {
        match v {
            Value::Null => Cell::Empty,
            Value::Bool(b) => Cell::Bool(*b),
            Value::Number(n) => n
                .as_f64()
                .map(Cell::Number)
                .unwrap_or_else(|| Cell::Text(n.to_string())),
            Value::String(s) => Cell::Text(s.clone()),
            nested => Cell::Text(nested.to_string()),
        }
    }
}

/// Rows decoded from a service reply, ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    /// Decodes a reply holding either a JSON list of objects or a single
    /// object of scalar values. Columns follow the first row's key order,
    /// with keys first seen in later rows appended.
    pub fn from_reply(reply: &str) -> Result<Self, TableError> {
        let text = strip_code_fence(reply);
        let value: Value = serde_json::from_str(text)?;

        match value {
            Value::Array(items) => {
                if items.is_empty() {
                    return Err(TableError::Empty);
                }
                let objects = items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| item.as_object().ok_or(TableError::NotAnObject(i)))
                    .collect::<Result<Vec<_>, _>>()?;
                Self::from_objects(&objects)
            }
            Value::Object(obj) => {
                if obj.is_empty() {
                    return Err(TableError::Empty);
                }
                if let Some((key, _)) = obj.iter().find(|(_, v)| v.is_array() || v.is_object()) {
                    return Err(TableError::NestedValue(key.clone()));
                }
                Self::from_objects(&[&obj])
            }
            Value::Null => Err(TableError::UnexpectedShape("null")),
            Value::Bool(_) => Err(TableError::UnexpectedShape("boolean")),
            Value::Number(_) => Err(TableError::UnexpectedShape("number")),
            Value::String(_) => Err(TableError::UnexpectedShape("string")),
        }
    }

    fn from_objects(objects: &[&Map<String, Value>]) -> Result<Self, TableError> {
        let mut columns: Vec<String> = Vec::new();
        for obj in objects {
            for key in obj.keys() {
                if !columns.contains(key) {
                    columns.push(key.clone());
                }
            }
        }
        if columns.is_empty() {
            return Err(TableError::Empty);
        }

        let rows = objects
            .iter()
            .map(|obj| {
                columns
                    .iter()
                    .map(|c| obj.get(c).map(Cell::from_json).unwrap_or(Cell::Empty))
                    .collect()
            })
            .collect();

        Ok(Self { columns, rows })
    }
}

/// Drops a surrounding Markdown fence such as ```` ```json ... ``` ````.
fn strip_code_fence(reply: &str) -> &str {
    match CODE_FENCE.captures(reply).and_then(|c| c.get(1)) {
        Some(inner) => inner.as_str(),
        None => reply.trim(),
    }
}

/// Replaces each run of non-alphanumeric characters with one space and
/// trims the result.
pub fn sanitize_subject(subject: &str) -> String {
    let cleaned = NON_ALNUM_RUN.replace_all(subject, " ");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        "untitled".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Writes decoded tables as `.xlsx` files under one results directory.
#[derive(Debug, Clone)]
pub struct TableWriter {
    results_dir: PathBuf,
}

impl TableWriter {
    pub fn new(results_dir: impl Into<PathBuf>) -> Self {
        Self {
            results_dir: results_dir.into(),
        }
    }

    /// `<results_dir>/<sanitized subject>.xlsx`
    pub fn path_for(&self, subject: &str) -> PathBuf {
        self.results_dir
            .join(format!("{}.{EXTENSION}", sanitize_subject(subject)))
    }

    /// Decodes `reply` and writes it, replacing any file of the same name.
    /// Nothing is written when decoding fails.
    pub fn write(&self, reply: &str, subject: &str) -> Result<(PathBuf, usize), TableError> {
        let table = Table::from_reply(reply)?;
        let path = self.path_for(subject);
        self.write_table(&table, &path)?;
        info!("Data saved to {}", path.display());
        Ok((path, table.rows.len()))
    }

    pub fn write_table(&self, table: &Table, path: &Path) -> Result<(), TableError> {
        let too_large = || TableError::TooLarge {
            rows: table.rows.len(),
            columns: table.columns.len(),
        };
        if table.columns.len() > MAX_COLUMNS || table.rows.len() >= MAX_ROWS {
            return Err(too_large());
        }

        fs::create_dir_all(&self.results_dir).map_err(|source| TableError::CreateDir {
            path: self.results_dir.clone(),
            source,
        })?;

        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        let header = Format::new().set_bold();

        for (col, name) in table.columns.iter().enumerate() {
            let col = u16::try_from(col).map_err(|_| too_large())?;
            sheet.write_string_with_format(0, col, name, &header)?;
        }
        for (r, row) in table.rows.iter().enumerate() {
            let excel_row = u32::try_from(r + 1).map_err(|_| too_large())?;
            for (col, cell) in row.iter().enumerate() {
                let col = u16::try_from(col).map_err(|_| too_large())?;
                match cell {
                    Cell::Text(s) => {
                        sheet.write_string(excel_row, col, s)?;
                    }
                    Cell::Number(n) => {
                        sheet.write_number(excel_row, col, *n)?;
                    }
                    Cell::Bool(b) => {
                        sheet.write_boolean(excel_row, col, *b)?;
                    }
                    Cell::Empty => {}
                }
            }
        }

        workbook.save(path)?;
        debug!(
            "wrote {} row(s) x {} column(s) to {}",
            table.rows.len(),
            table.columns.len(),
            path.display()
        );
        Ok(())
    }
}
