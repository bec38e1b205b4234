//! Aggregated feature table with CSV persistence.
//!
//! Rows are keyed by canonical filename. Columns follow the feature schema on
//! first write; merging an existing table keeps its columns and appends any
//! new ones.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use tracing::debug;

use super::record::MetricRecord;
use super::schema::FeatureSchema;
use crate::error::{AnalysisError, Result};

const FILENAME_COLUMN: &str = "filename";
const NULL_TOKENS: [&str; 4] = ["", "nan", "NaN", "None"];

#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    pub filename: String,
    pub values: Vec<Option<f64>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureTable {
    columns: Vec<String>,
    rows: Vec<TableRow>,
}

impl FeatureTable {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// One row per record in schema order. A filename seen twice keeps its
    /// last record.
    pub fn from_records<'a, I>(schema: &FeatureSchema, records: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a MetricRecord)>,
    {
        let mut table = Self::new(schema.names().to_vec());
        for (filename, record) in records {
            table.upsert(TableRow {
                filename: filename.to_string(),
                values: schema.row(record),
            });
        }
        table
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[TableRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn filenames(&self) -> Vec<&str> {
        self.rows.iter().map(|row| row.filename.as_str()).collect()
    }

    /// `None` when the row or column is absent; `Some(None)` for a null cell.
    pub fn get(&self, filename: &str, column: &str) -> Option<Option<f64>> {
        let col = self.columns.iter().position(|name| name == column)?;
        let row = self.rows.iter().find(|row| row.filename == filename)?;
        Some(row.values[col])
    }

    fn upsert(&mut self, row: TableRow) {
        self.rows.retain(|existing| existing.filename != row.filename);
        self.rows.push(row);
    }

    /// Union of columns; rows of `newer` replace rows of `self` with the same
    /// filename and are appended after the surviving old rows.
    pub fn merge(self, newer: FeatureTable) -> FeatureTable {
        let mut columns = self.columns.clone();
        for column in &newer.columns {
            if !columns.contains(column) {
                columns.push(column.clone());
            }
        }

        let replaced: std::collections::HashSet<&str> =
            newer.rows.iter().map(|row| row.filename.as_str()).collect();
        let mut rows: Vec<TableRow> = self
            .rows
            .iter()
            .filter(|row| !replaced.contains(row.filename.as_str()))
            .map(|row| reproject(row, &self.columns, &columns))
            .collect();
        rows.extend(newer.rows.iter().map(|row| reproject(row, &newer.columns, &columns)));

        FeatureTable { columns, rows }
    }

    pub fn to_csv(&self) -> String {
        let mut out = String::new();
        let header: Vec<String> = std::iter::once(FILENAME_COLUMN)
            .chain(self.columns.iter().map(String::as_str))
            .map(quote)
            .collect();
        out.push_str(&header.join(","));
        out.push('\n');
        for row in &self.rows {
            let mut cells = vec![quote(&row.filename)];
            cells.extend(row.values.iter().map(|value| match value {
                Some(v) if v.is_finite() => v.to_string(),
                _ => String::new(),
            }));
            out.push_str(&cells.join(","));
            out.push('\n');
        }
        out
    }

    pub fn from_csv(text: &str) -> Result<Self> {
        let mut lines = text.lines().filter(|line| !line.trim().is_empty());
        let Some(header) = lines.next() else {
            return Ok(Self::default());
        };
        let header = split_record(header)?;
        let Some((first, columns)) = header.split_first() else {
            return Err(AnalysisError::Table("empty header".into()));
        };
        if first != FILENAME_COLUMN {
            return Err(AnalysisError::Table(format!(
                "first column must be {FILENAME_COLUMN}, found {first:?}"
            )));
        }

        let mut table = Self::new(columns.to_vec());
        for (line_no, line) in lines.enumerate() {
            let cells = split_record(line)?;
            if cells.len() != header.len() {
                return Err(AnalysisError::Table(format!(
                    "row {} has {} cells, expected {}",
                    line_no + 2,
                    cells.len(),
                    header.len()
                )));
            }
            let values = cells[1..]
                .iter()
                .map(|cell| parse_cell(cell))
                .collect::<Result<Vec<_>>>()?;
            table.upsert(TableRow {
                filename: cells[0].clone(),
                values,
            });
        }
        Ok(table)
    }

    /// Missing file reads as an empty table.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path)?;
        Self::from_csv(&text)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_csv())?;
        debug!(path = %path.display(), rows = self.rows.len(), "wrote feature table");
        Ok(())
    }
}

fn reproject(row: &TableRow, from: &[String], to: &[String]) -> TableRow {
    let index: HashMap<&str, usize> = from
        .iter()
        .enumerate()
        .map(|(idx, name)| (name.as_str(), idx))
        .collect();
    let values = to
        .iter()
        .map(|name| index.get(name.as_str()).and_then(|&idx| row.values[idx]))
        .collect();
    TableRow {
        filename: row.filename.clone(),
        values,
    }
}

fn parse_cell(cell: &str) -> Result<Option<f64>> {
    let trimmed = cell.trim();
    if NULL_TOKENS.contains(&trimmed) {
        return Ok(None);
    }
    let value: f64 = trimmed
        .parse()
        .map_err(|_| AnalysisError::Table(format!("not a number: {trimmed:?}")))?;
    Ok(value.is_finite().then_some(value))
}

fn quote(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn split_record(line: &str) -> Result<Vec<String>> {
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();
    while let Some(ch) = chars.next() {
        match (ch, in_quotes) {
            ('"', true) if chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            ('"', true) => in_quotes = false,
            ('"', false) if current.is_empty() => in_quotes = true,
            (',', false) => cells.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    if in_quotes {
        return Err(AnalysisError::Table(format!("unterminated quote in {line:?}")));
    }
    cells.push(current);
    Ok(cells)
}
