//! Report writers: delimited text and multi-sheet workbooks
//!
//! Both writers take a base column list and rows; dynamic columns are
//! resolved per output unit (the whole file for CSV, each sheet for
//! workbooks) and missing cells render as the sentinel.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use chrono::Local;
use regex::Regex;
use rust_xlsxwriter::Workbook;
use tracing::info;

use crate::error::Result;
use crate::rows::{resolve_columns, Row};
use crate::utils::truncate_chars;

/// Worksheet names are capped at 31 characters by the workbook format.
const SHEET_NAME_MAX: usize = 31;

/// Sheet used when rows carry no partition label.
const DEFAULT_SHEET: &str = "Report";

/// A report that has been written to disk.
#[derive(Debug)]
pub struct WrittenReport {
    pub path: PathBuf,
    pub row_count: usize,
}

/// One worksheet worth of output: a label (sanitized and deduplicated at
/// write time), its base columns, and its rows.
#[derive(Debug, Clone)]
pub struct SheetSpec {
    pub label: String,
    pub base_columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl SheetSpec {
    pub fn new(label: impl Into<String>, base_columns: &[&str], rows: Vec<Row>) -> Self {
        Self {
            label: label.into(),
            base_columns: base_columns.iter().map(|c| c.to_string()).collect(),
            rows,
        }
    }
}

/// `{stem}_{YYYYMMDD_HHMMSS}.{ext}` under `dir`, so runs never overwrite
/// each other.
pub fn timestamped_path(dir: &Path, stem: &str, ext: &str) -> PathBuf {
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    dir.join(format!("{stem}_{timestamp}.{ext}"))
}

/// Fixed path under `dir`, removing any previous run's file first.
pub fn overwrite_path(dir: &Path, file_name: &str) -> Result<PathBuf> {
    let path = dir.join(file_name);
    if path.exists() {
        fs::remove_file(&path)?;
        info!(path = %path.display(), "removed existing report file");
    }
    Ok(path)
}

/// Quote a CSV field when it contains a delimiter, quote, or line break.
pub fn escape_csv(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn csv_line(fields: impl IntoIterator<Item = String>) -> String {
    let mut line = fields.into_iter().collect::<Vec<_>>().join(",");
    line.push('\n');
    line
}

/// Write rows as delimited text: header first, then one line per row, with
/// dynamic columns resolved across all rows and missing cells padded with
/// the sentinel.
pub fn write_csv(path: &Path, base_columns: &[&str], rows: &[Row]) -> Result<WrittenReport> {
    let columns = resolve_columns(base_columns, rows);

    let mut out = String::new();
    out.push_str(&csv_line(columns.iter().map(|c| escape_csv(c))));
    for row in rows {
        out.push_str(&csv_line(
            columns.iter().map(|column| escape_csv(row.get(column))),
        ));
    }

    fs::write(path, out)?;
    Ok(WrittenReport {
        path: path.to_path_buf(),
        row_count: rows.len(),
    })
}

/// Strip the `_account` naming suffix and anything the workbook format
/// rejects, then cap the length.
pub fn sanitize_sheet_name(name: &str) -> String {
    static ACCOUNT_SUFFIX: OnceLock<Regex> = OnceLock::new();
    let re = ACCOUNT_SUFFIX.get_or_init(|| Regex::new(r"(?i)_account$").expect("valid regex"));

    let trimmed = re.replace(name, "");
    let cleaned: String = trimmed
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '[' | ']' => '-',
            other => other,
        })
        .collect();

    truncate_chars(&cleaned, SHEET_NAME_MAX).to_string()
}

/// Resolve a collision-free sheet name, appending `_1`, `_2`, ... while
/// keeping the result within the length cap.
pub fn unique_sheet_name(base: &str, used: &HashSet<String>) -> String {
    if !used.contains(base) {
        return base.to_string();
    }

    let mut suffix = 1usize;
    loop {
        let candidate = format!("{}_{}", truncate_chars(base, SHEET_NAME_MAX - 3), suffix);
        if !used.contains(&candidate) {
            return candidate;
        }
        suffix += 1;
    }
}

/// Write a workbook from explicit sheet specs, in order. An empty spec list
/// still produces a single sheet with a marker row.
pub fn write_sheets(path: &Path, sheets: &[SheetSpec]) -> Result<WrittenReport> {
    let mut workbook = Workbook::new();
    let mut used: HashSet<String> = HashSet::new();
    let mut row_count = 0usize;

    if sheets.is_empty() {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(DEFAULT_SHEET)?;
        worksheet.write_string(0, 0, "No data found")?;
    }

    for sheet in sheets {
        let name = unique_sheet_name(&sanitize_sheet_name(&sheet.label), &used);
        used.insert(name.clone());

        let worksheet = workbook.add_worksheet();
        worksheet.set_name(&name)?;

        let base: Vec<&str> = sheet.base_columns.iter().map(String::as_str).collect();
        let columns = resolve_columns(&base, &sheet.rows);
        for (col, column) in columns.iter().enumerate() {
            worksheet.write_string(0, col as u16, column)?;
        }
        for (idx, row) in sheet.rows.iter().enumerate() {
            for (col, column) in columns.iter().enumerate() {
                worksheet.write_string(idx as u32 + 1, col as u16, row.get(column))?;
            }
        }
        row_count += sheet.rows.len();
    }

    workbook.save(path)?;
    Ok(WrittenReport {
        path: path.to_path_buf(),
        row_count,
    })
}

/// Write rows as a workbook, partitioned by each row's sheet label in
/// first-seen order, with one base column list shared by every sheet.
pub fn write_workbook(path: &Path, base_columns: &[&str], rows: &[Row]) -> Result<WrittenReport> {
    let mut partitions: Vec<SheetSpec> = Vec::new();
    for row in rows {
        let label = row.sheet().unwrap_or(DEFAULT_SHEET);
        match partitions.iter_mut().find(|s| s.label == label) {
            Some(sheet) => sheet.rows.push(row.clone()),
            None => partitions.push(SheetSpec::new(label, base_columns, vec![row.clone()])),
        }
    }

    write_sheets(path, &partitions)
}
