//! Stata 114 (`.dta`, Stata 10+) writer, little-endian.
//!
//! Layout: 109-byte header, descriptors (types, names, sort list, formats,
//! value-label names), variable labels, an empty expansion-field list, then
//! the data rows. No value labels are written.

use std::collections::HashSet;
use std::path::Path;

use crate::analysis::export::{io_error, ExportError};
use crate::analysis::table::{ColumnData, Index, Table};

const FORMAT_VERSION: u8 = 114;
const BYTEORDER_LOHI: u8 = 2;
const FILETYPE: u8 = 1;

const TYPE_LONG: u8 = 253;
const TYPE_DOUBLE: u8 = 255;
const MAX_STR_WIDTH: usize = 244;

const NAME_LEN: usize = 33;
const FORMAT_LEN: usize = 49;
const LABEL_LEN: usize = 81;
const TIMESTAMP_LEN: usize = 18;
const MAX_NAME_CHARS: usize = 32;

const MISSING_DOUBLE: u64 = 0x7FE0_0000_0000_0000;
const MISSING_LONG: i32 = 2_147_483_621;
const MAX_LONG: i64 = 2_147_483_620;
const MIN_LONG: i64 = -2_147_483_647;

/// Seconds between 1960-01-01 (Stata's epoch) and 1970-01-01.
const STATA_EPOCH_OFFSET: i64 = 315_619_200;

const DATASET_LABEL: &str = "clusterwatch report";

/// Storage of one variable.
enum Var<'a> {
    /// `%tc` milliseconds since 1960.
    Clock(&'a [i64]),
    Positions(usize),
    Long(&'a [Option<i64>]),
    Double(&'a [Option<f64>]),
    Str(&'a [Option<String>], usize),
}

impl Var<'_> {
    fn type_code(&self) -> u8 {
        match self {
            Var::Clock(_) | Var::Double(_) => TYPE_DOUBLE,
            Var::Positions(_) | Var::Long(_) => TYPE_LONG,
            // str1..str244 are stored as their width.
            Var::Str(_, width) => *width as u8,
        }
    }

    fn display_format(&self) -> String {
        match self {
            Var::Clock(_) => "%tc".to_string(),
            Var::Positions(_) | Var::Long(_) => "%12.0g".to_string(),
            Var::Double(_) => "%10.0g".to_string(),
            Var::Str(_, width) => format!("%{}s", width),
        }
    }

    fn write_cell(&self, row: usize, out: &mut Vec<u8>) {
        match self {
            Var::Clock(v) => {
                let ms = (v[row] + STATA_EPOCH_OFFSET) as f64 * 1000.0;
                out.extend_from_slice(&ms.to_le_bytes());
            }
            Var::Positions(_) => out.extend_from_slice(&(row as i32).to_le_bytes()),
            Var::Long(v) => {
                let x = v[row].map_or(MISSING_LONG, |x| x as i32);
                out.extend_from_slice(&x.to_le_bytes());
            }
            Var::Double(v) => {
                let bits = match v[row] {
                    Some(x) if x.is_finite() => x.to_bits(),
                    _ => MISSING_DOUBLE,
                };
                out.extend_from_slice(&bits.to_le_bytes());
            }
            Var::Str(v, width) => {
                let s = v[row].as_deref().unwrap_or("");
                write_fixed(out, truncate(s, *width), *width);
            }
        }
    }
}

/// Stata variable name: `[A-Za-z_][A-Za-z0-9_]{0,31}`.
pub fn sanitize_name(name: &str) -> String {
    let mut out: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if out.is_empty() || out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out.truncate(MAX_NAME_CHARS);
    out
}

/// Longest prefix of `s` within `max` bytes that ends on a char boundary.
fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// `s` null-padded to exactly `len` bytes.
fn write_fixed(out: &mut Vec<u8>, s: &str, len: usize) {
    let bytes = s.as_bytes();
    let n = bytes.len().min(len);
    out.extend_from_slice(&bytes[..n]);
    out.resize(out.len() + (len - n), 0);
}

/// `s` as a C string in a field of `len` bytes (at most `len - 1` characters).
fn write_cstr(out: &mut Vec<u8>, s: &str, len: usize) {
    write_fixed(out, truncate(s, len - 1), len);
}

fn variables(table: &Table) -> Result<Vec<(String, String, Var<'_>)>, ExportError> {
    let mut vars = Vec::with_capacity(table.columns.len() + 1);
    let index = match &table.index {
        Index::Timestamp(ts) => Var::Clock(ts),
        Index::Range(n) => Var::Positions(*n),
    };
    vars.push((table.index_name.clone(), index));

    for column in &table.columns {
        let var = match &column.data {
            ColumnData::Timestamp(v) => Var::Clock(v),
            ColumnData::Int(v) => {
                if let Some(bad) = v.iter().flatten().find(|x| **x < MIN_LONG || **x > MAX_LONG) {
                    return Err(ExportError::Stata(format!(
                        "value {} in column '{}' does not fit a Stata long",
                        bad, column.name
                    )));
                }
                Var::Long(v)
            }
            ColumnData::Float(v) => Var::Double(v),
            ColumnData::Text(v) => {
                let width = v
                    .iter()
                    .flatten()
                    .map(|s| s.len())
                    .max()
                    .unwrap_or(1)
                    .clamp(1, MAX_STR_WIDTH);
                Var::Str(v, width)
            }
        };
        vars.push((column.name.clone(), var));
    }

    let mut seen = HashSet::new();
    vars.into_iter()
        .map(|(label, var)| {
            let name = sanitize_name(&label);
            if !seen.insert(name.clone()) {
                return Err(ExportError::Stata(format!(
                    "column '{}' maps to duplicate variable name '{}'",
                    label, name
                )));
            }
            Ok((name, label, var))
        })
        .collect()
}

/// Encode a table as a complete `.dta` file.
pub(super) fn encode(table: &Table, timestamp: &str) -> Result<Vec<u8>, ExportError> {
    let vars = variables(table)?;
    let nvar = u16::try_from(vars.len())
        .map_err(|_| ExportError::Stata(format!("too many columns ({})", vars.len())))?;
    let nobs = u32::try_from(table.len())
        .map_err(|_| ExportError::Stata(format!("too many rows ({})", table.len())))?;

    let mut out = Vec::new();

    // Header
    out.extend_from_slice(&[FORMAT_VERSION, BYTEORDER_LOHI, FILETYPE, 0]);
    out.extend_from_slice(&nvar.to_le_bytes());
    out.extend_from_slice(&nobs.to_le_bytes());
    write_cstr(&mut out, DATASET_LABEL, LABEL_LEN);
    write_cstr(&mut out, timestamp, TIMESTAMP_LEN);

    // Descriptors
    out.extend(vars.iter().map(|(_, _, v)| v.type_code()));
    for (name, _, _) in &vars {
        write_cstr(&mut out, name, NAME_LEN);
    }
    out.resize(out.len() + 2 * (vars.len() + 1), 0);
    for (_, _, v) in &vars {
        write_cstr(&mut out, &v.display_format(), FORMAT_LEN);
    }
    for _ in &vars {
        write_cstr(&mut out, "", NAME_LEN);
    }

    // Variable labels
    for (_, label, _) in &vars {
        write_cstr(&mut out, label, LABEL_LEN);
    }

    // Expansion fields: terminator only
    out.extend_from_slice(&[0; 5]);

    // Data
    for row in 0..table.len() {
        for (_, _, v) in &vars {
            v.write_cell(row, &mut out);
        }
    }
    Ok(out)
}

pub(super) fn write_stata(table: &Table, path: &Path) -> Result<(), ExportError> {
    let stamp = chrono::Local::now().format("%d %b %Y %H:%M").to_string();
    let bytes = encode(table, &stamp)?;
    std::fs::write(path, bytes).map_err(io_error(path))?;
    Ok(())
}
