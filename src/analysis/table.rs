//! In-memory result table of the report pipeline.

/// Name of the index column in every export.
pub const INDEX_NAME: &str = "time_utc";

/// Row labels of a table.
#[derive(Debug, Clone, PartialEq)]
pub enum Index {
    /// Unix epoch seconds, ascending and unique (wide form).
    Timestamp(Vec<i64>),
    /// Positional labels `0..n` (long form).
    Range(usize),
}

impl Index {
    pub fn len(&self) -> usize {
        match self {
            Index::Timestamp(ts) => ts.len(),
            Index::Range(n) => *n,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Column values. `None` marks an absent cell.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    /// Unix epoch seconds.
    Timestamp(Vec<i64>),
    Int(Vec<Option<i64>>),
    Float(Vec<Option<f64>>),
    Text(Vec<Option<String>>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Timestamp(v) => v.len(),
            ColumnData::Int(v) => v.len(),
            ColumnData::Float(v) => v.len(),
            ColumnData::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Values as floats, for numeric columns only.
    pub fn numeric(&self) -> Option<Vec<Option<f64>>> {
        match self {
            ColumnData::Int(v) => Some(v.iter().map(|x| x.map(|i| i as f64)).collect()),
            ColumnData::Float(v) => Some(v.clone()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

impl Column {
    pub fn new(name: impl Into<String>, data: ColumnData) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }
}

/// A column-oriented table with a named index.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub index_name: String,
    pub index: Index,
    pub columns: Vec<Column>,
}

impl Table {
    pub fn new(index: Index, columns: Vec<Column>) -> Self {
        Self {
            index_name: INDEX_NAME.to_string(),
            index,
            columns,
        }
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// A single float cell, `None` when absent or not a float column.
    pub fn float_at(&self, column: &str, row: usize) -> Option<f64> {
        match &self.column(column)?.data {
            ColumnData::Float(v) => v.get(row).copied().flatten(),
            _ => None,
        }
    }
}
