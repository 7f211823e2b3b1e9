use crate::error::{SchemaError, UploadError};
use serde::Serialize;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Inferred classification of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Numeric,
    Categorical,
    Other,
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnKind::Numeric => write!(f, "numeric"),
            ColumnKind::Categorical => write!(f, "categorical"),
            ColumnKind::Other => write!(f, "other"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
}

/// Tokens read as missing values, compared after trimming
const MISSING_TOKENS: [&str; 5] = ["", "NA", "NaN", "null", "N/A"];

pub fn is_missing(cell: &str) -> bool {
    let cell = cell.trim();
    MISSING_TOKENS.iter().any(|t| *t == cell)
}

/// Parse a cell as a number; missing, non-numeric and non-finite cells
/// (`inf`, `1e400`) yield None
pub fn parse_number(cell: &str) -> Option<f64> {
    if is_missing(cell) {
        return None;
    }
    cell.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn is_boolean(cell: &str) -> bool {
    let cell = cell.trim();
    cell.eq_ignore_ascii_case("true") || cell.eq_ignore_ascii_case("false")
}

/// The uploaded table. Immutable once built; replaced wholesale on re-upload.
#[derive(Debug, Clone)]
pub struct Dataset {
    columns: Vec<Column>,
    rows: Vec<Vec<String>>,
}

impl Dataset {
    /// Build a dataset from a header row and data rows.
    ///
    /// Duplicate headers get `.1`, `.2`, ... suffixes and empty headers become
    /// `Unnamed: <position>`, so column names are always unique. Short rows are
    /// padded with missing cells.
    pub fn new(headers: Vec<String>, mut rows: Vec<Vec<String>>) -> Self {
        let names = unique_headers(headers);
        for row in &mut rows {
            row.resize(names.len(), String::new());
        }

        let columns = names
            .into_iter()
            .enumerate()
            .map(|(idx, name)| {
                let kind = infer_kind(rows.iter().map(|r| r[idx].as_str()));
                Column { name, kind }
            })
            .collect();

        Self { columns, rows }
    }

    /// Create a Dataset from a JSON Array of Objects
    pub fn from_json(value: &Value) -> Result<Self, UploadError> {
        let array = value
            .as_array()
            .ok_or_else(|| UploadError::Json("input data must be an array of objects".to_string()))?;

        if array.is_empty() {
            return Err(UploadError::NoRows);
        }

        // Headers come from the first object, in document order
        let first_obj = array[0]
            .as_object()
            .ok_or_else(|| UploadError::Json("items in array must be objects".to_string()))?;

        let headers: Vec<String> = first_obj.keys().cloned().collect();

        let mut rows = Vec::with_capacity(array.len());
        for item in array {
            let obj = item
                .as_object()
                .ok_or_else(|| UploadError::Json("items in array must be objects".to_string()))?;

            let mut row = Vec::with_capacity(headers.len());
            for header in &headers {
                let val_str = match obj.get(header) {
                    Some(Value::String(s)) => s.clone(),
                    Some(Value::Number(n)) => n.to_string(),
                    Some(Value::Bool(b)) => b.to_string(),
                    Some(Value::Null) | None => String::new(),
                    _ => {
                        return Err(UploadError::Json(format!(
                            "unsupported value type for field '{}'",
                            header
                        )))
                    }
                };
                row.push(val_str);
            }
            rows.push(row);
        }

        Ok(Self::new(headers, rows))
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn numeric_columns(&self) -> impl Iterator<Item = &str> {
        self.columns
            .iter()
            .filter(|c| c.kind == ColumnKind::Numeric)
            .map(|c| c.name.as_str())
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn column_index(&self, name: &str) -> Result<usize, SchemaError> {
        self.columns
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| SchemaError(name.to_string()))
    }

    pub fn kind_of(&self, name: &str) -> Result<ColumnKind, SchemaError> {
        let idx = self.column_index(name)?;
        Ok(self.columns[idx].kind)
    }

    /// Raw cells of one column in row order
    pub fn cells(&self, name: &str) -> Result<Vec<&str>, SchemaError> {
        let idx = self.column_index(name)?;
        Ok(self.rows.iter().map(|r| r[idx].as_str()).collect())
    }

    /// One column parsed as numbers, row-aligned; missing cells are None
    pub fn numeric(&self, name: &str) -> Result<Vec<Option<f64>>, SchemaError> {
        let idx = self.column_index(name)?;
        Ok(self.rows.iter().map(|r| parse_number(&r[idx])).collect())
    }
}

fn infer_kind<'a>(cells: impl Iterator<Item = &'a str>) -> ColumnKind {
    let mut seen = false;
    let mut all_numeric = true;
    let mut all_boolean = true;

    for cell in cells.filter(|c| !is_missing(c)) {
        seen = true;
        if all_numeric && cell.trim().parse::<f64>().is_err() {
            all_numeric = false;
        }
        if all_boolean && !is_boolean(cell) {
            all_boolean = false;
        }
    }

    if !seen || all_boolean {
        ColumnKind::Other
    } else if all_numeric {
        ColumnKind::Numeric
    } else {
        ColumnKind::Categorical
    }
}

fn unique_headers(headers: Vec<String>) -> Vec<String> {
    let mut used: HashSet<String> = HashSet::new();
    let mut counters: HashMap<String, usize> = HashMap::new();
    let mut names = Vec::with_capacity(headers.len());

    for (idx, header) in headers.into_iter().enumerate() {
        let header = header.trim().to_string();
        let base = if header.is_empty() {
            format!("Unnamed: {}", idx)
        } else {
            header
        };

        let mut name = base.clone();
        if used.contains(&name) {
            let counter = counters.entry(base.clone()).or_insert(0);
            loop {
                *counter += 1;
                name = format!("{}.{}", base, counter);
                if !used.contains(&name) {
                    break;
                }
            }
        }
        used.insert(name.clone());
        names.push(name);
    }

    names
}
