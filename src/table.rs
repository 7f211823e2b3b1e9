// Derived tables: describe, groupby and pivot results

use anyhow::{Context, Result};
use serde::Serialize;
use std::fmt;
use std::io::Write;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Number(f64),
    Text(String),
    Missing,
}

impl Cell {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Number(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Number(v) => write!(f, "{}", v),
            Cell::Text(s) => f.write_str(s),
            Cell::Missing => Ok(()),
        }
    }
}

/// A computed table; never stored on the session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Cells of one column, by header name
    pub fn column(&self, name: &str) -> Option<Vec<&Cell>> {
        let idx = self.headers.iter().position(|h| h == name)?;
        Some(self.rows.iter().map(|r| &r[idx]).collect())
    }

    /// The row whose first cell displays as `key`
    pub fn row(&self, key: &str) -> Option<&[Cell]> {
        self.rows
            .iter()
            .find(|r| r.first().is_some_and(|c| c.to_string() == key))
            .map(|r| r.as_slice())
    }

    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(&self.headers)
            .context("Failed to write table header")?;
        for row in &self.rows {
            wtr.write_record(row.iter().map(|c| c.to_string()))
                .context("Failed to write table row")?;
        }
        wtr.flush().context("Failed to flush table output")?;
        Ok(())
    }

    /// Array of objects keyed by header, the same shape accepted on upload
    pub fn to_json(&self) -> serde_json::Value {
        let records = self
            .rows
            .iter()
            .map(|row| {
                let obj: serde_json::Map<String, serde_json::Value> = self
                    .headers
                    .iter()
                    .zip(row)
                    .map(|(h, c)| {
                        let v = match c {
                            Cell::Number(n) => serde_json::Number::from_f64(*n)
                                .map(serde_json::Value::Number)
                                .unwrap_or(serde_json::Value::Null),
                            Cell::Text(s) => serde_json::Value::String(s.clone()),
                            Cell::Missing => serde_json::Value::Null,
                        };
                        (h.clone(), v)
                    })
                    .collect();
                serde_json::Value::Object(obj)
            })
            .collect();
        serde_json::Value::Array(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_table() -> Table {
        Table {
            headers: vec!["key".to_string(), "value".to_string()],
            rows: vec![
                vec![Cell::Text("a".to_string()), Cell::Number(1.5)],
                vec![Cell::Text("b, c".to_string()), Cell::Missing],
            ],
        }
    }

    #[test]
    fn test_cell_display() {
        assert_eq!(Cell::Number(3.0).to_string(), "3");
        assert_eq!(Cell::Number(2.25).to_string(), "2.25");
        assert_eq!(Cell::Missing.to_string(), "");
    }

    #[test]
    fn test_write_csv_quotes() {
        let mut out = Vec::new();
        make_table().write_csv(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "key,value\na,1.5\n\"b, c\",\n");
    }

    #[test]
    fn test_to_json_nulls() {
        let json = make_table().to_json();
        assert_eq!(json[0]["value"], serde_json::json!(1.5));
        assert!(json[1]["value"].is_null());
    }

    #[test]
    fn test_row_lookup() {
        let table = make_table();
        assert_eq!(table.row("a").unwrap()[1], Cell::Number(1.5));
        assert!(table.row("z").is_none());
        assert_eq!(table.column("value").unwrap().len(), 2);
    }
}
