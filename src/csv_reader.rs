// Upload parsing: CSV (or JSON array-of-objects) into a Dataset

use crate::data::Dataset;
use crate::error::UploadError;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Parse CSV text with a header row.
///
/// Ragged rows, an empty input, or a header without data rows are rejected.
pub fn read_csv<R: Read>(reader: R) -> Result<Dataset, UploadError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.to_string()).collect();
    if headers.is_empty() || (headers.len() == 1 && headers[0].is_empty()) {
        return Err(UploadError::Empty);
    }

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record?;
        rows.push(record.iter().map(|f| f.to_string()).collect::<Vec<String>>());
    }

    if rows.is_empty() {
        return Err(UploadError::NoRows);
    }

    Ok(Dataset::new(headers, rows))
}

/// Read an uploaded file; `.json` files are read as an array of objects
pub fn read_upload(path: &Path) -> Result<Dataset, UploadError> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);

    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));

    if is_json {
        let value: serde_json::Value = serde_json::from_reader(reader)?;
        Dataset::from_json(&value)
    } else {
        read_csv(reader)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::ColumnKind;
    use std::io::Write;

    #[test]
    fn test_read_csv_basic() {
        let ds = read_csv("x,y\n1,10\n2,20\n".as_bytes()).unwrap();
        assert_eq!(ds.row_count(), 2);
        assert_eq!(ds.column_names().collect::<Vec<_>>(), vec!["x", "y"]);
        assert_eq!(ds.kind_of("y").unwrap(), ColumnKind::Numeric);
    }

    #[test]
    fn test_read_csv_quoted_fields() {
        let ds = read_csv("name,city\n\"Smith, J\",\"New York\"\n".as_bytes()).unwrap();
        assert_eq!(ds.cells("name").unwrap(), vec!["Smith, J"]);
    }

    #[test]
    fn test_read_csv_trims_headers() {
        let ds = read_csv(" a , b \n1,2\n".as_bytes()).unwrap();
        assert!(ds.column_index("a").is_ok());
        assert!(ds.column_index("b").is_ok());
    }

    #[test]
    fn test_read_csv_empty() {
        let result = read_csv("".as_bytes());
        assert!(matches!(result, Err(UploadError::Empty)));
    }

    #[test]
    fn test_read_csv_header_only() {
        let result = read_csv("x,y\n".as_bytes());
        assert!(matches!(result, Err(UploadError::NoRows)));
    }

    #[test]
    fn test_read_csv_ragged_rows() {
        let result = read_csv("x,y\n1,2\n3\n".as_bytes());
        assert!(matches!(result, Err(UploadError::Csv(_))));
    }

    #[test]
    fn test_read_upload_json() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"[{{"a": 1, "b": "x"}}, {{"a": 2, "b": "y"}}]"#).unwrap();
        let ds = read_upload(file.path()).unwrap();
        assert_eq!(ds.row_count(), 2);
        assert_eq!(ds.kind_of("b").unwrap(), ColumnKind::Categorical);
    }

    #[test]
    fn test_read_upload_json_fixture_column_order() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("test").join("records.json");
        let ds = read_upload(&path).unwrap();
        assert_eq!(ds.column_names().collect::<Vec<_>>(), vec!["team", "score", "name"]);
        assert_eq!(ds.row_count(), 3);
    }

    #[test]
    fn test_read_upload_missing_file() {
        let result = read_upload(Path::new("does/not/exist.csv"));
        assert!(matches!(result, Err(UploadError::Io(_))));
    }
}
