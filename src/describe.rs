use crate::data::{is_missing, Dataset};
use crate::error::SchemaError;
use crate::stats::{mean, pearson, percentile, sample_std, sorted_present, value_counts};
use crate::table::{Cell, Table};

const NUMERIC_ROWS: [&str; 8] = ["count", "mean", "std", "min", "25%", "50%", "75%", "max"];
const OBJECT_ROWS: [&str; 4] = ["count", "unique", "top", "freq"];

/// Summary statistics of the dataset.
///
/// With at least one numeric column, summarises the numeric columns only;
/// otherwise gives count/unique/top/freq for every column. The first output
/// column holds the statistic names and has an empty header.
pub fn describe(dataset: &Dataset) -> Table {
    let numeric: Vec<&str> = dataset.numeric_columns().collect();
    if numeric.is_empty() {
        describe_objects(dataset)
    } else {
        describe_numeric(dataset, &numeric)
    }
}

fn describe_numeric(dataset: &Dataset, columns: &[&str]) -> Table {
    let summaries: Vec<[Cell; 8]> = columns
        .iter()
        .map(|name| {
            // Names come from the dataset itself
            let values = dataset.numeric(name).unwrap_or_default();
            numeric_summary(&sorted_present(&values))
        })
        .collect();

    let mut headers = vec![String::new()];
    headers.extend(columns.iter().map(|c| c.to_string()));
    let mut table = Table::new(headers);

    for (i, stat) in NUMERIC_ROWS.iter().enumerate() {
        let mut row = vec![Cell::Text(stat.to_string())];
        row.extend(summaries.iter().map(|s| s[i].clone()));
        table.rows.push(row);
    }
    table
}

fn numeric_summary(sorted: &[f64]) -> [Cell; 8] {
    let opt = |v: Option<f64>| v.map_or(Cell::Missing, Cell::Number);
    if sorted.is_empty() {
        return [
            Cell::Number(0.0),
            Cell::Missing,
            Cell::Missing,
            Cell::Missing,
            Cell::Missing,
            Cell::Missing,
            Cell::Missing,
            Cell::Missing,
        ];
    }
    [
        Cell::Number(sorted.len() as f64),
        opt(mean(sorted)),
        opt(sample_std(sorted)),
        Cell::Number(sorted[0]),
        Cell::Number(percentile(sorted, 0.25)),
        Cell::Number(percentile(sorted, 0.50)),
        Cell::Number(percentile(sorted, 0.75)),
        Cell::Number(sorted[sorted.len() - 1]),
    ]
}

fn describe_objects(dataset: &Dataset) -> Table {
    let mut headers = vec![String::new()];
    headers.extend(dataset.column_names().map(|c| c.to_string()));

    let summaries: Vec<[Cell; 4]> = dataset
        .column_names()
        .map(|name| {
            let cells = dataset.cells(name).unwrap_or_default();
            let present: Vec<&str> = cells.into_iter().filter(|c| !is_missing(c)).collect();
            let counts = value_counts(present.iter().copied());
            // Ties go to the value seen first
            let top = counts
                .iter()
                .fold(None::<&(String, usize)>, |best, cur| match best {
                    Some(b) if b.1 >= cur.1 => Some(b),
                    _ => Some(cur),
                });
            [
                Cell::Number(present.len() as f64),
                Cell::Number(counts.len() as f64),
                top.map_or(Cell::Missing, |t| Cell::Text(t.0.clone())),
                top.map_or(Cell::Missing, |t| Cell::Number(t.1 as f64)),
            ]
        })
        .collect();

    let mut table = Table::new(headers);
    for (i, stat) in OBJECT_ROWS.iter().enumerate() {
        let mut row = vec![Cell::Text(stat.to_string())];
        row.extend(summaries.iter().map(|s| s[i].clone()));
        table.rows.push(row);
    }
    table
}

/// Pairwise Pearson correlations between `columns`, in the given order.
/// Undefined coefficients (constant or near-empty columns) are `None`.
pub fn correlation_matrix(dataset: &Dataset, columns: &[String]) -> Result<Vec<Vec<Option<f64>>>, SchemaError> {
    let data = columns
        .iter()
        .map(|c| dataset.numeric(c))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(data
        .iter()
        .map(|a| data.iter().map(|b| pearson(a, b)).collect())
        .collect())
}
