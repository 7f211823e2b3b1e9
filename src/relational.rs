// Groupby and pivot over the uploaded dataset

use crate::data::{is_missing, parse_number, ColumnKind, Dataset};
use crate::error::{AggregationError, RelationalError};
use crate::table::{Cell, Table};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggFunc {
    Mean,
    Sum,
    Count,
    Min,
    Max,
}

impl AggFunc {
    pub const ALL: [AggFunc; 5] = [AggFunc::Mean, AggFunc::Sum, AggFunc::Count, AggFunc::Min, AggFunc::Max];

    pub fn name(self) -> &'static str {
        match self {
            AggFunc::Mean => "mean",
            AggFunc::Sum => "sum",
            AggFunc::Count => "count",
            AggFunc::Min => "min",
            AggFunc::Max => "max",
        }
    }
}

impl fmt::Display for AggFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AggFunc {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AggFunc::ALL
            .iter()
            .copied()
            .find(|a| a.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown aggregation function '{}'", s))
    }
}

/// A relational operation chosen by the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelationalOp {
    Groupby {
        column: String,
        func: AggFunc,
    },
    /// Always aggregated by mean
    Pivot {
        index: String,
        columns: String,
        values: String,
    },
}

impl RelationalOp {
    pub fn apply(&self, dataset: &Dataset) -> Result<Table, RelationalError> {
        match self {
            RelationalOp::Groupby { column, func } => groupby(dataset, column, *func),
            RelationalOp::Pivot {
                index,
                columns,
                values,
            } => pivot(dataset, index, columns, values),
        }
    }
}

/// Group rows by `column` and aggregate with `func`.
///
/// A categorical (or other) grouping column aggregates only itself, giving a
/// two-column table of key and aggregate. A numeric grouping column aggregates
/// every other column. Missing keys are dropped and keys are sorted.
pub fn groupby(dataset: &Dataset, column: &str, func: AggFunc) -> Result<Table, RelationalError> {
    let key_idx = dataset.column_index(column)?;
    let key_kind = dataset.columns()[key_idx].kind;
    let groups = group_rows(dataset, key_idx, key_kind);

    debug!(column, func = %func, groups = groups.len(), "groupby");

    if key_kind != ColumnKind::Numeric {
        let mut table = Table::new(vec![column.to_string(), format!("{}_{}", column, func)]);
        for (key, rows) in &groups {
            let cells: Vec<&str> = rows.iter().map(|&r| dataset.rows()[r][key_idx].as_str()).collect();
            let value = aggregate(func, column, key_kind, &cells)?;
            table.rows.push(vec![key.clone(), value]);
        }
        return Ok(table);
    }

    let targets: Vec<(usize, &str, ColumnKind)> = dataset
        .columns()
        .iter()
        .enumerate()
        .filter(|(idx, _)| *idx != key_idx)
        .map(|(idx, c)| (idx, c.name.as_str(), c.kind))
        .collect();

    let mut headers = vec![column.to_string()];
    headers.extend(targets.iter().map(|(_, name, _)| name.to_string()));
    let mut table = Table::new(headers);

    for (key, rows) in &groups {
        let mut out = Vec::with_capacity(targets.len() + 1);
        out.push(key.clone());
        for &(idx, name, kind) in &targets {
            let cells: Vec<&str> = rows.iter().map(|&r| dataset.rows()[r][idx].as_str()).collect();
            out.push(aggregate(func, name, kind, &cells)?);
        }
        table.rows.push(out);
    }

    Ok(table)
}

/// Pivot table aggregated by mean: one row per `index` value, one column per
/// `columns` value. Rows and columns with no values at all are dropped.
pub fn pivot(
    dataset: &Dataset,
    index: &str,
    columns: &str,
    values: &str,
) -> Result<Table, RelationalError> {
    let index_idx = dataset.column_index(index)?;
    let columns_idx = dataset.column_index(columns)?;
    let values_idx = dataset.column_index(values)?;

    let values_kind = dataset.columns()[values_idx].kind;
    if values_kind != ColumnKind::Numeric {
        return Err(AggregationError {
            func: AggFunc::Mean,
            column: values.to_string(),
            kind: values_kind,
        }
        .into());
    }

    let row_groups = group_rows(dataset, index_idx, dataset.columns()[index_idx].kind);
    let col_groups = group_rows(dataset, columns_idx, dataset.columns()[columns_idx].kind);

    // Row index -> position of its column key
    let mut col_of_row: HashMap<usize, usize> = HashMap::new();
    for (pos, (_, rows)) in col_groups.iter().enumerate() {
        for &r in rows {
            col_of_row.insert(r, pos);
        }
    }

    let mut grid: Vec<Vec<Option<f64>>> = Vec::with_capacity(row_groups.len());
    for (_, rows) in &row_groups {
        let mut sums = vec![(0.0, 0usize); col_groups.len()];
        for &r in rows {
            let Some(&pos) = col_of_row.get(&r) else { continue };
            if let Some(v) = parse_number(&dataset.rows()[r][values_idx]) {
                sums[pos].0 += v;
                sums[pos].1 += 1;
            }
        }
        grid.push(
            sums.into_iter()
                .map(|(sum, n)| if n == 0 { None } else { Some(sum / n as f64) })
                .collect(),
        );
    }

    let keep_cols: Vec<usize> = (0..col_groups.len())
        .filter(|&c| grid.iter().any(|row| row[c].is_some()))
        .collect();

    let mut headers = vec![index.to_string()];
    headers.extend(keep_cols.iter().map(|&c| col_groups[c].0.to_string()));
    let mut table = Table::new(headers);

    for ((key, _), row) in row_groups.iter().zip(&grid) {
        if row.iter().all(Option::is_none) {
            continue;
        }
        let mut out = vec![key.clone()];
        out.extend(keep_cols.iter().map(|&c| row[c].map_or(Cell::Missing, Cell::Number)));
        table.rows.push(out);
    }

    debug!(index, columns, values, rows = table.row_count(), "pivot");
    Ok(table)
}

/// Distinct non-missing keys of one column with the rows holding them, sorted
/// numerically for numeric columns and lexically otherwise
fn group_rows(dataset: &Dataset, idx: usize, kind: ColumnKind) -> Vec<(Cell, Vec<usize>)> {
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(Cell, Vec<usize>)> = Vec::new();

    for (r, row) in dataset.rows().iter().enumerate() {
        let raw = &row[idx];
        if is_missing(raw) {
            continue;
        }
        let key = match kind {
            ColumnKind::Numeric => match parse_number(raw) {
                Some(v) => Cell::Number(v),
                None => continue,
            },
            _ => Cell::Text(raw.clone()),
        };
        // Numeric keys group by value, so "2" and "2.0" land together
        let canonical = key.to_string();
        match positions.get(&canonical) {
            Some(&g) => groups[g].1.push(r),
            None => {
                positions.insert(canonical, groups.len());
                groups.push((key, vec![r]));
            }
        }
    }

    groups.sort_by(|(a, _), (b, _)| match (a, b) {
        (Cell::Number(x), Cell::Number(y)) => x.total_cmp(y),
        _ => a.to_string().cmp(&b.to_string()),
    });
    groups
}

/// Aggregate the cells of one group.
///
/// `count` works on any column and skips missing cells (non-finite numbers
/// included). `min`/`max` compare text lexically. `mean` and `sum` need a
/// numeric column.
fn aggregate(
    func: AggFunc,
    column: &str,
    kind: ColumnKind,
    cells: &[&str],
) -> Result<Cell, AggregationError> {
    let present: Vec<&str> = cells.iter().copied().filter(|c| !is_missing(c)).collect();
    let numeric = kind == ColumnKind::Numeric;
    let values: Vec<f64> = if numeric {
        present.iter().filter_map(|c| parse_number(c)).collect()
    } else {
        Vec::new()
    };
    let text = |s: Option<&&str>| s.map_or(Cell::Missing, |s| Cell::Text(s.to_string()));

    let cell = match func {
        AggFunc::Count if numeric => Cell::Number(values.len() as f64),
        AggFunc::Count => Cell::Number(present.len() as f64),
        AggFunc::Min if numeric => values.iter().copied().reduce(f64::min).map_or(Cell::Missing, Cell::Number),
        AggFunc::Min => text(present.iter().min()),
        AggFunc::Max if numeric => values.iter().copied().reduce(f64::max).map_or(Cell::Missing, Cell::Number),
        AggFunc::Max => text(present.iter().max()),
        AggFunc::Sum if numeric => Cell::Number(values.iter().sum()),
        AggFunc::Mean if numeric => crate::stats::mean(&values).map_or(Cell::Missing, Cell::Number),
        AggFunc::Sum | AggFunc::Mean => {
            return Err(AggregationError {
                func,
                column: column.to_string(),
                kind,
            })
        }
    };
    Ok(cell)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SchemaError;

    fn make_dataset() -> Dataset {
        let rows = [
            ["north", "2020", "10", "a"],
            ["north", "2021", "20", "b"],
            ["south", "2020", "5", "c"],
            ["north", "2020", "30", "d"],
            ["", "2021", "7", "e"],
        ];
        Dataset::new(
            vec!["region".into(), "year".into(), "sales".into(), "tag".into()],
            rows.iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect(),
        )
    }

    fn numeric_dataset() -> Dataset {
        let rows = [["1", "10", "100"], ["2", "20", "200"], ["1", "30", ""]];
        Dataset::new(
            vec!["k".into(), "x".into(), "y".into()],
            rows.iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect(),
        )
    }

    #[test]
    fn test_groupby_categorical_count_counts_itself() {
        let table = groupby(&make_dataset(), "region", AggFunc::Count).unwrap();
        assert_eq!(table.headers, vec!["region", "region_count"]);
        assert_eq!(
            table.rows,
            vec![
                vec![Cell::Text("north".into()), Cell::Number(3.0)],
                vec![Cell::Text("south".into()), Cell::Number(1.0)],
            ]
        );
    }

    #[test]
    fn test_groupby_categorical_mean_is_aggregation_error() {
        let err = groupby(&make_dataset(), "region", AggFunc::Mean).unwrap_err();
        assert_eq!(
            err,
            RelationalError::Aggregation(AggregationError {
                func: AggFunc::Mean,
                column: "region".into(),
                kind: ColumnKind::Categorical,
            })
        );
    }

    #[test]
    fn test_groupby_categorical_max_is_lexical() {
        let table = groupby(&make_dataset(), "tag", AggFunc::Max).unwrap();
        assert_eq!(table.row_count(), 5);
        assert_eq!(table.row("a").unwrap()[1], Cell::Text("a".into()));
    }

    #[test]
    fn test_groupby_numeric_mean_aggregates_other_columns() {
        let table = groupby(&numeric_dataset(), "k", AggFunc::Mean).unwrap();
        assert_eq!(table.headers, vec!["k", "x", "y"]);
        assert_eq!(
            table.rows,
            vec![
                vec![Cell::Number(1.0), Cell::Number(20.0), Cell::Number(100.0)],
                vec![Cell::Number(2.0), Cell::Number(20.0), Cell::Number(200.0)],
            ]
        );
    }

    #[test]
    fn test_groupby_numeric_with_text_columns_fails_for_mean() {
        let err = groupby(&make_dataset(), "year", AggFunc::Mean).unwrap_err();
        assert!(matches!(err, RelationalError::Aggregation(ref e) if e.column == "region"));
    }

    #[test]
    fn test_groupby_numeric_count_and_sum() {
        let ds = make_dataset();
        let table = groupby(&ds, "year", AggFunc::Count).unwrap();
        assert_eq!(table.headers, vec!["year", "region", "sales", "tag"]);
        // region is missing in one 2021 row
        assert_eq!(table.row("2021").unwrap()[1], Cell::Number(1.0));

        let table = groupby(&numeric_dataset(), "k", AggFunc::Sum).unwrap();
        assert_eq!(table.row("1").unwrap()[1], Cell::Number(40.0));
    }

    #[test]
    fn test_aggregate_each_func_and_kind() {
        let numbers = ["3", "", "inf", "1"];
        let words = ["pear", "NA", "apple"];
        let agg = |func, kind, cells: &[&str]| aggregate(func, "c", kind, cells);

        assert_eq!(agg(AggFunc::Count, ColumnKind::Numeric, &numbers[..]), Ok(Cell::Number(2.0)));
        assert_eq!(agg(AggFunc::Sum, ColumnKind::Numeric, &numbers[..]), Ok(Cell::Number(4.0)));
        assert_eq!(agg(AggFunc::Mean, ColumnKind::Numeric, &numbers[..]), Ok(Cell::Number(2.0)));
        assert_eq!(agg(AggFunc::Min, ColumnKind::Numeric, &numbers[..]), Ok(Cell::Number(1.0)));
        assert_eq!(agg(AggFunc::Max, ColumnKind::Numeric, &[""][..]), Ok(Cell::Missing));

        assert_eq!(agg(AggFunc::Count, ColumnKind::Categorical, &words[..]), Ok(Cell::Number(2.0)));
        assert_eq!(agg(AggFunc::Min, ColumnKind::Categorical, &words[..]), Ok(Cell::Text("apple".into())));
        assert_eq!(agg(AggFunc::Max, ColumnKind::Other, &words[..]), Ok(Cell::Text("pear".into())));
        assert!(agg(AggFunc::Sum, ColumnKind::Categorical, &words[..]).is_err());
        assert!(agg(AggFunc::Mean, ColumnKind::Other, &words[..]).is_err());
    }

    #[test]
    fn test_groupby_unknown_column() {
        let err = groupby(&make_dataset(), "nope", AggFunc::Sum).unwrap_err();
        assert_eq!(err, RelationalError::Schema(SchemaError("nope".into())));
    }

    #[test]
    fn test_pivot_uses_mean() {
        let table = pivot(&make_dataset(), "region", "year", "sales").unwrap();
        assert_eq!(table.headers, vec!["region", "2020", "2021"]);
        assert_eq!(
            table.row("north").unwrap(),
            &[Cell::Text("north".into()), Cell::Number(20.0), Cell::Number(20.0)]
        );
        assert_eq!(
            table.row("south").unwrap(),
            &[Cell::Text("south".into()), Cell::Number(5.0), Cell::Missing]
        );
    }

    #[test]
    fn test_pivot_text_values_is_aggregation_error() {
        let err = pivot(&make_dataset(), "region", "year", "tag").unwrap_err();
        assert!(matches!(
            err,
            RelationalError::Aggregation(AggregationError { func: AggFunc::Mean, .. })
        ));
    }

    #[test]
    fn test_pivot_unknown_column() {
        let err = pivot(&make_dataset(), "region", "month", "sales").unwrap_err();
        assert_eq!(err, RelationalError::Schema(SchemaError("month".into())));
    }

    #[test]
    fn test_op_apply_dispatches() {
        let op = RelationalOp::Pivot {
            index: "k".into(),
            columns: "x".into(),
            values: "y".into(),
        };
        let table = op.apply(&numeric_dataset()).unwrap();
        // k=1,x=30 has no y value; the x=30 column is dropped
        assert_eq!(table.headers, vec!["k", "10", "20"]);
    }

    #[test]
    fn test_agg_func_parse() {
        assert_eq!("MEAN".parse::<AggFunc>(), Ok(AggFunc::Mean));
        assert!("median".parse::<AggFunc>().is_err());
    }
}
