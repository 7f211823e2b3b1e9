// Column picker state for one plot request

use crate::chart::ChartType;
use crate::data::Dataset;
use serde::Serialize;

/// A chart type plus the ordered columns the user picked for it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Selection {
    pub chart: ChartType,
    pub columns: Vec<String>,
}

impl Selection {
    pub fn new(chart: ChartType, columns: Vec<String>) -> Self {
        Self { chart, columns }
    }
}

/// Columns the picker offers for `chart`: numeric ones only for Pair Plot and
/// Heatmap, every column otherwise. Order follows the dataset.
pub fn offered_columns(chart: ChartType, dataset: &Dataset) -> Vec<String> {
    if chart.numeric_only() {
        dataset.numeric_columns().map(str::to_string).collect()
    } else {
        dataset.column_names().map(str::to_string).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_dataset() -> Dataset {
        Dataset::new(
            vec!["name".into(), "age".into(), "score".into()],
            vec![
                vec!["ann".into(), "31".into(), "1.5".into()],
                vec!["bob".into(), "42".into(), "2.5".into()],
            ],
        )
    }

    #[test]
    fn test_numeric_only_pickers() {
        let ds = make_dataset();
        assert_eq!(offered_columns(ChartType::Heatmap, &ds), vec!["age", "score"]);
        assert_eq!(offered_columns(ChartType::PairPlot, &ds), vec!["age", "score"]);
    }

    #[test]
    fn test_full_picker() {
        let ds = make_dataset();
        assert_eq!(offered_columns(ChartType::Histogram, &ds), vec!["name", "age", "score"]);
        assert_eq!(offered_columns(ChartType::RadarChart, &ds).len(), 3);
    }
}
