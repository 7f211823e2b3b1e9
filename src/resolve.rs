use crate::chart::{Arity, Axes, ChartInstruction, ChartType, DataRef};
use crate::data::{Column, ColumnKind};
use crate::error::{ResolveError, SchemaError};
use serde::Deserialize;
use tracing::debug;

/// How an under-sized column selection is reported
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionPolicy {
    /// Produce nothing while the user is still picking columns
    #[default]
    Silent,
    /// Report `InsufficientSelection`
    Strict,
}

type Builder = fn(ChartType, &[String]) -> Vec<ChartInstruction>;

/// Arity, kind gate and instruction builder for one chart type
#[derive(Clone, Copy)]
pub struct ChartRule {
    pub arity: Arity,
    pub numeric: bool,
    build: Builder,
}

impl std::fmt::Debug for ChartRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChartRule")
            .field("arity", &self.arity)
            .field("numeric", &self.numeric)
            .finish()
    }
}

/// The resolver table. Reserved menu entries have no rule.
pub fn rule_for(chart: ChartType) -> Option<ChartRule> {
    fn rule(arity: Arity, numeric: bool, build: Builder) -> Option<ChartRule> {
        Some(ChartRule { arity, numeric, build })
    }

    match chart {
        ChartType::Histogram => rule(Arity::AtLeast(1), false, histogram),
        ChartType::BoxPlot => rule(Arity::AtLeast(1), false, box_plot),
        ChartType::ScatterPlot => rule(Arity::AtLeast(2), false, first_two),
        ChartType::PieChart => rule(Arity::AtLeast(1), false, pie),
        ChartType::LineChart => rule(Arity::AtLeast(2), false, first_two),
        ChartType::PairPlot => rule(Arity::AtLeast(2), true, matrix),
        ChartType::Heatmap => rule(Arity::AtLeast(2), true, matrix),
        ChartType::ViolinPlot => rule(Arity::AtLeast(2), false, violin),
        ChartType::CountPlot => rule(Arity::AtLeast(1), false, count),
        ChartType::QqPlot => rule(Arity::AtLeast(1), false, qq),
        ChartType::BubbleChart => rule(Arity::Exactly(3), false, bubble),
        ChartType::Treemap => rule(Arity::AtLeast(2), false, treemap),
        ChartType::BarChart | ChartType::DensityPlot | ChartType::RadarChart => None,
    }
}

/// Turn a chart choice and column selection into chart instructions.
///
/// Every selected column must exist in `schema`. An empty result means there is
/// nothing to draw: the chart type is reserved, or the selection is too small
/// and `policy` is `Silent`. Pair Plot and Heatmap re-check that each selected
/// column is numeric even though the picker only offers numeric columns.
pub fn resolve(
    chart: ChartType,
    selected: &[String],
    schema: &[Column],
    policy: SelectionPolicy,
) -> Result<Vec<ChartInstruction>, ResolveError> {
    let kinds = selected
        .iter()
        .map(|name| {
            schema
                .iter()
                .find(|c| &c.name == name)
                .map(|c| c.kind)
                .ok_or_else(|| SchemaError(name.clone()))
        })
        .collect::<Result<Vec<ColumnKind>, SchemaError>>()?;

    let Some(rule) = rule_for(chart) else {
        debug!(chart = %chart, "no resolver rule for chart type");
        return Ok(Vec::new());
    };

    if !rule.arity.accepts(selected.len()) {
        debug!(chart = %chart, selected = selected.len(), required = %rule.arity, "selection below chart arity");
        return match policy {
            SelectionPolicy::Silent => Ok(Vec::new()),
            SelectionPolicy::Strict => Err(ResolveError::InsufficientSelection {
                chart,
                required: rule.arity,
                selected: selected.len(),
            }),
        };
    }

    if rule.numeric {
        if let Some((name, kind)) = selected
            .iter()
            .zip(&kinds)
            .find(|(_, kind)| **kind != ColumnKind::Numeric)
        {
            return Err(ResolveError::NonNumericColumn {
                chart,
                column: name.clone(),
                kind: *kind,
            });
        }
    }

    let instructions = (rule.build)(chart, selected);
    debug!(chart = %chart, instructions = instructions.len(), "resolved plot request");
    Ok(instructions)
}

fn single_title(chart: ChartType, column: &str) -> String {
    format!("{} - {}", chart.label(), column)
}

fn list_title(chart: ChartType, columns: &[String]) -> String {
    format!("{} - {}", chart.label(), columns.join(", "))
}

fn per_column(
    chart: ChartType,
    columns: &[String],
    axes: impl Fn(&str) -> Axes,
) -> Vec<ChartInstruction> {
    columns
        .iter()
        .map(|col| ChartInstruction {
            kind: chart,
            data: DataRef::Full,
            axes: axes(col),
            title: single_title(chart, col),
        })
        .collect()
}

fn histogram(chart: ChartType, columns: &[String]) -> Vec<ChartInstruction> {
    per_column(chart, columns, |c| Axes::X { x: c.to_string() })
}

fn box_plot(chart: ChartType, columns: &[String]) -> Vec<ChartInstruction> {
    per_column(chart, columns, |c| Axes::Y { y: c.to_string() })
}

fn violin(chart: ChartType, columns: &[String]) -> Vec<ChartInstruction> {
    per_column(chart, columns, |c| Axes::Y { y: c.to_string() })
}

fn pie(chart: ChartType, columns: &[String]) -> Vec<ChartInstruction> {
    per_column(chart, columns, |c| Axes::Names { names: c.to_string() })
}

fn count(chart: ChartType, columns: &[String]) -> Vec<ChartInstruction> {
    per_column(chart, columns, |c| Axes::Counts {
        x: c.to_string(),
        color: c.to_string(),
    })
}

fn qq(chart: ChartType, columns: &[String]) -> Vec<ChartInstruction> {
    per_column(chart, columns, |c| Axes::XY {
        x: c.to_string(),
        y: c.to_string(),
    })
}

/// Scatter and line charts: extra columns past the second are ignored
fn first_two(chart: ChartType, columns: &[String]) -> Vec<ChartInstruction> {
    let (x, y) = (&columns[0], &columns[1]);
    vec![ChartInstruction {
        kind: chart,
        data: DataRef::Full,
        axes: Axes::XY {
            x: x.clone(),
            y: y.clone(),
        },
        title: format!("{} - {} vs {}", chart.label(), x, y),
    }]
}

fn matrix(chart: ChartType, columns: &[String]) -> Vec<ChartInstruction> {
    vec![ChartInstruction {
        kind: chart,
        data: DataRef::Columns(columns.to_vec()),
        axes: Axes::Matrix {
            columns: columns.to_vec(),
        },
        title: list_title(chart, columns),
    }]
}

fn bubble(chart: ChartType, columns: &[String]) -> Vec<ChartInstruction> {
    let (x, y, size) = (&columns[0], &columns[1], &columns[2]);
    vec![ChartInstruction {
        kind: chart,
        data: DataRef::Full,
        axes: Axes::Bubble {
            x: x.clone(),
            y: y.clone(),
            size: size.clone(),
        },
        title: format!("{} - {} vs {} (Size: {})", chart.label(), x, y, size),
    }]
}

fn treemap(chart: ChartType, columns: &[String]) -> Vec<ChartInstruction> {
    vec![ChartInstruction {
        kind: chart,
        data: DataRef::Columns(columns.to_vec()),
        axes: Axes::Path {
            path: columns.to_vec(),
        },
        title: list_title(chart, columns),
    }]
}
