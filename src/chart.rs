// Chart types offered by the dashboard and the instructions handed to the renderer

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Every entry of the plot-type menu, in menu order.
///
/// `BarChart`, `DensityPlot` and `RadarChart` are listed but have no resolver
/// rule; selecting them never produces an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ChartType {
    Histogram,
    BoxPlot,
    ScatterPlot,
    PairPlot,
    BarChart,
    PieChart,
    LineChart,
    Heatmap,
    ViolinPlot,
    CountPlot,
    DensityPlot,
    QqPlot,
    BubbleChart,
    RadarChart,
    Treemap,
}

impl ChartType {
    pub const ALL: [ChartType; 15] = [
        ChartType::Histogram,
        ChartType::BoxPlot,
        ChartType::ScatterPlot,
        ChartType::PairPlot,
        ChartType::BarChart,
        ChartType::PieChart,
        ChartType::LineChart,
        ChartType::Heatmap,
        ChartType::ViolinPlot,
        ChartType::CountPlot,
        ChartType::DensityPlot,
        ChartType::QqPlot,
        ChartType::BubbleChart,
        ChartType::RadarChart,
        ChartType::Treemap,
    ];

    /// Human-readable label used in menus and titles
    pub fn label(self) -> &'static str {
        match self {
            ChartType::Histogram => "Histogram",
            ChartType::BoxPlot => "Box Plot",
            ChartType::ScatterPlot => "Scatter Plot",
            ChartType::PairPlot => "Pair Plot",
            ChartType::BarChart => "Bar Chart",
            ChartType::PieChart => "Pie Chart",
            ChartType::LineChart => "Line Chart",
            ChartType::Heatmap => "Heatmap",
            ChartType::ViolinPlot => "Violin Plot",
            ChartType::CountPlot => "Count Plot",
            ChartType::DensityPlot => "Density Plot",
            ChartType::QqPlot => "Q-Q Plot",
            ChartType::BubbleChart => "Bubble Chart",
            ChartType::RadarChart => "Radar Chart",
            ChartType::Treemap => "Treemap",
        }
    }

    /// Short command name used by session scripts and output file names
    pub fn slug(self) -> &'static str {
        match self {
            ChartType::Histogram => "histogram",
            ChartType::BoxPlot => "box",
            ChartType::ScatterPlot => "scatter",
            ChartType::PairPlot => "pair",
            ChartType::BarChart => "bar",
            ChartType::PieChart => "pie",
            ChartType::LineChart => "line",
            ChartType::Heatmap => "heatmap",
            ChartType::ViolinPlot => "violin",
            ChartType::CountPlot => "count",
            ChartType::DensityPlot => "density",
            ChartType::QqPlot => "qq",
            ChartType::BubbleChart => "bubble",
            ChartType::RadarChart => "radar",
            ChartType::Treemap => "treemap",
        }
    }

    /// Whether the column picker should only offer numeric columns
    pub fn numeric_only(self) -> bool {
        matches!(self, ChartType::PairPlot | ChartType::Heatmap)
    }
}

impl fmt::Display for ChartType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ChartType {
    type Err = String;

    /// Accepts either the menu label or the slug, case-insensitively
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        ChartType::ALL
            .iter()
            .copied()
            .find(|c| c.label().eq_ignore_ascii_case(s) || c.slug().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown chart type '{}'", s))
    }
}

/// Column-count requirement of a chart type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Arity {
    AtLeast(usize),
    Exactly(usize),
}

impl Arity {
    pub fn accepts(self, count: usize) -> bool {
        match self {
            Arity::AtLeast(n) => count >= n,
            Arity::Exactly(n) => count == n,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::AtLeast(n) => write!(f, "at least {}", n),
            Arity::Exactly(n) => write!(f, "exactly {}", n),
        }
    }
}

/// What part of the dataset an instruction draws from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum DataRef {
    Full,
    Columns(Vec<String>),
}

/// Role-to-column mapping for one chart
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Axes {
    /// Distribution along x (histogram)
    X { x: String },
    /// Distribution along y (box, violin)
    Y { y: String },
    XY { x: String, y: String },
    /// Slices by distinct value (pie)
    Names { names: String },
    /// Bars per distinct value, coloured by the same column (count plot)
    Counts { x: String, color: String },
    Bubble { x: String, y: String, size: String },
    /// All-pairs layout (pair plot, correlation heatmap)
    Matrix { columns: Vec<String> },
    /// Hierarchy path, outermost level first (treemap)
    Path { path: Vec<String> },
}

impl Axes {
    /// Columns referenced by this mapping, in role order
    pub fn columns(&self) -> Vec<&str> {
        match self {
            Axes::X { x } => vec![x.as_str()],
            Axes::Y { y } => vec![y.as_str()],
            Axes::XY { x, y } => vec![x.as_str(), y.as_str()],
            Axes::Names { names } => vec![names.as_str()],
            Axes::Counts { x, color } => vec![x.as_str(), color.as_str()],
            Axes::Bubble { x, y, size } => vec![x.as_str(), y.as_str(), size.as_str()],
            Axes::Matrix { columns } => columns.iter().map(String::as_str).collect(),
            Axes::Path { path } => path.iter().map(String::as_str).collect(),
        }
    }
}

/// A validated description of one chart, ready for the render sink
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartInstruction {
    pub kind: ChartType,
    pub data: DataRef,
    pub axes: Axes,
    pub title: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_label_and_slug() {
        assert_eq!("Q-Q Plot".parse::<ChartType>(), Ok(ChartType::QqPlot));
        assert_eq!("qq".parse::<ChartType>(), Ok(ChartType::QqPlot));
        assert_eq!("scatter plot".parse::<ChartType>(), Ok(ChartType::ScatterPlot));
        assert!("Raincloud Plot".parse::<ChartType>().is_err());
    }

    #[test]
    fn test_labels_unique() {
        for (i, a) in ChartType::ALL.iter().enumerate() {
            for b in &ChartType::ALL[i + 1..] {
                assert_ne!(a.label(), b.label());
                assert_ne!(a.slug(), b.slug());
            }
        }
    }

    #[test]
    fn test_arity_accepts() {
        assert!(Arity::AtLeast(2).accepts(3));
        assert!(!Arity::AtLeast(2).accepts(1));
        assert!(Arity::Exactly(3).accepts(3));
        assert!(!Arity::Exactly(3).accepts(4));
    }

    #[test]
    fn test_numeric_only() {
        let numeric: Vec<ChartType> = ChartType::ALL
            .iter()
            .copied()
            .filter(|c| c.numeric_only())
            .collect();
        assert_eq!(numeric, vec![ChartType::PairPlot, ChartType::Heatmap]);
    }
}
