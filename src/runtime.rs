// Session executor: owns the uploaded dataset and runs script commands

use crate::chart::{ChartInstruction, ChartType};
use crate::csv_reader;
use crate::data::Dataset;
use crate::describe::describe;
use crate::error::{NoDataset, UploadError};
use crate::graph;
use crate::parser::{Command, Script};
use crate::relational::RelationalOp;
use crate::resolve::{resolve, SelectionPolicy};
use crate::selection::{offered_columns, Selection};
use crate::table::Table;
use crate::RenderOptions;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

/// Largest accepted image width or height, in pixels
pub const MAX_IMAGE_SIDE: u32 = 16_384;

/// Session settings, loadable from a JSON file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub render: RenderOptions,
    /// Report under-sized selections as errors instead of drawing nothing
    pub strict_selection: bool,
}

impl SessionConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let render = &self.render;
        for (name, value) in [("width", render.width), ("height", render.height)] {
            if value == 0 || value > MAX_IMAGE_SIDE {
                anyhow::bail!("render.{} must be between 1 and {}, got {}", name, MAX_IMAGE_SIDE, value);
            }
        }
        if render.histogram_bins == 0 {
            anyhow::bail!("render.histogram_bins must be at least 1");
        }
        Ok(())
    }

    pub fn selection_policy(&self) -> SelectionPolicy {
        if self.strict_selection {
            SelectionPolicy::Strict
        } else {
            SelectionPolicy::Silent
        }
    }
}

/// What a command produced
#[derive(Debug, Clone)]
pub enum Outcome {
    Chart {
        instruction: ChartInstruction,
        bytes: Vec<u8>,
    },
    Table(Table),
    /// A recovered failure, shown to the user without stopping the session
    Warning(String),
}

/// One dashboard session. Holds at most one dataset; derived tables are
/// handed back to the caller and never stored.
#[derive(Debug, Default)]
pub struct Session {
    dataset: Option<Dataset>,
    config: SessionConfig,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            dataset: None,
            config,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Replace the dataset with CSV read from `reader`
    pub fn upload<R: Read>(&mut self, reader: R) -> Result<&Dataset, UploadError> {
        self.replace(csv_reader::read_csv(reader))
    }

    /// Replace the dataset with a CSV or JSON file
    pub fn upload_file(&mut self, path: &Path) -> Result<&Dataset, UploadError> {
        self.replace(csv_reader::read_upload(path))
    }

    fn replace(&mut self, loaded: Result<Dataset, UploadError>) -> Result<&Dataset, UploadError> {
        // A failed upload leaves no dataset behind
        self.dataset = None;
        let dataset = loaded?;
        info!(
            rows = dataset.row_count(),
            columns = dataset.columns().len(),
            "dataset uploaded"
        );
        Ok(self.dataset.insert(dataset))
    }

    pub fn dataset(&self) -> Result<&Dataset, NoDataset> {
        self.dataset.as_ref().ok_or(NoDataset)
    }

    /// Columns the picker would offer for `chart`
    pub fn offered_columns(&self, chart: ChartType) -> Result<Vec<String>, NoDataset> {
        Ok(offered_columns(chart, self.dataset()?))
    }

    pub fn describe(&self) -> Result<Table, NoDataset> {
        Ok(describe(self.dataset()?))
    }

    /// Resolve a selection and render every resulting instruction.
    ///
    /// Resolution errors propagate. A chart that fails to draw becomes a
    /// warning and the remaining instructions still render.
    pub fn plot(&self, selection: &Selection) -> Result<Vec<Outcome>> {
        let dataset = self.dataset()?;
        let instructions = resolve(
            selection.chart,
            &selection.columns,
            dataset.columns(),
            self.config.selection_policy(),
        )?;

        if instructions.is_empty() {
            debug!(chart = %selection.chart, "nothing to draw");
        }

        let outcomes = instructions
            .into_iter()
            .map(|instruction| {
                match graph::render_instruction(&instruction, dataset, &self.config.render) {
                    Ok(bytes) => Outcome::Chart { instruction, bytes },
                    Err(e) => {
                        warn!(title = %instruction.title, error = %e, "render failed");
                        Outcome::Warning(format!("Failed to render {}: {:#}", instruction.title, e))
                    }
                }
            })
            .collect();
        Ok(outcomes)
    }

    /// Run a groupby or pivot; relational failures become warnings
    pub fn relational(&self, op: &RelationalOp) -> Result<Outcome, NoDataset> {
        let dataset = self.dataset()?;
        match op.apply(dataset) {
            Ok(table) => Ok(Outcome::Table(table)),
            Err(e) => {
                warn!(error = %e, "relational operation failed");
                Ok(Outcome::Warning(e.to_string()))
            }
        }
    }

    pub fn run(&self, command: &Command) -> Result<Vec<Outcome>> {
        match command {
            Command::Describe => Ok(vec![Outcome::Table(self.describe()?)]),
            Command::Plot(selection) => self.plot(selection),
            Command::Relational(op) => Ok(vec![self.relational(op)?]),
        }
    }

    /// Run every command in order, stopping at the first unrecovered error
    pub fn run_script(&self, script: &Script) -> Result<Vec<Outcome>> {
        let mut outcomes = Vec::new();
        for command in &script.commands {
            outcomes.extend(self.run(command)?);
        }
        Ok(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ResolveError;
    use crate::relational::AggFunc;

    const CSV: &str = "region,year,sales,product\n\
                       north,2020,10,pen\n\
                       north,2021,14,ink\n\
                       south,2020,7,pen\n\
                       south,2021,9,pad\n";

    fn small_config() -> SessionConfig {
        SessionConfig {
            render: RenderOptions {
                width: 320,
                height: 240,
                ..RenderOptions::default()
            },
            strict_selection: false,
        }
    }

    fn loaded_session() -> Session {
        let mut session = Session::new(small_config());
        session.upload(CSV.as_bytes()).unwrap();
        session
    }

    #[test]
    fn test_commands_require_dataset() {
        let session = Session::new(small_config());
        assert_eq!(session.describe().unwrap_err(), NoDataset);
        assert_eq!(session.offered_columns(ChartType::Heatmap).unwrap_err(), NoDataset);

        let err = session
            .plot(&Selection::new(ChartType::Histogram, vec!["sales".into()]))
            .unwrap_err();
        assert!(err.downcast_ref::<NoDataset>().is_some());

        let op = RelationalOp::Groupby {
            column: "region".into(),
            func: AggFunc::Sum,
        };
        assert_eq!(session.relational(&op).unwrap_err(), NoDataset);
    }

    #[test]
    fn test_failed_upload_clears_dataset() {
        let mut session = loaded_session();
        assert!(session.dataset().is_ok());
        assert!(session.upload("".as_bytes()).is_err());
        assert!(session.dataset().is_err());
    }

    #[test]
    fn test_upload_replaces_dataset() {
        let mut session = loaded_session();
        session.upload("a,b\n1,2\n".as_bytes()).unwrap();
        let names: Vec<&str> = session.dataset().unwrap().column_names().collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_plot_renders_each_instruction() {
        let session = loaded_session();
        let outcomes = session
            .plot(&Selection::new(ChartType::Histogram, vec!["sales".into(), "region".into()]))
            .unwrap();
        assert_eq!(outcomes.len(), 2);
        match &outcomes[0] {
            Outcome::Chart { instruction, bytes } => {
                assert_eq!(instruction.title, "Histogram - sales");
                assert!(!bytes.is_empty());
            }
            other => panic!("Expected chart, got {:?}", other),
        }
    }

    #[test]
    fn test_plot_silent_under_selection() {
        let session = loaded_session();
        let outcomes = session
            .plot(&Selection::new(ChartType::ScatterPlot, vec!["sales".into()]))
            .unwrap();
        assert!(outcomes.is_empty());
    }

    #[test]
    fn test_plot_strict_under_selection() {
        let mut config = small_config();
        config.strict_selection = true;
        let mut session = Session::new(config);
        session.upload(CSV.as_bytes()).unwrap();

        let err = session
            .plot(&Selection::new(ChartType::ScatterPlot, vec!["sales".into()]))
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ResolveError>(),
            Some(ResolveError::InsufficientSelection { .. })
        ));
    }

    #[test]
    fn test_plot_unknown_column_propagates() {
        let session = loaded_session();
        let err = session
            .plot(&Selection::new(ChartType::Histogram, vec!["profit".into()]))
            .unwrap_err();
        assert!(matches!(err.downcast_ref::<ResolveError>(), Some(ResolveError::Schema(_))));
    }

    #[test]
    fn test_relational_failure_is_warning() {
        let session = loaded_session();
        let op = RelationalOp::Pivot {
            index: "region".into(),
            columns: "year".into(),
            values: "product".into(),
        };
        match session.relational(&op).unwrap() {
            Outcome::Warning(msg) => assert!(msg.contains("product")),
            other => panic!("Expected warning, got {:?}", other),
        }
    }

    #[test]
    fn test_run_script_collects_outcomes() {
        let session = loaded_session();
        let (_, script) = crate::parser::parse_script(
            "describe() | groupby(region, count) | bar(sales) | groupby(region, mean) | pivot(index: region, columns: year, values: sales)",
        )
        .unwrap();
        let outcomes = session.run_script(&script).unwrap();
        // The reserved bar chart contributes nothing; mean of text is only a warning
        assert_eq!(outcomes.len(), 4);
        assert!(matches!(outcomes[0], Outcome::Table(_)));
        assert!(matches!(outcomes[1], Outcome::Table(_)));
        assert!(matches!(outcomes[2], Outcome::Warning(_)));
        assert!(matches!(outcomes[3], Outcome::Table(_)));
    }

    #[test]
    fn test_render_failure_is_warning() {
        let mut session = Session::new(small_config());
        session.upload("age,city\n30,Oslo\n40,Lima\n".as_bytes()).unwrap();
        let (_, script) =
            crate::parser::parse_script("histogram(age) | violin(age, city) | groupby(city, count)").unwrap();

        let outcomes = session.run_script(&script).unwrap();
        assert_eq!(outcomes.len(), 4);
        assert!(matches!(outcomes[0], Outcome::Chart { .. }));
        assert!(matches!(outcomes[1], Outcome::Chart { .. }));
        match &outcomes[2] {
            Outcome::Warning(msg) => {
                assert!(msg.contains("Violin Plot - city"));
                assert!(msg.contains("requires numeric data"));
            }
            other => panic!("Expected warning, got {:?}", other),
        }
        assert!(matches!(outcomes[3], Outcome::Table(_)));
    }

    #[test]
    fn test_config_load_rejects_bad_render_options() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        for body in [
            r#"{"render": {"width": 0}}"#,
            r#"{"render": {"height": 100000}}"#,
            r#"{"render": {"histogram_bins": 0}}"#,
        ] {
            std::fs::write(&path, body).unwrap();
            assert!(SessionConfig::load(&path).is_err(), "{}", body);
        }

        std::fs::write(&path, r#"{"render": {"width": 400, "height": 300}}"#).unwrap();
        let config = SessionConfig::load(&path).unwrap();
        assert_eq!((config.render.width, config.render.height), (400, 300));
    }

    #[test]
    fn test_config_defaults_and_overrides() {
        let config: SessionConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.render.width, 800);
        assert_eq!(config.selection_policy(), SelectionPolicy::Silent);

        let config: SessionConfig =
            serde_json::from_str(r#"{"render": {"type": "svg", "histogram_bins": 5}, "strict_selection": true}"#)
                .unwrap();
        assert!(matches!(config.render.format, crate::OutputFormat::Svg));
        assert_eq!(config.render.histogram_bins, 5);
        assert_eq!(config.selection_policy(), SelectionPolicy::Strict);
    }
}
