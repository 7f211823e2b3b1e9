// Library exports for edadash

pub mod chart;
pub mod csv_reader;
pub mod data;
pub mod describe;
pub mod error;
pub mod graph;
pub mod palette;
pub mod parser;
pub mod relational;
pub mod resolve;
pub mod runtime;
pub mod selection;
pub mod stats;
pub mod table;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[serde(rename = "png")]
    #[default]
    Png,
    #[serde(rename = "svg")]
    Svg,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Svg => "svg",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RenderOptions {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default, rename = "type")]
    pub format: OutputFormat,
    #[serde(default = "default_histogram_bins")]
    pub histogram_bins: usize,
}

fn default_width() -> u32 { 800 }
fn default_height() -> u32 { 600 }
fn default_histogram_bins() -> usize { 20 }

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            format: OutputFormat::Png,
            histogram_bins: default_histogram_bins(),
        }
    }
}
