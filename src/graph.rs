// Render sink: draws one chart instruction with plotters

use crate::chart::{Axes, ChartInstruction, ChartType};
use crate::data::{is_missing, ColumnKind, Dataset};
use crate::describe::correlation_matrix;
use crate::palette::{coolwarm, ColorPalette};
use crate::stats::{self, value_counts};
use crate::{OutputFormat, RenderOptions};
use anyhow::{anyhow, Context, Result};
use image::ImageEncoder;
use plotters::coord::cartesian::Cartesian2d;
use plotters::coord::types::RangedCoordf64;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::collections::HashMap;
use std::ops::Range;

type Chart<'a, DB> = ChartContext<'a, DB, Cartesian2d<RangedCoordf64, RangedCoordf64>>;

/// Draw one instruction and encode it in the configured output format
pub fn render_instruction(
    instruction: &ChartInstruction,
    dataset: &Dataset,
    options: &RenderOptions,
) -> Result<Vec<u8>> {
    let (width, height) = (options.width, options.height);
    if width == 0 || height == 0 {
        anyhow::bail!("Image size {}x{} has no pixels", width, height);
    }

    match options.format {
        OutputFormat::Png => {
            let size = (width as usize)
                .checked_mul(height as usize)
                .and_then(|n| n.checked_mul(3))
                .ok_or_else(|| anyhow!("Image size {}x{} is too large", width, height))?;
            let mut buffer = vec![0u8; size];
            {
                let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
                draw(&root, instruction, dataset, options)?;
                root.present().context("Failed to present drawing")?;
            }
            encode_png(&buffer, width, height)
        }
        OutputFormat::Svg => {
            let mut svg = String::new();
            {
                let root = SVGBackend::with_string(&mut svg, (width, height)).into_drawing_area();
                draw(&root, instruction, dataset, options)?;
                root.present().context("Failed to present drawing")?;
            }
            Ok(svg.into_bytes())
        }
    }
}

fn encode_png(buffer: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let mut png_bytes = Vec::new();
    image::codecs::png::PngEncoder::new(&mut png_bytes)
        .write_image(buffer, width, height, image::ColorType::Rgb8)
        .context("Failed to encode PNG")?;
    Ok(png_bytes)
}

fn draw<DB>(
    root: &DrawingArea<DB, Shift>,
    instruction: &ChartInstruction,
    dataset: &Dataset,
    options: &RenderOptions,
) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    root.fill(&WHITE).context("Failed to fill background")?;
    let title = instruction.title.as_str();

    match (instruction.kind, &instruction.axes) {
        (ChartType::Histogram, Axes::X { x }) => draw_histogram(root, title, dataset, x, options.histogram_bins),
        (ChartType::CountPlot, Axes::Counts { x, color }) => {
            let counts = category_counts(dataset, x)?;
            draw_category_bars(root, title, x, &counts, Some(color))
        }
        (ChartType::BoxPlot, Axes::Y { y }) => draw_box(root, title, dataset, y),
        (ChartType::ViolinPlot, Axes::Y { y }) => draw_violin(root, title, dataset, y),
        (ChartType::ScatterPlot | ChartType::QqPlot, Axes::XY { x, y }) => {
            draw_points(root, title, dataset, x, y, None)
        }
        (ChartType::LineChart, Axes::XY { x, y }) => draw_line(root, title, dataset, x, y),
        (ChartType::BubbleChart, Axes::Bubble { x, y, size }) => {
            draw_points(root, title, dataset, x, y, Some(size))
        }
        (ChartType::PieChart, Axes::Names { names }) => draw_pie(root, title, dataset, names),
        (ChartType::PairPlot, Axes::Matrix { columns }) => {
            draw_pair(root, title, dataset, columns, options.histogram_bins)
        }
        (ChartType::Heatmap, Axes::Matrix { columns }) => draw_heatmap(root, title, dataset, columns),
        (ChartType::Treemap, Axes::Path { path }) => draw_treemap(root, title, dataset, path),
        (kind, axes) => Err(anyhow!("No renderer for {} with axes {:?}", kind, axes)),
    }
}

// =============================================================================
// Data extraction
// =============================================================================

/// Present numeric values of a column; fails for non-numeric columns
fn numeric_values(dataset: &Dataset, column: &str, chart: &str) -> Result<Vec<f64>> {
    if dataset.kind_of(column)? != ColumnKind::Numeric {
        anyhow::bail!("{} requires numeric data, but column '{}' is not numeric", chart, column);
    }
    let values: Vec<f64> = dataset.numeric(column)?.into_iter().flatten().collect();
    if values.is_empty() {
        anyhow::bail!("Column '{}' has no values to plot", column);
    }
    Ok(values)
}

/// Row-aligned axis positions: numbers for numeric columns, category indices otherwise
struct AxisData {
    values: Vec<Option<f64>>,
    categories: Option<Vec<String>>,
}

fn axis_data(dataset: &Dataset, column: &str) -> Result<AxisData> {
    if dataset.kind_of(column)? == ColumnKind::Numeric {
        return Ok(AxisData {
            values: dataset.numeric(column)?,
            categories: None,
        });
    }

    let cells = dataset.cells(column)?;
    let mut categories: Vec<String> = cells
        .iter()
        .filter(|c| !is_missing(c))
        .map(|c| c.to_string())
        .collect();
    categories.sort();
    categories.dedup();

    let index: HashMap<&str, usize> = categories.iter().enumerate().map(|(i, c)| (c.as_str(), i)).collect();
    let values = cells
        .iter()
        .map(|c| index.get(c).map(|&i| i as f64 + 0.5))
        .collect();

    Ok(AxisData {
        values,
        categories: Some(categories),
    })
}

fn category_counts(dataset: &Dataset, column: &str) -> Result<Vec<(String, usize)>> {
    let cells = dataset.cells(column)?;
    let counts = value_counts(cells.into_iter().filter(|c| !is_missing(c)));
    if counts.is_empty() {
        anyhow::bail!("Column '{}' has no values to plot", column);
    }
    Ok(counts)
}

/// Pad a data range by 5%, or by one unit when it is a single value
fn pad_range(min: f64, max: f64) -> Result<Range<f64>> {
    let padding = if min == max { 1.0 } else { (max - min) * 0.05 };
    checked_range((min - padding)..(max + padding))
}

/// Axis ranges must be finite and non-empty at f64 precision
fn checked_range(range: Range<f64>) -> Result<Range<f64>> {
    let span = range.end - range.start;
    if span.is_finite() && span > 0.0 {
        Ok(range)
    } else {
        anyhow::bail!(
            "Values from {} to {} cannot be drawn on one axis",
            range.start,
            range.end
        )
    }
}

fn min_max(values: impl IntoIterator<Item = f64>) -> Option<(f64, f64)> {
    values.into_iter().fold(None, |acc, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}

fn category_label(categories: &[String], x: f64) -> String {
    if x < 0.0 {
        return String::new();
    }
    categories.get(x as usize).cloned().unwrap_or_default()
}

// =============================================================================
// Cartesian charts
// =============================================================================

fn cartesian<'a, DB>(
    area: &'a DrawingArea<DB, Shift>,
    title: &str,
    x_range: Range<f64>,
    y_range: Range<f64>,
) -> Result<Chart<'a, DB>>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    ChartBuilder::on(area)
        .margin(10)
        .caption(title, ("sans-serif", 20))
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(x_range, y_range)
        .context("Failed to build chart")
}

/// Bins with the x range they cover
fn binned(values: &[f64], column: &str, bins: usize) -> Result<(Vec<stats::Bin>, Range<f64>)> {
    let bins = stats::bin_counts(values, bins.max(1));
    let (Some(first), Some(last)) = (bins.first(), bins.last()) else {
        anyhow::bail!("Column '{}' spans too wide a range to bin", column);
    };
    let x_range = checked_range(first.start..last.end)?;
    Ok((bins, x_range))
}

fn draw_histogram<DB>(
    root: &DrawingArea<DB, Shift>,
    title: &str,
    dataset: &Dataset,
    column: &str,
    bins: usize,
) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    // Text columns are counted per category instead of binned
    if dataset.kind_of(column)? != ColumnKind::Numeric {
        let counts = category_counts(dataset, column)?;
        return draw_category_bars(root, title, column, &counts, None);
    }

    let values = numeric_values(dataset, column, "Histogram")?;
    let (bins, x_range) = binned(&values, column, bins)?;
    let max_count = bins.iter().map(|b| b.count).max().unwrap_or(0) as f64;

    let mut chart = cartesian(root, title, x_range, 0.0..(max_count * 1.05).max(1.0))?;
    chart
        .configure_mesh()
        .x_desc(column)
        .y_desc("count")
        .draw()
        .context("Failed to draw mesh")?;

    let color = ColorPalette::category10().get(0);
    chart
        .draw_series(bins.iter().map(|b| {
            Rectangle::new([(b.start, 0.0), (b.end, b.count as f64)], color.mix(0.85).filled())
        }))
        .context("Failed to draw histogram bars")?;

    Ok(())
}

/// One bar per category; `color_by` colours each bar by its category
fn draw_category_bars<DB>(
    root: &DrawingArea<DB, Shift>,
    title: &str,
    column: &str,
    counts: &[(String, usize)],
    color_by: Option<&String>,
) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let num_categories = counts.len();
    let max_count = counts.iter().map(|(_, n)| *n).max().unwrap_or(0) as f64;
    let categories: Vec<String> = counts.iter().map(|(k, _)| k.clone()).collect();

    let mut chart = cartesian(root, title, 0.0..num_categories as f64, 0.0..(max_count * 1.05).max(1.0))?;
    chart
        .configure_mesh()
        .x_labels(num_categories)
        .x_label_formatter(&|x| category_label(&categories, *x))
        .x_desc(column)
        .y_desc("count")
        .draw()
        .context("Failed to draw mesh")?;

    let palette = ColorPalette::category10();
    let colors = color_by.map(|_| palette.assign_colors(&categories));
    for (idx, (key, count)) in counts.iter().enumerate() {
        let color = colors.as_ref().map_or(palette.get(0), |by_key| by_key[key]);
        let x_center = idx as f64 + 0.5;
        chart
            .draw_series(std::iter::once(Rectangle::new(
                [(x_center - 0.4, 0.0), (x_center + 0.4, *count as f64)],
                color.filled(),
            )))
            .context("Failed to draw bar")?;
    }

    Ok(())
}

fn draw_box<DB>(root: &DrawingArea<DB, Shift>, title: &str, dataset: &Dataset, column: &str) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let mut values = numeric_values(dataset, column, "Box Plot")?;
    values.sort_by(|a, b| a.total_cmp(b));
    let summary = stats::box_stats(&values).ok_or_else(|| anyhow!("Column '{}' has no values", column))?;

    let (lo, hi) = (values[0], values[values.len() - 1]);
    let mut chart = cartesian(root, title, -1.0..1.0, pad_range(lo, hi)?)?;
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(0)
        .y_desc(column)
        .draw()
        .context("Failed to draw mesh")?;

    let color = ColorPalette::category10().get(0);
    let half = 0.3;

    chart
        .draw_series(std::iter::once(Rectangle::new(
            [(-half, summary.q1), (half, summary.q3)],
            color.mix(0.4).filled(),
        )))
        .context("Failed to draw box")?;

    let segments = vec![
        vec![(-half, summary.median), (half, summary.median)],
        vec![(0.0, summary.q3), (0.0, summary.upper_whisker)],
        vec![(0.0, summary.q1), (0.0, summary.lower_whisker)],
        vec![(-half / 2.0, summary.upper_whisker), (half / 2.0, summary.upper_whisker)],
        vec![(-half / 2.0, summary.lower_whisker), (half / 2.0, summary.lower_whisker)],
    ];
    chart
        .draw_series(segments.into_iter().map(|s| PathElement::new(s, color.stroke_width(2))))
        .context("Failed to draw whiskers")?;

    chart
        .draw_series(summary.outliers.iter().map(|&v| Circle::new((0.0, v), 3, color.filled())))
        .context("Failed to draw outliers")?;

    Ok(())
}

fn draw_violin<DB>(root: &DrawingArea<DB, Shift>, title: &str, dataset: &Dataset, column: &str) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let mut values = numeric_values(dataset, column, "Violin Plot")?;
    values.sort_by(|a, b| a.total_cmp(b));

    let value_range = pad_range(values[0], values[values.len() - 1])?;

    let bandwidth = stats::silverman_bandwidth(&values);
    let (grid, density) = stats::kde(&values, bandwidth);
    let y_range = match min_max(grid.iter().copied()) {
        Some((lo, hi)) => pad_range(lo, hi)?,
        None => value_range,
    };

    let mut chart = cartesian(root, title, -1.0..1.0, y_range)?;
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(0)
        .y_desc(column)
        .draw()
        .context("Failed to draw mesh")?;

    let color = ColorPalette::category10().get(0);
    let max_half_width = 0.8;

    // Mirror the density curve around x = 0
    let mut outline: Vec<(f64, f64)> = grid
        .iter()
        .zip(&density)
        .map(|(&y, &d)| (-d * max_half_width, y))
        .collect();
    outline.extend(grid.iter().zip(&density).rev().map(|(&y, &d)| (d * max_half_width, y)));

    chart
        .draw_series(std::iter::once(Polygon::new(outline, color.mix(0.5).filled())))
        .context("Failed to draw violin body")?;

    // Inner box
    if let Some(summary) = stats::box_stats(&values) {
        chart
            .draw_series(std::iter::once(Rectangle::new(
                [(-0.05, summary.q1), (0.05, summary.q3)],
                BLACK.filled(),
            )))
            .context("Failed to draw inner box")?;
        chart
            .draw_series(std::iter::once(Circle::new((0.0, summary.median), 3, WHITE.filled())))
            .context("Failed to draw median")?;
    }

    Ok(())
}

/// Scatter, Q-Q and bubble charts; `size` scales marker radius
fn draw_points<DB>(
    root: &DrawingArea<DB, Shift>,
    title: &str,
    dataset: &Dataset,
    x: &str,
    y: &str,
    size: Option<&String>,
) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let x_data = axis_data(dataset, x)?;
    let y_data = axis_data(dataset, y)?;
    let sizes = match size {
        Some(col) => {
            if dataset.kind_of(col)? != ColumnKind::Numeric {
                anyhow::bail!("Bubble size column '{}' must be numeric", col);
            }
            Some(dataset.numeric(col)?)
        }
        None => None,
    };

    let mut points: Vec<(f64, f64, i32)> = Vec::new();
    let size_range = sizes
        .as_ref()
        .and_then(|s| min_max(s.iter().flatten().copied()));

    for (row, (xv, yv)) in x_data.values.iter().zip(&y_data.values).enumerate() {
        let (Some(xv), Some(yv)) = (xv, yv) else { continue };
        let radius = match (&sizes, size_range) {
            (Some(s), Some((lo, hi))) => match s[row] {
                Some(v) if hi > lo && (hi - lo).is_finite() => {
                    4 + ((v - lo) / (hi - lo) * 20.0).round() as i32
                }
                Some(_) => 8,
                None => continue,
            },
            _ => 3,
        };
        points.push((*xv, *yv, radius));
    }

    if points.is_empty() {
        anyhow::bail!("Columns '{}' and '{}' have no complete rows to plot", x, y);
    }

    let x_range = axis_range(&x_data, points.iter().map(|p| p.0))?;
    let y_range = axis_range(&y_data, points.iter().map(|p| p.1))?;

    let mut chart = cartesian(root, title, x_range, y_range)?;
    draw_axes(&mut chart, (x, &x_data), (y, &y_data))?;

    let color = ColorPalette::category10().get(0);
    let alpha = if sizes.is_some() { 0.5 } else { 0.8 };
    chart
        .draw_series(
            points
                .iter()
                .map(|&(px, py, r)| Circle::new((px, py), r, color.mix(alpha).filled())),
        )
        .context("Failed to draw point series")?;

    Ok(())
}

/// Mesh with axis descriptions; category axes get one label per category
fn draw_axes<DB>(chart: &mut Chart<'_, DB>, x: (&str, &AxisData), y: (&str, &AxisData)) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let x_labels = x.1.categories.as_deref().unwrap_or(&[]);
    let y_labels = y.1.categories.as_deref().unwrap_or(&[]);
    let x_fmt = |v: &f64| category_label(x_labels, *v);
    let y_fmt = |v: &f64| category_label(y_labels, *v);

    let mut mesh = chart.configure_mesh();
    mesh.x_desc(x.0).y_desc(y.0);
    if x.1.categories.is_some() {
        mesh.x_labels(x_labels.len()).x_label_formatter(&x_fmt);
    }
    if y.1.categories.is_some() {
        mesh.y_labels(y_labels.len()).y_label_formatter(&y_fmt);
    }
    mesh.draw().context("Failed to draw mesh")?;
    Ok(())
}

fn axis_range(axis: &AxisData, values: impl Iterator<Item = f64>) -> Result<Range<f64>> {
    match &axis.categories {
        Some(cats) => Ok(0.0..cats.len().max(1) as f64),
        None => {
            let (lo, hi) = min_max(values).unwrap_or((0.0, 1.0));
            pad_range(lo, hi)
        }
    }
}

fn draw_line<DB>(
    root: &DrawingArea<DB, Shift>,
    title: &str,
    dataset: &Dataset,
    x: &str,
    y: &str,
) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let x_data = axis_data(dataset, x)?;
    let y_data = axis_data(dataset, y)?;

    let mut points: Vec<(f64, f64)> = x_data
        .values
        .iter()
        .zip(&y_data.values)
        .filter_map(|(xv, yv)| Some(((*xv)?, (*yv)?)))
        .collect();
    if points.is_empty() {
        anyhow::bail!("Columns '{}' and '{}' have no complete rows to plot", x, y);
    }
    points.sort_by(|a, b| a.0.total_cmp(&b.0));

    let x_range = axis_range(&x_data, points.iter().map(|p| p.0))?;
    let y_range = axis_range(&y_data, points.iter().map(|p| p.1))?;

    let mut chart = cartesian(root, title, x_range, y_range)?;
    draw_axes(&mut chart, (x, &x_data), (y, &y_data))?;

    let color = ColorPalette::category10().get(0);
    chart
        .draw_series(LineSeries::new(points, color.stroke_width(2)))
        .context("Failed to draw line series")?;

    Ok(())
}

// =============================================================================
// Composite charts
// =============================================================================

fn draw_pie<DB>(root: &DrawingArea<DB, Shift>, title: &str, dataset: &Dataset, column: &str) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let counts = category_counts(dataset, column)?;
    let total: usize = counts.iter().map(|(_, n)| n).sum();

    let area = root.titled(title, ("sans-serif", 20)).context("Failed to draw title")?;
    let (w, h) = area.dim_in_pixel();
    let center = (w as f64 / 2.0, h as f64 / 2.0);
    let radius = w.min(h) as f64 * 0.35;

    let palette = ColorPalette::category10();
    let label_style = ("sans-serif", 14)
        .into_font()
        .color(&BLACK)
        .pos(Pos::new(HPos::Center, VPos::Center));

    let mut start = -std::f64::consts::FRAC_PI_2;
    for (idx, (label, count)) in counts.iter().enumerate() {
        let share = *count as f64 / total as f64;
        let sweep = share * std::f64::consts::TAU;
        let steps = ((sweep / 0.05).ceil() as usize).max(1);

        let mut slice = vec![(center.0 as i32, center.1 as i32)];
        for s in 0..=steps {
            let angle = start + sweep * s as f64 / steps as f64;
            slice.push((
                (center.0 + radius * angle.cos()).round() as i32,
                (center.1 + radius * angle.sin()).round() as i32,
            ));
        }
        area.draw(&Polygon::new(slice, palette.get(idx).filled()))
            .context("Failed to draw pie slice")?;

        let mid = start + sweep / 2.0;
        let label_pos = (
            (center.0 + radius * 1.2 * mid.cos()).round() as i32,
            (center.1 + radius * 1.2 * mid.sin()).round() as i32,
        );
        area.draw(&Text::new(
            format!("{} ({:.1}%)", label, share * 100.0),
            label_pos,
            label_style.clone(),
        ))
        .context("Failed to draw pie label")?;

        start += sweep;
    }

    Ok(())
}

fn draw_pair<DB>(
    root: &DrawingArea<DB, Shift>,
    title: &str,
    dataset: &Dataset,
    columns: &[String],
    bins: usize,
) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let area = root.titled(title, ("sans-serif", 20)).context("Failed to draw title")?;
    let n = columns.len();
    let cells = area.split_evenly((n, n));

    let data: Vec<Vec<Option<f64>>> = columns
        .iter()
        .map(|c| dataset.numeric(c))
        .collect::<Result<_, _>>()?;
    let color = ColorPalette::category10().get(0);

    for (i, row_col) in columns.iter().enumerate() {
        for (j, col_col) in columns.iter().enumerate() {
            let cell = &cells[i * n + j];

            if i == j {
                let values: Vec<f64> = data[i].iter().flatten().copied().collect();
                if values.is_empty() {
                    continue;
                }
                let (bins, x_range) = binned(&values, row_col, bins)?;
                let max_count = bins.iter().map(|b| b.count).max().unwrap_or(0) as f64;

                let mut chart = ChartBuilder::on(cell)
                    .margin(5)
                    .caption(row_col, ("sans-serif", 12))
                    .x_label_area_size(20)
                    .y_label_area_size(30)
                    .build_cartesian_2d(x_range, 0.0..(max_count * 1.05).max(1.0))
                    .context("Failed to build pair cell")?;
                chart
                    .configure_mesh()
                    .x_labels(3)
                    .y_labels(3)
                    .draw()
                    .context("Failed to draw mesh")?;
                chart
                    .draw_series(bins.iter().map(|b| {
                        Rectangle::new([(b.start, 0.0), (b.end, b.count as f64)], color.mix(0.85).filled())
                    }))
                    .context("Failed to draw histogram bars")?;
            } else {
                let points: Vec<(f64, f64)> = data[j]
                    .iter()
                    .zip(&data[i])
                    .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
                    .collect();
                let Some((x_lo, x_hi)) = min_max(points.iter().map(|p| p.0)) else { continue };
                let Some((y_lo, y_hi)) = min_max(points.iter().map(|p| p.1)) else { continue };

                let mut chart = ChartBuilder::on(cell)
                    .margin(5)
                    .caption(format!("{} vs {}", row_col, col_col), ("sans-serif", 12))
                    .x_label_area_size(20)
                    .y_label_area_size(30)
                    .build_cartesian_2d(pad_range(x_lo, x_hi)?, pad_range(y_lo, y_hi)?)
                    .context("Failed to build pair cell")?;
                chart
                    .configure_mesh()
                    .x_labels(3)
                    .y_labels(3)
                    .draw()
                    .context("Failed to draw mesh")?;
                chart
                    .draw_series(points.iter().map(|&p| Circle::new(p, 2, color.mix(0.7).filled())))
                    .context("Failed to draw point series")?;
            }
        }
    }

    Ok(())
}

fn draw_heatmap<DB>(
    root: &DrawingArea<DB, Shift>,
    title: &str,
    dataset: &Dataset,
    columns: &[String],
) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let matrix = correlation_matrix(dataset, columns)?;
    let n = columns.len();

    let mut chart = ChartBuilder::on(root)
        .margin(10)
        .caption(title, ("sans-serif", 20))
        .x_label_area_size(60)
        .y_label_area_size(100)
        .build_cartesian_2d(0.0..n as f64, 0.0..n as f64)
        .context("Failed to build chart")?;

    // Row 0 sits at the top
    let x_names = columns.to_vec();
    let y_names: Vec<String> = columns.iter().rev().cloned().collect();
    chart
        .configure_mesh()
        .disable_mesh()
        .x_labels(n)
        .y_labels(n)
        .x_label_formatter(&|x| category_label(&x_names, *x))
        .y_label_formatter(&|y| category_label(&y_names, *y))
        .draw()
        .context("Failed to draw mesh")?;

    let text_style = ("sans-serif", 16)
        .into_font()
        .color(&BLACK)
        .pos(Pos::new(HPos::Center, VPos::Center));

    for (i, row) in matrix.iter().enumerate() {
        let y0 = (n - 1 - i) as f64;
        for (j, value) in row.iter().enumerate() {
            let x0 = j as f64;
            let fill = value.map_or(RGBColor(200, 200, 200), coolwarm);
            chart
                .draw_series(std::iter::once(Rectangle::new(
                    [(x0, y0), (x0 + 1.0, y0 + 1.0)],
                    fill.filled(),
                )))
                .context("Failed to draw heatmap cell")?;

            let label = value.map_or_else(|| "nan".to_string(), |v| format!("{:.2}", v));
            chart
                .draw_series(std::iter::once(Text::new(label, (x0 + 0.5, y0 + 0.5), text_style.clone())))
                .context("Failed to annotate heatmap cell")?;
        }
    }

    Ok(())
}

// =============================================================================
// Treemap
// =============================================================================

/// One laid-out treemap rectangle in pixel space
#[derive(Debug, Clone, PartialEq)]
pub struct Tile {
    pub label: String,
    pub depth: usize,
    /// Index of the outermost ancestor, used for colouring
    pub branch: usize,
    pub count: usize,
    pub rect: (f64, f64, f64, f64),
}

#[derive(Debug)]
struct TreeNode {
    label: String,
    count: usize,
    children: Vec<TreeNode>,
}

fn build_tree(paths: &[Vec<&str>], depth: usize) -> Vec<TreeNode> {
    if paths.is_empty() || depth >= paths[0].len() {
        return Vec::new();
    }

    let mut order: Vec<&str> = Vec::new();
    let mut groups: HashMap<&str, Vec<Vec<&str>>> = HashMap::new();
    for path in paths {
        let key = path[depth];
        if !groups.contains_key(key) {
            order.push(key);
        }
        groups.entry(key).or_default().push(path.clone());
    }

    let mut nodes: Vec<TreeNode> = order
        .into_iter()
        .map(|key| {
            let members = &groups[key];
            TreeNode {
                label: key.to_string(),
                count: members.len(),
                children: build_tree(members, depth + 1),
            }
        })
        .collect();
    // Largest first, ties in order of appearance
    nodes.sort_by(|a, b| b.count.cmp(&a.count));
    nodes
}

fn layout_nodes(
    nodes: &[TreeNode],
    rect: (f64, f64, f64, f64),
    depth: usize,
    branch: Option<usize>,
    tiles: &mut Vec<Tile>,
) {
    let total: usize = nodes.iter().map(|n| n.count).sum();
    if total == 0 {
        return;
    }

    let (x0, y0, x1, y1) = rect;
    let horizontal = depth % 2 == 0;
    let mut offset = if horizontal { x0 } else { y0 };
    let span = if horizontal { x1 - x0 } else { y1 - y0 };

    for (idx, node) in nodes.iter().enumerate() {
        let extent = span * node.count as f64 / total as f64;
        let child = if horizontal {
            (offset, y0, offset + extent, y1)
        } else {
            (x0, offset, x1, offset + extent)
        };
        offset += extent;

        let branch = branch.unwrap_or(idx);
        tiles.push(Tile {
            label: node.label.clone(),
            depth,
            branch,
            count: node.count,
            rect: child,
        });

        // Leave a header strip for the parent label
        let inner = (child.0 + 2.0, child.1 + 18.0, child.2 - 2.0, child.3 - 2.0);
        if inner.2 > inner.0 && inner.3 > inner.1 {
            layout_nodes(&node.children, inner, depth + 1, Some(branch), tiles);
        }
    }
}

/// Slice-and-dice layout of row counts along the hierarchy `path`.
///
/// Rows with a missing value anywhere on the path are left out.
pub fn treemap_tiles(dataset: &Dataset, path: &[String], bounds: (f64, f64, f64, f64)) -> Result<Vec<Tile>> {
    let columns: Vec<Vec<&str>> = path
        .iter()
        .map(|c| dataset.cells(c))
        .collect::<Result<_, _>>()?;

    let rows: Vec<Vec<&str>> = (0..dataset.row_count())
        .map(|r| columns.iter().map(|col| col[r].trim()).collect::<Vec<&str>>())
        .filter(|row| row.iter().all(|c| !is_missing(c)))
        .collect();

    let tree = build_tree(&rows, 0);
    let mut tiles = Vec::new();
    layout_nodes(&tree, bounds, 0, None, &mut tiles);
    Ok(tiles)
}

fn draw_treemap<DB>(root: &DrawingArea<DB, Shift>, title: &str, dataset: &Dataset, path: &[String]) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let area = root.titled(title, ("sans-serif", 20)).context("Failed to draw title")?;
    let (w, h) = area.dim_in_pixel();
    let tiles = treemap_tiles(dataset, path, (0.0, 0.0, w as f64, h as f64))?;
    if tiles.is_empty() {
        anyhow::bail!("Treemap path {:?} has no complete rows to plot", path);
    }

    let palette = ColorPalette::category10();
    let label_style = ("sans-serif", 13).into_font().color(&BLACK);

    for tile in &tiles {
        let (x0, y0, x1, y1) = tile.rect;
        let corners = [(x0 as i32, y0 as i32), (x1 as i32, y1 as i32)];
        // Deeper levels are drawn lighter on top of their parents
        let shade = 0.9 - 0.2 * tile.depth.min(3) as f64;
        area.draw(&Rectangle::new(corners, palette.get(tile.branch).mix(shade).filled()))
            .context("Failed to draw treemap tile")?;
        area.draw(&Rectangle::new(corners, WHITE.stroke_width(1)))
            .context("Failed to draw treemap border")?;

        if x1 - x0 > 40.0 && y1 - y0 > 16.0 {
            area.draw(&Text::new(
                format!("{} ({})", tile.label, tile.count),
                (x0 as i32 + 3, y0 as i32 + 3),
                label_style.clone(),
            ))
            .context("Failed to draw treemap label")?;
        }
    }

    Ok(())
}
