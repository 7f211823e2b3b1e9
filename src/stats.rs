// Numeric kernels shared by the summary table and the renderer

use std::collections::HashMap;

/// Values with missing entries dropped, sorted ascending
pub fn sorted_present(values: &[Option<f64>]) -> Vec<f64> {
    let mut out: Vec<f64> = values.iter().flatten().copied().collect();
    out.sort_by(|a, b| a.total_cmp(b));
    out
}

pub fn mean(data: &[f64]) -> Option<f64> {
    if data.is_empty() {
        return None;
    }
    Some(data.iter().sum::<f64>() / data.len() as f64)
}

/// Sample standard deviation (n - 1); undefined below two values
pub fn sample_std(data: &[f64]) -> Option<f64> {
    let n = data.len();
    if n < 2 {
        return None;
    }
    let m = mean(data)?;
    let variance = data.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (n - 1) as f64;
    Some(variance.sqrt())
}

/// Linear-interpolated percentile of already sorted data, `p` in [0, 1]
pub fn percentile(sorted_data: &[f64], p: f64) -> f64 {
    let n = sorted_data.len();
    if n == 0 {
        return 0.0;
    }
    if n == 1 {
        return sorted_data[0];
    }

    let rank = p * (n - 1) as f64;
    let lower_idx = rank.floor() as usize;
    let upper_idx = rank.ceil() as usize;

    if lower_idx == upper_idx {
        sorted_data[lower_idx]
    } else {
        let weight = rank - lower_idx as f64;
        sorted_data[lower_idx] * (1.0 - weight) + sorted_data[upper_idx] * weight
    }
}

/// Five-number summary with Tukey fences
#[derive(Debug, Clone, PartialEq)]
pub struct BoxStats {
    pub lower_whisker: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub upper_whisker: f64,
    pub outliers: Vec<f64>,
}

pub fn box_stats(sorted: &[f64]) -> Option<BoxStats> {
    if sorted.is_empty() {
        return None;
    }

    let q1 = percentile(sorted, 0.25);
    let median = percentile(sorted, 0.50);
    let q3 = percentile(sorted, 0.75);
    let iqr = q3 - q1;

    let lower_fence = q1 - 1.5 * iqr;
    let upper_fence = q3 + 1.5 * iqr;

    // Whiskers reach the most extreme values still inside the fences
    let lower_whisker = sorted.iter().copied().find(|&v| v >= lower_fence).unwrap_or(q1);
    let upper_whisker = sorted.iter().rev().copied().find(|&v| v <= upper_fence).unwrap_or(q3);

    let outliers = sorted
        .iter()
        .copied()
        .filter(|&v| v < lower_fence || v > upper_fence)
        .collect();

    Some(BoxStats {
        lower_whisker,
        q1,
        median,
        q3,
        upper_whisker,
        outliers,
    })
}

/// Silverman's rule of thumb for bandwidth selection
pub fn silverman_bandwidth(sorted: &[f64]) -> f64 {
    let n = sorted.len() as f64;
    if n < 2.0 {
        return 1.0;
    }

    let std_dev = sample_std(sorted).unwrap_or(0.0);

    // IQR-based estimate for robustness
    let iqr = percentile(sorted, 0.75) - percentile(sorted, 0.25);

    // h = 0.9 * min(std, IQR/1.34) * n^(-1/5)
    let scale = if iqr > 0.0 { std_dev.min(iqr / 1.34) } else { std_dev };
    if scale <= 0.0 {
        return 1.0;
    }
    0.9 * scale * n.powf(-0.2)
}

fn gaussian_kernel(u: f64) -> f64 {
    const SQRT_2PI: f64 = 2.5066282746310002;
    (-0.5 * u * u).exp() / SQRT_2PI
}

/// Gaussian KDE on an evenly spaced grid.
///
/// Returns `(grid, density)` with density normalised to a 0..1 peak.
pub fn kde(data: &[f64], bandwidth: f64) -> (Vec<f64>, Vec<f64>) {
    const GRID_POINTS: usize = 128;

    let n = data.len() as f64;
    if data.is_empty() {
        return (vec![], vec![]);
    }

    let min_v = data.iter().fold(f64::INFINITY, |a, &b| a.min(b));
    let max_v = data.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));

    // Extend range slightly for smooth edges
    let extend = 3.0 * bandwidth;
    let start = min_v - extend;
    let range = (max_v + extend) - start;
    if range <= 0.0 {
        return (vec![min_v], vec![1.0]);
    }

    let step = range / (GRID_POINTS - 1) as f64;
    let mut grid = Vec::with_capacity(GRID_POINTS);
    let mut density = Vec::with_capacity(GRID_POINTS);

    for i in 0..GRID_POINTS {
        let v = start + i as f64 * step;
        grid.push(v);
        let d: f64 = data.iter().map(|&xi| gaussian_kernel((v - xi) / bandwidth)).sum();
        density.push(d / (n * bandwidth));
    }

    let max_density = density.iter().fold(0.0f64, |a, &b| a.max(b));
    if max_density > 0.0 {
        for d in &mut density {
            *d /= max_density;
        }
    }

    (grid, density)
}

/// One equal-width histogram bin
#[derive(Debug, Clone, PartialEq)]
pub struct Bin {
    pub start: f64,
    pub end: f64,
    pub count: usize,
}

/// Equal-width bins over the data range; the last bin is closed on the right.
///
/// Yields no bins when the range is too wide to represent.
pub fn bin_counts(data: &[f64], bin_count: usize) -> Vec<Bin> {
    if data.is_empty() || bin_count == 0 {
        return Vec::new();
    }

    let min = data.iter().fold(f64::INFINITY, |a, &b| a.min(b));
    let max = data.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));

    // Zero range collapses to a single unit-wide bin
    if max == min {
        return vec![Bin {
            start: min - 0.5,
            end: min + 0.5,
            count: data.len(),
        }];
    }

    let width = (max - min) / bin_count as f64;
    if !width.is_finite() {
        return Vec::new();
    }
    let mut counts = vec![0usize; bin_count];
    for &v in data {
        let idx = (((v - min) / width).floor() as usize).min(bin_count - 1);
        counts[idx] += 1;
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| Bin {
            start: min + i as f64 * width,
            end: min + (i + 1) as f64 * width,
            count,
        })
        .collect()
}

/// Pearson correlation over rows where both values are present
pub fn pearson(a: &[Option<f64>], b: &[Option<f64>]) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = a
        .iter()
        .zip(b)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .collect();

    if pairs.len() < 2 {
        return None;
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in &pairs {
        cov += (x - mean_x) * (y - mean_y);
        var_x += (x - mean_x).powi(2);
        var_y += (y - mean_y).powi(2);
    }

    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    Some(cov / (var_x.sqrt() * var_y.sqrt()))
}

/// Distinct values with their counts, in order of first appearance
pub fn value_counts<'a>(cells: impl IntoIterator<Item = &'a str>) -> Vec<(String, usize)> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut counts: Vec<(String, usize)> = Vec::new();

    for cell in cells {
        match index.get(cell) {
            Some(&i) => counts[i].1 += 1,
            None => {
                index.insert(cell, counts.len());
                counts.push((cell.to_string(), 1));
            }
        }
    }

    counts
}
