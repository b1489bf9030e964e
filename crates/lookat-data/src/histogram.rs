// ABOUTME: Histograms filled from evaluated branch values, with ROOT-like automatic binning.
// ABOUTME: Also divides two histograms bin by bin for ratio plots.

//! One-dimensional histograms: filling, automatic binning and division.

use lookat_core::{Binning, Plottable};

use crate::error::DataError;

/// A filled 1D histogram
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    /// Histogram name.
    pub name: String,
    /// Expression the histogram was filled from, or `num/den` for ratios.
    pub title: String,
    /// Bin edges (length = n_bins + 1).
    pub bin_edges: Vec<f64>,
    /// Sum of weights per bin (length = n_bins, excluding under/overflow).
    pub bin_content: Vec<f64>,
    /// Sum of squared weights per bin.
    pub sumw2: Vec<f64>,
    pub underflow: f64,
    pub overflow: f64,
    /// Fills with non-zero weight, including under/overflow.
    pub entries: f64,
}

impl Histogram {
    /// Empty histogram over the given edges
    pub fn with_edges(name: &str, title: &str, edges: Vec<f64>) -> Result<Self, DataError> {
        check_edges(&edges)?;
        let n_bins = edges.len() - 1;
        Ok(Self {
            name: name.to_string(),
            title: title.to_string(),
            bin_edges: edges,
            bin_content: vec![0.0; n_bins],
            sumw2: vec![0.0; n_bins],
            underflow: 0.0,
            overflow: 0.0,
            entries: 0.0,
        })
    }

    /// Fill `values` with per-entry `weights` (1.0 when absent). Entries with
    /// zero weight are skipped, like a failed selection.
    pub fn fill(
        name: &str,
        title: &str,
        values: &[f64],
        weights: Option<&[f64]>,
        binning: &Binning,
    ) -> Result<Self, DataError> {
        let weight = |i: usize| weights.map_or(1.0, |w| w[i]);
        let selected = (0..values.len())
            .filter(|&i| weight(i) != 0.0)
            .map(|i| values[i]);

        let edges = match binning {
            Binning::Edges(edges) => edges.clone(),
            Binning::Fixed { bins, low, high } => uniform_edges(*bins, *low, *high),
            Binning::Auto { bins } => auto_edges(selected, *bins),
        };

        let mut hist = Self::with_edges(name, title, edges)?;
        for (i, &value) in values.iter().enumerate() {
            let w = weight(i);
            if w != 0.0 {
                hist.add(value, w);
            }
        }
        Ok(hist)
    }

    fn add(&mut self, value: f64, weight: f64) {
        self.entries += 1.0;
        match self.find_bin(value) {
            Some(bin) => {
                self.bin_content[bin] += weight;
                self.sumw2[bin] += weight * weight;
            }
            None if value < self.bin_edges[0] => self.underflow += weight,
            // NaN lands here too
            None => self.overflow += weight,
        }
    }

    /// Bin holding `value`; bins are `[low, high)`
    pub fn find_bin(&self, value: f64) -> Option<usize> {
        let edges = &self.bin_edges;
        if !(value >= edges[0] && value < edges[edges.len() - 1]) {
            return None;
        }
        // First edge strictly above value, minus one
        Some(edges.partition_point(|&e| e <= value) - 1)
    }

    /// Sum of in-range weights
    pub fn integral(&self) -> f64 {
        self.bin_content.iter().sum()
    }

    /// Copy scaled so the in-range contents sum to one
    pub fn scaled_to_unit(&self) -> Result<Self, DataError> {
        let total = self.integral();
        if total == 0.0 || !total.is_finite() {
            return Err(DataError::Incompatible(format!(
                "'{}' has integral {total} and cannot be normalised",
                self.name
            )));
        }
        let factor = 1.0 / total;
        let mut scaled = self.clone();
        scaled.bin_content.iter_mut().for_each(|c| *c *= factor);
        scaled.sumw2.iter_mut().for_each(|w| *w *= factor * factor);
        scaled.underflow *= factor;
        scaled.overflow *= factor;
        Ok(scaled)
    }

    /// Bin-wise `self + other` on identical binning, keeping the name and
    /// title of `self`
    pub fn merged(&self, other: &Histogram) -> Result<Self, DataError> {
        self.check_compatible(other)?;
        let mut sum = self.clone();
        for (bin, content) in other.bin_content.iter().enumerate() {
            sum.bin_content[bin] += content;
            sum.sumw2[bin] += other.sumw2[bin];
        }
        sum.underflow += other.underflow;
        sum.overflow += other.overflow;
        sum.entries += other.entries;
        Ok(sum)
    }

    fn check_compatible(&self, other: &Histogram) -> Result<(), DataError> {
        if same_edges(&self.bin_edges, &other.bin_edges) {
            return Ok(());
        }
        Err(DataError::Incompatible(format!(
            "'{}' has {} bins over [{}, {}], '{}' has {} bins over [{}, {}]",
            self.name,
            self.n_bins(),
            self.bin_edges[0],
            self.bin_edges[self.n_bins()],
            other.name,
            other.n_bins(),
            other.bin_edges[0],
            other.bin_edges[other.n_bins()],
        )))
    }

    /// Bin-wise `self / other` on identical binning. Bins with an empty
    /// denominator are 0. With `normalised`, each side is first scaled by
    /// the inverse of its sum of weights.
    pub fn divide(&self, other: &Histogram, name: &str, normalised: bool) -> Result<Self, DataError> {
        self.check_compatible(other)?;

        let scale = |h: &Histogram| {
            let total = h.integral();
            if normalised && total != 0.0 {
                1.0 / total
            } else {
                1.0
            }
        };
        let (num_scale, den_scale) = (scale(self), scale(other));

        let mut ratio = Self::with_edges(
            name,
            &format!("{}/{}", self.name, other.name),
            self.bin_edges.clone(),
        )?;
        for bin in 0..ratio.n_bins() {
            let num = self.bin_content[bin] * num_scale;
            let den = other.bin_content[bin] * den_scale;
            if den != 0.0 {
                let r = num / den;
                ratio.bin_content[bin] = r;
                if num != 0.0 {
                    // Uncorrelated error propagation
                    let num_rel = self.sumw2[bin] * num_scale * num_scale / (num * num);
                    let den_rel = other.sumw2[bin] * den_scale * den_scale / (den * den);
                    ratio.sumw2[bin] = r * r * (num_rel + den_rel);
                }
            }
        }
        ratio.entries = self.entries;
        Ok(ratio)
    }
}

impl Plottable for Histogram {
    fn name(&self) -> &str {
        &self.name
    }

    fn bin_edges(&self) -> &[f64] {
        &self.bin_edges
    }

    fn bin_content(&self) -> &[f64] {
        &self.bin_content
    }

    fn entries(&self) -> f64 {
        self.entries
    }
}

fn check_edges(edges: &[f64]) -> Result<(), DataError> {
    if edges.len() < 2 {
        return Err(DataError::Binning(format!(
            "need at least 2 edges, got {}",
            edges.len()
        )));
    }
    if edges.iter().any(|e| !e.is_finite()) {
        return Err(DataError::Binning("edges must be finite".to_string()));
    }
    if edges.windows(2).any(|w| w[0] >= w[1]) {
        return Err(DataError::Binning("edges must increase".to_string()));
    }
    Ok(())
}

fn same_edges(a: &[f64], b: &[f64]) -> bool {
    a.len() == b.len()
        && a.iter().zip(b).all(|(x, y)| {
            let tolerance = 1e-9 * x.abs().max(y.abs()).max(1.0);
            (x - y).abs() <= tolerance
        })
}

fn uniform_edges(bins: usize, low: f64, high: f64) -> Vec<f64> {
    let bins = bins.max(1);
    let width = (high - low) / bins as f64;
    (0..=bins)
        .map(|i| if i == bins { high } else { low + width * i as f64 })
        .collect()
}

/// Edges covering `values`.
///
/// Integer-valued data spanning no more distinct values than `bins` gets one
/// unit-wide bin per value, so `0..=9` becomes ten bins `[0,1) .. [9,10)`.
/// Anything else gets `bins` equal-width bins from the minimum to just past
/// the maximum. Margins grow with the magnitude of the data so the edges stay
/// distinct where a unit step is below the float resolution.
pub fn auto_edges(values: impl Iterator<Item = f64>, bins: usize) -> Vec<f64> {
    let bins = bins.max(1);
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    let mut integral = true;
    for v in values.filter(|v| v.is_finite()) {
        min = min.min(v);
        max = max.max(v);
        integral &= v.fract() == 0.0;
    }

    if min > max {
        // No finite data
        return uniform_edges(bins, 0.0, 1.0);
    }

    let span = max - min;
    let scale = min.abs().max(max.abs());
    let margin = |wanted: f64| wanted.max(scale * 1e-12);

    if integral && span + 1.0 <= bins as f64 {
        let edges = uniform_edges((span as usize) + 1, min, max + 1.0);
        if strictly_increasing(&edges) {
            return edges;
        }
    }
    let edges = if span == 0.0 {
        uniform_edges(bins, min - margin(0.5), max + margin(0.5))
    } else {
        // Leave the maximum inside the last bin
        uniform_edges(bins, min, max + margin(span * 1e-3))
    };
    if strictly_increasing(&edges) {
        return edges;
    }

    let wide = span.max(scale * 1e-9).max(1.0);
    vec![min - wide, max + wide]
}

fn strictly_increasing(edges: &[f64]) -> bool {
    edges.windows(2).all(|pair| pair[0] < pair[1])
}
