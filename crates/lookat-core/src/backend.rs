// ABOUTME: Boundary to the analysis library that opens files and fills histograms.
// ABOUTME: The session only talks to these traits, so tests can plug in a mock.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Read access to a binned, plottable object produced by the library
pub trait Plottable {
    fn name(&self) -> &str;

    /// Bin edges, `n_bins + 1` values
    fn bin_edges(&self) -> &[f64];

    /// Bin contents, excluding under/overflow
    fn bin_content(&self) -> &[f64];

    /// Number of fills that went into the object
    fn entries(&self) -> f64;

    fn n_bins(&self) -> usize {
        self.bin_content().len()
    }
}

/// Histogram binning, mirroring ROOT's `(n)` / `(n,low,high)` notation
#[derive(Debug, Clone, PartialEq)]
pub enum Binning {
    /// `bins` equal-width bins over the data range (the library may improve it)
    Auto { bins: usize },
    /// `bins` equal-width bins over `[low, high)`
    Fixed { bins: usize, low: f64, high: f64 },
    /// Explicit bin edges, e.g. copied from another histogram
    Edges(Vec<f64>),
}

impl Binning {
    pub fn auto(bins: usize) -> Self {
        Binning::Auto { bins }
    }
}

impl FromStr for Binning {
    type Err = BackendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let inner = s
            .trim()
            .strip_prefix('(')
            .and_then(|rest| rest.strip_suffix(')'))
            .ok_or_else(|| {
                BackendError::Binning(format!("expected '(n)' or '(n,low,high)', got '{s}'"))
            })?;

        let parts: Vec<&str> = inner.split(',').map(str::trim).collect();
        let bins: usize = parts[0].parse().map_err(|_| {
            BackendError::Binning(format!("bin count '{}' is not a number", parts[0]))
        })?;
        if bins == 0 {
            return Err(BackendError::Binning("bin count must be positive".to_string()));
        }

        match parts.as_slice() {
            [_] => Ok(Binning::Auto { bins }),
            [_, low, high] => {
                let parse = |v: &str| {
                    v.parse::<f64>()
                        .map_err(|_| BackendError::Binning(format!("'{v}' is not a number")))
                };
                let (low, high) = (parse(low)?, parse(high)?);
                if low.partial_cmp(&high) != Some(std::cmp::Ordering::Less) {
                    return Err(BackendError::Binning(format!("low edge {low} must be below {high}")));
                }
                Ok(Binning::Fixed { bins, low, high })
            }
            _ => Err(BackendError::Binning(format!("expected 1 or 3 values, got {}", parts.len()))),
        }
    }
}

impl fmt::Display for Binning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Binning::Auto { bins } => write!(f, "({bins})"),
            Binning::Fixed { bins, low, high } => write!(f, "({bins},{low},{high})"),
            Binning::Edges(edges) => write!(f, "({} edges)", edges.len()),
        }
    }
}

/// Everything the library needs to fill one histogram from a tree
#[derive(Debug, Clone)]
pub struct DrawRequest<'a> {
    pub expression: &'a str,
    pub selection: Option<&'a str>,
    pub name: &'a str,
    pub binning: Binning,
}

/// Evaluates expressions against trees. The only capability the drawing
/// path needs from the library.
pub trait Evaluator {
    type Tree;
    type Plot: Plottable;

    fn evaluate(
        &self,
        tree: &Self::Tree,
        request: &DrawRequest<'_>,
    ) -> Result<Self::Plot, BackendError>;

    /// Like `evaluate`, but each entry is weighted by the inverse of the
    /// `efficiency` content in the bin its value falls into. Entries with
    /// no usable efficiency are left out; their count is returned too.
    fn evaluate_corrected(
        &self,
        tree: &Self::Tree,
        request: &DrawRequest<'_>,
        efficiency: &Self::Plot,
    ) -> Result<(Self::Plot, usize), BackendError>;
}

/// Full analysis library: files, trees and histogram arithmetic
pub trait Library: Evaluator {
    type File;

    fn open(&mut self, path: &Path) -> Result<Self::File, BackendError>;

    /// Release a file. Trees taken from it must not be used afterwards.
    fn close(&mut self, file: Self::File) -> Result<(), BackendError>;

    fn tree_names(&self, file: &Self::File) -> Vec<String>;

    fn tree(&self, file: &Self::File, name: &str) -> Result<Self::Tree, BackendError>;

    /// One tree made of the trees called `name` in every file of `paths`
    fn chain(&mut self, name: &str, paths: &[PathBuf]) -> Result<Self::Tree, BackendError>;

    fn branch_names(&self, tree: &Self::Tree) -> Vec<String>;

    /// Bin-wise `numerator / denominator`. With `normalised`, each input is
    /// first scaled by the inverse of its sum of weights.
    fn divide(
        &self,
        numerator: &Self::Plot,
        denominator: &Self::Plot,
        name: &str,
        normalised: bool,
    ) -> Result<Self::Plot, BackendError>;

    /// Copy of `plot` scaled to unit integral
    fn normalise(&self, plot: &Self::Plot) -> Result<Self::Plot, BackendError>;

    /// Bin-wise sum on identical binning, named after `target`
    fn add(&self, target: &Self::Plot, extra: &Self::Plot) -> Result<Self::Plot, BackendError>;
}

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed data file {path}: {message}")]
    Format { path: PathBuf, message: String },

    #[error("No tree named '{0}'")]
    NoSuchTree(String),

    #[error("No branch named '{0}'")]
    NoSuchBranch(String),

    #[error("{0}")]
    Expression(String),

    #[error("Invalid binning: {0}")]
    Binning(String),

    #[error("Cannot divide histograms: {0}")]
    Arithmetic(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_auto_binning() {
        assert_eq!("(40)".parse::<Binning>().unwrap(), Binning::Auto { bins: 40 });
    }

    #[test]
    fn parses_fixed_binning() {
        assert_eq!(
            "(4, 0, 8)".parse::<Binning>().unwrap(),
            Binning::Fixed {
                bins: 4,
                low: 0.0,
                high: 8.0
            }
        );
    }

    #[test]
    fn rejects_bad_binning() {
        assert!("40".parse::<Binning>().is_err());
        assert!("(0)".parse::<Binning>().is_err());
        assert!("(4,8,0)".parse::<Binning>().is_err());
        assert!("(4,0)".parse::<Binning>().is_err());
        assert!("(x)".parse::<Binning>().is_err());
    }
}
