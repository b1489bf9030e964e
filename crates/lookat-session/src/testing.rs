// ABOUTME: In-memory library and surface used by the session unit tests.
// ABOUTME: Records what was evaluated and presented so tests can inspect it.

use std::cell::RefCell;
use std::path::{Path, PathBuf};

use lookat_core::{BackendError, Binning, Config, DrawRequest, Evaluator, Library, Plottable};
use lookat_layout::{Canvas, PadFrame, Surface, SurfaceError};

use crate::session::Session;

#[derive(Debug, Clone)]
pub struct MockTree {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MockPlot {
    pub name: String,
    pub edges: Vec<f64>,
    pub content: Vec<f64>,
}

impl Plottable for MockPlot {
    fn name(&self) -> &str {
        &self.name
    }
    fn bin_edges(&self) -> &[f64] {
        &self.edges
    }
    fn bin_content(&self) -> &[f64] {
        &self.content
    }
    fn entries(&self) -> f64 {
        self.content.iter().sum()
    }
}

#[derive(Debug)]
pub struct MockFile {
    trees: Vec<String>,
}

/// Fills every bin with the length of the expression, so `xx` over `x` is 2
#[derive(Debug, Default)]
pub struct MockLibrary {
    pub open: usize,
    pub requests: RefCell<Vec<(String, Option<String>, Binning)>>,
}

impl Evaluator for MockLibrary {
    type Tree = MockTree;
    type Plot = MockPlot;

    fn evaluate(&self, _tree: &MockTree, request: &DrawRequest<'_>) -> Result<MockPlot, BackendError> {
        if request.expression.contains("bad") {
            return Err(BackendError::Expression(format!("cannot parse '{}'", request.expression)));
        }
        if request.expression.starts_with("missing") {
            return Err(BackendError::NoSuchBranch(request.expression.to_string()));
        }
        self.requests.borrow_mut().push((
            request.expression.to_string(),
            request.selection.map(str::to_string),
            request.binning.clone(),
        ));

        let edges = match &request.binning {
            Binning::Auto { bins } => (0..=*bins).map(|i| i as f64).collect(),
            Binning::Fixed { bins, low, high } => (0..=*bins)
                .map(|i| low + (high - low) * i as f64 / *bins as f64)
                .collect(),
            Binning::Edges(edges) => edges.clone(),
        };
        let value = request.expression.len() as f64;
        Ok(MockPlot {
            name: request.name.to_string(),
            content: vec![value; edges.len() - 1],
            edges,
        })
    }

    /// Divides the plain fill by the mean efficiency; bins at zero efficiency
    /// count as skipped entries
    fn evaluate_corrected(
        &self,
        tree: &MockTree,
        request: &DrawRequest<'_>,
        efficiency: &MockPlot,
    ) -> Result<(MockPlot, usize), BackendError> {
        let mut plot = self.evaluate(tree, request)?;
        let skipped = efficiency.content.iter().filter(|e| **e == 0.0).count();
        let mean = efficiency.content.iter().sum::<f64>() / efficiency.content.len() as f64;
        plot.content.iter_mut().for_each(|c| *c /= mean);
        Ok((plot, skipped))
    }
}

impl Library for MockLibrary {
    type File = MockFile;

    fn open(&mut self, path: &Path) -> Result<MockFile, BackendError> {
        if path.to_string_lossy().contains("missing") {
            return Err(BackendError::Io {
                path: path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
            });
        }
        self.open += 1;
        Ok(MockFile {
            trees: vec!["events".to_string(), "other".to_string()],
        })
    }

    fn close(&mut self, _file: MockFile) -> Result<(), BackendError> {
        self.open -= 1;
        Ok(())
    }

    fn tree_names(&self, file: &MockFile) -> Vec<String> {
        file.trees.clone()
    }

    fn tree(&self, file: &MockFile, name: &str) -> Result<MockTree, BackendError> {
        if file.trees.iter().any(|t| t == name) {
            Ok(MockTree {
                name: name.to_string(),
            })
        } else {
            Err(BackendError::NoSuchTree(name.to_string()))
        }
    }

    fn chain(&mut self, name: &str, _paths: &[PathBuf]) -> Result<MockTree, BackendError> {
        Ok(MockTree {
            name: name.to_string(),
        })
    }

    fn branch_names(&self, _tree: &MockTree) -> Vec<String> {
        vec!["x".to_string(), "y".to_string()]
    }

    fn divide(
        &self,
        numerator: &MockPlot,
        denominator: &MockPlot,
        name: &str,
        normalised: bool,
    ) -> Result<MockPlot, BackendError> {
        if numerator.edges != denominator.edges {
            return Err(BackendError::Arithmetic("binning differs".to_string()));
        }
        let scale = |p: &MockPlot| {
            if normalised {
                1.0 / p.entries()
            } else {
                1.0
            }
        };
        let (sn, sd) = (scale(numerator), scale(denominator));
        Ok(MockPlot {
            name: name.to_string(),
            edges: numerator.edges.clone(),
            content: numerator
                .content
                .iter()
                .zip(&denominator.content)
                .map(|(n, d)| if *d == 0.0 { 0.0 } else { n * sn / (d * sd) })
                .collect(),
        })
    }

    fn normalise(&self, plot: &MockPlot) -> Result<MockPlot, BackendError> {
        let total = plot.entries();
        if total == 0.0 {
            return Err(BackendError::Arithmetic(format!("'{}' is empty", plot.name)));
        }
        Ok(MockPlot {
            content: plot.content.iter().map(|c| c / total).collect(),
            ..plot.clone()
        })
    }

    fn add(&self, target: &MockPlot, extra: &MockPlot) -> Result<MockPlot, BackendError> {
        if target.edges != extra.edges {
            return Err(BackendError::Arithmetic("binning differs".to_string()));
        }
        Ok(MockPlot {
            content: target.content.iter().zip(&extra.content).map(|(a, b)| a + b).collect(),
            ..target.clone()
        })
    }
}

/// Remembers one line per presented canvas: `name grid [pad labels]`
#[derive(Debug, Default)]
pub struct RecordingSurface {
    pub presented: Vec<String>,
    pub fail: bool,
}

impl Surface<MockPlot> for RecordingSurface {
    fn present(&mut self, canvas: &Canvas, frames: &[PadFrame<'_, MockPlot>]) -> Result<(), SurfaceError> {
        if self.fail {
            return Err(SurfaceError::TooSmall { width: 0, height: 0 });
        }
        let labels: Vec<&str> = frames
            .iter()
            .map(|f| f.plot.map_or("-", |(label, _)| label))
            .collect();
        self.presented
            .push(format!("{} {} [{}]", canvas.name(), canvas.grid(), labels.join(" ")));
        Ok(())
    }
}

pub type MockSession = Session<MockLibrary, RecordingSurface>;

pub fn mock_session() -> MockSession {
    mock_session_with(MockLibrary::default())
}

pub fn mock_session_with(library: MockLibrary) -> MockSession {
    Session::new(Config::default(), library, RecordingSurface::default())
}

/// Session with `a.root` open and tree `events` loaded
pub fn loaded_session() -> MockSession {
    let mut session = mock_session();
    session.add_file("a.root").unwrap();
    session.load("events").unwrap();
    session
}
