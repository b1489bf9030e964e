// ABOUTME: The built-in analysis library behind the session's backend traits.
// ABOUTME: Opens tree files, fills histograms from expressions and divides them.

use std::path::{Path, PathBuf};

use lookat_core::{BackendError, DrawRequest, Evaluator, Library};

use crate::expr::CompiledExpr;
use crate::file::DataFile;
use crate::histogram::Histogram;
use crate::tree::Tree;

/// A tree file held open by the library
#[derive(Debug)]
pub struct OpenFile {
    path: PathBuf,
    trees: Vec<Tree>,
}

impl OpenFile {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[derive(Debug, Default)]
pub struct DataLibrary {
    open_files: usize,
}

impl DataLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Files opened and not yet closed
    pub fn open_files(&self) -> usize {
        self.open_files
    }

    fn find(file: &OpenFile, name: &str) -> Option<Tree> {
        file.trees.iter().find(|t| t.name() == name).cloned()
    }
}

impl Evaluator for DataLibrary {
    type Tree = Tree;
    type Plot = Histogram;

    fn evaluate(&self, tree: &Tree, request: &DrawRequest<'_>) -> Result<Histogram, BackendError> {
        let values = CompiledExpr::compile(request.expression)?.eval_tree(tree)?;

        let weights = match request.selection.map(str::trim) {
            Some(selection) if !selection.is_empty() => {
                Some(CompiledExpr::compile(selection)?.eval_tree(tree)?)
            }
            _ => None,
        };

        let hist = Histogram::fill(
            request.name,
            request.expression,
            &values,
            weights.as_deref(),
            &request.binning,
        )?;
        tracing::debug!(
            name = request.name,
            tree = tree.name(),
            bins = hist.bin_content.len(),
            entries = hist.entries,
            "Filled histogram"
        );
        Ok(hist)
    }

    fn evaluate_corrected(
        &self,
        tree: &Tree,
        request: &DrawRequest<'_>,
        efficiency: &Histogram,
    ) -> Result<(Histogram, usize), BackendError> {
        let values = CompiledExpr::compile(request.expression)?.eval_tree(tree)?;
        let selection = match request.selection.map(str::trim) {
            Some(selection) if !selection.is_empty() => {
                Some(CompiledExpr::compile(selection)?.eval_tree(tree)?)
            }
            _ => None,
        };

        let mut skipped = 0;
        let weights: Vec<f64> = values
            .iter()
            .enumerate()
            .map(|(i, &value)| {
                let selected = selection.as_ref().map_or(1.0, |s| s[i]);
                if selected == 0.0 {
                    return 0.0;
                }
                match efficiency.find_bin(value).map(|bin| efficiency.bin_content[bin]) {
                    Some(eff) if eff != 0.0 && eff.is_finite() => selected / eff,
                    _ => {
                        skipped += 1;
                        0.0
                    }
                }
            })
            .collect();

        let hist = Histogram::fill(
            request.name,
            request.expression,
            &values,
            Some(weights.as_slice()),
            &request.binning,
        )?;
        if skipped > 0 {
            tracing::warn!(name = request.name, skipped, "Entries without efficiency left out");
        }
        tracing::debug!(
            name = request.name,
            efficiency = %efficiency.name,
            entries = hist.entries,
            "Filled corrected histogram"
        );
        Ok((hist, skipped))
    }
}

impl Library for DataLibrary {
    type File = OpenFile;

    fn open(&mut self, path: &Path) -> Result<OpenFile, BackendError> {
        let data = DataFile::load(path)?;
        let trees: Vec<Tree> = data.trees.into_iter().map(Tree::from_data).collect();
        self.open_files += 1;
        tracing::debug!(path = %path.display(), trees = trees.len(), "Opened data file");
        Ok(OpenFile {
            path: path.to_path_buf(),
            trees,
        })
    }

    fn close(&mut self, file: OpenFile) -> Result<(), BackendError> {
        self.open_files = self.open_files.saturating_sub(1);
        tracing::debug!(path = %file.path.display(), "Closed data file");
        Ok(())
    }

    fn tree_names(&self, file: &OpenFile) -> Vec<String> {
        file.trees.iter().map(|t| t.name().to_string()).collect()
    }

    fn tree(&self, file: &OpenFile, name: &str) -> Result<Tree, BackendError> {
        Self::find(file, name).ok_or_else(|| BackendError::NoSuchTree(name.to_string()))
    }

    fn chain(&mut self, name: &str, paths: &[PathBuf]) -> Result<Tree, BackendError> {
        if paths.is_empty() {
            return Err(BackendError::NoSuchTree(name.to_string()));
        }
        let mut parts = Vec::with_capacity(paths.len());
        for path in paths {
            let data = DataFile::load(path)?;
            let tree = data
                .trees
                .into_iter()
                .find(|t| t.name == name)
                .ok_or_else(|| BackendError::NoSuchTree(format!("{name} (in {})", path.display())))?;
            parts.push(Tree::from_data(tree));
        }
        let chain = Tree::chain(name, &parts);
        tracing::debug!(name, files = paths.len(), entries = chain.entries(), "Chained trees");
        Ok(chain)
    }

    fn branch_names(&self, tree: &Tree) -> Vec<String> {
        tree.branch_names().to_vec()
    }

    fn divide(
        &self,
        numerator: &Histogram,
        denominator: &Histogram,
        name: &str,
        normalised: bool,
    ) -> Result<Histogram, BackendError> {
        Ok(numerator.divide(denominator, name, normalised)?)
    }

    fn normalise(&self, plot: &Histogram) -> Result<Histogram, BackendError> {
        Ok(plot.scaled_to_unit()?)
    }

    fn add(&self, target: &Histogram, extra: &Histogram) -> Result<Histogram, BackendError> {
        Ok(target.merged(extra)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::{BranchData, TreeData};
    use lookat_core::Binning;

    fn write_file(dir: &Path, name: &str, x: &[f64]) -> PathBuf {
        let path = dir.join(name);
        DataFile {
            trees: vec![TreeData {
                name: "events".to_string(),
                title: String::new(),
                branches: vec![BranchData {
                    name: "x".to_string(),
                    values: x.to_vec(),
                }],
            }],
        }
        .save(&path)
        .unwrap();
        path
    }

    fn request<'a>(expression: &'a str, selection: Option<&'a str>) -> DrawRequest<'a> {
        DrawRequest {
            expression,
            selection,
            name: "h",
            binning: Binning::Fixed { bins: 4, low: 0.0, high: 4.0 },
        }
    }

    #[test]
    fn open_lookup_close() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "a.json", &[1.0, 2.0]);
        let mut lib = DataLibrary::new();
        let file = lib.open(&path).unwrap();
        assert_eq!(lib.open_files(), 1);
        assert_eq!(lib.tree_names(&file), vec!["events"]);
        let tree = lib.tree(&file, "events").unwrap();
        assert_eq!(lib.branch_names(&tree), vec!["x"]);
        assert!(matches!(lib.tree(&file, "nope"), Err(BackendError::NoSuchTree(_))));
        lib.close(file).unwrap();
        assert_eq!(lib.open_files(), 0);
        // Trees outlive the file handle they came from
        assert_eq!(tree.entries(), 2);
    }

    #[test]
    fn selection_filters_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "a.json", &[0.5, 1.5, 2.5, 3.5]);
        let mut lib = DataLibrary::new();
        let file = lib.open(&path).unwrap();
        let tree = lib.tree(&file, "events").unwrap();

        let all = lib.evaluate(&tree, &request("x", None)).unwrap();
        assert_eq!(all.bin_content, vec![1.0, 1.0, 1.0, 1.0]);

        let cut = lib.evaluate(&tree, &request("x", Some("x > 2"))).unwrap();
        assert_eq!(cut.bin_content, vec![0.0, 0.0, 1.0, 1.0]);

        let blank = lib.evaluate(&tree, &request("x", Some("  "))).unwrap();
        assert_eq!(blank.entries, 4.0);
    }

    #[test]
    fn expression_errors_map_to_backend_kinds() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "a.json", &[1.0]);
        let mut lib = DataLibrary::new();
        let file = lib.open(&path).unwrap();
        let tree = lib.tree(&file, "events").unwrap();

        assert!(matches!(
            lib.evaluate(&tree, &request("x +", None)),
            Err(BackendError::Expression(_))
        ));
        assert!(matches!(
            lib.evaluate(&tree, &request("y", None)),
            Err(BackendError::NoSuchBranch(name)) if name == "y"
        ));
        assert!(matches!(
            lib.evaluate(&tree, &request("x:x", None)),
            Err(BackendError::Expression(_))
        ));
    }

    #[test]
    fn chain_spans_files() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_file(dir.path(), "a.json", &[0.5]);
        let b = write_file(dir.path(), "b.json.zst", &[1.5, 2.5]);
        let mut lib = DataLibrary::new();
        let chain = lib.chain("events", &[a.clone(), b]).unwrap();
        assert_eq!(chain.entries(), 3);

        assert!(matches!(lib.chain("other", &[a]), Err(BackendError::NoSuchTree(_))));
        assert!(lib.chain("events", &[]).is_err());
    }

    #[test]
    fn corrected_fill_divides_by_efficiency() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "a.json", &[0.5, 1.5, 1.5, 2.5, 3.5, 9.0]);
        let mut lib = DataLibrary::new();
        let file = lib.open(&path).unwrap();
        let tree = lib.tree(&file, "events").unwrap();

        let mut efficiency = Histogram::with_edges("eff", "x", vec![0.0, 1.0, 2.0, 3.0, 4.0]).unwrap();
        efficiency.bin_content = vec![0.5, 0.25, 1.0, 0.0];

        let (hist, skipped) = lib
            .evaluate_corrected(&tree, &request("x", None), &efficiency)
            .unwrap();
        assert_eq!(hist.bin_content, vec![2.0, 8.0, 1.0, 0.0]);
        // 3.5 has zero efficiency, 9.0 is outside the efficiency range
        assert_eq!(skipped, 2);
        assert_eq!(hist.entries, 4.0);

        let (cut, skipped) = lib
            .evaluate_corrected(&tree, &request("x", Some("x < 2")), &efficiency)
            .unwrap();
        assert_eq!(cut.bin_content, vec![2.0, 8.0, 0.0, 0.0]);
        assert_eq!(skipped, 0);
    }

    #[test]
    fn normalise_and_add_go_through_the_histogram() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "a.json", &[0.5, 1.5, 1.5, 2.5]);
        let mut lib = DataLibrary::new();
        let file = lib.open(&path).unwrap();
        let tree = lib.tree(&file, "events").unwrap();
        let h = lib.evaluate(&tree, &request("x", None)).unwrap();

        let unit = lib.normalise(&h).unwrap();
        assert_eq!(unit.bin_content, vec![0.25, 0.5, 0.25, 0.0]);
        let twice = lib.add(&h, &h).unwrap();
        assert_eq!(twice.bin_content, vec![2.0, 4.0, 2.0, 0.0]);
        assert_eq!(twice.entries, 8.0);
    }

    #[test]
    fn missing_file_is_io_error() {
        let mut lib = DataLibrary::new();
        let err = lib.open(Path::new("/nonexistent/data.json")).unwrap_err();
        assert!(matches!(err, BackendError::Io { .. }));
        assert_eq!(lib.open_files(), 0);
    }
}
