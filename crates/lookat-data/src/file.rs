// ABOUTME: On-disk layout of tree files: JSON, optionally zstd-compressed.
// ABOUTME: A file holds named trees, each a set of equally long numeric branches.

use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::path::Path;

use crate::error::DataError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchData {
    pub name: String,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeData {
    pub name: String,
    #[serde(default)]
    pub title: String,
    pub branches: Vec<BranchData>,
}

impl TreeData {
    /// Rows in the tree; every branch has this many values
    pub fn entries(&self) -> usize {
        self.branches.first().map_or(0, |b| b.values.len())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataFile {
    pub trees: Vec<TreeData>,
}

impl DataFile {
    /// Read and validate a tree file. Paths ending in `.zst` are decompressed first.
    pub fn load(path: &Path) -> Result<Self, DataError> {
        let io_err = |source| DataError::Io {
            path: path.to_path_buf(),
            source,
        };
        let raw = std::fs::read(path).map_err(io_err)?;

        let json = if is_compressed(path) {
            let mut decoder = zstd::Decoder::new(&raw[..]).map_err(io_err)?;
            let mut json = Vec::new();
            decoder.read_to_end(&mut json).map_err(io_err)?;
            json
        } else {
            raw
        };

        let file: DataFile = serde_json::from_slice(&json).map_err(|source| DataError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        file.validate(path)?;
        Ok(file)
    }

    pub fn save(&self, path: &Path) -> Result<(), DataError> {
        let io_err = |source| DataError::Io {
            path: path.to_path_buf(),
            source,
        };
        let json = serde_json::to_vec(self).map_err(|source| DataError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        let bytes = if is_compressed(path) {
            let mut encoder = zstd::Encoder::new(Vec::new(), 3).map_err(io_err)?;
            encoder.write_all(&json).map_err(io_err)?;
            encoder.finish().map_err(io_err)?
        } else {
            json
        };
        std::fs::write(path, bytes).map_err(io_err)
    }

    fn validate(&self, path: &Path) -> Result<(), DataError> {
        let shape = |message: String| DataError::Shape {
            path: path.to_path_buf(),
            message,
        };
        for (i, tree) in self.trees.iter().enumerate() {
            if self.trees[..i].iter().any(|t| t.name == tree.name) {
                return Err(shape(format!("tree '{}' appears twice", tree.name)));
            }
            let entries = tree.entries();
            for (j, branch) in tree.branches.iter().enumerate() {
                if branch.values.len() != entries {
                    return Err(shape(format!(
                        "branch '{}' of tree '{}' has {} values, expected {entries}",
                        branch.name,
                        tree.name,
                        branch.values.len()
                    )));
                }
                if tree.branches[..j].iter().any(|b| b.name == branch.name) {
                    return Err(shape(format!(
                        "branch '{}' appears twice in tree '{}'",
                        branch.name, tree.name
                    )));
                }
            }
        }
        Ok(())
    }
}

fn is_compressed(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "zst")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree(name: &str, branches: &[(&str, &[f64])]) -> TreeData {
        TreeData {
            name: name.to_string(),
            title: String::new(),
            branches: branches
                .iter()
                .map(|(n, v)| BranchData {
                    name: n.to_string(),
                    values: v.to_vec(),
                })
                .collect(),
        }
    }

    #[test]
    fn reads_plain_and_compressed() {
        let dir = tempfile::tempdir().unwrap();
        let file = DataFile {
            trees: vec![tree("t", &[("x", &[1.0, 2.0]), ("y", &[3.0, 4.0])])],
        };
        for name in ["t.json", "t.json.zst"] {
            let path = dir.path().join(name);
            file.save(&path).unwrap();
            assert_eq!(DataFile::load(&path).unwrap(), file);
        }
    }

    #[test]
    fn title_is_optional() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.json");
        std::fs::write(&path, r#"{"trees":[{"name":"t","branches":[]}]}"#).unwrap();
        let file = DataFile::load(&path).unwrap();
        assert_eq!(file.trees[0].entries(), 0);
    }

    #[test]
    fn ragged_branches_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        let file = DataFile {
            trees: vec![tree("t", &[("x", &[1.0, 2.0]), ("y", &[3.0])])],
        };
        file.save(&path).unwrap();
        assert!(matches!(DataFile::load(&path), Err(DataError::Shape { .. })));
    }

    #[test]
    fn duplicate_trees_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dup.json");
        let file = DataFile {
            trees: vec![tree("t", &[]), tree("t", &[])],
        };
        file.save(&path).unwrap();
        assert!(matches!(DataFile::load(&path), Err(DataError::Shape { .. })));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = DataFile::load(Path::new("/nonexistent/lookat.json")).unwrap_err();
        assert!(matches!(err, DataError::Io { .. }));
    }

    #[test]
    fn garbage_is_json_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("junk.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(DataFile::load(&path), Err(DataError::Json { .. })));
    }
}
