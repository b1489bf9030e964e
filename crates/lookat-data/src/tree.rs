// ABOUTME: In-memory columnar tree, shared cheaply between the file and the session.
// ABOUTME: Chains concatenate same-named trees from several files.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::DataError;
use crate::file::TreeData;

#[derive(Debug)]
struct Columns {
    name: String,
    title: String,
    entries: usize,
    order: Vec<String>,
    values: HashMap<String, Vec<f64>>,
}

/// A named set of equally long numeric columns
#[derive(Debug, Clone)]
pub struct Tree {
    inner: Arc<Columns>,
}

impl Tree {
    pub fn from_data(data: TreeData) -> Self {
        let entries = data.entries();
        let order = data.branches.iter().map(|b| b.name.clone()).collect();
        let values = data
            .branches
            .into_iter()
            .map(|b| (b.name, b.values))
            .collect();
        Self {
            inner: Arc::new(Columns {
                name: data.name,
                title: data.title,
                entries,
                order,
                values,
            }),
        }
    }

    /// Concatenate `parts` row-wise. Branches missing from any part are dropped.
    pub fn chain(name: &str, parts: &[Tree]) -> Self {
        let order: Vec<String> = parts
            .first()
            .map(|first| {
                first
                    .branch_names()
                    .iter()
                    .filter(|b| parts.iter().all(|p| p.column(b).is_some()))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        let mut values = HashMap::new();
        for branch in &order {
            let joined: Vec<f64> = parts
                .iter()
                .filter_map(|p| p.column(branch))
                .flat_map(|c| c.iter().copied())
                .collect();
            values.insert(branch.clone(), joined);
        }

        Self {
            inner: Arc::new(Columns {
                name: name.to_string(),
                title: format!("chain of {} trees", parts.len()),
                entries: parts.iter().map(Tree::entries).sum(),
                order,
                values,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn title(&self) -> &str {
        &self.inner.title
    }

    pub fn entries(&self) -> usize {
        self.inner.entries
    }

    /// Branch names in file order
    pub fn branch_names(&self) -> &[String] {
        &self.inner.order
    }

    pub fn column(&self, branch: &str) -> Option<&[f64]> {
        self.inner.values.get(branch).map(Vec::as_slice)
    }

    pub fn require(&self, branch: &str) -> Result<&[f64], DataError> {
        self.column(branch)
            .ok_or_else(|| DataError::UnknownBranch(branch.to_string()))
    }
}
