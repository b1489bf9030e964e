// ABOUTME: Built-in analysis library: columnar tree files, expressions and histograms.
// ABOUTME: Implements the lookat-core backend traits without an external toolkit.

pub mod error;
pub mod expr;
pub mod file;
pub mod histogram;
pub mod library;
pub mod tree;

pub use error::DataError;
pub use expr::CompiledExpr;
pub use file::{BranchData, DataFile, TreeData};
pub use histogram::Histogram;
pub use library::{DataLibrary, OpenFile};
pub use tree::Tree;
