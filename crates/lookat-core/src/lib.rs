// ABOUTME: Shared types and configuration for lookat.
// ABOUTME: Defines the handle registry, the analysis library boundary, and config handling.

pub mod backend;
pub mod config;
pub mod registry;
pub mod snapshot;

pub use backend::{BackendError, Binning, DrawRequest, Evaluator, Library, Plottable};
pub use config::{Config, GridFlow, RatioOrientation};
pub use registry::{Handle, Lookup, ObjectKind, Payload, Registry, RegistryError, SessionObject};
pub use snapshot::{HistogramSnapshot, Snapshot, SnapshotError};
