// ABOUTME: Interactive session: registry, canvases, open files and the current tree.
// ABOUTME: Provides load, draw and draw_ratio plus the helper commands built on them.

mod decorate;
mod draw;
mod error;
mod session;
#[cfg(test)]
mod testing;

pub use draw::{sel, DrawOptions, RatioOptions};
pub use error::SessionError;
pub use session::{FileEntry, Session, SessionObjectRef, SessionState};
