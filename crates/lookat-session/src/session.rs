// ABOUTME: The Session value: everything one interactive run has created.
// ABOUTME: Owns the registry, the layout, the open files and the current tree.

use std::fmt;
use std::path::{Path, PathBuf};

use lookat_core::{
    BackendError, Config, Evaluator, Handle, Library, Lookup, ObjectKind, Registry, SessionObject,
};
use lookat_layout::{Canvas, LayoutManager, PadFrame, Surface};

use crate::error::SessionError;

/// Where the session is in `NoFileOpen -> FileOpen -> TreeLoaded`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    NoFileOpen,
    FileOpen,
    TreeLoaded,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SessionState::NoFileOpen => "no file open",
            SessionState::FileOpen => "file open",
            SessionState::TreeLoaded => "tree loaded",
        };
        f.write_str(text)
    }
}

/// A data file opened during the session. Closed files stay listed.
#[derive(Debug)]
pub struct FileEntry<F> {
    handle: Handle,
    path: PathBuf,
    file: Option<F>,
}

impl<F> FileEntry<F> {
    pub fn handle(&self) -> Handle {
        self.handle
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }
}

impl<F> fmt::Display for FileEntry<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} file '{}'", self.handle, self.path.display())?;
        if !self.is_open() {
            write!(f, " [closed]")?;
        }
        Ok(())
    }
}

/// Registered tree or histogram of a session over library `L`
pub type SessionObjectRef<'a, L> =
    &'a SessionObject<<L as Evaluator>::Tree, <L as Evaluator>::Plot>;

pub struct Session<L: Library, S> {
    pub(crate) config: Config,
    pub(crate) library: L,
    pub(crate) surface: S,
    pub(crate) registry: Registry<L::Tree, L::Plot>,
    pub(crate) layout: LayoutManager,
    pub(crate) files: Vec<FileEntry<L::File>>,
    pub(crate) current_file: Option<Handle>,
    pub(crate) current_tree: Option<Handle>,
}

impl<L, S> Session<L, S>
where
    L: Library,
    S: Surface<L::Plot>,
{
    pub fn new(config: Config, library: L, surface: S) -> Self {
        let layout = LayoutManager::new(config.layout.grid_flow);
        Self {
            config,
            library,
            surface,
            registry: Registry::new(),
            layout,
            files: Vec::new(),
            current_file: None,
            current_tree: None,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn library(&self) -> &L {
        &self.library
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn registry(&self) -> &Registry<L::Tree, L::Plot> {
        &self.registry
    }

    pub fn layout(&self) -> &LayoutManager {
        &self.layout
    }

    pub fn files(&self) -> &[FileEntry<L::File>] {
        &self.files
    }

    pub fn current_file(&self) -> Option<Handle> {
        self.current_file
    }

    pub fn current_tree(&self) -> Option<Handle> {
        self.current_tree
    }

    pub fn state(&self) -> SessionState {
        if self.current_tree.is_some() {
            SessionState::TreeLoaded
        } else if self.current_file.is_some() {
            SessionState::FileOpen
        } else {
            SessionState::NoFileOpen
        }
    }

    pub fn trees(&self) -> impl Iterator<Item = SessionObjectRef<'_, L>> {
        self.registry.of_kind(ObjectKind::Tree)
    }

    pub fn histograms(&self) -> impl Iterator<Item = SessionObjectRef<'_, L>> {
        self.registry.of_kind(ObjectKind::Histogram)
    }

    pub fn canvases(&self) -> &[Canvas] {
        self.layout.canvases()
    }

    /// Look an object up by `#handle`, bare number, label or expression
    pub fn resolve(&self, what: &str) -> Result<SessionObjectRef<'_, L>, SessionError> {
        Ok(self.registry.resolve(Lookup::parse(what))?)
    }

    /// Open a data file and make it current. The registry is kept; the
    /// current tree is cleared until the next `load`.
    pub fn add_file(&mut self, path: impl AsRef<Path>) -> Result<Handle, SessionError> {
        let path = path.as_ref();
        let file = self
            .library
            .open(path)
            .map_err(|source| SessionError::Library {
                context: format!("opening {}", path.display()),
                source,
            })?;

        let handle = self.registry.allocate();
        self.files.push(FileEntry {
            handle,
            path: path.to_path_buf(),
            file: Some(file),
        });
        self.current_file = Some(handle);
        self.current_tree = None;
        tracing::info!(%handle, path = %path.display(), "Opened file");
        Ok(handle)
    }

    /// Close the given file, or the current one. Trees loaded from it turn
    /// stale; histograms filled from them stay usable.
    pub fn close_file(&mut self, which: Option<Handle>) -> Result<Handle, SessionError> {
        let handle = which.or(self.current_file).ok_or(SessionError::NoFileOpen)?;
        let entry = self
            .files
            .iter_mut()
            .find(|f| f.handle == handle && f.file.is_some())
            .ok_or_else(|| SessionError::NoSuchFile(handle.to_string()))?;
        let path = entry.path.clone();
        if let Some(file) = entry.file.take() {
            self.library
                .close(file)
                .map_err(|source| SessionError::Library {
                    context: format!("closing {}", path.display()),
                    source,
                })?;
        }

        let invalidated = self.registry.invalidate_file(handle);
        if let Some(tree) = self.current_tree {
            if self.registry.get(tree).is_some_and(|t| t.is_stale()) {
                self.current_tree = None;
            }
        }
        if self.current_file == Some(handle) {
            self.current_file = self.files.iter().rev().find(|f| f.is_open()).map(|f| f.handle);
        }
        tracing::info!(%handle, path = %path.display(), invalidated, "Closed file");
        Ok(handle)
    }

    /// Tree names in the current file
    pub fn ls(&self) -> Result<Vec<String>, SessionError> {
        let (_, file) = self.open_current_file()?;
        Ok(self.library.tree_names(file))
    }

    /// Load a tree from the current file, register it and make it current
    pub fn load(&mut self, tree: &str) -> Result<Handle, SessionError> {
        let (path, file) = self.open_current_file()?;
        let payload = self.library.tree(file, tree).map_err(|err| match err {
            BackendError::NoSuchTree(_) => SessionError::NoSuchTree {
                tree: tree.to_string(),
                file: path.display().to_string(),
            },
            source => SessionError::Library {
                context: format!("loading '{tree}'"),
                source,
            },
        })?;
        let source = format!("{}:{}", path.display(), tree);

        let origin = self.current_file;
        let handle = self.registry.register_tree(tree, source, payload, origin);
        self.current_tree = Some(handle);
        tracing::info!(%handle, tree, "Loaded tree");
        Ok(handle)
    }

    /// Join tree `name` from several files into one tree and make it current
    pub fn create_chain(&mut self, name: &str, paths: &[PathBuf]) -> Result<Handle, SessionError> {
        let chain = self
            .library
            .chain(name, paths)
            .map_err(|source| SessionError::Library {
                context: format!("chaining '{name}' over {} files", paths.len()),
                source,
            })?;
        let source = format!("chain:{}", name);
        // Chains read their files up front, closing files does not affect them
        let handle = self.registry.register_tree(name, source, chain, None);
        self.current_tree = Some(handle);
        tracing::info!(%handle, name, files = paths.len(), "Created chain");
        Ok(handle)
    }

    /// Branch names of the given tree, or of the current one
    pub fn branches(&self, tree: Option<&str>) -> Result<Vec<String>, SessionError> {
        let handle = self.tree_handle(tree)?;
        let tree = self.tree_payload(handle)?;
        Ok(self.library.branch_names(tree))
    }

    pub(crate) fn tree_handle(&self, tree: Option<&str>) -> Result<Handle, SessionError> {
        match tree {
            Some(what) => Ok(self.registry.resolve(Lookup::parse(what))?.handle()),
            None => self.current_tree.ok_or(SessionError::NoTreeLoaded),
        }
    }

    pub(crate) fn tree_payload(&self, handle: Handle) -> Result<&L::Tree, SessionError> {
        let object = self.registry.resolve(handle)?;
        object.as_tree().ok_or_else(|| SessionError::WrongKind {
            handle,
            label: object.label().to_string(),
            actual: object.kind(),
            expected: ObjectKind::Tree,
        })
    }

    fn open_current_file(&self) -> Result<(&Path, &L::File), SessionError> {
        self.current_file
            .and_then(|handle| self.files.iter().find(|f| f.handle == handle))
            .and_then(|entry| entry.file.as_ref().map(|file| (entry.path.as_path(), file)))
            .ok_or(SessionError::NoFileOpen)
    }

    /// Render a canvas on the surface
    pub(crate) fn present(&mut self, canvas: Handle) -> Result<(), SessionError> {
        let Some(canvas) = self.layout.canvas(canvas) else {
            return Err(SessionError::NotFound(canvas.to_string()));
        };
        let grid = canvas.grid();
        let frames: Vec<PadFrame<'_, L::Plot>> = canvas
            .pads()
            .iter()
            .map(|pad| PadFrame {
                pad,
                position: grid.position(pad.index()),
                rect: grid.rect(pad.index()),
                plot: pad
                    .contents()
                    .and_then(|h| self.registry.get(h))
                    .and_then(|o| o.as_histogram().map(|plot| (o.label(), plot))),
            })
            .collect();
        self.surface.present(canvas, &frames)?;
        Ok(())
    }
}

impl<L: Library, S> fmt::Debug for Session<L, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("objects", &self.registry.len())
            .field("canvases", &self.layout.canvases().len())
            .field("files", &self.files.len())
            .field("current_file", &self.current_file)
            .field("current_tree", &self.current_tree)
            .finish()
    }
}
