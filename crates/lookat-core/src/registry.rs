// ABOUTME: Handle registry for the trees and histograms created in a session.
// ABOUTME: Hands out monotonic handles and answers "most recent N" lookups.

use std::fmt;
use std::str::FromStr;

/// Session-scoped identifier for a registered object, canvas or file.
///
/// Handles come from one counter per session, so a canvas and a histogram
/// never share a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Handle(pub u64);

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl FromStr for Handle {
    type Err = std::num::ParseIntError;

    /// Accepts both `#7` and `7`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.trim().strip_prefix('#').unwrap_or(s.trim());
        digits.parse().map(Handle)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Tree,
    Histogram,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectKind::Tree => write!(f, "tree"),
            ObjectKind::Histogram => write!(f, "histogram"),
        }
    }
}

/// Library-produced value held by a registry entry. The registry never
/// looks inside it.
#[derive(Debug, Clone)]
pub enum Payload<T, H> {
    Tree(T),
    Histogram(H),
}

impl<T, H> Payload<T, H> {
    pub fn kind(&self) -> ObjectKind {
        match self {
            Payload::Tree(_) => ObjectKind::Tree,
            Payload::Histogram(_) => ObjectKind::Histogram,
        }
    }
}

/// One registered tree or histogram
#[derive(Debug, Clone)]
pub struct SessionObject<T, H> {
    handle: Handle,
    label: String,
    source: String,
    created_at_index: usize,
    origin_file: Option<Handle>,
    stale: bool,
    payload: Payload<T, H>,
}

impl<T, H> SessionObject<T, H> {
    pub fn handle(&self) -> Handle {
        self.handle
    }

    /// User-visible name, e.g. `myHist_0` or `simple_tree`
    pub fn label(&self) -> &str {
        &self.label
    }

    /// What produced the object: an expression, a tree path, or `num/den`
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn created_at_index(&self) -> usize {
        self.created_at_index
    }

    pub fn kind(&self) -> ObjectKind {
        self.payload.kind()
    }

    /// File the tree was loaded from, if it came from a single file
    pub fn origin_file(&self) -> Option<Handle> {
        self.origin_file
    }

    /// True once the file backing this tree has been closed
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub fn payload(&self) -> &Payload<T, H> {
        &self.payload
    }

    pub fn as_tree(&self) -> Option<&T> {
        match &self.payload {
            Payload::Tree(tree) => Some(tree),
            Payload::Histogram(_) => None,
        }
    }

    pub fn as_histogram(&self) -> Option<&H> {
        match &self.payload {
            Payload::Histogram(hist) => Some(hist),
            Payload::Tree(_) => None,
        }
    }
}

impl<T, H> fmt::Display for SessionObject<T, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} '{}'", self.handle, self.kind(), self.label)?;
        if self.source != self.label {
            write!(f, " ({})", self.source)?;
        }
        if self.stale {
            write!(f, " [closed]")?;
        }
        Ok(())
    }
}

/// How a user refers to a registered object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup<'a> {
    Handle(Handle),
    Label(&'a str),
}

impl<'a> Lookup<'a> {
    /// Numbers (with or without a leading `#`) are handles, anything else a label
    pub fn parse(text: &'a str) -> Self {
        match text.parse::<Handle>() {
            Ok(handle) => Lookup::Handle(handle),
            Err(_) => Lookup::Label(text),
        }
    }
}

impl From<Handle> for Lookup<'_> {
    fn from(handle: Handle) -> Self {
        Lookup::Handle(handle)
    }
}

impl<'a> From<&'a str> for Lookup<'a> {
    fn from(label: &'a str) -> Self {
        Lookup::Label(label)
    }
}

impl fmt::Display for Lookup<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lookup::Handle(handle) => write!(f, "{handle}"),
            Lookup::Label(label) => write!(f, "'{label}'"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("Nothing registered under {0}")]
    NotFound(String),

    #[error("{handle} '{label}' belongs to a closed file")]
    StaleReference { handle: Handle, label: String },

    #[error("Need {required} {kind}s but only {available} registered")]
    InsufficientHistory {
        kind: ObjectKind,
        required: usize,
        available: usize,
    },
}

/// Append-only list of every tree and histogram in the session
#[derive(Debug)]
pub struct Registry<T, H> {
    objects: Vec<SessionObject<T, H>>,
    next_handle: u64,
}

impl<T, H> Registry<T, H> {
    pub fn new() -> Self {
        Self {
            objects: Vec::new(),
            next_handle: 1,
        }
    }

    /// Take the next handle without registering an object (canvases, files)
    pub fn allocate(&mut self) -> Handle {
        let handle = Handle(self.next_handle);
        self.next_handle += 1;
        handle
    }

    /// Register an object, returns its handle. Duplicate labels are fine.
    pub fn register(
        &mut self,
        label: impl Into<String>,
        source: impl Into<String>,
        payload: Payload<T, H>,
    ) -> Handle {
        self.insert(label.into(), source.into(), payload, None)
    }

    /// Register a tree that lives in an open file so closing the file can
    /// invalidate it
    pub fn register_tree(
        &mut self,
        label: impl Into<String>,
        source: impl Into<String>,
        tree: T,
        file: Option<Handle>,
    ) -> Handle {
        self.insert(label.into(), source.into(), Payload::Tree(tree), file)
    }

    fn insert(
        &mut self,
        label: String,
        source: String,
        payload: Payload<T, H>,
        origin_file: Option<Handle>,
    ) -> Handle {
        let handle = self.allocate();
        self.objects.push(SessionObject {
            handle,
            label,
            source,
            created_at_index: self.objects.len(),
            origin_file,
            stale: false,
            payload,
        });
        handle
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// All entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &SessionObject<T, H>> {
        self.objects.iter()
    }

    pub fn of_kind(&self, kind: ObjectKind) -> impl Iterator<Item = &SessionObject<T, H>> {
        self.objects.iter().filter(move |o| o.kind() == kind)
    }

    pub fn count(&self, kind: ObjectKind) -> usize {
        self.of_kind(kind).count()
    }

    pub fn get(&self, handle: Handle) -> Option<&SessionObject<T, H>> {
        // Handles grow with insertion order, but canvases and files take
        // numbers too, so the list is sorted without being dense.
        self.objects
            .binary_search_by_key(&handle, |o| o.handle)
            .ok()
            .map(|idx| &self.objects[idx])
    }

    pub fn contains_label(&self, label: &str) -> bool {
        self.objects.iter().any(|o| o.label == label)
    }

    /// Last `n` entries of `kind`, oldest first. Returns fewer when the
    /// history is shorter.
    pub fn most_recent(&self, kind: ObjectKind, n: usize) -> Vec<&SessionObject<T, H>> {
        let mut window: Vec<_> = self
            .objects
            .iter()
            .rev()
            .filter(|o| o.kind() == kind)
            .take(n)
            .collect();
        window.reverse();
        window
    }

    /// Like `most_recent`, but exactly `n` entries or `InsufficientHistory`
    pub fn most_recent_exact(
        &self,
        kind: ObjectKind,
        n: usize,
    ) -> Result<Vec<&SessionObject<T, H>>, RegistryError> {
        let window = self.most_recent(kind, n);
        if window.len() < n {
            return Err(RegistryError::InsufficientHistory {
                kind,
                required: n,
                available: window.len(),
            });
        }
        Ok(window)
    }

    /// Find an entry by handle, or by the most recent matching label (then
    /// source expression). A handle that is not registered is tried as a
    /// label, so all-digit labels stay reachable.
    pub fn resolve<'a>(
        &self,
        lookup: impl Into<Lookup<'a>>,
    ) -> Result<&SessionObject<T, H>, RegistryError> {
        let lookup = lookup.into();
        let found = match lookup {
            Lookup::Handle(handle) => self
                .get(handle)
                .or_else(|| self.by_label(&handle.0.to_string())),
            Lookup::Label(label) => self.by_label(label),
        };
        let object = found.ok_or_else(|| RegistryError::NotFound(lookup.to_string()))?;
        if object.stale {
            return Err(RegistryError::StaleReference {
                handle: object.handle,
                label: object.label.clone(),
            });
        }
        Ok(object)
    }

    fn by_label(&self, label: &str) -> Option<&SessionObject<T, H>> {
        self.objects
            .iter()
            .rev()
            .find(|o| o.label == label)
            .or_else(|| self.objects.iter().rev().find(|o| o.source == label))
    }

    /// Swap the histogram held by `handle`, returns the one it replaced.
    /// `None` when `handle` is not a registered histogram.
    pub fn replace_histogram(&mut self, handle: Handle, plot: H) -> Option<H> {
        let idx = self.objects.binary_search_by_key(&handle, |o| o.handle).ok()?;
        match &mut self.objects[idx].payload {
            Payload::Histogram(old) => Some(std::mem::replace(old, plot)),
            Payload::Tree(_) => None,
        }
    }

    /// Mark every tree loaded from `file` as stale, returns how many were hit
    pub fn invalidate_file(&mut self, file: Handle) -> usize {
        let mut hit = 0;
        for object in self.objects.iter_mut() {
            if object.origin_file == Some(file) && !object.stale {
                object.stale = true;
                hit += 1;
            }
        }
        hit
    }
}

impl<T, H> Default for Registry<T, H> {
    fn default() -> Self {
        Self::new()
    }
}
