// ABOUTME: The drawing commands: draw, draw_ratio, canvas, put_texts, show, save_objects.
// ABOUTME: Each fills or picks histograms, registers them and places them on pads.

use std::path::Path;

use lookat_core::{
    Binning, DrawRequest, Handle, Library, Lookup, ObjectKind, Payload, Plottable,
    RatioOrientation, Snapshot,
};
use lookat_layout::{Canvas, PadId, Surface};

use crate::error::SessionError;
use crate::session::Session;

/// Optional arguments of `draw`
#[derive(Debug, Clone, Default)]
pub struct DrawOptions {
    /// Add a pad to the current canvas instead of starting a new one
    pub same_pad: bool,
    /// Selection expression; entries where it is zero are skipped
    pub selection: Option<String>,
    /// Histogram name, `{0}` is replaced by a unique number
    pub name: Option<String>,
    pub binning: Option<Binning>,
    /// Tree to draw from instead of the current one
    pub tree: Option<String>,
}

impl DrawOptions {
    pub fn same_pad() -> Self {
        Self {
            same_pad: true,
            ..Self::default()
        }
    }
}

/// Optional arguments of `draw_ratio`
#[derive(Debug, Clone, Default)]
pub struct RatioOptions {
    pub numerator: Option<String>,
    pub denominator: Option<String>,
    /// Scale both inputs to unit area first; defaults to the configured policy
    pub normalised: Option<bool>,
    pub name: Option<String>,
}

/// Selection string keeping `var` strictly between `low` and `high`
pub fn sel(var: &str, low: f64, high: f64) -> String {
    format!("{low:.2} < {var} && {var} < {high:.2}")
}

/// How a histogram filled from `expression` is listed
fn draw_source(expression: &str, selection: Option<&str>) -> String {
    match selection {
        Some(selection) if !selection.trim().is_empty() => format!("{expression} {{{selection}}}"),
        _ => expression.to_string(),
    }
}

impl<L, S> Session<L, S>
where
    L: Library,
    S: Surface<L::Plot>,
{
    /// Fill a histogram of `expression` from the current tree, register it
    /// and draw it on a new canvas, or on a new pad of the current canvas
    /// with `same_pad`.
    ///
    /// A same-pad draw without explicit binning reuses the binning of the
    /// histogram drawn last on that canvas, so the two can be divided.
    ///
    /// A name starting with `+` fills into the existing histogram of that
    /// name instead, using its binning.
    pub fn draw(&mut self, expression: &str, options: DrawOptions) -> Result<Handle, SessionError> {
        if let Some(target) = options.name.as_deref().and_then(|n| n.strip_prefix('+')) {
            return self.append(target, expression, &options);
        }
        let tree_handle = self.tree_handle(options.tree.as_deref())?;
        let tree = self.tree_payload(tree_handle)?;

        let pattern = options
            .name
            .as_deref()
            .unwrap_or(self.config.histogram.name_pattern.as_str());
        let name = self.unique_name(pattern);
        let binning = match options.binning {
            Some(binning) => binning,
            None => self
                .inherited_binning(options.same_pad)
                .unwrap_or_else(|| Binning::auto(self.config.histogram.default_bins)),
        };
        let request = DrawRequest {
            expression,
            selection: options.selection.as_deref(),
            name: &name,
            binning,
        };
        let plot = self
            .library
            .evaluate(tree, &request)
            .map_err(|err| SessionError::from_evaluation(expression, err))?;

        let source = draw_source(expression, request.selection);
        let handle = self.registry.register(name.as_str(), source, Payload::Histogram(plot));
        tracing::info!(%handle, name = %name, expression, "Registered histogram");

        let pad = self.next_pad(options.same_pad);
        self.place(pad, handle, expression, "")?;
        Ok(handle)
    }

    fn append(&mut self, target: &str, expression: &str, options: &DrawOptions) -> Result<Handle, SessionError> {
        let tree_handle = self.tree_handle(options.tree.as_deref())?;
        let handle = self.registry.resolve(Lookup::parse(target))?.handle();

        let sum = {
            let (label, existing, _) = self.histogram(handle)?;
            let request = DrawRequest {
                expression,
                selection: options.selection.as_deref(),
                name: label,
                binning: Binning::Edges(existing.bin_edges().to_vec()),
            };
            let tree = self.tree_payload(tree_handle)?;
            let extra = self
                .library
                .evaluate(tree, &request)
                .map_err(|err| SessionError::from_evaluation(expression, err))?;
            self.library
                .add(existing, &extra)
                .map_err(|source| SessionError::Library {
                    context: format!("adding '{expression}' to '{label}'"),
                    source,
                })?
        };
        self.registry.replace_histogram(handle, sum);
        tracing::info!(%handle, expression, "Appended to histogram");

        match self.layout.canvas_showing(handle).map(Canvas::handle) {
            Some(canvas) => self.present(canvas)?,
            None => {
                let pad = self.next_pad(options.same_pad);
                self.place(pad, handle, expression, "")?;
            }
        }
        Ok(handle)
    }

    /// Fill `expression` with each entry weighted by the inverse of the
    /// `efficiency` histogram's content at the entry's value, then draw it
    /// like `draw`. Binning defaults to the efficiency's edges and the name
    /// to `h_<expression>_{0}`. Entries without a usable efficiency are
    /// left out and logged.
    pub fn draw_corrected(
        &mut self,
        expression: &str,
        efficiency: &str,
        options: DrawOptions,
    ) -> Result<Handle, SessionError> {
        let tree_handle = self.tree_handle(options.tree.as_deref())?;
        let eff_handle = self.registry.resolve(Lookup::parse(efficiency))?.handle();
        let pattern = options
            .name
            .clone()
            .unwrap_or_else(|| format!("h_{expression}_{{0}}"));
        let name = self.unique_name(&pattern);

        let (plot, skipped, source) = {
            let (eff_label, eff_plot, _) = self.histogram(eff_handle)?;
            let binning = options
                .binning
                .clone()
                .unwrap_or_else(|| Binning::Edges(eff_plot.bin_edges().to_vec()));
            let request = DrawRequest {
                expression,
                selection: options.selection.as_deref(),
                name: &name,
                binning,
            };
            let tree = self.tree_payload(tree_handle)?;
            let (plot, skipped) = self
                .library
                .evaluate_corrected(tree, &request, eff_plot)
                .map_err(|err| SessionError::from_evaluation(expression, err))?;
            let source = format!("{} [1/{eff_label}]", draw_source(expression, request.selection));
            (plot, skipped, source)
        };

        let handle = self.registry.register(name.as_str(), source, Payload::Histogram(plot));
        tracing::info!(%handle, name = %name, expression, skipped, "Registered corrected histogram");

        let pad = self.next_pad(options.same_pad);
        self.place(pad, handle, expression, "")?;
        Ok(handle)
    }

    /// Divide two histograms bin by bin and draw the result on a new pad of
    /// the current canvas. Without explicit inputs the two most recent
    /// histograms are used, latest over previous unless configured otherwise.
    pub fn draw_ratio(&mut self, options: RatioOptions) -> Result<Handle, SessionError> {
        let (num_handle, den_handle) = self.ratio_inputs(&options)?;
        let normalised = options.normalised.unwrap_or(self.config.ratio.normalised);

        let pattern = options
            .name
            .as_deref()
            .unwrap_or(self.config.histogram.ratio_pattern.as_str());
        let name = self.unique_name(pattern);

        let (plot, source, xlabel) = {
            let num = self.histogram(num_handle)?;
            let den = self.histogram(den_handle)?;
            let plot = self
                .library
                .divide(num.1, den.1, &name, normalised)
                .map_err(|source| SessionError::Library {
                    context: format!("dividing '{}' by '{}'", num.0, den.0),
                    source,
                })?;
            (plot, format!("{}/{}", num.0, den.0), num.2)
        };

        let handle = self
            .registry
            .register(name.as_str(), source.as_str(), Payload::Histogram(plot));
        tracing::info!(%handle, name = %name, ratio = %source, normalised, "Registered ratio");

        let pad = self.next_pad(true);
        self.place(pad, handle, &xlabel, "ratio")?;
        Ok(handle)
    }

    /// Start a new, empty canvas and make it current
    pub fn canvas(&mut self, name: Option<&str>) -> Result<Handle, SessionError> {
        let handle = self.registry.allocate();
        self.layout.new_canvas(handle, name);
        tracing::debug!(%handle, "Created canvas");
        self.present(handle)?;
        Ok(handle)
    }

    /// Set the texts of the current pad. `None` leaves a text unchanged.
    pub fn put_texts(
        &mut self,
        title: Option<&str>,
        xlabel: Option<&str>,
        ylabel: Option<&str>,
    ) -> Result<(), SessionError> {
        let pad = self.layout.current_pad().ok_or(SessionError::NoCanvas)?;
        let texts = self.layout.texts_mut(pad)?;
        for (slot, text) in [
            (&mut texts.title, title),
            (&mut texts.xlabel, xlabel),
            (&mut texts.ylabel, ylabel),
        ] {
            if let Some(text) = text {
                *slot = text.to_string();
            }
        }
        self.present(pad.canvas)
    }

    /// Redraw a canvas: the current one, one named `target`, or the latest
    /// canvas showing the object `target` resolves to. The canvas becomes
    /// current.
    pub fn show(&mut self, target: Option<&str>) -> Result<Handle, SessionError> {
        let canvas = match target {
            None => self.layout.current_handle().ok_or(SessionError::NoCanvas)?,
            Some(what) => self.find_canvas(what)?,
        };
        self.layout.make_current(canvas)?;
        self.present(canvas)?;
        Ok(canvas)
    }

    fn find_canvas(&self, what: &str) -> Result<Handle, SessionError> {
        if let Some(canvas) = self.layout.canvas_by_name(what) {
            return Ok(canvas.handle());
        }
        let lookup = Lookup::parse(what);
        if let Lookup::Handle(handle) = lookup {
            if self.layout.canvas(handle).is_some() {
                return Ok(handle);
            }
        }
        let object = self.registry.resolve(lookup)?.handle();
        self.layout
            .canvas_showing(object)
            .map(Canvas::handle)
            .ok_or_else(|| SessionError::NotFound(format!("a canvas showing {what}")))
    }

    /// Write every registered histogram to `path`. Returns how many.
    pub fn save_objects(&self, path: &Path) -> Result<usize, SessionError> {
        let mut snapshot = Snapshot::new();
        for object in self.registry.of_kind(ObjectKind::Histogram) {
            if let Some(plot) = object.as_histogram() {
                snapshot.add_histogram(object.handle(), object.label(), object.source(), plot);
            }
        }
        snapshot.save(path)?;
        tracing::info!(path = %path.display(), count = snapshot.histograms.len(), "Saved histograms");
        Ok(snapshot.histograms.len())
    }

    /// Replace `{0}` with the first number, counting from the number of
    /// histograms so far, that gives an unused label
    fn unique_name(&self, pattern: &str) -> String {
        if !pattern.contains("{0}") {
            return pattern.to_string();
        }
        let mut n = self.registry.count(ObjectKind::Histogram);
        loop {
            let name = pattern.replace("{0}", &n.to_string());
            if !self.registry.contains_label(&name) {
                return name;
            }
            n += 1;
        }
    }

    /// Edges of the histogram shown last on the current canvas
    fn inherited_binning(&self, same_pad: bool) -> Option<Binning> {
        if !same_pad {
            return None;
        }
        let shown = self.layout.current()?.latest_contents()?;
        let plot = self.registry.get(shown)?.as_histogram()?;
        Some(Binning::Edges(plot.bin_edges().to_vec()))
    }

    fn ratio_inputs(&self, options: &RatioOptions) -> Result<(Handle, Handle), SessionError> {
        let explicit = |what: &Option<String>| -> Result<Option<Handle>, SessionError> {
            match what {
                Some(what) => Ok(Some(self.registry.resolve(Lookup::parse(what))?.handle())),
                None => Ok(None),
            }
        };
        let numerator = explicit(&options.numerator)?;
        let denominator = explicit(&options.denominator)?;
        if let (Some(num), Some(den)) = (numerator, denominator) {
            return Ok((num, den));
        }

        let window = self.registry.most_recent_exact(ObjectKind::Histogram, 2)?;
        let (previous, latest) = (window[0].handle(), window[1].handle());
        let (num, den) = match self.config.ratio.orientation {
            RatioOrientation::LatestOverPrevious => (latest, previous),
            RatioOrientation::PreviousOverLatest => (previous, latest),
        };
        Ok((numerator.unwrap_or(num), denominator.unwrap_or(den)))
    }

    /// Label, payload and source of a histogram entry
    pub(crate) fn histogram(&self, handle: Handle) -> Result<(&str, &L::Plot, String), SessionError> {
        let object = self.registry.resolve(handle)?;
        let plot = object.as_histogram().ok_or_else(|| SessionError::WrongKind {
            handle,
            label: object.label().to_string(),
            actual: object.kind(),
            expected: ObjectKind::Histogram,
        })?;
        Ok((object.label(), plot, object.source().to_string()))
    }

    fn next_pad(&mut self, same_pad: bool) -> PadId {
        let registry = &mut self.registry;
        let pad = self.layout.new_pad(same_pad, || registry.allocate());
        tracing::debug!(canvas = %pad.canvas, pad = pad.index, "Allocated pad");
        pad
    }

    /// Draw `object` into `pad`, label the axes and show the canvas
    fn place(&mut self, pad: PadId, object: Handle, xlabel: &str, ylabel: &str) -> Result<(), SessionError> {
        self.layout.draw_into(pad, object)?;
        let texts = self.layout.texts_mut(pad)?;
        texts.title.clear();
        texts.legend.clear();
        texts.xlabel = xlabel.to_string();
        texts.ylabel = ylabel.to_string();
        self.present(pad.canvas)
    }
}
