// ABOUTME: Pad decorations: normalising the shown histogram and legend entries.
// ABOUTME: Both act on the current canvas and redraw it.

use lookat_core::{Handle, Library, ObjectKind};
use lookat_layout::{PadId, PadSlot, Surface};

use crate::error::SessionError;
use crate::session::Session;

/// Y axis label of a normalised pad
pub const NORMALISED_LABEL: &str = "normalised to unity";

impl<L, S> Session<L, S>
where
    L: Library,
    S: Surface<L::Plot>,
{
    /// Scale the histogram on the current pad to unit integral and label the
    /// y axis. The registry entry keeps its handle and label.
    pub fn normalise(&mut self) -> Result<Handle, SessionError> {
        let pad = self.layout.current_pad().ok_or(SessionError::NoCanvas)?;
        let handle = self
            .layout
            .current()
            .and_then(|canvas| canvas.latest_contents())
            .ok_or(SessionError::EmptyPad)?;

        let scaled = {
            let (label, plot, _) = self.histogram(handle)?;
            self.library
                .normalise(plot)
                .map_err(|source| SessionError::Library {
                    context: format!("normalising '{label}'"),
                    source,
                })?
        };
        self.registry.replace_histogram(handle, scaled);
        self.layout.texts_mut(pad)?.ylabel = NORMALISED_LABEL.to_string();
        tracing::info!(%handle, "Normalised histogram");

        self.present(pad.canvas)?;
        Ok(handle)
    }

    /// Legend entries for the histograms on the current canvas, in pad
    /// order. Pads past the last label keep what they had.
    pub fn legend(&mut self, labels: &[String]) -> Result<(), SessionError> {
        let canvas = self.layout.current().ok_or(SessionError::NoCanvas)?;
        let canvas_handle = canvas.handle();
        let pads: Vec<PadId> = canvas
            .pads()
            .iter()
            .filter(|pad| {
                pad.contents()
                    .and_then(|h| self.registry.get(h))
                    .is_some_and(|object| object.kind() == ObjectKind::Histogram)
            })
            .map(PadSlot::id)
            .collect();
        if labels.len() > pads.len() {
            return Err(SessionError::TooManyLabels {
                labels: labels.len(),
                histograms: pads.len(),
            });
        }

        for (pad, label) in pads.into_iter().zip(labels) {
            self.layout.texts_mut(pad)?.legend = label.clone();
        }
        tracing::debug!(canvas = %canvas_handle, entries = labels.len(), "Set legend");
        self.present(canvas_handle)
    }

    /// Legend of the current canvas: each labelled object with its entry
    pub fn get_legend(&self) -> Result<Vec<(Handle, String)>, SessionError> {
        let canvas = self.layout.current().ok_or(SessionError::NoCanvas)?;
        Ok(canvas
            .pads()
            .iter()
            .filter(|pad| !pad.texts().legend.is_empty())
            .filter_map(|pad| pad.contents().map(|h| (h, pad.texts().legend.clone())))
            .collect())
    }
}
