use series_shape::SeriesPayload;
use thiserror::Error;

use crate::labels::ChartLabels;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("chart container not found: {0}")]
    ContainerNotFound(String),
    #[error("chart backend error: {0}")]
    Backend(String),
}

/// Charting widget boundary.
///
/// Implementations create or reuse a chart bound to their container, replace
/// the displayed series wholesale on every `render`, and fit the visible time
/// range to the new data.
pub trait Renderer {
    fn render(&mut self, payload: &SeriesPayload) -> Result<(), RenderError>;

    /// Title and axis text shown next to the chart.
    fn set_labels(&mut self, labels: &ChartLabels) -> Result<(), RenderError>;
}

impl<R: Renderer + ?Sized> Renderer for Box<R> {
    fn render(&mut self, payload: &SeriesPayload) -> Result<(), RenderError> {
        (**self).render(payload)
    }

    fn set_labels(&mut self, labels: &ChartLabels) -> Result<(), RenderError> {
        (**self).set_labels(labels)
    }
}
