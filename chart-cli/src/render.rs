use app_shell::{ChartLabels, RenderError, Renderer};
use chrono::DateTime;
use series_shape::SeriesPayload;
use ts_core::ViewKind;

/// Renderer that keeps the last dispatch in memory and describes it as text.
#[derive(Debug, Default)]
pub struct TextRenderer {
    last: Option<SeriesPayload>,
    labels: ChartLabels,
    dispatches: usize,
}

impl TextRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dispatches(&self) -> usize {
        self.dispatches
    }

    pub fn last(&self) -> Option<&SeriesPayload> {
        self.last.as_ref()
    }

    /// Widget-ready JSON of the last dispatch.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.last)
    }

    pub fn summary(&self) -> String {
        let Some(payload) = &self.last else {
            return "nothing rendered".to_string();
        };
        let mode = match payload.view() {
            ViewKind::Candlestick => "candlestick",
            ViewKind::Line => "line",
            ViewKind::Histogram => "histogram",
        };
        let mut out = format!("{}\n{}\n", self.labels.title, self.labels.axis);
        out.push_str(&format!("mode: {mode}, points: {}\n", payload.len()));
        if let Some((first, last)) = payload.time_range() {
            out.push_str(&format!("range: {} .. {}\n", fmt_time(first), fmt_time(last)));
        }
        if let Some(latest) = latest_value(payload) {
            out.push_str(&format!("latest: {latest}\n"));
        }
        out
    }
}

impl Renderer for TextRenderer {
    fn render(&mut self, payload: &SeriesPayload) -> Result<(), RenderError> {
        self.last = Some(payload.clone());
        self.dispatches += 1;
        Ok(())
    }

    fn set_labels(&mut self, labels: &ChartLabels) -> Result<(), RenderError> {
        self.labels = labels.clone();
        Ok(())
    }
}

fn latest_value(payload: &SeriesPayload) -> Option<String> {
    match payload {
        SeriesPayload::Candlestick(s) => {
            let c = s.candles.last()?;
            let v = s.volumes.last()?;
            Some(format!(
                "O {:.2} H {:.2} L {:.2} C {:.2} V {:.0}",
                c.open, c.high, c.low, c.close, v.value
            ))
        }
        SeriesPayload::Line { points, .. } => points.last().map(|p| format!("{:.2}", p.value)),
        SeriesPayload::Histogram { points } => points.last().map(|p| format!("{:.0}", p.volume)),
    }
}

fn fmt_time(ts: i64) -> String {
    DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| ts.to_string())
}
