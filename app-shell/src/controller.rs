use data_feed::{CommitOutcome, DataEvent, DataSink, DataStore, FetchTicket};
use series_shape::{shape, Palette, SeriesPayload};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};
use ts_core::{normalize_symbol, Field, Granularity, ParseError};

use crate::labels::{ChartLabels, LabelTable};
use crate::renderer::Renderer;

pub const DEFAULT_SYMBOL: &str = "AAPL";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("no label for {field} at {granularity}")]
    MissingLabel {
        field: Field,
        granularity: Granularity,
    },
}

/// The (interval, field) pair on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionState {
    pub granularity: Granularity,
    pub field: Field,
}

impl Default for SelectionState {
    fn default() -> Self {
        Self {
            granularity: Granularity::Yearly,
            field: Field::All,
        }
    }
}

/// Owns the bar store and the selection, and dispatches one render per
/// selection change.
pub struct SelectionController<R: Renderer> {
    renderer: R,
    store: DataStore,
    state: SelectionState,
    labels: LabelTable,
    palette: Palette,
}

impl<R: Renderer> SelectionController<R> {
    pub fn new(renderer: R) -> Self {
        Self {
            renderer,
            store: DataStore::new(),
            state: SelectionState::default(),
            labels: LabelTable::standard(),
            palette: Palette::default(),
        }
    }

    /// Use a custom label table; it must cover every combination.
    pub fn with_labels(mut self, labels: LabelTable) -> Result<Self, SelectionError> {
        labels.validate()?;
        self.labels = labels;
        Ok(self)
    }

    pub fn with_palette(mut self, palette: Palette) -> Self {
        self.palette = palette;
        self
    }

    pub fn with_state(mut self, state: SelectionState) -> Self {
        self.state = state;
        self
    }

    pub fn state(&self) -> SelectionState {
        self.state
    }

    pub fn store(&self) -> &DataStore {
        &self.store
    }

    pub fn symbol(&self) -> Option<&str> {
        self.store.ticket().map(|t| t.symbol.as_str())
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    /// Switch interval. Returns whether a render was dispatched; selecting
    /// the current interval does nothing.
    pub fn select_granularity(&mut self, granularity: Granularity) -> bool {
        if granularity == self.state.granularity {
            return false;
        }
        self.state.granularity = granularity;
        self.dispatch()
    }

    /// Switch field under the same rules as [`Self::select_granularity`].
    pub fn select_field(&mut self, field: Field) -> bool {
        if field == self.state.field {
            return false;
        }
        self.state.field = field;
        self.dispatch()
    }

    /// Interval switch driven by a switcher label. Unknown labels leave the
    /// state and the displayed chart untouched.
    pub fn select_granularity_label(&mut self, label: &str) -> Result<bool, SelectionError> {
        let granularity = Granularity::from_label(label).map_err(|err| {
            warn!(%label, "unknown interval selected; render aborted");
            SelectionError::from(err)
        })?;
        Ok(self.select_granularity(granularity))
    }

    pub fn select_field_label(&mut self, label: &str) -> Result<bool, SelectionError> {
        let field = Field::from_label(label).map_err(|err| {
            warn!(%label, "unknown field selected; render aborted");
            SelectionError::from(err)
        })?;
        Ok(self.select_field(field))
    }

    /// Switch symbol. Returns the ticket that fetches for the new symbol must
    /// carry, or `None` when the symbol is already selected. Results for any
    /// earlier ticket are discarded from here on.
    pub fn select_symbol(&mut self, symbol: &str) -> Result<Option<FetchTicket>, SelectionError> {
        let symbol = normalize_symbol(symbol).map_err(|err| {
            warn!(%symbol, "invalid symbol; load aborted");
            SelectionError::from(err)
        })?;
        if self.symbol() == Some(symbol.as_str()) {
            return Ok(None);
        }
        let ticket = self.store.begin(symbol);
        info!(symbol = %ticket.symbol, generation = ticket.generation, "symbol selected");
        Ok(Some(ticket))
    }

    /// Start a fresh load of the current symbol, superseding in-flight
    /// fetches.
    pub fn reload(&mut self) -> Option<FetchTicket> {
        let symbol = self.symbol()?.to_string();
        Some(self.store.begin(symbol))
    }

    /// Commit fetched data. Renders once if the data is for the interval on
    /// screen, otherwise stays quiet.
    pub fn apply(&mut self, event: DataEvent) -> bool {
        match event {
            DataEvent::SeriesLoaded {
                ticket,
                granularity,
                bars,
            } => {
                let outcome = self.store.commit(&ticket, granularity, bars);
                outcome == CommitOutcome::Committed
                    && granularity == self.state.granularity
                    && self.dispatch()
            }
            DataEvent::Reset => {
                self.store.clear();
                self.dispatch()
            }
        }
    }

    /// Re-render the current selection unconditionally.
    pub fn refresh(&mut self) -> bool {
        self.dispatch()
    }

    /// Shape the current selection without rendering it.
    pub fn resolve(&self) -> SeriesPayload {
        let bars = self.store.get(self.state.granularity);
        shape(self.state.field, bars, &self.palette)
    }

    pub fn current_labels(&self) -> ChartLabels {
        self.labels.lookup(self.state.field, self.state.granularity)
    }

    fn dispatch(&mut self) -> bool {
        let payload = self.resolve();
        debug!(
            granularity = %self.state.granularity,
            field = %self.state.field,
            points = payload.len(),
            "dispatching render"
        );
        if let Err(err) = self.renderer.render(&payload) {
            warn!(error = %err, "render aborted");
            return false;
        }
        let labels = self.current_labels();
        if let Err(err) = self.renderer.set_labels(&labels) {
            warn!(error = %err, "chart labels not updated");
        }
        true
    }
}

impl<R: Renderer> DataSink for SelectionController<R> {
    fn on_event(&mut self, event: DataEvent) {
        let _ = self.apply(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::RenderError;
    use series_shape::{CandlePoint, HistogramPoint, LinePoint, VolumeBar, UP_COLOR};
    use ts_core::RawBar;

    #[derive(Default)]
    struct RecordingRenderer {
        renders: Vec<SeriesPayload>,
        labels: Vec<ChartLabels>,
        missing_container: bool,
    }

    impl Renderer for RecordingRenderer {
        fn render(&mut self, payload: &SeriesPayload) -> Result<(), RenderError> {
            if self.missing_container {
                return Err(RenderError::ContainerNotFound("tv_chart_container".into()));
            }
            self.renders.push(payload.clone());
            Ok(())
        }

        fn set_labels(&mut self, labels: &ChartLabels) -> Result<(), RenderError> {
            self.labels.push(labels.clone());
            Ok(())
        }
    }

    fn sample_bars() -> Vec<RawBar> {
        vec![RawBar::new(1, 10.0, 12.0, 9.0, 11.0, 100.0)]
    }

    /// Controller for AAPL with yearly bars loaded and the render log cleared.
    fn loaded() -> SelectionController<RecordingRenderer> {
        let mut ctl = SelectionController::new(RecordingRenderer::default());
        let ticket = ctl.select_symbol("AAPL").unwrap().unwrap();
        ctl.apply(DataEvent::SeriesLoaded {
            ticket,
            granularity: Granularity::Yearly,
            bars: sample_bars(),
        });
        ctl.renderer_mut().renders.clear();
        ctl.renderer_mut().labels.clear();
        ctl
    }

    #[test]
    fn defaults_to_yearly_all() {
        let ctl = SelectionController::new(RecordingRenderer::default());
        assert_eq!(
            ctl.state(),
            SelectionState {
                granularity: Granularity::Yearly,
                field: Field::All
            }
        );
        assert!(ctl.renderer().renders.is_empty());
    }

    #[test]
    fn same_granularity_does_not_render() {
        let mut ctl = loaded();
        assert!(!ctl.select_granularity(Granularity::Yearly));
        assert!(ctl.renderer().renders.is_empty());
        assert!(ctl.select_granularity(Granularity::Daily));
        assert_eq!(ctl.renderer().renders.len(), 1);
    }

    #[test]
    fn same_field_does_not_render() {
        let mut ctl = loaded();
        assert!(!ctl.select_field(Field::All));
        assert!(ctl.renderer().renders.is_empty());
        assert!(ctl.select_field(Field::HighPrice));
        assert_eq!(ctl.renderer().renders.len(), 1);
    }

    #[test]
    fn all_field_renders_candles_and_volume() {
        let ctl = loaded();
        assert_eq!(
            ctl.resolve(),
            SeriesPayload::Candlestick(series_shape::CandlestickSeries {
                candles: vec![CandlePoint {
                    time: 1,
                    open: 10.0,
                    high: 12.0,
                    low: 9.0,
                    close: 11.0
                }],
                volumes: vec![VolumeBar {
                    time: 1,
                    value: 100.0,
                    color: UP_COLOR.to_string()
                }],
            })
        );
    }

    #[test]
    fn open_price_renders_line() {
        let mut ctl = loaded();
        ctl.select_field(Field::OpenPrice);
        assert_eq!(
            ctl.renderer().renders,
            vec![SeriesPayload::Line {
                field: Field::OpenPrice,
                points: vec![LinePoint { time: 1, value: 10.0 }]
            }]
        );
    }

    #[test]
    fn volume_switch_dispatches_one_histogram() {
        let mut ctl = loaded();
        assert!(ctl.select_field_label("Stock Volume").unwrap());
        assert_eq!(
            ctl.renderer().renders,
            vec![SeriesPayload::Histogram {
                points: vec![HistogramPoint {
                    time: 1,
                    volume: 100.0
                }]
            }]
        );
        assert_eq!(ctl.renderer().labels.len(), 1);
        assert_eq!(ctl.renderer().labels[0].axis, "Shares Traded");
    }

    #[test]
    fn unknown_label_aborts_without_state_change() {
        let mut ctl = loaded();
        let before = ctl.state();
        assert!(ctl.select_granularity_label("Hourly Averages").is_err());
        assert!(ctl.select_field_label("Dividend Yield").is_err());
        assert_eq!(ctl.state(), before);
        assert!(ctl.renderer().renders.is_empty());
    }

    #[test]
    fn all_thirty_states_are_reachable() {
        let mut ctl = loaded();
        for g in Granularity::ALL {
            ctl.select_granularity(g);
            for f in Field::ALL {
                ctl.select_field(f);
                assert_eq!(ctl.state(), SelectionState { granularity: g, field: f });
                assert!(!ctl.current_labels().title.is_empty());
            }
        }
    }

    #[test]
    fn data_for_hidden_interval_stays_quiet() {
        let mut ctl = loaded();
        let ticket = ctl.store().ticket().cloned().unwrap();
        let rendered = ctl.apply(DataEvent::SeriesLoaded {
            ticket: ticket.clone(),
            granularity: Granularity::Weekly,
            bars: sample_bars(),
        });
        assert!(!rendered);
        assert!(ctl.renderer().renders.is_empty());
        assert!(ctl.store().is_populated(Granularity::Weekly));

        let rendered = ctl.apply(DataEvent::SeriesLoaded {
            ticket,
            granularity: Granularity::Yearly,
            bars: sample_bars(),
        });
        assert!(rendered);
        assert_eq!(ctl.renderer().renders.len(), 1);
    }

    #[test]
    fn stale_symbol_results_are_dropped() {
        let mut ctl = loaded();
        let old = ctl.store().ticket().cloned().unwrap();
        let new = ctl.select_symbol("msft").unwrap().unwrap();
        assert_eq!(new.symbol, "MSFT");
        assert!(ctl.store().get(Granularity::Yearly).is_empty());

        let rendered = ctl.apply(DataEvent::SeriesLoaded {
            ticket: old,
            granularity: Granularity::Yearly,
            bars: sample_bars(),
        });
        assert!(!rendered);
        assert!(ctl.store().get(Granularity::Yearly).is_empty());
        assert!(ctl.renderer().renders.is_empty());
    }

    #[test]
    fn reselecting_symbol_is_a_noop() {
        let mut ctl = loaded();
        assert_eq!(ctl.select_symbol("aapl").unwrap(), None);
        assert!(ctl.select_symbol("").is_err());
        assert_eq!(ctl.symbol(), Some("AAPL"));
    }

    #[test]
    fn missing_container_aborts_quietly() {
        let mut ctl = loaded();
        ctl.renderer_mut().missing_container = true;
        assert!(!ctl.select_field(Field::Volume));
        assert!(ctl.renderer().labels.is_empty());
        // The selection itself still moved.
        assert_eq!(ctl.state().field, Field::Volume);
    }

    #[test]
    fn reset_clears_store_and_renders_once() {
        let mut ctl = loaded();
        ctl.on_event(DataEvent::Reset);
        assert!(ctl.store().populated().is_empty());
        assert_eq!(ctl.renderer().renders.len(), 1);
        assert!(ctl.renderer().renders[0].is_empty());
        assert_eq!(ctl.renderer().labels.len(), 1);
    }

    #[test]
    fn sink_events_commit_like_apply() {
        let mut ctl = SelectionController::new(RecordingRenderer::default());
        let ticket = ctl.select_symbol("IBM").unwrap().unwrap();
        ctl.on_event(DataEvent::SeriesLoaded {
            ticket,
            granularity: Granularity::Yearly,
            bars: sample_bars(),
        });
        assert_eq!(ctl.store().get(Granularity::Yearly).len(), 1);
        assert_eq!(ctl.renderer().renders.len(), 1);
    }

    #[test]
    fn initial_state_does_not_render() {
        let state = SelectionState {
            granularity: Granularity::Daily,
            field: Field::Volume,
        };
        let ctl = SelectionController::new(RecordingRenderer::default()).with_state(state);
        assert_eq!(ctl.state(), state);
        assert!(ctl.renderer().renders.is_empty());
        assert_eq!(ctl.current_labels().axis, "Shares Traded");
    }

    #[test]
    fn invalid_symbol_keeps_current_load() {
        let mut ctl = loaded();
        let ticket = ctl.store().ticket().cloned().unwrap();
        assert!(ctl.select_symbol("../etc").is_err());
        assert!(ctl.store().is_current(&ticket));
        assert!(ctl.store().is_populated(Granularity::Yearly));
        assert!(ctl.renderer().renders.is_empty());
    }

    #[test]
    fn custom_label_table_must_be_complete() {
        let partial = LabelTable::from_entries([(
            (Field::All, Granularity::Daily),
            ChartLabels::default(),
        )]);
        assert!(partial.is_err());
        let ctl = SelectionController::new(RecordingRenderer::default())
            .with_labels(LabelTable::standard());
        assert!(ctl.is_ok());
    }
}
