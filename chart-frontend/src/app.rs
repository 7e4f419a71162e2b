use std::cell::RefCell;
use std::rc::Rc;

use app_shell::{SelectionController, Switcher, DEFAULT_SYMBOL};
use data_feed::{load_symbol, FetchTicket};
use js_sys::Reflect;
use series_shape::Palette;
use tracing::{info, warn};
use ts_core::{Field, Granularity};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;

use crate::dom::{document, fill_overview, MountedSwitcher};
use crate::load::run_load;
use crate::options::ElementIds;
use crate::renderer::LightweightChartsRenderer;
use crate::source::GlooSeriesSource;

const API_BASE_GLOBAL: &str = "STOCKCHART_API_BASE";
const DEFAULT_SYMBOL_GLOBAL: &str = "STOCKCHART_DEFAULT_SYMBOL";

fn read_global(key: &str) -> Option<String> {
    Reflect::get(&js_sys::global(), &JsValue::from_str(key))
        .ok()
        .and_then(|v| v.as_string())
        .filter(|v| !v.trim().is_empty())
}

fn init_logging() {
    console_error_panic_hook::set_once();
    // A second handle on the same page finds the subscriber already set.
    let _ = tracing_wasm::try_set_as_global_default();
}

struct Inner {
    controller: RefCell<SelectionController<LightweightChartsRenderer>>,
    source: GlooSeriesSource,
    intervals: RefCell<Option<MountedSwitcher<Granularity>>>,
    fields: RefCell<Option<MountedSwitcher<Field>>>,
}

/// Browser handle: owns the controller, wires the switchers and runs loads.
#[wasm_bindgen]
pub struct StockChart {
    inner: Rc<Inner>,
}

#[wasm_bindgen]
impl StockChart {
    /// `api_base` overrides the `STOCKCHART_API_BASE` global; with neither,
    /// requests go to the page's own origin.
    #[wasm_bindgen(constructor)]
    pub fn new(api_base: Option<String>) -> Result<StockChart, JsValue> {
        init_logging();
        let base = api_base
            .or_else(|| read_global(API_BASE_GLOBAL))
            .unwrap_or_default();
        let ids = ElementIds::default();
        let palette = Palette::default();
        let renderer = LightweightChartsRenderer::new(ids.clone(), palette.clone());
        let controller = SelectionController::new(renderer).with_palette(palette);
        let inner = Rc::new(Inner {
            controller: RefCell::new(controller),
            source: GlooSeriesSource::new(base),
            intervals: RefCell::new(None),
            fields: RefCell::new(None),
        });
        mount_switchers(&inner, &ids)?;
        Ok(StockChart { inner })
    }

    /// Switch to `symbol` and fetch all intervals plus its overview.
    /// Returns whether a load started: the symbol already shown and invalid
    /// symbols (logged by the controller) leave everything as it is.
    #[wasm_bindgen(js_name = loadSymbol)]
    pub fn load_symbol(&self, symbol: &str) -> bool {
        let selected = self.inner.controller.borrow_mut().select_symbol(symbol);
        match selected {
            Ok(Some(ticket)) => {
                spawn_load(self.inner.clone(), ticket);
                true
            }
            Ok(None) | Err(_) => false,
        }
    }

    /// Refetch the current symbol, superseding any load in flight.
    pub fn reload(&self) {
        let ticket = self.inner.controller.borrow_mut().reload();
        if let Some(ticket) = ticket {
            spawn_load(self.inner.clone(), ticket);
        }
    }

    /// Select an interval by its button label. Unknown labels are logged and
    /// ignored.
    #[wasm_bindgen(js_name = selectInterval)]
    pub fn select_interval(&self, label: &str) -> bool {
        let rendered = self.inner.controller.borrow_mut().select_granularity_label(label);
        let Ok(rendered) = rendered else {
            return false;
        };
        let active = self.inner.controller.borrow().state().granularity;
        if let Some(switcher) = self.inner.intervals.borrow().as_ref() {
            switcher.set_active(active);
        }
        rendered
    }

    /// Select a field by its button label.
    #[wasm_bindgen(js_name = selectField)]
    pub fn select_field(&self, label: &str) -> bool {
        let rendered = self.inner.controller.borrow_mut().select_field_label(label);
        let Ok(rendered) = rendered else {
            return false;
        };
        let active = self.inner.controller.borrow().state().field;
        if let Some(switcher) = self.inner.fields.borrow().as_ref() {
            switcher.set_active(active);
        }
        rendered
    }

    pub fn symbol(&self) -> Option<String> {
        self.inner.controller.borrow().symbol().map(str::to_string)
    }
}

fn mount_switchers(inner: &Rc<Inner>, ids: &ElementIds) -> Result<(), JsValue> {
    let doc = document()?;
    let state = inner.controller.borrow().state();

    let weak = Rc::downgrade(inner);
    let on_interval: Rc<dyn Fn(Granularity)> = Rc::new(move |g: Granularity| {
        if let Some(inner) = weak.upgrade() {
            inner.controller.borrow_mut().select_granularity(g);
        }
    });
    match MountedSwitcher::mount(
        &doc,
        &ids.interval_switcher,
        Switcher::intervals(state.granularity),
        on_interval,
    ) {
        Ok(switcher) => *inner.intervals.borrow_mut() = Some(switcher),
        Err(err) => warn!(error = ?err, "interval switcher not mounted"),
    }

    let weak = Rc::downgrade(inner);
    let on_field: Rc<dyn Fn(Field)> = Rc::new(move |f: Field| {
        if let Some(inner) = weak.upgrade() {
            inner.controller.borrow_mut().select_field(f);
        }
    });
    match MountedSwitcher::mount(
        &doc,
        &ids.field_switcher,
        Switcher::fields(state.field),
        on_field,
    ) {
        Ok(switcher) => *inner.fields.borrow_mut() = Some(switcher),
        Err(err) => warn!(error = ?err, "field switcher not mounted"),
    }
    Ok(())
}

fn spawn_load(inner: Rc<Inner>, ticket: FetchTicket) {
    info!(symbol = %ticket.symbol, generation = ticket.generation, "loading symbol");
    spawn_local(async move {
        // Clear whatever the previous symbol left on screen.
        inner.controller.borrow_mut().refresh();

        let events = load_symbol(&inner.source, ticket.clone(), &Granularity::ALL);
        let overview = show_overview(&inner, &ticket);
        run_load(
            events,
            |event| {
                inner.controller.borrow_mut().apply(event);
            },
            overview,
        )
        .await;
    });
}

async fn show_overview(inner: &Inner, ticket: &FetchTicket) {
    let overview = match inner.source.fetch_overview(&ticket.symbol).await {
        Ok(overview) => overview,
        Err(err) => {
            warn!(symbol = %ticket.symbol, error = %err, "overview fetch failed");
            return;
        }
    };
    if !inner.controller.borrow().store().is_current(ticket) {
        return;
    }
    match document() {
        Ok(doc) => {
            fill_overview(&doc, &overview);
        }
        Err(err) => warn!(error = ?err, "overview not shown"),
    }
}

/// Page entry point: build the chart and load the default symbol.
#[wasm_bindgen]
pub fn start() -> Result<StockChart, JsValue> {
    let chart = StockChart::new(None)?;
    let symbol = read_global(DEFAULT_SYMBOL_GLOBAL).unwrap_or_else(|| DEFAULT_SYMBOL.to_string());
    chart.load_symbol(&symbol);
    Ok(chart)
}
