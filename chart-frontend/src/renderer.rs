use app_shell::{ChartLabels, RenderError, Renderer};
use js_sys::{Array, Function, Reflect, JSON};
use series_shape::{Palette, SeriesPayload};
use serde_json::Value;
use tracing::debug;
use ts_core::ViewKind;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::HtmlElement;

use crate::dom::{document, set_text};
use crate::options::{
    candlestick_options, chart_options, histogram_options, line_options, needs_time_of_day,
    series_data, volume_overlay_options, volume_scale_margins, ElementIds, VOLUME_SCALE_ID,
};

const LIBRARY_GLOBAL: &str = "LightweightCharts";

fn js_err(err: JsValue) -> RenderError {
    RenderError::Backend(err.as_string().unwrap_or_else(|| format!("{err:?}")))
}

fn to_js(value: &Value) -> Result<JsValue, RenderError> {
    JSON::parse(&value.to_string()).map_err(js_err)
}

fn call(target: &JsValue, method: &str, args: &[JsValue]) -> Result<JsValue, RenderError> {
    let func: Function = Reflect::get(target, &JsValue::from_str(method))
        .map_err(js_err)?
        .dyn_into()
        .map_err(|_| RenderError::Backend(format!("{method} is not a function")))?;
    let argv: Array = args.iter().collect();
    func.apply(target, &argv).map_err(js_err)
}

/// One chart instance plus the series currently attached to it.
struct Surface {
    chart: JsValue,
    view: Option<ViewKind>,
    series: Vec<JsValue>,
}

impl Surface {
    fn create(container: &HtmlElement) -> Result<Self, RenderError> {
        let lib = Reflect::get(&js_sys::global(), &JsValue::from_str(LIBRARY_GLOBAL))
            .map_err(js_err)?;
        if lib.is_undefined() {
            return Err(RenderError::Backend(format!("{LIBRARY_GLOBAL} is not loaded")));
        }
        let opts = to_js(&chart_options(
            container.offset_width(),
            container.offset_height(),
            false,
        ))?;
        let chart = call(&lib, "createChart", &[container.clone().into(), opts])?;
        debug!("chart instance created");
        Ok(Self {
            chart,
            view: None,
            series: Vec::new(),
        })
    }

    /// Swap the attached series when the view kind changes.
    fn prepare(&mut self, payload: &SeriesPayload, palette: &Palette) -> Result<(), RenderError> {
        let view = payload.view();
        if self.view == Some(view) {
            if let SeriesPayload::Line { field, .. } = payload {
                for s in &self.series {
                    call(s, "applyOptions", &[to_js(&line_options(*field))?])?;
                }
            }
            return Ok(());
        }
        for s in self.series.drain(..) {
            call(&self.chart, "removeSeries", &[s])?;
        }
        self.view = None;
        self.series = match payload {
            SeriesPayload::Candlestick(_) => {
                let candles = call(
                    &self.chart,
                    "addCandlestickSeries",
                    &[to_js(&candlestick_options(palette))?],
                )?;
                let volume = call(
                    &self.chart,
                    "addHistogramSeries",
                    &[to_js(&volume_overlay_options())?],
                )?;
                let scale = call(&self.chart, "priceScale", &[JsValue::from_str(VOLUME_SCALE_ID)])?;
                call(&scale, "applyOptions", &[to_js(&volume_scale_margins())?])?;
                vec![candles, volume]
            }
            SeriesPayload::Line { field, .. } => {
                vec![call(&self.chart, "addLineSeries", &[to_js(&line_options(*field))?])?]
            }
            SeriesPayload::Histogram { .. } => vec![call(
                &self.chart,
                "addHistogramSeries",
                &[to_js(&histogram_options(palette))?],
            )?],
        };
        self.view = Some(view);
        Ok(())
    }

    fn set_data(&self, payload: &SeriesPayload) -> Result<(), RenderError> {
        let data = series_data(payload).map_err(|e| RenderError::Backend(e.to_string()))?;
        for (series, json) in self.series.iter().zip(data) {
            let rows = JSON::parse(&json).map_err(js_err)?;
            call(series, "setData", &[rows])?;
        }
        let time_opts = serde_json::json!({
            "timeScale": { "timeVisible": needs_time_of_day(payload) }
        });
        call(&self.chart, "applyOptions", &[to_js(&time_opts)?])?;
        let time_scale = call(&self.chart, "timeScale", &[])?;
        call(&time_scale, "fitContent", &[])?;
        Ok(())
    }
}

/// [`Renderer`] backed by TradingView Lightweight Charts (v4 API), loaded as
/// the `LightweightCharts` global.
pub struct LightweightChartsRenderer {
    ids: ElementIds,
    palette: Palette,
    surface: Option<Surface>,
}

impl LightweightChartsRenderer {
    pub fn new(ids: ElementIds, palette: Palette) -> Self {
        Self {
            ids,
            palette,
            surface: None,
        }
    }

    fn container(&self) -> Result<HtmlElement, RenderError> {
        document()
            .ok()
            .and_then(|doc| doc.get_element_by_id(&self.ids.chart))
            .and_then(|el| el.dyn_into::<HtmlElement>().ok())
            .ok_or_else(|| RenderError::ContainerNotFound(self.ids.chart.clone()))
    }

    fn surface(&mut self, container: &HtmlElement) -> Result<&mut Surface, RenderError> {
        if self.surface.is_none() {
            self.surface = Some(Surface::create(container)?);
        }
        self.surface
            .as_mut()
            .ok_or_else(|| RenderError::Backend("chart surface unavailable".to_string()))
    }
}

impl Renderer for LightweightChartsRenderer {
    fn render(&mut self, payload: &SeriesPayload) -> Result<(), RenderError> {
        let container = self.container()?;
        let palette = self.palette.clone();
        let surface = self.surface(&container)?;
        surface.prepare(payload, &palette)?;
        surface.set_data(payload)
    }

    fn set_labels(&mut self, labels: &ChartLabels) -> Result<(), RenderError> {
        let doc = document().map_err(js_err)?;
        if !set_text(&doc, &self.ids.title, &labels.title) {
            return Err(RenderError::ContainerNotFound(self.ids.title.clone()));
        }
        if !set_text(&doc, &self.ids.axis, &labels.axis) {
            return Err(RenderError::ContainerNotFound(self.ids.axis.clone()));
        }
        Ok(())
    }
}
