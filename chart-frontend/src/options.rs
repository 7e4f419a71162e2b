//! Option objects handed to Lightweight Charts, built as JSON so they can be
//! checked without a browser.

use serde::Serialize;
use serde_json::{json, Value};
use series_shape::{Palette, SeriesPayload};
use ts_core::Field;

/// Price scale id the volume bars of the combined view sit on.
pub const VOLUME_SCALE_ID: &str = "volume";

/// DOM ids the controller writes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementIds {
    pub chart: String,
    pub title: String,
    pub axis: String,
    pub interval_switcher: String,
    pub field_switcher: String,
}

impl Default for ElementIds {
    fn default() -> Self {
        Self {
            chart: "tv_chart_container".to_string(),
            title: "chart-title".to_string(),
            axis: "chart-axis-label".to_string(),
            interval_switcher: "switch".to_string(),
            field_switcher: "field-switch".to_string(),
        }
    }
}

pub fn chart_options(width: i32, height: i32, time_visible: bool) -> Value {
    json!({
        "width": width.max(1),
        "height": height.max(1),
        "layout": {
            "background": { "type": "solid", "color": "#ffffff" },
            "textColor": "rgba(33, 56, 77, 1)",
        },
        "grid": {
            "vertLines": { "color": "rgba(197, 203, 206, 0.5)" },
            "horzLines": { "color": "rgba(197, 203, 206, 0.5)" },
        },
        "timeScale": {
            "borderColor": "rgba(197, 203, 206, 1)",
            "timeVisible": time_visible,
            "secondsVisible": false,
        },
    })
}

pub fn candlestick_options(palette: &Palette) -> Value {
    json!({
        "upColor": palette.up,
        "downColor": palette.down,
        "borderVisible": false,
        "wickVisible": true,
        "borderUpColor": palette.up,
        "borderDownColor": palette.down,
        "wickUpColor": palette.up,
        "wickDownColor": palette.down,
    })
}

/// Volume bars under the candles: own scale, bottom fifth of the pane.
pub fn volume_overlay_options() -> Value {
    json!({
        "priceFormat": { "type": "volume" },
        "priceScaleId": VOLUME_SCALE_ID,
    })
}

pub fn volume_scale_margins() -> Value {
    json!({ "scaleMargins": { "top": 0.8, "bottom": 0.0 } })
}

pub fn histogram_options(palette: &Palette) -> Value {
    json!({
        "color": palette.up,
        "priceFormat": { "type": "volume" },
    })
}

pub fn line_options(field: Field) -> Value {
    let color = match field {
        Field::HighPrice => "rgba(38, 166, 154, 1)",
        Field::LowPrice => "rgba(239, 83, 80, 1)",
        Field::ClosePrice => "rgba(33, 56, 77, 1)",
        _ => "rgba(255, 144, 0, 1)",
    };
    json!({ "color": color, "lineWidth": 2, "title": field.label() })
}

/// Whether any point falls off midnight UTC, i.e. the time axis should show
/// hours and minutes.
pub fn needs_time_of_day(payload: &SeriesPayload) -> bool {
    let off_midnight = |t: i64| t.rem_euclid(86_400) != 0;
    match payload {
        SeriesPayload::Candlestick(s) => s.candles.iter().any(|c| off_midnight(c.time)),
        SeriesPayload::Line { points, .. } => points.iter().any(|p| off_midnight(p.time)),
        SeriesPayload::Histogram { points } => points.iter().any(|p| off_midnight(p.time)),
    }
}

/// `setData` arguments for each series the payload occupies, in creation
/// order (candles before volume).
pub fn series_data(payload: &SeriesPayload) -> serde_json::Result<Vec<String>> {
    fn encode<T: Serialize>(v: &T) -> serde_json::Result<String> {
        serde_json::to_string(v)
    }
    Ok(match payload {
        SeriesPayload::Candlestick(s) => vec![encode(&s.candles)?, encode(&s.volumes)?],
        SeriesPayload::Line { points, .. } => vec![encode(points)?],
        SeriesPayload::Histogram { points } => vec![encode(points)?],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use series_shape::{to_candlestick, to_histogram};
    use ts_core::RawBar;

    #[test]
    fn candle_colours_follow_palette() {
        let opts = candlestick_options(&Palette::default());
        assert_eq!(opts["upColor"], "rgba(255, 144, 0, 1)");
        assert_eq!(opts["wickDownColor"], "rgba(0, 144, 255, 1)");
    }

    #[test]
    fn chart_options_clamp_size() {
        let opts = chart_options(0, -5, true);
        assert_eq!(opts["width"], 1);
        assert_eq!(opts["height"], 1);
        assert_eq!(opts["timeScale"]["timeVisible"], true);
    }

    #[test]
    fn series_data_matches_widget_shape() {
        let bars = vec![RawBar::new(1, 10.0, 12.0, 9.0, 11.0, 100.0)];
        let combined = series_data(&SeriesPayload::Candlestick(to_candlestick(&bars))).unwrap();
        assert_eq!(combined.len(), 2);
        let candles: Value = serde_json::from_str(&combined[0]).unwrap();
        assert_eq!(
            candles,
            json!([{"time": 1, "open": 10.0, "high": 12.0, "low": 9.0, "close": 11.0}])
        );
        let volumes: Value = serde_json::from_str(&combined[1]).unwrap();
        assert_eq!(volumes[0]["color"], "rgba(255, 144, 0, 1)");

        let hist = series_data(&SeriesPayload::Histogram {
            points: to_histogram(&bars),
        })
        .unwrap();
        assert_eq!(hist, vec![r#"[{"time":1,"value":100.0}]"#.to_string()]);
    }

    #[test]
    fn time_of_day_only_for_intraday_points() {
        let daily = vec![RawBar::new(1_704_067_200, 1.0, 1.0, 1.0, 1.0, 1.0)];
        let intraday = vec![RawBar::new(1_704_067_500, 1.0, 1.0, 1.0, 1.0, 1.0)];
        let as_payload = |bars: &[RawBar]| SeriesPayload::Histogram {
            points: to_histogram(bars),
        };
        assert!(!needs_time_of_day(&as_payload(&daily)));
        assert!(needs_time_of_day(&as_payload(&intraday)));
    }

    #[test]
    fn line_title_is_field_label() {
        assert_eq!(line_options(Field::LowPrice)["title"], "Low Price");
    }
}
