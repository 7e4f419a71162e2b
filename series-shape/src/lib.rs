//! Pure reshaping of raw bars into the series shapes the chart widget takes.
//!
//! Every function here is total: malformed records are skipped (and logged),
//! malformed payloads produce empty series. Nothing depends on a renderer.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;
use ts_core::{Field, RawBar, Timestamp, ViewKind};

/// Volume bar colour when the bucket closed at or above its open.
pub const UP_COLOR: &str = "rgba(255, 144, 0, 1)";
/// Volume bar colour when the bucket closed below its open.
pub const DOWN_COLOR: &str = "rgba(0, 144, 255, 1)";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Palette {
    pub up: String,
    pub down: String,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            up: UP_COLOR.to_string(),
            down: DOWN_COLOR.to_string(),
        }
    }
}

impl Palette {
    /// Ties (close == open) count as up.
    pub fn for_move(&self, open: f64, close: f64) -> &str {
        if close >= open {
            &self.up
        } else {
            &self.down
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CandlePoint {
    pub time: Timestamp,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeBar {
    pub time: Timestamp,
    pub value: f64,
    pub color: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinePoint {
    pub time: Timestamp,
    pub value: f64,
}

/// Point of the stand-alone volume view. The widget reads histogram heights
/// from `value`, so that is the serialized name.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistogramPoint {
    pub time: Timestamp,
    #[serde(rename = "value")]
    pub volume: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandlestickSeries {
    pub candles: Vec<CandlePoint>,
    pub volumes: Vec<VolumeBar>,
}

/// Fully shaped data for one render dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SeriesPayload {
    Candlestick(CandlestickSeries),
    Line { field: Field, points: Vec<LinePoint> },
    Histogram { points: Vec<HistogramPoint> },
}

impl SeriesPayload {
    pub fn view(&self) -> ViewKind {
        match self {
            SeriesPayload::Candlestick(_) => ViewKind::Candlestick,
            SeriesPayload::Line { .. } => ViewKind::Line,
            SeriesPayload::Histogram { .. } => ViewKind::Histogram,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            SeriesPayload::Candlestick(s) => s.candles.len(),
            SeriesPayload::Line { points, .. } => points.len(),
            SeriesPayload::Histogram { points } => points.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// First and last time of the payload, if any.
    pub fn time_range(&self) -> Option<(Timestamp, Timestamp)> {
        let times: Vec<Timestamp> = match self {
            SeriesPayload::Candlestick(s) => s.candles.iter().map(|c| c.time).collect(),
            SeriesPayload::Line { points, .. } => points.iter().map(|p| p.time).collect(),
            SeriesPayload::Histogram { points } => points.iter().map(|p| p.time).collect(),
        };
        Some((*times.first()?, *times.last()?))
    }
}

/// Candles plus coloured volume bars; bars missing any OHLCV field or the
/// date contribute nothing.
pub fn to_candlestick(bars: &[RawBar]) -> CandlestickSeries {
    to_candlestick_with(bars, &Palette::default())
}

pub fn to_candlestick_with(bars: &[RawBar], palette: &Palette) -> CandlestickSeries {
    let mut out = CandlestickSeries {
        candles: Vec::with_capacity(bars.len()),
        volumes: Vec::with_capacity(bars.len()),
    };
    for (idx, bar) in bars.iter().enumerate() {
        let Some(b) = bar.ohlcv() else {
            warn!(index = idx, ?bar, "incomplete bar skipped");
            continue;
        };
        out.candles.push(CandlePoint {
            time: b.time,
            open: b.open,
            high: b.high,
            low: b.low,
            close: b.close,
        });
        out.volumes.push(VolumeBar {
            time: b.time,
            value: b.volume,
            color: palette.for_move(b.open, b.close).to_string(),
        });
    }
    out
}

/// `{time, value}` for one field; only the date and that field are required.
pub fn to_line(field: Field, bars: &[RawBar]) -> Vec<LinePoint> {
    if field == Field::All {
        warn!("line view requested for the combined field");
        return Vec::new();
    }
    bars.iter()
        .filter_map(|bar| {
            Some(LinePoint {
                time: bar.date?,
                value: bar.get(field)?,
            })
        })
        .collect()
}

pub fn to_histogram(bars: &[RawBar]) -> Vec<HistogramPoint> {
    bars.iter()
        .filter_map(|bar| {
            Some(HistogramPoint {
                time: bar.date?,
                volume: bar.volume?,
            })
        })
        .collect()
}

/// Shape `bars` for the view `field` selects.
pub fn shape(field: Field, bars: &[RawBar], palette: &Palette) -> SeriesPayload {
    match field.view() {
        ViewKind::Candlestick => SeriesPayload::Candlestick(to_candlestick_with(bars, palette)),
        ViewKind::Line => SeriesPayload::Line {
            field,
            points: to_line(field, bars),
        },
        ViewKind::Histogram => SeriesPayload::Histogram {
            points: to_histogram(bars),
        },
    }
}

// Untyped entry points for payloads straight off the wire.

pub fn candlestick_from_json(value: &Value) -> CandlestickSeries {
    to_candlestick(&RawBar::decode_many(value))
}

pub fn line_from_json(field: Field, value: &Value) -> Vec<LinePoint> {
    to_line(field, &RawBar::decode_many(value))
}

pub fn histogram_from_json(value: &Value) -> Vec<HistogramPoint> {
    to_histogram(&RawBar::decode_many(value))
}
