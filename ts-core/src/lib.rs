use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

/// Seconds since Unix epoch (the unit the chart widget's `time` accepts).
pub type Timestamp = i64;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unknown granularity: {0}")]
    UnknownGranularity(String),
    #[error("unknown field: {0}")]
    UnknownField(String),
    #[error("invalid symbol: {0:?}")]
    InvalidSymbol(String),
}

/// Sampling period of a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Intraday,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Granularity {
    pub const ALL: [Granularity; 5] = [
        Granularity::Intraday,
        Granularity::Daily,
        Granularity::Weekly,
        Granularity::Monthly,
        Granularity::Yearly,
    ];

    /// Name used in backend URLs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Intraday => "intraday",
            Granularity::Daily => "daily",
            Granularity::Weekly => "weekly",
            Granularity::Monthly => "monthly",
            Granularity::Yearly => "yearly",
        }
    }

    /// Text shown on the interval switcher.
    pub fn label(&self) -> &'static str {
        match self {
            Granularity::Intraday => "5 min Increments",
            Granularity::Daily => "Daily Averages",
            Granularity::Weekly => "Weekly Averages",
            Granularity::Monthly => "Monthly Averages",
            Granularity::Yearly => "Yearly Averages",
        }
    }

    pub fn from_label(label: &str) -> Result<Self, ParseError> {
        Self::ALL
            .into_iter()
            .find(|g| g.label() == label)
            .ok_or_else(|| ParseError::UnknownGranularity(label.to_string()))
    }

    /// Dense index, stable across releases; used for array-backed storage.
    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|g| g.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseError::UnknownGranularity(s.to_string()))
    }
}

/// How a field is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewKind {
    /// Candles plus a volume histogram underneath.
    Candlestick,
    Line,
    Histogram,
}

/// Field selection on the second switcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    All,
    OpenPrice,
    HighPrice,
    LowPrice,
    ClosePrice,
    Volume,
}

impl Field {
    pub const ALL: [Field; 6] = [
        Field::All,
        Field::OpenPrice,
        Field::HighPrice,
        Field::LowPrice,
        Field::ClosePrice,
        Field::Volume,
    ];

    /// Key of the field in a backend record (`all` has no record key).
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::All => "all",
            Field::OpenPrice => "open_price",
            Field::HighPrice => "high_price",
            Field::LowPrice => "low_price",
            Field::ClosePrice => "close_price",
            Field::Volume => "volume",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Field::All => "All",
            Field::OpenPrice => "Open Price",
            Field::HighPrice => "High Price",
            Field::LowPrice => "Low Price",
            Field::ClosePrice => "Close Price",
            Field::Volume => "Stock Volume",
        }
    }

    pub fn from_label(label: &str) -> Result<Self, ParseError> {
        Self::ALL
            .into_iter()
            .find(|f| f.label() == label)
            .ok_or_else(|| ParseError::UnknownField(label.to_string()))
    }

    pub fn view(&self) -> ViewKind {
        match self {
            Field::All => ViewKind::Candlestick,
            Field::OpenPrice | Field::HighPrice | Field::LowPrice | Field::ClosePrice => {
                ViewKind::Line
            }
            Field::Volume => ViewKind::Histogram,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Field {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|f| f.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseError::UnknownField(s.to_string()))
    }
}

/// One OHLCV record as delivered by the backend.
///
/// Every field is optional at decode time: each view decides which fields it
/// needs, and a record lacking one of them is dropped by that view rather than
/// patched with a substitute value.
///
/// `datetime` (intraday rows) is read as `date`. A record carrying both keys
/// is a duplicate-field error and is skipped by [`RawBar::decode_many`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RawBar {
    #[serde(default, alias = "datetime", deserialize_with = "de_timestamp")]
    pub date: Option<Timestamp>,
    #[serde(default, deserialize_with = "de_number")]
    pub open_price: Option<f64>,
    #[serde(default, deserialize_with = "de_number")]
    pub high_price: Option<f64>,
    #[serde(default, deserialize_with = "de_number")]
    pub low_price: Option<f64>,
    #[serde(default, deserialize_with = "de_number")]
    pub close_price: Option<f64>,
    #[serde(default, deserialize_with = "de_volume")]
    pub volume: Option<f64>,
}

/// A bar with every field present.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ohlcv {
    pub time: Timestamp,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl RawBar {
    pub fn new(date: Timestamp, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            date: Some(date),
            open_price: Some(open),
            high_price: Some(high),
            low_price: Some(low),
            close_price: Some(close),
            volume: Some(volume),
        }
    }

    /// Value of `field` on this bar; `Field::All` has no single value.
    pub fn get(&self, field: Field) -> Option<f64> {
        match field {
            Field::All => None,
            Field::OpenPrice => self.open_price,
            Field::HighPrice => self.high_price,
            Field::LowPrice => self.low_price,
            Field::ClosePrice => self.close_price,
            Field::Volume => self.volume,
        }
    }

    pub fn ohlcv(&self) -> Option<Ohlcv> {
        Some(Ohlcv {
            time: self.date?,
            open: self.open_price?,
            high: self.high_price?,
            low: self.low_price?,
            close: self.close_price?,
            volume: self.volume?,
        })
    }

    pub fn is_complete(&self) -> bool {
        self.ohlcv().is_some()
    }

    /// Decode an untyped backend payload.
    ///
    /// Anything other than a JSON array yields an empty vector. Array entries
    /// that are not objects are skipped; object entries decode with unusable
    /// fields left empty, unless a key appears twice (`date` plus `datetime`).
    pub fn decode_many(value: &Value) -> Vec<RawBar> {
        let Some(items) = value.as_array() else {
            warn!(kind = json_kind(value), "bar payload is not an array; treating as empty");
            return Vec::new();
        };
        items
            .iter()
            .enumerate()
            .filter_map(|(idx, item)| match RawBar::deserialize(item) {
                Ok(bar) => Some(bar),
                Err(err) => {
                    warn!(index = idx, error = %err, "skipping undecodable bar record");
                    None
                }
            })
            .collect()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Numbers arrive as JSON numbers or numeric strings; anything else is absent.
pub fn number_from_value(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

/// Parse the timestamp formats the backend emits into Unix seconds.
pub fn parse_timestamp(raw: &str) -> Option<Timestamp> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(n) = s.parse::<i64>() {
        return Some(n);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp());
    }
    // Flask's JSON encoder renders datetimes as HTTP dates.
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.timestamp());
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.and_utc().timestamp());
        }
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d.and_hms_opt(0, 0, 0)?.and_utc().timestamp());
    }
    None
}

fn timestamp_from_value(value: &Value) -> Option<Timestamp> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64)),
        Value::String(s) => parse_timestamp(s),
        _ => None,
    }
}

fn de_timestamp<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Timestamp>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(value.as_ref().and_then(timestamp_from_value))
}

fn de_number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(value.as_ref().and_then(number_from_value))
}

fn de_volume<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    Ok(de_number(d)?.filter(|v| *v >= 0.0))
}

fn de_text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

/// Validate and normalise a ticker before it is put into a URL.
pub fn normalize_symbol(symbol: &str) -> Result<String, ParseError> {
    let s = symbol.trim();
    let valid = !s.is_empty()
        && s.len() <= 16
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^' | '='));
    if !valid {
        return Err(ParseError::InvalidSymbol(symbol.to_string()));
    }
    Ok(s.to_ascii_uppercase())
}

/// Path of the time-series endpoint for a symbol and granularity.
pub fn graph_data_path(symbol: &str, granularity: Granularity) -> String {
    format!("/graph_data_retrieval/{symbol}/{}", granularity.as_str())
}

/// Path of the company overview endpoint.
pub fn overview_path(symbol: &str) -> String {
    format!("/fetch_data/{symbol}")
}

/// Company overview as served by `/fetch_data/{symbol}`.
///
/// Values are kept as display text: the panel shows them verbatim and the
/// backend mixes numbers, strings and nulls.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompanyOverview {
    #[serde(deserialize_with = "de_text")]
    pub status: Option<String>,
    #[serde(deserialize_with = "de_text")]
    pub message: Option<String>,
    #[serde(deserialize_with = "de_text")]
    pub symbol: Option<String>,
    #[serde(deserialize_with = "de_text")]
    pub name: Option<String>,
    #[serde(deserialize_with = "de_text")]
    pub asset_type: Option<String>,
    #[serde(deserialize_with = "de_text")]
    pub description: Option<String>,
    #[serde(deserialize_with = "de_text")]
    pub exchange: Option<String>,
    #[serde(deserialize_with = "de_text")]
    pub currency: Option<String>,
    #[serde(deserialize_with = "de_text")]
    pub country: Option<String>,
    #[serde(deserialize_with = "de_text")]
    pub sector: Option<String>,
    #[serde(deserialize_with = "de_text")]
    pub industry: Option<String>,
    #[serde(deserialize_with = "de_text")]
    pub fiscal_year_end: Option<String>,
    #[serde(deserialize_with = "de_text")]
    pub latest_quarter: Option<String>,
    #[serde(deserialize_with = "de_text")]
    pub market_capitalization: Option<String>,
    #[serde(deserialize_with = "de_text")]
    pub ebitda: Option<String>,
    #[serde(deserialize_with = "de_text")]
    pub pe_ratio: Option<String>,
    #[serde(deserialize_with = "de_text")]
    pub peg_ratio: Option<String>,
    #[serde(deserialize_with = "de_text")]
    pub earnings_per_share: Option<String>,
    #[serde(deserialize_with = "de_text")]
    pub revenue_per_share_ttm: Option<String>,
    #[serde(deserialize_with = "de_text")]
    pub profit_margin: Option<String>,
    #[serde(deserialize_with = "de_text")]
    pub operating_margin_ttm: Option<String>,
    #[serde(deserialize_with = "de_text")]
    pub return_on_assets_ttm: Option<String>,
    #[serde(deserialize_with = "de_text")]
    pub return_on_equity_ttm: Option<String>,
    #[serde(deserialize_with = "de_text")]
    pub revenue_ttm: Option<String>,
    #[serde(deserialize_with = "de_text")]
    pub gross_profit_ttm: Option<String>,
    #[serde(deserialize_with = "de_text")]
    pub quarterly_earnings_growth_yoy: Option<String>,
    #[serde(deserialize_with = "de_text")]
    pub quarterly_revenue_growth_yoy: Option<String>,
    #[serde(deserialize_with = "de_text")]
    pub week_52_high: Option<String>,
    #[serde(deserialize_with = "de_text")]
    pub week_52_low: Option<String>,
    #[serde(deserialize_with = "de_text")]
    pub timestamp: Option<String>,
}

impl CompanyOverview {
    /// Error message carried by a `{"status": "error"}` body.
    pub fn error_message(&self) -> Option<&str> {
        if self.status.as_deref() == Some("error") {
            Some(self.message.as_deref().unwrap_or("unknown error"))
        } else {
            None
        }
    }

    /// Overview panel cells keyed by DOM element id.
    pub fn panel_entries(&self) -> [(&'static str, Option<&str>); 26] {
        [
            ("stock-title", self.name.as_deref()),
            ("description", self.description.as_deref()),
            ("asset-type", self.asset_type.as_deref()),
            ("exchange", self.exchange.as_deref()),
            ("currency", self.currency.as_deref()),
            ("country", self.country.as_deref()),
            ("sector", self.sector.as_deref()),
            ("industry", self.industry.as_deref()),
            ("eps", self.earnings_per_share.as_deref()),
            ("ebitda", self.ebitda.as_deref()),
            ("fye", self.fiscal_year_end.as_deref()),
            ("gpttm", self.gross_profit_ttm.as_deref()),
            ("latest-quart", self.latest_quarter.as_deref()),
            ("market-cap", self.market_capitalization.as_deref()),
            ("op-mar-ttm", self.operating_margin_ttm.as_deref()),
            ("pe-ratio", self.pe_ratio.as_deref()),
            ("peg-ratio", self.peg_ratio.as_deref()),
            ("profit-margin", self.profit_margin.as_deref()),
            ("qegyoy", self.quarterly_earnings_growth_yoy.as_deref()),
            ("qrgyoy", self.quarterly_revenue_growth_yoy.as_deref()),
            ("roa-ttm", self.return_on_assets_ttm.as_deref()),
            ("roq-ttm", self.return_on_equity_ttm.as_deref()),
            ("rps-ttm", self.revenue_per_share_ttm.as_deref()),
            ("revenue-ttm", self.revenue_ttm.as_deref()),
            ("52-wh", self.week_52_high.as_deref()),
            ("52-wl", self.week_52_low.as_deref()),
        ]
    }
}
