use std::time::Duration;

use async_trait::async_trait;
use data_feed::SeriesSource;
use reqwest::{StatusCode, Url};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};
use ts_core::{
    graph_data_path, normalize_symbol, overview_path, CompanyOverview, Granularity, ParseError,
    RawBar,
};

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);
pub const BASE_URL_ENV: &str = "STOCKCHART_API_BASE";

#[derive(Debug, Clone)]
pub struct MarketClientConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub user_agent: String,
}

impl MarketClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::defaults()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    fn defaults() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: concat!("stockchart-client/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl Default for MarketClientConfig {
    fn default() -> Self {
        match std::env::var(BASE_URL_ENV) {
            Ok(base) if !base.trim().is_empty() => Self::new(base),
            _ => Self::defaults(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid base url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error(transparent)]
    Symbol(#[from] ParseError),
    #[error("backend error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("decode error: {0}")]
    Decode(String),
}

/// Client for the chart backend's two read endpoints.
#[derive(Debug, Clone)]
pub struct MarketClient {
    config: MarketClientConfig,
    base: Url,
    http: reqwest::Client,
}

impl MarketClient {
    pub fn new(config: MarketClientConfig) -> Result<Self, ClientError> {
        let trimmed = config.base_url.trim().trim_end_matches('/');
        let base = Url::parse(trimmed).map_err(|e| ClientError::InvalidUrl {
            url: config.base_url.clone(),
            reason: e.to_string(),
        })?;
        if base.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl {
                url: config.base_url.clone(),
                reason: "not a base url".to_string(),
            });
        }
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout)
            .build()?;
        Ok(Self { config, base, http })
    }

    pub fn from_env() -> Result<Self, ClientError> {
        Self::new(MarketClientConfig::default())
    }

    pub fn config(&self) -> &MarketClientConfig {
        &self.config
    }

    fn endpoint(&self, path: &str) -> Url {
        let mut url = self.base.clone();
        let joined = format!("{}{}", self.base.path().trim_end_matches('/'), path);
        url.set_path(&joined);
        url
    }

    /// Bars for one symbol and granularity. A non-success status is logged
    /// and reported as an empty series.
    pub async fn graph_data(
        &self,
        symbol: &str,
        granularity: Granularity,
    ) -> Result<Vec<RawBar>, ClientError> {
        let symbol = normalize_symbol(symbol)?;
        let url = self.endpoint(&graph_data_path(&symbol, granularity));
        debug!(%url, "fetching graph data");
        let resp = self.http.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            warn!(%symbol, %granularity, status = status.as_u16(), "graph data request failed");
            return Ok(Vec::new());
        }
        let json: Value = resp.json().await?;
        Ok(RawBar::decode_many(&json))
    }

    pub async fn company_overview(&self, symbol: &str) -> Result<CompanyOverview, ClientError> {
        let symbol = normalize_symbol(symbol)?;
        let url = self.endpoint(&overview_path(&symbol));
        debug!(%url, "fetching company overview");
        let resp = self.http.get(url).send().await?;
        let status = resp.status();
        let body = resp.text().await?;
        let parsed = serde_json::from_str::<CompanyOverview>(&body);
        if !status.is_success() {
            let message = parsed
                .ok()
                .and_then(|o| o.message)
                .unwrap_or_else(|| status_text(status));
            return Err(ClientError::Api {
                status: status.as_u16(),
                message,
            });
        }
        let overview = parsed.map_err(|e| ClientError::Decode(e.to_string()))?;
        if let Some(msg) = overview.error_message() {
            return Err(ClientError::Api {
                status: status.as_u16(),
                message: msg.to_string(),
            });
        }
        Ok(overview)
    }
}

fn status_text(status: StatusCode) -> String {
    status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| status.as_u16().to_string())
}

#[async_trait(?Send)]
impl SeriesSource for MarketClient {
    type Error = ClientError;

    async fn fetch_series(
        &self,
        symbol: &str,
        granularity: Granularity,
    ) -> Result<Vec<RawBar>, Self::Error> {
        self.graph_data(symbol, granularity).await
    }
}
