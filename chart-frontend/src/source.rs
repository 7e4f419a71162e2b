use async_trait::async_trait;
use data_feed::SeriesSource;
use gloo_net::http::Request;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};
use ts_core::{
    graph_data_path, normalize_symbol, overview_path, CompanyOverview, Granularity, ParseError,
    RawBar,
};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Http(#[from] gloo_net::Error),
    #[error(transparent)]
    Symbol(#[from] ParseError),
    #[error("backend error ({status}): {message}")]
    Api { status: u16, message: String },
}

/// Fetches from the chart backend with the browser's `fetch`.
#[derive(Debug, Clone)]
pub struct GlooSeriesSource {
    base: String,
}

impl GlooSeriesSource {
    pub fn new(base: impl Into<String>) -> Self {
        let base = base.into();
        Self {
            base: base.trim().trim_end_matches('/').to_string(),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub async fn fetch_overview(&self, symbol: &str) -> Result<CompanyOverview, FetchError> {
        let symbol = normalize_symbol(symbol)?;
        let url = self.url(&overview_path(&symbol));
        debug!(%url, "fetching company overview");
        let resp = Request::get(&url).send().await?;
        let status = resp.status();
        let overview: Option<CompanyOverview> = resp.json().await.ok();
        if !resp.ok() {
            let message = overview
                .and_then(|o| o.message)
                .unwrap_or_else(|| resp.status_text());
            return Err(FetchError::Api { status, message });
        }
        let overview = overview.ok_or_else(|| FetchError::Api {
            status,
            message: "malformed overview body".to_string(),
        })?;
        if let Some(msg) = overview.error_message() {
            return Err(FetchError::Api {
                status,
                message: msg.to_string(),
            });
        }
        Ok(overview)
    }
}

#[async_trait(?Send)]
impl SeriesSource for GlooSeriesSource {
    type Error = FetchError;

    async fn fetch_series(
        &self,
        symbol: &str,
        granularity: Granularity,
    ) -> Result<Vec<RawBar>, Self::Error> {
        let symbol = normalize_symbol(symbol)?;
        let url = self.url(&graph_data_path(&symbol, granularity));
        debug!(%url, "fetching graph data");
        let resp = Request::get(&url).send().await?;
        if !resp.ok() {
            warn!(%symbol, %granularity, status = resp.status(), "graph data request failed");
            return Ok(Vec::new());
        }
        let json: Value = resp.json().await?;
        Ok(RawBar::decode_many(&json))
    }
}
