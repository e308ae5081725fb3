//! Client for the upstream dividend-asset GraphQL API.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::core::{parse_percent, true_yield};

pub const DEFAULT_UPSTREAM_URL: &str = "https://finex3.p.rapidapi.com/";

const SEARCH_ETFS_QUERY: &str = "query SearchDividendEtfsQuery($search: String!) {
    searchDividendEtfs(search: $search) {
      symbol
      name
      price
      dividend_yield
      expense_ratio
    }
  }";

const SEARCH_REITS_QUERY: &str = "query SearchDividendReitsQuery($search: String!) {
    searchDividendReits(search: $search) {
      symbol
      name
      price
      dividend_yield
    }
  }";

const SEARCH_STOCKS_QUERY: &str = "query SearchDividendStocksQuery($search: String!) {
    searchDividendStocks(search: $search) {
      symbol
      name
      price
      dividend_yield
    }
  }";

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("upstream request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("upstream reported errors: {0}")]
    Upstream(String),

    #[error("upstream response has no `data` member")]
    MissingData,

    #[error("unexpected upstream payload: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    pub url: String,
    pub api_key: Option<String>,
    pub api_host: Option<String>,
    pub timeout: Duration,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    #[serde(alias = "ETF")]
    Etf,
    #[serde(alias = "REIT")]
    Reit,
    #[serde(alias = "STOCK")]
    Stock,
}

impl AssetKind {
    pub fn query(self) -> &'static str {
        match self {
            AssetKind::Etf => SEARCH_ETFS_QUERY,
            AssetKind::Reit => SEARCH_REITS_QUERY,
            AssetKind::Stock => SEARCH_STOCKS_QUERY,
        }
    }

    /// Name of the field holding the result list inside `data`.
    pub fn result_field(self) -> &'static str {
        match self {
            AssetKind::Etf => "searchDividendEtfs",
            AssetKind::Reit => "searchDividendReits",
            AssetKind::Stock => "searchDividendStocks",
        }
    }

    pub fn request_body(self, term: &str) -> Value {
        json!({
            "query": self.query(),
            "variables": { "search": term },
        })
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Asset {
    pub symbol: String,
    pub name: String,
    pub price: f64,
    /// Percentage string as served upstream, e.g. `"3.52%"`.
    pub dividend_yield: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expense_ratio: Option<String>,
}

impl Asset {
    pub fn gross_yield(&self) -> Option<f64> {
        parse_percent(&self.dividend_yield)
    }

    pub fn expense_ratio_percent(&self) -> Option<f64> {
        self.expense_ratio.as_deref().and_then(parse_percent)
    }

    /// Gross yield net of the expense ratio, when the asset has one.
    pub fn true_yield(&self) -> Option<f64> {
        self.gross_yield()
            .map(|gross| true_yield(gross, self.expense_ratio_percent()))
    }
}

pub struct AssetGateway {
    client: Client,
    config: UpstreamConfig,
}

impl AssetGateway {
    pub fn new(config: UpstreamConfig) -> Result<Self, GatewayError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    /// Sends a GraphQL request body upstream unchanged and returns its `data` member.
    #[instrument(skip(self, body), fields(url = %self.config.url))]
    pub async fn forward(&self, body: &Value) -> Result<Value, GatewayError> {
        let mut request = self
            .client
            .post(&self.config.url)
            .header(reqwest::header::CONTENT_TYPE, "application/json");
        if let Some(key) = &self.config.api_key {
            request = request.header("X-RapidAPI-Key", key);
        }
        if let Some(host) = &self.config.api_host {
            request = request.header("X-RapidAPI-Host", host);
        }

        let response = request.json(body).send().await?.error_for_status()?;
        let payload: Value = response.json().await?;
        debug!(bytes = payload.to_string().len(), "upstream payload received");

        extract_data(payload)
    }

    #[instrument(skip(self))]
    pub async fn search(&self, kind: AssetKind, term: &str) -> Result<Vec<Asset>, GatewayError> {
        let data = self.forward(&kind.request_body(term)).await?;
        let assets = extract_assets(kind, data)?;
        debug!(count = assets.len(), "assets found");
        Ok(assets)
    }
}

/// Pulls `data` out of a GraphQL response envelope.
pub fn extract_data(mut payload: Value) -> Result<Value, GatewayError> {
    let data = payload.get_mut("data").map(Value::take).unwrap_or(Value::Null);
    if !data.is_null() {
        return Ok(data);
    }

    match payload.get("errors") {
        Some(errors) => {
            let message = errors
                .as_array()
                .map(|list| {
                    list.iter()
                        .filter_map(|e| e.get("message").and_then(Value::as_str))
                        .collect::<Vec<_>>()
                        .join("; ")
                })
                .filter(|joined| !joined.is_empty())
                .unwrap_or_else(|| errors.to_string());
            warn!(%message, "upstream GraphQL errors");
            Err(GatewayError::Upstream(message))
        }
        None => Err(GatewayError::MissingData),
    }
}

/// Reads the asset list for `kind` out of a `data` object. A null list means no matches.
pub fn extract_assets(kind: AssetKind, mut data: Value) -> Result<Vec<Asset>, GatewayError> {
    let list = data
        .get_mut(kind.result_field())
        .map(Value::take)
        .unwrap_or(Value::Null);
    if list.is_null() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_value(list)?)
}
