//! Tushare Pro market data adapter

use crate::config::{parse_date, ScreenerConfig};
use crate::error::{AppError, Result};
use crate::market::rate_limiter::RateLimiter;
use crate::market::{DailyRequest, MarketDataSource};
use crate::models::DailyBar;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, warn};

const DAILY_FIELDS: &str = "ts_code,trade_date,open,high,low,close,pre_close,change,pct_chg,vol,amount";

/// Tushare Pro HTTP client
pub struct TushareClient {
    client: Client,
    api_url: String,
    token: String,
    limiter: RateLimiter,
}

impl TushareClient {
    pub fn new(config: &ScreenerConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.request_timeout).build()?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            token: config.token.clone(),
            limiter: RateLimiter::per_minute(config.requests_per_minute),
        })
    }

    /// Call an API endpoint and return its tabular payload
    async fn query(&self, api_name: &str, params: HashMap<&str, String>, fields: &str) -> Result<ApiData> {
        self.limiter.acquire().await;

        let body = ApiRequest {
            api_name,
            token: &self.token,
            params,
            fields,
        };

        debug!("Tushare request: api={} params={:?}", api_name, body.params);

        let response = self
            .client
            .post(&self.api_url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        let result: ApiResponse = response.json().await?;
        into_data(result)
    }
}

/// Unwrap the response envelope; a non-zero `code` is a data-source error
fn into_data(result: ApiResponse) -> Result<ApiData> {
    if result.code != 0 {
        return Err(AppError::DataSource {
            code: result.code,
            message: result.msg.unwrap_or_else(|| "Request failed".to_string()),
        });
    }

    Ok(result.data.unwrap_or_default())
}

#[async_trait]
impl MarketDataSource for TushareClient {
    fn id(&self) -> &'static str {
        "tushare"
    }

    async fn daily(&self, request: &DailyRequest) -> Result<Vec<DailyBar>> {
        if request.codes.is_empty() {
            return Ok(vec![]);
        }

        let mut params = HashMap::new();
        params.insert("ts_code", request.codes_param());
        params.insert("start_date", request.start_param());
        params.insert("end_date", request.end_param());

        let data = self.query("daily", params, DAILY_FIELDS).await?;
        parse_daily(data)
    }
}

#[derive(Serialize)]
struct ApiRequest<'a> {
    api_name: &'a str,
    token: &'a str,
    params: HashMap<&'a str, String>,
    fields: &'a str,
}

#[derive(Deserialize)]
struct ApiResponse {
    code: i64,
    msg: Option<String>,
    data: Option<ApiData>,
}

/// Column-oriented table: field names plus rows of values
#[derive(Debug, Default, Deserialize)]
struct ApiData {
    fields: Vec<String>,
    items: Vec<Vec<Value>>,
}

/// Read a numeric cell that may arrive as a number, a string or null
fn value_as_f64(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn value_as_str(value: Option<&Value>) -> Option<&str> {
    match value? {
        Value::String(s) => Some(s.as_str()),
        _ => None,
    }
}

fn parse_daily(data: ApiData) -> Result<Vec<DailyBar>> {
    if data.items.is_empty() {
        return Ok(vec![]);
    }

    let index: HashMap<&str, usize> = data
        .fields
        .iter()
        .enumerate()
        .map(|(i, f)| (f.as_str(), i))
        .collect();

    let column = |name: &str| {
        index
            .get(name)
            .copied()
            .ok_or_else(|| AppError::Internal(format!("Daily response is missing field '{}'", name)))
    };

    let ts_code = column("ts_code")?;
    let trade_date = column("trade_date")?;
    let open = column("open")?;
    let high = column("high")?;
    let low = column("low")?;
    let close = column("close")?;
    let pre_close = column("pre_close")?;
    let change = column("change")?;
    let pct_chg = column("pct_chg")?;
    let vol = column("vol")?;
    let amount = column("amount")?;

    let mut bars = Vec::with_capacity(data.items.len());

    for item in &data.items {
        let number = |i: usize| value_as_f64(item.get(i));

        let (Some(code), Some(date)) = (value_as_str(item.get(ts_code)), value_as_str(item.get(trade_date)))
        else {
            warn!("Skipping daily row without code or date: {:?}", item);
            continue;
        };

        let bar = (|| {
            Some(DailyBar {
                code: code.to_string(),
                trade_date: parse_date(date).ok()?,
                open: number(open)?,
                high: number(high)?,
                low: number(low)?,
                close: number(close)?,
                pre_close: number(pre_close)?,
                change: number(change)?,
                pct_chg: number(pct_chg)?,
                vol: number(vol)?,
                amount: number(amount)?,
            })
        })();

        match bar {
            Some(bar) => bars.push(bar),
            None => warn!("Skipping incomplete daily row for {} on {}", code, date),
        }
    }

    Ok(bars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    fn data(value: Value) -> ApiData {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_parse_daily_rows() {
        let payload = data(json!({
            "fields": ["ts_code", "trade_date", "open", "high", "low", "close", "pre_close", "change", "pct_chg", "vol", "amount"],
            "items": [
                ["600000.SH", "20240105", 6.6, 6.7, 6.55, 6.65, 6.6, 0.05, 0.7576, 250000.0, 166250.5],
                ["000001.SZ", "20240105", "9.1", 9.3, 9.0, 9.2, 9.1, 0.1, 1.0989, 810000, 745200.0]
            ]
        }));

        let bars = parse_daily(payload).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].code, "600000.SH");
        assert_eq!(bars[0].trade_date, NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
        assert_eq!(bars[0].close, 6.65);
        assert_eq!(bars[1].open, 9.1);
        assert_eq!(bars[1].vol, 810000.0);
    }

    #[test]
    fn test_parse_daily_skips_incomplete_rows() {
        let payload = data(json!({
            "fields": ["ts_code", "trade_date", "open", "high", "low", "close", "pre_close", "change", "pct_chg", "vol", "amount"],
            "items": [
                ["600000.SH", "20240105", 6.6, 6.7, 6.55, null, 6.6, 0.05, 0.7576, 250000.0, 166250.5],
                [null, "20240105", 6.6, 6.7, 6.55, 6.65, 6.6, 0.05, 0.7576, 250000.0, 166250.5],
                ["600000.SH", "20240104", 6.5, 6.6, 6.5, 6.6, 6.5, 0.1, 1.5385, 200000.0, 132000.0]
            ]
        }));

        let bars = parse_daily(payload).unwrap();
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].trade_date, NaiveDate::from_ymd_opt(2024, 1, 4).unwrap());
    }

    #[test]
    fn test_parse_daily_missing_field() {
        let payload = data(json!({
            "fields": ["ts_code", "trade_date"],
            "items": [["600000.SH", "20240105"]]
        }));
        assert!(matches!(parse_daily(payload), Err(AppError::Internal(_))));
    }

    fn response(value: Value) -> ApiResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_error_code_becomes_data_source_error() {
        let result = into_data(response(json!({
            "request_id": "abc",
            "code": 40203,
            "msg": "rate limited",
            "data": null
        })));

        match result {
            Err(AppError::DataSource { code, message }) => {
                assert_eq!(code, 40203);
                assert_eq!(message, "rate limited");
            }
            other => panic!("unexpected result: {:?}", other.map(|d| d.items.len())),
        }
    }

    #[test]
    fn test_error_without_message_gets_fallback() {
        let result = into_data(response(json!({ "code": 40101, "msg": null, "data": null })));
        assert!(matches!(
            result,
            Err(AppError::DataSource { code: 40101, ref message }) if message == "Request failed"
        ));
    }

    #[test]
    fn test_success_without_data_is_empty() {
        let data = into_data(response(json!({ "code": 0, "msg": "", "data": null }))).unwrap();
        assert!(data.fields.is_empty());
        assert!(data.items.is_empty());
        assert!(parse_daily(data).unwrap().is_empty());
    }

    #[test]
    fn test_request_body() {
        let mut params = HashMap::new();
        params.insert("ts_code", "600000.SH".to_string());
        let body = ApiRequest {
            api_name: "daily",
            token: "t",
            params,
            fields: DAILY_FIELDS,
        };

        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["api_name"], "daily");
        assert_eq!(value["params"]["ts_code"], "600000.SH");
        assert_eq!(value["fields"], DAILY_FIELDS);
    }
}
