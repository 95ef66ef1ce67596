//! Rate lookup against a Frankfurter-compatible API

use anyhow::{Context, Result};
use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Arguments of the `get_exchange_rate` tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ExchangeRateArgs {
    /// The currency to convert from (e.g., "USD").
    #[serde(default = "default_from")]
    pub currency_from: String,
    /// The currency to convert to (e.g., "EUR").
    #[serde(default = "default_to")]
    pub currency_to: String,
    /// The date for the exchange rate or "latest". Defaults to "latest".
    #[serde(default = "default_date")]
    pub currency_date: String,
}

fn default_from() -> String {
    "USD".to_string()
}

fn default_to() -> String {
    "EUR".to_string()
}

fn default_date() -> String {
    "latest".to_string()
}

impl ExchangeRateArgs {
    /// `latest` or a calendar date written `YYYY-MM-DD`
    pub fn validate_date(&self) -> std::result::Result<(), String> {
        let date = self.currency_date.as_str();
        if date == "latest" {
            return Ok(());
        }
        let well_formed = date.len() == 10 && NaiveDate::parse_from_str(date, "%Y-%m-%d").is_ok();
        if well_formed {
            Ok(())
        } else {
            Err(format!(
                "Invalid date {:?}: expected \"latest\" or YYYY-MM-DD.",
                date
            ))
        }
    }
}

impl Default for ExchangeRateArgs {
    fn default() -> Self {
        Self {
            currency_from: default_from(),
            currency_to: default_to(),
            currency_date: default_date(),
        }
    }
}

/// HTTP client for the rate API
#[derive(Debug, Clone)]
pub struct RateClient {
    base_url: String,
    client: reqwest::Client,
}

impl RateClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch the rate payload. Never fails: transport, status and decoding
    /// problems come back as `{"error": "..."}`.
    #[instrument(
        skip(self),
        fields(from = %args.currency_from, to = %args.currency_to, date = %args.currency_date)
    )]
    pub async fn get_exchange_rate(&self, args: &ExchangeRateArgs) -> Value {
        if let Err(message) = args.validate_date() {
            warn!(%message, "Rejected rate lookup");
            return json!({ "error": message });
        }
        let url = format!("{}/{}", self.base_url, args.currency_date);

        let body = match self.fetch(&url, args).await {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "Rate API request failed");
                return json!({ "error": format!("API request failed: {}", e) });
            }
        };

        let data: Value = match serde_json::from_slice(&body) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "Rate API returned invalid JSON");
                return json!({ "error": "Invalid JSON response from API." });
            }
        };

        if data.get("rates").is_none() {
            return json!({ "error": "Invalid API response format." });
        }

        debug!("Rate lookup succeeded");
        data
    }

    async fn fetch(&self, url: &str, args: &ExchangeRateArgs) -> reqwest::Result<Vec<u8>> {
        let resp = self
            .client
            .get(url)
            .query(&[
                ("from", args.currency_from.as_str()),
                ("to", args.currency_to.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?;

        Ok(resp.bytes().await?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_defaults() {
        let args: ExchangeRateArgs = serde_json::from_value(json!({})).unwrap();
        assert_eq!(args, ExchangeRateArgs::default());

        let args: ExchangeRateArgs =
            serde_json::from_value(json!({"currency_to": "CAD"})).unwrap();
        assert_eq!(args.currency_from, "USD");
        assert_eq!(args.currency_to, "CAD");
        assert_eq!(args.currency_date, "latest");
    }

    #[test]
    fn test_args_schema_lists_properties() {
        let schema = serde_json::to_value(schemars::schema_for!(ExchangeRateArgs)).unwrap();
        let props = &schema["properties"];
        assert!(props.get("currency_from").is_some());
        assert!(props.get("currency_to").is_some());
        assert!(props.get("currency_date").is_some());
        assert_eq!(props["currency_date"]["default"], json!("latest"));
    }

    #[test]
    fn test_validate_date() {
        let with_date = |d: &str| ExchangeRateArgs {
            currency_date: d.to_string(),
            ..Default::default()
        };
        assert!(with_date("latest").validate_date().is_ok());
        assert!(with_date("2024-02-29").validate_date().is_ok());

        for bad in ["", "yesterday", "2024-2-29", "2023-02-29", "../latest", "2024-01-01?x=1"] {
            assert!(with_date(bad).validate_date().is_err(), "{:?} accepted", bad);
        }
    }

    #[tokio::test]
    async fn test_malformed_date_is_rejected_before_request() {
        // Nothing listens here; a request would surface as "API request failed"
        let client = RateClient::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
        let args = ExchangeRateArgs {
            currency_date: "latest/../../admin".to_string(),
            ..Default::default()
        };
        let result = client.get_exchange_rate(&args).await;
        assert!(result["error"].as_str().unwrap().starts_with("Invalid date"));
    }

    #[tokio::test]
    async fn test_unreachable_api_is_reported_as_payload() {
        // Port 9 (discard) on localhost is not expected to serve HTTP
        let client = RateClient::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
        let result = client.get_exchange_rate(&ExchangeRateArgs::default()).await;
        let error = result["error"].as_str().unwrap();
        assert!(error.starts_with("API request failed:"));
    }
}
