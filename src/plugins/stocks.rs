//! Stocks/crypto plugin - 24h price moves via CoinGecko

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use tracing::debug;

use super::{http_client, require, ConfigField, Plugin};
use crate::config::SourceConfig;
use crate::notification::{Notification, Priority};

const PRICE_URL: &str = "https://api.coingecko.com/api/v3/simple/price";
/// |24h change| above this percentage is high priority
const BIG_MOVE_PERCENT: f64 = 5.0;

pub struct StocksPlugin;

#[derive(Debug, Deserialize)]
struct Quote {
    usd: f64,
    #[serde(default)]
    usd_24h_change: Option<f64>,
}

/// Ticker -> CoinGecko coin id
fn coin_id(symbol: &str) -> Option<&'static str> {
    match symbol.to_uppercase().as_str() {
        "BTC" => Some("bitcoin"),
        "ETH" => Some("ethereum"),
        "SOL" => Some("solana"),
        "DOGE" => Some("dogecoin"),
        _ => None,
    }
}

/// "AAPL, btc ,,ETH" -> ["AAPL", "BTC", "ETH"]
fn parse_symbols(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect()
}

/// 67012.5 -> "67,012.50"
fn format_usd(value: f64) -> String {
    let formatted = format!("{:.2}", value.abs());
    let (int_part, frac_part) = formatted.split_once('.').unwrap_or((formatted.as_str(), "00"));
    let mut grouped = String::new();
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    let sign = if value < 0.0 { "-" } else { "" };
    format!("{}{}.{}", sign, grouped, frac_part)
}

/// One notification per symbol per hour
fn quote_notification(symbol: &str, coin: &str, quote: &Quote, now: DateTime<Utc>) -> Notification {
    let change = quote.usd_24h_change.unwrap_or(0.0);
    let sign = if change >= 0.0 { "+" } else { "" };
    let priority = if change.abs() > BIG_MOVE_PERCENT {
        Priority::High
    } else {
        Priority::Low
    };

    Notification::new(
        format!("stocks-{}-{}", symbol, now.format("%Y%m%d%H")),
        "stocks",
        format!("{}: ${} ({}{:.1}%)", symbol, format_usd(quote.usd), sign, change),
    )
    .with_body(format!("24h change: {}{:.1}%", sign, change))
    .with_url(format!("https://www.coingecko.com/en/coins/{}", coin))
    .with_priority(priority)
    .with_timestamp(now)
}

#[async_trait]
impl Plugin for StocksPlugin {
    fn name(&self) -> &'static str {
        "stocks"
    }

    fn display_name(&self) -> &'static str {
        "Stocks/Crypto"
    }

    fn required_config(&self) -> Vec<ConfigField> {
        vec![ConfigField::new("symbols", "Symbols to track (comma-separated, e.g. BTC,ETH)")
            .instructions("Supported: BTC, ETH, SOL, DOGE.")
            .placeholder("BTC,ETH")
            .validate(|v| {
                if parse_symbols(v).is_empty() {
                    Err("Enter at least one symbol.".to_string())
                } else {
                    Ok(())
                }
            })]
    }

    async fn setup(&self, config: &SourceConfig) -> Result<serde_json::Value> {
        let symbols = parse_symbols(require(config, "symbols")?);
        let (supported, unsupported): (Vec<String>, Vec<String>) =
            symbols.into_iter().partition(|s| coin_id(s).is_some());
        if supported.is_empty() {
            bail!("No supported symbols provided");
        }
        Ok(json!({
            "connected": true,
            "tracking": format!("{} symbols", supported.len()),
            "unsupported": unsupported,
        }))
    }

    async fn fetch(&self, config: &SourceConfig) -> Result<Vec<Notification>> {
        let symbols = parse_symbols(require(config, "symbols")?);
        let coins: Vec<(String, &'static str)> = symbols
            .into_iter()
            .filter_map(|s| match coin_id(&s) {
                Some(id) => Some((s, id)),
                None => {
                    debug!(symbol = %s, "Unsupported symbol, skipping");
                    None
                }
            })
            .collect();
        if coins.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<&str> = coins.iter().map(|(_, id)| *id).collect();
        let res = http_client()?
            .get(PRICE_URL)
            .query(&[
                ("ids", ids.join(",").as_str()),
                ("vs_currencies", "usd"),
                ("include_24hr_change", "true"),
            ])
            .send()
            .await?;
        if !res.status().is_success() {
            bail!("CoinGecko returned HTTP {}", res.status());
        }
        let quotes: HashMap<String, Quote> = res.json().await?;

        let now = Utc::now();
        Ok(coins
            .iter()
            .filter_map(|(symbol, coin)| {
                quotes
                    .get(*coin)
                    .map(|quote| quote_notification(symbol, coin, quote, now))
            })
            .collect())
    }
}
