use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

/// Quote currencies recognized as symbol suffixes, in match-preference order.
const QUOTE_SUFFIXES: [&str; 5] = ["BTC", "USD", "USDT", "USDC", "GBP"];

/// Stand-in for zero or negative quotes, which the exchange occasionally
/// reports for dead markets.
pub const VERY_SMALL_AMOUNT: Decimal = Decimal::from_parts(1, 0, 0, false, 20);

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("market data request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("market data api error: {code} {msg}")]
    Api { code: i64, msg: String },
    #[error("unexpected market data payload: {0}")]
    Decode(String),
    #[error("malformed price for {symbol}: {value}")]
    MalformedPrice { symbol: String, value: String },
}

/// Raw `{symbol, price}` pair as reported by the exchange ticker endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TickerPrice {
    pub symbol: String,
    pub price: String,
}

/// A ticker symbol decomposed into a currency pair with a parsed quote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPrice {
    pub from: String,
    pub to: String,
    pub value: Decimal,
}

/// Splits an exchange symbol into `(base, quote)` by suffix-matching the
/// known quote currencies. USDT and USDC both quote in USD for our purposes.
/// Leveraged/derivative tokens (DOWN/UP/BULL/BEAR and long "B" tokens) are
/// not real currencies and are excluded, as are bare quote symbols.
pub fn decompose_symbol(symbol: &str) -> Option<(String, String)> {
    for suffix in QUOTE_SUFFIXES {
        if let Some(base) = symbol.strip_suffix(suffix) {
            if base.is_empty() || is_leveraged_token(base) {
                return None;
            }
            let quote = match suffix {
                "USDT" | "USDC" => "USD",
                other => other,
            };
            return Some((base.to_string(), quote.to_string()));
        }
    }
    None
}

fn is_leveraged_token(base: &str) -> bool {
    base.ends_with("DOWN")
        || base.ends_with("UP")
        || base.ends_with("BULL")
        || base.ends_with("BEAR")
        || (base.len() >= 4 && base.ends_with('B'))
}

/// Decomposes and parses a full ticker snapshot. A malformed decimal aborts
/// the batch; unrecognized symbols are skipped.
pub fn parse_prices(tickers: &[TickerPrice]) -> Result<Vec<ParsedPrice>, FeedError> {
    let mut prices = Vec::with_capacity(tickers.len());
    for ticker in tickers {
        let Some((from, to)) = decompose_symbol(&ticker.symbol) else {
            continue;
        };
        let mut value: Decimal =
            ticker
                .price
                .parse()
                .map_err(|_| FeedError::MalformedPrice {
                    symbol: ticker.symbol.clone(),
                    value: ticker.price.clone(),
                })?;
        if value <= Decimal::ZERO {
            value = VERY_SMALL_AMOUNT;
        }
        prices.push(ParsedPrice { from, to, value });
    }
    Ok(prices)
}

/// External market data source. One call returns the full current snapshot.
#[async_trait]
pub trait MarketFeed: Send + Sync {
    async fn fetch_tickers(&self) -> Result<Vec<TickerPrice>, FeedError>;
}

#[derive(Debug, Deserialize)]
struct ApiErrorPayload {
    code: i64,
    msg: String,
}

/// Binance-style ticker endpoint client.
#[derive(Clone)]
pub struct BinanceFeed {
    client: reqwest::Client,
    api_base: String,
}

impl BinanceFeed {
    pub fn new(api_base: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl MarketFeed for BinanceFeed {
    async fn fetch_tickers(&self) -> Result<Vec<TickerPrice>, FeedError> {
        let url = format!("{}/api/v3/ticker/price", self.api_base);
        let body = self.client.get(url).send().await?.text().await?;

        if let Ok(tickers) = serde_json::from_str::<Vec<TickerPrice>>(&body) {
            return Ok(tickers);
        }
        if let Ok(api_error) = serde_json::from_str::<ApiErrorPayload>(&body) {
            return Err(FeedError::Api {
                code: api_error.code,
                msg: api_error.msg,
            });
        }
        let preview: String = body.chars().take(200).collect();
        Err(FeedError::Decode(preview))
    }
}

/// Fixed snapshot feed for tests and offline development.
#[derive(Clone, Default)]
pub struct StaticFeed {
    pub tickers: Vec<TickerPrice>,
}

#[async_trait]
impl MarketFeed for StaticFeed {
    async fn fetch_tickers(&self) -> Result<Vec<TickerPrice>, FeedError> {
        Ok(self.tickers.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn ticker(symbol: &str, price: &str) -> TickerPrice {
        TickerPrice {
            symbol: symbol.to_string(),
            price: price.to_string(),
        }
    }

    #[test]
    fn decomposes_known_quote_suffixes() {
        assert_eq!(
            decompose_symbol("ETHBTC"),
            Some(("ETH".to_string(), "BTC".to_string()))
        );
        assert_eq!(
            decompose_symbol("ETHGBP"),
            Some(("ETH".to_string(), "GBP".to_string()))
        );
        assert_eq!(decompose_symbol("ETHEUR"), None);
    }

    #[test]
    fn normalizes_stablecoin_quotes_to_usd() {
        assert_eq!(
            decompose_symbol("ADAUSDT"),
            Some(("ADA".to_string(), "USD".to_string()))
        );
        assert_eq!(
            decompose_symbol("ADAUSDC"),
            Some(("ADA".to_string(), "USD".to_string()))
        );
    }

    #[test]
    fn excludes_leveraged_tokens() {
        assert_eq!(decompose_symbol("ETHDOWNUSDT"), None);
        assert_eq!(decompose_symbol("ETHUPUSDT"), None);
        assert_eq!(decompose_symbol("ADABULLUSDT"), None);
        assert_eq!(decompose_symbol("ADABEARUSDT"), None);
        // "B" tokens only count as leveraged for bases of four or more chars.
        assert_eq!(decompose_symbol("AAVEBUSDT"), None);
        assert_eq!(
            decompose_symbol("ARBUSDT"),
            Some(("ARB".to_string(), "USD".to_string()))
        );
    }

    #[test]
    fn bare_quote_symbols_are_skipped() {
        assert_eq!(decompose_symbol("USDC"), None);
        assert_eq!(decompose_symbol("BTC"), None);
    }

    #[test]
    fn parses_and_clamps_prices() {
        let parsed = parse_prices(&[
            ticker("ETHUSDT", "2000.5"),
            ticker("DEADBTC", "0"),
            ticker("UNKNOWNEUR", "1"),
        ])
        .unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].value, dec!(2000.5));
        assert_eq!(parsed[1].value, VERY_SMALL_AMOUNT);
    }

    #[test]
    fn malformed_decimal_aborts_the_batch() {
        let err = parse_prices(&[ticker("ETHUSDT", "not-a-number")]).unwrap_err();
        assert!(matches!(err, FeedError::MalformedPrice { .. }));
    }

    #[test]
    fn api_error_payload_is_detected() {
        let payload = r#"{"code":-1003,"msg":"Too many requests."}"#;
        let parsed: ApiErrorPayload = serde_json::from_str(payload).unwrap();
        assert_eq!(parsed.code, -1003);
        assert_eq!(parsed.msg, "Too many requests.");
    }
}
