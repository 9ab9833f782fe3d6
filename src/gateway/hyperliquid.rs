//! Read-only Hyperliquid info client.
//!
//! Every query is a POST to `{base}/info` with a JSON body tagged by `type`.
//! Retries, latency sampling and the asset universe cache live here; the raw
//! HTTP hop sits behind [`InfoTransport`] so parsing can be exercised with
//! canned responses.

use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use super::latency::LatencyTracker;
use super::retry::RetryPolicy;
use super::{pair_to_coin, GatewayError, MarketDataGateway};
use crate::book::{BookLevel, OrderBook};
use crate::config::Network;

pub const MAINNET_URL: &str = "https://api.hyperliquid.xyz";
pub const TESTNET_URL: &str = "https://api.hyperliquid-testnet.xyz";

const BASE_URL_ENV: &str = "HYPERLIQUID_BASE_URL";
const UNIVERSE_TTL: Duration = Duration::from_secs(300);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

// unified asset prefixes tried when the bare coin is not listed
const COIN_PREFIXES: [&str; 2] = ["U", "W"];

/// One blocking round trip to the info endpoint.
pub trait InfoTransport {
    fn post_info(&self, body: &Value) -> Result<Value, GatewayError>;
}

#[derive(Debug)]
pub struct HttpTransport {
    client: reqwest::blocking::Client,
    info_url: String,
}

impl HttpTransport {
    pub fn new(base_url: &str) -> Result<Self, GatewayError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| GatewayError::Unavailable(e.to_string()))?;
        Ok(Self {
            client,
            info_url: format!("{}/info", base_url.trim_end_matches('/')),
        })
    }
}

impl InfoTransport for HttpTransport {
    fn post_info(&self, body: &Value) -> Result<Value, GatewayError> {
        let response = self
            .client
            .post(&self.info_url)
            .json(body)
            .send()
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        if status != 200 {
            return Err(GatewayError::Http { status });
        }

        response
            .json::<Value>()
            .map_err(|e| GatewayError::Parse(e.to_string()))
    }
}

/// Base URL precedence: explicit override, then the testnet default, then the
/// environment override (`HYPERLIQUID_BASE_URL`), then mainnet.
pub fn resolve_base_url(explicit: Option<&str>, network: Network, env: Option<String>) -> String {
    if let Some(url) = explicit {
        return url.to_string();
    }
    if network.is_testnet() {
        return TESTNET_URL.to_string();
    }
    match env {
        Some(url) if !url.trim().is_empty() => url,
        _ => MAINNET_URL.to_string(),
    }
}

#[derive(Debug, Deserialize)]
struct MetaResponse {
    universe: Vec<AssetMeta>,
}

#[derive(Debug, Deserialize)]
struct AssetMeta {
    name: String,
}

#[derive(Debug, Deserialize)]
struct AssetCtx {
    funding: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
struct L2Response {
    levels: Vec<Vec<RawLevel>>,
}

#[derive(Debug, Deserialize)]
struct RawLevel {
    px: Decimal,
    sz: Decimal,
}

#[derive(Debug)]
struct UniverseCache {
    names: Vec<String>,
    expires_at: Instant,
}

pub struct HyperliquidGateway<T: InfoTransport = HttpTransport> {
    transport: T,
    retry: RetryPolicy,
    latency: LatencyTracker,
    universe: Option<UniverseCache>,
    universe_ttl: Duration,
}

impl HyperliquidGateway<HttpTransport> {
    pub fn connect(base_url: Option<&str>, network: Network) -> Result<Self, GatewayError> {
        let url = resolve_base_url(base_url, network, std::env::var(BASE_URL_ENV).ok());
        debug!(url = %url, "hyperliquid gateway endpoint");
        Ok(Self::with_transport(HttpTransport::new(&url)?))
    }
}

impl<T: InfoTransport> HyperliquidGateway<T> {
    pub fn with_transport(transport: T) -> Self {
        Self {
            transport,
            retry: RetryPolicy::default(),
            latency: LatencyTracker::default(),
            universe: None,
            universe_ttl: UNIVERSE_TTL,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_universe_ttl(mut self, ttl: Duration) -> Self {
        self.universe_ttl = ttl;
        self
    }

    pub fn latency(&self) -> &LatencyTracker {
        &self.latency
    }

    fn post_info(&mut self, body: Value) -> Result<Value, GatewayError> {
        let request_type = body
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();

        let attempts = self.retry.attempts();
        let mut last_error = GatewayError::Unavailable("no attempt made".to_string());

        for attempt in 0..attempts {
            let started = Instant::now();
            match self.transport.post_info(&body) {
                Ok(value) => {
                    let elapsed = started.elapsed();
                    self.latency.record(&request_type, elapsed);
                    debug!(
                        request_type = %request_type,
                        attempt = attempt + 1,
                        latency_ms = elapsed.as_secs_f64() * 1000.0,
                        "/info ok"
                    );
                    return Ok(value);
                }
                Err(err) => {
                    debug!(
                        request_type = %request_type,
                        attempt = attempt + 1,
                        error = %err,
                        "/info failed"
                    );
                    if !err.is_transient() {
                        return Err(err);
                    }
                    last_error = err;
                }
            }

            if let Some(backoff) = self.retry.backoff_after(attempt) {
                std::thread::sleep(backoff);
            }
        }

        warn!(request_type = %request_type, attempts, error = %last_error, "/info retries exhausted");
        Err(GatewayError::RetriesExhausted {
            attempts,
            last: last_error.to_string(),
        })
    }

    fn fetch_meta_and_ctxs(&mut self) -> Result<(Vec<String>, Vec<AssetCtx>), GatewayError> {
        let value = self.post_info(json!({ "type": "metaAndAssetCtxs" }))?;
        let (meta, ctxs) = parse_meta_and_ctxs(value)?;
        let names: Vec<String> = meta.universe.into_iter().map(|a| a.name).collect();
        // funding polls refresh the universe for free
        self.universe = Some(UniverseCache {
            names: names.clone(),
            expires_at: Instant::now() + self.universe_ttl,
        });
        Ok((names, ctxs))
    }

    fn universe_names(&mut self) -> Result<Vec<String>, GatewayError> {
        if let Some(cache) = &self.universe {
            if Instant::now() < cache.expires_at {
                return Ok(cache.names.clone());
            }
        }
        let (names, _) = self.fetch_meta_and_ctxs()?;
        Ok(names)
    }
}

impl<T: InfoTransport> MarketDataGateway for HyperliquidGateway<T> {
    fn funding_rate(&mut self, pair: &str) -> Result<Decimal, GatewayError> {
        let (names, ctxs) = self.fetch_meta_and_ctxs()?;
        if names.len() != ctxs.len() {
            return Err(GatewayError::Parse(format!(
                "universe has {} assets but {} contexts",
                names.len(),
                ctxs.len()
            )));
        }

        let coin = pair_to_coin(pair);
        let idx = names
            .iter()
            .position(|n| n == coin)
            .or_else(|| {
                let candidate = match_coin(coin, &names)?;
                names.iter().position(|n| *n == candidate)
            })
            .ok_or_else(|| GatewayError::UnknownCoin(coin.to_string()))?;

        ctxs[idx]
            .funding
            .ok_or_else(|| GatewayError::Parse(format!("no funding field for {}", names[idx])))
    }

    fn orderbook(&mut self, pair: &str) -> Result<OrderBook, GatewayError> {
        let coin = self.resolve_coin(pair)?;
        let value = self.post_info(json!({ "type": "l2Book", "coin": coin }))?;
        parse_l2_book(value)
    }

    fn resolve_coin(&mut self, pair: &str) -> Result<String, GatewayError> {
        let coin = pair_to_coin(pair);
        match self.universe_names() {
            Ok(names) => Ok(match_coin(coin, &names).unwrap_or_else(|| coin.to_string())),
            Err(err) => {
                // lookup is best effort; the bare coin is the usual answer anyway
                debug!(pair, error = %err, "universe lookup failed, using bare coin");
                Ok(coin.to_string())
            }
        }
    }
}

// exact listing first, then the unified asset prefixes
fn match_coin(coin: &str, names: &[String]) -> Option<String> {
    if names.iter().any(|n| n == coin) {
        return Some(coin.to_string());
    }
    COIN_PREFIXES
        .iter()
        .map(|prefix| format!("{prefix}{coin}"))
        .find(|candidate| names.iter().any(|n| n == candidate))
}

fn parse_meta_and_ctxs(value: Value) -> Result<(MetaResponse, Vec<AssetCtx>), GatewayError> {
    let Value::Array(mut parts) = value else {
        return Err(GatewayError::Parse("metaAndAssetCtxs is not an array".to_string()));
    };
    if parts.len() < 2 {
        return Err(GatewayError::Parse(format!(
            "metaAndAssetCtxs has {} parts, expected 2",
            parts.len()
        )));
    }
    let ctxs = parts.swap_remove(1);
    let meta = parts.swap_remove(0);

    let meta: MetaResponse =
        serde_json::from_value(meta).map_err(|e| GatewayError::Parse(e.to_string()))?;
    let ctxs: Vec<AssetCtx> =
        serde_json::from_value(ctxs).map_err(|e| GatewayError::Parse(e.to_string()))?;
    Ok((meta, ctxs))
}

fn parse_l2_book(value: Value) -> Result<OrderBook, GatewayError> {
    let response: L2Response =
        serde_json::from_value(value).map_err(|e| GatewayError::Parse(e.to_string()))?;
    let mut sides = response.levels.into_iter().map(|side| {
        side.into_iter()
            .map(|l| BookLevel::new(l.px, l.sz))
            .collect::<Vec<_>>()
    });
    let bids = sides.next().unwrap_or_default();
    let asks = sides.next().unwrap_or_default();
    Ok(OrderBook::new(bids, asks))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;

    /// Replays queued responses and records every request body.
    #[derive(Default)]
    struct CannedTransport {
        responses: RefCell<VecDeque<Result<Value, GatewayError>>>,
        requests: RefCell<Vec<Value>>,
        calls: Cell<usize>,
    }

    impl CannedTransport {
        fn push(&self, response: Result<Value, GatewayError>) {
            self.responses.borrow_mut().push_back(response);
        }
    }

    impl InfoTransport for &CannedTransport {
        fn post_info(&self, body: &Value) -> Result<Value, GatewayError> {
            self.calls.set(self.calls.get() + 1);
            self.requests.borrow_mut().push(body.clone());
            self.responses
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Err(GatewayError::Transport("no canned response".into())))
        }
    }

    fn meta_response(names: &[&str], fundings: &[&str]) -> Value {
        let universe: Vec<Value> = names.iter().map(|n| json!({ "name": n })).collect();
        let ctxs: Vec<Value> = fundings.iter().map(|f| json!({ "funding": f })).collect();
        json!([{ "universe": universe }, ctxs])
    }

    fn gateway(transport: &CannedTransport) -> HyperliquidGateway<&CannedTransport> {
        HyperliquidGateway::with_transport(transport).with_retry(RetryPolicy::new(3, Duration::ZERO))
    }

    #[test]
    fn resolve_coin_uses_universe() {
        let transport = CannedTransport::default();
        transport.push(Ok(meta_response(&["UBTC", "ETH"], &["0.0", "0.0"])));
        let mut gw = gateway(&transport);

        assert_eq!(gw.resolve_coin("BTC-USDC").unwrap(), "UBTC");
        assert_eq!(gw.resolve_coin("ETH-USDC").unwrap(), "ETH");
        assert_eq!(gw.resolve_coin("DOGE-USDC").unwrap(), "DOGE");
        // second and third lookups hit the cache
        assert_eq!(transport.calls.get(), 1);
    }

    #[test]
    fn resolve_coin_falls_back_when_universe_unavailable() {
        let transport = CannedTransport::default();
        let mut gw = gateway(&transport);
        assert_eq!(gw.resolve_coin("SOL-USDC").unwrap(), "SOL");
    }

    #[test]
    fn expired_universe_is_refetched() {
        let transport = CannedTransport::default();
        transport.push(Ok(meta_response(&["BTC"], &["0.0"])));
        transport.push(Ok(meta_response(&["WBTC"], &["0.0"])));
        let mut gw = gateway(&transport).with_universe_ttl(Duration::ZERO);

        assert_eq!(gw.resolve_coin("BTC-USDC").unwrap(), "BTC");
        assert_eq!(gw.resolve_coin("BTC-USDC").unwrap(), "WBTC");
        assert_eq!(transport.calls.get(), 2);
    }

    #[test]
    fn funding_rate_parses_from_ctxs() {
        let transport = CannedTransport::default();
        transport.push(Ok(meta_response(&["BTC", "SOL"], &["0.0000125", "-0.0000456"])));
        transport.push(Ok(meta_response(&["BTC", "SOL"], &["0.0000125", "-0.0000456"])));
        let mut gw = gateway(&transport);

        assert_eq!(gw.funding_rate("BTC-USDC").unwrap(), dec!(0.0000125));
        assert_eq!(gw.funding_rate("SOL-USDC").unwrap(), dec!(-0.0000456));
        assert_eq!(transport.requests.borrow()[0], json!({ "type": "metaAndAssetCtxs" }));
    }

    #[test]
    fn funding_rate_unknown_coin() {
        let transport = CannedTransport::default();
        transport.push(Ok(meta_response(&["BTC"], &["0.0001"])));
        let mut gw = gateway(&transport);
        assert_eq!(
            gw.funding_rate("XYZ-USDC"),
            Err(GatewayError::UnknownCoin("XYZ".to_string()))
        );
    }

    #[test]
    fn funding_rate_rejects_mismatched_lengths() {
        let transport = CannedTransport::default();
        transport.push(Ok(meta_response(&["BTC", "ETH"], &["0.0001"])));
        let mut gw = gateway(&transport);
        assert!(matches!(gw.funding_rate("BTC-USDC"), Err(GatewayError::Parse(_))));
    }

    #[test]
    fn orderbook_normalizes_levels() {
        let transport = CannedTransport::default();
        transport.push(Ok(meta_response(&["BTC"], &["0.0"])));
        transport.push(Ok(json!({
            "coin": "BTC",
            "time": 1,
            "levels": [
                [{ "px": "100.0", "sz": "2.0", "n": 3 }, { "px": "99.5", "sz": "1.0", "n": 1 }],
                [{ "px": "100.5", "sz": "2.5", "n": 2 }, { "px": "101.0", "sz": "3.0", "n": 4 }]
            ]
        })));
        let mut gw = gateway(&transport);

        let book = gw.orderbook("BTC-USDC").unwrap();
        assert_eq!(book.best_bid(), Some(BookLevel::new(dec!(100), dec!(2))));
        assert_eq!(book.best_ask(), Some(BookLevel::new(dec!(100.5), dec!(2.5))));
        assert_eq!(book.bids.len(), 2);
        assert_eq!(
            transport.requests.borrow()[1],
            json!({ "type": "l2Book", "coin": "BTC" })
        );
    }

    #[test]
    fn transient_errors_are_retried_then_succeed() {
        let transport = CannedTransport::default();
        transport.push(Err(GatewayError::Http { status: 502 }));
        transport.push(Err(GatewayError::Transport("reset".into())));
        transport.push(Ok(meta_response(&["ETH"], &["0.0002"])));
        let mut gw = gateway(&transport);

        assert_eq!(gw.funding_rate("ETH-USDC").unwrap(), dec!(0.0002));
        assert_eq!(transport.calls.get(), 3);
        assert_eq!(gw.latency().stats("metaAndAssetCtxs").unwrap().count, 1);
    }

    #[test]
    fn retries_are_bounded() {
        let transport = CannedTransport::default();
        for _ in 0..5 {
            transport.push(Err(GatewayError::Http { status: 503 }));
        }
        let mut gw = gateway(&transport);

        let err = gw.funding_rate("ETH-USDC").unwrap_err();
        assert!(matches!(err, GatewayError::RetriesExhausted { attempts: 3, .. }));
        assert_eq!(transport.calls.get(), 3);
        assert!(gw.latency().stats("metaAndAssetCtxs").is_none());
    }

    #[test]
    fn client_errors_are_not_retried() {
        let transport = CannedTransport::default();
        transport.push(Err(GatewayError::Http { status: 422 }));
        let mut gw = gateway(&transport);

        assert_eq!(gw.funding_rate("ETH-USDC"), Err(GatewayError::Http { status: 422 }));
        assert_eq!(transport.calls.get(), 1);
    }

    #[test]
    fn base_url_precedence() {
        let env = || Some("http://env.local".to_string());

        assert_eq!(
            resolve_base_url(Some("http://localhost:3001"), Network::Testnet, env()),
            "http://localhost:3001"
        );
        assert_eq!(
            resolve_base_url(Some("http://localhost:3001"), Network::Mainnet, env()),
            "http://localhost:3001"
        );
        // testnet default beats the env override
        assert_eq!(resolve_base_url(None, Network::Testnet, env()), TESTNET_URL);
        assert_eq!(resolve_base_url(None, Network::Mainnet, env()), "http://env.local");
        assert_eq!(resolve_base_url(None, Network::Mainnet, None), MAINNET_URL);
        assert_eq!(
            resolve_base_url(None, Network::Mainnet, Some("  ".to_string())),
            MAINNET_URL
        );
    }
}
