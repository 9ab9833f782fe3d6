// 5.0: funding signal. positive funding = longs pay shorts, so the book should lean short.
// 5.0 has the generator. 5.1 has the bias rule. fetch failures never escape this module.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::gateway::MarketDataGateway;

/// pair -> bias. rebuilt every tick, never carried over.
pub type FundingSignals = BTreeMap<String, Decimal>;

// hyperliquid settles funding hourly
const PERIODS_PER_YEAR: Decimal = dec!(8760);

#[derive(Debug, Clone)]
pub struct FundingSignalGenerator {
    threshold: Decimal,
    running: bool,
}

impl FundingSignalGenerator {
    pub fn new(threshold: Decimal) -> Self {
        Self {
            threshold: threshold.abs(),
            running: false,
        }
    }

    pub fn start(&mut self) {
        info!(threshold = %self.threshold, "funding signal generator started");
        self.running = true;
    }

    pub fn stop(&mut self) {
        info!("funding signal generator stopped");
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn threshold(&self) -> Decimal {
        self.threshold
    }

    /// Bias per pair from the freshest funding rate. Infallible: a failed fetch
    /// reads as flat funding. While stopped every pair gets zero bias and the
    /// gateway is not touched.
    pub fn get_signals<G: MarketDataGateway + ?Sized>(
        &self,
        gateway: &mut G,
        pairs: &[String],
    ) -> FundingSignals {
        if !self.running {
            return pairs.iter().map(|p| (p.clone(), Decimal::ZERO)).collect();
        }

        let mut signals = FundingSignals::new();
        for pair in pairs {
            let rate = match gateway.funding_rate(pair) {
                Ok(rate) => rate,
                Err(err) => {
                    debug!(pair = %pair, error = %err, "funding fetch failed, treating as flat");
                    Decimal::ZERO
                }
            };
            let bias = funding_bias(rate, self.threshold);
            info!(
                pair = %pair,
                rate = %rate,
                apr = %annualized_funding_rate(rate).round_dp(4),
                bias = %bias,
                threshold = %self.threshold,
                "funding signal"
            );
            signals.insert(pair.clone(), bias);
        }
        debug!(?signals, "funding signals");
        signals
    }
}

// 5.1: rates inside the dead band are noise
pub fn funding_bias(rate: Decimal, threshold: Decimal) -> Decimal {
    if rate.abs() >= threshold {
        rate
    } else {
        Decimal::ZERO
    }
}

pub fn annualized_funding_rate(period_rate: Decimal) -> Decimal {
    period_rate * PERIODS_PER_YEAR
}

/// Mean bias across pairs, zero when there are none.
pub fn mean_bias(signals: &FundingSignals) -> Decimal {
    if signals.is_empty() {
        return Decimal::ZERO;
    }
    signals.values().copied().sum::<Decimal>() / Decimal::from(signals.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::MockGateway;
    use rust_decimal_macros::dec;

    fn pairs() -> Vec<String> {
        vec!["BTC-USDC".to_string(), "ETH-USDC".to_string(), "SOL-USDC".to_string()]
    }

    #[test]
    fn bias_respects_threshold() {
        let threshold = dec!(0.0001);
        assert_eq!(funding_bias(dec!(0.0003), threshold), dec!(0.0003));
        assert_eq!(funding_bias(dec!(-0.0002), threshold), dec!(-0.0002));
        assert_eq!(funding_bias(dec!(0.00005), threshold), Decimal::ZERO);
        // boundary is inclusive
        assert_eq!(funding_bias(dec!(0.0001), threshold), dec!(0.0001));
        assert_eq!(funding_bias(dec!(-0.0001), threshold), dec!(-0.0001));
    }

    #[test]
    fn signals_from_gateway() {
        let mut gw = MockGateway::new()
            .with_funding("BTC-USDC", dec!(0.0003))
            .with_funding("ETH-USDC", dec!(0.00002))
            .with_funding("SOL-USDC", dec!(-0.0005));
        let mut generator = FundingSignalGenerator::new(dec!(0.0001));
        generator.start();

        let signals = generator.get_signals(&mut gw, &pairs());
        assert_eq!(signals["BTC-USDC"], dec!(0.0003));
        assert_eq!(signals["ETH-USDC"], Decimal::ZERO);
        assert_eq!(signals["SOL-USDC"], dec!(-0.0005));
    }

    #[test]
    fn failed_fetch_reads_as_flat() {
        let mut gw = MockGateway::new().with_funding("BTC-USDC", dec!(0.0003));
        gw.fail_pair("BTC-USDC");
        let mut generator = FundingSignalGenerator::new(dec!(0.0001));
        generator.start();

        let signals = generator.get_signals(&mut gw, &pairs());
        assert_eq!(signals.len(), 3);
        assert_eq!(signals["BTC-USDC"], Decimal::ZERO);
    }

    #[test]
    fn stopped_generator_skips_gateway() {
        let mut gw = MockGateway::new().with_funding("BTC-USDC", dec!(0.0003));
        let generator = FundingSignalGenerator::new(dec!(0.0001));

        let signals = generator.get_signals(&mut gw, &pairs());
        assert!(signals.values().all(|b| b.is_zero()));
        assert_eq!(gw.funding_calls(), 0);
    }

    #[test]
    fn mean_bias_of_signals() {
        let mut signals = FundingSignals::new();
        assert_eq!(mean_bias(&signals), Decimal::ZERO);
        signals.insert("A".into(), dec!(0.0003));
        signals.insert("B".into(), dec!(-0.0001));
        assert_eq!(mean_bias(&signals), dec!(0.0001));
    }

    #[test]
    fn annualized_hourly_rate() {
        assert_eq!(annualized_funding_rate(dec!(0.0001)), dec!(0.876));
    }
}
