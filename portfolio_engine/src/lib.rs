use std::collections::HashMap;

use domain::{Asset, AssetValuation, Portfolio, PortfolioValuation, Price, BRIDGE_TICKER};
use rust_decimal::Decimal;
use thiserror::Error;

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TradeError {
    #[error("crypto amount must be positive")]
    NonPositiveCrypto,
    #[error("fiat amount must not be negative")]
    NegativeFiat,
    #[error("insufficient cash")]
    InsufficientCash,
    #[error("insufficient holdings")]
    InsufficientHoldings,
}

/// Latest known conversion rates for a set of tickers, split into rates quoted
/// directly in the reference currency and rates quoted in the bridge currency.
#[derive(Debug, Default, Clone)]
pub struct RateTable {
    direct: HashMap<String, Decimal>,
    bridged: HashMap<String, Decimal>,
}

impl RateTable {
    /// Partitions a batch of price rows against `reference_ticker`. Rows
    /// quoted in anything other than the reference or the bridge currency are
    /// ignored. When the reference currency IS the bridge currency, every row
    /// lands in the direct bucket.
    pub fn from_prices(reference_ticker: &str, prices: &[Price]) -> Self {
        let mut table = Self::default();
        for price in prices {
            if price.to_ticker == reference_ticker {
                table.direct.insert(price.from_ticker.clone(), price.value);
            } else if price.to_ticker == BRIDGE_TICKER {
                table.bridged.insert(price.from_ticker.clone(), price.value);
            }
        }
        table
    }

    pub fn direct_rate(&self, ticker: &str) -> Option<Decimal> {
        self.direct.get(ticker).copied()
    }

    /// Worth of `amount` units of `ticker` in the reference currency.
    ///
    /// Prefers a direct rate; falls back to the two-hop path through the
    /// bridge currency; a missing price path values as zero rather than
    /// erroring.
    pub fn value_of(&self, ticker: &str, amount: Decimal) -> Decimal {
        if let Some(rate) = self.direct_rate(ticker) {
            return amount * rate;
        }
        match (self.bridged.get(ticker), self.direct_rate(BRIDGE_TICKER)) {
            (Some(bridge_rate), Some(bridge_to_reference)) => {
                amount * *bridge_rate * bridge_to_reference
            }
            _ => Decimal::ZERO,
        }
    }
}

/// Computes the full valuation of a portfolio from its current rows and a
/// rate table. Pure; storage errors never reach this function.
pub fn valuate(portfolio: &Portfolio, assets: &[Asset], rates: &RateTable) -> PortfolioValuation {
    let mut valued: Vec<AssetValuation> = assets
        .iter()
        .map(|asset| {
            let value = rates.value_of(&asset.ticker, asset.amount);
            AssetValuation {
                ticker: asset.ticker.clone(),
                amount: asset.amount,
                purchased: asset.purchased,
                value,
                share_of_portfolio: Decimal::ZERO,
                performance: percentage_change(value, asset.purchased),
            }
        })
        .collect();

    let total_value =
        valued.iter().map(|a| a.value).sum::<Decimal>() + portfolio.cash;
    let total_purchased =
        valued.iter().map(|a| a.purchased).sum::<Decimal>() + portfolio.cash;

    for asset in &mut valued {
        asset.share_of_portfolio = if total_value.is_zero() {
            Decimal::ZERO
        } else {
            asset.value / total_value * HUNDRED
        };
    }

    valued.sort_by(|a, b| b.value.cmp(&a.value));

    PortfolioValuation {
        reference: portfolio.reference.clone(),
        cash: portfolio.cash,
        total_value,
        total_purchased,
        total_profit: total_value - total_purchased,
        average_performance: percentage_change(total_value, total_purchased),
        assets: valued,
    }
}

fn percentage_change(current: Decimal, basis: Decimal) -> Decimal {
    if basis.is_zero() {
        Decimal::ZERO
    } else {
        (current / basis - Decimal::ONE) * HUNDRED
    }
}

/// The asset and portfolio figures a buy or sell resolves to. Both new
/// versions must be appended atomically by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradePlan {
    pub cash: Decimal,
    pub purchased: Decimal,
    pub amount: Decimal,
}

/// Swap `fiat` cash for `crypto` units of an asset.
pub fn plan_buy(
    cash: Decimal,
    purchased: Decimal,
    amount: Decimal,
    fiat: Decimal,
    crypto: Decimal,
) -> Result<TradePlan, TradeError> {
    validate_trade_amounts(fiat, crypto)?;
    if fiat > cash {
        return Err(TradeError::InsufficientCash);
    }
    Ok(TradePlan {
        cash: cash - fiat,
        purchased: purchased + fiat,
        amount: amount + crypto,
    })
}

/// Swap `crypto` units of an asset for `fiat` cash. The cost basis shrinks
/// proportionally to the quantity sold (average-cost accounting, not
/// FIFO/LIFO).
pub fn plan_sell(
    cash: Decimal,
    purchased: Decimal,
    amount: Decimal,
    fiat: Decimal,
    crypto: Decimal,
) -> Result<TradePlan, TradeError> {
    validate_trade_amounts(fiat, crypto)?;
    if crypto > amount {
        return Err(TradeError::InsufficientHoldings);
    }
    Ok(TradePlan {
        cash: cash + fiat,
        purchased: purchased - purchased * (crypto / amount),
        amount: amount - crypto,
    })
}

fn validate_trade_amounts(fiat: Decimal, crypto: Decimal) -> Result<(), TradeError> {
    if crypto <= Decimal::ZERO {
        return Err(TradeError::NonPositiveCrypto);
    }
    if fiat < Decimal::ZERO {
        return Err(TradeError::NegativeFiat);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use domain::Currency;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn price(from: &str, to: &str, value: Decimal) -> Price {
        Price {
            from_ticker: from.to_string(),
            to_ticker: to.to_string(),
            time: Utc::now(),
            value,
        }
    }

    fn asset(ticker: &str, purchased: Decimal, amount: Decimal) -> Asset {
        Asset {
            user_id: Uuid::new_v4(),
            ticker: ticker.to_string(),
            purchased,
            amount,
            updated_at: Utc::now(),
        }
    }

    fn usd_portfolio(cash: Decimal) -> Portfolio {
        Portfolio {
            user_id: Uuid::new_v4(),
            reference: Currency::new("USD", "USD"),
            cash,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn direct_rate_wins_over_bridge() {
        let rates = RateTable::from_prices(
            "USD",
            &[
                price("ETH", "USD", dec!(2000)),
                price("ETH", "BTC", dec!(0.05)),
                price("BTC", "USD", dec!(40000)),
            ],
        );
        assert_eq!(rates.value_of("ETH", dec!(2)), dec!(4000));
    }

    #[test]
    fn bridges_through_btc_when_no_direct_rate() {
        let rates = RateTable::from_prices(
            "USD",
            &[
                price("ETH", "BTC", dec!(0.05)),
                price("BTC", "USD", dec!(40000)),
            ],
        );
        assert_eq!(rates.value_of("ETH", dec!(2)), dec!(4000));
    }

    #[test]
    fn missing_price_path_values_as_zero() {
        let rates = RateTable::from_prices("USD", &[price("ETH", "BTC", dec!(0.05))]);
        assert_eq!(rates.value_of("ETH", dec!(2)), Decimal::ZERO);
        assert_eq!(rates.value_of("XYZ", dec!(10)), Decimal::ZERO);
    }

    #[test]
    fn btc_reference_treats_btc_rates_as_direct() {
        let rates = RateTable::from_prices("BTC", &[price("ETH", "BTC", dec!(0.05))]);
        assert_eq!(rates.value_of("ETH", dec!(2)), dec!(0.10));
    }

    #[test]
    fn valuation_totals_and_ordering() {
        let portfolio = usd_portfolio(dec!(100));
        let assets = [
            asset("ETH", dec!(1000), dec!(2)),
            asset("BTC", dec!(30000), dec!(1)),
        ];
        let rates = RateTable::from_prices(
            "USD",
            &[
                price("ETH", "USD", dec!(2000)),
                price("BTC", "USD", dec!(40000)),
            ],
        );

        let valuation = valuate(&portfolio, &assets, &rates);
        assert_eq!(valuation.total_value, dec!(44100));
        assert_eq!(valuation.total_purchased, dec!(31100));
        assert_eq!(valuation.total_profit, dec!(13000));
        // Descending by value: BTC (40000) before ETH (4000).
        assert_eq!(valuation.assets[0].ticker, "BTC");
        assert_eq!(valuation.assets[1].ticker, "ETH");
        assert_eq!(valuation.assets[1].performance, dec!(300));
    }

    #[test]
    fn empty_portfolio_has_no_division_by_zero() {
        let portfolio = usd_portfolio(Decimal::ZERO);
        let assets = [asset("ETH", Decimal::ZERO, Decimal::ZERO)];
        let valuation = valuate(&portfolio, &assets, &RateTable::default());

        assert_eq!(valuation.total_value, Decimal::ZERO);
        assert_eq!(valuation.average_performance, Decimal::ZERO);
        assert_eq!(valuation.assets[0].share_of_portfolio, Decimal::ZERO);
        assert_eq!(valuation.assets[0].performance, Decimal::ZERO);
    }

    #[test]
    fn shares_sum_to_one_hundred_for_fully_priced_portfolio() {
        let portfolio = usd_portfolio(Decimal::ZERO);
        let assets = [
            asset("ETH", dec!(100), dec!(1)),
            asset("BTC", dec!(100), dec!(1)),
        ];
        let rates = RateTable::from_prices(
            "USD",
            &[
                price("ETH", "USD", dec!(2500)),
                price("BTC", "USD", dec!(7500)),
            ],
        );
        let valuation = valuate(&portfolio, &assets, &rates);
        assert_eq!(valuation.assets[0].share_of_portfolio, dec!(75));
        assert_eq!(valuation.assets[1].share_of_portfolio, dec!(25));
    }

    #[test]
    fn buy_moves_cash_into_cost_basis() {
        let plan = plan_buy(dec!(1000), dec!(0), dec!(0), dec!(500), dec!(0.01)).unwrap();
        assert_eq!(
            plan,
            TradePlan {
                cash: dec!(500),
                purchased: dec!(500),
                amount: dec!(0.01),
            }
        );
    }

    #[test]
    fn sell_reduces_cost_basis_proportionally() {
        let plan = plan_sell(dec!(500), dec!(500), dec!(0.01), dec!(250), dec!(0.005)).unwrap();
        assert_eq!(
            plan,
            TradePlan {
                cash: dec!(750),
                purchased: dec!(250),
                amount: dec!(0.005),
            }
        );
    }

    #[test]
    fn buy_rejects_overspend() {
        let err = plan_buy(dec!(100), dec!(0), dec!(0), dec!(101), dec!(1)).unwrap_err();
        assert_eq!(err, TradeError::InsufficientCash);
    }

    #[test]
    fn sell_rejects_overdraw() {
        let err = plan_sell(dec!(0), dec!(500), dec!(0.01), dec!(1), dec!(0.02)).unwrap_err();
        assert_eq!(err, TradeError::InsufficientHoldings);
    }

    #[test]
    fn trades_reject_non_positive_crypto_and_negative_fiat() {
        assert_eq!(
            plan_buy(dec!(100), dec!(0), dec!(0), dec!(1), dec!(0)).unwrap_err(),
            TradeError::NonPositiveCrypto,
        );
        assert_eq!(
            plan_sell(dec!(100), dec!(0), dec!(1), dec!(-1), dec!(1)).unwrap_err(),
            TradeError::NegativeFiat,
        );
    }
}
