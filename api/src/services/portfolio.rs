use std::sync::Arc;

use chrono::Utc;
use domain::{
    is_reference_ticker, Asset, AssetValuation, Portfolio, PortfolioValuation, BRIDGE_TICKER,
};
use portfolio_engine::{plan_buy, plan_sell, RateTable, TradeError, TradePlan};
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use crate::repositories::{CurrencyRepository, PortfolioRepository, PriceRepository};

#[derive(Debug, Error)]
pub enum PortfolioError {
    #[error("no portfolio configured")]
    NoPortfolio,
    #[error("no such asset")]
    UnknownAsset,
    #[error("unknown currency {0}")]
    UnknownCurrency(String),
    #[error("{0} cannot be used as a reference currency")]
    NotReferenceCurrency(String),
    #[error("cash must not be negative")]
    NegativeCash,
    #[error(transparent)]
    Trade(#[from] TradeError),
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Request-scoped portfolio operations: valuation reads and the buy/sell
/// mutations. All cross-request state lives in the store.
#[derive(Clone)]
pub struct PortfolioService {
    portfolios: Arc<dyn PortfolioRepository>,
    prices: Arc<dyn PriceRepository>,
    currencies: Arc<dyn CurrencyRepository>,
}

impl PortfolioService {
    pub fn new(
        portfolios: Arc<dyn PortfolioRepository>,
        prices: Arc<dyn PriceRepository>,
        currencies: Arc<dyn CurrencyRepository>,
    ) -> Self {
        Self {
            portfolios,
            prices,
            currencies,
        }
    }

    pub async fn valuate(&self, user_id: Uuid) -> Result<PortfolioValuation, PortfolioError> {
        let portfolio = self
            .portfolios
            .current_portfolio(user_id)
            .await?
            .ok_or(PortfolioError::NoPortfolio)?;
        let assets = self.portfolios.current_assets(user_id).await?;

        // The bridge currency is always priced so the two-hop path is
        // available even when no asset is BTC itself.
        let mut tickers: Vec<String> = assets.iter().map(|a| a.ticker.clone()).collect();
        if !tickers.iter().any(|t| t == BRIDGE_TICKER) {
            tickers.push(BRIDGE_TICKER.to_string());
        }

        let rows = self
            .prices
            .latest_rates_for(&tickers, &portfolio.reference.ticker)
            .await?;
        let rates = RateTable::from_prices(&portfolio.reference.ticker, &rows);

        Ok(portfolio_engine::valuate(&portfolio, &assets, &rates))
    }

    /// Single-asset view of the valuation.
    pub async fn asset(
        &self,
        user_id: Uuid,
        ticker: &str,
    ) -> Result<AssetValuation, PortfolioError> {
        let valuation = self.valuate(user_id).await?;
        valuation
            .assets
            .into_iter()
            .find(|asset| asset.ticker == ticker)
            .ok_or(PortfolioError::UnknownAsset)
    }

    /// Creates or replaces the user's portfolio row: reference currency plus
    /// opening cash. The reference must be an allow-listed currency that
    /// exists in the directory.
    pub async fn set_reference(
        &self,
        user_id: Uuid,
        ticker: &str,
        cash: Decimal,
    ) -> Result<Portfolio, PortfolioError> {
        if !is_reference_ticker(ticker) {
            return Err(PortfolioError::NotReferenceCurrency(ticker.to_string()));
        }
        if cash < Decimal::ZERO {
            return Err(PortfolioError::NegativeCash);
        }
        let reference = self
            .currencies
            .find_by_ticker(ticker)
            .await?
            .ok_or_else(|| PortfolioError::UnknownCurrency(ticker.to_string()))?;

        let portfolio = Portfolio {
            user_id,
            reference,
            cash,
            updated_at: Utc::now(),
        };
        self.portfolios.set_portfolio(&portfolio).await?;
        Ok(portfolio)
    }

    pub async fn buy(
        &self,
        user_id: Uuid,
        ticker: &str,
        fiat: Decimal,
        crypto: Decimal,
    ) -> Result<(), PortfolioError> {
        let portfolio = self
            .portfolios
            .current_portfolio(user_id)
            .await?
            .ok_or(PortfolioError::NoPortfolio)?;
        self.currencies
            .find_by_ticker(ticker)
            .await?
            .ok_or_else(|| PortfolioError::UnknownCurrency(ticker.to_string()))?;

        // First purchase of a ticker starts from an empty position.
        let asset = self.portfolios.current_asset(user_id, ticker).await?;
        let (purchased, amount) = asset
            .map(|a| (a.purchased, a.amount))
            .unwrap_or((Decimal::ZERO, Decimal::ZERO));

        let plan = plan_buy(portfolio.cash, purchased, amount, fiat, crypto)?;
        self.apply_trade(portfolio, user_id, ticker, plan).await
    }

    pub async fn sell(
        &self,
        user_id: Uuid,
        ticker: &str,
        fiat: Decimal,
        crypto: Decimal,
    ) -> Result<(), PortfolioError> {
        let portfolio = self
            .portfolios
            .current_portfolio(user_id)
            .await?
            .ok_or(PortfolioError::NoPortfolio)?;
        let asset = self
            .portfolios
            .current_asset(user_id, ticker)
            .await?
            .ok_or(PortfolioError::UnknownAsset)?;

        let plan = plan_sell(portfolio.cash, asset.purchased, asset.amount, fiat, crypto)?;
        self.apply_trade(portfolio, user_id, ticker, plan).await
    }

    async fn apply_trade(
        &self,
        portfolio: Portfolio,
        user_id: Uuid,
        ticker: &str,
        plan: TradePlan,
    ) -> Result<(), PortfolioError> {
        let now = Utc::now();
        let new_portfolio = Portfolio {
            cash: plan.cash,
            updated_at: now,
            ..portfolio
        };
        let new_asset = Asset {
            user_id,
            ticker: ticker.to_string(),
            purchased: plan.purchased,
            amount: plan.amount,
            updated_at: now,
        };
        self.portfolios
            .record_trade(&new_portfolio, &new_asset)
            .await?;
        Ok(())
    }
}
