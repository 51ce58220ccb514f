pub mod alert_repository;
pub mod currency_repository;
pub mod portfolio_repository;
pub mod price_repository;

pub use alert_repository::{AlertCandidate, AlertRepository, PostgresAlertRepository};
pub use currency_repository::{CurrencyRepository, PostgresCurrencyRepository};
pub use portfolio_repository::{PortfolioRepository, PostgresPortfolioRepository};
pub use price_repository::{PostgresPriceRepository, PriceRepository};
