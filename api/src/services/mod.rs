pub mod alert_scan;
pub mod ingest;
pub mod portfolio;

pub use alert_scan::AlertScanner;
pub use ingest::IngestService;
pub use portfolio::{PortfolioError, PortfolioService};
