//! 수집 작업 모듈.

pub mod crawl_cycle;
pub mod ingest;
pub mod instrument_sync;
pub mod price_refresh;
pub mod split_sync;

pub use crawl_cycle::{run_all_sources, run_crawl_cycle};
pub use ingest::{IngestOutcome, MentionIngestor};
pub use instrument_sync::{is_supported_symbol, sync_instruments};
pub use price_refresh::refresh_prices;
pub use split_sync::sync_splits;
