pub mod config;
pub mod fetcher;
pub mod ingest;
pub mod newsletter;
pub mod parser;
pub mod payment;
pub mod pg_store;
pub mod pipeline;
pub mod sources;
pub mod store;
pub mod summarize;
pub mod types;

pub use config::AppConfig;
pub use fetcher::{FetchContent, Fetcher};
pub use ingest::IngestEngine;
pub use payment::{HttpGateway, PaymentGateway};
pub use pg_store::PgStore;
pub use store::{MemoryStore, Store};
pub use types::*;
