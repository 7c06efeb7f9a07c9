pub mod error;
pub mod models;
pub mod pipeline;
pub mod scheduler;
pub mod scrapers;
pub mod storage;
pub mod trends;

pub use error::MarketError;
