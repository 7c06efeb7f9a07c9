pub mod extract;
pub mod fetch;
pub mod traits;

pub use extract::{extract_snapshot, FixedInventory, InventorySampler, RandomInventory};
pub use fetch::ZillowFetcher;
pub use traits::MarketPageSource;
