pub mod remote;
pub mod traits;

pub use remote::TwelveDataClient;
pub use traits::{MarketDataError, MarketDataProvider};
