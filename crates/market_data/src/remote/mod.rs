pub mod series_response;
pub mod twelvedata_client;

pub use series_response::{PriceResponse, RawBar, TimeSeriesResponse};
pub use twelvedata_client::TwelveDataClient;
