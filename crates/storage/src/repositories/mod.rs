pub mod daily_cache_repo;
pub mod dispatch_repo;
pub mod signals_repo;

pub use daily_cache_repo::DailyCacheRepository;
pub use dispatch_repo::{DispatchRepository, DispatchState};
pub use signals_repo::SignalsRepository;
