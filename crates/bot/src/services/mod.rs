pub mod daily_limiter;
pub mod dispatch_guard;
pub mod formatter;
pub mod generation_service;
pub mod outcome_service;
pub mod telegram_service;
