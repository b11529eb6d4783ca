pub mod candle;
pub mod event;
pub mod signal;

pub use candle::Candle;
pub use event::{EventKind, SignalEvent};
pub use signal::{Direction, Freshness, ParseEnumError, Signal, SignalStatus, Tier};
