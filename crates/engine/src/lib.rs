pub mod classifier;
pub mod generator;
pub mod indicators;
pub mod policy;

pub use classifier::{TierInfo, classify};
pub use generator::generate;
