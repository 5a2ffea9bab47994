mod bridge;
pub mod config;
mod exports;

pub use bridge::Bridge;
pub use config::BridgeConfig;
pub use exports::{Pair, Sample, export_names};
