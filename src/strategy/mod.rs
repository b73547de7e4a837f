//! Signal rules: per-timeframe bias classification and entry triggers

pub mod bias;
pub mod triggers;

pub use bias::{entry_gates, momentum_bias, trend_bias, Bias, EntryGates};
pub use triggers::{detect_trigger, trigger_allows_entry, TriggerEvent};
